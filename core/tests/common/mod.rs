#![allow(dead_code)]

use openssl::asn1::{Asn1Integer, Asn1Object, Asn1OctetString, Asn1Time};
use openssl::bn::BigNum;
use openssl::hash::MessageDigest;
use openssl::pkcs7::{Pkcs7, Pkcs7Flags};
use openssl::pkey::{PKey, Private};
use openssl::rsa::Rsa;
use openssl::stack::Stack;
use openssl::x509::extension::BasicConstraints;
use openssl::x509::{X509Extension, X509Name, X509NameBuilder, X509};
use std::io::{Cursor, Write};
use zip::write::{FileOptions, ZipWriter};

pub const PASS_TYPE_ID: &str = "pass.com.example.membership";
pub const TEAM_ID: &str = "ABCDE12345";
pub const WWDR_SERIAL_HEX: &str = "01DEBCC4396DA010";
pub const EXTENSION_OID: &str = "1.2.840.113635.100.6.1.16";
pub const MANIFEST: &[u8] = br#"{"pass.json":"2fd4e1c67a2d28fced849ee1bb76e7391b93eb12","icon.png":"de9f2c7fd25e1b3afad3e85a0bd17d9b100db4b3"}"#;

const DAY: i64 = 86_400;

pub struct Issued {
    pub cert: X509,
    pub key: PKey<Private>,
}

/// Knobs for the generated chain; defaults produce a chain the default
/// trust anchors accept.
pub struct ChainSpec {
    pub wwdr_serial_hex: String,
    pub wwdr_not_after: i64,
    pub leaf_not_after: i64,
    pub leaf_pass_type: String,
    pub leaf_team: Option<String>,
    /// Raw extension contents; `None` omits the extension.
    pub leaf_extension: Option<Vec<u8>>,
    pub include_wwdr: bool,
}

impl Default for ChainSpec {
    fn default() -> Self {
        let now = time::OffsetDateTime::now_utc().unix_timestamp();
        Self {
            wwdr_serial_hex: WWDR_SERIAL_HEX.to_string(),
            wwdr_not_after: now + 365 * DAY,
            leaf_not_after: now + 365 * DAY,
            leaf_pass_type: PASS_TYPE_ID.to_string(),
            leaf_team: Some(TEAM_ID.to_string()),
            leaf_extension: Some(utf8_extension(PASS_TYPE_ID)),
            include_wwdr: true,
        }
    }
}

pub struct Chain {
    pub root: Issued,
    pub wwdr: Issued,
    pub leaf: Issued,
    pub include_wwdr: bool,
}

impl Chain {
    pub fn new(spec: ChainSpec) -> Self {
        let now = time::OffsetDateTime::now_utc().unix_timestamp();

        let root_name = name(&[
            ("C", "US"),
            ("O", "Apple Inc."),
            ("OU", "Apple Certification Authority"),
            ("CN", "Apple Root CA"),
        ]);
        let root_key = rsa_key();
        let root = issue(
            &root_name,
            &root_name,
            &root_key,
            &root_key,
            "01",
            now + 3650 * DAY,
            true,
            None,
        );

        let wwdr_name = name(&[
            ("C", "US"),
            ("O", "Apple Inc."),
            ("OU", "Apple Worldwide Developer Relations"),
            ("CN", "Apple Worldwide Developer Relations Certification Authority"),
        ]);
        let wwdr_key = rsa_key();
        let wwdr = issue(
            &wwdr_name,
            &root_name,
            &wwdr_key,
            &root_key,
            &spec.wwdr_serial_hex,
            spec.wwdr_not_after,
            true,
            None,
        );

        let mut leaf_entries = vec![("C", "US"), ("O", "Example Corp")];
        if let Some(team) = &spec.leaf_team {
            leaf_entries.push(("OU", team.as_str()));
        }
        let cn = format!("Pass Type ID: {}", spec.leaf_pass_type);
        leaf_entries.push(("CN", cn.as_str()));
        leaf_entries.push(("UID", spec.leaf_pass_type.as_str()));
        let leaf_name = name(&leaf_entries);
        let leaf_key = rsa_key();
        let leaf = issue(
            &leaf_name,
            &wwdr_name,
            &leaf_key,
            &wwdr_key,
            "7A3E9C01",
            spec.leaf_not_after,
            false,
            spec.leaf_extension.as_deref(),
        );

        Chain {
            root: Issued {
                cert: root,
                key: root_key,
            },
            wwdr: Issued {
                cert: wwdr,
                key: wwdr_key,
            },
            leaf: Issued {
                cert: leaf,
                key: leaf_key,
            },
            include_wwdr: spec.include_wwdr,
        }
    }

    /// Detached PKCS#7 over `manifest`, signed by the leaf.
    pub fn sign(&self, manifest: &[u8]) -> Vec<u8> {
        let mut extra = Stack::<X509>::new().unwrap();
        if self.include_wwdr {
            extra.push(self.wwdr.cert.clone()).unwrap();
        }
        Pkcs7::sign(
            &self.leaf.cert,
            &self.leaf.key,
            &extra,
            manifest,
            Pkcs7Flags::DETACHED | Pkcs7Flags::BINARY,
        )
        .unwrap()
        .to_der()
        .unwrap()
    }
}

/// Re-encodes DER with every constructed element in indefinite-length form.
pub fn indefinite_lengths(der: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    let used = reencode(der, &mut out);
    assert_eq!(used, der.len());
    out
}

fn reencode(data: &[u8], out: &mut Vec<u8>) -> usize {
    let tag = data[0];
    assert_ne!(tag & 0x1f, 0x1f, "high tag numbers not expected in fixtures");
    let (len, len_bytes) = if data[1] < 0x80 {
        (data[1] as usize, 1)
    } else {
        let n = (data[1] & 0x7f) as usize;
        let len = data[2..2 + n]
            .iter()
            .fold(0usize, |acc, b| (acc << 8) | *b as usize);
        (len, 1 + n)
    };
    let start = 1 + len_bytes;
    let end = start + len;
    if tag & 0x20 == 0 {
        out.extend_from_slice(&data[..end]);
        return end;
    }
    out.extend_from_slice(&[tag, 0x80]);
    let mut pos = start;
    while pos < end {
        pos += reencode(&data[pos..end], out);
    }
    out.extend_from_slice(&[0x00, 0x00]);
    end
}

pub fn utf8_extension(value: &str) -> Vec<u8> {
    let mut out = vec![0x0c, value.len() as u8];
    out.extend_from_slice(value.as_bytes());
    out
}

fn rsa_key() -> PKey<Private> {
    PKey::from_rsa(Rsa::generate(2048).unwrap()).unwrap()
}

fn name(entries: &[(&str, &str)]) -> X509Name {
    let mut b = X509NameBuilder::new().unwrap();
    for (k, v) in entries {
        b.append_entry_by_text(k, v).unwrap();
    }
    b.build()
}

fn serial(hex: &str) -> Asn1Integer {
    BigNum::from_hex_str(hex).unwrap().to_asn1_integer().unwrap()
}

#[allow(clippy::too_many_arguments)]
fn issue(
    subject: &X509Name,
    issuer: &X509Name,
    subject_key: &PKey<Private>,
    issuer_key: &PKey<Private>,
    serial_hex: &str,
    not_after: i64,
    ca: bool,
    pass_type_extension: Option<&[u8]>,
) -> X509 {
    let now = time::OffsetDateTime::now_utc().unix_timestamp();
    let mut b = X509::builder().unwrap();
    b.set_version(2).unwrap();
    b.set_serial_number(&serial(serial_hex)).unwrap();
    b.set_subject_name(subject).unwrap();
    b.set_issuer_name(issuer).unwrap();
    b.set_pubkey(subject_key).unwrap();
    b.set_not_before(&Asn1Time::from_unix(now - 30 * DAY).unwrap())
        .unwrap();
    b.set_not_after(&Asn1Time::from_unix(not_after).unwrap())
        .unwrap();
    if ca {
        b.append_extension(BasicConstraints::new().critical().ca().build().unwrap())
            .unwrap();
    }
    if let Some(value) = pass_type_extension {
        let oid = Asn1Object::from_str(EXTENSION_OID).unwrap();
        let contents = Asn1OctetString::new_from_bytes(value).unwrap();
        b.append_extension(X509Extension::new_from_der(&oid, false, &contents).unwrap())
            .unwrap();
    }
    b.sign(issuer_key, MessageDigest::sha256()).unwrap();
    b.build()
}

pub fn pass_json() -> serde_json::Value {
    serde_json::json!({
        "formatVersion": 1,
        "passTypeIdentifier": PASS_TYPE_ID,
        "teamIdentifier": TEAM_ID,
        "serialNumber": "E5982H-I2-0000001",
        "organizationName": "Example Corp",
        "description": "Example membership card",
        "generic": { "primaryFields": [] }
    })
}

pub fn zip_of(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut zw = ZipWriter::new(Cursor::new(Vec::new()));
    let opts = FileOptions::<()>::default();
    for (name, data) in files {
        zw.start_file(*name, opts).unwrap();
        zw.write_all(data).unwrap();
    }
    zw.finish().unwrap().into_inner()
}

/// A complete pass: descriptor, manifest, signature and all icon densities.
pub fn signed_pass(chain: &Chain, pass: &serde_json::Value) -> Vec<u8> {
    let pass_bytes = serde_json::to_vec(pass).unwrap();
    let signature = chain.sign(MANIFEST);
    zip_of(&[
        ("pass.json", &pass_bytes),
        ("manifest.json", MANIFEST),
        ("signature", &signature),
        ("icon.png", b"\x89PNG"),
        ("icon@2x.png", b"\x89PNG"),
        ("icon@3x.png", b"\x89PNG"),
    ])
}
