//! Certificate classification and identity cross-checks.

pub mod dn;

use crate::config::TrustAnchorConfig;
use crate::content::ContentIdentity;
use crate::result::ValidationResult;
use crate::signature::SignerReference;
use der::asn1::ObjectIdentifier;
use time::macros::format_description;
use time::OffsetDateTime;
use x509_cert::Certificate;

pub use dn::{parse_dn_attribute, render_name};

const TAG_UTF8_STRING: u8 = 0x0c;
const TAG_PRINTABLE_STRING: u8 = 0x13;
const TAG_IA5_STRING: u8 = 0x16;

/// The two certificates the checks care about, picked out of the signed data.
#[derive(Debug, Default)]
pub struct ClassifiedChain<'a> {
    /// Issued by the root authority (the WWDR certificate).
    pub intermediate: Option<&'a Certificate>,
    /// Issued by the trust anchor (the pass type certificate).
    pub leaf: Option<&'a Certificate>,
}

/// Identity claimed by the signer certificate's subject.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignerClaims {
    pub pass_type_identifier: Option<String>,
    pub team_identifier: Option<String>,
}

pub fn issuer_string(cert: &Certificate) -> String {
    render_name(&cert.tbs_certificate.issuer)
}

pub fn subject_string(cert: &Certificate) -> String {
    render_name(&cert.tbs_certificate.subject)
}

pub fn serial_hex(cert: &Certificate) -> String {
    hex::encode_upper(cert.tbs_certificate.serial_number.as_bytes())
}

pub fn not_after(cert: &Certificate) -> OffsetDateTime {
    let secs = cert
        .tbs_certificate
        .validity
        .not_after
        .to_unix_duration()
        .as_secs();
    OffsetDateTime::UNIX_EPOCH.saturating_add(time::Duration::seconds(
        i64::try_from(secs).unwrap_or(i64::MAX),
    ))
}

/// A certificate whose `notAfter` equals `now` is still valid.
pub fn is_expired(not_after: OffsetDateTime, now: OffsetDateTime) -> bool {
    not_after < now
}

pub fn format_expiration(ts: OffsetDateTime) -> Option<String> {
    ts.format(format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second]"
    ))
    .ok()
}

/// First certificate whose issuer carries the root marker is the intermediate;
/// first whose issuer equals the trust anchor subject is the leaf.
pub fn classify<'a>(certs: &'a [Certificate], cfg: &TrustAnchorConfig) -> ClassifiedChain<'a> {
    let mut chain = ClassifiedChain::default();
    for cert in certs {
        let issuer = issuer_string(cert);
        if issuer.contains(&cfg.root_issuer_marker) && chain.intermediate.is_none() {
            tracing::debug!(subject = %subject_string(cert), "classified intermediate certificate");
            chain.intermediate = Some(cert);
        }
        if issuer == cfg.trust_anchor_subject && chain.leaf.is_none() {
            tracing::debug!(subject = %subject_string(cert), "classified pass type certificate");
            chain.leaf = Some(cert);
        }
    }
    chain
}

/// Decodes the pass type identifier carried in the custom extension value.
///
/// Only a short-form UTF8String, IA5String or PrintableString is accepted;
/// anything else yields `None`.
pub fn extension_identifier(raw: &[u8]) -> Option<String> {
    let (&tag, rest) = raw.split_first()?;
    if !matches!(tag, TAG_UTF8_STRING | TAG_IA5_STRING | TAG_PRINTABLE_STRING) {
        return None;
    }
    let (&len, body) = rest.split_first()?;
    if len >= 0x80 || usize::from(len) != body.len() || !body.is_ascii() {
        return None;
    }
    String::from_utf8(body.to_vec()).ok()
}

fn leaf_name_correct(
    leaf: &Certificate,
    oid: &ObjectIdentifier,
    content_pass_type: Option<&str>,
) -> bool {
    let extensions = match &leaf.tbs_certificate.extensions {
        Some(exts) => exts,
        None => return false,
    };
    let mut correct = false;
    for ext in extensions.iter().filter(|e| &e.extn_id == oid) {
        correct = match extension_identifier(ext.extn_value.as_bytes()) {
            Some(id) => Some(id.as_str()) == content_pass_type,
            None => {
                tracing::warn!(oid = %oid, "unexpected encoding of pass type extension");
                false
            }
        };
    }
    correct
}

/// Runs every certificate check and returns the signer's identity claims.
pub fn check_chain(
    certs: &[Certificate],
    signer: Option<&SignerReference>,
    cfg: &TrustAnchorConfig,
    extension_oid: &ObjectIdentifier,
    content: &ContentIdentity,
    now: OffsetDateTime,
    result: &mut ValidationResult,
) -> SignerClaims {
    let chain = classify(certs, cfg);
    let mut claims = SignerClaims::default();

    if let Some(leaf) = chain.leaf {
        result.pass_kit_certificate_found = true;
        result.pass_kit_certificate_name_correct = leaf_name_correct(
            leaf,
            extension_oid,
            content.pass_type_identifier.as_deref(),
        );
        result.pass_kit_certificate_expired = is_expired(not_after(leaf), now);
    }

    let intermediate = match chain.intermediate {
        Some(c) => c,
        None => {
            tracing::debug!("no intermediate certificate issued by the root authority");
            result.signed_by_apple = false;
            return claims;
        }
    };

    result.wwdr_certificate_found = true;
    result.wwdr_certificate_expired = is_expired(not_after(intermediate), now);
    result.wwdr_certificate_subject_matches =
        subject_string(intermediate) == cfg.trust_anchor_subject;
    result.wwdr_certificate_is_correct_version = cfg.is_allowed_serial(&serial_hex(intermediate));

    result.signed_by_apple = signer
        .and_then(|s| s.issuer.as_deref())
        .map(|issuer| issuer == cfg.trust_anchor_subject)
        .unwrap_or(false);
    if !result.signed_by_apple {
        return claims;
    }

    if let Some(cert) = signer.and_then(|s| s.certificate.as_ref()) {
        let subject = subject_string(cert);
        claims.pass_type_identifier = parse_dn_attribute(&subject, "CN")
            .into_iter()
            .next()
            .map(|cn| cn.replace(&cfg.signer_cn_prefix, ""));
        claims.team_identifier = parse_dn_attribute(&subject, "OU").into_iter().next();

        let expires = not_after(cert);
        result.has_signature_expired = is_expired(expires, now);
        result.signature_expiration_date = format_expiration(expires);
    }

    result.signature_pass_type_identifier = claims.pass_type_identifier.clone();
    result.signature_team_identifier = claims.team_identifier.clone();
    claims
}

/// Exact, case-sensitive comparison; a missing side never matches.
pub fn identifiers_match(content: Option<&str>, signature: Option<&str>) -> bool {
    match (content, signature) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}
