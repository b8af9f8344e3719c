//! Distinguished-name helpers.
//!
//! Names are rendered most-specific first (`CN=…, OU=…, O=…, C=…`) so they
//! can be compared against the configured trust-anchor subject string.

use der::asn1::ObjectIdentifier;
use der::{Tag, Tagged};
use x509_cert::attr::AttributeTypeAndValue;
use x509_cert::name::Name;

const SHORT_NAMES: &[(&str, &str)] = &[
    ("2.5.4.3", "CN"),
    ("2.5.4.4", "SN"),
    ("2.5.4.5", "SERIALNUMBER"),
    ("2.5.4.6", "C"),
    ("2.5.4.7", "L"),
    ("2.5.4.8", "S"),
    ("2.5.4.9", "STREET"),
    ("2.5.4.10", "O"),
    ("2.5.4.11", "OU"),
    ("2.5.4.12", "T"),
    ("2.5.4.42", "G"),
    ("1.2.840.113549.1.9.1", "E"),
    ("0.9.2342.19200300.100.1.25", "DC"),
];

/// Renders `name` as `CN=…, OU=…, O=…, C=…`.
pub fn render_name(name: &Name) -> String {
    name.0
        .iter()
        .rev()
        .map(|rdn| {
            rdn.0
                .iter()
                .map(render_atv)
                .collect::<Vec<_>>()
                .join(" + ")
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn render_atv(atv: &AttributeTypeAndValue) -> String {
    format!("{}={}", short_name(&atv.oid), render_value(atv))
}

fn short_name(oid: &ObjectIdentifier) -> String {
    let dotted = oid.to_string();
    SHORT_NAMES
        .iter()
        .find(|(o, _)| *o == dotted)
        .map(|(_, n)| n.to_string())
        .unwrap_or_else(|| format!("OID.{}", dotted))
}

fn render_value(atv: &AttributeTypeAndValue) -> String {
    let raw = atv.value.value();
    match atv.value.tag() {
        Tag::Utf8String | Tag::PrintableString | Tag::Ia5String | Tag::VisibleString => {
            String::from_utf8_lossy(raw).into_owned()
        }
        // T.61 in practice carries Latin-1.
        Tag::TeletexString => raw.iter().map(|&b| b as char).collect(),
        Tag::BmpString => {
            let units: Vec<u16> = raw
                .chunks_exact(2)
                .map(|c| u16::from_be_bytes([c[0], c[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
        _ => format!("#{}", hex::encode(raw)),
    }
}

/// Returns every value of `key` in a rendered DN string, in order.
///
/// A value runs from `KEY=` to the next comma, or to the end of the string.
/// An empty value stops the scan. Escaped or quoted commas are not understood.
pub fn parse_dn_attribute(subject: &str, key: &str) -> Vec<String> {
    let needle = if key.ends_with('=') {
        key.to_string()
    } else {
        format!("{}=", key)
    };

    let mut values = Vec::new();
    let mut rest = subject;
    while let Some(pos) = rest.find(&needle) {
        let tail = &rest[pos + needle.len()..];
        match tail.find(',') {
            Some(0) => break,
            Some(end) => {
                values.push(tail[..end].to_string());
                rest = &tail[end..];
            }
            None => {
                values.push(tail.to_string());
                break;
            }
        }
    }
    values
}
