use crate::error::{CoreError, CoreResult};
use der::asn1::ObjectIdentifier;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const DEFAULT_TRUST_ANCHOR_SUBJECT: &str = "CN=Apple Worldwide Developer Relations Certification Authority, OU=Apple Worldwide Developer Relations, O=Apple Inc., C=US";
pub const DEFAULT_WWDR_SERIAL: &str = "01DEBCC4396DA010";
pub const DEFAULT_PASS_TYPE_EXTENSION_OID: &str = "1.2.840.113635.100.6.1.16";
pub const DEFAULT_ROOT_ISSUER_MARKER: &str = "OU=Apple Certification Authority";
pub const DEFAULT_SIGNER_CN_PREFIX: &str = "Pass Type ID: ";

/// Trust anchors the certificate checks are evaluated against.
///
/// Every field has a default, so a JSON override only needs the keys it
/// rotates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct TrustAnchorConfig {
    /// Expected subject of the WWDR intermediate, and the issuer of pass
    /// type certificates.
    pub trust_anchor_subject: String,
    /// Upper-case hex serial numbers of accepted WWDR intermediates.
    pub allowed_serial_numbers: BTreeSet<String>,
    /// Dotted OID of the extension carrying the pass type identifier.
    pub pass_type_extension_oid: String,
    /// Substring of an issuer DN that marks a certificate as issued by the root.
    pub root_issuer_marker: String,
    /// Literal prefix on the signer CN ahead of the pass type identifier.
    pub signer_cn_prefix: String,
}

impl Default for TrustAnchorConfig {
    fn default() -> Self {
        Self {
            trust_anchor_subject: DEFAULT_TRUST_ANCHOR_SUBJECT.to_string(),
            allowed_serial_numbers: BTreeSet::from([DEFAULT_WWDR_SERIAL.to_string()]),
            pass_type_extension_oid: DEFAULT_PASS_TYPE_EXTENSION_OID.to_string(),
            root_issuer_marker: DEFAULT_ROOT_ISSUER_MARKER.to_string(),
            signer_cn_prefix: DEFAULT_SIGNER_CN_PREFIX.to_string(),
        }
    }
}

impl TrustAnchorConfig {
    pub fn from_json_slice(bytes: &[u8]) -> CoreResult<Self> {
        let cfg: TrustAnchorConfig = serde_json::from_slice(bytes)?;
        Ok(cfg)
    }

    /// Canonicalizes the config and parses the extension OID.
    pub fn validate(mut self) -> CoreResult<(Self, ObjectIdentifier)> {
        if self.trust_anchor_subject.trim().is_empty() {
            return Err(CoreError::InvalidConfig(
                "trustAnchorSubject must not be empty".to_string(),
            ));
        }
        if self.root_issuer_marker.trim().is_empty() {
            return Err(CoreError::InvalidConfig(
                "rootIssuerMarker must not be empty".to_string(),
            ));
        }

        let oid = ObjectIdentifier::new(self.pass_type_extension_oid.trim()).map_err(|e| {
            CoreError::InvalidConfig(format!(
                "passTypeExtensionOid {:?}: {}",
                self.pass_type_extension_oid, e
            ))
        })?;
        self.pass_type_extension_oid = oid.to_string();

        let mut serials = BTreeSet::new();
        for s in &self.allowed_serial_numbers {
            let normalized = s.trim().replace(':', "").to_ascii_uppercase();
            if normalized.is_empty() || !normalized.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(CoreError::InvalidConfig(format!(
                    "allowedSerialNumbers entry {:?} is not hex",
                    s
                )));
            }
            serials.insert(normalized);
        }
        self.allowed_serial_numbers = serials;

        Ok((self, oid))
    }

    pub fn is_allowed_serial(&self, serial_hex: &str) -> bool {
        self.allowed_serial_numbers
            .contains(&serial_hex.to_ascii_uppercase())
    }
}
