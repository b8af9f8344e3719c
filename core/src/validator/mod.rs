pub mod checklist;

use crate::archive::extract_entries;
use crate::certificate::{check_chain, identifiers_match, SignerClaims};
use crate::config::{TrustAnchorConfig, DEFAULT_PASS_TYPE_EXTENSION_OID};
use crate::content::{evaluate_pass_json, ContentIdentity};
use crate::error::CoreResult;
use crate::result::ValidationResult;
use crate::signature::decode_signature;
use der::asn1::ObjectIdentifier;
use time::OffsetDateTime;

const DEFAULT_EXTENSION_OID: ObjectIdentifier =
    ObjectIdentifier::new_unwrap(DEFAULT_PASS_TYPE_EXTENSION_OID);

/// Validates pass archives against a fixed set of trust anchors.
///
/// Holds no mutable state, so one validator can be shared across threads.
#[derive(Debug, Clone)]
pub struct PassValidator {
    config: TrustAnchorConfig,
    extension_oid: ObjectIdentifier,
}

impl Default for PassValidator {
    fn default() -> Self {
        Self {
            config: TrustAnchorConfig::default(),
            extension_oid: DEFAULT_EXTENSION_OID,
        }
    }
}

impl PassValidator {
    pub fn new(config: TrustAnchorConfig) -> CoreResult<Self> {
        let (config, extension_oid) = config.validate()?;
        Ok(Self {
            config,
            extension_oid,
        })
    }

    pub fn config(&self) -> &TrustAnchorConfig {
        &self.config
    }

    pub fn validate(&self, pass_bytes: &[u8]) -> CoreResult<ValidationResult> {
        self.validate_at(pass_bytes, OffsetDateTime::now_utc())
    }

    /// Validates with certificate expiry evaluated against `now`.
    pub fn validate_at(
        &self,
        pass_bytes: &[u8],
        now: OffsetDateTime,
    ) -> CoreResult<ValidationResult> {
        let mut result = ValidationResult::default();

        let entries = extract_entries(pass_bytes, &mut result)?;

        let content = match &entries.pass {
            Some(bytes) => evaluate_pass_json(bytes, &mut result)?,
            None => ContentIdentity::default(),
        };

        let manifest = match &entries.manifest {
            Some(m) => m,
            None => return Ok(result),
        };

        let mut claims = SignerClaims::default();
        if let Some(signature) = &entries.signature {
            let decoded = decode_signature(manifest, signature)?;
            result.signature_verification = decoded.verification.clone();
            claims = check_chain(
                &decoded.certificates,
                decoded.signer.as_ref(),
                &self.config,
                &self.extension_oid,
                &content,
                now,
                &mut result,
            );
        } else {
            tracing::debug!("manifest present without signature; skipping signature checks");
        }

        result.pass_type_identifier_matches = identifiers_match(
            content.pass_type_identifier.as_deref(),
            claims.pass_type_identifier.as_deref(),
        );
        result.team_identifier_matches = identifiers_match(
            content.team_identifier.as_deref(),
            claims.team_identifier.as_deref(),
        );

        Ok(result)
    }
}
