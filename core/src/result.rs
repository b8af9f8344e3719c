use serde::{Deserialize, Serialize};

/// Outcome of the cryptographic check over the manifest.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum SignatureVerification {
    #[default]
    NotAttempted,
    Verified,
    Failed { reason: String },
}

impl SignatureVerification {
    pub fn is_verified(&self) -> bool {
        matches!(self, SignatureVerification::Verified)
    }
}

/// Flat record of every check outcome for one pass.
///
/// Some fields are only meaningful when a prerequisite is true, e.g.
/// `has_serial_number_of_correct_length` requires `has_serial_number`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub has_manifest: bool,
    pub has_pass: bool,
    pub has_signature: bool,
    pub has_icon1x: bool,
    pub has_icon2x: bool,
    pub has_icon3x: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub duplicate_entries: Vec<String>,

    pub has_pass_type_identifier: bool,
    pub has_team_identifier: bool,
    pub has_description: bool,
    pub has_format_version: bool,
    pub has_serial_number: bool,
    pub has_serial_number_of_correct_length: bool,
    pub has_organization_name: bool,
    pub has_app_launch_url: bool,
    pub has_associated_store_identifiers: bool,
    pub has_web_service_url: bool,
    pub web_service_url_is_https: bool,
    pub has_authentication_token: bool,
    pub authentication_token_correct_length: bool,
    pub authentication_token_requires_web_service_url: bool,
    pub web_service_url_requires_authentication_token: bool,

    pub signature_verification: SignatureVerification,
    pub pass_kit_certificate_found: bool,
    pub pass_kit_certificate_name_correct: bool,
    pub pass_kit_certificate_expired: bool,
    pub wwdr_certificate_found: bool,
    pub wwdr_certificate_expired: bool,
    pub wwdr_certificate_subject_matches: bool,
    pub wwdr_certificate_is_correct_version: bool,
    pub signed_by_apple: bool,
    pub has_signature_expired: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature_expiration_date: Option<String>,

    pub pass_type_identifier_matches: bool,
    pub team_identifier_matches: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pass_type_identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature_pass_type_identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature_team_identifier: Option<String>,
}

impl ValidationResult {
    /// Looks up a boolean check by its serialized (camelCase) name.
    pub fn flag(&self, field: &str) -> Option<bool> {
        let v = match field {
            "hasManifest" => self.has_manifest,
            "hasPass" => self.has_pass,
            "hasSignature" => self.has_signature,
            "hasIcon1x" => self.has_icon1x,
            "hasIcon2x" => self.has_icon2x,
            "hasIcon3x" => self.has_icon3x,
            "hasPassTypeIdentifier" => self.has_pass_type_identifier,
            "hasTeamIdentifier" => self.has_team_identifier,
            "hasDescription" => self.has_description,
            "hasFormatVersion" => self.has_format_version,
            "hasSerialNumber" => self.has_serial_number,
            "hasSerialNumberOfCorrectLength" => self.has_serial_number_of_correct_length,
            "hasOrganizationName" => self.has_organization_name,
            "hasAppLaunchUrl" => self.has_app_launch_url,
            "hasAssociatedStoreIdentifiers" => self.has_associated_store_identifiers,
            "hasWebServiceUrl" => self.has_web_service_url,
            "webServiceUrlIsHttps" => self.web_service_url_is_https,
            "hasAuthenticationToken" => self.has_authentication_token,
            "authenticationTokenCorrectLength" => self.authentication_token_correct_length,
            "authenticationTokenRequiresWebServiceUrl" => {
                self.authentication_token_requires_web_service_url
            }
            "webServiceUrlRequiresAuthenticationToken" => {
                self.web_service_url_requires_authentication_token
            }
            "signatureVerified" => self.signature_verification.is_verified(),
            "passKitCertificateFound" => self.pass_kit_certificate_found,
            "passKitCertificateNameCorrect" => self.pass_kit_certificate_name_correct,
            "passKitCertificateExpired" => self.pass_kit_certificate_expired,
            "wwdrCertificateFound" => self.wwdr_certificate_found,
            "wwdrCertificateExpired" => self.wwdr_certificate_expired,
            "wwdrCertificateSubjectMatches" => self.wwdr_certificate_subject_matches,
            "wwdrCertificateIsCorrectVersion" => self.wwdr_certificate_is_correct_version,
            "signedByApple" => self.signed_by_apple,
            "hasSignatureExpired" => self.has_signature_expired,
            "passTypeIdentifierMatches" => self.pass_type_identifier_matches,
            "teamIdentifierMatches" => self.team_identifier_matches,
            _ => return None,
        };
        Some(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verification_serializes_with_status_tag() {
        let failed = SignatureVerification::Failed {
            reason: "messageDigest mismatch".to_string(),
        };
        let v = serde_json::to_value(&failed).unwrap();
        assert_eq!(v["status"], "failed");
        assert_eq!(v["reason"], "messageDigest mismatch");

        let v = serde_json::to_value(SignatureVerification::NotAttempted).unwrap();
        assert_eq!(v, serde_json::json!({"status": "notAttempted"}));
    }

    #[test]
    fn flag_names_match_serialized_keys() {
        let r = ValidationResult {
            has_serial_number_of_correct_length: true,
            wwdr_certificate_is_correct_version: true,
            ..Default::default()
        };
        let v = serde_json::to_value(&r).unwrap();
        let obj = v.as_object().unwrap();
        for (k, val) in obj {
            if let Some(b) = val.as_bool() {
                assert_eq!(r.flag(k), Some(b), "flag {}", k);
            }
        }
        assert_eq!(r.flag("signatureVerified"), Some(false));
        assert_eq!(r.flag("noSuchField"), None);
    }
}
