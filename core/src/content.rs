use crate::error::{CoreError, CoreResult};
use crate::result::ValidationResult;
use serde_json::{Map, Value};

pub const MIN_SERIAL_NUMBER_LEN: usize = 16;
pub const MIN_AUTHENTICATION_TOKEN_LEN: usize = 16;

/// Identifiers from `pass.json` that are later compared with the signer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentIdentity {
    pub pass_type_identifier: Option<String>,
    pub team_identifier: Option<String>,
}

/// Parses the pass descriptor and records every content check on `result`.
///
/// Nothing is written to `result` unless the bytes parse as a JSON object.
pub fn evaluate_pass_json(bytes: &[u8], result: &mut ValidationResult) -> CoreResult<ContentIdentity> {
    let v: Value = serde_json::from_slice(bytes)
        .map_err(|e| CoreError::ContentMalformed(format!("pass.json: {}", e)))?;
    let obj = v.as_object().ok_or_else(|| {
        CoreError::ContentMalformed("pass.json: top-level value is not an object".to_string())
    })?;

    let pass_type_identifier = string_value(obj, "passTypeIdentifier");
    result.has_pass_type_identifier = is_non_blank(&pass_type_identifier);

    let team_identifier = string_value(obj, "teamIdentifier");
    result.has_team_identifier = is_non_blank(&team_identifier);

    result.has_description = is_non_blank(&string_value(obj, "description"));
    result.has_organization_name = is_non_blank(&string_value(obj, "organizationName"));

    if let Some(fv) = obj.get("formatVersion") {
        // 1.0 is still the number one; "1" is not.
        result.has_format_version = fv.as_i64() == Some(1) || fv.as_f64() == Some(1.0);
    }

    let serial_number = string_value(obj, "serialNumber");
    result.has_serial_number = is_non_blank(&serial_number);
    if result.has_serial_number {
        result.has_serial_number_of_correct_length = serial_number
            .as_deref()
            .map(|s| s.chars().count() >= MIN_SERIAL_NUMBER_LEN)
            .unwrap_or(false);
    }

    if obj.contains_key("appLaunchURL") {
        result.has_app_launch_url = true;
        result.has_associated_store_identifiers = obj.contains_key("associatedStoreIdentifiers");
    }

    if obj.contains_key("webServiceURL") {
        result.has_web_service_url = true;
        result.web_service_url_is_https = string_value(obj, "webServiceURL")
            .map(|u| u.to_ascii_lowercase().starts_with("https://"))
            .unwrap_or(false);
    }

    if obj.contains_key("authenticationToken") {
        result.has_authentication_token = true;
        result.authentication_token_correct_length = string_value(obj, "authenticationToken")
            .map(|t| t.chars().count() >= MIN_AUTHENTICATION_TOKEN_LEN)
            .unwrap_or(false);
    }

    result.authentication_token_requires_web_service_url =
        result.has_authentication_token && !result.has_web_service_url;
    result.web_service_url_requires_authentication_token =
        result.has_web_service_url && !result.has_authentication_token;

    result.pass_type_identifier = pass_type_identifier.clone();
    result.team_identifier = team_identifier.clone();

    Ok(ContentIdentity {
        pass_type_identifier,
        team_identifier,
    })
}

// Scalars read in their textual form; null, objects and arrays count as absent.
fn string_value(obj: &Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn is_non_blank(v: &Option<String>) -> bool {
    v.as_deref().map(|s| !s.trim().is_empty()).unwrap_or(false)
}
