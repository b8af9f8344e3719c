use crate::error::CoreResult;
use crate::result::ValidationResult;
use serde::{Deserialize, Serialize};

#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Severity {
    BLOCKER,
    WARNING,
}

#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CheckOutcome {
    PASS,
    FAIL,
    NOT_APPLICABLE,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checklist {
    pub checklist_version: String,
    pub checks: Vec<ChecklistCheck>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistCheck {
    pub check_id: String,
    /// Boolean field of [`ValidationResult`], by serialized name.
    pub field: String,
    pub severity: Severity,
    pub expected: bool,
    /// Prerequisite field; the check does not apply while it is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires: Option<String>,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResult {
    pub check_id: String,
    pub severity: Severity,
    pub result: CheckOutcome,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistReport {
    pub checklist_version: String,
    pub overall: CheckOutcome,
    pub checks: Vec<CheckResult>,
}

impl ChecklistReport {
    pub fn failed(&self) -> impl Iterator<Item = &CheckResult> {
        self.checks.iter().filter(|c| c.result == CheckOutcome::FAIL)
    }
}

pub fn checklist_v1() -> CoreResult<Checklist> {
    let json = include_str!("checklist_v1.json");
    Ok(serde_json::from_str(json)?)
}

/// Maps every check onto `result`; overall fails when any BLOCKER fails.
pub fn evaluate_checklist(result: &ValidationResult, checklist: &Checklist) -> ChecklistReport {
    let checks: Vec<CheckResult> = checklist
        .checks
        .iter()
        .map(|check| evaluate_check(result, check))
        .collect();

    let overall = if checks
        .iter()
        .any(|c| c.severity == Severity::BLOCKER && c.result == CheckOutcome::FAIL)
    {
        CheckOutcome::FAIL
    } else {
        CheckOutcome::PASS
    };

    ChecklistReport {
        checklist_version: checklist.checklist_version.clone(),
        overall,
        checks,
    }
}

fn evaluate_check(result: &ValidationResult, check: &ChecklistCheck) -> CheckResult {
    let outcome = |result: CheckOutcome, message: String| CheckResult {
        check_id: check.check_id.clone(),
        severity: check.severity,
        result,
        message,
    };

    if let Some(req) = &check.requires {
        match result.flag(req) {
            Some(true) => {}
            Some(false) => {
                return outcome(CheckOutcome::NOT_APPLICABLE, format!("{} is false", req));
            }
            None => return outcome(CheckOutcome::FAIL, format!("unknown field {}", req)),
        }
    }

    match result.flag(&check.field) {
        Some(v) if v == check.expected => outcome(CheckOutcome::PASS, "ok".to_string()),
        Some(v) => outcome(
            CheckOutcome::FAIL,
            format!("{}: expected {}, got {}", check.field, check.expected, v),
        ),
        None => outcome(CheckOutcome::FAIL, format!("unknown field {}", check.field)),
    }
}
