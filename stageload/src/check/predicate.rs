//! Check predicates and evaluation

use serde::{Deserialize, Serialize};

use super::types::{CheckResult, RequestOutcome};

/// Name of the check applied when a run configures none
pub const DEFAULT_STATUS_CHECK: &str = "http response status code is 200";

/// Assertion over the status code and headers of a response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CheckPredicate {
    /// Status code equals `status`
    StatusEquals { status: u16 },
    /// Status code within `[min, max]`
    StatusInRange { min: u16, max: u16 },
    /// Header present with exactly `value`
    HeaderEquals { header: String, value: String },
    /// Header present with any value
    HeaderPresent { header: String },
    /// Header not present
    HeaderAbsent { header: String },
}

impl CheckPredicate {
    /// Evaluate against a response that actually arrived
    pub fn matches(&self, outcome: &RequestOutcome) -> bool {
        match self {
            CheckPredicate::StatusEquals { status } => outcome.status_code == *status,
            CheckPredicate::StatusInRange { min, max } => {
                (*min..=*max).contains(&outcome.status_code)
            }
            CheckPredicate::HeaderEquals { header, value } => {
                outcome.header(header) == Some(value.as_str())
            }
            CheckPredicate::HeaderPresent { header } => outcome.header(header).is_some(),
            CheckPredicate::HeaderAbsent { header } => outcome.header(header).is_none(),
        }
    }
}

/// A named assertion, configured per run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Check {
    pub name: String,
    #[serde(flatten)]
    pub predicate: CheckPredicate,
}

impl Check {
    pub fn new(name: impl Into<String>, predicate: CheckPredicate) -> Self {
        Self {
            name: name.into(),
            predicate,
        }
    }

    pub fn status_equals(name: impl Into<String>, status: u16) -> Self {
        Self::new(name, CheckPredicate::StatusEquals { status })
    }

    pub fn header_equals(
        name: impl Into<String>,
        header: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::new(
            name,
            CheckPredicate::HeaderEquals {
                header: header.into(),
                value: value.into(),
            },
        )
    }

    /// Evaluate this check; a transport failure fails every check
    pub fn evaluate(&self, outcome: &RequestOutcome) -> CheckResult<'_> {
        CheckResult {
            name: &self.name,
            passed: !outcome.is_transport_failure() && self.predicate.matches(outcome),
        }
    }
}

/// Evaluate every check, preserving configuration order
pub fn evaluate_checks<'a>(checks: &'a [Check], outcome: &RequestOutcome) -> Vec<CheckResult<'a>> {
    checks.iter().map(|check| check.evaluate(outcome)).collect()
}

/// Check set used when none is configured
pub fn default_checks() -> Vec<Check> {
    vec![Check::status_equals(DEFAULT_STATUS_CHECK, 200)]
}
