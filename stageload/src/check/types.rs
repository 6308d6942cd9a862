//! Request outcome and check result types

use std::collections::HashMap;

/// Status code used for requests that never produced a response
pub const TRANSPORT_FAILURE_STATUS: u16 = 0;

/// What a single request produced
///
/// Header names are stored lowercase so lookups are case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOutcome {
    /// HTTP status code, or [`TRANSPORT_FAILURE_STATUS`] if the request failed
    pub status_code: u16,
    /// Response headers keyed by lowercase name
    pub headers: HashMap<String, String>,
}

impl RequestOutcome {
    pub fn new(status_code: u16) -> Self {
        Self {
            status_code,
            headers: HashMap::new(),
        }
    }

    /// Outcome recorded when the request failed before a response arrived
    pub fn transport_failure() -> Self {
        Self::new(TRANSPORT_FAILURE_STATUS)
    }

    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.insert_header(name, value);
        self
    }

    pub fn insert_header(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
    }

    /// Look up a header value by case-insensitive name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn is_transport_failure(&self) -> bool {
        self.status_code == TRANSPORT_FAILURE_STATUS
    }
}

/// Result of evaluating one named check against one outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckResult<'a> {
    pub name: &'a str,
    pub passed: bool,
}
