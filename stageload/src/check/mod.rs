//! Response checks
//!
//! A check is a named predicate over a [`RequestOutcome`]. Every virtual-user
//! iteration evaluates the full check set and records one [`CheckResult`]
//! per check; failures are counted, never fatal.

mod predicate;
mod types;

pub use predicate::{Check, CheckPredicate, DEFAULT_STATUS_CHECK, default_checks, evaluate_checks};
pub use types::{CheckResult, RequestOutcome, TRANSPORT_FAILURE_STATUS};
