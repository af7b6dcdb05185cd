//! The validation report produced by one `ValidationEngine::validate` call:
//! a compliance verdict plus the individual assertions the result collector
//! accumulated along the way.

use crate::sandbox::ResolvedArgument;
use std::collections::HashMap;

/// How a run ended. `Cancelled` carries the reason supplied to
/// `ValidationEngine::cancel`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobEndStatus {
    Normal,
    Cancelled(String),
    Errored,
}

/// A single rule evaluation outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssertionStatus {
    Passed,
    Failed,
}

/// Where in the object graph an assertion fired.
#[derive(Debug, Clone)]
pub struct Location {
    pub root_type: String,
    pub context_path: String,
}

/// One PASS/FAIL record.
#[derive(Debug, Clone)]
pub struct TestAssertion {
    pub ordinal: u64,
    pub rule_id: String,
    pub status: AssertionStatus,
    pub description: String,
    pub location: Location,
    pub object_context: String,
    pub error_message: Option<String>,
    pub arguments: Vec<ResolvedArgument>,
}

/// The outcome of a complete (or cancelled) traversal.
#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub is_compliant: bool,
    pub assertions: Vec<TestAssertion>,
    pub failed_counts: HashMap<String, u64>,
    pub total_tests: u64,
    pub job_end_status: JobEndStatus,
}
