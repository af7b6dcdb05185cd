//! Engine-wide policy data structures and in-memory management.

use once_cell::sync::OnceCell;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::RwLock;
use validator_errors::{usage, ErrorCode, ValidationError};

static POLICY: OnceCell<RwLock<EnginePolicy>> = OnceCell::new();

fn policy_cell() -> &'static RwLock<EnginePolicy> {
    POLICY.get_or_init(|| RwLock::new(EnginePolicy::default()))
}

/// Behaviour when a sandbox expression evaluation fails outside a predicate
/// (where failure always means `false`, never this). Applies to variable
/// updates and any other sandbox fault the engine recovers from locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnSandboxFault {
    /// Log the fault and keep running with the previous binding.
    Record,
    /// Surface the fault as a fatal `ValidationError`, aborting the run.
    Abort,
}

impl OnSandboxFault {
    pub fn is_abort(self) -> bool {
        matches!(self, OnSandboxFault::Abort)
    }
}

impl Default for OnSandboxFault {
    fn default() -> Self {
        OnSandboxFault::Record
    }
}

#[derive(Debug)]
pub struct PolicyParseError(pub ValidationError);

impl FromStr for OnSandboxFault {
    type Err = PolicyParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "record" => Ok(OnSandboxFault::Record),
            "abort" => Ok(OnSandboxFault::Abort),
            other => Err(PolicyParseError(usage!(
                ErrorCode::InvalidPolicyValue,
                "invalid on_sandbox_fault value '{}' (expected 'record' or 'abort')",
                other
            ))),
        }
    }
}

/// Process-wide, environment-overridable ambient configuration layered
/// beneath the explicit per-engine `EngineOptions`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnginePolicy {
    pub log_level: Option<String>,
    pub log_file: Option<PathBuf>,
    pub json_errors: bool,
    pub on_sandbox_fault: OnSandboxFault,
}

impl Default for EnginePolicy {
    fn default() -> Self {
        Self {
            log_level: None,
            log_file: None,
            json_errors: false,
            on_sandbox_fault: OnSandboxFault::default(),
        }
    }
}

impl EnginePolicy {
    /// Snapshot the current process-wide policy.
    pub fn snapshot() -> EnginePolicy {
        policy_cell().read().expect("policy lock poisoned").clone()
    }

    pub(crate) fn apply_update(&mut self, update: PolicyUpdate) {
        if let Some(on_fault) = update.on_sandbox_fault {
            self.on_sandbox_fault = on_fault;
        }
        if let Some(level) = update.log_level {
            self.log_level = match level.trim() {
                "" => None,
                other => Some(other.to_string()),
            };
        }
        if let Some(path) = update.log_file {
            self.log_file = match path {
                PolicyPath::Clear => None,
                PolicyPath::Value(pb) => Some(pb),
            };
        }
        if let Some(json_errors) = update.json_errors {
            self.json_errors = json_errors;
        }
    }
}

/// Internal helper representing path updates (distinguishes "unset" from
/// "explicitly cleared").
#[derive(Debug, Clone)]
pub(crate) enum PolicyPath {
    Clear,
    Value(PathBuf),
}

/// Mutation record for the policy.
#[derive(Debug, Default, Clone)]
pub(crate) struct PolicyUpdate {
    pub(crate) on_sandbox_fault: Option<OnSandboxFault>,
    pub(crate) log_level: Option<String>,
    pub(crate) log_file: Option<PolicyPath>,
    pub(crate) json_errors: Option<bool>,
}

/// Apply the provided update to the global policy and propagate logging changes.
pub(crate) fn apply_policy_update(update: PolicyUpdate) {
    let mut guard = policy_cell().write().expect("policy lock poisoned");
    guard.apply_update(update);
    crate::logging::apply_policy(&guard);
}

#[cfg(test)]
pub(crate) fn reset_policy_for_tests() {
    let mut guard = policy_cell().write().expect("policy lock poisoned");
    *guard = EnginePolicy::default();
}
