//! Process-wide engine policy: ambient configuration layered beneath
//! the explicit per-engine `EngineOptions`.

mod env;
mod model;

pub use env::{
    configure_policy_from_env, ENV_JSON_ERRORS, ENV_LOG_FILE, ENV_LOG_LEVEL, ENV_ON_SANDBOX_FAULT,
};
pub use model::{EnginePolicy, OnSandboxFault, PolicyParseError};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::model::reset_policy_for_tests;

    #[test]
    fn default_policy_records_sandbox_faults() {
        reset_policy_for_tests();
        assert_eq!(EnginePolicy::snapshot().on_sandbox_fault, OnSandboxFault::Record);
    }
}
