//! Environment variable parsing for engine policy overrides.

use crate::policy::model::{apply_policy_update, OnSandboxFault, PolicyPath, PolicyUpdate};
use std::env;
use std::str::FromStr;
use validator_errors::{usage, ErrorCode, ValidationResult};

/// Environment variable controlling the engine's log level filter.
pub const ENV_LOG_LEVEL: &str = "VALIDATOR_LOG_LEVEL";
/// Environment variable pointing to a log destination file.
pub const ENV_LOG_FILE: &str = "VALIDATOR_LOG_FILE";
/// Environment variable enabling JSON error trailers on stderr.
pub const ENV_JSON_ERRORS: &str = "VALIDATOR_JSON_ERRORS";
/// Environment variable configuring how the engine reacts to a sandbox fault.
pub const ENV_ON_SANDBOX_FAULT: &str = "VALIDATOR_ON_SANDBOX_FAULT";

/// Load policy overrides from environment variables.
pub fn configure_policy_from_env() -> ValidationResult<()> {
    let mut update = PolicyUpdate::default();

    if let Ok(value) = env::var(ENV_ON_SANDBOX_FAULT) {
        let on_fault = OnSandboxFault::from_str(&value).map_err(|err| err.0)?;
        update.on_sandbox_fault = Some(on_fault);
    }

    if let Ok(value) = env::var(ENV_LOG_LEVEL) {
        update.log_level = Some(value);
    }

    if let Ok(value) = env::var(ENV_LOG_FILE) {
        let path = if value.trim().is_empty() {
            PolicyPath::Clear
        } else {
            PolicyPath::Value(value.into())
        };
        update.log_file = Some(path);
    }

    if let Ok(value) = env::var(ENV_JSON_ERRORS) {
        update.json_errors = Some(parse_bool(&value)?);
    }

    apply_policy_update(update);
    Ok(())
}

fn parse_bool(value: &str) -> ValidationResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" => Ok(true),
        "0" | "false" | "f" | "no" | "n" => Ok(false),
        other => Err(usage!(
            ErrorCode::InvalidPolicyValue,
            "invalid boolean value '{}' (expected true/false)",
            other
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::model::{reset_policy_for_tests, EnginePolicy};
    use std::path::Path;

    #[test]
    fn configure_policy_from_env_updates_fields() {
        let _guard = EnvGuard;
        reset_policy_for_tests();
        std::env::set_var(ENV_ON_SANDBOX_FAULT, "abort");
        std::env::set_var(ENV_LOG_LEVEL, "info");
        std::env::set_var(ENV_LOG_FILE, "/tmp/out.log");
        std::env::set_var(ENV_JSON_ERRORS, "yes");

        configure_policy_from_env().expect("configure from env");
        let snap = EnginePolicy::snapshot();
        assert_eq!(snap.on_sandbox_fault, OnSandboxFault::Abort);
        assert_eq!(snap.log_level.as_deref(), Some("info"));
        assert_eq!(snap.log_file.as_deref(), Some(Path::new("/tmp/out.log")));
        assert!(snap.json_errors);
        reset_policy_for_tests();
    }

    #[test]
    fn configure_policy_from_env_rejects_invalid_boolean() {
        let _guard = EnvGuard;
        reset_policy_for_tests();
        std::env::set_var(ENV_JSON_ERRORS, "sometimes");

        let err = configure_policy_from_env().expect_err("invalid bool should error");
        assert_eq!(err.code, ErrorCode::InvalidPolicyValue);
        reset_policy_for_tests();
    }

    #[test]
    fn configure_policy_from_env_rejects_invalid_sandbox_fault_value() {
        let _guard = EnvGuard;
        reset_policy_for_tests();
        std::env::set_var(ENV_ON_SANDBOX_FAULT, "retry");

        let err = configure_policy_from_env().expect_err("invalid value should error");
        assert_eq!(err.code, ErrorCode::InvalidPolicyValue);
        reset_policy_for_tests();
    }

    struct EnvGuard;

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for key in [
                ENV_ON_SANDBOX_FAULT,
                ENV_LOG_LEVEL,
                ENV_LOG_FILE,
                ENV_JSON_ERRORS,
            ] {
                std::env::remove_var(key);
            }
        }
    }
}
