//! Reference TOML-based profile loader, composing one or more documents
//! into a `Profile`: inline sources first, then files, in the order given,
//! with each document's bytes hashed for provenance.

use crate::profile::profile::{Profile, ProfileBuilder, ProfileSource};
use crate::profile::rule::{ErrorArgument, Rule};
use crate::profile::variable::Variable;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use validator_errors::{usage, ErrorCode, ValidationResult};

/// Load a profile from one or more TOML files on disk.
pub fn load_profile(paths: &[PathBuf]) -> ValidationResult<Profile> {
    load_profile_from_inline_and_paths(&[], paths)
}

/// Load a profile composed from inline TOML sources followed by files.
pub fn load_profile_from_inline_and_paths(
    inline: &[(&str, &str)],
    paths: &[PathBuf],
) -> ValidationResult<Profile> {
    if inline.is_empty() && paths.is_empty() {
        return Err(usage!(
            ErrorCode::InvalidProfile,
            "no profile sources supplied"
        ));
    }

    let mut aggregator = ProfileAggregator::default();
    for (label, contents) in inline {
        aggregator.ingest_inline(label, contents)?;
    }
    for path in paths {
        aggregator.ingest_file(path)?;
    }
    aggregator.finish()
}

#[derive(Default)]
struct ProfileAggregator {
    builder: ProfileBuilder,
}

impl ProfileAggregator {
    fn ingest_file(&mut self, path: &Path) -> ValidationResult<()> {
        let contents = fs::read_to_string(path).map_err(|err| {
            usage!(
                ErrorCode::InvalidProfile,
                "failed to read profile '{}': {}",
                path.display(),
                err
            )
        })?;
        self.ingest_source(path, &contents)
    }

    fn ingest_inline(&mut self, label: &str, contents: &str) -> ValidationResult<()> {
        let pseudo_path = PathBuf::from(format!("<inline:{label}>"));
        self.ingest_source(&pseudo_path, contents)
    }

    fn ingest_source(&mut self, path: &Path, contents: &str) -> ValidationResult<()> {
        let checksum = calculate_sha256(contents);
        let raw: RawProfileFile = toml::from_str(contents).map_err(|err| {
            usage!(
                ErrorCode::InvalidProfile,
                "failed to parse profile '{}': {}",
                path.display(),
                err
            )
        })?;

        if raw.meta.name.trim().is_empty() {
            return Err(usage!(
                ErrorCode::InvalidProfile,
                "'meta.name' must not be empty in '{}'",
                path.display()
            ));
        }
        if raw.meta.version < 1 {
            return Err(usage!(
                ErrorCode::InvalidProfile,
                "'meta.version' must be >= 1 in '{}'",
                path.display()
            ));
        }

        self.builder.add_source(ProfileSource {
            path: path.to_path_buf(),
            sha256: checksum,
            name: raw.meta.name.clone(),
            version: raw.meta.version,
        });

        for raw_variable in raw.variable.unwrap_or_default() {
            self.builder.add_variable(Variable::new(
                raw_variable.name,
                raw_variable.target_type,
                raw_variable.default,
                raw_variable.update,
            ));
        }

        for (idx, raw_rule) in raw.rule.unwrap_or_default().into_iter().enumerate() {
            let location = format!("{} rule[{}]", path.display(), idx);
            if raw_rule.rule_id.trim().is_empty() {
                return Err(usage!(
                    ErrorCode::InvalidRule,
                    "'rule_id' must not be empty in {}",
                    location
                ));
            }
            let mut rule = Rule::new(raw_rule.rule_id, raw_rule.target_type, raw_rule.predicate)
                .with_description(raw_rule.description.unwrap_or_default())
                .with_error_template(raw_rule.error_template.unwrap_or_default());
            if raw_rule.deferred.unwrap_or(false) {
                rule = rule.deferred();
            }
            for arg in raw_rule.error_arguments.unwrap_or_default() {
                rule.error_arguments.push(ErrorArgument {
                    name: arg.name,
                    expression: arg.expression,
                });
            }
            self.builder.add_rule(rule).map_err(|err| {
                usage!(
                    ErrorCode::InvalidRule,
                    "invalid rule in {}: {}",
                    location,
                    err.message()
                )
            })?;
        }

        Ok(())
    }

    fn finish(self) -> ValidationResult<Profile> {
        Ok(self.builder.build())
    }
}

fn calculate_sha256(contents: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(contents.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawProfileFile {
    meta: RawMeta,
    #[serde(default)]
    variable: Option<Vec<RawVariable>>,
    #[serde(default)]
    rule: Option<Vec<RawRule>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawMeta {
    name: String,
    version: u32,
    #[serde(default)]
    #[allow(dead_code)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawVariable {
    name: String,
    target_type: String,
    default: String,
    update: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRule {
    rule_id: String,
    target_type: String,
    predicate: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    error_template: Option<String>,
    #[serde(default)]
    deferred: Option<bool>,
    #[serde(default)]
    error_arguments: Option<Vec<RawErrorArgument>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawErrorArgument {
    name: String,
    expression: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [meta]
        name = "sample"
        version = 1

        [[variable]]
        name = "count"
        target_type = "Section"
        default = "0"
        update = "count + 1"

        [[rule]]
        rule_id = "r1"
        target_type = "Doc"
        predicate = "true"
        description = "always passes"
        deferred = true

        [[rule.error_arguments]]
        name = "value"
        expression = "1"
    "#;

    #[test]
    fn loads_rules_and_variables_from_inline_toml() {
        let profile = load_profile_from_inline_and_paths(&[("sample", SAMPLE)], &[]).unwrap();
        assert_eq!(profile.rules().len(), 1);
        assert_eq!(profile.variables().len(), 1);
        let rule = &profile.rules()[0];
        assert_eq!(rule.rule_id, "r1");
        assert!(rule.deferred);
        assert_eq!(rule.error_arguments.len(), 1);
        assert_eq!(profile.summary().entries.len(), 1);
    }

    #[test]
    fn rejects_empty_source_list() {
        let err = load_profile_from_inline_and_paths(&[], &[]).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidProfile);
    }

    #[test]
    fn rejects_rule_with_empty_id() {
        let toml = r#"
            [meta]
            name = "bad"
            version = 1

            [[rule]]
            rule_id = ""
            target_type = "Doc"
            predicate = "true"
        "#;
        let err = load_profile_from_inline_and_paths(&[("bad", toml)], &[]).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidRule);
    }
}
