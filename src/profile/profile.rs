//! The immutable `Profile` data model and its `ProfileBuilder`, plus the
//! rule index and variable store index, built eagerly when the profile is
//! constructed.

use crate::profile::rule::Rule;
use crate::profile::variable::Variable;
use dashmap::DashMap;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use validator_errors::{usage, ErrorCode, ValidationResult};

/// Provenance of one profile document that contributed rules/variables.
#[derive(Debug, Clone)]
pub struct ProfileSource {
    pub path: PathBuf,
    pub sha256: String,
    pub name: String,
    pub version: u32,
}

/// Summary of all sources composing a profile, for embedding in a report.
#[derive(Debug, Clone, Default)]
pub struct ProfileSummary {
    pub entries: Vec<ProfileSource>,
}

/// Immutable for a run.
#[derive(Debug)]
pub struct Profile {
    variables: Vec<Arc<Variable>>,
    rules: Vec<Arc<Rule>>,
    rules_by_type: HashMap<String, Vec<Arc<Rule>>>,
    variables_by_type: HashMap<String, Vec<Arc<Variable>>>,
    sources: Vec<ProfileSource>,
    /// Memoized (object_type, super_types) -> concatenated rule list, shared
    /// by every concurrent traversal over this `Profile`, since the profile
    /// is read-only and may be validated against by many traversals at once.
    rule_cache: DashMap<String, Arc<Vec<Arc<Rule>>>>,
}

impl Profile {
    /// All variable declarations, in declaration order.
    pub fn variables(&self) -> &[Arc<Variable>] {
        &self.variables
    }

    /// All rule declarations, in declaration order.
    pub fn rules(&self) -> &[Arc<Rule>] {
        &self.rules
    }

    /// Rules whose `target_type` equals `object_type` exactly.
    /// The caller (the rule dispatcher) is responsible for also querying
    /// each of the object's super-types.
    pub fn rules_by_object_type(&self, object_type: &str) -> &[Arc<Rule>] {
        self.rules_by_type
            .get(object_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Variables whose `target_type` equals `object_type` exactly.
    pub fn variables_by_object_type(&self, object_type: &str) -> &[Arc<Variable>] {
        self.variables_by_type
            .get(object_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Rules applicable to an object with `object_type` and `super_types`,
    /// concatenated in dispatch order: direct-type rules first, then each
    /// super-type's rules in declaration order, duplicates preserved (a rule
    /// matching both a direct type and a super-type is not deduplicated).
    /// Memoized per distinct `(object_type, super_types)` signature so that
    /// the common case of many objects sharing one type only pays for the
    /// concatenation once.
    pub fn effective_rules(&self, object_type: &str, super_types: &[String]) -> Arc<Vec<Arc<Rule>>> {
        let key = Self::rule_cache_key(object_type, super_types);
        if let Some(hit) = self.rule_cache.get(&key) {
            return hit.clone();
        }

        let mut combined: Vec<Arc<Rule>> = self.rules_by_object_type(object_type).to_vec();
        for super_type in super_types {
            combined.extend(self.rules_by_object_type(super_type).iter().cloned());
        }
        let combined = Arc::new(combined);
        self.rule_cache.insert(key, combined.clone());
        combined
    }

    fn rule_cache_key(object_type: &str, super_types: &[String]) -> String {
        let mut key = String::with_capacity(object_type.len());
        key.push_str(object_type);
        for super_type in super_types {
            key.push('|');
            key.push_str(super_type);
        }
        key
    }

    pub fn summary(&self) -> ProfileSummary {
        ProfileSummary {
            entries: self.sources.clone(),
        }
    }
}

/// Programmatic profile construction, used directly by embedders and by
/// tests (the reference TOML loader in `profile::loader` builds on top of
/// this same builder).
#[derive(Default)]
pub struct ProfileBuilder {
    variables: Vec<Arc<Variable>>,
    rules: Vec<Arc<Rule>>,
    sources: Vec<ProfileSource>,
}

impl ProfileBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_variable(&mut self, variable: Variable) -> &mut Self {
        self.variables.push(Arc::new(variable));
        self
    }

    /// Register a rule. A rule with an empty id or empty predicate is rejected
    /// rather than silently admitted as a null placeholder, enforced at
    /// construction time instead of at lookup time.
    pub fn add_rule(&mut self, rule: Rule) -> ValidationResult<&mut Self> {
        if rule.rule_id.trim().is_empty() {
            return Err(usage!(
                ErrorCode::InvalidRule,
                "rule has an empty rule_id"
            ));
        }
        if rule.predicate.trim().is_empty() {
            return Err(usage!(
                ErrorCode::InvalidRule,
                "rule '{}' has an empty predicate",
                rule.rule_id
            ));
        }
        self.rules.push(Arc::new(rule));
        Ok(self)
    }

    pub fn add_source(&mut self, source: ProfileSource) -> &mut Self {
        self.sources.push(source);
        self
    }

    pub fn build(self) -> Profile {
        let mut rules_by_type: HashMap<String, Vec<Arc<Rule>>> = HashMap::new();
        for rule in &self.rules {
            rules_by_type
                .entry(rule.target_type.clone())
                .or_default()
                .push(rule.clone());
        }

        let mut variables_by_type: HashMap<String, Vec<Arc<Variable>>> = HashMap::new();
        for variable in &self.variables {
            variables_by_type
                .entry(variable.target_type.clone())
                .or_default()
                .push(variable.clone());
        }

        Profile {
            variables: self.variables,
            rules: self.rules,
            rules_by_type,
            variables_by_type,
            sources: self.sources,
            rule_cache: DashMap::new(),
        }
    }
}
