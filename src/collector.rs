//! Result collector: accumulates PASS/FAIL assertions, applies the per-rule
//! and global display caps, and renders error templates.

use crate::engine::{EngineOptions, ProgressCounters};
use crate::object::ValidationObject;
use crate::profile::Rule;
use crate::report::{AssertionStatus, Location, TestAssertion};
use crate::sandbox::{ResolvedArgument, Sandbox, Scope};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Global cap on the number of assertions kept in the report, independent of
/// per-rule display caps.
pub const MAX_CHECKS_NUMBER: u64 = 10_000;

/// Default per-rule display cap when an embedder does not override it.
pub const DEFAULT_MAX_DISPLAYED_FAILED_CHECKS: i64 = 100;

pub struct Collector<'a> {
    sandbox: &'a Sandbox,
    max_displayed_failed_checks: i64,
    log_passed_checks: bool,
    show_error_messages: bool,
    abort_flag: Arc<AtomicBool>,
    root_type: String,
    results: Vec<TestAssertion>,
    failed_checks: HashMap<String, u64>,
    is_compliant: bool,
    test_counter: u64,
    progress: Option<&'a ProgressCounters>,
}

impl<'a> Collector<'a> {
    pub fn new(
        sandbox: &'a Sandbox,
        options: &EngineOptions,
        abort_flag: Arc<AtomicBool>,
        root_type: String,
    ) -> Self {
        Collector {
            sandbox,
            max_displayed_failed_checks: options.max_displayed_failed_checks,
            log_passed_checks: options.log_passed_checks,
            show_error_messages: options.show_error_messages,
            abort_flag,
            root_type,
            results: Vec::new(),
            failed_checks: HashMap::new(),
            is_compliant: true,
            test_counter: 0,
            progress: None,
        }
    }

    /// Attach the run's shared progress counters so each reported check is
    /// reflected in `ValidationEngine::progress_string` as it happens.
    #[must_use]
    pub fn with_progress(mut self, progress: &'a ProgressCounters) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Record one predicate outcome. `context` is the traversal context path
    /// at which `rule` fired against `object`.
    pub fn report(
        &mut self,
        passed: bool,
        context: &str,
        rule: &Arc<Rule>,
        object: &Arc<dyn ValidationObject>,
        scope: &mut Scope,
    ) {
        if self.abort_flag.load(Ordering::SeqCst) {
            return;
        }

        self.test_counter += 1;
        if let Some(progress) = self.progress {
            progress.record_check(!passed);
        }
        if self.is_compliant {
            self.is_compliant = passed;
        }

        if passed {
            if self.log_passed_checks && (self.results.len() as u64) <= MAX_CHECKS_NUMBER {
                self.push_assertion(AssertionStatus::Passed, context, rule, object, None, Vec::new());
            }
            return;
        }

        let count = self.failed_checks.entry(rule.rule_id.clone()).or_insert(0);
        *count += 1;
        let n = *count;

        let within_display_cap =
            self.max_displayed_failed_checks == -1 || n <= self.max_displayed_failed_checks as u64;
        let within_global_cap = (self.results.len() as u64) <= MAX_CHECKS_NUMBER || n <= 1;

        if within_display_cap && within_global_cap {
            let (error_message, arguments) = if self.show_error_messages {
                let resolved = self
                    .sandbox
                    .eval_error_arguments(object, &rule.error_arguments, scope);
                let rendered = render_template(&rule.error_template, &resolved);
                (Some(rendered), resolved)
            } else {
                (None, Vec::new())
            };
            self.push_assertion(AssertionStatus::Failed, context, rule, object, error_message, arguments);
        } else {
            crate::logging::record_dropped_check(&rule.rule_id);
        }
    }

    fn push_assertion(
        &mut self,
        status: AssertionStatus,
        context: &str,
        rule: &Arc<Rule>,
        object: &Arc<dyn ValidationObject>,
        error_message: Option<String>,
        arguments: Vec<ResolvedArgument>,
    ) {
        self.results.push(TestAssertion {
            ordinal: self.test_counter,
            rule_id: rule.rule_id.clone(),
            status,
            description: rule.description.clone(),
            location: Location {
                root_type: self.root_type.clone(),
                context_path: context.to_string(),
            },
            object_context: object.context().to_string(),
            error_message,
            arguments,
        });
    }

    pub fn is_compliant(&self) -> bool {
        self.is_compliant
    }

    pub fn test_counter(&self) -> u64 {
        self.test_counter
    }

    pub fn into_parts(self) -> (Vec<TestAssertion>, HashMap<String, u64>, bool, u64) {
        (self.results, self.failed_checks, self.is_compliant, self.test_counter)
    }
}

/// Substitute `%NAME%` and `%N` (1-based) tokens in `template`, applying
/// arguments from last to first so a shorter positional token (`%1`) cannot
/// corrupt a longer one (`%10`) that has not been substituted yet.
fn render_template(template: &str, arguments: &[ResolvedArgument]) -> String {
    let mut rendered = template.to_string();
    for (index, argument) in arguments.iter().enumerate().rev() {
        let position = index + 1;
        let value = argument.value.clone().unwrap_or_else(|| "null".to_string());
        rendered = rendered.replace(&format!("%{}%", argument.name), &value);
        rendered = rendered.replace(&format!("%{}", position), &value);
    }
    rendered
}
