//! Rule dispatcher: resolves which rules apply to an object via its type
//! and super-types, evaluates immediate rules on the spot, and queues
//! deferred rules for a single flush once the traversal stack has drained.

use crate::collector::Collector;
use crate::object::ValidationObject;
use crate::profile::{Profile, Rule};
use crate::sandbox::{Sandbox, Scope};
use std::collections::HashSet;
use std::sync::Arc;

/// One queued `(object, context)` occurrence awaiting a deferred rule's
/// final flush.
struct ObjectWithContext {
    object: Arc<dyn ValidationObject>,
    context: String,
}

pub struct Dispatcher<'a> {
    profile: &'a Profile,
    sandbox: &'a Sandbox,
    deferred: Vec<(Arc<Rule>, Vec<ObjectWithContext>)>,
    deferred_index: std::collections::HashMap<String, usize>,
    overlap_logged: bool,
}

impl<'a> Dispatcher<'a> {
    pub fn new(profile: &'a Profile, sandbox: &'a Sandbox) -> Self {
        Dispatcher {
            profile,
            sandbox,
            deferred: Vec::new(),
            deferred_index: std::collections::HashMap::new(),
            overlap_logged: false,
        }
    }

    /// Dispatch every rule matching `object`'s type and super-types, direct
    /// type first, then each super-type in order. The concatenated rule list
    /// is memoized on the `Profile` (see `Profile::effective_rules`), so
    /// repeated visits to objects of the same type signature skip the
    /// concatenation.
    pub fn dispatch(
        &mut self,
        object: &Arc<dyn ValidationObject>,
        context: &str,
        scope: &mut Scope,
        collector: &mut Collector,
    ) {
        let object_type = object.object_type();
        let super_types = object.super_types();
        let direct_len = self.profile.rules_by_object_type(object_type).len();
        let combined = self.profile.effective_rules(object_type, super_types);

        let mut seen_for_object: HashSet<&str> = HashSet::new();
        for (index, rule) in combined.iter().enumerate() {
            if index < direct_len {
                seen_for_object.insert(rule.rule_id.as_str());
            } else if !seen_for_object.insert(rule.rule_id.as_str()) {
                self.log_overlap_once(&rule.rule_id, object_type);
            }
            self.process_rule(rule, object, context, scope, collector);
        }
    }

    fn process_rule(
        &mut self,
        rule: &Arc<Rule>,
        object: &Arc<dyn ValidationObject>,
        context: &str,
        scope: &mut Scope,
        collector: &mut Collector,
    ) {
        if rule.deferred {
            self.enqueue_deferred(rule, object, context);
        } else {
            let passed = self.sandbox.eval_predicate(object, rule, scope);
            collector.report(passed, context, rule, object, scope);
        }
    }

    fn enqueue_deferred(&mut self, rule: &Arc<Rule>, object: &Arc<dyn ValidationObject>, context: &str) {
        let occurrence = ObjectWithContext {
            object: object.clone(),
            context: context.to_string(),
        };
        if let Some(&index) = self.deferred_index.get(&rule.rule_id) {
            self.deferred[index].1.push(occurrence);
        } else {
            self.deferred_index
                .insert(rule.rule_id.clone(), self.deferred.len());
            self.deferred.push((rule.clone(), vec![occurrence]));
        }
    }

    /// Evaluate every queued deferred occurrence, in first-seen-rule order.
    pub fn flush_deferred(&mut self, scope: &mut Scope, collector: &mut Collector) {
        for (rule, occurrences) in self.deferred.drain(..) {
            for occurrence in occurrences {
                let passed = self.sandbox.eval_predicate(&occurrence.object, &rule, scope);
                collector.report(passed, &occurrence.context, &rule, &occurrence.object, scope);
            }
        }
    }

    fn log_overlap_once(&mut self, rule_id: &str, object_type: &str) {
        if self.overlap_logged {
            return;
        }
        self.overlap_logged = true;
        log::debug!(
            target: "validation_engine::dispatcher",
            "rule '{}' matched object type '{}' via both a direct type and a super-type; firing twice",
            rule_id,
            object_type
        );
    }
}
