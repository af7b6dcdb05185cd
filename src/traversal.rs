//! Traversal engine: a cycle-safe depth-first walk of the object graph that
//! dispatches rules and updates variables at every node, then drains the
//! deferred-rule queue once the stack empties.

use crate::collector::Collector;
use crate::dispatcher::Dispatcher;
use crate::engine::ProgressCounters;
use crate::object::ValidationObject;
use crate::policy::OnSandboxFault;
use crate::sandbox::Scope;
use crate::variables::VariableStore;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use validator_errors::{structural, target, ErrorCode, ValidationResult};

/// Walk `root` and its transitive children, dispatching rules and updating
/// variables at each node, then flush the deferred-rule queue once the
/// stack has drained or the abort flag is observed.
#[allow(clippy::too_many_arguments)]
pub fn traverse(
    root: Box<dyn ValidationObject>,
    scope: &mut Scope,
    variables: &VariableStore<'_>,
    dispatcher: &mut Dispatcher<'_>,
    collector: &mut Collector<'_>,
    abort_flag: &Arc<AtomicBool>,
    progress: &ProgressCounters,
    on_sandbox_fault: OnSandboxFault,
) -> ValidationResult<()> {
    let root: Arc<dyn ValidationObject> = Arc::from(root);
    let mut visited_ids: HashSet<String> = HashSet::new();
    if let Some(id) = root.id() {
        visited_ids.insert(id.to_string());
    }

    progress.record_push();
    let mut stack: Vec<(Arc<dyn ValidationObject>, String)> = vec![(root, "root".to_string())];

    while let Some((object, context)) = stack.pop() {
        if abort_flag.load(Ordering::SeqCst) {
            break;
        }
        progress.record_pop();

        dispatcher.dispatch(&object, &context, scope, collector);
        variables.update_for_object(&object, scope, on_sandbox_fault)?;

        let links = object.links();
        for link in links.iter().rev() {
            if link.trim().is_empty() {
                return Err(structural!(
                    ErrorCode::StructuralFault,
                    "empty link name encountered at '{}'",
                    context
                ));
            }

            let children = object.linked_objects(link).map_err(|err| {
                target!(
                    ErrorCode::ParserFault,
                    "failed to fetch link '{}' at '{}': {}",
                    link,
                    context,
                    err
                )
            })?;

            for (index, child) in children.into_iter().enumerate().rev() {
                let child: Arc<dyn ValidationObject> = Arc::from(child);
                let mut child_context = format!("{context}/{link}[{index}]");
                let should_push = match child.id() {
                    Some(id) => {
                        child_context.push_str(&format!("({id})"));
                        if visited_ids.contains(id) {
                            false
                        } else {
                            visited_ids.insert(id.to_string());
                            true
                        }
                    }
                    None => true,
                };
                if let Some(extra) = child.extra_context() {
                    child_context.push_str(&format!("{{{extra}}}"));
                }

                if should_push {
                    progress.record_push();
                    stack.push((child, child_context));
                }
            }
        }
    }

    dispatcher.flush_deferred(scope, collector);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineOptions;
    use crate::object::fixtures::GraphObject;
    use crate::profile::{ProfileBuilder, Rule, Variable};
    use crate::sandbox::Sandbox;

    fn options() -> EngineOptions {
        EngineOptions {
            max_displayed_failed_checks: 100,
            log_passed_checks: true,
            show_error_messages: false,
            show_progress: false,
        }
    }

    #[test]
    fn visits_cyclic_graph_exactly_once_per_identified_object() {
        let a = GraphObject::new("A")
            .with_id("1")
            .with_link("next", vec![GraphObject::new("B").with_link(
                "back",
                vec![GraphObject::new("A").with_id("1")],
            )]);

        let mut builder = ProfileBuilder::new();
        builder.add_rule(Rule::new("ra", "A", "true")).unwrap();
        let profile = builder.build();
        let sandbox = Sandbox::new();
        let mut scope = sandbox.initialise();
        let variables = VariableStore::new(&profile, &sandbox);
        let mut dispatcher = Dispatcher::new(&profile, &sandbox);
        let mut collector = Collector::new(
            &sandbox,
            &options(),
            Arc::new(AtomicBool::new(false)),
            "A".to_string(),
        );

        traverse(
            Box::new(a),
            &mut scope,
            &variables,
            &mut dispatcher,
            &mut collector,
            &Arc::new(AtomicBool::new(false)),
            &ProgressCounters::new(),
            OnSandboxFault::Record,
        )
        .unwrap();

        assert_eq!(collector.test_counter(), 1);
    }

    #[test]
    fn rejects_empty_link_name() {
        struct BadObject;
        impl ValidationObject for BadObject {
            fn object_type(&self) -> &str {
                "Bad"
            }
            fn super_types(&self) -> &[String] {
                &[]
            }
            fn id(&self) -> Option<&str> {
                None
            }
            fn context(&self) -> &str {
                "root"
            }
            fn extra_context(&self) -> Option<&str> {
                None
            }
            fn links(&self) -> Vec<String> {
                vec![String::new()]
            }
            fn linked_objects(
                &self,
                _link: &str,
            ) -> ValidationResult<Vec<Box<dyn ValidationObject>>> {
                Ok(Vec::new())
            }
            fn attribute(&self, _name: &str) -> Option<crate::object::AttributeValue> {
                None
            }
        }

        let profile = ProfileBuilder::new().build();
        let sandbox = Sandbox::new();
        let mut scope = sandbox.initialise();
        let variables = VariableStore::new(&profile, &sandbox);
        let mut dispatcher = Dispatcher::new(&profile, &sandbox);
        let mut collector = Collector::new(
            &sandbox,
            &options(),
            Arc::new(AtomicBool::new(false)),
            "Bad".to_string(),
        );

        let result = traverse(
            Box::new(BadObject),
            &mut scope,
            &variables,
            &mut dispatcher,
            &mut collector,
            &Arc::new(AtomicBool::new(false)),
            &ProgressCounters::new(),
            OnSandboxFault::Record,
        );
        assert!(result.is_err());
    }

    #[test]
    fn variable_reaches_final_value_before_deferred_rule_fires() {
        let doc = GraphObject::new("Doc").with_link(
            "items",
            vec![
                GraphObject::new("T"),
                GraphObject::new("T"),
                GraphObject::new("T"),
            ],
        );

        let mut builder = ProfileBuilder::new();
        builder.add_variable(Variable::new("count", "T", "0", "count + 1"));
        builder
            .add_rule(Rule::new("rdoc", "Doc", "count == 3").deferred())
            .unwrap();
        let profile = builder.build();
        let sandbox = Sandbox::new();
        let mut scope = sandbox.initialise();
        let variables = VariableStore::new(&profile, &sandbox);
        variables.seed_defaults(&mut scope).unwrap();
        let mut dispatcher = Dispatcher::new(&profile, &sandbox);
        let mut collector = Collector::new(
            &sandbox,
            &options(),
            Arc::new(AtomicBool::new(false)),
            "Doc".to_string(),
        );

        traverse(
            Box::new(doc),
            &mut scope,
            &variables,
            &mut dispatcher,
            &mut collector,
            &Arc::new(AtomicBool::new(false)),
            &ProgressCounters::new(),
            OnSandboxFault::Record,
        )
        .unwrap();

        assert!(collector.is_compliant());
    }
}
