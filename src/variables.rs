//! Variable store: the profile's accumulators, indexed by target type the
//! same way the rule index is, with actual storage delegated to the sandbox
//! [`Scope`].

use crate::object::ValidationObject;
use crate::policy::OnSandboxFault;
use crate::profile::Profile;
use crate::sandbox::{Sandbox, Scope};
use std::sync::Arc;
use validator_errors::ValidationResult;

/// Owns the live accumulator state for one traversal. Each `Variable`'s
/// current value lives in the shared sandbox [`Scope`] under its own name;
/// this type only decides *when* to read the default and *when* to run the
/// update expression.
pub struct VariableStore<'a> {
    profile: &'a Profile,
    sandbox: &'a Sandbox,
}

impl<'a> VariableStore<'a> {
    pub fn new(profile: &'a Profile, sandbox: &'a Sandbox) -> Self {
        VariableStore { profile, sandbox }
    }

    /// Seed every declared variable with its default expression. Run once at
    /// `initialise`, before the root object is visited.
    pub fn seed_defaults(&self, scope: &mut Scope) -> ValidationResult<()> {
        for variable in self.profile.variables() {
            let value = self.sandbox.eval_default(variable, scope)?;
            scope.set_or_push(variable.name.as_str(), value);
        }
        Ok(())
    }

    /// Re-evaluate every variable whose `target_type` matches `object`'s own
    /// type or one of its super-types. By default an update failure is
    /// logged and leaves the previous binding untouched, recovered locally
    /// rather than propagated. When `on_sandbox_fault` is `Abort`, the same
    /// fault is instead surfaced as a fatal error that unwinds the traversal.
    pub fn update_for_object(
        &self,
        object: &Arc<dyn ValidationObject>,
        scope: &mut Scope,
        on_sandbox_fault: OnSandboxFault,
    ) -> ValidationResult<()> {
        let mut candidate_types = Vec::with_capacity(1 + object.super_types().len());
        candidate_types.push(object.object_type().to_string());
        candidate_types.extend(object.super_types().iter().cloned());

        for object_type in &candidate_types {
            for variable in self.profile.variables_by_object_type(object_type) {
                match self.sandbox.eval_variable_update(variable, object, scope) {
                    Ok(value) => scope.set_or_push(variable.name.as_str(), value),
                    Err(err) => {
                        crate::logging::log_validation_error("variables", &err);
                        crate::logging::record_sandbox_fault(err.code.as_str());
                        if on_sandbox_fault.is_abort() {
                            return Err(err);
                        }
                        log::warn!(
                            target: "validation_engine::variables",
                            "update expression for variable '{}' failed on object type '{}': {}; keeping previous value",
                            variable.name,
                            object.object_type(),
                            err
                        );
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::fixtures::GraphObject;
    use crate::profile::{ProfileBuilder, Variable};

    #[test]
    fn seeds_defaults_and_updates_on_matching_type() {
        let mut builder = ProfileBuilder::new();
        builder.add_variable(Variable::new("count", "Section", "0", "count + 1"));
        let profile = builder.build();
        let sandbox = Sandbox::new();
        let store = VariableStore::new(&profile, &sandbox);
        let mut scope = sandbox.initialise();

        store.seed_defaults(&mut scope).unwrap();
        assert_eq!(scope.get_value::<i64>("count"), Some(0));

        let object: Arc<dyn ValidationObject> = Arc::new(GraphObject::new("Section"));
        store
            .update_for_object(&object, &mut scope, OnSandboxFault::Record)
            .unwrap();
        assert_eq!(scope.get_value::<i64>("count"), Some(1));
    }

    #[test]
    fn leaves_variable_untouched_for_non_matching_type() {
        let mut builder = ProfileBuilder::new();
        builder.add_variable(Variable::new("count", "Section", "0", "count + 1"));
        let profile = builder.build();
        let sandbox = Sandbox::new();
        let store = VariableStore::new(&profile, &sandbox);
        let mut scope = sandbox.initialise();
        store.seed_defaults(&mut scope).unwrap();

        let object: Arc<dyn ValidationObject> = Arc::new(GraphObject::new("Paragraph"));
        store
            .update_for_object(&object, &mut scope, OnSandboxFault::Record)
            .unwrap();
        assert_eq!(scope.get_value::<i64>("count"), Some(0));
    }

    #[test]
    fn abort_policy_propagates_update_fault_as_error() {
        let mut builder = ProfileBuilder::new();
        builder.add_variable(Variable::new(
            "count",
            "Section",
            "0",
            "obj.nonexistent_method()",
        ));
        let profile = builder.build();
        let sandbox = Sandbox::new();
        let store = VariableStore::new(&profile, &sandbox);
        let mut scope = sandbox.initialise();
        store.seed_defaults(&mut scope).unwrap();

        let object: Arc<dyn ValidationObject> = Arc::new(GraphObject::new("Section"));
        let err = store
            .update_for_object(&object, &mut scope, OnSandboxFault::Abort)
            .expect_err("abort policy should surface the fault");
        assert_eq!(err.kind, validator_errors::ErrorKind::Bug);
    }
}
