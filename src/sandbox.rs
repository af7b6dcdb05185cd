//! Expression sandbox: evaluates profile-authored predicate and
//! variable-update expressions against a mutable, reusable scope.
//!
//! Profile-authored expressions are small [Rhai](https://rhai.rs) expressions
//! evaluated against a reusable [`Scope`]. The engine binds the object
//! currently under evaluation into the scope under the name `obj` as an
//! [`ObjHandle`], a thin, cloneable handle onto the shared
//! `Arc<dyn ValidationObject>`, exposing `object_type()`, `id()`,
//! `context()`, `has_super_type(name)` and `attribute(name)` to predicate and
//! variable-update expressions.
//!
//! A single `rhai::Engine` is stateless and built once per `ValidationEngine`.
//! It is reentrant across a traversal but not safe to share across concurrent
//! traversals; that is satisfied by handing out a fresh [`Scope`] per
//! traversal while sharing the `Engine`.

use crate::object::{AttributeValue, ValidationObject};
use crate::profile::{ErrorArgument, Rule, Variable};
use rhai::{Dynamic, Engine};
use std::sync::Arc;
use validator_errors::{bug, ErrorCode, ValidationResult};

/// Well-known scope binding for the object under evaluation.
const OBJ_BINDING: &str = "obj";

/// A reusable, per-traversal evaluation scope; variable accumulator storage
/// lives here too.
pub type Scope = rhai::Scope<'static>;

/// One resolved `(name, value)` pair ready for error-template substitution.
/// `value` is `None` when the argument's expression failed to evaluate,
/// rendered downstream as the literal `"null"`.
#[derive(Debug, Clone)]
pub struct ResolvedArgument {
    pub name: String,
    pub value: Option<String>,
}

/// A cloneable handle onto an object, registered as a custom Rhai type so
/// expressions can call `obj.object_type()`, `obj.attribute("...")`, etc.
#[derive(Clone)]
struct ObjHandle(Arc<dyn ValidationObject>);

fn attribute_to_dynamic(value: Option<AttributeValue>) -> Dynamic {
    match value {
        None => Dynamic::UNIT,
        Some(AttributeValue::Bool(b)) => Dynamic::from(b),
        Some(AttributeValue::Int(i)) => Dynamic::from(i),
        Some(AttributeValue::Float(f)) => Dynamic::from(f),
        Some(AttributeValue::Str(s)) => Dynamic::from(s),
    }
}

fn optional_string_to_dynamic(value: Option<&str>) -> Dynamic {
    match value {
        Some(s) => Dynamic::from(s.to_string()),
        None => Dynamic::UNIT,
    }
}

/// The evaluation sandbox shared by a `ValidationEngine` across one traversal.
pub struct Sandbox {
    engine: Arc<Engine>,
}

impl Sandbox {
    pub fn new() -> Self {
        let mut engine = Engine::new();
        engine
            .register_type_with_name::<ObjHandle>("Obj")
            .register_fn("object_type", |handle: &mut ObjHandle| {
                handle.0.object_type().to_string()
            })
            .register_fn("id", |handle: &mut ObjHandle| {
                optional_string_to_dynamic(handle.0.id())
            })
            .register_fn("context", |handle: &mut ObjHandle| {
                handle.0.context().to_string()
            })
            .register_fn("extra_context", |handle: &mut ObjHandle| {
                optional_string_to_dynamic(handle.0.extra_context())
            })
            .register_fn("has_super_type", |handle: &mut ObjHandle, name: &str| {
                handle.0.super_types().iter().any(|t| t == name)
            })
            .register_fn("attribute", |handle: &mut ObjHandle, name: &str| {
                attribute_to_dynamic(handle.0.attribute(name))
            });
        Sandbox {
            engine: Arc::new(engine),
        }
    }

    /// Create a fresh, reusable scope for one traversal.
    pub fn initialise(&self) -> Scope {
        Scope::new()
    }

    /// Release any per-traversal sandbox state. The `rhai::Engine` itself is
    /// stateless, so this only exists to give traversal teardown a symmetric
    /// call site; dropping `scope` is the caller's job.
    pub fn exit_scope(&self, _scope: Scope) {}

    /// Evaluate a raw expression against `scope`, unwrapping any returned
    /// `Obj` handle to its underlying `object_type` string representation
    /// before it is stored or returned.
    pub fn eval_expression(&self, source: &str, scope: &mut Scope) -> ValidationResult<Dynamic> {
        let value = self
            .engine
            .eval_expression_with_scope::<Dynamic>(scope, source)
            .map_err(|err| {
                bug!(
                    ErrorCode::SandboxFault,
                    "failed to evaluate expression '{}': {}",
                    source,
                    err
                )
            })?;
        Ok(self.unwrap_host_object(value))
    }

    fn unwrap_host_object(&self, value: Dynamic) -> Dynamic {
        if value.is::<ObjHandle>() {
            let handle = value.cast::<ObjHandle>();
            Dynamic::from(handle.0.object_type().to_string())
        } else {
            value
        }
    }

    fn bind_object(&self, object: &Arc<dyn ValidationObject>, scope: &mut Scope) {
        scope.set_or_push(OBJ_BINDING, ObjHandle(object.clone()));
    }

    /// Evaluate `rule`'s predicate against `object`. Any evaluation error is
    /// treated as `false` and never propagated.
    pub fn eval_predicate(&self, object: &Arc<dyn ValidationObject>, rule: &Rule, scope: &mut Scope) -> bool {
        self.bind_object(object, scope);
        match self.eval_expression(&rule.predicate, scope) {
            Ok(value) => value.as_bool().unwrap_or(false),
            Err(err) => {
                crate::logging::log_validation_error("predicate", &err);
                crate::logging::record_sandbox_fault(err.code.as_str());
                false
            }
        }
    }

    /// Evaluate `variable`'s update expression against `object`.
    pub fn eval_variable_update(
        &self,
        variable: &Variable,
        object: &Arc<dyn ValidationObject>,
        scope: &mut Scope,
    ) -> ValidationResult<Dynamic> {
        self.bind_object(object, scope);
        self.eval_expression(&variable.update_expression, scope)
    }

    /// Evaluate `variable`'s default-value expression (no object bound yet).
    pub fn eval_default(&self, variable: &Variable, scope: &mut Scope) -> ValidationResult<Dynamic> {
        self.eval_expression(&variable.default_expression, scope)
    }

    /// Evaluate each error argument's expression against `object`, returning
    /// the resolved `(name, value)` pairs used for template substitution.
    pub fn eval_error_arguments(
        &self,
        object: &Arc<dyn ValidationObject>,
        arguments: &[ErrorArgument],
        scope: &mut Scope,
    ) -> Vec<ResolvedArgument> {
        self.bind_object(object, scope);
        arguments
            .iter()
            .map(|argument| {
                let value = self
                    .eval_expression(&argument.expression, scope)
                    .ok()
                    .map(|dynamic| dynamic.to_string());
                ResolvedArgument {
                    name: argument.name.clone(),
                    value,
                }
            })
            .collect()
    }
}

impl Default for Sandbox {
    fn default() -> Self {
        Self::new()
    }
}
