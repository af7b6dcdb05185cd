//! The graph-node capability the engine traverses.
//!
//! `ValidationObject` is the engine's only view onto the document parser
//! collaborator. It is deliberately small and object-safe so a parser can
//! back it with an arena, an owned tree, or a lazily-materialising wrapper
//! without the engine depending on any of that.

use validator_errors::ValidationResult;

/// A single profile-exposed attribute value, bound into the sandbox scope
/// when a predicate or variable-update expression reads `obj.attribute("...")`.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

/// A node in the object graph produced by the parser collaborator.
///
/// Objects are read-only during validation: nothing in the engine ever calls
/// a method on `ValidationObject` that could observably mutate it.
///
/// `Send + Sync` so the traversal and sandbox can share nodes behind `Arc`
/// without the engine committing to a single-threaded embedder.
pub trait ValidationObject: Send + Sync {
    /// The object's own type name, used as the primary rule-dispatch key.
    fn object_type(&self) -> &str;

    /// Declared super-types, each also a valid rule-dispatch key.
    fn super_types(&self) -> &[String];

    /// Stable identifier. Absence means "not deduplicable"; the object may
    /// recur in the graph and will be visited again each time.
    fn id(&self) -> Option<&str>;

    /// Self-label appended to the traversal context path.
    fn context(&self) -> &str;

    /// Optional suffix appended to the context path in braces.
    fn extra_context(&self) -> Option<&str>;

    /// The outgoing link names, in declaration order.
    fn links(&self) -> Vec<String>;

    /// The ordered children reachable through `link`, in declaration order.
    ///
    /// A parser fault surfaces here as `Err` and is wrapped into a top-level
    /// `ValidationError` of kind `Target` by the traversal engine.
    fn linked_objects(&self, link: &str) -> ValidationResult<Vec<Box<dyn ValidationObject>>>;

    /// An ad-hoc attribute exposed to the expression sandbox, or `None` if
    /// this object does not carry an attribute by that name.
    fn attribute(&self, name: &str) -> Option<AttributeValue>;
}
