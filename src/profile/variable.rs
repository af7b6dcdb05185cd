//! Variable declarations: profile-wide accumulators.

/// A named accumulator bound into the sandbox scope. Evaluated once at
/// `initialise` (via `default_expression`) and re-evaluated after every
/// visited object whose type or super-type matches `target_type`.
#[derive(Debug, Clone)]
pub struct Variable {
    pub name: String,
    pub target_type: String,
    pub default_expression: String,
    pub update_expression: String,
}

impl Variable {
    pub fn new(
        name: impl Into<String>,
        target_type: impl Into<String>,
        default_expression: impl Into<String>,
        update_expression: impl Into<String>,
    ) -> Self {
        Variable {
            name: name.into(),
            target_type: target_type.into(),
            default_expression: default_expression.into(),
            update_expression: update_expression.into(),
        }
    }
}
