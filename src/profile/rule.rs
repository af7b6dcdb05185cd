//! Rule declarations.

/// One named argument fed into a rule's error template substitution grammar.
#[derive(Debug, Clone)]
pub struct ErrorArgument {
    /// Matched against `%name%` tokens in the error template.
    pub name: String,
    /// Rhai expression evaluated against the failing object to produce the value.
    pub expression: String,
}

/// A declarative rule: a predicate over objects of `target_type`, plus the
/// human-readable description and error template used when it fails.
#[derive(Debug, Clone)]
pub struct Rule {
    pub rule_id: String,
    pub target_type: String,
    pub predicate: String,
    pub description: String,
    pub error_template: String,
    pub error_arguments: Vec<ErrorArgument>,
    pub deferred: bool,
}

impl Rule {
    pub fn new(
        rule_id: impl Into<String>,
        target_type: impl Into<String>,
        predicate: impl Into<String>,
    ) -> Self {
        Rule {
            rule_id: rule_id.into(),
            target_type: target_type.into(),
            predicate: predicate.into(),
            description: String::new(),
            error_template: String::new(),
            error_arguments: Vec::new(),
            deferred: false,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn with_error_template(mut self, template: impl Into<String>) -> Self {
        self.error_template = template.into();
        self
    }

    #[must_use]
    pub fn with_error_argument(
        mut self,
        name: impl Into<String>,
        expression: impl Into<String>,
    ) -> Self {
        self.error_arguments.push(ErrorArgument {
            name: name.into(),
            expression: expression.into(),
        });
        self
    }

    #[must_use]
    pub fn deferred(mut self) -> Self {
        self.deferred = true;
        self
    }
}
