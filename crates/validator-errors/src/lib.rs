//! Shared error facade for the validation engine.
//!
//! Every fallible operation across the engine crates returns a [`ValidationResult`],
//! whose error variant is a single [`ValidationError`] carrying a stable [`ErrorCode`],
//! an [`ErrorKind`] classification, a human-readable message, and an optional context
//! map for diagnostics (e.g. the context path active when a structural fault fired).

use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt;

/// Broad classification of a [`ValidationError`], used to decide recovery strategy.
///
/// `Usage` and `Environment` faults originate outside the traversal (bad profile,
/// bad configuration). `Structural` and `Target` faults originate from the object
/// graph itself and are always fatal. `Bug` faults are sandbox/predicate evaluation
/// errors that the engine recovers from locally (see `eval_predicate`) unless the
/// active policy asks it to abort instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Invalid profile authoring or engine configuration.
    Usage,
    /// Invalid environment-variable configuration.
    Environment,
    /// Malformed object graph encountered during traversal (null link, null child, ...).
    Structural,
    /// Fault surfaced by the parser collaborator.
    Target,
    /// Expression-sandbox evaluation fault, recovered locally by the engine.
    Bug,
}

/// Stable, serializable error code. New variants may be added; existing ones are
/// never renumbered or renamed once released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorCode {
    InvalidProfile,
    InvalidRule,
    InvalidVariable,
    StructuralFault,
    ParserFault,
    SandboxFault,
    InvalidPolicyValue,
    Cancelled,
    Unknown,
}

impl ErrorCode {
    /// Stable `ERR_...` string form, suitable for logs and wire formats.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::InvalidProfile => "ERR_INVALID_PROFILE",
            ErrorCode::InvalidRule => "ERR_INVALID_RULE",
            ErrorCode::InvalidVariable => "ERR_INVALID_VARIABLE",
            ErrorCode::StructuralFault => "ERR_STRUCTURAL_FAULT",
            ErrorCode::ParserFault => "ERR_PARSER_FAULT",
            ErrorCode::SandboxFault => "ERR_SANDBOX_FAULT",
            ErrorCode::InvalidPolicyValue => "ERR_INVALID_POLICY_VALUE",
            ErrorCode::Cancelled => "ERR_CANCELLED",
            ErrorCode::Unknown => "ERR_UNKNOWN",
        }
    }

    /// Parse the stable string form back into an [`ErrorCode`].
    pub fn parse(value: &str) -> Option<Self> {
        Some(match value {
            "ERR_INVALID_PROFILE" => ErrorCode::InvalidProfile,
            "ERR_INVALID_RULE" => ErrorCode::InvalidRule,
            "ERR_INVALID_VARIABLE" => ErrorCode::InvalidVariable,
            "ERR_STRUCTURAL_FAULT" => ErrorCode::StructuralFault,
            "ERR_PARSER_FAULT" => ErrorCode::ParserFault,
            "ERR_SANDBOX_FAULT" => ErrorCode::SandboxFault,
            "ERR_INVALID_POLICY_VALUE" => ErrorCode::InvalidPolicyValue,
            "ERR_CANCELLED" => ErrorCode::Cancelled,
            "ERR_UNKNOWN" => ErrorCode::Unknown,
            _ => return None,
        })
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validation-engine error: a code, a kind, a message, and optional context.
#[derive(Debug)]
pub struct ValidationError {
    pub kind: ErrorKind,
    pub code: ErrorCode,
    message: Cow<'static, str>,
    pub context: Vec<(&'static str, String)>,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl ValidationError {
    pub fn new(kind: ErrorKind, code: ErrorCode, message: impl Into<Cow<'static, str>>) -> Self {
        ValidationError {
            kind,
            code,
            message: message.into(),
            context: Vec::new(),
            source: None,
        }
    }

    /// Attach a diagnostic key/value pair (e.g. `"context_path"`).
    #[must_use]
    pub fn with_context(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.context.push((key, value.into()));
        self
    }

    /// Attach the underlying cause.
    #[must_use]
    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn source_ref(&self) -> Option<&(dyn StdError + Send + Sync)> {
        self.source.as_deref()
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if !self.context.is_empty() {
            write!(f, " (")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}={}", key, value)?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

impl StdError for ValidationError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source.as_ref().map(|s| s.as_ref() as &(dyn StdError + 'static))
    }
}

/// Convenience alias used throughout the engine crates.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Build a [`ValidationError`] of kind [`ErrorKind::Usage`].
#[macro_export]
macro_rules! usage {
    ($code:expr, $($arg:tt)*) => {
        $crate::ValidationError::new($crate::ErrorKind::Usage, $code, format!($($arg)*))
    };
}

/// Build a [`ValidationError`] of kind [`ErrorKind::Environment`].
#[macro_export]
macro_rules! enverr {
    ($code:expr, $($arg:tt)*) => {
        $crate::ValidationError::new($crate::ErrorKind::Environment, $code, format!($($arg)*))
    };
}

/// Build a [`ValidationError`] of kind [`ErrorKind::Structural`].
#[macro_export]
macro_rules! structural {
    ($code:expr, $($arg:tt)*) => {
        $crate::ValidationError::new($crate::ErrorKind::Structural, $code, format!($($arg)*))
    };
}

/// Build a [`ValidationError`] of kind [`ErrorKind::Target`] (parser-collaborator fault).
#[macro_export]
macro_rules! target {
    ($code:expr, $($arg:tt)*) => {
        $crate::ValidationError::new($crate::ErrorKind::Target, $code, format!($($arg)*))
    };
}

/// Build a [`ValidationError`] of kind [`ErrorKind::Bug`] (sandbox/predicate fault).
#[macro_export]
macro_rules! bug {
    ($code:expr, $($arg:tt)*) => {
        $crate::ValidationError::new($crate::ErrorKind::Bug, $code, format!($($arg)*))
    };
}
