//! Wait-for predicates evaluated against command responses.

use std::fmt;

/// A parsed predicate over one round of command responses.
pub trait Conditional: Send + Sync {
    /// Evaluates the predicate against responses aligned with the sent commands.
    fn evaluate(&self, responses: &[String]) -> bool;

    /// The expression this predicate was parsed from.
    fn raw(&self) -> &str;
}

impl fmt::Debug for dyn Conditional {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Conditional").field(&self.raw()).finish()
    }
}

/// Raised when an expression cannot be parsed into a [`Conditional`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid conditional '{expression}': {message}")]
pub struct PredicateSyntaxError {
    pub expression: String,
    pub message: String,
}

impl PredicateSyntaxError {
    pub fn new(expression: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            message: message.into(),
        }
    }
}

/// Builds [`Conditional`]s from raw expressions.
pub trait ConditionalParser {
    fn parse(&self, expression: &str) -> Result<Box<dyn Conditional>, PredicateSyntaxError>;
}
