//! Errors raised by catalog domain code.

use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

/// Deterministic failures of domain logic. Storage failures are reported by
/// the store layer, not here.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Caller input was rejected (blank name, negative stock, duplicate tag id...).
    #[error("validation failed: {0}")]
    Validation(String),

    /// Stored state broke a rule the domain relies on.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// A path id was not a positive integer.
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_their_context() {
        assert_eq!(
            DomainError::validation("stock cannot be negative").to_string(),
            "validation failed: stock cannot be negative"
        );
        assert_eq!(
            DomainError::invalid_id("TagId: must be positive, got 0").to_string(),
            "invalid identifier: TagId: must be positive, got 0"
        );
    }
}
