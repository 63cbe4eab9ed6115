//! Error types for irrd-change-validator.

use thiserror::Error;

/// Result type alias using this crate's error type.
pub type Result<T> = std::result::Result<T, ValidatorError>;

/// Infrastructure-level failures that a validator cannot turn into a
/// normal authorisation failure and must propagate to the caller.
///
/// Validation *failures* (a bad password, a dangling reference) are not
/// errors — they are recorded as messages on [`crate::result::ValidatorResult`].
/// This type is reserved for faults in the collaborators the validators
/// depend on: the database handle and the configuration surface.
#[derive(Error, Debug)]
pub enum ValidatorError {
    /// A query against the RPSL object database, the suspended-objects
    /// view, or the auth-model session failed.
    #[error("database error: {0}")]
    Database(String),

    /// A required piece of configuration was missing or could not be
    /// interpreted (other than the override hash, which is handled
    /// specially — see `auth::AuthValidator::check_override`).
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal invariant violation, e.g. a capability call returned
    /// data inconsistent with what the caller asserted about the object.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ValidatorError {
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}
