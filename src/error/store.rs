// Keyed store error types

use log::error;
use std::error::Error as StdError;
use std::fmt;

/// Log a store error with structured context
pub fn log_store_error(err: &StoreError, context: &str) {
    error!("Store error in {}: {}", context, err);
}

/// Errors raised by the keyed shared-state store.
///
/// All variants are usage errors and fatal to the owning test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No value was stored under the requested key
    KeyNotFound { key: String },

    /// The stored value's concrete type does not match the requested one
    TypeMismatch {
        key: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// The store lock was poisoned by a panicking writer
    Poisoned,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::KeyNotFound { key } => {
                write!(f, "no fixture data stored under key {:?}", key)
            }
            StoreError::TypeMismatch {
                key,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "fixture data at {:?} is {} but {} was requested",
                    key, actual, expected
                )
            }
            StoreError::Poisoned => write!(f, "fixture data store lock poisoned"),
        }
    }
}

impl StdError for StoreError {}
