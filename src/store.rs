//! Keyed shared-state store for suite-scoped fixtures.
//!
//! The host runner recreates the test struct for every test function, so
//! ordinary fields written by a one-time arrange step are gone by the time
//! the second test asserts. Suites that share a fixture stash data here
//! instead, under explicit string keys.
//!
//! Keys are deliberately explicit. Deriving keys from the stored type's
//! identity invites silent collisions between two same-typed values with
//! different meanings, so callers name every entry.

use std::any::{type_name, Any};
use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::StoreError;

struct StoredValue {
    value: Box<dyn Any + Send + Sync>,
    type_name: &'static str,
}

/// String-keyed, type-erased store shared by all tests of one fixture.
///
/// Writes take the write lock; post-initialization reads take the read lock
/// only, so concurrent assertions never serialize against each other.
#[derive(Default)]
pub struct ContextStore {
    entries: RwLock<HashMap<String, StoredValue>>,
}

impl ContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` under `key`, replacing any previous entry.
    pub fn put<T>(&self, key: &str, value: T) -> Result<(), StoreError>
    where
        T: Any + Send + Sync,
    {
        let mut entries = self.entries.write().map_err(|_| StoreError::Poisoned)?;
        entries.insert(
            key.to_string(),
            StoredValue {
                value: Box::new(value),
                type_name: type_name::<T>(),
            },
        );
        Ok(())
    }

    /// Fetch a clone of the value stored under `key`.
    ///
    /// Fails with `KeyNotFound` when nothing was stored there and with
    /// `TypeMismatch` when the stored concrete type is not `T`.
    pub fn get<T>(&self, key: &str) -> Result<T, StoreError>
    where
        T: Any + Clone,
    {
        let entries = self.entries.read().map_err(|_| StoreError::Poisoned)?;
        let stored = entries.get(key).ok_or_else(|| StoreError::KeyNotFound {
            key: key.to_string(),
        })?;
        stored
            .value
            .downcast_ref::<T>()
            .cloned()
            .ok_or_else(|| StoreError::TypeMismatch {
                key: key.to_string(),
                expected: type_name::<T>(),
                actual: stored.type_name,
            })
    }

    pub fn contains(&self, key: &str) -> Result<bool, StoreError> {
        let entries = self.entries.read().map_err(|_| StoreError::Poisoned)?;
        Ok(entries.contains_key(key))
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        let entries = self.entries.read().map_err(|_| StoreError::Poisoned)?;
        Ok(entries.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }
}
