//! Strict substitution scope and constructor overrides.
//!
//! The lifecycle controller does not mock anything itself; it only needs a
//! narrow container surface: register concrete doubles during arrange, hand
//! them to the subject builder, and drop whatever is left at release. The
//! scope is strict: asking for a type that was never provided fails the
//! test instead of conjuring a default.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::FixtureError;

/// Strict scope holding the dependency doubles for one fixture run.
///
/// Created fresh by the controller right before arrange; dropped (along
/// with any unconsumed doubles) when the fixture is released.
#[derive(Default)]
pub struct StrictScope {
    doubles: HashMap<TypeId, Box<dyn Any + Send>>,
}

impl StrictScope {
    /// Construct an empty strict scope.
    pub fn strict() -> Self {
        Self::default()
    }

    /// Register a concrete double to satisfy a dependency of the subject.
    /// Registering the same type twice replaces the earlier double.
    pub fn provide<T>(&mut self, instance: T)
    where
        T: Any + Send,
    {
        self.doubles.insert(TypeId::of::<T>(), Box::new(instance));
    }

    /// Hand the registered double of type `T` to the subject builder,
    /// consuming it. A miss is a strict-mode failure.
    pub fn take<T>(&mut self) -> Result<T, FixtureError>
    where
        T: Any + Send,
    {
        let boxed = self.doubles.remove(&TypeId::of::<T>()).ok_or(
            FixtureError::MissingDependency {
                type_name: type_name::<T>(),
            },
        )?;
        boxed
            .downcast::<T>()
            .map(|boxed| *boxed)
            .map_err(|_| FixtureError::MissingDependency {
                type_name: type_name::<T>(),
            })
    }

    /// Clone out a shared double previously provided as an `Arc<T>`,
    /// leaving it registered so both subject and assertions can observe it.
    pub fn take_shared<T>(&self) -> Result<Arc<T>, FixtureError>
    where
        T: Any + Send + Sync,
    {
        self.doubles
            .get(&TypeId::of::<Arc<T>>())
            .and_then(|boxed| boxed.downcast_ref::<Arc<T>>())
            .cloned()
            .ok_or(FixtureError::MissingDependency {
                type_name: type_name::<T>(),
            })
    }

    /// Count of registered-but-unconsumed doubles. Suites can assert this
    /// is zero after construction to catch doubles that never got wired in.
    pub fn remaining(&self) -> usize {
        self.doubles.len()
    }
}

struct OverrideEntry {
    name: String,
    value: Box<dyn Any + Send>,
}

/// Ordered, named constructor overrides collected before the subject is
/// built. The owning spec freezes the collection once construction starts.
#[derive(Default)]
pub struct Overrides {
    entries: Vec<OverrideEntry>,
}

impl Overrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a named override. Re-using a name replaces the value but keeps
    /// the original position.
    pub fn set<T>(&mut self, name: &str, value: T)
    where
        T: Any + Send,
    {
        match self.entries.iter_mut().find(|entry| entry.name == name) {
            Some(entry) => entry.value = Box::new(value),
            None => self.entries.push(OverrideEntry {
                name: name.to_string(),
                value: Box::new(value),
            }),
        }
    }

    /// Fetch the override named `name` as a `T`, if present and of that type.
    pub fn get<T>(&self, name: &str) -> Option<&T>
    where
        T: Any,
    {
        self.entries
            .iter()
            .find(|entry| entry.name == name)
            .and_then(|entry| entry.value.downcast_ref::<T>())
    }

    /// Override names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
