//! Async fixture lifecycle controller for `#[tokio::test]` suites.
//!
//! [`AsyncFixture`] is the same state machine as [`crate::fixture::Fixture`]
//! with the guard swapped for a `tokio::sync::Mutex`, so async arrange and
//! act steps can await inside the critical section without blocking a
//! runtime worker. Losing callers suspend on the guard instead of parking a
//! thread.
//!
//! Subject construction stays synchronous; the substitution scope is plain
//! in-memory state and nothing about building a subject needs to await.

use std::fmt;

use futures::future::BoxFuture;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{log_fixture_error, FixtureError, StoreError};
use crate::fixture::{FixtureState, Phase};
use crate::mocks::{Overrides, StrictScope};
use crate::outcome::Outcome;
use crate::store::ContextStore;

/// Async controller for one arrange/act run, shared by many test tasks.
pub struct AsyncFixture<S, R> {
    state: Mutex<FixtureState<S, R>>,
    store: ContextStore,
}

impl<S, R> Default for AsyncFixture<S, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, R> AsyncFixture<S, R> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FixtureState::default()),
            store: ContextStore::new(),
        }
    }

    /// Run the arrange → construct → act sequence if it has not run yet.
    ///
    /// Semantics match [`crate::fixture::Fixture::ensure_initialized`]:
    /// idempotent, exactly-once under concurrency, failure leaves the
    /// fixture uninitialized for a later retry.
    pub async fn ensure_initialized<A, B, C, O, E, K>(
        &self,
        arrange: A,
        build_subject: B,
        act: C,
        overrides: O,
        expect_raise: E,
        cleanup: K,
    ) -> Result<(), FixtureError>
    where
        A: for<'a> FnOnce(&'a mut StrictScope, &'a ContextStore) -> BoxFuture<'a, anyhow::Result<()>>,
        B: FnOnce(&mut StrictScope, &Overrides) -> anyhow::Result<S>,
        C: for<'a> FnOnce(&'a mut S, &'a ContextStore) -> BoxFuture<'a, anyhow::Result<R>>,
        O: FnOnce() -> Overrides,
        E: FnOnce() -> bool,
        K: FnOnce() + Send + 'static,
        R: fmt::Debug,
    {
        let mut state = self.state.lock().await;
        match state.phase {
            Phase::Completed | Phase::RaisedAsExpected => return Ok(()),
            Phase::Released => return Err(FixtureError::Released),
            Phase::Uninitialized | Phase::Arranging | Phase::Acting => {}
        }

        state.cleanup = Some(Box::new(cleanup));

        state.phase = Phase::Arranging;
        debug!("async fixture: arranging");
        let mut scope = StrictScope::strict();
        if let Err(source) = arrange(&mut scope, &self.store).await {
            state.scope = Some(scope);
            state.phase = Phase::Uninitialized;
            let err = FixtureError::Arrange(source);
            log_fixture_error(&err, "ensure_initialized");
            return Err(err);
        }

        let overrides = overrides();
        let mut subject = match build_subject(&mut scope, &overrides) {
            Ok(subject) => subject,
            Err(source) => {
                state.scope = Some(scope);
                state.phase = Phase::Uninitialized;
                let err = FixtureError::BuildSubject(source);
                log_fixture_error(&err, "ensure_initialized");
                return Err(err);
            }
        };

        state.phase = Phase::Acting;
        debug!("async fixture: acting");
        let outcome = Outcome::capture_async(act(&mut subject, &self.store)).await;

        state.subject = Some(subject);
        state.scope = Some(scope);

        match (outcome, expect_raise()) {
            (Outcome::Returned(value), true) => {
                state.phase = Phase::Uninitialized;
                let err = FixtureError::DidNotRaise {
                    returned: format!("{:?}", value),
                };
                log_fixture_error(&err, "ensure_initialized");
                Err(err)
            }
            (Outcome::Raised(source), false) => {
                state.phase = Phase::Uninitialized;
                let err = FixtureError::Act(source);
                log_fixture_error(&err, "ensure_initialized");
                Err(err)
            }
            (Outcome::Raised(raised), true) => {
                state.raised = Some(raised);
                state.phase = Phase::RaisedAsExpected;
                debug!("async fixture: initialized with an expected error");
                Ok(())
            }
            (Outcome::Returned(value), false) => {
                state.result = Some(value);
                state.phase = Phase::Completed;
                debug!("async fixture: initialized");
                Ok(())
            }
        }
    }

    pub async fn is_initialized(&self) -> Result<bool, FixtureError> {
        let state = self.state.lock().await;
        match state.phase {
            Phase::Completed | Phase::RaisedAsExpected => Ok(true),
            Phase::Released => Err(FixtureError::Released),
            _ => Ok(false),
        }
    }

    /// Clone out the captured result; `Uninitialized` before the first
    /// successful run or when the run captured an expected error.
    pub async fn result(&self) -> Result<R, FixtureError>
    where
        R: Clone,
    {
        self.inspect_result(R::clone).await
    }

    pub async fn inspect_result<T>(
        &self,
        inspect: impl FnOnce(&R) -> T,
    ) -> Result<T, FixtureError> {
        let state = self.state.lock().await;
        match state.phase {
            Phase::Released => Err(FixtureError::Released),
            Phase::Completed => state
                .result
                .as_ref()
                .map(inspect)
                .ok_or(FixtureError::Uninitialized),
            _ => Err(FixtureError::Uninitialized),
        }
    }

    pub async fn raised<T>(
        &self,
        inspect: impl FnOnce(&anyhow::Error) -> T,
    ) -> Result<T, FixtureError> {
        let state = self.state.lock().await;
        match state.phase {
            Phase::Released => Err(FixtureError::Released),
            Phase::RaisedAsExpected => state
                .raised
                .as_ref()
                .map(inspect)
                .ok_or(FixtureError::Uninitialized),
            Phase::Completed => Err(FixtureError::NothingRaised),
            _ => Err(FixtureError::Uninitialized),
        }
    }

    pub async fn has_raised(&self) -> Result<bool, FixtureError> {
        let state = self.state.lock().await;
        match state.phase {
            Phase::RaisedAsExpected => Ok(true),
            Phase::Completed => Ok(false),
            Phase::Released => Err(FixtureError::Released),
            _ => Err(FixtureError::Uninitialized),
        }
    }

    pub fn store(&self) -> &ContextStore {
        &self.store
    }

    pub fn put<T>(&self, key: &str, value: T) -> Result<(), StoreError>
    where
        T: std::any::Any + Send + Sync,
    {
        self.store.put(key, value)
    }

    pub fn get<T>(&self, key: &str) -> Result<T, StoreError>
    where
        T: std::any::Any + Clone,
    {
        self.store.get(key)
    }

    /// Run cleanup and drop every captured resource; idempotent.
    pub async fn release(&self) {
        let mut state = self.state.lock().await;
        if state.phase != Phase::Released {
            debug!("async fixture: releasing");
            state.release();
        }
    }
}

impl<S, R> Drop for AsyncFixture<S, R> {
    fn drop(&mut self) {
        // Drop cannot await; an uncontended try_lock is enough at teardown
        // since nothing else can hold the fixture while it is being dropped.
        if let Ok(mut state) = self.state.try_lock() {
            state.release();
        }
    }
}
