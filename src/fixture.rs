//! The fixture lifecycle controller.
//!
//! A [`Fixture`] owns the one-time arrange → construct → act sequence for a
//! spec and the outcome it produced. Transient specs create one per test;
//! suite-shared specs keep one in a `once_cell::sync::Lazy` static and let
//! every test function race on [`Fixture::ensure_initialized`]: exactly one
//! caller performs the sequence, the rest block on the guard and then read
//! the captured state.
//!
//! The single mutual-exclusion primitive is a `std::sync::Mutex` around the
//! whole fixture state. Accessors must not be called from inside the
//! arrange/build/act closures; the guard is not re-entrant.

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::error::{log_fixture_error, FixtureError, StoreError};
use crate::mocks::{Overrides, StrictScope};
use crate::outcome::Outcome;
use crate::store::ContextStore;

/// Lifecycle phases of a fixture.
///
/// `Arranging` and `Acting` only ever exist while the guard is held, so no
/// other caller can observe them. `Released` is terminal; there is no path
/// back to `Uninitialized`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    Uninitialized,
    Arranging,
    Acting,
    Completed,
    RaisedAsExpected,
    Released,
}

pub(crate) struct FixtureState<S, R> {
    pub(crate) phase: Phase,
    pub(crate) scope: Option<StrictScope>,
    pub(crate) subject: Option<S>,
    pub(crate) result: Option<R>,
    pub(crate) raised: Option<anyhow::Error>,
    pub(crate) cleanup: Option<Box<dyn FnOnce() + Send>>,
}

impl<S, R> Default for FixtureState<S, R> {
    fn default() -> Self {
        Self {
            phase: Phase::Uninitialized,
            scope: None,
            subject: None,
            result: None,
            raised: None,
            cleanup: None,
        }
    }
}

impl<S, R> FixtureState<S, R> {
    /// Run cleanup and drop every captured resource. Safe to call twice;
    /// the second call finds nothing left to do.
    pub(crate) fn release(&mut self) {
        if self.phase == Phase::Released {
            return;
        }
        if let Some(cleanup) = self.cleanup.take() {
            cleanup();
        }
        self.subject = None;
        self.result = None;
        self.raised = None;
        self.scope = None;
        self.phase = Phase::Released;
    }
}

/// Controller for one arrange/act run, shared by many test functions.
///
/// `S` is the subject under test, `R` the act step's result type.
pub struct Fixture<S, R> {
    state: Mutex<FixtureState<S, R>>,
    store: ContextStore,
}

impl<S, R> Default for Fixture<S, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, R> Fixture<S, R> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FixtureState::default()),
            store: ContextStore::new(),
        }
    }

    fn lock_state(&self) -> Result<MutexGuard<'_, FixtureState<S, R>>, FixtureError> {
        self.state.lock().map_err(|_| FixtureError::GuardPoisoned {
            component: "fixture state",
        })
    }

    /// Run the arrange → construct → act sequence if it has not run yet.
    ///
    /// Idempotent: when the fixture is already initialized this returns
    /// immediately without touching any of the supplied closures. When N
    /// callers race, exactly one executes the sequence; the others block on
    /// the guard and observe the initialized state afterward.
    ///
    /// # Errors
    /// - `Released` if the fixture was already released
    /// - `Arrange` / `BuildSubject` when those steps fail; the fixture stays
    ///   uninitialized and a later caller may retry
    /// - `Act` when the act step raises and no error was expected; the
    ///   wrapped error is the subject's own, unmodified
    /// - `DidNotRaise` when an error was expected but the act step returned
    /// - `GuardPoisoned` if a previous initializer panicked
    pub fn ensure_initialized<A, B, C, O, E, K>(
        &self,
        arrange: A,
        build_subject: B,
        act: C,
        overrides: O,
        expect_raise: E,
        cleanup: K,
    ) -> Result<(), FixtureError>
    where
        A: FnOnce(&mut StrictScope, &ContextStore) -> anyhow::Result<()>,
        B: FnOnce(&mut StrictScope, &Overrides) -> anyhow::Result<S>,
        C: FnOnce(&mut S, &ContextStore) -> anyhow::Result<R>,
        O: FnOnce() -> Overrides,
        E: FnOnce() -> bool,
        K: FnOnce() + Send + 'static,
        R: fmt::Debug,
    {
        let mut state = self.lock_state()?;
        match state.phase {
            Phase::Completed | Phase::RaisedAsExpected => return Ok(()),
            Phase::Released => return Err(FixtureError::Released),
            Phase::Uninitialized | Phase::Arranging | Phase::Acting => {}
        }

        // Retained up front so release() still runs it when a later step fails.
        state.cleanup = Some(Box::new(cleanup));

        state.phase = Phase::Arranging;
        debug!("fixture: arranging");
        let mut scope = StrictScope::strict();
        if let Err(source) = arrange(&mut scope, &self.store) {
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
        debug!("fixture: acting");
        let outcome = Outcome::capture(|| act(&mut subject, &self.store));

        // Subject and scope are retained on every path below so release()
        // can drop them even after an unexpected failure.
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
                debug!("fixture: initialized with an expected error");
                Ok(())
            }
            (Outcome::Returned(value), false) => {
                state.result = Some(value);
                state.phase = Phase::Completed;
                debug!("fixture: initialized");
                Ok(())
            }
        }
    }

    /// Whether the arrange/act sequence has completed.
    pub fn is_initialized(&self) -> Result<bool, FixtureError> {
        let state = self.lock_state()?;
        match state.phase {
            Phase::Completed | Phase::RaisedAsExpected => Ok(true),
            Phase::Released => Err(FixtureError::Released),
            _ => Ok(false),
        }
    }

    /// Clone out the captured result.
    ///
    /// Fails with `Uninitialized` before the first successful run, and also
    /// when the run captured an expected error instead of a value.
    pub fn result(&self) -> Result<R, FixtureError>
    where
        R: Clone,
    {
        self.inspect_result(R::clone)
    }

    /// Inspect the captured result without cloning it.
    pub fn inspect_result<T>(&self, inspect: impl FnOnce(&R) -> T) -> Result<T, FixtureError> {
        let state = self.lock_state()?;
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

    /// Inspect the captured error from a run that was expected to raise.
    ///
    /// Fails with `Uninitialized` before the first run and with
    /// `NothingRaised` when the act step returned normally.
    pub fn raised<T>(&self, inspect: impl FnOnce(&anyhow::Error) -> T) -> Result<T, FixtureError> {
        let state = self.lock_state()?;
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

    /// Whether the run captured an expected error.
    pub fn has_raised(&self) -> Result<bool, FixtureError> {
        let state = self.lock_state()?;
        match state.phase {
            Phase::RaisedAsExpected => Ok(true),
            Phase::Completed => Ok(false),
            Phase::Released => Err(FixtureError::Released),
            _ => Err(FixtureError::Uninitialized),
        }
    }

    /// The keyed store shared by every test on this fixture.
    pub fn store(&self) -> &ContextStore {
        &self.store
    }

    /// Store suite data under an explicit key.
    pub fn put<T>(&self, key: &str, value: T) -> Result<(), StoreError>
    where
        T: std::any::Any + Send + Sync,
    {
        self.store.put(key, value)
    }

    /// Fetch suite data stored under an explicit key.
    pub fn get<T>(&self, key: &str) -> Result<T, StoreError>
    where
        T: std::any::Any + Clone,
    {
        self.store.get(key)
    }

    /// Run the cleanup callback and drop the subject, result, captured
    /// error and substitution scope.
    ///
    /// Runs even when arrange or act faulted earlier, including a panicking
    /// initializer: a poisoned guard is recovered here so the registered
    /// cleanup still executes (accessors keep reporting `GuardPoisoned`).
    /// The second call is a no-op; a released fixture stays released.
    pub fn release(&self) {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if state.phase != Phase::Released {
            debug!("fixture: releasing");
            state.release();
        }
    }
}

impl<S, R> Drop for Fixture<S, R> {
    fn drop(&mut self) {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        state.release();
    }
}
