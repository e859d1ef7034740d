//! The composed spec controller.
//!
//! One generic [`Spec`] replaces the whole variant lattice a class-based
//! harness would grow (sync/async x transient/shared x with/without result):
//! a spec is an arrange closure, a build-subject closure, an act closure and
//! a [`Sharing`] mode, plus per-instance flags (expected-raise, overrides,
//! cleanup). Specs with no meaningful result use `R = ()`.
//!
//! Transient specs own their fixture and release it on drop. Shared specs
//! borrow a suite-level `Arc<Fixture>`; every test constructs its own `Spec`
//! with the same closures, only the first to run executes them.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::error::{FixtureError, StoreError};
use crate::fixture::Fixture;
use crate::mocks::{Overrides, StrictScope};
use crate::store::ContextStore;

/// Store key under which [`Spec::mapping`] stashes the conversion source.
pub const MAPPING_SOURCE_KEY: &str = "mapping.source";

/// Whether a spec re-runs its setup per test or shares one run per suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sharing {
    /// Fresh fixture per test, released when the spec drops
    Transient,
    /// Suite-level fixture, released when the last `Arc` drops
    Shared,
}

type ArrangeFn = Box<dyn FnOnce(&mut StrictScope, &ContextStore) -> anyhow::Result<()> + Send>;
type BuildFn<S> = Box<dyn FnOnce(&mut StrictScope, &Overrides) -> anyhow::Result<S> + Send>;
type ActFn<S, R> = Box<dyn FnOnce(&mut S, &ContextStore) -> anyhow::Result<R> + Send>;

struct Setup<S, R> {
    arrange: ArrangeFn,
    build_subject: BuildFn<S>,
    act: ActFn<S, R>,
}

/// A runnable Arrange/Act/Assert specification.
pub struct Spec<S, R> {
    fixture: Arc<Fixture<S, R>>,
    sharing: Sharing,
    setup: Option<Setup<S, R>>,
    overrides: Overrides,
    expect_raise: bool,
    started: bool,
    cleanup: Option<Box<dyn FnOnce() + Send>>,
}

impl<S, R> Spec<S, R> {
    /// A spec with a fresh fixture, released when this instance drops.
    pub fn transient<A, B, C>(arrange: A, build_subject: B, act: C) -> Self
    where
        A: FnOnce(&mut StrictScope, &ContextStore) -> anyhow::Result<()> + Send + 'static,
        B: FnOnce(&mut StrictScope, &Overrides) -> anyhow::Result<S> + Send + 'static,
        C: FnOnce(&mut S, &ContextStore) -> anyhow::Result<R> + Send + 'static,
    {
        Self::with_fixture(
            Arc::new(Fixture::new()),
            Sharing::Transient,
            arrange,
            build_subject,
            act,
        )
    }

    /// A spec bound to a suite-level fixture. Expensive setup runs once;
    /// every test function passes the same closures and races on `run`.
    pub fn shared<A, B, C>(fixture: Arc<Fixture<S, R>>, arrange: A, build_subject: B, act: C) -> Self
    where
        A: FnOnce(&mut StrictScope, &ContextStore) -> anyhow::Result<()> + Send + 'static,
        B: FnOnce(&mut StrictScope, &Overrides) -> anyhow::Result<S> + Send + 'static,
        C: FnOnce(&mut S, &ContextStore) -> anyhow::Result<R> + Send + 'static,
    {
        Self::with_fixture(fixture, Sharing::Shared, arrange, build_subject, act)
    }

    fn with_fixture<A, B, C>(
        fixture: Arc<Fixture<S, R>>,
        sharing: Sharing,
        arrange: A,
        build_subject: B,
        act: C,
    ) -> Self
    where
        A: FnOnce(&mut StrictScope, &ContextStore) -> anyhow::Result<()> + Send + 'static,
        B: FnOnce(&mut StrictScope, &Overrides) -> anyhow::Result<S> + Send + 'static,
        C: FnOnce(&mut S, &ContextStore) -> anyhow::Result<R> + Send + 'static,
    {
        Self {
            fixture,
            sharing,
            setup: Some(Setup {
                arrange: Box::new(arrange),
                build_subject: Box::new(build_subject),
                act: Box::new(act),
            }),
            overrides: Overrides::new(),
            expect_raise: false,
            started: false,
            cleanup: None,
        }
    }

    /// Register the expectation that the act step raises.
    ///
    /// At most once per spec instance; the second registration fails before
    /// arrange ever runs.
    pub fn expect_raise(&mut self) -> Result<(), FixtureError> {
        if self.expect_raise {
            return Err(FixtureError::ExpectationAlreadySet);
        }
        self.expect_raise = true;
        Ok(())
    }

    /// Collect a named constructor override for the subject builder.
    /// Fails once `run` has been called; overrides are frozen from then on.
    pub fn override_with<T>(&mut self, name: &str, value: T) -> Result<(), FixtureError>
    where
        T: Any + Send,
    {
        if self.started {
            return Err(FixtureError::OverridesFrozen);
        }
        self.overrides.set(name, value);
        Ok(())
    }

    /// Register the cleanup callback run when the fixture is released.
    /// A later registration replaces an earlier one.
    pub fn on_cleanup(&mut self, cleanup: impl FnOnce() + Send + 'static) {
        self.cleanup = Some(Box::new(cleanup));
    }

    /// Run the spec's arrange/act sequence through the fixture.
    ///
    /// The first call consumes the stored closures; later calls (or calls
    /// from sibling instances sharing the fixture) observe the already
    /// initialized state.
    pub fn run(&mut self) -> Result<(), FixtureError>
    where
        R: fmt::Debug,
    {
        self.started = true;
        let setup = match self.setup.take() {
            Some(setup) => setup,
            None => {
                return if self.fixture.is_initialized()? {
                    Ok(())
                } else {
                    Err(FixtureError::Uninitialized)
                };
            }
        };
        let overrides = std::mem::take(&mut self.overrides);
        let expect_raise = self.expect_raise;
        let cleanup = self.cleanup.take();
        self.fixture.ensure_initialized(
            setup.arrange,
            setup.build_subject,
            setup.act,
            move || overrides,
            move || expect_raise,
            move || {
                if let Some(cleanup) = cleanup {
                    cleanup();
                }
            },
        )
    }

    /// Clone out the captured result.
    pub fn result(&self) -> Result<R, FixtureError>
    where
        R: Clone,
    {
        self.fixture.result()
    }

    /// Inspect the captured result without cloning it.
    pub fn inspect_result<T>(&self, inspect: impl FnOnce(&R) -> T) -> Result<T, FixtureError> {
        self.fixture.inspect_result(inspect)
    }

    /// Inspect the captured error from an expected-raise run.
    pub fn raised<T>(&self, inspect: impl FnOnce(&anyhow::Error) -> T) -> Result<T, FixtureError> {
        self.fixture.raised(inspect)
    }

    pub fn has_raised(&self) -> Result<bool, FixtureError> {
        self.fixture.has_raised()
    }

    /// Store suite data under an explicit key.
    pub fn put<T>(&self, key: &str, value: T) -> Result<(), StoreError>
    where
        T: Any + Send + Sync,
    {
        self.fixture.put(key, value)
    }

    /// Fetch suite data stored under an explicit key.
    pub fn get<T>(&self, key: &str) -> Result<T, StoreError>
    where
        T: Any + Clone,
    {
        self.fixture.get(key)
    }

    pub fn sharing(&self) -> Sharing {
        self.sharing
    }

    /// The underlying fixture, e.g. to hand to a sibling shared spec.
    pub fn fixture(&self) -> &Arc<Fixture<S, R>> {
        &self.fixture
    }
}

impl<R> Spec<(), R> {
    /// A subject-less spec: no substitution scope interaction, just an
    /// arrange step and an act step over the keyed store.
    pub fn simple<A, C>(arrange: A, act: C) -> Self
    where
        A: FnOnce(&ContextStore) -> anyhow::Result<()> + Send + 'static,
        C: FnOnce(&ContextStore) -> anyhow::Result<R> + Send + 'static,
    {
        Spec::transient(
            move |_, store| arrange(store),
            |_, _| Ok(()),
            move |_, store| act(store),
        )
    }
}

impl<S> Spec<S, S>
where
    S: Clone,
{
    /// A wiring spec: the act step is resolving the subject itself, so the
    /// suite can assert on what a registry or factory wired together.
    pub fn wiring<B>(build_subject: B) -> Self
    where
        B: FnOnce(&mut StrictScope, &Overrides) -> anyhow::Result<S> + Send + 'static,
        S: Send + 'static,
    {
        Spec::transient(|_, _| Ok(()), build_subject, |subject, _| Ok(subject.clone()))
    }
}

impl<D> Spec<(), D> {
    /// A mapping spec: converts `source` and captures the destination for
    /// assertion. The source is kept in the keyed store under
    /// [`MAPPING_SOURCE_KEY`] so tests can compare both sides.
    pub fn mapping<Src, C>(source: Src, convert: C) -> Self
    where
        Src: Any + Clone + Send + Sync,
        C: FnOnce(Src) -> anyhow::Result<D> + Send + 'static,
    {
        let stored = source.clone();
        Spec::transient(
            move |_, store| {
                store.put(MAPPING_SOURCE_KEY, stored)?;
                Ok(())
            },
            |_, _| Ok(()),
            move |_, _| convert(source),
        )
    }
}

impl<S, R> Drop for Spec<S, R> {
    fn drop(&mut self) {
        if self.sharing == Sharing::Transient {
            self.fixture.release();
        }
    }
}

#[cfg(test)]
mod tests;
