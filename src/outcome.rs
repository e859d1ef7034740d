//! Discriminated result of running an act step.
//!
//! The lifecycle controller never uses an internal error type for control
//! flow; the act runner classifies the step into [`Outcome`] and the
//! controller inspects it against the registered expectation.

use std::future::Future;

/// What the act step did: returned a value or raised an error.
#[derive(Debug)]
pub enum Outcome<R> {
    /// The act step completed and produced a value
    Returned(R),
    /// The act step raised
    Raised(anyhow::Error),
}

impl<R> Outcome<R> {
    /// Run a fallible closure and classify its result.
    pub fn capture<F>(act: F) -> Self
    where
        F: FnOnce() -> anyhow::Result<R>,
    {
        match act() {
            Ok(value) => Outcome::Returned(value),
            Err(err) => Outcome::Raised(err),
        }
    }

    /// Await a fallible future and classify its result.
    pub async fn capture_async<F>(act: F) -> Self
    where
        F: Future<Output = anyhow::Result<R>>,
    {
        match act.await {
            Ok(value) => Outcome::Returned(value),
            Err(err) => Outcome::Raised(err),
        }
    }

    pub fn returned(&self) -> bool {
        matches!(self, Outcome::Returned(_))
    }

    pub fn raised(&self) -> bool {
        matches!(self, Outcome::Raised(_))
    }
}
