// Fixture lifecycle error types

use log::error;
use std::error::Error as StdError;
use std::fmt;

/// Log a fixture error with structured context
///
/// Diagnostic only. The error is still returned to the caller; the harness
/// never swallows or retries a failed lifecycle step.
pub fn log_fixture_error(err: &FixtureError, context: &str) {
    error!("Fixture error in {}: {}", context, err);
}

/// Errors raised by the fixture lifecycle controller and the strict
/// substitution scope.
///
/// Three families share this enum. Usage errors (`Uninitialized`,
/// `Released`, `ExpectationAlreadySet`, `OverridesFrozen`, `NothingRaised`,
/// `MissingDependency`) mean the test called the harness wrong and must
/// fail immediately. The expectation mismatch (`DidNotRaise`) is kept
/// distinguishable from any subject error so the two can never be
/// confused. Subject-under-test failures (`Arrange`, `BuildSubject`,
/// `Act`) wrap the subject's own error, which propagates unmodified
/// through `source()`.
#[derive(Debug)]
pub enum FixtureError {
    /// A captured result or error was read before the fixture ran
    Uninitialized,

    /// The fixture was already released; no operation can revive it
    Released,

    /// The mutual-exclusion guard was poisoned by a panicking initializer
    GuardPoisoned { component: &'static str },

    /// `expect_raise` was registered twice on the same spec instance
    ExpectationAlreadySet,

    /// An override was added after subject construction had started
    OverridesFrozen,

    /// The captured error was requested but the act step returned normally
    NothingRaised,

    /// The strict scope had no double registered for the requested type
    MissingDependency { type_name: &'static str },

    /// The act step was expected to raise but returned a value
    DidNotRaise { returned: String },

    /// The arrange step failed
    Arrange(anyhow::Error),

    /// The subject could not be constructed
    BuildSubject(anyhow::Error),

    /// The act step raised when no error was expected
    Act(anyhow::Error),
}

impl fmt::Display for FixtureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FixtureError::Uninitialized => {
                write!(f, "fixture is not initialized; run the spec first")
            }
            FixtureError::Released => {
                write!(f, "fixture has been released and cannot be used again")
            }
            FixtureError::GuardPoisoned { component } => {
                write!(f, "lock poisoned on {}", component)
            }
            FixtureError::ExpectationAlreadySet => {
                write!(
                    f,
                    "an error expectation is already registered for this spec"
                )
            }
            FixtureError::OverridesFrozen => {
                write!(
                    f,
                    "overrides are frozen once subject construction has started"
                )
            }
            FixtureError::NothingRaised => {
                write!(f, "no error was captured; the act step returned normally")
            }
            FixtureError::MissingDependency { type_name } => {
                write!(f, "no double registered for {} in strict scope", type_name)
            }
            FixtureError::DidNotRaise { returned } => {
                write!(
                    f,
                    "expected the act step to raise but it returned {}",
                    returned
                )
            }
            FixtureError::Arrange(source) => write!(f, "arrange step failed: {}", source),
            FixtureError::BuildSubject(source) => {
                write!(f, "subject construction failed: {}", source)
            }
            FixtureError::Act(source) => write!(f, "act step raised: {}", source),
        }
    }
}

impl StdError for FixtureError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            FixtureError::Arrange(source)
            | FixtureError::BuildSubject(source)
            | FixtureError::Act(source) => Some(source.as_ref()),
            _ => None,
        }
    }
}
