// Spec Harness - Arrange/Act/Assert lifecycle conventions
// Once-only fixture initialization shared safely across parallel tests

//! A thin convention layer over the built-in test harness.
//!
//! The core is [`Fixture`] (and its tokio twin [`AsyncFixture`]): a small
//! state machine that runs a spec's arrange → construct → act sequence
//! exactly once, no matter how many parallel test functions ask for it, and
//! hands the captured result or error to every assertion afterward.
//! [`Spec`] composes the closures, sharing mode, expected-raise flag and
//! constructor overrides on top of it.
//!
//! ```
//! use spec_harness::Spec;
//!
//! struct Greeter { name: String }
//! impl Greeter {
//!     fn greet(&self) -> String { format!("hello {}", self.name) }
//! }
//!
//! let mut spec = Spec::transient(
//!     |scope, _| {
//!         scope.provide(String::from("world"));
//!         Ok(())
//!     },
//!     |scope, _| Ok(Greeter { name: scope.take::<String>()? }),
//!     |subject, _| Ok(subject.greet()),
//! );
//! spec.run().unwrap();
//! assert_eq!(spec.result().unwrap(), "hello world");
//! ```

pub mod asynchronous;
pub mod error;
pub mod fixture;
pub mod logging;
pub mod mocks;
pub mod outcome;
pub mod spec;
pub mod store;

// Re-exports for convenience
pub use asynchronous::AsyncFixture;
pub use error::{FixtureError, StoreError};
pub use fixture::Fixture;
pub use logging::init_test_logging;
pub use mocks::{Overrides, StrictScope};
pub use outcome::Outcome;
pub use spec::{Sharing, Spec, MAPPING_SOURCE_KEY};
pub use store::ContextStore;
