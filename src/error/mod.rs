// Error types for the spec harness
//
// This module defines the error taxonomy for the fixture lifecycle and the
// keyed shared-state store. Usage errors are fatal to the owning test and
// surfaced synchronously; nothing here is retried or swallowed.

mod fixture;
mod store;

pub use fixture::{log_fixture_error, FixtureError};
pub use store::{log_store_error, StoreError};
