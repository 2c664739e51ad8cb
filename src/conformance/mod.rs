//! Backend conformance harness
//!
//! A backend implementer supplies a factory and gets the full battery of
//! behavioral checks, either as a [`SuiteReport`] from
//! [`ConformanceSuite::run`] or as one `#[test]` per case through
//! [`credential_backend_conformance!`](crate::credential_backend_conformance).

pub mod charsets;
mod checks;
mod report;
mod scope;
mod suite;

pub use checks::{check_set_get, CaseContext};
pub use report::{CaseReport, CleanupFailure, ConformanceError, StepContext, SuiteReport};
pub use scope::TestScope;
pub use suite::{run_case, ConformanceCase, ConformanceSuite};
