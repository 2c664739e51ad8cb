//! Outcomes of conformance runs

use std::fmt;

use serde_json::{json, Value};
use thiserror::Error;

use super::suite::ConformanceCase;
use crate::traits::CredentialError;

#[derive(Debug, Error)]
pub enum ConformanceError {
    /// The backend answered, but broke an invariant of the contract
    #[error("{step}: {detail}")]
    Violation { step: &'static str, detail: String },
    /// The backend failed where the contract expects success
    #[error("{step}: unexpected backend error: {source}")]
    Backend {
        step: &'static str,
        #[source]
        source: CredentialError,
    },
}

impl ConformanceError {
    pub fn violation(step: &'static str, detail: impl Into<String>) -> Self {
        Self::Violation {
            step,
            detail: detail.into(),
        }
    }

    pub fn is_violation(&self) -> bool {
        matches!(self, Self::Violation { .. })
    }
}

/// Attach the failing step to a backend error
pub trait StepContext<T> {
    fn step(self, step: &'static str) -> Result<T, ConformanceError>;
}

impl<T> StepContext<T> for Result<T, CredentialError> {
    fn step(self, step: &'static str) -> Result<T, ConformanceError> {
        self.map_err(|source| ConformanceError::Backend { step, source })
    }
}

/// A tracked pair that could not be deleted during teardown
#[derive(Debug)]
pub struct CleanupFailure {
    pub service: String,
    pub username: String,
    pub error: CredentialError,
}

impl fmt::Display for CleanupFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cleanup of {:?}/{:?} failed: {}",
            self.service, self.username, self.error
        )
    }
}

/// Result of one conformance case.
///
/// The body outcome and teardown failures are kept apart so that neither
/// hides the other.
#[derive(Debug)]
pub struct CaseReport {
    pub case: ConformanceCase,
    pub backend: Option<String>,
    pub result: Result<(), ConformanceError>,
    pub cleanup_failures: Vec<CleanupFailure>,
}

impl CaseReport {
    pub fn passed(&self) -> bool {
        self.result.is_ok() && self.cleanup_failures.is_empty()
    }

    /// Panic with every recorded failure unless the case passed
    pub fn assert_passed(&self) {
        if !self.passed() {
            panic!("{}", self.failure_summary());
        }
    }

    pub fn failure_summary(&self) -> String {
        let mut lines = vec![format!(
            "conformance case `{}` failed for {}",
            self.case.name(),
            self.backend.as_deref().unwrap_or("<backend not created>")
        )];
        if let Err(e) = &self.result {
            lines.push(format!("  body: {e}"));
        }
        for failure in &self.cleanup_failures {
            lines.push(format!("  {failure}"));
        }
        lines.join("\n")
    }

    pub fn to_json(&self) -> Value {
        json!({
            "case": self.case.name(),
            "passed": self.passed(),
            "error": self.result.as_ref().err().map(|e| e.to_string()),
            "cleanup_failures": self
                .cleanup_failures
                .iter()
                .map(|f| f.to_string())
                .collect::<Vec<_>>(),
        })
    }
}

/// Result of running every case against one backend
#[derive(Debug)]
pub struct SuiteReport {
    pub backend: String,
    pub seed: u64,
    pub cases: Vec<CaseReport>,
}

impl SuiteReport {
    pub fn passed(&self) -> bool {
        self.cases.iter().all(CaseReport::passed)
    }

    pub fn case(&self, case: ConformanceCase) -> Option<&CaseReport> {
        self.cases.iter().find(|report| report.case == case)
    }

    pub fn failed_cases(&self) -> Vec<ConformanceCase> {
        self.cases
            .iter()
            .filter(|report| !report.passed())
            .map(|report| report.case)
            .collect()
    }

    pub fn assert_passed(&self) {
        if self.passed() {
            return;
        }
        let failures: Vec<String> = self
            .cases
            .iter()
            .filter(|report| !report.passed())
            .map(CaseReport::failure_summary)
            .collect();
        panic!(
            "{} of {} conformance cases failed for {} (seed {}):\n{}",
            failures.len(),
            self.cases.len(),
            self.backend,
            self.seed,
            failures.join("\n")
        );
    }

    pub fn to_json(&self) -> Value {
        json!({
            "backend": self.backend,
            "seed": self.seed,
            "passed": self.passed(),
            "cases": self.cases.iter().map(CaseReport::to_json).collect::<Vec<_>>(),
        })
    }
}
