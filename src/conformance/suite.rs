//! Table of conformance cases and the runner that drives them

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use super::charsets::CharPool;
use super::checks::{self, CaseContext};
use super::report::{CaseReport, ConformanceError, SuiteReport};
use super::scope::TestScope;
use crate::config::HarnessConfig;
use crate::traits::BackendFactory;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConformanceCase {
    PasswordSetGet,
    DifficultChars,
    DeletePresent,
    DeleteNotPresent,
    DeleteOneInGroup,
    NameProperty,
    UnicodeChars,
    UnicodeAndAsciiChars,
    DifferentUser,
    Credential,
}

impl ConformanceCase {
    pub const ALL: [ConformanceCase; 10] = [
        Self::PasswordSetGet,
        Self::DifficultChars,
        Self::DeletePresent,
        Self::DeleteNotPresent,
        Self::DeleteOneInGroup,
        Self::NameProperty,
        Self::UnicodeChars,
        Self::UnicodeAndAsciiChars,
        Self::DifferentUser,
        Self::Credential,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::PasswordSetGet => "password_set_get",
            Self::DifficultChars => "difficult_chars",
            Self::DeletePresent => "delete_present",
            Self::DeleteNotPresent => "delete_not_present",
            Self::DeleteOneInGroup => "delete_one_in_group",
            Self::NameProperty => "name_property",
            Self::UnicodeChars => "unicode_chars",
            Self::UnicodeAndAsciiChars => "unicode_and_ascii_chars",
            Self::DifferentUser => "different_user",
            Self::Credential => "credential",
        }
    }

    fn run(self, ctx: &mut CaseContext<'_>) -> Result<(), ConformanceError> {
        match self {
            Self::PasswordSetGet => checks::set_get_with_pool(ctx, CharPool::Default),
            Self::DifficultChars => checks::set_get_with_pool(ctx, CharPool::Difficult),
            Self::DeletePresent => checks::delete_present(ctx),
            Self::DeleteNotPresent => checks::delete_not_present(ctx),
            Self::DeleteOneInGroup => checks::delete_one_in_group(ctx),
            Self::NameProperty => checks::name_property(ctx),
            Self::UnicodeChars => checks::set_get_with_pool(ctx, CharPool::Unicode),
            Self::UnicodeAndAsciiChars => checks::set_get_with_pool(ctx, CharPool::Mixed),
            Self::DifferentUser => checks::different_user(ctx),
            Self::Credential => checks::credential(ctx),
        }
    }
}

/// Runs the conformance cases against backends built by one factory.
///
/// Every case gets its own backend and its own cleanup scope.
pub struct ConformanceSuite<'a> {
    factory: &'a dyn BackendFactory,
    config: HarnessConfig,
    seed: u64,
}

impl<'a> ConformanceSuite<'a> {
    pub fn new(factory: &'a dyn BackendFactory) -> Self {
        Self::with_config(factory, HarnessConfig::default())
    }

    pub fn with_config(factory: &'a dyn BackendFactory, config: HarnessConfig) -> Self {
        let seed = config.seed.unwrap_or_else(rand::random);
        Self {
            factory,
            config,
            seed,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    fn case_rng(&self, case: ConformanceCase) -> StdRng {
        StdRng::seed_from_u64(self.seed ^ ((case as u64 + 1) << 32))
    }

    pub fn run_case(&self, case: ConformanceCase) -> CaseReport {
        let _span = tracing::info_span!("conformance_case", case = case.name(), seed = self.seed).entered();

        let backend = match self.factory.create() {
            Ok(backend) => backend,
            Err(source) => {
                tracing::error!(error = %source, "Failed to create backend");
                return CaseReport {
                    case,
                    backend: None,
                    result: Err(ConformanceError::Backend {
                        step: "create backend",
                        source,
                    }),
                    cleanup_failures: Vec::new(),
                };
            }
        };
        let backend_name = backend.name();
        tracing::info!(backend = %backend_name, "Running conformance case");

        let mut scope = TestScope::new(backend);
        let result = {
            let mut ctx = CaseContext {
                scope: &mut scope,
                rng: self.case_rng(case),
                string_length: self.config.string_length.get(),
            };
            case.run(&mut ctx)
        };
        let cleanup_failures = scope.release();

        match &result {
            Ok(()) if cleanup_failures.is_empty() => tracing::info!("Conformance case passed"),
            Ok(()) => tracing::warn!(count = cleanup_failures.len(), "Conformance case left entries behind"),
            Err(e) => tracing::warn!(error = %e, cleanup_failures = cleanup_failures.len(), "Conformance case failed"),
        }

        CaseReport {
            case,
            backend: Some(backend_name),
            result,
            cleanup_failures,
        }
    }

    pub fn run(&self) -> SuiteReport {
        let cases: Vec<CaseReport> = ConformanceCase::ALL
            .into_iter()
            .map(|case| self.run_case(case))
            .collect();
        let backend = cases
            .iter()
            .find_map(|report| report.backend.clone())
            .unwrap_or_else(|| "<backend not created>".to_string());
        let report = SuiteReport {
            backend,
            seed: self.seed,
            cases,
        };
        tracing::info!(
            backend = %report.backend,
            failed = report.failed_cases().len(),
            "Conformance suite finished"
        );
        report
    }
}

/// Run one case with configuration taken from the environment
pub fn run_case(factory: &dyn BackendFactory, case: ConformanceCase) -> CaseReport {
    ConformanceSuite::with_config(factory, HarnessConfig::from_env()).run_case(case)
}

/// Generate one `#[test]` per conformance case for a backend factory.
///
/// The factory is any `Fn() -> Result<B, CredentialError>` where `B`
/// implements `CredentialBackend`, or any other `BackendFactory`.
///
/// ```ignore
/// fn sqlite() -> Result<SqliteBackend, CredentialError> {
///     SqliteBackend::open_in_memory()
/// }
///
/// keystash::credential_backend_conformance!(sqlite_conformance, sqlite);
/// ```
#[macro_export]
macro_rules! credential_backend_conformance {
    (@cases $module:ident, $factory:expr, [$($test:ident => $case:ident),* $(,)?]) => {
        mod $module {
            #[allow(unused_imports)]
            use super::*;

            $(
                #[test]
                fn $test() {
                    $crate::logging::init_test_logging();
                    $crate::conformance::run_case(
                        &$factory,
                        $crate::conformance::ConformanceCase::$case,
                    )
                    .assert_passed();
                }
            )*
        }
    };
    ($module:ident, $factory:expr) => {
        $crate::credential_backend_conformance!(@cases $module, $factory, [
            password_set_get => PasswordSetGet,
            difficult_chars => DifficultChars,
            delete_present => DeletePresent,
            delete_not_present => DeleteNotPresent,
            delete_one_in_group => DeleteOneInGroup,
            name_property => NameProperty,
            unicode_chars => UnicodeChars,
            unicode_and_ascii_chars => UnicodeAndAsciiChars,
            different_user => DifferentUser,
            credential => Credential,
        ]);
    };
}
