//! Behavioral checks every credential backend must pass

use rand::rngs::StdRng;

use super::charsets::{random_string, CharPool, DIFFICULT_CHARS};
use super::report::{ConformanceError, StepContext};
use super::scope::TestScope;
use crate::traits::{is_ascii_printable, Credential};

/// State handed to a case body
pub struct CaseContext<'a> {
    pub scope: &'a mut TestScope,
    pub rng: StdRng,
    pub string_length: usize,
}

impl CaseContext<'_> {
    fn random(&mut self, pool: &str) -> String {
        random_string(&mut self.rng, self.string_length, pool)
    }

    /// Random `(service, username, password)` drawn from one source
    fn random_triple(&mut self, pool: &str) -> (String, String, String) {
        let password = self.random(pool);
        let username = self.random(pool);
        let service = self.random(pool);
        (service, username, password)
    }
}

fn expect_password(
    step: &'static str,
    actual: Option<String>,
    expected: Option<&str>,
) -> Result<(), ConformanceError> {
    if actual.as_deref() == expected {
        return Ok(());
    }
    Err(ConformanceError::violation(
        step,
        format!("expected {expected:?}, got {actual:?}"),
    ))
}

/// Absent before the write, exact after it, and an empty password reads
/// back as empty rather than absent.
pub fn check_set_get(
    scope: &mut TestScope,
    service: &str,
    username: &str,
    password: &str,
) -> Result<(), ConformanceError> {
    let before = scope
        .backend()
        .get_password(service, username)
        .step("lookup before write")?;
    expect_password("lookup before write", before, None)?;

    scope
        .set_password(service, username, password)
        .step("write password")?;
    let stored = scope
        .backend()
        .get_password(service, username)
        .step("lookup after write")?;
    expect_password("lookup after write", stored, Some(password))?;

    scope
        .set_password(service, username, "")
        .step("write empty password")?;
    let empty = scope
        .backend()
        .get_password(service, username)
        .step("lookup empty password")?;
    expect_password("lookup empty password", empty, Some(""))
}

/// Round trip with every field drawn from `pool`
pub fn set_get_with_pool(ctx: &mut CaseContext<'_>, pool: CharPool) -> Result<(), ConformanceError> {
    let source = pool.source(&mut ctx.rng);
    let (service, username, password) = ctx.random_triple(&source);
    check_set_get(ctx.scope, &service, &username, &password)
}

pub fn delete_present(ctx: &mut CaseContext<'_>) -> Result<(), ConformanceError> {
    let (service, username, password) = ctx.random_triple(DIFFICULT_CHARS);
    ctx.scope
        .set_password(&service, &username, &password)
        .step("write password")?;
    ctx.scope
        .delete_password(&service, &username)
        .step("delete existing entry")?;
    let after = ctx
        .scope
        .backend()
        .get_password(&service, &username)
        .step("lookup after delete")?;
    expect_password("lookup after delete", after, None)
}

pub fn delete_not_present(ctx: &mut CaseContext<'_>) -> Result<(), ConformanceError> {
    let username = ctx.random(DIFFICULT_CHARS);
    let service = ctx.random(DIFFICULT_CHARS);
    match ctx.scope.backend().delete_password(&service, &username) {
        Ok(()) => Err(ConformanceError::violation(
            "delete absent entry",
            "delete of a never-written entry succeeded",
        )),
        Err(e) if e.is_delete_error() => Ok(()),
        Err(source) => Err(ConformanceError::Backend {
            step: "delete absent entry",
            source,
        }),
    }
}

/// Deleting one username leaves another under the same service intact
pub fn delete_one_in_group(ctx: &mut CaseContext<'_>) -> Result<(), ConformanceError> {
    let username1 = ctx.random(DIFFICULT_CHARS);
    let mut username2 = ctx.random(DIFFICULT_CHARS);
    while username2 == username1 {
        username2 = ctx.random(DIFFICULT_CHARS);
    }
    let password = ctx.random(DIFFICULT_CHARS);
    let service = ctx.random(DIFFICULT_CHARS);

    ctx.scope
        .set_password(&service, &username1, &password)
        .step("write first user")?;
    ctx.scope
        .set_password(&service, &username2, &password)
        .step("write second user")?;
    ctx.scope
        .delete_password(&service, &username1)
        .step("delete first user")?;

    let backend = ctx.scope.backend();
    let deleted = backend
        .get_password(&service, &username1)
        .step("lookup deleted user")?;
    expect_password("lookup deleted user", deleted, None)?;
    let kept = backend
        .get_password(&service, &username2)
        .step("lookup remaining user")?;
    expect_password("lookup remaining user", kept, Some(password.as_str()))
}

pub fn name_property(ctx: &mut CaseContext<'_>) -> Result<(), ConformanceError> {
    let name = ctx.scope.backend().name();
    if is_ascii_printable(&name) {
        Ok(())
    } else {
        Err(ConformanceError::violation(
            "backend name",
            format!("{name:?} is not printable ASCII"),
        ))
    }
}

/// Interleaved writes for two users of one service and a user of another
/// service never shadow each other
pub fn different_user(ctx: &mut CaseContext<'_>) -> Result<(), ConformanceError> {
    let scope = &mut *ctx.scope;

    scope
        .set_password("service1", "user1", "password1")
        .step("write service1/user1")?;
    scope
        .set_password("service1", "user2", "password2")
        .step("write service1/user2")?;
    let user1 = scope
        .backend()
        .get_password("service1", "user1")
        .step("lookup service1/user1")?;
    expect_password("lookup service1/user1", user1, Some("password1"))?;
    let user2 = scope
        .backend()
        .get_password("service1", "user2")
        .step("lookup service1/user2")?;
    expect_password("lookup service1/user2", user2, Some("password2"))?;

    scope
        .set_password("service2", "user3", "password3")
        .step("write service2/user3")?;
    let user1 = scope
        .backend()
        .get_password("service1", "user1")
        .step("lookup service1/user1 after service2 write")?;
    expect_password("lookup service1/user1 after service2 write", user1, Some("password1"))
}

/// Service-only resolution may decline, but never invents a pair; an
/// explicit username resolves to exactly that pair.
pub fn credential(ctx: &mut CaseContext<'_>) -> Result<(), ConformanceError> {
    let scope = &mut *ctx.scope;

    let none = scope
        .backend()
        .get_credential("service", None)
        .step("resolve empty service")?;
    if let Some(cred) = none {
        return Err(ConformanceError::violation(
            "resolve empty service",
            format!("expected no credential, got {cred:?}"),
        ));
    }

    scope
        .set_password("service1", "user1", "password1")
        .step("write service1/user1")?;
    scope
        .set_password("service1", "user2", "password2")
        .step("write service1/user2")?;

    let stored = [
        Credential::new("user1", "password1"),
        Credential::new("user2", "password2"),
    ];
    let any = scope
        .backend()
        .get_credential("service1", None)
        .step("resolve without username")?;
    if let Some(cred) = any {
        if !stored.contains(&cred) {
            return Err(ConformanceError::violation(
                "resolve without username",
                format!("{cred:?} is not one of the stored pairs"),
            ));
        }
    }

    let exact = scope
        .backend()
        .get_credential("service1", Some("user2"))
        .step("resolve user2")?;
    match exact {
        Some(cred) if cred == stored[1] => Ok(()),
        other => Err(ConformanceError::violation(
            "resolve user2",
            format!("expected {:?}, got {other:?}", stored[1]),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{Fault, FaultyBackend, InMemoryBackend};
    use crate::traits::CredentialBackend;
    use rand::SeedableRng;

    fn run<F>(backend: impl CredentialBackend + 'static, check: F) -> Result<(), ConformanceError>
    where
        F: FnOnce(&mut CaseContext<'_>) -> Result<(), ConformanceError>,
    {
        run_with(backend, 1, 20, check)
    }

    fn run_with<F>(
        backend: impl CredentialBackend + 'static,
        seed: u64,
        string_length: usize,
        check: F,
    ) -> Result<(), ConformanceError>
    where
        F: FnOnce(&mut CaseContext<'_>) -> Result<(), ConformanceError>,
    {
        let mut scope = TestScope::new(Box::new(backend));
        let result = {
            let mut ctx = CaseContext {
                scope: &mut scope,
                rng: StdRng::seed_from_u64(seed),
                string_length,
            };
            check(&mut ctx)
        };
        scope.release();
        result
    }

    #[test]
    fn test_check_set_get_passes_on_reference_backend() {
        let store = InMemoryBackend::new();
        let mut scope = TestScope::new(Box::new(store.clone()));

        check_set_get(&mut scope, "svc", "alice", "pw1").unwrap();
        assert_eq!(store.get_password("svc", "alice").unwrap(), Some(String::new()));

        assert!(scope.release().is_empty());
        assert!(store.is_empty());
    }

    #[test]
    fn test_check_set_get_flags_preexisting_entry() {
        let store = InMemoryBackend::with_entries(vec![("svc", "alice", "old")]);
        let mut scope = TestScope::new(Box::new(store));

        let err = check_set_get(&mut scope, "svc", "alice", "pw1").unwrap_err();
        assert!(err.is_violation());
        assert!(err.to_string().starts_with("lookup before write"));
    }

    #[test]
    fn test_every_pool_round_trips() {
        for pool in CharPool::ALL {
            run(InMemoryBackend::new(), |ctx| set_get_with_pool(ctx, pool)).unwrap();
        }
    }

    #[test]
    fn test_empty_as_absent_is_flagged() {
        let err = run(FaultyBackend::new(Fault::EmptyPasswordAsAbsent), |ctx| {
            set_get_with_pool(ctx, CharPool::Default)
        })
        .unwrap_err();
        assert!(err.to_string().starts_with("lookup empty password"));
    }

    #[test]
    fn test_delete_checks() {
        run(InMemoryBackend::new(), delete_present).unwrap();
        run(InMemoryBackend::new(), delete_not_present).unwrap();
        run(InMemoryBackend::new(), delete_one_in_group).unwrap();
    }

    #[test]
    fn test_delete_one_in_group_with_single_char_names() {
        // One-character names from a small pool collide often
        for seed in 0..200 {
            let result = run_with(InMemoryBackend::new(), seed, 1, delete_one_in_group);
            assert!(result.is_ok(), "seed {seed}: {result:?}");
        }
    }

    #[test]
    fn test_silent_delete_is_flagged() {
        let err = run(FaultyBackend::new(Fault::SilentDeleteOfAbsent), delete_not_present).unwrap_err();
        assert!(err.is_violation());
    }

    #[test]
    fn test_unavailable_backend_is_not_a_violation() {
        let err = run(FaultyBackend::new(Fault::Unavailable), delete_not_present).unwrap_err();
        assert!(matches!(err, ConformanceError::Backend { step: "delete absent entry", .. }));
    }

    #[test]
    fn test_shared_slot_breaks_isolation() {
        let err = run(FaultyBackend::new(Fault::SharedSlotPerService), different_user).unwrap_err();
        assert!(err.is_violation());
        assert!(run(FaultyBackend::new(Fault::SharedSlotPerService), delete_one_in_group).is_err());
    }

    #[test]
    fn test_credential_checks() {
        run(InMemoryBackend::new(), credential).unwrap();
        let err = run(FaultyBackend::new(Fault::FabricatedCredential), credential).unwrap_err();
        assert!(err.to_string().starts_with("resolve empty service"));
    }

    #[test]
    fn test_name_property() {
        run(InMemoryBackend::new(), name_property).unwrap();
        assert!(run(FaultyBackend::new(Fault::NonPrintableName), name_property).is_err());
    }
}
