//! End-to-end issuance against the in-memory backing store.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use credmint::{EngineConfig, EngineError, LeaseConfig, PublicErrorCode, RoleName};
use credmint_store::ConfigStore;
use credmint_testkit::fixtures::{
    fixed_now, BAD_GRANT_ROLE, READONLY_ROLE, WRITER_ROLE,
};
use credmint_testkit::{FixedRandom, SeededRandom, TestFixture};
use uuid::Uuid;

fn parse_expiration(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
}

// ─────────────────────────────────────────────────────────────────────────────
// Atomicity
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_bad_grant_leaves_no_user_behind() {
    let fixture = TestFixture::new().await;
    let engine = fixture
        .engine()
        .with_random(Arc::new(FixedRandom(Uuid::from_u128(42))));

    let err = engine.issue_raw(BAD_GRANT_ROLE, "alice").await.unwrap_err();

    assert!(matches!(err, EngineError::Execution { index: 1, .. }));
    let name = format!("alice-{}", Uuid::from_u128(42).hyphenated());
    assert!(!fixture.backend.has_principal(&name));
    assert_eq!(fixture.backend.principal_count(), 0);

    let stats = fixture.backend.stats();
    assert_eq!(stats.begun, 1);
    assert_eq!(stats.committed, 0);
    assert_eq!(stats.rolled_back, 1);
}

#[tokio::test]
async fn test_failure_after_several_statements_rolls_back_all() {
    let fixture = TestFixture::new().await;
    fixture.backend.set_fail_statement(Some("GRANT UPDATE"));

    let err = fixture.engine().issue_raw(WRITER_ROLE, "bob").await.unwrap_err();

    assert!(matches!(err, EngineError::Execution { index: 3, .. }));
    assert_eq!(fixture.backend.principal_count(), 0);
    // CREATE and two GRANTs ran before the failure.
    assert_eq!(fixture.backend.stats().executed, 3);
}

#[tokio::test]
async fn test_commit_failure_means_no_credential() {
    let fixture = TestFixture::new().await;
    fixture.backend.set_fail_commit(true);

    let err = fixture.engine().issue_raw(READONLY_ROLE, "carol").await.unwrap_err();

    assert!(matches!(err, EngineError::Commit(_)));
    assert_eq!(err.public().code, PublicErrorCode::Internal);
    assert_eq!(fixture.backend.principal_count(), 0);
    assert_eq!(fixture.backend.stats().rolled_back, 1);
}

#[tokio::test]
async fn test_unreachable_store_is_internal_error() {
    let fixture = TestFixture::new().await;
    fixture.backend.set_fail_begin(true);

    let err = fixture.engine().issue_raw(READONLY_ROLE, "dave").await.unwrap_err();

    assert!(matches!(err, EngineError::Connection(_)));
    assert_eq!(err.public().code, PublicErrorCode::Internal);
    assert!(!err.public().message.contains("refused"));
}

#[tokio::test]
async fn test_principal_collision_fails_cleanly() {
    let fixture = TestFixture::new().await;
    let engine = fixture
        .engine()
        .with_random(Arc::new(FixedRandom(Uuid::from_u128(7))));

    let first = engine.issue_raw(READONLY_ROLE, "eve").await.unwrap();
    let err = engine.issue_raw(READONLY_ROLE, "eve").await.unwrap_err();

    assert!(matches!(err, EngineError::Execution { index: 0, .. }));
    let record = fixture
        .backend
        .principal(first.data.username.as_str())
        .unwrap();
    assert_eq!(record.password.as_deref(), Some(first.data.password.expose()));
    assert_eq!(fixture.backend.principal_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_dropped_caller_does_not_orphan_transaction() {
    let fixture = TestFixture::new().await;
    let engine = fixture.engine();

    let _ = tokio::time::timeout(Duration::ZERO, engine.issue_raw(WRITER_ROLE, "frank")).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    let stats = fixture.backend.stats();
    assert_eq!(stats.begun, stats.committed + stats.rolled_back);
    assert_eq!(fixture.backend.principal_count(), stats.committed);
}

// ─────────────────────────────────────────────────────────────────────────────
// Uniqueness and length bounding
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_issuances_yield_distinct_principals() {
    const N: usize = 1000;
    let fixture = TestFixture::new().await;
    let engine = Arc::new(fixture.engine());

    let mut handles = Vec::with_capacity(N);
    for _ in 0..N {
        let engine = Arc::clone(&engine);
        handles.push(tokio::spawn(async move {
            engine.issue_raw(READONLY_ROLE, "load").await.unwrap()
        }));
    }

    let mut names = HashSet::new();
    for handle in handles {
        let envelope = handle.await.unwrap();
        names.insert(envelope.data.username.as_str().to_string());
    }

    assert_eq!(names.len(), N);
    assert_eq!(fixture.backend.principal_count(), N);
}

#[tokio::test]
async fn test_long_display_name_is_bounded() {
    let fixture = TestFixture::new().await;
    let envelope = fixture
        .engine()
        .issue_raw(READONLY_ROLE, &"d".repeat(100))
        .await
        .unwrap();

    let name = envelope.data.username.as_str();
    assert!(name.len() <= 63);
    assert!(name.starts_with(&"d".repeat(26)));
    assert!(fixture.backend.has_principal(name));
}

#[tokio::test]
async fn test_short_display_name_is_kept_whole() {
    let fixture = TestFixture::new().await;
    let envelope = fixture.engine().issue_raw(READONLY_ROLE, "short").await.unwrap();

    let name = envelope.data.username.as_str();
    let suffix = name.strip_prefix("short-").unwrap();
    assert!(!suffix.is_empty());
    assert!(Uuid::parse_str(suffix).is_ok());
}

#[tokio::test]
async fn test_seeded_random_gives_reproducible_principals() {
    let a = TestFixture::new().await;
    let b = TestFixture::new().await;

    let ea = a
        .engine()
        .with_random(Arc::new(SeededRandom::new(99)))
        .issue_raw(READONLY_ROLE, "ci")
        .await
        .unwrap();
    let eb = b
        .engine()
        .with_random(Arc::new(SeededRandom::new(99)))
        .issue_raw(READONLY_ROLE, "ci")
        .await
        .unwrap();

    assert_eq!(ea.data.username, eb.data.username);
    assert_eq!(ea.data.password, eb.data.password);
}

// ─────────────────────────────────────────────────────────────────────────────
// Leases
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_lease_falls_back_to_one_hour() {
    let fixture = TestFixture::new().await;
    let envelope = fixture.engine().issue_raw(READONLY_ROLE, "gina").await.unwrap();

    assert_eq!(envelope.lease_duration, Duration::from_secs(3600));
    let record = fixture
        .backend
        .principal(envelope.data.username.as_str())
        .unwrap();
    assert_eq!(record.valid_until.as_deref(), Some("2026-03-01 13:06:00"));
}

#[tokio::test]
async fn test_zero_lease_falls_back_to_default() {
    let fixture = TestFixture::new().await;
    fixture
        .config_store
        .put_lease(&LeaseConfig::new(0))
        .await
        .unwrap();

    let envelope = fixture.engine().issue_raw(READONLY_ROLE, "hal").await.unwrap();
    assert_eq!(envelope.lease_duration, Duration::from_secs(3600));
}

#[tokio::test]
async fn test_expiration_padded_by_grace_factor() {
    let fixture = TestFixture::new().await;
    fixture
        .config_store
        .put_lease(&LeaseConfig::new(7200))
        .await
        .unwrap();

    let envelope = fixture.engine().issue_raw(READONLY_ROLE, "ivan").await.unwrap();
    assert_eq!(envelope.lease_duration, Duration::from_secs(7200));

    let record = fixture
        .backend
        .principal(envelope.data.username.as_str())
        .unwrap();
    let valid_until = parse_expiration(record.valid_until.as_deref().unwrap());
    let declared_end = fixed_now().naive_utc() + chrono::Duration::seconds(7200);

    assert!(valid_until > declared_end);
    assert_eq!(valid_until - declared_end, chrono::Duration::seconds(720));
}

#[tokio::test]
async fn test_custom_grace_factor_and_default_lease() {
    let fixture = TestFixture::new().await;
    let config = EngineConfig {
        default_lease_secs: 1000,
        grace_factor: 0.25,
        ..EngineConfig::default()
    };

    let envelope = fixture
        .engine_with(config)
        .issue_raw(READONLY_ROLE, "judy")
        .await
        .unwrap();
    assert_eq!(envelope.lease_duration, Duration::from_secs(1000));

    let record = fixture
        .backend
        .principal(envelope.data.username.as_str())
        .unwrap();
    let valid_until = parse_expiration(record.valid_until.as_deref().unwrap());
    assert_eq!(
        valid_until - fixed_now().naive_utc(),
        chrono::Duration::seconds(1250)
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Request and role errors
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_unknown_role_opens_no_transaction() {
    let fixture = TestFixture::new().await;
    let err = fixture.engine().issue_raw("nonexistent", "kim").await.unwrap_err();

    assert!(matches!(err, EngineError::UnknownRole(_)));
    let public = err.public();
    assert_eq!(public.code, PublicErrorCode::UnknownRole);
    assert_eq!(public.message, "unknown role: nonexistent");
    assert_eq!(fixture.backend.stats().begun, 0);
}

#[tokio::test]
async fn test_malformed_role_name_is_rejected_at_boundary() {
    let fixture = TestFixture::new().await;
    for bad in ["", "has space", "semi;colon", "dash-ed"] {
        let err = fixture.engine().issue_raw(bad, "x").await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidRequest(_)), "{:?}", bad);
        assert_eq!(err.public().code, PublicErrorCode::InvalidRequest);
    }
    assert_eq!(fixture.backend.stats().begun, 0);
}

#[tokio::test]
async fn test_display_name_is_sanitized_in_statements() {
    let fixture = TestFixture::new().await;
    let envelope = fixture
        .engine()
        .issue_raw(READONLY_ROLE, "o'brien\"; DROP USER x")
        .await
        .unwrap();

    let name = envelope.data.username.as_str();
    assert!(name.starts_with("o_brien___DROP_USER_x-"));
    assert!(fixture.backend.has_principal(name));
}

// ─────────────────────────────────────────────────────────────────────────────
// Revocation
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_revoke_with_role_statements() {
    let fixture = TestFixture::new().await;
    let engine = fixture.engine();
    let envelope = engine.issue_raw(WRITER_ROLE, "lee").await.unwrap();
    assert_eq!(
        fixture
            .backend
            .principal(envelope.data.username.as_str())
            .unwrap()
            .grants
            .len(),
        3
    );

    engine
        .revoke(&RoleName::new(WRITER_ROLE).unwrap(), &envelope.internal)
        .await
        .unwrap();
    assert_eq!(fixture.backend.principal_count(), 0);
}

#[tokio::test]
async fn test_revoke_after_role_removed_uses_default() {
    let fixture = TestFixture::new().await;
    let envelope = fixture.engine().issue_raw(READONLY_ROLE, "mia").await.unwrap();

    let gone = RoleName::new("retired").unwrap();
    fixture.engine().revoke(&gone, &envelope.internal).await.unwrap();
    assert_eq!(fixture.backend.principal_count(), 0);

    // Revoking again is harmless with the default IF EXISTS statement.
    fixture.engine().revoke(&gone, &envelope.internal).await.unwrap();
}

#[tokio::test]
async fn test_failed_revoke_keeps_principal() {
    let fixture = TestFixture::new().await;
    let engine = fixture.engine();
    let envelope = engine.issue_raw(WRITER_ROLE, "ned").await.unwrap();

    fixture.backend.set_fail_statement(Some("DROP"));
    let err = engine
        .revoke(&RoleName::new(WRITER_ROLE).unwrap(), &envelope.internal)
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::Execution { index: 1, .. }));
    let record = fixture
        .backend
        .principal(envelope.data.username.as_str())
        .unwrap();
    // The REVOKE that ran first was rolled back too.
    assert_eq!(record.grants.len(), 3);
}
