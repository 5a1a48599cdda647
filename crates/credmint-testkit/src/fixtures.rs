//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use uuid::Uuid;

use credmint::{Engine, EngineConfig};
use credmint_core::{FixedClock, RandomSource, Role, RoleName};
use credmint_store::{ConfigStore, MemoryBackend, MemoryConfigStore};

/// Role that creates a login principal and grants one privilege.
pub const READONLY_ROLE: &str = "readonly";
pub const READONLY_STATEMENTS: &str = "\
    CREATE USER \"{{name}}\" WITH PASSWORD '{{password}}' VALID UNTIL '{{expiration}}';\n\
    GRANT SELECT ON accounts TO \"{{name}}\";";

/// Role whose second statement is always rejected by the backing store.
pub const BAD_GRANT_ROLE: &str = "bad_grant";
pub const BAD_GRANT_STATEMENTS: &str = "CREATE USER {{name}}; GRANT BAD_PERMISSION TO {{name}}";

/// Role with several grants and an explicit revocation.
pub const WRITER_ROLE: &str = "writer";
pub const WRITER_STATEMENTS: &str = "\
    CREATE ROLE \"{{name}}\" WITH LOGIN PASSWORD '{{password}}' VALID UNTIL '{{expiration}}';\n\
    GRANT SELECT ON accounts TO \"{{name}}\";\n\
    GRANT INSERT ON accounts TO \"{{name}}\";\n\
    GRANT UPDATE ON accounts TO \"{{name}}\";";
pub const WRITER_REVOCATION: &str = "\
    REVOKE ALL ON accounts FROM \"{{name}}\";\n\
    DROP ROLE \"{{name}}\";";

/// The instant every fixture clock is frozen at.
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0)
        .single()
        .unwrap_or_default()
}

/// Deterministic randomness from a seed.
#[derive(Debug)]
pub struct SeededRandom(Mutex<StdRng>);

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self(Mutex::new(StdRng::seed_from_u64(seed)))
    }
}

impl RandomSource for SeededRandom {
    fn uuid(&self) -> Uuid {
        let mut bytes = [0u8; 16];
        self.0
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .fill_bytes(&mut bytes);
        uuid::Builder::from_random_bytes(bytes).into_uuid()
    }
}

/// Randomness that always yields the same UUID. Every principal collides.
#[derive(Debug, Clone, Copy)]
pub struct FixedRandom(pub Uuid);

impl RandomSource for FixedRandom {
    fn uuid(&self) -> Uuid {
        self.0
    }
}

/// A test fixture with seeded in-memory stores and a frozen clock.
pub struct TestFixture {
    pub config_store: Arc<MemoryConfigStore>,
    pub backend: Arc<MemoryBackend>,
    pub clock: FixedClock,
}

impl TestFixture {
    /// Create a fixture with the standard roles installed.
    pub async fn new() -> Self {
        let fixture = Self::empty();
        fixture.add_role(READONLY_ROLE, READONLY_STATEMENTS, None).await;
        fixture.add_role(BAD_GRANT_ROLE, BAD_GRANT_STATEMENTS, None).await;
        fixture
            .add_role(WRITER_ROLE, WRITER_STATEMENTS, Some(WRITER_REVOCATION))
            .await;
        fixture
    }

    /// Create a fixture with no roles.
    pub fn empty() -> Self {
        Self {
            config_store: Arc::new(MemoryConfigStore::new()),
            backend: Arc::new(MemoryBackend::new()),
            clock: FixedClock(fixed_now()),
        }
    }

    /// Install a role. Panics on an invalid name; fixtures use literals.
    pub async fn add_role(&self, name: &str, statements: &str, revocation: Option<&str>) {
        let name =
            RoleName::new(name).unwrap_or_else(|e| panic!("bad fixture role {}: {}", name, e));
        let mut role = Role::new(name, statements);
        if let Some(revocation) = revocation {
            role = role.with_revocation(revocation);
        }
        if let Err(e) = self.config_store.put_role(&role).await {
            panic!("failed to install fixture role: {}", e);
        }
    }

    /// An engine over this fixture's stores with default configuration.
    pub fn engine(&self) -> Engine<MemoryConfigStore, MemoryBackend> {
        self.engine_with(EngineConfig::default())
    }

    /// An engine over this fixture's stores.
    pub fn engine_with(&self, config: EngineConfig) -> Engine<MemoryConfigStore, MemoryBackend> {
        Engine::from_shared(
            Arc::clone(&self.config_store),
            Arc::clone(&self.backend),
            config,
        )
        .unwrap_or_else(|e| panic!("invalid fixture config: {}", e))
        .with_clock(Arc::new(self.clock))
    }
}
