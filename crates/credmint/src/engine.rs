//! The Engine: issues and revokes credentials.
//!
//! The engine ties together the configuration store, the identity generator,
//! lease resolution, template rendering and the transactional executor.

use std::sync::Arc;

use credmint_core::template::{EXPIRATION_KEY, NAME_KEY, PASSWORD_KEY};
use credmint_core::{
    render_all, Bindings, Clock, Credential, IdentityGenerator, IssueRequest, LeaseResolver,
    OsRandom, RandomSource, RoleName, SystemClock,
};
use credmint_store::{Backend, ConfigStore};

use crate::config::{ConfigError, EngineConfig};
use crate::envelope::{InternalData, SecretEnvelope};
use crate::error::{EngineError, Result};
use crate::executor::TransactionalExecutor;

/// Issues dynamic credentials.
///
/// Each call to [`Engine::issue`] mints a unique principal and secret,
/// creates them in the backing store in one transaction, and returns them
/// with their lease. Issuances share no mutable state, so one engine can
/// serve any number of concurrent callers.
pub struct Engine<C: ConfigStore, B: Backend> {
    /// Role and lease configuration.
    config_store: Arc<C>,
    /// Runs rendered statements against the backing store.
    executor: TransactionalExecutor<B>,
    config: EngineConfig,
    leases: LeaseResolver,
    identities: IdentityGenerator,
    clock: Arc<dyn Clock>,
    random: Arc<dyn RandomSource>,
}

impl<C: ConfigStore, B: Backend> Engine<C, B> {
    /// Create a new engine.
    pub fn new(
        config_store: C,
        backend: B,
        config: EngineConfig,
    ) -> std::result::Result<Self, ConfigError> {
        Self::from_shared(Arc::new(config_store), Arc::new(backend), config)
    }

    /// Create an engine over stores that are shared with other owners.
    pub fn from_shared(
        config_store: Arc<C>,
        backend: Arc<B>,
        config: EngineConfig,
    ) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config_store,
            executor: TransactionalExecutor::new(backend),
            leases: config.lease_resolver()?,
            identities: config.identity_generator(),
            config,
            clock: Arc::new(SystemClock),
            random: Arc::new(OsRandom),
        })
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the randomness source.
    pub fn with_random(mut self, random: Arc<dyn RandomSource>) -> Self {
        self.random = random;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn config_store(&self) -> &C {
        &self.config_store
    }

    pub fn backend(&self) -> &B {
        self.executor.backend()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Issuance
    // ─────────────────────────────────────────────────────────────────────────

    /// Issue a credential for `request`.
    ///
    /// On success the principal exists in the backing store with every
    /// statement of the role applied. On failure nothing was committed.
    pub async fn issue(&self, request: &IssueRequest) -> Result<SecretEnvelope> {
        match self.mint(request).await {
            Ok(envelope) => Ok(envelope),
            Err(e) => {
                if e.is_user_error() {
                    tracing::debug!(role = %request.role, error = %e, "issuance refused");
                } else {
                    tracing::warn!(role = %request.role, error = %e, "issuance failed");
                }
                Err(e)
            }
        }
    }

    /// Validate raw caller input and issue a credential.
    pub async fn issue_raw(&self, role: &str, display_name: &str) -> Result<SecretEnvelope> {
        let request = IssueRequest::new(role, display_name)?;
        self.issue(&request).await
    }

    async fn mint(&self, request: &IssueRequest) -> Result<SecretEnvelope> {
        let role = self
            .config_store
            .get_role(&request.role)
            .await?
            .ok_or_else(|| EngineError::UnknownRole(request.role.clone()))?;

        let lease = self.leases.resolve(self.config_store.get_lease().await?);
        let expiration = lease.expiration(self.clock.now(), &self.config.expiration_format)?;

        let (principal, secret) = self
            .identities
            .generate(&request.display_name, self.random.as_ref());

        let bindings = Bindings::new()
            .bind(NAME_KEY, principal.as_str())
            .bind(PASSWORD_KEY, secret.expose())
            .bind(EXPIRATION_KEY, expiration.formatted.as_str());
        let statements = render_all(&role.creation_statements, &bindings)?;
        let count = statements.len();

        self.executor.execute(statements).await?;

        tracing::info!(
            role = %role.name,
            principal = %principal,
            statements = count,
            lease_secs = lease.duration.as_secs(),
            expires_at = %expiration.at,
            "issued credential"
        );

        let credential = Credential {
            principal,
            secret,
            expires_at: expiration.at,
            expiration: expiration.formatted,
        };
        Ok(SecretEnvelope::build(credential, &lease))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Revocation
    // ─────────────────────────────────────────────────────────────────────────

    /// Drop a principal previously issued under `role`.
    ///
    /// Uses the role's revocation statements, or the configured default when
    /// the role defines none or no longer exists.
    pub async fn revoke(&self, role: &RoleName, internal: &InternalData) -> Result<()> {
        let template = match self.config_store.get_role(role).await? {
            Some(r) => r
                .revocation_statements
                .unwrap_or_else(|| self.config.default_revocation.clone()),
            None => self.config.default_revocation.clone(),
        };

        let bindings = Bindings::new().bind(NAME_KEY, internal.username.as_str());
        let statements = render_all(&template, &bindings)?;

        match self.executor.execute(statements).await {
            Ok(_) => {
                tracing::info!(
                    role = %role,
                    principal = %internal.username,
                    "revoked credential"
                );
                Ok(())
            }
            Err(e) => {
                let e = EngineError::from(e);
                tracing::warn!(
                    role = %role,
                    principal = %internal.username,
                    error = %e,
                    "revocation failed"
                );
                Err(e)
            }
        }
    }
}
