//! The result handed back to the caller after a successful issuance.

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use credmint_core::{Credential, LeasePolicy, Principal, Secret};

/// Data returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicData {
    pub username: Principal,
    pub password: Secret,
}

/// Data retained by the lease manager for later revocation.
///
/// Never contains the secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternalData {
    pub username: Principal,
}

/// A credential together with its lease.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretEnvelope {
    pub data: PublicData,
    pub internal: InternalData,
    /// The declared lease. This is the un-padded duration; the grace period
    /// only applies to the expiration written into the backing store.
    #[serde(with = "duration_secs")]
    pub lease_duration: Duration,
}

impl SecretEnvelope {
    pub fn build(credential: Credential, lease: &LeasePolicy) -> Self {
        Self {
            internal: InternalData {
                username: credential.principal.clone(),
            },
            data: PublicData {
                username: credential.principal,
                password: credential.secret,
            },
            lease_duration: lease.duration,
        }
    }
}

mod duration_secs {
    use super::*;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}
