//! Lease policy resolution and expiration computation.
//!
//! The declared lease handed to callers is the un-padded duration. The
//! expiration written into the backing store is padded by a grace factor so
//! that the store never disables a credential before its lease manager
//! expects it to.

use std::fmt::Write as _;
use std::time::Duration;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Utc};

use crate::error::LeaseError;
use crate::role::LeaseConfig;

/// Default lease when none is configured.
pub const DEFAULT_LEASE: Duration = Duration::from_secs(60 * 60);

/// Default grace factor (+10%).
pub const DEFAULT_GRACE_FACTOR: f64 = 0.1;

/// Default timestamp format for rendered expirations.
pub const DEFAULT_EXPIRATION_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Where the effective lease came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaseSource {
    Configured,
    Default,
}

/// The effective lease for one issuance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeasePolicy {
    pub duration: Duration,
    pub grace_factor: f64,
    pub source: LeaseSource,
}

/// A computed expiration: the instant and its rendered form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expiration {
    pub at: DateTime<Utc>,
    pub formatted: String,
}

impl LeasePolicy {
    /// The duration padded by the grace factor.
    ///
    /// Padding is computed in whole milliseconds and is never negative, so
    /// the result is always at least `duration`.
    pub fn padded_duration(&self) -> Result<Duration, LeaseError> {
        let millis =
            u64::try_from(self.duration.as_millis()).map_err(|_| LeaseError::OutOfRange)?;
        let grace = (millis as f64 * self.grace_factor).round();
        if !grace.is_finite() || grace >= u64::MAX as f64 {
            return Err(LeaseError::OutOfRange);
        }
        self.duration
            .checked_add(Duration::from_millis(grace as u64))
            .ok_or(LeaseError::OutOfRange)
    }

    /// Compute the grace-padded expiration relative to `now`.
    pub fn expiration(&self, now: DateTime<Utc>, format: &str) -> Result<Expiration, LeaseError> {
        let padded = chrono::Duration::from_std(self.padded_duration()?)
            .map_err(|_| LeaseError::OutOfRange)?;
        let at = now.checked_add_signed(padded).ok_or(LeaseError::OutOfRange)?;

        let mut formatted = String::new();
        write!(formatted, "{}", at.format(format))
            .map_err(|_| LeaseError::InvalidFormat(format.to_string()))?;

        Ok(Expiration { at, formatted })
    }
}

/// Resolves the effective lease from stored configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeaseResolver {
    default_lease: Duration,
    grace_factor: f64,
}

impl LeaseResolver {
    pub fn new(default_lease: Duration, grace_factor: f64) -> Result<Self, LeaseError> {
        if !grace_factor.is_finite() || grace_factor < 0.0 {
            return Err(LeaseError::InvalidGraceFactor(grace_factor));
        }
        if default_lease.is_zero() {
            return Err(LeaseError::OutOfRange);
        }
        Ok(Self {
            default_lease,
            grace_factor,
        })
    }

    /// Pick the stored lease, or the default when nothing usable is stored.
    ///
    /// A stored zero duration counts as unset.
    pub fn resolve(&self, stored: Option<LeaseConfig>) -> LeasePolicy {
        match stored {
            Some(cfg) if cfg.duration_secs > 0 => LeasePolicy {
                duration: Duration::from_secs(cfg.duration_secs),
                grace_factor: self.grace_factor,
                source: LeaseSource::Configured,
            },
            _ => LeasePolicy {
                duration: self.default_lease,
                grace_factor: self.grace_factor,
                source: LeaseSource::Default,
            },
        }
    }
}

impl Default for LeaseResolver {
    fn default() -> Self {
        Self {
            default_lease: DEFAULT_LEASE,
            grace_factor: DEFAULT_GRACE_FACTOR,
        }
    }
}

/// Check that `format` is a valid strftime-style format string.
pub fn validate_format(format: &str) -> Result<(), LeaseError> {
    if format.is_empty() || StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(LeaseError::InvalidFormat(format.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_missing_policy_uses_default() {
        let policy = LeaseResolver::default().resolve(None);
        assert_eq!(policy.duration, Duration::from_secs(3600));
        assert_eq!(policy.source, LeaseSource::Default);
    }

    #[test]
    fn test_zero_policy_uses_default() {
        let policy = LeaseResolver::default().resolve(Some(LeaseConfig::new(0)));
        assert_eq!(policy.source, LeaseSource::Default);
    }

    #[test]
    fn test_configured_policy() {
        let policy = LeaseResolver::default().resolve(Some(LeaseConfig::new(120)));
        assert_eq!(policy.duration, Duration::from_secs(120));
        assert_eq!(policy.source, LeaseSource::Configured);
    }

    #[test]
    fn test_expiration_is_padded_by_grace() {
        let policy = LeaseResolver::default().resolve(None);
        let exp = policy.expiration(t0(), DEFAULT_EXPIRATION_FORMAT).unwrap();
        assert_eq!(exp.at, t0() + chrono::Duration::minutes(66));
        assert_eq!(exp.formatted, "2026-03-01 13:06:00");
    }

    #[test]
    fn test_padding_never_shrinks_lease() {
        let resolver = LeaseResolver::new(Duration::from_secs(7), 0.0).unwrap();
        let policy = resolver.resolve(None);
        assert_eq!(policy.padded_duration().unwrap(), Duration::from_secs(7));
    }

    #[test]
    fn test_invalid_grace_factor() {
        assert!(LeaseResolver::new(DEFAULT_LEASE, -0.5).is_err());
        assert!(LeaseResolver::new(DEFAULT_LEASE, f64::NAN).is_err());
        assert!(LeaseResolver::new(Duration::ZERO, 0.1).is_err());
    }

    #[test]
    fn test_huge_lease_is_out_of_range() {
        let policy = LeaseResolver::default().resolve(Some(LeaseConfig::new(u64::MAX)));
        assert_eq!(
            policy.expiration(t0(), DEFAULT_EXPIRATION_FORMAT),
            Err(LeaseError::OutOfRange)
        );
    }

    #[test]
    fn test_validate_format() {
        assert!(validate_format(DEFAULT_EXPIRATION_FORMAT).is_ok());
        assert!(validate_format("%Y-%m-%dT%H:%M:%SZ").is_ok());
        assert!(validate_format("%Q").is_err());
        assert!(validate_format("").is_err());
    }
}
