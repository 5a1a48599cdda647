//! Proptest generators for property-based testing.

use proptest::prelude::*;

use credmint_core::{DisplayName, IssueRequest, LeaseConfig, RoleName};

/// Generate a valid role name.
pub fn role_name() -> impl Strategy<Value = RoleName> {
    "[A-Za-z0-9_]{1,64}".prop_filter_map("valid role name", |s| RoleName::new(s).ok())
}

/// Generate a display name of arbitrary printable text.
pub fn display_name() -> impl Strategy<Value = DisplayName> {
    "\\PC{0,120}".prop_filter_map("valid display name", |s| DisplayName::new(s).ok())
}

/// Generate a display name made only of identifier-safe characters.
pub fn plain_display_name(max_len: usize) -> impl Strategy<Value = DisplayName> {
    const SAFE: &[char] = &['a', 'b', 'c', 'x', 'y', 'z', '0', '1', '9', '_', '-'];
    prop::collection::vec(prop::sample::select(SAFE), 0..=max_len)
        .prop_filter_map("valid display name", |chars| {
            DisplayName::new(chars.into_iter().collect::<String>()).ok()
        })
}

/// Generate a lease duration between one second and thirty days.
pub fn lease_secs() -> impl Strategy<Value = u64> {
    1u64..=30 * 24 * 60 * 60
}

/// Generate a stored lease, sometimes absent and sometimes zero.
pub fn stored_lease() -> impl Strategy<Value = Option<LeaseConfig>> {
    prop_oneof![
        Just(None),
        Just(Some(LeaseConfig::new(0))),
        lease_secs().prop_map(|s| Some(LeaseConfig::new(s))),
    ]
}

/// Parameters for one issuance.
#[derive(Debug, Clone)]
pub struct IssueParams {
    pub role: RoleName,
    pub display_name: DisplayName,
    pub lease: Option<LeaseConfig>,
}

impl IssueParams {
    pub fn request(&self) -> IssueRequest {
        IssueRequest::from_parts(self.role.clone(), self.display_name.clone())
    }
}

impl Arbitrary for IssueParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (role_name(), display_name(), stored_lease())
            .prop_map(|(role, display_name, lease)| IssueParams {
                role,
                display_name,
                lease,
            })
            .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use credmint_core::{IdentityGenerator, LeaseResolver, OsRandom};

    proptest! {
        #[test]
        fn test_role_names_roundtrip_validation(name in role_name()) {
            prop_assert!(RoleName::new(name.as_str()).is_ok());
        }

        #[test]
        fn test_principal_bounded_for_any_display_name(params: IssueParams) {
            let gen = IdentityGenerator::default();
            let (principal, secret) = gen.generate(&params.display_name, &OsRandom);
            prop_assert!(principal.len() <= 63);
            prop_assert!(!secret.expose().is_empty());
        }

        #[test]
        fn test_resolved_lease_is_positive(lease in stored_lease()) {
            let policy = LeaseResolver::default().resolve(lease);
            prop_assert!(!policy.duration.is_zero());
            prop_assert!(policy.padded_duration().unwrap() >= policy.duration);
        }

        #[test]
        fn test_plain_names_keep_their_prefix(name in plain_display_name(20)) {
            let gen = IdentityGenerator::default();
            let (principal, _) = gen.generate(&name, &OsRandom);
            if !name.as_str().is_empty() {
                prop_assert!(principal.as_str().starts_with(name.as_str()));
            }
        }
    }
}
