//! Role scenarios with known outcomes.
//!
//! Each scenario is a statement template and the result issuing against it
//! must produce on the in-memory backend. Running every scenario checks the
//! whole pipeline from rendering through commit or rollback.

use credmint::{EngineError, SecretEnvelope};
use credmint_store::MemoryBackend;

use crate::fixtures::TestFixture;

/// Expected result of issuing against a scenario's role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The credential is created with this many grants.
    Committed { grants: usize },
    /// Statement `index` fails and nothing is created.
    RolledBack { index: usize },
    /// The template is rejected before the backing store is touched.
    TemplateRejected,
}

/// A role template with its expected outcome.
#[derive(Debug, Clone)]
pub struct RoleScenario {
    /// Human-readable name; also the role name.
    pub name: &'static str,
    pub statements: &'static str,
    pub outcome: Outcome,
}

/// Get all role scenarios.
pub fn all_scenarios() -> Vec<RoleScenario> {
    vec![
        RoleScenario {
            name: "single_create",
            statements: "CREATE USER \"{{name}}\" WITH PASSWORD '{{password}}'",
            outcome: Outcome::Committed { grants: 0 },
        },
        RoleScenario {
            name: "create_and_grant",
            statements: "CREATE USER \"{{name}}\" WITH PASSWORD '{{password}}' \
                         VALID UNTIL '{{expiration}}';\
                         GRANT SELECT ON accounts TO \"{{name}}\";",
            outcome: Outcome::Committed { grants: 1 },
        },
        RoleScenario {
            name: "semicolon_in_literal",
            statements: "CREATE USER \"{{name}}\" WITH PASSWORD 'a;b';\
                         GRANT USAGE ON app TO \"{{name}}\"",
            outcome: Outcome::Committed { grants: 1 },
        },
        RoleScenario {
            name: "comment_between_statements",
            statements: "CREATE USER \"{{name}}\";\n\
                         -- read access only; no writes\n\
                         GRANT SELECT ON accounts TO \"{{name}}\";",
            outcome: Outcome::Committed { grants: 1 },
        },
        RoleScenario {
            name: "trailing_comment",
            statements: "CREATE USER \"{{name}}\";\n\
                         GRANT SELECT ON accounts TO \"{{name}}\";\n\
                         -- issued by credmint",
            outcome: Outcome::Committed { grants: 1 },
        },
        RoleScenario {
            name: "only_comments",
            statements: "-- nothing here yet;\n-- {{name}}\n",
            outcome: Outcome::TemplateRejected,
        },
        RoleScenario {
            name: "bad_privilege",
            statements: "CREATE USER {{name}}; GRANT BAD_PERMISSION TO {{name}}",
            outcome: Outcome::RolledBack { index: 1 },
        },
        RoleScenario {
            name: "grant_to_missing_user",
            statements: "CREATE USER \"{{name}}\";\
                         GRANT SELECT ON accounts TO \"someone_else\";\
                         GRANT INSERT ON accounts TO \"{{name}}\"",
            outcome: Outcome::RolledBack { index: 1 },
        },
        RoleScenario {
            name: "unsupported_statement_last",
            statements: "CREATE USER \"{{name}}\";\
                         GRANT SELECT ON accounts TO \"{{name}}\";\
                         VACUUM",
            outcome: Outcome::RolledBack { index: 2 },
        },
        RoleScenario {
            name: "only_separators",
            statements: " ; ;\n ; ",
            outcome: Outcome::TemplateRejected,
        },
        RoleScenario {
            name: "unterminated_literal",
            statements: "CREATE USER \"{{name}}\" WITH PASSWORD '{{password}}",
            outcome: Outcome::TemplateRejected,
        },
    ]
}

/// Issue once against `scenario` on a fresh fixture.
///
/// Returns the issuance result and the backend it ran against.
pub async fn run_scenario(
    scenario: &RoleScenario,
) -> (Result<SecretEnvelope, EngineError>, MemoryBackend) {
    let fixture = TestFixture::empty();
    fixture.add_role(scenario.name, scenario.statements, None).await;
    let result = fixture.engine().issue_raw(scenario.name, "scenario").await;
    (result, (*fixture.backend).clone())
}

/// Check one scenario against its expected outcome.
pub async fn verify_scenario(scenario: &RoleScenario) -> Result<(), String> {
    let (result, backend) = run_scenario(scenario).await;
    let stats = backend.stats();

    match (scenario.outcome, result) {
        (Outcome::Committed { grants }, Ok(envelope)) => {
            let record = backend
                .principal(envelope.data.username.as_str())
                .ok_or_else(|| format!("{}: principal missing after commit", scenario.name))?;
            if record.grants.len() != grants {
                return Err(format!(
                    "{}: expected {} grants, found {}",
                    scenario.name,
                    grants,
                    record.grants.len()
                ));
            }
            Ok(())
        }
        (Outcome::RolledBack { index }, Err(EngineError::Execution { index: got, .. })) => {
            if got != index {
                return Err(format!(
                    "{}: expected failure at statement {}, got {}",
                    scenario.name, index, got
                ));
            }
            if backend.principal_count() != 0 || stats.committed != 0 || stats.rolled_back != 1 {
                return Err(format!("{}: rollback left state behind", scenario.name));
            }
            Ok(())
        }
        (Outcome::TemplateRejected, Err(EngineError::Template(_))) => {
            if stats.begun != 0 {
                return Err(format!("{}: backend touched for a bad template", scenario.name));
            }
            Ok(())
        }
        (expected, got) => Err(format!(
            "{}: expected {:?}, got {:?}",
            scenario.name, expected, got
        )),
    }
}

/// Verify every scenario, collecting all failures.
pub async fn verify_all_scenarios() -> Vec<String> {
    let mut failures = Vec::new();
    for scenario in all_scenarios() {
        if let Err(e) = verify_scenario(&scenario).await {
            failures.push(e);
        }
    }
    failures
}
