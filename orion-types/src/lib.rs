use std::collections::HashSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod num;

/// Composite identity of a project. Immutable once created.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProjectKey {
    pub project_name: String,
    /// UTC ISO-8601 timestamp of project creation, stored as a string.
    pub created_at: String,
}

impl ProjectKey {
    pub fn new(project_name: impl Into<String>, created_at: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            created_at: created_at.into(),
        }
    }
}

/// A single requested capture: which filter, how long, how many images.
///
/// Equality is exact structural equality over every field, including `count`.
/// Progress reconciliation relies on this: changing only the count of an
/// otherwise-identical exposure makes it a different exposure.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ExposureRequest {
    pub filter: String,
    #[serde(with = "num::decimal", default)]
    pub exposure_time: Decimal,
    #[serde(with = "num::decimal", default)]
    pub count: Decimal,
    #[serde(with = "num::decimal", default = "num::one")]
    pub bin: Decimal,
}

/// A tracked observation request with per-exposure completion state.
///
/// Invariant: `exposures`, `project_data` and `remaining` always have the
/// same length. `remaining[i]` counts images still wanted for `exposures[i]`
/// and may go negative (decrements are unguarded). `project_data[i]` lists
/// base filenames already captured for `exposures[i]`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Project {
    pub project_name: String,
    pub created_at: String,
    pub user_id: String,

    // Opaque structured fields, copied verbatim on update.
    pub project_constraints: Value,
    pub project_note: Value,
    pub project_targets: Value,
    pub project_sites: Value,
    pub project_priority: Value,

    pub exposures: Vec<ExposureRequest>,
    pub project_data: Vec<Vec<String>>,
    #[serde(with = "num::decimal_seq")]
    pub remaining: Vec<Decimal>,

    /// Calendar event ids referencing this project. List with set semantics:
    /// duplicates are rejected at insertion, order carries no meaning.
    pub scheduled_with_events: Vec<String>,
}

impl Project {
    pub fn key(&self) -> ProjectKey {
        ProjectKey::new(self.project_name.clone(), self.created_at.clone())
    }
}

/// Caller-supplied replacement fields for a project update.
///
/// Identity is never rebound: a `project_name` submitted here is carried on
/// the wire for symmetry with new-project payloads but the existing key and
/// owner always win.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectChanges {
    pub project_name: String,
    pub project_constraints: Value,
    pub project_note: Value,
    pub project_targets: Value,
    pub project_sites: Value,
    pub project_priority: Value,
    pub scheduled_with_events: Vec<String>,
    pub exposures: Vec<ExposureRequest>,
}

/// A role granted by the external identity layer.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    Admin,
    Other(String),
}

impl From<String> for Role {
    fn from(s: String) -> Self {
        if s == "admin" {
            Role::Admin
        } else {
            Role::Other(s)
        }
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        match role {
            Role::Admin => "admin".into(),
            Role::Other(s) => s,
        }
    }
}

/// Identity and role set of the caller, as produced by the external
/// authorizer. The core never authenticates; it only consumes this.
#[derive(Clone, Debug)]
pub struct Caller {
    pub user_id: String,
    pub roles: HashSet<Role>,
}

impl Caller {
    pub fn new(user_id: impl Into<String>, roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            user_id: user_id.into(),
            roles: roles.into_iter().collect(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.roles.contains(&Role::Admin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parsing_distinguishes_admin() {
        let caller = Caller::new(
            "google-oauth2|100354044221813550027",
            ["admin".to_string().into(), "observer".to_string().into()],
        );
        assert!(caller.is_admin());

        let caller = Caller::new("u1", [Role::from("observer".to_string())]);
        assert!(!caller.is_admin());
    }

    #[test]
    fn exposure_equality_includes_count() {
        let a = ExposureRequest {
            filter: "R".into(),
            exposure_time: Decimal::new(25, 1), // 2.5
            count: Decimal::from(10),
            bin: Decimal::ONE,
        };
        let mut b = a.clone();
        assert_eq!(a, b);

        b.count = Decimal::from(5);
        assert_ne!(a, b);
    }

    #[test]
    fn exposure_bin_defaults_to_one() {
        let e: ExposureRequest =
            serde_json::from_str(r#"{"filter":"B","exposure_time":30,"count":4}"#).unwrap();
        assert_eq!(e.bin, Decimal::ONE);
    }

    #[test]
    fn project_roundtrips_through_json() {
        let project = Project {
            project_name: "m101".into(),
            created_at: "2020-06-24T16:53:56Z".into(),
            user_id: "u1".into(),
            exposures: vec![ExposureRequest {
                filter: "R".into(),
                exposure_time: Decimal::from(30),
                count: Decimal::from(10),
                bin: Decimal::from(2),
            }],
            project_data: vec![vec!["a.fits".into()]],
            remaining: vec![Decimal::from(9)],
            scheduled_with_events: vec!["evt-1".into()],
            ..Default::default()
        };

        let json = serde_json::to_string(&project).unwrap();
        let back: Project = serde_json::from_str(&json).unwrap();
        assert_eq!(back.project_name, "m101");
        assert_eq!(back.exposures, project.exposures);
        assert_eq!(back.remaining, project.remaining);
        assert_eq!(back.project_data, project.project_data);
    }
}
