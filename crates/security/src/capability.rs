//! Capability gate: role identifiers → permission tokens.
//!
//! Roles are matched after normalization (lowercase, spaces become `-`), so
//! `"Product Owner"` and `product-owner` are the same role. Unknown roles grant
//! nothing.

use std::collections::{BTreeMap, BTreeSet};

use sprintloop_config::AppConfig;
use sprintloop_core::PermissionSet;
use tracing::debug;

const VIEW: [&str; 4] = ["view_project", "view_milestones", "view_us", "view_tasks"];

/// Default Taiga role table.
const DEFAULT_ROLES: &[(&str, &[&str])] = &[
    ("product-owner", &["add_us", "add_task"]),
    ("scrum-master", &["add_us", "add_task"]),
    ("back", &["add_task"]),
    ("front", &["add_task"]),
    ("ux", &["add_task"]),
    ("design", &["add_task"]),
    ("stakeholder", &[]),
];

/// Normalize a role name for table lookup.
pub fn normalize_role(role: &str) -> String {
    role.trim().to_lowercase().replace(' ', "-")
}

/// Static role → permission table, built once and shared read-only.
#[derive(Debug, Clone)]
pub struct CapabilityGate {
    table: BTreeMap<String, BTreeSet<String>>,
}

impl Default for CapabilityGate {
    fn default() -> Self {
        let table = DEFAULT_ROLES
            .iter()
            .map(|(role, extra)| {
                let grants = VIEW.iter().chain(extra.iter()).map(|p| p.to_string());
                (role.to_string(), grants.collect())
            })
            .collect();
        Self { table }
    }
}

impl CapabilityGate {
    /// A gate with no roles at all.
    pub fn empty() -> Self {
        Self {
            table: BTreeMap::new(),
        }
    }

    /// Add a role or replace its grants.
    pub fn grant<I, S>(mut self, role: &str, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.table.insert(
            normalize_role(role),
            permissions.into_iter().map(Into::into).collect(),
        );
        self
    }

    /// Default table with the `[roles]` config section applied on top.
    pub fn from_config(config: &AppConfig) -> Self {
        config
            .roles
            .iter()
            .fold(Self::default(), |gate, (role, grants)| {
                gate.grant(role, grants.iter().cloned())
            })
    }

    /// Union of the grants of every known role.
    pub fn permissions_for<S: AsRef<str>>(&self, roles: &[S]) -> PermissionSet {
        let mut matched = 0usize;
        let permissions: PermissionSet = roles
            .iter()
            .filter_map(|role| self.table.get(&normalize_role(role.as_ref())))
            .inspect(|_| matched += 1)
            .flatten()
            .cloned()
            .collect();
        debug!(
            roles = roles.len(),
            matched,
            permissions = permissions.len(),
            "Derived permission set"
        );
        permissions
    }

    /// Known role names, sorted.
    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.table.keys().map(String::as_str)
    }
}
