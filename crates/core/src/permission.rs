//! Permission tokens granted to a caller for the duration of one run.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// An immutable set of opaque permission tokens.
///
/// Built once per request (see the capability gate in `sprintloop-security`)
/// and only read afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionSet(BTreeSet<String>);

impl PermissionSet {
    /// An empty set; no tool requiring a permission is visible.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn contains(&self, token: &str) -> bool {
        self.0.contains(token)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether every required token is granted.
    pub fn covers<S: AsRef<str>>(&self, required: &[S]) -> bool {
        required.iter().all(|r| self.contains(r.as_ref()))
    }

    /// Required tokens that are not granted, in the order given.
    pub fn missing<'a, S: AsRef<str>>(&self, required: &'a [S]) -> Vec<&'a str> {
        required
            .iter()
            .map(AsRef::as_ref)
            .filter(|r| !self.contains(r))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn covers_subset() {
        let perms: PermissionSet = ["view_us", "add_us"].into_iter().collect();
        assert!(perms.covers(&["view_us"]));
        assert!(perms.covers::<&str>(&[]));
        assert!(!perms.covers(&["view_us", "add_task"]));
    }

    #[test]
    fn missing_reports_gaps_in_order() {
        let perms: PermissionSet = ["view_project"].into_iter().collect();
        assert_eq!(
            perms.missing(&["add_task", "view_project", "add_us"]),
            vec!["add_task", "add_us"]
        );
    }

    #[test]
    fn empty_set_covers_nothing_required() {
        let perms = PermissionSet::empty();
        assert!(perms.is_empty());
        assert!(!perms.covers(&["view_project"]));
    }
}
