//! Group-resolver implementations.
//!
//! Group creation and membership changes belong to the group-server
//! collaborator; the core only takes snapshots. `MemoryGroups` stands in
//! for the server in tests (with mutation helpers so membership-change
//! scenarios can be exercised); `FileGroups` reads a static JSON file
//! for the CLI.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use cop_core::directory::{GroupInfo, GroupResolver};
use cop_core::error::{CopError, Result};

/// In-memory group membership with mutation helpers for tests.
#[derive(Debug, Default, Clone)]
pub struct MemoryGroups {
    groups: BTreeMap<String, Vec<String>>,
}

impl MemoryGroups {
    /// Create an empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a group with the given initial members.
    pub fn create(&mut self, group_id: &str, members: &[&str]) {
        self.groups.insert(
            group_id.to_string(),
            members.iter().map(|m| m.to_string()).collect(),
        );
    }

    /// Add a member to an existing group. No-op if already present.
    pub fn add_member(&mut self, group_id: &str, member: &str) -> Result<()> {
        let members = self
            .groups
            .get_mut(group_id)
            .ok_or_else(|| CopError::UnknownGroup(group_id.to_string()))?;
        if !members.iter().any(|m| m == member) {
            members.push(member.to_string());
        }
        Ok(())
    }

    /// Remove a member from an existing group.
    pub fn remove_member(&mut self, group_id: &str, member: &str) -> Result<()> {
        let members = self
            .groups
            .get_mut(group_id)
            .ok_or_else(|| CopError::UnknownGroup(group_id.to_string()))?;
        members.retain(|m| m != member);
        Ok(())
    }
}

impl GroupResolver for MemoryGroups {
    fn snapshot(&self, group_id: &str) -> Result<Vec<String>> {
        self.groups
            .get(group_id)
            .cloned()
            .ok_or_else(|| CopError::UnknownGroup(group_id.to_string()))
    }

    fn info(&self, group_id: &str) -> Result<GroupInfo> {
        let members = self.snapshot(group_id)?;
        Ok(GroupInfo {
            group_id: group_id.to_string(),
            member_count: members.len(),
        })
    }
}

/// Group membership read from a JSON file of `{group_id: [members]}`.
pub struct FileGroups {
    groups: BTreeMap<String, Vec<String>>,
}

impl FileGroups {
    /// Load a groups file; a missing file yields no groups.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let groups = if path.exists() {
            let json = fs::read(&path).map_err(|e| CopError::KeyStoreFailure(e.to_string()))?;
            serde_json::from_slice(&json).map_err(|e| CopError::KeyStoreFailure(e.to_string()))?
        } else {
            BTreeMap::new()
        };
        Ok(Self { groups })
    }
}

impl GroupResolver for FileGroups {
    fn snapshot(&self, group_id: &str) -> Result<Vec<String>> {
        self.groups
            .get(group_id)
            .cloned()
            .ok_or_else(|| CopError::UnknownGroup(group_id.to_string()))
    }

    fn info(&self, group_id: &str) -> Result<GroupInfo> {
        let members = self.snapshot(group_id)?;
        Ok(GroupInfo {
            group_id: group_id.to_string(),
            member_count: members.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_membership_changes() {
        let mut groups = MemoryGroups::new();
        groups.create("tech_partners", &["Auditor Corp"]);
        assert_eq!(groups.snapshot("tech_partners").unwrap(), ["Auditor Corp"]);

        groups.add_member("tech_partners", "Lays Chips").unwrap();
        assert_eq!(
            groups.snapshot("tech_partners").unwrap(),
            ["Auditor Corp", "Lays Chips"]
        );

        groups.remove_member("tech_partners", "Auditor Corp").unwrap();
        assert_eq!(groups.snapshot("tech_partners").unwrap(), ["Lays Chips"]);
    }

    #[test]
    fn test_unknown_group() {
        let groups = MemoryGroups::new();
        assert!(matches!(
            groups.snapshot("nope"),
            Err(CopError::UnknownGroup(_))
        ));
    }

    #[test]
    fn test_info_counts_members() {
        let mut groups = MemoryGroups::new();
        groups.create("g", &["A", "B"]);
        assert_eq!(groups.info("g").unwrap().member_count, 2);
    }
}
