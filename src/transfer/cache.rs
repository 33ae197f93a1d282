use std::collections::HashMap;

/// Memoization of remote folder resolutions for one orchestrator run.
///
/// Keyed by `(parent_id, name)` so that two same-named folders under
/// different parents resolve independently. Entries are populated lazily as
/// the resolver works, never invalidated within a run, and dropped with the
/// run.
#[derive(Debug, Default)]
pub struct DirectoryCache {
    entries: HashMap<(String, String), String>,
}

impl DirectoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the folder id cached for `name` under `parent_id`.
    pub fn get(&self, parent_id: &str, name: &str) -> Option<&str> {
        self.entries
            .get(&(parent_id.to_string(), name.to_string()))
            .map(String::as_str)
    }

    /// Record a resolved folder id for `name` under `parent_id`.
    pub fn insert(&mut self, parent_id: &str, name: &str, folder_id: &str) {
        self.entries.insert(
            (parent_id.to_string(), name.to_string()),
            folder_id.to_string(),
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
