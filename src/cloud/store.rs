use std::path::Path;

use async_trait::async_trait;

use crate::errors::Result;

/// Kind of node the remote service stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Folder,
    File,
}

/// Metadata for a node in the remote hierarchy.
///
/// The `id` is an opaque identifier assigned by the remote service; all
/// addressing goes through it, never through paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteNode {
    pub id: String,
    pub name: String,
    pub kind: NodeKind,
    pub parent_id: Option<String>,
}

/// The remote storage operations the transfer engine depends on.
///
/// Lookups match by exact name under a parent, exclude trashed nodes, and
/// filter by kind. Implementations perform exactly one remote call per
/// method; retry policy belongs to callers (and there is none).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Find a non-trashed folder named `name` under `parent_id`.
    async fn find_folder(&self, name: &str, parent_id: &str) -> Result<Option<RemoteNode>>;

    /// Create a folder named `name` under `parent_id`.
    async fn create_folder(&self, name: &str, parent_id: &str) -> Result<RemoteNode>;

    /// Find a non-trashed file named `name` under `parent_id`.
    async fn find_file(&self, name: &str, parent_id: &str) -> Result<Option<RemoteNode>>;

    /// Upload the content at `local_path` as a file named `name` under
    /// `parent_id`, returning the new node.
    async fn upload_file(&self, name: &str, parent_id: &str, local_path: &Path)
        -> Result<RemoteNode>;
}
