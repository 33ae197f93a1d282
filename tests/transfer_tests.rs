//! Integration tests for the upload orchestrator.
//!
//! These tests run whole directory trees through the service against an
//! in-memory store, verifying folder materialization counts, dedup
//! behavior, and the whole-tree archive mode without any network access.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use tempfile::TempDir;

use drive_uploader::cloud::store::{NodeKind, RemoteNode, RemoteStore};
use drive_uploader::errors::Result;
use drive_uploader::transfer::orchestrator::{CompressionMode, UploadService};

/// In-memory stand-in for the remote service. Tracks every creation so
/// tests can assert exact call counts per (parent, name).
#[derive(Default)]
struct FakeState {
    next_id: u64,
    folders: HashMap<(String, String), String>,
    files: HashMap<(String, String), String>,
    folder_creations: Vec<(String, String)>,
    file_creations: Vec<(String, String)>,
}

#[derive(Default)]
struct FakeStore {
    state: Mutex<FakeState>,
}

impl FakeStore {
    fn new() -> Self {
        Self::default()
    }

    fn folder_creation_count(&self, name: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .folder_creations
            .iter()
            .filter(|(_, n)| n == name)
            .count()
    }

    fn total_folder_creations(&self) -> usize {
        self.state.lock().unwrap().folder_creations.len()
    }

    fn created_file_names(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .file_creations
            .iter()
            .map(|(_, n)| n.clone())
            .collect()
    }

    fn has_duplicate_folder_creations(&self) -> bool {
        let state = self.state.lock().unwrap();
        let mut seen = std::collections::HashSet::new();
        state
            .folder_creations
            .iter()
            .any(|key| !seen.insert(key.clone()))
    }
}

fn node(id: &str, name: &str, kind: NodeKind, parent: &str) -> RemoteNode {
    RemoteNode {
        id: id.to_string(),
        name: name.to_string(),
        kind,
        parent_id: Some(parent.to_string()),
    }
}

#[async_trait]
impl RemoteStore for FakeStore {
    async fn find_folder(&self, name: &str, parent_id: &str) -> Result<Option<RemoteNode>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .folders
            .get(&(parent_id.to_string(), name.to_string()))
            .map(|id| node(id, name, NodeKind::Folder, parent_id)))
    }

    async fn create_folder(&self, name: &str, parent_id: &str) -> Result<RemoteNode> {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = format!("folder-{}", state.next_id);
        let key = (parent_id.to_string(), name.to_string());
        state.folders.insert(key.clone(), id.clone());
        state.folder_creations.push(key);
        Ok(node(&id, name, NodeKind::Folder, parent_id))
    }

    async fn find_file(&self, name: &str, parent_id: &str) -> Result<Option<RemoteNode>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .files
            .get(&(parent_id.to_string(), name.to_string()))
            .map(|id| node(id, name, NodeKind::File, parent_id)))
    }

    async fn upload_file(
        &self,
        name: &str,
        parent_id: &str,
        local_path: &Path,
    ) -> Result<RemoteNode> {
        // The content source must still exist at upload time (archives are
        // only removed after the attempt).
        assert!(local_path.exists(), "missing content source {}", local_path.display());

        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = format!("file-{}", state.next_id);
        let key = (parent_id.to_string(), name.to_string());
        state.files.insert(key.clone(), id.clone());
        state.file_creations.push(key);
        Ok(node(&id, name, NodeKind::File, parent_id))
    }
}

/// Build `{root}/docs/readme.txt` and `{root}/docs/sub/notes.txt` under a
/// directory with a fixed name so remote paths are predictable.
fn sample_tree(temp: &TempDir, root_name: &str) -> PathBuf {
    let root = temp.path().join(root_name);
    fs::create_dir_all(root.join("docs/sub")).unwrap();
    fs::write(root.join("docs/readme.txt"), b"readme contents").unwrap();
    fs::write(root.join("docs/sub/notes.txt"), b"notes contents").unwrap();
    root
}

#[tokio::test]
async fn test_tree_upload_creates_each_folder_exactly_once() {
    let temp = TempDir::new().unwrap();
    let root = sample_tree(&temp, "project");

    let store = FakeStore::new();
    let service = UploadService::new(store, CompressionMode::None);

    let results = service.upload_directory(&root, "P").await.unwrap();
    let store = service.into_store();

    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| !r.reused));

    // Folders: project, docs, sub — one creation each, no duplicates even
    // though both files share the "project/docs" prefix.
    assert_eq!(store.total_folder_creations(), 3);
    assert_eq!(store.folder_creation_count("project"), 1);
    assert_eq!(store.folder_creation_count("docs"), 1);
    assert_eq!(store.folder_creation_count("sub"), 1);
    assert!(!store.has_duplicate_folder_creations());

    let mut files = store.created_file_names();
    files.sort();
    assert_eq!(files, vec!["notes.txt", "readme.txt"]);
}

#[tokio::test]
async fn test_second_run_reuses_everything() {
    let temp = TempDir::new().unwrap();
    let root = sample_tree(&temp, "rerun");

    let store = FakeStore::new();
    let service = UploadService::new(store, CompressionMode::None);

    let first = service.upload_directory(&root, "P").await.unwrap();
    let second = service.upload_directory(&root, "P").await.unwrap();
    let store = service.into_store();

    assert!(first.iter().all(|r| !r.reused));
    assert!(second.iter().all(|r| r.reused));
    assert!(second.iter().all(|r| r.bytes_written == 0));

    // The second run finds every folder and file already present: still
    // exactly three folder creations and two file creations in total.
    assert_eq!(store.total_folder_creations(), 3);
    assert_eq!(store.created_file_names().len(), 2);

    // Same remote ids both times.
    let mut first_ids: Vec<_> = first.iter().map(|r| r.remote_file_id.clone()).collect();
    let mut second_ids: Vec<_> = second.iter().map(|r| r.remote_file_id.clone()).collect();
    first_ids.sort();
    second_ids.sort();
    assert_eq!(first_ids, second_ids);
}

#[tokio::test]
async fn test_archive_mode_uploads_one_file_and_skips_resolution() {
    let temp = TempDir::new().unwrap();
    let root = sample_tree(&temp, "bundle");

    let store = FakeStore::new();
    let service = UploadService::new(store, CompressionMode::GzipTar);

    let results = service.upload_directory(&root, "P").await.unwrap();
    let store = service.into_store();

    assert_eq!(results.len(), 1);
    assert_eq!(store.total_folder_creations(), 0);
    assert_eq!(store.created_file_names(), vec!["bundle.tar.gz"]);

    // The temporary archive is gone after the upload attempt.
    assert!(!std::env::temp_dir().join("bundle.tar.gz").exists());
}

#[tokio::test]
async fn test_single_file_upload_with_zip() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("report.csv");
    fs::write(&file, b"a,b,c\n1,2,3\n").unwrap();

    let store = FakeStore::new();
    let service = UploadService::new(store, CompressionMode::Zip);

    let result = service.upload_single(&file, "P").await.unwrap();
    let store = service.into_store();

    assert!(!result.reused);
    assert_eq!(store.created_file_names(), vec!["report.csv.zip"]);
    assert!(!std::env::temp_dir().join("report.csv.zip").exists());
}

#[tokio::test]
async fn test_upload_path_dispatches_on_file_type() {
    let temp = TempDir::new().unwrap();
    let root = sample_tree(&temp, "dispatch");
    let single = temp.path().join("plain.txt");
    fs::write(&single, b"plain").unwrap();

    let store = FakeStore::new();
    let service = UploadService::new(store, CompressionMode::None);

    let dir_results = service.upload_path(&root, "P").await.unwrap();
    let file_results = service.upload_path(&single, "P").await.unwrap();

    assert_eq!(dir_results.len(), 2);
    assert_eq!(file_results.len(), 1);
}

#[tokio::test]
async fn test_upload_path_missing_input_fails() {
    let temp = TempDir::new().unwrap();
    let missing = temp.path().join("nope.txt");

    let store = FakeStore::new();
    let service = UploadService::new(store, CompressionMode::None);

    assert!(service.upload_path(&missing, "P").await.is_err());
}
