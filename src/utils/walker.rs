use std::path::{Path, PathBuf};

use log::debug;
use walkdir::WalkDir;

use crate::errors::{Result, UploadError};

/// Enumerate every regular file under `root`, recursively.
///
/// No ordering guarantee beyond walkdir's; callers must not assume lexical
/// order.
pub fn collect_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry.map_err(|e| {
            let path = e
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| root.to_path_buf());
            UploadError::LocalIo {
                path,
                source: e.into(),
            }
        })?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    debug!("Found {} files under {}", files.len(), root.display());
    Ok(files)
}

/// Compute the remote-relative path for `file` inside a tree rooted at
/// `root`: the root's base name joined with the file's path under the root.
///
/// Uploading `/home/user/docs/sub/notes.txt` from root `/home/user/docs`
/// yields `docs/sub/notes.txt`, so the tree lands under a folder named after
/// the root itself.
pub fn relative_upload_path(file: &Path, root: &Path) -> Result<PathBuf> {
    let rel = file.strip_prefix(root).map_err(|_| {
        UploadError::Config(format!(
            "{} is not under the upload root {}",
            file.display(),
            root.display()
        ))
    })?;
    let base = root.file_name().map(PathBuf::from).unwrap_or_default();
    Ok(base.join(rel))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_collect_files_recurses() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path();

        fs::create_dir_all(base.join("docs/sub")).unwrap();
        fs::write(base.join("top.txt"), b"top").unwrap();
        fs::write(base.join("docs/readme.txt"), b"readme").unwrap();
        fs::write(base.join("docs/sub/notes.txt"), b"notes").unwrap();

        let files = collect_files(base).unwrap();
        assert_eq!(files.len(), 3);
        assert!(files.contains(&base.join("docs/sub/notes.txt")));
    }

    #[test]
    fn test_collect_files_ignores_directories() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("empty/nested")).unwrap();

        let files = collect_files(temp_dir.path()).unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn test_collect_files_missing_root_fails() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("does-not-exist");

        assert!(collect_files(&missing).is_err());
    }

    #[test]
    fn test_relative_upload_path_includes_root_base_name() {
        let file = Path::new("/home/user/docs/sub/notes.txt");
        let root = Path::new("/home/user/docs");

        let rel = relative_upload_path(file, root).unwrap();
        assert_eq!(rel, PathBuf::from("docs/sub/notes.txt"));
    }

    #[test]
    fn test_relative_upload_path_direct_child() {
        let file = Path::new("/data/photos/cat.jpg");
        let root = Path::new("/data/photos");

        let rel = relative_upload_path(file, root).unwrap();
        assert_eq!(rel, PathBuf::from("photos/cat.jpg"));
    }

    #[test]
    fn test_relative_upload_path_outside_root_fails() {
        let file = Path::new("/elsewhere/cat.jpg");
        let root = Path::new("/data/photos");

        assert!(relative_upload_path(file, root).is_err());
    }
}
