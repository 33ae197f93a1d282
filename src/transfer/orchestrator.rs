use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::cloud::store::RemoteStore;
use crate::errors::{Result, UploadError};
use crate::transfer::cache::DirectoryCache;
use crate::transfer::resolver;
use crate::transfer::uploader::{self, TransferJob, TransferResult};
use crate::utils::{archive, walker};

/// How content is transformed before transfer. Modes are mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionMode {
    /// Upload files as they are
    #[default]
    None,
    /// Bundle into a .tar.gz archive (relative paths preserved)
    GzipTar,
    /// Bundle into a .zip archive (entries flattened to base names)
    Zip,
}

impl CompressionMode {
    /// Map the CLI's two boolean flags onto a mode. Flag conflicts are
    /// already rejected by the parser.
    pub fn from_flags(gzip: bool, zip: bool) -> Self {
        if gzip {
            CompressionMode::GzipTar
        } else if zip {
            CompressionMode::Zip
        } else {
            CompressionMode::None
        }
    }

    fn archive_name(&self, base: &str) -> Option<String> {
        match self {
            CompressionMode::None => None,
            CompressionMode::GzipTar => Some(format!("{}.tar.gz", base)),
            CompressionMode::Zip => Some(format!("{}.zip", base)),
        }
    }
}

/// Temporary archive that is removed when the upload attempt finishes,
/// whether it succeeded or not.
struct ScopedArchive(PathBuf);

impl ScopedArchive {
    fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for ScopedArchive {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.0) {
            warn!(
                "Failed to remove temporary archive {}: {}",
                self.0.display(),
                e
            );
        }
    }
}

/// Drives enumeration, directory materialization, compression, and dedup
/// upload for local files and directory trees.
///
/// One invocation processes strictly one file at a time; a fatal error at
/// any step halts the remainder of the run. The directory cache lives for
/// one `upload_directory` call and is discarded with it.
pub struct UploadService<S: RemoteStore> {
    store: S,
    compression: CompressionMode,
}

impl<S: RemoteStore> UploadService<S> {
    pub fn new(store: S, compression: CompressionMode) -> Self {
        UploadService { store, compression }
    }

    /// Give the store back, e.g. to inspect it after a run.
    pub fn into_store(self) -> S {
        self.store
    }

    /// Upload a local path, dispatching on whether it is a file or a
    /// directory.
    pub async fn upload_path(&self, local: &Path, parent_id: &str) -> Result<Vec<TransferResult>> {
        let metadata = fs::metadata(local).map_err(|e| UploadError::io(local, e))?;
        if metadata.is_dir() {
            self.upload_directory(local, parent_id).await
        } else {
            Ok(vec![self.upload_single(local, parent_id).await?])
        }
    }

    /// Upload every file under `root` into the remote folder `parent_id`.
    ///
    /// Without compression, the remote directory chain is resolved or
    /// created per file and each file is deduplicated against its target
    /// folder. With compression, the whole subtree becomes one archive
    /// uploaded directly under `parent_id`, bypassing per-file resolution.
    pub async fn upload_directory(
        &self,
        root: &Path,
        parent_id: &str,
    ) -> Result<Vec<TransferResult>> {
        let files = walker::collect_files(root)?;
        info!(
            "Uploading directory {} ({} files)",
            root.display(),
            files.len()
        );

        if self.compression == CompressionMode::None {
            return self.upload_tree(root, &files, parent_id).await;
        }

        // Archive the subtree relative to the root's parent so the root's
        // own name is the top-level entry.
        let archive_base = root.parent().unwrap_or_else(|| Path::new(""));
        let archive = self.build_archive(root, &files, archive_base)?;
        let result = self.upload_archive(&archive, parent_id).await?;
        Ok(vec![result])
    }

    /// Upload one local file under `parent_id`, compressing it first when a
    /// mode is selected.
    pub async fn upload_single(&self, local: &Path, parent_id: &str) -> Result<TransferResult> {
        if self.compression == CompressionMode::None {
            let job = self.job_for(local, parent_id)?;
            return uploader::execute(&self.store, &job).await;
        }

        let base = local.parent().unwrap_or_else(|| Path::new(""));
        let archive = self.build_archive(local, &[local.to_path_buf()], base)?;
        self.upload_archive(&archive, parent_id).await
    }

    /// Per-file mode: resolve each file's remote folder chain, then execute
    /// a dedup upload. A shared per-run cache keeps folder creation to one
    /// call per distinct (parent, name).
    async fn upload_tree(
        &self,
        root: &Path,
        files: &[PathBuf],
        parent_id: &str,
    ) -> Result<Vec<TransferResult>> {
        let mut cache = DirectoryCache::new();
        let mut results = Vec::with_capacity(files.len());

        for file in files {
            let rel = walker::relative_upload_path(file, root)?;
            let rel_dir = rel.parent().unwrap_or_else(|| Path::new(""));
            let folder_id =
                resolver::materialize(&self.store, &mut cache, rel_dir, parent_id).await?;

            let job = self.job_for(file, &folder_id)?;
            results.push(uploader::execute(&self.store, &job).await?);
        }

        Ok(results)
    }

    /// Build the archive for `source` in the temp directory. Failure here
    /// aborts the transfer before any network call.
    fn build_archive(
        &self,
        source: &Path,
        files: &[PathBuf],
        archive_base: &Path,
    ) -> Result<ScopedArchive> {
        let base_name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "archive".to_string());
        let archive_name = self.compression.archive_name(&base_name).ok_or_else(|| {
            UploadError::Archive("no compression mode selected".to_string())
        })?;
        let output = env::temp_dir().join(archive_name);

        if self.compression == CompressionMode::GzipTar {
            archive::create_tar_gz(files, archive_base, &output)?;
        } else {
            archive::create_zip(files, &output)?;
        }

        Ok(ScopedArchive(output))
    }

    async fn upload_archive(
        &self,
        archive: &ScopedArchive,
        parent_id: &str,
    ) -> Result<TransferResult> {
        let job = self.job_for(archive.path(), parent_id)?;
        uploader::execute(&self.store, &job).await
    }

    fn job_for(&self, local: &Path, parent_id: &str) -> Result<TransferJob> {
        let size = fs::metadata(local)
            .map_err(|e| UploadError::io(local, e))?
            .len();
        Ok(TransferJob {
            local_path: local.to_path_buf(),
            size,
            remote_parent_id: parent_id.to_string(),
            compression: self.compression,
        })
    }
}
