use std::path::PathBuf;

use log::{debug, info};

use crate::cloud::store::RemoteStore;
use crate::errors::{Result, UploadError};
use crate::transfer::orchestrator::CompressionMode;

/// One file transfer about to happen. Created per file, discarded after its
/// result is recorded. When compression is active, `local_path` already
/// points at the archive.
#[derive(Debug, Clone)]
pub struct TransferJob {
    pub local_path: PathBuf,
    pub size: u64,
    pub remote_parent_id: String,
    pub compression: CompressionMode,
}

/// Outcome of one transfer: the remote id, the bytes actually sent, and
/// whether an existing remote file was reused instead of uploading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferResult {
    pub remote_file_id: String,
    pub bytes_written: u64,
    pub reused: bool,
}

/// Upload a job's content unless an identically named file already exists
/// under the target parent.
///
/// The existence lookup always precedes creation; content is never compared.
/// The check and the upload are not guarded against concurrent callers with
/// the same (name, parent) — this executor is for sequential use only.
pub async fn execute<S>(store: &S, job: &TransferJob) -> Result<TransferResult>
where
    S: RemoteStore + ?Sized,
{
    let name = job
        .local_path
        .file_name()
        .ok_or_else(|| {
            UploadError::Config(format!(
                "path has no filename component: {}",
                job.local_path.display()
            ))
        })?
        .to_string_lossy()
        .into_owned();

    debug!(
        "Transfer job: {} ({} bytes, {:?}) -> parent {}",
        job.local_path.display(),
        job.size,
        job.compression,
        job.remote_parent_id
    );

    if let Some(existing) = store.find_file(&name, &job.remote_parent_id).await? {
        info!(
            "\"{}\" already exists under {}, reusing {}",
            name, job.remote_parent_id, existing.id
        );
        return Ok(TransferResult {
            remote_file_id: existing.id,
            bytes_written: 0,
            reused: true,
        });
    }

    let node = store
        .upload_file(&name, &job.remote_parent_id, &job.local_path)
        .await?;
    info!("Uploaded new file \"{}\" ({} bytes) as {}", name, job.size, node.id);

    Ok(TransferResult {
        remote_file_id: node.id,
        bytes_written: job.size,
        reused: false,
    })
}
