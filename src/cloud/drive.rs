use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{stream, StreamExt};
use log::{debug, info};
use reqwest::{header, Client, StatusCode};
use serde::Deserialize;
use tokio::fs::File as AsyncFile;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::io::ReaderStream;

use crate::cloud::store::{NodeKind, RemoteNode, RemoteStore};
use crate::constants::{
    DRIVE_API_BASE, DRIVE_UPLOAD_BASE, FOLDER_MIME_TYPE, LIST_PAGE_SIZE, LOOKUP_PAGE_SIZE,
    NODE_FIELDS, OCTET_STREAM_MIME_TYPE, WORKSPACE_MIME_PREFIX,
};
use crate::errors::{Result, UploadError};

/// Boundary string for multipart/related upload bodies
const UPLOAD_BOUNDARY: &str = "drive_uploader_media_boundary";

/// An inclusive, 0-based byte range for partial downloads.
///
/// Offsets are unsigned, so negative positions are unrepresentable. The
/// remaining invalid shape (`start > end`) is rejected at construction,
/// before any network call can be issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    start: u64,
    end: u64,
}

impl ByteRange {
    /// Create a validated range. Fails when `start > end`.
    pub fn new(start: u64, end: u64) -> Result<Self> {
        if start > end {
            return Err(UploadError::Config(format!(
                "invalid byte range: start {} is past end {}",
                start, end
            )));
        }
        Ok(ByteRange { start, end })
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn end(&self) -> u64 {
        self.end
    }

    fn header_value(&self) -> String {
        format!("bytes={}-{}", self.start, self.end)
    }
}

/// Output formats for exporting Google Workspace documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Pdf,
    Docx,
    Xlsx,
    Pptx,
    Odt,
    Rtf,
    Txt,
    Html,
    Csv,
    Png,
    Jpeg,
    Zip,
    Epub,
}

impl ExportFormat {
    /// The MIME type requested from the export endpoint.
    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Pdf => "application/pdf",
            ExportFormat::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            ExportFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            ExportFormat::Pptx => {
                "application/vnd.openxmlformats-officedocument.presentationml.presentation"
            }
            ExportFormat::Odt => "application/vnd.oasis.opendocument.text",
            ExportFormat::Rtf => "application/rtf",
            ExportFormat::Txt => "text/plain",
            ExportFormat::Html => "text/html",
            ExportFormat::Csv => "text/csv",
            ExportFormat::Png => "image/png",
            ExportFormat::Jpeg => "image/jpeg",
            ExportFormat::Zip => "application/zip",
            ExportFormat::Epub => "application/epub+zip",
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    files: Vec<FileMeta>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileMeta {
    id: String,
    name: String,
    #[serde(default)]
    mime_type: String,
    #[serde(default)]
    parents: Vec<String>,
}

impl FileMeta {
    fn into_node(self, fallback_parent: &str) -> RemoteNode {
        let kind = if self.mime_type == FOLDER_MIME_TYPE {
            NodeKind::Folder
        } else {
            NodeKind::File
        };
        let parent_id = self
            .parents
            .into_iter()
            .next()
            .or_else(|| Some(fallback_parent.to_string()));
        RemoteNode {
            id: self.id,
            name: self.name,
            kind,
            parent_id,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExportMeta {
    #[serde(default)]
    export_links: HashMap<String, String>,
    #[serde(default)]
    mime_type: String,
}

/// Escape a value for embedding in a Drive query string literal.
fn escape_query_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Google Drive REST client.
///
/// Holds an already-authorized bearer token; acquiring and refreshing tokens
/// is the auth module's job. Every method issues exactly one remote call and
/// wraps failures with the attempted operation.
pub struct DriveClient {
    http: Client,
    token: String,
    api_base: String,
}

impl DriveClient {
    /// Create a client from an access token.
    pub fn new(access_token: String) -> Result<Self> {
        let http = Client::builder()
            .build()
            .map_err(|e| UploadError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(DriveClient {
            http,
            token: access_token,
            api_base: DRIVE_API_BASE.to_string(),
        })
    }

    /// Fail unless the response carries a success status, preserving the
    /// response body for diagnostics.
    async fn check_status(resp: reqwest::Response, operation: &str) -> Result<reqwest::Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(UploadError::RemoteApi {
            operation: operation.to_string(),
            source: format!("unexpected status {}: {}", status, body).into(),
        })
    }

    /// Look up a single non-trashed node by exact name under a parent.
    async fn find_node(
        &self,
        name: &str,
        parent_id: &str,
        kind: NodeKind,
    ) -> Result<Option<RemoteNode>> {
        let mut query = format!(
            "name='{}' and '{}' in parents and trashed=false",
            escape_query_value(name),
            escape_query_value(parent_id),
        );
        let noun = match kind {
            NodeKind::Folder => {
                query.push_str(&format!(" and mimeType='{}'", FOLDER_MIME_TYPE));
                "folder"
            }
            NodeKind::File => {
                query.push_str(&format!(" and mimeType!='{}'", FOLDER_MIME_TYPE));
                "file"
            }
        };
        let operation = format!("listing {} \"{}\"", noun, name);

        debug!("Querying Drive: {}", query);
        let resp = self
            .http
            .get(format!("{}/files", self.api_base))
            .bearer_auth(&self.token)
            .query(&[
                ("q", query.as_str()),
                ("pageSize", &LOOKUP_PAGE_SIZE.to_string()),
                ("fields", &format!("nextPageToken, files({})", NODE_FIELDS)),
            ])
            .send()
            .await
            .map_err(|e| UploadError::remote(operation.clone(), e))?;

        let list: FileList = Self::check_status(resp, &operation)
            .await?
            .json()
            .await
            .map_err(|e| UploadError::remote(operation, e))?;

        Ok(list.files.into_iter().next().map(|m| m.into_node(parent_id)))
    }

    /// Stream a download response into `writer`, returning the bytes written.
    /// Accepts 200 for whole-file downloads and 206 for ranged ones.
    ///
    /// `target` names the local file when there is one; writer failures with
    /// no backing path are wrapped with the operation instead.
    async fn stream_download<W>(
        &self,
        url: String,
        range: Option<ByteRange>,
        writer: &mut W,
        operation: &str,
        target: Option<&Path>,
    ) -> Result<u64>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let write_error = |e: std::io::Error| match target {
            Some(path) => UploadError::io(path, e),
            None => UploadError::remote(operation.to_string(), e),
        };

        let mut request = self.http.get(url).bearer_auth(&self.token);
        if let Some(range) = range {
            request = request.header(header::RANGE, range.header_value());
        }

        let resp = request
            .send()
            .await
            .map_err(|e| UploadError::remote(operation.to_string(), e))?;

        let status = resp.status();
        if status != StatusCode::OK && status != StatusCode::PARTIAL_CONTENT {
            let body = resp.text().await.unwrap_or_default();
            return Err(UploadError::RemoteApi {
                operation: operation.to_string(),
                source: format!("unexpected status {}: {}", status, body).into(),
            });
        }

        let mut written = 0u64;
        let mut body = resp.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| UploadError::remote(operation.to_string(), e))?;
            writer.write_all(&chunk).await.map_err(write_error)?;
            written += chunk.len() as u64;
        }
        writer.flush().await.map_err(write_error)?;

        Ok(written)
    }

    /// Download a file's content to a local path, creating parent
    /// directories as needed. Returns the number of bytes written.
    pub async fn download_file(&self, file_id: &str, output_path: &Path) -> Result<u64> {
        if let Some(parent) = output_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| UploadError::io(parent, e))?;
        }
        let mut out = AsyncFile::create(output_path)
            .await
            .map_err(|e| UploadError::io(output_path, e))?;

        let operation = format!("downloading file {}", file_id);
        let url = format!("{}/files/{}?alt=media", self.api_base, file_id);
        let written = self
            .stream_download(url, None, &mut out, &operation, Some(output_path))
            .await?;

        info!("Downloaded {} ({} bytes) to {}", file_id, written, output_path.display());
        Ok(written)
    }

    /// Download a validated byte range of a file into `writer`.
    /// Returns the number of bytes written.
    pub async fn download_range<W>(
        &self,
        file_id: &str,
        writer: &mut W,
        range: ByteRange,
    ) -> Result<u64>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let operation = format!(
            "downloading bytes {}-{} of file {}",
            range.start(),
            range.end(),
            file_id
        );
        let url = format!("{}/files/{}?alt=media", self.api_base, file_id);
        self.stream_download(url, Some(range), writer, &operation, None)
            .await
    }

    /// Download a specific revision's content to a local path, creating
    /// parent directories as needed. Returns the number of bytes written.
    pub async fn download_revision(
        &self,
        file_id: &str,
        revision_id: &str,
        output_path: &Path,
    ) -> Result<u64> {
        if let Some(parent) = output_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| UploadError::io(parent, e))?;
        }
        let mut out = AsyncFile::create(output_path)
            .await
            .map_err(|e| UploadError::io(output_path, e))?;

        let operation = format!("downloading revision {} of file {}", revision_id, file_id);
        let url = format!(
            "{}/files/{}/revisions/{}?alt=media",
            self.api_base, file_id, revision_id
        );
        let written = self
            .stream_download(url, None, &mut out, &operation, Some(output_path))
            .await?;

        info!(
            "Downloaded revision {} of {} ({} bytes) to {}",
            revision_id,
            file_id,
            written,
            output_path.display()
        );
        Ok(written)
    }

    /// Download a validated byte range of a specific revision into `writer`.
    /// Returns the number of bytes written.
    pub async fn download_revision_range<W>(
        &self,
        file_id: &str,
        revision_id: &str,
        writer: &mut W,
        range: ByteRange,
    ) -> Result<u64>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let operation = format!(
            "downloading bytes {}-{} of revision {} of file {}",
            range.start(),
            range.end(),
            revision_id,
            file_id
        );
        let url = format!(
            "{}/files/{}/revisions/{}?alt=media",
            self.api_base, file_id, revision_id
        );
        self.stream_download(url, Some(range), writer, &operation, None)
            .await
    }

    /// List the immediate, non-trashed children of a folder, following
    /// pagination until the listing is exhausted.
    pub async fn list_folder(&self, parent_id: &str) -> Result<Vec<RemoteNode>> {
        let operation = format!("listing folder {}", parent_id);
        let query = format!(
            "'{}' in parents and trashed=false",
            escape_query_value(parent_id)
        );

        let mut nodes = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut params = vec![
                ("q", query.clone()),
                ("pageSize", LIST_PAGE_SIZE.to_string()),
                ("fields", format!("nextPageToken, files({})", NODE_FIELDS)),
            ];
            if let Some(token) = &page_token {
                params.push(("pageToken", token.clone()));
            }

            let resp = self
                .http
                .get(format!("{}/files", self.api_base))
                .bearer_auth(&self.token)
                .query(&params)
                .send()
                .await
                .map_err(|e| UploadError::remote(operation.clone(), e))?;

            let list: FileList = Self::check_status(resp, &operation)
                .await?
                .json()
                .await
                .map_err(|e| UploadError::remote(operation.clone(), e))?;

            nodes.extend(list.files.into_iter().map(|m| m.into_node(parent_id)));

            match list.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!("Folder {} has {} children", parent_id, nodes.len());
        Ok(nodes)
    }

    /// Export a Workspace document to a local file in the requested format.
    /// Returns the number of bytes written.
    pub async fn export_document(
        &self,
        file_id: &str,
        format: ExportFormat,
        output_path: &Path,
    ) -> Result<u64> {
        if let Some(parent) = output_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| UploadError::io(parent, e))?;
        }
        let mut out = AsyncFile::create(output_path)
            .await
            .map_err(|e| UploadError::io(output_path, e))?;

        let operation = format!("exporting document {} as {}", file_id, format.mime_type());
        let url = format!(
            "{}/files/{}/export?mimeType={}",
            self.api_base,
            file_id,
            format.mime_type()
        );
        let written = self
            .stream_download(url, None, &mut out, &operation, Some(output_path))
            .await?;

        info!("Exported {} ({} bytes) to {}", file_id, written, output_path.display());
        Ok(written)
    }

    /// Retrieve the available export links for a Workspace document,
    /// keyed by MIME type. Fails when the node is not a Workspace document.
    pub async fn export_links(&self, file_id: &str) -> Result<HashMap<String, String>> {
        let operation = format!("getting export links for {}", file_id);
        let resp = self
            .http
            .get(format!("{}/files/{}", self.api_base, file_id))
            .bearer_auth(&self.token)
            .query(&[("fields", "exportLinks, mimeType")])
            .send()
            .await
            .map_err(|e| UploadError::remote(operation.clone(), e))?;

        let meta: ExportMeta = Self::check_status(resp, &operation)
            .await?
            .json()
            .await
            .map_err(|e| UploadError::remote(operation.clone(), e))?;

        if meta.export_links.is_empty() {
            return Err(UploadError::RemoteApi {
                operation,
                source: format!(
                    "file is not a Workspace document (MIME type: {})",
                    meta.mime_type
                )
                .into(),
            });
        }
        Ok(meta.export_links)
    }

    /// Whether the node is a Workspace document (Docs, Sheets, Slides, ...).
    /// Folders are not documents.
    pub async fn is_workspace_document(&self, file_id: &str) -> Result<bool> {
        let operation = format!("getting metadata for {}", file_id);
        let resp = self
            .http
            .get(format!("{}/files/{}", self.api_base, file_id))
            .bearer_auth(&self.token)
            .query(&[("fields", "mimeType")])
            .send()
            .await
            .map_err(|e| UploadError::remote(operation.clone(), e))?;

        let meta: ExportMeta = Self::check_status(resp, &operation)
            .await?
            .json()
            .await
            .map_err(|e| UploadError::remote(operation, e))?;

        Ok(meta.mime_type.starts_with(WORKSPACE_MIME_PREFIX)
            && meta.mime_type != FOLDER_MIME_TYPE)
    }

    async fn set_trashed(&self, file_id: &str, trashed: bool) -> Result<()> {
        let operation = if trashed {
            format!("trashing file {}", file_id)
        } else {
            format!("restoring file {}", file_id)
        };
        let resp = self
            .http
            .patch(format!("{}/files/{}", self.api_base, file_id))
            .bearer_auth(&self.token)
            .json(&serde_json::json!({ "trashed": trashed }))
            .send()
            .await
            .map_err(|e| UploadError::remote(operation.clone(), e))?;

        Self::check_status(resp, &operation).await?;
        info!(
            "File {} {}",
            file_id,
            if trashed { "moved to trash" } else { "restored from trash" }
        );
        Ok(())
    }

    /// Move a file to the trash. The file can be restored later.
    pub async fn trash_file(&self, file_id: &str) -> Result<()> {
        self.set_trashed(file_id, true).await
    }

    /// Restore a file from the trash.
    pub async fn restore_file(&self, file_id: &str) -> Result<()> {
        self.set_trashed(file_id, false).await
    }

    /// Permanently delete a file. This cannot be undone.
    pub async fn delete_file(&self, file_id: &str) -> Result<()> {
        let operation = format!("deleting file {}", file_id);
        let resp = self
            .http
            .delete(format!("{}/files/{}", self.api_base, file_id))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| UploadError::remote(operation.clone(), e))?;

        Self::check_status(resp, &operation).await?;
        info!("File {} permanently deleted", file_id);
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for DriveClient {
    async fn find_folder(&self, name: &str, parent_id: &str) -> Result<Option<RemoteNode>> {
        self.find_node(name, parent_id, NodeKind::Folder).await
    }

    async fn create_folder(&self, name: &str, parent_id: &str) -> Result<RemoteNode> {
        let operation = format!("creating folder \"{}\"", name);
        let body = serde_json::json!({
            "name": name,
            "mimeType": FOLDER_MIME_TYPE,
            "parents": [parent_id],
        });
        let resp = self
            .http
            .post(format!("{}/files", self.api_base))
            .bearer_auth(&self.token)
            .query(&[("fields", NODE_FIELDS)])
            .json(&body)
            .send()
            .await
            .map_err(|e| UploadError::remote(operation.clone(), e))?;

        let meta: FileMeta = Self::check_status(resp, &operation)
            .await?
            .json()
            .await
            .map_err(|e| UploadError::remote(operation, e))?;

        info!("Created folder \"{}\" ({})", name, meta.id);
        Ok(meta.into_node(parent_id))
    }

    async fn find_file(&self, name: &str, parent_id: &str) -> Result<Option<RemoteNode>> {
        self.find_node(name, parent_id, NodeKind::File).await
    }

    async fn upload_file(
        &self,
        name: &str,
        parent_id: &str,
        local_path: &Path,
    ) -> Result<RemoteNode> {
        let operation = format!("uploading file \"{}\"", name);

        let metadata = serde_json::json!({ "name": name, "parents": [parent_id] });
        let head = format!(
            "--{b}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{meta}\r\n\
             --{b}\r\nContent-Type: {mime}\r\n\r\n",
            b = UPLOAD_BOUNDARY,
            meta = metadata,
            mime = OCTET_STREAM_MIME_TYPE,
        );
        let tail = format!("\r\n--{}--\r\n", UPLOAD_BOUNDARY);

        let file = AsyncFile::open(local_path)
            .await
            .map_err(|e| UploadError::io(local_path, e))?;

        // multipart/related body: JSON metadata part, then the media part
        // streamed straight off disk.
        let body_stream = stream::iter(vec![Ok::<Bytes, std::io::Error>(Bytes::from(head))])
            .chain(ReaderStream::new(file))
            .chain(stream::iter(vec![Ok(Bytes::from(tail))]));

        let resp = self
            .http
            .post(format!("{}/files", DRIVE_UPLOAD_BASE))
            .bearer_auth(&self.token)
            .query(&[("uploadType", "multipart"), ("fields", NODE_FIELDS)])
            .header(
                header::CONTENT_TYPE,
                format!("multipart/related; boundary={}", UPLOAD_BOUNDARY),
            )
            .body(reqwest::Body::wrap_stream(body_stream))
            .send()
            .await
            .map_err(|e| UploadError::remote(operation.clone(), e))?;

        let meta: FileMeta = Self::check_status(resp, &operation)
            .await?
            .json()
            .await
            .map_err(|e| UploadError::remote(operation, e))?;

        debug!("Uploaded \"{}\" as {}", name, meta.id);
        Ok(meta.into_node(parent_id))
    }
}
