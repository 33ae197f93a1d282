//! Global constants for the drive_uploader application.
//!
//! This module centralizes all hardcoded values to improve maintainability
//! and make configuration changes easier.

// Google Drive API endpoints
/// Base URL for Drive file metadata operations
pub const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";

/// Base URL for Drive media uploads
pub const DRIVE_UPLOAD_BASE: &str = "https://www.googleapis.com/upload/drive/v3";

/// MIME type Drive assigns to folders
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// MIME type prefix shared by all Google Workspace document formats
pub const WORKSPACE_MIME_PREFIX: &str = "application/vnd.google-apps.";

/// Fallback MIME type for uploaded content
pub const OCTET_STREAM_MIME_TYPE: &str = "application/octet-stream";

// OAuth2 constants
/// OAuth scope granting full Drive access
pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";

/// Seconds to wait for the browser authorization code before aborting
pub const AUTH_CALLBACK_TIMEOUT_SECS: u64 = 120;

// Lookup and transfer constants
/// Page size for existence lookups (only the first match matters)
pub const LOOKUP_PAGE_SIZE: u32 = 1;

/// Page size when listing a folder's children
pub const LIST_PAGE_SIZE: u32 = 100;

/// Metadata fields requested on list and create calls
pub const NODE_FIELDS: &str = "id, name, mimeType, parents";
