//! Upload local files and directory trees to Google Drive.
//!
//! The crate recreates local directory structure remotely, skips files that
//! already exist under their target folder, and can bundle content into a
//! single tar.gz or zip archive before transfer.
//!
//! ## Components
//!
//! - **auth**: OAuth2 credential handling, token persistence, and the local
//!   callback listener for the browser consent flow
//! - **cloud**: the [`cloud::store::RemoteStore`] seam and its Drive REST
//!   implementation
//! - **transfer**: the path materialization and idempotent transfer engine
//! - **utils**: archive construction/extraction and file tree enumeration
//!
//! ## Uploading a directory
//!
//! ```no_run
//! use drive_uploader::cloud::drive::DriveClient;
//! use drive_uploader::transfer::orchestrator::{CompressionMode, UploadService};
//! use std::path::Path;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = DriveClient::new("ya29.access-token".to_string())?;
//! let service = UploadService::new(client, CompressionMode::None);
//!
//! let results = service
//!     .upload_directory(Path::new("/home/user/Documents"), "1pwmMXssnt1I5AORDJcNk")
//!     .await?;
//! println!("Uploaded {} files", results.len());
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod cli;
pub mod cloud;
pub mod constants;
pub mod errors;
pub mod transfer;
pub mod utils;
