//! Local filesystem utilities.
//!
//! - **archive**: tar.gz and zip construction plus extraction. The two
//!   formats deliberately differ: tar.gz preserves relative paths, zip
//!   flattens every entry to its base name.
//! - **walker**: recursive file enumeration and upload-relative path
//!   computation.

/// Archive construction and extraction
pub mod archive;

/// Directory tree enumeration
pub mod walker;
