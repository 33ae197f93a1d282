use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for the drive-uploader tool.
///
/// Takes one destination folder ID and one or more local paths. Files are
/// uploaded as-is; directories are recreated folder by folder unless an
/// archive flag bundles them into a single upload.
#[derive(Parser, Debug)]
#[clap(name = "drive-uploader", about = "Upload files and folders to Google Drive")]
pub struct Args {
    /// ID of the Drive folder to upload into
    pub folder_id: String,

    /// Local files or directories to upload
    #[clap(required = true, num_args = 1..)]
    pub local_paths: Vec<PathBuf>,

    /// Path to the Google API credentials file
    #[clap(long, default_value = "credentials.json")]
    pub creds: PathBuf,

    /// Path to the saved OAuth token file
    #[clap(long, default_value = "token.json")]
    pub token: PathBuf,

    /// Local port for the authorization callback listener
    #[clap(long, default_value = "8888")]
    pub port: u16,

    /// Bundle content into a .tar.gz archive before upload
    #[clap(long)]
    pub gzip: bool,

    /// Bundle content into a .zip archive before upload
    #[clap(long, conflicts_with = "gzip")]
    pub zip: bool,

    /// Verbose logging
    #[clap(short, long)]
    pub verbose: bool,
}
