use anyhow::{Context, Result};
use clap::Parser;
use log::{info, LevelFilter};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};
use tokio::runtime::Runtime;

use drive_uploader::auth::Authenticator;
use drive_uploader::cli::Args;
use drive_uploader::cloud::drive::DriveClient;
use drive_uploader::transfer::orchestrator::{CompressionMode, UploadService};

fn main() -> Result<()> {
    // Parse arguments
    let args = Args::parse();

    // Initialize logging
    initialize_logging(args.verbose)?;

    // Drive the whole upload on a single runtime
    let runtime = Runtime::new().context("Failed to create async runtime")?;
    runtime.block_on(run(args))
}

/// Initialize logging with the specified verbosity level
fn initialize_logging(verbose: bool) -> Result<()> {
    let log_level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };
    TermLogger::init(
        log_level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    ).context("Failed to initialize logger")?;
    Ok(())
}

async fn run(args: Args) -> Result<()> {
    info!("Starting Drive upload");

    // Authorize and build the Drive client
    let auth = Authenticator::new(args.creds.clone(), args.token.clone(), args.port);
    let access_token = auth
        .access_token()
        .await
        .context("Failed to authorize with Google Drive")?;
    let client = DriveClient::new(access_token)?;

    let compression = CompressionMode::from_flags(args.gzip, args.zip);
    let service = UploadService::new(client, compression);

    // Upload all the paths, strictly one at a time
    for local_path in &args.local_paths {
        let results = service
            .upload_path(local_path, &args.folder_id)
            .await
            .with_context(|| format!("Failed to upload {}", local_path.display()))?;

        let reused = results.iter().filter(|r| r.reused).count();
        let bytes: u64 = results.iter().map(|r| r.bytes_written).sum();
        info!(
            "{}: {} uploaded ({} bytes), {} reused",
            local_path.display(),
            results.len() - reused,
            bytes,
            reused
        );
    }

    info!("Drive upload completed successfully");
    Ok(())
}
