use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};

use davferry::{chunking, Config, RemotePath, TransferEngine};

#[derive(Parser)]
#[command(name = "davferry", about = "Transfer files and folders to and from a WebDAV server")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check that the configured server answers WebDAV requests
    TestConnection,
    /// Upload a single file, optionally split into parts first
    UploadFile {
        local_path: PathBuf,
        remote_folder: String,
        /// Split into this many parts before uploading
        #[arg(long, default_value_t = 1)]
        parts: u32,
    },
    /// Upload a directory tree into a remote collection
    UploadFolder {
        local_dir: PathBuf,
        remote_folder: String,
    },
    /// Download a single file, optionally merging it from parts
    DownloadFile {
        remote_path: String,
        local_dir: PathBuf,
        /// Reassemble the file from this many parts
        #[arg(long, default_value_t = 1)]
        parts: u32,
    },
    /// Download a remote collection as a local directory tree
    DownloadFolder {
        remote_path: String,
        local_dir: PathBuf,
    },
    /// Split a local file into parts without uploading
    Split {
        local_path: PathBuf,
        parts: u32,
    },
    /// Merge previously downloaded parts without contacting the server
    Merge {
        dest_dir: PathBuf,
        file_name: String,
        parts: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    // Split and merge work purely on the local filesystem and do not need
    // server credentials.
    if let Command::Split { local_path, parts } = &cli.command {
        let work_dir = PathBuf::from(davferry::config::work_dir_from_env());
        let chunk_dir = chunking::split_file(local_path, &work_dir, *parts).await?;
        info!("Parts written to {}", chunk_dir.display());
        return Ok(());
    }
    if let Command::Merge { dest_dir, file_name, parts } = &cli.command {
        let work_dir = PathBuf::from(davferry::config::work_dir_from_env());
        let merged = chunking::merge_file_parts(dest_dir, &work_dir, file_name, *parts).await?;
        info!("Merged file written to {}", merged.display());
        return Ok(());
    }

    let config = Config::from_env()?;
    let work_dir = PathBuf::from(&config.work_dir);
    let engine = TransferEngine::new(config.webdav_config())?;

    match cli.command {
        Command::TestConnection => {
            if engine.test_connection().await {
                info!("Connection successful");
            } else {
                return Err(anyhow!("Connection failed"));
            }
        }
        Command::UploadFile {
            local_path,
            remote_folder,
            parts,
        } => {
            let folder = RemotePath::new(&remote_folder);
            engine
                .upload_file_chunked(&local_path, &folder, &work_dir, parts)
                .await
                .inspect_err(|e| report(e))?;
            info!("Upload complete");
        }
        Command::UploadFolder {
            local_dir,
            remote_folder,
        } => {
            let folder = RemotePath::new(&remote_folder);
            engine
                .upload_folder(&local_dir, &folder)
                .await
                .inspect_err(|e| report(e))?;
            info!("Upload complete");
        }
        Command::DownloadFile {
            remote_path,
            local_dir,
            parts,
        } => {
            let (folder, name) = split_remote_path(&remote_path)?;
            engine
                .download_file_chunked(&folder, &name, &local_dir, &work_dir, parts)
                .await
                .inspect_err(|e| report(e))?;
            info!("Download complete");
        }
        Command::DownloadFolder {
            remote_path,
            local_dir,
        } => {
            let (folder, name) = split_remote_path(&remote_path)?;
            engine
                .download_folder(&folder, &name, &local_dir)
                .await
                .inspect_err(|e| report(e))?;
            info!("Download complete");
        }
        Command::Split { .. } | Command::Merge { .. } => unreachable!("handled above"),
    }

    Ok(())
}

fn split_remote_path(remote_path: &str) -> Result<(RemotePath, String)> {
    let path = RemotePath::new(remote_path);
    if path.is_root() {
        return Err(anyhow!("Remote path must name a file or folder"));
    }
    let (parent, name) = path.parent_and_name();
    Ok((parent, name.to_string()))
}

fn report(e: &davferry::TransferError) {
    match e.failed_path() {
        Some(path) => error!("Transfer failed at {}: {}", path.display(), e),
        None => error!("Transfer failed: {}", e),
    }
}
