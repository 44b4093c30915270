use std::path::{Path, PathBuf};

use futures_util::future::BoxFuture;
use futures_util::StreamExt;
use reqwest::StatusCode;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use walkdir::WalkDir;

use super::config::WebDAVConfig;
use super::connection::WebDAVConnection;
use super::xml_parser::parse_propfind_response;
use crate::errors::{Result, TransferError};
use crate::path::RemotePath;
use crate::services::chunking::{self, create_or_clear_dir};

/// One entry of a local tree walk; recomputed per sync run.
struct LocalEntry {
    path: PathBuf,
    is_dir: bool,
}

/// Mirrors local directories into remote collections and back, one
/// sequential transfer at a time. The first failure aborts the remaining
/// sequence; files already transferred are not rolled back.
///
/// Multiple engines with different configurations can coexist; nothing is
/// shared between instances.
pub struct TransferEngine {
    connection: WebDAVConnection,
    cancel: CancellationToken,
}

impl TransferEngine {
    pub fn new(config: WebDAVConfig) -> Result<Self> {
        Self::with_cancellation(config, CancellationToken::new())
    }

    /// Creates an engine whose long-running operations stop at the next
    /// file or chunk boundary once `cancel` is triggered.
    pub fn with_cancellation(config: WebDAVConfig, cancel: CancellationToken) -> Result<Self> {
        Ok(Self {
            connection: WebDAVConnection::new(config)?,
            cancel,
        })
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    fn config(&self) -> &WebDAVConfig {
        self.connection.config()
    }

    fn ensure_not_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(TransferError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Depth-0 PROPFIND against the WebDAV root; true iff 207.
    pub async fn test_connection(&self) -> bool {
        self.connection.test_connection().await
    }

    /// Uploads a single file into `remote_folder`, which must already
    /// exist as a collection.
    pub async fn upload_file(&self, local_path: &Path, remote_folder: &RemotePath) -> Result<()> {
        let name = local_base_name(local_path)?;
        let url = self.config().url_for_resource(&remote_folder.join(&name));

        let status = self
            .connection
            .put_file(&url, local_path)
            .await
            .map_err(|e| e.for_file(local_path))?;

        if matches!(status.as_u16(), 201 | 204) {
            debug!("Uploaded {} -> {}", local_path.display(), url);
            Ok(())
        } else {
            Err(TransferError::UnexpectedStatus { status, url }.for_file(local_path))
        }
    }

    /// Mirrors `local_dir` into `remote_folder/<base name of local_dir>`.
    ///
    /// The top-level collection gets exactly one MKCOL (201 and 405 both
    /// count as success), and each nested subdirectory one MKCOL before
    /// files beneath it upload. Any failed request aborts immediately with
    /// the failing local path in the error.
    pub async fn upload_folder(&self, local_dir: &Path, remote_folder: &RemotePath) -> Result<()> {
        let folder_name = local_base_name(local_dir)?;
        let target = remote_folder.join(&folder_name);

        info!(
            "Uploading folder {} -> {}",
            local_dir.display(),
            target
        );

        self.make_collection(&target, local_dir).await?;

        for entry in collect_local_entries(local_dir).await? {
            self.ensure_not_cancelled()?;

            let rel = entry.path.strip_prefix(local_dir).map_err(|_| {
                TransferError::filesystem(
                    &entry.path,
                    std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        "walked entry escapes the upload root",
                    ),
                )
            })?;
            let remote = target.join(RemotePath::from_local_relative(rel)?.as_str());

            if entry.is_dir {
                // WalkDir yields a directory before its contents, so the
                // collection exists by the time files beneath it upload.
                self.make_collection(&remote, &entry.path).await?;
            } else {
                let url = self.config().url_for_resource(&remote);
                let status = self
                    .connection
                    .put_file(&url, &entry.path)
                    .await
                    .map_err(|e| e.for_file(&entry.path))?;
                if !matches!(status.as_u16(), 201 | 204) {
                    return Err(
                        TransferError::UnexpectedStatus { status, url }.for_file(&entry.path)
                    );
                }
                debug!("Uploaded {} -> {}", entry.path.display(), remote);
            }
        }

        Ok(())
    }

    /// Issues one MKCOL for `collection`, accepting "created" and
    /// "already exists".
    async fn make_collection(&self, collection: &RemotePath, local_origin: &Path) -> Result<()> {
        let url = self.config().url_for_folder(collection);
        let status = self
            .connection
            .mkcol(&url)
            .await
            .map_err(|e| e.for_file(local_origin))?;

        if matches!(status.as_u16(), 201 | 405) {
            Ok(())
        } else {
            Err(TransferError::UnexpectedStatus { status, url }.for_file(local_origin))
        }
    }

    /// Streams `remote_folder/<name>` into `<local_dir>/<name>` without
    /// buffering the body in memory.
    pub async fn download_file(
        &self,
        remote_folder: &RemotePath,
        name: &str,
        local_dir: &Path,
    ) -> Result<()> {
        let url = self.config().url_for_resource(&remote_folder.join(name));
        let response = self.connection.get(&url).await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(TransferError::UnexpectedStatus { status, url });
        }

        tokio::fs::create_dir_all(local_dir)
            .await
            .map_err(|e| TransferError::filesystem(local_dir, e))?;

        let local_path = local_dir.join(name);
        let mut file = tokio::fs::File::create(&local_path)
            .await
            .map_err(|e| TransferError::filesystem(&local_path, e))?;

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            self.ensure_not_cancelled()?;
            let chunk = chunk.map_err(|e| TransferError::Transport {
                url: url.clone(),
                source: e,
            })?;
            file.write_all(&chunk)
                .await
                .map_err(|e| TransferError::filesystem(&local_path, e))?;
        }
        file.flush()
            .await
            .map_err(|e| TransferError::filesystem(&local_path, e))?;

        debug!("Downloaded {} -> {}", url, local_path.display());
        Ok(())
    }

    /// Mirrors the remote collection `remote_folder/<name>` into
    /// `<local_dir>/<name>`, recreating nested collections as local
    /// directories.
    ///
    /// Each level is listed with a depth-1 PROPFIND and children are
    /// recursed individually; recursion terminates because every call
    /// operates on a strictly deeper remote path. A non-207 answer or an
    /// unparsable body aborts that subtree.
    pub async fn download_folder(
        &self,
        remote_folder: &RemotePath,
        name: &str,
        local_dir: &Path,
    ) -> Result<()> {
        self.download_folder_inner(remote_folder.clone(), name.to_string(), local_dir.to_path_buf())
            .await
    }

    fn download_folder_inner(
        &self,
        remote_folder: RemotePath,
        name: String,
        local_dir: PathBuf,
    ) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.ensure_not_cancelled()?;

            let requested = remote_folder.join(&name);
            let url = self.config().url_for_folder(&requested);

            let (status, body) = self.connection.propfind(&url, "1").await?;
            if status.as_u16() != 207 {
                return Err(TransferError::UnexpectedStatus { status, url });
            }
            let resources =
                parse_propfind_response(&body, &requested, &self.config().webdav_path)?;

            let local_target = local_dir.join(&name);
            create_or_clear_dir(&local_target).await?;
            debug!(
                "Listed {}: {} children -> {}",
                requested,
                resources.len(),
                local_target.display()
            );

            for resource in resources {
                self.ensure_not_cancelled()?;
                if resource.is_collection {
                    self.download_folder_inner(
                        resource.parent.clone(),
                        resource.name.clone(),
                        local_target.clone(),
                    )
                    .await?;
                } else {
                    self.download_file(&resource.parent, &resource.name, &local_target)
                        .await?;
                }
            }

            Ok(())
        })
    }

    /// Splits `local_path` into `parts` chunks under `work_dir` and
    /// uploads the chunk set as a collection named after the file.
    ///
    /// Distinct from [`upload_folder`](Self::upload_folder) at the API
    /// level even though the chunk set travels through it.
    pub async fn upload_file_chunked(
        &self,
        local_path: &Path,
        remote_folder: &RemotePath,
        work_dir: &Path,
        parts: u32,
    ) -> Result<()> {
        if parts == 0 {
            return Err(TransferError::config("Part count must be at least 1"));
        }
        if parts == 1 {
            return self.upload_file(local_path, remote_folder).await;
        }

        let chunk_dir =
            chunking::split_file_with_cancellation(local_path, work_dir, parts, &self.cancel)
                .await?;
        self.upload_folder(&chunk_dir, remote_folder).await
    }

    /// Downloads the chunk collection `remote_folder/<name>` into
    /// `work_dir` and merges the parts into `<dest_dir>/<name>`.
    pub async fn download_file_chunked(
        &self,
        remote_folder: &RemotePath,
        name: &str,
        dest_dir: &Path,
        work_dir: &Path,
        parts: u32,
    ) -> Result<()> {
        if parts == 0 {
            return Err(TransferError::config("Part count must be at least 1"));
        }
        if parts == 1 {
            return self.download_file(remote_folder, name, dest_dir).await;
        }

        self.download_folder(remote_folder, name, work_dir).await?;
        chunking::merge_file_parts_with_cancellation(dest_dir, work_dir, name, parts, &self.cancel)
            .await?;
        Ok(())
    }
}

fn local_base_name(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.to_string())
        .ok_or_else(|| {
            TransferError::config(format!("Path has no usable file name: {}", path.display()))
        })
}

/// Walks a local tree on a blocking thread, directories before their
/// contents.
async fn collect_local_entries(root: &Path) -> Result<Vec<LocalEntry>> {
    let walk_root = root.to_path_buf();
    let entries = tokio::task::spawn_blocking(move || -> Result<Vec<LocalEntry>> {
        let mut entries = Vec::new();
        for entry in WalkDir::new(&walk_root).min_depth(1) {
            let entry = entry.map_err(|e| {
                let path = e
                    .path()
                    .map(|p| p.to_path_buf())
                    .unwrap_or_else(|| walk_root.clone());
                TransferError::filesystem(path, e.into())
            })?;
            entries.push(LocalEntry {
                is_dir: entry.file_type().is_dir(),
                path: entry.into_path(),
            });
        }
        Ok(entries)
    })
    .await
    .map_err(|e| {
        TransferError::filesystem(root, std::io::Error::new(std::io::ErrorKind::Other, e))
    })??;

    Ok(entries)
}
