use std::path::Path;

use reqwest::{Client, Method, StatusCode};
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

use super::config::WebDAVConfig;
use crate::errors::{Result, TransferError};
use crate::path::RemotePath;

/// Property request body sent with every PROPFIND.
const PROPFIND_BODY: &str = r#"<?xml version="1.0" encoding="utf-8"?>
    <D:propfind xmlns:D="DAV:">
        <D:prop>
            <D:displayname/>
            <D:resourcetype/>
            <D:getcontentlength/>
        </D:prop>
    </D:propfind>"#;

/// Low-level WebDAV transport: PROPFIND, MKCOL, PUT and GET with basic
/// auth. Connection-level failures (DNS, TLS, timeout) surface as
/// `TransferError::Transport`; unexpected HTTP statuses are left for the
/// caller to judge, since acceptable codes differ per operation.
pub struct WebDAVConnection {
    client: Client,
    config: WebDAVConfig,
}

impl WebDAVConnection {
    pub fn new(config: WebDAVConfig) -> Result<Self> {
        config.validate()?;
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| TransferError::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &WebDAVConfig {
        &self.config
    }

    /// Issues a PROPFIND with the given `Depth` header and returns the raw
    /// status and body.
    pub async fn propfind(&self, url: &str, depth: &str) -> Result<(StatusCode, String)> {
        let method = Method::from_bytes(b"PROPFIND")
            .map_err(|e| TransferError::config(format!("Invalid HTTP method: {}", e)))?;

        let response = self
            .client
            .request(method, url)
            .basic_auth(&self.config.username, Some(&self.config.password))
            .header("Depth", depth)
            .header("Content-Type", "application/xml")
            .body(PROPFIND_BODY)
            .send()
            .await
            .map_err(|e| transport(url, e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| transport(url, e))?;
        debug!("PROPFIND {} depth={} -> {}", url, depth, status);

        Ok((status, body))
    }

    /// Creates a collection. Returns the raw status; callers accept 201
    /// (created) and 405 (already exists).
    pub async fn mkcol(&self, url: &str) -> Result<StatusCode> {
        let method = Method::from_bytes(b"MKCOL")
            .map_err(|e| TransferError::config(format!("Invalid HTTP method: {}", e)))?;

        let response = self
            .client
            .request(method, url)
            .basic_auth(&self.config.username, Some(&self.config.password))
            .send()
            .await
            .map_err(|e| transport(url, e))?;

        debug!("MKCOL {} -> {}", url, response.status());
        Ok(response.status())
    }

    /// Uploads a local file, streaming it from disk rather than buffering
    /// the whole body in memory.
    pub async fn put_file(&self, url: &str, local_path: &Path) -> Result<StatusCode> {
        let metadata = tokio::fs::metadata(local_path)
            .await
            .map_err(|e| TransferError::filesystem(local_path, e))?;
        let file = tokio::fs::File::open(local_path)
            .await
            .map_err(|e| TransferError::filesystem(local_path, e))?;

        let body = reqwest::Body::wrap_stream(ReaderStream::new(file));

        let response = self
            .client
            .put(url)
            .basic_auth(&self.config.username, Some(&self.config.password))
            .header("Content-Length", metadata.len())
            .body(body)
            .send()
            .await
            .map_err(|e| transport(url, e))?;

        debug!(
            "PUT {} ({} bytes) -> {}",
            url,
            metadata.len(),
            response.status()
        );
        Ok(response.status())
    }

    /// Starts a download; the caller consumes the body as a byte stream.
    pub async fn get(&self, url: &str) -> Result<reqwest::Response> {
        let response = self
            .client
            .get(url)
            .basic_auth(&self.config.username, Some(&self.config.password))
            .send()
            .await
            .map_err(|e| transport(url, e))?;

        debug!("GET {} -> {}", url, response.status());
        Ok(response)
    }

    /// Depth-0 PROPFIND against the WebDAV root; true iff the server
    /// answers 207. Anything else, including transport failures, is false.
    pub async fn test_connection(&self) -> bool {
        let url = self.config.url_for_folder(&RemotePath::root());
        match self.propfind(&url, "0").await {
            Ok((status, _)) => status.as_u16() == 207,
            Err(e) => {
                warn!("Connection test failed: {}", e);
                false
            }
        }
    }
}

fn transport(url: &str, source: reqwest::Error) -> TransferError {
    TransferError::Transport {
        url: url.to_string(),
        source,
    }
}
