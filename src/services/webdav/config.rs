use crate::errors::{Result, TransferError};
use crate::path::RemotePath;

/// Default WebDAV mount path used by Nextcloud/ownCloud servers.
pub const DEFAULT_WEBDAV_PATH: &str = "/remote.php/webdav";

/// WebDAV server configuration
#[derive(Debug, Clone)]
pub struct WebDAVConfig {
    pub server_url: String,
    pub webdav_path: String,
    pub username: String,
    pub password: String,
    pub timeout_seconds: u64,
}

impl WebDAVConfig {
    /// Creates a configuration with the default mount path and timeout.
    pub fn new(server_url: String, username: String, password: String) -> Self {
        Self {
            server_url,
            webdav_path: DEFAULT_WEBDAV_PATH.to_string(),
            username,
            password,
            timeout_seconds: 30,
        }
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        if self.server_url.is_empty() {
            return Err(TransferError::config("Server URL cannot be empty"));
        }

        if self.username.is_empty() {
            return Err(TransferError::config("Username cannot be empty"));
        }

        if self.password.is_empty() {
            return Err(TransferError::config("Password cannot be empty"));
        }

        if !self.server_url.starts_with("http://") && !self.server_url.starts_with("https://") {
            return Err(TransferError::config(
                "Server URL must start with http:// or https://",
            ));
        }

        Ok(())
    }

    /// Base URL for WebDAV operations: `<server><mount>` with exactly one
    /// separator between them and no trailing slash.
    pub fn webdav_url(&self) -> String {
        let server = self.server_url.trim_end_matches('/');
        let mount = self.webdav_path.trim_matches('/');

        if mount.is_empty() {
            server.to_string()
        } else {
            format!("{}/{}", server, mount)
        }
    }

    /// Canonical URL of a collection: `<server><mount>/<folder>/`, or
    /// `<server><mount>/` when `folder` is the root. Pure function of its
    /// inputs so every component builds identical URLs.
    pub fn url_for_folder(&self, folder: &RemotePath) -> String {
        if folder.is_root() {
            format!("{}/", self.webdav_url())
        } else {
            format!("{}/{}/", self.webdav_url(), encode_segments(folder))
        }
    }

    /// Canonical URL of a non-collection resource (no trailing slash).
    pub fn url_for_resource(&self, resource: &RemotePath) -> String {
        format!("{}/{}", self.webdav_url(), encode_segments(resource))
    }

    /// Gets the per-request timeout duration
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_seconds)
    }
}

/// Percent-encodes each path segment while keeping the `/` separators.
///
/// Remote paths are stored decoded (the parser decodes hrefs), so names
/// containing reserved characters like `#`, `%` or `?` must be re-encoded
/// before they go back into a request URL.
fn encode_segments(path: &RemotePath) -> String {
    path.as_str()
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(server_url: &str, webdav_path: &str) -> WebDAVConfig {
        WebDAVConfig {
            server_url: server_url.to_string(),
            webdav_path: webdav_path.to_string(),
            username: "testuser".to_string(),
            password: "testpass".to_string(),
            timeout_seconds: 30,
        }
    }

    #[test]
    fn test_webdav_url_normalizes_slashes() {
        let expected = "https://cloud.example.com/remote.php/webdav";
        for server in ["https://cloud.example.com", "https://cloud.example.com/"] {
            for mount in ["/remote.php/webdav", "/remote.php/webdav/", "remote.php/webdav"] {
                assert_eq!(config_with(server, mount).webdav_url(), expected);
            }
        }
    }

    #[test]
    fn test_url_for_folder_is_slash_insensitive() {
        let config = config_with("https://cloud.example.com/", "/remote.php/webdav/");
        let expected = "https://cloud.example.com/remote.php/webdav/a/b/";

        assert_eq!(config.url_for_folder(&RemotePath::new("/a/b/")), expected);
        assert_eq!(config.url_for_folder(&RemotePath::new("a/b")), expected);
        assert_eq!(config.url_for_folder(&RemotePath::new("a//b")), expected);
    }

    #[test]
    fn test_url_for_root_folder() {
        let config = config_with("https://cloud.example.com", "/remote.php/webdav");
        assert_eq!(
            config.url_for_folder(&RemotePath::root()),
            "https://cloud.example.com/remote.php/webdav/"
        );
    }

    #[test]
    fn test_url_for_resource() {
        let config = config_with("https://cloud.example.com", "/remote.php/webdav");
        assert_eq!(
            config.url_for_resource(&RemotePath::new("Documents/report.pdf")),
            "https://cloud.example.com/remote.php/webdav/Documents/report.pdf"
        );
    }

    #[test]
    fn test_url_encodes_reserved_characters_per_segment() {
        let config = config_with("https://cloud.example.com", "/remote.php/webdav");

        assert_eq!(
            config.url_for_resource(&RemotePath::new("photos/a#b 100%.txt")),
            "https://cloud.example.com/remote.php/webdav/photos/a%23b%20100%25.txt"
        );
        assert_eq!(
            config.url_for_folder(&RemotePath::new("what now?")),
            "https://cloud.example.com/remote.php/webdav/what%20now%3F/"
        );
    }

    #[test]
    fn test_validate_rejects_missing_fields() {
        let mut config = config_with("https://cloud.example.com", DEFAULT_WEBDAV_PATH);
        assert!(config.validate().is_ok());

        config.username = String::new();
        assert!(config.validate().is_err());

        let mut config = config_with("ftp://cloud.example.com", DEFAULT_WEBDAV_PATH);
        config.username = "u".to_string();
        assert!(config.validate().is_err());
    }
}
