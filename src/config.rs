use std::env;

use anyhow::{anyhow, Result};

use crate::services::webdav::{WebDAVConfig, DEFAULT_WEBDAV_PATH};

#[derive(Clone, Debug)]
pub struct Config {
    pub server_url: String,
    pub username: String,
    pub password: String,
    pub webdav_path: String,
    pub timeout_seconds: u64,
    pub work_dir: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Config {
            server_url: env::var("DAVFERRY_SERVER_URL")
                .map_err(|_| anyhow!("DAVFERRY_SERVER_URL must be set"))?,
            username: env::var("DAVFERRY_USERNAME")
                .map_err(|_| anyhow!("DAVFERRY_USERNAME must be set"))?,
            password: env::var("DAVFERRY_PASSWORD")
                .map_err(|_| anyhow!("DAVFERRY_PASSWORD must be set"))?,
            webdav_path: env::var("DAVFERRY_WEBDAV_PATH")
                .unwrap_or_else(|_| DEFAULT_WEBDAV_PATH.to_string()),
            timeout_seconds: env::var("DAVFERRY_TIMEOUT_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
            work_dir: work_dir_from_env(),
        })
    }

    pub fn webdav_config(&self) -> WebDAVConfig {
        WebDAVConfig {
            server_url: self.server_url.clone(),
            webdav_path: self.webdav_path.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            timeout_seconds: self.timeout_seconds,
        }
    }
}

/// Work directory for chunk parts. Resolvable on its own (including from a
/// `.env` file) because split and merge run without server credentials.
pub fn work_dir_from_env() -> String {
    dotenvy::dotenv().ok();
    env::var("DAVFERRY_WORK_DIR").unwrap_or_else(|_| "./work".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_work_dir_from_env_prefers_env_var() {
        env::set_var("DAVFERRY_WORK_DIR", "/tmp/ferry-parts");
        assert_eq!(work_dir_from_env(), "/tmp/ferry-parts");

        env::remove_var("DAVFERRY_WORK_DIR");
        assert_eq!(work_dir_from_env(), "./work");
    }
}
