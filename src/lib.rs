//! WebDAV synchronization and chunked-transfer engine.
//!
//! Transfers files and whole directory trees between a local filesystem
//! and a WebDAV server (e.g. Nextcloud), with optional splitting of large
//! files into a fixed number of sequential parts before upload and
//! reassembly after download.

pub mod config;
pub mod errors;
pub mod path;
pub mod services;

pub use config::Config;
pub use errors::TransferError;
pub use path::RemotePath;
pub use services::chunking;
pub use services::webdav::{TransferEngine, WebDAVConfig};
