// WebDAV modules organized by functionality

pub mod config;
pub mod connection;
pub mod sync;
pub mod xml_parser;

// Re-export main types for convenience
pub use config::{WebDAVConfig, DEFAULT_WEBDAV_PATH};
pub use connection::WebDAVConnection;
pub use sync::TransferEngine;
pub use xml_parser::{parse_propfind_response, RemoteResource};
