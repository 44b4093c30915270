pub mod chunking;
pub mod webdav;
