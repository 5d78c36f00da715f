//! Configuration module

mod server;

pub use server::MarkdownConfig;
pub use server::CONFIG_FILE;
pub use server::ServerConfig;
