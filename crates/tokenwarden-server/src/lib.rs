pub mod config;
pub mod handlers;
pub mod observability;
pub mod server;

pub use config::{AppConfig, LoggingConfig, ServerConfig, StorageBackend, StorageConfig};
pub use observability::{build_filter, init_tracing};
pub use server::{ServerBuilder, TokenWardenServer, build_app, build_router, open_store};
