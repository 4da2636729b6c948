// ConfigBridge - Copy Dota 2 configs between Steam accounts and archives
//
// This is the library crate containing the core business logic and data structures.
// The binary crate (main.rs) provides the command line entry point.

pub mod app;
pub mod config;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod services;
pub mod state;

// Re-export commonly used types for convenience
pub use app::{BridgeController, ImportRequest};
pub use config::ConfigManager;
pub use metrics::Metrics;
pub use models::{AccountRecord, AppState, ArchiveMetadata, BridgeSettings, UserConfig};
pub use state::{StateChange, StateManager};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
