// src/lib.rs

pub mod assistant;
pub mod catalog;
pub mod config;
pub mod context;
pub mod error;
pub mod memory;
pub mod providers;
pub mod query;
pub mod recommend;
pub mod search;
pub mod tools;

pub use assistant::Assistant;
pub use config::AssistantConfig;
pub use error::AssistantError;

/// Install a `tracing` subscriber driven by `RUST_LOG` (falls back to the
/// configured log level). Call once from the host binary; safe to skip in tests.
pub fn init_tracing(default_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
