// Library interface for the atdsrs modules
// This allows integration tests to access the core functionality

pub mod amplitude;
pub mod batch;
pub mod breath;
pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod filter;
pub mod import;
pub mod logging;
pub mod models;
pub mod physio;
pub mod ring;
pub mod session;
pub mod stats;
pub mod waveform;
pub mod zones;

// Re-export commonly used types for convenience
pub use batch::{analyze, BatchSummary};
pub use engine::AtdsEngine;
pub use error::{AtdsError, Result};
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use models::*;
pub use session::Session;
pub use zones::ZoneState;
