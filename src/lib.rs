pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod reports;
pub mod runner;
pub mod telemetry;
pub mod warehouse;

pub use config::Config;
pub use error::{ExportError, ExportResult};
