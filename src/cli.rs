use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, ValueEnum};

use crate::config::Config;
use crate::error::{ExportError, ExportResult};
use crate::export::policy::{DEFAULT_MAX_ATTEMPTS, FailurePolicy};
use crate::reports::ReportKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OnError {
    Abort,
    Skip,
    Retry,
}

#[derive(Parser, Debug)]
#[command(name = "report-exporter", version)]
#[command(about = "Export dated warehouse reports to CSV, one file per date")]
pub struct Args {
    /// Reports to export, in order
    #[arg(value_enum, required = true)]
    pub reports: Vec<ReportKind>,

    /// First date to export, YYYY-MM-DD (or set EXPORT_START_DATE)
    #[arg(long)]
    pub start: Option<NaiveDate>,

    /// Last date to export, YYYY-MM-DD (or set EXPORT_END_DATE)
    #[arg(long)]
    pub end: Option<NaiveDate>,

    /// Root directory for export files (or set EXPORT_DIR)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// What to do when a single date's query fails
    #[arg(long, value_enum)]
    pub on_error: Option<OnError>,

    /// Attempts per date when retrying; implies --on-error retry
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Print the run summary as JSON on stdout
    #[arg(long)]
    pub json: bool,
}

impl Args {
    /// Layers command-line flags over the environment configuration.
    pub fn apply(&self, config: &mut Config) -> ExportResult<()> {
        let export = &mut config.export;

        if let Some(start) = self.start {
            export.start_date = Some(start);
        }
        if let Some(end) = self.end {
            export.end_date = Some(end);
        }
        if let Some(dir) = &self.output_dir {
            export.export_dir = dir.clone();
        }

        let current_attempts = match export.failure_policy {
            FailurePolicy::Retry { max_attempts } => max_attempts,
            _ => DEFAULT_MAX_ATTEMPTS,
        };
        let attempts = self.max_attempts.unwrap_or(current_attempts);

        let policy_name = match (self.on_error, self.max_attempts) {
            (Some(OnError::Abort | OnError::Skip), Some(_)) => {
                return Err(ExportError::Config(
                    "--max-attempts only applies with --on-error retry".to_string(),
                ));
            }
            (Some(OnError::Abort), None) => Some("abort"),
            (Some(OnError::Skip), None) => Some("skip"),
            (Some(OnError::Retry), _) | (None, Some(_)) => Some("retry"),
            (None, None) => None,
        };
        if let Some(name) = policy_name {
            export.failure_policy = FailurePolicy::parse(name, attempts)?;
        }

        Ok(())
    }
}
