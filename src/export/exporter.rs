use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use opentelemetry::KeyValue;
use serde::Serialize;

use crate::error::{ExportError, ExportResult};
use crate::telemetry::metrics::{
    EXPORT_DATES, EXPORT_QUERY_DURATION, EXPORT_RETRY_COUNT, EXPORT_ROWS,
};
use crate::warehouse::{ResultSet, Warehouse};

use super::policy::{FailurePolicy, retry_delay};
use super::schedule::{DateRange, ScheduledDate, Step};
use super::template::{BoundQuery, QueryTemplate};
use super::writer::{ensure_dir, output_path, write_csv};

/// One dated report: what to run, where to write it, and over which dates.
#[derive(Debug, Clone)]
pub struct ReportSpec {
    name: String,
    template: QueryTemplate,
    output_dir: PathBuf,
    range: DateRange,
    step: Step,
}

impl ReportSpec {
    pub fn new(
        name: impl Into<String>,
        query: &str,
        output_dir: impl Into<PathBuf>,
        range: DateRange,
        step: Step,
    ) -> ExportResult<Self> {
        let name = name.into();
        if name.is_empty() || name.contains(['/', '\\']) {
            return Err(ExportError::Config(format!(
                "report name {name:?} cannot be used in a file name"
            )));
        }

        Ok(Self {
            name,
            template: QueryTemplate::parse(query)?,
            output_dir: output_dir.into(),
            range,
            step,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn template(&self) -> &QueryTemplate {
        &self.template
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn range(&self) -> DateRange {
        self.range
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn output_path(&self, label: NaiveDate) -> PathBuf {
        output_path(&self.output_dir, &self.name, label)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedDate {
    pub date: NaiveDate,
    pub attempts: u32,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportSummary {
    pub report: String,
    pub files: Vec<PathBuf>,
    pub rows_written: usize,
    pub failed: Vec<FailedDate>,
}

impl ExportSummary {
    fn new(report: &str) -> Self {
        Self {
            report: report.to_string(),
            files: Vec::new(),
            rows_written: 0,
            failed: Vec::new(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

struct FetchFailure {
    error: ExportError,
    attempts: u32,
}

pub struct DatedReportExporter {
    policy: FailurePolicy,
    retry_base: Duration,
}

impl DatedReportExporter {
    pub fn new(policy: FailurePolicy) -> Self {
        Self {
            policy,
            retry_base: Duration::from_secs(1),
        }
    }

    /// Base delay between retry attempts.
    pub fn with_retry_base(mut self, retry_base: Duration) -> Self {
        self.retry_base = retry_base;
        self
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    #[tracing::instrument(
        name = "export.report",
        skip(self, spec, warehouse),
        fields(
            report.name = %spec.name(),
            report.step = %spec.step(),
            report.start = %spec.range().start(),
            report.end = %spec.range().end(),
            report.policy = %self.policy,
            report.files = tracing::field::Empty,
            report.failed = tracing::field::Empty,
        )
    )]
    pub async fn export<W>(
        &self,
        spec: &ReportSpec,
        warehouse: &mut W,
    ) -> ExportResult<ExportSummary>
    where
        W: Warehouse + ?Sized,
    {
        ensure_dir(spec.output_dir())?;

        let mut summary = ExportSummary::new(spec.name());

        for scheduled in spec.range().sweep(spec.step()) {
            let query = spec.template().bind(&scheduled);
            tracing::info!(date = %scheduled.label, "Exporting data");

            let result = match self.fetch(warehouse, &query, &scheduled).await {
                Ok(result) => result,
                Err(failure) if failure.error.is_fatal() => return Err(failure.error),
                Err(failure) => {
                    record_date(spec, "failed");
                    if self.policy == FailurePolicy::Abort {
                        return Err(failure.error);
                    }
                    tracing::error!(
                        date = %scheduled.label,
                        attempts = failure.attempts,
                        error = %failure.error,
                        "Skipping date after query failure"
                    );
                    summary.failed.push(FailedDate {
                        date: scheduled.label,
                        attempts: failure.attempts,
                        error: failure.error.to_string(),
                    });
                    continue;
                }
            };

            let path = spec.output_path(scheduled.label);
            write_csv(&path, &result)?;

            record_date(spec, "written");
            EXPORT_ROWS.record(
                result.row_count() as f64,
                &[KeyValue::new("report.name", spec.name().to_string())],
            );
            tracing::debug!(path = %path.display(), rows = result.row_count(), "Wrote export file");

            summary.rows_written += result.row_count();
            summary.files.push(path);
        }

        let span = tracing::Span::current();
        span.record("report.files", summary.files.len());
        span.record("report.failed", summary.failed.len());

        tracing::info!(
            files = summary.files.len(),
            rows = summary.rows_written,
            failed = summary.failed.len(),
            "Report export finished"
        );

        Ok(summary)
    }

    async fn fetch<W>(
        &self,
        warehouse: &mut W,
        query: &BoundQuery,
        scheduled: &ScheduledDate,
    ) -> Result<ResultSet, FetchFailure>
    where
        W: Warehouse + ?Sized,
    {
        let max_attempts = self.policy.attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;
            let start = Instant::now();
            let result = warehouse.fetch_all(query).await;
            EXPORT_QUERY_DURATION.record(start.elapsed().as_secs_f64(), &[]);

            let source = match result {
                Ok(result) => return Ok(result),
                Err(source) => source,
            };

            if is_connection_failure(&source) {
                return Err(FetchFailure {
                    error: ExportError::Connection(source),
                    attempts: attempt,
                });
            }

            if attempt >= max_attempts {
                return Err(FetchFailure {
                    error: ExportError::Query {
                        date: scheduled.label,
                        source,
                    },
                    attempts: attempt,
                });
            }

            let delay = retry_delay(self.retry_base, attempt - 1);
            tracing::warn!(
                date = %scheduled.label,
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %source,
                "Report query failed, retrying"
            );
            EXPORT_RETRY_COUNT.add(1, &[]);
            tokio::time::sleep(delay).await;
        }
    }
}

fn record_date(spec: &ReportSpec, status: &'static str) {
    EXPORT_DATES.add(
        1,
        &[
            KeyValue::new("report.name", spec.name().to_string()),
            KeyValue::new("status", status),
        ],
    );
}

/// Errors that mean the connection itself is gone; retrying on it is futile.
fn is_connection_failure(error: &sqlx::Error) -> bool {
    matches!(
        error,
        sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolClosed
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::WorkerCrashed
    )
}
