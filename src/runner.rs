use std::process::ExitCode;

use serde::Serialize;
use uuid::Uuid;

use crate::error::ExportResult;
use crate::export::{DatedReportExporter, ExportSummary, ReportSpec};
use crate::warehouse::Warehouse;

/// Exit status when every report finished but some dates were skipped.
pub const EXIT_PARTIAL: u8 = 2;

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub reports: Vec<ExportSummary>,
}

impl RunReport {
    pub fn failed_dates(&self) -> usize {
        self.reports.iter().map(|r| r.failed.len()).sum()
    }

    pub fn files_written(&self) -> usize {
        self.reports.iter().map(|r| r.files.len()).sum()
    }

    pub fn status(&self) -> u8 {
        if self.failed_dates() == 0 { 0 } else { EXIT_PARTIAL }
    }

    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.status())
    }
}

/// Exports every spec in order over one warehouse connection, then closes
/// the connection whether or not the exports succeeded.
#[tracing::instrument(
    name = "export.run",
    skip_all,
    fields(run.id = %run_id, run.reports = specs.len(), warehouse = %warehouse.name())
)]
pub async fn run<W>(
    run_id: Uuid,
    exporter: &DatedReportExporter,
    specs: &[ReportSpec],
    warehouse: &mut W,
) -> ExportResult<RunReport>
where
    W: Warehouse + ?Sized,
{
    let outcome = export_each(exporter, specs, warehouse).await;

    if let Err(e) = warehouse.close().await {
        tracing::warn!(error = %e, "Failed to close warehouse connection cleanly");
    }

    let reports = outcome?;
    let report = RunReport { run_id, reports };

    tracing::info!(
        files = report.files_written(),
        failed_dates = report.failed_dates(),
        "Export run finished"
    );

    Ok(report)
}

async fn export_each<W>(
    exporter: &DatedReportExporter,
    specs: &[ReportSpec],
    warehouse: &mut W,
) -> ExportResult<Vec<ExportSummary>>
where
    W: Warehouse + ?Sized,
{
    let mut summaries = Vec::with_capacity(specs.len());
    for spec in specs {
        summaries.push(exporter.export(spec, warehouse).await?);
    }
    Ok(summaries)
}
