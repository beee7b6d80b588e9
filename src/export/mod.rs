pub mod exporter;
pub mod policy;
pub mod schedule;
pub mod template;
pub mod writer;

pub use exporter::{DatedReportExporter, ExportSummary, FailedDate, ReportSpec};
pub use policy::FailurePolicy;
