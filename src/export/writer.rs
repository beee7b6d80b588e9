use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::error::{ExportError, ExportResult};
use crate::warehouse::ResultSet;

pub fn output_path(dir: &Path, report_name: &str, label: NaiveDate) -> PathBuf {
    dir.join(format!("{report_name}_{}.csv", label.format("%Y-%m-%d")))
}

pub fn ensure_dir(dir: &Path) -> ExportResult<()> {
    fs::create_dir_all(dir).map_err(|source| ExportError::Filesystem {
        path: dir.to_path_buf(),
        source,
    })
}

/// Writes the header row followed by every data row, replacing any existing
/// file. Records end in CRLF with minimal quoting.
#[tracing::instrument(
    name = "export.write_csv",
    skip(result),
    fields(path = %path.display(), csv.columns = result.columns.len(), csv.rows = result.row_count())
)]
pub fn write_csv(path: &Path, result: &ResultSet) -> ExportResult<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }

    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .quote_style(csv::QuoteStyle::Necessary)
        .from_path(path)
        .map_err(|e| csv_error(path, e))?;

    writer
        .write_record(&result.columns)
        .map_err(|e| csv_error(path, e))?;
    for row in &result.rows {
        writer.write_record(row).map_err(|e| csv_error(path, e))?;
    }

    writer.flush().map_err(|source| ExportError::Filesystem {
        path: path.to_path_buf(),
        source,
    })
}

fn csv_error(path: &Path, source: csv::Error) -> ExportError {
    ExportError::Csv {
        path: path.to_path_buf(),
        source,
    }
}
