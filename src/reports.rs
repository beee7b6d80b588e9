//! Built-in report catalog. The SQL lives in `sql/` and uses `:date` for the
//! bound period date.

use chrono::NaiveDate;
use serde::Serialize;

use crate::config::ExportSettings;
use crate::error::ExportResult;
use crate::export::ReportSpec;
use crate::export::schedule::{DateRange, Step};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ReportKind {
    /// Per-organization ASIN usage against its cap, one file per month end
    AsinUsageMonthly,
    /// Daily ad cost and attributed sales per billing entity
    DailyBillingEntityAdData,
    /// Daily per-organization resource counts
    DailyOrgResourceReport,
}

impl ReportKind {
    pub const ALL: [ReportKind; 3] = [
        ReportKind::AsinUsageMonthly,
        ReportKind::DailyBillingEntityAdData,
        ReportKind::DailyOrgResourceReport,
    ];

    /// Logical name used as the file name prefix.
    pub fn name(self) -> &'static str {
        match self {
            ReportKind::AsinUsageMonthly => "asin_usage",
            ReportKind::DailyBillingEntityAdData => "daily_billing_entity_ad_data",
            ReportKind::DailyOrgResourceReport => "daily_org_resource_report",
        }
    }

    pub fn subdirectory(self) -> &'static str {
        match self {
            ReportKind::AsinUsageMonthly => "monthly",
            ReportKind::DailyBillingEntityAdData => "daily_billing_entity_ad_data",
            ReportKind::DailyOrgResourceReport => "daily_org_resource_report",
        }
    }

    pub fn step(self) -> Step {
        match self {
            ReportKind::AsinUsageMonthly => Step::MonthEnd,
            ReportKind::DailyBillingEntityAdData | ReportKind::DailyOrgResourceReport => {
                Step::Daily
            }
        }
    }

    pub fn sql(self) -> &'static str {
        match self {
            ReportKind::AsinUsageMonthly => include_str!("../sql/asin_usage_monthly.sql"),
            ReportKind::DailyBillingEntityAdData => {
                include_str!("../sql/daily_billing_entity_ad_data.sql")
            }
            ReportKind::DailyOrgResourceReport => {
                include_str!("../sql/daily_org_resource_report.sql")
            }
        }
    }

    pub fn default_range(self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        let ymd = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap_or(today);
        match self {
            ReportKind::AsinUsageMonthly => (ymd(2023, 1, 1), ymd(2023, 12, 31)),
            ReportKind::DailyBillingEntityAdData => (ymd(2023, 1, 1), today),
            ReportKind::DailyOrgResourceReport => (ymd(2024, 1, 1), today),
        }
    }

    /// Resolves this report against the export settings. Explicit start and
    /// end dates win over the report's defaults.
    pub fn spec(self, settings: &ExportSettings, today: NaiveDate) -> ExportResult<ReportSpec> {
        let (default_start, default_end) = self.default_range(today);
        let range = DateRange::new(
            settings.start_date.unwrap_or(default_start),
            settings.end_date.unwrap_or(default_end),
        )?;

        ReportSpec::new(
            self.name(),
            self.sql(),
            settings.export_dir.join(self.subdirectory()),
            range,
            self.step(),
        )
    }
}
