use std::process::ExitCode;

use chrono::Local;
use clap::Parser;
use uuid::Uuid;

use report_exporter::cli::Args;
use report_exporter::config::Config;
use report_exporter::error::ExportResult;
use report_exporter::export::{DatedReportExporter, ReportSpec};
use report_exporter::runner;
use report_exporter::telemetry::init_telemetry;
use report_exporter::warehouse::PgWarehouse;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("report-exporter: {e}");
            return ExitCode::FAILURE;
        }
    };

    let telemetry_guard = match init_telemetry(&config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("report-exporter: failed to initialize telemetry: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let code = run(&args, &config).await;
    telemetry_guard.shutdown();
    code
}

fn load_config(args: &Args) -> ExportResult<Config> {
    let mut config = Config::from_env()?;
    args.apply(&mut config)?;
    Ok(config)
}

async fn run(args: &Args, config: &Config) -> ExitCode {
    let run_id = Uuid::new_v4();
    let today = Local::now().date_naive();

    tracing::info!(
        %run_id,
        environment = %config.environment,
        reports = ?args.reports,
        policy = %config.export.failure_policy,
        "Starting report-exporter"
    );

    let specs = match args
        .reports
        .iter()
        .map(|kind| kind.spec(&config.export, today))
        .collect::<ExportResult<Vec<ReportSpec>>>()
    {
        Ok(specs) => specs,
        Err(e) => {
            tracing::error!(error = %e, "Invalid report configuration");
            return ExitCode::FAILURE;
        }
    };

    let mut warehouse = match PgWarehouse::connect(&config.database).await {
        Ok(warehouse) => warehouse,
        Err(e) => {
            tracing::error!(error = %e, "Could not connect to the warehouse");
            return ExitCode::FAILURE;
        }
    };

    let exporter = DatedReportExporter::new(config.export.failure_policy);

    match runner::run(run_id, &exporter, &specs, &mut warehouse).await {
        Ok(report) => {
            if args.json {
                match serde_json::to_string(&report) {
                    Ok(json) => println!("{json}"),
                    Err(e) => tracing::warn!(error = %e, "Failed to serialize run summary"),
                }
            }
            for summary in &report.reports {
                for failed in &summary.failed {
                    tracing::warn!(
                        report = %summary.report,
                        date = %failed.date,
                        error = %failed.error,
                        "Date was not exported"
                    );
                }
            }
            report.exit_code()
        }
        Err(e) => {
            tracing::error!(error = %e, kind = e.kind(), "Export run aborted");
            ExitCode::FAILURE
        }
    }
}
