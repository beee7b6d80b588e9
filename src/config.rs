use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::NaiveDate;
use sqlx::postgres::{PgConnectOptions, PgSslMode};

use crate::error::{ExportError, ExportResult};
use crate::export::policy::{DEFAULT_MAX_ATTEMPTS, FailurePolicy};

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: Option<String>,
    pub ssl_mode: PgSslMode,
}

impl DatabaseSettings {
    pub fn connect_options(&self) -> PgConnectOptions {
        let options = PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.database)
            .username(&self.user)
            .ssl_mode(self.ssl_mode)
            .application_name("report-exporter");

        match &self.password {
            Some(password) => options.password(password),
            None => options,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExportSettings {
    pub export_dir: PathBuf,
    /// Overrides every report's default start date.
    pub start_date: Option<NaiveDate>,
    /// Overrides every report's default end date.
    pub end_date: Option<NaiveDate>,
    pub failure_policy: FailurePolicy,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: String,
    pub database: DatabaseSettings,
    pub export: ExportSettings,
    pub otel_enabled: bool,
    pub otel_service_name: String,
    pub otel_exporter_endpoint: String,
}

impl Config {
    pub fn from_env() -> ExportResult<Self> {
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> ExportResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| ExportError::Config(format!("{key} must be set")))
        };

        let max_attempts =
            parse_var(&lookup, "EXPORT_MAX_ATTEMPTS")?.unwrap_or(DEFAULT_MAX_ATTEMPTS);
        let failure_policy = match lookup("EXPORT_FAILURE_POLICY") {
            Some(name) => FailurePolicy::parse(&name, max_attempts)?,
            None => FailurePolicy::default(),
        };

        let ssl_mode = match lookup("DB_SSLMODE") {
            Some(mode) => PgSslMode::from_str(&mode)
                .map_err(|e| ExportError::Config(format!("DB_SSLMODE is invalid: {e}")))?,
            None => PgSslMode::Prefer,
        };

        Ok(Self {
            environment: lookup("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),
            database: DatabaseSettings {
                host: required("DB_HOST")?,
                port: parse_var(&lookup, "DB_PORT")?.unwrap_or(5432),
                database: required("DB_NAME")?,
                user: required("DB_USER")?,
                password: lookup("DB_PASSWORD"),
                ssl_mode,
            },
            export: ExportSettings {
                export_dir: lookup("EXPORT_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("exports")),
                start_date: parse_var(&lookup, "EXPORT_START_DATE")?,
                end_date: parse_var(&lookup, "EXPORT_END_DATE")?,
                failure_policy,
            },
            otel_enabled: parse_var(&lookup, "OTEL_ENABLED")?.unwrap_or(false),
            otel_service_name: lookup("OTEL_SERVICE_NAME")
                .unwrap_or_else(|| "report-exporter".to_string()),
            otel_exporter_endpoint: lookup("OTEL_EXPORTER_OTLP_ENDPOINT")
                .unwrap_or_else(|| "http://localhost:4317".to_string()),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> ExportResult<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| ExportError::Config(format!("{key} is invalid ({raw:?}): {e}"))),
        _ => Ok(None),
    }
}
