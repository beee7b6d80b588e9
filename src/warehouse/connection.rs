use sqlx::postgres::PgConnection;
use sqlx::{Column, Connection, Executor, Statement};

use crate::config::DatabaseSettings;
use crate::error::{ExportError, ExportResult};
use crate::export::template::BoundQuery;

use super::values::render_row;
use super::{ResultSet, Warehouse};

/// A single dedicated warehouse connection, held for the whole run.
pub struct PgWarehouse {
    conn: Option<PgConnection>,
    label: String,
}

impl PgWarehouse {
    #[tracing::instrument(
        name = "db.connect",
        skip(settings),
        fields(db.host = %settings.host, db.port = settings.port, db.name = %settings.database)
    )]
    pub async fn connect(settings: &DatabaseSettings) -> ExportResult<Self> {
        let conn = PgConnection::connect_with(&settings.connect_options())
            .await
            .map_err(ExportError::Connection)?;

        tracing::info!("Warehouse connection opened");

        Ok(Self {
            conn: Some(conn),
            label: format!("{}:{}/{}", settings.host, settings.port, settings.database),
        })
    }
}

#[async_trait::async_trait]
impl Warehouse for PgWarehouse {
    #[tracing::instrument(
        name = "db.query",
        skip(self, query),
        fields(
            db.params = query.params.len(),
            db.columns = tracing::field::Empty,
            db.rows = tracing::field::Empty,
        )
    )]
    async fn fetch_all(&mut self, query: &BoundQuery) -> Result<ResultSet, sqlx::Error> {
        let conn = self.conn.as_mut().ok_or(sqlx::Error::PoolClosed)?;

        let statement = (&mut *conn).prepare(query.sql.as_str()).await?;
        let columns: Vec<String> = statement
            .columns()
            .iter()
            .map(|column| column.name().to_string())
            .collect();

        let mut bound = statement.query();
        for param in &query.params {
            bound = bound.bind(*param);
        }
        let rows = bound.fetch_all(&mut *conn).await?;

        let rows = rows
            .iter()
            .map(render_row)
            .collect::<Result<Vec<_>, _>>()?;

        let span = tracing::Span::current();
        span.record("db.columns", columns.len());
        span.record("db.rows", rows.len());

        Ok(ResultSet { columns, rows })
    }

    async fn close(&mut self) -> Result<(), sqlx::Error> {
        if let Some(conn) = self.conn.take() {
            conn.close().await?;
            tracing::info!(warehouse = %self.label, "Warehouse connection closed");
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.label
    }
}
