pub mod connection;
#[cfg(test)]
pub mod scripted;
pub mod values;

pub use connection::PgWarehouse;

use crate::export::template::BoundQuery;

/// Column names and rendered rows of one query execution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ResultSet {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

#[async_trait::async_trait]
pub trait Warehouse: Send {
    /// Runs `query` and returns every row. The column list is populated even
    /// when no rows match.
    async fn fetch_all(&mut self, query: &BoundQuery) -> Result<ResultSet, sqlx::Error>;

    /// Releases the underlying connection. Later calls are no-ops.
    async fn close(&mut self) -> Result<(), sqlx::Error>;

    fn name(&self) -> &str;
}
