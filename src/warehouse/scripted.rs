//! In-memory warehouse used by the exporter tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::NaiveDate;

use crate::export::template::BoundQuery;

use super::{ResultSet, Warehouse};

pub struct ScriptedWarehouse {
    columns: Vec<String>,
    rows_for: fn(NaiveDate) -> usize,
    failures: HashMap<NaiveDate, u32>,
    drops_on: Option<NaiveDate>,
    closed: Arc<AtomicBool>,
    pub calls: Vec<BoundQuery>,
}

impl ScriptedWarehouse {
    pub fn new(columns: &[&str]) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows_for: |_| 2,
            failures: HashMap::new(),
            drops_on: None,
            closed: Arc::new(AtomicBool::new(false)),
            calls: Vec::new(),
        }
    }

    pub fn rows_for(mut self, rows_for: fn(NaiveDate) -> usize) -> Self {
        self.rows_for = rows_for;
        self
    }

    /// The query bound to `date` fails `times` times before succeeding.
    pub fn failing(mut self, date: NaiveDate, times: u32) -> Self {
        self.failures.insert(date, times);
        self
    }

    pub fn dropping_connection_on(mut self, date: NaiveDate) -> Self {
        self.drops_on = Some(date);
        self
    }

    pub fn closed_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.closed)
    }

    pub fn bound_dates(&self) -> Vec<NaiveDate> {
        self.calls
            .iter()
            .filter_map(|call| call.params.first().map(|p| p.date()))
            .collect()
    }
}

#[async_trait::async_trait]
impl Warehouse for ScriptedWarehouse {
    async fn fetch_all(&mut self, query: &BoundQuery) -> Result<ResultSet, sqlx::Error> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(sqlx::Error::PoolClosed);
        }
        self.calls.push(query.clone());

        let date = query
            .params
            .first()
            .map(|p| p.date())
            .ok_or_else(|| sqlx::Error::Protocol("query has no date parameter".into()))?;

        if self.drops_on == Some(date) {
            return Err(sqlx::Error::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "connection reset by peer",
            )));
        }

        if let Some(remaining) = self.failures.get_mut(&date) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(sqlx::Error::Protocol(format!(
                    "relation \"api_app_calendar\" has no partition for {date}"
                )));
            }
        }

        let rows = (0..(self.rows_for)(date))
            .map(|i| {
                let mut row = vec![date.to_string(), i.to_string()];
                row.resize(self.columns.len(), String::new());
                row.truncate(self.columns.len());
                row
            })
            .collect();

        Ok(ResultSet {
            columns: self.columns.clone(),
            rows,
        })
    }

    async fn close(&mut self) -> Result<(), sqlx::Error> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
