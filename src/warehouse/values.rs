use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use sqlx::postgres::PgRow;
use sqlx::{Row, TypeInfo, ValueRef};
use uuid::Uuid;

/// A decoded warehouse value, before CSV rendering.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Bool(bool),
    Int(i64),
    Float4(f32),
    Float(f64),
    Numeric(BigDecimal),
    Text(String),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    Uuid(Uuid),
    Json(serde_json::Value),
}

impl Cell {
    pub fn render(&self) -> String {
        match self {
            Cell::Null => String::new(),
            Cell::Bool(v) => v.to_string(),
            Cell::Int(v) => v.to_string(),
            Cell::Float4(v) => v.to_string(),
            Cell::Float(v) => v.to_string(),
            Cell::Numeric(v) => v.to_plain_string(),
            Cell::Text(v) => v.clone(),
            Cell::Date(v) => v.format("%Y-%m-%d").to_string(),
            Cell::Timestamp(v) => v.to_string(),
            Cell::TimestampTz(v) => v.to_rfc3339_opts(SecondsFormat::AutoSi, false),
            Cell::Uuid(v) => v.hyphenated().to_string(),
            Cell::Json(v) => v.to_string(),
        }
    }
}

/// Rust decoder chosen for a Postgres column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    Bool,
    Int2,
    Int4,
    Int8,
    Float4,
    Float8,
    Numeric,
    Text,
    Date,
    Timestamp,
    TimestampTz,
    Uuid,
    Json,
}

/// Maps a Postgres type name to its decoder; `None` for unsupported types.
pub fn cell_kind(type_name: &str) -> Option<CellKind> {
    let kind = match type_name {
        "BOOL" => CellKind::Bool,
        "INT2" => CellKind::Int2,
        "INT4" => CellKind::Int4,
        "INT8" => CellKind::Int8,
        "FLOAT4" => CellKind::Float4,
        "FLOAT8" => CellKind::Float8,
        "NUMERIC" => CellKind::Numeric,
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" | "CITEXT" | "UNKNOWN" => CellKind::Text,
        "DATE" => CellKind::Date,
        "TIMESTAMP" => CellKind::Timestamp,
        "TIMESTAMPTZ" => CellKind::TimestampTz,
        "UUID" => CellKind::Uuid,
        "JSON" | "JSONB" => CellKind::Json,
        _ => return None,
    };
    Some(kind)
}

pub fn decode_cell(row: &PgRow, index: usize) -> Result<Cell, sqlx::Error> {
    let type_name = {
        let raw = row.try_get_raw(index)?;
        if raw.is_null() {
            return Ok(Cell::Null);
        }
        raw.type_info().name().to_string()
    };

    let Some(kind) = cell_kind(&type_name) else {
        return Err(unsupported_type(index, &type_name));
    };

    let cell = match kind {
        CellKind::Bool => Cell::Bool(row.try_get(index)?),
        CellKind::Int2 => Cell::Int(i64::from(row.try_get::<i16, _>(index)?)),
        CellKind::Int4 => Cell::Int(i64::from(row.try_get::<i32, _>(index)?)),
        CellKind::Int8 => Cell::Int(row.try_get(index)?),
        CellKind::Float4 => Cell::Float4(row.try_get(index)?),
        CellKind::Float8 => Cell::Float(row.try_get(index)?),
        CellKind::Numeric => Cell::Numeric(row.try_get(index)?),
        CellKind::Text => Cell::Text(row.try_get(index)?),
        CellKind::Date => Cell::Date(row.try_get(index)?),
        CellKind::Timestamp => Cell::Timestamp(row.try_get(index)?),
        CellKind::TimestampTz => Cell::TimestampTz(row.try_get(index)?),
        CellKind::Uuid => Cell::Uuid(row.try_get(index)?),
        CellKind::Json => Cell::Json(row.try_get(index)?),
    };

    Ok(cell)
}

fn unsupported_type(index: usize, type_name: &str) -> sqlx::Error {
    sqlx::Error::ColumnDecode {
        index: index.to_string(),
        source: format!("unsupported column type {type_name}").into(),
    }
}

pub fn render_row(row: &PgRow) -> Result<Vec<String>, sqlx::Error> {
    (0..row.len())
        .map(|index| decode_cell(row, index).map(|cell| cell.render()))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use chrono::NaiveTime;

    use super::*;

    #[test]
    fn test_null_renders_empty() {
        assert_eq!(Cell::Null.render(), "");
    }

    #[test]
    fn test_scalar_rendering() {
        let cases = vec![
            (Cell::Bool(true), "true"),
            (Cell::Bool(false), "false"),
            (Cell::Int(-42), "-42"),
            (Cell::Float(0.5), "0.5"),
            (Cell::Float4(0.1), "0.1"),
            (Cell::Float4(1234.5), "1234.5"),
            (
                Cell::Numeric(BigDecimal::from_str("1234.5600").unwrap()),
                "1234.5600",
            ),
            (Cell::Text("Acme, Inc.".to_string()), "Acme, Inc."),
        ];

        for (cell, expected) in cases {
            assert_eq!(cell.render(), expected, "{cell:?}");
        }
    }

    #[test]
    fn test_temporal_rendering() {
        let date = NaiveDate::from_ymd_opt(2023, 2, 28).unwrap();
        assert_eq!(Cell::Date(date).render(), "2023-02-28");
        assert_eq!(
            Cell::Timestamp(date.and_time(NaiveTime::MIN)).render(),
            "2023-02-28 00:00:00"
        );
        let instant = date.and_hms_opt(13, 5, 9).unwrap().and_utc();
        assert_eq!(
            Cell::TimestampTz(instant).render(),
            "2023-02-28T13:05:09+00:00"
        );
    }

    #[test]
    fn test_uuid_and_json_rendering() {
        let id = Uuid::from_str("67e55044-10b1-426f-9247-bb680e5fe0c8").unwrap();
        assert_eq!(
            Cell::Uuid(id).render(),
            "67e55044-10b1-426f-9247-bb680e5fe0c8"
        );
        let json = serde_json::json!({"asin_cap": 500});
        assert_eq!(Cell::Json(json).render(), r#"{"asin_cap":500}"#);
    }

    #[test]
    fn test_real_keeps_single_precision_digits() {
        let value = 0.1f32;
        assert_eq!(Cell::Float4(value).render(), "0.1");
        assert_ne!(Cell::Float(f64::from(value)).render(), "0.1");
    }

    #[test]
    fn test_wide_numeric_renders_every_digit() {
        let cases = vec![
            "12345678901234567890.123456789012345678",
            "-0.00000000000000000000000000000000000001",
            "99999999999999999999999999999999999999",
            "0.0000001",
        ];

        for text in cases {
            let value = BigDecimal::from_str(text).unwrap();
            assert_eq!(Cell::Numeric(value).render(), text);
        }
    }

    #[test]
    fn test_supported_type_names() {
        let cases = vec![
            ("BOOL", CellKind::Bool),
            ("INT2", CellKind::Int2),
            ("INT4", CellKind::Int4),
            ("INT8", CellKind::Int8),
            ("FLOAT4", CellKind::Float4),
            ("FLOAT8", CellKind::Float8),
            ("NUMERIC", CellKind::Numeric),
            ("TEXT", CellKind::Text),
            ("VARCHAR", CellKind::Text),
            ("BPCHAR", CellKind::Text),
            ("NAME", CellKind::Text),
            ("CITEXT", CellKind::Text),
            ("UNKNOWN", CellKind::Text),
            ("DATE", CellKind::Date),
            ("TIMESTAMP", CellKind::Timestamp),
            ("TIMESTAMPTZ", CellKind::TimestampTz),
            ("UUID", CellKind::Uuid),
            ("JSON", CellKind::Json),
            ("JSONB", CellKind::Json),
        ];

        for (name, kind) in cases {
            assert_eq!(cell_kind(name), Some(kind), "{name}");
        }
    }

    #[test]
    fn test_unsupported_type_names() {
        for name in ["INTERVAL", "BYTEA", "INT4[]", "TIME", "text"] {
            assert_eq!(cell_kind(name), None, "{name}");
        }
    }

    #[test]
    fn test_unsupported_type_becomes_query_error() {
        let date = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let source = unsupported_type(2, "INTERVAL");
        assert!(matches!(&source, sqlx::Error::ColumnDecode { index, .. } if index == "2"));
        assert!(source.to_string().contains("unsupported column type INTERVAL"));

        let err = crate::error::ExportError::Query { date, source };
        assert!(!err.is_fatal());
    }
}
