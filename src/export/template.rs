use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::{ExportError, ExportResult};

use super::schedule::ScheduledDate;

/// Named parameters a report template may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateParam {
    /// The iteration's bind date.
    Date,
    /// First day of the period being exported.
    PeriodStart,
    /// Last day of the period, the date used in the file name.
    PeriodEnd,
}

impl DateParam {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "date" => Some(DateParam::Date),
            "period_start" => Some(DateParam::PeriodStart),
            "period_end" => Some(DateParam::PeriodEnd),
            _ => None,
        }
    }

    fn resolve(self, scheduled: &ScheduledDate) -> NaiveDate {
        match self {
            DateParam::Date => scheduled.bind,
            DateParam::PeriodStart => scheduled.period_start,
            DateParam::PeriodEnd => scheduled.label,
        }
    }
}

/// A SQL template with `:name` placeholders rewritten to `$n`.
#[derive(Debug, Clone)]
pub struct QueryTemplate {
    sql: String,
    params: Vec<DateParam>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoundQuery {
    pub sql: String,
    pub params: Vec<NaiveDateTime>,
}

impl QueryTemplate {
    pub fn parse(template: &str) -> ExportResult<Self> {
        let mut sql = String::with_capacity(template.len());
        let mut params: Vec<DateParam> = Vec::new();
        let mut chars = template.char_indices().peekable();

        while let Some((start, c)) = chars.next() {
            match c {
                '\'' | '"' => {
                    sql.push(c);
                    let mut closed = false;
                    for (_, inner) in chars.by_ref() {
                        sql.push(inner);
                        if inner == c {
                            closed = true;
                            break;
                        }
                    }
                    if !closed {
                        return Err(ExportError::Template(format!(
                            "unterminated {c} quote at byte {start}"
                        )));
                    }
                }
                '-' if matches!(chars.peek(), Some((_, '-'))) => {
                    sql.push(c);
                    for (_, inner) in chars.by_ref() {
                        sql.push(inner);
                        if inner == '\n' {
                            break;
                        }
                    }
                }
                ':' if matches!(chars.peek(), Some((_, ':'))) => {
                    chars.next();
                    sql.push_str("::");
                }
                ':' if matches!(chars.peek(), Some((_, n)) if n.is_ascii_alphabetic() || *n == '_') =>
                {
                    let mut end = template.len();
                    while let Some(&(i, n)) = chars.peek() {
                        if n.is_ascii_alphanumeric() || n == '_' {
                            chars.next();
                        } else {
                            end = i;
                            break;
                        }
                    }
                    let name = &template[start + 1..end];
                    let param = DateParam::from_name(name).ok_or_else(|| {
                        ExportError::Template(format!("unknown parameter :{name}"))
                    })?;
                    let position = match params.iter().position(|p| *p == param) {
                        Some(index) => index + 1,
                        None => {
                            params.push(param);
                            params.len()
                        }
                    };
                    sql.push('$');
                    sql.push_str(&position.to_string());
                }
                _ => sql.push(c),
            }
        }

        if params.is_empty() {
            return Err(ExportError::Template(
                "query has no date parameter; every date would export the same rows".to_string(),
            ));
        }

        Ok(Self { sql, params })
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[DateParam] {
        &self.params
    }

    /// Binds every parameter as a midnight `timestamp`.
    pub fn bind(&self, scheduled: &ScheduledDate) -> BoundQuery {
        BoundQuery {
            sql: self.sql.clone(),
            params: self
                .params
                .iter()
                .map(|param| param.resolve(scheduled).and_time(NaiveTime::MIN))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::schedule::Step;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_repeated_name_shares_one_position() {
        let template =
            QueryTemplate::parse("SELECT * FROM t WHERE d >= :date AND d <= :date").unwrap();
        assert_eq!(template.sql(), "SELECT * FROM t WHERE d >= $1 AND d <= $1");
        assert_eq!(template.params(), &[DateParam::Date]);
    }

    #[test]
    fn test_distinct_names_get_sequential_positions() {
        let template = QueryTemplate::parse(
            "WHERE d BETWEEN :period_start AND :period_end OR x = :period_start",
        )
        .unwrap();
        assert_eq!(template.sql(), "WHERE d BETWEEN $1 AND $2 OR x = $1");
        assert_eq!(
            template.params(),
            &[DateParam::PeriodStart, DateParam::PeriodEnd]
        );
    }

    #[test]
    fn test_casts_are_not_placeholders() {
        let template = QueryTemplate::parse("select :date::TIMESTAMP as day, x::int").unwrap();
        assert_eq!(template.sql(), "select $1::TIMESTAMP as day, x::int");
    }

    #[test]
    fn test_quoted_text_and_comments_are_untouched() {
        let template = QueryTemplate::parse(
            "SELECT ':date', \"col:date\" -- uses :nothing\nFROM t WHERE a = :date",
        )
        .unwrap();
        assert_eq!(
            template.sql(),
            "SELECT ':date', \"col:date\" -- uses :nothing\nFROM t WHERE a = $1"
        );
        assert_eq!(template.params().len(), 1);
    }

    #[test]
    fn test_unknown_parameter_is_rejected() {
        let err = QueryTemplate::parse("SELECT :day").unwrap_err();
        assert!(matches!(err, ExportError::Template(ref msg) if msg.contains(":day")));
    }

    #[test]
    fn test_unterminated_quote_is_rejected() {
        let err = QueryTemplate::parse("SELECT 'open").unwrap_err();
        assert!(matches!(err, ExportError::Template(_)));
    }

    #[test]
    fn test_template_without_parameters_is_rejected() {
        for query in ["SELECT 1", "SELECT ':date'", "SELECT 1 -- :date", "SELECT x::date"] {
            let err = QueryTemplate::parse(query).unwrap_err();
            assert!(matches!(err, ExportError::Template(_)), "{query}");
        }
    }

    #[test]
    fn test_bind_monthly_resolves_each_parameter() {
        let template = QueryTemplate::parse(":date :period_start :period_end").unwrap();
        let bound = template.bind(&Step::MonthEnd.schedule(ymd(2024, 2, 10)));

        assert_eq!(bound.sql, "$1 $2 $3");
        assert_eq!(
            bound.params,
            vec![
                ymd(2024, 2, 10).and_time(NaiveTime::MIN),
                ymd(2024, 2, 1).and_time(NaiveTime::MIN),
                ymd(2024, 2, 29).and_time(NaiveTime::MIN),
            ]
        );
    }
}
