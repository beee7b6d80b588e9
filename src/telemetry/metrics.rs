use opentelemetry::{
    global,
    metrics::{Counter, Histogram, Meter},
};
use std::sync::LazyLock;

pub static METER: LazyLock<Meter> = LazyLock::new(|| global::meter("report-exporter"));

pub static EXPORT_DATES: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("export.dates")
        .with_description("Number of report dates processed, by outcome")
        .with_unit("{date}")
        .build()
});

pub static EXPORT_ROWS: LazyLock<Histogram<f64>> = LazyLock::new(|| {
    METER
        .f64_histogram("export.rows")
        .with_description("Number of rows written per exported file")
        .with_unit("{row}")
        .build()
});

pub static EXPORT_QUERY_DURATION: LazyLock<Histogram<f64>> = LazyLock::new(|| {
    METER
        .f64_histogram("export.query.duration")
        .with_description("Duration of a single report query in seconds")
        .with_unit("s")
        .with_boundaries(vec![
            0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0,
        ])
        .build()
});

pub static EXPORT_RETRY_COUNT: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("export.retry.count")
        .with_description("Number of report query retries")
        .with_unit("{retry}")
        .build()
});
