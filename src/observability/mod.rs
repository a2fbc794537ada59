//! Metrics emission.
//!
//! The sink is fire-and-forget: recording never blocks the pipeline and a
//! misbehaving sink must not affect parse results, so implementations are
//! expected to swallow their own failures.

use std::fmt::Write as _;
use std::time::Duration;

pub trait MetricsSink: Send + Sync {
    fn record_event(&self, name: &str, integers: &[(&str, i64)], strings: &[(&str, &str)]);

    fn record_performance(
        &self,
        name: &str,
        elapsed: Duration,
        integers: &[(&str, i64)],
        strings: &[(&str, &str)],
    );
}

/// Default sink: events go to the debug log channel.
#[derive(Debug, Default)]
pub struct LogSink;

impl MetricsSink for LogSink {
    fn record_event(&self, name: &str, integers: &[(&str, i64)], strings: &[(&str, &str)]) {
        log::debug!("event {name}{}", format_fields(integers, strings));
    }

    fn record_performance(
        &self,
        name: &str,
        elapsed: Duration,
        integers: &[(&str, i64)],
        strings: &[(&str, &str)],
    ) {
        log::debug!(
            "perf {name} took {:.3}s{}",
            elapsed.as_secs_f64(),
            format_fields(integers, strings)
        );
    }
}

/// Sink that drops everything.
#[derive(Debug, Default)]
pub struct NullSink;

impl MetricsSink for NullSink {
    fn record_event(&self, _name: &str, _integers: &[(&str, i64)], _strings: &[(&str, &str)]) {}

    fn record_performance(
        &self,
        _name: &str,
        _elapsed: Duration,
        _integers: &[(&str, i64)],
        _strings: &[(&str, &str)],
    ) {
    }
}

fn format_fields(integers: &[(&str, i64)], strings: &[(&str, &str)]) -> String {
    let mut formatted = String::new();
    for (key, value) in integers {
        let _ = write!(formatted, " {key}={value}");
    }
    for (key, value) in strings {
        let _ = write!(formatted, " {key}={value:?}");
    }
    formatted
}
