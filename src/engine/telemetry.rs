//! Per-stage timing of a resolution

use serde::{Serialize, Serializer};
use std::time::Duration;

/// Wall-clock durations recorded when profiling is requested
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Telemetry {
    #[serde(rename = "fetch_seconds", serialize_with = "seconds")]
    pub fetch: Duration,

    /// Absent when the fetch failed
    #[serde(rename = "parse_seconds", serialize_with = "optional_seconds")]
    pub parse: Option<Duration>,

    /// Strategies evaluated, in order
    pub strategies: Vec<StrategyTiming>,

    #[serde(rename = "total_seconds", serialize_with = "seconds")]
    pub total: Duration,
}

/// Duration of a single strategy evaluation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyTiming {
    pub strategy: &'static str,
    #[serde(serialize_with = "seconds")]
    pub seconds: Duration,
}

impl Telemetry {
    /// Emits the recorded timings at info level
    pub fn log(&self, page_url: &str) {
        for timing in &self.strategies {
            tracing::info!(
                page_url,
                strategy = timing.strategy,
                elapsed_ms = millis(timing.seconds),
                "Strategy timing"
            );
        }

        tracing::info!(
            page_url,
            fetch_ms = millis(self.fetch),
            parse_ms = self.parse.map(millis),
            total_ms = millis(self.total),
            "Resolution timing"
        );
    }
}

fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1_000.0
}

fn round_micros(duration: &Duration) -> f64 {
    (duration.as_secs_f64() * 1_000_000.0).round() / 1_000_000.0
}

fn seconds<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(round_micros(duration))
}

fn optional_seconds<S: Serializer>(
    duration: &Option<Duration>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match duration {
        Some(duration) => serializer.serialize_some(&round_micros(duration)),
        None => serializer.serialize_none(),
    }
}
