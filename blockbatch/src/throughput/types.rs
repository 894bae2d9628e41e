//! Types for the adaptive throughput controller.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::defaults::*;
use crate::config::ConfigError;

/// Tuning parameters for chunk size adaptation.
#[derive(Debug, Clone, PartialEq)]
pub struct ThroughputConfig {
    pub default_chunk_size: u32,
    pub min_chunk_size: u32,
    pub max_chunk_size: u32,
    /// Amount the chunk size moves per adjustment.
    pub step: u32,
    /// Number of recent samples averaged.
    pub window_size: usize,
    /// Elements/second above which the chunk size grows.
    pub fast_threshold: f64,
    /// Elements/second below which the chunk size shrinks.
    pub slow_threshold: f64,
}

impl Default for ThroughputConfig {
    fn default() -> Self {
        Self {
            default_chunk_size: DEFAULT_CHUNK_SIZE,
            min_chunk_size: DEFAULT_MIN_CHUNK_SIZE,
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            step: DEFAULT_CHUNK_SIZE_STEP,
            window_size: DEFAULT_THROUGHPUT_WINDOW,
            fast_threshold: DEFAULT_FAST_THRESHOLD,
            slow_threshold: DEFAULT_SLOW_THRESHOLD,
        }
    }
}

impl ThroughputConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_chunk_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "throughput.min_chunk_size",
                reason: "must be at least 1".to_string(),
            });
        }
        if !(self.min_chunk_size..=self.max_chunk_size).contains(&self.default_chunk_size) {
            return Err(ConfigError::InvalidValue {
                field: "throughput.default_chunk_size",
                reason: format!(
                    "{} is outside min_chunk_size..=max_chunk_size ({}..={})",
                    self.default_chunk_size, self.min_chunk_size, self.max_chunk_size
                ),
            });
        }
        if self.step == 0 {
            return Err(ConfigError::InvalidValue {
                field: "throughput.chunk_size_step",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.window_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "throughput.window_size",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.slow_threshold > self.fast_threshold {
            return Err(ConfigError::InvalidValue {
                field: "throughput.slow_threshold",
                reason: format!(
                    "{} exceeds fast_threshold {}",
                    self.slow_threshold, self.fast_threshold
                ),
            });
        }
        Ok(())
    }
}

/// Timing of one completed operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceSample {
    pub label: String,
    pub element_count: u64,
    #[serde(with = "duration_millis")]
    pub duration: Duration,
    pub success: bool,
    pub timestamp: DateTime<Utc>,
}

impl PerformanceSample {
    pub fn new(label: impl Into<String>, element_count: u64, duration: Duration, success: bool) -> Self {
        Self {
            label: label.into(),
            element_count,
            duration,
            success,
            timestamp: Utc::now(),
        }
    }

    /// Throughput of this sample, in elements per second.
    pub fn elements_per_second(&self) -> f64 {
        self.element_count as f64 / effective_secs(self.duration)
    }
}

/// Sub-millisecond durations are treated as one millisecond.
pub(super) fn effective_secs(duration: Duration) -> f64 {
    duration.max(Duration::from_millis(1)).as_secs_f64()
}

/// Snapshot of controller state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceStats {
    /// Operations recorded since creation.
    pub operations: u64,
    pub successful_operations: u64,
    pub total_elements: u64,
    pub current_chunk_size: u32,
    pub default_chunk_size: u32,
    /// Average over the current window.
    pub average_elements_per_second: f64,
    /// Fraction of operations that succeeded (1.0 before any are recorded).
    pub success_rate: f64,
}

impl fmt::Display for PerformanceStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Operations:      {}", self.operations)?;
        writeln!(f, "Success rate:    {:.1}%", self.success_rate * 100.0)?;
        writeln!(f, "Elements:        {}", self.total_elements)?;
        writeln!(
            f,
            "Throughput:      {:.0} elements/s",
            self.average_elements_per_second
        )?;
        write!(
            f,
            "Chunk size:      {} (default {})",
            self.current_chunk_size, self.default_chunk_size
        )
    }
}

mod duration_millis {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }
}
