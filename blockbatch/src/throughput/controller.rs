//! Sliding-window chunk size controller.

use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::Mutex;

use super::types::{effective_secs, PerformanceSample, PerformanceStats, ThroughputConfig};

#[derive(Debug)]
struct State {
    window: VecDeque<PerformanceSample>,
    chunk_size: u32,
    operations: u64,
    successes: u64,
    total_elements: u64,
}

/// Adapts the chunk size to observed throughput.
///
/// After every recorded sample the window average is compared against the
/// thresholds: above `fast_threshold` the chunk size grows by one step,
/// below `slow_threshold` it shrinks by one step, and in between it holds.
/// The chunk size always stays within `min_chunk_size..=max_chunk_size`.
///
/// # Thread Safety
///
/// Shared via `Arc`; all state sits behind one mutex.
#[derive(Debug)]
pub struct ThroughputController {
    config: ThroughputConfig,
    state: Mutex<State>,
}

impl ThroughputController {
    pub fn new(config: ThroughputConfig) -> Self {
        let chunk_size = config
            .default_chunk_size
            .clamp(config.min_chunk_size, config.max_chunk_size.max(config.min_chunk_size));
        Self {
            state: Mutex::new(State {
                window: VecDeque::with_capacity(config.window_size),
                chunk_size,
                operations: 0,
                successes: 0,
                total_elements: 0,
            }),
            config,
        }
    }

    pub fn config(&self) -> &ThroughputConfig {
        &self.config
    }

    /// Chunk size to use for the next operation.
    pub fn current_chunk_size(&self) -> u32 {
        self.state.lock().chunk_size
    }

    /// Record a completed operation and adjust the chunk size.
    ///
    /// Returns the chunk size after adjustment.
    pub fn record(&self, sample: PerformanceSample) -> u32 {
        let mut state = self.state.lock();

        state.operations += 1;
        if sample.success {
            state.successes += 1;
        }
        state.total_elements += sample.element_count;
        state.window.push_back(sample);
        while state.window.len() > self.config.window_size {
            state.window.pop_front();
        }

        let average = window_average(&state.window);
        let current = state.chunk_size;
        let next = if average > self.config.fast_threshold {
            current
                .saturating_add(self.config.step)
                .min(self.config.max_chunk_size)
        } else if average < self.config.slow_threshold {
            current
                .saturating_sub(self.config.step)
                .max(self.config.min_chunk_size)
        } else {
            current
        };

        if next != current {
            tracing::info!(
                from = current,
                to = next,
                elements_per_second = format!("{:.0}", average),
                "Adjusted chunk size"
            );
            state.chunk_size = next;
        }
        next
    }

    /// The samples currently in the window, oldest first.
    pub fn recent_samples(&self) -> Vec<PerformanceSample> {
        self.state.lock().window.iter().cloned().collect()
    }

    pub fn stats(&self) -> PerformanceStats {
        let state = self.state.lock();
        PerformanceStats {
            operations: state.operations,
            successful_operations: state.successes,
            total_elements: state.total_elements,
            current_chunk_size: state.chunk_size,
            default_chunk_size: self.config.default_chunk_size,
            average_elements_per_second: window_average(&state.window),
            success_rate: if state.operations == 0 {
                1.0
            } else {
                state.successes as f64 / state.operations as f64
            },
        }
    }
}

impl Default for ThroughputController {
    fn default() -> Self {
        Self::new(ThroughputConfig::default())
    }
}

/// Total elements over total time for the window.
fn window_average(window: &VecDeque<PerformanceSample>) -> f64 {
    if window.is_empty() {
        return 0.0;
    }
    let elements: u64 = window.iter().map(|s| s.element_count).sum();
    let duration: Duration = window.iter().map(|s| s.duration).sum();
    elements as f64 / effective_secs(duration)
}
