//! Region clear types and errors.

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::batch::PlanError;
use crate::config::defaults::*;
use crate::config::ConfigError;
use crate::coord::{Area, CoordError, YRange};
use crate::executor::ErrorKind;

/// Errors that prevent a clear from starting.
#[derive(Debug, Error)]
pub enum ClearError {
    #[error("invalid area: {0}")]
    InvalidArea(#[from] CoordError),

    #[error("could not plan chunks: {0}")]
    Plan(#[from] PlanError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Region clear tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct ClearConfig {
    /// Vertical range emptied in every chunk.
    pub clear_y: YRange,
    /// Vertical range refilled when terrain is preserved.
    pub ground_y: YRange,
    /// Fixed chunk side; `None` follows the throughput controller.
    pub chunk_size: Option<u32>,
    /// Time allowed for one chunk attempt.
    pub chunk_timeout: Duration,
    /// Attempts per chunk, first attempt included.
    pub max_chunk_retries: u32,
    pub chunk_retry_delay: Duration,
    /// Budget for the whole operation.
    pub operation_timeout: Duration,
    pub workers: usize,
    pub clear_block: String,
    pub ground_block: String,
    /// Fraction of chunks that must succeed.
    pub min_success_ratio: f64,
    /// Where completed chunks are recorded for resumption.
    pub checkpoint: Option<PathBuf>,
}

impl Default for ClearConfig {
    fn default() -> Self {
        Self {
            clear_y: YRange::new(DEFAULT_CLEAR_Y.0, DEFAULT_CLEAR_Y.1),
            ground_y: YRange::new(DEFAULT_GROUND_Y.0, DEFAULT_GROUND_Y.1),
            chunk_size: None,
            chunk_timeout: Duration::from_secs(DEFAULT_CHUNK_TIMEOUT_SECS),
            max_chunk_retries: DEFAULT_MAX_CHUNK_RETRIES,
            chunk_retry_delay: Duration::from_millis(DEFAULT_CHUNK_RETRY_DELAY_MS),
            operation_timeout: Duration::from_secs(DEFAULT_OPERATION_TIMEOUT_SECS),
            workers: DEFAULT_WORKERS,
            clear_block: DEFAULT_CLEAR_BLOCK.to_string(),
            ground_block: DEFAULT_GROUND_BLOCK.to_string(),
            min_success_ratio: DEFAULT_MIN_SUCCESS_RATIO,
            checkpoint: None,
        }
    }
}

impl ClearConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field, reason: &str| ConfigError::InvalidValue {
            field,
            reason: reason.to_string(),
        };

        self.clear_y
            .validate()
            .map_err(|e| invalid("clear.clear_y", &e.to_string()))?;
        self.ground_y
            .validate()
            .map_err(|e| invalid("clear.ground_y", &e.to_string()))?;
        if self.chunk_size == Some(0) {
            return Err(invalid("clear.chunk_size", "must be at least 1"));
        }
        if self.chunk_timeout.is_zero() {
            return Err(invalid("clear.chunk_timeout", "must be greater than zero"));
        }
        if self.max_chunk_retries == 0 {
            return Err(invalid(
                "clear.max_chunk_retries",
                "must allow at least one attempt",
            ));
        }
        if self.operation_timeout.is_zero() {
            return Err(invalid("clear.operation_timeout", "must be greater than zero"));
        }
        if self.workers == 0 {
            return Err(invalid("clear.workers", "must be at least 1"));
        }
        if self.clear_block.trim().is_empty() {
            return Err(invalid("clear.clear_block", "must not be empty"));
        }
        if self.ground_block.trim().is_empty() {
            return Err(invalid("clear.ground_block", "must not be empty"));
        }
        if !(0.0..=1.0).contains(&self.min_success_ratio) {
            return Err(invalid(
                "clear.min_success_ratio",
                "must be between 0.0 and 1.0",
            ));
        }
        Ok(())
    }
}

/// Why a chunk did not fully succeed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChunkError {
    /// `ChunkFailed` or `GroundRestoreFailed`.
    pub kind: ErrorKind,
    /// Kind of the underlying command failure, if known.
    pub cause: Option<ErrorKind>,
    pub message: String,
}

impl ChunkError {
    pub fn new(kind: ErrorKind, cause: Option<ErrorKind>, message: impl Into<String>) -> Self {
        Self {
            kind,
            cause,
            message: message.into(),
        }
    }
}

/// Outcome of one chunk. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkResult {
    pub index: usize,
    pub origin_x: i32,
    pub origin_z: i32,
    pub cleared: bool,
    pub ground_restored: bool,
    pub blocks_cleared: u64,
    pub blocks_restored: u64,
    #[serde(rename = "execution_time_ms", with = "duration_millis")]
    pub execution_time: Duration,
    /// Attempts spent on the clear and the ground restore together.
    pub attempts: u32,
    pub error: Option<ChunkError>,
}

impl ChunkResult {
    pub fn origin(&self) -> (i32, i32) {
        (self.origin_x, self.origin_z)
    }
}

/// Aggregate outcome of a region clear.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationResult {
    pub area: Area,
    pub clear_y: YRange,
    pub chunk_size: u32,
    pub preserve_terrain: bool,
    pub total_chunks: usize,
    pub successful_chunks: usize,
    pub failed_chunks: usize,
    /// Never attempted: the budget ran out or the run was cancelled.
    pub skipped_chunks: usize,
    /// Completed by an earlier run, per the checkpoint.
    pub resumed_chunks: usize,
    /// Cleared chunks whose ground layer was not restored.
    pub ground_restore_failures: usize,
    pub total_blocks_cleared: u64,
    pub total_blocks_restored: u64,
    #[serde(rename = "execution_time_ms", with = "duration_millis")]
    pub execution_time: Duration,
    pub timed_out: bool,
    pub cancelled: bool,
    pub min_success_ratio: f64,
    /// Per-chunk results in arrival order.
    pub chunks: Vec<ChunkResult>,
}

impl OperationResult {
    pub fn new(
        area: Area,
        clear_y: YRange,
        chunk_size: u32,
        preserve_terrain: bool,
        total_chunks: usize,
        min_success_ratio: f64,
    ) -> Self {
        Self {
            area,
            clear_y,
            chunk_size,
            preserve_terrain,
            total_chunks,
            successful_chunks: 0,
            failed_chunks: 0,
            skipped_chunks: 0,
            resumed_chunks: 0,
            ground_restore_failures: 0,
            total_blocks_cleared: 0,
            total_blocks_restored: 0,
            execution_time: Duration::ZERO,
            timed_out: false,
            cancelled: false,
            min_success_ratio,
            chunks: Vec::new(),
        }
    }

    /// Fold one chunk result into the totals.
    pub fn record(&mut self, chunk: ChunkResult) {
        if chunk.cleared {
            self.successful_chunks += 1;
            self.total_blocks_cleared += chunk.blocks_cleared;
            if chunk.ground_restored {
                self.total_blocks_restored += chunk.blocks_restored;
            } else if self.preserve_terrain {
                self.ground_restore_failures += 1;
            }
        } else {
            self.failed_chunks += 1;
        }
        self.chunks.push(chunk);
    }

    /// Chunks accounted for so far.
    pub fn completed_chunks(&self) -> usize {
        self.successful_chunks + self.failed_chunks + self.resumed_chunks
    }

    /// Fraction of chunks done, counting resumed ones.
    pub fn success_ratio(&self) -> f64 {
        if self.total_chunks == 0 {
            return 1.0;
        }
        (self.successful_chunks + self.resumed_chunks) as f64 / self.total_chunks as f64
    }

    /// Whether the run met its success policy.
    ///
    /// Requires `success_ratio() >= min_success_ratio` and a run that was
    /// neither timed out nor cancelled. Ground restore failures do not count
    /// against success; they are reported separately.
    pub fn is_success(&self) -> bool {
        !self.timed_out && !self.cancelled && self.success_ratio() >= self.min_success_ratio
    }

    /// Chunks that failed or lost their ground layer.
    pub fn problem_chunks(&self) -> impl Iterator<Item = &ChunkResult> {
        self.chunks.iter().filter(|c| c.error.is_some())
    }
}

pub(crate) mod duration_millis {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }
}
