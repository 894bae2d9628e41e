//! Region clear orchestration.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::checkpoint::ClearCheckpoint;
use super::types::{ChunkError, ChunkResult, ClearConfig, ClearError, OperationResult};
use crate::batch::{plan_chunks, ChunkPlan};
use crate::config::ConfigError;
use crate::coord::{Area, Bounds};
use crate::executor::{
    fill_command, CommandError, CommandExecutor, CommandResult, ErrorKind, FillOptions,
};

/// Called with every chunk result as it arrives.
pub type ProgressCallback = Arc<dyn Fn(&ChunkResult) + Send + Sync>;

/// Clears large regions chunk by chunk.
///
/// The area is tiled into full-height columns. A pool of `workers` tasks
/// pulls columns from a shared queue, fills each with the clear block
/// (retrying up to `max_chunk_retries` attempts under a per-attempt timeout)
/// and, when terrain is preserved, refills the ground range right after.
/// Failed chunks never stop the run. Once the operation budget is spent or
/// the run is cancelled, no new attempt starts and the remaining chunks are
/// reported as skipped. Nothing is rolled back.
///
/// # Example
///
/// ```ignore
/// let clearer = RegionClearer::new(executor, ClearConfig::default())?;
/// let result = clearer.clear_region(&Area::new(0, 0, 127, 127), true).await?;
/// println!("{}", format_report(&result, true));
/// ```
pub struct RegionClearer {
    executor: Arc<CommandExecutor>,
    config: Arc<ClearConfig>,
}

impl std::fmt::Debug for RegionClearer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegionClearer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RegionClearer {
    pub fn new(executor: Arc<CommandExecutor>, config: ClearConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            executor,
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &ClearConfig {
        &self.config
    }

    /// Clear `area` over the configured Y range.
    ///
    /// Returns `Err` only when the run cannot start (invalid area or plan).
    /// Every per-chunk problem is reported inside the [`OperationResult`].
    pub async fn clear_region(
        &self,
        area: &Area,
        preserve_terrain: bool,
    ) -> Result<OperationResult, ClearError> {
        self.clear_region_with(area, preserve_terrain, CancellationToken::new(), None)
            .await
    }

    /// [`RegionClearer::clear_region`] with cancellation and progress reporting.
    pub async fn clear_region_with(
        &self,
        area: &Area,
        preserve_terrain: bool,
        cancel: CancellationToken,
        progress: Option<ProgressCallback>,
    ) -> Result<OperationResult, ClearError> {
        let started = Instant::now();

        // PLANNING
        area.validate()?;
        let chunk_size = self
            .config
            .chunk_size
            .unwrap_or_else(|| self.executor.controller().current_chunk_size());
        let plans = plan_chunks(area, self.config.clear_y, chunk_size)?;

        let mut result = OperationResult::new(
            *area,
            self.config.clear_y,
            chunk_size,
            preserve_terrain,
            plans.len(),
            self.config.min_success_ratio,
        );

        let mut checkpoint = self.open_checkpoint(area, chunk_size, preserve_terrain);
        let pending: VecDeque<ChunkPlan> = plans
            .into_iter()
            .filter(|plan| match &checkpoint {
                Some(cp) if cp.is_completed((plan.origin_x, plan.origin_z)) => {
                    result.resumed_chunks += 1;
                    false
                }
                _ => true,
            })
            .collect();

        info!(
            area = %area,
            clear_y = %self.config.clear_y,
            chunk_size,
            chunks = result.total_chunks,
            resumed = result.resumed_chunks,
            workers = self.config.workers,
            preserve_terrain,
            "Starting region clear"
        );

        // EXECUTING
        let budget = Arc::new(Budget::new(
            started + self.config.operation_timeout,
            cancel.clone(),
        ));
        let queue = Arc::new(Mutex::new(pending));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let worker_count = self.config.workers.min(queue.lock().len()).max(1);
        let mut handles = Vec::with_capacity(worker_count);
        for id in 0..worker_count {
            let worker = ChunkWorker {
                id,
                executor: Arc::clone(&self.executor),
                config: Arc::clone(&self.config),
                budget: Arc::clone(&budget),
                preserve_terrain,
            };
            let queue = Arc::clone(&queue);
            let tx = tx.clone();
            handles.push(tokio::spawn(worker.run(queue, tx)));
        }
        drop(tx);

        while let Some(chunk) = rx.recv().await {
            if let Some(cp) = checkpoint.as_mut() {
                if chunk.cleared && (chunk.ground_restored || !preserve_terrain) {
                    cp.mark_completed(chunk.origin());
                    self.save_checkpoint(cp);
                }
            }
            if let Some(callback) = &progress {
                callback(&chunk);
            }
            result.record(chunk);
        }
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "Clear worker ended abnormally");
            }
        }

        // REPORTING
        result.skipped_chunks = result.total_chunks.saturating_sub(result.completed_chunks());
        result.cancelled = cancel.is_cancelled();
        result.timed_out = !result.cancelled && budget.exhausted();
        result.execution_time = started.elapsed();

        if result.is_success() && result.skipped_chunks == 0 {
            if let Some(path) = &self.config.checkpoint {
                if let Err(e) = ClearCheckpoint::remove(path) {
                    warn!(path = %path.display(), error = %e, "Could not remove checkpoint");
                }
            }
        }

        info!(
            successful = result.successful_chunks,
            failed = result.failed_chunks,
            skipped = result.skipped_chunks,
            resumed = result.resumed_chunks,
            blocks_cleared = result.total_blocks_cleared,
            timed_out = result.timed_out,
            cancelled = result.cancelled,
            elapsed_ms = result.execution_time.as_millis() as u64,
            "Region clear finished"
        );
        Ok(result)
    }

    fn open_checkpoint(
        &self,
        area: &Area,
        chunk_size: u32,
        preserve_terrain: bool,
    ) -> Option<ClearCheckpoint> {
        let path = self.config.checkpoint.as_ref()?;
        let fresh = ClearCheckpoint::new(
            *area,
            self.config.clear_y,
            self.config.ground_y,
            chunk_size,
            preserve_terrain,
        );
        match ClearCheckpoint::load(path) {
            Ok(Some(existing)) if existing.same_plan(&fresh) => {
                info!(
                    path = %path.display(),
                    completed = existing.completed.len(),
                    "Resuming from checkpoint"
                );
                Some(existing)
            }
            Ok(Some(_)) => {
                warn!(path = %path.display(), "Checkpoint is for a different plan; ignoring it");
                Some(fresh)
            }
            Ok(None) => Some(fresh),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Unreadable checkpoint; ignoring it");
                Some(fresh)
            }
        }
    }

    fn save_checkpoint(&self, checkpoint: &ClearCheckpoint) {
        if let Some(path) = &self.config.checkpoint {
            if let Err(e) = checkpoint.save(path) {
                warn!(path = %path.display(), error = %e, "Could not write checkpoint");
            }
        }
    }
}

/// Global deadline plus caller cancellation.
struct Budget {
    deadline: Instant,
    cancel: CancellationToken,
    exhausted: AtomicBool,
}

impl Budget {
    fn new(deadline: Instant, cancel: CancellationToken) -> Self {
        Self {
            deadline,
            cancel,
            exhausted: AtomicBool::new(false),
        }
    }

    /// Time left, or `None` once the budget is spent or cancelled.
    fn remaining(&self) -> Option<Duration> {
        if self.cancel.is_cancelled() {
            return None;
        }
        let left = self.deadline.saturating_duration_since(Instant::now());
        if left.is_zero() {
            self.exhausted.store(true, Ordering::SeqCst);
            return None;
        }
        Some(left)
    }

    fn exhausted(&self) -> bool {
        self.exhausted.load(Ordering::SeqCst) || Instant::now() >= self.deadline
    }
}

/// Result of running one fill under the chunk retry policy.
enum Attempts {
    /// The budget ran out before the first attempt.
    NotStarted,
    Finished { result: CommandResult, attempts: u32 },
}

struct ChunkWorker {
    id: usize,
    executor: Arc<CommandExecutor>,
    config: Arc<ClearConfig>,
    budget: Arc<Budget>,
    preserve_terrain: bool,
}

impl ChunkWorker {
    async fn run(
        self,
        queue: Arc<Mutex<VecDeque<ChunkPlan>>>,
        tx: mpsc::UnboundedSender<ChunkResult>,
    ) {
        loop {
            if self.budget.remaining().is_none() {
                break;
            }
            let Some(plan) = queue.lock().pop_front() else {
                break;
            };
            match self.process(&plan).await {
                Some(chunk) => {
                    if tx.send(chunk).is_err() {
                        break;
                    }
                }
                None => break,
            }
        }
        debug!(worker = self.id, "Clear worker finished");
    }

    /// Clear one chunk and optionally restore its ground layer.
    ///
    /// Returns `None` when the budget ran out before the first attempt.
    async fn process(&self, plan: &ChunkPlan) -> Option<ChunkResult> {
        let started = Instant::now();
        let clear = self.attempt_fill(&plan.bounds, &self.config.clear_block).await;
        let Attempts::Finished {
            result: cleared,
            attempts,
        } = clear
        else {
            return None;
        };

        let mut chunk = ChunkResult {
            index: plan.index,
            origin_x: plan.origin_x,
            origin_z: plan.origin_z,
            cleared: cleared.success,
            ground_restored: false,
            blocks_cleared: cleared.elements_affected,
            blocks_restored: 0,
            execution_time: Duration::ZERO,
            attempts,
            error: None,
        };

        if !cleared.success {
            let cause = cleared.error_kind();
            let message = describe(&cleared);
            warn!(
                worker = self.id,
                chunk = plan.index,
                origin_x = plan.origin_x,
                origin_z = plan.origin_z,
                attempts,
                error = %message,
                "Chunk clear failed"
            );
            chunk.error = Some(ChunkError::new(ErrorKind::ChunkFailed, cause, message));
        } else if self.preserve_terrain {
            let ground_bounds = plan.bounds.with_y(self.config.ground_y);
            match self
                .attempt_fill(&ground_bounds, &self.config.ground_block)
                .await
            {
                Attempts::Finished { result, attempts } => {
                    chunk.attempts += attempts;
                    if result.success {
                        chunk.ground_restored = true;
                        chunk.blocks_restored = result.elements_affected;
                    } else {
                        let message = describe(&result);
                        warn!(
                            worker = self.id,
                            chunk = plan.index,
                            error = %message,
                            "Ground restore failed"
                        );
                        chunk.error = Some(ChunkError::new(
                            ErrorKind::GroundRestoreFailed,
                            result.error_kind(),
                            message,
                        ));
                    }
                }
                Attempts::NotStarted => {
                    chunk.error = Some(ChunkError::new(
                        ErrorKind::GroundRestoreFailed,
                        None,
                        "operation budget exhausted before ground restore",
                    ));
                }
            }
        }

        chunk.execution_time = started.elapsed();
        debug!(
            worker = self.id,
            chunk = plan.index,
            cleared = chunk.cleared,
            ground_restored = chunk.ground_restored,
            elapsed_ms = chunk.execution_time.as_millis() as u64,
            "Chunk finished"
        );
        Some(chunk)
    }

    /// Run one fill under the chunk retry policy.
    ///
    /// Each attempt is bounded by `min(chunk_timeout, remaining budget)`.
    /// Stops early on a non-retryable failure, on cancellation, or when the
    /// budget is spent.
    async fn attempt_fill(&self, bounds: &Bounds, block: &str) -> Attempts {
        let options = FillOptions::default();
        let mut attempts = 0;
        let mut last: Option<CommandResult> = None;

        while attempts < self.config.max_chunk_retries {
            if attempts > 0 {
                let Some(left) = self.budget.remaining() else {
                    break;
                };
                tokio::select! {
                    _ = self.budget.cancel.cancelled() => break,
                    _ = tokio::time::sleep(self.config.chunk_retry_delay.min(left)) => {}
                }
            }
            let Some(left) = self.budget.remaining() else {
                break;
            };
            let limit = self.config.chunk_timeout.min(left);
            attempts += 1;

            let outcome = tokio::select! {
                _ = self.budget.cancel.cancelled() => None,
                r = tokio::time::timeout(limit, self.executor.execute_fill(bounds, block, &options)) => Some(r),
            };

            match outcome {
                None => {
                    last = Some(CommandResult::failed(
                        fill_command(bounds, block, None),
                        CommandError::new(ErrorKind::CommandTimeout, "cancelled mid-attempt"),
                        String::new(),
                        0,
                    ));
                    break;
                }
                Some(Ok(result)) if result.success => {
                    return Attempts::Finished { result, attempts };
                }
                Some(Ok(result)) => {
                    let retryable = result.error_kind().map_or(true, |k| k.is_retryable());
                    last = Some(result);
                    if !retryable {
                        break;
                    }
                }
                Some(Err(_)) => {
                    last = Some(CommandResult::failed(
                        fill_command(bounds, block, None),
                        CommandError::new(
                            ErrorKind::CommandTimeout,
                            format!("attempt exceeded {}ms", limit.as_millis()),
                        ),
                        String::new(),
                        0,
                    ));
                }
            }
            if attempts < self.config.max_chunk_retries {
                debug!(
                    worker = self.id,
                    region = %bounds,
                    attempt = attempts,
                    "Retrying chunk fill"
                );
            }
        }

        match last {
            Some(result) => Attempts::Finished { result, attempts },
            None => Attempts::NotStarted,
        }
    }
}

fn describe(result: &CommandResult) -> String {
    result
        .error
        .as_ref()
        .map(|e| e.message.clone())
        .unwrap_or_else(|| "unknown failure".to_string())
}
