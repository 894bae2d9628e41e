//! Region fills, split to fit the server's element limit.

use futures::stream::{self, StreamExt};
use futures::FutureExt;
use tokio::time::Instant;
use tracing::{debug, info};

use super::aggregate;
use super::command::CommandExecutor;
use super::result::CommandResult;
use crate::batch::{plan_fill, BatchProfile, DispatchMode, OperationKind};
use crate::coord::Bounds;
use crate::throughput::PerformanceSample;

/// Optional behaviour for [`CommandExecutor::execute_fill`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FillOptions {
    /// Only replace blocks matching this filter.
    pub replace: Option<String>,
    /// Probe each sub-region first and skip it when it already holds the
    /// target block. Ignored when `replace` is set.
    pub smart_fill: bool,
}

impl FillOptions {
    pub fn replace(filter: impl Into<String>) -> Self {
        Self {
            replace: Some(filter.into()),
            smart_fill: false,
        }
    }

    pub fn smart() -> Self {
        Self {
            replace: None,
            smart_fill: true,
        }
    }
}

/// `fill <min> <max> <block> [replace <filter>]`
pub fn fill_command(bounds: &Bounds, block: &str, replace: Option<&str>) -> String {
    match replace {
        Some(filter) => format!("fill {bounds} {block} replace {filter}"),
        None => format!("fill {bounds} {block}"),
    }
}

/// One chained block test over the top layer's corners and centre.
pub fn probe_command(bounds: &Bounds, block: &str) -> String {
    let mut command = String::from("execute");
    for pos in bounds.top_layer_samples() {
        command.push_str(&format!(" if block {pos} {block}"));
    }
    command
}

impl CommandExecutor {
    /// Fill a region with `block`.
    ///
    /// Regions above `max_elements_per_command` are split with the batch
    /// planner at the controller's current chunk size and sent according to
    /// the dispatch policy. The returned result aggregates the sub-commands:
    /// it succeeds only if all of them did, and `elements_affected` counts
    /// every block the server reported filling.
    pub async fn execute_fill(
        &self,
        bounds: &Bounds,
        block: &str,
        options: &FillOptions,
    ) -> CommandResult {
        let block = block.trim();
        let replace = options
            .replace
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty());
        let label = fill_command(bounds, block, replace);

        if let Err(e) = bounds.validate() {
            return CommandResult::rejected(label, e.to_string());
        }
        if block.is_empty() || block.contains(char::is_whitespace) {
            return CommandResult::rejected(label, "block id must be a single non-empty word");
        }
        if block.contains('\0') || replace.is_some_and(|f| f.contains('\0')) {
            return CommandResult::rejected(label, "block id or filter contains a NUL byte");
        }
        let smart = options.smart_fill && replace.is_none();

        let started = Instant::now();
        let limit = self.config.max_elements_per_command;
        let result = if bounds.volume() <= limit {
            self.fill_piece(bounds, block, replace, smart).await
        } else {
            let chunk_size = self.controller.current_chunk_size();
            let pieces = match plan_fill(bounds, chunk_size, limit) {
                Ok(pieces) => pieces,
                Err(e) => return CommandResult::rejected(label, e.to_string()),
            };
            let mode = self.dispatch.decide(&BatchProfile {
                operation: OperationKind::Fill,
                sub_commands: pieces.len(),
                dependent: false,
            });
            info!(
                region = %bounds,
                volume = bounds.volume(),
                sub_commands = pieces.len(),
                chunk_size,
                mode = ?mode,
                "Splitting fill"
            );

            let results: Vec<CommandResult> = match mode {
                DispatchMode::Sequential => {
                    let mut results = Vec::with_capacity(pieces.len());
                    for piece in &pieces {
                        results.push(self.fill_piece(piece, block, replace, smart).await);
                    }
                    results
                }
                DispatchMode::Parallel { max_in_flight } => {
                    stream::iter(pieces.iter().copied())
                        .map(|piece| {
                            async move { self.fill_piece(&piece, block, replace, smart).await }
                                .boxed()
                        })
                        .buffered(max_in_flight)
                        .collect()
                        .await
                }
            };
            aggregate::merge(label, results)
        };

        self.controller.record(PerformanceSample::new(
            "fill",
            result.elements_affected,
            started.elapsed(),
            result.success,
        ));
        result
    }

    async fn fill_piece(
        &self,
        bounds: &Bounds,
        block: &str,
        replace: Option<&str>,
        smart: bool,
    ) -> CommandResult {
        let command = fill_command(bounds, block, replace);
        if smart {
            let probe = probe_command(bounds, block);
            let answer = self.run(&probe).await;
            if answer.success && self.classifier.probe_matched(&answer.response) {
                debug!(region = %bounds, "Region already filled, skipping");
                return CommandResult::skipped(command, answer.response);
            }
        }
        self.run(&command).await
    }
}
