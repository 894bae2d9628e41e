//! Clear command - empty a region chunk by chunk.

use std::path::PathBuf;
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use blockbatch::clear::{format_report, ChunkResult, ProgressCallback, RegionClearer};
use blockbatch::config::ConfigFile;
use blockbatch::coord::Area;

use super::exec::ConnectArgs;
use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the clear command. `None` falls back to the config file.
pub struct ClearArgs {
    pub x_min: Option<i32>,
    pub z_min: Option<i32>,
    pub x_max: Option<i32>,
    pub z_max: Option<i32>,
    pub chunk_size: Option<u32>,
    pub workers: Option<usize>,
    pub checkpoint: Option<PathBuf>,
    pub preserve_terrain: bool,
}

impl ClearArgs {
    fn area(&self, config: &ConfigFile) -> Area {
        let defaults = config.clear_area();
        Area::new(
            self.x_min.unwrap_or(defaults.x_min),
            self.z_min.unwrap_or(defaults.z_min),
            self.x_max.unwrap_or(defaults.x_max),
            self.z_max.unwrap_or(defaults.z_max),
        )
    }

    fn apply(&self, config: &mut ConfigFile) {
        if let Some(size) = self.chunk_size {
            config.clear.chunk_size = Some(size);
        }
        if let Some(workers) = self.workers {
            config.clear.workers = workers;
        }
        if let Some(path) = &self.checkpoint {
            config.clear.checkpoint = Some(path.clone());
        }
    }
}

/// Run the clear command.
pub fn run(mut runner: CliRunner, connect: ConnectArgs, args: ClearArgs) -> Result<(), CliError> {
    runner.log_startup("clear");
    args.apply(runner.config_mut());
    let area = args.area(runner.config());
    area.validate()
        .map_err(|e| CliError::Usage(format!("Invalid area: {}", e)))?;

    let executor = runner.executor(connect.password)?;
    let clearer = RegionClearer::new(Arc::clone(&executor), runner.config().clear_config())?;

    let cancel = CancellationToken::new();
    let handler_token = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        eprintln!();
        eprintln!("{}", CANCEL_NOTICE);
        handler_token.cancel();
    }) {
        warn!(error = %e, "Could not install Ctrl+C handler");
    }

    let chunk_size = clearer
        .config()
        .chunk_size
        .unwrap_or_else(|| executor.controller().current_chunk_size());
    let progress = (!connect.json).then(|| progress_bar(&area, chunk_size));
    let callback: Option<ProgressCallback> = progress.clone().map(|bar| {
        Arc::new(move |chunk: &ChunkResult| {
            if chunk.error.is_some() {
                bar.println(format!(
                    "chunk #{} at ({}, {}) had problems",
                    chunk.index, chunk.origin_x, chunk.origin_z
                ));
            }
            bar.inc(1);
        }) as ProgressCallback
    });

    if !connect.json {
        println!("Clearing {} (preserve terrain: {})", area, args.preserve_terrain);
    }

    let result = runner.runtime()?.block_on(async {
        let result = clearer
            .clear_region_with(&area, args.preserve_terrain, cancel, callback)
            .await;
        executor.close().await;
        result
    })?;

    if let Some(bar) = progress {
        bar.finish_and_clear();
    }

    if connect.json {
        match serde_json::to_string_pretty(&result) {
            Ok(text) => println!("{}", text),
            Err(e) => eprintln!("Could not serialize result: {}", e),
        }
    } else {
        println!("{}", format_report(&result, args.preserve_terrain));
    }

    if result.is_success() {
        Ok(())
    } else {
        Err(CliError::ClearIncomplete)
    }
}

const CANCEL_NOTICE: &str =
    "Cancelling; in-flight attempts are abandoned and the remaining chunks skipped...";

const PROGRESS_TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] {bar:40} {pos}/{len} chunks";

fn progress_bar(area: &Area, chunk_size: u32) -> ProgressBar {
    let size = u64::from(chunk_size.max(1));
    let bar = ProgressBar::new(area.width().div_ceil(size) * area.depth().div_ceil(size));
    bar.set_style(
        ProgressStyle::with_template(PROGRESS_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> ClearArgs {
        ClearArgs {
            x_min: None,
            z_min: Some(-32),
            x_max: None,
            z_max: None,
            chunk_size: Some(16),
            workers: None,
            checkpoint: None,
            preserve_terrain: false,
        }
    }

    #[test]
    fn test_area_falls_back_to_config() {
        let config = ConfigFile::default();
        assert_eq!(args().area(&config), Area::new(0, -32, 127, 127));
    }

    #[test]
    fn test_overrides_applied() {
        let mut config = ConfigFile::default();
        args().apply(&mut config);
        assert_eq!(config.clear.chunk_size, Some(16));
        assert_eq!(config.clear.workers, 1);
    }

    #[test]
    fn test_progress_length_matches_plan() {
        let bar = progress_bar(&Area::new(0, 0, 127, 127), 32);
        assert_eq!(bar.length(), Some(16));
    }

    #[test]
    fn test_cancel_notice_matches_behaviour() {
        assert!(CANCEL_NOTICE.contains("abandoned"));
        assert!(!CANCEL_NOTICE.contains("finish"));
    }
}
