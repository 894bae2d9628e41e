//! Resumable progress for region clears.
//!
//! A checkpoint records which chunk origins finished, keyed by the exact
//! plan that produced them. A rerun with the same area, Y ranges and chunk
//! size skips those chunks; any other checkpoint is ignored.

use std::collections::BTreeSet;
use std::io;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::coord::{Area, YRange};

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("checkpoint I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("checkpoint is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Completed chunks of one clear plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearCheckpoint {
    pub area: Area,
    pub clear_y: YRange,
    pub ground_y: YRange,
    pub chunk_size: u32,
    pub preserve_terrain: bool,
    /// Origins `(x, z)` of finished chunks.
    pub completed: BTreeSet<(i32, i32)>,
    pub updated_at: DateTime<Utc>,
}

impl ClearCheckpoint {
    pub fn new(
        area: Area,
        clear_y: YRange,
        ground_y: YRange,
        chunk_size: u32,
        preserve_terrain: bool,
    ) -> Self {
        Self {
            area,
            clear_y,
            ground_y,
            chunk_size,
            preserve_terrain,
            completed: BTreeSet::new(),
            updated_at: Utc::now(),
        }
    }

    /// Whether this checkpoint was written for the same plan as `other`.
    pub fn same_plan(&self, other: &ClearCheckpoint) -> bool {
        self.area == other.area
            && self.clear_y == other.clear_y
            && self.ground_y == other.ground_y
            && self.chunk_size == other.chunk_size
            && self.preserve_terrain == other.preserve_terrain
    }

    pub fn is_completed(&self, origin: (i32, i32)) -> bool {
        self.completed.contains(&origin)
    }

    pub fn mark_completed(&mut self, origin: (i32, i32)) {
        self.completed.insert(origin);
        self.updated_at = Utc::now();
    }

    /// Read a checkpoint; `Ok(None)` when the file does not exist.
    pub fn load(path: &Path) -> Result<Option<Self>, CheckpointError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Ok(Some(serde_json::from_str(&text)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Write atomically: a temporary sibling file is renamed over `path`.
    pub fn save(&self, path: &Path) -> Result<(), CheckpointError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(self)?)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Delete the checkpoint file if present.
    pub fn remove(path: &Path) -> Result<(), CheckpointError> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
