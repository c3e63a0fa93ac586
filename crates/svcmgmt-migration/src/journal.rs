//! Step journal and checkpoints
//!
//! The migration is not atomic. After every completed step, before the
//! instances of a flatten page are written and on failure, the runner hands a
//! [`Checkpoint`] to a [`StepJournal`]. A later run loads it and continues after
//! `last_completed` with the saved precedence map and run timestamp.

use crate::error::MigrationError;
use crate::precedence::VersionPrecedenceMap;
use crate::steps::MigrationStep;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Progress of one migration run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// When the run first started
    pub started_at: DateTime<Utc>,
    /// Timestamp stamped on configuration versions, fixed once the walk starts
    #[serde(default)]
    pub migrated_at: Option<DateTime<Utc>>,
    /// Last step that completed
    #[serde(default)]
    pub last_completed: Option<MigrationStep>,
    /// Precedence map recorded so far, present once the walk starts
    #[serde(default)]
    pub precedence: Option<VersionPrecedenceMap>,
}

impl Checkpoint {
    /// Checkpoint of a run that has not completed any step
    #[inline]
    #[must_use]
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            migrated_at: None,
            last_completed: None,
            precedence: None,
        }
    }

    /// Whether every step has completed
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.last_completed == Some(MigrationStep::RewriteServices)
    }

    /// Steps still to run
    #[inline]
    #[must_use]
    pub fn remaining_steps(&self) -> &'static [MigrationStep] {
        MigrationStep::remaining_after(self.last_completed)
    }

    /// Check that the checkpoint can be resumed
    ///
    /// # Errors
    /// Returns `MigrationError::MissingPrecedenceMap` if the flatten step has
    /// completed but no map was saved
    pub fn validate_resumable(&self) -> Result<(), MigrationError> {
        match self.last_completed {
            Some(completed)
                if completed >= MigrationStep::FlattenVersionChains && self.precedence.is_none() =>
            {
                Err(MigrationError::MissingPrecedenceMap { completed })
            }
            _ => Ok(()),
        }
    }
}

/// Durable or log-only record of migration progress
pub trait StepJournal {
    /// Checkpoint of an earlier run, if any
    ///
    /// # Errors
    /// Returns error if a stored checkpoint cannot be read
    fn load(&self) -> Result<Option<Checkpoint>, MigrationError>;

    /// Record progress
    ///
    /// # Errors
    /// Returns error if the checkpoint cannot be written
    fn save(&self, checkpoint: &Checkpoint) -> Result<(), MigrationError>;
}

impl<J: StepJournal + ?Sized> StepJournal for &J {
    fn load(&self) -> Result<Option<Checkpoint>, MigrationError> {
        (**self).load()
    }

    fn save(&self, checkpoint: &Checkpoint) -> Result<(), MigrationError> {
        (**self).save(checkpoint)
    }
}

/// Journal that only logs progress
///
/// Nothing is loaded; every run starts from the first step.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogJournal;

impl StepJournal for LogJournal {
    fn load(&self) -> Result<Option<Checkpoint>, MigrationError> {
        Ok(None)
    }

    fn save(&self, checkpoint: &Checkpoint) -> Result<(), MigrationError> {
        tracing::info!(
            last_completed = ?checkpoint.last_completed,
            recorded = checkpoint.precedence.as_ref().map_or(0, VersionPrecedenceMap::len),
            "checkpoint"
        );
        Ok(())
    }
}

/// Journal holding the latest checkpoint in memory
#[derive(Debug, Default)]
pub struct MemoryJournal {
    latest: Mutex<Option<Checkpoint>>,
    saves: Mutex<usize>,
}

impl MemoryJournal {
    /// Create an empty journal
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a journal that resumes from `checkpoint`
    #[inline]
    #[must_use]
    pub fn with_checkpoint(checkpoint: Checkpoint) -> Self {
        Self {
            latest: Mutex::new(Some(checkpoint)),
            saves: Mutex::new(0),
        }
    }

    /// Latest saved checkpoint
    #[must_use]
    pub fn latest(&self) -> Option<Checkpoint> {
        self.latest.lock().clone()
    }

    /// Number of saves so far
    #[must_use]
    pub fn save_count(&self) -> usize {
        *self.saves.lock()
    }
}

impl StepJournal for MemoryJournal {
    fn load(&self) -> Result<Option<Checkpoint>, MigrationError> {
        Ok(self.latest())
    }

    fn save(&self, checkpoint: &Checkpoint) -> Result<(), MigrationError> {
        *self.latest.lock() = Some(checkpoint.clone());
        *self.saves.lock() += 1;
        Ok(())
    }
}

/// Journal persisting checkpoints as a JSON file
///
/// Each save writes a temporary file next to the target and renames it over
/// the target, so a crash never leaves a half-written checkpoint.
#[derive(Debug, Clone)]
pub struct FileJournal {
    path: PathBuf,
}

impl FileJournal {
    /// Journal at `path`
    #[inline]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Checkpoint file path
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StepJournal for FileJournal {
    fn load(&self) -> Result<Option<Checkpoint>, MigrationError> {
        let json = match std::fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(MigrationError::journal_io(&self.path, e)),
        };
        Ok(Some(serde_json::from_str(&json)?))
    }

    fn save(&self, checkpoint: &Checkpoint) -> Result<(), MigrationError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let json = serde_json::to_vec_pretty(checkpoint)?;

        let mut file = tempfile::NamedTempFile::new_in(dir)
            .map_err(|e| MigrationError::journal_io(dir, e))?;
        file.write_all(&json)
            .and_then(|()| file.as_file().sync_all())
            .map_err(|e| MigrationError::journal_io(file.path(), e))?;
        file.persist(&self.path)
            .map_err(|e| MigrationError::journal_io(&self.path, e.error))?;
        Ok(())
    }
}
