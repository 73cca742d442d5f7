//! Durable on-disk record of the current sensor state.
//!
//! The record is a flat TOML key/value file keyed by field name. Flushing
//! is explicit and atomic with respect to process crash: the new record is
//! written to a sibling temp file, synced, then renamed over the old one,
//! so a crash mid-commit leaves the previous durable record intact.
//!
//! Exactly one process instance owns the record for the device's lifetime;
//! concurrent writers are prevented by deployment discipline, not here.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use super::{SensorState, StateUpdate};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read state record {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("state record {path} is not parseable: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("failed to encode state record: {0}")]
    Encode(#[from] toml::ser::Error),

    #[error("failed to flush state record {path}: {source}")]
    Flush { path: PathBuf, source: io::Error },
}

/// Handle on the persisted [`SensorState`], opened once at daemon start.
#[derive(Debug)]
pub struct StateStore {
    path: PathBuf,
    state: SensorState,
}

impl StateStore {
    /// Loads the record if one exists; fields absent from an older record
    /// come up as 0.0, so adding a field to the schema needs no migration.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let state = match fs::read_to_string(&path) {
            Ok(text) => toml::from_str(&text).map_err(|source| StoreError::Parse {
                path: path.clone(),
                source,
            })?,
            Err(source) if source.kind() == io::ErrorKind::NotFound => {
                info!(
                    "no state record at {}, starting from defaults",
                    path.display()
                );
                SensorState::default()
            }
            Err(source) => return Err(StoreError::Read { path, source }),
        };

        Ok(Self { path, state })
    }

    pub fn state(&self) -> &SensorState {
        &self.state
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Applies a validated update to every field it carries, then forces a
    /// durable flush before returning. The in-memory record only moves
    /// forward once the flush succeeded, so memory and disk cannot diverge
    /// on a failed commit.
    pub fn commit_and_flush(&mut self, update: &StateUpdate) -> Result<(), StoreError> {
        let mut next = self.state;
        for &(field, value) in update.values() {
            field.set(&mut next, value);
        }

        self.flush(&next)?;
        self.state = next;
        debug!("state record committed to {}", self.path.display());
        Ok(())
    }

    fn flush(&self, state: &SensorState) -> Result<(), StoreError> {
        let flush_err = |source: io::Error| StoreError::Flush {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(flush_err)?;
            }
        }

        let text = toml::to_string_pretty(state)?;
        let staging = self.path.with_extension("tmp");

        let mut file = File::create(&staging).map_err(flush_err)?;
        file.write_all(text.as_bytes()).map_err(flush_err)?;
        file.sync_all().map_err(flush_err)?;
        fs::rename(&staging, &self.path).map_err(flush_err)?;
        Ok(())
    }
}
