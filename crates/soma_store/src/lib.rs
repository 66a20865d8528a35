//! Durable persistence for the limbic scheduler.
//!
//! The whole scheduler state is one versioned JSON document written with
//! atomic replace: serialize to a sibling temp file, then rename over the
//! target. A crash between compute and persist leaves the previously
//! committed document intact — partial in-place mutation never happens.
//!
//! Accumulators are keyed by kind name rather than enum variant so a
//! future kind can be added without discarding history for existing ones;
//! unknown keys survive a load/save round trip untouched.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use soma_core::{AccumulatorState, EmittedSignal, QuietWindow, Signal};

/// Current schema version. Documents from a newer schema are refused
/// rather than guessed at.
pub const SCHEMA_VERSION: u32 = 1;

/// Emissions retained in the persisted history log.
pub const HISTORY_CAP: usize = 128;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("state io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("state document corrupt at {path}: {message}")]
    Corrupt { path: PathBuf, message: String },

    #[error("state schema version {found} is newer than supported {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },
}

/// The complete persisted state: registry-keyed accumulators, the quiet
/// window, and the bounded emission history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateDocument {
    pub version: u32,
    /// First-run timestamp; never-emitted kinds accumulate from here.
    pub origin: DateTime<Utc>,
    pub accumulators: BTreeMap<String, AccumulatorState>,
    pub quiet: QuietWindow,
    pub total_emissions: u64,
    /// Past emissions, oldest first, capped at [`HISTORY_CAP`].
    pub history: Vec<EmittedSignal>,
}

impl StateDocument {
    /// Fresh first-run document: every kind present with zero pressure
    /// and no emission timestamp.
    pub fn new(now: DateTime<Utc>) -> Self {
        let accumulators = Signal::ALL
            .iter()
            .map(|kind| (kind.as_str().to_string(), AccumulatorState::default()))
            .collect();
        Self {
            version: SCHEMA_VERSION,
            origin: now,
            accumulators,
            quiet: QuietWindow::default(),
            total_emissions: 0,
            history: Vec::new(),
        }
    }

    pub fn accumulator(&self, kind: Signal) -> AccumulatorState {
        self.accumulators.get(kind.as_str()).cloned().unwrap_or_default()
    }

    pub fn accumulator_mut(&mut self, kind: Signal) -> &mut AccumulatorState {
        self.accumulators.entry(kind.as_str().to_string()).or_default()
    }

    pub fn push_history(&mut self, emitted: EmittedSignal) {
        self.history.push(emitted);
        if self.history.len() > HISTORY_CAP {
            let excess = self.history.len() - HISTORY_CAP;
            self.history.drain(..excess);
        }
    }
}

/// File-backed store for the state document.
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted document, or initialize a fresh one when no
    /// file exists yet. A corrupt or future-versioned file is an error,
    /// never a silent reset — losing accumulated state on restart defeats
    /// the recovery semantics.
    pub fn load_or_init(&self, now: DateTime<Utc>) -> Result<StateDocument, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "no state document, starting fresh");
                return Ok(StateDocument::new(now));
            }
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let doc: StateDocument =
            serde_json::from_str(&content).map_err(|e| StoreError::Corrupt {
                path: self.path.clone(),
                message: e.to_string(),
            })?;

        if doc.version > SCHEMA_VERSION {
            return Err(StoreError::UnsupportedVersion {
                found: doc.version,
                supported: SCHEMA_VERSION,
            });
        }

        Ok(doc)
    }

    /// Atomically persist the document: write a sibling temp file, then
    /// rename over the target.
    pub fn save(&self, doc: &StateDocument) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(io_err)?;
            }
        }

        let payload = serde_json::to_vec_pretty(doc).map_err(|e| StoreError::Corrupt {
            path: self.path.clone(),
            message: e.to_string(),
        })?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, &payload).map_err(|source| StoreError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &self.path).map_err(io_err)?;

        tracing::debug!(path = %self.path.display(), bytes = payload.len(), "state persisted");
        Ok(())
    }
}
