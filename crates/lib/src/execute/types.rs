//! Types for build execution.
//!
//! This module defines the error type of a build, the per-entry and per-run
//! states, and the report returned by a successful run.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::adapters::AdapterError;
use crate::content::{BuildContent, ContentError, ContentKind, CustomError};
use crate::files::FilesError;
use crate::merge::MergeError;
use crate::settings::SettingsError;

/// Errors that can occur while declaring or running a build.
#[derive(Debug, Error)]
pub enum BuildError {
  /// A content declaration was rejected.
  #[error(transparent)]
  Content(#[from] ContentError),

  /// A JSON source could not be loaded or merged.
  #[error(transparent)]
  Merge(#[from] MergeError),

  /// Reading sources or writing outputs failed.
  #[error(transparent)]
  Files(#[from] FilesError),

  /// An external tool failed.
  #[error(transparent)]
  Adapter(#[from] AdapterError),

  /// The editor settings file is unreadable.
  #[error(transparent)]
  Settings(#[from] SettingsError),

  /// A compiled variant's destination expanded to several paths.
  #[error("{kind} destination '{dest}' resolves to multiple paths: {}", resolved.join(", "))]
  MultipleDestinations {
    kind: ContentKind,
    dest: String,
    resolved: Vec<String>,
  },

  /// No output file name could be derived for a destination.
  #[error("cannot derive an output file name for destination '{dest}'")]
  NoOutputName { dest: String },

  /// The configuration is not usable.
  #[error("invalid configuration: {0}")]
  InvalidConfig(String),

  /// A custom task reported failure.
  #[error("custom task '{name}' failed: {source}")]
  Custom { name: String, source: CustomError },

  /// I/O error outside of source and output handling.
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  /// An entry failed; the run stopped at this entry.
  #[error("entry #{index} ({kind}: {label}) failed: {source}")]
  Entry {
    index: usize,
    kind: ContentKind,
    label: String,
    source: Box<BuildError>,
  },
}

impl BuildError {
  /// The underlying error, without entry context.
  pub fn root(&self) -> &BuildError {
    match self {
      BuildError::Entry { source, .. } => source.root(),
      other => other,
    }
  }

  /// Index of the failed entry, when the error came from a run.
  pub fn entry_index(&self) -> Option<usize> {
    match self {
      BuildError::Entry { index, .. } => Some(*index),
      _ => None,
    }
  }
}

/// Lifecycle of one entry within a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryState {
  Pending,
  Dispatched,
  Finished,
  Failed,
  /// The entry had nothing to do.
  SkippedEmpty { reason: String },
}

/// Lifecycle of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
  Idle,
  Running,
  Completed,
  Failed,
}

/// What a finished entry produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outcome {
  pub outputs: Vec<PathBuf>,
}

impl Outcome {
  pub fn written(outputs: Vec<PathBuf>) -> Self {
    Self { outputs }
  }
}

/// Result of one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryReport {
  pub index: usize,
  pub kind: ContentKind,
  pub label: String,
  pub state: EntryState,
  pub outputs: Vec<PathBuf>,
  pub elapsed: Option<Duration>,
}

/// Result of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
  pub state: RunState,
  pub entries: Vec<EntryReport>,
}

impl RunReport {
  /// A report with every entry pending.
  pub fn new(entries: &[BuildContent]) -> Self {
    Self {
      state: RunState::Idle,
      entries: entries
        .iter()
        .enumerate()
        .map(|(index, entry)| EntryReport {
          index,
          kind: entry.kind(),
          label: entry.label(),
          state: EntryState::Pending,
          outputs: Vec::new(),
          elapsed: None,
        })
        .collect(),
    }
  }

  pub fn finished(&self) -> usize {
    self.count(|s| *s == EntryState::Finished)
  }

  pub fn skipped(&self) -> usize {
    self.count(|s| matches!(s, EntryState::SkippedEmpty { .. }))
  }

  /// All files written by the run, in order.
  pub fn outputs(&self) -> impl Iterator<Item = &PathBuf> {
    self.entries.iter().flat_map(|e| e.outputs.iter())
  }

  fn count(&self, pred: impl Fn(&EntryState) -> bool) -> usize {
    self.entries.iter().filter(|e| pred(&e.state)).count()
  }
}
