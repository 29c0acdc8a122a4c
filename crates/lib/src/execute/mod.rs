//! Build execution.
//!
//! Entries run strictly one after another, in declaration order. Each entry is
//! dispatched to its handler, which returns an [`Operation`]:
//!
//! - [`Operation::Empty`] when there is nothing to do (sources resolved to
//!   nothing, no file matched). The entry is logged as skipped and the run
//!   moves on immediately.
//! - [`Operation::Task`] otherwise. The run awaits it before dispatching the
//!   next entry, so later entries observe every side effect of earlier ones,
//!   including configuration updates.
//!
//! The first error stops the run. Outputs written by earlier entries are kept.

pub mod context;
pub mod handlers;
pub mod types;

use std::future::Future;
use std::time::Instant;

use futures::future::BoxFuture;
use tracing::{debug, error, info, warn};

use crate::content::BuildContent;

pub use context::BuildContext;
pub use types::{BuildError, EntryReport, EntryState, Outcome, RunReport, RunState};

/// The work an entry resolved to.
pub enum Operation {
  /// Nothing to do.
  Empty { reason: String },
  /// Pending work; the entry completes when the future does.
  Task(BoxFuture<'static, Result<Outcome, BuildError>>),
}

impl Operation {
  pub fn empty(reason: impl Into<String>) -> Self {
    Operation::Empty { reason: reason.into() }
  }

  pub fn task(fut: impl Future<Output = Result<Outcome, BuildError>> + Send + 'static) -> Self {
    Operation::Task(Box::pin(fut))
  }

  pub fn is_empty(&self) -> bool {
    matches!(self, Operation::Empty { .. })
  }
}

impl std::fmt::Debug for Operation {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Operation::Empty { reason } => f.debug_struct("Empty").field("reason", reason).finish(),
      Operation::Task(_) => f.write_str("Task(..)"),
    }
  }
}

/// Run `entries` in order.
///
/// # Returns
///
/// The run report when every entry finished or was skipped, otherwise the
/// first error wrapped in [`BuildError::Entry`].
pub async fn run_entries(entries: &[BuildContent], ctx: &BuildContext) -> Result<RunReport, BuildError> {
  let mut report = RunReport::new(entries);
  report.state = RunState::Running;
  let started = Instant::now();

  info!(entries = entries.len(), "starting build");

  for (index, entry) in entries.iter().enumerate() {
    let kind = entry.kind();
    let label = entry.label();
    debug!(index, kind = %kind, entry = %label, "dispatching entry");

    let operation = handlers::dispatch(entry, ctx);
    report.entries[index].state = EntryState::Dispatched;

    let operation = match operation {
      Ok(operation) => operation,
      Err(e) => return Err(fail(&mut report, index, e)),
    };

    match operation {
      Operation::Empty { reason } => {
        warn!(index, kind = %kind, entry = %label, reason = %reason, "skipping entry with nothing to do");
        report.entries[index].state = EntryState::SkippedEmpty { reason };
      }
      Operation::Task(task) => {
        let entry_started = Instant::now();
        match task.await {
          Ok(outcome) => {
            let elapsed = entry_started.elapsed();
            info!(
              index,
              kind = %kind,
              entry = %label,
              outputs = outcome.outputs.len(),
              elapsed_ms = elapsed.as_millis() as u64,
              "entry finished"
            );
            let slot = &mut report.entries[index];
            slot.state = EntryState::Finished;
            slot.outputs = outcome.outputs;
            slot.elapsed = Some(elapsed);
          }
          Err(e) => return Err(fail(&mut report, index, e)),
        }
      }
    }
  }

  report.state = RunState::Completed;
  info!(
    finished = report.finished(),
    skipped = report.skipped(),
    elapsed_ms = started.elapsed().as_millis() as u64,
    "build completed"
  );
  Ok(report)
}

fn fail(report: &mut RunReport, index: usize, error: BuildError) -> BuildError {
  report.state = RunState::Failed;
  let slot = &mut report.entries[index];
  slot.state = EntryState::Failed;
  error!(index, kind = %slot.kind, entry = %slot.label, error = %error, "entry failed, stopping build");
  BuildError::Entry {
    index,
    kind: slot.kind,
    label: slot.label.clone(),
    source: Box::new(error),
  }
}
