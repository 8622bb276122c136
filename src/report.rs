//! Run reporting.
//!
//! Every item a pipeline attempts (folder listing, dashboard, datasource)
//! produces exactly one outcome in a [`RunReport`]. Fatal conditions are
//! tracked separately from item failures so callers can tell "nothing ran"
//! apart from "some items failed".

use std::fmt;

/// Kind of object an outcome refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    /// A folder (listing its dashboards).
    Folder,
    /// A dashboard document.
    Dashboard,
    /// A datasource definition.
    Datasource,
}

impl ItemKind {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Folder => "folder",
            Self::Dashboard => "dashboard",
            Self::Datasource => "datasource",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies one attempted item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRef {
    /// Object kind.
    pub kind: ItemKind,
    /// Service uid, object key or listing prefix.
    pub id: String,
}

impl ItemRef {
    /// Creates a reference.
    #[must_use]
    pub fn new(kind: ItemKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    /// References a folder.
    #[must_use]
    pub fn folder(id: impl Into<String>) -> Self {
        Self::new(ItemKind::Folder, id)
    }

    /// References a dashboard.
    #[must_use]
    pub fn dashboard(id: impl Into<String>) -> Self {
        Self::new(ItemKind::Dashboard, id)
    }

    /// References a datasource.
    #[must_use]
    pub fn datasource(id: impl Into<String>) -> Self {
        Self::new(ItemKind::Datasource, id)
    }
}

impl fmt::Display for ItemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}'", self.kind, self.id)
    }
}

/// A failed item and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    /// The item.
    pub item: ItemRef,
    /// Human-readable cause.
    pub reason: String,
}

/// Overall outcome of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Every attempted item succeeded.
    AllSucceeded,
    /// At least one item failed; the run still completed.
    PartialFailure,
    /// The run could not proceed.
    Fatal,
}

impl RunStatus {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::AllSucceeded => "succeeded",
            Self::PartialFailure => "partial",
            Self::Fatal => "fatal",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accumulated outcomes of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Items attempted.
    pub attempted: usize,
    /// Items that succeeded.
    pub succeeded: usize,
    /// Items that failed, in the order they were attempted.
    pub failures: Vec<Failure>,
    /// Cause of a fatal stop, if any.
    pub fatal: Option<String>,
}

impl RunReport {
    /// Creates an empty report.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            attempted: 0,
            succeeded: 0,
            failures: Vec::new(),
            fatal: None,
        }
    }

    /// Records the outcome of one item.
    pub fn record(&mut self, item: ItemRef, outcome: std::result::Result<(), String>) {
        match outcome {
            Ok(()) => self.record_success(),
            Err(reason) => self.record_failure(item, reason),
        }
    }

    /// Records a successful item.
    pub const fn record_success(&mut self) {
        self.attempted += 1;
        self.succeeded += 1;
    }

    /// Records a failed item.
    pub fn record_failure(&mut self, item: ItemRef, reason: impl Into<String>) {
        self.attempted += 1;
        self.failures.push(Failure {
            item,
            reason: reason.into(),
        });
    }

    /// Marks the run fatal. The first cause wins.
    pub fn mark_fatal(&mut self, cause: impl Into<String>) {
        if self.fatal.is_none() {
            self.fatal = Some(cause.into());
        }
    }

    /// Folds another report into this one.
    pub fn merge(&mut self, other: Self) {
        self.attempted += other.attempted;
        self.succeeded += other.succeeded;
        self.failures.extend(other.failures);
        if let Some(cause) = other.fatal {
            self.mark_fatal(cause);
        }
    }

    /// Returns the number of failed items.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// Returns the overall status.
    #[must_use]
    pub fn status(&self) -> RunStatus {
        if self.fatal.is_some() {
            RunStatus::Fatal
        } else if self.failures.is_empty() {
            RunStatus::AllSucceeded
        } else {
            RunStatus::PartialFailure
        }
    }

    /// Returns a multi-line, human-readable summary.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut out = format!(
            "status: {} ({} attempted, {} succeeded, {} failed)",
            self.status(),
            self.attempted,
            self.succeeded,
            self.failed()
        );
        if let Some(cause) = &self.fatal {
            out.push_str("\nfatal: ");
            out.push_str(cause);
        }
        for failure in &self.failures {
            out.push_str(&format!("\n  - {}: {}", failure.item, failure.reason));
        }
        out
    }
}

/// Decides the process exit status from a report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExitPolicy {
    /// Item failures tolerated before the run counts as failed.
    /// `None` tolerates any number.
    pub max_item_failures: Option<usize>,
}

impl ExitPolicy {
    /// Creates a policy.
    #[must_use]
    pub const fn new(max_item_failures: Option<usize>) -> Self {
        Self { max_item_failures }
    }

    /// Returns true if the report should produce a non-zero exit.
    #[must_use]
    pub fn is_failure(&self, report: &RunReport) -> bool {
        match report.status() {
            RunStatus::Fatal => true,
            RunStatus::AllSucceeded => false,
            RunStatus::PartialFailure => self
                .max_item_failures
                .is_some_and(|max| report.failed() > max),
        }
    }
}
