//! Overall run budget.

use super::{RemoteError, RemoteResult};
use std::time::{Duration, Instant};

/// Point in time after which no new remote call is started.
///
/// Calls already in flight are left to finish on their own timeouts. The same
/// deadline is handed to both clients so one budget covers the whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Deadline {
    expires_at: Option<Instant>,
}

impl Deadline {
    /// A deadline that never expires.
    #[must_use]
    pub const fn none() -> Self {
        Self { expires_at: None }
    }

    /// A deadline `budget` from now.
    #[must_use]
    pub fn after(budget: Duration) -> Self {
        Self {
            expires_at: Some(Instant::now() + budget),
        }
    }

    /// Builds a deadline from an optional budget in seconds.
    #[must_use]
    pub fn from_secs(budget_secs: Option<u64>) -> Self {
        budget_secs.map_or_else(Self::none, |secs| Self::after(Duration::from_secs(secs)))
    }

    /// Returns true once the budget is spent.
    #[must_use]
    pub fn is_exceeded(&self) -> bool {
        self.expires_at
            .is_some_and(|expires_at| Instant::now() >= expires_at)
    }

    /// Time left, or `None` without a budget.
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.expires_at
            .map(|expires_at| expires_at.saturating_duration_since(Instant::now()))
    }

    /// Fails with [`RemoteError::DeadlineExceeded`] once the budget is spent.
    pub fn check(&self) -> RemoteResult<()> {
        if self.is_exceeded() {
            tracing::error!("run deadline exceeded, refusing new remote call");
            return Err(RemoteError::DeadlineExceeded);
        }
        Ok(())
    }
}
