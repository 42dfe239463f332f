//! Shutdown lifecycle: cleanup hooks and deadlines

use std::{
    error::Error as StdError,
    fmt::{self, Display, Formatter},
    time::{Duration, Instant}
};

use crate::{
    error::SharedError,
    module::{CleanupFn, Token}
};

/// The context handed to every cleanup hook during shutdown
///
/// Carries the externally supplied deadline, if any. The kernel never
/// preempts a hook; hooks are expected to check
/// [`remaining`](CleanupContext::remaining) or
/// [`is_expired`](CleanupContext::is_expired) and give up cooperatively.
#[derive(Debug, Clone, Copy, Default)]
pub struct CleanupContext {
    deadline: Option<Instant>,
}

impl CleanupContext {
    /// Creates a context without a deadline
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a context that expires `timeout` from now
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { deadline: Some(Instant::now() + timeout) }
    }

    /// Creates a context with an absolute deadline
    pub fn with_deadline(deadline: Instant) -> Self {
        Self { deadline: Some(deadline) }
    }

    /// Returns the deadline, if one was supplied
    #[inline]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns the time left until the deadline; `None` when unbounded
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Returns whether the deadline has passed
    pub fn is_expired(&self) -> bool {
        self.remaining().is_some_and(|left| left.is_zero())
    }
}

/// A cleanup hook registered by the container once a provider's value
/// has been built; the token is kept for diagnostics.
pub(crate) struct CleanupEntry {
    pub(crate) token: Token,
    pub(crate) hook: CleanupFn,
}

/// Aggregates every hook failure from one shutdown pass
///
/// Shutdown never stops at the first failing hook; the remaining hooks still
/// run and each failure is collected here together with the token whose
/// provider registered it.
#[derive(Debug, Clone)]
pub struct CleanupError {
    failures: Vec<(Token, SharedError)>,
}

impl CleanupError {
    /// Returns every failure in the order the hooks ran
    pub fn failures(&self) -> &[(Token, SharedError)] {
        &self.failures
    }
}

impl Display for CleanupError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} cleanup hook(s) failed:", self.failures.len())?;
        for (token, err) in &self.failures {
            write!(f, " \"{token}\": {err};")?;
        }
        Ok(())
    }
}

impl StdError for CleanupError {}

/// Runs `entries` in reverse registration order (LIFO), continuing through
/// failures and aggregating them into a single [`CleanupError`].
pub(crate) fn run_cleanup(
    ctx: &CleanupContext,
    entries: Vec<CleanupEntry>,
) -> Result<(), CleanupError> {
    let mut failures: Vec<(Token, SharedError)> = Vec::new();
    for entry in entries.into_iter().rev() {
        #[cfg(feature = "tracing")]
        tracing::trace!("running cleanup for \"{}\"", entry.token);

        if let Err(err) = (entry.hook)(ctx) {
            #[cfg(feature = "tracing")]
            tracing::warn!("cleanup for \"{}\" failed: {err}", entry.token);

            failures.push((entry.token, err.into()));
        }
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(CleanupError { failures })
    }
}
