//! Lifecycle notifications sent to formatters

use crate::example::ExampleResult;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

/// Sent once, when the run starts.
#[derive(Debug, Clone)]
pub struct RunStartNotification {
    /// The host's own record of when the run began
    pub started_at: DateTime<Utc>,
}

/// Sent once, after the last example finishes.
#[derive(Debug)]
pub struct ExamplesNotification {
    /// Every example outcome, in run order
    pub examples: Vec<Arc<ExampleResult>>,
}

/// Sent once, after aggregate statistics are computed. Always follows
/// [`ExamplesNotification`].
///
/// `example_count` is assumed, not verified, to equal the length of the
/// example list delivered earlier.
#[derive(Debug, Clone)]
pub struct SummaryNotification {
    /// Total number of examples in the run
    pub example_count: usize,
    /// Number of pending examples
    pub pending_count: usize,
    /// Number of failed examples
    pub failure_count: usize,
    /// Total wall-clock duration of the run
    pub duration: Duration,
}

/// A lifecycle notification delivered to formatters.
#[derive(Debug, Clone)]
pub enum Notification {
    /// The run has started
    RunStarted(Arc<RunStartNotification>),
    /// All examples have finished
    ExamplesCollected(Arc<ExamplesNotification>),
    /// Aggregate statistics are available
    SummaryComputed(Arc<SummaryNotification>),
}
