//! Per-test results

use chrono::Duration;
use std::fmt;
use std::sync::Arc;

/// How a single example finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExampleStatus {
    /// The example ran to completion without failing
    Passed,
    /// The example was declared but its body is not (yet) expected to pass
    Pending,
    /// The example raised a failure
    Failed,
}

impl ExampleStatus {
    /// The example passed
    pub fn passed(&self) -> bool {
        *self == Self::Passed
    }

    /// The example is pending
    pub fn pending(&self) -> bool {
        *self == Self::Pending
    }

    /// The example failed
    pub fn failed(&self) -> bool {
        *self == Self::Failed
    }
}

impl fmt::Display for ExampleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            ExampleStatus::Passed => "passed",
            ExampleStatus::Pending => "pending",
            ExampleStatus::Failed => "failed",
        };

        f.write_str(msg)
    }
}

/// One `describe`-style grouping level. Groups nest; `parent` is `None`
/// only at the outermost group.
#[derive(Debug)]
pub struct ExampleGroup {
    /// Human description of the group
    pub description: String,
    /// Path of the file the group was declared in
    pub file_path: String,
    /// The enclosing group, if any
    pub parent: Option<Arc<ExampleGroup>>,
}

impl ExampleGroup {
    /// Walk `parent` links up to the outermost group.
    pub fn top_level(&self) -> &ExampleGroup {
        let mut group = self;
        while let Some(parent) = group.parent.as_deref() {
            group = parent;
        }
        group
    }
}

/// What a failed example raised.
#[derive(Debug)]
pub struct Failure {
    /// The failure's string representation. May span multiple lines and may
    /// embed a colorized diff.
    pub message: String,
    /// Host-formatted backtrace frames, innermost first
    pub backtrace: Vec<String>,
}

/// The outcome of one example.
#[derive(Debug)]
pub struct ExampleResult {
    /// Full description, including the enclosing group descriptions
    pub description: String,
    /// Innermost group the example was declared in
    pub group: Arc<ExampleGroup>,
    /// Path of the file the example body lives in
    pub file_path: String,
    /// Line the example was declared on
    pub line: u32,
    /// How long the example took to execute
    pub run_time: Duration,
    /// How the example finished
    pub status: ExampleStatus,
    /// Present when `status` is [`ExampleStatus::Failed`]
    pub failure: Option<Failure>,
}

impl ExampleResult {
    /// The file path reported for this example: the outermost enclosing
    /// group's file. Not necessarily the file the example body lives in —
    /// problem-matcher consumers key off the top-level file.
    pub fn group_file_path(&self) -> &str {
        &self.group.top_level().file_path
    }
}
