//! Line-oriented output for editor problem matchers

use super::{Formatter, FormatterEntry};
use crate::config::{ColorOffGuard, Config};
use crate::example::{ExampleResult, ExampleStatus};
use crate::notification::{ExamplesNotification, RunStartNotification, SummaryNotification};
use anyhow;
use async_std::io::{stdout, Stdout};
use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use futures::io::{AllowStdIo, AsyncWrite, AsyncWriteExt};
use lazy_static::lazy_static;
use log::warn;
use regex::{Regex, RegexBuilder};
use std::io::Write;
use std::sync::{Arc, Once};
use thiserror::Error;

/// Errors from report generation. Notification contents are trusted as
/// well-formed; these fire when the host violates the hook contract itself.
#[derive(Error, Debug)]
pub enum FormatError {
    /// The summary notification arrived before an earlier lifecycle point.
    #[error("summary received before the {0} notification")]
    MissingNotification(&'static str),
    /// A failed example carried no failure detail.
    #[error("failed example {0:?} has no failure detail")]
    MissingFailure(String),
}

/// Formatter that renders a run as problem-matcher friendly lines.
///
/// The report is eight header lines followed by one line per non-passing
/// example, in run order:
///
/// ```text
/// TestEnvNumber: rspec2
/// TestCount: 3
/// PendingCount: 1
/// FailureCount: 1
/// TestDuration: 1.500000
/// TestStarted: 2021-06-01T12:00:00+00:00
/// HostName: ci-worker-2
/// TestSeed: 4242
/// Pending: TestFile:spec/widget_spec.rb
/// TestFailure: TestFile:spec/widget_spec.rb Line:42 Message:expected 1| got 2
/// ```
///
/// Passing examples emit nothing. Reported paths are always the outermost
/// enclosing group's file (see [`ExampleResult::group_file_path`]).
pub struct ProblemMatcherFormatter<T: AsyncWrite> {
    out: T,
    config: Arc<Config>,
    started: Option<DateTime<Utc>>,
    examples: Option<Arc<ExamplesNotification>>,
    summary: Option<Arc<SummaryNotification>>,
}

fn make_problem_matcher(config: &Arc<Config>) -> anyhow::Result<Box<dyn Formatter>> {
    Ok(Box::new(ProblemMatcherFormatter::new(
        stdout(),
        config.clone(),
    )))
}

inventory::submit! {
    FormatterEntry {
        name: "problem-matcher",
        make: make_problem_matcher,
    }
}

impl Default for ProblemMatcherFormatter<Stdout> {
    fn default() -> Self {
        Self::new(stdout(), Arc::new(Config::from_env()))
    }
}

impl<T: Write + Unpin + Send + Sync + 'static> ProblemMatcherFormatter<AllowStdIo<T>> {
    /// Create a formatter writing to a blocking sink
    pub fn from_blocking(out: T, config: Arc<Config>) -> Self {
        Self::new(AllowStdIo::new(out), config)
    }
}

impl<T: AsyncWrite + Unpin + Send + Sync + 'static> ProblemMatcherFormatter<T> {
    /// Create a formatter writing to `out`
    pub fn new(out: T, config: Arc<Config>) -> Self {
        Self {
            out,
            config,
            started: None,
            examples: None,
            summary: None,
        }
    }

    /// Recover the output sink
    pub fn into_inner(self) -> T {
        self.out
    }

    async fn render(&mut self) -> anyhow::Result<()> {
        let started = self
            .started
            .ok_or(FormatError::MissingNotification("start"))?;
        let examples = self
            .examples
            .clone()
            .ok_or(FormatError::MissingNotification("stop"))?;
        let summary = self
            .summary
            .clone()
            .ok_or(FormatError::MissingNotification("summary"))?;

        let env_number = self.config.env_number.as_deref().unwrap_or("");
        let seed = match self.config.seed {
            Some(seed) => seed.to_string(),
            None => String::new(),
        };

        let out = &mut self.out;
        out.write_all(format!("TestEnvNumber: rspec{}\n", env_number).as_ref())
            .await?;
        out.write_all(format!("TestCount: {}\n", summary.example_count).as_ref())
            .await?;
        out.write_all(format!("PendingCount: {}\n", summary.pending_count).as_ref())
            .await?;
        out.write_all(format!("FailureCount: {}\n", summary.failure_count).as_ref())
            .await?;
        out.write_all(format!("TestDuration: {:.6}\n", seconds(&summary.duration)).as_ref())
            .await?;
        out.write_all(
            format!(
                "TestStarted: {}\n",
                started.to_rfc3339_opts(SecondsFormat::Secs, false)
            )
            .as_ref(),
        )
        .await?;
        out.write_all(format!("HostName: {}\n", self.config.hostname).as_ref())
            .await?;
        out.write_all(format!("TestSeed: {}\n", seed).as_ref())
            .await?;

        for example in &examples.examples {
            match example.status {
                ExampleStatus::Passed => (),
                ExampleStatus::Pending => {
                    out.write_all(
                        format!("Pending: TestFile:{}\n", example.group_file_path()).as_ref(),
                    )
                    .await?;
                }
                ExampleStatus::Failed => {
                    out.write_all(failure_report_line(example)?.as_ref()).await?;
                }
            }
        }

        Ok(())
    }
}

#[async_trait]
impl<T: AsyncWrite + Unpin + Send + Sync + 'static> Formatter for ProblemMatcherFormatter<T> {
    async fn on_start(&mut self, _notification: Arc<RunStartNotification>) -> anyhow::Result<()> {
        // local clock, independent of the host's own record
        self.started = Some(Utc::now());
        Ok(())
    }

    async fn on_stop(&mut self, notification: Arc<ExamplesNotification>) -> anyhow::Result<()> {
        self.examples = Some(notification);
        Ok(())
    }

    async fn on_summary(&mut self, notification: Arc<SummaryNotification>) -> anyhow::Result<()> {
        self.summary = Some(notification);

        let _color_off = match self.config.color.as_ref() {
            Some(control) => Some(ColorOffGuard::new(control.clone())),
            None => {
                warn_no_color_control();
                None
            }
        };

        self.render().await
    }
}

fn warn_no_color_control() {
    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        warn!("cannot prevent colorizing: the host exposes no recognized color setting");
    });
}

fn failure_report_line(example: &ExampleResult) -> Result<String, FormatError> {
    let failure = example
        .failure
        .as_ref()
        .ok_or_else(|| FormatError::MissingFailure(example.description.clone()))?;

    let file = example.group_file_path();
    let line = match failure_line(file, &failure.backtrace) {
        Some(line) => line,
        None => {
            warn!("no backtrace frame matches {}; reporting line 0", file);
            0
        }
    };
    let message = pipe_joined(&strip_diff_colors(&failure.message));

    Ok(format!(
        "TestFailure: TestFile:{} Line:{} Message:{}\n",
        file, line, message
    ))
}

/// The line number to report for a failure: the digits following
/// `file_path:` in the first backtrace frame that contains `file_path`,
/// matched case-insensitively. `None` if no frame contains the path, or if
/// the containing frame carries no `path:digits` pair.
pub fn failure_line(file_path: &str, backtrace: &[String]) -> Option<u32> {
    let needle = file_path.to_lowercase();
    let frame = backtrace
        .iter()
        .find(|frame| frame.to_lowercase().contains(&needle))?;

    let pattern = RegexBuilder::new(&format!(r"{}:(\d+)", regex::escape(file_path)))
        .case_insensitive(true)
        .build()
        .ok()?;
    pattern.captures(frame)?.get(1)?.as_str().parse().ok()
}

lazy_static! {
    static ref DIFF_BLOCK_START: Regex = Regex::new(r"(?m)^( *)Diff:").unwrap();
    static ref COLOR_CODE: Regex = Regex::new(r"\x1b\[\d+m").unwrap();
}

const COLOR_RESET: &str = "\x1b[0m";

/// Remove color escapes from the first `Diff:` block embedded in a failure
/// message.
///
/// Diff hunks are appended to failure messages already colorized whenever
/// the host's global color setting is on, no matter how the message is
/// retrieved, so the codes have to come back out of the diff span here.
/// Escapes outside the block are left alone: the message itself may
/// legitimately contain them.
pub fn strip_diff_colors(message: &str) -> String {
    let caps = match DIFF_BLOCK_START.captures(message) {
        Some(caps) => caps,
        None => return message.to_string(),
    };

    let header = caps.get(0).unwrap();
    let indent = caps.get(1).unwrap().as_str();
    let start = header.start();
    let mut end = header.end();

    // optional reset escape directly after "Diff:"
    if message[end..].starts_with(COLOR_RESET) {
        end += COLOR_RESET.len();
    }

    // a following line belongs to the block if it keeps the indent and
    // opens with a color escape
    loop {
        let rest = &message[end..];
        if !rest.starts_with('\n') || !rest[1..].starts_with(indent) {
            break;
        }

        let line_start = end + 1 + indent.len();
        match COLOR_CODE.find(&message[line_start..]) {
            Some(m) if m.start() == 0 => (),
            _ => break,
        }

        end = match message[line_start..].find('\n') {
            Some(i) => line_start + i,
            None => message.len(),
        };
    }

    let stripped = COLOR_CODE.replace_all(&message[start..end], "");
    format!("{}{}{}", &message[..start], stripped, &message[end..])
}

/// Flatten a failure message onto one line: trailing newlines are dropped,
/// interior newlines become pipes.
pub fn pipe_joined(message: &str) -> String {
    message.trim_end_matches('\n').replace('\n', "|")
}

fn seconds(duration: &Duration) -> f64 {
    match duration.num_nanoseconds() {
        Some(ns) => ns as f64 / 1_000_000_000.0,
        // only overflows i64 nanoseconds somewhere past 292 years
        None => duration.num_seconds() as f64,
    }
}
