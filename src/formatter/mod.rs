//! Writes output given run notifications

use crate::config::Config;
use crate::notification::{
    ExamplesNotification, Notification, RunStartNotification, SummaryNotification,
};
use anyhow;
use async_broadcast as broadcast;
use async_std::io::Stdout;
use async_trait::async_trait;
use futures::stream::StreamExt;
use std::sync::Arc;

pub mod problem_matcher;
pub use problem_matcher::*;

/// A Formatter takes the three run lifecycle notifications, in order, and
/// produces a report from them. Each hook fires exactly once per run:
/// [`Formatter::on_start`] at run start, [`Formatter::on_stop`] once every
/// example has finished, [`Formatter::on_summary`] last.
#[async_trait]
pub trait Formatter: Send + Sync {
    /// The run has started.
    async fn on_start(&mut self, notification: Arc<RunStartNotification>) -> anyhow::Result<()>;

    /// Every example has finished. No output is produced here.
    async fn on_stop(&mut self, notification: Arc<ExamplesNotification>) -> anyhow::Result<()>;

    /// Aggregate statistics are available. This is where the report gets
    /// written.
    async fn on_summary(&mut self, notification: Arc<SummaryNotification>) -> anyhow::Result<()>;
}

/// Deliver a notification stream to `formatter`, in arrival order. Returns
/// the first hook error, if any.
pub async fn drive<F>(
    formatter: &mut F,
    mut events: broadcast::Receiver<Notification>,
) -> anyhow::Result<()>
where
    F: Formatter + ?Sized,
{
    while let Some(event) = events.next().await {
        match event {
            Notification::RunStarted(n) => formatter.on_start(n).await?,
            Notification::ExamplesCollected(n) => formatter.on_stop(n).await?,
            Notification::SummaryComputed(n) => formatter.on_summary(n).await?,
        }
    }

    Ok(())
}

/// A formatter entry. Submit one via `inventory::submit!` to make a
/// formatter constructible by name.
pub struct FormatterEntry {
    /// Name the formatter is requested by
    pub name: &'static str,
    /// Constructor
    pub make: fn(config: &Arc<Config>) -> anyhow::Result<Box<dyn Formatter>>,
}

inventory::collect!(FormatterEntry);

/// Create a registered formatter by name.
pub fn formatter_by_name(name: &str, config: &Arc<Config>) -> anyhow::Result<Box<dyn Formatter>> {
    for entry in inventory::iter::<FormatterEntry> {
        if entry.name == name {
            return (entry.make)(config);
        }
    }

    anyhow::bail!("No such formatter {}", name)
}

/// The default type of formatter to create if none are specified
pub type DefaultFormatter = ProblemMatcherFormatter<Stdout>;
