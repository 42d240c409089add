//! Header lines, configuration plumbing, and end-to-end delivery

use crate::common;
use async_std::task::block_on;
use chrono::{DateTime, Utc};
use matchstick::{
    drive, formatter_by_name, ColorControl, ColorMode, ColorToggle, Config, ExampleStatus,
    ExamplesNotification, Formatter, Notification, ProblemMatcherFormatter, RunStartNotification,
};
use parking_lot::Mutex;
use std::sync::Arc;

#[test]
fn clean_run_renders_exactly_the_header() -> anyhow::Result<()> {
    block_on(async {
        let group = common::group("spec/widget_spec.rb");
        let examples = vec![
            common::example(&group, ExampleStatus::Passed, None),
            common::example(&group, ExampleStatus::Passed, None),
        ];

        let report = common::render(common::config(), examples).await?;
        let lines: Vec<&str> = report.lines().collect();

        assert_eq!(lines.len(), 8, "unexpected report:\n{}", report);
        assert_eq!(lines[0], "TestEnvNumber: rspec");
        assert_eq!(lines[1], "TestCount: 2");
        assert_eq!(lines[2], "PendingCount: 0");
        assert_eq!(lines[3], "FailureCount: 0");
        assert_eq!(lines[4], "TestDuration: 1.500000");
        let started = lines[5].strip_prefix("TestStarted: ").expect("TestStarted");
        DateTime::parse_from_rfc3339(started)?;
        assert_eq!(lines[6], "HostName: testhost");
        assert_eq!(lines[7], "TestSeed: 4242");
        Ok(())
    })
}

#[test]
fn pending_example_reports_the_top_level_group_file() -> anyhow::Result<()> {
    block_on(async {
        let group = common::nested_group("spec/outer_spec.rb", "spec/support/shared.rb");
        let examples = vec![common::example(&group, ExampleStatus::Pending, None)];

        let report = common::render(common::config(), examples).await?;
        let pending: Vec<&str> = report
            .lines()
            .filter(|l| l.starts_with("Pending: "))
            .collect();

        assert_eq!(pending, vec!["Pending: TestFile:spec/outer_spec.rb"]);
        assert_eq!(report.lines().count(), 9, "unexpected report:\n{}", report);
        Ok(())
    })
}

#[test]
fn shard_number_is_substituted_verbatim() -> anyhow::Result<()> {
    block_on(async {
        let config = Arc::new(Config {
            seed: None,
            env_number: Some(String::from("3")),
            hostname: String::from("testhost"),
            color: None,
        });

        let report = common::render(config, vec![]).await?;
        let lines: Vec<&str> = report.lines().collect();

        assert_eq!(lines[0], "TestEnvNumber: rspec3");
        // unset seed renders an empty value
        assert_eq!(lines[7], "TestSeed: ");
        Ok(())
    })
}

#[test]
fn config_reads_the_shard_from_the_environment() {
    std::env::set_var(matchstick::TEST_ENV_NUMBER, "3");
    let config = Config::from_env();
    assert_eq!(config.env_number.as_deref(), Some("3"));

    std::env::remove_var(matchstick::TEST_ENV_NUMBER);
    let config = Config::from_env();
    assert_eq!(config.env_number, None);
}

#[test]
fn seed_is_stable_across_renders() -> anyhow::Result<()> {
    block_on(async {
        let config = common::config();

        let first = common::render(config.clone(), vec![]).await?;
        let second = common::render(config, vec![]).await?;

        let seed_line = |report: &str| {
            report
                .lines()
                .find(|l| l.starts_with("TestSeed: "))
                .map(str::to_string)
        };
        assert_eq!(seed_line(&first), seed_line(&second));
        assert_eq!(seed_line(&first).as_deref(), Some("TestSeed: 4242"));
        Ok(())
    })
}

/// A color setting that records every mode it is put into.
struct RecordingToggle {
    mode: Mutex<ColorMode>,
    transitions: Mutex<Vec<ColorMode>>,
}

impl RecordingToggle {
    fn new(mode: ColorMode) -> Self {
        Self {
            mode: Mutex::new(mode),
            transitions: Mutex::new(vec![]),
        }
    }
}

impl ColorControl for RecordingToggle {
    fn color_mode(&self) -> ColorMode {
        *self.mode.lock()
    }

    fn set_color_mode(&self, mode: ColorMode) {
        *self.mode.lock() = mode;
        self.transitions.lock().push(mode);
    }
}

#[test]
fn color_is_forced_off_during_rendering_and_restored_after() -> anyhow::Result<()> {
    block_on(async {
        let toggle = Arc::new(RecordingToggle::new(ColorMode::On));
        let config = Arc::new(Config {
            seed: None,
            env_number: None,
            hostname: String::from("testhost"),
            color: Some(toggle.clone()),
        });

        let group = common::group("spec/widget_spec.rb");
        common::render(config, vec![common::example(&group, ExampleStatus::Passed, None)]).await?;

        assert_eq!(toggle.color_mode(), ColorMode::On);
        assert_eq!(
            *toggle.transitions.lock(),
            vec![ColorMode::Off, ColorMode::On]
        );
        Ok(())
    })
}

#[test]
fn color_is_restored_when_rendering_fails() {
    block_on(async {
        let toggle = Arc::new(ColorToggle::new(ColorMode::Automatic));
        let config = Arc::new(Config {
            seed: None,
            env_number: None,
            hostname: String::from("testhost"),
            color: Some(toggle.clone()),
        });

        // no on_start/on_stop first: rendering must fail, the restore must
        // still run
        let mut formatter = ProblemMatcherFormatter::from_blocking(Vec::new(), config);
        let result = formatter.on_summary(Arc::new(common::summary(&[]))).await;

        assert!(result.is_err());
        assert_eq!(toggle.color_mode(), ColorMode::Automatic);
    })
}

#[test]
fn missing_color_control_still_renders() -> anyhow::Result<()> {
    block_on(async {
        // common::config() carries no color control
        let report = common::render(common::config(), vec![]).await?;
        assert_eq!(report.lines().count(), 8);
        Ok(())
    })
}

#[test]
fn formatters_are_constructible_by_name() {
    let config = Arc::new(Config::from_env());
    assert!(formatter_by_name("problem-matcher", &config).is_ok());
    assert!(formatter_by_name("no-such-formatter", &config).is_err());
}

#[test]
fn drive_feeds_a_notification_stream_in_order() -> anyhow::Result<()> {
    block_on(async {
        let (tx, rx) = async_broadcast::broadcast(16);
        let mut formatter = ProblemMatcherFormatter::from_blocking(Vec::new(), common::config());

        let group = common::group("spec/widget_spec.rb");
        let examples = vec![common::example(&group, ExampleStatus::Pending, None)];
        let summary = common::summary(&examples);

        tx.broadcast(Notification::RunStarted(Arc::new(RunStartNotification {
            started_at: Utc::now(),
        })))
        .await
        .unwrap();
        tx.broadcast(Notification::ExamplesCollected(Arc::new(
            ExamplesNotification { examples },
        )))
        .await
        .unwrap();
        tx.broadcast(Notification::SummaryComputed(Arc::new(summary)))
            .await
            .unwrap();
        drop(tx);

        drive(&mut formatter, rx).await?;

        let report = String::from_utf8(formatter.into_inner().into_inner())?;
        assert!(
            report.contains("Pending: TestFile:spec/widget_spec.rb"),
            "unexpected report:\n{}",
            report
        );
        assert!(report.starts_with("TestEnvNumber: rspec\n"));
        Ok(())
    })
}
