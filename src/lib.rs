#![warn(missing_docs)]

//! Matchstick: problem-matcher friendly test reports
//! =================================================
//!
//! Matchstick renders the results of a BDD test run as a stable,
//! line-oriented report that an editor's problem matcher can scrape with a
//! single regular expression:
//!
//! ```text
//! TestFailure: TestFile:(.+) Line:(\d+) Message:(.*)
//! ```
//!
//! The host test runner drives a [`Formatter`] through three ordered
//! lifecycle hooks (run started, examples collected, summary computed),
//! delivered as [`Notification`]s over a broadcast channel. Matchstick does
//! not run tests, discover files, or implement assertions; it only turns
//! the host's result objects into text.

pub mod config;
pub mod example;
pub mod formatter;
pub mod notification;

pub use config::*;
pub use example::*;
pub use formatter::*;
pub use notification::*;
