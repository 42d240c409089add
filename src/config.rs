//! Host-side run configuration read by formatters

use parking_lot::RwLock;
use std::env;
use std::fmt;
use std::sync::Arc;

/// Environment variable naming the parallel test shard, if any
pub const TEST_ENV_NUMBER: &str = "TEST_ENV_NUMBER";

/// The host's global color setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    /// Colorize only when the output is a terminal
    Automatic,
    /// Always colorize
    On,
    /// Never colorize
    Off,
}

impl Default for ColorMode {
    fn default() -> Self {
        Self::Automatic
    }
}

impl fmt::Display for ColorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            ColorMode::Automatic => "automatic",
            ColorMode::On => "on",
            ColorMode::Off => "off",
        };

        f.write_str(msg)
    }
}

/// Get/set access to a host's global color setting.
///
/// A host that has such a setting implements this once and hands it to
/// [`Config`]; formatters never probe the host for it at render time.
pub trait ColorControl: Send + Sync {
    /// The current mode
    fn color_mode(&self) -> ColorMode;

    /// Replace the current mode
    fn set_color_mode(&self, mode: ColorMode);
}

/// A ready-made [`ColorControl`] backed by a lock, for hosts that don't
/// carry their own setting.
#[derive(Default)]
pub struct ColorToggle {
    mode: RwLock<ColorMode>,
}

impl ColorToggle {
    /// Create a toggle starting in `mode`
    pub fn new(mode: ColorMode) -> Self {
        Self {
            mode: RwLock::new(mode),
        }
    }
}

impl ColorControl for ColorToggle {
    fn color_mode(&self) -> ColorMode {
        *self.mode.read()
    }

    fn set_color_mode(&self, mode: ColorMode) {
        *self.mode.write() = mode;
    }
}

/// Forces a [`ColorControl`] to [`ColorMode::Off`] and restores the exact
/// prior mode when dropped. The restore runs on every exit path, including
/// when rendering fails partway through.
pub struct ColorOffGuard {
    control: Arc<dyn ColorControl>,
    prior: ColorMode,
}

impl ColorOffGuard {
    /// Force `control` off until the guard is dropped
    pub fn new(control: Arc<dyn ColorControl>) -> Self {
        let prior = control.color_mode();
        control.set_color_mode(ColorMode::Off);
        Self { control, prior }
    }
}

impl Drop for ColorOffGuard {
    fn drop(&mut self) {
        self.control.set_color_mode(self.prior);
    }
}

/// Global information about a run. The host creates one of these and shares
/// it with every formatter.
pub struct Config {
    /// Seed used to randomize example ordering, if ordering was randomized
    pub seed: Option<u64>,
    /// Parallel test-shard identifier, substituted verbatim into the report
    pub env_number: Option<String>,
    /// Name of the machine the run executed on
    pub hostname: String,
    /// The host's global color setting, if it exposes one in a recognized
    /// form
    pub color: Option<Arc<dyn ColorControl>>,
}

impl Config {
    /// Create a config from the process environment. The shard identifier
    /// comes from [`TEST_ENV_NUMBER`], the hostname from the local machine.
    pub fn from_env() -> Self {
        Self {
            seed: None,
            env_number: env::var(TEST_ENV_NUMBER).ok(),
            hostname: local_hostname(),
            color: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

fn local_hostname() -> String {
    whoami::fallible::hostname().unwrap_or_else(|_| String::from("localhost"))
}
