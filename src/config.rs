//! Connection settings.
//!
//! Every timeout is tri-state: the default of five seconds, disabled, or an
//! explicit duration. Numeric configuration follows the usual rcon client
//! convention where `0` means "use the default" and a negative value turns the
//! timeout off.

use std::time::Duration;

pub const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_READ_DEADLINE: Duration = Duration::from_secs(5);
pub const DEFAULT_WRITE_DEADLINE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Timeout {
    /// Five seconds.
    #[default]
    Default,
    /// Wait forever.
    Disabled,
    After(Duration),
}

impl Timeout {
    /// `0` maps to [Timeout::Default], negative values to [Timeout::Disabled].
    pub fn from_millis(millis: i64) -> Self {
        match millis {
            0 => Timeout::Default,
            m if m < 0 => Timeout::Disabled,
            m => Timeout::After(Duration::from_millis(m as u64)),
        }
    }

    /// Concrete duration for this timeout, `None` if it is disabled.
    pub fn resolve(self, default: Duration) -> Option<Duration> {
        match self {
            Timeout::Default => Some(default),
            Timeout::Disabled => None,
            Timeout::After(duration) => Some(duration),
        }
    }
}

impl From<Duration> for Timeout {
    fn from(duration: Duration) -> Self {
        if duration.is_zero() {
            Timeout::Default
        } else {
            Timeout::After(duration)
        }
    }
}

/// Timeouts applied by a [crate::connection::Connection].
///
/// The read and write deadlines are armed again for every single packet, so
/// a slow but steady server never trips them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Settings {
    pub dial_timeout: Timeout,
    pub read_deadline: Timeout,
    pub write_deadline: Timeout,
}

impl Settings {
    pub fn with_dial_timeout(mut self, timeout: impl Into<Timeout>) -> Self {
        self.dial_timeout = timeout.into();
        self
    }

    pub fn with_read_deadline(mut self, timeout: impl Into<Timeout>) -> Self {
        self.read_deadline = timeout.into();
        self
    }

    pub fn with_write_deadline(mut self, timeout: impl Into<Timeout>) -> Self {
        self.write_deadline = timeout.into();
        self
    }

    pub fn dial_timeout(&self) -> Option<Duration> {
        self.dial_timeout.resolve(DEFAULT_DIAL_TIMEOUT)
    }

    pub fn read_deadline(&self) -> Option<Duration> {
        self.read_deadline.resolve(DEFAULT_READ_DEADLINE)
    }

    pub fn write_deadline(&self) -> Option<Duration> {
        self.write_deadline.resolve(DEFAULT_WRITE_DEADLINE)
    }
}
