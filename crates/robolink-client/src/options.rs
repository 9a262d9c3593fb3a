//! Client construction options.
//!
//! Background loop schedules use [`PollInterval`]. Integers are read as
//! signed milliseconds: negative disables a loop, zero runs it once, and a
//! positive value runs it immediately and then on that period.

use std::fmt;
use std::time::Duration;

use humantime_serde::re::humantime;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// How often a background loop fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PollInterval {
    /// The loop never runs.
    #[default]
    Never,
    /// The loop fires once, immediately, and then stops.
    Once,
    /// The loop fires immediately and then every period.
    Every(Duration),
}

impl PollInterval {
    /// Convert from signed milliseconds.
    #[must_use]
    pub fn from_millis(millis: i64) -> Self {
        match millis {
            m if m < 0 => Self::Never,
            0 => Self::Once,
            m => Self::Every(Duration::from_millis(m.unsigned_abs())),
        }
    }

    /// Signed milliseconds; inverse of [`PollInterval::from_millis`].
    #[must_use]
    pub fn as_millis(self) -> i64 {
        match self {
            Self::Never => -1,
            Self::Once => 0,
            Self::Every(d) => i64::try_from(d.as_millis()).unwrap_or(i64::MAX),
        }
    }

    /// Canonical form: a zero period fires once.
    #[must_use]
    pub fn normalized(self) -> Self {
        match self {
            Self::Every(d) if d.is_zero() => Self::Once,
            other => other,
        }
    }

    /// The repeat period, if the loop repeats.
    #[must_use]
    pub fn period(self) -> Option<Duration> {
        match self.normalized() {
            Self::Every(d) => Some(d),
            _ => None,
        }
    }

    /// Returns `true` unless the loop is disabled.
    #[must_use]
    pub fn is_enabled(self) -> bool {
        !matches!(self, Self::Never)
    }

    fn parse(text: &str) -> Result<Self, String> {
        let text = text.trim();
        match text.to_ascii_lowercase().as_str() {
            "never" | "off" => return Ok(Self::Never),
            "once" => return Ok(Self::Once),
            _ => {}
        }
        if let Ok(millis) = text.parse::<i64>() {
            return Ok(Self::from_millis(millis));
        }
        let duration = humantime::parse_duration(text)
            .map_err(|e| format!("invalid interval '{text}': {e}"))?;
        Ok(Self::from(duration))
    }
}

impl From<Duration> for PollInterval {
    fn from(value: Duration) -> Self {
        Self::Every(value).normalized()
    }
}

impl fmt::Display for PollInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Never => f.write_str("never"),
            Self::Once => f.write_str("once"),
            Self::Every(d) => write!(f, "{}", humantime::format_duration(*d)),
        }
    }
}

impl std::str::FromStr for PollInterval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for PollInterval {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PollInterval {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Millis(i64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Millis(m) => Ok(Self::from_millis(m)),
            Raw::Text(t) => Self::parse(&t).map_err(serde::de::Error::custom),
        }
    }
}

/// Options fixed at client construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientOptions {
    /// Liveness probe schedule.
    pub check_connected_every: PollInterval,

    /// Reconnect attempt schedule.
    pub reconnect_every: PollInterval,

    /// Resource listing refresh schedule.
    pub refresh_every: PollInterval,

    /// Upper bound on a single dial.
    #[serde(with = "humantime_serde")]
    pub dial_timeout: Duration,

    /// Upper bound on a single RPC issued by the background loops.
    #[serde(with = "humantime_serde")]
    pub rpc_timeout: Duration,

    /// Health probes per liveness tick before giving up.
    pub liveness_attempts: u32,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            check_connected_every: PollInterval::Never,
            reconnect_every: PollInterval::Never,
            refresh_every: PollInterval::Once,
            dial_timeout: Duration::from_secs(20),
            rpc_timeout: Duration::from_secs(5),
            liveness_attempts: 3,
        }
    }
}

impl ClientOptions {
    /// Schedule used by long-running clients: probe and refresh every 10s,
    /// retry the dial every second.
    #[must_use]
    pub fn persistent() -> Self {
        Self {
            check_connected_every: PollInterval::Every(Duration::from_secs(10)),
            reconnect_every: PollInterval::Every(Duration::from_secs(1)),
            refresh_every: PollInterval::Every(Duration::from_secs(10)),
            ..Self::default()
        }
    }

    /// Set the liveness schedule.
    #[must_use]
    pub fn with_check_connected_every(mut self, interval: PollInterval) -> Self {
        self.check_connected_every = interval;
        self
    }

    /// Set the reconnect schedule.
    #[must_use]
    pub fn with_reconnect_every(mut self, interval: PollInterval) -> Self {
        self.reconnect_every = interval;
        self
    }

    /// Set the refresh schedule.
    #[must_use]
    pub fn with_refresh_every(mut self, interval: PollInterval) -> Self {
        self.refresh_every = interval;
        self
    }

    /// Set the dial timeout.
    #[must_use]
    pub fn with_dial_timeout(mut self, timeout: Duration) -> Self {
        self.dial_timeout = timeout;
        self
    }

    /// Set the background RPC timeout.
    #[must_use]
    pub fn with_rpc_timeout(mut self, timeout: Duration) -> Self {
        self.rpc_timeout = timeout;
        self
    }

    /// Timeout for one health probe: the RPC timeout, capped by the
    /// liveness period so a probe never outlives its tick.
    #[must_use]
    pub fn probe_timeout(&self) -> Duration {
        match self.check_connected_every.period() {
            Some(period) => self.rpc_timeout.min(period),
            None => self.rpc_timeout,
        }
    }

    /// Validate option values.
    pub fn validate(&self) -> Result<(), String> {
        if self.dial_timeout.is_zero() {
            return Err("dial_timeout must be positive".to_string());
        }
        if self.rpc_timeout.is_zero() {
            return Err("rpc_timeout must be positive".to_string());
        }
        if self.liveness_attempts == 0 {
            return Err("liveness_attempts must be at least 1".to_string());
        }
        Ok(())
    }
}
