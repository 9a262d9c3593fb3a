//! Robot address configuration and URL normalization.
//!
//! - [`RobotAddress`]: validated robot URL with source tracking
//! - [`AddressSource`]: where the address configuration came from
//! - [`AddressError`]: validation errors
//!
//! # Address Resolution Precedence
//!
//! Addresses are resolved in this order (highest priority first):
//! 1. Explicit input (command line flag, caller argument)
//! 2. Persisted from a previous session (via caller-provided string)
//! 3. `ROBOLINK_ROBOT_URL` environment variable
//! 4. Default: `http://127.0.0.1:8080`
//!
//! # Example
//!
//! ```
//! use robolink_client::connection::{AddressSource, RobotAddress};
//!
//! let addr = RobotAddress::parse("10.1.1.20:8080", AddressSource::UserInput)?;
//! assert_eq!(addr.as_str(), "http://10.1.1.20:8080/");
//! assert!(!addr.is_tls());
//! # Ok::<(), robolink_client::connection::AddressError>(())
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use url::Url;

/// Environment variable consulted by [`resolve_address`].
pub const ROBOT_URL_ENV: &str = "ROBOLINK_ROBOT_URL";

/// Default gRPC port of a robot server.
pub const DEFAULT_ROBOT_PORT: u16 = 8080;

/// Default robot address when no configuration is provided.
pub const DEFAULT_ROBOT_URL: &str = "http://127.0.0.1:8080";

/// Source of the robot address configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AddressSource {
    /// Hardcoded default
    Default,
    /// Loaded from `ROBOLINK_ROBOT_URL`
    Environment,
    /// Restored from a previous session or a config file
    Persisted,
    /// Given explicitly by the caller
    UserInput,
}

impl AddressSource {
    /// Returns the priority for address resolution (higher = preferred).
    #[must_use]
    pub fn priority(self) -> u8 {
        match self {
            Self::Default => 0,
            Self::Environment => 1,
            Self::Persisted => 2,
            Self::UserInput => 3,
        }
    }

    /// Returns a short label for log output.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Environment => "env",
            Self::Persisted => "saved",
            Self::UserInput => "user",
        }
    }
}

/// Validated robot address with metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RobotAddress {
    /// The normalized URL (always has scheme and port)
    url: String,
    /// Where this address came from
    source: AddressSource,
    /// Original input string
    original: String,
}

impl RobotAddress {
    /// Parse and normalize a robot URL.
    ///
    /// Accepts bare `host:port`, URLs without a port and IPv6 literals.
    pub fn parse(input: &str, source: AddressSource) -> Result<Self, AddressError> {
        let normalized = normalize_url(input)?;
        Ok(Self {
            url: normalized.to_string(),
            source,
            original: input.to_string(),
        })
    }

    /// Returns the normalized URL string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.url
    }

    /// Returns where this address came from.
    #[must_use]
    pub fn source(&self) -> AddressSource {
        self.source
    }

    /// Returns the original input string before normalization.
    #[must_use]
    pub fn original(&self) -> &str {
        &self.original
    }

    /// Returns `true` if this address uses TLS (https scheme).
    #[must_use]
    pub fn is_tls(&self) -> bool {
        self.url.starts_with("https://")
    }
}

impl fmt::Display for RobotAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

impl std::str::FromStr for RobotAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s, AddressSource::UserInput)
    }
}

/// URL validation error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    /// Input was empty or whitespace-only
    #[error("Address cannot be empty")]
    EmptyInput,
    /// URL parsing failed
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    /// No host was found in the URL
    #[error("URL must include a host")]
    MissingHost,
    /// Port could not be set
    #[error("Invalid port: {0}")]
    InvalidPort(String),
    /// Unsupported URL scheme (only http/https allowed)
    #[error("Unsupported scheme '{0}' (use http or https)")]
    UnsupportedScheme(String),
}

/// Normalize a robot URL string.
///
/// - Adds `http://` scheme if missing
/// - Adds the default port (8080) if missing
/// - Trims whitespace
///
/// ```
/// use robolink_client::connection::normalize_url;
///
/// let url = normalize_url("192.168.1.100:8081")?;
/// assert_eq!(url.as_str(), "http://192.168.1.100:8081/");
///
/// let url = normalize_url("https://robot.local")?;
/// assert_eq!(url.as_str(), "https://robot.local:8080/");
/// # Ok::<(), robolink_client::connection::AddressError>(())
/// ```
pub fn normalize_url(input: &str) -> Result<Url, AddressError> {
    let input = input.trim();

    if input.is_empty() {
        return Err(AddressError::EmptyInput);
    }

    let with_scheme = if input.contains("://") {
        input.to_string()
    } else {
        format!("http://{input}")
    };

    let mut url = Url::parse(&with_scheme).map_err(|e| AddressError::InvalidUrl(e.to_string()))?;

    let scheme = url.scheme().to_lowercase();
    if scheme != "http" && scheme != "https" {
        return Err(AddressError::UnsupportedScheme(scheme));
    }

    if url.host().is_none() {
        return Err(AddressError::MissingHost);
    }

    if url.port().is_none() {
        url.set_port(Some(DEFAULT_ROBOT_PORT))
            .map_err(|()| AddressError::InvalidPort("Cannot set port on this URL".to_string()))?;
    }

    Ok(url)
}

/// Resolve the robot address from multiple sources with precedence.
///
/// Never fails: invalid candidates are skipped and the default is used last.
pub fn resolve_address(user_input: Option<&str>, persisted_addr: Option<&str>) -> RobotAddress {
    if let Some(input) = user_input {
        if !input.trim().is_empty() {
            if let Ok(addr) = RobotAddress::parse(input, AddressSource::UserInput) {
                return addr;
            }
            tracing::warn!(input, "Ignoring invalid robot address");
        }
    }

    if let Some(persisted) = persisted_addr {
        if let Ok(addr) = RobotAddress::parse(persisted, AddressSource::Persisted) {
            return addr;
        }
    }

    if let Ok(env_url) = std::env::var(ROBOT_URL_ENV) {
        if let Ok(addr) = RobotAddress::parse(&env_url, AddressSource::Environment) {
            return addr;
        }
    }

    default_address()
}

/// The built-in default address.
#[must_use]
pub fn default_address() -> RobotAddress {
    RobotAddress {
        url: format!("{DEFAULT_ROBOT_URL}/"),
        source: AddressSource::Default,
        original: DEFAULT_ROBOT_URL.to_string(),
    }
}
