//! Client error types.

use thiserror::Error;

use crate::connection::AddressError;
use crate::resource::ResourceName;

/// Result type alias using ClientError.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur when using the robot client.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The robot could not be dialed. Retried by the reconnect loop.
    #[error("Failed to dial {address}: {message}")]
    Dial {
        /// Address that was dialed.
        address: String,
        /// Transport-level failure description.
        message: String,
    },

    /// A call was attempted while the client is disconnected.
    #[error("Not connected to remote robot at {address}")]
    Unavailable {
        /// Address of the remote robot.
        address: String,
    },

    /// Resource name absent from the current resource snapshot.
    #[error("Resource not found: {0}")]
    NotFound(ResourceName),

    /// The resource exists but is of a different subtype than requested.
    #[error("Resource {name} is a {actual}, not a {expected}")]
    WrongKind {
        /// Requested resource.
        name: ResourceName,
        /// Subtype the caller asked for.
        expected: &'static str,
        /// Subtype held by the snapshot.
        actual: String,
    },

    /// gRPC status error (the remote call itself failed).
    #[error("gRPC status error: {0}")]
    Rpc(#[from] tonic::Status),

    /// gRPC transport error (connection failed, TLS error, etc.).
    #[error("gRPC transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    /// Timeout waiting for operation.
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// The client has been closed.
    #[error("Robot client is closed")]
    Closed,

    /// Invalid robot address.
    #[error(transparent)]
    InvalidAddress(#[from] AddressError),

    /// Client options failed validation.
    #[error("Invalid client options: {0}")]
    InvalidOptions(String),

    /// Resource name failed validation.
    #[error("Invalid resource name: {0}")]
    InvalidResourceName(String),

    /// The transport answered a call with a reply of the wrong shape.
    #[error("Unexpected reply to {method}")]
    UnexpectedReply {
        /// Method path of the call.
        method: &'static str,
    },
}

impl ClientError {
    /// Returns `true` for failures that mean the transport itself is gone,
    /// as opposed to the remote rejecting a single request.
    #[must_use]
    pub fn is_transport_failure(&self) -> bool {
        match self {
            Self::Dial { .. } | Self::Unavailable { .. } | Self::Transport(_) | Self::Closed => {
                true
            }
            Self::Rpc(status) => status.code() == tonic::Code::Unavailable,
            _ => false,
        }
    }
}

/// Turn an error into a short, actionable message for terminal output.
///
/// Structured variants get a fixed hint; transport failures are matched on
/// the text tonic and hyper produce.
#[must_use]
pub fn friendly_error_message(error: &ClientError) -> String {
    match error {
        ClientError::Unavailable { address } => {
            return format!("Robot at {address} is not reachable right now. The client keeps retrying if reconnects are enabled.");
        }
        ClientError::NotFound(name) => {
            return format!("The robot has no resource named {name}. Run `robolink resources` to list them.");
        }
        ClientError::Closed => return "The client was already closed.".into(),
        ClientError::InvalidAddress(_) => {
            return "Invalid address format. Use host:port or http://host:port.".into();
        }
        _ => {}
    }

    let text = error.to_string();
    let lower = text.to_lowercase();
    if lower.contains("connection refused") {
        return "Robot server not running or not listening on that port.".into();
    }
    if lower.contains("dns") || lower.contains("resolve") || lower.contains("no such host") {
        return "Cannot resolve hostname. Check the address or network connection.".into();
    }
    if lower.contains("timed out") || lower.contains("timeout") {
        return "Connection timed out. The robot may be busy or unreachable.".into();
    }
    if lower.contains("connection reset") {
        return "Connection was reset. The robot server may have restarted.".into();
    }
    if lower.contains("unreachable") || lower.contains("network is down") {
        return "Network unreachable. Check your network connection.".into();
    }
    if lower.contains("certificate") || lower.contains("tls") || lower.contains("ssl") {
        return "TLS/certificate error. Check that the robot is served over the expected scheme."
            .into();
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_failure_classification() {
        let unavailable = ClientError::Unavailable {
            address: "http://robot:8080/".into(),
        };
        assert!(unavailable.is_transport_failure());
        assert!(ClientError::Rpc(tonic::Status::unavailable("gone")).is_transport_failure());

        assert!(!ClientError::Rpc(tonic::Status::internal("boom")).is_transport_failure());
        assert!(!ClientError::Timeout("health check".into()).is_transport_failure());
        assert!(!ClientError::NotFound(ResourceName::component("arm", "arm1")).is_transport_failure());
    }

    #[test]
    fn test_error_display() {
        let err = ClientError::Unavailable {
            address: "http://robot:8080/".into(),
        };
        assert_eq!(
            err.to_string(),
            "Not connected to remote robot at http://robot:8080/"
        );

        let err = ClientError::NotFound(ResourceName::component("arm", "arm1"));
        assert_eq!(err.to_string(), "Resource not found: rdk:component:arm/arm1");
    }

    #[test]
    fn test_friendly_messages() {
        let refused = ClientError::Dial {
            address: "http://robot:8080/".into(),
            message: "tcp connect error: Connection refused (os error 111)".into(),
        };
        assert!(friendly_error_message(&refused).contains("not running"));

        let timeout = ClientError::Dial {
            address: "http://robot:8080/".into(),
            message: "timed out after 20s".into(),
        };
        assert!(friendly_error_message(&timeout).contains("timed out"));

        let rpc = ClientError::Rpc(tonic::Status::internal("motor stalled"));
        assert!(friendly_error_message(&rpc).contains("motor stalled"));
        assert!(friendly_error_message(&ClientError::Closed).contains("closed"));
    }
}
