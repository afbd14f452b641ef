//! Error types for assembling and sending email.

use thiserror::Error;

/// Errors that can occur while preparing or delivering a message.
#[derive(Debug, Error)]
pub enum Error {
    /// Reading an attachment or other local file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The message could not be encoded.
    #[error("Encoding error: {0}")]
    Encoding(#[from] mailwright_mime::Error),

    /// Delivery failed.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Configuration could not be parsed or is inconsistent.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A blocking send was attempted on a thread driving an async runtime.
    #[error("Blocking send called from within an async runtime; use send instead")]
    BlockingInRuntime,
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure of one phase of an SMTP delivery.
#[derive(Debug, Error)]
pub enum TransportError {
    /// TCP connection, greeting or EHLO failed.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// TLS handshake failed or STARTTLS was refused.
    #[error("TLS failed: {0}")]
    Tls(String),

    /// Authentication failed.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The server rejected the envelope or the message.
    #[error("Send failed: {0}")]
    Send(String),

    /// Sender or recipient is not a usable address.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_display() {
        let err = Error::from(TransportError::Auth("SMTP error 535: bad credentials".into()));
        assert_eq!(
            err.to_string(),
            "Transport error: Authentication failed: SMTP error 535: bad credentials"
        );
    }

    #[test]
    fn test_json_error_is_config() {
        let err = Error::from(serde_json::from_str::<u32>("nope").unwrap_err());
        assert!(matches!(err, Error::Config(_)));
    }
}
