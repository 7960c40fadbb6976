//! Error types for platelink.
//!
//! All fallible operations across the library return [`Result<T>`], which
//! uses [`Error`] as the error type. Every variant carries enough context
//! (the command sent, the bytes seen, the device code) to diagnose a failed
//! transaction without inspecting engine internals.

use std::fmt;
use std::time::Duration;

use crate::status::DeviceError;

/// The error type for all platelink operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A lock acquisition, write, or read exceeded the configured timeout.
    #[error("timeout: {0}")]
    Timeout(TimeoutCause),

    /// The exchange violated the framing protocol, or the device reported
    /// an error code.
    #[error("communication error: {0}")]
    Communication(CommunicationError),

    /// The response did not have the shape the caller asked for.
    #[error("unexpected response: expected {expected}, got {response:?}")]
    UnexpectedResponse {
        /// Description of the accepted shape(s), e.g. `prefix "bs"`.
        expected: String,
        /// The raw response as received.
        response: String,
    },

    /// The caller passed a command that cannot be sent as given. Raised
    /// before any I/O takes place.
    #[error("invalid command: {0}")]
    InvalidCommand(String),

    /// An invalid configuration value was passed to a builder.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A transport-level error (serial port could not be opened, etc.).
    #[error("transport error: {0}")]
    Transport(String),

    /// The channel is closed.
    #[error("not connected")]
    NotConnected,

    /// The connection to the device was lost unexpectedly.
    #[error("connection lost")]
    ConnectionLost,

    /// An underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for every [`Error::Timeout`], whatever stage timed out.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout(_))
    }

    /// The device error carried by an `er <code>` reply, if this is one.
    pub fn device_error(&self) -> Option<&DeviceError> {
        match self {
            Error::Communication(CommunicationError::Device(err)) => Some(err),
            _ => None,
        }
    }
}

/// Which stage of a transaction ran out of time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeoutCause {
    /// Another transaction held the channel for longer than the timeout.
    Lock {
        /// How long this caller waited.
        waited: Duration,
    },
    /// The command frame could not be written in time.
    Write {
        /// The command being sent.
        command: String,
    },
    /// A single-byte read returned nothing before the terminator arrived.
    Read {
        /// The command that was sent.
        command: String,
        /// Bytes received before the read stalled (possibly empty).
        received: Vec<u8>,
    },
}

impl fmt::Display for TimeoutCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeoutCause::Lock { waited } => {
                write!(f, "channel busy, gave up after {waited:?}")
            }
            TimeoutCause::Write { command } => {
                write!(f, "writing command {command:?}")
            }
            TimeoutCause::Read { command, received } if received.is_empty() => {
                write!(f, "no response to command {command:?}")
            }
            TimeoutCause::Read { command, received } => write!(
                f,
                "response to command {command:?} stalled after {} byte(s): {:?}",
                received.len(),
                String::from_utf8_lossy(received)
            ),
        }
    }
}

/// Protocol-level failures detected before or instead of a usable reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommunicationError {
    /// Unread bytes were waiting in the input buffer when a transaction
    /// started. Nothing was written.
    StaleInput {
        /// Number of bytes waiting.
        pending: usize,
    },
    /// The device answered `er <code>`.
    Device(DeviceError),
    /// The response contained bytes outside the ASCII range.
    NonAsciiResponse {
        /// The command that was sent.
        command: String,
        /// The raw response, without the terminator.
        raw: Vec<u8>,
    },
}

impl fmt::Display for CommunicationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommunicationError::StaleInput { pending } => write!(
                f,
                "stale data in the input buffer ({pending} unread byte(s))"
            ),
            CommunicationError::Device(err) => fmt::Display::fmt(err, f),
            CommunicationError::NonAsciiResponse { command, raw } => write!(
                f,
                "non-ASCII response to command {command:?}: {raw:02X?}"
            ),
        }
    }
}

/// A convenience `Result` alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::ErrorCodeBase;

    #[test]
    fn error_display_lock_timeout() {
        let e = Error::Timeout(TimeoutCause::Lock {
            waited: Duration::from_millis(250),
        });
        assert_eq!(e.to_string(), "timeout: channel busy, gave up after 250ms");
        assert!(e.is_timeout());
    }

    #[test]
    fn error_display_read_timeout_without_data() {
        let e = Error::Timeout(TimeoutCause::Read {
            command: "ch:bs".into(),
            received: Vec::new(),
        });
        assert_eq!(e.to_string(), "timeout: no response to command \"ch:bs\"");
    }

    #[test]
    fn error_display_read_timeout_with_partial_data() {
        let e = Error::Timeout(TimeoutCause::Read {
            command: "ch:bs".into(),
            received: b"bs 0".to_vec(),
        });
        let text = e.to_string();
        assert!(text.contains("ch:bs"));
        assert!(text.contains("4 byte(s)"));
        assert!(text.contains("bs 0"));
    }

    #[test]
    fn error_display_stale_input() {
        let e = Error::Communication(CommunicationError::StaleInput { pending: 3 });
        assert_eq!(
            e.to_string(),
            "communication error: stale data in the input buffer (3 unread byte(s))"
        );
        assert!(!e.is_timeout());
    }

    #[test]
    fn error_display_device_error() {
        let dev = DeviceError::new(0x1A, ErrorCodeBase::Hex, None);
        let e = Error::Communication(CommunicationError::Device(dev.clone()));
        assert_eq!(e.to_string(), "communication error: device error 0x1A");
        assert_eq!(e.device_error(), Some(&dev));
    }

    #[test]
    fn error_display_non_ascii() {
        let e = Error::Communication(CommunicationError::NonAsciiResponse {
            command: "mv:ts".into(),
            raw: vec![0x6F, 0xFF],
        });
        assert_eq!(
            e.to_string(),
            "communication error: non-ASCII response to command \"mv:ts\": [6F, FF]"
        );
        assert_eq!(e.device_error(), None);
    }

    #[test]
    fn error_display_unexpected_response() {
        let e = Error::UnexpectedResponse {
            expected: "prefix \"bs\"".into(),
            response: "xyz".into(),
        };
        assert_eq!(
            e.to_string(),
            "unexpected response: expected prefix \"bs\", got \"xyz\""
        );
    }

    #[test]
    fn error_display_invalid_command() {
        let e = Error::InvalidCommand("missing 'ch:' prefix".into());
        assert_eq!(e.to_string(), "invalid command: missing 'ch:' prefix");
    }

    #[test]
    fn error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe broken");
        let e: Error = io_err.into();
        assert!(matches!(e, Error::Io(_)));
        assert!(e.to_string().contains("pipe broken"));
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}
        assert_send::<Error>();
        assert_sync::<Error>();
    }

    #[test]
    fn error_implements_std_error() {
        fn assert_std_error<T: std::error::Error>() {}
        assert_std_error::<Error>();
    }
}
