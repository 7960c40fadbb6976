//! EngineBuilder -- fluent builder for constructing [`TransactionEngine`] instances.
//!
//! Separates configuration from construction so that callers can set up
//! serial port parameters, the timeout and error-code decoding before the
//! port is opened.
//!
//! # Example
//!
//! ```no_run
//! use platelink_text_io::builder::EngineBuilder;
//! use std::time::Duration;
//!
//! # fn example() -> platelink_core::Result<()> {
//! let engine = EngineBuilder::new()
//!     .serial_port("/dev/ttyUSB0")
//!     .timeout(Duration::from_millis(500))
//!     .build()?;
//! let status = engine.issue_action_command("ll:in")?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use platelink_core::channel::Channel;
use platelink_core::error::{Error, Result};
use platelink_core::status::{ErrorCodeBase, ErrorCodeTable, NoDescriptions};
use platelink_transport::serial::{DEFAULT_BAUD_RATE, SerialChannel, SerialConfig};

use crate::engine::TransactionEngine;

/// Fluent builder for [`TransactionEngine`].
pub struct EngineBuilder {
    serial_port: Option<String>,
    baud_rate: u32,
    timeout: Duration,
    error_code_base: ErrorCodeBase,
    error_table: Box<dyn ErrorCodeTable>,
}

impl EngineBuilder {
    /// Create a builder with the defaults: 9600 baud, 1 s timeout, hex
    /// error codes, no error descriptions.
    pub fn new() -> Self {
        EngineBuilder {
            serial_port: None,
            baud_rate: DEFAULT_BAUD_RATE,
            timeout: Duration::from_secs(1),
            error_code_base: ErrorCodeBase::Hex,
            error_table: Box::new(NoDescriptions),
        }
    }

    /// Set the serial port path (e.g. `/dev/ttyUSB0` or `COM3`).
    pub fn serial_port(mut self, port: &str) -> Self {
        self.serial_port = Some(port.to_string());
        self
    }

    /// Override the baud rate (default: 9600).
    pub fn baud_rate(mut self, baud: u32) -> Self {
        self.baud_rate = baud;
        self
    }

    /// Set the timeout used for lock acquisition and for each read and
    /// write on the port (default: 1 s).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the radix of `er <code>` payloads (default: hex).
    pub fn error_code_base(mut self, base: ErrorCodeBase) -> Self {
        self.error_code_base = base;
        self
    }

    /// Attach descriptions to device error codes.
    pub fn error_table(mut self, table: impl ErrorCodeTable + 'static) -> Self {
        self.error_table = Box::new(table);
        self
    }

    fn validate(&self) -> Result<()> {
        if self.timeout.is_zero() {
            return Err(Error::InvalidParameter("timeout must be non-zero".into()));
        }
        if self.baud_rate == 0 {
            return Err(Error::InvalidParameter("baud_rate must be non-zero".into()));
        }
        Ok(())
    }

    /// Build a [`TransactionEngine`] with a caller-provided channel.
    ///
    /// This is the entry point for testing (pass a `MockChannel` from
    /// `platelink-test-harness`) and for callers that manage the channel
    /// themselves. The channel should already be open with read and write
    /// timeouts equal to [`timeout()`](Self::timeout).
    pub fn build_with_channel(self, channel: Box<dyn Channel>) -> Result<TransactionEngine> {
        self.validate()?;
        Ok(TransactionEngine::with_options(
            channel,
            self.timeout,
            self.error_code_base,
            self.error_table,
        ))
    }

    /// Open the serial port and build a [`TransactionEngine`] over it.
    ///
    /// Requires that [`serial_port()`](Self::serial_port) has been called.
    /// The port is opened 8N1 without flow control.
    pub fn build(self) -> Result<TransactionEngine> {
        self.validate()?;
        let port = self
            .serial_port
            .as_deref()
            .ok_or_else(|| Error::InvalidParameter("serial_port is required for build()".into()))?;

        let config = SerialConfig {
            baud_rate: self.baud_rate,
            timeout: self.timeout,
            ..SerialConfig::default()
        };
        let channel = SerialChannel::connect_with_config(port, config)?;
        self.build_with_channel(Box::new(channel))
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
