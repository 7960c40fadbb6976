//! Serial port channel for plate shuttle communication.
//!
//! This module provides [`SerialChannel`], which implements the [`Channel`]
//! trait for USB virtual COM ports and physical RS-232 connections.
//!
//! Cytomat incubators and plate hotels talk 9600 baud, 8 data bits, 1 stop
//! bit, no parity. The same timeout bounds every read and every write.
//!
//! # Example
//!
//! ```no_run
//! use platelink_core::Channel;
//! use platelink_transport::SerialChannel;
//! use std::time::Duration;
//!
//! # fn example() -> platelink_core::Result<()> {
//! let mut channel = SerialChannel::connect("/dev/ttyACM0", Duration::from_millis(500))?;
//! channel.write_all(b"ch:bs\r")?;
//!
//! let mut byte = [0u8; 1];
//! let n = channel.read(&mut byte)?;
//! # Ok(())
//! # }
//! ```

use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use platelink_core::channel::Channel;
use platelink_core::error::{Error, Result};
use serialport::{ClearBuffer, SerialPort};

/// Baud rate of the Cytomat device family.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Serial port configuration.
///
/// Defaults match the plate shuttle framing:
/// - 9600 baud
/// - 8 data bits
/// - 1 stop bit
/// - No parity
/// - No flow control
/// - 1 second read/write timeout
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Baud rate
    pub baud_rate: u32,
    /// Number of data bits
    pub data_bits: DataBits,
    /// Number of stop bits
    pub stop_bits: StopBits,
    /// Parity checking
    pub parity: Parity,
    /// Flow control
    pub flow_control: FlowControl,
    /// Applied to both reads and writes.
    pub timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            data_bits: DataBits::Eight,
            stop_bits: StopBits::One,
            parity: Parity::None,
            flow_control: FlowControl::None,
            timeout: Duration::from_secs(1),
        }
    }
}

/// Number of data bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataBits {
    Five,
    Six,
    Seven,
    Eight,
}

impl From<DataBits> for serialport::DataBits {
    fn from(bits: DataBits) -> Self {
        match bits {
            DataBits::Five => serialport::DataBits::Five,
            DataBits::Six => serialport::DataBits::Six,
            DataBits::Seven => serialport::DataBits::Seven,
            DataBits::Eight => serialport::DataBits::Eight,
        }
    }
}

/// Number of stop bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopBits {
    One,
    Two,
}

impl From<StopBits> for serialport::StopBits {
    fn from(bits: StopBits) -> Self {
        match bits {
            StopBits::One => serialport::StopBits::One,
            StopBits::Two => serialport::StopBits::Two,
        }
    }
}

/// Parity checking mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    None,
    Odd,
    Even,
}

impl From<Parity> for serialport::Parity {
    fn from(parity: Parity) -> Self {
        match parity {
            Parity::None => serialport::Parity::None,
            Parity::Odd => serialport::Parity::Odd,
            Parity::Even => serialport::Parity::Even,
        }
    }
}

/// Flow control mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowControl {
    None,
    Software,
    Hardware,
}

impl From<FlowControl> for serialport::FlowControl {
    fn from(flow: FlowControl) -> Self {
        match flow {
            FlowControl::None => serialport::FlowControl::None,
            FlowControl::Software => serialport::FlowControl::Software,
            FlowControl::Hardware => serialport::FlowControl::Hardware,
        }
    }
}

/// List the names of the serial ports present on this machine.
pub fn available_ports() -> Result<Vec<String>> {
    let ports = serialport::available_ports()
        .map_err(|e| Error::Transport(format!("Failed to enumerate serial ports: {e}")))?;
    Ok(ports.into_iter().map(|p| p.port_name).collect())
}

/// Serial port channel to a plate shuttle device.
///
/// Holds the port path and configuration so the port can be closed and
/// re-opened without rebuilding the channel.
pub struct SerialChannel {
    /// The underlying serial port, `None` while closed
    port: Option<Box<dyn SerialPort>>,
    /// Port name for logging/debugging
    port_name: String,
    config: SerialConfig,
}

impl SerialChannel {
    /// Create a channel for `port` without opening it.
    pub fn new(port: &str, config: SerialConfig) -> Self {
        Self {
            port: None,
            port_name: port.to_string(),
            config,
        }
    }

    /// Open a serial port with the device family's fixed framing and the
    /// given read/write timeout.
    ///
    /// # Arguments
    ///
    /// * `port` - Serial port path (e.g., "/dev/ttyACM0" on Linux, "COM3" on Windows)
    /// * `timeout` - Bound on every read and write
    pub fn connect(port: &str, timeout: Duration) -> Result<Self> {
        let config = SerialConfig {
            timeout,
            ..Default::default()
        };
        Self::connect_with_config(port, config)
    }

    /// Open a serial port with full configuration control.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use platelink_transport::{SerialChannel, SerialConfig};
    /// # use std::time::Duration;
    /// # fn example() -> platelink_core::Result<()> {
    /// let config = SerialConfig {
    ///     baud_rate: 19200,
    ///     timeout: Duration::from_millis(250),
    ///     ..Default::default()
    /// };
    /// let channel = SerialChannel::connect_with_config("/dev/ttyUSB0", config)?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn connect_with_config(port: &str, config: SerialConfig) -> Result<Self> {
        let mut channel = Self::new(port, config);
        Channel::open(&mut channel)?;
        Ok(channel)
    }

    /// Get the name of the serial port.
    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// The configuration used when (re)opening the port.
    pub fn config(&self) -> &SerialConfig {
        &self.config
    }

    fn map_io_error(&self, e: std::io::Error, action: &str) -> Error {
        // Timeouts are expected and classified by the engine.
        if e.kind() == ErrorKind::TimedOut {
            tracing::trace!(port = %self.port_name, "Timed out trying to {action}");
        } else {
            tracing::error!(port = %self.port_name, error = %e, "Failed to {action}");
        }
        match e.kind() {
            ErrorKind::BrokenPipe | ErrorKind::NotConnected => Error::ConnectionLost,
            _ => Error::Io(e),
        }
    }
}

impl Channel for SerialChannel {
    fn write_all(&mut self, data: &[u8]) -> Result<()> {
        let port = self.port.as_mut().ok_or(Error::NotConnected)?;

        tracing::trace!(
            port = %self.port_name,
            bytes = data.len(),
            data = ?data,
            "Sending data"
        );

        let written = port.write_all(data).and_then(|()| port.flush());
        if let Err(e) = written {
            return Err(self.map_io_error(e, "send data"));
        }

        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let port = self.port.as_mut().ok_or(Error::NotConnected)?;

        match port.read(buf) {
            Ok(n) => {
                tracing::trace!(port = %self.port_name, bytes = n, data = ?&buf[..n], "Received data");
                Ok(n)
            }
            Err(e) if e.kind() == ErrorKind::TimedOut => {
                tracing::trace!(
                    port = %self.port_name,
                    timeout_ms = self.config.timeout.as_millis(),
                    "Timeout waiting for data"
                );
                Ok(0)
            }
            Err(e) => Err(self.map_io_error(e, "receive data")),
        }
    }

    fn bytes_to_read(&mut self) -> Result<usize> {
        let port = self.port.as_ref().ok_or(Error::NotConnected)?;
        let pending = port
            .bytes_to_read()
            .map_err(|e| Error::Transport(format!("Failed to query {}: {e}", self.port_name)))?;
        Ok(pending as usize)
    }

    fn clear_input(&mut self) -> Result<()> {
        let port = self.port.as_ref().ok_or(Error::NotConnected)?;
        port.clear(ClearBuffer::Input)
            .map_err(|e| Error::Transport(format!("Failed to clear {}: {e}", self.port_name)))?;
        tracing::debug!(port = %self.port_name, "Input buffer cleared");
        Ok(())
    }

    fn open(&mut self) -> Result<()> {
        if self.port.is_some() {
            return Ok(());
        }

        let config = &self.config;
        tracing::debug!(
            port = %self.port_name,
            baud_rate = config.baud_rate,
            data_bits = ?config.data_bits,
            stop_bits = ?config.stop_bits,
            parity = ?config.parity,
            flow_control = ?config.flow_control,
            timeout_ms = config.timeout.as_millis(),
            "Opening serial port"
        );

        let port = serialport::new(&self.port_name, config.baud_rate)
            .data_bits(config.data_bits.into())
            .stop_bits(config.stop_bits.into())
            .parity(config.parity.into())
            .flow_control(config.flow_control.into())
            .timeout(config.timeout)
            .open()
            .map_err(|e| {
                tracing::error!(port = %self.port_name, error = %e, "Failed to open serial port");
                Error::Transport(format!(
                    "Failed to open serial port {}: {}",
                    self.port_name, e
                ))
            })?;

        tracing::info!(port = %self.port_name, baud_rate = config.baud_rate, "Serial port opened");
        self.port = Some(port);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(mut port) = self.port.take() {
            tracing::debug!(port = %self.port_name, "Closing serial port");

            if let Err(e) = port.flush() {
                tracing::warn!(
                    port = %self.port_name,
                    error = %e,
                    "Failed to flush before closing (continuing anyway)"
                );
            }

            // Dropping the handle closes the OS port.
            tracing::info!(port = %self.port_name, "Serial port closed");
        }

        Ok(())
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    fn name(&self) -> &str {
        &self.port_name
    }
}

impl Drop for SerialChannel {
    fn drop(&mut self) {
        if self.port.is_some() {
            tracing::debug!(port = %self.port_name, "SerialChannel dropped, closing port");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_config_default() {
        let config = SerialConfig::default();
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.data_bits, DataBits::Eight);
        assert_eq!(config.stop_bits, StopBits::One);
        assert_eq!(config.parity, Parity::None);
        assert_eq!(config.flow_control, FlowControl::None);
        assert_eq!(config.timeout, Duration::from_secs(1));
    }

    #[test]
    fn test_data_bits_conversion() {
        assert_eq!(serialport::DataBits::from(DataBits::Five), serialport::DataBits::Five);
        assert_eq!(serialport::DataBits::from(DataBits::Eight), serialport::DataBits::Eight);
    }

    #[test]
    fn test_stop_bits_conversion() {
        assert_eq!(serialport::StopBits::from(StopBits::One), serialport::StopBits::One);
        assert_eq!(serialport::StopBits::from(StopBits::Two), serialport::StopBits::Two);
    }

    #[test]
    fn test_parity_conversion() {
        assert_eq!(serialport::Parity::from(Parity::None), serialport::Parity::None);
        assert_eq!(serialport::Parity::from(Parity::Odd), serialport::Parity::Odd);
        assert_eq!(serialport::Parity::from(Parity::Even), serialport::Parity::Even);
    }

    #[test]
    fn test_flow_control_conversion() {
        let _: serialport::FlowControl = FlowControl::None.into();
        let _: serialport::FlowControl = FlowControl::Software.into();
        let _: serialport::FlowControl = FlowControl::Hardware.into();
    }

    #[test]
    fn test_unopened_channel_is_not_connected() {
        let mut channel = SerialChannel::new("/dev/platelink-test-none", SerialConfig::default());
        assert!(!channel.is_open());
        assert_eq!(channel.name(), "/dev/platelink-test-none");

        let mut buf = [0u8; 1];
        assert!(matches!(channel.read(&mut buf), Err(Error::NotConnected)));
        assert!(matches!(channel.write_all(b"ch:bs\r"), Err(Error::NotConnected)));
        assert!(matches!(channel.bytes_to_read(), Err(Error::NotConnected)));
        assert!(matches!(channel.clear_input(), Err(Error::NotConnected)));
    }

    #[test]
    fn test_timeout_maps_to_io_timed_out() {
        let channel = SerialChannel::new("/dev/platelink-test-none", SerialConfig::default());
        let err = channel.map_io_error(std::io::Error::from(ErrorKind::TimedOut), "send data");
        match err {
            Error::Io(e) => assert_eq!(e.kind(), ErrorKind::TimedOut),
            other => panic!("expected Io(TimedOut), got {other:?}"),
        }
        let err = channel.map_io_error(std::io::Error::from(ErrorKind::BrokenPipe), "send data");
        assert!(matches!(err, Error::ConnectionLost));
    }

    #[test]
    fn test_close_unopened_is_noop() {
        let mut channel = SerialChannel::new("/dev/platelink-test-none", SerialConfig::default());
        assert!(channel.close().is_ok());
        assert!(!channel.is_open());
    }

    #[test]
    fn test_connect_missing_port_is_transport_error() {
        let result = SerialChannel::connect("/dev/platelink-test-none", Duration::from_millis(10));
        assert!(matches!(result, Err(Error::Transport(_))));
    }
}
