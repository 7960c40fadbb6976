//! Channel implementations for platelink.
//!
//! This crate provides the concrete [`Channel`](platelink_core::Channel)
//! used to talk to real hardware:
//!
//! - [`SerialChannel`]: USB virtual COM ports and RS-232 serial connections
//!
//! # Example
//!
//! ```no_run
//! use platelink_core::Channel;
//! use platelink_transport::SerialChannel;
//! use std::time::Duration;
//!
//! # fn example() -> platelink_core::Result<()> {
//! let mut channel = SerialChannel::connect("/dev/ttyUSB0", Duration::from_secs(1))?;
//! channel.write_all(b"ch:bs\r")?;
//! # Ok(())
//! # }
//! ```

pub mod serial;

pub use serial::{
    DataBits, FlowControl, Parity, SerialChannel, SerialConfig, StopBits, available_ports,
};
