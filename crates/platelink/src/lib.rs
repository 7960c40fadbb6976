//! # platelink -- serial transactions for Cytomat plate shuttles
//!
//! `platelink` drives the carriage-return framed ASCII protocol spoken by
//! Cytomat-style automated incubators and plate hotels over a serial line.
//! Every exchange is one command followed by one response, and a single
//! [`TransactionEngine`] guarantees that exchanges never interleave, no
//! matter how many threads share it.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::time::Duration;
//! use platelink::EngineBuilder;
//!
//! fn main() -> anyhow::Result<()> {
//!     let engine = EngineBuilder::new()
//!         .serial_port("/dev/ttyUSB0")
//!         .timeout(Duration::from_millis(500))
//!         .build()?;
//!
//!     // Action command: "ok <status>" or "er <code>".
//!     let status = engine.issue_action_command("ll:in")?;
//!     println!("status register: {status}");
//!
//!     // Status query: the reply echoes the two-letter tag.
//!     let busy = engine.issue_status_command("ch:bs")?;
//!     println!("busy flags: {busy}");
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! | Crate                     | Purpose                                         |
//! |---------------------------|-------------------------------------------------|
//! | `platelink-core`          | [`Channel`] trait, [`Error`], status and error types |
//! | `platelink-transport`     | [`SerialChannel`](serial::SerialChannel)        |
//! | `platelink-text-io`       | Framing, [`TransactionEngine`], [`EngineBuilder`] |
//! | `platelink-test-harness`  | `MockChannel` for tests without hardware        |
//! | **`platelink`**           | This facade crate -- re-exports everything      |
//!
//! ## Errors
//!
//! Every operation returns [`Result`]. Distinguish failures by variant:
//!
//! - [`Error::Timeout`]: the lock, a write, or a read ran out of time
//! - [`Error::Communication`]: stale input, a non-ASCII reply, or an
//!   `er <code>` from the device (see [`Error::device_error`])
//! - [`Error::UnexpectedResponse`]: the reply had the wrong shape
//! - [`Error::InvalidCommand`]: rejected before anything was sent

pub use platelink_core::*;
pub use platelink_text_io::{ActionReply, EngineBuilder, StatusQuery, TransactionEngine};

/// Frame encoding and reply classification.
///
/// Pure functions; useful for logging tools and for tests that want to
/// check classification without an engine.
pub mod protocol {
    pub use platelink_text_io::protocol::*;
}

/// Serial port channel.
///
/// Provides [`SerialChannel`](serial::SerialChannel), its
/// [`SerialConfig`](serial::SerialConfig), and
/// [`available_ports`](serial::available_ports) for port discovery.
pub mod serial {
    pub use platelink_transport::*;
}
