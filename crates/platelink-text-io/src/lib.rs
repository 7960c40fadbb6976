//! Serial transaction engine for the Cytomat plate shuttle text protocol.
//!
//! Commands and replies are carriage-return terminated ASCII. One
//! [`TransactionEngine`] owns the channel and runs exactly one
//! command/response exchange at a time, whichever thread calls it.
//!
//! # Architecture
//!
//! - [`protocol`] -- framing and reply classification, no I/O
//! - [`engine`] -- the locked write-then-read transaction and the action
//!   and status command helpers built on it
//! - [`builder`] -- fluent construction over a serial port or any
//!   [`Channel`](platelink_core::Channel)

pub mod builder;
pub mod engine;
pub mod protocol;

pub use builder::EngineBuilder;
pub use engine::TransactionEngine;
pub use protocol::{ActionReply, StatusQuery};
