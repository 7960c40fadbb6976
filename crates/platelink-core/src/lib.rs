//! platelink-core: Core traits, types, and error definitions for platelink.
//!
//! This crate defines the device-agnostic pieces shared by every platelink
//! crate. Callers that compose their own command vocabularies depend on
//! these types without pulling in a concrete transport.
//!
//! # Key types
//!
//! - [`Channel`] -- blocking byte-level link to a device
//! - [`DeviceStatus`] / [`DeviceError`] -- decoded `ok` / `er` payloads
//! - [`Error`] / [`Result`] -- error handling

pub mod channel;
pub mod error;
pub mod status;

// Re-export key types at crate root for ergonomic `use platelink_core::*`.
pub use channel::Channel;
pub use error::{CommunicationError, Error, Result, TimeoutCause};
pub use status::{
    DeviceError, DeviceStatus, ErrorCodeBase, ErrorCodeTable, NoDescriptions,
    ParseErrorCodeBaseError, ParseErrorCodeError, ParseStatusError, StaticErrorTable,
};
