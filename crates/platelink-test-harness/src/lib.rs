//! platelink-test-harness: Test utilities for platelink.
//!
//! This crate provides [`MockChannel`] for deterministic unit testing of the
//! transaction engine and of caller-side command vocabularies without real
//! plate shuttle hardware.

pub mod mock_serial;

pub use mock_serial::MockChannel;
