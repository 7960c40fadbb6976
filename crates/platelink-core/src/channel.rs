//! Channel trait for device communication.
//!
//! The [`Channel`] trait abstracts over the physical link to a plate shuttle.
//! The serial implementation lives in `platelink-transport`; the mock used
//! for deterministic testing lives in `platelink-test-harness`.
//!
//! The transaction engine in `platelink-text-io` operates on a `Channel`
//! rather than directly on a serial port, so framing and classification can
//! be tested without hardware.

use crate::error::Result;

/// Blocking, byte-oriented duplex link to a device.
///
/// A channel is configured with a read timeout and a write timeout when it
/// is opened. Framing (the carriage-return terminator) and mutual exclusion
/// are handled by the engine that consumes the channel, not here.
pub trait Channel: Send {
    /// Write all of `data`, blocking up to the write timeout.
    ///
    /// A write that does not complete in time returns
    /// [`Error::Io`](crate::error::Error::Io) with
    /// [`ErrorKind::TimedOut`](std::io::ErrorKind::TimedOut); the engine
    /// turns that into a timeout naming the command.
    fn write_all(&mut self, data: &[u8]) -> Result<()>;

    /// Read up to `buf.len()` bytes, blocking up to the read timeout.
    ///
    /// Returns `Ok(0)` when the timeout elapsed without any data arriving.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Number of received bytes buffered and not yet read.
    fn bytes_to_read(&mut self) -> Result<usize>;

    /// Discard every received byte not yet read.
    ///
    /// This is how a caller resynchronizes after a late or unsolicited
    /// reply; nothing else empties the input buffer.
    fn clear_input(&mut self) -> Result<()>;

    /// (Re)open the underlying resource. Opening an open channel is a no-op.
    fn open(&mut self) -> Result<()>;

    /// Release the underlying resource.
    ///
    /// After `close()`, I/O calls return
    /// [`Error::NotConnected`](crate::error::Error::NotConnected) until the
    /// channel is opened again.
    fn close(&mut self) -> Result<()>;

    /// Whether the channel is currently open.
    fn is_open(&self) -> bool;

    /// Identifier used in log output (e.g. the port path).
    fn name(&self) -> &str;
}
