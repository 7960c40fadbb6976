//! The serial transaction engine.
//!
//! [`TransactionEngine`] owns a [`Channel`] and turns it into a sequence of
//! independent command/response transactions. One transaction is:
//!
//! 1. acquire the channel lock, waiting at most the configured timeout
//! 2. refuse to start if unread bytes are already buffered
//! 3. write `command + "\r"` in one operation
//! 4. read one byte at a time until `\r`, each read bounded by the timeout
//! 5. decode the bytes before the terminator as ASCII
//!
//! The lock guard is dropped on every exit path, so a failed transaction
//! never blocks the next one. There is no retry and no automatic
//! resynchronization: after a timeout the channel state is undefined, and
//! the stale-input check at the start of the next transaction reports it.
//! Callers recover with [`TransactionEngine::clear_input`].
//!
//! The engine is `Send + Sync`; share it between threads with an `Arc`.
//! Concurrent calls are serialized in lock-acquisition order.

use std::io::ErrorKind;
use std::time::Duration;

use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, trace, warn};

use platelink_core::channel::Channel;
use platelink_core::error::{CommunicationError, Error, Result, TimeoutCause};
use platelink_core::status::{DeviceStatus, ErrorCodeBase, ErrorCodeTable, NoDescriptions};

use crate::protocol::{self, ActionReply, StatusQuery, TERMINATOR};

/// Request/response transaction engine over a single [`Channel`].
pub struct TransactionEngine {
    /// The channel, guarded for the full duration of each transaction.
    channel: Mutex<Box<dyn Channel>>,
    /// Bound on lock acquisition; the channel applies it to each read and write.
    timeout: Duration,
    error_code_base: ErrorCodeBase,
    error_table: Box<dyn ErrorCodeTable>,
}

impl TransactionEngine {
    /// Create an engine over an already-open channel.
    ///
    /// `timeout` should equal the read/write timeout the channel was opened
    /// with. Error codes are read as hex and carry no descriptions.
    pub fn new(channel: Box<dyn Channel>, timeout: Duration) -> Self {
        Self::with_options(channel, timeout, ErrorCodeBase::Hex, Box::new(NoDescriptions))
    }

    /// Create an engine with an explicit error-code radix and table.
    pub fn with_options(
        channel: Box<dyn Channel>,
        timeout: Duration,
        error_code_base: ErrorCodeBase,
        error_table: Box<dyn ErrorCodeTable>,
    ) -> Self {
        TransactionEngine {
            channel: Mutex::new(channel),
            timeout,
            error_code_base,
            error_table,
        }
    }

    /// The configured timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The radix used for `er <code>` payloads.
    pub fn error_code_base(&self) -> ErrorCodeBase {
        self.error_code_base
    }

    fn lock_channel(&self) -> Result<MutexGuard<'_, Box<dyn Channel>>> {
        self.channel.try_lock_for(self.timeout).ok_or_else(|| {
            warn!(timeout_ms = self.timeout.as_millis() as u64, "channel lock not acquired in time");
            Error::Timeout(TimeoutCause::Lock {
                waited: self.timeout,
            })
        })
    }

    /// Re-open the underlying channel.
    ///
    /// Waits for any in-flight transaction, bounded by the timeout.
    pub fn open(&self) -> Result<()> {
        let mut channel = self.lock_channel()?;
        debug!(port = %channel.name(), "opening channel");
        channel.open()
    }

    /// Close the underlying channel. Transactions fail with
    /// [`Error::NotConnected`] until [`open`](Self::open) is called.
    pub fn close(&self) -> Result<()> {
        let mut channel = self.lock_channel()?;
        debug!(port = %channel.name(), "closing channel");
        channel.close()
    }

    /// Whether the underlying channel is open.
    pub fn is_open(&self) -> Result<bool> {
        Ok(self.lock_channel()?.is_open())
    }

    /// Discard any unread input, e.g. a reply that arrived after its
    /// transaction had already timed out.
    ///
    /// Takes the channel lock like a transaction, so it never discards
    /// bytes belonging to an exchange in progress.
    pub fn clear_input(&self) -> Result<()> {
        let mut channel = self.lock_channel()?;
        let pending = channel.bytes_to_read()?;
        debug!(port = %channel.name(), pending, "discarding unread input");
        channel.clear_input()
    }

    /// Send `command` and return the device's response, without the
    /// terminator.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidCommand`] if the command cannot be framed (checked
    ///   before the lock is taken)
    /// - [`Error::Timeout`] if the lock, the write, or any single-byte read
    ///   ran out of time; a read timeout reports the bytes received so far
    /// - [`Error::Communication`] if unread bytes were waiting before the
    ///   command was sent (nothing is written in that case), or if the
    ///   response is not ASCII
    pub fn communicate(&self, command: &str) -> Result<String> {
        let frame = protocol::encode_command(command)?;

        let raw = {
            let mut channel = self.lock_channel()?;

            let pending = channel.bytes_to_read()?;
            if pending > 0 {
                warn!(
                    port = %channel.name(),
                    command,
                    pending,
                    "unread bytes in the input buffer, refusing to send"
                );
                return Err(Error::Communication(CommunicationError::StaleInput {
                    pending,
                }));
            }

            trace!(port = %channel.name(), command, "sending command");
            channel
                .write_all(&frame)
                .map_err(|e| write_error(command, e))?;

            read_frame(&mut **channel, command)?
        };

        let response = protocol::decode_response(command, &raw)?;
        trace!(command, response = %response, "received response");
        Ok(response)
    }

    /// Check that `response` starts with `expected_prefix` and return the
    /// remainder with surrounding whitespace removed.
    ///
    /// Pure: touches neither the channel nor the lock.
    pub fn check_prefix_and_strip<'a>(response: &'a str, expected_prefix: &str) -> Result<&'a str> {
        protocol::check_prefix_and_strip(response, expected_prefix)
    }

    /// Issue a command answered by `ok <status>` or `er <code>`.
    ///
    /// Returns the status on `ok`. An `er` reply becomes
    /// [`Error::Communication`] wrapping the [`DeviceError`](platelink_core::DeviceError);
    /// anything else is [`Error::UnexpectedResponse`].
    pub fn issue_action_command(&self, command: &str) -> Result<DeviceStatus> {
        let response = self.communicate(command)?;
        let reply = ActionReply::classify(&response, self.error_code_base, &*self.error_table)?;

        if let ActionReply::Err(device_error) = &reply {
            warn!(command, code = device_error.code(), error = %device_error, "device reported an error");
        }
        reply.into_status()
    }

    /// Issue a status query `ch:<tag>[ ...]` and return the reply payload
    /// after the echoed `<tag>`.
    ///
    /// A command that is not a status query fails with
    /// [`Error::InvalidCommand`] before any I/O.
    ///
    /// ```no_run
    /// # fn example(engine: &platelink_text_io::TransactionEngine) -> platelink_core::Result<()> {
    /// // Device answers "bs 01".
    /// let payload = engine.issue_status_command("ch:bs")?;
    /// assert_eq!(payload, "01");
    /// # Ok(())
    /// # }
    /// ```
    pub fn issue_status_command(&self, command: &str) -> Result<String> {
        let query = StatusQuery::parse(command)?;
        let response = self.communicate(query.command())?;
        Self::check_prefix_and_strip(&response, query.tag()).map(str::to_string)
    }

    /// End the engine's lifetime and hand the channel back to the caller.
    pub fn shutdown(self) -> Box<dyn Channel> {
        let channel = self.channel.into_inner();
        debug!(port = %channel.name(), "transaction engine shut down");
        channel
    }
}

/// Read one frame, one byte at a time, up to and including the terminator.
///
/// A read that returns no data means the per-byte timeout elapsed; the
/// bytes gathered so far go into the error.
fn read_frame(channel: &mut dyn Channel, command: &str) -> Result<Vec<u8>> {
    let mut raw = Vec::new();
    let mut byte = [0u8; 1];

    loop {
        if channel.read(&mut byte)? == 0 {
            warn!(
                port = %channel.name(),
                command,
                received = raw.len(),
                "timed out waiting for response terminator"
            );
            return Err(Error::Timeout(TimeoutCause::Read {
                command: command.to_string(),
                received: raw,
            }));
        }

        raw.push(byte[0]);
        if byte[0] == TERMINATOR {
            return Ok(raw);
        }
    }
}

fn write_error(command: &str, e: Error) -> Error {
    match e {
        Error::Io(io) if io.kind() == ErrorKind::TimedOut => Error::Timeout(TimeoutCause::Write {
            command: command.to_string(),
        }),
        other => other,
    }
}
