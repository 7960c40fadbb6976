//! Mock channel for deterministic testing of the transaction engine.
//!
//! [`MockChannel`] implements the [`Channel`] trait with pre-loaded
//! request/response pairs. This lets you test command framing, response
//! classification, and timeout handling without real hardware.
//!
//! Clones share state, so a test can hand one clone to the engine and keep
//! another to inspect what was written.
//!
//! # Example
//!
//! ```
//! use platelink_test_harness::MockChannel;
//!
//! let mock = MockChannel::new();
//! // When the engine sends `ch:bs\r`, answer `bs 01\r`.
//! mock.expect(b"ch:bs\r", b"bs 01\r");
//! ```

use std::collections::VecDeque;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use platelink_core::channel::Channel;
use platelink_core::error::{Error, Result};

/// What the mock does once an expected request has been written.
#[derive(Debug, Clone)]
enum Reply {
    /// Make these bytes available for reading.
    Bytes(Vec<u8>),
    /// Fail the write as if the write timeout had elapsed.
    WriteTimeout,
}

/// A pre-loaded request/reply pair.
#[derive(Debug, Clone)]
struct Expectation {
    /// The exact bytes we expect to be written.
    request: Vec<u8>,
    reply: Reply,
}

#[derive(Debug)]
struct MockState {
    /// Ordered queue of expected exchanges.
    expectations: VecDeque<Expectation>,
    /// Bytes the device has "sent" that have not been read yet.
    input: VecDeque<u8>,
    /// Log of every frame written through this channel.
    sent_log: Vec<Vec<u8>>,
    open: bool,
    /// Sleep applied to every `read()` call.
    read_delay: Duration,
}

/// A mock [`Channel`] for testing without hardware.
///
/// Expectations are consumed in order. When `write_all()` is called, the
/// data is recorded and matched against the next expectation; the reply
/// bytes then become readable. Reads hand out buffered bytes and return
/// `Ok(0)` (a read timeout) once the buffer is empty.
///
/// A write with no matching expectation returns [`Error::Transport`].
#[derive(Debug, Clone)]
pub struct MockChannel {
    state: Arc<Mutex<MockState>>,
}

impl MockChannel {
    /// Create a new mock channel in the open state.
    pub fn new() -> Self {
        MockChannel {
            state: Arc::new(Mutex::new(MockState {
                expectations: VecDeque::new(),
                input: VecDeque::new(),
                sent_log: Vec::new(),
                open: true,
                read_delay: Duration::ZERO,
            })),
        }
    }

    /// Add an expected request/response pair, bytes exactly as on the wire.
    ///
    /// A `response` without a trailing `\r` simulates a device that stalls
    /// part-way through its reply.
    pub fn expect(&self, request: &[u8], response: &[u8]) {
        self.state.lock().expectations.push_back(Expectation {
            request: request.to_vec(),
            reply: Reply::Bytes(response.to_vec()),
        });
    }

    /// Add an expected exchange of terminated ASCII frames.
    ///
    /// `expect_frames("ch:bs", "bs 01")` is `expect(b"ch:bs\r", b"bs 01\r")`.
    pub fn expect_frames(&self, command: &str, response: &str) {
        self.expect(
            format!("{command}\r").as_bytes(),
            format!("{response}\r").as_bytes(),
        );
    }

    /// Expect `request` and never answer it.
    pub fn expect_silence(&self, request: &[u8]) {
        self.expect(request, &[]);
    }

    /// Expect `request` and fail the write with a timed-out I/O error.
    pub fn expect_write_timeout(&self, request: &[u8]) {
        self.state.lock().expectations.push_back(Expectation {
            request: request.to_vec(),
            reply: Reply::WriteTimeout,
        });
    }

    /// Put unsolicited bytes into the receive buffer.
    pub fn inject_input(&self, data: &[u8]) {
        self.state.lock().input.extend(data.iter().copied());
    }

    /// Slow down every `read()` call by `delay`.
    pub fn set_read_delay(&self, delay: Duration) {
        self.state.lock().read_delay = delay;
    }

    /// Return a copy of all frames written through this channel.
    pub fn sent_data(&self) -> Vec<Vec<u8>> {
        self.state.lock().sent_log.clone()
    }

    /// Return the number of expectations that have not yet been consumed.
    pub fn remaining_expectations(&self) -> usize {
        self.state.lock().expectations.len()
    }

    /// Number of received bytes not yet read.
    pub fn pending_input(&self) -> usize {
        self.state.lock().input.len()
    }

    /// Set the open state directly.
    pub fn set_open(&self, open: bool) {
        self.state.lock().open = open;
    }
}

impl Default for MockChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl Channel for MockChannel {
    fn write_all(&mut self, data: &[u8]) -> Result<()> {
        let mut state = self.state.lock();
        if !state.open {
            return Err(Error::NotConnected);
        }

        state.sent_log.push(data.to_vec());

        let Some(expectation) = state.expectations.pop_front() else {
            return Err(Error::Transport("no more expectations in mock channel".into()));
        };
        if data != expectation.request.as_slice() {
            return Err(Error::Transport(format!(
                "unexpected send data: expected {:?}, got {:?}",
                String::from_utf8_lossy(&expectation.request),
                String::from_utf8_lossy(data)
            )));
        }

        match expectation.reply {
            Reply::Bytes(response) => {
                state.input.extend(response);
                Ok(())
            }
            Reply::WriteTimeout => Err(Error::Io(io::Error::new(
                io::ErrorKind::TimedOut,
                "mock write timed out",
            ))),
        }
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let delay = {
            let state = self.state.lock();
            if !state.open {
                return Err(Error::NotConnected);
            }
            state.read_delay
        };
        // Sleep without holding the state lock so tests can inspect it.
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }

        let mut state = self.state.lock();
        let n = buf.len().min(state.input.len());
        for (slot, byte) in buf.iter_mut().zip(state.input.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn bytes_to_read(&mut self) -> Result<usize> {
        let state = self.state.lock();
        if !state.open {
            return Err(Error::NotConnected);
        }
        Ok(state.input.len())
    }

    fn clear_input(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        if !state.open {
            return Err(Error::NotConnected);
        }
        state.input.clear();
        Ok(())
    }

    fn open(&mut self) -> Result<()> {
        self.state.lock().open = true;
        Ok(())
    }

    // Like a real port, closing leaves already-received bytes in place.
    fn close(&mut self) -> Result<()> {
        self.state.lock().open = false;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.state.lock().open
    }

    fn name(&self) -> &str {
        "mock"
    }
}
