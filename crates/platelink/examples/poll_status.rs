//! Poll a plate shuttle's busy and error registers from several threads.
//!
//! Demonstrates sharing one [`TransactionEngine`] between threads: the
//! engine serializes the exchanges so replies never cross.
//!
//! # Requirements
//!
//! - A Cytomat-compatible device connected via USB serial
//! - The serial port path adjusted for your system (e.g., `/dev/ttyUSB0`
//!   on Linux, `COM3` on Windows)
//!
//! # Usage
//!
//! ```sh
//! cargo run -p platelink --example poll_status
//! ```

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use platelink::{EngineBuilder, Error, TransactionEngine};

fn poll(engine: &TransactionEngine, query: &str, rounds: u32) {
    for _ in 0..rounds {
        match engine.issue_status_command(query) {
            Ok(payload) => println!("{query}: {payload}"),
            Err(Error::Timeout(cause)) => eprintln!("{query}: timed out ({cause})"),
            Err(e) => eprintln!("{query}: {e}"),
        }
        thread::sleep(Duration::from_millis(250));
    }
}

fn main() -> anyhow::Result<()> {
    // Adjust this to match your system's serial port.
    let serial_port = "/dev/ttyUSB0";

    println!("Connecting to {serial_port}...");
    let engine = Arc::new(
        EngineBuilder::new()
            .serial_port(serial_port)
            .timeout(Duration::from_secs(1))
            .build()?,
    );

    let handles: Vec<_> = ["ch:bs", "ch:be"]
        .into_iter()
        .map(|query| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || poll(&engine, query, 10))
        })
        .collect();

    for handle in handles {
        if handle.join().is_err() {
            anyhow::bail!("poll thread panicked");
        }
    }

    Ok(())
}
