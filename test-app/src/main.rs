// platelink test application -- CLI tool for exercising a plate shuttle's
// serial protocol against real hardware or a mock channel.
//
// Usage:
//   platelink-test-app --port /dev/ttyUSB0 status ch:bs
//   platelink-test-app --port /dev/ttyUSB0 action "mv:st 001"
//   platelink-test-app --port COM3 --baud 9600 --timeout-ms 500 raw ll:in
//   platelink-test-app --port /dev/ttyUSB0 --error-base decimal action mv:ts
//   platelink-test-app --mock --mock-response "er 1A" action "mv:st 001"
//   platelink-test-app --mock stress --count 200 --threads 8 status ch:bs
//   platelink-test-app ports

mod stress;

use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};

use platelink::serial::{SerialConfig, available_ports};
use platelink::{
    EngineBuilder, ErrorCodeBase, ParseErrorCodeBaseError, StatusQuery, TransactionEngine,
};
use platelink_test_harness::MockChannel;

use crate::stress::{StressMode, StressOptions};

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// platelink test application -- sends commands to a plate shuttle.
#[derive(Parser)]
#[command(name = "platelink-test-app", version, about)]
struct Cli {
    /// Serial port path (e.g. /dev/ttyUSB0, COM3).
    /// Required unless --mock is used or the command is `ports`.
    #[arg(long, conflicts_with = "mock")]
    port: Option<String>,

    /// Use a mock channel instead of a real serial port.
    /// Every command is answered with --mock-response (or a plausible
    /// default), which is useful for checking CLI wiring without hardware.
    #[arg(long)]
    mock: bool,

    /// Baud rate (default: 9600).
    #[arg(long)]
    baud: Option<u32>,

    /// Timeout in milliseconds for lock acquisition and each read/write.
    #[arg(long, default_value_t = 1000)]
    timeout_ms: u64,

    /// Radix of the code in `er <code>` replies: hex (16) or decimal (10).
    #[arg(long, default_value = "hex", value_parser = parse_error_base)]
    error_base: ErrorCodeBase,

    /// Reply the mock channel gives to every command (mock mode only).
    #[arg(long, requires = "mock")]
    mock_response: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Send a command and print the raw response.
    Raw {
        /// Command text without the trailing carriage return.
        command: String,
    },

    /// Send an action command and print the returned status register.
    Action {
        /// Command text, e.g. "mv:st 001".
        command: String,
    },

    /// Send a `ch:<tag>` status query and print the reply payload.
    Status {
        /// Command text, e.g. "ch:bs".
        command: String,
    },

    /// List serial ports found on this machine.
    Ports,

    /// Stress test: many transactions from several threads at once.
    Stress {
        /// Total number of transactions.
        #[arg(long, default_value_t = 100)]
        count: u32,

        /// Number of threads sharing the engine.
        #[arg(long, default_value_t = 4)]
        threads: u32,

        /// How to send each command.
        #[arg(long, value_enum, default_value = "status")]
        mode: StressModeArg,

        /// Command text sent on every transaction.
        command: String,
    },
}

/// Parse "hex"/"decimal" (or "16"/"10") into an [`ErrorCodeBase`].
fn parse_error_base(s: &str) -> std::result::Result<ErrorCodeBase, ParseErrorCodeBaseError> {
    s.parse()
}

#[derive(Clone, Copy, ValueEnum)]
enum StressModeArg {
    Raw,
    Action,
    Status,
}

impl From<StressModeArg> for StressMode {
    fn from(arg: StressModeArg) -> Self {
        match arg {
            StressModeArg::Raw => StressMode::Raw,
            StressModeArg::Action => StressMode::Action,
            StressModeArg::Status => StressMode::Status,
        }
    }
}

// ---------------------------------------------------------------------------
// Engine construction
// ---------------------------------------------------------------------------

/// The command text and number of transactions the mock must be primed for.
fn planned_transactions(command: &Command) -> Option<(&str, u32)> {
    match command {
        Command::Raw { command } | Command::Action { command } | Command::Status { command } => {
            Some((command.as_str(), 1))
        }
        Command::Stress { command, count, .. } => Some((command.as_str(), *count)),
        Command::Ports => None,
    }
}

/// A reply the mock gives when --mock-response is not set: the echoed tag
/// for status queries, `ok 00` for everything else.
fn default_mock_response(command: &str) -> String {
    match StatusQuery::parse(command) {
        Ok(query) => format!("{} 00", query.tag()),
        Err(_) => "ok 00".to_string(),
    }
}

fn create_engine(cli: &Cli) -> Result<TransactionEngine> {
    if cli.timeout_ms == 0 {
        bail!("--timeout-ms must be greater than zero");
    }
    let timeout = Duration::from_millis(cli.timeout_ms);

    let mut builder = EngineBuilder::new()
        .timeout(timeout)
        .error_code_base(cli.error_base);
    if let Some(baud) = cli.baud {
        builder = builder.baud_rate(baud);
    }

    if cli.mock {
        let mock = MockChannel::new();
        if let Some((command, count)) = planned_transactions(&cli.command) {
            let response = cli
                .mock_response
                .clone()
                .unwrap_or_else(|| default_mock_response(command));
            for _ in 0..count {
                mock.expect_frames(command, &response);
            }
        }

        let engine = builder
            .build_with_channel(Box::new(mock))
            .context("failed to build engine with mock channel")?;
        println!("Connected (mock channel)");
        Ok(engine)
    } else {
        let port = cli
            .port
            .as_deref()
            .context("--port is required when not using --mock")?;
        let baud = cli.baud.unwrap_or(SerialConfig::default().baud_rate);

        let engine = builder
            .serial_port(port)
            .build()
            .with_context(|| format!("failed to open serial port {port} at {baud} baud"))?;
        println!("Connected to {port} at {baud} baud");
        Ok(engine)
    }
}

// ---------------------------------------------------------------------------
// Command implementations
// ---------------------------------------------------------------------------

fn cmd_ports() -> Result<()> {
    let ports = available_ports().context("failed to enumerate serial ports")?;
    if ports.is_empty() {
        println!("No serial ports found.");
        return Ok(());
    }
    for port in &ports {
        println!("  {port}");
    }
    println!("{} port(s) total.", ports.len());
    Ok(())
}

fn cmd_raw(engine: &TransactionEngine, command: &str) -> Result<()> {
    let response = engine
        .communicate(command)
        .with_context(|| format!("command {command:?} failed"))?;
    println!("{command} -> {response}");
    Ok(())
}

fn cmd_action(engine: &TransactionEngine, command: &str) -> Result<()> {
    match engine.issue_action_command(command) {
        Ok(status) => {
            println!("{command} -> ok");
            println!("  Status:   0x{status}");
            println!("  Bits:     {:0width$b}", status.bits(), width = status.digits() as usize * 4);
            Ok(())
        }
        Err(e) => {
            if let Some(device_error) = e.device_error() {
                println!("{command} -> er");
                println!("  Code:     {}", device_error.code());
                if let Some(description) = device_error.description() {
                    println!("  Meaning:  {description}");
                }
            }
            Err(e).with_context(|| format!("action {command:?} failed"))
        }
    }
}

fn cmd_status(engine: &TransactionEngine, command: &str) -> Result<()> {
    let payload = engine
        .issue_status_command(command)
        .with_context(|| format!("status query {command:?} failed"))?;
    println!("{command} -> {payload}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();

    // The `ports` command does not need a device.
    if matches!(cli.command, Command::Ports) {
        return cmd_ports();
    }

    let engine = create_engine(&cli)?;

    let result = match &cli.command {
        Command::Raw { command } => cmd_raw(&engine, command),
        Command::Action { command } => cmd_action(&engine, command),
        Command::Status { command } => cmd_status(&engine, command),
        Command::Stress {
            count,
            threads,
            mode,
            command,
        } => stress::run(
            &engine,
            &StressOptions {
                command: command.clone(),
                count: *count,
                threads: *threads,
                mode: (*mode).into(),
            },
        ),
        Command::Ports => unreachable!("ports handled above"),
    };

    engine.close().ok();
    result
}
