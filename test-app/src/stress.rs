// Stress subcommand -- hammers one engine from several threads and checks
// that every transaction completes on its own. Reports success/failure
// counts, throughput and latency percentiles.

use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Result, bail};

use platelink::{Error, TransactionEngine};

// ---------------------------------------------------------------------------
// Options (passed from main.rs)
// ---------------------------------------------------------------------------

pub struct StressOptions {
    pub command: String,
    pub count: u32,
    pub threads: u32,
    pub mode: StressMode,
}

/// Which engine entry point each transaction goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StressMode {
    Raw,
    Action,
    Status,
}

// ---------------------------------------------------------------------------
// Latency statistics
// ---------------------------------------------------------------------------

struct LatencyStats {
    samples: Vec<Duration>,
}

struct ComputedStats {
    n: usize,
    min: Duration,
    avg: Duration,
    p50: Duration,
    p95: Duration,
    max: Duration,
}

impl LatencyStats {
    fn new() -> Self {
        Self {
            samples: Vec::new(),
        }
    }

    fn merge(&mut self, other: Vec<Duration>) {
        self.samples.extend(other);
    }

    fn compute(&mut self) -> Option<ComputedStats> {
        let n = self.samples.len();
        if n == 0 {
            return None;
        }
        self.samples.sort();
        let sum: Duration = self.samples.iter().sum();
        Some(ComputedStats {
            n,
            min: self.samples[0],
            avg: sum / n as u32,
            p50: self.samples[n * 50 / 100],
            p95: self.samples[(n * 95 / 100).min(n - 1)],
            max: self.samples[n - 1],
        })
    }
}

impl ComputedStats {
    fn fmt_line(&self) -> String {
        format!(
            "n={}  min={:.1}ms  avg={:.1}ms  p50={:.1}ms  p95={:.1}ms  max={:.1}ms",
            self.n,
            self.min.as_secs_f64() * 1000.0,
            self.avg.as_secs_f64() * 1000.0,
            self.p50.as_secs_f64() * 1000.0,
            self.p95.as_secs_f64() * 1000.0,
            self.max.as_secs_f64() * 1000.0,
        )
    }
}

// ---------------------------------------------------------------------------
// Per-thread tally
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Tally {
    success: u32,
    timeouts: u32,
    device_errors: u32,
    other_failures: u32,
    latencies: Vec<Duration>,
}

impl Tally {
    fn failures(&self) -> u32 {
        self.timeouts + self.device_errors + self.other_failures
    }

    fn absorb(&mut self, other: Tally) {
        self.success += other.success;
        self.timeouts += other.timeouts;
        self.device_errors += other.device_errors;
        self.other_failures += other.other_failures;
        self.latencies.extend(other.latencies);
    }
}

fn run_one(engine: &TransactionEngine, mode: StressMode, command: &str) -> platelink::Result<()> {
    match mode {
        StressMode::Raw => engine.communicate(command).map(drop),
        StressMode::Action => engine.issue_action_command(command).map(drop),
        StressMode::Status => engine.issue_status_command(command).map(drop),
    }
}

fn worker(engine: &TransactionEngine, opts: &StressOptions, worker_id: u32, count: u32) -> Tally {
    let mut tally = Tally::default();

    for i in 1..=count {
        let start = Instant::now();
        match run_one(engine, opts.mode, &opts.command) {
            Ok(()) => {
                tally.success += 1;
                tally.latencies.push(start.elapsed());
            }
            Err(e) => {
                eprintln!("[worker {worker_id}] [{i}/{count}] {e}");
                match e {
                    Error::Timeout(_) => tally.timeouts += 1,
                    ref err if err.device_error().is_some() => tally.device_errors += 1,
                    _ => tally.other_failures += 1,
                }
            }
        }
    }

    tally
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Split `count` transactions over `threads` workers sharing `engine`.
pub fn run(engine: &TransactionEngine, opts: &StressOptions) -> Result<()> {
    if opts.threads == 0 {
        bail!("--threads must be at least 1");
    }
    let threads = opts.threads.min(opts.count.max(1));

    println!(
        "Stress test: {} x {:?} {:?} over {} thread(s)",
        opts.count, opts.mode, opts.command, threads
    );

    let start = Instant::now();
    let mut total = Tally::default();

    thread::scope(|s| {
        let handles: Vec<_> = (0..threads)
            .map(|worker_id| {
                // Spread the remainder over the first workers.
                let share = opts.count / threads + u32::from(worker_id < opts.count % threads);
                s.spawn(move || worker(engine, opts, worker_id, share))
            })
            .collect();

        for handle in handles {
            match handle.join() {
                Ok(tally) => total.absorb(tally),
                Err(_) => total.other_failures += 1,
            }
        }
    });

    let elapsed = start.elapsed();
    let rate = if elapsed.as_secs_f64() > 0.0 {
        opts.count as f64 / elapsed.as_secs_f64()
    } else {
        0.0
    };

    println!();
    println!("Results:");
    println!("  Total:          {}", opts.count);
    println!("  Successes:      {}", total.success);
    println!("  Failures:       {}", total.failures());
    println!("    timeouts:     {}", total.timeouts);
    println!("    device errors:{:>3}", total.device_errors);
    println!("    other:        {}", total.other_failures);
    println!("  Elapsed:        {:.3} s", elapsed.as_secs_f64());
    println!("  Rate:           {rate:.1} transactions/sec");

    let mut stats = LatencyStats::new();
    stats.merge(std::mem::take(&mut total.latencies));
    if let Some(computed) = stats.compute() {
        println!("  Latency:        {}", computed.fmt_line());
    }

    if total.failures() > 0 {
        bail!("{} of {} transactions failed", total.failures(), opts.count);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use platelink_test_harness::MockChannel;

    fn engine_with(mock: &MockChannel) -> TransactionEngine {
        TransactionEngine::new(Box::new(mock.clone()), Duration::from_millis(200))
    }

    #[test]
    fn stress_all_transactions_succeed() {
        let mock = MockChannel::new();
        for _ in 0..20 {
            mock.expect_frames("ch:bs", "bs 00");
        }
        let engine = engine_with(&mock);
        let opts = StressOptions {
            command: "ch:bs".into(),
            count: 20,
            threads: 4,
            mode: StressMode::Status,
        };

        run(&engine, &opts).unwrap();
        assert_eq!(mock.remaining_expectations(), 0);
        assert_eq!(mock.sent_data().len(), 20);
    }

    #[test]
    fn stress_reports_device_errors() {
        let mock = MockChannel::new();
        mock.expect_frames("mv:st 001", "ok 00");
        mock.expect_frames("mv:st 001", "er 03");
        let engine = engine_with(&mock);
        let opts = StressOptions {
            command: "mv:st 001".into(),
            count: 2,
            threads: 1,
            mode: StressMode::Action,
        };

        let err = run(&engine, &opts).unwrap_err();
        assert!(err.to_string().contains("1 of 2"));
    }

    #[test]
    fn stress_rejects_zero_threads() {
        let mock = MockChannel::new();
        let engine = engine_with(&mock);
        let opts = StressOptions {
            command: "ch:bs".into(),
            count: 1,
            threads: 0,
            mode: StressMode::Raw,
        };
        assert!(run(&engine, &opts).is_err());
    }

    #[test]
    fn latency_stats_percentiles() {
        let mut stats = LatencyStats::new();
        stats.merge((1..=100).map(Duration::from_millis).collect());
        let computed = stats.compute().unwrap();
        assert_eq!(computed.n, 100);
        assert_eq!(computed.min, Duration::from_millis(1));
        assert_eq!(computed.p50, Duration::from_millis(51));
        assert_eq!(computed.p95, Duration::from_millis(96));
        assert_eq!(computed.max, Duration::from_millis(100));
        assert!(LatencyStats::new().compute().is_none());
    }
}
