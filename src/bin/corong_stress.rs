//! Corong Stress Runner
//!
//! P producer x C consumer lewat satu bounded channel, lalu verifikasi:
//! - Tidak ada item hilang atau duplikat (total = P x K)
//! - Urutan per producer tidak pernah mundur di tiap consumer
//!
//! Usage:
//!   cargo run --release --bin corong_stress -- [OPTIONS]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info, warn, LevelFilter};
use parking_lot::Mutex;

use corong::{bounded_with_config, ChannelConfig, ChannelError, ConfigError};

/// Stress configuration
struct StressConfig {
    producers: usize,
    consumers: usize,
    items_per_producer: u64,
    channel: ChannelConfig,
    timeout: Option<Duration>,
    verbose: bool,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            producers: 5,
            consumers: 5,
            items_per_producer: 100_000,
            channel: ChannelConfig::default(),
            timeout: None,
            verbose: false,
        }
    }
}

/// Stress statistics
struct StressStats {
    sent: AtomicU64,
    received: AtomicU64,
    send_timeouts: AtomicU64,
    receive_timeouts: AtomicU64,
}

impl StressStats {
    fn new() -> Self {
        Self {
            sent: AtomicU64::new(0),
            received: AtomicU64::new(0),
            send_timeouts: AtomicU64::new(0),
            receive_timeouts: AtomicU64::new(0),
        }
    }

    fn print_report(&self, duration: Duration) {
        let sent = self.sent.load(Ordering::Relaxed);
        let received = self.received.load(Ordering::Relaxed);
        let send_timeouts = self.send_timeouts.load(Ordering::Relaxed);
        let receive_timeouts = self.receive_timeouts.load(Ordering::Relaxed);

        println!("\n📊 STRESS TEST RESULTS");
        println!("======================");
        println!("  Duration:         {:.2}s", duration.as_secs_f64());
        println!("  Sent:             {}", sent);
        println!("  Received:         {}", received);
        println!("  Send timeouts:    {}", send_timeouts);
        println!("  Receive timeouts: {}", receive_timeouts);
        println!(
            "  Throughput:       {:.2} M msgs/sec",
            received as f64 / duration.as_secs_f64() / 1_000_000.0
        );
    }
}

/// Ringkasan satu consumer
struct ConsumerReport {
    received: u64,
    out_of_order: u64,
}

fn producer_loop(
    id: u64,
    tx: corong::Sender<(u64, u64)>,
    items: u64,
    timeout: Option<Duration>,
    stats: Arc<StressStats>,
) {
    for seq in 0..items {
        let mut item = (id, seq);
        // Timeout = retry; hanya close yang menghentikan producer
        loop {
            match tx.send(item, timeout) {
                Ok(()) => break,
                Err(err) if err.error() == ChannelError::SendTimeout => {
                    stats.send_timeouts.fetch_add(1, Ordering::Relaxed);
                    item = err.into_inner();
                }
                Err(err) => {
                    warn!("producer {id}: {err} at seq {seq}");
                    return;
                }
            }
        }
        stats.sent.fetch_add(1, Ordering::Relaxed);
    }
    debug!("producer {id}: done");
}

fn consumer_loop(
    id: usize,
    rx: corong::Receiver<(u64, u64)>,
    timeout: Option<Duration>,
    stats: Arc<StressStats>,
) -> ConsumerReport {
    let mut last_seen: HashMap<u64, u64> = HashMap::new();
    let mut report = ConsumerReport {
        received: 0,
        out_of_order: 0,
    };

    loop {
        match rx.receive(timeout) {
            Ok((producer, seq)) => {
                if let Some(prev) = last_seen.insert(producer, seq) {
                    if seq <= prev {
                        report.out_of_order += 1;
                    }
                }
                report.received += 1;
                stats.received.fetch_add(1, Ordering::Relaxed);
            }
            Err(ChannelError::ReceiveTimeout) => {
                stats.receive_timeouts.fetch_add(1, Ordering::Relaxed);
            }
            Err(_) => break,
        }
    }

    debug!("consumer {id}: EOF after {} item(s)", report.received);
    report
}

fn run_stress(config: StressConfig) -> Result<bool, ConfigError> {
    let (tx, rx) = bounded_with_config(config.channel)?;
    let stats = Arc::new(StressStats::new());
    let reports = Arc::new(Mutex::new(Vec::with_capacity(config.consumers)));

    info!(
        "stress: {} producer(s) x {} item(s), {} consumer(s), capacity {}",
        config.producers,
        config.items_per_producer,
        config.consumers,
        tx.capacity()
    );

    let start = Instant::now();

    let producers: Vec<_> = (0..config.producers as u64)
        .map(|id| {
            let tx = tx.clone();
            let stats = Arc::clone(&stats);
            let items = config.items_per_producer;
            let timeout = config.timeout;
            thread::spawn(move || producer_loop(id, tx, items, timeout, stats))
        })
        .collect();
    // Sender terakhir selesai -> channel close -> consumer EOF
    drop(tx);

    let consumers: Vec<_> = (0..config.consumers)
        .map(|id| {
            let rx = rx.clone();
            let stats = Arc::clone(&stats);
            let reports = Arc::clone(&reports);
            let timeout = config.timeout;
            thread::spawn(move || {
                let report = consumer_loop(id, rx, timeout, stats);
                reports.lock().push(report);
            })
        })
        .collect();
    drop(rx);

    for handle in producers.into_iter().chain(consumers) {
        if handle.join().is_err() {
            warn!("stress: worker thread panicked");
        }
    }

    let duration = start.elapsed();
    stats.print_report(duration);

    let reports = reports.lock();
    let received: u64 = reports.iter().map(|r| r.received).sum();
    let out_of_order: u64 = reports.iter().map(|r| r.out_of_order).sum();
    let expected = config.producers as u64 * config.items_per_producer;

    if config.verbose {
        for (i, r) in reports.iter().enumerate() {
            println!("  Consumer {:>2}: {} item(s)", i, r.received);
        }
    }

    if received == expected && out_of_order == 0 {
        println!("\n✅ STRESS TEST PASSED - {} / {} items, FIFO intact", received, expected);
        Ok(true)
    } else {
        println!(
            "\n⚠️  STRESS TEST FAILED - {} / {} items, {} out of order",
            received, expected, out_of_order
        );
        Ok(false)
    }
}

fn parse_args() -> StressConfig {
    let args: Vec<String> = std::env::args().collect();
    let mut config = StressConfig::default();

    // Environment dulu, flag CLI menang
    match ChannelConfig::from_env() {
        Ok(channel) => config.channel = channel,
        Err(e) => eprintln!("⚠️  Ignoring environment: {}", e),
    }

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--producers" | "-p" => {
                if i + 1 < args.len() {
                    config.producers = args[i + 1].parse().unwrap_or(5);
                    i += 1;
                }
            }
            "--consumers" | "-c" => {
                if i + 1 < args.len() {
                    config.consumers = args[i + 1].parse().unwrap_or(5);
                    i += 1;
                }
            }
            "--items" | "-n" => {
                if i + 1 < args.len() {
                    config.items_per_producer = args[i + 1].parse().unwrap_or(100_000);
                    i += 1;
                }
            }
            "--capacity" => {
                if i + 1 < args.len() {
                    config.channel.capacity = args[i + 1].parse().unwrap_or(1024);
                    i += 1;
                }
            }
            "--timeout-ms" => {
                if i + 1 < args.len() {
                    config.timeout = args[i + 1].parse().ok().map(Duration::from_millis);
                    i += 1;
                }
            }
            "--verbose" | "-v" => {
                config.verbose = true;
            }
            "--help" | "-h" => {
                println!("Corong Stress Runner - Bounded MPMC Channel\n");
                println!("Usage: corong_stress [OPTIONS]\n");
                println!("Options:");
                println!("  -p, --producers <N>    Producer threads (default: 5)");
                println!("  -c, --consumers <N>    Consumer threads (default: 5)");
                println!("  -n, --items <N>        Items per producer (default: 100000)");
                println!("      --capacity <N>     Channel slots (default: 1024, env CORONG_CAPACITY)");
                println!("      --timeout-ms <MS>  Per-call send/receive timeout (default: none)");
                println!("  -v, --verbose          Verbose output");
                println!("  -h, --help             Show this help");
                std::process::exit(0);
            }
            _ => {}
        }
        i += 1;
    }

    config
}

fn main() {
    let config = parse_args();

    let level = if config.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();

    match run_stress(config) {
        Ok(true) => {}
        Ok(false) => std::process::exit(2),
        Err(e) => {
            eprintln!("❌ Stress error: {}", e);
            std::process::exit(1);
        }
    }
}
