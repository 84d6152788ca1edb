//! Corong - Bounded MPMC Channel
//!
//! Benchmark cepat untuk tiap lapisan:
//! - Circular buffer: push/pop lock-free
//! - Event: notify/wait tanpa parkir
//! - Channel: try_send/try_receive + MPMC blocking throughput

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use corong::core::CircularBuffer;
use corong::sync::Event;
use corong::Channel;

fn main() {
    env_logger::init();

    println!("🚀 Corong MPMC Channel - v0.1");
    println!("=============================\n");

    benchmark_circular_buffer();

    benchmark_event();

    benchmark_channel();

    benchmark_mpmc_throughput();

    println!("\n✅ All benchmarks complete!");
    println!("\nFor a configurable stress run: cargo run --release --bin corong_stress -- --help");
}

fn print_latency(label: &str, duration: Duration, iterations: usize) {
    let ns = duration.as_nanos() as f64 / iterations as f64;
    println!("  {label}: {:.2} ns/op ({:.3} μs/op)", ns, ns / 1000.0);
}

fn benchmark_circular_buffer() {
    println!("📊 Circular Buffer Benchmark (Lock-Free MPMC)");
    println!("---------------------------------------------");

    const ITERATIONS: usize = 1_000_000;
    let cb: CircularBuffer<u64> = CircularBuffer::new(65536);

    // Warm up
    for i in 0..1000 {
        let _ = cb.push(i);
    }
    while cb.pop().is_some() {}

    // Benchmark push
    let start = Instant::now();
    for i in 0..ITERATIONS {
        if cb.push(i as u64).is_err() {
            cb.pop();
        }
    }
    let push_duration = start.elapsed();

    // Drain
    while cb.pop().is_some() {}

    for i in 0..cb.capacity() {
        let _ = cb.push(i as u64);
    }

    // Benchmark pop
    let start = Instant::now();
    let mut popped = 0usize;
    while cb.pop().is_some() {
        popped += 1;
    }
    let pop_duration = start.elapsed();

    println!("  Operations: {}", ITERATIONS);
    print_latency("Push latency", push_duration, ITERATIONS);
    print_latency("Pop latency ", pop_duration, popped.max(1));
    println!(
        "  Throughput:   {:.2} M ops/sec\n",
        ITERATIONS as f64 / push_duration.as_secs_f64() / 1_000_000.0
    );
}

fn benchmark_event() {
    println!("📊 Event Benchmark (no contention)");
    println!("----------------------------------");

    const ITERATIONS: usize = 1_000_000;
    let event = Event::auto_reset();

    let start = Instant::now();
    for _ in 0..ITERATIONS {
        event.notify();
        event.wait(Some(Duration::ZERO));
    }
    let duration = start.elapsed();

    print_latency("notify+wait", duration, ITERATIONS);
    println!();
}

fn benchmark_channel() {
    println!("📊 Channel Benchmark (try_send/try_receive)");
    println!("-------------------------------------------");

    const ITERATIONS: usize = 1_000_000;
    let channel: Channel<u64> = Channel::new(1024);

    let start = Instant::now();
    for i in 0..ITERATIONS {
        if channel.try_send(i as u64).is_err() {
            let _ = channel.try_receive();
        }
    }
    let duration = start.elapsed();

    print_latency("try_send", duration, ITERATIONS);
    println!();
}

fn benchmark_mpmc_throughput() {
    println!("📊 MPMC Throughput (4 producers, 4 consumers, blocking)");
    println!("-------------------------------------------------------");

    const PRODUCERS: usize = 4;
    const CONSUMERS: usize = 4;
    const PER_PRODUCER: usize = 250_000;

    let channel: Arc<Channel<u64>> = Arc::new(Channel::new(4096));
    let start = Instant::now();

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|_| {
            let channel = Arc::clone(&channel);
            thread::spawn(move || {
                for i in 0..PER_PRODUCER {
                    if channel.send(i as u64, None).is_err() {
                        break;
                    }
                }
            })
        })
        .collect();

    let consumers: Vec<_> = (0..CONSUMERS)
        .map(|_| {
            let channel = Arc::clone(&channel);
            thread::spawn(move || channel.iter().count())
        })
        .collect();

    for p in producers {
        let _ = p.join();
    }
    channel.close();

    let received: usize = consumers.into_iter().filter_map(|c| c.join().ok()).sum();
    let duration = start.elapsed();

    println!("  Messages:   {}", received);
    println!(
        "  Throughput: {:.2} M msgs/sec",
        received as f64 / duration.as_secs_f64() / 1_000_000.0
    );
}
