//! Criterion benchmark untuk Circular Buffer dan Channel
//!
//! Run dengan: cargo bench

use std::sync::Arc;
use std::thread;

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use corong::core::CircularBuffer;
use corong::Channel;

fn bench_buffer(c: &mut Criterion) {
    let mut group = c.benchmark_group("circular_buffer");
    group.throughput(Throughput::Elements(1));

    // Benchmark push
    group.bench_function("push", |b| {
        let cb: CircularBuffer<u64> = CircularBuffer::new(65536);
        let mut i = 0u64;
        b.iter(|| {
            if cb.push(black_box(i)).is_err() {
                cb.pop();
                let _ = cb.push(black_box(i));
            }
            i = i.wrapping_add(1);
        });
    });

    // Benchmark push+pop cycle
    group.bench_function("push_pop_cycle", |b| {
        let cb: CircularBuffer<u64> = CircularBuffer::new(65536);
        let mut i = 0u64;
        b.iter(|| {
            let _ = cb.push(black_box(i));
            black_box(cb.pop());
            i = i.wrapping_add(1);
        });
    });

    group.finish();
}

fn bench_channel(c: &mut Criterion) {
    let mut group = c.benchmark_group("channel");
    group.throughput(Throughput::Elements(1));

    group.bench_function("try_send_try_receive", |b| {
        let channel: Channel<u64> = Channel::new(1024);
        let mut i = 0u64;
        b.iter(|| {
            let _ = channel.try_send(black_box(i));
            black_box(channel.try_receive().ok());
            i = i.wrapping_add(1);
        });
    });

    group.bench_function("send_receive_no_wait", |b| {
        let channel: Channel<u64> = Channel::new(1024);
        let mut i = 0u64;
        b.iter(|| {
            let _ = channel.send(black_box(i), None);
            black_box(channel.receive(None).ok());
            i = i.wrapping_add(1);
        });
    });

    group.finish();
}

fn bench_mpmc(c: &mut Criterion) {
    let mut group = c.benchmark_group("mpmc");

    // Producer/consumer pairs
    for pairs in [1usize, 2, 4].iter() {
        const PER_PRODUCER: u64 = 10_000;
        group.throughput(Throughput::Elements(*pairs as u64 * PER_PRODUCER));
        group.bench_function(format!("pairs_{}", pairs), |b| {
            b.iter(|| {
                let channel: Arc<Channel<u64>> = Arc::new(Channel::new(256));

                let producers: Vec<_> = (0..*pairs)
                    .map(|_| {
                        let channel = Arc::clone(&channel);
                        thread::spawn(move || {
                            for i in 0..PER_PRODUCER {
                                let _ = channel.send(i, None);
                            }
                        })
                    })
                    .collect();
                let consumers: Vec<_> = (0..*pairs)
                    .map(|_| {
                        let channel = Arc::clone(&channel);
                        thread::spawn(move || channel.iter().count())
                    })
                    .collect();

                for p in producers {
                    let _ = p.join();
                }
                channel.close();
                let total: usize = consumers.into_iter().filter_map(|c| c.join().ok()).sum();
                black_box(total)
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_buffer, bench_channel, bench_mpmc);
criterion_main!(benches);
