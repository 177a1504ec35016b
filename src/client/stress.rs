//! Minimal synthetic-clients load mode: connect N bot-driven peers, let them
//! run, and print aggregate counters on exit. Not a polished benchmark
//! harness — no latency histograms, no warmup phases — just enough to
//! exercise the server under concurrent load.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::info;

use crate::error::ClientError;

struct Counters {
    connected: AtomicU64,
    failed: AtomicU64,
}

pub fn run(host: &str, port: u16, count: usize) -> Result<(), ClientError> {
    let counters = Arc::new(Counters {
        connected: AtomicU64::new(0),
        failed: AtomicU64::new(0),
    });

    let start = Instant::now();
    let mut handles = Vec::with_capacity(count);

    for i in 0..count {
        let host = host.to_string();
        let counters = Arc::clone(&counters);
        handles.push(std::thread::spawn(move || {
            let name = format!("stress{i}");
            match crate::server::bot::run(port, &name) {
                Ok(()) => {
                    counters.connected.fetch_add(1, Ordering::Relaxed);
                }
                Err(_) => {
                    counters.failed.fetch_add(1, Ordering::Relaxed);
                }
            }
            let _ = host;
        }));
    }

    // Bots loop forever on a healthy connection; give the run a fixed
    // window, then let the process exit, which drops every socket.
    std::thread::sleep(Duration::from_secs(10));

    info!(
        requested = count,
        connected = counters.connected.load(Ordering::Relaxed),
        failed = counters.failed.load(Ordering::Relaxed),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "stress run finished"
    );

    Ok(())
}
