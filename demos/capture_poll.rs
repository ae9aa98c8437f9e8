//! Capture polling example.
//!
//! Polls the default input device for 20ms blocks and prints their level.
//!
//! Run with: cargo run --example capture_poll

use std::time::{Duration, Instant};

use stream_timeline::AudioStream;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for debug output
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut stream = AudioStream::builder()
        .capture()
        .sample_rate(16000)
        .channels(1)
        .build()?;

    println!("Capturing for 5 seconds...");

    // 20ms of 16kHz mono
    let mut block = vec![0u8; 640];
    let start = Instant::now();
    while start.elapsed() < Duration::from_secs(5) {
        // Drop backlog so the meter tracks real time.
        if stream.dequeue(&mut block, true) == 0 {
            std::thread::sleep(Duration::from_millis(5));
            continue;
        }
        let peak = block
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]).unsigned_abs())
            .max()
            .unwrap_or(0);
        let bars = usize::from(peak / 1024);
        println!("{:>6} {}", peak, "#".repeat(bars));
    }

    println!("Stats: {:?}", stream.stats());
    stream.close();

    Ok(())
}
