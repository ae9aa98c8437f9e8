//! Network playback example.
//!
//! Simulates packets arriving from the network with jitter and plays them
//! on the default output device at their timestamps.
//!
//! Run with: cargo run --example network_playback

use std::time::{Duration, Instant};

use stream_timeline::device::TestSignal;
use stream_timeline::{AudioStream, QueueRequest};
use tracing_subscriber::EnvFilter;

/// 20ms of 48kHz stereo.
const PACKET_BYTES: usize = 3840;
const PACKET_US: u64 = 20_000;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for debug output
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut stream = AudioStream::builder()
        .playback()
        .sample_rate(48000)
        .channels(2)
        .on_event(|e| tracing::warn!(?e, "stream event"))
        .build()?;

    let mut signal = TestSignal::new(48000, 2);
    signal.sine(440.0, 5000);
    let audio = signal.to_bytes();

    println!("Playing a 5 second tone with simulated network jitter...");

    let clock = Instant::now();
    let now_us = || clock.elapsed().as_micros() as u64;
    // Packets are stamped 60ms ahead of the local clock.
    let lead = 60_000;

    for (i, packet) in audio.chunks_exact(PACKET_BYTES).enumerate() {
        let i = i as u64;
        // Every third packet is late and the next two arrive in a burst.
        let jitter = if i % 3 == 0 { 40 } else { 10 };
        tokio::time::sleep(Duration::from_millis(jitter)).await;

        let request = QueueRequest::new(lead + i * PACKET_US, packet).now(now_us());
        let position = stream.queue(&request);
        tracing::debug!(packet = i, position_us = position, "queued");
    }

    tokio::time::sleep(Duration::from_millis(500)).await;
    println!("Stats: {:?}", stream.stats());
    stream.close();

    Ok(())
}
