//! ECU Realtime Telemetry Console
//!
//! Thin consumer around the poll loop: opens the serial link, runs the
//! scheduler, and prints one fixed-width table row per decoded sample.
//! Usage: `rt-console [port] [baud] [sample_blackout|partial_blackout]`;
//! the port name `mock` runs against a simulated ECU with no hardware
//! attached.

use anyhow::Context;
use poll_scheduler::{PollEvent, PollScheduler, SchedulerConfig};
use rt_protocol::{ChannelConfig, MockChannel, SerialChannel, TelemetrySample};
use sample_validator::ValidityPolicy;
use tokio::sync::mpsc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

fn init_logging() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");
}

fn fmt_field(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", decimals, v),
        None => "N/A".to_string(),
    }
}

fn print_header() {
    let header = format!(
        "{:>6} {:>6} {:>8} {:>6} {:>6} {:>6}",
        "RPM", "TPS_%", "MAP_kPa", "CLT_C", "IAT_C", "AFR"
    );
    println!("{}", header);
    println!("{}", "-".repeat(header.len()));
}

fn print_row(sample: &TelemetrySample) {
    println!(
        "{:>6} {:>6} {:>8} {:>6} {:>6} {:>6}",
        fmt_field(sample.rpm, 0),
        fmt_field(sample.tps, 1),
        fmt_field(sample.map, 1),
        fmt_field(sample.clt, 1),
        fmt_field(sample.iat, 1),
        fmt_field(sample.afr, 2),
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    info!("=== ECU Realtime Console v{} ===", env!("CARGO_PKG_VERSION"));

    let defaults = ChannelConfig::default();
    let mut args = std::env::args().skip(1);
    let port = args.next().unwrap_or(defaults.port);
    let baud_rate = match args.next() {
        Some(baud) => baud.parse().context("baud rate must be an integer")?,
        None => defaults.baud_rate,
    };
    let validity_policy = match args.next().as_deref() {
        None => ValidityPolicy::default(),
        Some("sample_blackout") => ValidityPolicy::SampleBlackout,
        Some("partial_blackout") => ValidityPolicy::PartialBlackout,
        Some(other) => anyhow::bail!("unknown validity policy: {}", other),
    };

    let mut scheduler = PollScheduler::new(SchedulerConfig {
        validity_policy,
        ..Default::default()
    });
    let handle = scheduler.handle();
    let (tx, mut rx) = mpsc::channel(32);

    // Ctrl+C requests a cooperative stop at the next cycle boundary.
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Stopping poll loop");
            handle.stop();
        }
    });

    let poller = if port == "mock" {
        let mut channel = MockChannel::simulated();
        tokio::spawn(async move { scheduler.run(&mut channel, tx).await })
    } else {
        let mut channel = SerialChannel::open(&ChannelConfig { port, baud_rate })?;
        tokio::spawn(async move { scheduler.run(&mut channel, tx).await })
    };

    print_header();
    while let Some(event) = rx.recv().await {
        match event {
            PollEvent::Sample(sample) => print_row(&sample),
            PollEvent::NoResponse => println!("No response"),
        }
    }

    poller.await??;
    Ok(())
}
