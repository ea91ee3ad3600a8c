use modbus::master::{Client, ClientConfig};

use clap::Parser;
use env_logger::Builder;
use log::{error, info, LevelFilter};
use std::time::Duration;
use tokio::signal;

/// Polls holding registers of a Modbus TCP/UDP slave and prints them as floats.
///
/// RUST_LOG changes output verbosity: error, warn, info, debug, trace. info by default.
#[derive(Parser, Debug)]
#[command(name = "modbus-master", version)]
struct Args {
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    #[arg(long, default_value_t = 505)]
    port: u16,

    #[arg(long, default_value_t = 1)]
    unit_id: u8,

    /// First register address
    #[arg(long, default_value_t = 0)]
    start: u32,

    /// Number of registers, two per float
    #[arg(long, default_value_t = 80)]
    quantity: u16,

    /// Use Modbus UDP instead of TCP
    #[arg(long)]
    udp: bool,

    /// Print random values without talking to a slave
    #[arg(long)]
    demo: bool,

    /// Poll period in milliseconds. Reads once when omitted
    #[arg(long)]
    interval: Option<u64>,
}

fn init_logger() {
    Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();
}

async fn poll(client: &mut Client, start: u32, quantity: u16) {
    match client.read_holding_registers(start, quantity).await {
        Ok(values) => {
            let line: Vec<String> = values.iter().map(|value| value.to_string()).collect();
            println!("{}", line.join(" "));
        }
        Err(e) => error!("read failed: {}", e),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logger();

    let mut client = Client::new(ClientConfig {
        host: args.host,
        port: args.port,
        unit_id: args.unit_id,
        udp: args.udp,
        demo: args.demo,
        ..Default::default()
    });
    if !args.demo {
        client.connect().await?;
    }

    let Some(interval) = args.interval else {
        poll(&mut client, args.start, args.quantity).await;
        return Ok(());
    };

    let mut ticker = tokio::time::interval(Duration::from_millis(interval.max(1)));
    loop {
        tokio::select! {
            _ = signal::ctrl_c() => break,
            _ = ticker.tick() => poll(&mut client, args.start, args.quantity).await,
        }
    }
    info!("stopping...");
    client.disconnect();
    Ok(())
}
