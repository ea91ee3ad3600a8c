use modbus::server::config::{FunctionSet, ServerConfig};
use modbus::server::events::ServerEvent;
use modbus::server::Server;
use modbus::transport::prelude::*;

use clap::Parser;
use env_logger::Builder;
use log::{info, LevelFilter};
use std::net::IpAddr;
use tokio::signal;

/// Modbus slave with an in-memory register store.
///
/// RUST_LOG changes output verbosity: error, warn, info, debug, trace. info by default.
#[derive(Parser, Debug)]
#[command(name = "modbus-slave", version)]
struct Args {
    /// Transports to serve, e.g. tcp:0.0.0.0:505, udp:0.0.0.0:505,
    /// serial:/dev/ttyUSB0:19200-8-E-1
    #[arg(default_value = "tcp:0.0.0.0:505")]
    addresses: Vec<Settings>,

    /// Unit id this slave answers to. Requests for id 0 are answered too
    #[arg(long, default_value_t = 1)]
    unit_id: u8,

    /// Function codes answered with "illegal function", e.g. 5,6,15
    #[arg(long)]
    disable: Option<FunctionSet>,

    /// Accept TCP connections from this host only
    #[arg(long)]
    allowed_peer: Option<IpAddr>,

    /// Holding register preset as a float, ADDRESS=VALUE. Can be repeated
    #[arg(long = "float", value_parser = parse_float)]
    floats: Vec<(u16, f32)>,
}

fn parse_float(s: &str) -> Result<(u16, f32), String> {
    let (address, value) = s.split_once('=').ok_or("expected ADDRESS=VALUE")?;
    let address = address
        .trim()
        .parse()
        .map_err(|_| format!("invalid address {address}"))?;
    let value = value
        .trim()
        .parse()
        .map_err(|_| format!("invalid value {value}"))?;
    Ok((address, value))
}

async fn wait_ctrl_c() {
    info!("press ctrl+c to exit");
    let _ = signal::ctrl_c().await;
    info!("stopping...");
}

fn init_logger() {
    Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logger();

    let config = ServerConfig {
        unit_id: args.unit_id,
        disabled: args.disable.unwrap_or_default(),
    };
    let server = Server::new(config);
    for (address, value) in &args.floats {
        server.store().set_holding_float(*address, *value);
    }

    let settings: Vec<Settings> = args
        .addresses
        .into_iter()
        .map(|mut settings| {
            settings.allowed_peer = args.allowed_peer;
            settings
        })
        .collect();

    let mut events = server.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                ServerEvent::LogDataChanged => {}
                event => info!("{:?}", event),
            }
        }
    });

    let handle = server.start(&settings).await?;
    info!(
        "unit id {}, disabled functions [{}]",
        config.unit_id, config.disabled
    );
    wait_ctrl_c().await;
    handle.stop().await;
    Ok(())
}
