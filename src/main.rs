use anyhow::{Context, Result};
use clap::Parser;
use gpscot_core::{AppConfig, TracingSink};
use gpscot_relay::build_relay;
use std::path::PathBuf;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

mod logging;

/// gpscot - relay USB GPS fixes to a TAK server as Cursor-on-Target events
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, env = "GPSCOT_CONFIG")]
    config: Option<PathBuf>,

    /// Transport: UDP, TCP or TLS
    #[arg(long)]
    protocol: Option<String>,

    /// TAK server host
    #[arg(long)]
    host: Option<String>,

    /// TAK server port
    #[arg(short, long)]
    port: Option<u16>,

    /// Serial device of the GPS receiver
    #[arg(short, long)]
    device: Option<String>,

    /// Serial baud rate
    #[arg(short, long)]
    baud: Option<u32>,

    /// Callsign carried by every event
    #[arg(long)]
    callsign: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long)]
    log_level: Option<String>,

    /// Stop after this many cycles
    #[arg(long)]
    cycles: Option<u64>,

    /// Print the effective configuration as YAML and exit
    #[arg(long)]
    dump_config: bool,
}

impl Args {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(protocol) = &self.protocol {
            config.destination.protocol = protocol.clone();
        }
        if let Some(host) = &self.host {
            config.destination.host = host.clone();
        }
        if let Some(port) = self.port {
            config.destination.port = port;
        }
        if let Some(device) = &self.device {
            config.serial.device = device.clone();
        }
        if let Some(baud) = self.baud {
            config.serial.baud_rate = baud;
        }
        if let Some(callsign) = &self.callsign {
            config.identity.callsign = callsign.clone();
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if let Some(cycles) = self.cycles {
            config.relay.max_cycles = Some(cycles);
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = AppConfig::from_config_builder(args.config.as_deref())
        .context("Failed to load configuration")?;
    args.apply(&mut config);

    if args.dump_config {
        print!("{}", config.to_yaml().context("Failed to render configuration")?);
        return Ok(());
    }

    config.validate().context("Invalid configuration")?;
    logging::init(&config.logging).context("Failed to initialize logging")?;

    info!(
        destination = %config.destination.address(),
        protocol = %config.destination.protocol,
        device = %config.serial.device,
        "Starting gpscot relay"
    );

    let relay = build_relay(&config, TracingSink::shared()).context("Failed to set up relay")?;
    info!(
        uid = %relay.identity().uid(),
        callsign = %relay.identity().callsign(),
        "Reporting as"
    );

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal, stopping relay...");
            on_signal.cancel();
        }
    });

    match relay.run(cancel).await {
        Ok(report) => {
            info!("Relay finished: {}", report);
            Ok(())
        }
        Err(e) => {
            error!("Relay stopped: {}", e);
            Err(e).context("Relay ended with a fatal error")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_config() {
        let args = Args::parse_from([
            "gpscot",
            "--protocol",
            "tls",
            "--host",
            "tak.local",
            "--port",
            "8089",
            "--device",
            "/dev/ttyACM0",
            "--baud",
            "9600",
            "--callsign",
            "Rover",
            "--cycles",
            "3",
        ]);

        let mut config = AppConfig::default();
        args.apply(&mut config);

        assert_eq!(config.destination.protocol, "tls");
        assert_eq!(config.destination.host, "tak.local");
        assert_eq!(config.destination.port, 8089);
        assert_eq!(config.serial.device, "/dev/ttyACM0");
        assert_eq!(config.serial.baud_rate, 9600);
        assert_eq!(config.identity.callsign, "Rover");
        assert_eq!(config.relay.max_cycles, Some(3));
        assert!(!args.dump_config);
    }

    #[test]
    fn test_no_flags_keep_defaults() {
        let args = Args::parse_from(["gpscot"]);
        let mut config = AppConfig::default();
        args.apply(&mut config);

        assert_eq!(config.destination.protocol, "UDP");
        assert_eq!(config.relay.max_cycles, None);
    }

    #[test]
    fn test_sample_config_is_valid() {
        let config = AppConfig::from_yaml(include_str!("../config/gpscot.yaml")).unwrap();
        config.validate().unwrap();
        assert_eq!(config.destination.port, 8087);
        assert_eq!(config.serial.baud_rate, 4800);
        assert_eq!(config.relay.max_cycles, None);
    }
}
