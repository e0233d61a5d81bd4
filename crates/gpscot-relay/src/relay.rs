use chrono::Utc;
use gpscot_client::{CotSender, Transport};
use gpscot_core::{
    AppConfig, DiagnosticSink, ErrorKind, Fix, FixError, Identity, TransportError,
};
use gpscot_cot::{CotEncoder, EncoderError, DEFAULT_STALE_AFTER};
use gpscot_nmea::{FixSource, SerialFixReader, StopFlag};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Errors that end a run or prevent it from starting
#[derive(Debug, Error)]
pub enum RelayError {
    /// A persistent session could not be opened or failed mid-run
    #[error("{message}")]
    Fatal { kind: ErrorKind, message: String },

    /// The stale window cannot be represented
    #[error("Invalid stale window: {0}")]
    Encoder(#[from] EncoderError),

    /// The transport could not be set up
    #[error("Transport setup failed: {0}")]
    Transport(#[source] TransportError),
}

impl RelayError {
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            RelayError::Fatal { kind, .. } => Some(*kind),
            RelayError::Encoder(_) => None,
            RelayError::Transport(e) => Some(e.kind()),
        }
    }
}

/// Cadence and output settings of a run
#[derive(Debug, Clone)]
pub struct RelaySettings {
    /// Delay between the end of one cycle and the start of the next
    pub cycle_interval: Duration,
    /// Validity window of every event
    pub stale_after: Duration,
    /// Stop after this many cycles; `None` runs until cancelled
    pub max_cycles: Option<u64>,
    /// Print every encoded event to stdout
    pub echo_events: bool,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            cycle_interval: Duration::from_secs(20),
            stale_after: DEFAULT_STALE_AFTER,
            max_cycles: None,
            echo_events: true,
        }
    }
}

impl From<&AppConfig> for RelaySettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            cycle_interval: config.timing.cycle_interval(),
            stale_after: config.timing.stale_after(),
            max_cycles: config.relay.max_cycles,
            echo_events: config.output.echo_events,
        }
    }
}

/// Counters for a finished run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Cycles started
    pub cycles: u64,
    /// Cycles that produced a fix and an encoded event
    pub encoded: u64,
    /// Events accepted by the transport
    pub delivered: u64,
    /// Failures reported during the run
    pub failures: u64,
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} cycles, {} events encoded, {} delivered, {} failures",
            self.cycles, self.encoded, self.delivered, self.failures
        )
    }
}

/// Wording used when a transport error is reported
fn describe(transport: &str, err: &TransportError) -> String {
    match err.kind() {
        ErrorKind::TransportConnect => format!("{} connection failed: {}", transport, err),
        _ => err.to_string(),
    }
}

async fn acquire_fix<S: FixSource + 'static>(source: Arc<Mutex<S>>) -> Result<Fix, FixError> {
    // Serial reads block; keep them off the runtime thread
    tokio::task::spawn_blocking(move || source.lock().next_fix())
        .await
        .map_err(|e| FixError::Interrupted {
            reason: e.to_string(),
        })?
}

/// The fix, encode, deliver, sleep loop.
///
/// `link` holds the transport, or the error that prevented selecting one;
/// with an unsupported selector every cycle still acquires and encodes, then
/// reports the selector instead of sending.
pub struct Relay<S, T> {
    source: Arc<Mutex<S>>,
    stop: Option<StopFlag>,
    link: Result<T, TransportError>,
    identity: Identity,
    encoder: CotEncoder,
    settings: RelaySettings,
    sink: Arc<dyn DiagnosticSink>,
}

impl<S, T> Relay<S, T>
where
    S: FixSource + 'static,
    T: CotSender,
{
    pub fn new(
        source: S,
        link: Result<T, TransportError>,
        identity: Identity,
        settings: RelaySettings,
        sink: Arc<dyn DiagnosticSink>,
    ) -> Result<Self, RelayError> {
        let encoder = CotEncoder::new(settings.stale_after)?;
        Ok(Self {
            stop: source.stop_flag(),
            source: Arc::new(Mutex::new(source)),
            link,
            identity,
            encoder,
            settings,
            sink,
        })
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn settings(&self) -> &RelaySettings {
        &self.settings
    }

    /// Runs until `cancel` fires, the cycle cap is reached or a persistent
    /// session fails.
    ///
    /// Cancelling during a fix read ends the run without waiting for the
    /// read; the source's stop flag, if any, is raised so the read ends too.
    /// The transport is closed on every exit path.
    pub async fn run(mut self, cancel: CancellationToken) -> Result<RunReport, RelayError> {
        let mut report = RunReport::default();
        info!(
            uid = %self.identity.uid(),
            interval_secs = self.settings.cycle_interval.as_secs_f64(),
            "Relay started"
        );

        let outcome = match self.open_persistent().await {
            Ok(()) => self.run_cycles(&cancel, &mut report).await,
            Err(e) => {
                report.failures += 1;
                Err(e)
            }
        };

        self.close(&report).await;
        outcome.map(|()| report)
    }

    async fn open_persistent(&mut self) -> Result<(), RelayError> {
        let Ok(transport) = &mut self.link else {
            return Ok(());
        };
        if !transport.is_persistent() {
            return Ok(());
        }

        match transport.connect().await {
            Ok(()) => {
                info!("{} session established", transport.name());
                Ok(())
            }
            Err(e) => {
                let kind = e.kind();
                let message = describe(transport.name(), &e);
                self.sink.fatal(kind, message.clone());
                Err(RelayError::Fatal { kind, message })
            }
        }
    }

    async fn run_cycles(
        &mut self,
        cancel: &CancellationToken,
        report: &mut RunReport,
    ) -> Result<(), RelayError> {
        loop {
            if cancel.is_cancelled() {
                info!("Relay cancelled");
                return Ok(());
            }

            report.cycles += 1;
            let acquired = tokio::select! {
                _ = cancel.cancelled() => {
                    if let Some(stop) = &self.stop {
                        stop.stop();
                    }
                    info!("Relay cancelled during fix acquisition");
                    return Ok(());
                }
                acquired = acquire_fix(Arc::clone(&self.source)) => acquired,
            };
            self.cycle(acquired, report).await?;

            if let Some(max) = self.settings.max_cycles {
                if report.cycles >= max {
                    info!(cycles = report.cycles, "Cycle limit reached");
                    return Ok(());
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Relay cancelled");
                    return Ok(());
                }
                _ = sleep(self.settings.cycle_interval) => {}
            }
        }
    }

    /// Encodes and delivers one acquisition; `Err` only for a fatal failure.
    async fn cycle(
        &mut self,
        acquired: Result<Fix, FixError>,
        report: &mut RunReport,
    ) -> Result<(), RelayError> {
        let fix = match acquired {
            Ok(fix) => fix,
            Err(e) => {
                report.failures += 1;
                self.sink
                    .error(ErrorKind::NoFix, format!("Invalid GPS fix: {}", e));
                return Ok(());
            }
        };
        debug!(%fix, "Fix acquired");

        let event = self.encoder.encode(&self.identity, &fix, Utc::now());
        report.encoded += 1;
        if self.settings.echo_events {
            println!("{}", event);
        }

        let transport = match &mut self.link {
            Ok(transport) => transport,
            Err(e) => {
                report.failures += 1;
                self.sink.error(e.kind(), e.to_string());
                return Ok(());
            }
        };

        match transport.deliver(&event).await {
            Ok(()) => {
                report.delivered += 1;
                debug!(transport = transport.name(), "Event delivered");
                Ok(())
            }
            Err(e) => {
                report.failures += 1;
                let kind = e.kind();
                let message = describe(transport.name(), &e);
                if transport.is_persistent() {
                    self.sink.fatal(kind, message.clone());
                    Err(RelayError::Fatal { kind, message })
                } else {
                    self.sink.error(kind, message);
                    Ok(())
                }
            }
        }
    }

    async fn close(&mut self, report: &RunReport) {
        match &mut self.link {
            Ok(transport) => {
                transport.disconnect().await;
                let snapshot = transport.status().metrics().snapshot();
                info!(
                    transport = transport.name(),
                    "Relay stopped: {}; transport: {}", report, snapshot
                );
            }
            Err(_) => warn!("Relay stopped without a transport: {}", report),
        }
    }
}

/// Assembles the serial reader and the configured transport.
///
/// An unsupported protocol selector is not an error here; it is carried
/// into the run and reported every cycle.
/// Unreadable TLS certificate or key material is a startup error in both
/// the persistent and the per-event TLS lifecycle.
pub fn build_relay(
    config: &AppConfig,
    sink: Arc<dyn DiagnosticSink>,
) -> Result<Relay<SerialFixReader, Transport>, RelayError> {
    let link = match Transport::from_app_config(config, Arc::clone(&sink)) {
        Ok(transport) => Ok(transport),
        Err(e @ TransportError::UnsupportedProtocol { .. }) => {
            warn!("{}", e);
            Err(e)
        }
        Err(e) => return Err(RelayError::Transport(e)),
    };

    let source = SerialFixReader::new(&config.serial, Arc::clone(&sink));
    Relay::new(
        source,
        link,
        config.identity(),
        RelaySettings::from(config),
        sink,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use gpscot_core::MemorySink;

    #[test]
    fn test_settings_from_config() {
        let mut config = AppConfig::default();
        config.timing.cycle_interval_secs = 5;
        config.relay.max_cycles = Some(3);
        config.output.echo_events = false;

        let settings = RelaySettings::from(&config);
        assert_eq!(settings.cycle_interval, Duration::from_secs(5));
        assert_eq!(settings.stale_after, Duration::from_secs(120));
        assert_eq!(settings.max_cycles, Some(3));
        assert!(!settings.echo_events);
    }

    #[test]
    fn test_default_stale_window_matches_encoder() {
        let settings = RelaySettings::default();
        assert_eq!(settings.stale_after, DEFAULT_STALE_AFTER);

        let encoder = CotEncoder::new(settings.stale_after).unwrap();
        assert_eq!(encoder, CotEncoder::default());
    }

    #[test]
    fn test_describe_transport_errors() {
        let connect = TransportError::connect_failed("10.0.0.1:8089", "connection refused");
        assert_eq!(
            describe("TLS", &connect),
            "TLS connection failed: Failed to connect to 10.0.0.1:8089: connection refused"
        );

        let send = TransportError::send_failed("TCP", "broken pipe");
        assert_eq!(describe("TCP", &send), "TCP send error: broken pipe");
    }

    #[test]
    fn test_build_relay_keeps_unsupported_selector() {
        let mut config = AppConfig::default();
        config.destination.protocol = "FOO".to_string();

        let relay = build_relay(&config, Arc::new(MemorySink::new())).unwrap();
        assert!(matches!(
            relay.link,
            Err(TransportError::UnsupportedProtocol { .. })
        ));
    }

    #[test]
    fn test_build_relay_rejects_missing_tls_material() {
        let mut config = AppConfig::default();
        config.destination.protocol = "TLS".to_string();
        config.tls.client_cert = Some("/nonexistent/client.pem".into());
        config.tls.client_key = Some("/nonexistent/client.key".into());

        let err = match build_relay(&config, Arc::new(MemorySink::new())) {
            Ok(_) => panic!("missing client material must fail setup"),
            Err(e) => e,
        };
        assert!(matches!(err, RelayError::Transport(_)));
        assert_eq!(err.kind(), Some(ErrorKind::TransportConnect));
    }

    #[test]
    fn test_identity_from_config() {
        let mut config = AppConfig::default();
        config.identity.callsign = "Rover".to_string();
        config.identity.uid = Some("rover-1".to_string());

        let relay = build_relay(&config, Arc::new(MemorySink::new())).unwrap();
        assert_eq!(relay.identity().uid(), "rover-1");
        assert_eq!(relay.identity().callsign(), "Rover");
    }
}
