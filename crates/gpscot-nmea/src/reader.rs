//! Fix acquisition from a line-oriented NMEA stream.
//!
//! [`SerialFixReader`] owns the serial device. Each [`FixSource::next_fix`]
//! call scans lines until a valid fix sentence arrives, a read times out, or
//! the device fails. A failed device handle is released and reopened on the
//! next call.

use crate::parser::{is_fix_sentence, parse_gga};
use gpscot_core::config::SerialConfig;
use gpscot_core::{DeviceError, DiagnosticSink, ErrorKind, Fix, FixError};
use serialport::SerialPort;
use std::io::{self, BufRead, BufReader};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace};

/// A blocking producer of position fixes.
///
/// Each call blocks until a fix is available or the attempt fails. The
/// sequence is infinite: an error ends one attempt, never the source.
pub trait FixSource: Send {
    fn next_fix(&mut self) -> Result<Fix, FixError>;

    /// Flag that interrupts a blocked [`next_fix`](Self::next_fix), if the
    /// source supports one.
    fn stop_flag(&self) -> Option<StopFlag> {
        None
    }
}

impl<S: FixSource + ?Sized> FixSource for Box<S> {
    fn next_fix(&mut self) -> Result<Fix, FixError> {
        (**self).next_fix()
    }

    fn stop_flag(&self) -> Option<StopFlag> {
        (**self).stop_flag()
    }
}

/// Shared flag that ends an in-progress scan.
///
/// Clones observe the same flag. A stopped scan returns
/// [`FixError::Interrupted`] at the next line boundary or read timeout.
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Scans `reader` line by line until a fix sentence parses.
///
/// `pending` holds the unfinished line between calls: bytes read before a
/// timeout are kept and completed by the next call. Bytes are decoded
/// permissively. Lines that are not fix sentences are skipped; fix sentences
/// that fail to parse are reported to `sink` as [`ErrorKind::Parse`] and
/// scanning continues. A read timeout yields [`FixError::Timeout`]; any other
/// I/O error or end of stream is returned as a device error without being
/// reported.
pub fn scan_for_fix<R: BufRead + ?Sized>(
    reader: &mut R,
    pending: &mut Vec<u8>,
    stop: &StopFlag,
    device: &str,
    timeout_ms: u64,
    sink: &dyn DiagnosticSink,
) -> Result<Fix, FixError> {
    loop {
        if stop.is_stopped() {
            return Err(FixError::Interrupted {
                reason: "acquisition stopped".to_string(),
            });
        }

        match reader.read_until(b'\n', pending) {
            Ok(0) => {
                pending.clear();
                return Err(DeviceError::Closed {
                    path: device.to_string(),
                }
                .into());
            }
            Ok(_) => {}
            Err(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) => {
                return Err(FixError::Timeout { timeout_ms });
            }
            Err(e) => {
                pending.clear();
                return Err(DeviceError::io(device, e).into());
            }
        }

        let line = String::from_utf8_lossy(pending).into_owned();
        pending.clear();
        let line = line.trim_end_matches(['\r', '\n']);
        trace!(line, "NMEA line");

        if !is_fix_sentence(line) {
            continue;
        }

        match parse_gga(line) {
            Ok(fix) => return Ok(fix),
            Err(e) => sink.error(ErrorKind::Parse, format!("GPS parse error: {}", e)),
        }
    }
}

/// Fix source backed by a serial port.
pub struct SerialFixReader {
    device: String,
    baud_rate: u32,
    read_timeout: Duration,
    port: Option<BufReader<Box<dyn SerialPort>>>,
    pending: Vec<u8>,
    stop: StopFlag,
    sink: Arc<dyn DiagnosticSink>,
}

impl SerialFixReader {
    /// Creates a reader; the device is opened on the first acquisition.
    pub fn new(config: &SerialConfig, sink: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            device: config.device.clone(),
            baud_rate: config.baud_rate,
            read_timeout: config.read_timeout(),
            port: None,
            pending: Vec::with_capacity(128),
            stop: StopFlag::new(),
            sink,
        }
    }

    /// Returns the device path.
    pub fn device(&self) -> &str {
        &self.device
    }

    /// Returns true while a device handle is held.
    pub fn is_open(&self) -> bool {
        self.port.is_some()
    }

    /// Releases the device handle and drops any unfinished line.
    pub fn close(&mut self) {
        self.pending.clear();
        if self.port.take().is_some() {
            debug!(device = %self.device, "Released serial device");
        }
    }

    fn open_port(&self) -> Result<BufReader<Box<dyn SerialPort>>, DeviceError> {
        let port = serialport::new(&self.device, self.baud_rate)
            .timeout(self.read_timeout)
            .open()
            .map_err(|e| DeviceError::open_failed(&self.device, self.baud_rate, e.to_string()))?;

        info!(device = %self.device, baud_rate = self.baud_rate, "Opened serial device");
        Ok(BufReader::new(port))
    }

    fn report_device_error(&self, error: &DeviceError) {
        self.sink
            .error(ErrorKind::Device, format!("Serial connection error: {}", error));
    }
}

impl FixSource for SerialFixReader {
    /// Stops the current and every later scan.
    fn stop_flag(&self) -> Option<StopFlag> {
        Some(self.stop.clone())
    }

    fn next_fix(&mut self) -> Result<Fix, FixError> {
        if self.port.is_none() {
            match self.open_port() {
                Ok(port) => self.port = Some(port),
                Err(e) => {
                    self.report_device_error(&e);
                    return Err(e.into());
                }
            }
        }

        let timeout_ms = self.read_timeout.as_millis() as u64;
        let Some(port) = self.port.as_mut() else {
            return Err(DeviceError::Closed {
                path: self.device.clone(),
            }
            .into());
        };

        let scanned = scan_for_fix(
            port,
            &mut self.pending,
            &self.stop,
            &self.device,
            timeout_ms,
            self.sink.as_ref(),
        );
        match scanned {
            Err(FixError::Device(e)) => {
                self.report_device_error(&e);
                self.close();
                Err(FixError::Device(e))
            }
            other => other,
        }
    }
}

impl std::fmt::Debug for SerialFixReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialFixReader")
            .field("device", &self.device)
            .field("baud_rate", &self.baud_rate)
            .field("read_timeout", &self.read_timeout)
            .field("open", &self.port.is_some())
            .field("stopped", &self.stop.is_stopped())
            .finish()
    }
}
