//! Host-side hardware for driving a module through a USB-UART adapter.
//!
//! The adapter's data lines carry the module UART, DTR drives POWER and RTS
//! drives KEY. All three share one serial port handle (cloned).

use std::io::{Read, Write};
use std::time::Duration;

use anyhow::Result;
use bt_link_firmware::{BluetoothModule, LinkDriver, LinkError, ModeController};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{self, ErrorType, OutputPin};
use serialport::SerialPort;

/// Module driver running on the host.
pub type HostModule = BluetoothModule<HostLink, ControlLine, ControlLine, StdDelay>;

/// Find a USB-UART adapter. Returns error if none found.
pub fn find_adapter_port() -> Result<String> {
    let ports = serialport::available_ports()?;
    ports
        .into_iter()
        .map(|p| p.port_name)
        .find(|name| name.contains("ttyUSB"))
        .ok_or_else(|| anyhow::anyhow!("No USB-UART adapter found - ensure it is connected"))
}

/// Resolve a port argument - returns the port path if not "auto", otherwise auto-detects.
pub fn resolve_port(port_arg: &str) -> Result<String> {
    if port_arg == "auto" {
        find_adapter_port()
    } else {
        Ok(port_arg.to_string())
    }
}

/// Open the adapter and wrap it as a module driver.
///
/// With `active_low` the modem lines are inverted, for adapters whose
/// DTR/RTS pins go low when asserted.
pub fn open_module(port_name: &str, baud_rate: u32, active_low: bool) -> Result<HostModule> {
    let port = serialport::new(port_name, baud_rate)
        .timeout(Duration::from_secs(2))
        .open()?;

    let power = ControlLine::new(port.try_clone()?, Signal::Dtr, active_low);
    let key = ControlLine::new(port.try_clone()?, Signal::Rts, active_low);

    Ok(BluetoothModule::new(HostLink::new(port), ModeController::new(power, key), StdDelay))
}

/// Module UART over a host serial port.
pub struct HostLink {
    port: Box<dyn SerialPort>,
}

impl HostLink {
    pub fn new(port: Box<dyn SerialPort>) -> Self {
        Self { port }
    }
}

impl LinkDriver for HostLink {
    fn init(&mut self, baud: u32) -> Result<(), LinkError> {
        self.port.set_baud_rate(baud).map_err(|e| match e.kind() {
            serialport::ErrorKind::InvalidInput => LinkError::UnsupportedBaud(baud),
            _ => LinkError::ConfigError,
        })?;
        // Anything received at the old rate is garbage now
        self.port
            .clear(serialport::ClearBuffer::Input)
            .map_err(|_| LinkError::ConfigError)
    }

    fn put_byte(&mut self, byte: u8) -> Result<(), LinkError> {
        self.put_bytes(&[byte])
    }

    fn put_bytes(&mut self, data: &[u8]) -> Result<(), LinkError> {
        self.port.write_all(data).map_err(|_| LinkError::WriteError)?;
        self.port.flush().map_err(|_| LinkError::WriteError)
    }

    fn get_byte(&mut self) -> Result<u8, LinkError> {
        let mut buf = [0u8; 1];
        self.port
            .read_exact(&mut buf)
            .map_err(|_| LinkError::ReadError)?;
        Ok(buf[0])
    }

    fn available(&mut self) -> Result<bool, LinkError> {
        self.port
            .bytes_to_read()
            .map(|n| n > 0)
            .map_err(|_| LinkError::ReadError)
    }
}

/// Modem control signal used as a digital output.
#[derive(Debug, Clone, Copy)]
pub enum Signal {
    Dtr,
    Rts,
}

/// Error setting a modem control signal.
#[derive(Debug)]
pub struct ControlLineError(pub serialport::Error);

impl digital::Error for ControlLineError {
    fn kind(&self) -> digital::ErrorKind {
        digital::ErrorKind::Other
    }
}

/// POWER or KEY line driven by a modem control signal.
pub struct ControlLine {
    port: Box<dyn SerialPort>,
    signal: Signal,
    active_low: bool,
}

impl ControlLine {
    pub fn new(port: Box<dyn SerialPort>, signal: Signal, active_low: bool) -> Self {
        Self {
            port,
            signal,
            active_low,
        }
    }

    fn drive(&mut self, high: bool) -> Result<(), ControlLineError> {
        let level = high != self.active_low;
        match self.signal {
            Signal::Dtr => self.port.write_data_terminal_ready(level),
            Signal::Rts => self.port.write_request_to_send(level),
        }
        .map_err(ControlLineError)
    }
}

impl ErrorType for ControlLine {
    type Error = ControlLineError;
}

impl OutputPin for ControlLine {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.drive(false)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.drive(true)
    }
}

/// Wall-clock delay.
pub struct StdDelay;

impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(Duration::from_nanos(ns as u64));
    }

    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(Duration::from_millis(ms as u64));
    }
}
