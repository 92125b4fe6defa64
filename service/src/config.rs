//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Bridge configuration
//!
//! Settings come from a `key=value` text file. `#` starts a comment unless it appears inside a
//! quoted value, and values may be wrapped in single or double quotes.
//!
//! # Examples
//!
//! ```
//! use modembridge_service::{Parity, Settings};
//!
//! let settings = Settings::parse(
//!     "serial_port = /dev/ttyS0   # first UART\n\
//!      baudrate = 2400\n\
//!      parity = even\n\
//!      telnet_host = \"bbs.example.org\"\n",
//! )
//! .unwrap();
//! assert_eq!(settings.serial_port, "/dev/ttyS0");
//! assert_eq!(settings.line.baud_rate, 2400);
//! assert_eq!(settings.line.parity, Parity::Even);
//! assert_eq!(settings.telnet_host, "bbs.example.org");
//! ```
//!
//! ## Builder
//!
//! ```
//! use modembridge_service::Settings;
//! use std::time::Duration;
//!
//! let settings = Settings::new("/dev/ttyUSB1")
//!     .with_telnet("localhost", 2323)
//!     .with_connect_timeout(Duration::from_secs(5));
//! assert!(settings.validate().is_ok());
//! ```

use crate::error::ConfigError;
use modembridge_ansicodec::AnsiMode;
use modembridge_hayes::registers::MAX_GUARD_TIME;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

/// Line rates a serial port can be configured with.
pub const SUPPORTED_BAUD_RATES: [u32; 11] = [
    300, 600, 1200, 2400, 4800, 9600, 19200, 38400, 57600, 115200, 230400,
];

/// Smallest accepted ring buffer size.
pub const MIN_BUFFER_SIZE: usize = 64;

/// Serial parity.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Parity {
    /// No parity bit
    #[default]
    None,
    /// Even parity
    Even,
    /// Odd parity
    Odd,
}

impl FromStr for Parity {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "none" | "n" => Ok(Parity::None),
            "even" | "e" => Ok(Parity::Even),
            "odd" | "o" => Ok(Parity::Odd),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Parity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Parity::None => write!(f, "none"),
            Parity::Even => write!(f, "even"),
            Parity::Odd => write!(f, "odd"),
        }
    }
}

/// Serial flow control.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum FlowControl {
    /// No flow control
    #[default]
    None,
    /// Software flow control
    XonXoff,
    /// Hardware flow control
    RtsCts,
    /// Software and hardware flow control
    Both,
}

impl FromStr for FlowControl {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "none" => Ok(FlowControl::None),
            "xonxoff" | "xon-xoff" | "software" => Ok(FlowControl::XonXoff),
            "rtscts" | "rts-cts" | "hardware" => Ok(FlowControl::RtsCts),
            "both" => Ok(FlowControl::Both),
            _ => Err(()),
        }
    }
}

impl fmt::Display for FlowControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowControl::None => write!(f, "none"),
            FlowControl::XonXoff => write!(f, "xonxoff"),
            FlowControl::RtsCts => write!(f, "rtscts"),
            FlowControl::Both => write!(f, "both"),
        }
    }
}

/// Serial line parameters.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct LineSettings {
    /// Line rate, one of [`SUPPORTED_BAUD_RATES`]
    pub baud_rate: u32,
    /// Parity bit
    pub parity: Parity,
    /// 7 or 8
    pub data_bits: u8,
    /// 1 or 2
    pub stop_bits: u8,
    /// Flow control
    pub flow_control: FlowControl,
}

impl Default for LineSettings {
    fn default() -> Self {
        Self {
            baud_rate: 9600,
            parity: Parity::None,
            data_bits: 8,
            stop_bits: 1,
            flow_control: FlowControl::None,
        }
    }
}

impl fmt::Display for LineSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parity = match self.parity {
            Parity::None => 'N',
            Parity::Even => 'E',
            Parity::Odd => 'O',
        };
        write!(
            f,
            "{} {}{}{} flow={}",
            self.baud_rate, self.data_bits, parity, self.stop_bits, self.flow_control
        )
    }
}

/// Validated bridge settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Serial device path
    pub serial_port: String,

    /// Serial line parameters
    pub line: LineSettings,

    /// Telnet server dialed when the dial string names no host
    pub telnet_host: String,

    /// Telnet port used when the dial string names none
    pub telnet_port: u16,

    /// Write a hex dump of all traffic to `data_log_file`
    pub data_log_enabled: bool,

    /// Data log path
    pub data_log_file: PathBuf,

    /// Capacity of each direction's ring buffer
    pub buffer_size: usize,

    /// Silence required before the `+++` escape
    pub escape_guard_time: Duration,

    /// Give up on a telnet connect after this long
    pub connect_timeout: Duration,

    /// Pass or strip ANSI escape sequences going to the serial line
    pub ansi_filter: AnsiMode,

    /// Negotiate telnet binary mode in both directions
    pub telnet_binary: bool,

    /// Drop the call on malformed IAC sequences instead of skipping them
    pub telnet_strict: bool,

    /// Probe the modem with `AT` during startup checks
    pub modem_probe: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            serial_port: "/dev/ttyUSB0".to_string(),
            line: LineSettings::default(),
            telnet_host: "localhost".to_string(),
            telnet_port: 23,
            data_log_enabled: false,
            data_log_file: PathBuf::from("modembridge-data.log"),
            buffer_size: 4096,
            escape_guard_time: Duration::from_millis(1000),
            connect_timeout: Duration::from_secs(30),
            ansi_filter: AnsiMode::Pass,
            telnet_binary: true,
            telnet_strict: false,
            modem_probe: false,
        }
    }
}

impl Settings {
    /// Create settings for the given serial device with everything else defaulted
    pub fn new(serial_port: impl Into<String>) -> Self {
        Self {
            serial_port: serial_port.into(),
            ..Default::default()
        }
    }

    /// Set the serial line parameters
    pub fn with_line(mut self, line: LineSettings) -> Self {
        self.line = line;
        self
    }

    /// Set the default telnet server
    pub fn with_telnet(mut self, host: impl Into<String>, port: u16) -> Self {
        self.telnet_host = host.into();
        self.telnet_port = port;
        self
    }

    /// Enable the data log at `path`
    pub fn with_data_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_log_enabled = true;
        self.data_log_file = path.into();
        self
    }

    /// Set the ring buffer capacity
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Set the escape guard time
    pub fn with_guard_time(mut self, guard: Duration) -> Self {
        self.escape_guard_time = guard;
        self
    }

    /// Set the connection timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the ANSI filter mode
    pub fn with_ansi_filter(mut self, mode: AnsiMode) -> Self {
        self.ansi_filter = mode;
        self
    }

    /// Enable or disable binary mode negotiation
    pub fn with_telnet_binary(mut self, enabled: bool) -> Self {
        self.telnet_binary = enabled;
        self
    }

    /// Treat malformed telnet input as a protocol violation
    pub fn with_telnet_strict(mut self, strict: bool) -> Self {
        self.telnet_strict = strict;
        self
    }

    /// Loads and validates settings from a file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        debug!(path = %path.display(), "loaded configuration file");
        let settings = Self::parse(&text)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Parses configuration text on top of the defaults.
    ///
    /// Unknown keys are logged and skipped. The result is not validated.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let mut settings = Settings::default();
        for (index, raw) in text.lines().enumerate() {
            let line = index + 1;
            let content = strip_comment(raw).trim();
            if content.is_empty() {
                continue;
            }
            let Some((key, value)) = content.split_once('=') else {
                return Err(ConfigError::Syntax { line });
            };
            let key = key.trim();
            let value = unquote(value.trim());
            if !settings.apply(key, value).map_err(|()| ConfigError::InvalidValue {
                line,
                key: key.to_string(),
                value: value.to_string(),
            })? {
                warn!(line, key, "ignoring unknown configuration key");
            }
        }
        Ok(settings)
    }

    /// Checks constraints between fields.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.serial_port.is_empty() {
            return Err(ConfigError::Invalid("serial_port must not be empty".into()));
        }
        if !self.telnet_host.is_empty() && self.telnet_port == 0 {
            return Err(ConfigError::Invalid("telnet_port must not be 0".into()));
        }
        if self.buffer_size < MIN_BUFFER_SIZE {
            return Err(ConfigError::Invalid(format!(
                "buffer_size must be at least {MIN_BUFFER_SIZE}"
            )));
        }
        if !SUPPORTED_BAUD_RATES.contains(&self.line.baud_rate) {
            return Err(ConfigError::Invalid(format!(
                "unsupported baudrate {}",
                self.line.baud_rate
            )));
        }
        if self.escape_guard_time > MAX_GUARD_TIME {
            warn!(
                guard_ms = self.escape_guard_time.as_millis() as u64,
                max_ms = MAX_GUARD_TIME.as_millis() as u64,
                "escape_guard_time exceeds the S12 range and will be clamped"
            );
        }
        if self.data_log_enabled && self.data_log_file.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(
                "data_log_file must be set when data_log_enabled".into(),
            ));
        }
        Ok(())
    }

    /// Applies one key. `Ok(false)` for an unknown key.
    fn apply(&mut self, key: &str, value: &str) -> Result<bool, ()> {
        match key {
            "serial_port" => self.serial_port = value.to_string(),
            "baudrate" => {
                let baud = value.parse::<u32>().map_err(drop)?;
                if !SUPPORTED_BAUD_RATES.contains(&baud) {
                    return Err(());
                }
                self.line.baud_rate = baud;
            }
            "parity" => self.line.parity = value.parse()?,
            "data_bits" => {
                self.line.data_bits = match value {
                    "7" => 7,
                    "8" => 8,
                    _ => return Err(()),
                }
            }
            "stop_bits" => {
                self.line.stop_bits = match value {
                    "1" => 1,
                    "2" => 2,
                    _ => return Err(()),
                }
            }
            "flow_control" => self.line.flow_control = value.parse()?,
            "telnet_host" => self.telnet_host = value.to_string(),
            "telnet_port" => self.telnet_port = value.parse().map_err(drop)?,
            "data_log_enabled" => self.data_log_enabled = parse_bool(value)?,
            "data_log_file" => self.data_log_file = PathBuf::from(value),
            "buffer_size" => self.buffer_size = value.parse().map_err(drop)?,
            "escape_guard_time" => {
                self.escape_guard_time = Duration::from_millis(value.parse().map_err(drop)?)
            }
            "connect_timeout" => {
                self.connect_timeout = Duration::from_secs(value.parse().map_err(drop)?)
            }
            "ansi_filter" => self.ansi_filter = value.parse().map_err(drop)?,
            "telnet_binary" => self.telnet_binary = parse_bool(value)?,
            "telnet_strict" => self.telnet_strict = parse_bool(value)?,
            "modem_probe" => self.modem_probe = parse_bool(value)?,
            _ => return Ok(false),
        }
        Ok(true)
    }
}

fn parse_bool(value: &str) -> Result<bool, ()> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(()),
    }
}

/// Cuts a trailing `#` comment that is not inside quotes.
fn strip_comment(line: &str) -> &str {
    let mut quote = None;
    for (index, ch) in line.char_indices() {
        match (quote, ch) {
            (None, '#') => return &line[..index],
            (None, '"' | '\'') => quote = Some(ch),
            (Some(open), _) if open == ch => quote = None,
            _ => {}
        }
    }
    line
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}
