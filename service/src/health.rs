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

//! One-shot startup checks

use crate::config::Settings;
use crate::serial::SerialPort;
use std::fmt;
use std::fs;
use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::os::unix::fs::FileTypeExt;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// How long [`check_modem`] waits for `OK`.
pub const MODEM_TIMEOUT: Duration = Duration::from_secs(2);
/// How long [`check_telnet_server`] waits for the TCP handshake.
pub const TELNET_TIMEOUT: Duration = Duration::from_secs(5);

/// Outcome of a health check
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HealthStatus {
    /// Check passed
    Ok,
    /// Check passed with reservations
    Warning,
    /// Check failed
    Error,
    /// Check could not be performed
    Unknown,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthStatus::Ok => write!(f, "OK"),
            HealthStatus::Warning => write!(f, "WARNING"),
            HealthStatus::Error => write!(f, "ERROR"),
            HealthStatus::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Result of one named check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HealthCheck {
    /// Which check ran
    pub name: &'static str,
    /// Outcome
    pub status: HealthStatus,
    /// Human readable detail
    pub message: String,
}

impl HealthCheck {
    fn new(name: &'static str, status: HealthStatus, message: impl Into<String>) -> Self {
        Self {
            name,
            status,
            message: message.into(),
        }
    }

    /// Logs the check at a level matching its status.
    pub fn log(&self) {
        match self.status {
            HealthStatus::Ok => info!(check = self.name, "{}", self.message),
            HealthStatus::Warning | HealthStatus::Unknown => {
                warn!(check = self.name, status = %self.status, "{}", self.message);
            }
            HealthStatus::Error => error!(check = self.name, "{}", self.message),
        }
    }
}

/// Checks that `path` exists, is a character device and can be opened read/write.
pub fn check_serial_device(path: &str) -> HealthCheck {
    const NAME: &str = "serial_device";
    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(err) => return HealthCheck::new(NAME, HealthStatus::Error, format!("{path}: {err}")),
    };
    if !metadata.file_type().is_char_device() {
        let message = format!("{path} is not a character device");
        return HealthCheck::new(NAME, HealthStatus::Warning, message);
    }
    match fs::OpenOptions::new().read(true).write(true).open(path) {
        Ok(_) => HealthCheck::new(NAME, HealthStatus::Ok, format!("{path} is accessible")),
        Err(err) => {
            HealthCheck::new(NAME, HealthStatus::Error, format!("cannot open {path}: {err}"))
        }
    }
}

/// Sends `AT\r` over `port` and waits up to `timeout` for `OK`.
///
/// Silence or any other answer is a warning: the attached device may simply not be a
/// modem.
pub fn check_modem<P: Read + Write>(port: &mut P, timeout: Duration) -> HealthCheck {
    const NAME: &str = "modem";
    if let Err(err) = port.write_all(b"AT\r").and_then(|()| port.flush()) {
        return HealthCheck::new(NAME, HealthStatus::Error, format!("write failed: {err}"));
    }

    let deadline = Instant::now() + timeout;
    let mut response = Vec::new();
    let mut buf = [0u8; 64];
    while Instant::now() < deadline {
        match port.read(&mut buf) {
            Ok(0) => std::thread::sleep(Duration::from_millis(10)),
            Ok(n) => {
                response.extend_from_slice(&buf[..n]);
                if response.windows(2).any(|w| w == b"OK") {
                    return HealthCheck::new(NAME, HealthStatus::Ok, "modem answered OK");
                }
            }
            Err(err)
                if matches!(err.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted) =>
            {
                std::thread::sleep(Duration::from_millis(10));
            }
            Err(err) => {
                return HealthCheck::new(NAME, HealthStatus::Error, format!("read failed: {err}"));
            }
        }
    }
    if response.is_empty() {
        HealthCheck::new(NAME, HealthStatus::Warning, format!("no response within {timeout:?}"))
    } else {
        HealthCheck::new(
            NAME,
            HealthStatus::Warning,
            format!("unexpected response {:?}", String::from_utf8_lossy(&response)),
        )
    }
}

/// Checks that a TCP connection to `host:port` completes within `timeout`.
pub fn check_telnet_server(host: &str, port: u16, timeout: Duration) -> HealthCheck {
    const NAME: &str = "telnet_server";
    if host.is_empty() {
        return HealthCheck::new(NAME, HealthStatus::Unknown, "no telnet host configured");
    }
    let addrs = match (host, port).to_socket_addrs() {
        Ok(addrs) => addrs.collect::<Vec<_>>(),
        Err(err) => {
            let message = format!("cannot resolve {host}: {err}");
            return HealthCheck::new(NAME, HealthStatus::Error, message);
        }
    };
    let mut last_error = None;
    for addr in addrs {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(_) => {
                let message = format!("{host}:{port} is reachable");
                return HealthCheck::new(NAME, HealthStatus::Ok, message);
            }
            Err(err) => last_error = Some(err),
        }
    }
    let detail = last_error.map_or_else(|| "no addresses".to_string(), |err| err.to_string());
    HealthCheck::new(NAME, HealthStatus::Error, format!("{host}:{port} unreachable: {detail}"))
}

/// Runs every startup check `settings` asks for, logging each result.
pub fn run_startup_checks(settings: &Settings) -> Vec<HealthCheck> {
    let mut checks = vec![check_serial_device(&settings.serial_port)];

    if settings.modem_probe && checks[0].status == HealthStatus::Ok {
        let probe = match SerialPort::open(&settings.serial_port, &settings.line) {
            Ok(mut port) => {
                // Discard anything left over on the line before probing.
                let mut junk = [0u8; 256];
                while matches!(port.read(&mut junk), Ok(n) if n > 0) {}
                check_modem(&mut port, MODEM_TIMEOUT)
            }
            Err(err) => {
                let message = format!("cannot open port: {err}");
                HealthCheck::new("modem", HealthStatus::Error, message)
            }
        };
        checks.push(probe);
    }

    checks.push(check_telnet_server(
        &settings.telnet_host,
        settings.telnet_port,
        TELNET_TIMEOUT,
    ));

    for check in &checks {
        check.log();
    }
    checks
}
