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

//! Serial to Telnet Bridge
//!
//! This crate connects a serial line speaking the Hayes AT dialect to a remote telnet
//! server. A terminal or retro computer on the serial port dials with `ATDT host:port`
//! and then talks to the server as if through a real modem.
//!
//! # Architecture
//!
//! Two worker threads share a [`BridgeContext`]:
//!
//! ```text
//!  serial port -> SerialWorker -> serial_to_telnet -> TelnetWorker -> TelnetSession
//!  (HayesModem,    (HayesFilter)    SyncRingBuffer     (StreamFilter)   (TelnetCodec)
//!   result codes) <------------- telnet_to_serial <-------------------
//! ```
//!
//! The serial worker owns the port and the modem emulation. In command mode it
//! interprets AT commands and asks the telnet worker to dial or hang up; online it
//! forwards data while watching for the `+++` escape. The telnet worker owns the socket,
//! performs those requests and reports connects and carrier loss back as
//! [`ModemNotice`]s.
//!
//! # Example
//!
//! ```no_run
//! use modembridge_service::{Bridge, Settings};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = Settings::from_file("/etc/modembridge.conf")?;
//!     let bridge = Bridge::open(settings)?;
//!     std::thread::sleep(std::time::Duration::from_secs(60));
//!     let snapshot = bridge.shutdown()?;
//!     println!("{snapshot}");
//!     Ok(())
//! }
//! ```

mod bridge;
mod config;
mod context;
mod datalog;
mod error;
mod health;
mod metrics;
mod serial;
mod serial_worker;
mod session;
mod telnet_worker;
mod types;

pub use bridge::Bridge;
pub use config::{
    FlowControl, LineSettings, MIN_BUFFER_SIZE, Parity, SUPPORTED_BAUD_RATES, Settings,
};
pub use context::BridgeContext;
pub use datalog::{BYTES_PER_LINE, DataLog, Direction, format_line};
pub use error::{BridgeError, ConfigError, Result};
pub use health::{
    HealthCheck, HealthStatus, MODEM_TIMEOUT, TELNET_TIMEOUT, check_modem, check_serial_device,
    check_telnet_server, run_startup_checks,
};
pub use self::metrics::{BridgeMetrics, MetricsSnapshot};
pub use serial::{DEFAULT_READ_TIMEOUT, SerialPort};
pub use serial_worker::{CHUNK_SIZE, SerialWorker};
pub use session::{RecvStatus, SessionState, TelnetSession};
pub use telnet_worker::TelnetWorker;
pub use types::{BridgeState, LinkRequest, ModemNotice};
