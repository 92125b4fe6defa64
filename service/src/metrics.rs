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

//! Lock-free metrics for the bridge

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Lock-free bridge metrics
///
/// All metrics are stored as atomics and can be updated from both workers without locks.
/// Use the `snapshot()` method to get a view of all metrics at a point in time.
#[derive(Debug)]
pub struct BridgeMetrics {
    // Throughput
    serial_bytes_in: AtomicU64,
    serial_bytes_out: AtomicU64,
    telnet_bytes_in: AtomicU64,
    telnet_bytes_out: AtomicU64,

    // Modem
    suppressed_commands: AtomicU64,
    escapes: AtomicU64,

    // Connections
    connections: AtomicU64,
    failed_connections: AtomicU64,
    carrier_losses: AtomicU64,
    iac_commands: AtomicU64,

    started_at: Instant,
}

impl Default for BridgeMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl BridgeMetrics {
    /// Create a new metrics instance
    pub fn new() -> Self {
        Self {
            serial_bytes_in: AtomicU64::new(0),
            serial_bytes_out: AtomicU64::new(0),
            telnet_bytes_in: AtomicU64::new(0),
            telnet_bytes_out: AtomicU64::new(0),
            suppressed_commands: AtomicU64::new(0),
            escapes: AtomicU64::new(0),
            connections: AtomicU64::new(0),
            failed_connections: AtomicU64::new(0),
            carrier_losses: AtomicU64::new(0),
            iac_commands: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }

    // Throughput tracking

    /// Record bytes read from the serial line
    pub fn serial_received(&self, count: usize) {
        self.serial_bytes_in.fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Record bytes written to the serial line
    pub fn serial_sent(&self, count: usize) {
        self.serial_bytes_out.fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Record bytes read from the telnet socket
    pub fn telnet_received(&self, count: usize) {
        self.telnet_bytes_in.fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Record bytes written to the telnet socket
    pub fn telnet_sent(&self, count: usize) {
        self.telnet_bytes_out.fetch_add(count as u64, Ordering::Relaxed);
    }

    // Modem tracking

    /// Record AT lines dropped from online data
    pub fn commands_suppressed(&self, count: usize) {
        self.suppressed_commands.fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Record a `+++` escape
    pub fn escape_detected(&self) {
        self.escapes.fetch_add(1, Ordering::Relaxed);
    }

    // Connection tracking

    /// Record an established telnet session
    pub fn connection_opened(&self) {
        self.connections.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a dial that did not connect
    pub fn connection_failed(&self) {
        self.failed_connections.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a session dropped by the peer or an I/O error
    pub fn carrier_lost(&self) {
        self.carrier_losses.fetch_add(1, Ordering::Relaxed);
    }

    /// Record IAC commands stripped from telnet input
    pub fn iac_commands(&self, count: u64) {
        self.iac_commands.fetch_add(count, Ordering::Relaxed);
    }

    // Snapshot

    /// Get a snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            serial_bytes_in: self.serial_bytes_in.load(Ordering::Relaxed),
            serial_bytes_out: self.serial_bytes_out.load(Ordering::Relaxed),
            telnet_bytes_in: self.telnet_bytes_in.load(Ordering::Relaxed),
            telnet_bytes_out: self.telnet_bytes_out.load(Ordering::Relaxed),
            suppressed_commands: self.suppressed_commands.load(Ordering::Relaxed),
            escapes: self.escapes.load(Ordering::Relaxed),
            connections: self.connections.load(Ordering::Relaxed),
            failed_connections: self.failed_connections.load(Ordering::Relaxed),
            carrier_losses: self.carrier_losses.load(Ordering::Relaxed),
            iac_commands: self.iac_commands.load(Ordering::Relaxed),
            uptime: self.started_at.elapsed(),
        }
    }
}

/// A snapshot of bridge metrics at a point in time
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Bytes read from the serial line
    pub serial_bytes_in: u64,
    /// Bytes written to the serial line
    pub serial_bytes_out: u64,
    /// Raw bytes read from the telnet socket
    pub telnet_bytes_in: u64,
    /// Raw bytes written to the telnet socket
    pub telnet_bytes_out: u64,
    /// AT lines dropped from online data
    pub suppressed_commands: u64,
    /// `+++` escapes recognized
    pub escapes: u64,
    /// Telnet sessions established
    pub connections: u64,
    /// Dials that failed
    pub failed_connections: u64,
    /// Sessions lost while the modem was online
    pub carrier_losses: u64,
    /// IAC commands stripped from telnet input
    pub iac_commands: u64,
    /// Time since the bridge started
    pub uptime: Duration,
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "serial in/out {}/{}, telnet in/out {}/{}, connections {} ({} failed, {} dropped), \
             escapes {}, suppressed {}, iac {}, uptime {:?}",
            self.serial_bytes_in,
            self.serial_bytes_out,
            self.telnet_bytes_in,
            self.telnet_bytes_out,
            self.connections,
            self.failed_connections,
            self.carrier_losses,
            self.escapes,
            self.suppressed_commands,
            self.iac_commands,
            self.uptime
        )
    }
}
