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

//! State shared between the serial and telnet workers
//!
//! Only the two ring buffers carry data between threads. Beside them the context holds two
//! small lock-protected blocks:
//!
//! - the link block: [`BridgeState`] plus at most one pending [`LinkRequest`]
//! - the modem block: carrier and drain flags plus queued [`ModemNotice`]s
//!
//! Each lock is taken for a read-modify-write only and never held across I/O.

use crate::config::Settings;
use crate::datalog::{DataLog, Direction};
use crate::metrics::BridgeMetrics;
use crate::types::{BridgeState, LinkRequest, ModemNotice};
use modembridge_buffer::SyncRingBuffer;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{info, warn};

#[derive(Debug, Default)]
struct LinkBlock {
    state: BridgeState,
    request: Option<LinkRequest>,
}

#[derive(Debug, Default)]
struct ModemBlock {
    online: bool,
    draining: bool,
    notices: VecDeque<ModemNotice>,
}

/// Shared bridge state.
#[derive(Debug)]
pub struct BridgeContext {
    settings: Settings,
    running: AtomicBool,
    link: Mutex<LinkBlock>,
    modem: Mutex<ModemBlock>,
    serial_to_telnet: SyncRingBuffer,
    telnet_to_serial: SyncRingBuffer,
    metrics: BridgeMetrics,
    data_log: Option<Mutex<DataLog>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl BridgeContext {
    /// Creates a running context without a data log.
    pub fn new(settings: Settings) -> BridgeContext {
        BridgeContext {
            serial_to_telnet: SyncRingBuffer::new(settings.buffer_size),
            telnet_to_serial: SyncRingBuffer::new(settings.buffer_size),
            settings,
            running: AtomicBool::new(true),
            link: Mutex::new(LinkBlock::default()),
            modem: Mutex::new(ModemBlock::default()),
            metrics: BridgeMetrics::new(),
            data_log: None,
        }
    }

    /// Records traffic to `log`.
    #[must_use]
    pub fn with_data_log(mut self, log: DataLog) -> BridgeContext {
        self.data_log = Some(Mutex::new(log));
        self
    }

    /// Bridge settings
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Bridge metrics
    pub fn metrics(&self) -> &BridgeMetrics {
        &self.metrics
    }

    /// Data bound for the telnet server
    pub fn serial_to_telnet(&self) -> &SyncRingBuffer {
        &self.serial_to_telnet
    }

    /// Data bound for the serial line
    pub fn telnet_to_serial(&self) -> &SyncRingBuffer {
        &self.telnet_to_serial
    }

    // Lifecycle

    /// Workers keep looping while this is true
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Asks both workers to finish their current step and exit
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    // Link block

    /// Current link state
    pub fn state(&self) -> BridgeState {
        lock(&self.link).state
    }

    /// Sets the link state.
    pub fn set_state(&self, state: BridgeState) {
        lock(&self.link).state = state;
    }

    /// Requests a telnet session. Fails unless the link is idle.
    pub fn request_dial(&self, host: &str, port: u16) -> bool {
        let mut link = lock(&self.link);
        if link.state != BridgeState::Idle || link.request.is_some() {
            return false;
        }
        link.state = BridgeState::Connecting;
        link.request = Some(LinkRequest::Dial {
            host: host.to_string(),
            port,
        });
        true
    }

    /// Requests the link be dropped. Returns whether there was anything to drop.
    pub fn request_hangup(&self) -> bool {
        let mut link = lock(&self.link);
        if link.state == BridgeState::Idle && link.request.is_none() {
            return false;
        }
        link.state = BridgeState::Disconnecting;
        link.request = Some(LinkRequest::Hangup);
        true
    }

    /// Takes the pending link request.
    pub fn take_request(&self) -> Option<LinkRequest> {
        lock(&self.link).request.take()
    }

    // Modem block

    /// Carrier is up: a session exists whether the modem is in data or command mode
    pub fn modem_online(&self) -> bool {
        lock(&self.modem).online
    }

    /// The session is gone and its last bytes are being pushed to the serial line.
    ///
    /// Only meaningful while the carrier is up; cleared by [`carrier_lost`](Self::carrier_lost).
    pub fn begin_drain(&self) {
        let mut modem = lock(&self.modem);
        modem.draining = modem.online;
    }

    /// Whether the serial side must copy telnet data out regardless of modem mode
    pub fn is_draining(&self) -> bool {
        lock(&self.modem).draining
    }

    /// Takes the oldest pending notice.
    pub fn take_notice(&self) -> Option<ModemNotice> {
        lock(&self.modem).notices.pop_front()
    }

    /// A dialed session came up.
    ///
    /// Returns false, changing nothing, when a hangup was requested in the meantime.
    pub fn connection_established(&self) -> bool {
        let mut link = lock(&self.link);
        if link.request.is_some() {
            return false;
        }
        link.state = BridgeState::Online;
        // Link before modem, the only place both are held.
        let mut modem = lock(&self.modem);
        modem.online = true;
        modem.draining = false;
        modem.notices.push_back(ModemNotice::Connect);
        self.metrics.connection_opened();
        true
    }

    /// A dial did not connect. `notice` is `NoCarrier` or `Busy`.
    pub fn connection_failed(&self, notice: ModemNotice) {
        {
            let mut modem = lock(&self.modem);
            modem.online = false;
            modem.notices.push_back(notice);
        }
        self.metrics.connection_failed();
        self.set_idle();
    }

    /// The session dropped underneath us.
    ///
    /// Clears the carrier and queues one `NoCarrier`, unless the carrier was already down.
    /// Returns whether a notice was queued.
    pub fn carrier_lost(&self) -> bool {
        let notified = {
            let mut modem = lock(&self.modem);
            modem.draining = false;
            let was_online = std::mem::replace(&mut modem.online, false);
            if was_online {
                modem.notices.push_back(ModemNotice::NoCarrier);
            }
            was_online
        };
        if notified {
            info!("carrier lost");
            self.metrics.carrier_lost();
        }
        self.set_idle();
        notified
    }

    /// A requested hangup finished. No notice; the serial side already answered.
    pub fn hangup_complete(&self) {
        {
            let mut modem = lock(&self.modem);
            modem.online = false;
            modem.draining = false;
        }
        self.serial_to_telnet.clear();
        self.telnet_to_serial.clear();
        self.set_idle();
    }

    /// Back to idle unless a new request arrived meanwhile.
    fn set_idle(&self) {
        let mut link = lock(&self.link);
        if link.request.is_none() {
            link.state = BridgeState::Idle;
        }
    }

    // Data log

    /// Records traffic if the data log is enabled.
    pub fn log_data(&self, direction: Direction, data: &[u8]) {
        if let Some(log) = &self.data_log
            && let Err(err) = lock(log).write(direction, data)
        {
            warn!(error = %err, "data log write failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> BridgeContext {
        BridgeContext::new(Settings::default().with_buffer_size(64))
    }

    #[test]
    fn test_dial_requires_idle() {
        let ctx = context();
        assert!(ctx.request_dial("host", 23));
        assert_eq!(ctx.state(), BridgeState::Connecting);
        assert!(!ctx.request_dial("other", 23));
        assert_eq!(
            ctx.take_request(),
            Some(LinkRequest::Dial {
                host: "host".into(),
                port: 23
            })
        );
        assert_eq!(ctx.take_request(), None);
    }

    #[test]
    fn test_hangup_when_idle_is_noop() {
        let ctx = context();
        assert!(!ctx.request_hangup());
        assert_eq!(ctx.take_request(), None);
    }

    #[test]
    fn test_connect_then_carrier_loss_notifies_once() {
        let ctx = context();
        ctx.request_dial("host", 23);
        ctx.take_request();
        assert!(ctx.connection_established());
        assert!(ctx.modem_online());
        assert_eq!(ctx.state(), BridgeState::Online);
        assert_eq!(ctx.take_notice(), Some(ModemNotice::Connect));

        assert!(ctx.carrier_lost());
        assert!(!ctx.carrier_lost());
        assert!(!ctx.modem_online());
        assert_eq!(ctx.state(), BridgeState::Idle);
        assert_eq!(ctx.take_notice(), Some(ModemNotice::NoCarrier));
        assert_eq!(ctx.take_notice(), None);
        assert_eq!(ctx.metrics().snapshot().carrier_losses, 1);
    }

    #[test]
    fn test_drain_flag_follows_carrier() {
        let ctx = context();
        ctx.begin_drain();
        assert!(!ctx.is_draining(), "no carrier, nothing to drain");

        ctx.request_dial("host", 23);
        ctx.take_request();
        assert!(ctx.connection_established());
        ctx.begin_drain();
        assert!(ctx.is_draining());
        assert!(ctx.take_notice().is_some());

        assert!(ctx.carrier_lost());
        assert!(!ctx.is_draining());
    }

    #[test]
    fn test_established_yields_to_pending_hangup() {
        let ctx = context();
        ctx.request_dial("host", 23);
        ctx.take_request();
        ctx.request_hangup();
        assert!(!ctx.connection_established());
        assert!(!ctx.modem_online());
        assert_eq!(ctx.take_notice(), None);
        assert_eq!(ctx.state(), BridgeState::Disconnecting);
    }

    #[test]
    fn test_failed_dial_reports_notice() {
        let ctx = context();
        ctx.request_dial("host", 23);
        ctx.take_request();
        ctx.connection_failed(ModemNotice::Busy);
        assert_eq!(ctx.state(), BridgeState::Idle);
        assert_eq!(ctx.take_notice(), Some(ModemNotice::Busy));
    }

    #[test]
    fn test_hangup_clears_buffers_silently() {
        let ctx = context();
        ctx.request_dial("host", 23);
        ctx.take_request();
        ctx.connection_established();
        ctx.take_notice();
        ctx.telnet_to_serial().write(b"pending");
        assert!(ctx.request_hangup());
        assert_eq!(ctx.state(), BridgeState::Disconnecting);
        assert_eq!(ctx.take_request(), Some(LinkRequest::Hangup));
        ctx.hangup_complete();
        assert_eq!(ctx.state(), BridgeState::Idle);
        assert!(ctx.telnet_to_serial().is_empty());
        assert!(!ctx.modem_online());
        assert_eq!(ctx.take_notice(), None);
    }

    #[test]
    fn test_stop() {
        let ctx = context();
        assert!(ctx.is_running());
        ctx.stop();
        assert!(!ctx.is_running());
    }

    #[test]
    fn test_data_log() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("traffic.log");
        let ctx = context().with_data_log(DataLog::open(&path).unwrap());
        ctx.log_data(Direction::SerialToTelnet, b"ATDT\r");
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("[SER->TEL]"));
    }
}
