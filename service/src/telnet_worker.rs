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

//! Telnet side worker: owns the session to the telnet server

use crate::context::BridgeContext;
use crate::datalog::Direction;
use crate::error::{BridgeError, Result};
use crate::serial_worker::CHUNK_SIZE;
use crate::session::{RecvStatus, SessionState, TelnetSession};
use crate::types::{LinkRequest, ModemNotice};
use bytes::{Buf, BytesMut};
use metrics::counter;
use modembridge_ansicodec::{AnsiConfig, StreamFilter};
use modembridge_buffer::BufferOutcome;
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, info_span, warn};

/// How long one connect poll waits.
const CONNECT_POLL: Duration = Duration::from_millis(10);
/// How long an online step waits for serial data when nothing else happened.
const ONLINE_WAIT: Duration = Duration::from_millis(1);
/// Sleep between steps without a session.
const IDLE_SLEEP: Duration = Duration::from_millis(100);
/// Stop taking serial data while this much output is queued on the socket.
const MAX_PENDING_OUTPUT: usize = 64 * 1024;
/// Stop reading the socket while this much filtered input waits for the ring.
const MAX_PENDING_INPUT: usize = 16 * CHUNK_SIZE;
/// Give up on the last bytes of a dropped session once the serial side takes nothing
/// for this long.
const DRAIN_STALL: Duration = Duration::from_secs(5);

/// Performs link requests and moves data between the socket and the ring buffers.
///
/// Telnet input is stripped of IAC sequences, passed through the [`StreamFilter`] and
/// written to the telnet to serial buffer. Serial data from the other buffer is escaped and
/// sent to the server.
pub struct TelnetWorker {
    ctx: Arc<BridgeContext>,
    session: Option<TelnetSession>,
    stream_filter: StreamFilter,
    connect_deadline: Option<Instant>,
    to_serial: BytesMut,
    chunk: Vec<u8>,
}

impl TelnetWorker {
    /// Creates an idle worker.
    pub fn new(ctx: Arc<BridgeContext>) -> Self {
        let stream_filter = StreamFilter::new(AnsiConfig::from(ctx.settings().ansi_filter));
        Self {
            ctx,
            session: None,
            stream_filter,
            connect_deadline: None,
            to_serial: BytesMut::with_capacity(CHUNK_SIZE),
            chunk: vec![0u8; CHUNK_SIZE],
        }
    }

    /// Runs until the context stops.
    pub fn run(mut self) {
        let span = info_span!("telnet_worker");
        let _enter = span.enter();
        info!("telnet worker started");

        while self.ctx.is_running() {
            if !self.step() && self.session.is_none() {
                std::thread::sleep(IDLE_SLEEP);
            }
        }

        if let Some(mut session) = self.session.take() {
            session.disconnect();
        }
        info!("telnet worker stopped");
    }

    /// Handles one pending request and advances the session. Returns whether anything
    /// happened.
    pub fn step(&mut self) -> bool {
        let mut active = false;
        if let Some(request) = self.ctx.take_request() {
            self.handle_request(request);
            active = true;
        }

        let Some(mut session) = self.session.take() else {
            return active;
        };
        match session.state() {
            SessionState::Connecting => {
                active |= self.advance_connect(session);
            }
            SessionState::Connected => match self.pump(&mut session) {
                Ok(pumped) => {
                    active |= pumped;
                    self.session = Some(session);
                }
                Err(err) => {
                    self.teardown(session, &err);
                    active = true;
                }
            },
            SessionState::Disconnected | SessionState::Error => {}
        }
        active
    }

    /// The current session, if any
    pub fn session(&self) -> Option<&TelnetSession> {
        self.session.as_ref()
    }

    fn handle_request(&mut self, request: LinkRequest) {
        match request {
            LinkRequest::Dial { host, port } => {
                if let Some(mut stale) = self.session.take() {
                    stale.disconnect();
                }
                self.reset_stream();
                let settings = self.ctx.settings();
                let mut session = TelnetSession::new(settings.telnet_binary)
                    .with_strict(settings.telnet_strict);
                match session.connect(&host, port) {
                    Ok(SessionState::Connected) => self.on_connected(session),
                    Ok(_) => {
                        let timeout = self.ctx.settings().connect_timeout;
                        self.connect_deadline = Some(Instant::now() + timeout);
                        self.session = Some(session);
                    }
                    Err(err) => {
                        warn!(host = %host, port, error = %err, "dial failed");
                        self.ctx.connection_failed(notice_for(session.last_error()));
                        counter!("modembridge.connections.failed").increment(1);
                    }
                }
            }
            LinkRequest::Hangup => {
                if let Some(mut session) = self.session.take() {
                    session.disconnect();
                }
                self.reset_stream();
                self.ctx.hangup_complete();
                info!("hung up");
            }
        }
    }

    fn advance_connect(&mut self, mut session: TelnetSession) -> bool {
        match session.process_events(CONNECT_POLL) {
            SessionState::Connected => {
                self.on_connected(session);
                true
            }
            SessionState::Connecting => {
                if self.connect_deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                    warn!(peer = ?session.peer_addr(), "connect timed out");
                    session.disconnect();
                    self.ctx.connection_failed(ModemNotice::NoCarrier);
                    counter!("modembridge.connections.failed").increment(1);
                    return true;
                }
                self.session = Some(session);
                false
            }
            SessionState::Error | SessionState::Disconnected => {
                self.ctx.connection_failed(notice_for(session.last_error()));
                counter!("modembridge.connections.failed").increment(1);
                true
            }
        }
    }

    fn on_connected(&mut self, mut session: TelnetSession) {
        self.connect_deadline = None;
        if !self.ctx.connection_established() {
            debug!("connected after hangup request");
            self.session = Some(session);
            return;
        }
        counter!("modembridge.connections.total").increment(1);
        match session.flush() {
            Ok(_) => self.session = Some(session),
            Err(err) => self.teardown(session, &BridgeError::Io(err)),
        }
    }

    fn pump(&mut self, session: &mut TelnetSession) -> Result<bool> {
        let sent_before = session.bytes_sent();
        let mut active = self.flush_to_serial();

        // Input keeps being read while the ring is full so a remote close is still seen.
        if self.to_serial.len() < MAX_PENDING_INPUT {
            match session.recv(&mut self.chunk)? {
                RecvStatus::Data(n) => {
                    active = true;
                    self.ctx.metrics().telnet_received(n);
                    counter!("modembridge.telnet.bytes_received").increment(n as u64);
                    let (data, commands) = session.process_input(&self.chunk[..n])?;
                    if commands > 0 {
                        self.ctx.metrics().iac_commands(commands);
                    }
                    self.ctx.log_data(Direction::TelnetToSerial, &data);
                    self.stream_filter.process(&data, &mut self.to_serial);
                    self.flush_to_serial();
                }
                RecvStatus::WouldBlock => {}
                RecvStatus::Closed => return Err(BridgeError::Disconnected),
            }
        }

        if session.pending_output() < MAX_PENDING_OUTPUT {
            let wait = if active { Duration::ZERO } else { ONLINE_WAIT };
            if let BufferOutcome::Completed(n) = self
                .ctx
                .serial_to_telnet()
                .read_blocking(&mut self.chunk, Some(wait))
                && n > 0
            {
                session.send(&self.chunk[..n])?;
                active = true;
            }
        }
        if session.pending_output() > 0 {
            session.flush()?;
        }

        let sent = session.bytes_sent() - sent_before;
        if sent > 0 {
            self.ctx.metrics().telnet_sent(sent as usize);
            counter!("modembridge.telnet.bytes_sent").increment(sent);
        }
        Ok(active)
    }

    fn flush_to_serial(&mut self) -> bool {
        if self.to_serial.is_empty() {
            return false;
        }
        let written = self.ctx.telnet_to_serial().write(&self.to_serial);
        self.to_serial.advance(written);
        written > 0
    }

    /// Drops the session after an error or remote close and reports carrier loss.
    fn teardown(&mut self, mut session: TelnetSession, cause: &BridgeError) {
        match cause {
            BridgeError::Disconnected => {
                info!(peer = ?session.peer_addr(), "telnet server closed the connection")
            }
            err => warn!(peer = ?session.peer_addr(), error = %err, "telnet session failed"),
        }
        session.disconnect();
        // Whatever the filter still holds goes out before the carrier drops.
        self.stream_filter.flush(&mut self.to_serial);
        self.drain_pending();
        self.reset_stream();
        self.ctx.serial_to_telnet().clear();
        if self.ctx.carrier_lost() {
            counter!("modembridge.carrier.lost").increment(1);
        }
    }

    /// Pushes pending telnet input into the ring while the serial side copies it out.
    fn drain_pending(&mut self) {
        self.flush_to_serial();
        if self.to_serial.is_empty() {
            return;
        }
        self.ctx.begin_drain();
        while !self.to_serial.is_empty() && self.ctx.is_running() {
            match self
                .ctx
                .telnet_to_serial()
                .write_blocking(&self.to_serial, Some(DRAIN_STALL))
            {
                BufferOutcome::Completed(n) => self.to_serial.advance(n),
                BufferOutcome::TimedOut => break,
            }
        }
        if !self.to_serial.is_empty() {
            warn!(
                dropped = self.to_serial.len(),
                "serial line stalled, discarding telnet data"
            );
        }
    }

    fn reset_stream(&mut self) {
        self.stream_filter.reset();
        self.to_serial.clear();
    }
}

/// Result code for a failed dial.
fn notice_for(error: Option<io::ErrorKind>) -> ModemNotice {
    match error {
        Some(io::ErrorKind::ConnectionRefused) => ModemNotice::Busy,
        _ => ModemNotice::NoCarrier,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::types::BridgeState;
    use modembridge_ansicodec::AnsiMode;
    use modembridge_telnetcodec::consts;
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use tracing_test::traced_test;

    fn worker_with(settings: Settings) -> (TelnetWorker, Arc<BridgeContext>) {
        let ctx = Arc::new(BridgeContext::new(settings));
        (TelnetWorker::new(ctx.clone()), ctx)
    }

    fn step_until(worker: &mut TelnetWorker, mut done: impl FnMut(&mut TelnetWorker) -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !done(worker) {
            assert!(Instant::now() < deadline, "condition not reached");
            worker.step();
        }
    }

    /// Dials a local listener and returns the accepted server side.
    fn dial(worker: &mut TelnetWorker, ctx: &BridgeContext, listener: &TcpListener) -> TcpStream {
        let port = listener.local_addr().unwrap().port();
        assert!(ctx.request_dial("127.0.0.1", port));
        step_until(worker, |_| ctx.state() == BridgeState::Online);
        assert_eq!(ctx.take_notice(), Some(ModemNotice::Connect));
        let (server, _) = listener.accept().unwrap();
        server
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        server
    }

    fn read_ring(ctx: &BridgeContext, into: &mut Vec<u8>) {
        let mut buf = [0u8; 256];
        let n = ctx.telnet_to_serial().read(&mut buf);
        into.extend_from_slice(&buf[..n]);
    }

    #[test]
    fn test_dial_negotiates_and_bridges() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let (mut worker, ctx) = worker_with(Settings::default().with_telnet_binary(false));
        let mut server = dial(&mut worker, &ctx, &listener);

        let mut negotiation = [0u8; 9];
        server.read_exact(&mut negotiation).unwrap();
        assert_eq!(negotiation[..3], [consts::IAC, consts::DO, consts::option::SGA]);

        server
            .write_all(&[b'o', b'k', consts::IAC, consts::DO, consts::option::NAWS, b'!'])
            .unwrap();
        let mut received = Vec::new();
        step_until(&mut worker, |_| {
            read_ring(&ctx, &mut received);
            received.len() >= 3
        });
        assert_eq!(received, b"ok!");

        // DO NAWS is refused.
        let mut refusal = [0u8; 3];
        server.read_exact(&mut refusal).unwrap();
        assert_eq!(refusal, [consts::IAC, consts::WONT, consts::option::NAWS]);

        ctx.serial_to_telnet().write(b"ATDT\xff");
        step_until(&mut worker, |_| ctx.serial_to_telnet().is_empty());
        let mut sent = [0u8; 6];
        server.read_exact(&mut sent).unwrap();
        assert_eq!(&sent, b"ATDT\xff\xff");
        assert!(ctx.metrics().snapshot().iac_commands >= 1);
    }

    #[traced_test]
    #[test]
    fn test_remote_close_drops_carrier_once() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let (mut worker, ctx) = worker_with(Settings::default());
        let mut server = dial(&mut worker, &ctx, &listener);
        let mut negotiation = [0u8; 15];
        server.read_exact(&mut negotiation).unwrap();
        drop(server);

        step_until(&mut worker, |_| ctx.state() == BridgeState::Idle);
        assert!(!ctx.modem_online());
        assert_eq!(ctx.take_notice(), Some(ModemNotice::NoCarrier));
        assert_eq!(ctx.take_notice(), None);
        assert!(worker.session().is_none());
        assert!(logs_contain("carrier lost"));
    }

    #[test]
    fn test_close_while_ring_full_keeps_data() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let (mut worker, ctx) = worker_with(
            Settings::default()
                .with_telnet_binary(false)
                .with_buffer_size(64),
        );
        let mut server = dial(&mut worker, &ctx, &listener);
        let mut negotiation = [0u8; 9];
        server.read_exact(&mut negotiation).unwrap();

        let sent: Vec<u8> = (0..200u8).map(|i| b'a' + i % 26).collect();
        server.write_all(&sent).unwrap();
        drop(server);

        // Stands in for the serial worker, which only copies out once the drain starts.
        let reader_ctx = ctx.clone();
        let reader = std::thread::spawn(move || {
            let deadline = Instant::now() + Duration::from_secs(5);
            while !reader_ctx.is_draining() && Instant::now() < deadline {
                std::thread::sleep(Duration::from_millis(1));
            }
            let mut received = Vec::new();
            let mut buf = [0u8; 32];
            while let BufferOutcome::Completed(n) = reader_ctx
                .telnet_to_serial()
                .read_blocking(&mut buf, Some(Duration::from_millis(500)))
            {
                received.extend_from_slice(&buf[..n]);
            }
            received
        });

        step_until(&mut worker, |_| ctx.state() == BridgeState::Idle);
        assert_eq!(ctx.take_notice(), Some(ModemNotice::NoCarrier));
        assert!(!ctx.is_draining());
        assert_eq!(reader.join().unwrap(), sent);
    }

    #[traced_test]
    #[test]
    fn test_strict_session_drops_carrier_on_violation() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let (mut worker, ctx) = worker_with(
            Settings::default()
                .with_telnet_binary(false)
                .with_telnet_strict(true),
        );
        let mut server = dial(&mut worker, &ctx, &listener);
        let mut negotiation = [0u8; 9];
        server.read_exact(&mut negotiation).unwrap();

        server
            .write_all(&[consts::IAC, consts::SB, 24, 1, consts::IAC, b'q'])
            .unwrap();
        step_until(&mut worker, |_| ctx.state() == BridgeState::Idle);
        assert_eq!(ctx.take_notice(), Some(ModemNotice::NoCarrier));
        assert!(worker.session().is_none());
        assert!(logs_contain("telnet session failed"));
    }

    #[test]
    fn test_refused_dial_is_busy() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let (mut worker, ctx) = worker_with(Settings::default());
        assert!(ctx.request_dial("127.0.0.1", port));
        step_until(&mut worker, |_| ctx.state() == BridgeState::Idle);
        assert_eq!(ctx.take_notice(), Some(ModemNotice::Busy));
        assert_eq!(ctx.metrics().snapshot().failed_connections, 1);
    }

    #[test]
    fn test_hangup_closes_session() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let (mut worker, ctx) = worker_with(Settings::default());
        let mut server = dial(&mut worker, &ctx, &listener);

        assert!(ctx.request_hangup());
        worker.step();
        assert_eq!(ctx.state(), BridgeState::Idle);
        assert!(worker.session().is_none());
        assert_eq!(ctx.take_notice(), None);

        // The server sees the close after the initial negotiation.
        let mut rest = Vec::new();
        server.read_to_end(&mut rest).unwrap();
    }

    #[test]
    fn test_ansi_strip() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let (mut worker, ctx) = worker_with(Settings::default().with_ansi_filter(AnsiMode::Strip));
        let mut server = dial(&mut worker, &ctx, &listener);

        server.write_all(b"\x1b[1;31mred\x1b[0m\r\n").unwrap();
        let mut received = Vec::new();
        step_until(&mut worker, |_| {
            read_ring(&ctx, &mut received);
            received.ends_with(b"\r\n")
        });
        assert_eq!(received, b"red\r\n");
    }

    #[test]
    fn test_notice_for_errors() {
        assert_eq!(notice_for(Some(io::ErrorKind::ConnectionRefused)), ModemNotice::Busy);
        assert_eq!(notice_for(Some(io::ErrorKind::TimedOut)), ModemNotice::NoCarrier);
        assert_eq!(notice_for(None), ModemNotice::NoCarrier);
    }
}
