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

//! Serial side worker: Hayes modem emulation in front of the serial line

use crate::context::BridgeContext;
use crate::datalog::Direction;
use crate::error::Result;
use crate::types::{BridgeState, ModemNotice};
use bytes::{Buf, BytesMut};
use metrics::counter;
use modembridge_hayes::{HayesFilter, HayesModem, ModemAction, ModemMode, ModemSettings, ResultCode};
use std::io::{self, Read, Write};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, info_span, trace};

/// Size of one serial read or buffer transfer.
pub const CHUNK_SIZE: usize = 1024;

const IDLE_ONLINE: Duration = Duration::from_millis(1);
const IDLE_OFFLINE: Duration = Duration::from_millis(10);

/// Owns the serial line, the online mode filter and the command interpreter.
///
/// `S` is anything that reads and writes like a serial port. A read that fails with
/// `WouldBlock`, `TimedOut` or `Interrupted`, or that returns 0, means no input yet.
///
/// In online mode serial input goes through the [`HayesFilter`] into the serial to telnet
/// buffer, and the telnet to serial buffer is drained onto the line. In command mode serial
/// input goes to the [`HayesModem`] and dial or hangup requests are passed to the telnet
/// worker through the [`BridgeContext`].
pub struct SerialWorker<S> {
    ctx: Arc<BridgeContext>,
    port: S,
    filter: HayesFilter,
    modem: HayesModem,
    input: BytesMut,
    to_telnet: BytesMut,
    response: BytesMut,
    chunk: Vec<u8>,
}

impl<S: Read + Write> SerialWorker<S> {
    /// Creates a worker in command mode.
    pub fn new(ctx: Arc<BridgeContext>, port: S) -> Self {
        let mut profile = ModemSettings::default();
        profile
            .registers
            .set_guard_time(ctx.settings().escape_guard_time);
        let modem = HayesModem::with_profile(profile);
        let mut filter = HayesFilter::new()
            .with_guard_time(modem.guard_time())
            .with_escape_char(modem.escape_char());
        filter.set_mode(ModemMode::Command);

        Self {
            ctx,
            port,
            filter,
            modem,
            input: BytesMut::with_capacity(CHUNK_SIZE),
            to_telnet: BytesMut::with_capacity(CHUNK_SIZE),
            response: BytesMut::with_capacity(128),
            chunk: vec![0u8; CHUNK_SIZE],
        }
    }

    /// Runs until the context stops or the serial line fails.
    pub fn run(mut self) -> Result<()> {
        let span = info_span!("serial_worker");
        let _enter = span.enter();
        info!("serial worker started");

        while self.ctx.is_running() {
            match self.step() {
                Ok(true) => {}
                Ok(false) => {
                    let idle = match self.filter.mode() {
                        ModemMode::Online => IDLE_ONLINE,
                        ModemMode::Command => IDLE_OFFLINE,
                    };
                    std::thread::sleep(idle);
                }
                Err(err) => {
                    error!(error = %err, "serial line failed");
                    self.ctx.stop();
                    return Err(err);
                }
            }
        }

        info!("serial worker stopped");
        Ok(())
    }

    /// One pass over notices, serial input and telnet output. Returns whether anything
    /// happened.
    pub fn step(&mut self) -> Result<bool> {
        let mut active = self.handle_notices()?;
        active |= self.flush_to_telnet();
        if self.to_telnet.is_empty() {
            active |= self.read_serial()?;
            active |= self.process_input()?;
        }
        if self.filter.mode() == ModemMode::Online || self.ctx.is_draining() {
            active |= self.drain_to_serial(false)?;
        }
        Ok(active)
    }

    /// Whether serial input is currently data or commands
    pub fn mode(&self) -> ModemMode {
        self.filter.mode()
    }

    /// The command interpreter
    pub fn modem(&self) -> &HayesModem {
        &self.modem
    }

    /// The serial port
    pub fn port(&self) -> &S {
        &self.port
    }

    /// Mutable access to the serial port
    pub fn port_mut(&mut self) -> &mut S {
        &mut self.port
    }

    fn handle_notices(&mut self) -> Result<bool> {
        let mut active = false;
        while let Some(notice) = self.ctx.take_notice() {
            active = true;
            match notice {
                ModemNotice::Connect => {
                    // A hangup typed while the connect completed wins.
                    if self.ctx.state() != BridgeState::Online {
                        debug!("ignoring stale connect");
                        continue;
                    }
                    info!(baud = self.ctx.settings().line.baud_rate, "entering online mode");
                    let baud = self.ctx.settings().line.baud_rate;
                    self.modem.write_connect(Some(baud), &mut self.response);
                    self.write_response()?;
                    self.filter.set_mode(ModemMode::Online);
                }
                ModemNotice::NoCarrier | ModemNotice::Busy => {
                    self.drain_to_serial(true)?;
                    let code = match notice {
                        ModemNotice::Busy => ResultCode::Busy,
                        _ => ResultCode::NoCarrier,
                    };
                    info!(result = %code, "call ended");
                    self.modem.write_result(code, &mut self.response);
                    self.write_response()?;
                    self.enter_command_mode();
                }
            }
        }
        Ok(active)
    }

    fn enter_command_mode(&mut self) {
        self.filter.set_mode(ModemMode::Command);
        self.modem.clear_line();
        self.to_telnet.clear();
    }

    fn read_serial(&mut self) -> Result<bool> {
        if !self.input.is_empty() {
            return Ok(false);
        }
        match self.port.read(&mut self.chunk) {
            Ok(0) => Ok(false),
            Ok(n) => {
                trace!(bytes = n, "serial read");
                self.input.extend_from_slice(&self.chunk[..n]);
                self.ctx.metrics().serial_received(n);
                counter!("modembridge.serial.bytes_received").increment(n as u64);
                self.ctx.log_data(Direction::SerialToTelnet, &self.chunk[..n]);
                Ok(true)
            }
            Err(err)
                if matches!(
                    err.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
                ) =>
            {
                Ok(false)
            }
            Err(err) => Err(err.into()),
        }
    }

    fn process_input(&mut self) -> Result<bool> {
        if self.input.is_empty() {
            return Ok(false);
        }
        match self.filter.mode() {
            ModemMode::Online => self.process_online()?,
            ModemMode::Command => self.process_command()?,
        }
        Ok(true)
    }

    fn process_online(&mut self) -> Result<()> {
        let outcome = self.filter.process(&self.input, &mut self.to_telnet);
        self.input.advance(outcome.consumed);

        if outcome.suppressed_lines > 0 {
            self.ctx.metrics().commands_suppressed(outcome.suppressed_lines);
            counter!("modembridge.modem.suppressed_commands")
                .increment(outcome.suppressed_lines as u64);
        }
        self.flush_to_telnet();

        if outcome.escaped {
            info!("escape sequence, entering command mode");
            self.ctx.metrics().escape_detected();
            counter!("modembridge.modem.escapes").increment(1);
            self.modem.clear_line();
            self.modem.write_result(ResultCode::Ok, &mut self.response);
            self.write_response()?;
        }
        Ok(())
    }

    fn process_command(&mut self) -> Result<()> {
        // Typing commands counts against the escape guard once back online.
        self.filter.note_activity(Instant::now());
        let outcome = self.modem.feed(&self.input, &mut self.response);
        self.input.advance(outcome.consumed);
        for action in outcome.actions {
            self.perform(action);
        }
        self.filter
            .configure(self.modem.escape_char(), self.modem.guard_time());
        self.write_response()
    }

    fn perform(&mut self, action: ModemAction) {
        match action {
            ModemAction::Dial(target) => {
                let settings = self.ctx.settings();
                let (host, port) = target.resolve(&settings.telnet_host, settings.telnet_port);
                if host.is_empty() || port == 0 || self.ctx.modem_online() {
                    debug!(%target, "dial refused");
                    self.modem.write_result(ResultCode::Error, &mut self.response);
                } else if self.ctx.request_dial(host, port) {
                    info!(host, port, "dialing");
                } else {
                    debug!(state = %self.ctx.state(), "dial while busy");
                    self.modem.write_result(ResultCode::Error, &mut self.response);
                }
            }
            ModemAction::Hangup | ModemAction::Reset => {
                if self.ctx.request_hangup() {
                    info!("hanging up");
                }
            }
            ModemAction::GoOnline => {
                if self.ctx.modem_online() && self.ctx.state() == BridgeState::Online {
                    info!("returning online");
                    let baud = self.ctx.settings().line.baud_rate;
                    self.modem.write_connect(Some(baud), &mut self.response);
                    self.filter.set_mode(ModemMode::Online);
                } else {
                    self.modem.write_result(ResultCode::NoCarrier, &mut self.response);
                }
            }
        }
    }

    /// Moves filtered serial data into the ring; leftovers wait for space.
    fn flush_to_telnet(&mut self) -> bool {
        if self.to_telnet.is_empty() {
            return false;
        }
        let written = self.ctx.serial_to_telnet().write(&self.to_telnet);
        self.to_telnet.advance(written);
        written > 0
    }

    /// Copies telnet data onto the serial line, everything when `all` is set.
    fn drain_to_serial(&mut self, all: bool) -> Result<bool> {
        let mut active = false;
        loop {
            let n = self.ctx.telnet_to_serial().read(&mut self.chunk);
            if n == 0 {
                break;
            }
            self.port.write_all(&self.chunk[..n])?;
            self.ctx.metrics().serial_sent(n);
            counter!("modembridge.serial.bytes_sent").increment(n as u64);
            active = true;
            if !all {
                break;
            }
        }
        if active {
            self.port.flush()?;
        }
        Ok(active)
    }

    fn write_response(&mut self) -> Result<()> {
        if self.response.is_empty() {
            return Ok(());
        }
        self.port.write_all(&self.response)?;
        self.port.flush()?;
        self.ctx.metrics().serial_sent(self.response.len());
        self.response.clear();
        Ok(())
    }
}
