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

use crate::consts::{LF, MAX_LINE_LENGTH, PRODUCT_NAME};
use crate::dial::DialTarget;
use crate::registers::SRegisters;
use crate::response::ResultCode;
use bytes::{BufMut, BytesMut};
use std::time::Duration;
use tracing::{debug, trace};

/// Work the modem asks its owner to carry out after a command line.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ModemAction {
    /// Place a call. The owner reports `CONNECT`, `BUSY` or `NO CARRIER` later.
    Dial(DialTarget),
    /// Drop the current call, if any.
    Hangup,
    /// Return to online mode on the current call.
    GoOnline,
    /// Settings were restored from the stored profile; any call is dropped.
    Reset,
}

/// User visible modem settings.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ModemSettings {
    /// Echo command mode input (`E`).
    pub echo: bool,
    /// Suppress result codes (`Q`).
    pub quiet: bool,
    /// Report result codes as text rather than numbers (`V`).
    pub verbose: bool,
    /// S-registers.
    pub registers: SRegisters,
}

impl Default for ModemSettings {
    fn default() -> Self {
        ModemSettings {
            echo: true,
            quiet: false,
            verbose: true,
            registers: SRegisters::new(),
        }
    }
}

/// What a call to [`HayesModem::feed`] did.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FeedOutcome {
    /// Input bytes consumed. Stops right after a line that produced actions.
    pub consumed: usize,
    /// Actions from the executed line, empty when none.
    pub actions: Vec<ModemAction>,
}

/// Command mode half of the modem: line editing plus AT command execution.
///
/// Echo, responses and informational text are written to the caller's output buffer. Anything
/// that touches the connection is returned as a [`ModemAction`].
#[derive(Debug)]
pub struct HayesModem {
    settings: ModemSettings,
    profile: ModemSettings,
    line: BytesMut,
    overflow: bool,
    last_command: Option<Vec<u8>>,
}

impl HayesModem {
    /// A modem with factory settings.
    pub fn new() -> HayesModem {
        HayesModem::with_profile(ModemSettings::default())
    }

    /// A modem whose `ATZ` profile is `profile`.
    pub fn with_profile(profile: ModemSettings) -> HayesModem {
        HayesModem {
            settings: profile.clone(),
            profile,
            line: BytesMut::with_capacity(64),
            overflow: false,
            last_command: None,
        }
    }

    /// Current settings.
    pub fn settings(&self) -> &ModemSettings {
        &self.settings
    }

    /// Escape character from `S2`.
    pub fn escape_char(&self) -> Option<u8> {
        self.settings.registers.escape_char()
    }

    /// Guard time from `S12`.
    pub fn guard_time(&self) -> Duration {
        self.settings.registers.guard_time()
    }

    /// Carrier wait from `S7`.
    pub fn carrier_wait(&self) -> Duration {
        self.settings.registers.carrier_wait()
    }

    /// Discards a partially typed line.
    pub fn clear_line(&mut self) {
        self.line.clear();
        self.overflow = false;
    }

    /// Feeds command mode input.
    pub fn feed(&mut self, input: &[u8], output: &mut BytesMut) -> FeedOutcome {
        for (index, &byte) in input.iter().enumerate() {
            if let Some(actions) = self.edit(byte, output)
                && !actions.is_empty()
            {
                return FeedOutcome {
                    consumed: index + 1,
                    actions,
                };
            }
        }
        FeedOutcome {
            consumed: input.len(),
            actions: Vec::new(),
        }
    }

    /// Writes a result code in the current response format.
    pub fn write_result(&self, code: ResultCode, output: &mut BytesMut) {
        self.write_response(code, None, output);
    }

    /// Writes `CONNECT`, with the line rate appended in verbose mode.
    pub fn write_connect(&self, baud: Option<u32>, output: &mut BytesMut) {
        self.write_response(ResultCode::Connect, baud, output);
    }

    fn write_response(&self, code: ResultCode, baud: Option<u32>, output: &mut BytesMut) {
        if self.settings.quiet {
            return;
        }
        let cr = self.settings.registers.carriage_return();
        let lf = self.settings.registers.line_feed();
        if self.settings.verbose {
            output.put_u8(cr);
            output.put_u8(lf);
            output.extend_from_slice(code.text().as_bytes());
            if let Some(baud) = baud {
                output.extend_from_slice(format!(" {baud}").as_bytes());
            }
            output.put_u8(cr);
            output.put_u8(lf);
        } else {
            output.extend_from_slice(code.code().to_string().as_bytes());
            output.put_u8(cr);
        }
    }

    fn write_info(&self, text: &str, output: &mut BytesMut) {
        let cr = self.settings.registers.carriage_return();
        let lf = self.settings.registers.line_feed();
        if self.settings.verbose {
            output.put_u8(cr);
            output.put_u8(lf);
        }
        output.extend_from_slice(text.as_bytes());
        output.put_u8(cr);
        output.put_u8(lf);
    }

    /// Line editor. Returns the executed line's actions once a line completes.
    fn edit(&mut self, byte: u8, output: &mut BytesMut) -> Option<Vec<ModemAction>> {
        let registers = &self.settings.registers;
        if byte == registers.carriage_return() {
            if self.settings.echo {
                output.put_u8(byte);
            }
            let line = self.line.split().freeze();
            let overflow = std::mem::take(&mut self.overflow);
            return Some(self.execute_line(&line, overflow, output));
        }

        if byte == registers.backspace() || byte == 0x7F {
            if !self.line.is_empty() {
                self.line.truncate(self.line.len() - 1);
                if self.settings.echo {
                    output.extend_from_slice(&[byte, b' ', byte]);
                }
            }
            return None;
        }

        if byte == LF || byte < 0x20 {
            return None;
        }

        if self.settings.echo {
            output.put_u8(byte);
        }
        if self.line.len() >= MAX_LINE_LENGTH {
            self.overflow = true;
            return None;
        }
        self.line.put_u8(byte);

        if byte == b'/' && matches!(&self.line[..], b"A/" | b"a/") {
            self.line.clear();
            let command = self.last_command.clone().unwrap_or_default();
            trace!(command = %String::from_utf8_lossy(&command), "repeating last command");
            return Some(self.execute(&command, output));
        }
        None
    }

    fn execute_line(
        &mut self,
        line: &[u8],
        overflow: bool,
        output: &mut BytesMut,
    ) -> Vec<ModemAction> {
        let body = match line {
            [b'A', b'T', body @ ..] | [b'a', b't', body @ ..] => body,
            [] => return Vec::new(),
            _ => {
                debug!(line = %String::from_utf8_lossy(line), "ignoring non-command line");
                return Vec::new();
            }
        };
        if overflow {
            self.write_result(ResultCode::Error, output);
            return Vec::new();
        }
        self.last_command = Some(body.to_vec());
        self.execute(body, output)
    }

    /// Executes the commands following `AT`.
    fn execute(&mut self, body: &[u8], output: &mut BytesMut) -> Vec<ModemAction> {
        debug!(command = %String::from_utf8_lossy(body), "executing AT command");
        let mut actions = Vec::new();
        let mut cursor = CommandCursor::new(body);

        let result = loop {
            let Some(command) = cursor.next() else {
                break Some(ResultCode::Ok);
            };
            match command.to_ascii_uppercase() {
                b' ' => {}
                b'E' => match cursor.flag() {
                    Some(echo) => self.settings.echo = echo,
                    None => break Some(ResultCode::Error),
                },
                b'Q' => match cursor.flag() {
                    Some(quiet) => self.settings.quiet = quiet,
                    None => break Some(ResultCode::Error),
                },
                b'V' => match cursor.flag() {
                    Some(verbose) => self.settings.verbose = verbose,
                    None => break Some(ResultCode::Error),
                },
                b'H' => match cursor.number().unwrap_or(0) {
                    0 => actions.push(ModemAction::Hangup),
                    1 => {}
                    _ => break Some(ResultCode::Error),
                },
                b'O' => {
                    cursor.number();
                    actions.push(ModemAction::GoOnline);
                    break None;
                }
                b'Z' => {
                    cursor.number();
                    self.settings = self.profile.clone();
                    actions.push(ModemAction::Reset);
                }
                b'&' => match cursor.next().map(|byte| byte.to_ascii_uppercase()) {
                    Some(b'F') => {
                        cursor.number();
                        self.settings = ModemSettings::default();
                    }
                    Some(b'C' | b'D' | b'K' | b'S' | b'W') => {
                        cursor.number();
                    }
                    _ => break Some(ResultCode::Error),
                },
                b'D' => {
                    let mut number = cursor.rest();
                    if let [b'T' | b't' | b'P' | b'p', rest @ ..] = number {
                        number = rest;
                    }
                    match std::str::from_utf8(number).ok().and_then(DialTarget::parse) {
                        Some(target) => {
                            actions.push(ModemAction::Dial(target));
                            break None;
                        }
                        None => break Some(ResultCode::Error),
                    }
                }
                b'A' => break Some(ResultCode::NoCarrier),
                b'I' => match cursor.number().unwrap_or(0) {
                    0 => self.write_info(PRODUCT_NAME, output),
                    1 | 3 => self.write_info(env!("CARGO_PKG_VERSION"), output),
                    _ => break Some(ResultCode::Error),
                },
                b'S' => {
                    let Some(index) = cursor.number() else {
                        break Some(ResultCode::Error);
                    };
                    let index = index as usize;
                    match cursor.next() {
                        Some(b'=') => {
                            let value = cursor.number().unwrap_or(0);
                            let stored = u8::try_from(value)
                                .is_ok_and(|value| self.settings.registers.set(index, value));
                            if !stored {
                                break Some(ResultCode::Error);
                            }
                        }
                        Some(b'?') => match self.settings.registers.get(index) {
                            Some(value) => self.write_info(&format!("{value:03}"), output),
                            None => break Some(ResultCode::Error),
                        },
                        _ => break Some(ResultCode::Error),
                    }
                }
                b'X' | b'M' | b'L' => {
                    cursor.number();
                }
                _ => break Some(ResultCode::Error),
            }
        };

        if let Some(code) = result {
            self.write_result(code, output);
        }
        actions
    }
}

impl Default for HayesModem {
    fn default() -> Self {
        HayesModem::new()
    }
}

/// Cursor over the command text following `AT`.
struct CommandCursor<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl<'a> CommandCursor<'a> {
    fn new(bytes: &'a [u8]) -> CommandCursor<'a> {
        CommandCursor { bytes, position: 0 }
    }

    fn next(&mut self) -> Option<u8> {
        let byte = self.bytes.get(self.position).copied()?;
        self.position += 1;
        Some(byte)
    }

    /// Decimal argument, `None` when no digits follow.
    fn number(&mut self) -> Option<u32> {
        let start = self.position;
        let mut value: u32 = 0;
        while let Some(digit) = self.bytes.get(self.position).filter(|byte| byte.is_ascii_digit()) {
            value = value.saturating_mul(10).saturating_add(u32::from(digit - b'0'));
            self.position += 1;
        }
        (self.position > start).then_some(value)
    }

    /// `0` or `1` argument, defaulting to `0`.
    fn flag(&mut self) -> Option<bool> {
        match self.number().unwrap_or(0) {
            0 => Some(false),
            1 => Some(true),
            _ => None,
        }
    }

    fn rest(&mut self) -> &'a [u8] {
        let rest = &self.bytes[self.position..];
        self.position = self.bytes.len();
        rest
    }
}
