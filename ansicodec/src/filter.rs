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

use crate::config::AnsiConfig;
use crate::consts::{CSI_OPEN, ESC, MAX_SEQUENCE_LENGTH, MAX_UTF8_LENGTH};
use bytes::{BufMut, BytesMut};
use tracing::trace;

/// Escape sequence recognition state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    /// Plain text.
    ///
    /// ESC (0x1B) moves to `Escape`; everything else is text, subject to UTF-8 carry.
    Normal,

    /// ESC seen, waiting for the byte that decides the sequence type.
    ///
    /// - `[` opens a CSI sequence (`Csi`)
    /// - a printable byte (0x20-0x7E) completes a two byte escape
    /// - anything else ends a standalone ESC and is reprocessed as text
    Escape,

    /// `ESC [` seen, no parameter bytes yet.
    Csi,

    /// Inside a CSI sequence.
    ///
    /// Parameter (0x30-0x3F) and intermediate (0x20-0x2F) bytes continue the sequence, a
    /// final byte (0x40-0x7E) completes it. Any other byte abandons the sequence and is
    /// reprocessed as text.
    CsiParam,
}

/// Filter for data travelling from the telnet side to the serial line.
///
/// Recognizes escape sequence boundaries so that [`AnsiConfig`] can pass or strip them
/// consistently even when a sequence spans calls. Never emits part of a multi-byte UTF-8
/// code point: trailing bytes of an incomplete sequence are carried into the next call.
///
/// Malformed input is forwarded as is. An invalid continuation, or an ESC arriving in the
/// middle of a code point, releases the carried bytes unchanged.
#[derive(Clone, Debug)]
pub struct StreamFilter {
    config: AnsiConfig,
    state: State,
    sequence_length: usize,
    pending: [u8; MAX_UTF8_LENGTH],
    pending_length: usize,
    expected_length: usize,
    stripped: u64,
}

impl StreamFilter {
    /// Creates a filter in its initial state.
    pub fn new(config: AnsiConfig) -> StreamFilter {
        StreamFilter {
            config,
            state: State::Normal,
            sequence_length: 0,
            pending: [0; MAX_UTF8_LENGTH],
            pending_length: 0,
            expected_length: 0,
            stripped: 0,
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &AnsiConfig {
        &self.config
    }

    /// Bytes of an incomplete UTF-8 code point carried to the next call.
    pub fn pending(&self) -> usize {
        self.pending_length
    }

    /// Total bytes dropped by stripping.
    pub fn stripped_bytes(&self) -> u64 {
        self.stripped
    }

    /// Forgets carried bytes and any partial escape sequence.
    pub fn reset(&mut self) {
        self.state = State::Normal;
        self.sequence_length = 0;
        self.pending_length = 0;
        self.expected_length = 0;
    }

    /// Releases everything held back, as at the end of a stream.
    pub fn flush(&mut self, output: &mut BytesMut) {
        if self.state == State::Escape {
            self.keep_or_strip_escape(&[ESC], output);
        }
        self.release_utf8(output);
        self.reset();
    }

    /// Filters one chunk, appending the result to `output`.
    pub fn process(&mut self, input: &[u8], output: &mut BytesMut) {
        output.reserve(input.len() + self.pending_length);
        for &byte in input {
            match self.state {
                State::Normal => self.process_normal(byte, output),
                State::Escape => self.process_escape(byte, output),
                State::Csi | State::CsiParam => self.process_csi(byte, output),
            }
        }
    }

    fn process_normal(&mut self, byte: u8, output: &mut BytesMut) {
        if byte == ESC {
            self.release_utf8(output);
            self.state = State::Escape;
            self.sequence_length = 1;
            return;
        }
        self.process_text(byte, output);
    }

    fn process_escape(&mut self, byte: u8, output: &mut BytesMut) {
        match byte {
            CSI_OPEN => {
                self.state = State::Csi;
                self.sequence_length = 2;
                self.keep_or_strip_csi(&[ESC, CSI_OPEN], output);
            }
            0x20..=0x7E => {
                self.state = State::Normal;
                self.keep_or_strip_escape(&[ESC, byte], output);
            }
            _ => {
                self.state = State::Normal;
                self.keep_or_strip_escape(&[ESC], output);
                self.process_normal(byte, output);
            }
        }
    }

    fn process_csi(&mut self, byte: u8, output: &mut BytesMut) {
        if self.sequence_length >= MAX_SEQUENCE_LENGTH {
            trace!(length = self.sequence_length, "abandoning overlong control sequence");
            self.state = State::Normal;
            self.process_normal(byte, output);
            return;
        }
        match byte {
            0x20..=0x3F => {
                self.state = State::CsiParam;
                self.sequence_length += 1;
                self.keep_or_strip_csi(&[byte], output);
            }
            0x40..=0x7E => {
                self.state = State::Normal;
                self.keep_or_strip_csi(&[byte], output);
            }
            _ => {
                self.state = State::Normal;
                self.process_normal(byte, output);
            }
        }
    }

    fn process_text(&mut self, byte: u8, output: &mut BytesMut) {
        if self.expected_length == 0 {
            match utf8_sequence_length(byte) {
                Some(length) if length > 1 => {
                    self.pending[0] = byte;
                    self.pending_length = 1;
                    self.expected_length = length;
                }
                _ => output.put_u8(byte),
            }
            return;
        }

        if byte & 0xC0 == 0x80 {
            self.pending[self.pending_length] = byte;
            self.pending_length += 1;
            if self.pending_length == self.expected_length {
                output.extend_from_slice(&self.pending[..self.pending_length]);
                self.pending_length = 0;
                self.expected_length = 0;
            }
        } else {
            self.release_utf8(output);
            self.process_text(byte, output);
        }
    }

    fn release_utf8(&mut self, output: &mut BytesMut) {
        output.extend_from_slice(&self.pending[..self.pending_length]);
        self.pending_length = 0;
        self.expected_length = 0;
    }

    fn keep_or_strip_csi(&mut self, bytes: &[u8], output: &mut BytesMut) {
        if self.config.strip_csi {
            self.stripped += bytes.len() as u64;
        } else {
            output.extend_from_slice(bytes);
        }
    }

    fn keep_or_strip_escape(&mut self, bytes: &[u8], output: &mut BytesMut) {
        if self.config.strip_escape {
            self.stripped += bytes.len() as u64;
        } else {
            output.extend_from_slice(bytes);
        }
    }
}

impl Default for StreamFilter {
    fn default() -> Self {
        StreamFilter::new(AnsiConfig::default())
    }
}

/// Encoded length announced by a UTF-8 leading byte, `None` for continuation and invalid
/// bytes.
pub fn utf8_sequence_length(byte: u8) -> Option<usize> {
    match byte {
        0x00..=0x7F => Some(1),
        0xC0..=0xDF => Some(2),
        0xE0..=0xEF => Some(3),
        0xF0..=0xF7 => Some(4),
        _ => None,
    }
}
