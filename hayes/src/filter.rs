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

use crate::consts::{CR, DEFAULT_GUARD_TIME, ESCAPE_CHAR, ESCAPE_LENGTH, LF, MAX_LINE_LENGTH};
use bytes::{BufMut, BytesMut};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Which side of the modem consumes serial input.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum ModemMode {
    /// Serial bytes are AT commands for the local interpreter.
    #[default]
    Command,
    /// Serial bytes are data for the remote end.
    Online,
}

/// Position within the current line of online data.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum LineState {
    /// Nothing but terminators seen since the last line break.
    Start,
    /// The held bytes still spell the beginning of an `AT` or `at` command.
    Candidate,
    /// The line cannot be a command, bytes flow straight through.
    Passthrough,
}

/// What a call to [`HayesFilter::process_at`] did.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct FilterOutcome {
    /// Input bytes examined. Less than the input length only when an escape switched the
    /// filter into command mode; the rest belongs to the command interpreter.
    pub consumed: usize,
    /// An escape sequence was recognized during this call.
    pub escaped: bool,
    /// Number of AT command lines dropped during this call.
    pub suppressed_lines: usize,
}

/// Online mode filter for data leaving the serial line.
///
/// Drops in-band `AT` command lines and watches for the guarded `+++` escape. Bytes that
/// cannot be part of either are written to the output as soon as they arrive; only a line
/// that still reads as the start of an `AT` command, or a run of up to two escape
/// characters, is held across calls.
///
/// The guard interval is checked before the first escape character only. Later characters
/// of the sequence are not gap checked, and no trailing silence is required.
#[derive(Debug)]
pub struct HayesFilter {
    mode: ModemMode,
    escape_char: Option<u8>,
    guard_time: Duration,
    escape_count: u8,
    last_byte_at: Option<Instant>,
    line_state: LineState,
    line: BytesMut,
}

impl HayesFilter {
    /// An online filter using the default `+` escape and one second guard time.
    pub fn new() -> HayesFilter {
        HayesFilter {
            mode: ModemMode::Online,
            escape_char: Some(ESCAPE_CHAR),
            guard_time: DEFAULT_GUARD_TIME,
            escape_count: 0,
            last_byte_at: None,
            line_state: LineState::Start,
            line: BytesMut::with_capacity(64),
        }
    }

    /// Replaces the guard interval.
    #[must_use]
    pub fn with_guard_time(mut self, guard_time: Duration) -> HayesFilter {
        self.guard_time = guard_time;
        self
    }

    /// Replaces the escape character, `None` disables escape detection.
    #[must_use]
    pub fn with_escape_char(mut self, escape_char: Option<u8>) -> HayesFilter {
        self.escape_char = escape_char;
        self
    }

    /// Current mode.
    pub fn mode(&self) -> ModemMode {
        self.mode
    }

    /// Current guard interval.
    pub fn guard_time(&self) -> Duration {
        self.guard_time
    }

    /// Applies escape settings taken from the modem's S-registers.
    pub fn configure(&mut self, escape_char: Option<u8>, guard_time: Duration) {
        self.escape_char = escape_char;
        self.guard_time = guard_time;
    }

    /// Switches mode and forgets any partial escape or held line.
    ///
    /// The time of the last byte is kept, so the guard interval still spans the switch.
    pub fn set_mode(&mut self, mode: ModemMode) {
        if self.mode != mode {
            debug!(from = ?self.mode, to = ?mode, "hayes filter mode change");
        }
        self.mode = mode;
        self.escape_count = 0;
        self.line_state = LineState::Start;
        self.line.clear();
    }

    /// Records serial activity that bypassed the filter, such as command mode typing.
    pub fn note_activity(&mut self, now: Instant) {
        self.last_byte_at = Some(now);
    }

    /// Number of bytes currently held back.
    pub fn pending(&self) -> usize {
        self.line.len() + usize::from(self.escape_count)
    }

    /// Filters `input` using the current time.
    pub fn process(&mut self, input: &[u8], output: &mut BytesMut) -> FilterOutcome {
        self.process_at(input, Instant::now(), output)
    }

    /// Filters `input` as if every byte arrived at `now`.
    ///
    /// Stops right after an escape sequence. Does nothing when in command mode.
    pub fn process_at(
        &mut self,
        input: &[u8],
        now: Instant,
        output: &mut BytesMut,
    ) -> FilterOutcome {
        let mut outcome = FilterOutcome::default();
        if self.mode == ModemMode::Command {
            return outcome;
        }

        for (index, &byte) in input.iter().enumerate() {
            let quiet = self
                .last_byte_at
                .is_none_or(|previous| now.saturating_duration_since(previous) >= self.guard_time);
            self.last_byte_at = Some(now);
            let is_escape = self.escape_char == Some(byte);

            match (self.escape_count, is_escape) {
                (0, true) if quiet => self.escape_count = 1,
                (count, true) if count > 0 && count + 1 < ESCAPE_LENGTH => self.escape_count += 1,
                (count, true) if count > 0 => {
                    info!(guard = ?self.guard_time, "escape sequence detected");
                    self.set_mode(ModemMode::Command);
                    outcome.consumed = index + 1;
                    outcome.escaped = true;
                    return outcome;
                }
                (0, _) => outcome.suppressed_lines += self.push_data(byte, output),
                (count, _) => {
                    self.escape_count = 0;
                    for _ in 0..count {
                        let byte = byte_or_escape(self.escape_char);
                        outcome.suppressed_lines += self.push_data(byte, output);
                    }
                    outcome.suppressed_lines += self.push_data(byte, output);
                }
            }
        }

        outcome.consumed = input.len();
        outcome
    }

    /// Routes one data byte through the line tracker, returning 1 if it completed a
    /// suppressed command line.
    fn push_data(&mut self, byte: u8, output: &mut BytesMut) -> usize {
        let terminator = byte == CR || byte == LF;
        match (self.line_state, terminator) {
            (LineState::Start, true) => output.put_u8(byte),
            (LineState::Start, false) => {
                if byte == b'A' || byte == b'a' {
                    self.line.put_u8(byte);
                    self.line_state = LineState::Candidate;
                } else {
                    output.put_u8(byte);
                    self.line_state = LineState::Passthrough;
                }
            }
            (LineState::Candidate, true) => {
                self.line_state = LineState::Start;
                if self.line.len() >= 2 {
                    debug!(
                        command = %String::from_utf8_lossy(&self.line),
                        "suppressed in-band AT command"
                    );
                    self.line.clear();
                    return 1;
                }
                output.extend_from_slice(&self.line);
                output.put_u8(byte);
                self.line.clear();
            }
            (LineState::Candidate, false) => {
                let still_command = match self.line.len() {
                    1 => matches!((self.line[0], byte), (b'A', b'T') | (b'a', b't')),
                    length => length < MAX_LINE_LENGTH,
                };
                if still_command {
                    self.line.put_u8(byte);
                } else {
                    output.extend_from_slice(&self.line);
                    output.put_u8(byte);
                    self.line.clear();
                    self.line_state = LineState::Passthrough;
                }
            }
            (LineState::Passthrough, true) => {
                output.put_u8(byte);
                self.line_state = LineState::Start;
            }
            (LineState::Passthrough, false) => output.put_u8(byte),
        }
        0
    }
}

fn byte_or_escape(escape_char: Option<u8>) -> u8 {
    escape_char.unwrap_or(ESCAPE_CHAR)
}

impl Default for HayesFilter {
    fn default() -> Self {
        HayesFilter::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ============================================================================
    // Helper Functions
    // ============================================================================

    fn run(filter: &mut HayesFilter, input: &[u8], now: Instant) -> (Vec<u8>, FilterOutcome) {
        let mut output = BytesMut::new();
        let outcome = filter.process_at(input, now, &mut output);
        (output.to_vec(), outcome)
    }

    fn run_bytewise(filter: &mut HayesFilter, input: &[u8], now: Instant) -> Vec<u8> {
        let mut output = BytesMut::new();
        for byte in input {
            filter.process_at(std::slice::from_ref(byte), now, &mut output);
        }
        output.to_vec()
    }

    // ============================================================================
    // AT Suppression
    // ============================================================================

    #[test]
    fn at_line_is_suppressed() {
        let mut filter = HayesFilter::new();
        let (output, outcome) = run(&mut filter, b"AT\r", Instant::now());
        assert!(output.is_empty());
        assert_eq!(outcome.suppressed_lines, 1);
        assert_eq!(outcome.consumed, 3);
        assert_eq!(filter.mode(), ModemMode::Online);
    }

    #[test]
    fn lowercase_at_line_is_suppressed() {
        let mut filter = HayesFilter::new();
        let (output, _) = run(&mut filter, b"atdt5551234\n", Instant::now());
        assert!(output.is_empty());
    }

    #[test]
    fn mixed_case_at_is_data() {
        let mut filter = HayesFilter::new();
        let (output, _) = run(&mut filter, b"At\r", Instant::now());
        assert_eq!(output, b"At\r");
    }

    #[test]
    fn athens_is_not_a_command() {
        let mut filter = HayesFilter::new();
        let (output, outcome) = run(&mut filter, b"Athens Greece\r", Instant::now());
        assert_eq!(output, b"Athens Greece\r");
        assert_eq!(outcome.suppressed_lines, 0);
    }

    #[test]
    fn at_inside_a_line_is_data() {
        let mut filter = HayesFilter::new();
        let (output, _) = run(&mut filter, b"meet AT noon\r", Instant::now());
        assert_eq!(output, b"meet AT noon\r");
    }

    #[test]
    fn single_a_line_is_emitted() {
        let mut filter = HayesFilter::new();
        let (output, _) = run(&mut filter, b"A\r", Instant::now());
        assert_eq!(output, b"A\r");
    }

    #[test]
    fn command_after_data_line_is_suppressed() {
        let mut filter = HayesFilter::new();
        let (output, outcome) = run(&mut filter, b"hello\rATH\rbye", Instant::now());
        assert_eq!(output, b"hello\rbye");
        assert_eq!(outcome.suppressed_lines, 1);
    }

    #[test]
    fn candidate_line_is_held_across_calls() {
        let mut filter = HayesFilter::new();
        let now = Instant::now();
        let (first, _) = run(&mut filter, b"AT", now);
        assert!(first.is_empty());
        assert_eq!(filter.pending(), 2);
        let (second, outcome) = run(&mut filter, b"Z\r", now);
        assert!(second.is_empty());
        assert_eq!(outcome.suppressed_lines, 1);
        assert_eq!(filter.pending(), 0);
    }

    #[test]
    fn overlong_candidate_is_flushed() {
        let mut filter = HayesFilter::new();
        let mut input = b"AT".to_vec();
        input.resize(MAX_LINE_LENGTH + 10, b'X');
        input.push(b'\r');
        let (output, outcome) = run(&mut filter, &input, Instant::now());
        assert_eq!(output, input);
        assert_eq!(outcome.suppressed_lines, 0);
    }

    // ============================================================================
    // Passthrough
    // ============================================================================

    #[test]
    fn bytewise_passthrough_preserves_input() {
        let mut filter = HayesFilter::new();
        let input = b"hello@example.com\r";
        assert_eq!(run_bytewise(&mut filter, input, Instant::now()), input);
    }

    #[test]
    fn ordinary_bytes_are_not_delayed() {
        let mut filter = HayesFilter::new();
        let (output, _) = run(&mut filter, b"x", Instant::now());
        assert_eq!(output, b"x");
        assert_eq!(filter.pending(), 0);
    }

    #[test]
    fn command_mode_processes_nothing() {
        let mut filter = HayesFilter::new();
        filter.set_mode(ModemMode::Command);
        let (output, outcome) = run(&mut filter, b"data", Instant::now());
        assert!(output.is_empty());
        assert_eq!(outcome.consumed, 0);
    }

    // ============================================================================
    // Escape Sequence
    // ============================================================================

    #[test]
    fn guarded_escape_enters_command_mode() {
        let mut filter = HayesFilter::new();
        let start = Instant::now();
        run(&mut filter, b"x", start);
        let (output, outcome) = run(&mut filter, b"+++", start + Duration::from_millis(1000));
        assert!(output.is_empty());
        assert!(outcome.escaped);
        assert_eq!(outcome.consumed, 3);
        assert_eq!(filter.mode(), ModemMode::Command);
    }

    #[test]
    fn escape_split_across_calls() {
        let mut filter = HayesFilter::new();
        let start = Instant::now();
        let mut output = BytesMut::new();
        filter.process_at(b"+", start, &mut output);
        assert_eq!(filter.pending(), 1);
        filter.process_at(b"+", start + Duration::from_millis(10), &mut output);
        let outcome = filter.process_at(b"+", start + Duration::from_millis(20), &mut output);
        assert!(output.is_empty());
        assert!(outcome.escaped);
    }

    #[test]
    fn escape_without_guard_is_data() {
        let mut filter = HayesFilter::new();
        let start = Instant::now();
        run(&mut filter, b"x", start);
        let (output, outcome) = run(&mut filter, b"+++", start + Duration::from_millis(200));
        assert_eq!(output, b"+++");
        assert!(!outcome.escaped);
        assert_eq!(filter.mode(), ModemMode::Online);
    }

    #[test]
    fn abandoned_escape_flushes_pluses() {
        let mut filter = HayesFilter::new();
        let (output, outcome) = run(&mut filter, b"++x", Instant::now());
        assert_eq!(output, b"++x");
        assert!(!outcome.escaped);
        assert_eq!(filter.mode(), ModemMode::Online);
    }

    #[test]
    fn bytes_after_escape_are_left_unconsumed() {
        let mut filter = HayesFilter::new();
        let (output, outcome) = run(&mut filter, b"+++ATH\r", Instant::now());
        assert!(output.is_empty());
        assert_eq!(outcome.consumed, 3);
        assert_eq!(filter.mode(), ModemMode::Command);
    }

    #[test]
    fn custom_escape_character() {
        let mut filter = HayesFilter::new().with_escape_char(Some(b'~'));
        let start = Instant::now();
        let (output, outcome) = run(&mut filter, b"+++", start);
        assert_eq!(output, b"+++");
        assert!(!outcome.escaped);
        let (output, outcome) = run(&mut filter, b"~~~", start + Duration::from_secs(1));
        assert!(output.is_empty());
        assert!(outcome.escaped);
    }

    #[test]
    fn disabled_escape_passes_pluses() {
        let mut filter = HayesFilter::new().with_escape_char(None);
        let (output, outcome) = run(&mut filter, b"+++", Instant::now());
        assert_eq!(output, b"+++");
        assert!(!outcome.escaped);
    }

    #[test]
    fn activity_in_command_mode_counts_against_guard() {
        let mut filter = HayesFilter::new().with_guard_time(Duration::from_millis(500));
        let start = Instant::now();
        filter.set_mode(ModemMode::Command);
        filter.note_activity(start);
        filter.set_mode(ModemMode::Online);
        let (output, _) = run(&mut filter, b"+++", start + Duration::from_millis(100));
        assert_eq!(output, b"+++");
    }

    #[test]
    fn escape_discards_held_candidate() {
        let mut filter = HayesFilter::new();
        let start = Instant::now();
        run(&mut filter, b"A", start);
        let (output, outcome) = run(&mut filter, b"+++", start + Duration::from_secs(2));
        assert!(output.is_empty());
        assert!(outcome.escaped);
        assert_eq!(filter.pending(), 0);
    }
}
