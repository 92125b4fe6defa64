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

use crate::consts::{BS, CR, ESCAPE_CHAR, LF};
use std::time::Duration;

/// Number of S-registers the emulated modem exposes (`S0` through `S37`).
pub const REGISTER_COUNT: usize = 38;

/// Auto-answer ring count.
pub const S_AUTO_ANSWER: usize = 0;
/// Escape character, values above 127 disable escape detection.
pub const S_ESCAPE_CHAR: usize = 2;
/// Command line terminator.
pub const S_CARRIAGE_RETURN: usize = 3;
/// Response formatting line feed.
pub const S_LINE_FEED: usize = 4;
/// Command line editing backspace.
pub const S_BACKSPACE: usize = 5;
/// Seconds to wait for carrier after dialing.
pub const S_CARRIER_WAIT: usize = 7;
/// Escape guard time in fiftieths of a second.
pub const S_GUARD_TIME: usize = 12;
/// Longest guard time `S12` can hold.
pub const MAX_GUARD_TIME: Duration = Duration::from_millis(255 * 20);

const FACTORY_DEFAULTS: [u8; REGISTER_COUNT] = {
    let mut registers = [0u8; REGISTER_COUNT];
    registers[S_ESCAPE_CHAR] = ESCAPE_CHAR;
    registers[S_CARRIAGE_RETURN] = CR;
    registers[S_LINE_FEED] = LF;
    registers[S_BACKSPACE] = BS;
    registers[6] = 2;
    registers[S_CARRIER_WAIT] = 50;
    registers[8] = 2;
    registers[9] = 6;
    registers[10] = 14;
    registers[11] = 95;
    registers[S_GUARD_TIME] = 50;
    registers
};

/// The modem's S-register file.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SRegisters {
    values: [u8; REGISTER_COUNT],
}

impl SRegisters {
    /// Register file holding factory defaults.
    pub fn new() -> SRegisters {
        SRegisters {
            values: FACTORY_DEFAULTS,
        }
    }

    /// Reads register `index`, `None` when it does not exist.
    pub fn get(&self, index: usize) -> Option<u8> {
        self.values.get(index).copied()
    }

    /// Writes register `index`, returning `false` when it does not exist.
    pub fn set(&mut self, index: usize, value: u8) -> bool {
        match self.values.get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Restores factory defaults.
    pub fn reset(&mut self) {
        self.values = FACTORY_DEFAULTS;
    }

    /// Escape character, `None` when escape detection is disabled.
    pub fn escape_char(&self) -> Option<u8> {
        let value = self.values[S_ESCAPE_CHAR];
        (value <= 127).then_some(value)
    }

    /// Guard time derived from `S12`.
    pub fn guard_time(&self) -> Duration {
        Duration::from_millis(u64::from(self.values[S_GUARD_TIME]) * 20)
    }

    /// Sets `S12` from a duration, rounded to the nearest 20 ms and saturating at
    /// [`MAX_GUARD_TIME`].
    pub fn set_guard_time(&mut self, guard: Duration) {
        let fiftieths = ((guard.as_millis() + 10) / 20).min(u128::from(u8::MAX));
        self.values[S_GUARD_TIME] = u8::try_from(fiftieths).unwrap_or(u8::MAX);
    }

    /// Line terminator (`S3`).
    pub fn carriage_return(&self) -> u8 {
        self.values[S_CARRIAGE_RETURN]
    }

    /// Response line feed (`S4`).
    pub fn line_feed(&self) -> u8 {
        self.values[S_LINE_FEED]
    }

    /// Editing backspace (`S5`).
    pub fn backspace(&self) -> u8 {
        self.values[S_BACKSPACE]
    }

    /// Carrier wait (`S7`).
    pub fn carrier_wait(&self) -> Duration {
        Duration::from_secs(u64::from(self.values[S_CARRIER_WAIT]))
    }
}

impl Default for SRegisters {
    fn default() -> Self {
        SRegisters::new()
    }
}
