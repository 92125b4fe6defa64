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

//! Hex dump log of bridged traffic

use chrono::{DateTime, Local};
use std::fmt::Write as _;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

/// Bytes shown per log line.
pub const BYTES_PER_LINE: usize = 16;

/// Which way the logged bytes were travelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Serial line to telnet server
    SerialToTelnet,
    /// Telnet server to serial line
    TelnetToSerial,
}

impl Direction {
    /// Tag printed in each log line
    pub fn tag(self) -> &'static str {
        match self {
            Direction::SerialToTelnet => "SER->TEL",
            Direction::TelnetToSerial => "TEL->SER",
        }
    }
}

/// Append-only traffic log.
///
/// Each call writes one line per 16 bytes and flushes before returning.
#[derive(Debug)]
pub struct DataLog<W: Write = File> {
    writer: W,
}

impl DataLog<File> {
    /// Opens `path` for appending, creating it if needed.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(DataLog { writer: file })
    }
}

impl<W: Write> DataLog<W> {
    /// Logs to an arbitrary writer.
    pub fn new(writer: W) -> Self {
        DataLog { writer }
    }

    /// Records `data` moving in `direction`.
    pub fn write(&mut self, direction: Direction, data: &[u8]) -> io::Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        let now = Local::now();
        let mut text = String::new();
        for chunk in data.chunks(BYTES_PER_LINE) {
            format_line(&mut text, &now, direction, chunk);
        }
        self.writer.write_all(text.as_bytes())?;
        self.writer.flush()
    }

    /// The underlying writer.
    pub fn get_ref(&self) -> &W {
        &self.writer
    }
}

/// Appends one `[timestamp][dir] hex | ascii` line for up to 16 bytes.
pub fn format_line(out: &mut String, at: &DateTime<Local>, direction: Direction, chunk: &[u8]) {
    let mut hex = String::with_capacity(BYTES_PER_LINE * 3);
    for byte in chunk {
        let _ = write!(hex, "{byte:02X} ");
    }
    let ascii: String = chunk
        .iter()
        .map(|&byte| {
            if byte.is_ascii_graphic() || byte == b' ' {
                byte as char
            } else {
                '.'
            }
        })
        .collect();
    let _ = writeln!(
        out,
        "[{}][{}] {:<48} | {}",
        at.format("%Y-%m-%d %H:%M:%S%.3f"),
        direction.tag(),
        hex,
        ascii
    );
}
