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

use crate::{WAIT, wait_until};
use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

#[derive(Default)]
struct Wire {
    to_port: VecDeque<u8>,
    to_terminal: Vec<u8>,
}

/// An in-memory null modem cable.
pub struct VirtualLine;

impl VirtualLine {
    /// Creates both ends of a fresh line.
    pub fn pair() -> (TerminalEnd, PortEnd) {
        let wire = Arc::new(Mutex::new(Wire::default()));
        (TerminalEnd { wire: wire.clone() }, PortEnd { wire })
    }
}

fn lock(wire: &Mutex<Wire>) -> std::sync::MutexGuard<'_, Wire> {
    wire.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The side the bridge reads and writes, like a serial device.
///
/// Reads return `WouldBlock` while the terminal has typed nothing.
pub struct PortEnd {
    wire: Arc<Mutex<Wire>>,
}

impl Read for PortEnd {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut wire = lock(&self.wire);
        if wire.to_port.is_empty() {
            return Err(io::ErrorKind::WouldBlock.into());
        }
        let n = buf.len().min(wire.to_port.len());
        for (slot, byte) in buf.iter_mut().zip(wire.to_port.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl Write for PortEnd {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        lock(&self.wire).to_terminal.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// The side a test drives, like the user at the terminal.
#[derive(Clone)]
pub struct TerminalEnd {
    wire: Arc<Mutex<Wire>>,
}

impl TerminalEnd {
    /// Queues bytes for the bridge to read.
    pub fn type_bytes(&self, bytes: &[u8]) {
        lock(&self.wire).to_port.extend(bytes.iter().copied());
    }

    /// Types a command line followed by CR.
    pub fn type_line(&self, line: &str) {
        let mut bytes = line.as_bytes().to_vec();
        bytes.push(b'\r');
        self.type_bytes(&bytes);
    }

    /// Everything the bridge has written so far
    pub fn output(&self) -> Vec<u8> {
        lock(&self.wire).to_terminal.clone()
    }

    /// Output decoded lossily as text
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.output()).into_owned()
    }

    /// Discards the output seen so far.
    pub fn clear(&self) {
        lock(&self.wire).to_terminal.clear();
    }

    /// Whether the bridge has read everything typed.
    pub fn drained(&self) -> bool {
        lock(&self.wire).to_port.is_empty()
    }

    /// Waits until the output contains `needle`.
    pub fn wait_for(&self, needle: &str) -> bool {
        self.wait_for_within(needle, WAIT)
    }

    /// Waits up to `timeout` for `needle` to appear in the output.
    pub fn wait_for_within(&self, needle: &str, timeout: Duration) -> bool {
        wait_until(timeout, || self.text().contains(needle))
    }

    /// Counts non-overlapping occurrences of `needle` in the output.
    pub fn count(&self, needle: &str) -> usize {
        self.text().matches(needle).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_reads_what_terminal_types() {
        let (terminal, mut port) = VirtualLine::pair();
        let mut buf = [0u8; 8];
        assert_eq!(
            port.read(&mut buf).unwrap_err().kind(),
            io::ErrorKind::WouldBlock
        );

        terminal.type_line("AT");
        assert_eq!(port.read(&mut buf).unwrap(), 3);
        assert_eq!(&buf[..3], b"AT\r");
        assert!(terminal.drained());
    }

    #[test]
    fn test_terminal_sees_port_writes() {
        let (terminal, mut port) = VirtualLine::pair();
        port.write_all(b"\r\nOK\r\n").unwrap();
        assert!(terminal.wait_for("OK"));
        assert_eq!(terminal.count("OK"), 1);
        terminal.clear();
        assert!(terminal.output().is_empty());
    }
}
