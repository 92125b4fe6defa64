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

use crate::RingBuffer;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Upper bound on a single condition wait when the caller asked to wait forever.
///
/// Waits are always timed so the predicate is re-checked periodically.
const INDEFINITE_WAIT_SLICE: Duration = Duration::from_millis(100);

/// Result of a blocking buffer operation.
///
/// Separates "the deadline passed" from "zero bytes were moved", which a plain byte count
/// cannot express.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BufferOutcome {
    /// The operation moved this many bytes.
    Completed(usize),
    /// The deadline elapsed before any space or data became available.
    TimedOut,
}

impl BufferOutcome {
    /// Number of bytes moved, zero when timed out.
    pub fn bytes(self) -> usize {
        match self {
            BufferOutcome::Completed(count) => count,
            BufferOutcome::TimedOut => 0,
        }
    }

    /// Returns `true` if the operation hit its deadline.
    pub fn is_timed_out(self) -> bool {
        matches!(self, BufferOutcome::TimedOut)
    }
}

/// A [`RingBuffer`] shared between a producer thread and a consumer thread.
///
/// All access to the inner buffer happens under one mutex. Two condition variables signal
/// "space became available" to blocked writers and "data became available" to blocked
/// readers. Every mutation wakes one waiter of the opposite kind.
///
/// Timeouts are `Option<Duration>`; `None` waits until the operation can make progress.
pub struct SyncRingBuffer {
    inner: Mutex<RingBuffer>,
    space_available: Condvar,
    data_available: Condvar,
    capacity: usize,
}

impl SyncRingBuffer {
    /// Creates an empty shared buffer holding at most `capacity` bytes.
    pub fn new(capacity: usize) -> SyncRingBuffer {
        let buffer = RingBuffer::new(capacity);
        SyncRingBuffer {
            capacity: buffer.capacity(),
            inner: Mutex::new(buffer),
            space_available: Condvar::new(),
            data_available: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RingBuffer> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Total number of bytes the buffer can hold.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Snapshot of the number of bytes waiting to be read.
    pub fn available(&self) -> usize {
        self.lock().available()
    }

    /// Snapshot of the number of bytes that can be written.
    pub fn free_space(&self) -> usize {
        self.lock().free_space()
    }

    /// Snapshot emptiness check.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Snapshot fullness check.
    pub fn is_full(&self) -> bool {
        self.lock().is_full()
    }

    /// Discards buffered bytes and wakes every blocked writer.
    pub fn clear(&self) {
        self.lock().clear();
        self.space_available.notify_all();
    }

    /// Writes as many bytes as currently fit without blocking.
    ///
    /// A short count is not an error; the caller keeps the remainder.
    pub fn write(&self, data: &[u8]) -> usize {
        let written = self.lock().write(data);
        if written > 0 {
            self.data_available.notify_one();
        }
        written
    }

    /// Reads as many bytes as are currently available without blocking.
    pub fn read(&self, buf: &mut [u8]) -> usize {
        let read = self.lock().read(buf);
        if read > 0 {
            self.space_available.notify_one();
        }
        read
    }

    /// Waits until at least one byte of space is free, then writes as much of `data` as fits.
    pub fn write_blocking(&self, data: &[u8], timeout: Option<Duration>) -> BufferOutcome {
        if data.is_empty() {
            return BufferOutcome::Completed(0);
        }
        let deadline = timeout.map(|timeout| Instant::now() + timeout);
        let mut guard = self.lock();
        loop {
            if !guard.is_full() {
                let written = guard.write(data);
                drop(guard);
                self.data_available.notify_one();
                return BufferOutcome::Completed(written);
            }
            guard = match wait_slice(deadline) {
                Some(slice) => {
                    self.space_available
                        .wait_timeout(guard, slice)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
                None => {
                    tracing::trace!(pending = data.len(), "ring buffer write timed out");
                    return BufferOutcome::TimedOut;
                }
            };
        }
    }

    /// Waits until at least one byte is available, then reads up to `buf.len()` bytes.
    pub fn read_blocking(&self, buf: &mut [u8], timeout: Option<Duration>) -> BufferOutcome {
        if buf.is_empty() {
            return BufferOutcome::Completed(0);
        }
        let deadline = timeout.map(|timeout| Instant::now() + timeout);
        let mut guard = self.lock();
        loop {
            if !guard.is_empty() {
                let read = guard.read(buf);
                drop(guard);
                self.space_available.notify_one();
                return BufferOutcome::Completed(read);
            }
            guard = match wait_slice(deadline) {
                Some(slice) => {
                    self.data_available
                        .wait_timeout(guard, slice)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
                None => return BufferOutcome::TimedOut,
            };
        }
    }
}

/// Length of the next timed wait, or `None` once the deadline has passed.
fn wait_slice(deadline: Option<Instant>) -> Option<Duration> {
    match deadline {
        None => Some(INDEFINITE_WAIT_SLICE),
        Some(deadline) => {
            let now = Instant::now();
            if now >= deadline {
                None
            } else {
                Some(deadline - now)
            }
        }
    }
}

impl std::fmt::Debug for SyncRingBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncRingBuffer")
            .field("capacity", &self.capacity)
            .field("available", &self.available())
            .finish()
    }
}
