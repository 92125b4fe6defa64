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

/// Default capacity of a [`RingBuffer`] in bytes.
pub const DEFAULT_CAPACITY: usize = 4096;

/// A fixed capacity FIFO byte queue over a reused backing array.
///
/// The buffer never grows and never overwrites unread data. Writes that do not fit are
/// truncated and the number of bytes actually stored is returned to the caller.
///
/// `RingBuffer` is **not** thread-safe. Wrap it in a [`SyncRingBuffer`](crate::SyncRingBuffer)
/// to hand bytes between threads.
#[derive(Clone)]
pub struct RingBuffer {
    storage: Box<[u8]>,
    read_cursor: usize,
    write_cursor: usize,
    count: usize,
}

impl RingBuffer {
    /// Creates an empty ring buffer holding at most `capacity` bytes.
    ///
    /// A capacity of zero is bumped to one so the cursor arithmetic stays well defined.
    pub fn new(capacity: usize) -> RingBuffer {
        RingBuffer {
            storage: vec![0u8; capacity.max(1)].into_boxed_slice(),
            read_cursor: 0,
            write_cursor: 0,
            count: 0,
        }
    }

    /// Total number of bytes the buffer can hold.
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Number of bytes waiting to be read.
    pub fn available(&self) -> usize {
        self.count
    }

    /// Number of bytes that can be written before the buffer is full.
    pub fn free_space(&self) -> usize {
        self.capacity() - self.count
    }

    /// Returns `true` if no bytes are waiting to be read.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Returns `true` if no more bytes can be written.
    pub fn is_full(&self) -> bool {
        self.count == self.capacity()
    }

    /// Discards all buffered bytes and rewinds both cursors.
    pub fn clear(&mut self) {
        self.read_cursor = 0;
        self.write_cursor = 0;
        self.count = 0;
    }

    /// Appends as many bytes of `data` as fit and returns how many were stored.
    pub fn write(&mut self, data: &[u8]) -> usize {
        let length = data.len().min(self.free_space());
        if length == 0 {
            return 0;
        }
        let capacity = self.capacity();
        // First segment runs up to the end of the storage, the second wraps to the front.
        let first = length.min(capacity - self.write_cursor);
        self.storage[self.write_cursor..self.write_cursor + first].copy_from_slice(&data[..first]);
        let second = length - first;
        if second > 0 {
            self.storage[..second].copy_from_slice(&data[first..length]);
        }
        self.write_cursor = (self.write_cursor + length) % capacity;
        self.count += length;
        length
    }

    /// Moves up to `buf.len()` bytes out of the buffer into `buf` and returns how many were read.
    pub fn read(&mut self, buf: &mut [u8]) -> usize {
        let length = self.peek(buf);
        self.consume(length);
        length
    }

    /// Copies up to `buf.len()` bytes into `buf` without consuming them.
    pub fn peek(&self, buf: &mut [u8]) -> usize {
        let length = buf.len().min(self.count);
        if length == 0 {
            return 0;
        }
        let capacity = self.capacity();
        let first = length.min(capacity - self.read_cursor);
        buf[..first].copy_from_slice(&self.storage[self.read_cursor..self.read_cursor + first]);
        let second = length - first;
        if second > 0 {
            buf[first..length].copy_from_slice(&self.storage[..second]);
        }
        length
    }

    /// Drops up to `length` bytes from the front of the buffer and returns how many were dropped.
    pub fn consume(&mut self, length: usize) -> usize {
        let length = length.min(self.count);
        self.read_cursor = (self.read_cursor + length) % self.capacity();
        self.count -= length;
        length
    }
}

impl Default for RingBuffer {
    fn default() -> Self {
        RingBuffer::new(DEFAULT_CAPACITY)
    }
}

impl std::fmt::Debug for RingBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RingBuffer")
            .field("capacity", &self.capacity())
            .field("read_cursor", &self.read_cursor)
            .field("write_cursor", &self.write_cursor)
            .field("count", &self.count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(buffer: &mut RingBuffer) -> Vec<u8> {
        let mut out = vec![0u8; buffer.available()];
        let read = buffer.read(&mut out);
        out.truncate(read);
        out
    }

    #[test]
    fn new_buffer_is_empty() {
        let buffer = RingBuffer::new(16);
        assert!(buffer.is_empty());
        assert!(!buffer.is_full());
        assert_eq!(buffer.available(), 0);
        assert_eq!(buffer.free_space(), 16);
    }

    #[test]
    fn default_capacity_is_4096() {
        assert_eq!(RingBuffer::default().capacity(), DEFAULT_CAPACITY);
    }

    #[test]
    fn write_then_read_preserves_order() {
        let mut buffer = RingBuffer::new(16);
        assert_eq!(buffer.write(b"hello"), 5);
        assert_eq!(drain(&mut buffer), b"hello");
        assert!(buffer.is_empty());
    }

    #[test]
    fn partial_write_when_full() {
        let mut buffer = RingBuffer::new(4);
        assert_eq!(buffer.write(b"abcdef"), 4);
        assert!(buffer.is_full());
        assert_eq!(buffer.write(b"g"), 0);
        assert_eq!(drain(&mut buffer), b"abcd");
    }

    #[test]
    fn wraps_around_storage_end() {
        let mut buffer = RingBuffer::new(8);
        buffer.write(b"123456");
        let mut scratch = [0u8; 4];
        assert_eq!(buffer.read(&mut scratch), 4);
        assert_eq!(&scratch, b"1234");
        // Cursor sits at 6, so this write spans the end of storage.
        assert_eq!(buffer.write(b"abcdef"), 6);
        assert!(buffer.is_full());
        assert_eq!(drain(&mut buffer), b"56abcdef");
    }

    #[test]
    fn write_cursor_tracks_read_cursor_plus_count() {
        let mut buffer = RingBuffer::new(5);
        let mut scratch = [0u8; 3];
        for _ in 0..7 {
            buffer.write(b"xyz");
            buffer.read(&mut scratch[..2]);
            assert_eq!(
                buffer.write_cursor,
                (buffer.read_cursor + buffer.count) % buffer.capacity()
            );
        }
    }

    #[test]
    fn peek_does_not_consume() {
        let mut buffer = RingBuffer::new(8);
        buffer.write(b"abc");
        let mut scratch = [0u8; 2];
        assert_eq!(buffer.peek(&mut scratch), 2);
        assert_eq!(&scratch, b"ab");
        assert_eq!(buffer.available(), 3);
        assert_eq!(buffer.consume(10), 3);
        assert!(buffer.is_empty());
    }

    #[test]
    fn clear_resets_cursors() {
        let mut buffer = RingBuffer::new(8);
        buffer.write(b"abcdef");
        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.free_space(), 8);
        buffer.write(b"z");
        assert_eq!(drain(&mut buffer), b"z");
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let mut buffer = RingBuffer::new(0);
        assert_eq!(buffer.capacity(), 1);
        assert_eq!(buffer.write(b"ab"), 1);
    }
}
