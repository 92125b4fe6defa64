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

//! # Modembridge Buffers
//!
//! Byte queues that carry data between the serial side and the telnet side of the bridge.
//!
//! - [`RingBuffer`] is a fixed capacity FIFO over a reused backing array. It is single
//!   threaded.
//! - [`SyncRingBuffer`] wraps a `RingBuffer` in a mutex with "space available" and
//!   "data available" condition variables, offering non-blocking and deadline bounded
//!   blocking reads and writes.
//!
//! ```
//! use modembridge_buffer::{BufferOutcome, SyncRingBuffer};
//! use std::time::Duration;
//!
//! let buffer = SyncRingBuffer::new(16);
//! assert_eq!(buffer.write(b"ATZ\r"), 4);
//!
//! let mut out = [0u8; 16];
//! let outcome = buffer.read_blocking(&mut out, Some(Duration::from_millis(10)));
//! assert_eq!(outcome, BufferOutcome::Completed(4));
//! ```

mod ring;
mod sync;

pub use self::ring::{DEFAULT_CAPACITY, RingBuffer};
pub use self::sync::{BufferOutcome, SyncRingBuffer};
