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

//! # Modembridge Hayes Emulation
//!
//! The modem facing half of the bridge. A serial session is always in one of two
//! [`ModemMode`]s:
//!
//! - **Command**: bytes go to [`HayesModem`], which edits and executes `AT` command lines,
//!   writes result codes and returns [`ModemAction`]s (dial, hang up, go online, reset).
//! - **Online**: bytes go to [`HayesFilter`], which forwards user data, drops in-band `AT`
//!   lines and watches for the guarded `+++` escape back to command mode.
//!
//! ```
//! use bytes::BytesMut;
//! use modembridge_hayes::{HayesFilter, ModemMode};
//! use std::time::{Duration, Instant};
//!
//! let mut filter = HayesFilter::new();
//! let mut output = BytesMut::new();
//! let start = Instant::now();
//!
//! filter.process_at(b"hello\r", start, &mut output);
//! assert_eq!(&output[..], b"hello\r");
//!
//! let outcome = filter.process_at(b"+++", start + Duration::from_secs(1), &mut output);
//! assert!(outcome.escaped);
//! assert_eq!(filter.mode(), ModemMode::Command);
//! ```

#![warn(missing_docs, future_incompatible, rust_2018_idioms)]

pub mod consts;
mod dial;
mod filter;
mod modem;
pub mod registers;
mod response;

pub use self::dial::DialTarget;
pub use self::filter::{FilterOutcome, HayesFilter, ModemMode};
pub use self::modem::{FeedOutcome, HayesModem, ModemAction, ModemSettings};
pub use self::registers::SRegisters;
pub use self::response::ResultCode;
