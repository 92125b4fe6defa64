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

//! # Modembridge Telnet Protocol Codec
//!
//! This crate implements the telnet side of the modem bridge: an incremental decoder that strips
//! IAC sequences out of a TCP byte stream, an encoder that escapes outgoing data, and an RFC 1143
//! option negotiation state machine that answers the peer automatically.
//!
//! ## Overview
//!
//! The codec handles:
//!
//! - **Data transmission**: Raw byte data with proper IAC (Interpret As Command) escaping
//! - **Control commands**: Break, Interrupt Process, Abort Output, etc.
//! - **Option negotiation**: DO, DONT, WILL, WONT answered per [`TelnetOptions`] policy
//! - **Subnegotiation**: Bounded buffering of `IAC SB ... IAC SE` payloads
//!
//! ## Core Components
//!
//! ### [`TelnetCodec`]
//!
//! Implements [`Decoder`](tokio_util::codec::Decoder) producing [`TelnetEvent`]s and
//! [`Encoder`](tokio_util::codec::Encoder) for both [`TelnetFrame`]s and raw `&[u8]` data.
//! Negotiation replies produced while decoding are queued and drained with
//! [`TelnetCodec::take_responses`].
//!
//! ### [`TelnetOptions`]
//!
//! Which options may be enabled on each side, and their current [`QState`].
//!
//! ## Usage Example
//!
//! ```rust
//! use modembridge_telnetcodec::{TelnetCodec, TelnetEvent, TelnetOption, TelnetOptions};
//! use tokio_util::codec::{Decoder, Encoder};
//! use bytes::BytesMut;
//!
//! let options = TelnetOptions::new().with_remote(TelnetOption::Echo);
//! let mut codec = TelnetCodec::new(options);
//!
//! // Data + WILL Echo
//! let mut input = BytesMut::from(&b"Hello\xFF\xFB\x01"[..]);
//! let mut data = Vec::new();
//! while let Some(event) = codec.decode(&mut input).unwrap() {
//!     if let TelnetEvent::Data(bytes) = event {
//!         data.extend_from_slice(&bytes);
//!     }
//! }
//! assert_eq!(data, b"Hello");
//! assert!(codec.is_enabled_remote(TelnetOption::Echo));
//! // DO Echo is waiting to be sent back.
//! assert_eq!(&codec.take_responses()[..], b"\xFF\xFD\x01");
//!
//! let mut output = BytesMut::new();
//! codec.encode(&b"\xFFdata"[..], &mut output).unwrap();
//! assert_eq!(&output[..], b"\xFF\xFFdata");
//! ```
//!
//! ## Error Handling
//!
//! Decoding is lenient by default: unknown commands are dropped and a malformed subnegotiation
//! is abandoned. With [`TelnetCodec::with_strict`] the same input yields a
//! [`CodecError::ProtocolViolation`].
//!
//! ## Thread Safety
//!
//! `TelnetCodec` is **not** thread-safe and should not be shared between threads without
//! appropriate synchronization. Each connection has its own codec instance.
//!
//! ## Related RFCs
//!
//! - RFC 854: Telnet Protocol Specification
//! - RFC 855: Telnet Option Specifications
//! - RFC 856: Telnet Binary Transmission
//! - RFC 857: Telnet Echo Option
//! - RFC 858: Telnet Suppress Go Ahead Option
//! - RFC 1143: The Q Method of Implementing TELNET Option Negotiation

#![warn(
    clippy::cargo,
    missing_docs,
    clippy::pedantic,
    future_incompatible,
    rust_2018_idioms
)]
#![allow(
    clippy::option_if_let_else,
    clippy::module_name_repetitions,
    clippy::missing_errors_doc
)]

mod codec;
pub mod consts;
mod event;
mod frame;
mod options;
mod result;

pub use self::codec::TelnetCodec;
pub use self::event::TelnetEvent;
pub use self::frame::TelnetFrame;
pub use self::options::{QState, TelnetOption, TelnetOptions, TelnetSide};
pub use self::result::{CodecError, CodecResult};
