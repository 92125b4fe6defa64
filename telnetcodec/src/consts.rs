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

//! Telnet protocol constants ([RFC854](https://tools.ietf.org/html/rfc854))

/// End of subnegotiation parameters.
pub const SE: u8 = 240;
/// No operation.
pub const NOP: u8 = 241;
/// Data stream portion of a Synch.
pub const DM: u8 = 242;
/// Break.
pub const BRK: u8 = 243;
/// Interrupt process.
pub const IP: u8 = 244;
/// Abort output.
pub const AO: u8 = 245;
/// Are you there.
pub const AYT: u8 = 246;
/// Erase character.
pub const EC: u8 = 247;
/// Erase line.
pub const EL: u8 = 248;
/// Go ahead.
pub const GA: u8 = 249;
/// Subnegotiation begin.
pub const SB: u8 = 250;
/// Sender wants to enable an option.
pub const WILL: u8 = 251;
/// Sender refuses to enable an option.
pub const WONT: u8 = 252;
/// Sender asks the receiver to enable an option.
pub const DO: u8 = 253;
/// Sender asks the receiver not to enable an option.
pub const DONT: u8 = 254;
/// Interpret as command.
pub const IAC: u8 = 255;
/// End of record ([RFC885](https://tools.ietf.org/html/rfc885)).
pub const EOR: u8 = 239;

/// Maximum subnegotiation payload kept by the decoder. Longer payloads are truncated.
pub const MAX_SUBNEGOTIATION_LENGTH: usize = 1024;

/// Option codes.
pub mod option {
    /// Binary transmission ([RFC856](https://tools.ietf.org/html/rfc856)).
    pub const BINARY: u8 = 0;
    /// Echo ([RFC857](https://tools.ietf.org/html/rfc857)).
    pub const ECHO: u8 = 1;
    /// Suppress go ahead ([RFC858](https://tools.ietf.org/html/rfc858)).
    pub const SGA: u8 = 3;
    /// Status ([RFC859](https://tools.ietf.org/html/rfc859)).
    pub const STATUS: u8 = 5;
    /// Timing mark ([RFC860](https://tools.ietf.org/html/rfc860)).
    pub const TM: u8 = 6;
    /// Terminal type ([RFC1091](https://tools.ietf.org/html/rfc1091)).
    pub const TTYPE: u8 = 24;
    /// End of record ([RFC885](https://tools.ietf.org/html/rfc885)).
    pub const EOR: u8 = 25;
    /// Window size ([RFC1073](https://tools.ietf.org/html/rfc1073)).
    pub const NAWS: u8 = 31;
    /// Terminal speed ([RFC1079](https://tools.ietf.org/html/rfc1079)).
    pub const TSPEED: u8 = 32;
    /// Remote flow control ([RFC1372](https://tools.ietf.org/html/rfc1372)).
    pub const LFLOW: u8 = 33;
    /// Linemode ([RFC1184](https://tools.ietf.org/html/rfc1184)).
    pub const LINEMODE: u8 = 34;
    /// New environment ([RFC1572](https://tools.ietf.org/html/rfc1572)).
    pub const NEW_ENVIRON: u8 = 39;
    /// Charset ([RFC2066](https://tools.ietf.org/html/rfc2066)).
    pub const CHARSET: u8 = 42;
    /// Com port control ([RFC2217](https://tools.ietf.org/html/rfc2217)).
    pub const COM_PORT: u8 = 44;
}
