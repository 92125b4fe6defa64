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

use crate::{TelnetOption, TelnetSide};
use bytes::Bytes;

/// What the decoder hands upward.
///
/// Option negotiation is answered inside the codec and only the resulting
/// [`OptionStatus`](TelnetEvent::OptionStatus) change comes out. Data is delivered in
/// runs that end at the next command.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TelnetEvent {
    /// Application bytes, `IAC IAC` already collapsed
    Data(Bytes),
    /// `IAC NOP`
    NoOperation,
    /// `IAC DM`, the end of an urgent Synch
    DataMark,
    /// `IAC BRK`
    Break,
    /// `IAC IP`
    InterruptProcess,
    /// `IAC AO`
    AbortOutput,
    /// `IAC AYT`
    AreYouThere,
    /// `IAC EC`
    EraseCharacter,
    /// `IAC EL`
    EraseLine,
    /// `IAC GA`
    GoAhead,
    /// `IAC EOR`
    EndOfRecord,
    /// An option changed state on one side: `(option, side, enabled)`
    OptionStatus(TelnetOption, TelnetSide, bool),
    /// `IAC SB <option> ... IAC SE` with the payload cut at the decoder bound
    Subnegotiate(TelnetOption, Bytes),
}

impl TelnetEvent {
    /// The data run, if this is one.
    pub fn into_data(self) -> Option<Bytes> {
        match self {
            TelnetEvent::Data(data) => Some(data),
            _ => None,
        }
    }
}
