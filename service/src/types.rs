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

//! Core types shared by the bridge workers

use std::fmt;

/// Link state of the bridge, owned by the telnet worker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum BridgeState {
    /// No call in progress
    #[default]
    Idle,
    /// A dial was requested and the telnet connect is in flight
    Connecting,
    /// The telnet session is up
    Online,
    /// A hangup was requested and is being carried out
    Disconnecting,
}

impl BridgeState {
    /// Check if a call is up or being set up
    pub fn is_active(self) -> bool {
        !matches!(self, Self::Idle)
    }
}

impl fmt::Display for BridgeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Connecting => write!(f, "connecting"),
            Self::Online => write!(f, "online"),
            Self::Disconnecting => write!(f, "disconnecting"),
        }
    }
}

/// Link change requested by the serial worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkRequest {
    /// Open a telnet session to `host:port`
    Dial {
        /// Server host
        host: String,
        /// Server port
        port: u16,
    },
    /// Close the telnet session
    Hangup,
}

/// Call progress reported to the serial side as a result code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModemNotice {
    /// The dialed session is up
    Connect,
    /// The dial failed or an established session dropped
    NoCarrier,
    /// The server refused the connection
    Busy,
}

impl fmt::Display for ModemNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect => write!(f, "CONNECT"),
            Self::NoCarrier => write!(f, "NO CARRIER"),
            Self::Busy => write!(f, "BUSY"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bridge_state_active() {
        assert!(!BridgeState::Idle.is_active());
        assert!(BridgeState::Connecting.is_active());
        assert!(BridgeState::Online.is_active());
        assert!(BridgeState::Disconnecting.is_active());
        assert_eq!(BridgeState::default(), BridgeState::Idle);
    }

    #[test]
    fn test_display() {
        assert_eq!(BridgeState::Disconnecting.to_string(), "disconnecting");
        assert_eq!(ModemNotice::NoCarrier.to_string(), "NO CARRIER");
    }
}
