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

//! Error types for the bridge service

use modembridge_telnetcodec::CodecError;
use thiserror::Error;

/// Result type for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Bridge error types
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Null or malformed input handed to an API
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Serial device or socket read/write failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A blocking operation exceeded its deadline
    #[error("Operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Malformed IAC sequence from the telnet peer
    #[error("Protocol violation: {0}")]
    ProtocolViolation(#[from] CodecError),

    /// Peer closed the connection or the link dropped
    #[error("Disconnected")]
    Disconnected,

    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A worker thread panicked
    #[error("{0} panicked")]
    WorkerPanicked(&'static str),
}

impl BridgeError {
    /// Check if the error is recoverable
    ///
    /// Recoverable errors leave the bridge running; the link goes back to idle and the
    /// modem may dial again.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            BridgeError::Timeout(_)
                | BridgeError::Disconnected
                | BridgeError::Io(_)
                | BridgeError::ProtocolViolation(_)
        )
    }

    /// Check if the error is a connection error
    pub fn is_connection_error(&self) -> bool {
        matches!(self, BridgeError::Disconnected | BridgeError::Io(_))
    }
}

/// Errors raised while reading or validating [`Settings`](crate::Settings)
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("cannot read {path}: {source}")]
    Read {
        /// File that failed to load
        path: String,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// A line that is not `key=value`
    #[error("line {line}: expected key=value")]
    Syntax {
        /// One based line number
        line: usize,
    },

    /// A known key with a value that does not parse
    #[error("line {line}: invalid value {value:?} for {key}")]
    InvalidValue {
        /// One based line number
        line: usize,
        /// Key being set
        key: String,
        /// Offending value
        value: String,
    },

    /// The settings parse but do not make sense together
    #[error("{0}")]
    Invalid(String),
}
