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

/// Result Type for Codec Operations
pub type CodecResult<T> = Result<T, CodecError>;

/// Represents possible errors that can occur in the codec handling process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// An I/O error occurred while reading from or writing to the underlying stream.
    IOError {
        /// The kind of I/O error that occurred
        kind: std::io::ErrorKind,
        /// Description of the operation that failed
        operation: String,
    },

    /// A frame that is not a negotiation command was handed to the option state machine.
    NegotiationError {
        /// Description of what went wrong during negotiation
        reason: String,
    },

    /// An IAC sequence broke the protocol framing.
    ///
    /// The decoder recovers from malformed input on its own; this is raised only by a
    /// codec built with `with_strict(true)`.
    ProtocolViolation {
        /// The byte that could not be interpreted
        byte: u8,
        /// What the decoder expected
        expected: &'static str,
    },
}

impl std::fmt::Display for CodecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodecError::IOError { kind, operation } => {
                write!(f, "I/O error during {}: {:?}", operation, kind)
            }
            CodecError::NegotiationError { reason } => {
                write!(f, "negotiation error: {}", reason)
            }
            CodecError::ProtocolViolation { byte, expected } => {
                write!(f, "protocol violation: 0x{:02X}, expected {}", byte, expected)
            }
        }
    }
}

impl std::error::Error for CodecError {}

impl From<std::io::Error> for CodecError {
    fn from(err: std::io::Error) -> Self {
        CodecError::IOError {
            kind: err.kind(),
            operation: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_conversion_keeps_kind() {
        let error: CodecError =
            std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer").into();
        assert!(matches!(
            error,
            CodecError::IOError {
                kind: std::io::ErrorKind::ConnectionReset,
                ..
            }
        ));
    }

    #[test]
    fn display_messages() {
        let error = CodecError::ProtocolViolation {
            byte: 0x42,
            expected: "SE",
        };
        assert_eq!(error.to_string(), "protocol violation: 0x42, expected SE");
    }
}
