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

use std::fmt;
use std::str::FromStr;

/// How control sequences are treated by the [`StreamFilter`](crate::StreamFilter).
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum AnsiMode {
    /// Forward escape sequences unchanged.
    #[default]
    Pass,
    /// Drop escape sequences, keep text.
    Strip,
}

impl FromStr for AnsiMode {
    type Err = ParseAnsiModeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pass" | "passthrough" | "on" => Ok(AnsiMode::Pass),
            "strip" | "off" => Ok(AnsiMode::Strip),
            _ => Err(ParseAnsiModeError(value.to_string())),
        }
    }
}

impl fmt::Display for AnsiMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnsiMode::Pass => f.write_str("pass"),
            AnsiMode::Strip => f.write_str("strip"),
        }
    }
}

/// Unrecognized [`AnsiMode`] name.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ParseAnsiModeError(String);

impl fmt::Display for ParseAnsiModeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown ansi mode '{}', expected 'pass' or 'strip'", self.0)
    }
}

impl std::error::Error for ParseAnsiModeError {}

/// Stream filter settings.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AnsiConfig {
    /// Strip Control Sequence Introducer (`ESC [`) sequences.
    pub strip_csi: bool,
    /// Strip other two byte escape sequences (`ESC <byte>`).
    pub strip_escape: bool,
}

impl AnsiConfig {
    /// Strip all escape sequences
    pub fn strip_all() -> AnsiConfig {
        AnsiConfig {
            strip_csi: true,
            strip_escape: true,
        }
    }
    /// Strip CSI sequences only
    pub fn strip_csi_only() -> AnsiConfig {
        AnsiConfig {
            strip_csi: true,
            strip_escape: false,
        }
    }
    /// Forward everything
    pub fn enabled() -> AnsiConfig {
        AnsiConfig {
            strip_csi: false,
            strip_escape: false,
        }
    }
}

impl Default for AnsiConfig {
    fn default() -> Self {
        Self::enabled()
    }
}

impl From<AnsiMode> for AnsiConfig {
    fn from(mode: AnsiMode) -> Self {
        match mode {
            AnsiMode::Pass => AnsiConfig::enabled(),
            AnsiMode::Strip => AnsiConfig::strip_all(),
        }
    }
}
