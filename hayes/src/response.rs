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

/// Result codes reported to the serial side.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ResultCode {
    /// Command executed.
    Ok,
    /// Carrier established.
    Connect,
    /// Incoming call.
    Ring,
    /// Carrier lost or never established.
    NoCarrier,
    /// Command rejected.
    Error,
    /// Remote end refused the call.
    Busy,
}

impl ResultCode {
    /// Numeric form used when verbose responses are off (`V0`).
    pub fn code(self) -> u8 {
        match self {
            ResultCode::Ok => 0,
            ResultCode::Connect => 1,
            ResultCode::Ring => 2,
            ResultCode::NoCarrier => 3,
            ResultCode::Error => 4,
            ResultCode::Busy => 7,
        }
    }

    /// Verbose text form.
    pub fn text(self) -> &'static str {
        match self {
            ResultCode::Ok => "OK",
            ResultCode::Connect => "CONNECT",
            ResultCode::Ring => "RING",
            ResultCode::NoCarrier => "NO CARRIER",
            ResultCode::Error => "ERROR",
            ResultCode::Busy => "BUSY",
        }
    }

    /// Looks a result code up by its numeric form.
    pub fn from_code(code: u8) -> Option<ResultCode> {
        match code {
            0 => Some(ResultCode::Ok),
            1 => Some(ResultCode::Connect),
            2 => Some(ResultCode::Ring),
            3 => Some(ResultCode::NoCarrier),
            4 => Some(ResultCode::Error),
            7 => Some(ResultCode::Busy),
            _ => None,
        }
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_codes_match_hayes_table() {
        let table = [
            (ResultCode::Ok, 0),
            (ResultCode::Connect, 1),
            (ResultCode::Ring, 2),
            (ResultCode::NoCarrier, 3),
            (ResultCode::Error, 4),
            (ResultCode::Busy, 7),
        ];
        for (result, code) in table {
            assert_eq!(result.code(), code);
            assert_eq!(ResultCode::from_code(code), Some(result));
        }
        assert_eq!(ResultCode::from_code(5), None);
    }

    #[test]
    fn display_uses_verbose_text() {
        assert_eq!(ResultCode::NoCarrier.to_string(), "NO CARRIER");
    }
}
