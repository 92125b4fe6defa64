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

/// Escape (`ESC`).
pub const ESC: u8 = 0x1B;

/// Second byte of a Control Sequence Introducer (`ESC [`).
pub const CSI_OPEN: u8 = b'[';

/// Maximum length of an escape sequence in bytes.
///
/// A sequence still open after this many bytes is abandoned and the filter returns to
/// normal text, keeping its state bounded on malformed input.
pub const MAX_SEQUENCE_LENGTH: usize = 256;

/// Longest UTF-8 encoding of a single code point.
pub const MAX_UTF8_LENGTH: usize = 4;
