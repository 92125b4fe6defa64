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

//! Hayes modem constants

use std::time::Duration;

/// Default escape character (`S2`).
pub const ESCAPE_CHAR: u8 = b'+';

/// Number of escape characters forming an escape sequence.
pub const ESCAPE_LENGTH: u8 = 3;

/// Default silence required before the first escape character.
pub const DEFAULT_GUARD_TIME: Duration = Duration::from_millis(1000);

/// Upper bound on a buffered command line in either mode.
pub const MAX_LINE_LENGTH: usize = 1024;

/// Carriage return.
pub const CR: u8 = b'\r';

/// Line feed.
pub const LF: u8 = b'\n';

/// Backspace.
pub const BS: u8 = 0x08;

/// Product string reported by `ATI0`.
pub const PRODUCT_NAME: &str = "MODEMBRIDGE";
