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

//! # Modembridge ANSI Stream Filter
//!
//! Byte stream filter applied to data flowing from the telnet server towards the serial line.
//! It recognizes ANSI escape sequence boundaries, passing or stripping them according to
//! [`AnsiConfig`], and holds back incomplete UTF-8 code points so that no output chunk ever
//! ends in the middle of a character.

pub mod consts;
mod config;
mod filter;

pub use self::config::{AnsiConfig, AnsiMode, ParseAnsiModeError};
pub use self::filter::{StreamFilter, utf8_sequence_length};
