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

//! End-to-end harness for modembridge
//!
//! [`VirtualLine`] stands in for the serial cable: the bridge owns its [`PortEnd`] and a
//! test types on the [`TerminalEnd`]. [`StubServer`] is a minimal telnet server on the
//! loopback interface that decodes what the bridge sends.

mod line;
mod server;

pub use line::{PortEnd, TerminalEnd, VirtualLine};
pub use server::{StubConnection, StubServer};

use std::time::{Duration, Instant};

/// Default deadline for the `wait_*` helpers.
pub const WAIT: Duration = Duration::from_secs(5);

/// Polls `condition` every few milliseconds until it holds or `timeout` passes.
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
}
