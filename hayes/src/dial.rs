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

/// Destination named by a `D` command.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DialTarget {
    /// Empty or purely numeric dial string: connect to the configured server.
    Default,
    /// An explicit host, optionally with a port.
    Address {
        /// Host name or address literal.
        host: String,
        /// Port, `None` to use the configured one.
        port: Option<u16>,
    },
}

impl DialTarget {
    /// Parses the text following `ATD`, `ATDT` or `ATDP`.
    ///
    /// Accepts `host`, `host:port`, `host port` and `[v6addr]:port`. Phone number punctuation
    /// (`-`, `,`, `(`, `)`, `W`, `@`) combined with digits counts as a number and selects
    /// [`DialTarget::Default`]. Returns `None` for an unparsable port.
    pub fn parse(text: &str) -> Option<DialTarget> {
        let text = text.trim();
        if text.is_empty() || is_phone_number(text) {
            return Some(DialTarget::Default);
        }

        if let Some((host, port)) = text.split_once(char::is_whitespace) {
            return Some(DialTarget::Address {
                host: host.to_string(),
                port: Some(port.trim().parse().ok()?),
            });
        }

        if let Some(rest) = text.strip_prefix('[') {
            let (host, tail) = rest.split_once(']')?;
            let port = match tail.strip_prefix(':') {
                Some(port) => Some(port.parse().ok()?),
                None if tail.is_empty() => None,
                None => return None,
            };
            return Some(DialTarget::Address {
                host: host.to_string(),
                port,
            });
        }

        match text.rsplit_once(':') {
            Some((host, port)) if !host.contains(':') => Some(DialTarget::Address {
                host: host.to_string(),
                port: Some(port.parse().ok()?),
            }),
            _ => Some(DialTarget::Address {
                host: text.to_string(),
                port: None,
            }),
        }
    }

    /// Resolves against the configured server, yielding `(host, port)`.
    pub fn resolve<'a>(&'a self, default_host: &'a str, default_port: u16) -> (&'a str, u16) {
        match self {
            DialTarget::Default => (default_host, default_port),
            DialTarget::Address { host, port } => (host, port.unwrap_or(default_port)),
        }
    }
}

fn is_phone_number(text: &str) -> bool {
    text.chars().any(|c| c.is_ascii_digit())
        && text
            .chars()
            .all(|c| {
                c.is_ascii_digit() || matches!(c, '-' | ',' | '(' | ')' | 'W' | 'w' | '@' | ' ')
            })
}

impl fmt::Display for DialTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DialTarget::Default => f.write_str("<default>"),
            DialTarget::Address { host, port: Some(port) } => write!(f, "{host}:{port}"),
            DialTarget::Address { host, port: None } => f.write_str(host),
        }
    }
}
