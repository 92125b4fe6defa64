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

//! Client side telnet session over a non-blocking socket

use crate::serial::poll_fd;
use bytes::{Buf, BytesMut};
use modembridge_telnetcodec::{CodecResult, TelnetCodec, TelnetEvent, TelnetOption, TelnetOptions};
use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::fmt;
use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, ToSocketAddrs};
use std::os::unix::io::AsRawFd;
use std::time::Duration;
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, info, trace, warn};

/// Connection progress of a [`TelnetSession`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// No socket
    #[default]
    Disconnected,
    /// Non-blocking connect in flight
    Connecting,
    /// Connected and exchanging data
    Connected,
    /// The connect failed; see [`TelnetSession::last_error`]
    Error,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Result of a [`TelnetSession::recv`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecvStatus {
    /// `n` raw bytes were read
    Data(usize),
    /// Nothing to read right now
    WouldBlock,
    /// The peer closed the connection
    Closed,
}

/// One telnet connection to the server.
///
/// The socket is non-blocking throughout. [`connect`](Self::connect) starts the connect and
/// [`process_events`](Self::process_events) completes it. Raw input is handed to
/// [`process_input`](Self::process_input), which strips IAC sequences and queues any
/// negotiation replies; everything queued goes out with the next [`send`](Self::send) or
/// [`flush`](Self::flush).
pub struct TelnetSession {
    socket: Option<Socket>,
    state: SessionState,
    codec: TelnetCodec,
    outbound: BytesMut,
    peer: Option<SocketAddr>,
    binary: bool,
    last_error: Option<io::ErrorKind>,
    bytes_received: u64,
    bytes_sent: u64,
}

impl TelnetSession {
    /// Creates a disconnected session. With `binary` the session asks for binary mode in
    /// both directions once connected.
    pub fn new(binary: bool) -> TelnetSession {
        TelnetSession {
            socket: None,
            state: SessionState::Disconnected,
            codec: TelnetCodec::new(session_options()),
            outbound: BytesMut::with_capacity(4096),
            peer: None,
            binary,
            last_error: None,
            bytes_received: 0,
            bytes_sent: 0,
        }
    }

    /// Makes malformed IAC sequences fail [`TelnetSession::process_input`] instead of
    /// being skipped.
    #[must_use]
    pub fn with_strict(mut self, strict: bool) -> TelnetSession {
        self.codec = TelnetCodec::new(session_options()).with_strict(strict);
        self
    }

    /// Starts connecting to `host:port`, dropping any previous connection.
    ///
    /// Name resolution happens here and blocks. Errors leave the session in
    /// [`SessionState::Error`].
    pub fn connect(&mut self, host: &str, port: u16) -> io::Result<SessionState> {
        self.disconnect();
        match self.start_connect(host, port) {
            Ok(state) => Ok(state),
            Err(err) => {
                self.fail(&err);
                Err(err)
            }
        }
    }

    fn start_connect(&mut self, host: &str, port: u16) -> io::Result<SessionState> {
        let addr = (host, port).to_socket_addrs()?.next().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("no address for {host}"))
        })?;
        let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
        socket.set_nonblocking(true)?;
        socket.set_nodelay(true)?;

        debug!(%addr, "connecting to telnet server");
        let pending = match socket.connect(&SockAddr::from(addr)) {
            Ok(()) => false,
            Err(err) if err.raw_os_error() == Some(libc::EINPROGRESS) => true,
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => true,
            Err(err) => return Err(err),
        };

        self.socket = Some(socket);
        self.peer = Some(addr);
        if pending {
            self.state = SessionState::Connecting;
        } else {
            self.established();
        }
        Ok(self.state)
    }

    /// Advances a pending connect, waiting up to `timeout` for it to finish.
    ///
    /// Returns the state afterwards. Connected and idle sessions return immediately.
    pub fn process_events(&mut self, timeout: Duration) -> SessionState {
        if self.state != SessionState::Connecting {
            return self.state;
        }
        let Some(socket) = &self.socket else {
            self.state = SessionState::Disconnected;
            return self.state;
        };

        let outcome = poll_fd(socket.as_raw_fd(), libc::POLLOUT, timeout).and_then(|ready| {
            if !ready {
                return Ok(false);
            }
            match socket.take_error()? {
                Some(err) => Err(err),
                None => socket.peer_addr().map(|_| true),
            }
        });

        match outcome {
            Ok(true) => self.established(),
            Ok(false) => {}
            Err(err) => self.fail(&err),
        }
        self.state
    }

    fn established(&mut self) {
        self.state = SessionState::Connected;
        self.last_error = None;
        info!(peer = ?self.peer, "telnet session established");

        self.codec.enable_remote(TelnetOption::SuppressGoAhead);
        self.codec.enable_local(TelnetOption::SuppressGoAhead);
        self.codec.enable_remote(TelnetOption::Echo);
        if self.binary {
            self.codec.enable_local(TelnetOption::TransmitBinary);
            self.codec.enable_remote(TelnetOption::TransmitBinary);
        }
        let negotiation = self.codec.take_responses();
        self.outbound.extend_from_slice(&negotiation);
    }

    fn fail(&mut self, err: &io::Error) {
        warn!(peer = ?self.peer, error = %err, "telnet connect failed");
        self.socket = None;
        self.state = SessionState::Error;
        self.last_error = Some(err.kind());
    }

    /// Reads raw bytes from the socket.
    pub fn recv(&mut self, buf: &mut [u8]) -> io::Result<RecvStatus> {
        let socket = self.connected_socket()?;
        match socket.read(buf) {
            Ok(0) => Ok(RecvStatus::Closed),
            Ok(n) => {
                self.bytes_received += n as u64;
                trace!(bytes = n, "telnet recv");
                Ok(RecvStatus::Data(n))
            }
            Err(err)
                if matches!(err.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted) =>
            {
                Ok(RecvStatus::WouldBlock)
            }
            Err(err) => Err(err),
        }
    }

    /// Strips telnet protocol from `raw`.
    ///
    /// Returns the application data and the number of IAC commands consumed. Negotiation
    /// replies are queued for the next send.
    pub fn process_input(&mut self, raw: &[u8]) -> CodecResult<(BytesMut, u64)> {
        let before = self.codec.commands_received();
        let mut src = BytesMut::from(raw);
        let mut data = BytesMut::with_capacity(raw.len());
        while let Some(event) = self.codec.decode(&mut src)? {
            match event {
                TelnetEvent::Data(bytes) => data.extend_from_slice(&bytes),
                TelnetEvent::OptionStatus(option, side, enabled) => {
                    debug!(%option, %side, enabled, "telnet option negotiated");
                }
                other => trace!(event = ?other, "telnet event ignored"),
            }
        }
        if self.codec.has_responses() {
            let responses = self.codec.take_responses();
            self.outbound.extend_from_slice(&responses);
        }
        Ok((data, self.codec.commands_received() - before))
    }

    /// Queues `data` with IAC escaping and flushes as much as the socket accepts.
    ///
    /// Returns the number of application bytes accepted, which is always all of them;
    /// whatever the socket did not take stays queued.
    pub fn send(&mut self, data: &[u8]) -> io::Result<usize> {
        self.connected_socket()?;
        self.codec
            .encode(data, &mut self.outbound)
            .map_err(|err| io::Error::other(err.to_string()))?;
        self.flush()?;
        Ok(data.len())
    }

    /// Writes queued output until the socket would block. Returns the wire bytes written.
    pub fn flush(&mut self) -> io::Result<usize> {
        let socket = match (&mut self.socket, self.state) {
            (Some(socket), SessionState::Connected) => socket,
            _ => return Err(io::ErrorKind::NotConnected.into()),
        };
        let mut written = 0;
        while !self.outbound.is_empty() {
            match socket.write(&self.outbound) {
                Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
                Ok(n) => {
                    self.outbound.advance(n);
                    written += n;
                }
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => break,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => return Err(err),
            }
        }
        self.bytes_sent += written as u64;
        Ok(written)
    }

    /// Bytes queued but not yet written.
    pub fn pending_output(&self) -> usize {
        self.outbound.len()
    }

    /// Closes the socket. Safe to call in any state.
    pub fn disconnect(&mut self) {
        if let Some(socket) = self.socket.take() {
            let _ = socket.shutdown(Shutdown::Both);
            info!(peer = ?self.peer, "telnet session closed");
        }
        self.state = SessionState::Disconnected;
        self.codec.reset();
        self.outbound.clear();
    }

    fn connected_socket(&mut self) -> io::Result<&mut Socket> {
        match (&mut self.socket, self.state) {
            (Some(socket), SessionState::Connected) => Ok(socket),
            _ => Err(io::ErrorKind::NotConnected.into()),
        }
    }

    /// Current connection state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Check if the session is connected
    pub fn is_connected(&self) -> bool {
        self.state == SessionState::Connected
    }

    /// Address being connected to or connected to
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// Why the last connect failed
    pub fn last_error(&self) -> Option<io::ErrorKind> {
        self.last_error
    }

    /// Both sides agreed on binary transmission
    pub fn is_binary(&self) -> bool {
        self.codec.is_enabled_local(TelnetOption::TransmitBinary)
            && self.codec.is_enabled_remote(TelnetOption::TransmitBinary)
    }

    /// The server echoes what we send
    pub fn remote_echo(&self) -> bool {
        self.codec.is_enabled_remote(TelnetOption::Echo)
    }

    /// Go-ahead is suppressed by the server
    pub fn suppress_go_ahead(&self) -> bool {
        self.codec.is_enabled_remote(TelnetOption::SuppressGoAhead)
    }

    /// Raw bytes read from the socket
    pub fn bytes_received(&self) -> u64 {
        self.bytes_received
    }

    /// Raw bytes written to the socket
    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }

    /// IAC commands consumed since connecting
    pub fn commands_received(&self) -> u64 {
        self.codec.commands_received()
    }
}

impl fmt::Debug for TelnetSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelnetSession")
            .field("state", &self.state)
            .field("peer", &self.peer)
            .field("pending_output", &self.outbound.len())
            .finish()
    }
}

impl Drop for TelnetSession {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// Options the bridge negotiates: binary and SGA both ways, echo from the server.
fn session_options() -> TelnetOptions {
    TelnetOptions::new()
        .with_local(TelnetOption::TransmitBinary)
        .with_local(TelnetOption::SuppressGoAhead)
        .with_remote(TelnetOption::TransmitBinary)
        .with_remote(TelnetOption::SuppressGoAhead)
        .with_remote(TelnetOption::Echo)
}
