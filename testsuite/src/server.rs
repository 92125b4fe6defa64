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

use crate::{WAIT, wait_until};
use bytes::BytesMut;
use modembridge_telnetcodec::{TelnetCodec, TelnetOption, TelnetOptions};
use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::time::{Duration, Instant};
use tokio_util::codec::{Decoder, Encoder};
use tracing::debug;

/// A loopback telnet server accepting one call at a time.
pub struct StubServer {
    listener: TcpListener,
}

impl StubServer {
    /// Binds to an ephemeral port on 127.0.0.1.
    pub fn bind() -> io::Result<StubServer> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        listener.set_nonblocking(true)?;
        Ok(StubServer { listener })
    }

    /// Bound address
    pub fn addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Bound port
    pub fn port(&self) -> u16 {
        self.addr().map_or(0, |addr| addr.port())
    }

    /// Dial string reaching this server, e.g. `ATDT127.0.0.1:2323`.
    pub fn dial_command(&self) -> String {
        format!("ATDT127.0.0.1:{}", self.port())
    }

    /// Waits for the bridge to connect.
    pub fn accept(&self) -> io::Result<StubConnection> {
        let deadline = Instant::now() + WAIT;
        loop {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    debug!(%peer, "stub server accepted");
                    return StubConnection::new(stream);
                }
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                    if Instant::now() >= deadline {
                        return Err(io::ErrorKind::TimedOut.into());
                    }
                    std::thread::sleep(Duration::from_millis(5));
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Server side of one call.
///
/// Incoming bytes are decoded with a [`TelnetCodec`] that agrees to echo and suppress
/// go-ahead like a typical bulletin board; application data collects in
/// [`received`](Self::received).
pub struct StubConnection {
    stream: TcpStream,
    codec: TelnetCodec,
    raw: BytesMut,
    received: Vec<u8>,
    closed: bool,
}

impl StubConnection {
    fn new(stream: TcpStream) -> io::Result<StubConnection> {
        stream.set_nonblocking(false)?;
        stream.set_read_timeout(Some(Duration::from_millis(20)))?;
        let options = TelnetOptions::new()
            .with_local(TelnetOption::Echo)
            .with_local(TelnetOption::SuppressGoAhead)
            .with_remote(TelnetOption::SuppressGoAhead)
            .with_local(TelnetOption::TransmitBinary)
            .with_remote(TelnetOption::TransmitBinary);
        Ok(StubConnection {
            stream,
            codec: TelnetCodec::new(options),
            raw: BytesMut::new(),
            received: Vec::new(),
            closed: false,
        })
    }

    /// Sends application data, escaping IAC.
    pub fn send(&mut self, data: &[u8]) -> io::Result<()> {
        let mut out = BytesMut::new();
        self.codec
            .encode(data, &mut out)
            .map_err(|err| io::Error::other(err.to_string()))?;
        self.stream.write_all(&out)
    }

    /// Sends bytes exactly as given, protocol included.
    pub fn send_raw(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.stream.write_all(bytes)
    }

    /// Reads whatever is available and answers any negotiation. Returns false once the
    /// bridge has closed the connection.
    pub fn poll(&mut self) -> io::Result<bool> {
        if self.closed {
            return Ok(false);
        }
        let mut buf = [0u8; 1024];
        match self.stream.read(&mut buf) {
            Ok(0) => {
                self.closed = true;
                return Ok(false);
            }
            Ok(n) => self.raw.extend_from_slice(&buf[..n]),
            Err(err)
                if matches!(err.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {}
            Err(err) if err.kind() == io::ErrorKind::ConnectionReset => {
                self.closed = true;
                return Ok(false);
            }
            Err(err) => return Err(err),
        }
        while let Some(event) = self
            .codec
            .decode(&mut self.raw)
            .map_err(|err| io::Error::other(err.to_string()))?
        {
            if let Some(data) = event.into_data() {
                self.received.extend_from_slice(&data);
            }
        }
        if self.codec.has_responses() {
            let responses = self.codec.take_responses();
            self.stream.write_all(&responses)?;
        }
        Ok(true)
    }

    /// Polls until the received data contains `needle`.
    pub fn wait_for(&mut self, needle: &[u8]) -> bool {
        wait_until(WAIT, || {
            let _ = self.poll();
            self.received.windows(needle.len()).any(|window| window == needle)
        })
    }

    /// Polls until the bridge closes the connection.
    pub fn wait_closed(&mut self) -> bool {
        wait_until(WAIT, || !matches!(self.poll(), Ok(true)))
    }

    /// Application data received so far
    pub fn received(&self) -> &[u8] {
        &self.received
    }

    /// Whether the option is enabled on the bridge's side of the link.
    pub fn peer_enabled(&self, option: TelnetOption) -> bool {
        self.codec.is_enabled_remote(option)
    }

    /// Closes the connection from the server side.
    pub fn hang_up(self) {
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stub_decodes_and_answers() {
        let server = StubServer::bind().unwrap();
        let mut client = TcpStream::connect(server.addr().unwrap()).unwrap();
        let mut conn = server.accept().unwrap();

        // DO ECHO, then data with an escaped IAC.
        client.write_all(&[255, 253, 1, b'h', b'i', 255, 255]).unwrap();
        assert!(conn.wait_for(b"hi\xff"));

        client.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
        let mut reply = [0u8; 3];
        client.read_exact(&mut reply).unwrap();
        assert_eq!(reply, [255, 251, 1]);
    }

    #[test]
    fn test_dial_command_names_port() {
        let server = StubServer::bind().unwrap();
        assert_eq!(server.dial_command(), format!("ATDT127.0.0.1:{}", server.port()));
    }
}
