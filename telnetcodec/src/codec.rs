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

use crate::options::{TelnetOptions, TelnetSide};
use crate::{CodecError, TelnetEvent, TelnetFrame, TelnetOption, consts};
use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, trace, warn};

/// A codec for the Telnet protocol.
///
/// Decoding strips every IAC sequence from the incoming stream and yields application data in
/// runs, plus [`TelnetEvent`]s for commands, subnegotiations and completed option changes.
/// Negotiation commands are answered through the [`TelnetOptions`] state machine; the replies
/// are queued inside the codec and must be collected with [`TelnetCodec::take_responses`] and
/// written to the peer.
///
/// While the peer is not in binary mode, `CR NUL` is decoded as a bare `CR`.
pub struct TelnetCodec {
    decoder_buffer: BytesMut,
    decoder_state: DecoderState,
    options: TelnetOptions,
    responses: BytesMut,
    commands_received: u64,
    subnegotiation_truncated: bool,
    strict: bool,
}

impl TelnetCodec {
    /// Creates a codec that negotiates according to `options`.
    pub fn new(options: TelnetOptions) -> TelnetCodec {
        TelnetCodec {
            decoder_buffer: BytesMut::new(),
            decoder_state: DecoderState::NormalData,
            options,
            responses: BytesMut::new(),
            commands_received: 0,
            subnegotiation_truncated: false,
            strict: false,
        }
    }

    /// Reports malformed IAC sequences as [`CodecError::ProtocolViolation`] instead of
    /// recovering from them.
    #[must_use]
    pub fn with_strict(mut self, strict: bool) -> TelnetCodec {
        self.strict = strict;
        self
    }

    /// Option policy and negotiation state.
    pub fn options(&self) -> &TelnetOptions {
        &self.options
    }

    /// Checks if a specific Telnet option is enabled locally.
    pub fn is_enabled_local(&self, option: TelnetOption) -> bool {
        self.options.local_enabled(option)
    }

    /// Checks if a specific Telnet option is enabled on the remote side.
    pub fn is_enabled_remote(&self, option: TelnetOption) -> bool {
        self.options.remote_enabled(option)
    }

    /// Request to enable a Telnet option locally, queueing `WILL` when needed.
    /// Returns whether anything was queued.
    pub fn enable_local(&mut self, option: TelnetOption) -> bool {
        let frame = self.options.enable_local(option);
        self.queue(frame)
    }

    /// Request to disable a Telnet option locally, queueing `WONT` when needed.
    pub fn disable_local(&mut self, option: TelnetOption) -> bool {
        let frame = self.options.disable_local(option);
        self.queue(frame)
    }

    /// Request to enable a Telnet option on the remote side, queueing `DO` when needed.
    pub fn enable_remote(&mut self, option: TelnetOption) -> bool {
        let frame = self.options.enable_remote(option);
        self.queue(frame)
    }

    /// Request to disable a Telnet option on the remote side, queueing `DONT` when needed.
    pub fn disable_remote(&mut self, option: TelnetOption) -> bool {
        let frame = self.options.disable_remote(option);
        self.queue(frame)
    }

    /// Whether negotiation replies are waiting to be sent.
    pub fn has_responses(&self) -> bool {
        !self.responses.is_empty()
    }

    /// Removes and returns the queued negotiation replies, already encoded.
    pub fn take_responses(&mut self) -> BytesMut {
        self.responses.split()
    }

    /// Number of complete IAC command sequences decoded so far. Escaped `IAC IAC` data
    /// bytes are not counted.
    pub fn commands_received(&self) -> u64 {
        self.commands_received
    }

    /// Returns the codec to its initial state, keeping the option policy.
    pub fn reset(&mut self) {
        self.decoder_state = DecoderState::NormalData;
        self.decoder_buffer.clear();
        self.responses.clear();
        self.options.reset();
        self.commands_received = 0;
        self.subnegotiation_truncated = false;
    }

    fn queue(&mut self, frame: Option<TelnetFrame>) -> bool {
        match frame {
            Some(frame) => {
                trace!(?frame, "queueing negotiation reply");
                write_frame(&frame, &mut self.responses);
                true
            }
            None => false,
        }
    }

    fn negotiate(
        &mut self,
        side: TelnetSide,
        option: TelnetOption,
        positive: bool,
    ) -> Result<Option<TelnetEvent>, CodecError> {
        self.commands_received += 1;
        let frame = match (side, positive) {
            (TelnetSide::Local, true) => TelnetFrame::Do(option),
            (TelnetSide::Local, false) => TelnetFrame::Dont(option),
            (TelnetSide::Remote, true) => TelnetFrame::Will(option),
            (TelnetSide::Remote, false) => TelnetFrame::Wont(option),
        };
        let enabled = |options: &TelnetOptions| match side {
            TelnetSide::Local => options.local_enabled(option),
            TelnetSide::Remote => options.remote_enabled(option),
        };

        let was_enabled = enabled(&self.options);
        trace!(?frame, "received negotiation");
        let reply = self.options.handle_received(frame)?;
        self.queue(reply);
        let is_enabled = enabled(&self.options);

        if is_enabled != was_enabled {
            debug!(%option, %side, enabled = is_enabled, "telnet option changed");
            return Ok(Some(TelnetEvent::OptionStatus(option, side, is_enabled)));
        }
        Ok(None)
    }

    fn push_subnegotiation(&mut self, byte: u8) {
        if self.decoder_buffer.len() < consts::MAX_SUBNEGOTIATION_LENGTH {
            self.decoder_buffer.put_u8(byte);
        } else {
            self.subnegotiation_truncated = true;
        }
    }
}

impl Default for TelnetCodec {
    fn default() -> Self {
        TelnetCodec::new(TelnetOptions::default())
    }
}

impl std::fmt::Debug for TelnetCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelnetCodec")
            .field("decoder_state", &self.decoder_state)
            .field("pending_responses", &self.responses.len())
            .field("commands_received", &self.commands_received)
            .finish()
    }
}

/// Decoder position within the IAC grammar.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum DecoderState {
    NormalData,
    /// A CR arrived while the peer is not in binary mode; a following NUL is padding.
    CarriageReturn,
    InterpretAsCommand,
    NegotiateDo,
    NegotiateDont,
    NegotiateWill,
    NegotiateWont,
    Subnegotiate,
    SubnegotiateArgument(u8),
    SubnegotiateArgumentIAC(u8),
}

/// Maps a two byte `IAC <cmd>` command to its event.
fn command_event(byte: u8) -> Option<TelnetEvent> {
    match byte {
        consts::NOP => Some(TelnetEvent::NoOperation),
        consts::DM => Some(TelnetEvent::DataMark),
        consts::BRK => Some(TelnetEvent::Break),
        consts::IP => Some(TelnetEvent::InterruptProcess),
        consts::AO => Some(TelnetEvent::AbortOutput),
        consts::AYT => Some(TelnetEvent::AreYouThere),
        consts::EC => Some(TelnetEvent::EraseCharacter),
        consts::EL => Some(TelnetEvent::EraseLine),
        consts::GA => Some(TelnetEvent::GoAhead),
        consts::EOR => Some(TelnetEvent::EndOfRecord),
        _ => None,
    }
}

impl Decoder for TelnetCodec {
    type Item = TelnetEvent;
    type Error = CodecError;

    /// Decodes the next event from `src`.
    ///
    /// Consumes `src` completely unless an event is returned first. Partial IAC sequences are
    /// remembered in the decoder state, so input may be split anywhere.
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<TelnetEvent>, Self::Error> {
        let mut run = BytesMut::new();
        while let Some(&byte) = src.first() {
            match (self.decoder_state, byte) {
                (DecoderState::NormalData, consts::IAC) => {
                    if !run.is_empty() {
                        return Ok(Some(TelnetEvent::Data(run.freeze())));
                    }
                    src.advance(1);
                    self.decoder_state = DecoderState::InterpretAsCommand;
                }
                (DecoderState::NormalData, _) => {
                    src.advance(1);
                    run.put_u8(byte);
                    if byte == b'\r' && !self.options.remote_enabled(TelnetOption::TransmitBinary) {
                        self.decoder_state = DecoderState::CarriageReturn;
                    }
                }
                (DecoderState::CarriageReturn, 0) => {
                    src.advance(1);
                    self.decoder_state = DecoderState::NormalData;
                }
                (DecoderState::CarriageReturn, _) => {
                    self.decoder_state = DecoderState::NormalData;
                }
                (DecoderState::InterpretAsCommand, consts::IAC) => {
                    src.advance(1);
                    self.decoder_state = DecoderState::NormalData;
                    run.put_u8(consts::IAC);
                }
                (DecoderState::InterpretAsCommand, consts::DO) => {
                    src.advance(1);
                    self.decoder_state = DecoderState::NegotiateDo;
                }
                (DecoderState::InterpretAsCommand, consts::DONT) => {
                    src.advance(1);
                    self.decoder_state = DecoderState::NegotiateDont;
                }
                (DecoderState::InterpretAsCommand, consts::WILL) => {
                    src.advance(1);
                    self.decoder_state = DecoderState::NegotiateWill;
                }
                (DecoderState::InterpretAsCommand, consts::WONT) => {
                    src.advance(1);
                    self.decoder_state = DecoderState::NegotiateWont;
                }
                (DecoderState::InterpretAsCommand, consts::SB) => {
                    src.advance(1);
                    self.decoder_state = DecoderState::Subnegotiate;
                }
                (DecoderState::InterpretAsCommand, _) => {
                    src.advance(1);
                    self.decoder_state = DecoderState::NormalData;
                    self.commands_received += 1;
                    match command_event(byte) {
                        Some(event) => return Ok(Some(event)),
                        None if self.strict => {
                            return Err(CodecError::ProtocolViolation {
                                byte,
                                expected: "telnet command",
                            });
                        }
                        None => warn!("Received Unknown Command {:#X}", byte),
                    }
                }
                (DecoderState::NegotiateDo, _) => {
                    src.advance(1);
                    self.decoder_state = DecoderState::NormalData;
                    if let Some(event) = self.negotiate(TelnetSide::Local, byte.into(), true)? {
                        return Ok(Some(event));
                    }
                }
                (DecoderState::NegotiateDont, _) => {
                    src.advance(1);
                    self.decoder_state = DecoderState::NormalData;
                    if let Some(event) = self.negotiate(TelnetSide::Local, byte.into(), false)? {
                        return Ok(Some(event));
                    }
                }
                (DecoderState::NegotiateWill, _) => {
                    src.advance(1);
                    self.decoder_state = DecoderState::NormalData;
                    if let Some(event) = self.negotiate(TelnetSide::Remote, byte.into(), true)? {
                        return Ok(Some(event));
                    }
                }
                (DecoderState::NegotiateWont, _) => {
                    src.advance(1);
                    self.decoder_state = DecoderState::NormalData;
                    if let Some(event) = self.negotiate(TelnetSide::Remote, byte.into(), false)? {
                        return Ok(Some(event));
                    }
                }
                (DecoderState::Subnegotiate, _) => {
                    src.advance(1);
                    self.decoder_state = DecoderState::SubnegotiateArgument(byte);
                    self.decoder_buffer.clear();
                    self.subnegotiation_truncated = false;
                }
                (DecoderState::SubnegotiateArgument(option), consts::IAC) => {
                    src.advance(1);
                    self.decoder_state = DecoderState::SubnegotiateArgumentIAC(option);
                }
                (DecoderState::SubnegotiateArgument(_), _) => {
                    src.advance(1);
                    self.push_subnegotiation(byte);
                }
                (DecoderState::SubnegotiateArgumentIAC(option), consts::IAC) => {
                    src.advance(1);
                    self.decoder_state = DecoderState::SubnegotiateArgument(option);
                    self.push_subnegotiation(consts::IAC);
                }
                (DecoderState::SubnegotiateArgumentIAC(option), consts::SE) => {
                    src.advance(1);
                    self.decoder_state = DecoderState::NormalData;
                    self.commands_received += 1;
                    let option = TelnetOption::from_u8(option);
                    if self.subnegotiation_truncated {
                        warn!(
                            %option,
                            limit = consts::MAX_SUBNEGOTIATION_LENGTH,
                            "subnegotiation payload truncated"
                        );
                    }
                    let payload = self.decoder_buffer.split().freeze();
                    return Ok(Some(TelnetEvent::Subnegotiate(option, payload)));
                }
                (DecoderState::SubnegotiateArgumentIAC(_), _) => {
                    self.decoder_buffer.clear();
                    if self.strict {
                        src.advance(1);
                        self.decoder_state = DecoderState::NormalData;
                        return Err(CodecError::ProtocolViolation {
                            byte,
                            expected: "IAC or SE",
                        });
                    }
                    warn!(
                        "Received Unknown or invalid Command during Subnegotiation {:#X}. Aborting",
                        byte
                    );
                    // Reinterpret the byte as the command following a bare IAC.
                    self.decoder_state = DecoderState::InterpretAsCommand;
                }
            }
        }

        if run.is_empty() {
            Ok(None)
        } else {
            Ok(Some(TelnetEvent::Data(run.freeze())))
        }
    }
}

/// Appends the wire form of `frame` to `dst`.
fn write_frame(frame: &TelnetFrame, dst: &mut BytesMut) {
    let command = |dst: &mut BytesMut, code: u8| {
        dst.reserve(2);
        dst.put_u8(consts::IAC);
        dst.put_u8(code);
    };
    let negotiation = |dst: &mut BytesMut, code: u8, option: &TelnetOption| {
        dst.reserve(3);
        dst.put_u8(consts::IAC);
        dst.put_u8(code);
        dst.put_u8(option.to_u8());
    };

    match frame {
        TelnetFrame::Data(byte) => {
            dst.reserve(2);
            if *byte == consts::IAC {
                dst.put_u8(consts::IAC);
            }
            dst.put_u8(*byte);
        }
        TelnetFrame::NoOperation => command(dst, consts::NOP),
        TelnetFrame::DataMark => command(dst, consts::DM),
        TelnetFrame::Break => command(dst, consts::BRK),
        TelnetFrame::InterruptProcess => command(dst, consts::IP),
        TelnetFrame::AbortOutput => command(dst, consts::AO),
        TelnetFrame::AreYouThere => command(dst, consts::AYT),
        TelnetFrame::EraseCharacter => command(dst, consts::EC),
        TelnetFrame::EraseLine => command(dst, consts::EL),
        TelnetFrame::GoAhead => command(dst, consts::GA),
        TelnetFrame::EndOfRecord => command(dst, consts::EOR),
        TelnetFrame::Do(option) => negotiation(dst, consts::DO, option),
        TelnetFrame::Dont(option) => negotiation(dst, consts::DONT, option),
        TelnetFrame::Will(option) => negotiation(dst, consts::WILL, option),
        TelnetFrame::Wont(option) => negotiation(dst, consts::WONT, option),
        TelnetFrame::Subnegotiate(option, payload) => {
            dst.reserve(5 + payload.len());
            dst.put_u8(consts::IAC);
            dst.put_u8(consts::SB);
            dst.put_u8(option.to_u8());
            write_escaped(payload, dst);
            dst.put_u8(consts::IAC);
            dst.put_u8(consts::SE);
        }
    }
}

/// Appends `data` to `dst`, doubling every IAC byte.
fn write_escaped(data: &[u8], dst: &mut BytesMut) {
    dst.reserve(data.len() + data.len() / 8);
    let mut rest = data;
    while let Some(position) = rest.iter().position(|&byte| byte == consts::IAC) {
        dst.extend_from_slice(&rest[..=position]);
        dst.put_u8(consts::IAC);
        rest = &rest[position + 1..];
    }
    dst.extend_from_slice(rest);
}

impl Encoder<TelnetFrame> for TelnetCodec {
    type Error = CodecError;

    fn encode(&mut self, item: TelnetFrame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        write_frame(&item, dst);
        Ok(())
    }
}

impl Encoder<&[u8]> for TelnetCodec {
    type Error = CodecError;

    /// Encodes application data, escaping IAC.
    fn encode(&mut self, item: &[u8], dst: &mut BytesMut) -> Result<(), Self::Error> {
        write_escaped(item, dst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    // ============================================================================
    // Helper Functions
    // ============================================================================

    fn bridge_codec() -> TelnetCodec {
        TelnetCodec::new(
            TelnetOptions::new()
                .with_local(TelnetOption::TransmitBinary)
                .with_local(TelnetOption::SuppressGoAhead)
                .with_remote(TelnetOption::TransmitBinary)
                .with_remote(TelnetOption::SuppressGoAhead)
                .with_remote(TelnetOption::Echo),
        )
    }

    fn collect_all(codec: &mut TelnetCodec, input: &[u8]) -> Vec<TelnetEvent> {
        let mut buffer = BytesMut::from(input);
        let mut events = Vec::new();
        while let Some(event) = codec.decode(&mut buffer).unwrap() {
            events.push(event);
        }
        assert!(buffer.is_empty());
        events
    }

    fn data_of(events: &[TelnetEvent]) -> Vec<u8> {
        events
            .iter()
            .filter_map(|event| match event {
                TelnetEvent::Data(bytes) => Some(bytes.to_vec()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    // ============================================================================
    // Decoding
    // ============================================================================

    #[test]
    fn plain_data_is_one_run() {
        let mut codec = bridge_codec();
        let events = collect_all(&mut codec, b"hello world");
        assert_eq!(events, vec![TelnetEvent::Data(Bytes::from_static(b"hello world"))]);
    }

    #[test]
    fn escaped_iac_is_data() {
        let mut codec = bridge_codec();
        let events = collect_all(&mut codec, &[b'a', 0xFF, 0xFF, b'b']);
        assert_eq!(data_of(&events), vec![b'a', 0xFF, b'b']);
        assert_eq!(codec.commands_received(), 0);
    }

    #[test]
    fn commands_are_stripped_from_data() {
        let mut codec = bridge_codec();
        let input = [b'x', consts::IAC, consts::NOP, b'y', consts::IAC, consts::GA];
        let events = collect_all(&mut codec, &input);
        assert_eq!(data_of(&events), b"xy");
        assert!(events.contains(&TelnetEvent::NoOperation));
        assert!(events.contains(&TelnetEvent::GoAhead));
        assert_eq!(codec.commands_received(), 2);
    }

    #[test]
    fn unsupported_do_queues_wont() {
        let mut codec = bridge_codec();
        let events = collect_all(&mut codec, &[consts::IAC, consts::DO, consts::option::NAWS]);
        assert!(events.is_empty());
        assert_eq!(
            &codec.take_responses()[..],
            &[consts::IAC, consts::WONT, consts::option::NAWS]
        );
        assert!(!codec.has_responses());
    }

    #[test]
    fn supported_will_is_accepted() {
        let mut codec = bridge_codec();
        let events = collect_all(&mut codec, &[consts::IAC, consts::WILL, consts::option::ECHO]);
        assert_eq!(
            events,
            vec![TelnetEvent::OptionStatus(TelnetOption::Echo, TelnetSide::Remote, true)]
        );
        assert_eq!(
            &codec.take_responses()[..],
            &[consts::IAC, consts::DO, consts::option::ECHO]
        );
        assert!(codec.is_enabled_remote(TelnetOption::Echo));
    }

    #[test]
    fn requested_option_completes_without_reply() {
        let mut codec = bridge_codec();
        assert!(codec.enable_local(TelnetOption::SuppressGoAhead));
        codec.take_responses();
        let events = collect_all(&mut codec, &[consts::IAC, consts::DO, consts::option::SGA]);
        assert_eq!(
            events,
            vec![TelnetEvent::OptionStatus(TelnetOption::SuppressGoAhead, TelnetSide::Local, true)]
        );
        assert!(!codec.has_responses());
    }

    #[test]
    fn sequence_split_across_reads() {
        let mut codec = bridge_codec();
        let mut events = collect_all(&mut codec, &[b'a', consts::IAC]);
        events.extend(collect_all(&mut codec, &[consts::WILL]));
        events.extend(collect_all(&mut codec, &[consts::option::ECHO, b'b']));
        assert_eq!(data_of(&events), b"ab");
        assert!(codec.is_enabled_remote(TelnetOption::Echo));
    }

    #[test]
    fn subnegotiation_is_stripped() {
        let mut codec = bridge_codec();
        let input = [
            b'<', consts::IAC, consts::SB, consts::option::TTYPE, 1, 0xFF, 0xFF, 2,
            consts::IAC, consts::SE, b'>',
        ];
        let events = collect_all(&mut codec, &input);
        assert_eq!(data_of(&events), b"<>");
        assert!(events.contains(&TelnetEvent::Subnegotiate(
            TelnetOption::TTYPE,
            Bytes::from_static(&[1, 0xFF, 2])
        )));
    }

    #[test]
    fn oversized_subnegotiation_is_truncated() {
        let mut codec = bridge_codec();
        let mut input = vec![consts::IAC, consts::SB, 99];
        input.extend(std::iter::repeat_n(7u8, consts::MAX_SUBNEGOTIATION_LENGTH + 100));
        input.extend([consts::IAC, consts::SE, b'z']);
        let events = collect_all(&mut codec, &input);
        match &events[0] {
            TelnetEvent::Subnegotiate(_, payload) => {
                assert_eq!(payload.len(), consts::MAX_SUBNEGOTIATION_LENGTH)
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(data_of(&events), b"z");
    }

    #[test]
    fn malformed_subnegotiation_recovers() {
        let mut codec = bridge_codec();
        let input = [consts::IAC, consts::SB, 24, 1, consts::IAC, consts::NOP, b'k'];
        let events = collect_all(&mut codec, &input);
        assert!(events.contains(&TelnetEvent::NoOperation));
        assert_eq!(data_of(&events), b"k");
    }

    #[test]
    fn strict_mode_reports_malformed_subnegotiation() {
        let mut codec = bridge_codec().with_strict(true);
        let mut buffer = BytesMut::from(&[consts::IAC, consts::SB, 24, 1, consts::IAC, b'q'][..]);
        let error = codec.decode(&mut buffer).unwrap_err();
        assert_eq!(
            error,
            CodecError::ProtocolViolation {
                byte: b'q',
                expected: "IAC or SE"
            }
        );
    }

    #[test]
    fn unknown_command_is_swallowed() {
        let mut codec = bridge_codec();
        let events = collect_all(&mut codec, &[b'a', consts::IAC, 0x10, b'b']);
        assert_eq!(data_of(&events), b"ab");
        assert_eq!(codec.commands_received(), 1);
    }

    #[test]
    fn cr_nul_is_collapsed_outside_binary_mode() {
        let mut codec = bridge_codec();
        let events = collect_all(&mut codec, b"one\r\0two\r\nthree\r");
        let more = collect_all(&mut codec, b"\0!");
        let mut data = data_of(&events);
        data.extend(data_of(&more));
        assert_eq!(data, b"one\rtwo\r\nthree\r!");
    }

    #[test]
    fn cr_nul_is_kept_in_binary_mode() {
        let mut codec = bridge_codec();
        collect_all(&mut codec, &[consts::IAC, consts::WILL, consts::option::BINARY]);
        let events = collect_all(&mut codec, b"a\r\0b");
        assert_eq!(data_of(&events), b"a\r\0b");
    }

    // ============================================================================
    // Encoding
    // ============================================================================

    #[test]
    fn data_encoding_doubles_iac() {
        let mut codec = bridge_codec();
        let mut dst = BytesMut::new();
        codec.encode(&[1u8, 0xFF, 2][..], &mut dst).unwrap();
        assert_eq!(&dst[..], &[1, 0xFF, 0xFF, 2]);
    }

    #[test]
    fn frame_encoding() {
        let mut codec = bridge_codec();
        let mut dst = BytesMut::new();
        codec.encode(TelnetFrame::Will(TelnetOption::SuppressGoAhead), &mut dst).unwrap();
        codec.encode(TelnetFrame::AreYouThere, &mut dst).unwrap();
        let naws = Bytes::from_static(&[0, 80, 0xFF]);
        codec.encode(TelnetFrame::Subnegotiate(TelnetOption::NAWS, naws), &mut dst).unwrap();
        assert_eq!(
            &dst[..],
            &[
                consts::IAC, consts::WILL, consts::option::SGA,
                consts::IAC, consts::AYT,
                consts::IAC, consts::SB, consts::option::NAWS, 0, 80, 0xFF, 0xFF,
                consts::IAC, consts::SE,
            ]
        );
    }

    #[test]
    fn reset_clears_negotiated_state() {
        let mut codec = bridge_codec();
        collect_all(&mut codec, &[consts::IAC, consts::WILL, consts::option::ECHO]);
        codec.reset();
        assert!(!codec.is_enabled_remote(TelnetOption::Echo));
        assert!(!codec.has_responses());
        assert_eq!(codec.commands_received(), 0);
    }
}
