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

//! Decoder behaviour over whole sessions with arbitrary read boundaries.

use bytes::BytesMut;
use modembridge_telnetcodec::{
    TelnetCodec, TelnetEvent, TelnetOption, TelnetOptions, TelnetSide, consts,
};
use proptest::prelude::*;
use tokio_util::codec::{Decoder, Encoder};
use tracing_test::traced_test;

// ============================================================================
// Helper Functions
// ============================================================================

fn bridge_options() -> TelnetOptions {
    TelnetOptions::new()
        .with_local(TelnetOption::TransmitBinary)
        .with_local(TelnetOption::SuppressGoAhead)
        .with_remote(TelnetOption::TransmitBinary)
        .with_remote(TelnetOption::SuppressGoAhead)
        .with_remote(TelnetOption::Echo)
}

/// Feeds `input` in chunks of `chunk` bytes and returns all decoded events.
fn decode_chunked(codec: &mut TelnetCodec, input: &[u8], chunk: usize) -> Vec<TelnetEvent> {
    let mut events = Vec::new();
    for piece in input.chunks(chunk.max(1)) {
        let mut buffer = BytesMut::from(piece);
        while let Some(event) = codec.decode(&mut buffer).unwrap() {
            events.push(event);
        }
    }
    events
}

fn data_bytes(events: &[TelnetEvent]) -> Vec<u8> {
    let mut data = Vec::new();
    for event in events {
        if let TelnetEvent::Data(bytes) = event {
            data.extend_from_slice(bytes);
        }
    }
    data
}

fn encode_data(data: &[u8]) -> BytesMut {
    let mut codec = TelnetCodec::default();
    let mut dst = BytesMut::new();
    codec.encode(data, &mut dst).unwrap();
    dst
}

// ============================================================================
// Session Scenarios
// ============================================================================

#[test]
fn server_greeting_with_negotiation() {
    let mut input = Vec::new();
    input.extend([consts::IAC, consts::WILL, consts::option::ECHO]);
    input.extend([consts::IAC, consts::WILL, consts::option::SGA]);
    input.extend([consts::IAC, consts::DO, consts::option::TTYPE]);
    input.extend([consts::IAC, consts::DO, consts::option::NAWS]);
    input.extend(b"Welcome to the BBS\r\n");

    let mut codec = TelnetCodec::new(bridge_options());
    let events = decode_chunked(&mut codec, &input, input.len());

    assert_eq!(data_bytes(&events), b"Welcome to the BBS\r\n");
    let echo_on = TelnetEvent::OptionStatus(TelnetOption::Echo, TelnetSide::Remote, true);
    assert!(events.contains(&echo_on));
    assert!(codec.is_enabled_remote(TelnetOption::SuppressGoAhead));
    assert!(!codec.is_enabled_local(TelnetOption::TTYPE));
    assert_eq!(
        &codec.take_responses()[..],
        &[
            consts::IAC, consts::DO, consts::option::ECHO,
            consts::IAC, consts::DO, consts::option::SGA,
            consts::IAC, consts::WONT, consts::option::TTYPE,
            consts::IAC, consts::WONT, consts::option::NAWS,
        ]
    );
    assert_eq!(codec.commands_received(), 4);
}

#[test]
fn repeated_will_is_not_answered_twice() {
    let mut codec = TelnetCodec::new(bridge_options());
    let will_echo = [consts::IAC, consts::WILL, consts::option::ECHO];
    decode_chunked(&mut codec, &will_echo, 3);
    assert!(codec.has_responses());
    codec.take_responses();
    let events = decode_chunked(&mut codec, &will_echo, 3);
    assert!(events.is_empty());
    assert!(!codec.has_responses());
}

#[test]
fn peer_disabling_option_is_acknowledged() {
    let mut codec = TelnetCodec::new(bridge_options());
    decode_chunked(&mut codec, &[consts::IAC, consts::WILL, consts::option::ECHO], 3);
    codec.take_responses();
    let events = decode_chunked(&mut codec, &[consts::IAC, consts::WONT, consts::option::ECHO], 3);
    assert_eq!(
        events,
        vec![TelnetEvent::OptionStatus(TelnetOption::Echo, TelnetSide::Remote, false)]
    );
    assert_eq!(
        &codec.take_responses()[..],
        &[consts::IAC, consts::DONT, consts::option::ECHO]
    );
}

#[traced_test]
#[test]
fn unknown_command_is_logged() {
    let mut codec = TelnetCodec::new(bridge_options());
    let events = decode_chunked(&mut codec, &[b'a', consts::IAC, 0x42, b'b'], 4);
    assert_eq!(data_bytes(&events), b"ab");
    assert!(logs_contain("Received Unknown Command"));
}

#[traced_test]
#[test]
fn truncated_subnegotiation_is_logged() {
    let mut input = vec![consts::IAC, consts::SB, consts::option::TTYPE];
    input.resize(input.len() + consts::MAX_SUBNEGOTIATION_LENGTH * 2, b'x');
    input.extend([consts::IAC, consts::SE]);
    let mut codec = TelnetCodec::new(bridge_options());
    decode_chunked(&mut codec, &input, 97);
    assert!(logs_contain("subnegotiation payload truncated"));
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn escaped_data_survives_any_chunking(
        data in proptest::collection::vec(any::<u8>(), 0..512),
        chunk in 1usize..64,
    ) {
        // Binary mode on the remote side so CR NUL is not collapsed.
        let mut codec = TelnetCodec::new(bridge_options());
        decode_chunked(&mut codec, &[consts::IAC, consts::WILL, consts::option::BINARY], 3);

        let wire = encode_data(&data);
        let events = decode_chunked(&mut codec, &wire, chunk);
        prop_assert_eq!(data_bytes(&events), data);
        prop_assert_eq!(codec.commands_received(), 1);
    }

    #[test]
    fn decoded_data_is_bounded_by_unescaped_input(
        input in proptest::collection::vec(any::<u8>(), 0..512),
        chunk in 1usize..64,
    ) {
        let mut codec = TelnetCodec::new(bridge_options());
        let events = decode_chunked(&mut codec, &input, chunk);
        let data = data_bytes(&events);
        let input_iac = input.iter().filter(|&&byte| byte == consts::IAC).count();
        prop_assert!(data.len() + input_iac <= input.len() + input_iac / 2);
    }
}
