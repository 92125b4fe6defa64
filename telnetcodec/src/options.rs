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

use crate::{CodecError, CodecResult, TelnetFrame, consts};
use std::fmt::Formatter;

///
/// [Telnet Terminal Options](https://www.iana.org/assignments/telnet-options/telnet-options.xhtml)
/// relevant to a modem bridge. Every other code is carried as [`TelnetOption::Unknown`].
///
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum TelnetOption {
    /// [`consts::option::BINARY`] Telnet Binary Transmission
    /// [RFC856](https://tools.ietf.org/html/rfc856)
    TransmitBinary,
    /// [`consts::option::ECHO`] Telnet Echo Option [RFC857](https://tools.ietf.org/html/rfc857)
    Echo,
    /// [`consts::option::SGA`] Suppress Go ahead [RFC858](https://tools.ietf.org/html/rfc858)
    SuppressGoAhead,
    /// [`consts::option::STATUS`] Telnet Status Option [RFC859](http://www.iana.org/go/rfc859)
    Status,
    /// [`consts::option::TM`] Telnet Timing Mark Option [RFC860](http://www.iana.org/go/rfc860)
    TimingMark,
    /// [`consts::option::TTYPE`] Terminal Type [RFC1091](http://www.iana.org/go/rfc1091)
    TTYPE,
    /// [`consts::option::EOR`] End of Record [RFC885](http://www.iana.org/go/rfc885)
    EOR,
    /// [`consts::option::NAWS`] Negotiate About Window Size
    /// [RFC1073](http://www.iana.org/go/rfc1073)
    NAWS,
    /// [`consts::option::TSPEED`] Terminal Speed [RFC1079](http://www.iana.org/go/rfc1079)
    TSPEED,
    /// [`consts::option::LFLOW`] Remote Flow Control [RFC1372](http://www.iana.org/go/rfc1372)
    LFLOW,
    /// [`consts::option::LINEMODE`] Linemode [RFC1184](http://www.iana.org/go/rfc1184)
    Linemode,
    /// [`consts::option::NEW_ENVIRON`] New Environment Option
    /// [RFC1572](http://www.iana.org/go/rfc1572)
    NewEnvironment,
    /// [`consts::option::CHARSET`] Charset [RFC2066](http://www.iana.org/go/rfc2066)
    Charset,
    /// [`consts::option::COM_PORT`] Com Port Control Option
    /// [RFC2217](http://www.iana.org/go/rfc2217)
    ComPort,
    /// Any other option code
    Unknown(u8),
}

impl TelnetOption {
    /// Wire code of this option.
    pub fn to_u8(&self) -> u8 {
        match self {
            TelnetOption::TransmitBinary => consts::option::BINARY,
            TelnetOption::Echo => consts::option::ECHO,
            TelnetOption::SuppressGoAhead => consts::option::SGA,
            TelnetOption::Status => consts::option::STATUS,
            TelnetOption::TimingMark => consts::option::TM,
            TelnetOption::TTYPE => consts::option::TTYPE,
            TelnetOption::EOR => consts::option::EOR,
            TelnetOption::NAWS => consts::option::NAWS,
            TelnetOption::TSPEED => consts::option::TSPEED,
            TelnetOption::LFLOW => consts::option::LFLOW,
            TelnetOption::Linemode => consts::option::LINEMODE,
            TelnetOption::NewEnvironment => consts::option::NEW_ENVIRON,
            TelnetOption::Charset => consts::option::CHARSET,
            TelnetOption::ComPort => consts::option::COM_PORT,
            TelnetOption::Unknown(byte) => *byte,
        }
    }

    /// Option for a wire code.
    pub fn from_u8(byte: u8) -> Self {
        match byte {
            consts::option::BINARY => TelnetOption::TransmitBinary,
            consts::option::ECHO => TelnetOption::Echo,
            consts::option::SGA => TelnetOption::SuppressGoAhead,
            consts::option::STATUS => TelnetOption::Status,
            consts::option::TM => TelnetOption::TimingMark,
            consts::option::TTYPE => TelnetOption::TTYPE,
            consts::option::EOR => TelnetOption::EOR,
            consts::option::NAWS => TelnetOption::NAWS,
            consts::option::TSPEED => TelnetOption::TSPEED,
            consts::option::LFLOW => TelnetOption::LFLOW,
            consts::option::LINEMODE => TelnetOption::Linemode,
            consts::option::NEW_ENVIRON => TelnetOption::NewEnvironment,
            consts::option::CHARSET => TelnetOption::Charset,
            consts::option::COM_PORT => TelnetOption::ComPort,
            byte => TelnetOption::Unknown(byte),
        }
    }
}

impl std::fmt::Display for TelnetOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TelnetOption::TransmitBinary => write!(f, "TransmitBinary"),
            TelnetOption::Echo => write!(f, "Echo"),
            TelnetOption::SuppressGoAhead => write!(f, "SuppressGoAhead"),
            TelnetOption::Status => write!(f, "Status"),
            TelnetOption::TimingMark => write!(f, "TimingMark"),
            TelnetOption::TTYPE => write!(f, "TTYPE"),
            TelnetOption::EOR => write!(f, "EOR"),
            TelnetOption::NAWS => write!(f, "NAWS"),
            TelnetOption::TSPEED => write!(f, "TSPEED"),
            TelnetOption::LFLOW => write!(f, "LFLOW"),
            TelnetOption::Linemode => write!(f, "Linemode"),
            TelnetOption::NewEnvironment => write!(f, "NewEnvironment"),
            TelnetOption::Charset => write!(f, "Charset"),
            TelnetOption::ComPort => write!(f, "ComPort"),
            TelnetOption::Unknown(option) => write!(f, "Unknown({option})"),
        }
    }
}

impl From<u8> for TelnetOption {
    fn from(byte: u8) -> Self {
        Self::from_u8(byte)
    }
}

impl From<TelnetOption> for u8 {
    fn from(option: TelnetOption) -> Self {
        option.to_u8()
    }
}

/// Per option support policy and RFC 1143 negotiation state.
///
/// Both tables are indexed by option code. `support` says which options we are willing to
/// perform ourselves (local) and which we allow the peer to perform (remote); everything else
/// is refused with `WONT` or `DONT`.
#[derive(Clone, Debug)]
pub struct TelnetOptions {
    support: [SupportState; 256],
    state: [OptionState; 256],
}

impl TelnetOptions {
    /// Options table that refuses everything.
    pub fn new() -> TelnetOptions {
        TelnetOptions {
            support: [SupportState::default(); 256],
            state: [OptionState::default(); 256],
        }
    }

    /// Allows us to perform `option`.
    #[must_use]
    pub fn with_local(mut self, option: TelnetOption) -> TelnetOptions {
        self.support[usize::from(option.to_u8())].local = true;
        self
    }

    /// Allows the peer to perform `option`.
    #[must_use]
    pub fn with_remote(mut self, option: TelnetOption) -> TelnetOptions {
        self.support[usize::from(option.to_u8())].remote = true;
        self
    }

    /// Checks if we support the given option locally
    pub fn is_supported_local(&self, option: TelnetOption) -> bool {
        self.support[usize::from(option.to_u8())].local
    }

    /// Checks if we support the given option remotely
    pub fn is_supported_remote(&self, option: TelnetOption) -> bool {
        self.support[usize::from(option.to_u8())].remote
    }

    /// Gets the local QState for an option
    pub fn local_qstate(&self, option: TelnetOption) -> QState {
        self.state[usize::from(option.to_u8())].local
    }

    /// Gets the remote QState for an option
    pub fn remote_qstate(&self, option: TelnetOption) -> QState {
        self.state[usize::from(option.to_u8())].remote
    }

    /// Whether we are currently performing `option`.
    ///
    /// An option stays enabled while a request to disable it is outstanding.
    pub fn local_enabled(&self, option: TelnetOption) -> bool {
        self.local_qstate(option).is_enabled()
    }

    /// Whether the peer is currently performing `option`.
    pub fn remote_enabled(&self, option: TelnetOption) -> bool {
        self.remote_qstate(option).is_enabled()
    }

    /// Forgets all negotiated state, keeping the support policy.
    pub fn reset(&mut self) {
        self.state = [OptionState::default(); 256];
    }

    /// Asks to perform `option` ourselves. Returns the `WILL` to send, if any.
    pub fn enable_local(&mut self, option: TelnetOption) -> Option<TelnetFrame> {
        if !self.is_supported_local(option) {
            return None;
        }
        let state = &mut self.state[usize::from(option.to_u8())].local;
        request_enable(state).then_some(TelnetFrame::Will(option))
    }

    /// Stops performing `option`. Returns the `WONT` to send, if any.
    pub fn disable_local(&mut self, option: TelnetOption) -> Option<TelnetFrame> {
        let state = &mut self.state[usize::from(option.to_u8())].local;
        request_disable(state).then_some(TelnetFrame::Wont(option))
    }

    /// Asks the peer to perform `option`. Returns the `DO` to send, if any.
    pub fn enable_remote(&mut self, option: TelnetOption) -> Option<TelnetFrame> {
        if !self.is_supported_remote(option) {
            return None;
        }
        let state = &mut self.state[usize::from(option.to_u8())].remote;
        request_enable(state).then_some(TelnetFrame::Do(option))
    }

    /// Asks the peer to stop performing `option`. Returns the `DONT` to send, if any.
    pub fn disable_remote(&mut self, option: TelnetOption) -> Option<TelnetFrame> {
        let state = &mut self.state[usize::from(option.to_u8())].remote;
        request_disable(state).then_some(TelnetFrame::Dont(option))
    }

    /// Runs a received negotiation command through the state machine, returning the reply
    /// to send, if any.
    pub fn handle_received(&mut self, frame: TelnetFrame) -> CodecResult<Option<TelnetFrame>> {
        match frame {
            TelnetFrame::Do(option) => {
                let supported = self.is_supported_local(option);
                let state = &mut self.state[usize::from(option.to_u8())].local;
                Ok(receive_enable(state, supported)
                    .map(|accepted| {
                        if accepted {
                            TelnetFrame::Will(option)
                        } else {
                            TelnetFrame::Wont(option)
                        }
                    }))
            }
            TelnetFrame::Will(option) => {
                let supported = self.is_supported_remote(option);
                let state = &mut self.state[usize::from(option.to_u8())].remote;
                Ok(receive_enable(state, supported)
                    .map(|accepted| {
                        if accepted {
                            TelnetFrame::Do(option)
                        } else {
                            TelnetFrame::Dont(option)
                        }
                    }))
            }
            TelnetFrame::Dont(option) => {
                let state = &mut self.state[usize::from(option.to_u8())].local;
                Ok(receive_disable(state)
                    .map(|enable| {
                        if enable {
                            TelnetFrame::Will(option)
                        } else {
                            TelnetFrame::Wont(option)
                        }
                    }))
            }
            TelnetFrame::Wont(option) => {
                let state = &mut self.state[usize::from(option.to_u8())].remote;
                Ok(receive_disable(state)
                    .map(|enable| {
                        if enable {
                            TelnetFrame::Do(option)
                        } else {
                            TelnetFrame::Dont(option)
                        }
                    }))
            }
            _ => Err(CodecError::NegotiationError {
                reason: format!("not a negotiation command: {frame:?}"),
            }),
        }
    }
}

impl Default for TelnetOptions {
    fn default() -> Self {
        TelnetOptions::new()
    }
}

// #### RFC 1143 transitions ####################################################
//
// The same rules drive both sides. For the local side "enable" is DO/WILL, for the remote
// side it is WILL/DO.

/// We want the option on. Returns whether the positive request must be sent.
fn request_enable(state: &mut QState) -> bool {
    match *state {
        QState::No => {
            *state = QState::WantYes;
            true
        }
        QState::WantNo => {
            *state = QState::WantNoOpposite;
            false
        }
        QState::WantYesOpposite => {
            *state = QState::WantYes;
            false
        }
        QState::Yes | QState::WantYes | QState::WantNoOpposite => false,
    }
}

/// We want the option off. Returns whether the negative request must be sent.
fn request_disable(state: &mut QState) -> bool {
    match *state {
        QState::Yes => {
            *state = QState::WantNo;
            true
        }
        QState::WantYes => {
            *state = QState::WantYesOpposite;
            false
        }
        QState::WantNoOpposite => {
            *state = QState::WantNo;
            false
        }
        QState::No | QState::WantNo | QState::WantYesOpposite => false,
    }
}

/// Peer sent a positive command. Returns `Some(true)` to answer positively, `Some(false)` to
/// refuse, `None` for no reply.
fn receive_enable(state: &mut QState, supported: bool) -> Option<bool> {
    match *state {
        QState::No if supported => {
            *state = QState::Yes;
            Some(true)
        }
        QState::No => Some(false),
        QState::Yes => None,
        QState::WantNo => {
            // Peer answered our negative request positively.
            *state = QState::No;
            None
        }
        QState::WantNoOpposite | QState::WantYes => {
            *state = QState::Yes;
            None
        }
        QState::WantYesOpposite => {
            *state = QState::WantNo;
            Some(false)
        }
    }
}

/// Peer sent a negative command. Returns `Some(false)` to acknowledge with a negative,
/// `Some(true)` to send a queued positive request, `None` for no reply.
fn receive_disable(state: &mut QState) -> Option<bool> {
    match *state {
        QState::No => None,
        QState::Yes => {
            *state = QState::No;
            Some(false)
        }
        QState::WantNo | QState::WantYes | QState::WantYesOpposite => {
            *state = QState::No;
            None
        }
        QState::WantNoOpposite => {
            *state = QState::WantYes;
            Some(true)
        }
    }
}

/// Which end of the connection performs an option.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum TelnetSide {
    /// The local side of the Telnet connection (what we want to do)
    Local,
    /// The remote side of the Telnet connection (what the peer wants to do)
    Remote,
}

impl std::fmt::Display for TelnetSide {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TelnetSide::Local => write!(f, "Local"),
            TelnetSide::Remote => write!(f, "Remote"),
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct OptionState {
    local: QState,
    remote: QState,
}

/// RFC 1143 Q-method negotiation state.
///
/// The `Opposite` variants record a request queued behind the one in flight.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum QState {
    /// Disabled.
    #[default]
    No,
    /// Disable requested, awaiting acknowledgement.
    WantNo,
    /// Disable requested, enable queued behind it.
    WantNoOpposite,
    /// Enabled.
    Yes,
    /// Enable requested, awaiting acknowledgement.
    WantYes,
    /// Enable requested, disable queued behind it.
    WantYesOpposite,
}

impl QState {
    /// Whether the option is in effect.
    pub fn is_enabled(self) -> bool {
        matches!(self, QState::Yes | QState::WantNo | QState::WantNoOpposite)
    }
}

impl std::fmt::Display for QState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QState::No => write!(f, "No"),
            QState::WantNo => write!(f, "WantNo"),
            QState::WantNoOpposite => write!(f, "WantNoOpposite"),
            QState::Yes => write!(f, "Yes"),
            QState::WantYes => write!(f, "WantYes"),
            QState::WantYesOpposite => write!(f, "WantYesOpposite"),
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct SupportState {
    /// Whether we support this option from us -> them.
    local: bool,
    /// Whether we support this option from them -> us.
    remote: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bridge_options() -> TelnetOptions {
        TelnetOptions::new()
            .with_local(TelnetOption::TransmitBinary)
            .with_local(TelnetOption::SuppressGoAhead)
            .with_remote(TelnetOption::TransmitBinary)
            .with_remote(TelnetOption::SuppressGoAhead)
            .with_remote(TelnetOption::Echo)
    }

    #[test]
    fn option_codes_round_trip() {
        for code in 0..=255u8 {
            assert_eq!(TelnetOption::from_u8(code).to_u8(), code);
        }
        assert_eq!(TelnetOption::from(1), TelnetOption::Echo);
        assert_eq!(TelnetOption::from(200), TelnetOption::Unknown(200));
    }

    #[test]
    fn test_option_state_default() {
        let options = bridge_options();
        assert_eq!(options.local_qstate(TelnetOption::Echo), QState::No);
        assert_eq!(options.remote_qstate(TelnetOption::Echo), QState::No);
        assert!(!options.local_enabled(TelnetOption::TransmitBinary));
    }

    #[test]
    fn test_local_enable_from_no_to_wantyes() {
        let mut options = bridge_options();
        let frame = options.enable_local(TelnetOption::SuppressGoAhead);
        assert_eq!(frame, Some(TelnetFrame::Will(TelnetOption::SuppressGoAhead)));
        assert_eq!(options.local_qstate(TelnetOption::SuppressGoAhead), QState::WantYes);
    }

    #[test]
    fn test_local_enable_recv_do_completes_to_yes() {
        let mut options = bridge_options();
        options.enable_local(TelnetOption::SuppressGoAhead);
        let reply = options
            .handle_received(TelnetFrame::Do(TelnetOption::SuppressGoAhead))
            .unwrap();
        assert_eq!(reply, None);
        assert!(options.local_enabled(TelnetOption::SuppressGoAhead));
    }

    #[test]
    fn test_local_enable_idempotent_when_wantyes() {
        let mut options = bridge_options();
        assert!(options.enable_local(TelnetOption::TransmitBinary).is_some());
        assert!(options.enable_local(TelnetOption::TransmitBinary).is_none());
    }

    #[test]
    fn test_unsupported_local_option_is_not_requested() {
        let mut options = bridge_options();
        assert_eq!(options.enable_local(TelnetOption::Echo), None);
        assert_eq!(options.enable_remote(TelnetOption::NAWS), None);
    }

    #[test]
    fn test_recv_do_unsupported_is_refused() {
        let mut options = bridge_options();
        let reply = options.handle_received(TelnetFrame::Do(TelnetOption::NAWS)).unwrap();
        assert_eq!(reply, Some(TelnetFrame::Wont(TelnetOption::NAWS)));
        assert_eq!(options.local_qstate(TelnetOption::NAWS), QState::No);
    }

    #[test]
    fn test_recv_will_unsupported_is_refused() {
        let mut options = bridge_options();
        let reply = options
            .handle_received(TelnetFrame::Will(TelnetOption::Linemode))
            .unwrap();
        assert_eq!(reply, Some(TelnetFrame::Dont(TelnetOption::Linemode)));
    }

    #[test]
    fn test_recv_will_from_no_accepts_to_yes() {
        let mut options = bridge_options();
        let reply = options.handle_received(TelnetFrame::Will(TelnetOption::Echo)).unwrap();
        assert_eq!(reply, Some(TelnetFrame::Do(TelnetOption::Echo)));
        assert!(options.remote_enabled(TelnetOption::Echo));
    }

    #[test]
    fn test_recv_will_when_yes_no_response() {
        let mut options = bridge_options();
        options.handle_received(TelnetFrame::Will(TelnetOption::Echo)).unwrap();
        let reply = options.handle_received(TelnetFrame::Will(TelnetOption::Echo)).unwrap();
        assert_eq!(reply, None);
    }

    #[test]
    fn test_recv_wont_from_yes_acknowledges() {
        let mut options = bridge_options();
        options.handle_received(TelnetFrame::Will(TelnetOption::Echo)).unwrap();
        let reply = options.handle_received(TelnetFrame::Wont(TelnetOption::Echo)).unwrap();
        assert_eq!(reply, Some(TelnetFrame::Dont(TelnetOption::Echo)));
        assert!(!options.remote_enabled(TelnetOption::Echo));
    }

    #[test]
    fn test_recv_dont_from_yes_acknowledges() {
        let mut options = bridge_options();
        options.handle_received(TelnetFrame::Do(TelnetOption::TransmitBinary)).unwrap();
        let reply = options
            .handle_received(TelnetFrame::Dont(TelnetOption::TransmitBinary))
            .unwrap();
        assert_eq!(reply, Some(TelnetFrame::Wont(TelnetOption::TransmitBinary)));
    }

    #[test]
    fn test_remote_refusal_while_wantyes() {
        let mut options = bridge_options();
        options.enable_remote(TelnetOption::Echo);
        let reply = options.handle_received(TelnetFrame::Wont(TelnetOption::Echo)).unwrap();
        assert_eq!(reply, None);
        assert_eq!(options.remote_qstate(TelnetOption::Echo), QState::No);
    }

    #[test]
    fn test_queued_disable_sent_after_enable_ack() {
        let mut options = bridge_options();
        options.enable_remote(TelnetOption::Echo);
        assert_eq!(options.disable_remote(TelnetOption::Echo), None);
        assert_eq!(options.remote_qstate(TelnetOption::Echo), QState::WantYesOpposite);
        let reply = options.handle_received(TelnetFrame::Will(TelnetOption::Echo)).unwrap();
        assert_eq!(reply, Some(TelnetFrame::Dont(TelnetOption::Echo)));
        assert_eq!(options.remote_qstate(TelnetOption::Echo), QState::WantNo);
    }

    #[test]
    fn test_queued_enable_sent_after_disable_ack() {
        let mut options = bridge_options();
        options.handle_received(TelnetFrame::Do(TelnetOption::SuppressGoAhead)).unwrap();
        assert!(options.disable_local(TelnetOption::SuppressGoAhead).is_some());
        assert_eq!(options.enable_local(TelnetOption::SuppressGoAhead), None);
        let reply = options
            .handle_received(TelnetFrame::Dont(TelnetOption::SuppressGoAhead))
            .unwrap();
        assert_eq!(reply, Some(TelnetFrame::Will(TelnetOption::SuppressGoAhead)));
        assert_eq!(options.local_qstate(TelnetOption::SuppressGoAhead), QState::WantYes);
    }

    #[test]
    fn test_full_remote_enable_disable_handshake() {
        let mut options = bridge_options();
        assert_eq!(
            options.enable_remote(TelnetOption::SuppressGoAhead),
            Some(TelnetFrame::Do(TelnetOption::SuppressGoAhead))
        );
        options
            .handle_received(TelnetFrame::Will(TelnetOption::SuppressGoAhead))
            .unwrap();
        assert!(options.remote_enabled(TelnetOption::SuppressGoAhead));
        assert_eq!(
            options.disable_remote(TelnetOption::SuppressGoAhead),
            Some(TelnetFrame::Dont(TelnetOption::SuppressGoAhead))
        );
        assert!(options.remote_enabled(TelnetOption::SuppressGoAhead));
        options
            .handle_received(TelnetFrame::Wont(TelnetOption::SuppressGoAhead))
            .unwrap();
        assert!(!options.remote_enabled(TelnetOption::SuppressGoAhead));
    }

    #[test]
    fn test_non_negotiation_frame_is_rejected() {
        let mut options = bridge_options();
        assert!(options.handle_received(TelnetFrame::NoOperation).is_err());
    }

    #[test]
    fn test_reset_keeps_policy() {
        let mut options = bridge_options();
        options.handle_received(TelnetFrame::Will(TelnetOption::Echo)).unwrap();
        options.reset();
        assert!(!options.remote_enabled(TelnetOption::Echo));
        assert!(options.is_supported_remote(TelnetOption::Echo));
    }
}
