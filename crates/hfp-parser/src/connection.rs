//! Per-connection parser state and decoded results

use heapless::Vec;

use crate::command::{self, CommandForm, CommandId, ResolvedCommand};
use crate::decode;
use crate::error::ParseError;
use crate::registry::{
    AgIndicatorDescriptor, GenericStatusIndicator, IndicatorRegistry, MAX_AG_INDICATORS,
    MAX_GENERIC_STATUS_INDICATORS,
};
use crate::scanner::{Effect, ParserState};

/// Size of the line buffer holding a command name or one argument token
pub const LINE_BUFFER_SIZE: usize = 64;
/// Capacity of the remote codec list
pub const MAX_CODECS: usize = 20;

/// State of one HFP connection as seen by the parser
///
/// Created when the service level connection comes up and fed every
/// received byte in order through [`feed`](Self::feed). Higher layers read
/// the decoded fields after each completed command.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ConnectionRecord {
    pub(crate) parser_state: ParserState,
    pub(crate) parser_item_index: usize,
    #[cfg_attr(feature = "serde", serde(skip))]
    pub(crate) line_buffer: Vec<u8, LINE_BUFFER_SIZE>,
    #[cfg_attr(feature = "serde", serde(skip))]
    pub(crate) line_overflow: bool,
    #[cfg_attr(feature = "serde", serde(skip))]
    pub(crate) pending: ResolvedCommand,
    #[cfg_attr(feature = "serde", serde(skip))]
    pub(crate) pending_value: Option<u32>,

    pub(crate) command: CommandId,
    #[cfg_attr(feature = "serde", serde(skip))]
    pub(crate) line_command: CommandId,
    pub(crate) sent_command: CommandId,
    pub(crate) remote_supported_features: u32,
    pub(crate) remote_codecs: Vec<u16, MAX_CODECS>,
    pub(crate) confirmed_codec: Option<u16>,
    pub(crate) suggested_codec: Option<u16>,
    pub(crate) generic_status_indicators: Vec<GenericStatusIndicator, MAX_GENERIC_STATUS_INDICATORS>,
    #[cfg_attr(feature = "serde", serde(skip))]
    pub(crate) generic_defaults: Vec<GenericStatusIndicator, MAX_GENERIC_STATUS_INDICATORS>,
    pub(crate) ag_indicators: Vec<AgIndicatorDescriptor, MAX_AG_INDICATORS>,
    pub(crate) enable_status_update_for_ag_indicators: bool,
}

impl ConnectionRecord {
    /// Create a record seeded from the process-wide registry
    pub fn new() -> Self {
        Self::with_registry(IndicatorRegistry::global())
    }

    /// Create a record seeded from `registry`
    pub fn with_registry(registry: &IndicatorRegistry) -> Self {
        let mut record = Self {
            parser_state: ParserState::AwaitHeader,
            parser_item_index: 0,
            line_buffer: Vec::new(),
            line_overflow: false,
            pending: ResolvedCommand::unknown(CommandForm::Action),
            pending_value: None,
            command: CommandId::None,
            line_command: CommandId::None,
            sent_command: CommandId::None,
            remote_supported_features: 0,
            remote_codecs: Vec::new(),
            confirmed_codec: None,
            suggested_codec: None,
            generic_status_indicators: Vec::new(),
            generic_defaults: Vec::new(),
            ag_indicators: Vec::new(),
            enable_status_update_for_ag_indicators: false,
        };
        record.clone_ag_indicators(registry);
        record
    }

    /// Copy the registry's indicator tables into this connection
    ///
    /// Replaces the local AG indicator copy, including any `status` and
    /// `enabled` changes made by earlier commands.
    pub fn clone_ag_indicators(&mut self, registry: &IndicatorRegistry) {
        self.ag_indicators.clear();
        for desc in registry.ag_indicator_descriptors() {
            let mut desc = desc.clone();
            desc.enabled |= desc.mandatory;
            if self.ag_indicators.push(desc).is_err() {
                tracing::warn!("AG indicator table truncated to {}", MAX_AG_INDICATORS);
                break;
            }
        }

        self.generic_defaults = registry
            .generic_status_indicator_descriptors()
            .iter()
            .take(MAX_GENERIC_STATUS_INDICATORS)
            .copied()
            .collect();
    }

    /// Feed one received byte
    ///
    /// Never blocks and never fails. Malformed input is logged and skipped
    /// so the scanner stays aligned with the stream.
    pub fn feed(&mut self, byte: u8) {
        let (next, effect) = self.parser_state.next(byte);
        tracing::trace!("0x{:02X}: {:?} -> {:?} ({:?})", byte, self.parser_state, next, effect);
        self.parser_state = next;

        match effect {
            Effect::Ignore => {}
            Effect::BeginCommand(b) => {
                self.clear_line();
                self.parser_item_index = 0;
                self.store(b);
            }
            Effect::Store(b) => self.store(b),
            Effect::Resolve(form) => self.resolve(form),
            Effect::ResolveAndStore(form, b) => {
                self.resolve(form);
                self.store(b);
            }
            Effect::ResolveAndToken(form) => {
                self.resolve(form);
                self.dispatch_token();
            }
            Effect::ResolveBare => {
                self.resolve(CommandForm::Action);
                self.complete();
            }
            Effect::ResolveAndComplete(form) => {
                self.resolve(form);
                self.complete();
            }
            Effect::Token => self.dispatch_token(),
            Effect::FinalToken => {
                if !self.line_buffer.is_empty() || self.line_overflow {
                    self.dispatch_token();
                }
                self.complete();
            }
        }
    }

    /// Feed a slice of bytes, one at a time
    pub fn feed_bytes(&mut self, data: &[u8]) {
        for &b in data {
            self.feed(b);
        }
    }

    /// Drop any partially scanned command and wait for the next header
    ///
    /// Decoded fields are kept.
    pub fn reset_parser(&mut self) {
        self.parser_state = ParserState::AwaitHeader;
        self.parser_item_index = 0;
        self.pending = ResolvedCommand::unknown(CommandForm::Action);
        self.pending_value = None;
        self.clear_line();
    }

    fn clear_line(&mut self) {
        self.line_buffer.clear();
        self.line_overflow = false;
    }

    fn store(&mut self, byte: u8) {
        if self.line_buffer.push(byte).is_err() {
            self.line_overflow = true;
        }
    }

    fn resolve(&mut self, form: CommandForm) {
        self.pending = if self.line_overflow {
            ResolvedCommand::unknown(form)
        } else {
            command::resolve(&self.line_buffer, form, self.sent_command)
        };

        if self.pending.id == CommandId::Unknown {
            tracing::debug!(
                "unknown command {:?} ({:?}), skipping arguments",
                String::from_utf8_lossy(&self.line_buffer),
                form
            );
        } else {
            tracing::debug!("resolved {:?} ({:?})", self.pending.id, self.pending.form);
        }

        self.clear_line();
        self.parser_item_index = 0;
        decode::begin_arguments(self);
    }

    fn dispatch_token(&mut self) {
        let token = core::mem::take(&mut self.line_buffer);
        let overflow = core::mem::replace(&mut self.line_overflow, false);
        let capacity = decode::capacity(self);

        if capacity == 0 {
            return;
        }
        if token.is_empty() && !overflow && decode::skips_empty(self) {
            return;
        }
        if self.parser_item_index >= capacity {
            let decoded = decode::parse_integer(&token);
            tracing::warn!(
                "{:?}: dropping item {} ({:?}), capacity {}",
                self.pending.id,
                self.parser_item_index,
                decoded,
                capacity
            );
            return;
        }

        let result = if overflow {
            Err(ParseError::TokenTooLong(LINE_BUFFER_SIZE))
        } else {
            decode::decode_token(self, &token)
        };
        if let Err(e) = result {
            tracing::warn!(
                "{:?}: discarding argument {}: {}",
                self.pending.id,
                self.parser_item_index,
                e
            );
        }
        self.parser_item_index += 1;
    }

    fn complete(&mut self) {
        self.line_command = self.pending.id;
        if self.pending.id != CommandId::Unknown {
            self.command = self.pending.id;
            tracing::debug!("completed {:?}", self.command);
        }
        self.parser_item_index = 0;
        self.pending = ResolvedCommand::unknown(CommandForm::Action);
        self.pending_value = None;
        self.clear_line();
    }

    pub(crate) fn generic_status_indicator_default(&self, uuid: u16) -> Option<bool> {
        self.generic_defaults
            .iter()
            .find(|ind| ind.uuid == uuid)
            .map(|ind| ind.enabled)
    }

    /// Current scanner phase
    pub fn parser_state(&self) -> ParserState {
        self.parser_state
    }

    /// Position of the next argument token within the current command
    pub fn parser_item_index(&self) -> usize {
        self.parser_item_index
    }

    /// Bytes held in the line buffer
    pub fn line_size(&self) -> usize {
        self.line_buffer.len()
    }

    /// Last completed command
    pub fn command(&self) -> CommandId {
        self.command
    }

    /// Resolution of the most recently completed line, `Unknown` included
    pub fn line_command(&self) -> CommandId {
        self.line_command
    }

    /// Last command this side transmitted
    pub fn sent_command(&self) -> CommandId {
        self.sent_command
    }

    /// Record the command this side just transmitted
    ///
    /// Resolution of `+CIND:` and `+BIND:` response lines depends on it.
    pub fn set_sent_command(&mut self, command: CommandId) {
        self.sent_command = command;
    }

    /// Peer feature bitmask
    pub fn remote_supported_features(&self) -> u32 {
        self.remote_supported_features
    }

    /// Codecs announced by the peer, in arrival order
    pub fn remote_codecs(&self) -> &[u16] {
        &self.remote_codecs
    }

    /// Number of codecs announced by the peer
    pub fn remote_codecs_nr(&self) -> usize {
        self.remote_codecs.len()
    }

    /// Codec confirmed with `AT+BCS`
    pub fn confirmed_codec(&self) -> Option<u16> {
        self.confirmed_codec
    }

    /// Codec proposed with `+BCS`
    pub fn suggested_codec(&self) -> Option<u16> {
        self.suggested_codec
    }

    /// Generic status indicators declared on this connection
    pub fn generic_status_indicators(&self) -> &[GenericStatusIndicator] {
        &self.generic_status_indicators
    }

    /// Number of generic status indicators declared on this connection
    pub fn generic_status_indicators_nr(&self) -> usize {
        self.generic_status_indicators.len()
    }

    /// Connection-local AG indicators
    pub fn ag_indicators(&self) -> &[AgIndicatorDescriptor] {
        &self.ag_indicators
    }

    /// Number of connection-local AG indicators
    pub fn ag_indicators_nr(&self) -> usize {
        self.ag_indicators.len()
    }

    /// Whether `AT+CMER` enabled indicator status updates
    pub fn enable_status_update_for_ag_indicators(&self) -> bool {
        self.enable_status_update_for_ag_indicators
    }
}

impl Default for ConnectionRecord {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::AgIndicatorDescriptor;

    fn record() -> ConnectionRecord {
        ConnectionRecord::with_registry(&IndicatorRegistry::new())
    }

    #[test]
    fn test_new_record() {
        let rec = record();
        assert_eq!(rec.parser_state(), ParserState::AwaitHeader);
        assert_eq!(rec.command(), CommandId::None);
        assert_eq!(rec.ag_indicators_nr(), 7);
        assert_eq!(rec.remote_codecs_nr(), 0);
        assert_eq!(rec.line_size(), 0);
    }

    #[test]
    fn test_supported_features() {
        let mut rec = record();
        rec.feed_bytes(b"\r\nAT+BRSF=0000001111101111\r\n");
        assert_eq!(rec.command(), CommandId::SupportedFeatures);
        assert_eq!(rec.remote_supported_features(), 1007);
        assert_eq!(rec.parser_state(), ParserState::AwaitHeader);
        assert_eq!(rec.parser_item_index(), 0);
        assert_eq!(rec.line_size(), 0);
    }

    #[test]
    fn test_supported_features_response_is_decimal() {
        let mut rec = record();
        rec.feed_bytes(b"\r\n+BRSF: 1007\r\n");
        assert_eq!(rec.command(), CommandId::SupportedFeatures);
        assert_eq!(rec.remote_supported_features(), 1007);
    }

    #[test]
    fn test_malformed_bitmask_keeps_previous_value() {
        let mut rec = record();
        rec.feed_bytes(b"\r\nAT+BRSF=0000001111101111\r\n");
        rec.feed_bytes(b"\r\nAT+BRSF=00000011111x1111\r\n");
        assert_eq!(rec.command(), CommandId::SupportedFeatures);
        assert_eq!(rec.remote_supported_features(), 1007);
    }

    #[test]
    fn test_command_unchanged_while_partial() {
        let mut rec = record();
        rec.feed_bytes(b"\r\nOK\r\n");
        assert_eq!(rec.command(), CommandId::Ok);

        rec.feed_bytes(b"\r\nAT+BAC=1,");
        assert_eq!(rec.command(), CommandId::Ok);
        assert_eq!(rec.parser_state(), ParserState::Arguments);
        assert_eq!(rec.parser_item_index(), 1);

        rec.feed_bytes(b"2\r\n");
        assert_eq!(rec.command(), CommandId::AvailableCodecs);
        assert_eq!(rec.remote_codecs(), &[1, 2]);
    }

    #[test]
    fn test_unknown_command_leaves_command_unchanged() {
        let mut rec = record();
        rec.feed_bytes(b"\r\nAT+BAC=1\r\n");
        rec.feed_bytes(b"\r\nAT+XAPL=ABCD-1234-0100,10\r\n");
        assert_eq!(rec.command(), CommandId::AvailableCodecs);
        assert_eq!(rec.remote_codecs(), &[1]);
    }

    #[test]
    fn test_line_command_reports_unknown_lines() {
        let mut rec = record();
        rec.feed_bytes(b"AT+BAC=1\r");
        assert_eq!(rec.line_command(), CommandId::AvailableCodecs);
        rec.feed_bytes(b"AT+NREC=0\r");
        assert_eq!(rec.line_command(), CommandId::Unknown);
        assert_eq!(rec.command(), CommandId::AvailableCodecs);
    }

    #[test]
    fn test_codec_selection() {
        let mut rec = record();
        rec.feed_bytes(b"AT+BCS=2\r");
        assert_eq!(rec.command(), CommandId::ConfirmCodec);
        assert_eq!(rec.confirmed_codec(), Some(2));

        rec.feed_bytes(b"\r\n+BCS: 1\r\n");
        assert_eq!(rec.command(), CommandId::SuggestCodec);
        assert_eq!(rec.suggested_codec(), Some(1));
        assert_eq!(rec.confirmed_codec(), Some(2));
    }

    #[test]
    fn test_query_forms() {
        let mut rec = record();
        rec.feed_bytes(b"AT+CIND=?\r");
        assert_eq!(rec.command(), CommandId::RetrieveAgIndicators);
        rec.feed_bytes(b"AT+CIND?\r");
        assert_eq!(rec.command(), CommandId::RetrieveAgIndicatorsStatus);
        rec.feed_bytes(b"AT+BIND=?\r");
        assert_eq!(rec.command(), CommandId::RetrieveGenericStatusIndicators);
        rec.feed_bytes(b"AT+BIND?\r");
        assert_eq!(rec.command(), CommandId::RetrieveGenericStatusIndicatorsState);
        rec.feed_bytes(b"AT+CHLD=?\r");
        assert_eq!(rec.command(), CommandId::SupportCallHoldAndMultiparty);
    }

    #[test]
    fn test_indicator_status_response() {
        let mut rec = record();
        rec.set_sent_command(CommandId::RetrieveAgIndicatorsStatus);
        rec.feed_bytes(b"\r\n+CIND: 1,0,0,4,2,1,0\r\n");
        assert_eq!(rec.command(), CommandId::RetrieveAgIndicatorsStatus);
        let status: std::vec::Vec<u8> = rec.ag_indicators().iter().map(|i| i.status).collect();
        assert_eq!(status, vec![1, 0, 0, 4, 2, 1, 0]);
    }

    #[test]
    fn test_indicator_list_response_not_decoded() {
        let mut rec = record();
        rec.set_sent_command(CommandId::RetrieveAgIndicators);
        rec.feed_bytes(b"\r\n+CIND: (\"service\",(0,1)),(\"call\",(0,1))\r\n");
        assert_eq!(rec.command(), CommandId::RetrieveAgIndicators);
        assert_eq!(rec.ag_indicators()[0].status, 1);
    }

    #[test]
    fn test_indicator_event() {
        let mut rec = record();
        rec.feed_bytes(b"\r\n+CIEV: 2,1\r\n");
        assert_eq!(rec.command(), CommandId::TransferAgIndicatorStatus);
        assert_eq!(rec.ag_indicators()[1].status, 1);

        // Out of range for callsetup (0..=3)
        rec.feed_bytes(b"\r\n+CIEV: 3,9\r\n");
        assert_eq!(rec.ag_indicators()[2].status, 0);

        // No indicator 0 or 8
        rec.feed_bytes(b"\r\n+CIEV: 0,1\r\n+CIEV: 8,1\r\n");
        assert_eq!(rec.command(), CommandId::TransferAgIndicatorStatus);
    }

    #[test]
    fn test_generic_status_indicator_state_response() {
        let mut rec = record();
        rec.feed_bytes(b"AT+BIND=1,2\r");
        assert_eq!(rec.generic_status_indicators_nr(), 2);

        rec.set_sent_command(CommandId::RetrieveGenericStatusIndicatorsState);
        rec.feed_bytes(b"\r\n+BIND: 2,0\r\n\r\n+BIND: 5,1\r\n");
        assert_eq!(
            rec.command(),
            CommandId::RetrieveGenericStatusIndicatorsState
        );
        assert_eq!(
            rec.generic_status_indicators(),
            &[
                GenericStatusIndicator::new(1, true),
                GenericStatusIndicator::new(2, false),
                GenericStatusIndicator::new(5, true),
            ]
        );
    }

    #[test]
    fn test_generic_status_indicator_list_response() {
        let mut rec = record();
        rec.set_sent_command(CommandId::RetrieveGenericStatusIndicators);
        rec.feed_bytes(b"\r\n+BIND: (1,2)\r\n");
        assert_eq!(rec.command(), CommandId::RetrieveGenericStatusIndicators);
        let uuids: std::vec::Vec<u16> =
            rec.generic_status_indicators().iter().map(|i| i.uuid).collect();
        assert_eq!(uuids, vec![1, 2]);
    }

    #[test]
    fn test_individual_indicator_empty_fields_unchanged() {
        let mut rec = record();
        rec.feed_bytes(b"AT+BIA=1,,1,1,1,1,1\r");
        rec.feed_bytes(b"AT+BIA=0,,,,,1\r");
        let enabled: std::vec::Vec<bool> = rec.ag_indicators().iter().map(|i| i.enabled).collect();
        assert_eq!(enabled, vec![false, true, true, true, true, true, true]);
    }

    #[test]
    fn test_individual_indicator_extra_fields_dropped() {
        let mut rec = record();
        rec.feed_bytes(b"AT+BIA=1,1,1,1,1,1,1,0,0,0\r");
        assert_eq!(
            rec.command(),
            CommandId::EnableIndividualAgIndicatorStatusUpdate
        );
        assert!(rec.ag_indicators().iter().all(|i| i.enabled));
    }

    #[test]
    fn test_token_too_long_is_discarded() {
        let mut rec = record();
        let mut line = b"AT+BAC=1,".to_vec();
        line.extend(std::iter::repeat(b'9').take(LINE_BUFFER_SIZE + 5));
        line.extend_from_slice(b",3\r");
        rec.feed_bytes(&line);
        assert_eq!(rec.command(), CommandId::AvailableCodecs);
        assert_eq!(rec.remote_codecs(), &[1, 3]);
    }

    #[test]
    fn test_command_name_too_long_is_unknown() {
        let mut rec = record();
        let mut line = b"AT+".to_vec();
        line.extend(std::iter::repeat(b'B').take(LINE_BUFFER_SIZE + 1));
        line.extend_from_slice(b"=1\r");
        rec.feed_bytes(&line);
        assert_eq!(rec.command(), CommandId::None);
        rec.feed_bytes(b"AT+BAC=7\r");
        assert_eq!(rec.remote_codecs(), &[7]);
    }

    #[test]
    fn test_codec_list_capacity() {
        let mut rec = record();
        let list: std::vec::Vec<String> = (0..MAX_CODECS + 3).map(|i| i.to_string()).collect();
        rec.feed_bytes(format!("AT+BAC={}\r", list.join(",")).as_bytes());
        assert_eq!(rec.remote_codecs_nr(), MAX_CODECS);
        assert_eq!(rec.remote_codecs()[MAX_CODECS - 1], (MAX_CODECS - 1) as u16);
    }

    #[test]
    fn test_reset_parser() {
        let mut rec = record();
        rec.feed_bytes(b"AT+BAC=1,2");
        rec.reset_parser();
        assert_eq!(rec.parser_state(), ParserState::AwaitHeader);
        assert_eq!(rec.line_size(), 0);
        rec.feed_bytes(b"OK\r");
        assert_eq!(rec.command(), CommandId::Ok);
    }

    #[test]
    fn test_clone_ag_indicators_resets_local_copy() {
        let mut registry = IndicatorRegistry::empty();
        registry
            .set_ag_indicator_descriptors(&[
                AgIndicatorDescriptor::new(1, "service", 0, 1, 0, false, true),
                AgIndicatorDescriptor::new(2, "call", 0, 1, 0, true, true),
            ])
            .unwrap();
        let mut rec = ConnectionRecord::with_registry(&registry);
        rec.feed_bytes(b"AT+BIA=0,0\r");
        assert!(!rec.ag_indicators()[0].enabled);

        rec.clone_ag_indicators(&registry);
        assert!(rec.ag_indicators()[0].enabled);
        assert_eq!(rec.ag_indicators_nr(), 2);
    }
}
