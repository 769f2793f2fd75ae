//! Feeds received bytes into a connection record and reports each line

use hfp_parser::{CommandId, ConnectionRecord, ParserState};
use tracing::{debug, info};

/// One monitored HFP connection
pub struct Session {
    connection: ConnectionRecord,
    lines: usize,
    unknown_lines: usize,
}

impl Session {
    pub fn new(connection: ConnectionRecord) -> Self {
        Self {
            connection,
            lines: 0,
            unknown_lines: 0,
        }
    }

    /// Record the command this side transmitted before the captured lines
    pub fn set_sent_command(&mut self, command: CommandId) {
        self.connection.set_sent_command(command);
    }

    /// Feed received bytes and return the commands completed by them
    pub fn feed(&mut self, data: &[u8]) -> Vec<CommandId> {
        let mut completed = Vec::new();
        for &byte in data {
            let before = self.connection.parser_state();
            self.connection.feed(byte);

            if before.in_command() && self.connection.parser_state() == ParserState::Terminator {
                self.lines += 1;
                let command = self.connection.line_command();
                if command == CommandId::Unknown {
                    self.unknown_lines += 1;
                    debug!("line {}: unknown command", self.lines);
                } else {
                    info!("{:?}{}", command, describe(&self.connection, command));
                }
                completed.push(command);
            }
        }
        completed
    }

    pub fn connection(&self) -> &ConnectionRecord {
        &self.connection
    }

    /// Number of completed lines
    pub fn lines(&self) -> usize {
        self.lines
    }

    /// Number of completed lines that resolved to no known command
    pub fn unknown_lines(&self) -> usize {
        self.unknown_lines
    }
}

/// Decoded fields relevant to `command`, formatted for the log
pub fn describe(conn: &ConnectionRecord, command: CommandId) -> String {
    match command {
        CommandId::SupportedFeatures => {
            format!(" features=0x{:04X}", conn.remote_supported_features())
        }
        CommandId::AvailableCodecs => format!(" codecs={:?}", conn.remote_codecs()),
        CommandId::ConfirmCodec => format!(" codec={:?}", conn.confirmed_codec()),
        CommandId::SuggestCodec => format!(" codec={:?}", conn.suggested_codec()),
        CommandId::RetrieveAgIndicatorsStatus | CommandId::TransferAgIndicatorStatus => {
            let status: Vec<String> = conn
                .ag_indicators()
                .iter()
                .map(|ind| format!("{}={}", ind.name, ind.status))
                .collect();
            format!(" {}", status.join(" "))
        }
        CommandId::EnableIndicatorStatusUpdate => {
            format!(" enabled={}", conn.enable_status_update_for_ag_indicators())
        }
        CommandId::EnableIndividualAgIndicatorStatusUpdate => {
            let enabled: Vec<&str> = conn
                .ag_indicators()
                .iter()
                .filter(|ind| ind.enabled)
                .map(|ind| ind.name.as_ref())
                .collect();
            format!(" enabled=[{}]", enabled.join(","))
        }
        CommandId::GenericStatusIndicator
        | CommandId::RetrieveGenericStatusIndicators
        | CommandId::RetrieveGenericStatusIndicatorsState => {
            let indicators: Vec<String> = conn
                .generic_status_indicators()
                .iter()
                .map(|ind| format!("{}:{}", ind.uuid, u8::from(ind.enabled)))
                .collect();
            format!(" indicators=[{}]", indicators.join(","))
        }
        _ => String::new(),
    }
}
