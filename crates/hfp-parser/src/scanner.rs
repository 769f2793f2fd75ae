//! Byte-level scanner for HFP command lines
//!
//! The scanner is a total transition function `(ParserState, u8) ->
//! (ParserState, Effect)`. It never looks ahead and never touches the
//! connection record itself; [`ConnectionRecord::feed`] applies the
//! returned [`Effect`].
//!
//! # Line Format
//! ```text
//! \r\n AT+NAME=arg,arg \r\n      set form
//! \r\n AT+NAME=? \r\n            test form
//! \r\n AT+NAME? \r\n             read form
//! \r\n +NAME: arg,arg \r\n       response form
//! \r\n OK \r\n                   action form
//! ```
//!
//! HF-originated commands usually end with a bare `\r`, so any byte other
//! than CR/LF following a terminator starts the next command name.
//!
//! [`ConnectionRecord::feed`]: crate::ConnectionRecord::feed

use crate::command::CommandForm;

/// Carriage return
pub const CR: u8 = b'\r';
/// Line feed
pub const LF: u8 = b'\n';

/// Scanner phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ParserState {
    /// Between lines; CR, LF and spaces are skipped
    #[default]
    AwaitHeader,
    /// Accumulating the command name
    CommandName,
    /// `=` seen, deciding between test form and arguments
    Separator,
    /// Accumulating argument tokens
    Arguments,
    /// Command complete, consuming the rest of the line ending
    Terminator,
}

/// Action the connection record performs for one byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Nothing to do
    Ignore,
    /// Clear the line buffer and store the first byte of a command name
    BeginCommand(u8),
    /// Append a byte to the line buffer
    Store(u8),
    /// Resolve the command name in the given form
    Resolve(CommandForm),
    /// Resolve in the given form, then append the first argument byte
    ResolveAndStore(CommandForm, u8),
    /// Resolve in the given form, then dispatch an empty first token
    ResolveAndToken(CommandForm),
    /// Resolve a name without separator (action or read form) and complete
    ResolveBare,
    /// Resolve in the given form with no arguments and complete
    ResolveAndComplete(CommandForm),
    /// Dispatch the accumulated token to the decoder
    Token,
    /// Dispatch the last token and complete the command
    FinalToken,
}

impl ParserState {
    /// Compute the next state and the effect for `byte`
    pub fn next(self, byte: u8) -> (ParserState, Effect) {
        match self {
            ParserState::AwaitHeader | ParserState::Terminator => match byte {
                CR | LF | b' ' => (ParserState::AwaitHeader, Effect::Ignore),
                _ => (ParserState::CommandName, Effect::BeginCommand(byte)),
            },
            ParserState::CommandName => match byte {
                b'=' => (ParserState::Separator, Effect::Ignore),
                b':' => (
                    ParserState::Arguments,
                    Effect::Resolve(CommandForm::Response),
                ),
                CR | LF => (ParserState::Terminator, Effect::ResolveBare),
                b' ' => (ParserState::CommandName, Effect::Ignore),
                _ => (ParserState::CommandName, Effect::Store(byte)),
            },
            ParserState::Separator => match byte {
                b'?' => (ParserState::Arguments, Effect::Resolve(CommandForm::Test)),
                CR | LF => (
                    ParserState::Terminator,
                    Effect::ResolveAndComplete(CommandForm::Set),
                ),
                _ => match ParserState::Arguments.next(byte) {
                    (state, Effect::Store(b)) => {
                        (state, Effect::ResolveAndStore(CommandForm::Set, b))
                    }
                    (state, Effect::Token) => (state, Effect::ResolveAndToken(CommandForm::Set)),
                    (state, _) => (state, Effect::Resolve(CommandForm::Set)),
                },
            },
            ParserState::Arguments => match byte {
                b',' | b')' => (ParserState::Arguments, Effect::Token),
                b'(' | b' ' => (ParserState::Arguments, Effect::Ignore),
                CR | LF => (ParserState::Terminator, Effect::FinalToken),
                _ => (ParserState::Arguments, Effect::Store(byte)),
            },
        }
    }

    /// Returns whether a command is partially scanned
    pub fn in_command(&self) -> bool {
        matches!(
            self,
            ParserState::CommandName | ParserState::Separator | ParserState::Arguments
        )
    }
}
