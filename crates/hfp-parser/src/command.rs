//! HFP command identifiers and the static resolution table
//!
//! Every line on the wire is reduced to a command name (`AT+BRSF`, `+CIEV`,
//! `OK`), a [`CommandForm`] derived from the separator that followed it, and
//! the last command this side transmitted. [`resolve`] maps that triple to a
//! [`CommandId`] and the [`ArgumentShape`] the argument decoders expect.

/// Recognized HFP commands and results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CommandId {
    /// Nothing parsed (or sent) yet
    #[default]
    None,
    /// Command name not in the table
    Unknown,
    /// `OK` result code
    Ok,
    /// `ERROR` result code
    Error,
    /// `AT+BRSF` / `+BRSF`: supported features exchange
    SupportedFeatures,
    /// `AT+BAC`: codecs available on the HF
    AvailableCodecs,
    /// `AT+BCS`: HF confirms the codec chosen by the AG
    ConfirmCodec,
    /// `+BCS`: AG proposes a codec
    SuggestCodec,
    /// `AT+CIND=?`: indicator names and ranges
    RetrieveAgIndicators,
    /// `AT+CIND?`: current indicator values
    RetrieveAgIndicatorsStatus,
    /// `AT+CMER`: enable indicator status update
    EnableIndicatorStatusUpdate,
    /// `AT+BIA`: enable or disable individual indicators
    EnableIndividualAgIndicatorStatusUpdate,
    /// `+CIEV`: indicator value changed
    TransferAgIndicatorStatus,
    /// `AT+CHLD=?`: call hold and multiparty capabilities
    SupportCallHoldAndMultiparty,
    /// `AT+BIND=`: HF lists its generic status indicators
    GenericStatusIndicator,
    /// `AT+BIND=?`: indicators supported by the AG
    RetrieveGenericStatusIndicators,
    /// `AT+BIND?`: enable state of each indicator
    RetrieveGenericStatusIndicatorsState,
}

impl CommandId {
    /// Returns whether this is a final result code rather than a command
    pub fn is_result_code(&self) -> bool {
        matches!(self, Self::Ok | Self::Error)
    }
}

/// Syntactic form of a command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CommandForm {
    /// Bare name: `OK`, `ATA`
    Action,
    /// Trailing `?`: `AT+CIND?`
    Read,
    /// `=?`: `AT+CIND=?`
    Test,
    /// `=` followed by arguments: `AT+BAC=1,2`
    Set,
    /// `:` followed by arguments: `+CIEV: 2,1`
    Response,
}

/// Argument layout a command expects after its separator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ArgumentShape {
    /// No arguments are decoded; anything present is skipped
    None,
    /// A single non-negative decimal integer
    Integer,
    /// Comma-separated integers appended in arrival order
    IntegerList,
    /// A single string of `0`/`1` digits, most significant first
    BitmaskDigitString { width: u8 },
    /// One entry per indicator, position-aligned with the indicator table
    EnableVector,
    /// A fixed number of positional integer fields
    Fields(u8),
}

/// Result of resolving a command name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedCommand {
    /// Command identifier
    pub id: CommandId,
    /// Form the command arrived in
    pub form: CommandForm,
    /// Shape of the arguments that follow
    pub shape: ArgumentShape,
}

impl ResolvedCommand {
    /// Resolution result for a name that matched nothing
    pub const fn unknown(form: CommandForm) -> Self {
        Self {
            id: CommandId::Unknown,
            form,
            shape: ArgumentShape::None,
        }
    }
}

/// One row of the resolution table
#[derive(Debug, Clone, Copy)]
pub struct CommandEntry {
    /// Command stem without the `AT` prefix
    pub stem: &'static str,
    /// Form this row applies to
    pub form: CommandForm,
    /// Row only applies after this command was sent
    pub after: Option<CommandId>,
    /// Resolved identifier
    pub id: CommandId,
    /// Expected argument shape
    pub shape: ArgumentShape,
}

/// Width of the `AT+BRSF` feature bitmask
pub const SUPPORTED_FEATURES_WIDTH: u8 = 16;

const fn entry(
    stem: &'static str,
    form: CommandForm,
    after: Option<CommandId>,
    id: CommandId,
    shape: ArgumentShape,
) -> CommandEntry {
    CommandEntry {
        stem,
        form,
        after,
        id,
        shape,
    }
}

use ArgumentShape as S;
use CommandForm as F;
use CommandId as C;

/// Static command resolution table
pub static COMMAND_TABLE: &[CommandEntry] = &[
    entry("OK", F::Action, None, C::Ok, S::None),
    entry("ERROR", F::Action, None, C::Error, S::None),
    entry(
        "+BRSF",
        F::Set,
        None,
        C::SupportedFeatures,
        S::BitmaskDigitString {
            width: SUPPORTED_FEATURES_WIDTH,
        },
    ),
    entry("+BRSF", F::Response, None, C::SupportedFeatures, S::Integer),
    entry("+BAC", F::Set, None, C::AvailableCodecs, S::IntegerList),
    entry("+BCS", F::Set, None, C::ConfirmCodec, S::Integer),
    entry("+BCS", F::Response, None, C::SuggestCodec, S::Integer),
    entry("+CIND", F::Test, None, C::RetrieveAgIndicators, S::None),
    entry("+CIND", F::Read, None, C::RetrieveAgIndicatorsStatus, S::None),
    entry(
        "+CIND",
        F::Response,
        Some(C::RetrieveAgIndicatorsStatus),
        C::RetrieveAgIndicatorsStatus,
        S::IntegerList,
    ),
    entry("+CIND", F::Response, None, C::RetrieveAgIndicators, S::None),
    entry("+CMER", F::Set, None, C::EnableIndicatorStatusUpdate, S::Fields(4)),
    entry(
        "+BIA",
        F::Set,
        None,
        C::EnableIndividualAgIndicatorStatusUpdate,
        S::EnableVector,
    ),
    entry("+CIEV", F::Response, None, C::TransferAgIndicatorStatus, S::Fields(2)),
    entry("+CHLD", F::Test, None, C::SupportCallHoldAndMultiparty, S::None),
    entry("+BIND", F::Set, None, C::GenericStatusIndicator, S::EnableVector),
    entry("+BIND", F::Test, None, C::RetrieveGenericStatusIndicators, S::None),
    entry(
        "+BIND",
        F::Read,
        None,
        C::RetrieveGenericStatusIndicatorsState,
        S::None,
    ),
    entry(
        "+BIND",
        F::Response,
        Some(C::RetrieveGenericStatusIndicators),
        C::RetrieveGenericStatusIndicators,
        S::EnableVector,
    ),
    entry(
        "+BIND",
        F::Response,
        None,
        C::RetrieveGenericStatusIndicatorsState,
        S::Fields(2),
    ),
];

/// Resolve an accumulated command name against [`COMMAND_TABLE`]
///
/// `name` is the raw header text up to the separator (`AT+CIND?`, `+BIND`,
/// `OK`). A trailing `?` on a bare name turns [`CommandForm::Action`] into
/// [`CommandForm::Read`]. Among rows whose stem is a prefix of the name
/// ending at a name boundary, and whose form and `after` condition match,
/// the longest stem wins and a row conditioned on `sent` beats an
/// unconditioned one. `AT+BIAX` does not match the `+BIA` row.
pub fn resolve(name: &[u8], form: CommandForm, sent: CommandId) -> ResolvedCommand {
    let Ok(name) = std::str::from_utf8(name) else {
        return ResolvedCommand::unknown(form);
    };
    let upper = name.trim().to_ascii_uppercase();
    let mut stem = upper.as_str();

    let mut form = form;
    if form == CommandForm::Action {
        if let Some(rest) = stem.strip_suffix('?') {
            stem = rest;
            form = CommandForm::Read;
        }
    }

    if let Some(rest) = stem.strip_prefix("AT") {
        if !rest.is_empty() {
            stem = rest;
        }
    }

    COMMAND_TABLE
        .iter()
        .filter(|e| e.form == form && matches_stem(stem, e.stem))
        .filter(|e| e.after.map_or(true, |after| after == sent))
        .max_by_key(|e| (e.stem.len(), e.after.is_some()))
        .map(|e| ResolvedCommand {
            id: e.id,
            form,
            shape: e.shape,
        })
        .unwrap_or_else(|| ResolvedCommand::unknown(form))
}

/// Returns whether `name` starts with `stem` and continues with no further
/// name characters
fn matches_stem(name: &str, stem: &str) -> bool {
    name.strip_prefix(stem)
        .is_some_and(|rest| !rest.starts_with(|c: char| c.is_ascii_alphanumeric()))
}
