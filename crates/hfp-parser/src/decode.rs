//! Argument decoders
//!
//! Each decoded token is routed by the resolved command and its
//! [`ArgumentShape`] into the connection record. The positional cursor
//! (`parser_item_index`) is owned by the caller; decoders only read it.

use crate::command::{ArgumentShape, CommandId};
use crate::connection::{ConnectionRecord, MAX_CODECS};
use crate::error::ParseError;
use crate::registry::{GenericStatusIndicator, MAX_GENERIC_STATUS_INDICATORS};

/// Parse a non-negative decimal integer
pub fn parse_integer(token: &[u8]) -> Result<u32, ParseError> {
    if token.is_empty() || !token.iter().all(u8::is_ascii_digit) {
        return Err(ParseError::MalformedToken(lossy(token)));
    }
    token.iter().try_fold(0u32, |acc, &digit| {
        acc.checked_mul(10)
            .and_then(|v| v.checked_add(u32::from(digit - b'0')))
            .ok_or_else(|| ParseError::IntegerOverflow(lossy(token)))
    })
}

/// Parse a fixed-width string of `0`/`1` digits, most significant first
///
/// The digit at position `i` from the left contributes bit `width - 1 - i`.
pub fn parse_bitmask(token: &[u8], width: u8) -> Result<u32, ParseError> {
    if token.len() != usize::from(width) || width > 32 {
        return Err(ParseError::InvalidBitmask {
            width,
            len: token.len(),
        });
    }
    token.iter().try_fold(0u32, |acc, &digit| match digit {
        b'0' => Ok(acc << 1),
        b'1' => Ok((acc << 1) | 1),
        _ => Err(ParseError::MalformedToken(lossy(token))),
    })
}

fn parse_u16(token: &[u8]) -> Result<u16, ParseError> {
    let value = parse_integer(token)?;
    u16::try_from(value).map_err(|_| ParseError::IntegerOverflow(lossy(token)))
}

fn parse_flag(token: &[u8]) -> Result<bool, ParseError> {
    match parse_integer(token)? {
        0 => Ok(false),
        1 => Ok(true),
        value => Err(ParseError::ValueOutOfRange {
            value,
            min: 0,
            max: 1,
        }),
    }
}

fn lossy(token: &[u8]) -> String {
    String::from_utf8_lossy(token).into_owned()
}

/// Number of tokens the current command can consume
pub(crate) fn capacity(record: &ConnectionRecord) -> usize {
    let resolved = record.pending;
    match resolved.shape {
        ArgumentShape::None => 0,
        ArgumentShape::Integer | ArgumentShape::BitmaskDigitString { .. } => 1,
        ArgumentShape::Fields(n) => usize::from(n),
        ArgumentShape::IntegerList => match resolved.id {
            CommandId::AvailableCodecs => MAX_CODECS,
            CommandId::RetrieveAgIndicatorsStatus => record.ag_indicators.len(),
            _ => 0,
        },
        ArgumentShape::EnableVector => match resolved.id {
            CommandId::EnableIndividualAgIndicatorStatusUpdate => record.ag_indicators.len(),
            CommandId::GenericStatusIndicator | CommandId::RetrieveGenericStatusIndicators => {
                MAX_GENERIC_STATUS_INDICATORS
            }
            _ => 0,
        },
    }
}

/// Returns whether an empty token is skipped without advancing the cursor
///
/// Lists that are built by appending have no positions to hold, so `1,,2`
/// and the `)` of `(1,2)` contribute nothing.
pub(crate) fn skips_empty(record: &ConnectionRecord) -> bool {
    match record.pending.shape {
        ArgumentShape::IntegerList => record.pending.id == CommandId::AvailableCodecs,
        ArgumentShape::EnableVector => {
            record.pending.id != CommandId::EnableIndividualAgIndicatorStatusUpdate
        }
        _ => false,
    }
}

/// Prepare destinations once a command with arguments is resolved
///
/// Lists rebuilt by a command start empty so a repeated command yields the
/// same record.
pub(crate) fn begin_arguments(record: &mut ConnectionRecord) {
    match record.pending.id {
        CommandId::AvailableCodecs => record.remote_codecs.clear(),
        CommandId::GenericStatusIndicator | CommandId::RetrieveGenericStatusIndicators
            if record.pending.shape == ArgumentShape::EnableVector =>
        {
            record.generic_status_indicators.clear()
        }
        _ => {}
    }
    record.pending_value = None;
}

/// Decode one token at the current cursor position
pub(crate) fn decode_token(record: &mut ConnectionRecord, token: &[u8]) -> Result<(), ParseError> {
    let index = record.parser_item_index;
    let resolved = record.pending;

    match (resolved.shape, resolved.id) {
        (ArgumentShape::None, _) => Ok(()),

        (ArgumentShape::BitmaskDigitString { width }, _) => {
            record.remote_supported_features = parse_bitmask(token, width)?;
            Ok(())
        }

        (ArgumentShape::Integer, CommandId::SupportedFeatures) => {
            record.remote_supported_features = parse_integer(token)?;
            Ok(())
        }
        (ArgumentShape::Integer, CommandId::ConfirmCodec) => {
            record.confirmed_codec = Some(parse_u16(token)?);
            Ok(())
        }
        (ArgumentShape::Integer, CommandId::SuggestCodec) => {
            record.suggested_codec = Some(parse_u16(token)?);
            Ok(())
        }

        (ArgumentShape::IntegerList, CommandId::AvailableCodecs) => {
            let codec = parse_u16(token)?;
            record
                .remote_codecs
                .push(codec)
                .map_err(|_| ParseError::CapacityExceeded {
                    capacity: MAX_CODECS,
                })
        }
        (ArgumentShape::IntegerList, CommandId::RetrieveAgIndicatorsStatus) => {
            if token.is_empty() {
                return Ok(());
            }
            let value = parse_integer(token)?;
            set_indicator_status(record, index, value)
        }

        (ArgumentShape::EnableVector, CommandId::EnableIndividualAgIndicatorStatusUpdate) => {
            let Some(indicator) = record.ag_indicators.get_mut(index) else {
                return Err(ParseError::UnknownIndicator(index as u32 + 1));
            };
            if token.is_empty() {
                return Ok(());
            }
            let requested = parse_flag(token)?;
            indicator.enabled = indicator.mandatory || requested;
            Ok(())
        }
        (
            ArgumentShape::EnableVector,
            CommandId::GenericStatusIndicator | CommandId::RetrieveGenericStatusIndicators,
        ) => {
            let uuid = parse_u16(token)?;
            let enabled = record.generic_status_indicator_default(uuid).unwrap_or(false);
            record
                .generic_status_indicators
                .push(GenericStatusIndicator::new(uuid, enabled))
                .map_err(|_| ParseError::CapacityExceeded {
                    capacity: MAX_GENERIC_STATUS_INDICATORS,
                })
        }

        (ArgumentShape::Fields(n), CommandId::EnableIndicatorStatusUpdate) => {
            // AT+CMER=<mode>,<keyp>,<disp>,<ind>: only <ind> is kept
            if token.is_empty() {
                return Ok(());
            }
            let value = parse_integer(token)?;
            if index + 1 == usize::from(n) {
                record.enable_status_update_for_ag_indicators = value != 0;
            }
            Ok(())
        }
        (ArgumentShape::Fields(_), CommandId::TransferAgIndicatorStatus) => {
            if index == 0 {
                record.pending_value = Some(parse_integer(token)?);
                return Ok(());
            }
            let Some(position) = record.pending_value.take() else {
                return Ok(());
            };
            let value = parse_integer(token)?;
            match (position as usize).checked_sub(1) {
                Some(slot) => set_indicator_status(record, slot, value),
                None => Err(ParseError::UnknownIndicator(position)),
            }
        }
        (ArgumentShape::Fields(_), CommandId::RetrieveGenericStatusIndicatorsState) => {
            if index == 0 {
                record.pending_value = Some(u32::from(parse_u16(token)?));
                return Ok(());
            }
            let Some(uuid) = record.pending_value.take() else {
                return Ok(());
            };
            let enabled = parse_flag(token)?;
            set_generic_status_indicator(record, uuid as u16, enabled)
        }

        (shape, id) => {
            // Rows without a decoder must not be handed tokens
            debug_assert_eq!(capacity(record), 0, "no decoder for {:?} with {:?}", id, shape);
            tracing::debug!("no decoder for {:?} with {:?}", id, shape);
            Ok(())
        }
    }
}

fn set_indicator_status(
    record: &mut ConnectionRecord,
    slot: usize,
    value: u32,
) -> Result<(), ParseError> {
    let Some(indicator) = record.ag_indicators.get_mut(slot) else {
        return Err(ParseError::UnknownIndicator(slot as u32 + 1));
    };
    if !indicator.accepts(value) {
        return Err(ParseError::ValueOutOfRange {
            value,
            min: indicator.min,
            max: indicator.max,
        });
    }
    indicator.status = value as u8;
    Ok(())
}

fn set_generic_status_indicator(
    record: &mut ConnectionRecord,
    uuid: u16,
    enabled: bool,
) -> Result<(), ParseError> {
    if let Some(indicator) = record
        .generic_status_indicators
        .iter_mut()
        .find(|ind| ind.uuid == uuid)
    {
        indicator.enabled = enabled;
        return Ok(());
    }
    record
        .generic_status_indicators
        .push(GenericStatusIndicator::new(uuid, enabled))
        .map_err(|_| ParseError::CapacityExceeded {
            capacity: MAX_GENERIC_STATUS_INDICATORS,
        })
}
