//! Audio Gateway and generic status indicator tables
//!
//! An [`IndicatorRegistry`] holds the descriptor tables every connection is
//! seeded from. It is configured through `&mut self` setters, so a registry
//! can only be changed while nothing else holds it. Once [installed]
//! process-wide it is reachable only through a `&'static` shared reference
//! and is effectively sealed.
//!
//! [installed]: IndicatorRegistry::install

use std::borrow::Cow;
use std::sync::OnceLock;

use crate::error::RegistryError;

/// Per-connection capacity for AG indicators
pub const MAX_AG_INDICATORS: usize = 20;
/// Per-connection capacity for generic status indicators
pub const MAX_GENERIC_STATUS_INDICATORS: usize = 20;

/// Generic status indicator uuid: enhanced safety
pub const HF_INDICATOR_ENHANCED_SAFETY: u16 = 1;
/// Generic status indicator uuid: battery level
pub const HF_INDICATOR_BATTERY_LEVEL: u16 = 2;

/// Descriptor for one Audio Gateway indicator
///
/// The same type is used for the shared table and for each connection's
/// local copy. Only the copy's `status` and `enabled` change while parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AgIndicatorDescriptor {
    /// 1-based ordinal, stable across connections
    pub index: u8,
    /// Name announced in `+CIND: ("name",(min,max))`
    pub name: Cow<'static, str>,
    /// Current value
    pub status: u8,
    /// Lowest valid value
    pub min: u8,
    /// Highest valid value
    pub max: u8,
    /// Reporting cannot be disabled
    pub mandatory: bool,
    /// Reporting enabled
    pub enabled: bool,
}

impl AgIndicatorDescriptor {
    /// Create a descriptor with a static name
    pub const fn new(
        index: u8,
        name: &'static str,
        min: u8,
        max: u8,
        status: u8,
        mandatory: bool,
        enabled: bool,
    ) -> Self {
        Self {
            index,
            name: Cow::Borrowed(name),
            status,
            min,
            max,
            mandatory,
            enabled,
        }
    }

    /// Returns whether `value` lies within this indicator's bounds
    pub fn accepts(&self, value: u32) -> bool {
        value >= u32::from(self.min) && value <= u32::from(self.max)
    }
}

/// HF-side indicator identified by an assigned-number uuid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GenericStatusIndicator {
    /// Assigned number of the indicator
    pub uuid: u16,
    /// Indicator state (enabled)
    pub enabled: bool,
}

impl GenericStatusIndicator {
    /// Create an indicator entry
    pub const fn new(uuid: u16, enabled: bool) -> Self {
        Self { uuid, enabled }
    }
}

/// Standard HFP AG indicator set
pub static DEFAULT_AG_INDICATORS: &[AgIndicatorDescriptor] = &[
    AgIndicatorDescriptor::new(1, "service", 0, 1, 1, false, false),
    AgIndicatorDescriptor::new(2, "call", 0, 1, 0, true, true),
    AgIndicatorDescriptor::new(3, "callsetup", 0, 3, 0, true, true),
    AgIndicatorDescriptor::new(4, "battchg", 0, 5, 3, false, false),
    AgIndicatorDescriptor::new(5, "signal", 0, 5, 5, false, false),
    AgIndicatorDescriptor::new(6, "roam", 0, 1, 0, false, false),
    AgIndicatorDescriptor::new(7, "callheld", 0, 2, 0, true, true),
];

/// Standard generic status indicators
pub static DEFAULT_GENERIC_STATUS_INDICATORS: &[GenericStatusIndicator] = &[
    GenericStatusIndicator::new(HF_INDICATOR_ENHANCED_SAFETY, true),
    GenericStatusIndicator::new(HF_INDICATOR_BATTERY_LEVEL, true),
];

static GLOBAL: OnceLock<IndicatorRegistry> = OnceLock::new();

/// Descriptor tables connections are seeded from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndicatorRegistry {
    ag_indicators: Vec<AgIndicatorDescriptor>,
    generic_status_indicators: Vec<GenericStatusIndicator>,
}

impl IndicatorRegistry {
    /// Create a registry holding the standard HFP tables
    pub fn new() -> Self {
        Self {
            ag_indicators: DEFAULT_AG_INDICATORS.to_vec(),
            generic_status_indicators: DEFAULT_GENERIC_STATUS_INDICATORS.to_vec(),
        }
    }

    /// Create a registry with both tables empty
    pub fn empty() -> Self {
        Self {
            ag_indicators: Vec::new(),
            generic_status_indicators: Vec::new(),
        }
    }

    /// Shared AG indicator descriptors
    pub fn ag_indicator_descriptors(&self) -> &[AgIndicatorDescriptor] {
        &self.ag_indicators
    }

    /// Number of AG indicator descriptors
    pub fn ag_indicators_nr(&self) -> usize {
        self.ag_indicators.len()
    }

    /// Replace the AG indicator table
    ///
    /// Indices must run 1, 2, 3... in table order and every `status` must lie
    /// within its bounds. Mandatory descriptors are stored as enabled.
    pub fn set_ag_indicator_descriptors(
        &mut self,
        table: &[AgIndicatorDescriptor],
    ) -> Result<(), RegistryError> {
        if table.len() > MAX_AG_INDICATORS {
            return Err(RegistryError::TooManyIndicators {
                count: table.len(),
                capacity: MAX_AG_INDICATORS,
            });
        }

        for (pos, desc) in table.iter().enumerate() {
            if usize::from(desc.index) != pos + 1 {
                return Err(RegistryError::InvalidDescriptor(format!(
                    "{}: index {} at position {}",
                    desc.name, desc.index, pos
                )));
            }
            if desc.min > desc.max || !desc.accepts(u32::from(desc.status)) {
                return Err(RegistryError::InvalidDescriptor(format!(
                    "{}: status {} outside {}..={}",
                    desc.name, desc.status, desc.min, desc.max
                )));
            }
        }

        self.ag_indicators = table
            .iter()
            .cloned()
            .map(|mut desc| {
                desc.enabled |= desc.mandatory;
                desc
            })
            .collect();
        tracing::debug!("installed {} AG indicator descriptors", table.len());
        Ok(())
    }

    /// Shared generic status indicator descriptors
    pub fn generic_status_indicator_descriptors(&self) -> &[GenericStatusIndicator] {
        &self.generic_status_indicators
    }

    /// Replace the generic status indicator table
    pub fn set_generic_status_indicator_descriptors(
        &mut self,
        table: &[GenericStatusIndicator],
    ) -> Result<(), RegistryError> {
        if table.len() > MAX_GENERIC_STATUS_INDICATORS {
            return Err(RegistryError::TooManyIndicators {
                count: table.len(),
                capacity: MAX_GENERIC_STATUS_INDICATORS,
            });
        }
        self.generic_status_indicators = table.to_vec();
        tracing::debug!("installed {} generic status indicators", table.len());
        Ok(())
    }

    /// Install this registry process-wide
    ///
    /// Fails if a registry was already installed or if [`global`] has
    /// already been called (which installs the defaults).
    ///
    /// [`global`]: IndicatorRegistry::global
    pub fn install(self) -> Result<&'static IndicatorRegistry, RegistryError> {
        GLOBAL
            .set(self)
            .map_err(|_| RegistryError::AlreadyInstalled)?;
        Ok(Self::global())
    }

    /// The process-wide registry, defaulting to the standard HFP tables
    pub fn global() -> &'static IndicatorRegistry {
        GLOBAL.get_or_init(IndicatorRegistry::new)
    }
}

impl Default for IndicatorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// AG indicator descriptors of the process-wide registry
pub fn ag_indicator_descriptors() -> &'static [AgIndicatorDescriptor] {
    IndicatorRegistry::global().ag_indicator_descriptors()
}

/// Generic status indicator descriptors of the process-wide registry
pub fn generic_status_indicator_descriptors() -> &'static [GenericStatusIndicator] {
    IndicatorRegistry::global().generic_status_indicator_descriptors()
}
