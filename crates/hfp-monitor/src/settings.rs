//! Monitor settings

use std::path::Path;

use anyhow::{Context, Result};
use hfp_parser::{AgIndicatorDescriptor, GenericStatusIndicator, IndicatorRegistry, RegistryError};
use serde::{Deserialize, Serialize};

/// Settings loaded from the `--config` JSON file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MonitorSettings {
    /// Tracing filter used when neither `--log-filter` nor `RUST_LOG` is set
    pub log_filter: Option<String>,
    /// Serial baud rate used when `--baud` is not given
    pub baud_rate: u32,
    /// Read buffer size in bytes
    pub read_buffer_size: usize,
    /// AG indicator table replacing the built-in HFP table
    pub ag_indicators: Option<Vec<AgIndicatorDescriptor>>,
    /// Generic status indicator table replacing the built-in one
    pub generic_status_indicators: Option<Vec<GenericStatusIndicator>>,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            log_filter: None,
            baud_rate: 115200,
            read_buffer_size: 1024,
            ag_indicators: None,
            generic_status_indicators: None,
        }
    }
}

impl MonitorSettings {
    /// Load settings from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse settings in {}", path.display()))
    }

    /// Build the indicator registry described by these settings
    ///
    /// Tables that are not configured keep the built-in defaults.
    pub fn registry(&self) -> Result<IndicatorRegistry, RegistryError> {
        let mut registry = IndicatorRegistry::new();
        if let Some(ag_indicators) = &self.ag_indicators {
            registry.set_ag_indicator_descriptors(ag_indicators)?;
        }
        if let Some(generic) = &self.generic_status_indicators {
            registry.set_generic_status_indicator_descriptors(generic)?;
        }
        Ok(registry)
    }
}
