//! Analysis settings.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::arch::ebc::PointerSize;
use crate::{Address, DisassemblyError};

/// Knobs for decoding and analysis, loadable from JSON.
///
/// Every field is optional in the file; missing ones take the defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// EBC natural-unit size. Taken from the binary when unset.
    pub pointer_size: Option<PointerSize>,
    /// Record stack-pointer change points.
    pub trace_stack: bool,
    /// Turn stack-relative operands into frame variables.
    pub create_frame_vars: bool,
    /// Look for jump-table dispatch idioms.
    pub detect_switches: bool,
    /// Load address for raw images.
    pub base: Option<Address>,
    /// Start of recursive descent, overriding the binary's entry point.
    pub entry: Option<Address>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pointer_size: None,
            trace_stack: true,
            create_frame_vars: true,
            detect_switches: true,
            base: None,
            entry: None,
        }
    }
}

impl Config {
    pub fn from_json(text: &str) -> Result<Self, DisassemblyError> {
        serde_json::from_str(text).map_err(|e| DisassemblyError::ConfigError(e.to_string()))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, DisassemblyError> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}
