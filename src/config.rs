//! Machine configuration.
//!
//! Defaults describe a stock LC-3: full 64K memory, trap vector table at
//! x0000, user programs at x3000, and the standard I/O traps handled
//! natively. A JSON document with any subset of the fields can override
//! them.

use crate::cpu::memory::ADDRESS_SPACE_SIZE;
use crate::word::Word;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Start of the trap vector table.
pub const TRAP_TABLE_BASE: Word = 0x0000;

/// Conventional load address for user programs.
pub const USER_SPACE: Word = 0x3000;

/// Prompt printed by the IN trap.
pub const DEFAULT_INPUT_PROMPT: &str = "\nInput a character> ";

/// Tunable parameters of a simulated machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    /// Number of words of backing memory (1 to 65,536).
    pub memory_size: usize,
    /// Address of the first trap vector table entry.
    pub trap_table_base: Word,
    /// PC after a reset when no image origin is given.
    pub reset_pc: Word,
    /// Handle GETC/OUT/PUTS/IN/PUTSP/HALT natively instead of jumping
    /// through the trap vector table.
    pub builtin_traps: bool,
    /// Text written by the IN trap before reading.
    pub input_prompt: String,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            memory_size: ADDRESS_SPACE_SIZE,
            trap_table_base: TRAP_TABLE_BASE,
            reset_pc: USER_SPACE,
            builtin_traps: true,
            input_prompt: DEFAULT_INPUT_PROMPT.to_string(),
        }
    }
}

impl MachineConfig {
    /// Parse a configuration from JSON and validate it.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every field is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.memory_size == 0 || self.memory_size > ADDRESS_SPACE_SIZE {
            return Err(ConfigError::MemorySize(self.memory_size));
        }
        Ok(())
    }
}

/// Errors in a machine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("memory size {0} is outside 1..=65536 words")]
    MemorySize(usize),

    #[error("invalid configuration: {0}")]
    Parse(String),
}
