//! # LC-3 Core
//!
//! An instruction-level simulator for the LC-3, the 16-bit educational
//! computer: decode, execute and trap dispatch, with the machine state
//! exposed for loaders and debuggers to drive.

pub mod config;
pub mod cpu;
pub mod disasm;
pub mod io;
pub mod word;

// Re-export commonly used types
pub use config::{ConfigError, MachineConfig};
pub use cpu::{
    decode, encode, ConditionCodes, Instruction, LoadError, Machine, MachineSnapshot, Memory,
    Register, Registers, RunState, RunSummary, StepFailure, StepOutcome, TrapVector,
};
pub use disasm::{disassemble, disassemble_word};
pub use io::{Console, ScriptedConsole, StreamConsole};
pub use word::{SignedWord, Word};
