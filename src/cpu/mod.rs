//! CPU emulation for the LC-3.
//!
//! This module implements the architectural core:
//! - 16-bit word-addressed memory (up to 65,536 cells)
//! - 8 general-purpose registers, PC and N/Z/P condition codes
//! - 15-opcode instruction set with trap-based I/O

pub mod decode;
pub mod execute;
pub mod memory;
pub mod registers;
pub mod trap;

pub use decode::{decode, encode, Instruction};
pub use execute::{Machine, MachineSnapshot, RunState, RunSummary, StepFailure, StepOutcome};
pub use memory::{AddressOutOfBounds, LoadError, Memory};
pub use registers::{ConditionCodes, InvalidRegisterAddress, Register, Registers};
pub use trap::TrapVector;
