//! LC-3 register file.
//!
//! The LC-3 has:
//! - R0-R7: eight 16-bit general-purpose registers (R7 doubles as the link register)
//! - PC: the program counter
//! - NZP: the condition codes, exactly one of negative/zero/positive

use crate::word::{SignedWord, Word};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Number of general-purpose registers.
pub const REGISTER_COUNT: usize = 8;

/// A general-purpose register address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Register {
    R0,
    R1,
    R2,
    R3,
    R4,
    R5,
    R6,
    R7,
}

/// A register index outside `0..=7`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[error("invalid register address {0} (valid registers are R0-R7)")]
pub struct InvalidRegisterAddress(pub u8);

impl Register {
    /// All registers in index order.
    pub const ALL: [Register; REGISTER_COUNT] = [
        Register::R0,
        Register::R1,
        Register::R2,
        Register::R3,
        Register::R4,
        Register::R5,
        Register::R6,
        Register::R7,
    ];

    /// The register receiving return addresses from JSR, JSRR and TRAP.
    pub const LINK: Register = Register::R7;

    /// Build a register from a 3-bit instruction field.
    ///
    /// Only the low three bits of `field` are used, so this cannot fail.
    #[inline]
    pub const fn from_field(field: Word) -> Self {
        Self::ALL[(field & 0b111) as usize]
    }

    /// The numeric index of this register (0-7).
    #[inline]
    pub const fn index(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Register {
    type Error = InvalidRegisterAddress;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .get(usize::from(value))
            .copied()
            .ok_or(InvalidRegisterAddress(value))
    }
}

impl From<Register> for u8 {
    fn from(reg: Register) -> Self {
        reg.index()
    }
}

impl From<Register> for usize {
    fn from(reg: Register) -> Self {
        usize::from(reg.index())
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}", self.index())
    }
}

/// The condition code register.
///
/// Exactly one flag is set at any time, so it is modelled as a three-way
/// enum rather than three booleans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ConditionCodes {
    /// Last written value had its sign bit set.
    Negative,
    /// Last written value was zero.
    #[default]
    Zero,
    /// Last written value was non-zero with a clear sign bit.
    Positive,
}

impl ConditionCodes {
    /// Derive the flags from a value written to a general-purpose register.
    pub const fn from_word(value: Word) -> Self {
        let signed = value as SignedWord;
        if signed < 0 {
            ConditionCodes::Negative
        } else if signed == 0 {
            ConditionCodes::Zero
        } else {
            ConditionCodes::Positive
        }
    }

    /// `true` if the N flag is set.
    pub const fn negative(self) -> bool {
        matches!(self, ConditionCodes::Negative)
    }

    /// `true` if the Z flag is set.
    pub const fn zero(self) -> bool {
        matches!(self, ConditionCodes::Zero)
    }

    /// `true` if the P flag is set.
    pub const fn positive(self) -> bool {
        matches!(self, ConditionCodes::Positive)
    }
}

impl fmt::Display for ConditionCodes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flag = |set: bool, c: char| if set { c } else { '-' };
        write!(
            f,
            "{}{}{}",
            flag(self.negative(), 'N'),
            flag(self.zero(), 'Z'),
            flag(self.positive(), 'P')
        )
    }
}

/// The LC-3 register file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    gpr: [Word; REGISTER_COUNT],
    pc: Word,
    cc: ConditionCodes,
}

impl Registers {
    /// Create a register file with all values zeroed and the Z flag set.
    pub fn new() -> Self {
        Self {
            gpr: [0; REGISTER_COUNT],
            pc: 0,
            cc: ConditionCodes::Zero,
        }
    }

    /// Reset all registers to their power-on state.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Read a general-purpose register.
    #[inline]
    pub fn read(&self, reg: Register) -> Word {
        self.gpr[usize::from(reg)]
    }

    /// Write a general-purpose register and update the condition codes.
    #[inline]
    pub fn write(&mut self, reg: Register, value: Word) {
        self.gpr[usize::from(reg)] = value;
        self.cc = ConditionCodes::from_word(value);
    }

    /// Read a register by numeric index.
    pub fn read_index(&self, index: u8) -> Result<Word, InvalidRegisterAddress> {
        Ok(self.read(Register::try_from(index)?))
    }

    /// Write a register by numeric index (condition codes follow the write).
    pub fn write_index(&mut self, index: u8, value: Word) -> Result<(), InvalidRegisterAddress> {
        self.write(Register::try_from(index)?, value);
        Ok(())
    }

    /// All eight general-purpose registers in index order.
    pub fn general(&self) -> &[Word; REGISTER_COUNT] {
        &self.gpr
    }

    /// Current program counter.
    #[inline]
    pub fn pc(&self) -> Word {
        self.pc
    }

    /// Set the program counter to an absolute address.
    #[inline]
    pub fn set_pc(&mut self, addr: Word) {
        self.pc = addr;
    }

    /// Current condition codes.
    #[inline]
    pub fn cc(&self) -> ConditionCodes {
        self.cc
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_fresh_register_file() {
        let regs = Registers::new();
        assert_eq!(regs.general(), &[0; REGISTER_COUNT]);
        assert_eq!(regs.pc(), 0);
        assert_eq!(regs.cc(), ConditionCodes::Zero);
    }

    #[test]
    fn test_write_updates_condition_codes() {
        let mut regs = Registers::new();

        regs.write(Register::R3, 5);
        assert_eq!(regs.read(Register::R3), 5);
        assert_eq!(regs.cc(), ConditionCodes::Positive);

        regs.write(Register::R3, 0x8000);
        assert_eq!(regs.cc(), ConditionCodes::Negative);

        regs.write(Register::R0, 0);
        assert_eq!(regs.cc(), ConditionCodes::Zero);
    }

    #[test]
    fn test_index_accessors() {
        let mut regs = Registers::new();
        regs.write_index(6, 0x1234).unwrap();
        assert_eq!(regs.read_index(6).unwrap(), 0x1234);
        assert_eq!(regs.read_index(8), Err(InvalidRegisterAddress(8)));
        assert_eq!(regs.write_index(200, 1), Err(InvalidRegisterAddress(200)));
    }

    #[test]
    fn test_condition_code_display() {
        assert_eq!(ConditionCodes::Negative.to_string(), "N--");
        assert_eq!(ConditionCodes::Zero.to_string(), "-Z-");
        assert_eq!(ConditionCodes::Positive.to_string(), "--P");
    }

    #[test]
    fn test_register_from_field_masks() {
        assert_eq!(Register::from_field(0b1011), Register::R3);
        assert_eq!(Register::from_field(7), Register::LINK);
    }

    proptest! {
        #[test]
        fn prop_register_address_validity(value: u8) {
            match Register::try_from(value) {
                Ok(reg) => {
                    prop_assert!(value < 8);
                    prop_assert_eq!(reg.index(), value);
                }
                Err(err) => {
                    prop_assert!(value >= 8);
                    prop_assert_eq!(err, InvalidRegisterAddress(value));
                }
            }
        }

        #[test]
        fn prop_exactly_one_flag_after_write(index in 0u8..8, value: u16) {
            let mut regs = Registers::new();
            regs.write_index(index, value).unwrap();
            let cc = regs.cc();
            let set = [cc.negative(), cc.zero(), cc.positive()]
                .iter()
                .filter(|f| **f)
                .count();
            prop_assert_eq!(set, 1);
            prop_assert_eq!(cc.negative(), value & 0x8000 != 0);
            prop_assert_eq!(cc.zero(), value == 0);
        }
    }
}
