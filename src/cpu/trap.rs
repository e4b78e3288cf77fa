//! TRAP dispatch.
//!
//! A TRAP names an 8-bit vector. The six standard service routines are
//! implemented natively against a [`Console`] (unless disabled in the
//! [`MachineConfig`](crate::MachineConfig)); every other vector is looked
//! up in the trap vector table and entered like a subroutine call.

use crate::cpu::execute::{Flow, Machine, StepFailure};
use crate::cpu::registers::Register;
use crate::io::Console;
use crate::word::Word;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An 8-bit trap vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TrapVector(pub u8);

impl TrapVector {
    /// Read a character into R0 without echo.
    pub const GETC: TrapVector = TrapVector(0x20);
    /// Write the character in R0.
    pub const OUT: TrapVector = TrapVector(0x21);
    /// Write the NUL-terminated string at R0, one character per word.
    pub const PUTS: TrapVector = TrapVector(0x22);
    /// Prompt, read a character into R0 and echo it.
    pub const IN: TrapVector = TrapVector(0x23);
    /// Write the NUL-terminated string at R0, two characters per word.
    pub const PUTSP: TrapVector = TrapVector(0x24);
    /// Stop the machine.
    pub const HALT: TrapVector = TrapVector(0x25);

    /// Assembler alias for the well-known vectors.
    pub const fn name(self) -> Option<&'static str> {
        match self.0 {
            0x20 => Some("GETC"),
            0x21 => Some("OUT"),
            0x22 => Some("PUTS"),
            0x23 => Some("IN"),
            0x24 => Some("PUTSP"),
            0x25 => Some("HALT"),
            _ => None,
        }
    }
}

impl fmt::Display for TrapVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x{:02X}", self.0)
    }
}

/// Execute a TRAP on `machine`.
///
/// `next_pc` is the address after the TRAP; it becomes the return address
/// in R7 when the call goes through the vector table.
pub(crate) fn dispatch_trap(
    machine: &mut Machine,
    vector: TrapVector,
    next_pc: Word,
    io: &mut dyn Console,
) -> Result<Flow, StepFailure> {
    if machine.config.builtin_traps {
        if let Some(flow) = builtin(machine, vector, io)? {
            return Ok(flow);
        }
    }

    let entry = machine
        .config
        .trap_table_base
        .wrapping_add(Word::from(vector.0));
    // Read the table before linking so a bad entry leaves R7 intact.
    let target = machine.mem.read(entry)?;
    tracing::debug!(%vector, entry, target, "trap through vector table");
    machine.regs.write(Register::LINK, next_pc);
    Ok(Flow::Jump(target))
}

/// Run a native service routine. `Ok(None)` means `vector` has none.
fn builtin(
    machine: &mut Machine,
    vector: TrapVector,
    io: &mut dyn Console,
) -> Result<Option<Flow>, StepFailure> {
    match vector {
        TrapVector::GETC => {
            let c = io.read_char();
            machine.regs.write(Register::R0, c.map_or(0, char_to_word));
        }
        TrapVector::OUT => {
            io.write_char(word_to_char(machine.regs.read(Register::R0)));
        }
        TrapVector::PUTS => {
            let text = read_string(machine, false)?;
            io.write_string(&text);
        }
        TrapVector::IN => {
            io.write_string(&machine.config.input_prompt);
            let c = io.read_char();
            if let Some(c) = c {
                io.write_char(c);
            }
            machine.regs.write(Register::R0, c.map_or(0, char_to_word));
        }
        TrapVector::PUTSP => {
            let text = read_string(machine, true)?;
            io.write_string(&text);
        }
        TrapVector::HALT => return Ok(Some(Flow::Halt)),
        _ => return Ok(None),
    }
    tracing::debug!(%vector, "built-in trap serviced");
    Ok(Some(Flow::Next))
}

/// Collect the NUL-terminated string starting at R0.
///
/// Packed strings hold two characters per word, low byte first; a zero
/// high byte also ends the string. Reading stops after one pass over
/// memory so an unterminated string cannot loop forever.
fn read_string(machine: &Machine, packed: bool) -> Result<String, StepFailure> {
    let mut addr = machine.regs.read(Register::R0);
    let mut text = String::new();

    for _ in 0..machine.mem.size() {
        let word = machine.mem.read(addr)?;
        if word == 0 {
            break;
        }
        text.push(word_to_char(word));
        if packed {
            let high = word >> 8;
            if high == 0 {
                break;
            }
            text.push(word_to_char(high));
        }
        addr = addr.wrapping_add(1);
    }

    Ok(text)
}

/// Characters are stored one per word; the low byte is the Latin-1 code.
#[inline]
fn word_to_char(word: Word) -> char {
    char::from((word & 0xFF) as u8)
}

/// Input outside Latin-1 has no byte code and is stored as `'?'`.
#[inline]
fn char_to_word(c: char) -> Word {
    u8::try_from(c).map_or(Word::from(b'?'), Word::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MachineConfig;
    use crate::io::ScriptedConsole;

    fn machine() -> Machine {
        Machine::new()
    }

    #[test]
    fn test_trap_vector_names() {
        assert_eq!(TrapVector::HALT.name(), Some("HALT"));
        assert_eq!(TrapVector(0x30).name(), None);
        assert_eq!(TrapVector(0x25).to_string(), "x25");
    }

    #[test]
    fn test_getc_reads_without_echo() {
        let mut m = machine();
        let mut io = ScriptedConsole::with_input("q");

        let flow = dispatch_trap(&mut m, TrapVector::GETC, 0x3001, &mut io).unwrap();

        assert_eq!(flow, Flow::Next);
        assert_eq!(m.regs.read(Register::R0), u16::from(b'q'));
        assert_eq!(io.output(), "");
    }

    #[test]
    fn test_getc_at_end_of_input_stores_zero() {
        let mut m = machine();
        m.regs.write(Register::R0, 0x41);
        let mut io = ScriptedConsole::new();

        dispatch_trap(&mut m, TrapVector::GETC, 0x3001, &mut io).unwrap();

        assert_eq!(m.regs.read(Register::R0), 0);
    }

    #[test]
    fn test_getc_replaces_characters_outside_latin1() {
        let mut m = machine();
        let mut io = ScriptedConsole::with_input("\u{20AC}\u{E9}");

        dispatch_trap(&mut m, TrapVector::GETC, 0x3001, &mut io).unwrap();
        assert_eq!(m.regs.read(Register::R0), u16::from(b'?'));
        dispatch_trap(&mut m, TrapVector::OUT, 0x3001, &mut io).unwrap();

        dispatch_trap(&mut m, TrapVector::GETC, 0x3001, &mut io).unwrap();
        assert_eq!(m.regs.read(Register::R0), 0x00E9);
        dispatch_trap(&mut m, TrapVector::OUT, 0x3001, &mut io).unwrap();

        assert_eq!(io.output(), "?\u{E9}");
    }

    #[test]
    fn test_in_prompts_and_echoes() {
        let mut m = machine();
        let mut io = ScriptedConsole::with_input("z");

        dispatch_trap(&mut m, TrapVector::IN, 0x3001, &mut io).unwrap();

        assert_eq!(io.output(), format!("{}z", crate::config::DEFAULT_INPUT_PROMPT));
        assert_eq!(m.regs.read(Register::R0), u16::from(b'z'));
    }

    #[test]
    fn test_out_writes_low_byte() {
        let mut m = machine();
        m.regs.write(Register::R0, 0x1F41);
        let mut io = ScriptedConsole::new();

        dispatch_trap(&mut m, TrapVector::OUT, 0x3001, &mut io).unwrap();

        assert_eq!(io.output(), "A");
    }

    #[test]
    fn test_puts_and_putsp() {
        let mut m = machine();
        m.mem.load(0x4000, &[0x48, 0x69, 0x21, 0x00]).unwrap();
        // "Hey" packed: 'H' 'e' in one word, 'y' with a zero high byte.
        m.mem.load(0x5000, &[0x6548, 0x0079, 0x0000]).unwrap();
        let mut io = ScriptedConsole::new();

        m.regs.write(Register::R0, 0x4000);
        dispatch_trap(&mut m, TrapVector::PUTS, 0x3001, &mut io).unwrap();
        m.regs.write(Register::R0, 0x5000);
        dispatch_trap(&mut m, TrapVector::PUTSP, 0x3001, &mut io).unwrap();

        assert_eq!(io.output(), "Hi!Hey");
    }

    #[test]
    fn test_puts_out_of_bounds() {
        let mut m = Machine::with_config(MachineConfig {
            memory_size: 0x10,
            ..MachineConfig::default()
        })
        .unwrap();
        m.mem.load(0x0E, &[0x41, 0x42]).unwrap();
        m.regs.write(Register::R0, 0x0E);
        let mut io = ScriptedConsole::new();

        let err = dispatch_trap(&mut m, TrapVector::PUTS, 0x01, &mut io).unwrap_err();

        assert_eq!(err, StepFailure::MemoryAddressOutOfBounds(0x10));
        assert_eq!(io.output(), "");
    }

    #[test]
    fn test_halt() {
        let mut m = machine();
        let mut io = ScriptedConsole::new();
        let flow = dispatch_trap(&mut m, TrapVector::HALT, 0x3001, &mut io).unwrap();
        assert_eq!(flow, Flow::Halt);
    }

    #[test]
    fn test_user_vector_goes_through_table() {
        let mut m = machine();
        m.mem.write(0x0040, 0x1000).unwrap();
        let mut io = ScriptedConsole::new();

        let flow = dispatch_trap(&mut m, TrapVector(0x40), 0x3001, &mut io).unwrap();

        assert_eq!(flow, Flow::Jump(0x1000));
        assert_eq!(m.regs.read(Register::R7), 0x3001);
    }

    #[test]
    fn test_builtins_disabled_uses_table_for_halt() {
        let mut m = Machine::with_config(MachineConfig {
            builtin_traps: false,
            ..MachineConfig::default()
        })
        .unwrap();
        m.mem.write(0x0025, 0x0520).unwrap();
        let mut io = ScriptedConsole::new();

        let flow = dispatch_trap(&mut m, TrapVector::HALT, 0x3001, &mut io).unwrap();

        assert_eq!(flow, Flow::Jump(0x0520));
        assert_eq!(m.regs.read(Register::R7), 0x3001);
    }

    #[test]
    fn test_table_read_out_of_bounds_keeps_link() {
        let mut m = Machine::with_config(MachineConfig {
            memory_size: 0x20,
            trap_table_base: 0x0010,
            ..MachineConfig::default()
        })
        .unwrap();
        m.regs.write(Register::R7, 0xBEEF);
        let mut io = ScriptedConsole::new();

        let err = dispatch_trap(&mut m, TrapVector(0x30), 0x0001, &mut io).unwrap_err();

        assert_eq!(err, StepFailure::MemoryAddressOutOfBounds(0x0040));
        assert_eq!(m.regs.read(Register::R7), 0xBEEF);
    }
}
