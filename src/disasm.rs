//! Disassembler for LC-3 programs.
//!
//! Converts instruction words back to readable assembly.

use crate::cpu::decode::{
    decode, AluOperands, BaseOffsetOperands, BranchOperands, ImmediateOperands, Instruction,
    PcOffsetOperands, RegisterOperands, SubroutineTarget, UnaryOperands,
};
use crate::cpu::registers::Register;
use crate::word::{SignedWord, Word};

/// Disassemble a single word.
///
/// Without a load address, PC-relative operands are shown as offsets.
pub fn disassemble_word(word: Word) -> String {
    format_instruction(&decode(word), None)
}

/// Disassemble a word fetched from `pc`, resolving PC-relative operands
/// to absolute addresses.
pub fn disassemble_at(pc: Word, word: Word) -> String {
    format_instruction(&decode(word), Some(pc))
}

/// Disassemble a block of words loaded at `origin`.
pub fn disassemble(origin: Word, words: &[Word]) -> String {
    let mut output = String::new();
    output.push_str("; LC-3 Disassembly\n");
    output.push_str("; ----------------\n\n");

    let mut pc = origin;
    for &word in words {
        let line = disassemble_at(pc, word);
        output.push_str(&format!("x{:04X}: {}  ; x{:04X}\n", pc, line, word));
        pc = pc.wrapping_add(1);
    }

    output
}

/// Format a decoded instruction as assembly text.
fn format_instruction(instr: &Instruction, pc: Option<Word>) -> String {
    let target = |offset: SignedWord| match pc.and_then(|pc| instr.target(pc)) {
        Some(addr) => format!("x{addr:04X}"),
        None => format_offset(offset),
    };

    match *instr {
        Instruction::Add(ops) => format!("ADD {}", format_alu(ops)),
        Instruction::And(ops) => format!("AND {}", format_alu(ops)),
        Instruction::Not(UnaryOperands { dest, src }) => format!("NOT {dest}, {src}"),

        Instruction::Branch(BranchOperands { mask, offset }) => {
            if !(mask.n || mask.z || mask.p) {
                return "NOP".to_string();
            }
            let mut name = String::from("BR");
            if mask.n {
                name.push('n');
            }
            if mask.z {
                name.push('z');
            }
            if mask.p {
                name.push('p');
            }
            format!("{name} {}", target(offset))
        }

        Instruction::Jump { base: Register::R7 } => "RET".to_string(),
        Instruction::Jump { base } => format!("JMP {base}"),
        Instruction::JumpSubroutine(SubroutineTarget::PcRelative { offset }) => {
            format!("JSR {}", target(offset))
        }
        Instruction::JumpSubroutine(SubroutineTarget::Register(base)) => format!("JSRR {base}"),

        Instruction::Load(PcOffsetOperands { reg, offset }) => {
            format!("LD {reg}, {}", target(offset))
        }
        Instruction::LoadIndirect(PcOffsetOperands { reg, offset }) => {
            format!("LDI {reg}, {}", target(offset))
        }
        Instruction::LoadEffectiveAddress(PcOffsetOperands { reg, offset }) => {
            format!("LEA {reg}, {}", target(offset))
        }
        Instruction::Store(PcOffsetOperands { reg, offset }) => {
            format!("ST {reg}, {}", target(offset))
        }
        Instruction::StoreIndirect(PcOffsetOperands { reg, offset }) => {
            format!("STI {reg}, {}", target(offset))
        }
        Instruction::LoadBaseOffset(BaseOffsetOperands { reg, base, offset }) => {
            format!("LDR {reg}, {base}, {}", format_offset(offset))
        }
        Instruction::StoreBaseOffset(BaseOffsetOperands { reg, base, offset }) => {
            format!("STR {reg}, {base}, {}", format_offset(offset))
        }

        Instruction::Trap(vector) => match vector.name() {
            Some(name) => name.to_string(),
            None => format!("TRAP {vector}"),
        },

        Instruction::Reserved { word } => format!(".FILL x{word:04X}"),
    }
}

fn format_alu(ops: AluOperands) -> String {
    match ops {
        AluOperands::Register(RegisterOperands { dest, src1, src2 }) => {
            format!("{dest}, {src1}, {src2}")
        }
        AluOperands::Immediate(ImmediateOperands { dest, src1, imm }) => {
            format!("{dest}, {src1}, {}", format_offset(imm))
        }
    }
}

fn format_offset(value: SignedWord) -> String {
    format!("#{value}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disassemble_alu() {
        assert_eq!(disassemble_word(0x1220), "ADD R1, R0, #0");
        assert_eq!(disassemble_word(0x14C4), "ADD R2, R3, R4");
        assert_eq!(disassemble_word(0x503F), "AND R0, R0, #-1");
        assert_eq!(disassemble_word(0x98FF), "NOT R4, R3");
    }

    #[test]
    fn test_disassemble_traps() {
        assert_eq!(disassemble_word(0xF025), "HALT");
        assert_eq!(disassemble_word(0xF022), "PUTS");
        assert_eq!(disassemble_word(0xF030), "TRAP x30");
    }

    #[test]
    fn test_disassemble_reserved() {
        assert_eq!(disassemble_word(0xD123), ".FILL xD123");
        assert_eq!(disassemble_word(0x8000), ".FILL x8000");
    }

    #[test]
    fn test_branch_offsets_and_targets() {
        // BRnz #-1
        assert_eq!(disassemble_word(0x0DFF), "BRnz #-1");
        assert_eq!(disassemble_at(0x3002, 0x0DFF), "BRnz x3002");
        assert_eq!(disassemble_word(0x0000), "NOP");
        assert_eq!(disassemble_word(0x0E01), "BRnzp #1");
    }

    #[test]
    fn test_control_and_memory() {
        assert_eq!(disassemble_word(0xC1C0), "RET");
        assert_eq!(disassemble_word(0xC140), "JMP R5");
        assert_eq!(disassemble_word(0x4080), "JSRR R2");
        assert_eq!(disassemble_at(0x3000, 0x4805), "JSR x3006");
        assert_eq!(disassemble_at(0x3000, 0x2005), "LD R0, x3006");
        assert_eq!(disassemble_word(0x66BF), "LDR R3, R2, #-1");
        assert_eq!(disassemble_word(0x7042), "STR R0, R1, #2");
    }

    #[test]
    fn test_disassemble_block() {
        let text = disassemble(0x3000, &[0xE002, 0xF022, 0xF025]);
        assert!(text.contains("x3000: LEA R0, x3003  ; xE002"));
        assert!(text.contains("x3001: PUTS"));
        assert!(text.contains("x3002: HALT  ; xF025"));
    }

    #[test]
    fn test_disassemble_block_layout() {
        let text = disassemble(0xFFFF, &[0x1220, 0xF025]);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            [
                "; LC-3 Disassembly",
                "; ----------------",
                "",
                "xFFFF: ADD R1, R0, #0  ; x1220",
                "x0000: HALT  ; xF025",
            ]
        );
        assert!(text.ends_with('\n'));
    }
}
