//! Instruction decoder for the LC-3.
//!
//! Every instruction is a single 16-bit word. Bits 15-12 select the
//! opcode; the remaining twelve bits are split into register fields,
//! immediates and PC offsets depending on the opcode.
//!
//! Decoding is total. Words that do not name a supported instruction,
//! including encodings with wrong fixed bits, become
//! [`Instruction::Reserved`] and fail only when executed.

use crate::cpu::registers::{ConditionCodes, Register};
use crate::cpu::trap::TrapVector;
use crate::word::fields::{
    self, bit, bits, dr, opcode, sign_extend, sr1, sr2, truncate, IMM5, OFFSET6, PC_OFFSET11,
    PC_OFFSET9, TRAP_VECT8,
};
use crate::word::{SignedWord, Word};
use serde::{Deserialize, Serialize};

// ============================================================================
// Operand shapes
// ============================================================================

/// Three-register form: `DR <- SR1 op SR2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegisterOperands {
    pub dest: Register,
    pub src1: Register,
    pub src2: Register,
}

/// Register plus 5-bit immediate form: `DR <- SR1 op imm5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImmediateOperands {
    pub dest: Register,
    pub src1: Register,
    /// Sign-extended immediate, `-16..=15`.
    pub imm: SignedWord,
}

/// Second-operand selection for ADD and AND (bit 5 of the encoding).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AluOperands {
    Register(RegisterOperands),
    Immediate(ImmediateOperands),
}

/// Two-register form used by NOT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnaryOperands {
    pub dest: Register,
    pub src: Register,
}

/// Register plus 9-bit PC offset, used by LD, LDI, LEA, ST and STI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PcOffsetOperands {
    /// Destination for loads, source for stores.
    pub reg: Register,
    /// Sign-extended offset from the incremented PC, `-256..=255`.
    pub offset: SignedWord,
}

/// Register plus base register plus 6-bit offset, used by LDR and STR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BaseOffsetOperands {
    /// Destination for LDR, source for STR.
    pub reg: Register,
    pub base: Register,
    /// Sign-extended offset from the base register, `-32..=31`.
    pub offset: SignedWord,
}

/// The `nzp` bits of a BR instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BranchMask {
    pub n: bool,
    pub z: bool,
    pub p: bool,
}

impl BranchMask {
    /// Mask that matches every condition (`BR` / `BRnzp`).
    pub const ALWAYS: BranchMask = BranchMask { n: true, z: true, p: true };
    /// Mask that never matches (an encoded no-op).
    pub const NEVER: BranchMask = BranchMask { n: false, z: false, p: false };

    /// Build from the 3-bit `nzp` field (n is the high bit).
    pub const fn from_bits(nzp: Word) -> Self {
        Self {
            n: nzp & 0b100 != 0,
            z: nzp & 0b010 != 0,
            p: nzp & 0b001 != 0,
        }
    }

    /// The 3-bit `nzp` field.
    pub const fn to_bits(self) -> Word {
        ((self.n as Word) << 2) | ((self.z as Word) << 1) | (self.p as Word)
    }

    /// Whether a branch with this mask is taken under `cc`.
    pub const fn matches(self, cc: ConditionCodes) -> bool {
        (self.n && cc.negative()) || (self.z && cc.zero()) || (self.p && cc.positive())
    }
}

/// BR operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BranchOperands {
    pub mask: BranchMask,
    /// Sign-extended offset from the incremented PC, `-256..=255`.
    pub offset: SignedWord,
}

/// Target selection for JSR / JSRR (bit 11 of the encoding).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubroutineTarget {
    /// JSR: 11-bit offset from the incremented PC, `-1024..=1023`.
    PcRelative { offset: SignedWord },
    /// JSRR: address held in a base register.
    Register(Register),
}

// ============================================================================
// Instruction
// ============================================================================

/// A decoded LC-3 instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Instruction {
    /// `DR <- SR1 + (SR2 | imm5)`
    Add(AluOperands),
    /// `DR <- SR1 & (SR2 | imm5)`
    And(AluOperands),
    /// `DR <- !SR`
    Not(UnaryOperands),
    /// Conditional PC-relative branch.
    Branch(BranchOperands),
    /// `PC <- BaseR` (RET is `JMP R7`).
    Jump { base: Register },
    /// `R7 <- PC; PC <- target`
    JumpSubroutine(SubroutineTarget),
    /// LD: `DR <- mem[PC + offset9]`
    Load(PcOffsetOperands),
    /// LDI: `DR <- mem[mem[PC + offset9]]`
    LoadIndirect(PcOffsetOperands),
    /// LDR: `DR <- mem[BaseR + offset6]`
    LoadBaseOffset(BaseOffsetOperands),
    /// LEA: `DR <- PC + offset9`
    LoadEffectiveAddress(PcOffsetOperands),
    /// ST: `mem[PC + offset9] <- SR`
    Store(PcOffsetOperands),
    /// STI: `mem[mem[PC + offset9]] <- SR`
    StoreIndirect(PcOffsetOperands),
    /// STR: `mem[BaseR + offset6] <- SR`
    StoreBaseOffset(BaseOffsetOperands),
    /// System call through the trap vector table.
    Trap(TrapVector),
    /// Reserved opcode or malformed encoding; illegal to execute.
    Reserved { word: Word },
}

impl Instruction {
    /// Whether this is the reserved / illegal variant.
    pub const fn is_reserved(&self) -> bool {
        matches!(self, Instruction::Reserved { .. })
    }

    /// The absolute address a PC-relative operand refers to, for an
    /// instruction fetched from `pc`.
    ///
    /// Returns `None` for instructions without a PC-relative operand.
    pub fn target(&self, pc: Word) -> Option<Word> {
        let offset = match self {
            Instruction::Branch(ops) => ops.offset,
            Instruction::Load(ops)
            | Instruction::LoadIndirect(ops)
            | Instruction::LoadEffectiveAddress(ops)
            | Instruction::Store(ops)
            | Instruction::StoreIndirect(ops) => ops.offset,
            Instruction::JumpSubroutine(SubroutineTarget::PcRelative { offset }) => *offset,
            _ => return None,
        };
        Some(pc.wrapping_add(1).wrapping_add_signed(offset))
    }
}

/// Opcode values, `IR[15:12]`.
#[derive(Debug, Clone, Copy)]
struct Opcode;

impl Opcode {
    const BR: Word = 0b0000;
    const ADD: Word = 0b0001;
    const LD: Word = 0b0010;
    const ST: Word = 0b0011;
    const JSR: Word = 0b0100;
    const AND: Word = 0b0101;
    const LDR: Word = 0b0110;
    const STR: Word = 0b0111;
    const NOT: Word = 0b1001;
    const LDI: Word = 0b1010;
    const STI: Word = 0b1011;
    const JMP: Word = 0b1100;
    const LEA: Word = 0b1110;
    const TRAP: Word = 0b1111;
    // 0b1000 (RTI) and 0b1101 are not executable here and decode as reserved.
}

// ============================================================================
// Decode
// ============================================================================

/// Decode a 16-bit instruction word.
///
/// Never fails: unknown opcodes and malformed encodings produce
/// [`Instruction::Reserved`] carrying the raw word.
pub fn decode(word: Word) -> Instruction {
    let decoded = match opcode(word) {
        Opcode::BR => Some(Instruction::Branch(BranchOperands {
            mask: BranchMask::from_bits(dr(word)),
            offset: sign_extend(word, PC_OFFSET9),
        })),
        Opcode::ADD => decode_alu(word).map(Instruction::Add),
        Opcode::AND => decode_alu(word).map(Instruction::And),
        Opcode::NOT => (bits(word, 5, 0) == 0b11_1111).then(|| {
            Instruction::Not(UnaryOperands {
                dest: Register::from_field(dr(word)),
                src: Register::from_field(sr1(word)),
            })
        }),
        Opcode::JMP => (dr(word) == 0 && bits(word, 5, 0) == 0).then(|| Instruction::Jump {
            base: Register::from_field(sr1(word)),
        }),
        Opcode::JSR => decode_jsr(word).map(Instruction::JumpSubroutine),
        Opcode::LD => Some(Instruction::Load(pc_offset_operands(word))),
        Opcode::LDI => Some(Instruction::LoadIndirect(pc_offset_operands(word))),
        Opcode::LEA => Some(Instruction::LoadEffectiveAddress(pc_offset_operands(word))),
        Opcode::ST => Some(Instruction::Store(pc_offset_operands(word))),
        Opcode::STI => Some(Instruction::StoreIndirect(pc_offset_operands(word))),
        Opcode::LDR => Some(Instruction::LoadBaseOffset(base_offset_operands(word))),
        Opcode::STR => Some(Instruction::StoreBaseOffset(base_offset_operands(word))),
        Opcode::TRAP => (bits(word, 11, 8) == 0)
            .then(|| Instruction::Trap(TrapVector(bits(word, 7, 0) as u8))),
        _ => None,
    };

    decoded.unwrap_or(Instruction::Reserved { word })
}

/// ADD / AND operand layout, selected by bit 5.
fn decode_alu(word: Word) -> Option<AluOperands> {
    let dest = Register::from_field(dr(word));
    let src1 = Register::from_field(sr1(word));

    if bit(word, 5) {
        Some(AluOperands::Immediate(ImmediateOperands {
            dest,
            src1,
            imm: sign_extend(word, IMM5),
        }))
    } else if bits(word, 4, 3) == 0 {
        Some(AluOperands::Register(RegisterOperands {
            dest,
            src1,
            src2: Register::from_field(sr2(word)),
        }))
    } else {
        None
    }
}

/// JSR / JSRR layout, selected by bit 11.
fn decode_jsr(word: Word) -> Option<SubroutineTarget> {
    if bit(word, 11) {
        Some(SubroutineTarget::PcRelative {
            offset: sign_extend(word, PC_OFFSET11),
        })
    } else if bits(word, 10, 9) == 0 && bits(word, 5, 0) == 0 {
        Some(SubroutineTarget::Register(Register::from_field(sr1(word))))
    } else {
        None
    }
}

fn pc_offset_operands(word: Word) -> PcOffsetOperands {
    PcOffsetOperands {
        reg: Register::from_field(dr(word)),
        offset: sign_extend(word, PC_OFFSET9),
    }
}

fn base_offset_operands(word: Word) -> BaseOffsetOperands {
    BaseOffsetOperands {
        reg: Register::from_field(dr(word)),
        base: Register::from_field(sr1(word)),
        offset: sign_extend(word, OFFSET6),
    }
}

// ============================================================================
// Encode
// ============================================================================

/// Encode an instruction back to its 16-bit word.
///
/// Immediates and offsets are truncated to their field width, so an
/// instruction built by hand with an out-of-range offset encodes to the
/// wrapped value. `Reserved` encodes to the word it was decoded from.
pub fn encode(instr: &Instruction) -> Word {
    match *instr {
        Instruction::Add(ops) => encode_alu(Opcode::ADD, ops),
        Instruction::And(ops) => encode_alu(Opcode::AND, ops),
        Instruction::Not(UnaryOperands { dest, src }) => {
            let word = with_registers(Opcode::NOT, dest, src);
            fields::insert(word, 0b11_1111, 5, 0)
        }
        Instruction::Branch(BranchOperands { mask, offset }) => {
            let word = fields::insert(Opcode::BR << 12, mask.to_bits(), 11, 9);
            word | truncate(offset, PC_OFFSET9)
        }
        Instruction::Jump { base } => fields::insert(Opcode::JMP << 12, register_bits(base), 8, 6),
        Instruction::JumpSubroutine(SubroutineTarget::PcRelative { offset }) => {
            (Opcode::JSR << 12) | (1 << 11) | truncate(offset, PC_OFFSET11)
        }
        Instruction::JumpSubroutine(SubroutineTarget::Register(base)) => {
            fields::insert(Opcode::JSR << 12, register_bits(base), 8, 6)
        }
        Instruction::Load(ops) => encode_pc_offset(Opcode::LD, ops),
        Instruction::LoadIndirect(ops) => encode_pc_offset(Opcode::LDI, ops),
        Instruction::LoadEffectiveAddress(ops) => encode_pc_offset(Opcode::LEA, ops),
        Instruction::Store(ops) => encode_pc_offset(Opcode::ST, ops),
        Instruction::StoreIndirect(ops) => encode_pc_offset(Opcode::STI, ops),
        Instruction::LoadBaseOffset(ops) => encode_base_offset(Opcode::LDR, ops),
        Instruction::StoreBaseOffset(ops) => encode_base_offset(Opcode::STR, ops),
        Instruction::Trap(TrapVector(vector)) => {
            (Opcode::TRAP << 12) | (Word::from(vector) & fields::mask(TRAP_VECT8))
        }
        Instruction::Reserved { word } => word,
    }
}

#[inline]
fn register_bits(reg: Register) -> Word {
    Word::from(reg.index())
}

/// Opcode plus the `[11:9]` and `[8:6]` register fields.
fn with_registers(op: Word, r1: Register, r2: Register) -> Word {
    let word = fields::insert(op << 12, register_bits(r1), 11, 9);
    fields::insert(word, register_bits(r2), 8, 6)
}

fn encode_alu(op: Word, ops: AluOperands) -> Word {
    match ops {
        AluOperands::Register(RegisterOperands { dest, src1, src2 }) => {
            with_registers(op, dest, src1) | register_bits(src2)
        }
        AluOperands::Immediate(ImmediateOperands { dest, src1, imm }) => {
            with_registers(op, dest, src1) | (1 << 5) | truncate(imm, IMM5)
        }
    }
}

fn encode_pc_offset(op: Word, ops: PcOffsetOperands) -> Word {
    fields::insert(op << 12, register_bits(ops.reg), 11, 9) | truncate(ops.offset, PC_OFFSET9)
}

fn encode_base_offset(op: Word, ops: BaseOffsetOperands) -> Word {
    with_registers(op, ops.reg, ops.base) | truncate(ops.offset, OFFSET6)
}
