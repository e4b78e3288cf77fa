//! Execution engine for the LC-3.
//!
//! Implements the fetch-decode-execute cycle and all instruction behaviors.
//!
//! A step either retires one instruction (`Continued` / `Halted`) or
//! reports exactly one [`StepFailure`]. Writes are applied eagerly, in the
//! order the instruction performs them, and are not rolled back when a
//! later part of the same instruction faults; the PC, however, is only
//! committed on success, so after a failure it still points at the
//! faulting instruction.

use crate::config::{ConfigError, MachineConfig};
use crate::cpu::decode::{
    self, AluOperands, BaseOffsetOperands, BranchOperands, ImmediateOperands, Instruction,
    PcOffsetOperands, RegisterOperands, SubroutineTarget, UnaryOperands,
};
use crate::cpu::memory::{AddressOutOfBounds, LoadError, Memory};
use crate::cpu::registers::{ConditionCodes, InvalidRegisterAddress, Register, Registers};
use crate::cpu::trap;
use crate::io::Console;
use crate::word::Word;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Whether the machine accepts further steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RunState {
    /// Executing normally.
    #[default]
    Running,
    /// A HALT trap retired; steps are refused until [`Machine::resume`].
    Halted,
}

/// Why a step did not complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
pub enum StepFailure {
    /// The fetched word is a reserved opcode or a malformed encoding.
    #[error("illegal opcode in instruction {0:#06x}")]
    IllegalOpcode(Word),

    /// A register index outside R0-R7 was referenced.
    #[error("invalid register address {0}")]
    InvalidRegisterAddress(u8),

    /// An access fell outside the configured memory.
    #[error("memory address {0:#06x} is out of bounds")]
    MemoryAddressOutOfBounds(Word),
}

impl From<AddressOutOfBounds> for StepFailure {
    fn from(err: AddressOutOfBounds) -> Self {
        StepFailure::MemoryAddressOutOfBounds(err.0)
    }
}

impl From<InvalidRegisterAddress> for StepFailure {
    fn from(err: InvalidRegisterAddress) -> Self {
        StepFailure::InvalidRegisterAddress(err.0)
    }
}

/// Result of one fetch-decode-execute cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepOutcome {
    /// The instruction retired; the machine can step again.
    Continued,
    /// The HALT trap retired (or the machine was already halted).
    Halted,
    /// The instruction faulted.
    Failed(StepFailure),
}

impl StepOutcome {
    /// Whether stepping again would make progress.
    pub const fn is_continued(&self) -> bool {
        matches!(self, StepOutcome::Continued)
    }
}

/// How an instruction leaves the PC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    /// Fall through to the next word.
    Next,
    /// Transfer control to an absolute address.
    Jump(Word),
    /// Fall through and stop the machine.
    Halt,
}

/// Summary of a bounded run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Instructions retired during the run.
    pub steps: u64,
    /// The last step outcome; `Continued` means the step limit was reached.
    pub outcome: StepOutcome,
}

/// A complete LC-3 machine: registers, memory and run state.
///
/// Serializable for inspection; rebuild machines with [`Machine::with_config`]
/// so the configuration is validated.
#[derive(Clone, Debug, Serialize)]
pub struct Machine {
    pub(crate) regs: Registers,
    pub(crate) mem: Memory,
    pub(crate) config: MachineConfig,
    state: RunState,
    steps: u64,
    last_instr: Option<Instruction>,
}

impl Machine {
    /// Create a stock machine: 64K zeroed memory, PC at x3000.
    pub fn new() -> Self {
        Self::build(MachineConfig::default())
    }

    /// Create a machine with a custom configuration.
    pub fn with_config(config: MachineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: MachineConfig) -> Self {
        let mut regs = Registers::new();
        regs.set_pc(config.reset_pc);
        Self {
            regs,
            mem: Memory::with_size(config.memory_size),
            config,
            state: RunState::Running,
            steps: 0,
            last_instr: None,
        }
    }

    /// Reset registers, memory and counters to the power-on state.
    pub fn reset(&mut self) {
        self.regs.reset();
        self.regs.set_pc(self.config.reset_pc);
        self.mem.clear();
        self.state = RunState::Running;
        self.steps = 0;
        self.last_instr = None;
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// Copy a contiguous image to `origin` and point the PC at it.
    pub fn load_image(&mut self, origin: Word, image: &[Word]) -> Result<(), LoadError> {
        self.mem.load(origin, image)?;
        self.regs.set_pc(origin);
        tracing::debug!(origin, len = image.len(), "image loaded");
        Ok(())
    }

    /// Write a sparse `(address, word)` image. The PC is left unchanged.
    ///
    /// Stops at the first address outside memory; earlier words stay written.
    pub fn load_words<I>(&mut self, words: I) -> Result<(), LoadError>
    where
        I: IntoIterator<Item = (Word, Word)>,
    {
        for (addr, value) in words {
            self.mem.write(addr, value)?;
        }
        Ok(())
    }

    // ========================================================================
    // Execution
    // ========================================================================

    /// Execute a single instruction.
    pub fn step(&mut self, io: &mut dyn Console) -> StepOutcome {
        if self.state == RunState::Halted {
            return StepOutcome::Halted;
        }

        let pc = self.regs.pc();
        match self.try_step(pc, io) {
            Ok(Flow::Halt) => {
                self.state = RunState::Halted;
                tracing::info!(pc, steps = self.steps, "machine halted");
                StepOutcome::Halted
            }
            Ok(_) => StepOutcome::Continued,
            Err(failure) => {
                tracing::warn!(pc, %failure, "step failed");
                StepOutcome::Failed(failure)
            }
        }
    }

    /// Step until the machine halts, faults, or `max_steps` instructions
    /// have retired.
    pub fn run_limited(&mut self, io: &mut dyn Console, max_steps: u64) -> RunSummary {
        let start = self.steps;
        let mut outcome = StepOutcome::Continued;

        while self.steps - start < max_steps {
            outcome = self.step(io);
            if !outcome.is_continued() {
                break;
            }
        }

        RunSummary {
            steps: self.steps - start,
            outcome,
        }
    }

    /// Clear a halt so stepping continues after the HALT instruction.
    pub fn resume(&mut self) {
        self.state = RunState::Running;
    }

    fn try_step(&mut self, pc: Word, io: &mut dyn Console) -> Result<Flow, StepFailure> {
        let word = self.mem.read(pc)?;
        let next_pc = pc.wrapping_add(1);
        let instr = decode::decode(word);
        tracing::trace!(pc, word, ?instr, "execute");

        let flow = self.execute(instr, next_pc, io)?;

        self.regs.set_pc(match flow {
            Flow::Jump(target) => target,
            Flow::Next | Flow::Halt => next_pc,
        });
        self.steps += 1;
        self.last_instr = Some(instr);
        Ok(flow)
    }

    /// Apply a decoded instruction. `next_pc` is the incremented PC.
    fn execute(
        &mut self,
        instr: Instruction,
        next_pc: Word,
        io: &mut dyn Console,
    ) -> Result<Flow, StepFailure> {
        match instr {
            Instruction::Add(ops) => {
                let (dest, a, b) = self.alu_operands(ops);
                self.regs.write(dest, a.wrapping_add(b));
            }

            Instruction::And(ops) => {
                let (dest, a, b) = self.alu_operands(ops);
                self.regs.write(dest, a & b);
            }

            Instruction::Not(UnaryOperands { dest, src }) => {
                let value = !self.regs.read(src);
                self.regs.write(dest, value);
            }

            Instruction::Branch(BranchOperands { mask, offset }) => {
                if mask.matches(self.regs.cc()) {
                    return Ok(Flow::Jump(next_pc.wrapping_add_signed(offset)));
                }
            }

            Instruction::Jump { base } => {
                return Ok(Flow::Jump(self.regs.read(base)));
            }

            Instruction::JumpSubroutine(target) => {
                // Resolve before linking: JSRR R7 jumps to the old R7.
                let target = match target {
                    SubroutineTarget::PcRelative { offset } => next_pc.wrapping_add_signed(offset),
                    SubroutineTarget::Register(base) => self.regs.read(base),
                };
                self.regs.write(Register::LINK, next_pc);
                return Ok(Flow::Jump(target));
            }

            Instruction::Load(PcOffsetOperands { reg, offset }) => {
                let value = self.mem.read(next_pc.wrapping_add_signed(offset))?;
                self.regs.write(reg, value);
            }

            Instruction::LoadIndirect(PcOffsetOperands { reg, offset }) => {
                let pointer = self.mem.read(next_pc.wrapping_add_signed(offset))?;
                let value = self.mem.read(pointer)?;
                self.regs.write(reg, value);
            }

            Instruction::LoadBaseOffset(BaseOffsetOperands { reg, base, offset }) => {
                let addr = self.regs.read(base).wrapping_add_signed(offset);
                let value = self.mem.read(addr)?;
                self.regs.write(reg, value);
            }

            Instruction::LoadEffectiveAddress(PcOffsetOperands { reg, offset }) => {
                self.regs.write(reg, next_pc.wrapping_add_signed(offset));
            }

            Instruction::Store(PcOffsetOperands { reg, offset }) => {
                let value = self.regs.read(reg);
                self.mem.write(next_pc.wrapping_add_signed(offset), value)?;
            }

            Instruction::StoreIndirect(PcOffsetOperands { reg, offset }) => {
                let pointer = self.mem.read(next_pc.wrapping_add_signed(offset))?;
                let value = self.regs.read(reg);
                self.mem.write(pointer, value)?;
            }

            Instruction::StoreBaseOffset(BaseOffsetOperands { reg, base, offset }) => {
                let addr = self.regs.read(base).wrapping_add_signed(offset);
                let value = self.regs.read(reg);
                self.mem.write(addr, value)?;
            }

            Instruction::Trap(vector) => {
                return trap::dispatch_trap(self, vector, next_pc, io);
            }

            Instruction::Reserved { word } => {
                return Err(StepFailure::IllegalOpcode(word));
            }
        }

        Ok(Flow::Next)
    }

    /// Destination and both source values for ADD / AND.
    fn alu_operands(&self, ops: AluOperands) -> (Register, Word, Word) {
        match ops {
            AluOperands::Register(RegisterOperands { dest, src1, src2 }) => {
                (dest, self.regs.read(src1), self.regs.read(src2))
            }
            AluOperands::Immediate(ImmediateOperands { dest, src1, imm }) => {
                (dest, self.regs.read(src1), imm as Word)
            }
        }
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    /// The register file.
    pub fn registers(&self) -> &Registers {
        &self.regs
    }

    /// Mutable register file, for loaders and debuggers.
    pub fn registers_mut(&mut self) -> &mut Registers {
        &mut self.regs
    }

    /// Main memory.
    pub fn memory(&self) -> &Memory {
        &self.mem
    }

    /// Mutable memory, for loaders and debuggers.
    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.mem
    }

    /// The active configuration.
    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    /// Current program counter.
    pub fn pc(&self) -> Word {
        self.regs.pc()
    }

    /// Current condition codes.
    pub fn condition_codes(&self) -> ConditionCodes {
        self.regs.cc()
    }

    /// Read a register by index, as a debugger would.
    pub fn register(&self, index: u8) -> Result<Word, StepFailure> {
        Ok(self.regs.read_index(index)?)
    }

    /// Current run state.
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Check if the machine is halted.
    pub fn is_halted(&self) -> bool {
        self.state == RunState::Halted
    }

    /// Instructions retired since creation or the last reset.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Get the last retired instruction.
    pub fn last_instruction(&self) -> Option<Instruction> {
        self.last_instr
    }

    /// Capture the register-level state for display or serialization.
    pub fn snapshot(&self) -> MachineSnapshot {
        MachineSnapshot {
            registers: *self.regs.general(),
            pc: self.regs.pc(),
            cc: self.regs.cc(),
            state: self.state,
            steps: self.steps,
        }
    }
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}

/// Register-level view of a machine at a step boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineSnapshot {
    pub registers: [Word; 8],
    pub pc: Word,
    pub cc: ConditionCodes,
    pub state: RunState,
    pub steps: u64,
}

impl MachineSnapshot {
    /// Render as a JSON object.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
