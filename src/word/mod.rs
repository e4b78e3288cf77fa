//! 16-bit word primitives.
//!
//! Every LC-3 instruction, register and memory cell is a 16-bit word.
//! This module provides:
//! - [`Word`] / [`SignedWord`] - aliases used throughout the crate
//! - [`fields`] - bit-field extraction, insertion and sign extension

pub mod fields;

pub use fields::{bit, bits, insert, opcode, sign_extend, truncate};

/// An unsigned 16-bit machine word (memory cell, register, address).
pub type Word = u16;

/// The two's-complement view of a [`Word`].
pub type SignedWord = i16;

/// Number of bits in a machine word.
pub const WORD_BITS: u32 = Word::BITS;
