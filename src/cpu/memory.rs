//! LC-3 memory subsystem.
//!
//! The architecture defines a flat space of 65,536 sixteen-bit words.
//! A smaller backing store can be configured (mostly for tests); any
//! access at or beyond its size is reported as [`AddressOutOfBounds`]
//! instead of being silently wrapped.

use crate::word::Word;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Number of addressable words in the full LC-3 address space.
pub const ADDRESS_SPACE_SIZE: usize = 1 << 16;

/// A data access beyond the configured memory size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[error("memory address {0:#06x} is out of bounds")]
pub struct AddressOutOfBounds(pub Word);

/// Errors raised while placing an image in memory.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// The image does not fit between its origin and the end of memory.
    #[error("image of {len} words at {origin:#06x} does not fit in {size}-word memory")]
    ImageTooLarge { origin: Word, len: usize, size: usize },

    /// A sparse image referenced an address beyond the end of memory.
    #[error(transparent)]
    OutOfBounds(#[from] AddressOutOfBounds),
}

/// Word-addressed LC-3 memory.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memory {
    cells: Vec<Word>,
}

impl Memory {
    /// Create a full 64K-word memory with all cells zeroed.
    pub fn new() -> Self {
        Self::with_size(ADDRESS_SPACE_SIZE)
    }

    /// Create a zeroed memory of `size` words.
    ///
    /// `size` is clamped to `1..=65536`; [`crate::MachineConfig::validate`]
    /// rejects out-of-range sizes before they get here.
    pub fn with_size(size: usize) -> Self {
        Self {
            cells: vec![0; size.clamp(1, ADDRESS_SPACE_SIZE)],
        }
    }

    /// Number of words in the backing store.
    #[inline]
    pub fn size(&self) -> usize {
        self.cells.len()
    }

    /// Read the word at `addr`.
    #[inline]
    pub fn read(&self, addr: Word) -> Result<Word, AddressOutOfBounds> {
        self.cells
            .get(usize::from(addr))
            .copied()
            .ok_or(AddressOutOfBounds(addr))
    }

    /// Write `value` to `addr`.
    #[inline]
    pub fn write(&mut self, addr: Word, value: Word) -> Result<(), AddressOutOfBounds> {
        let cell = self
            .cells
            .get_mut(usize::from(addr))
            .ok_or(AddressOutOfBounds(addr))?;
        *cell = value;
        Ok(())
    }

    /// Clear all memory to zeros.
    pub fn clear(&mut self) {
        self.cells.fill(0);
    }

    /// Copy a contiguous image into memory starting at `origin`.
    pub fn load(&mut self, origin: Word, image: &[Word]) -> Result<(), LoadError> {
        let start = usize::from(origin);
        let end = start + image.len();
        if end > self.cells.len() {
            return Err(LoadError::ImageTooLarge {
                origin,
                len: image.len(),
                size: self.cells.len(),
            });
        }

        self.cells[start..end].copy_from_slice(image);
        Ok(())
    }

    /// Dump `count` words starting at `start` (for debugging).
    ///
    /// The range is cut short at the end of memory.
    pub fn dump(&self, start: Word, count: usize) -> Vec<(Word, Word)> {
        let start = usize::from(start);
        let end = start.saturating_add(count).min(self.cells.len());
        (start..end)
            .map(|i| (i as Word, self.cells[i]))
            .collect()
    }

    /// Iterate over every non-zero cell as `(address, value)`.
    pub fn non_zero(&self) -> impl DoubleEndedIterator<Item = (Word, Word)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, value)| **value != 0)
            .map(|(addr, value)| (addr as Word, *value))
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Memory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Only summarise; 64K cells are not useful in a debug print.
        f.debug_struct("Memory")
            .field("non_zero_cells", &self.non_zero().count())
            .field("total_cells", &self.cells.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_read_write() {
        let mut mem = Memory::new();
        mem.write(0x3000, 0x1234).unwrap();
        assert_eq!(mem.read(0x3000).unwrap(), 0x1234);
        assert_eq!(mem.read(0xFFFF).unwrap(), 0);
    }

    #[test]
    fn test_full_memory_has_no_bounds_failures() {
        let mut mem = Memory::new();
        assert_eq!(mem.size(), ADDRESS_SPACE_SIZE);
        assert!(mem.write(Word::MAX, 1).is_ok());
        assert_eq!(mem.read(Word::MAX), Ok(1));
    }

    #[test]
    fn test_memory_bounds() {
        let mut mem = Memory::with_size(0x100);
        assert!(mem.read(0x00FF).is_ok());
        assert_eq!(mem.read(0x0100), Err(AddressOutOfBounds(0x0100)));
        assert_eq!(mem.write(0x4000, 7), Err(AddressOutOfBounds(0x4000)));
    }

    #[test]
    fn test_load_image() {
        let mut mem = Memory::new();
        mem.load(0x3000, &[1, 2, 3]).unwrap();

        assert_eq!(mem.read(0x3000).unwrap(), 1);
        assert_eq!(mem.read(0x3001).unwrap(), 2);
        assert_eq!(mem.read(0x3002).unwrap(), 3);
    }

    #[test]
    fn test_load_image_too_large() {
        let mut mem = Memory::with_size(4);
        let err = mem.load(2, &[1, 2, 3]).unwrap_err();
        assert_eq!(
            err,
            LoadError::ImageTooLarge {
                origin: 2,
                len: 3,
                size: 4
            }
        );
        // Nothing is written on failure.
        assert_eq!(mem.non_zero().count(), 0);
    }

    #[test]
    fn test_dump_and_non_zero() {
        let mut mem = Memory::with_size(8);
        mem.write(1, 0xAAAA).unwrap();
        mem.write(6, 0x5555).unwrap();

        assert_eq!(mem.dump(5, 10), vec![(5, 0), (6, 0x5555), (7, 0)]);
        assert_eq!(
            mem.non_zero().collect::<Vec<_>>(),
            vec![(1, 0xAAAA), (6, 0x5555)]
        );
        assert_eq!(mem.non_zero().next_back(), Some((6, 0x5555)));

        mem.clear();
        assert_eq!(mem.non_zero().count(), 0);
    }
}
