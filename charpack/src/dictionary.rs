//! Deduplication of fixed-size encoded blocks.
//!
//! Entries keep first-seen order and are compared byte for byte; the first
//! match wins. Indices are stable until the empty block is promoted.

use crate::error::ConversionError;

/// Ordered set of unique blocks of `block_len` bytes
#[derive(Debug, Clone)]
pub struct BlockDictionary {
    kind: &'static str,
    block_len: usize,
    capacity: usize,
    data: Vec<u8>,
    /// First all-zero block inserted
    empty: Option<usize>,
}

impl BlockDictionary {
    /// Create a dictionary holding at most `capacity` blocks.
    ///
    /// `kind` names the blocks in errors. Blocks must be at least one byte.
    pub fn new(kind: &'static str, block_len: usize, capacity: usize) -> Result<Self, ConversionError> {
        if block_len == 0 {
            return Err(ConversionError::Format(format!("{} cannot be empty blocks", kind)));
        }
        Ok(BlockDictionary {
            kind,
            block_len,
            capacity,
            data: Vec::with_capacity(block_len * capacity),
            empty: None,
        })
    }

    /// Index of `block`, appending it when it has not been seen before
    pub fn lookup_or_insert(&mut self, block: &[u8]) -> Result<usize, ConversionError> {
        debug_assert_eq!(block.len(), self.block_len);

        if let Some(index) = self.position(block) {
            return Ok(index);
        }

        if self.len() == self.capacity {
            return Err(ConversionError::Capacity {
                kind: self.kind,
                limit: self.capacity,
            });
        }

        let index = self.len();
        self.data.extend_from_slice(block);
        if self.empty.is_none() && block.iter().all(|&b| b == 0) {
            self.empty = Some(index);
        }
        Ok(index)
    }

    /// Index of the first entry equal to `block`
    pub fn position(&self, block: &[u8]) -> Option<usize> {
        self.iter().position(|entry| entry == block)
    }

    /// Move the empty block to index 0.
    ///
    /// The block at 0 and the empty block at `e` swap places, and every
    /// reference in `map` to one is rewritten to the other. Returns `e` when
    /// a swap happened.
    pub fn promote_empty_to_front(&mut self, map: &mut [usize]) -> Option<usize> {
        let empty = self.empty.filter(|&e| e > 0)?;

        for index in map.iter_mut() {
            if *index == 0 {
                *index = empty;
            } else if *index == empty {
                *index = 0;
            }
        }

        let (front, rest) = self.data.split_at_mut(empty * self.block_len);
        front[..self.block_len].swap_with_slice(&mut rest[..self.block_len]);
        self.empty = Some(0);

        Some(empty)
    }

    pub fn get(&self, index: usize) -> &[u8] {
        &self.data[index * self.block_len..(index + 1) * self.block_len]
    }

    pub fn iter(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.data.chunks_exact(self.block_len)
    }

    /// All blocks concatenated in index order
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len() / self.block_len
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn block_len(&self) -> usize {
        self.block_len
    }

    /// Index of the empty block, if one was inserted
    pub fn empty_index(&self) -> Option<usize> {
        self.empty
    }
}
