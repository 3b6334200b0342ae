//! Cell implementation for TON blockchain
//!
//! A cell is a fundamental data structure in TON that can store up to 1023 bits
//! of data and maintain up to 4 references to other cells. Cells are immutable:
//! the only way to get one is to seal a [`CellBuilder`].

use crate::tvm::error::{CellError, CellResult};
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Maximum number of bits a cell can store
pub const MAX_CELL_BITS: usize = 1023;

/// Maximum number of references a cell can have
pub const MAX_CELL_REFS: usize = 4;

/// An immutable ordinary cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    /// Cell data, exactly `ceil(bit_len / 8)` bytes with zeroed tail bits
    data: Vec<u8>,
    /// Number of bits in the cell (not necessarily a multiple of 8)
    bit_len: usize,
    /// References to other cells
    references: Vec<Arc<Cell>>,
    hash: [u8; 32],
    depth: u16,
}

impl Cell {
    /// Creates a sealed cell from raw parts, validating the format limits
    pub fn new(mut data: Vec<u8>, bit_len: usize, references: Vec<Arc<Cell>>) -> CellResult<Self> {
        if bit_len > MAX_CELL_BITS || references.len() > MAX_CELL_REFS {
            return Err(CellError::CellOverflow {
                bits: bit_len,
                refs: references.len(),
            });
        }

        let required_bytes = bit_len.div_ceil(8);
        if data.len() < required_bytes {
            return Err(CellError::InvalidData(format!(
                "data length {} is insufficient for {} bits",
                data.len(),
                bit_len
            )));
        }
        data.truncate(required_bytes);
        if bit_len % 8 != 0 {
            let mask = 0xFFu8 << (8 - bit_len % 8);
            if let Some(last) = data.last_mut() {
                *last &= mask;
            }
        }

        let depth = references
            .iter()
            .map(|r| r.depth() + 1)
            .max()
            .unwrap_or(0);

        let mut cell = Self {
            data,
            bit_len,
            references,
            hash: [0u8; 32],
            depth,
        };
        cell.hash = cell.compute_hash();
        Ok(cell)
    }

    /// Creates an empty cell
    pub fn empty() -> Self {
        Self {
            data: Vec::new(),
            bit_len: 0,
            references: Vec::new(),
            hash: Self::EMPTY_HASH,
            depth: 0,
        }
    }

    // sha256 of descriptors [0x00, 0x00]
    const EMPTY_HASH: [u8; 32] = [
        0x96, 0xa2, 0x96, 0xd2, 0x24, 0xf2, 0x85, 0xc6, 0x7b, 0xee, 0x93, 0xc3, 0x0f, 0x8a, 0x30,
        0x91, 0x57, 0xf0, 0xda, 0xa3, 0x5d, 0xc5, 0xb8, 0x7e, 0x41, 0x0b, 0x78, 0x63, 0x0a, 0x09,
        0xcf, 0xc7,
    ];

    /// Returns the cell's data
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Returns the number of bits in the cell
    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    /// Returns the cell's references
    pub fn references(&self) -> &[Arc<Cell>] {
        &self.references
    }

    /// Returns the number of references
    pub fn reference_count(&self) -> usize {
        self.references.len()
    }

    /// Gets a reference by index
    pub fn reference(&self, index: usize) -> Option<&Arc<Cell>> {
        self.references.get(index)
    }

    /// Depth of the cell tree below this cell
    pub fn depth(&self) -> u16 {
        self.depth
    }

    /// Representation hash of the cell
    pub fn hash(&self) -> [u8; 32] {
        self.hash
    }

    /// Computes the cell's descriptors (2 bytes)
    pub fn descriptors(&self) -> [u8; 2] {
        // d1 = refs + 8 * exotic + 32 * level; ordinary level-0 cells only
        let refs_descriptor = self.references.len() as u8;
        // d2 = floor(b / 8) + ceil(b / 8)
        let bits_descriptor = (self.bit_len / 8 + self.bit_len.div_ceil(8)) as u8;

        [refs_descriptor, bits_descriptor]
    }

    /// Serializes the cell data, appending the completion tag for partial bytes
    pub fn serialize_data(&self) -> Vec<u8> {
        let mut result = self.data.clone();

        if self.bit_len % 8 != 0 {
            let last_byte_idx = self.bit_len / 8;
            result[last_byte_idx] |= 1 << (7 - self.bit_len % 8);
        }

        result
    }

    fn compute_hash(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();

        hasher.update(self.descriptors());
        hasher.update(self.serialize_data());

        for reference in &self.references {
            hasher.update(reference.depth().to_be_bytes());
        }
        for reference in &self.references {
            hasher.update(reference.hash());
        }

        hasher.finalize().into()
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self::empty()
    }
}

/// Low-level builder for constructing cells
///
/// Provides the raw bit and reference append operations; the TON-specific
/// encodings (addresses, coins, snake strings) live in [`Builder`](crate::tvm::Builder).
///
/// The order of append calls is the field order of the resulting cell.
/// An append that would exceed the cell limits fails with
/// [`CellError::CellOverflow`] and poisons the builder, so a later
/// [`seal`](CellBuilder::seal) fails too. Any append after sealing fails with
/// [`CellError::BuilderSealed`].
///
/// # Example
///
/// ```rust
/// use tonwallet_rs::tvm::CellBuilder;
///
/// let mut builder = CellBuilder::new();
/// builder.store_u32(0x12345678).unwrap();
/// builder.store_byte(0xFF).unwrap();
/// let cell = builder.seal().unwrap();
/// assert_eq!(cell.bit_len(), 40);
/// ```
#[derive(Debug, Default)]
pub struct CellBuilder {
    data: Vec<u8>,
    bit_len: usize,
    references: Vec<Arc<Cell>>,
    sealed: bool,
    overflowed: bool,
}

impl CellBuilder {
    /// Creates a new cell builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bits stored so far
    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    /// Number of references stored so far
    pub fn ref_count(&self) -> usize {
        self.references.len()
    }

    /// Bits that can still be appended
    pub fn available_bits(&self) -> usize {
        MAX_CELL_BITS.saturating_sub(self.bit_len)
    }

    /// References that can still be appended
    pub fn available_refs(&self) -> usize {
        MAX_CELL_REFS.saturating_sub(self.references.len())
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    fn ensure_writable(&self) -> CellResult<()> {
        if self.sealed {
            return Err(CellError::BuilderSealed);
        }
        if self.overflowed {
            return Err(self.overflow_error(0, 0));
        }
        Ok(())
    }

    /// Poisons the builder and returns the overflow error for the attempted append
    pub(crate) fn mark_overflow(&mut self, extra_bits: usize, extra_refs: usize) -> CellError {
        self.overflowed = true;
        self.overflow_error(extra_bits, extra_refs)
    }

    fn overflow_error(&self, extra_bits: usize, extra_refs: usize) -> CellError {
        CellError::CellOverflow {
            bits: self.bit_len + extra_bits,
            refs: self.references.len() + extra_refs,
        }
    }

    /// Stores the first `bit_len` bits of `bits` (MSB first)
    pub fn store_bits(&mut self, bits: &[u8], bit_len: usize) -> CellResult<&mut Self> {
        self.ensure_writable()?;

        if self.bit_len + bit_len > MAX_CELL_BITS {
            return Err(self.mark_overflow(bit_len, 0));
        }

        if bits.len() < bit_len.div_ceil(8) {
            return Err(CellError::InvalidData(format!(
                "insufficient data for {} bits",
                bit_len
            )));
        }

        for i in 0..bit_len {
            let bit = (bits[i / 8] >> (7 - i % 8)) & 1;

            let target_byte_idx = self.bit_len / 8;
            if target_byte_idx >= self.data.len() {
                self.data.push(0);
            }
            if bit == 1 {
                self.data[target_byte_idx] |= 1 << (7 - self.bit_len % 8);
            }

            self.bit_len += 1;
        }

        Ok(self)
    }

    /// Stores a single bit
    pub fn store_bit(&mut self, bit: bool) -> CellResult<&mut Self> {
        self.store_bits(&[if bit { 0x80 } else { 0x00 }], 1)
    }

    /// Stores a byte
    pub fn store_byte(&mut self, byte: u8) -> CellResult<&mut Self> {
        self.store_bits(&[byte], 8)
    }

    /// Stores multiple bytes
    pub fn store_bytes(&mut self, bytes: &[u8]) -> CellResult<&mut Self> {
        self.store_bits(bytes, bytes.len() * 8)
    }

    /// Stores a u32 value
    pub fn store_u32(&mut self, value: u32) -> CellResult<&mut Self> {
        self.store_bits(&value.to_be_bytes(), 32)
    }

    /// Stores a u64 value
    pub fn store_u64(&mut self, value: u64) -> CellResult<&mut Self> {
        self.store_bits(&value.to_be_bytes(), 64)
    }

    /// Stores `value` as a big-endian unsigned integer of exactly `bits` bits
    pub fn store_uint(&mut self, value: u64, bits: usize) -> CellResult<&mut Self> {
        if bits > 64 {
            return Err(CellError::IntegerTooWide(bits));
        }
        if bits < 64 && value >> bits != 0 {
            return Err(CellError::ValueTooLarge { value, bits });
        }
        if bits == 0 {
            return Ok(self);
        }

        // Left-align the value so its top bit is the first bit of the buffer
        let aligned = value << (64 - bits);
        self.store_bits(&aligned.to_be_bytes(), bits)
    }

    /// Adds a reference to another cell
    pub fn store_reference(&mut self, cell: Arc<Cell>) -> CellResult<&mut Self> {
        self.ensure_writable()?;

        if self.references.len() >= MAX_CELL_REFS {
            return Err(self.mark_overflow(0, 1));
        }
        self.references.push(cell);
        Ok(self)
    }

    /// Finalizes the builder into an immutable cell
    pub fn seal(&mut self) -> CellResult<Arc<Cell>> {
        self.ensure_writable()?;
        self.sealed = true;

        let data = std::mem::take(&mut self.data);
        let references = std::mem::take(&mut self.references);
        Ok(Arc::new(Cell::new(data, self.bit_len, references)?))
    }

    /// Consumes the builder and seals it
    pub fn build(mut self) -> CellResult<Arc<Cell>> {
        self.seal()
    }
}
