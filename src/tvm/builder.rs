//! Enhanced Builder for constructing cells with convenient methods
//!
//! This module provides a high-level builder (`Builder`) that wraps the low-level
//! `CellBuilder` with the TON-specific encodings used by message bodies.
//!
//! # Builder vs CellBuilder
//!
//! - **`CellBuilder`** (in `cell.rs`): raw bit/byte/reference appends and the
//!   seal/overflow bookkeeping.
//! - **`Builder`** (this module): `store_address()`, `store_coins()`,
//!   `store_snake_string()` and friends on top of it.
//!
//! # Examples
//!
//! ```rust
//! use tonwallet_rs::tvm::{Builder, Address};
//!
//! let mut builder = Builder::new();
//!
//! let addr = Address::new(0, [0u8; 32]);
//! builder.store_address(Some(&addr)).unwrap();
//!
//! // 1 TON
//! builder.store_coins(1_000_000_000).unwrap();
//!
//! let cell = builder.build().unwrap();
//! assert_eq!(cell.bit_len(), 267 + 4 + 32);
//! ```

use crate::tvm::address::Address;
use crate::tvm::cell::{Cell, CellBuilder, MAX_CELL_BITS};
use crate::tvm::error::{CellError, CellResult};
use std::sync::Arc;

/// Bytes that fit into one snake continuation cell
pub const SNAKE_CHUNK_BYTES: usize = MAX_CELL_BITS / 8;

/// Largest byte length of a VarUInteger 16 (the length prefix is 4 bits)
const MAX_COINS_BYTES: usize = 15;

/// Extended builder with convenience methods
#[derive(Debug, Default)]
pub struct Builder {
    inner: CellBuilder,
}

impl Builder {
    /// Creates a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of bits used
    pub fn bit_len(&self) -> usize {
        self.inner.bit_len()
    }

    /// Returns the number of references used
    pub fn ref_count(&self) -> usize {
        self.inner.ref_count()
    }

    /// Returns the number of available bits
    pub fn available_bits(&self) -> usize {
        self.inner.available_bits()
    }

    /// Returns the number of whole bytes that still fit
    pub fn available_bytes(&self) -> usize {
        self.available_bits() / 8
    }

    /// Returns the number of available references
    pub fn available_refs(&self) -> usize {
        self.inner.available_refs()
    }

    /// Stores a single bit
    pub fn store_bit(&mut self, bit: bool) -> CellResult<&mut Self> {
        self.inner.store_bit(bit)?;
        Ok(self)
    }

    /// Stores a boolean value as a single bit
    pub fn store_bool(&mut self, value: bool) -> CellResult<&mut Self> {
        self.store_bit(value)
    }

    /// Stores multiple bits from a byte slice
    pub fn store_bits(&mut self, bits: &[u8], bit_len: usize) -> CellResult<&mut Self> {
        self.inner.store_bits(bits, bit_len)?;
        Ok(self)
    }

    /// Stores a byte
    pub fn store_byte(&mut self, byte: u8) -> CellResult<&mut Self> {
        self.inner.store_byte(byte)?;
        Ok(self)
    }

    /// Stores multiple bytes
    pub fn store_bytes(&mut self, bytes: &[u8]) -> CellResult<&mut Self> {
        self.inner.store_bytes(bytes)?;
        Ok(self)
    }

    /// Stores a u32 value
    pub fn store_u32(&mut self, value: u32) -> CellResult<&mut Self> {
        self.inner.store_u32(value)?;
        Ok(self)
    }

    /// Stores a u64 value
    pub fn store_u64(&mut self, value: u64) -> CellResult<&mut Self> {
        self.inner.store_u64(value)?;
        Ok(self)
    }

    /// Stores an unsigned integer with specific bit length
    pub fn store_uint(&mut self, value: u64, bits: usize) -> CellResult<&mut Self> {
        self.inner.store_uint(value, bits)?;
        Ok(self)
    }

    /// Stores a two's complement signed integer with specific bit length
    pub fn store_int(&mut self, value: i64, bits: usize) -> CellResult<&mut Self> {
        if bits > 64 {
            return Err(CellError::IntegerTooWide(bits));
        }
        if bits == 0 {
            return Ok(self);
        }

        let min = -(1i128 << (bits - 1));
        let max = (1i128 << (bits - 1)) - 1;
        if (value as i128) < min || (value as i128) > max {
            return Err(CellError::ValueTooLarge {
                value: value as u64,
                bits,
            });
        }

        let mask = if bits == 64 { u64::MAX } else { (1u64 << bits) - 1 };
        self.store_uint(value as u64 & mask, bits)
    }

    /// Stores a reference to another cell
    pub fn store_ref(&mut self, cell: Arc<Cell>) -> CellResult<&mut Self> {
        self.inner.store_reference(cell)?;
        Ok(self)
    }

    /// Stores an optional reference (Maybe ^Cell)
    pub fn store_maybe_ref(&mut self, cell: Option<Arc<Cell>>) -> CellResult<&mut Self> {
        match cell {
            Some(c) => {
                self.store_bit(true)?;
                self.store_ref(c)?;
            }
            None => {
                self.store_bit(false)?;
            }
        }
        Ok(self)
    }

    /// Stores the data bits and references of another cell
    pub fn store_cell(&mut self, cell: &Cell) -> CellResult<&mut Self> {
        if cell.reference_count() > self.available_refs()
            || cell.bit_len() > self.available_bits()
        {
            return Err(self
                .inner
                .mark_overflow(cell.bit_len(), cell.reference_count()));
        }

        self.store_bits(cell.data(), cell.bit_len())?;
        for reference in cell.references() {
            self.store_ref(reference.clone())?;
        }

        Ok(self)
    }

    /// Stores coins (VarUInteger 16): 4-bit byte length, then the big-endian value
    pub fn store_coins(&mut self, amount: u128) -> CellResult<&mut Self> {
        if amount == 0 {
            return self.store_uint(0, 4);
        }

        let byte_len = (128 - amount.leading_zeros() as usize).div_ceil(8);
        if byte_len > MAX_COINS_BYTES {
            return Err(CellError::CoinsOverflow(amount));
        }

        self.store_uint(byte_len as u64, 4)?;
        let bytes = amount.to_be_bytes();
        self.store_bytes(&bytes[16 - byte_len..])?;

        Ok(self)
    }

    /// Stores a UTF-8 string using snake encoding
    pub fn store_snake_string(&mut self, s: &str) -> CellResult<&mut Self> {
        self.store_snake_bytes(s.as_bytes())
    }

    /// Stores bytes using snake encoding
    ///
    /// The bytes fill the remaining whole bytes of this cell; the rest goes into
    /// a chain of child cells of [`SNAKE_CHUNK_BYTES`] each, every cell holding
    /// its continuation as its only reference.
    pub fn store_snake_bytes(&mut self, bytes: &[u8]) -> CellResult<&mut Self> {
        let head_len = bytes.len().min(self.available_bytes());
        let (head, tail) = bytes.split_at(head_len);

        // Build the continuation chain back to front
        let mut next: Option<Arc<Cell>> = None;
        for chunk in tail.chunks(SNAKE_CHUNK_BYTES).rev() {
            let mut builder = Builder::new();
            builder.store_bytes(chunk)?;
            if let Some(child) = next.take() {
                builder.store_ref(child)?;
            }
            next = Some(builder.build()?);
        }

        self.store_bytes(head)?;
        if let Some(child) = next {
            self.store_ref(child)?;
        }

        Ok(self)
    }

    /// Stores an internal address (`addr_std`) or `addr_none` for `None`
    pub fn store_address(&mut self, address: Option<&Address>) -> CellResult<&mut Self> {
        match address {
            None => {
                // addr_none$00
                self.store_uint(0b00, 2)?;
            }
            Some(addr) => {
                // addr_std$10 anycast:(Maybe Anycast) workchain_id:int8 address:bits256
                self.store_uint(0b10, 2)?;
                self.store_bit(false)?;
                self.store_int(addr.workchain() as i64, 8)?;
                self.store_bytes(addr.hash_part())?;
            }
        }
        Ok(self)
    }

    /// Finalizes the builder; appends afterwards fail with `BuilderSealed`
    pub fn seal(&mut self) -> CellResult<Arc<Cell>> {
        self.inner.seal()
    }

    /// Consumes the builder and seals it
    pub fn build(self) -> CellResult<Arc<Cell>> {
        self.inner.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tvm::Slice;

    #[test]
    fn test_builder_basic() {
        let mut builder = Builder::new();
        builder.store_u32(0x12345678).unwrap();
        builder.store_byte(0xFF).unwrap();
        assert_eq!(builder.bit_len(), 40);

        let cell = builder.build().unwrap();
        assert_eq!(cell.bit_len(), 40);
    }

    #[test]
    fn test_builder_address() {
        let addr = Address::new(0, [0u8; 32]);
        let mut builder = Builder::new();
        builder.store_address(Some(&addr)).unwrap();

        let cell = builder.build().unwrap();
        // 2 bits (addr_std) + 1 bit (no anycast) + 8 bits (workchain) + 256 bits (hash) = 267 bits
        assert_eq!(cell.bit_len(), 267);
        assert_eq!(cell.data()[0], 0b1000_0000);
    }

    #[test]
    fn test_builder_masterchain_address() {
        let addr = Address::new(-1, [0xAA; 32]);
        let mut builder = Builder::new();
        builder.store_address(Some(&addr)).unwrap();

        let mut slice = Slice::new(builder.build().unwrap());
        assert_eq!(slice.load_address().unwrap(), Some(addr));
    }

    #[test]
    fn test_builder_coins() {
        let mut builder = Builder::new();
        builder.store_coins(1_000_000_000).unwrap();

        let cell = builder.build().unwrap();
        // 4-bit length (4 bytes) + 32 bits of value
        assert_eq!(cell.bit_len(), 36);
        assert_eq!(cell.data(), &[0x43, 0xB9, 0xAC, 0xA0, 0x00]);
    }

    #[test]
    fn test_builder_zero_coins() {
        let mut builder = Builder::new();
        builder.store_coins(0).unwrap();
        assert_eq!(builder.build().unwrap().bit_len(), 4);
    }

    #[test]
    fn test_builder_coins_overflow() {
        let mut builder = Builder::new();
        builder.store_coins((1u128 << 120) - 1).unwrap();

        let mut builder = Builder::new();
        assert_eq!(
            builder.store_coins(1u128 << 120).unwrap_err(),
            CellError::CoinsOverflow(1u128 << 120)
        );
    }

    #[test]
    fn test_builder_short_snake_string() {
        let mut builder = Builder::new();
        builder.store_snake_string("Hello, TON!").unwrap();

        let cell = builder.build().unwrap();
        assert_eq!(cell.bit_len(), 11 * 8);
        assert_eq!(cell.reference_count(), 0);
    }

    #[test]
    fn test_builder_snake_string_chains_cells() {
        let long_string = "a".repeat(300);
        let mut builder = Builder::new();
        builder.store_u32(0).unwrap();
        builder.store_snake_string(&long_string).unwrap();

        let root = builder.build().unwrap();
        // 123 bytes after the 32-bit prefix, then 127 + 50
        assert_eq!(root.bit_len(), 32 + 123 * 8);
        let first = root.reference(0).unwrap();
        assert_eq!(first.bit_len(), 127 * 8);
        let second = first.reference(0).unwrap();
        assert_eq!(second.bit_len(), 50 * 8);
        assert_eq!(second.reference_count(), 0);
    }

    #[test]
    fn test_snake_needs_a_free_reference() {
        let child = Builder::new().build().unwrap();
        let mut builder = Builder::new();
        for _ in 0..4 {
            builder.store_ref(child.clone()).unwrap();
        }
        builder.store_bytes(&[0u8; 120]).unwrap();

        let err = builder.store_snake_string(&"x".repeat(20)).unwrap_err();
        assert!(matches!(err, CellError::CellOverflow { refs: 5, .. }));
    }

    #[test]
    fn test_store_int_range() {
        let mut builder = Builder::new();
        builder.store_int(-128, 8).unwrap();
        builder.store_int(127, 8).unwrap();
        assert!(builder.store_int(128, 8).is_err());
    }

    #[test]
    fn test_store_cell_copies_bits_and_refs() {
        let child = Builder::new().build().unwrap();
        let mut inner = Builder::new();
        inner.store_uint(0b101, 3).unwrap();
        inner.store_ref(child).unwrap();
        let inner = inner.build().unwrap();

        let mut outer = Builder::new();
        outer.store_bit(true).unwrap();
        outer.store_cell(&inner).unwrap();
        let outer = outer.build().unwrap();

        assert_eq!(outer.bit_len(), 4);
        assert_eq!(outer.data(), &[0b1101_0000]);
        assert_eq!(outer.reference_count(), 1);
    }

    #[test]
    fn test_seal_then_store() {
        let mut builder = Builder::new();
        builder.store_bool(true).unwrap();
        builder.seal().unwrap();
        assert_eq!(
            builder.store_coins(1).unwrap_err(),
            CellError::BuilderSealed
        );
    }
}
