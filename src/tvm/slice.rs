//! Slice implementation for reading data from cells
//!
//! A Slice provides a way to read data from a Cell sequentially,
//! tracking the current position in both bits and references.

use crate::tvm::address::Address;
use crate::tvm::cell::Cell;
use crate::tvm::error::{CellError, CellResult};
use std::sync::Arc;

/// A slice for reading data from a cell
#[derive(Debug, Clone)]
pub struct Slice {
    /// The cell being read
    cell: Arc<Cell>,
    /// Current bit position in the cell
    bit_pos: usize,
    /// Current reference position
    ref_pos: usize,
}

impl Slice {
    /// Creates a new slice from a cell
    pub fn new(cell: Arc<Cell>) -> Self {
        Self {
            cell,
            bit_pos: 0,
            ref_pos: 0,
        }
    }

    /// Returns the number of remaining bits
    pub fn remaining_bits(&self) -> usize {
        self.cell.bit_len().saturating_sub(self.bit_pos)
    }

    /// Returns the number of remaining references
    pub fn remaining_refs(&self) -> usize {
        self.cell.reference_count().saturating_sub(self.ref_pos)
    }

    /// Checks if there is nothing left to read
    pub fn is_empty(&self) -> bool {
        self.remaining_bits() == 0 && self.remaining_refs() == 0
    }

    fn ensure_bits(&self, n: usize) -> CellResult<()> {
        if n > self.remaining_bits() {
            return Err(CellError::NotEnoughBits {
                requested: n,
                available: self.remaining_bits(),
            });
        }
        Ok(())
    }

    /// Loads a single bit
    pub fn load_bit(&mut self) -> CellResult<bool> {
        self.ensure_bits(1)?;

        let byte = self.cell.data()[self.bit_pos / 8];
        let bit = (byte >> (7 - self.bit_pos % 8)) & 1;
        self.bit_pos += 1;

        Ok(bit == 1)
    }

    /// Loads multiple bits into a byte vector (MSB first, zero padded)
    pub fn load_bits(&mut self, n: usize) -> CellResult<Vec<u8>> {
        self.ensure_bits(n)?;

        let mut result = vec![0u8; n.div_ceil(8)];
        for i in 0..n {
            if self.load_bit()? {
                result[i / 8] |= 1 << (7 - i % 8);
            }
        }

        Ok(result)
    }

    /// Loads a byte (8 bits)
    pub fn load_byte(&mut self) -> CellResult<u8> {
        Ok(self.load_uint(8)? as u8)
    }

    /// Loads multiple bytes
    pub fn load_bytes(&mut self, n: usize) -> CellResult<Vec<u8>> {
        self.load_bits(n * 8)
    }

    /// Loads a u32 value (32 bits, big-endian)
    pub fn load_u32(&mut self) -> CellResult<u32> {
        Ok(self.load_uint(32)? as u32)
    }

    /// Loads a u64 value (64 bits, big-endian)
    pub fn load_u64(&mut self) -> CellResult<u64> {
        self.load_uint(64)
    }

    /// Loads a uint with a specific number of bits
    pub fn load_uint(&mut self, bits: usize) -> CellResult<u64> {
        if bits > 64 {
            return Err(CellError::IntegerTooWide(bits));
        }
        self.ensure_bits(bits)?;

        let mut result = 0u64;
        for _ in 0..bits {
            result = (result << 1) | self.load_bit()? as u64;
        }

        Ok(result)
    }

    /// Loads a two's complement signed integer with a specific number of bits
    pub fn load_int(&mut self, bits: usize) -> CellResult<i64> {
        if bits == 0 {
            return Ok(0);
        }

        let unsigned = self.load_uint(bits)?;
        if bits < 64 && unsigned & (1u64 << (bits - 1)) != 0 {
            Ok((unsigned | (!0u64 << bits)) as i64)
        } else {
            Ok(unsigned as i64)
        }
    }

    /// Loads coins (VarUInteger 16)
    pub fn load_coins(&mut self) -> CellResult<u128> {
        let len = self.load_uint(4)? as usize;

        let mut result = 0u128;
        for byte in self.load_bytes(len)? {
            result = (result << 8) | byte as u128;
        }

        Ok(result)
    }

    /// Loads an internal address; `addr_none` yields `None`
    pub fn load_address(&mut self) -> CellResult<Option<Address>> {
        match self.load_uint(2)? {
            0b00 => Ok(None),
            0b10 => {
                if self.load_bit()? {
                    return Err(CellError::InvalidData("anycast is not supported".into()));
                }
                let workchain = self.load_int(8)? as i8;
                let mut hash_part = [0u8; 32];
                hash_part.copy_from_slice(&self.load_bytes(32)?);
                Ok(Some(Address::new(workchain, hash_part)))
            }
            tag => Err(CellError::InvalidData(format!(
                "unsupported address tag {tag:#04b}"
            ))),
        }
    }

    /// Loads a reference to another cell
    pub fn load_reference(&mut self) -> CellResult<Arc<Cell>> {
        let reference = self
            .cell
            .reference(self.ref_pos)
            .cloned()
            .ok_or(CellError::NotEnoughRefs)?;

        self.ref_pos += 1;
        Ok(reference)
    }

    /// Loads snake-encoded bytes: the rest of this cell, then the reference chain
    pub fn load_snake_bytes(&mut self) -> CellResult<Vec<u8>> {
        let remaining = self.remaining_bits();
        if remaining % 8 != 0 {
            return Err(CellError::InvalidData(format!(
                "snake data is not byte aligned ({remaining} bits)"
            )));
        }

        let mut bytes = self.load_bytes(remaining / 8)?;
        if self.remaining_refs() > 0 {
            let mut next = Slice::new(self.load_reference()?);
            loop {
                let remaining = next.remaining_bits();
                if remaining % 8 != 0 {
                    return Err(CellError::InvalidData(
                        "snake continuation is not byte aligned".into(),
                    ));
                }
                bytes.extend(next.load_bytes(remaining / 8)?);
                if next.remaining_refs() == 0 {
                    break;
                }
                next = Slice::new(next.load_reference()?);
            }
        }

        Ok(bytes)
    }

    /// Loads a snake-encoded UTF-8 string
    pub fn load_snake_string(&mut self) -> CellResult<String> {
        Ok(String::from_utf8(self.load_snake_bytes()?)?)
    }

    /// Skips a number of bits
    pub fn skip_bits(&mut self, n: usize) -> CellResult<()> {
        self.ensure_bits(n)?;
        self.bit_pos += n;
        Ok(())
    }

    /// Gets the underlying cell
    pub fn cell(&self) -> &Arc<Cell> {
        &self.cell
    }
}

impl From<Arc<Cell>> for Slice {
    fn from(cell: Arc<Cell>) -> Self {
        Self::new(cell)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tvm::{Builder, CellBuilder};

    #[test]
    fn test_slice_load_bits() {
        let mut builder = CellBuilder::new();
        builder.store_byte(0xFF).unwrap();
        builder.store_byte(0x00).unwrap();
        let cell = builder.build().unwrap();

        let mut slice = Slice::new(cell);
        assert_eq!(slice.remaining_bits(), 16);
        assert_eq!(slice.load_byte().unwrap(), 0xFF);
        assert_eq!(slice.remaining_bits(), 8);
        assert_eq!(slice.load_byte().unwrap(), 0x00);
        assert!(slice.is_empty());
    }

    #[test]
    fn test_slice_load_uint() {
        let mut builder = CellBuilder::new();
        builder.store_u32(0x12345678).unwrap();
        builder.store_uint(5, 3).unwrap();
        let cell = builder.build().unwrap();

        let mut slice = Slice::new(cell);
        assert_eq!(slice.load_u32().unwrap(), 0x12345678);
        assert_eq!(slice.load_uint(3).unwrap(), 5);
    }

    #[test]
    fn test_slice_load_int() {
        let mut builder = Builder::new();
        builder.store_int(-1, 8).unwrap();
        builder.store_int(-239, 32).unwrap();

        let mut slice = Slice::new(builder.build().unwrap());
        assert_eq!(slice.load_int(8).unwrap(), -1);
        assert_eq!(slice.load_int(32).unwrap(), -239);
    }

    #[test]
    fn test_slice_load_reference() {
        let ref_cell = CellBuilder::new().build().unwrap();

        let mut builder = CellBuilder::new();
        builder.store_reference(ref_cell.clone()).unwrap();
        let cell = builder.build().unwrap();

        let mut slice = Slice::new(cell);
        assert_eq!(slice.remaining_refs(), 1);
        assert_eq!(slice.load_reference().unwrap().hash(), ref_cell.hash());
        assert_eq!(slice.load_reference().unwrap_err(), CellError::NotEnoughRefs);
    }

    #[test]
    fn test_slice_skip() {
        let mut builder = CellBuilder::new();
        builder.store_u32(0x12345678).unwrap();
        let cell = builder.build().unwrap();

        let mut slice = Slice::new(cell);
        slice.skip_bits(16).unwrap();
        assert_eq!(slice.remaining_bits(), 16);
        assert_eq!(slice.load_uint(16).unwrap(), 0x5678);
        assert!(slice.skip_bits(1).is_err());
    }

    #[test]
    fn test_slice_not_enough_bits() {
        let mut slice = Slice::new(CellBuilder::new().build().unwrap());
        assert_eq!(
            slice.load_u32().unwrap_err(),
            CellError::NotEnoughBits {
                requested: 32,
                available: 0
            }
        );
    }

    #[test]
    fn test_coins_roundtrip_edges() {
        for value in [1u128, 255, 256, 1_000_000_000, u64::MAX as u128, (1u128 << 120) - 1] {
            let mut builder = Builder::new();
            builder.store_coins(value).unwrap();
            let mut slice = Slice::new(builder.build().unwrap());
            assert_eq!(slice.load_coins().unwrap(), value);
            assert_eq!(slice.remaining_bits(), 0);
        }
    }

    #[test]
    fn test_load_addr_none() {
        let mut builder = Builder::new();
        builder.store_address(None).unwrap();
        let mut slice = Slice::new(builder.build().unwrap());
        assert_eq!(slice.load_address().unwrap(), None);
    }

    #[test]
    fn test_snake_string_across_cells() {
        let text = "Привет, TON! ".repeat(40);
        let mut builder = Builder::new();
        builder.store_u32(0).unwrap();
        builder.store_snake_string(&text).unwrap();
        let cell = builder.build().unwrap();
        assert!(cell.reference_count() > 0);

        let mut slice = Slice::new(cell);
        assert_eq!(slice.load_u32().unwrap(), 0);
        assert_eq!(slice.load_snake_string().unwrap(), text);
    }
}
