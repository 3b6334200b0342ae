//! Bag of Cells (BoC) serialization and deserialization
//!
//! BoC is the wire format for cell trees: the external message carrying a
//! signed envelope is submitted as a single-root BoC.

use crate::tvm::cell::Cell;
use crate::tvm::error::{CellError, CellResult};
use base64::Engine;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// BoC magic number for the generic format
const BOC_GENERIC_MAGIC: u32 = 0xb5ee9c72;

/// Serializes a cell tree into a single-root BoC
///
/// Cells are written in topological order with the root first, so every
/// reference points at a cell with a larger index.
pub fn serialize_boc(root: &Arc<Cell>, has_crc32c: bool) -> CellResult<Vec<u8>> {
    let cells = collect_cells(root);
    let index: HashMap<[u8; 32], usize> = cells
        .iter()
        .enumerate()
        .map(|(idx, cell)| (cell.hash(), idx))
        .collect();

    let size_bytes = bytes_needed(cells.len());

    let mut serialized_cells = Vec::new();
    for cell in &cells {
        serialized_cells.extend_from_slice(&cell.descriptors());
        serialized_cells.extend_from_slice(&cell.serialize_data());
        for reference in cell.references() {
            let ref_idx = index
                .get(&reference.hash())
                .ok_or_else(|| CellError::InvalidBoc("reference not collected".into()))?;
            write_uint(&mut serialized_cells, *ref_idx, size_bytes);
        }
    }

    let offset_bytes = bytes_needed(serialized_cells.len());

    let mut result = Vec::with_capacity(serialized_cells.len() + 32);
    result.extend_from_slice(&BOC_GENERIC_MAGIC.to_be_bytes());

    // has_idx:1 has_crc32c:1 has_cache_bits:1 flags:2 size:3
    let flags = if has_crc32c { 0x40u8 } else { 0x00 };
    result.push(flags | size_bytes as u8);
    result.push(offset_bytes as u8);

    write_uint(&mut result, cells.len(), size_bytes);
    // one root, no absent cells
    write_uint(&mut result, 1, size_bytes);
    write_uint(&mut result, 0, size_bytes);
    write_uint(&mut result, serialized_cells.len(), offset_bytes);
    // root index
    write_uint(&mut result, 0, size_bytes);

    result.extend_from_slice(&serialized_cells);

    if has_crc32c {
        let crc = crate::crc::CRC32C.checksum(&result);
        result.extend_from_slice(&crc.to_le_bytes());
    }

    Ok(result)
}

/// Deserializes a single-root BoC into its root cell
pub fn deserialize_boc(data: &[u8]) -> CellResult<Arc<Cell>> {
    let mut pos = 0;

    let magic = read_uint(data, &mut pos, 4)? as u32;
    if magic != BOC_GENERIC_MAGIC {
        return Err(CellError::InvalidBoc(format!(
            "unsupported magic 0x{magic:08x}"
        )));
    }

    let flags_and_size = read_uint(data, &mut pos, 1)? as u8;
    let has_idx = flags_and_size & 0x80 != 0;
    let has_crc32c = flags_and_size & 0x40 != 0;
    let size_bytes = (flags_and_size & 0x07) as usize;
    if size_bytes == 0 || size_bytes > 4 {
        return Err(CellError::InvalidBoc(format!("invalid size_bytes: {size_bytes}")));
    }

    let offset_bytes = read_uint(data, &mut pos, 1)?;
    if offset_bytes == 0 || offset_bytes > 8 {
        return Err(CellError::InvalidBoc(format!("invalid offset_bytes: {offset_bytes}")));
    }

    let cells_count = read_uint(data, &mut pos, size_bytes)?;
    let roots_count = read_uint(data, &mut pos, size_bytes)?;
    if roots_count != 1 {
        return Err(CellError::InvalidBoc(format!(
            "expected a single root, found {roots_count}"
        )));
    }
    let _absent_count = read_uint(data, &mut pos, size_bytes)?;
    let cells_size = read_uint(data, &mut pos, offset_bytes)?;
    let root_idx = read_uint(data, &mut pos, size_bytes)?;

    if has_idx {
        pos += cells_count * offset_bytes;
    }

    let cells_end = pos
        .checked_add(cells_size)
        .filter(|end| *end <= data.len())
        .ok_or_else(|| CellError::InvalidBoc("cells data exceeds buffer".into()))?;

    if has_crc32c {
        if data.len() < cells_end + 4 {
            return Err(CellError::InvalidBoc("missing CRC32C".into()));
        }
        let expected = u32::from_le_bytes([
            data[cells_end],
            data[cells_end + 1],
            data[cells_end + 2],
            data[cells_end + 3],
        ]);
        let actual = crate::crc::CRC32C.checksum(&data[..cells_end]);
        if expected != actual {
            return Err(CellError::InvalidBoc(format!(
                "CRC32C mismatch: expected 0x{expected:08x}, got 0x{actual:08x}"
            )));
        }
    }

    let cells = parse_cells(&data[pos..cells_end], cells_count, size_bytes)?;
    cells
        .get(root_idx)
        .cloned()
        .ok_or_else(|| CellError::InvalidBoc(format!("invalid root index: {root_idx}")))
}

struct RawCell {
    data: Vec<u8>,
    bit_len: usize,
    refs: Vec<usize>,
}

fn parse_cells(data: &[u8], count: usize, size_bytes: usize) -> CellResult<Vec<Arc<Cell>>> {
    let mut pos = 0;
    let mut raw_cells = Vec::with_capacity(count);

    for idx in 0..count {
        let d1 = read_uint(data, &mut pos, 1)? as u8;
        let d2 = read_uint(data, &mut pos, 1)? as usize;

        if d1 & 0x08 != 0 {
            return Err(CellError::InvalidBoc("exotic cells are not supported".into()));
        }
        let ref_count = (d1 & 0x07) as usize;
        if ref_count > crate::tvm::MAX_CELL_REFS {
            return Err(CellError::InvalidBoc(format!("invalid ref count {ref_count}")));
        }

        let data_size = d2.div_ceil(2);
        let cell_data = data
            .get(pos..pos + data_size)
            .ok_or_else(|| CellError::InvalidBoc("cell data exceeds buffer".into()))?
            .to_vec();
        pos += data_size;

        let bit_len = if d2 % 2 == 0 {
            data_size * 8
        } else {
            // Partial byte: the lowest set bit of the last byte is the completion tag
            let last_byte = cell_data[data_size - 1];
            if last_byte == 0 {
                return Err(CellError::InvalidBoc("missing completion tag".into()));
            }
            data_size * 8 - last_byte.trailing_zeros() as usize - 1
        };

        let mut refs = Vec::with_capacity(ref_count);
        for _ in 0..ref_count {
            let ref_idx = read_uint(data, &mut pos, size_bytes)?;
            if ref_idx <= idx || ref_idx >= count {
                return Err(CellError::InvalidBoc(format!(
                    "cell {idx} references invalid index {ref_idx}"
                )));
            }
            refs.push(ref_idx);
        }

        raw_cells.push(RawCell {
            data: cell_data,
            bit_len,
            refs,
        });
    }

    // References always point forward, so build from the last cell backwards
    let mut cells: Vec<Option<Arc<Cell>>> = vec![None; count];
    for (idx, raw) in raw_cells.into_iter().enumerate().rev() {
        let references = raw
            .refs
            .iter()
            .map(|r| cells[*r].clone())
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| CellError::InvalidBoc("unresolved reference".into()))?;
        cells[idx] = Some(Arc::new(Cell::new(raw.data, raw.bit_len, references)?));
    }

    Ok(cells.into_iter().flatten().collect())
}

/// Collects unique cells, parents before children
fn collect_cells(root: &Arc<Cell>) -> Vec<Arc<Cell>> {
    let mut post_order = Vec::new();
    let mut visited = HashSet::new();
    collect_cells_recursive(root, &mut post_order, &mut visited);
    post_order.reverse();
    post_order
}

fn collect_cells_recursive(
    cell: &Arc<Cell>,
    cells: &mut Vec<Arc<Cell>>,
    visited: &mut HashSet<[u8; 32]>,
) {
    if visited.contains(&cell.hash()) {
        return;
    }

    for reference in cell.references() {
        collect_cells_recursive(reference, cells, visited);
    }

    visited.insert(cell.hash());
    cells.push(cell.clone());
}

fn bytes_needed(value: usize) -> usize {
    let bits = (usize::BITS - value.leading_zeros()) as usize;
    bits.div_ceil(8).max(1)
}

fn write_uint(buf: &mut Vec<u8>, value: usize, size: usize) {
    let bytes = (value as u64).to_be_bytes();
    buf.extend_from_slice(&bytes[8 - size..]);
}

fn read_uint(data: &[u8], pos: &mut usize, size: usize) -> CellResult<usize> {
    let bytes = data
        .get(*pos..*pos + size)
        .ok_or_else(|| CellError::InvalidBoc("unexpected end of data".into()))?;
    *pos += size;

    Ok(bytes.iter().fold(0usize, |acc, b| (acc << 8) | *b as usize))
}

/// Decodes a hex string into a root cell
pub fn hex_to_boc(hex: &str) -> CellResult<Arc<Cell>> {
    let bytes = hex::decode(hex.trim())
        .map_err(|e| CellError::InvalidBoc(format!("failed to decode hex: {e}")))?;
    deserialize_boc(&bytes)
}

/// Encodes a root cell as base64 BoC
pub fn boc_to_base64(cell: &Arc<Cell>, has_crc32c: bool) -> CellResult<String> {
    let bytes = serialize_boc(cell, has_crc32c)?;
    Ok(base64::engine::general_purpose::STANDARD.encode(bytes))
}

/// Decodes a base64 BoC into its root cell
pub fn base64_to_boc(b64: &str) -> CellResult<Arc<Cell>> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(b64.trim())
        .map_err(|e| CellError::InvalidBoc(format!("failed to decode base64: {e}")))?;
    deserialize_boc(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tvm::{Builder, CellBuilder};

    #[test]
    fn test_serialize_deserialize_simple() {
        let mut builder = CellBuilder::new();
        builder.store_u32(0x12345678).unwrap();
        let cell = builder.build().unwrap();

        let boc = serialize_boc(&cell, false).unwrap();
        let deserialized = deserialize_boc(&boc).unwrap();

        assert_eq!(cell.hash(), deserialized.hash());
    }

    #[test]
    fn test_known_encoding() {
        let mut builder = CellBuilder::new();
        builder.store_u32(0x0000000F).unwrap();
        let cell = builder.build().unwrap();

        let boc = serialize_boc(&cell, false).unwrap();
        assert_eq!(hex::encode(boc), "b5ee9c720101010100060000080000000f");
    }

    #[test]
    fn test_partial_byte_bit_length() {
        let mut builder = CellBuilder::new();
        builder.store_uint(0b10110, 5).unwrap();
        let cell = builder.build().unwrap();

        let decoded = deserialize_boc(&serialize_boc(&cell, true).unwrap()).unwrap();
        assert_eq!(decoded.bit_len(), 5);
        assert_eq!(decoded.hash(), cell.hash());
    }

    #[test]
    fn test_shared_children_and_order() {
        let leaf = {
            let mut b = Builder::new();
            b.store_u32(7).unwrap();
            b.build().unwrap()
        };
        let mut left = Builder::new();
        left.store_ref(leaf.clone()).unwrap();
        let left = left.build().unwrap();

        let mut root = Builder::new();
        root.store_u32(999).unwrap();
        root.store_ref(left).unwrap();
        root.store_ref(leaf).unwrap();
        let root = root.build().unwrap();

        let boc = serialize_boc(&root, true).unwrap();
        // three unique cells
        assert_eq!(boc[6], 3);

        let decoded = deserialize_boc(&boc).unwrap();
        assert_eq!(decoded.hash(), root.hash());
    }

    #[test]
    fn test_crc_mismatch() {
        let cell = CellBuilder::new().build().unwrap();
        let mut boc = serialize_boc(&cell, true).unwrap();
        let last = boc.len() - 1;
        boc[last] ^= 0xFF;

        assert!(matches!(
            deserialize_boc(&boc).unwrap_err(),
            CellError::InvalidBoc(_)
        ));
    }

    #[test]
    fn test_base64_and_hex_conversion() {
        let mut builder = CellBuilder::new();
        builder.store_byte(0xFF).unwrap();
        let cell = builder.build().unwrap();

        let b64 = boc_to_base64(&cell, false).unwrap();
        assert_eq!(base64_to_boc(&b64).unwrap().hash(), cell.hash());

        let hex = hex::encode(serialize_boc(&cell, false).unwrap());
        assert_eq!(hex_to_boc(&hex).unwrap().hash(), cell.hash());
    }
}
