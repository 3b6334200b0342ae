//! TVM (TON Virtual Machine) data structures and utilities
//!
//! This module provides the serialization primitives message bodies are made of:
//! - Cell: immutable unit of up to 1023 bits and up to 4 references
//! - CellBuilder / Builder: append-only construction, sealed into a Cell
//! - Slice: a reader for sequentially accessing cell data
//! - BoC: Bag of Cells serialization for submitting cell trees
//! - Address: TON internal address parsing and formatting

pub mod address;
pub mod boc;
pub mod builder;
pub mod cell;
pub mod error;
pub mod slice;

pub use address::{Address, AddressError};
pub use boc::{base64_to_boc, boc_to_base64, deserialize_boc, hex_to_boc, serialize_boc};
pub use builder::{Builder, SNAKE_CHUNK_BYTES};
pub use cell::{Cell, CellBuilder, MAX_CELL_BITS, MAX_CELL_REFS};
pub use error::{CellError, CellResult};
pub use slice::Slice;
