//! Text comments carried as transfer forward payloads

use std::sync::Arc;

use crate::error::EncodingError;
use crate::tvm::{Builder, Cell, CellError, CellResult, MAX_CELL_BITS, SNAKE_CHUNK_BYTES, Slice};

/// Op-code prefix marking a plain text comment
pub const OP_COMMENT: u32 = 0;

/// Cells a comment may span, the comment cell included.
///
/// A comment sits at the bottom of the deepest out-list branch, so its chain
/// has to leave room for 255 actions plus the envelope cells above it within
/// the 1024 cell depth limit.
pub const MAX_COMMENT_CELLS: usize = 512;

/// Longest comment text in bytes
pub const MAX_COMMENT_BYTES: usize =
    (MAX_CELL_BITS - 32) / 8 + (MAX_COMMENT_CELLS - 1) * SNAKE_CHUNK_BYTES;

/// Builds `[0:32 | snake text]`
pub fn build_comment_cell(text: &str) -> Result<Arc<Cell>, EncodingError> {
    if text.len() > MAX_COMMENT_BYTES {
        return Err(EncodingError::CommentTooLong {
            len: text.len(),
            max: MAX_COMMENT_BYTES,
        });
    }

    let mut builder = Builder::new();
    builder.store_u32(OP_COMMENT)?.store_snake_string(text)?;
    Ok(builder.build()?)
}

/// Stores `forward_payload:(Either Cell ^Cell)`.
///
/// A non-empty comment goes into a referenced comment cell; no comment (or an
/// empty one) is an empty inline payload.
pub fn store_forward_payload(
    builder: &mut Builder,
    comment: Option<&str>,
) -> Result<(), EncodingError> {
    match comment.filter(|text| !text.is_empty()) {
        Some(text) => store_comment_ref(builder, text),
        None => {
            builder.store_bit(false)?;
            Ok(())
        }
    }
}

/// Stores `forward_payload` as a referenced comment cell, even for empty text
pub fn store_comment_ref(builder: &mut Builder, text: &str) -> Result<(), EncodingError> {
    let comment = build_comment_cell(text)?;
    builder.store_bit(true)?.store_ref(comment)?;
    Ok(())
}

/// Reads the text back from a comment cell
pub fn parse_comment(cell: Arc<Cell>) -> CellResult<String> {
    let mut slice = Slice::new(cell);
    let op = slice.load_u32()?;
    if op != OP_COMMENT {
        return Err(CellError::InvalidData(format!(
            "not a text comment (op {op:#010x})"
        )));
    }
    slice.load_snake_string()
}
