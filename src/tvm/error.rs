use thiserror::Error;

/// Errors produced while building, reading or (de)serializing cells
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CellError {
    #[error("Cell overflow: {bits} bits / {refs} references exceed the 1023 bits / 4 references limit")]
    CellOverflow { bits: usize, refs: usize },
    #[error("Builder is already sealed")]
    BuilderSealed,
    #[error("Cannot store a {0}-bit integer: at most 64 bits supported")]
    IntegerTooWide(usize),
    #[error("Value {value} does not fit in {bits} bits")]
    ValueTooLarge { value: u64, bits: usize },
    #[error("Coins value {0} does not fit in VarUInteger 16")]
    CoinsOverflow(u128),
    #[error("Not enough bits: requested {requested}, available {available}")]
    NotEnoughBits { requested: usize, available: usize },
    #[error("No more references to read")]
    NotEnoughRefs,
    #[error("Invalid cell data: {0}")]
    InvalidData(String),
    #[error("Invalid UTF-8 in string payload")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
    #[error("Invalid bag of cells: {0}")]
    InvalidBoc(String),
}

pub type CellResult<T> = std::result::Result<T, CellError>;
