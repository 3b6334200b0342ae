//! Internal message composition for jetton and NFT transfers
//!
//! Every transfer instruction becomes one [`InternalMessage`] addressed to a
//! token contract (the sender's jetton wallet or the NFT item) carrying a
//! bit-packed transfer body. The composed messages are later packed into a
//! wallet envelope by [`crate::wallet::BatchSender`].

pub mod comment;
pub mod jetton;
pub mod nft;

use std::ops::BitOr;
use std::sync::Arc;

use crate::tvm::{Address, Builder, Cell, CellResult};

pub use comment::{
    MAX_COMMENT_BYTES, build_comment_cell, parse_comment, store_comment_ref, store_forward_payload,
};
pub use jetton::{JettonTransfer, OP_JETTON_TRANSFER};
pub use nft::{NftTransfer, OP_NFT_TRANSFER};

/// Largest value a VarUInteger 16 can hold
pub const MAX_COINS: u128 = (1u128 << 120) - 1;

/// 0.1 TON attached to every token transfer to pay for its execution
pub const DEFAULT_FORWARD_RESERVE: u128 = 100_000_000;

/// Nanotons forwarded to the recipient together with the transfer notification
pub const DEFAULT_FORWARD_AMOUNT: u128 = 1;

/// Action send mode flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SendMode(u8);

impl SendMode {
    pub const ORDINARY: SendMode = SendMode(0);
    pub const PAY_GAS_SEPARATELY: SendMode = SendMode(1);
    pub const IGNORE_ERRORS: SendMode = SendMode(2);
    pub const BOUNCE_IF_FAILED: SendMode = SendMode(16);
    pub const DESTROY_IF_ZERO: SendMode = SendMode(32);

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn contains(self, other: SendMode) -> bool {
        self.0 & other.0 == other.0
    }
}

impl Default for SendMode {
    /// Mode used for every transfer message: `PAY_GAS_SEPARATELY | IGNORE_ERRORS`
    fn default() -> Self {
        SendMode::PAY_GAS_SEPARATELY | SendMode::IGNORE_ERRORS
    }
}

impl BitOr for SendMode {
    type Output = SendMode;

    fn bitor(self, rhs: SendMode) -> SendMode {
        SendMode(self.0 | rhs.0)
    }
}

/// Amounts attached to composed transfer messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferOptions {
    /// Value of the internal message, pays the token contract's fees
    pub forward_reserve: u128,
    /// `forward_ton_amount` inside the transfer body
    pub forward_amount: u128,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            forward_reserve: DEFAULT_FORWARD_RESERVE,
            forward_amount: DEFAULT_FORWARD_AMOUNT,
        }
    }
}

/// An outgoing internal message with a sealed body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternalMessage {
    pub destination: Address,
    /// Attached value in nanotons
    pub value: u128,
    pub bounce: bool,
    pub mode: SendMode,
    pub body: Arc<Cell>,
}

impl InternalMessage {
    /// Bounceable message with the default send mode
    pub fn new(destination: Address, value: u128, body: Arc<Cell>) -> Self {
        Self {
            destination,
            value,
            bounce: true,
            mode: SendMode::default(),
            body,
        }
    }

    /// Serializes as `MessageRelaxed`; the wallet fills in source, fees and timestamps
    pub fn to_cell(&self) -> CellResult<Arc<Cell>> {
        let mut builder = Builder::new();

        // int_msg_info$0 ihr_disabled bounce bounced
        builder
            .store_bit(false)?
            .store_bit(true)?
            .store_bit(self.bounce)?
            .store_bit(false)?;
        builder
            .store_address(None)?
            .store_address(Some(&self.destination))?;
        // value:CurrencyCollection with empty extra currencies
        builder.store_coins(self.value)?.store_bit(false)?;
        // ihr_fee fwd_fee created_lt created_at
        builder
            .store_coins(0)?
            .store_coins(0)?
            .store_u64(0)?
            .store_u32(0)?;
        // no state init, body as reference
        builder.store_bit(false)?.store_bit(true)?;
        builder.store_ref(self.body.clone())?;

        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tvm::Slice;

    #[test]
    fn test_default_send_mode() {
        let mode = SendMode::default();
        assert_eq!(mode.bits(), 3);
        assert!(mode.contains(SendMode::IGNORE_ERRORS));
        assert!(!mode.contains(SendMode::BOUNCE_IF_FAILED));
    }

    #[test]
    fn test_internal_message_layout() {
        let destination = Address::new(0, [7u8; 32]);
        let body = Builder::new().build().unwrap();
        let message = InternalMessage::new(destination, DEFAULT_FORWARD_RESERVE, body.clone());

        let cell = message.to_cell().unwrap();
        assert_eq!(cell.reference_count(), 1);
        assert_eq!(cell.reference(0).unwrap().hash(), body.hash());

        let mut slice = Slice::new(cell);
        assert!(!slice.load_bit().unwrap()); // int_msg_info
        assert!(slice.load_bit().unwrap()); // ihr_disabled
        assert!(slice.load_bit().unwrap()); // bounce
        assert!(!slice.load_bit().unwrap()); // bounced
        assert_eq!(slice.load_address().unwrap(), None);
        assert_eq!(slice.load_address().unwrap(), Some(destination));
        assert_eq!(slice.load_coins().unwrap(), 100_000_000);
        assert!(!slice.load_bit().unwrap());
        assert_eq!(slice.load_coins().unwrap(), 0);
        assert_eq!(slice.load_coins().unwrap(), 0);
        assert_eq!(slice.load_u64().unwrap(), 0);
        assert_eq!(slice.load_u32().unwrap(), 0);
        assert!(!slice.load_bit().unwrap());
        assert!(slice.load_bit().unwrap());
        assert_eq!(slice.remaining_bits(), 0);
    }
}
