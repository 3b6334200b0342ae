//! NFT ownership transfers

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::EncodingError;
use crate::messages::{InternalMessage, MAX_COINS, TransferOptions, store_comment_ref};
use crate::tvm::{Address, Builder, Cell};

/// `transfer` op of the NFT item contract
pub const OP_NFT_TRANSFER: u32 = 0x5fcc3d14;

/// Moves one NFT item to a new owner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NftTransfer {
    #[serde(rename = "address_nft")]
    pub nft_address: String,
    #[serde(rename = "address_target")]
    pub new_owner: String,
    #[serde(rename = "message", default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl NftTransfer {
    pub fn new(
        nft_address: impl Into<String>,
        new_owner: impl Into<String>,
        comment: Option<String>,
    ) -> Self {
        Self {
            nft_address: nft_address.into(),
            new_owner: new_owner.into(),
            comment,
        }
    }

    /// Builds the transfer body
    ///
    /// ```text
    /// transfer#5fcc3d14 query_id:uint64 new_owner:MsgAddress
    ///     response_destination:MsgAddress custom_payload:(Maybe ^Cell)
    ///     forward_amount:Coins forward_payload:(Either Cell ^Cell)
    /// ```
    ///
    /// The forward payload is always a referenced comment cell, empty when no
    /// comment is given.
    pub fn body(
        &self,
        response: &Address,
        forward_amount: u128,
    ) -> Result<Arc<Cell>, EncodingError> {
        if forward_amount > MAX_COINS {
            return Err(EncodingError::AmountOverflow(forward_amount));
        }
        let new_owner = Address::parse(&self.new_owner)?;

        let mut builder = Builder::new();
        builder
            .store_u32(OP_NFT_TRANSFER)?
            .store_u64(0)?
            .store_address(Some(&new_owner))?
            .store_address(Some(response))?
            .store_bit(false)?
            .store_coins(forward_amount)?;
        store_comment_ref(&mut builder, self.comment.as_deref().unwrap_or_default())?;

        Ok(builder.build()?)
    }

    /// Wraps the body into a message to the NFT item contract
    pub fn compose(
        &self,
        response: &Address,
        options: &TransferOptions,
    ) -> Result<InternalMessage, EncodingError> {
        let nft_address = Address::parse(&self.nft_address)?;
        let body = self.body(response, options.forward_amount)?;
        Ok(InternalMessage::new(nft_address, options.forward_reserve, body))
    }
}
