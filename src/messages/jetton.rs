//! Jetton (fungible token) transfers

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::EncodingError;
use crate::messages::{InternalMessage, MAX_COINS, TransferOptions, store_forward_payload};
use crate::tvm::{Address, Builder, Cell};

/// `transfer` op of the jetton wallet contract
pub const OP_JETTON_TRANSFER: u32 = 0x0f8a7ea5;

/// One jetton payout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JettonTransfer {
    /// Recipient owner address
    #[serde(rename = "wallet")]
    pub destination: String,
    /// Amount in the jetton's smallest units
    pub amount: u128,
    #[serde(rename = "message", default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl JettonTransfer {
    pub fn new(destination: impl Into<String>, amount: u128, comment: Option<String>) -> Self {
        Self {
            destination: destination.into(),
            amount,
            comment,
        }
    }

    /// Builds the transfer body
    ///
    /// ```text
    /// transfer#0f8a7ea5 query_id:uint64 amount:Coins destination:MsgAddress
    ///     response_destination:MsgAddress custom_payload:(Maybe ^Cell)
    ///     forward_ton_amount:Coins forward_payload:(Either Cell ^Cell)
    /// ```
    pub fn body(
        &self,
        response: &Address,
        forward_amount: u128,
    ) -> Result<Arc<Cell>, EncodingError> {
        if self.amount == 0 {
            return Err(EncodingError::ZeroAmount);
        }
        if self.amount > MAX_COINS {
            return Err(EncodingError::AmountOverflow(self.amount));
        }
        if forward_amount > MAX_COINS {
            return Err(EncodingError::AmountOverflow(forward_amount));
        }
        let destination = Address::parse(&self.destination)?;

        let mut builder = Builder::new();
        builder
            .store_u32(OP_JETTON_TRANSFER)?
            .store_u64(0)?
            .store_coins(self.amount)?
            .store_address(Some(&destination))?
            .store_address(Some(response))?
            .store_bit(false)?
            .store_coins(forward_amount)?;
        store_forward_payload(&mut builder, self.comment.as_deref())?;

        Ok(builder.build()?)
    }

    /// Wraps the body into a message to the sender's jetton wallet contract
    pub fn compose(
        &self,
        jetton_wallet: &Address,
        response: &Address,
        options: &TransferOptions,
    ) -> Result<InternalMessage, EncodingError> {
        let body = self.body(response, options.forward_amount)?;
        Ok(InternalMessage::new(*jetton_wallet, options.forward_reserve, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{MAX_COMMENT_BYTES, parse_comment};
    use crate::tvm::{AddressError, Slice};

    const DESTINATION: &str = "EQCD39VS5jcptHL8vMjEXrzGaRcCVYto7HUn4bpAOg8xqB2N";

    fn response() -> Address {
        Address::new(0, [0xAA; 32])
    }

    #[test]
    fn test_body_fields() {
        let transfer = JettonTransfer::new(DESTINATION, 1_000_000_000, Some("payout".into()));
        let body = transfer.body(&response(), 1).unwrap();

        let mut slice = Slice::new(body);
        assert_eq!(slice.load_u32().unwrap(), OP_JETTON_TRANSFER);
        assert_eq!(slice.load_u64().unwrap(), 0);
        assert_eq!(slice.load_coins().unwrap(), 1_000_000_000);
        assert_eq!(
            slice.load_address().unwrap(),
            Some(Address::parse(DESTINATION).unwrap())
        );
        assert_eq!(slice.load_address().unwrap(), Some(response()));
        assert!(!slice.load_bit().unwrap());
        assert_eq!(slice.load_coins().unwrap(), 1);
        assert!(slice.load_bit().unwrap());
        assert_eq!(parse_comment(slice.load_reference().unwrap()).unwrap(), "payout");
        assert!(slice.is_empty());
    }

    #[test]
    fn test_amount_decodes_exactly() {
        for amount in [1u128, 9, 255, 256, 1_000_000_000, u64::MAX as u128, MAX_COINS] {
            let body = JettonTransfer::new(DESTINATION, amount, None)
                .body(&response(), 1)
                .unwrap();
            let mut slice = Slice::new(body);
            slice.skip_bits(32 + 64).unwrap();
            assert_eq!(slice.load_coins().unwrap(), amount);
        }
    }

    #[test]
    fn test_without_comment() {
        let body = JettonTransfer::new(DESTINATION, 5, None)
            .body(&response(), 1)
            .unwrap();
        assert_eq!(body.reference_count(), 0);
    }

    #[test]
    fn test_comment_too_long() {
        let transfer = JettonTransfer::new(DESTINATION, 5, Some("x".repeat(200_000)));
        assert_eq!(
            transfer.body(&response(), 1),
            Err(EncodingError::CommentTooLong {
                len: 200_000,
                max: MAX_COMMENT_BYTES
            })
        );
    }

    #[test]
    fn test_rejects_bad_input() {
        let zero = JettonTransfer::new(DESTINATION, 0, None);
        assert_eq!(zero.body(&response(), 1), Err(EncodingError::ZeroAmount));

        let huge = JettonTransfer::new(DESTINATION, MAX_COINS + 1, None);
        assert_eq!(
            huge.body(&response(), 1),
            Err(EncodingError::AmountOverflow(MAX_COINS + 1))
        );

        let bad = JettonTransfer::new("EQCD39VS5jcptHL8vMjEXrzGaRcCVYto7HUn4bpAOg8xqB2M", 5, None);
        assert!(matches!(
            bad.body(&response(), 1),
            Err(EncodingError::Address(AddressError { .. }))
        ));
    }

    #[test]
    fn test_compose_targets_jetton_wallet() {
        let jetton_wallet = Address::new(0, [0x11; 32]);
        let message = JettonTransfer::new(DESTINATION, 7, None)
            .compose(&jetton_wallet, &response(), &TransferOptions::default())
            .unwrap();

        assert_eq!(message.destination, jetton_wallet);
        assert_eq!(message.value, 100_000_000);
        assert!(message.bounce);
        assert_eq!(message.mode.bits(), 3);
    }

    #[test]
    fn test_request_json() {
        let transfers: Vec<JettonTransfer> = serde_json::from_str(
            r#"[{"wallet": "EQCD39VS5jcptHL8vMjEXrzGaRcCVYto7HUn4bpAOg8xqB2N", "amount": 1000, "message": "hi"},
                {"wallet": "0:0000000000000000000000000000000000000000000000000000000000000000", "amount": 1}]"#,
        )
        .unwrap();

        assert_eq!(transfers[0].amount, 1000);
        assert_eq!(transfers[0].comment.as_deref(), Some("hi"));
        assert_eq!(transfers[1].comment, None);
    }
}
