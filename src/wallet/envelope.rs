//! Wallet V5R1 signed envelopes
//!
//! ```text
//! signed_request$_ prefix:#7369676e wallet_id:uint32 valid_until:uint32
//!     msg_seqno:uint32 out_actions:(Maybe ^OutList) has_other_actions:(## 1)
//!     signature:bits512
//!
//! out_list_empty$_ = OutList 0;
//! out_list$_ prev:^(OutList n) action:OutAction = OutList (n + 1);
//! action_send_msg#0ec3c86d mode:(## 8) out_msg:^(MessageRelaxed Any) = OutAction;
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::TransferError;
use crate::messages::InternalMessage;
use crate::tvm::{Address, Builder, Cell, CellResult};
use crate::wallet::signer::Signer;

/// V5R1 accepts at most 255 actions per request
pub const MAX_MESSAGES: usize = 255;

const OP_SIGNED_EXTERNAL: u32 = 0x7369676e;
const OP_ACTION_SEND_MSG: u32 = 0x0ec3c86d;

/// Components of the V5R1 wallet id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletId {
    pub network_global_id: i32,
    pub workchain: i8,
    pub subwallet: u16,
}

impl WalletId {
    pub const MAINNET_GLOBAL_ID: i32 = -239;
    pub const TESTNET_GLOBAL_ID: i32 = -3;

    pub fn mainnet(workchain: i8) -> Self {
        Self {
            network_global_id: Self::MAINNET_GLOBAL_ID,
            workchain,
            subwallet: 0,
        }
    }

    pub fn testnet(workchain: i8) -> Self {
        Self {
            network_global_id: Self::TESTNET_GLOBAL_ID,
            ..Self::mainnet(workchain)
        }
    }

    /// The 32-bit id stored in the wallet contract and in every request
    pub fn id(&self) -> u32 {
        // is_client:1 workchain:int8 wallet_version:uint8 subwallet_number:uint15
        let context = (1u32 << 31)
            | ((self.workchain as u8 as u32) << 23)
            | (self.subwallet as u32 & 0x7fff);
        (self.network_global_id as u32) ^ context
    }
}

/// Ordered messages bound to one wallet seqno
#[derive(Debug, Clone)]
pub struct Envelope {
    messages: Vec<InternalMessage>,
    seqno: u32,
    wallet_id: u32,
    valid_until: u32,
}

impl Envelope {
    pub fn new(
        messages: Vec<InternalMessage>,
        seqno: u32,
        wallet_id: u32,
        valid_until: u32,
    ) -> Result<Self, TransferError> {
        check_batch_size(messages.len())?;
        Ok(Self {
            messages,
            seqno,
            wallet_id,
            valid_until,
        })
    }

    pub fn messages(&self) -> &[InternalMessage] {
        &self.messages
    }

    pub fn seqno(&self) -> u32 {
        self.seqno
    }

    pub fn wallet_id(&self) -> u32 {
        self.wallet_id
    }

    pub fn valid_until(&self) -> u32 {
        self.valid_until
    }

    /// Action list; the first message ends up deepest and is executed first
    fn out_list(&self) -> CellResult<Arc<Cell>> {
        let mut list = Arc::new(Cell::empty());
        for message in &self.messages {
            let mut builder = Builder::new();
            builder
                .store_ref(list)?
                .store_u32(OP_ACTION_SEND_MSG)?
                .store_byte(message.mode.bits())?
                .store_ref(message.to_cell()?)?;
            list = builder.build()?;
        }
        Ok(list)
    }

    /// The request without its signature; its hash is what gets signed
    pub fn signing_cell(&self) -> CellResult<Arc<Cell>> {
        let mut builder = Builder::new();
        builder
            .store_u32(OP_SIGNED_EXTERNAL)?
            .store_u32(self.wallet_id)?
            .store_u32(self.valid_until)?
            .store_u32(self.seqno)?
            .store_maybe_ref(Some(self.out_list()?))?
            .store_bit(false)?;
        builder.build()
    }

    pub fn sign(&self, signer: &dyn Signer) -> Result<SignedEnvelope, TransferError> {
        let unsigned = self.signing_cell()?;
        let signature = signer.sign(&unsigned.hash());

        let mut builder = Builder::new();
        builder.store_cell(&unsigned)?.store_bytes(&signature)?;

        Ok(SignedEnvelope {
            body: builder.build()?,
            signature,
        })
    }
}

pub(crate) fn check_batch_size(count: usize) -> Result<(), TransferError> {
    match count {
        0 => Err(TransferError::EmptyBatch),
        n if n > MAX_MESSAGES => Err(TransferError::TooManyMessages {
            count: n,
            max: MAX_MESSAGES,
        }),
        _ => Ok(()),
    }
}

/// Signed request body, ready to be wrapped into an external message
#[derive(Debug, Clone)]
pub struct SignedEnvelope {
    body: Arc<Cell>,
    signature: [u8; 64],
}

impl SignedEnvelope {
    pub fn body(&self) -> &Arc<Cell> {
        &self.body
    }

    pub fn signature(&self) -> &[u8; 64] {
        &self.signature
    }

    /// `ext_in_msg_info$10 src:addr_none dest import_fee:0`, no state init, body by reference.
    ///
    /// The hash of the returned cell identifies the inbound message of the
    /// resulting transaction.
    pub fn external_message(&self, wallet: &Address) -> CellResult<Arc<Cell>> {
        let mut builder = Builder::new();
        builder
            .store_uint(0b10, 2)?
            .store_address(None)?
            .store_address(Some(wallet))?
            .store_coins(0)?
            .store_bit(false)?
            .store_bit(true)?
            .store_ref(self.body.clone())?;
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tvm::Slice;
    use crate::wallet::Ed25519Signer;
    use ed25519_dalek::{Signature, Verifier, VerifyingKey};

    fn message(tag: u8) -> InternalMessage {
        let mut body = Builder::new();
        body.store_byte(tag).unwrap();
        InternalMessage::new(Address::new(0, [tag; 32]), 1, body.build().unwrap())
    }

    #[test]
    fn test_wallet_id() {
        assert_eq!(WalletId::mainnet(0).id(), 2147483409);
        assert_eq!(WalletId::testnet(0).id(), 2147483645);
        assert_eq!(
            WalletId {
                subwallet: 1,
                ..WalletId::mainnet(0)
            }
            .id(),
            2147483408
        );
        assert_eq!(WalletId::mainnet(-1).id(), 0x7FFFFF11 ^ (0xFF << 23));
    }

    #[test]
    fn test_batch_limits() {
        assert!(matches!(
            Envelope::new(vec![], 1, 0, 0),
            Err(TransferError::EmptyBatch)
        ));
        assert!(matches!(
            Envelope::new(vec![message(1); MAX_MESSAGES + 1], 1, 0, 0),
            Err(TransferError::TooManyMessages { count: 256, max: 255 })
        ));
        assert!(Envelope::new(vec![message(1); MAX_MESSAGES], 1, 0, 0).is_ok());
    }

    #[test]
    fn test_action_order() {
        let messages = vec![message(1), message(2), message(3)];
        let envelope = Envelope::new(messages.clone(), 5, 7, 9).unwrap();
        let list = envelope.out_list().unwrap();

        // Walk from the outermost (last) action down to the empty list
        let mut seen = Vec::new();
        let mut node = list;
        while node.reference_count() > 0 {
            let mut slice = Slice::new(node);
            let prev = slice.load_reference().unwrap();
            assert_eq!(slice.load_u32().unwrap(), OP_ACTION_SEND_MSG);
            assert_eq!(slice.load_byte().unwrap(), 3);
            seen.push(slice.load_reference().unwrap().hash());
            node = prev;
        }
        seen.reverse();

        let expected: Vec<_> = messages.iter().map(|m| m.to_cell().unwrap().hash()).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_signed_layout() {
        let signer = Ed25519Signer::from_seed([3u8; 32]);
        let envelope = Envelope::new(vec![message(1)], 42, 2147483409, 1_700_000_000).unwrap();
        let signed = envelope.sign(&signer).unwrap();

        let mut slice = Slice::new(signed.body().clone());
        assert_eq!(slice.load_u32().unwrap(), OP_SIGNED_EXTERNAL);
        assert_eq!(slice.load_u32().unwrap(), 2147483409);
        assert_eq!(slice.load_u32().unwrap(), 1_700_000_000);
        assert_eq!(slice.load_u32().unwrap(), 42);
        assert!(slice.load_bit().unwrap());
        assert!(!slice.load_bit().unwrap());
        let signature: [u8; 64] = slice.load_bytes(64).unwrap().try_into().unwrap();
        assert_eq!(&signature, signed.signature());
        assert_eq!(slice.remaining_bits(), 0);

        let key = VerifyingKey::from_bytes(&signer.public_key()).unwrap();
        let hash = envelope.signing_cell().unwrap().hash();
        assert!(key.verify(&hash, &Signature::from_bytes(&signature)).is_ok());
    }

    #[test]
    fn test_external_message() {
        let signer = Ed25519Signer::from_seed([3u8; 32]);
        let wallet = Address::new(0, [0x42; 32]);
        let signed = Envelope::new(vec![message(1)], 0, 0, 0)
            .unwrap()
            .sign(&signer)
            .unwrap();
        let external = signed.external_message(&wallet).unwrap();

        let mut slice = Slice::new(external);
        assert_eq!(slice.load_uint(2).unwrap(), 0b10);
        assert_eq!(slice.load_address().unwrap(), None);
        assert_eq!(slice.load_address().unwrap(), Some(wallet));
        assert_eq!(slice.load_coins().unwrap(), 0);
        assert!(!slice.load_bit().unwrap());
        assert!(slice.load_bit().unwrap());
        assert_eq!(slice.load_reference().unwrap().hash(), signed.body().hash());
    }
}
