use std::sync::Arc;

use derivative::Derivative;
use tokio::sync::{Mutex, MutexGuard, RwLock};

use crate::client::{ChainApi, StackEntry};
use crate::error::TransferError;
use crate::tvm::Address;
use crate::wallet::signer::Signer;

/// Last observed on-chain state of the wallet
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalletAccountState {
    pub seqno: Option<u32>,
    pub balance: Option<u64>,
}

/// A wallet contract together with the key that controls it
///
/// Submissions through one account handle are serialized: the lock returned by
/// [`WalletAccount::lock_submission`] is held from seqno fetch until the
/// envelope is confirmed or the wait gives up.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct WalletAccount {
    address: Address,
    #[derivative(Debug(format_with = "fmt_signer"))]
    signer: Arc<dyn Signer>,
    #[derivative(Debug = "ignore")]
    api: Arc<dyn ChainApi>,
    state: RwLock<WalletAccountState>,
    #[derivative(Debug = "ignore")]
    submission: Mutex<()>,
}

fn fmt_signer(signer: &Arc<dyn Signer>, f: &mut std::fmt::Formatter) -> std::fmt::Result {
    f.write_str(&hex::encode(signer.public_key()))
}

impl WalletAccount {
    pub fn new(address: Address, signer: Arc<dyn Signer>, api: Arc<dyn ChainApi>) -> Self {
        Self {
            address,
            signer,
            api,
            state: RwLock::new(WalletAccountState::default()),
            submission: Mutex::new(()),
        }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn signer(&self) -> &dyn Signer {
        self.signer.as_ref()
    }

    pub fn api(&self) -> &dyn ChainApi {
        self.api.as_ref()
    }

    /// Public key of the local signer
    pub fn public_key(&self) -> [u8; 32] {
        self.signer.public_key()
    }

    pub async fn state(&self) -> WalletAccountState {
        self.state.read().await.clone()
    }

    /// Balance in nanotons
    pub async fn balance(&self) -> Result<u64, TransferError> {
        let balance = self.api.get_balance(&self.address).await?;
        self.state.write().await.balance = Some(balance);
        Ok(balance)
    }

    /// Current seqno as reported by the chain
    pub async fn seqno(&self) -> Result<u32, TransferError> {
        let seqno = self.api.get_seqno(&self.address).await?;
        self.state.write().await.seqno = Some(seqno);
        Ok(seqno)
    }

    /// Public key stored in another wallet contract (`get_public_key` get-method)
    pub async fn public_key_of(&self, wallet: &Address) -> Result<[u8; 32], TransferError> {
        let stack = self
            .api
            .run_get_method(wallet, "get_public_key", Vec::new())
            .await?;

        let value = stack
            .first()
            .and_then(StackEntry::as_num)
            .ok_or_else(|| {
                TransferError::InvalidResponse("get_public_key returned no number".into())
            })?;

        let bytes = value.to_bytes_be();
        if bytes.len() > 32 {
            return Err(TransferError::InvalidResponse(format!(
                "public key is {} bytes long",
                bytes.len()
            )));
        }

        let mut key = [0u8; 32];
        key[32 - bytes.len()..].copy_from_slice(&bytes);
        Ok(key)
    }

    pub(crate) async fn lock_submission(&self) -> MutexGuard<'_, ()> {
        self.submission.lock().await
    }

    pub(crate) async fn record_confirmed(&self, used_seqno: u32) {
        let mut state = self.state.write().await;
        state.seqno = Some(used_seqno.wrapping_add(1));
        state.balance = None;
    }
}
