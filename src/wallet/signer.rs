use derivative::Derivative;
use ed25519_dalek::{Signer as _, SigningKey};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum KeyError {
    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("expected 32 or 64 bytes, got {0}")]
    Length(usize),

    #[error("public key half does not match the seed")]
    PublicKeyMismatch,
}

/// Signing capability injected into a wallet account
pub trait Signer: Send + Sync {
    fn public_key(&self) -> [u8; 32];

    /// Ed25519 signature over `message`
    fn sign(&self, message: &[u8]) -> [u8; 64];
}

/// Local Ed25519 key
#[derive(Derivative, Clone)]
#[derivative(Debug)]
pub struct Ed25519Signer {
    #[derivative(Debug = "ignore")]
    key: SigningKey,
    #[derivative(Debug(format_with = "fmt_hex"))]
    public_key: [u8; 32],
}

fn fmt_hex(bytes: &[u8; 32], f: &mut std::fmt::Formatter) -> std::fmt::Result {
    f.write_str(&hex::encode(bytes))
}

impl Ed25519Signer {
    pub fn from_seed(seed: [u8; 32]) -> Self {
        let key = SigningKey::from_bytes(&seed);
        Self {
            public_key: key.verifying_key().to_bytes(),
            key,
        }
    }

    /// Accepts a 32-byte seed or a 64-byte `seed || public key` pair, hex encoded
    pub fn from_hex(secret: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(secret.trim())?;
        if bytes.len() != 32 && bytes.len() != 64 {
            return Err(KeyError::Length(bytes.len()));
        }

        let mut seed = [0u8; 32];
        seed.copy_from_slice(&bytes[..32]);

        let signer = Self::from_seed(seed);
        if bytes.len() == 64 && bytes[32..] != signer.public_key {
            return Err(KeyError::PublicKeyMismatch);
        }
        Ok(signer)
    }
}

impl Signer for Ed25519Signer {
    fn public_key(&self) -> [u8; 32] {
        self.public_key
    }

    fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.key.sign(message).to_bytes()
    }
}
