//! Jetton and NFT transfer composition, V5R1 batched submission and
//! confirmation tracking for TON wallets.

pub mod cli;
pub mod client;
pub mod config;
pub mod crc;
pub mod error;
pub mod messages;
pub mod models;
pub mod tvm;
pub mod utils;
pub mod wallet;

pub use config::WalletConfig;
pub use error::{EncodingError, TransferError};
pub use wallet::Wallet;
