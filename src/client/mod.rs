pub mod base;
pub mod toncenter_v3;

pub use base::{ApiError, ChainApi, ClientParams, StackEntry, TransactionRecord};
pub use toncenter_v3::ToncenterV3Client;
