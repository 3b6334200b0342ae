use serde::{Deserialize, Serialize};
use serde_with::base64::Base64;
use serde_with::serde_as;


#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(untagged)]
pub enum StringOrInt {
    String(String),
    Int(i64),
}


#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "snake_case")]
pub enum StackItemType {
    Num,
    Cell,
    Slice,
}


#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct V3StackEntity {
    pub(crate) r#type: Option<StackItemType>,
    pub(crate) value: Option<StringOrInt>,
}


#[derive(Debug, Serialize, Deserialize)]
pub struct V3RunGetMethodRequest {
    pub(crate) address: String,
    pub(crate) method: String,
    pub(crate) stack: Vec<V3StackEntity>,
}


#[derive(Debug, Serialize, Deserialize)]
pub struct V3RunGetMethodResult {
    pub(crate) exit_code: Option<i32>,
    pub(crate) stack: Option<Vec<V3StackEntity>>,
}


#[derive(Debug, Serialize, Deserialize)]
pub struct V3SendMessageRequest {
    pub(crate) boc: String,
}


#[derive(Debug, Serialize, Deserialize)]
pub struct V3SendMessageResult {
    pub(crate) message_hash: Option<String>,
    pub(crate) message_hash_norm: Option<String>,
}


#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub(crate) error: Option<String>,
}


#[derive(Debug, Serialize, Deserialize)]
pub struct WalletInformation {
    pub(crate) seqno: Option<u32>,
    pub(crate) status: Option<AccountStatus>,
}


#[derive(Debug, Serialize, Deserialize)]
pub struct AddressInformation {
    pub(crate) balance: Option<String>,
    pub(crate) status: Option<AccountStatus>,
}


#[derive(Debug, Serialize, Deserialize)]
pub struct ComputePhase {
    pub(crate) exit_code: Option<i32>,
}


#[derive(Debug, Serialize, Deserialize)]
pub struct TransactionDescr {
    pub(crate) aborted: Option<bool>,
    pub(crate) compute_ph: Option<ComputePhase>,
}


#[serde_as]
#[derive(Debug, Serialize, Deserialize)]
pub struct Transaction {
    pub(crate) description: Option<TransactionDescr>,
    #[serde_as(as = "Option<Base64>")]
    pub(crate) hash: Option<Vec<u8>>,
    pub(crate) lt: Option<String>,
    pub(crate) now: Option<u32>,
}


#[derive(Debug, Serialize, Deserialize)]
pub struct TransactionsResponse {
    pub(crate) transactions: Option<Vec<Transaction>>,
}


#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    Active,
    Uninit,
    Frozen,
    Nonexist,
}
