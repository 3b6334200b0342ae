use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::Engine;
use num_bigint::BigUint;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::client::base::{ApiError, ChainApi, ClientParams, StackEntry, TransactionRecord};
use crate::models::toncenter_v3::{
    AccountStatus, AddressInformation, ErrorResponse, StackItemType, StringOrInt,
    TransactionsResponse, V3RunGetMethodRequest, V3RunGetMethodResult, V3SendMessageRequest,
    V3SendMessageResult, V3StackEntity, WalletInformation,
};
use crate::tvm::Address;

pub const DEFAULT_BASE_URL: &str = "https://toncenter.com/api/v3";

/// `ChainApi` over the toncenter v3 indexer HTTP API
pub struct ToncenterV3Client {
    params: ClientParams,
    client: Client,
}

impl ToncenterV3Client {
    pub fn new(params: Option<ClientParams>) -> Result<Self, ApiError> {
        let params = params.unwrap_or_default();

        let mut builder = Client::builder();
        if let Some(timeout) = params.timeout {
            builder = builder.timeout(Duration::from_secs(timeout));
        }

        Ok(Self {
            client: builder.build()?,
            params,
        })
    }

    fn url(&self, endpoint: &str) -> String {
        let base_url = self.params.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        format!("{}/{}", base_url.trim_end_matches('/'), endpoint.trim_start_matches('/'))
    }

    fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.params.poll_interval.unwrap_or(1500))
    }

    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let mut request = self.client.get(self.url(endpoint)).query(query);
        if let Some(api_key) = &self.params.api_key {
            request = request.header("X-API-Key", api_key);
        }

        log::trace!("GET {} {:?}", endpoint, query);
        Self::handle(request.send().await?).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let mut request = self.client.post(self.url(endpoint)).json(body);
        if let Some(api_key) = &self.params.api_key {
            request = request.header("X-API-Key", api_key);
        }

        log::trace!("POST {}", endpoint);
        Self::handle(request.send().await?).await
    }

    async fn handle<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }

        let body = response.text().await?;
        Err(status_error(status, body))
    }
}

/// Maps a failed HTTP response to an error.
///
/// 404 means the indexer has nothing for the query yet. Other client errors
/// are rejections with the server's reason; rate limits and server errors are
/// transient.
fn status_error(status: StatusCode, body: String) -> ApiError {
    let reason = serde_json::from_str::<ErrorResponse>(&body)
        .ok()
        .and_then(|e| e.error)
        .unwrap_or(body);

    match status {
        StatusCode::NOT_FOUND => ApiError::AccountNotFound(reason),
        s if s.is_client_error() && s != StatusCode::TOO_MANY_REQUESTS => {
            ApiError::Rejected(reason)
        }
        s => ApiError::Network(format!("HTTP {}: {}", s, reason)),
    }
}

/// Picks the wallet transaction out of a `transactionsByMessage` response.
///
/// `Ok(None)` means it is not indexed yet. An aborted transaction is a
/// rejection carrying the compute phase exit code.
fn confirmed_transaction(
    response: TransactionsResponse,
) -> Result<Option<TransactionRecord>, ApiError> {
    let found = response
        .transactions
        .unwrap_or_default()
        .into_iter()
        .find_map(|tx| {
            let hash: [u8; 32] = tx.hash.as_deref()?.try_into().ok()?;
            Some((tx, hash))
        });

    let Some((tx, hash)) = found else {
        return Ok(None);
    };

    if let Some(descr) = &tx.description {
        if descr.aborted == Some(true) {
            let exit_code = descr.compute_ph.as_ref().and_then(|ph| ph.exit_code);
            return Err(ApiError::Rejected(match exit_code {
                Some(code) => format!("transaction aborted, exit code {code}"),
                None => "transaction aborted".to_string(),
            }));
        }
    }

    let lt = tx.lt.as_deref().unwrap_or("0");
    Ok(Some(TransactionRecord {
        hash,
        lt: lt
            .parse()
            .map_err(|e| ApiError::InvalidResponse(format!("invalid lt {lt}: {e}")))?,
        now: tx.now.unwrap_or_default(),
    }))
}

fn entity_to_stack_entry(entity: V3StackEntity) -> Result<StackEntry, ApiError> {
    let value = match entity.value {
        Some(StringOrInt::String(s)) => s,
        Some(StringOrInt::Int(i)) => i.to_string(),
        None => return Err(ApiError::InvalidResponse("stack entry without value".into())),
    };

    match entity.r#type {
        Some(StackItemType::Num) => {
            let parsed = match value.strip_prefix("0x") {
                Some(hex) => BigUint::parse_bytes(hex.as_bytes(), 16),
                None => BigUint::parse_bytes(value.as_bytes(), 10),
            };
            parsed
                .map(StackEntry::Num)
                .ok_or_else(|| ApiError::InvalidResponse(format!("invalid number {value}")))
        }
        Some(StackItemType::Cell) => Ok(StackEntry::Cell(value)),
        Some(StackItemType::Slice) => Ok(StackEntry::Slice(value)),
        None => Err(ApiError::InvalidResponse("stack entry without type".into())),
    }
}

fn stack_entry_to_entity(entry: StackEntry) -> V3StackEntity {
    let (kind, value) = match entry {
        StackEntry::Num(n) => (StackItemType::Num, format!("0x{n:x}")),
        StackEntry::Cell(boc) => (StackItemType::Cell, boc),
        StackEntry::Slice(boc) => (StackItemType::Slice, boc),
    };
    V3StackEntity {
        r#type: Some(kind),
        value: Some(StringOrInt::String(value)),
    }
}

#[async_trait]
impl ChainApi for ToncenterV3Client {
    async fn get_seqno(&self, address: &Address) -> Result<u32, ApiError> {
        let info: WalletInformation = self
            .get(
                "walletInformation",
                &[("address", address.to_raw()), ("use_v2", "false".into())],
            )
            .await?;

        match (info.seqno, info.status) {
            (Some(seqno), _) => Ok(seqno),
            (None, Some(AccountStatus::Uninit | AccountStatus::Nonexist)) => Ok(0),
            (None, status) => Err(ApiError::InvalidResponse(format!(
                "no seqno for {address} (status {status:?})"
            ))),
        }
    }

    async fn get_balance(&self, address: &Address) -> Result<u64, ApiError> {
        let info: AddressInformation = self
            .get("account", &[("address", address.to_raw())])
            .await?;

        if info.status == Some(AccountStatus::Nonexist) {
            return Err(ApiError::AccountNotFound(address.to_string()));
        }

        let balance = info
            .balance
            .ok_or_else(|| ApiError::InvalidResponse("account without balance".into()))?;
        balance
            .parse::<u64>()
            .map_err(|e| ApiError::InvalidResponse(format!("invalid balance {balance}: {e}")))
    }

    async fn send_message(&self, boc: &[u8]) -> Result<(), ApiError> {
        let request = V3SendMessageRequest {
            boc: base64::engine::general_purpose::STANDARD.encode(boc),
        };
        let result: V3SendMessageResult = self.post("message", &request).await?;

        log::debug!(
            "Message accepted: hash={:?} hash_norm={:?}",
            result.message_hash,
            result.message_hash_norm
        );
        Ok(())
    }

    async fn await_confirmation(
        &self,
        address: &Address,
        message_hash: &[u8; 32],
        timeout: Duration,
    ) -> Result<TransactionRecord, ApiError> {
        let started = Instant::now();
        let deadline = started + timeout;
        let msg_hash = hex::encode(message_hash);
        log::debug!("Waiting for message {} on {}", msg_hash, address);

        loop {
            let query = [("msg_hash", msg_hash.clone()), ("direction", "in".to_string())];
            match self
                .get::<TransactionsResponse>("transactionsByMessage", &query)
                .await
            {
                Ok(response) => {
                    if let Some(record) = confirmed_transaction(response)? {
                        return Ok(record);
                    }
                }
                // Not indexed yet
                Err(ApiError::AccountNotFound(_)) => {}
                Err(ApiError::Network(e)) => log::warn!("Confirmation poll failed: {}", e),
                Err(e) => return Err(e),
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(ApiError::ConfirmationTimeout {
                    message_hash: msg_hash,
                    waited: now - started,
                });
            }
            tokio::time::sleep(self.poll_interval().min(deadline - now)).await;
        }
    }

    async fn run_get_method(
        &self,
        address: &Address,
        method: &str,
        stack: Vec<StackEntry>,
    ) -> Result<Vec<StackEntry>, ApiError> {
        let request = V3RunGetMethodRequest {
            address: address.to_raw(),
            method: method.to_string(),
            stack: stack.into_iter().map(stack_entry_to_entity).collect(),
        };
        let result: V3RunGetMethodResult = self.post("runGetMethod", &request).await?;

        let exit_code = result.exit_code.unwrap_or_default();
        if exit_code != 0 && exit_code != 1 {
            return Err(ApiError::GetMethodFailed {
                method: method.to_string(),
                exit_code,
            });
        }

        result
            .stack
            .unwrap_or_default()
            .into_iter()
            .map(entity_to_stack_entry)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joining() {
        let client = ToncenterV3Client::new(Some(ClientParams {
            base_url: Some("https://testnet.toncenter.com/api/v3/".into()),
            ..Default::default()
        }))
        .unwrap();
        assert_eq!(
            client.url("/walletInformation"),
            "https://testnet.toncenter.com/api/v3/walletInformation"
        );

        let client = ToncenterV3Client::new(None).unwrap();
        assert_eq!(client.url("message"), "https://toncenter.com/api/v3/message");
    }

    #[test]
    fn test_stack_conversion() {
        let entry = entity_to_stack_entry(V3StackEntity {
            r#type: Some(StackItemType::Num),
            value: Some(StringOrInt::String("0xff".into())),
        })
        .unwrap();
        assert_eq!(entry, StackEntry::Num(BigUint::from(255u32)));

        let entity = stack_entry_to_entity(StackEntry::Num(BigUint::from(4096u32)));
        assert_eq!(entity.value, Some(StringOrInt::String("0x1000".into())));

        assert!(
            entity_to_stack_entry(V3StackEntity {
                r#type: Some(StackItemType::Num),
                value: Some(StringOrInt::String("0xzz".into())),
            })
            .is_err()
        );
    }

    #[test]
    fn test_status_error_mapping() {
        assert!(matches!(
            status_error(StatusCode::NOT_FOUND, r#"{"error":"not found"}"#.into()),
            ApiError::AccountNotFound(reason) if reason == "not found"
        ));
        assert!(matches!(
            status_error(
                StatusCode::BAD_REQUEST,
                r#"{"error":"Failed to unpack account state","code":400}"#.into()
            ),
            ApiError::Rejected(reason) if reason == "Failed to unpack account state"
        ));
        assert!(matches!(
            status_error(StatusCode::UNPROCESSABLE_ENTITY, "plain text".into()),
            ApiError::Rejected(reason) if reason == "plain text"
        ));
        assert!(matches!(
            status_error(StatusCode::TOO_MANY_REQUESTS, "{}".into()),
            ApiError::Network(_)
        ));
        assert!(matches!(
            status_error(StatusCode::BAD_GATEWAY, "".into()),
            ApiError::Network(_)
        ));
    }

    fn transactions(json: &str) -> TransactionsResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_confirmed_transaction() {
        let ok = transactions(
            r#"{"transactions": [{
                "hash": "+/v7+/v7+/v7+/v7+/v7+/v7+/v7+/v7+/v7+/v7+/s=",
                "lt": "48129553000001",
                "now": 1718000000,
                "description": {"aborted": false, "compute_ph": {"exit_code": 0}}
            }]}"#,
        );
        assert_eq!(
            confirmed_transaction(ok).unwrap(),
            Some(TransactionRecord {
                hash: [0xfb; 32],
                lt: 48129553000001,
                now: 1718000000,
            })
        );

        assert_eq!(confirmed_transaction(transactions(r#"{"transactions": []}"#)).unwrap(), None);
        assert_eq!(confirmed_transaction(transactions("{}")).unwrap(), None);
    }

    #[test]
    fn test_aborted_transaction_is_rejected() {
        let aborted = transactions(
            r#"{"transactions": [{
                "hash": "+/v7+/v7+/v7+/v7+/v7+/v7+/v7+/v7+/v7+/v7+/s=",
                "lt": "1",
                "description": {"aborted": true, "compute_ph": {"exit_code": 35}}
            }]}"#,
        );
        assert!(matches!(
            confirmed_transaction(aborted),
            Err(ApiError::Rejected(reason)) if reason == "transaction aborted, exit code 35"
        ));
    }

    #[tokio::test]
    async fn test_unindexed_message_waits_until_deadline() {
        // Nothing listens on the discard port, so every poll fails as transient
        let client = ToncenterV3Client::new(Some(ClientParams {
            base_url: Some("http://127.0.0.1:9".into()),
            poll_interval: Some(20),
            ..Default::default()
        }))
        .unwrap();

        let timeout = Duration::from_millis(100);
        let started = Instant::now();
        let result = client
            .await_confirmation(&Address::new(0, [0; 32]), &[0xab; 32], timeout)
            .await;

        assert!(started.elapsed() >= timeout);
        match result {
            Err(ApiError::ConfirmationTimeout { message_hash, waited }) => {
                assert_eq!(message_hash, hex::encode([0xab; 32]));
                assert!(waited >= timeout);
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }
}
