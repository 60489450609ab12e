use gloo_utils::format::JsValueSerdeExt;
use js_sys::Date;
use serde::{Deserialize, Serialize};
use solana_sdk::hash::Hash;
use std::str::FromStr;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Request, RequestInit, RequestMode, Response};

use super::config::try_get_network_config;
use super::error::RpcError;

/// Commitment tier requested for sends and confirmation checks. The drop flow
/// only needs the least-strict tier the chain offers.
pub const CONFIRMATION_TIER: &str = "processed";

#[derive(Serialize)]
struct RpcRequest<T> {
    jsonrpc: String,
    id: u64,
    method: String,
    params: T,
}

/// Status entry returned by getSignatureStatuses.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionStatus {
    pub slot: u64,
    pub confirmations: Option<u64>,
    pub err: Option<serde_json::Value>,
    #[serde(default)]
    pub confirmation_status: Option<String>,
}

#[derive(Clone)]
pub struct RpcConnection {
    endpoint: String,
}

impl RpcConnection {
    // Fallback endpoint used before the network singleton is initialized
    const FALLBACK_RPC_ENDPOINT: &'static str = "https://api.devnet.solana.com";

    pub fn new() -> Self {
        let selected_endpoint = Self::select_endpoint();
        log::debug!("Selected RPC endpoint: {}", selected_endpoint);
        Self::with_endpoint(&selected_endpoint)
    }

    pub fn with_endpoint(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
        }
    }

    /// Pick an endpoint from the network configuration list.
    fn select_endpoint() -> String {
        let endpoints = match try_get_network_config() {
            Some(config) => config.rpc_endpoints,
            None => {
                log::debug!("Network not initialized, using fallback endpoint");
                return Self::FALLBACK_RPC_ENDPOINT.to_string();
            }
        };

        if endpoints.len() == 1 {
            return endpoints[0].to_string();
        }

        // spread load across the configured endpoints
        let index = match Self::try_crypto_random() {
            Some(random_value) => (random_value as usize) % endpoints.len(),
            None => (Date::now() as usize) % endpoints.len(),
        };
        endpoints[index].to_string()
    }

    /// generate unique request id, crypto random first, timestamp as fallback
    fn generate_request_id() -> u64 {
        Self::try_crypto_random().unwrap_or_else(|| Date::now() as u64)
    }

    fn try_crypto_random() -> Option<u64> {
        let window = web_sys::window()?;
        let crypto = window.crypto().ok()?;

        let mut buffer = [0u8; 8];
        if crypto.get_random_values_with_u8_array(&mut buffer).is_ok() {
            let mut result = 0u64;
            for &byte in buffer.iter() {
                result = (result << 8) | (byte as u64);
            }
            // keep it positive
            Some(result & 0x7FFF_FFFF_FFFF_FFFF)
        } else {
            None
        }
    }

    pub async fn send_request<T, R>(&self, method: &str, params: T) -> Result<R, RpcError>
    where
        T: Serialize,
        R: for<'de> Deserialize<'de>,
    {
        let request = RpcRequest {
            jsonrpc: "2.0".to_string(),
            id: Self::generate_request_id(),
            method: method.to_string(),
            params,
        };

        let request_body = serde_json::to_string(&request).map_err(|e| {
            log::error!("Failed to serialize request: {}", e);
            RpcError::Other(e.to_string())
        })?;

        log::debug!("RPC request: {}", method);

        let opts = RequestInit::new();
        opts.set_method("POST");
        opts.set_mode(RequestMode::Cors);
        opts.set_body(&JsValue::from_str(&request_body));

        let request = Request::new_with_str_and_init(&self.endpoint, &opts).map_err(|e| {
            RpcError::ConnectionFailed(format!("Failed to create request: {:?}", e))
        })?;

        request
            .headers()
            .set("Content-Type", "application/json")
            .map_err(|e| RpcError::ConnectionFailed(format!("Failed to set headers: {:?}", e)))?;

        let window = web_sys::window()
            .ok_or_else(|| RpcError::ConnectionFailed("No window object".to_string()))?;
        let resp_value = JsFuture::from(window.fetch_with_request(&request))
            .await
            .map_err(|e| {
                log::error!("HTTP request failed: {:?}", e);
                RpcError::ConnectionFailed(format!("Failed to send request: {:?}", e))
            })?;

        let resp: Response = resp_value
            .dyn_into()
            .map_err(|e| RpcError::Other(format!("Failed to convert response: {:?}", e)))?;

        if !resp.ok() {
            log::error!("HTTP error: status={}", resp.status());
            return Err(RpcError::ConnectionFailed(format!(
                "HTTP {} {}",
                resp.status(),
                resp.status_text()
            )));
        }

        let json = JsFuture::from(
            resp.json()
                .map_err(|e| RpcError::Other(format!("Failed to get JSON: {:?}", e)))?,
        )
        .await
        .map_err(|e| RpcError::Other(format!("Failed to parse JSON: {:?}", e)))?;

        // parse as Value first so the error branch can be inspected
        let value: serde_json::Value = json
            .into_serde()
            .map_err(|e| RpcError::Other(format!("Failed to parse response as JSON: {:?}", e)))?;

        if let Some(error) = value.get("error") {
            log::error!("RPC error for {}: {}", method, error);
            if let Some(error_obj) = error.as_object() {
                let code = error_obj.get("code").and_then(|c| c.as_i64()).unwrap_or(-1);
                let message = error_obj
                    .get("message")
                    .and_then(|m| m.as_str())
                    .unwrap_or("Unknown error")
                    .to_string();
                let custom_program_code = extract_custom_program_code(error_obj.get("data"));
                if let Some(custom) = custom_program_code {
                    log::error!("Contract error code: {:#x}", custom);
                }
                return Err(RpcError::Rpc {
                    code,
                    message,
                    custom_program_code,
                });
            }
            return Err(RpcError::Other(error.to_string()));
        }

        match value.get("result") {
            Some(result) => {
                log::debug!("RPC request {} completed", method);
                serde_json::from_value(result.clone()).map_err(|e| {
                    RpcError::Other(format!("Failed to deserialize result: {:?}", e))
                })
            }
            None => Err(RpcError::Other("Response missing result field".to_string())),
        }
    }

    pub async fn get_version(&self) -> Result<String, RpcError> {
        let result: serde_json::Value =
            self.send_request("getVersion", Vec::<String>::new()).await?;
        Ok(result.to_string())
    }

    /// Wallet balance in lamports.
    pub async fn get_balance(&self, pubkey: &str) -> Result<u64, RpcError> {
        let result: serde_json::Value = self.send_request("getBalance", vec![pubkey]).await?;
        result
            .get("value")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| RpcError::Other("Balance missing from response".to_string()))
    }

    /// Raw account data, or None when the account does not exist.
    pub async fn get_account_data(&self, pubkey: &str) -> Result<Option<Vec<u8>>, RpcError> {
        let params = serde_json::json!([pubkey, {"encoding": "base64"}]);
        let result: serde_json::Value = self.send_request("getAccountInfo", params).await?;

        let value = match result.get("value") {
            Some(v) if !v.is_null() => v,
            _ => return Ok(None),
        };

        let data_str = value
            .get("data")
            .and_then(|d| d.get(0))
            .and_then(|v| v.as_str())
            .ok_or_else(|| RpcError::Other("Account data missing from response".to_string()))?;

        let bytes = base64::decode(data_str)
            .map_err(|e| RpcError::Other(format!("Failed to decode account data: {}", e)))?;
        Ok(Some(bytes))
    }

    pub async fn get_latest_blockhash(&self) -> Result<Hash, RpcError> {
        let blockhash: serde_json::Value = self
            .send_request(
                "getLatestBlockhash",
                serde_json::json!([{
                    "commitment": CONFIRMATION_TIER,
                    "minContextSlot": 0
                }]),
            )
            .await?;

        let recent_blockhash = blockhash["value"]["blockhash"]
            .as_str()
            .ok_or_else(|| RpcError::Other("Failed to get blockhash".to_string()))?;

        Hash::from_str(recent_blockhash)
            .map_err(|e| RpcError::Other(format!("Invalid blockhash: {}", e)))
    }

    /// Submit a fully signed, base64-encoded transaction.
    pub async fn send_signed_transaction(&self, tx_base64: &str) -> Result<String, RpcError> {
        let params = serde_json::json!([
            tx_base64,
            {
                "encoding": "base64",
                "preflightCommitment": CONFIRMATION_TIER,
                "skipPreflight": false,
                "maxRetries": 3
            }
        ]);

        log::info!("Sending signed transaction...");
        let signature: String = self.send_request("sendTransaction", params).await?;
        log::info!("Transaction sent: {}", signature);
        Ok(signature)
    }

    /// Poll the status of one signature. None until the cluster has seen it.
    pub async fn get_signature_status(
        &self,
        signature: &str,
    ) -> Result<Option<TransactionStatus>, RpcError> {
        let params = serde_json::json!([[signature], {"searchTransactionHistory": false}]);
        let result: serde_json::Value =
            self.send_request("getSignatureStatuses", params).await?;

        match result.get("value").and_then(|v| v.get(0)) {
            Some(status) if !status.is_null() => serde_json::from_value(status.clone())
                .map(Some)
                .map_err(|e| {
                    RpcError::Other(format!("Failed to deserialize signature status: {:?}", e))
                }),
            _ => Ok(None),
        }
    }
}

impl Default for RpcConnection {
    fn default() -> Self {
        Self::new()
    }
}

/// Dig the program's custom error code out of the JSON-RPC error payload.
fn extract_custom_program_code(data: Option<&serde_json::Value>) -> Option<u32> {
    let parts = data?
        .get("err")?
        .get("InstructionError")?
        .as_array()?;
    parts.get(1)?.get("Custom")?.as_u64().map(|code| code as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_custom_code_from_error_payload() {
        let data = serde_json::json!({
            "err": { "InstructionError": [0, { "Custom": 311 }] },
            "logs": []
        });
        assert_eq!(extract_custom_program_code(Some(&data)), Some(311));
    }

    #[test]
    fn missing_or_malformed_payload_yields_none() {
        assert_eq!(extract_custom_program_code(None), None);
        let data = serde_json::json!({ "err": "AccountInUse" });
        assert_eq!(extract_custom_program_code(Some(&data)), None);
    }

    #[test]
    fn signature_status_deserializes_rpc_shape() {
        let raw = serde_json::json!({
            "slot": 82,
            "confirmations": null,
            "err": null,
            "confirmationStatus": "processed",
            "status": { "Ok": null }
        });
        let status: TransactionStatus = serde_json::from_value(raw).unwrap();
        assert_eq!(status.slot, 82);
        assert!(status.err.is_none());
        assert_eq!(status.confirmation_status.as_deref(), Some("processed"));
    }
}
