use js_sys::{Function, Promise, Reflect};
use solana_sdk::native_token::LAMPORTS_PER_SOL;
use std::fmt;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::window;

#[derive(Debug, Clone)]
pub enum WalletError {
    NotInstalled,
    ConnectionFailed(String),
    SigningFailed(String),
    JavaScriptError(String),
}

impl fmt::Display for WalletError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WalletError::NotInstalled => write!(f, "No wallet provider installed"),
            WalletError::ConnectionFailed(msg) => write!(f, "Connection failed: {}", msg),
            WalletError::SigningFailed(msg) => write!(f, "Signing failed: {}", msg),
            WalletError::JavaScriptError(msg) => write!(f, "JavaScript error: {}", msg),
        }
    }
}

/// Browser wallet provider injected at `window.solana`.
///
/// Contract with the provider: `connect()` resolves to the wallet public key
/// (either a bare string or an object exposing `publicKey`), and
/// `signTransaction(base64)` resolves to the fully signed transaction, base64
/// encoded. Key custody and signing stay on the provider's side of this line.
pub struct WalletProvider;

impl WalletProvider {
    const PROVIDER_KEY: &'static str = "solana";

    /// Check if a wallet provider is injected into the page
    pub fn is_installed() -> bool {
        window()
            .and_then(|win| Reflect::get(&win, &JsValue::from_str(Self::PROVIDER_KEY)).ok())
            .map(|provider| !provider.is_undefined() && !provider.is_null())
            .unwrap_or(false)
    }

    fn provider() -> Result<JsValue, WalletError> {
        let window = window()
            .ok_or_else(|| WalletError::JavaScriptError("No window object".to_string()))?;
        let provider = Reflect::get(&window, &JsValue::from_str(Self::PROVIDER_KEY))
            .map_err(|e| WalletError::JavaScriptError(format!("Failed to get provider: {:?}", e)))?;
        if provider.is_undefined() || provider.is_null() {
            return Err(WalletError::NotInstalled);
        }
        Ok(provider)
    }

    fn method(provider: &JsValue, name: &str) -> Result<Function, WalletError> {
        let func = Reflect::get(provider, &JsValue::from_str(name)).map_err(|e| {
            WalletError::JavaScriptError(format!("Failed to get {} function: {:?}", name, e))
        })?;
        if !func.is_function() {
            return Err(WalletError::JavaScriptError(format!(
                "{} is not a function",
                name
            )));
        }
        Ok(Function::from(func))
    }

    /// Connect to the wallet and return its public key
    pub async fn connect() -> Result<String, WalletError> {
        let provider = Self::provider()?;
        let connect = Self::method(&provider, "connect")?;

        let promise = connect
            .call0(&provider)
            .map_err(|e| WalletError::ConnectionFailed(format!("{:?}", e)))?;
        let result = JsFuture::from(Promise::from(promise))
            .await
            .map_err(|e| WalletError::ConnectionFailed(format!("{:?}", e)))?;

        if let Some(address) = result.as_string() {
            return Ok(address);
        }

        // object form: pull publicKey and stringify it
        let public_key = Reflect::get(&result, &JsValue::from_str("publicKey"))
            .map_err(|e| WalletError::ConnectionFailed(format!("{:?}", e)))?;
        let to_string = Self::method(&public_key, "toString")?;
        let address = to_string
            .call0(&public_key)
            .map_err(|e| WalletError::ConnectionFailed(format!("{:?}", e)))?;
        address
            .as_string()
            .ok_or_else(|| WalletError::ConnectionFailed("Public key is not a string".to_string()))
    }

    /// Disconnect from the wallet
    pub async fn disconnect() -> Result<(), WalletError> {
        let provider = Self::provider()?;
        let disconnect = match Self::method(&provider, "disconnect") {
            Ok(func) => func,
            // no disconnect function, consider it already disconnected
            Err(_) => return Ok(()),
        };

        let promise = disconnect
            .call0(&provider)
            .map_err(|e| WalletError::JavaScriptError(format!("{:?}", e)))?;
        if promise.is_object() {
            JsFuture::from(Promise::from(promise))
                .await
                .map_err(|e| WalletError::JavaScriptError(format!("{:?}", e)))?;
        }
        Ok(())
    }

    /// Sign a transaction with the wallet
    ///
    /// # Parameters
    /// * `transaction_base64` - Base64 encoded unsigned transaction
    ///
    /// # Returns
    /// Base64 encoded signed transaction
    pub async fn sign_transaction(transaction_base64: &str) -> Result<String, WalletError> {
        let provider = Self::provider()?;
        let sign = Self::method(&provider, "signTransaction")?;

        let promise = sign
            .call1(&provider, &JsValue::from_str(transaction_base64))
            .map_err(|e| WalletError::SigningFailed(format!("{:?}", e)))?;
        let result = JsFuture::from(Promise::from(promise))
            .await
            .map_err(|e| WalletError::SigningFailed(format!("{:?}", e)))?;

        result
            .as_string()
            .ok_or_else(|| WalletError::SigningFailed("Signed transaction is not a string".to_string()))
    }
}

/// What the view knows about the connected wallet. Owned by the provider; this
/// app only mirrors it and triggers balance refreshes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WalletState {
    pub connected: bool,
    pub address: Option<String>,
    pub balance_lamports: Option<u64>,
}

impl WalletState {
    pub fn balance_sol(&self) -> Option<f64> {
        self.balance_lamports
            .map(|lamports| lamports as f64 / LAMPORTS_PER_SOL as f64)
    }
}

/// `abcd...wxyz` form used wherever a full address would overflow the layout.
pub fn shorten_address(address: &str) -> String {
    if address.len() <= 12 {
        address.to_string()
    } else {
        format!("{}...{}", &address[..4], &address[address.len() - 4..])
    }
}
