use gloo_timers::future::TimeoutFuture;
use js_sys::Date;
use sha2::{Digest, Sha256};
use solana_sdk::{
    compute_budget::ComputeBudgetInstruction,
    instruction::{AccountMeta, Instruction},
    message::Message,
    pubkey::Pubkey,
    system_program, sysvar,
    transaction::Transaction,
};
use std::str::FromStr;

use super::error::{MintError, RpcError};
use super::rpc::RpcConnection;
use super::wallet::WalletProvider;

// compute budget attached to every mint transaction
const MINT_COMPUTE_UNITS: u32 = 200_000;

const CONFIRM_POLL_INTERVAL_MS: u32 = 1_000;

/// Parsed on-chain sale account plus the address it lives at. Opaque to the
/// view; only this module looks inside.
#[derive(Clone, Debug, PartialEq)]
pub struct SaleHandle {
    pub address: String,
    pub authority: String,
    /// treasury wallet recorded in the sale account
    pub wallet: String,
    pub config: String,
    pub price_lamports: u64,
}

/// One read of the sale account.
#[derive(Clone, Debug, PartialEq)]
pub struct SaleSnapshot {
    pub handle: SaleHandle,
    /// go-live in unix milliseconds, None while the sale is unscheduled
    pub go_live_ms: Option<i64>,
    pub items_available: u64,
    pub items_redeemed: u64,
}

impl SaleSnapshot {
    pub fn items_remaining(&self) -> u64 {
        self.items_available.saturating_sub(self.items_redeemed)
    }
}

/// Outcome of a confirmation wait; `err` carries the chain-level error, if any.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConfirmationStatus {
    pub err: Option<String>,
}

/// Seam between the mint flow driver and the chain, so the flow is testable
/// with a scripted collaborator.
#[allow(async_fn_in_trait)]
pub trait MintService {
    async fn submit_mint(
        &self,
        handle: &SaleHandle,
        config_id: &str,
        payer: &str,
        treasury: &str,
    ) -> Result<String, MintError>;

    async fn await_confirmation(
        &self,
        txid: &str,
        timeout_ms: u32,
    ) -> Result<ConfirmationStatus, MintError>;

    async fn get_balance(&self, pubkey: &str) -> Result<u64, MintError>;
}

/// Client for the on-chain sale program.
#[derive(Clone)]
pub struct CandyMachineClient {
    rpc: RpcConnection,
    program_id: String,
}

impl CandyMachineClient {
    pub fn new(rpc: RpcConnection, program_id: &str) -> Self {
        Self {
            rpc,
            program_id: program_id.to_string(),
        }
    }

    /// Fetch and parse the sale account.
    pub async fn fetch_sale_state(&self, sale_id: &str) -> Result<SaleSnapshot, MintError> {
        log::info!("Fetching sale state for {}", sale_id);
        let data = self
            .rpc
            .get_account_data(sale_id)
            .await
            .map_err(|e| MintError::classify(&e))?
            .ok_or_else(|| MintError::Unknown(format!("Sale account {} not found", sale_id)))?;

        let snapshot = parse_sale_account(sale_id, &data)?;
        log::info!(
            "Sale state: {} of {} items remaining",
            snapshot.items_remaining(),
            snapshot.items_available
        );
        Ok(snapshot)
    }

    fn mint_discriminator() -> [u8; 8] {
        let mut hasher = Sha256::new();
        hasher.update(b"global:mint_nft");
        let result = hasher.finalize();
        let mut discriminator = [0u8; 8];
        discriminator.copy_from_slice(&result[..8]);
        discriminator
    }

    /// Build the unsigned mint transaction, base64 encoded for the wallet.
    async fn build_unsigned_mint_tx(
        &self,
        handle: &SaleHandle,
        config_id: &str,
        payer: &str,
        treasury: &str,
    ) -> Result<String, RpcError> {
        let program_id = parse_pubkey(&self.program_id, "program id")?;
        let candy_machine = parse_pubkey(&handle.address, "sale account")?;
        let config = parse_pubkey(config_id, "config")?;
        let payer_key = parse_pubkey(payer, "payer")?;
        let treasury_key = parse_pubkey(treasury, "treasury")?;

        let instructions = vec![
            ComputeBudgetInstruction::set_compute_unit_limit(MINT_COMPUTE_UNITS),
            Instruction::new_with_bytes(
                program_id,
                &Self::mint_discriminator(),
                vec![
                    AccountMeta::new(candy_machine, false),
                    AccountMeta::new_readonly(config, false),
                    AccountMeta::new(payer_key, true),
                    AccountMeta::new(treasury_key, false),
                    AccountMeta::new_readonly(system_program::id(), false),
                    AccountMeta::new_readonly(sysvar::rent::id(), false),
                    AccountMeta::new_readonly(sysvar::clock::id(), false),
                ],
            ),
        ];

        let recent_blockhash = self.rpc.get_latest_blockhash().await?;

        let message = Message::new(&instructions, Some(&payer_key));
        let mut transaction = Transaction::new_unsigned(message);
        transaction.message.recent_blockhash = recent_blockhash;

        let bytes = bincode::serialize(&transaction)
            .map_err(|e| RpcError::Other(format!("Failed to serialize transaction: {}", e)))?;
        Ok(base64::encode(bytes))
    }
}

impl MintService for CandyMachineClient {
    /// Mint one item: build the transaction, hand it to the wallet for
    /// signing, submit the signed bytes.
    async fn submit_mint(
        &self,
        handle: &SaleHandle,
        config_id: &str,
        payer: &str,
        treasury: &str,
    ) -> Result<String, MintError> {
        log::info!("Starting mint for payer {}", payer);

        let tx_base64 = self
            .build_unsigned_mint_tx(handle, config_id, payer, treasury)
            .await
            .map_err(|e| MintError::classify(&e))?;

        let signed = WalletProvider::sign_transaction(&tx_base64)
            .await
            .map_err(|e| MintError::Unknown(format!("Wallet signing failed: {}", e)))?;

        let signature = self
            .rpc
            .send_signed_transaction(&signed)
            .await
            .map_err(|e| MintError::classify(&e))?;
        Ok(signature)
    }

    /// Poll until the signature reaches the processed tier or the timeout
    /// elapses. Timeout is reported as a failure like any other.
    async fn await_confirmation(
        &self,
        txid: &str,
        timeout_ms: u32,
    ) -> Result<ConfirmationStatus, MintError> {
        let started = Date::now();
        loop {
            match self.rpc.get_signature_status(txid).await {
                // any non-null status means the processed tier has been reached
                Ok(Some(status)) => {
                    log::debug!("Signature status for {}: {:?}", txid, status);
                    return Ok(ConfirmationStatus {
                        err: status.err.map(|e| e.to_string()),
                    });
                }
                Ok(None) => {}
                // transient poll failure, keep waiting until the deadline
                Err(e) => log::debug!("Signature status poll failed: {}", e),
            }

            if Date::now() - started >= timeout_ms as f64 {
                return Err(MintError::Unknown(format!(
                    "Confirmation timed out after {} ms",
                    timeout_ms
                )));
            }
            TimeoutFuture::new(CONFIRM_POLL_INTERVAL_MS).await;
        }
    }

    async fn get_balance(&self, pubkey: &str) -> Result<u64, MintError> {
        self.rpc
            .get_balance(pubkey)
            .await
            .map_err(|e| MintError::classify(&e))
    }
}

fn parse_pubkey(address: &str, what: &str) -> Result<Pubkey, RpcError> {
    Pubkey::from_str(address)
        .map_err(|e| RpcError::InvalidAddress(format!("Invalid {}: {}", what, e)))
}

// ============ Sale account parsing ============

fn read_bytes<'a>(
    data: &'a [u8],
    offset: usize,
    len: usize,
    what: &str,
) -> Result<(&'a [u8], usize), MintError> {
    if data.len() < offset + len {
        return Err(MintError::Unknown(format!(
            "Sale account data too short for {}",
            what
        )));
    }
    Ok((&data[offset..offset + len], offset + len))
}

fn read_u8(data: &[u8], offset: usize, what: &str) -> Result<(u8, usize), MintError> {
    let (bytes, next) = read_bytes(data, offset, 1, what)?;
    Ok((bytes[0], next))
}

fn read_u64(data: &[u8], offset: usize, what: &str) -> Result<(u64, usize), MintError> {
    let (bytes, next) = read_bytes(data, offset, 8, what)?;
    let value = u64::from_le_bytes(
        bytes
            .try_into()
            .map_err(|_| MintError::Unknown(format!("Failed to read {}", what)))?,
    );
    Ok((value, next))
}

fn read_i64(data: &[u8], offset: usize, what: &str) -> Result<(i64, usize), MintError> {
    let (bytes, next) = read_bytes(data, offset, 8, what)?;
    let value = i64::from_le_bytes(
        bytes
            .try_into()
            .map_err(|_| MintError::Unknown(format!("Failed to read {}", what)))?,
    );
    Ok((value, next))
}

fn read_pubkey(data: &[u8], offset: usize, what: &str) -> Result<(String, usize), MintError> {
    let (bytes, next) = read_bytes(data, offset, 32, what)?;
    let key: [u8; 32] = bytes
        .try_into()
        .map_err(|_| MintError::Unknown(format!("Failed to read {}", what)))?;
    Ok((Pubkey::new_from_array(key).to_string(), next))
}

fn read_string(data: &[u8], offset: usize, what: &str) -> Result<(String, usize), MintError> {
    let (len_bytes, next) = read_bytes(data, offset, 4, what)?;
    let len = u32::from_le_bytes(
        len_bytes
            .try_into()
            .map_err(|_| MintError::Unknown(format!("Failed to read {} length", what)))?,
    ) as usize;
    let (bytes, next) = read_bytes(data, next, len, what)?;
    let value = String::from_utf8(bytes.to_vec())
        .map_err(|e| MintError::Unknown(format!("Failed to read {} as UTF-8: {}", what, e)))?;
    Ok((value, next))
}

/// Account layout: 8-byte discriminator, authority, treasury wallet,
/// Option<token mint>, config, uuid string, price, items_available,
/// Option<go_live_date> (unix seconds), items_redeemed.
fn parse_sale_account(address: &str, data: &[u8]) -> Result<SaleSnapshot, MintError> {
    if data.len() < 8 {
        return Err(MintError::Unknown("Sale account data too short".to_string()));
    }
    // skip discriminator
    let mut offset = 8;

    let (authority, next) = read_pubkey(data, offset, "authority")?;
    offset = next;
    let (wallet, next) = read_pubkey(data, offset, "wallet")?;
    offset = next;

    let (has_token_mint, next) = read_u8(data, offset, "token mint flag")?;
    offset = next;
    if has_token_mint != 0 {
        let (_token_mint, next) = read_pubkey(data, offset, "token mint")?;
        offset = next;
    }

    let (config, next) = read_pubkey(data, offset, "config")?;
    offset = next;
    let (_uuid, next) = read_string(data, offset, "uuid")?;
    offset = next;
    let (price, next) = read_u64(data, offset, "price")?;
    offset = next;
    let (items_available, next) = read_u64(data, offset, "items available")?;
    offset = next;

    let (has_go_live, next) = read_u8(data, offset, "go-live flag")?;
    offset = next;
    let go_live_ms = if has_go_live != 0 {
        let (seconds, next) = read_i64(data, offset, "go-live date")?;
        offset = next;
        Some(seconds * 1000)
    } else {
        None
    };

    let (items_redeemed, _) = read_u64(data, offset, "items redeemed")?;

    Ok(SaleSnapshot {
        handle: SaleHandle {
            address: address.to_string(),
            authority,
            wallet,
            config,
            price_lamports: price,
        },
        go_live_ms,
        items_available,
        items_redeemed,
    })
}
