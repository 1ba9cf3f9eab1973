pub mod contract;
pub mod store;
pub mod units;
pub mod wallet;

pub use contract::{
    DecodedEvent, EthRegistryContract, EthSigner, OnChainTransaction, RegistrationCall,
    RegistrationReceipt, RegistryContract, REGISTERED_EVENT,
};
pub use store::{FileStore, MemoryStore, PendingStore, PENDING_KEY};
pub use wallet::{LocalWalletProvider, WalletProvider};

use chrono::{TimeZone, Utc};
use ethers::providers::{Http, Provider};
use ethers::types::{Address, U256};
use futures::future::try_join_all;
use log::{debug, error, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

use crate::config::{Config, RegistryConfig};
use crate::error::{Error, Result};
use crate::metrics;
use crate::models::{PendingTransaction, RegisterOutcome, RegistrationParams, TransactionRecord};
use crate::validation::{validate_address, validate_amount, validate_name};

pub const NOT_CONNECTED: &str = "Contract not available or not connected";

/// Client for the transaction registry contract.
///
/// Operations never return errors: failures are logged, kept in
/// [`last_error`](Self::last_error) and surface as `None`, `false` or an empty list.
pub struct RegistryClient<W, C, S>
where
    W: WalletProvider,
    C: RegistryContract<Signer = W::Signer>,
    S: PendingStore,
{
    wallet: W,
    contract: C,
    store: S,
    chain_id: u64,
    decimals: u32,
    transactions: Mutex<Vec<TransactionRecord>>,
    last_error: Mutex<Option<String>>,
    last_tx_id: Mutex<Option<U256>>,
    is_registering: AtomicBool,
    is_loading: AtomicBool,
}

pub type EthRegistryClient = RegistryClient<LocalWalletProvider, EthRegistryContract, FileStore>;

impl EthRegistryClient {
    /// Wires the JSON-RPC contract, a key-backed wallet and the file queue from `config`.
    pub fn from_config(config: &Config, private_key: Option<&str>) -> Result<Self> {
        let provider = Provider::<Http>::try_from(config.registry.rpc_url.as_str())
            .map_err(|e| {
                Error::ConfigError(format!("Invalid RPC url {}: {}", config.registry.rpc_url, e))
            })?;
        let address = validate_address(&config.registry.contract_address)?;
        let contract = EthRegistryContract::new(address, provider.clone())?;
        let wallet = LocalWalletProvider::new(provider, private_key)?;
        let store = FileStore::new(&config.storage.pending_path);
        Ok(RegistryClient::new(wallet, contract, store, &config.registry))
    }
}

impl<W, C, S> RegistryClient<W, C, S>
where
    W: WalletProvider,
    C: RegistryContract<Signer = W::Signer>,
    S: PendingStore,
{
    pub fn new(wallet: W, contract: C, store: S, config: &RegistryConfig) -> Self {
        Self {
            wallet,
            contract,
            store,
            chain_id: config.chain_id,
            decimals: config.token_decimals,
            transactions: Mutex::new(Vec::new()),
            last_error: Mutex::new(None),
            last_tx_id: Mutex::new(None),
            is_registering: AtomicBool::new(false),
            is_loading: AtomicBool::new(false),
        }
    }

    pub async fn transactions(&self) -> Vec<TransactionRecord> {
        self.transactions.lock().await.clone()
    }

    pub async fn last_error(&self) -> Option<String> {
        self.last_error.lock().await.clone()
    }

    pub async fn last_tx_id(&self) -> Option<U256> {
        *self.last_tx_id.lock().await
    }

    pub fn is_registering(&self) -> bool {
        self.is_registering.load(Ordering::SeqCst)
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading.load(Ordering::SeqCst)
    }

    async fn record_failure(&self, message: String) {
        error!("{}", message);
        metrics::REGISTRY_CALL_FAILURES.inc();
        *self.last_error.lock().await = Some(message);
    }

    /// Connected means an address, the target chain and a signer. Any failure
    /// along the way reads as disconnected.
    async fn connection(&self) -> Option<(Address, W::Signer)> {
        let address = self.wallet.address().await?;

        if let Err(e) = self.wallet.switch_network(self.chain_id).await {
            warn!("Could not switch wallet to chain {}: {}", self.chain_id, e);
        }
        match self.wallet.get_network().await {
            Ok(chain_id) if chain_id == self.chain_id => {}
            Ok(chain_id) => {
                info!("Wallet on chain {}, registry lives on {}", chain_id, self.chain_id);
                return None;
            }
            Err(e) => {
                warn!("Could not read wallet network: {}", e);
                return None;
            }
        }

        match self.wallet.get_signer().await {
            Ok(signer) => Some((address, signer)),
            Err(e) => {
                warn!("Could not obtain signer: {}", e);
                None
            }
        }
    }

    fn registration_call(&self, params: &RegistrationParams) -> Result<RegistrationCall> {
        validate_name("Source chain", &params.source_chain)?;
        validate_name("Target chain", &params.target_chain)?;
        validate_name("Source token", &params.source_token)?;
        validate_name("Target token", &params.target_token)?;
        validate_name("Transaction hash", &params.transaction_hash)?;
        validate_amount(&params.amount_in)?;
        validate_amount(&params.amount_out)?;

        Ok(RegistrationCall {
            source_chain: params.source_chain.clone(),
            target_chain: params.target_chain.clone(),
            source_token: params.source_token.clone(),
            target_token: params.target_token.clone(),
            amount_in: units::parse_amount(&params.amount_in, self.decimals)?,
            amount_out: units::parse_amount(&params.amount_out, self.decimals)?,
            transaction_hash: params.transaction_hash.clone(),
        })
    }

    async fn submit(
        &self,
        signer: &W::Signer,
        params: &RegistrationParams,
    ) -> Result<Option<U256>> {
        let call = self.registration_call(params)?;
        let receipt = self.contract.register_transaction(signer, &call).await?;
        let id = receipt
            .find_event(REGISTERED_EVENT)
            .and_then(|event| event.uint("transactionId"));
        match id {
            Some(id) => {
                info!("Registered transaction {} as #{}", params.transaction_hash, id);
                *self.last_tx_id.lock().await = Some(id);
            }
            None => warn!(
                "No {} event in receipt for {}",
                REGISTERED_EVENT, params.transaction_hash
            ),
        }
        Ok(id)
    }

    /// Registers on-chain when connected, otherwise queues the registration locally.
    pub async fn register(&self, params: RegistrationParams) -> Option<RegisterOutcome> {
        self.is_registering.store(true, Ordering::SeqCst);
        let result = self.register_inner(params).await;
        self.is_registering.store(false, Ordering::SeqCst);

        match result {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                self.record_failure(format!("Failed to register transaction: {}", e)).await;
                None
            }
        }
    }

    async fn register_inner(&self, params: RegistrationParams) -> Result<RegisterOutcome> {
        *self.last_error.lock().await = None;
        match self.connection().await {
            Some((_, signer)) => {
                let id = self.submit(&signer, &params).await?;
                Ok(RegisterOutcome::Registered { id })
            }
            None => {
                self.registration_call(&params)?;
                info!("Wallet not on registry chain, queueing {}", params.transaction_hash);
                self.store.append(PendingTransaction::new(params)).await?;
                Ok(RegisterOutcome::Pending)
            }
        }
    }

    fn to_record(&self, id: U256, raw: OnChainTransaction) -> Result<TransactionRecord> {
        if raw.timestamp > U256::from(i64::MAX as u64) {
            return Err(Error::ParseError(format!("Timestamp out of range for #{}", id)));
        }
        let seconds = raw.timestamp.as_u64() as i64;
        let timestamp = Utc
            .timestamp_opt(seconds, 0)
            .single()
            .ok_or_else(|| {
                Error::ParseError(format!("Invalid timestamp {} for #{}", seconds, id))
            })?;

        Ok(TransactionRecord {
            id,
            user: raw.user,
            timestamp,
            source_chain: raw.source_chain,
            target_chain: raw.target_chain,
            source_token: raw.source_token,
            target_token: raw.target_token,
            amount_in: units::format_amount(raw.amount_in, self.decimals)?,
            amount_out: units::format_amount(raw.amount_out, self.decimals)?,
            transaction_hash: raw.transaction_hash,
            successful: raw.successful,
        })
    }

    /// Lists every record the registry holds for `user`, newest ids last.
    pub async fn fetch_user_transactions(&self, user: Option<Address>) -> Vec<TransactionRecord> {
        *self.last_error.lock().await = None;
        let Some(user) = user else {
            return Vec::new();
        };

        self.is_loading.store(true, Ordering::SeqCst);
        let result = self.fetch_inner(user).await;
        self.is_loading.store(false, Ordering::SeqCst);

        match result {
            Ok(records) => {
                *self.transactions.lock().await = records.clone();
                records
            }
            Err(e) => {
                self.record_failure(format!("Failed to fetch transactions: {}", e)).await;
                Vec::new()
            }
        }
    }

    async fn fetch_inner(&self, user: Address) -> Result<Vec<TransactionRecord>> {
        let ids = self.contract.get_user_transactions(user).await?;
        debug!("User {:?} has {} registry entries", user, ids.len());

        let raws = try_join_all(ids.iter().map(|id| self.contract.get_transaction(*id))).await?;
        ids.into_iter()
            .zip(raws)
            .map(|(id, raw)| self.to_record(id, raw))
            .collect()
    }

    /// Marks a registered transaction as successful or not. Requires a connected wallet.
    pub async fn update_status(&self, id: U256, successful: bool) -> bool {
        *self.last_error.lock().await = None;
        let Some((address, signer)) = self.connection().await else {
            self.record_failure(NOT_CONNECTED.to_string()).await;
            return false;
        };

        match self.contract.update_transaction_status(&signer, id, successful).await {
            Ok(_) => {
                info!("Transaction #{} marked successful={}", id, successful);
                self.fetch_user_transactions(Some(address)).await;
                true
            }
            Err(e) => {
                self.record_failure(format!("Failed to update transaction status: {}", e)).await;
                false
            }
        }
    }

    /// Submits queued registrations in order. Successful entries leave the
    /// queue, failed ones stay for the next attempt. Returns how many went through.
    pub async fn flush_pending(&self) -> usize {
        let queue = match self.store.get().await {
            Ok(queue) => queue,
            Err(e) => {
                self.record_failure(format!("Failed to read pending registrations: {}", e)).await;
                return 0;
            }
        };
        if queue.is_empty() {
            return 0;
        }

        let Some((address, signer)) = self.connection().await else {
            debug!("{} pending registrations wait for the registry chain", queue.len());
            return 0;
        };

        info!("Flushing {} pending registrations", queue.len());
        let mut flushed = 0;
        for entry in &queue {
            if let Err(e) = self.submit(&signer, &entry.params).await {
                self.record_failure(format!(
                    "Failed to register pending transaction {}: {}",
                    entry.params.transaction_hash, e
                ))
                .await;
                continue;
            }
            match self.store.remove(entry).await {
                Ok(()) => flushed += 1,
                Err(e) => {
                    let message = format!("Failed to update pending registrations: {}", e);
                    self.record_failure(message).await;
                }
            }
        }

        if flushed > 0 {
            self.fetch_user_transactions(Some(address)).await;
        }
        flushed
    }

    /// Reconnect hook.
    pub async fn on_connected(&self) -> usize {
        self.flush_pending().await
    }
}
