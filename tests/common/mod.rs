#![allow(dead_code)]

use async_trait::async_trait;
use ethers::abi::Token;
use ethers::types::{Address, U256};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use xbridge::api::LiFiClient;
use xbridge::bubbles::BubbleLayoutEngine;
use xbridge::config::{Config, EDUCHAIN_TESTNET_CHAIN_ID};
use xbridge::error::{Error, Result};
use xbridge::models::RegistrationParams;
use xbridge::registry::{
    DecodedEvent, OnChainTransaction, RegistrationCall, RegistrationReceipt, RegistryContract,
    WalletProvider, REGISTERED_EVENT,
};
use xbridge::web::AppState;

pub fn test_user() -> Address {
    Address::repeat_byte(0xab)
}

// Helper to create a default test config
pub fn create_test_config(dir: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.storage.pending_path = dir.join("local_storage.json");
    config.lifi.timeout_secs = 1;
    config
}

pub fn app_state(upstream: &str, timeout: Duration) -> Arc<AppState> {
    Arc::new(AppState {
        lifi: LiFiClient::with_timeout(upstream, timeout).unwrap(),
        bubbles: BubbleLayoutEngine::default(),
    })
}

pub fn params(hash: &str) -> RegistrationParams {
    RegistrationParams {
        source_chain: "Ethereum".to_string(),
        target_chain: "Polygon".to_string(),
        source_token: "USDC".to_string(),
        target_token: "USDC".to_string(),
        amount_in: "100".to_string(),
        amount_out: "99.5".to_string(),
        transaction_hash: hash.to_string(),
    }
}

/// Wallet whose chain can be flipped by the test.
pub struct FakeWallet {
    pub address: Option<Address>,
    pub chain_id: Mutex<u64>,
}

impl FakeWallet {
    pub fn on_chain(chain_id: u64) -> Self {
        Self {
            address: Some(test_user()),
            chain_id: Mutex::new(chain_id),
        }
    }

    pub fn on_registry_chain() -> Self {
        Self::on_chain(EDUCHAIN_TESTNET_CHAIN_ID)
    }

    pub fn disconnected() -> Self {
        Self {
            address: None,
            chain_id: Mutex::new(EDUCHAIN_TESTNET_CHAIN_ID),
        }
    }

    pub async fn move_to(&self, chain_id: u64) {
        *self.chain_id.lock().await = chain_id;
    }
}

#[async_trait]
impl WalletProvider for FakeWallet {
    type Signer = Address;

    async fn address(&self) -> Option<Address> {
        self.address
    }

    async fn get_network(&self) -> Result<u64> {
        Ok(*self.chain_id.lock().await)
    }

    async fn switch_network(&self, chain_id: u64) -> Result<()> {
        let actual = *self.chain_id.lock().await;
        if actual != chain_id {
            return Err(Error::WrongNetwork { expected: chain_id, actual });
        }
        Ok(())
    }

    async fn get_signer(&self) -> Result<Address> {
        self.address.ok_or_else(|| Error::WalletNotConnected("no account".to_string()))
    }
}

#[derive(Debug, Clone)]
pub struct StoredTransaction {
    pub user: Address,
    pub call: RegistrationCall,
    pub successful: bool,
}

/// In-memory registry contract. Registrations whose hash is in `failing`
/// are rejected; `emit_events` controls whether receipts carry the event.
pub struct FakeRegistry {
    pub records: Mutex<Vec<StoredTransaction>>,
    pub failing: Mutex<HashSet<String>>,
    pub emit_events: bool,
    pub calls: AtomicU64,
}

impl Default for FakeRegistry {
    fn default() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
            emit_events: true,
            calls: AtomicU64::new(0),
        }
    }
}

impl FakeRegistry {
    pub async fn fail_on(&self, hash: &str) {
        self.failing.lock().await.insert(hash.to_string());
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RegistryContract for FakeRegistry {
    type Signer = Address;

    async fn register_transaction(
        &self,
        signer: &Address,
        call: &RegistrationCall,
    ) -> Result<RegistrationReceipt> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.lock().await.contains(&call.transaction_hash) {
            return Err(Error::ContractError("execution reverted".to_string()));
        }
        let mut records = self.records.lock().await;
        records.push(StoredTransaction {
            user: *signer,
            call: call.clone(),
            successful: false,
        });
        let id = U256::from(records.len());
        let events = if self.emit_events {
            vec![DecodedEvent::new(
                REGISTERED_EVENT,
                vec![
                    ("transactionId".to_string(), Token::Uint(id)),
                    ("user".to_string(), Token::Address(*signer)),
                ],
            )]
        } else {
            Vec::new()
        };
        Ok(RegistrationReceipt { transaction_hash: None, events })
    }

    async fn update_transaction_status(
        &self,
        _signer: &Address,
        id: U256,
        successful: bool,
    ) -> Result<RegistrationReceipt> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut records = self.records.lock().await;
        let index = id.as_usize().checked_sub(1).filter(|i| *i < records.len())
            .ok_or_else(|| Error::ContractError("Transaction does not exist".to_string()))?;
        records[index].successful = successful;
        Ok(RegistrationReceipt::default())
    }

    async fn get_user_transactions(&self, user: Address) -> Result<Vec<U256>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let records = self.records.lock().await;
        Ok(records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.user == user)
            .map(|(i, _)| U256::from(i + 1))
            .collect())
    }

    async fn get_transaction(&self, id: U256) -> Result<OnChainTransaction> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let records = self.records.lock().await;
        let record = records
            .get(id.as_usize() - 1)
            .ok_or_else(|| Error::ContractError("Transaction does not exist".to_string()))?;
        Ok(OnChainTransaction {
            user: record.user,
            timestamp: U256::from(1_710_000_000u64 + id.as_u64()),
            source_chain: record.call.source_chain.clone(),
            target_chain: record.call.target_chain.clone(),
            source_token: record.call.source_token.clone(),
            target_token: record.call.target_token.clone(),
            amount_in: record.call.amount_in,
            amount_out: record.call.amount_out,
            transaction_hash: record.call.transaction_hash.clone(),
            successful: record.successful,
        })
    }
}
