use async_trait::async_trait;
use ethers::abi::{parse_abi, Abi, RawLog, Token};
use ethers::contract::Contract;
use ethers::middleware::SignerMiddleware;
use ethers::providers::{Http, Provider};
use ethers::signers::LocalWallet;
use ethers::types::{Address, TransactionReceipt, U256};
use log::{debug, info};
use std::sync::Arc;

use crate::error::{Error, Result};

pub const REGISTERED_EVENT: &str = "TransactionRegistered";

const REGISTRY_ABI: &[&str] = &[
    "function registerTransaction(string sourceChain, string targetChain, string sourceToken, string targetToken, uint256 amountIn, uint256 amountOut, string transactionHash) returns (uint256)",
    "function updateTransactionStatus(uint256 transactionId, bool successful)",
    "function getUserTransactions(address user) view returns (uint256[])",
    "function getTransaction(uint256 transactionId) view returns (address, uint256, string, string, string, string, uint256, uint256, string, bool)",
    "event TransactionRegistered(uint256 indexed transactionId, address indexed user)",
];

pub type EthSigner = Arc<SignerMiddleware<Provider<Http>, LocalWallet>>;

/// Arguments of `registerTransaction` with amounts already in fixed point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationCall {
    pub source_chain: String,
    pub target_chain: String,
    pub source_token: String,
    pub target_token: String,
    pub amount_in: U256,
    pub amount_out: U256,
    pub transaction_hash: String,
}

/// Raw `getTransaction` result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnChainTransaction {
    pub user: Address,
    pub timestamp: U256,
    pub source_chain: String,
    pub target_chain: String,
    pub source_token: String,
    pub target_token: String,
    pub amount_in: U256,
    pub amount_out: U256,
    pub transaction_hash: String,
    pub successful: bool,
}

type TransactionTuple = (Address, U256, String, String, String, String, U256, U256, String, bool);

impl From<TransactionTuple> for OnChainTransaction {
    fn from(t: TransactionTuple) -> Self {
        Self {
            user: t.0,
            timestamp: t.1,
            source_chain: t.2,
            target_chain: t.3,
            source_token: t.4,
            target_token: t.5,
            amount_in: t.6,
            amount_out: t.7,
            transaction_hash: t.8,
            successful: t.9,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedEvent {
    pub name: String,
    pub params: Vec<(String, Token)>,
}

impl DecodedEvent {
    pub fn new(name: impl Into<String>, params: Vec<(String, Token)>) -> Self {
        Self { name: name.into(), params }
    }

    pub fn uint(&self, param: &str) -> Option<U256> {
        self.params.iter().find_map(|(name, token)| match token {
            Token::Uint(value) if name == param => Some(*value),
            _ => None,
        })
    }

    pub fn address(&self, param: &str) -> Option<Address> {
        self.params.iter().find_map(|(name, token)| match token {
            Token::Address(value) if name == param => Some(*value),
            _ => None,
        })
    }
}

/// Outcome of a mined write: the transaction hash and the registry events it emitted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegistrationReceipt {
    pub transaction_hash: Option<String>,
    pub events: Vec<DecodedEvent>,
}

impl RegistrationReceipt {
    pub fn find_event(&self, name: &str) -> Option<&DecodedEvent> {
        self.events.iter().find(|e| e.name == name)
    }
}

/// The four registry operations. Writes are signed by `Self::Signer`.
#[async_trait]
pub trait RegistryContract: Send + Sync {
    type Signer: Send + Sync;

    async fn register_transaction(
        &self,
        signer: &Self::Signer,
        call: &RegistrationCall,
    ) -> Result<RegistrationReceipt>;

    async fn update_transaction_status(
        &self,
        signer: &Self::Signer,
        id: U256,
        successful: bool,
    ) -> Result<RegistrationReceipt>;

    async fn get_user_transactions(&self, user: Address) -> Result<Vec<U256>>;

    async fn get_transaction(&self, id: U256) -> Result<OnChainTransaction>;
}

#[async_trait]
impl<T: RegistryContract + ?Sized> RegistryContract for Arc<T> {
    type Signer = T::Signer;

    async fn register_transaction(
        &self,
        signer: &Self::Signer,
        call: &RegistrationCall,
    ) -> Result<RegistrationReceipt> {
        (**self).register_transaction(signer, call).await
    }

    async fn update_transaction_status(
        &self,
        signer: &Self::Signer,
        id: U256,
        successful: bool,
    ) -> Result<RegistrationReceipt> {
        (**self).update_transaction_status(signer, id, successful).await
    }

    async fn get_user_transactions(&self, user: Address) -> Result<Vec<U256>> {
        (**self).get_user_transactions(user).await
    }

    async fn get_transaction(&self, id: U256) -> Result<OnChainTransaction> {
        (**self).get_transaction(id).await
    }
}

/// Registry contract reached over JSON-RPC.
pub struct EthRegistryContract {
    address: Address,
    abi: Abi,
    provider: Arc<Provider<Http>>,
}

impl EthRegistryContract {
    pub fn new(address: Address, provider: Provider<Http>) -> Result<Self> {
        let abi = parse_abi(REGISTRY_ABI)
            .map_err(|e| Error::ContractError(format!("Invalid registry ABI: {}", e)))?;
        Ok(Self {
            address,
            abi,
            provider: Arc::new(provider),
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    fn reader(&self) -> Contract<Provider<Http>> {
        Contract::new(self.address, self.abi.clone(), self.provider.clone())
    }

    fn writer(
        &self,
        signer: &EthSigner,
    ) -> Contract<SignerMiddleware<Provider<Http>, LocalWallet>> {
        Contract::new(self.address, self.abi.clone(), signer.clone())
    }

    fn decode_events(&self, receipt: &TransactionReceipt) -> Vec<DecodedEvent> {
        let mut events = Vec::new();
        for log in receipt.logs.iter().filter(|l| l.address == self.address) {
            let Some(topic) = log.topics.first() else { continue };
            for event in self.abi.events() {
                if event.signature() != *topic {
                    continue;
                }
                let raw = RawLog {
                    topics: log.topics.clone(),
                    data: log.data.to_vec(),
                };
                match event.parse_log(raw) {
                    Ok(parsed) => events.push(DecodedEvent::new(
                        event.name.clone(),
                        parsed.params.into_iter().map(|p| (p.name, p.value)).collect(),
                    )),
                    Err(e) => debug!("Skipping undecodable {} log: {}", event.name, e),
                }
            }
        }
        events
    }

    fn decode_receipt(&self, receipt: Option<TransactionReceipt>) -> Result<RegistrationReceipt> {
        let receipt = receipt.ok_or_else(|| {
            Error::ContractError("Transaction dropped before it was mined".to_string())
        })?;
        if receipt.status == Some(0u64.into()) {
            return Err(Error::ContractError(format!(
                "Transaction {:?} reverted",
                receipt.transaction_hash
            )));
        }
        Ok(RegistrationReceipt {
            transaction_hash: Some(format!("{:?}", receipt.transaction_hash)),
            events: self.decode_events(&receipt),
        })
    }
}

fn contract_err(context: &str, err: impl std::fmt::Display) -> Error {
    Error::ContractError(format!("{}: {}", context, err))
}

#[async_trait]
impl RegistryContract for EthRegistryContract {
    type Signer = EthSigner;

    async fn register_transaction(
        &self,
        signer: &EthSigner,
        call: &RegistrationCall,
    ) -> Result<RegistrationReceipt> {
        let contract = self.writer(signer);
        let method = contract.method::<_, U256>(
            "registerTransaction",
            (
                call.source_chain.clone(),
                call.target_chain.clone(),
                call.source_token.clone(),
                call.target_token.clone(),
                call.amount_in,
                call.amount_out,
                call.transaction_hash.clone(),
            ),
        )
        .map_err(|e| contract_err("Cannot encode registerTransaction", e))?;
        let pending = method
            .send()
            .await
            .map_err(|e| contract_err("registerTransaction failed", e))?;
        info!("Submitted registration {:?}", *pending);
        let receipt = pending
            .await
            .map_err(|e| contract_err("registerTransaction was not mined", e))?;
        self.decode_receipt(receipt)
    }

    async fn update_transaction_status(
        &self,
        signer: &EthSigner,
        id: U256,
        successful: bool,
    ) -> Result<RegistrationReceipt> {
        let contract = self.writer(signer);
        let method = contract
            .method::<_, ()>("updateTransactionStatus", (id, successful))
            .map_err(|e| contract_err("Cannot encode updateTransactionStatus", e))?;
        let pending = method
            .send()
            .await
            .map_err(|e| contract_err("updateTransactionStatus failed", e))?;
        let receipt = pending
            .await
            .map_err(|e| contract_err("updateTransactionStatus was not mined", e))?;
        self.decode_receipt(receipt)
    }

    async fn get_user_transactions(&self, user: Address) -> Result<Vec<U256>> {
        self.reader()
            .method::<_, Vec<U256>>("getUserTransactions", user)
            .map_err(|e| contract_err("Cannot encode getUserTransactions", e))?
            .call()
            .await
            .map_err(|e| contract_err("getUserTransactions failed", e))
    }

    async fn get_transaction(&self, id: U256) -> Result<OnChainTransaction> {
        let tuple: TransactionTuple = self
            .reader()
            .method::<_, TransactionTuple>("getTransaction", id)
            .map_err(|e| contract_err("Cannot encode getTransaction", e))?
            .call()
            .await
            .map_err(|e| contract_err("getTransaction failed", e))?;
        Ok(tuple.into())
    }
}
