use chrono::{DateTime, Utc};
use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A cross-chain transfer as recorded by the registry contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub id: U256,
    pub user: Address,
    pub timestamp: DateTime<Utc>,
    pub source_chain: String,
    pub target_chain: String,
    pub source_token: String,
    pub target_token: String,
    pub amount_in: String,
    pub amount_out: String,
    pub transaction_hash: String,
    pub successful: bool,
}

impl TransactionRecord {
    pub fn explorer_url(&self, explorer_base: &str) -> String {
        format!("{}/tx/{}", explorer_base.trim_end_matches('/'), self.transaction_hash)
    }

    pub fn status_label(&self) -> &'static str {
        if self.successful { "Success" } else { "Pending" }
    }
}

/// Arguments of a `registerTransaction` call, amounts as decimal strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationParams {
    pub source_chain: String,
    pub target_chain: String,
    pub source_token: String,
    pub target_token: String,
    pub amount_in: String,
    pub amount_out: String,
    pub transaction_hash: String,
}

/// A registration waiting in the local queue. Timestamp is milliseconds since the epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingTransaction {
    #[serde(flatten)]
    pub params: RegistrationParams,
    pub timestamp: i64,
}

impl PendingTransaction {
    pub fn new(params: RegistrationParams) -> Self {
        Self {
            params,
            timestamp: Utc::now().timestamp_millis(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    /// Submitted on-chain. `id` is absent when the receipt carried no registration event.
    Registered { id: Option<U256> },
    /// Queued locally until the wallet reaches the registry chain.
    Pending,
}

impl fmt::Display for RegisterOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegisterOutcome::Pending => write!(f, "pending"),
            RegisterOutcome::Registered { id: Some(id) } => write!(f, "{}", id),
            RegisterOutcome::Registered { id: None } => write!(f, "registered"),
        }
    }
}

impl Serialize for RegisterOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RegisterOutcome::Registered { id: None } => serializer.serialize_none(),
            other => serializer.serialize_str(&other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransactionFilter {
    #[default]
    All,
    Successful,
    Pending,
}

impl TransactionFilter {
    pub fn matches(&self, record: &TransactionRecord) -> bool {
        match self {
            TransactionFilter::All => true,
            TransactionFilter::Successful => record.successful,
            TransactionFilter::Pending => !record.successful,
        }
    }

    pub fn apply<'a>(&self, records: &'a [TransactionRecord]) -> Vec<&'a TransactionRecord> {
        records.iter().filter(|r| self.matches(r)).collect()
    }
}

impl FromStr for TransactionFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(TransactionFilter::All),
            "successful" => Ok(TransactionFilter::Successful),
            "pending" => Ok(TransactionFilter::Pending),
            other => Err(format!(
                "unknown filter '{}', expected all, successful or pending",
                other
            )),
        }
    }
}
