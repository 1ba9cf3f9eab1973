pub mod market;
pub mod transaction;

pub use market::{top_cryptocurrencies, Cryptocurrency};
pub use transaction::{
    PendingTransaction, RegisterOutcome, RegistrationParams, TransactionFilter, TransactionRecord,
};
