use async_trait::async_trait;
use ethers::middleware::SignerMiddleware;
use ethers::providers::{Http, Middleware, Provider};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, U256};
use log::{debug, warn};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::registry::contract::EthSigner;

/// Source of the user's address, current chain and signing capability.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    type Signer: Send + Sync;

    /// `None` when no account is connected.
    async fn address(&self) -> Option<Address>;

    async fn get_network(&self) -> Result<u64>;

    async fn switch_network(&self, chain_id: u64) -> Result<()>;

    async fn get_signer(&self) -> Result<Self::Signer>;
}

#[async_trait]
impl<T: WalletProvider + ?Sized> WalletProvider for Arc<T> {
    type Signer = T::Signer;

    async fn address(&self) -> Option<Address> {
        (**self).address().await
    }

    async fn get_network(&self) -> Result<u64> {
        (**self).get_network().await
    }

    async fn switch_network(&self, chain_id: u64) -> Result<()> {
        (**self).switch_network(chain_id).await
    }

    async fn get_signer(&self) -> Result<Self::Signer> {
        (**self).get_signer().await
    }
}

/// Wallet backed by a local private key and a JSON-RPC endpoint.
/// Without a key it reports no address.
pub struct LocalWalletProvider {
    provider: Provider<Http>,
    wallet: Option<LocalWallet>,
}

impl LocalWalletProvider {
    pub fn new(provider: Provider<Http>, private_key: Option<&str>) -> Result<Self> {
        let wallet = match private_key.map(str::trim).filter(|k| !k.is_empty()) {
            Some(key) => Some(
                key.parse::<LocalWallet>()
                    .map_err(|e| Error::ConfigError(format!("Invalid private key: {}", e)))?,
            ),
            None => {
                warn!("No private key configured, wallet is disconnected");
                None
            }
        };
        Ok(Self { provider, wallet })
    }
}

fn chain_id_from(value: U256) -> Result<u64> {
    if value > U256::from(u64::MAX) {
        return Err(Error::NetworkError(format!("Chain id {} out of range", value)));
    }
    Ok(value.as_u64())
}

#[async_trait]
impl WalletProvider for LocalWalletProvider {
    type Signer = EthSigner;

    async fn address(&self) -> Option<Address> {
        self.wallet.as_ref().map(|w| w.address())
    }

    async fn get_network(&self) -> Result<u64> {
        let chain_id = self.provider.get_chainid().await?;
        chain_id_from(chain_id)
    }

    /// A key-backed wallet follows its RPC endpoint, so switching only
    /// succeeds when the endpoint already serves `chain_id`.
    async fn switch_network(&self, chain_id: u64) -> Result<()> {
        let actual = self.get_network().await?;
        if actual != chain_id {
            return Err(Error::WrongNetwork { expected: chain_id, actual });
        }
        debug!("Wallet already on chain {}", chain_id);
        Ok(())
    }

    async fn get_signer(&self) -> Result<EthSigner> {
        let wallet = self
            .wallet
            .clone()
            .ok_or_else(|| Error::WalletNotConnected("no private key".to_string()))?;
        let chain_id = self.get_network().await?;
        let signer = SignerMiddleware::new(self.provider.clone(), wallet.with_chain_id(chain_id));
        Ok(Arc::new(signer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Anvil's first default account.
    const TEST_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn provider() -> Provider<Http> {
        Provider::<Http>::try_from("http://127.0.0.1:1").unwrap()
    }

    #[tokio::test]
    async fn test_address_from_key() {
        let wallet = LocalWalletProvider::new(provider(), Some(TEST_KEY)).unwrap();
        let expected: Address = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266".parse().unwrap();
        assert_eq!(wallet.address().await, Some(expected));
    }

    #[tokio::test]
    async fn test_without_key_is_disconnected() {
        let wallet = LocalWalletProvider::new(provider(), None).unwrap();
        assert_eq!(wallet.address().await, None);
        assert!(matches!(wallet.get_signer().await, Err(Error::WalletNotConnected(_))));

        let blank = LocalWalletProvider::new(provider(), Some("  ")).unwrap();
        assert_eq!(blank.address().await, None);
    }

    #[test]
    fn test_invalid_key_is_config_error() {
        assert!(matches!(
            LocalWalletProvider::new(provider(), Some("not-a-key")),
            Err(Error::ConfigError(_))
        ));
    }

    #[test]
    fn test_chain_id_must_fit_u64() {
        assert_eq!(chain_id_from(U256::from(656476u64)).unwrap(), 656476);
        assert_eq!(chain_id_from(U256::from(u64::MAX)).unwrap(), u64::MAX);
        assert!(matches!(
            chain_id_from(U256::from(u64::MAX) + U256::one()),
            Err(Error::NetworkError(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_rpc_fails_network_lookup() {
        let wallet = LocalWalletProvider::new(provider(), Some(TEST_KEY)).unwrap();
        assert!(wallet.get_network().await.is_err());
        assert!(wallet.switch_network(656476).await.is_err());
    }
}
