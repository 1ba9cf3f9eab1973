use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cryptocurrency {
    pub name: String,
    pub symbol: String,
    pub price: f64,
    pub market_cap: f64,
    pub price_change_24h: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
}

impl Cryptocurrency {
    pub fn new(
        name: &str,
        symbol: &str,
        price: f64,
        market_cap: f64,
        price_change_24h: f64,
    ) -> Self {
        Self {
            name: name.to_string(),
            symbol: symbol.to_string(),
            price,
            market_cap,
            price_change_24h,
            logo_url: None,
        }
    }
}

/// Market snapshot rendered by the bubble chart.
pub fn top_cryptocurrencies() -> Vec<Cryptocurrency> {
    vec![
        Cryptocurrency::new("Bitcoin", "BTC", 84419.45, 1674904033791.0, 0.31),
        Cryptocurrency::new("Ethereum", "ETH", 2000.32, 241308132147.0, 1.6),
        Cryptocurrency::new("Tether", "USDT", 0.9997, 143455189576.0, 0.03),
        Cryptocurrency::new("XRP", "XRP", 2.41, 140187596435.0, -0.04),
        Cryptocurrency::new("BNB", "BNB", 632.21, 90074133503.0, 0.14),
        Cryptocurrency::new("Solana", "SOL", 172.45, 72123456789.0, 2.45),
        Cryptocurrency::new("USDC", "USDC", 1.0, 33123456789.0, 0.01),
        Cryptocurrency::new("Cardano", "ADA", 0.4532, 15123456789.0, -0.89),
        Cryptocurrency::new("Avalanche", "AVAX", 36.78, 14123456789.0, 4.56),
        Cryptocurrency::new("Dogecoin", "DOGE", 0.1234, 13123456789.0, -2.34),
        Cryptocurrency::new("Polkadot", "DOT", 7.89, 9123456789.0, 0.78),
        Cryptocurrency::new("TRON", "TRX", 0.1345, 8923456789.0, 1.23),
        Cryptocurrency::new("Polygon", "MATIC", 0.7654, 7123456789.0, 3.21),
        Cryptocurrency::new("Chainlink", "LINK", 14.56, 7023456789.0, -1.67),
        Cryptocurrency::new("Shiba Inu", "SHIB", 0.00002345, 6923456789.0, -0.45),
        Cryptocurrency::new("Litecoin", "LTC", 83.45, 6123456789.0, 0.56),
        Cryptocurrency::new("Dai", "DAI", 0.9998, 5923456789.0, 0.02),
        Cryptocurrency::new("Bitcoin Cash", "BCH", 345.67, 5823456789.0, 1.78),
        Cryptocurrency::new("Stellar", "XLM", 0.1234, 5123456789.0, -0.34),
        Cryptocurrency::new("Uniswap", "UNI", 7.89, 4923456789.0, 2.12),
    ]
}
