use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Btc,
    Eth,
    Usdt,
    Usdc,
    Bnb,
}

/// Address format family of a currency's chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurrencyFamily {
    /// Bitcoin-style chains: base58 addresses starting with "1"
    Utxo,
    /// EVM-style chains: "0x" followed by 40 hex characters
    Account,
}

impl Currency {
    pub const ALL: [Currency; 5] = [
        Currency::Btc,
        Currency::Eth,
        Currency::Usdt,
        Currency::Usdc,
        Currency::Bnb,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Btc => "BTC",
            Currency::Eth => "ETH",
            Currency::Usdt => "USDT",
            Currency::Usdc => "USDC",
            Currency::Bnb => "BNB",
        }
    }

    pub fn family(&self) -> CurrencyFamily {
        match self {
            Currency::Btc => CurrencyFamily::Utxo,
            _ => CurrencyFamily::Account,
        }
    }
}

impl FromStr for Currency {
    type Err = UnsupportedCurrency;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_uppercase();
        Currency::ALL
            .into_iter()
            .find(|currency| currency.as_str() == code)
            .ok_or_else(|| UnsupportedCurrency(s.to_string()))
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsupportedCurrency(pub String);

impl std::fmt::Display for UnsupportedCurrency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let supported: Vec<&str> = Currency::ALL.iter().map(Currency::as_str).collect();
        write!(
            f,
            "unsupported currency '{}', expected one of {}",
            self.0,
            supported.join(", ")
        )
    }
}

impl std::error::Error for UnsupportedCurrency {}
