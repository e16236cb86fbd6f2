use anyhow::Result;
use async_trait::async_trait;
use rand::Rng;
use uuid::Uuid;

use crate::domain::{Currency, CurrencyFamily, Transaction};

const BASE58_ALPHABET: &[u8] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";
const HEX_ALPHABET: &[u8] = b"0123456789abcdef";

/// What the chain reported for a pending withdrawal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementOutcome {
    Confirmed,
    Rejected { reason: String },
}

/// Access to the blockchain side of a wallet.
#[async_trait]
pub trait Blockchain: Send + Sync {
    /// A fresh deposit address for `currency`. Uniqueness is enforced by storage.
    fn generate_address(&self, currency: Currency) -> String;

    /// A fresh external reference hash for a ledger entry.
    fn reference_hash(&self) -> String;

    /// Ask the network whether a pending withdrawal went through.
    async fn confirm_withdrawal(&self, tx: &Transaction) -> Result<SettlementOutcome>;
}

/// Offline chain: random addresses and hashes, every withdrawal confirms.
#[derive(Debug, Clone, Default)]
pub struct SimulatedChain;

impl SimulatedChain {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Blockchain for SimulatedChain {
    fn generate_address(&self, currency: Currency) -> String {
        match currency.family() {
            CurrencyFamily::Utxo => format!("1{}", random_string(BASE58_ALPHABET, 33)),
            CurrencyFamily::Account => format!("0x{}", random_string(HEX_ALPHABET, 40)),
        }
    }

    fn reference_hash(&self) -> String {
        format!("0x{}", Uuid::new_v4().simple())
    }

    async fn confirm_withdrawal(&self, _tx: &Transaction) -> Result<SettlementOutcome> {
        Ok(SettlementOutcome::Confirmed)
    }
}

fn random_string(alphabet: &[u8], len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| alphabet[rng.gen_range(0..alphabet.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utxo_address_format() {
        let address = SimulatedChain::new().generate_address(Currency::Btc);
        assert!(address.starts_with('1'));
        assert_eq!(address.len(), 34);
        assert!(address.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_account_address_format() {
        for currency in [Currency::Eth, Currency::Usdt, Currency::Usdc, Currency::Bnb] {
            let address = SimulatedChain::new().generate_address(currency);
            assert!(address.starts_with("0x"));
            assert_eq!(address.len(), 42);
            assert!(address[2..].chars().all(|c| c.is_ascii_hexdigit()));
        }
    }

    #[test]
    fn test_reference_hash_format() {
        let hash = SimulatedChain::new().reference_hash();
        assert!(hash.starts_with("0x"));
        assert_eq!(hash.len(), 34);
    }
}
