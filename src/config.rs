use std::time::Duration;

use crate::domain::MAX_FEE_BPS;

/// Tunables for the wallet and card services.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// How long a withdrawal waits for external confirmation before settling
    pub settlement_delay: Duration,
    /// Withdrawal fee in basis points (10 = 0.1%)
    pub withdrawal_fee_bps: u32,
    /// Attempts at generating a unique deposit address or card number
    pub max_generation_attempts: u32,
    pub card_currency: String,
    pub card_validity_months: u32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            settlement_delay: Duration::from_millis(3000),
            withdrawal_fee_bps: 10,
            max_generation_attempts: 5,
            card_currency: "USD".to_string(),
            card_validity_months: 36,
        }
    }
}

impl LedgerConfig {
    pub fn with_settlement_delay(mut self, delay: Duration) -> Self {
        self.settlement_delay = delay;
        self
    }

    /// Rates above 100% are capped at `MAX_FEE_BPS`.
    pub fn with_withdrawal_fee_bps(mut self, fee_bps: u32) -> Self {
        self.withdrawal_fee_bps = fee_bps.min(MAX_FEE_BPS);
        self
    }

    pub fn with_max_generation_attempts(mut self, attempts: u32) -> Self {
        self.max_generation_attempts = attempts.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fee_rate_is_capped_at_full_amount() {
        let config = LedgerConfig::default().with_withdrawal_fee_bps(20_000);
        assert_eq!(config.withdrawal_fee_bps, MAX_FEE_BPS);

        let config = LedgerConfig::default().with_withdrawal_fee_bps(25);
        assert_eq!(config.withdrawal_fee_bps, 25);
    }
}
