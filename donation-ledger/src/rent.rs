//! Persistence floor ("rent exemption") accounting

use crate::config::RentConfig;

/// Rent parameters of the host runtime
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rent {
    /// Lamports charged per byte-year of storage
    pub lamports_per_byte_year: u64,

    /// Years of rent an account must hold to be exempt
    pub exemption_threshold: f64,

    /// Bytes of bookkeeping charged on top of every account's data
    pub account_storage_overhead: u64,
}

impl Default for Rent {
    fn default() -> Self {
        Self::from(&RentConfig::default())
    }
}

impl From<&RentConfig> for Rent {
    fn from(config: &RentConfig) -> Self {
        Self {
            lamports_per_byte_year: config.lamports_per_byte_year,
            exemption_threshold: config.exemption_threshold,
            account_storage_overhead: config.account_storage_overhead,
        }
    }
}

impl Rent {
    /// Minimum lamports an account holding `data_len` bytes must keep
    pub fn minimum_balance(&self, data_len: usize) -> u64 {
        let bytes = self
            .account_storage_overhead
            .saturating_add(data_len as u64);
        (bytes.saturating_mul(self.lamports_per_byte_year) as f64 * self.exemption_threshold) as u64
    }

    /// Whether `lamports` keeps an account of `data_len` bytes alive
    pub fn is_exempt(&self, lamports: u64, data_len: usize) -> bool {
        lamports >= self.minimum_balance(data_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Bank, LedgerAccount, Registry};

    #[test]
    fn test_default_floors() {
        let rent = Rent::default();
        assert_eq!(rent.minimum_balance(0), 890_880);
        assert_eq!(rent.minimum_balance(Bank::LEN), 1_169_280);
        assert_eq!(rent.minimum_balance(Registry::LEN), 1_447_680);
    }

    #[test]
    fn test_is_exempt() {
        let rent = Rent::default();
        let floor = rent.minimum_balance(Bank::LEN);
        assert!(rent.is_exempt(floor, Bank::LEN));
        assert!(!rent.is_exempt(floor - 1, Bank::LEN));
    }

    #[test]
    fn test_extreme_parameters_saturate() {
        let rent = Rent {
            lamports_per_byte_year: u64::MAX,
            exemption_threshold: 2.0,
            account_storage_overhead: u64::MAX,
        };
        assert_eq!(rent.minimum_balance(Registry::LEN), u64::MAX);
        assert!(!rent.is_exempt(u64::MAX - 1, 0));
    }
}
