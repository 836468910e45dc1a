//! Persisted account layouts
//!
//! Every ledger account starts with an 8-byte discriminator derived from its
//! type name, followed by its fields in bincode's fixed-width little-endian
//! encoding:
//!
//! ```text
//! DonationBank  [disc:8][authority:32]                       = 40 bytes
//! Registry      [disc:8][bank:32][donor:32][amount:8]        = 80 bytes
//! ```
//!
//! The fixed offset of `Registry::bank` (byte 8) is what lets callers filter
//! registries per bank without an index.

use crate::crypto::{discriminator, DISCRIMINATOR_LEN};
use crate::types::Pubkey;
use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Typed view over a ledger account's data
pub trait LedgerAccount: Serialize + DeserializeOwned {
    /// Type name hashed into the discriminator
    const NAME: &'static str;

    /// Total data length, discriminator included
    const LEN: usize;

    /// Discriminator prefix for this type
    fn discriminator() -> [u8; DISCRIMINATOR_LEN] {
        discriminator("account", Self::NAME)
    }

    /// Whether `data` starts with this type's discriminator
    fn matches(data: &[u8]) -> bool {
        data.len() >= DISCRIMINATOR_LEN && data[..DISCRIMINATOR_LEN] == Self::discriminator()
    }

    /// Decode account data stored at `address`
    fn try_deserialize(address: &Pubkey, data: &[u8]) -> Result<Self> {
        if data.is_empty() {
            return Err(Error::AccountNotInitialized(*address));
        }
        if !Self::matches(data) {
            return Err(Error::AccountDiscriminatorMismatch(*address));
        }
        Ok(bincode::deserialize(&data[DISCRIMINATOR_LEN..])?)
    }

    /// Encode with discriminator, padded to `LEN`
    fn try_serialize(&self) -> Result<Vec<u8>> {
        let mut data = Vec::with_capacity(Self::LEN);
        data.extend_from_slice(&Self::discriminator());
        data.extend_from_slice(&bincode::serialize(self)?);
        if data.len() > Self::LEN {
            return Err(Error::Serialization(format!(
                "{} encodes to {} bytes, account holds {}",
                Self::NAME,
                data.len(),
                Self::LEN
            )));
        }
        data.resize(Self::LEN, 0);
        Ok(data)
    }
}

/// A donation bank. Its spendable balance is the account's own lamports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bank {
    /// Identity permitted to withdraw; fixed at creation
    pub authority: Pubkey,
}

impl LedgerAccount for Bank {
    const NAME: &'static str = "DonationBank";
    const LEN: usize = DISCRIMINATOR_LEN + 32;
}

/// One donor's cumulative standing against one bank
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registry {
    /// Bank this record is scoped to
    pub bank: Pubkey,

    /// Contributing party
    pub donor: Pubkey,

    /// Sum of every contribution, in lamports
    pub amount: u64,
}

impl Registry {
    /// Byte offset of `bank` within the account data
    pub const BANK_OFFSET: usize = DISCRIMINATOR_LEN;

    /// Byte offset of `donor` within the account data
    pub const DONOR_OFFSET: usize = DISCRIMINATOR_LEN + 32;
}

impl LedgerAccount for Registry {
    const NAME: &'static str = "Registry";
    const LEN: usize = DISCRIMINATOR_LEN + 32 + 32 + 8;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bank_layout() {
        let authority = Pubkey::new_rand();
        let data = Bank { authority }.try_serialize().unwrap();

        assert_eq!(data.len(), Bank::LEN);
        assert_eq!(data.len(), 40);
        assert_eq!(&data[..8], &Bank::discriminator());
        assert_eq!(&data[8..40], authority.as_ref());
    }

    #[test]
    fn test_registry_layout() {
        let registry = Registry {
            bank: Pubkey::new_rand(),
            donor: Pubkey::new_rand(),
            amount: 30_000,
        };
        let data = registry.try_serialize().unwrap();

        assert_eq!(data.len(), 80);
        assert_eq!(
            &data[Registry::BANK_OFFSET..Registry::BANK_OFFSET + 32],
            registry.bank.as_ref()
        );
        assert_eq!(
            &data[Registry::DONOR_OFFSET..Registry::DONOR_OFFSET + 32],
            registry.donor.as_ref()
        );
        assert_eq!(&data[72..80], &30_000u64.to_le_bytes());

        let address = Pubkey::new_rand();
        assert_eq!(Registry::try_deserialize(&address, &data).unwrap(), registry);
    }

    #[test]
    fn test_discriminator_mismatch() {
        let address = Pubkey::new_rand();
        let data = Bank {
            authority: Pubkey::new_rand(),
        }
        .try_serialize()
        .unwrap();

        assert_eq!(
            Registry::try_deserialize(&address, &data),
            Err(Error::AccountDiscriminatorMismatch(address))
        );
        assert_eq!(
            Bank::try_deserialize(&address, &[]),
            Err(Error::AccountNotInitialized(address))
        );
    }
}
