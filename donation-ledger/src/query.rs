//! Read-only queries over committed ledger state

use crate::pda;
use crate::runtime::{AccountFilter, Runtime};
use crate::state::{Bank, LedgerAccount, Registry};
use crate::types::Pubkey;
use crate::{Error, Result};

/// Every registry recorded against `bank`, in address order.
///
/// Matches program-owned accounts carrying the registry discriminator whose
/// `bank` field (offset 8) equals `bank`. An unknown bank yields an empty list.
pub fn list_registries(runtime: &Runtime, bank: &Pubkey) -> Result<Vec<(Pubkey, Registry)>> {
    let filters = [
        AccountFilter::DataSize(Registry::LEN),
        AccountFilter::Memcmp {
            offset: 0,
            bytes: Registry::discriminator().to_vec(),
        },
        AccountFilter::Memcmp {
            offset: Registry::BANK_OFFSET,
            bytes: bank.as_ref().to_vec(),
        },
    ];

    runtime
        .program_accounts(&runtime.program_id(), &filters)
        .into_iter()
        .map(|(key, account)| Ok((key, Registry::try_deserialize(&key, &account.data)?)))
        .collect()
}

/// The registry for (`bank`, `donor`), if that donor has contributed.
pub fn get_registry(runtime: &Runtime, bank: &Pubkey, donor: &Pubkey) -> Result<Option<Registry>> {
    let (address, _) = pda::registry_address(bank, donor, &runtime.program_id());
    load(runtime, &address)
}

/// The bank controlled by `authority`, with its address.
pub fn get_bank(runtime: &Runtime, authority: &Pubkey) -> Result<Option<(Pubkey, Bank)>> {
    let (address, _) = pda::bank_address(authority, &runtime.program_id());
    Ok(load::<Bank>(runtime, &address)?.map(|bank| (address, bank)))
}

/// Sum of every registry amount for `bank`
pub fn total_raised(runtime: &Runtime, bank: &Pubkey) -> Result<u128> {
    Ok(list_registries(runtime, bank)?
        .iter()
        .map(|(_, registry)| u128::from(registry.amount))
        .sum())
}

/// Lamports a withdraw from `bank` would move right now
pub fn withdrawable(runtime: &Runtime, bank: &Pubkey) -> Result<u64> {
    let account = runtime
        .get_account(bank)
        .ok_or(Error::AccountNotFound(*bank))?;
    let floor = runtime.minimum_balance(account.data.len());
    Ok(account.lamports.saturating_sub(floor))
}

fn load<T: LedgerAccount>(runtime: &Runtime, address: &Pubkey) -> Result<Option<T>> {
    match runtime.get_account(address) {
        Some(account) if account.owner == runtime.program_id() => {
            T::try_deserialize(address, &account.data).map(Some)
        }
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::DonationClient;
    use crate::crypto::KeyPair;
    use crate::Config;
    use std::sync::Arc;

    fn setup() -> (DonationClient, KeyPair, Pubkey) {
        let runtime = Arc::new(Runtime::new(&Config::default()).unwrap());
        let client = DonationClient::new(runtime);
        let authority = KeyPair::generate();
        client
            .runtime()
            .airdrop(&authority.pubkey(), 10_000_000)
            .unwrap();
        let bank = client.initialize(&authority, &authority.pubkey()).unwrap();
        (client, authority, bank)
    }

    #[test]
    fn test_unknown_bank_has_no_registries() {
        let (client, _, _) = setup();
        let registries = list_registries(client.runtime(), &Pubkey::new_rand()).unwrap();
        assert!(registries.is_empty());
        assert_eq!(total_raised(client.runtime(), &Pubkey::new_rand()).unwrap(), 0);
    }

    #[test]
    fn test_registries_scoped_to_bank() {
        let (client, _, bank_a) = setup();
        let other = KeyPair::generate();
        client.runtime().airdrop(&other.pubkey(), 10_000_000).unwrap();
        let bank_b = client.initialize(&other, &other.pubkey()).unwrap();

        let donor = KeyPair::generate();
        client.runtime().airdrop(&donor.pubkey(), 10_000_000).unwrap();
        client.make_donation(&donor, &bank_a, 1_000).unwrap();
        client.make_donation(&donor, &bank_b, 2_000).unwrap();
        client.make_donation(&donor, &bank_a, 500).unwrap();

        let a = list_registries(client.runtime(), &bank_a).unwrap();
        assert_eq!(a.len(), 1);
        assert_eq!(a[0].1.amount, 1_500);
        assert_eq!(total_raised(client.runtime(), &bank_b).unwrap(), 2_000);

        let registry = get_registry(client.runtime(), &bank_a, &donor.pubkey())
            .unwrap()
            .unwrap();
        assert_eq!(registry.donor, donor.pubkey());
    }

    #[test]
    fn test_get_bank_and_withdrawable() {
        let (client, authority, bank) = setup();
        let (address, state) = get_bank(client.runtime(), &authority.pubkey())
            .unwrap()
            .unwrap();
        assert_eq!(address, bank);
        assert_eq!(state.authority, authority.pubkey());
        assert_eq!(withdrawable(client.runtime(), &bank).unwrap(), 0);

        assert!(get_bank(client.runtime(), &Pubkey::new_rand())
            .unwrap()
            .is_none());
        assert!(matches!(
            withdrawable(client.runtime(), &Pubkey::new_rand()),
            Err(Error::AccountNotFound(_))
        ));
    }
}
