//! Program-derived addresses
//!
//! Accounts owned by the ledger are located by hashing an ordered seed list
//! together with the program id. The derivation deliberately lands off the
//! ed25519 curve so that no private key exists for the address; only the
//! program, by presenting the same seeds, can authorize writes to it.
//!
//! ```text
//! address = SHA-256(seed_0 || .. || seed_n || [bump] || program_id || "ProgramDerivedAddress")
//! ```
//!
//! `find_program_address` walks `bump` from 255 downwards and returns the
//! first candidate that is off the curve.

use crate::types::Pubkey;
use crate::{Error, Result};
use sha2::{Digest, Sha256};

/// Maximum length of a single seed
pub const MAX_SEED_LEN: usize = 32;

/// Maximum number of seeds, bump included
pub const MAX_SEEDS: usize = 16;

const PDA_MARKER: &[u8] = b"ProgramDerivedAddress";

/// Derive the address for seeds that already include the bump.
///
/// Fails with [`Error::InvalidSeeds`] if the hash is a valid curve point.
pub fn create_program_address(seeds: &[&[u8]], program_id: &Pubkey) -> Result<Pubkey> {
    if seeds.len() > MAX_SEEDS {
        return Err(Error::MaxSeedLengthExceeded);
    }
    if seeds.iter().any(|seed| seed.len() > MAX_SEED_LEN) {
        return Err(Error::MaxSeedLengthExceeded);
    }

    let mut hasher = Sha256::new();
    for seed in seeds {
        hasher.update(seed);
    }
    hasher.update(program_id.as_ref());
    hasher.update(PDA_MARKER);
    let hash: [u8; 32] = hasher.finalize().into();

    let address = Pubkey::new_from_array(hash);
    if address.is_on_curve() {
        return Err(Error::InvalidSeeds);
    }
    Ok(address)
}

/// Find the canonical (highest-bump) off-curve address for `seeds`.
pub fn try_find_program_address(seeds: &[&[u8]], program_id: &Pubkey) -> Result<(Pubkey, u8)> {
    // Leave room for the bump seed
    if seeds.len() >= MAX_SEEDS {
        return Err(Error::MaxSeedLengthExceeded);
    }

    for bump in (0..=u8::MAX).rev() {
        let bump_seed = [bump];
        let mut with_bump: Vec<&[u8]> = Vec::with_capacity(seeds.len() + 1);
        with_bump.extend_from_slice(seeds);
        with_bump.push(&bump_seed);

        match create_program_address(&with_bump, program_id) {
            Ok(address) => {
                tracing::trace!(%address, bump, "derived program address");
                return Ok((address, bump));
            }
            Err(Error::InvalidSeeds) => {}
            Err(e) => return Err(e),
        }
    }

    // Every one of 256 candidates landing on the curve has probability ~2^-256
    Err(Error::InvalidSeeds)
}

/// Like [`try_find_program_address`] for seed lists known to be within limits.
///
/// # Panics
///
/// Panics if the seeds exceed [`MAX_SEEDS`]/[`MAX_SEED_LEN`] or no bump
/// yields an off-curve address.
pub fn find_program_address(seeds: &[&[u8]], program_id: &Pubkey) -> (Pubkey, u8) {
    try_find_program_address(seeds, program_id)
        .expect("seeds within limits always yield a program address")
}

/// Address of the bank controlled by `authority`
pub fn bank_address(authority: &Pubkey, program_id: &Pubkey) -> (Pubkey, u8) {
    find_program_address(&[authority.as_ref()], program_id)
}

/// Address of `donor`'s registry in `bank`
pub fn registry_address(bank: &Pubkey, donor: &Pubkey, program_id: &Pubkey) -> (Pubkey, u8) {
    find_program_address(&[bank.as_ref(), donor.as_ref()], program_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn program() -> Pubkey {
        Pubkey::new_from_array([9u8; 32])
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let authority = Pubkey::new_rand();
        assert_eq!(
            bank_address(&authority, &program()),
            bank_address(&authority, &program())
        );
    }

    #[test]
    fn test_derived_address_is_off_curve() {
        for _ in 0..32 {
            let (address, _) = bank_address(&Pubkey::new_rand(), &program());
            assert!(!address.is_on_curve());
        }
    }

    #[test]
    fn test_find_agrees_with_create() {
        let bank = Pubkey::new_rand();
        let donor = Pubkey::new_rand();
        let (address, bump) = registry_address(&bank, &donor, &program());
        let created =
            create_program_address(&[bank.as_ref(), donor.as_ref(), &[bump]], &program()).unwrap();
        assert_eq!(address, created);
    }

    #[test]
    fn test_program_id_scopes_addresses() {
        let authority = Pubkey::new_rand();
        let other = Pubkey::new_from_array([10u8; 32]);
        assert_ne!(
            bank_address(&authority, &program()).0,
            bank_address(&authority, &other).0
        );
    }

    #[test]
    fn test_seed_order_matters() {
        let a = Pubkey::new_rand();
        let b = Pubkey::new_rand();
        assert_ne!(
            registry_address(&a, &b, &program()).0,
            registry_address(&b, &a, &program()).0
        );
    }

    #[test]
    fn test_seed_limits() {
        let long = [0u8; MAX_SEED_LEN + 1];
        assert_eq!(
            try_find_program_address(&[&long], &program()),
            Err(Error::MaxSeedLengthExceeded)
        );

        let seed: &[u8] = &[1u8];
        let too_many = vec![seed; MAX_SEEDS];
        assert_eq!(
            try_find_program_address(&too_many, &program()),
            Err(Error::MaxSeedLengthExceeded)
        );
    }
}
