//! Execution context handed to programs
//!
//! A transaction never writes to the committed account store directly. All
//! reads fall through an [`AccountsOverlay`] to the store, and the first
//! write to an account copies it into the overlay. The runtime commits the
//! overlay in one step on success and drops it on failure, which is what
//! makes each transaction all-or-nothing.
//!
//! [`InvokeContext`] wraps the overlay for one instruction and is the only
//! way a program can touch accounts. It enforces the host rules:
//! - only accounts marked writable may change
//! - only the owning program may debit lamports or write data
//! - system-owned lamports move only with the owner's signature
//! - program accounts are created only at addresses the program can derive

use crate::event::LedgerEvent;
use crate::instruction::AccountMeta;
use crate::pda;
use crate::rent::Rent;
use crate::types::{Account, Pubkey, SYSTEM_PROGRAM_ID};
use crate::{Error, Result};
use std::collections::BTreeMap;

/// Copy-on-write view over the committed accounts
#[derive(Debug)]
pub struct AccountsOverlay<'a> {
    base: &'a BTreeMap<Pubkey, Account>,
    dirty: BTreeMap<Pubkey, Account>,
}

impl<'a> AccountsOverlay<'a> {
    /// Start an empty overlay on top of `base`
    pub fn new(base: &'a BTreeMap<Pubkey, Account>) -> Self {
        Self {
            base,
            dirty: BTreeMap::new(),
        }
    }

    /// Current view of an account
    pub fn get(&self, key: &Pubkey) -> Option<&Account> {
        self.dirty.get(key).or_else(|| self.base.get(key))
    }

    /// Mutable view, creating an empty system account if absent
    pub fn get_mut_or_default(&mut self, key: &Pubkey) -> &mut Account {
        let base = self.base;
        self.dirty
            .entry(*key)
            .or_insert_with(|| base.get(key).cloned().unwrap_or_default())
    }

    /// Lamports held by `key` (0 if absent)
    pub fn lamports(&self, key: &Pubkey) -> u64 {
        self.get(key).map(|a| a.lamports).unwrap_or(0)
    }

    /// Addresses written by this transaction
    pub fn touched(&self) -> impl Iterator<Item = &Pubkey> {
        self.dirty.keys()
    }

    /// Verify host invariants over every touched account.
    ///
    /// - total lamports across touched accounts is unchanged
    /// - every account holding data is at or above its persistence floor
    pub fn check_invariants(&self, rent: &Rent) -> Result<()> {
        let mut before: u128 = 0;
        let mut after: u128 = 0;

        for (key, account) in &self.dirty {
            before += self.base.get(key).map(|a| a.lamports).unwrap_or(0) as u128;
            after += account.lamports as u128;

            if !account.data.is_empty() && !rent.is_exempt(account.lamports, account.data.len()) {
                return Err(Error::InsufficientFundsForRent(*key));
            }
        }

        if before != after {
            return Err(Error::UnbalancedTransaction { before, after });
        }
        Ok(())
    }

    /// Hand the staged writes back for commit
    pub fn into_dirty(self) -> BTreeMap<Pubkey, Account> {
        self.dirty
    }
}

/// Per-instruction view of the transaction state
pub struct InvokeContext<'a, 'b> {
    program_id: Pubkey,
    rent: &'a Rent,
    metas: &'a [AccountMeta],
    accounts: &'a mut AccountsOverlay<'b>,
    events: &'a mut Vec<LedgerEvent>,
}

impl<'a, 'b> InvokeContext<'a, 'b> {
    /// Create a context for one instruction of `program_id`
    pub fn new(
        program_id: Pubkey,
        rent: &'a Rent,
        metas: &'a [AccountMeta],
        accounts: &'a mut AccountsOverlay<'b>,
        events: &'a mut Vec<LedgerEvent>,
    ) -> Self {
        Self {
            program_id,
            rent,
            metas,
            accounts,
            events,
        }
    }

    /// Program being executed
    pub fn program_id(&self) -> &Pubkey {
        &self.program_id
    }

    /// Rent parameters
    pub fn rent(&self) -> &Rent {
        self.rent
    }

    /// Fail unless the instruction references at least `needed` accounts
    pub fn require_accounts(&self, needed: usize) -> Result<()> {
        if self.metas.len() < needed {
            return Err(Error::NotEnoughAccountKeys {
                needed,
                got: self.metas.len(),
            });
        }
        Ok(())
    }

    /// Address at position `index` of the instruction's account list
    pub fn key(&self, index: usize) -> Result<Pubkey> {
        self.metas
            .get(index)
            .map(|meta| meta.pubkey)
            .ok_or(Error::NotEnoughAccountKeys {
                needed: index + 1,
                got: self.metas.len(),
            })
    }

    /// Whether `key` signed this instruction
    pub fn is_signer(&self, key: &Pubkey) -> bool {
        self.metas.iter().any(|m| m.pubkey == *key && m.is_signer)
    }

    /// Whether `key` is writable in this instruction
    pub fn is_writable(&self, key: &Pubkey) -> bool {
        self.metas.iter().any(|m| m.pubkey == *key && m.is_writable)
    }

    /// Fail with [`Error::MissingSignature`] unless `key` signed
    pub fn require_signer(&self, key: &Pubkey) -> Result<()> {
        if !self.is_signer(key) {
            return Err(Error::MissingSignature(*key));
        }
        Ok(())
    }

    /// Current view of an account
    pub fn account(&self, key: &Pubkey) -> Option<&Account> {
        self.accounts.get(key)
    }

    /// Lamports held by `key`
    pub fn lamports(&self, key: &Pubkey) -> u64 {
        self.accounts.lamports(key)
    }

    fn writable(&mut self, key: &Pubkey) -> Result<&mut Account> {
        if !self.is_writable(key) {
            return Err(Error::ReadonlyAccount(*key));
        }
        Ok(self.accounts.get_mut_or_default(key))
    }

    /// Move lamports out of a system-owned account the owner signed for
    pub fn system_transfer(&mut self, from: &Pubkey, to: &Pubkey, lamports: u64) -> Result<()> {
        self.require_signer(from)?;

        if let Some(source) = self.accounts.get(from) {
            if source.owner != SYSTEM_PROGRAM_ID || !source.data.is_empty() {
                return Err(Error::IllegalOwner(*from));
            }
        }

        let available = self.lamports(from);
        if available < lamports {
            return Err(Error::InsufficientFunds {
                account: *from,
                needed: lamports,
                available,
            });
        }

        self.writable(to)?;
        let source = self.writable(from)?;
        source.lamports -= lamports;
        let dest = self.writable(to)?;
        dest.lamports = dest
            .lamports
            .checked_add(lamports)
            .ok_or(Error::CalculationFailure)?;
        Ok(())
    }

    /// Move lamports out of an account owned by the executing program
    pub fn move_lamports(&mut self, from: &Pubkey, to: &Pubkey, lamports: u64) -> Result<()> {
        let program_id = self.program_id;
        match self.accounts.get(from) {
            Some(account) if account.owner == program_id => {}
            Some(_) => return Err(Error::IllegalOwner(*from)),
            None => return Err(Error::AccountNotFound(*from)),
        }

        let available = self.lamports(from);
        if available < lamports {
            return Err(Error::InsufficientFunds {
                account: *from,
                needed: lamports,
                available,
            });
        }

        self.writable(to)?;
        let source = self.writable(from)?;
        source.lamports -= lamports;
        let dest = self.writable(to)?;
        dest.lamports = dest
            .lamports
            .checked_add(lamports)
            .ok_or(Error::CalculationFailure)?;
        Ok(())
    }

    /// Create a program-owned account at the address derived from `seeds`.
    ///
    /// `seeds` must include the bump. The payer funds the persistence floor
    /// for `space` bytes; lamports already sitting at the address count
    /// toward it. Fails with [`Error::AlreadyExists`] if the address holds
    /// data or belongs to a program.
    pub fn create_pda_account(
        &mut self,
        payer: &Pubkey,
        address: &Pubkey,
        seeds: &[&[u8]],
        space: usize,
    ) -> Result<()> {
        let expected = pda::create_program_address(seeds, &self.program_id)?;
        if expected != *address {
            return Err(Error::SeedsConstraint {
                expected,
                actual: *address,
            });
        }

        if let Some(existing) = self.accounts.get(address) {
            if !existing.data.is_empty() || existing.owner != SYSTEM_PROGRAM_ID {
                return Err(Error::AlreadyExists(*address));
            }
        }

        let required = self.rent.minimum_balance(space);
        let shortfall = required.saturating_sub(self.lamports(address));
        if shortfall > 0 {
            self.system_transfer(payer, address, shortfall)?;
        }

        let program_id = self.program_id;
        let account = self.writable(address)?;
        account.data = vec![0u8; space];
        account.owner = program_id;

        tracing::debug!(%address, %payer, space, "created program account");
        Ok(())
    }

    /// Replace the data of an account owned by the executing program
    pub fn set_data(&mut self, key: &Pubkey, data: Vec<u8>) -> Result<()> {
        let program_id = self.program_id;
        match self.accounts.get(key) {
            Some(account) if account.owner == program_id => {}
            Some(_) => return Err(Error::IllegalOwner(*key)),
            None => return Err(Error::AccountNotFound(*key)),
        }
        let account = self.writable(key)?;
        account.data = data;
        Ok(())
    }

    /// Stage an event; it is published only if the transaction commits
    pub fn emit(&mut self, event: LedgerEvent) {
        self.events.push(event);
    }
}
