//! Convenience client that builds, signs and submits ledger transactions

use crate::crypto::KeyPair;
use crate::instruction;
use crate::pda;
use crate::runtime::{Runtime, TransactionReceipt};
use crate::transaction::Transaction;
use crate::types::Pubkey;
use crate::Result;
use std::sync::Arc;

/// Client for one deployment of the donation program
#[derive(Debug, Clone)]
pub struct DonationClient {
    runtime: Arc<Runtime>,
    program_id: Pubkey,
}

impl DonationClient {
    /// Wrap a runtime
    pub fn new(runtime: Arc<Runtime>) -> Self {
        let program_id = runtime.program_id();
        Self {
            runtime,
            program_id,
        }
    }

    /// Underlying runtime
    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Bank address for `authority`
    pub fn bank_address(&self, authority: &Pubkey) -> Pubkey {
        pda::bank_address(authority, &self.program_id).0
    }

    /// Registry address for (`bank`, `donor`)
    pub fn registry_address(&self, bank: &Pubkey, donor: &Pubkey) -> Pubkey {
        pda::registry_address(bank, donor, &self.program_id).0
    }

    /// Create the bank for `authority`, paid by `payer`. Returns the bank address.
    pub fn initialize(&self, payer: &KeyPair, authority: &Pubkey) -> Result<Pubkey> {
        let ix = instruction::initialize(&self.program_id, &payer.pubkey(), authority)?;
        self.submit(vec![ix], &[payer])?;
        Ok(self.bank_address(authority))
    }

    /// Contribute `amount` lamports from `donor` to `bank`
    pub fn make_donation(
        &self,
        donor: &KeyPair,
        bank: &Pubkey,
        amount: u64,
    ) -> Result<TransactionReceipt> {
        let ix = instruction::make_donation(&self.program_id, bank, &donor.pubkey(), amount)?;
        self.submit(vec![ix], &[donor])
    }

    /// Move the bank's surplus to `destination`
    pub fn withdraw(
        &self,
        authority: &KeyPair,
        bank: &Pubkey,
        destination: &Pubkey,
    ) -> Result<TransactionReceipt> {
        let ix = instruction::withdraw(&self.program_id, bank, &authority.pubkey(), destination)?;
        self.submit(vec![ix], &[authority])
    }

    /// Plain system transfer
    pub fn transfer(&self, from: &KeyPair, to: &Pubkey, lamports: u64) -> Result<TransactionReceipt> {
        let ix = instruction::system_transfer(&from.pubkey(), to, lamports)?;
        self.submit(vec![ix], &[from])
    }

    /// Sign and submit arbitrary instructions as one transaction
    pub fn submit(
        &self,
        instructions: Vec<instruction::Instruction>,
        signers: &[&KeyPair],
    ) -> Result<TransactionReceipt> {
        let tx = Transaction::new_signed(instructions, signers)?;
        self.runtime.process_transaction(&tx)
    }
}
