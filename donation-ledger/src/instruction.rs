//! Instructions accepted by the runtime
//!
//! Ledger instruction data is an 8-byte discriminator derived from the
//! operation name (`SHA-256("global:<name>")[..8]`) followed by the
//! bincode-encoded arguments.

use crate::crypto::{discriminator, DISCRIMINATOR_LEN};
use crate::pda;
use crate::types::{Pubkey, SYSTEM_PROGRAM_ID};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Account referenced by an instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountMeta {
    /// Account address
    pub pubkey: Pubkey,
    /// Transaction must carry this account's signature
    pub is_signer: bool,
    /// Instruction may modify this account
    pub is_writable: bool,
}

impl AccountMeta {
    /// Writable account
    pub fn new(pubkey: Pubkey, is_signer: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable: true,
        }
    }

    /// Read-only account
    pub fn new_readonly(pubkey: Pubkey, is_signer: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable: false,
        }
    }
}

/// A single program invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    /// Program to invoke
    pub program_id: Pubkey,
    /// Accounts, in the order the program expects them
    pub accounts: Vec<AccountMeta>,
    /// Opaque instruction data
    pub data: Vec<u8>,
}

/// Operations of the donation ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerInstruction {
    /// Create the bank controlled by `authority`
    ///
    /// Accounts: `[bank (w), payer (s,w), system_program]`
    Initialize {
        /// Identity to record as the bank's controller
        authority: Pubkey,
    },

    /// Contribute `amount` lamports to a bank
    ///
    /// Accounts: `[bank (w), registry (w), donor (s,w), system_program]`
    MakeDonation {
        /// Lamports to transfer
        amount: u64,
    },

    /// Move the bank's surplus above its floor to a destination
    ///
    /// Accounts: `[bank (w), authority (s), destination (w)]`
    Withdraw,
}

impl LedgerInstruction {
    /// Operation name as exposed to callers
    pub fn name(&self) -> &'static str {
        match self {
            LedgerInstruction::Initialize { .. } => "initialize",
            LedgerInstruction::MakeDonation { .. } => "make_donation",
            LedgerInstruction::Withdraw => "withdraw",
        }
    }

    /// Encode as instruction data
    pub fn pack(&self) -> Result<Vec<u8>> {
        let mut data = discriminator("global", self.name()).to_vec();
        match self {
            LedgerInstruction::Initialize { authority } => {
                data.extend_from_slice(&bincode::serialize(authority)?)
            }
            LedgerInstruction::MakeDonation { amount } => {
                data.extend_from_slice(&bincode::serialize(amount)?)
            }
            LedgerInstruction::Withdraw => {}
        }
        Ok(data)
    }

    /// Decode instruction data
    pub fn unpack(data: &[u8]) -> Result<Self> {
        if data.len() < DISCRIMINATOR_LEN {
            return Err(Error::InvalidInstructionData(format!(
                "expected at least {} bytes, got {}",
                DISCRIMINATOR_LEN,
                data.len()
            )));
        }
        let (tag, args) = data.split_at(DISCRIMINATOR_LEN);

        if tag == discriminator("global", "initialize") {
            let authority: Pubkey = bincode::deserialize(args)
                .map_err(|e| Error::InvalidInstructionData(format!("initialize: {}", e)))?;
            Ok(LedgerInstruction::Initialize { authority })
        } else if tag == discriminator("global", "make_donation") {
            let amount: u64 = bincode::deserialize(args)
                .map_err(|e| Error::InvalidInstructionData(format!("make_donation: {}", e)))?;
            Ok(LedgerInstruction::MakeDonation { amount })
        } else if tag == discriminator("global", "withdraw") {
            Ok(LedgerInstruction::Withdraw)
        } else {
            Err(Error::InvalidInstructionData(
                "unknown instruction discriminator".to_string(),
            ))
        }
    }
}

/// Operations of the system program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SystemInstruction {
    /// Move lamports between two system-owned accounts
    ///
    /// Accounts: `[from (s,w), to (w)]`
    Transfer {
        /// Lamports to move
        lamports: u64,
    },
}

/// Build an `initialize` instruction
pub fn initialize(program_id: &Pubkey, payer: &Pubkey, authority: &Pubkey) -> Result<Instruction> {
    let (bank, _) = pda::bank_address(authority, program_id);
    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(bank, false),
            AccountMeta::new(*payer, true),
            AccountMeta::new_readonly(SYSTEM_PROGRAM_ID, false),
        ],
        data: LedgerInstruction::Initialize {
            authority: *authority,
        }
        .pack()?,
    })
}

/// Build a `make_donation` instruction
pub fn make_donation(
    program_id: &Pubkey,
    bank: &Pubkey,
    donor: &Pubkey,
    amount: u64,
) -> Result<Instruction> {
    let (registry, _) = pda::registry_address(bank, donor, program_id);
    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*bank, false),
            AccountMeta::new(registry, false),
            AccountMeta::new(*donor, true),
            AccountMeta::new_readonly(SYSTEM_PROGRAM_ID, false),
        ],
        data: LedgerInstruction::MakeDonation { amount }.pack()?,
    })
}

/// Build a `withdraw` instruction
pub fn withdraw(
    program_id: &Pubkey,
    bank: &Pubkey,
    authority: &Pubkey,
    destination: &Pubkey,
) -> Result<Instruction> {
    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*bank, false),
            AccountMeta::new_readonly(*authority, true),
            AccountMeta::new(*destination, false),
        ],
        data: LedgerInstruction::Withdraw.pack()?,
    })
}

/// Build a system transfer
pub fn system_transfer(from: &Pubkey, to: &Pubkey, lamports: u64) -> Result<Instruction> {
    Ok(Instruction {
        program_id: SYSTEM_PROGRAM_ID,
        accounts: vec![AccountMeta::new(*from, true), AccountMeta::new(*to, false)],
        data: bincode::serialize(&SystemInstruction::Transfer { lamports })?,
    })
}
