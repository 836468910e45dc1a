//! Error types for the donation ledger and its host runtime

use crate::types::{Pubkey, Signature};
use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger and runtime errors
///
/// Every error is terminal for the transaction that raised it: the runtime
/// discards all staged writes before returning it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Initialize called for an authority that already has a bank
    #[error("Account {0} already in use")]
    AlreadyExists(Pubkey),

    /// Contribution of zero lamports
    #[error("amount should be more than zero")]
    InvalidAmount,

    /// Payer cannot cover a transfer or an account's persistence floor
    #[error("Insufficient funds in {account}: need {needed}, have {available}")]
    InsufficientFunds {
        /// Account being debited
        account: Pubkey,
        /// Lamports required
        needed: u64,
        /// Lamports held
        available: u64,
    },

    /// Withdraw signer is not the bank's recorded authority
    #[error("Authority mismatch: bank is controlled by {expected}, got {actual}")]
    AuthorityMismatch {
        /// Authority stored in the bank
        expected: Pubkey,
        /// Authority supplied to the instruction
        actual: Pubkey,
    },

    /// Withdraw attempted with nothing above the persistence floor
    #[error("The donation bank is empty: {0}")]
    BankEmpty(Pubkey),

    /// Withdraw destination is missing, unfunded, or below its floor
    #[error("Invalid withdraw destination: {0}")]
    InvalidDestination(Pubkey),

    /// Checked arithmetic overflowed
    #[error("Calculation failed due to overflow error")]
    CalculationFailure,

    /// Account does not exist in the store
    #[error("Account not found: {0}")]
    AccountNotFound(Pubkey),

    /// Account exists but holds no ledger data
    #[error("Account not initialized: {0}")]
    AccountNotInitialized(Pubkey),

    /// Account data carries another type's discriminator
    #[error("Account discriminator mismatch for {0}")]
    AccountDiscriminatorMismatch(Pubkey),

    /// Supplied address does not match its seed derivation
    #[error("Seeds constraint violated: expected {expected}, got {actual}")]
    SeedsConstraint {
        /// Derived address
        expected: Pubkey,
        /// Address supplied by the caller
        actual: Pubkey,
    },

    /// Seeds hash onto the ed25519 curve
    #[error("Provided seeds do not result in a valid address")]
    InvalidSeeds,

    /// A seed is longer than 32 bytes or there are more than 16 seeds
    #[error("Length of the seed is too long for address generation")]
    MaxSeedLengthExceeded,

    /// Instruction requires a signature the transaction does not carry
    #[error("Missing required signature for {0}")]
    MissingSignature(Pubkey),

    /// Instruction mutated an account it did not mark writable
    #[error("Account {0} is not writable")]
    ReadonlyAccount(Pubkey),

    /// Program modified an account it does not own
    #[error("Illegal owner for account {0}")]
    IllegalOwner(Pubkey),

    /// Instruction references fewer accounts than it needs
    #[error("Not enough account keys: need {needed}, got {got}")]
    NotEnoughAccountKeys {
        /// Accounts required
        needed: usize,
        /// Accounts supplied
        got: usize,
    },

    /// Instruction data could not be decoded
    #[error("Invalid instruction data: {0}")]
    InvalidInstructionData(String),

    /// Instruction targets a program the runtime does not host
    #[error("Invalid program id: {0}")]
    InvalidProgramId(Pubkey),

    /// Lamports were created or destroyed by a transaction
    #[error("Unbalanced transaction: {before} lamports before, {after} after")]
    UnbalancedTransaction {
        /// Sum over touched accounts before execution
        before: u128,
        /// Sum over touched accounts after execution
        after: u128,
    },

    /// Account with data left below its persistence floor
    #[error("Account {0} is below the rent-exempt minimum")]
    InsufficientFundsForRent(Pubkey),

    /// Transaction with this signature was already committed
    #[error("Transaction already processed: {0}")]
    AlreadyProcessed(Signature),

    /// Transaction signature verification failed
    #[error("Signature verification failed: {0}")]
    SignatureError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(String),

    /// Metrics registry error
    #[error("Metrics error: {0}")]
    Metrics(String),
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl From<prometheus::Error> for Error {
    fn from(err: prometheus::Error) -> Self {
        Error::Metrics(err.to_string())
    }
}
