//! Donation Ledger
//!
//! A fundraising program for a Solana-style account runtime, plus the
//! in-process runtime that hosts it.
//!
//! # Architecture
//!
//! - **Banks**: one program-derived account per authority, holding donated lamports
//! - **Registries**: one program-derived account per (bank, donor) pair, holding
//!   that donor's cumulative contribution
//! - **Runtime**: copy-on-write execution with atomic commit, signature checks
//!   and a rent floor on every data account
//!
//! # Invariants
//!
//! - Lamports are conserved by every committed transaction
//! - A bank's surplus above its floor is only ever moved by its authority
//! - The sum of a bank's registries equals the sum of its contributions
//! - Failed transactions leave no trace

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod client;
pub mod config;
pub mod context;
pub mod crypto;
pub mod error;
pub mod event;
pub mod instruction;
pub mod metrics;
pub mod pda;
pub mod processor;
pub mod query;
pub mod rent;
pub mod runtime;
pub mod state;
pub mod storage;
pub mod transaction;
pub mod types;

// Re-exports
pub use client::DonationClient;
pub use config::Config;
pub use crypto::KeyPair;
pub use error::{Error, Result};
pub use event::{DonationEvent, EventRecord, LedgerEvent, WithdrawEvent};
pub use runtime::{AccountFilter, Runtime, TransactionReceipt};
pub use state::{Bank, LedgerAccount, Registry};
pub use transaction::Transaction;
pub use types::{Account, Pubkey, Signature};
