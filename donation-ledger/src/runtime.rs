//! In-process host runtime
//!
//! Stands in for the chain the ledger program is deployed on. It supplies
//! the guarantees the program relies on but does not implement itself:
//!
//! - **Atomicity**: each transaction runs against a copy-on-write overlay
//!   that is committed in one step or dropped entirely
//! - **Serialization**: one mutex around the store, so concurrent callers
//!   are applied in some total order
//! - **Signatures**: every `is_signer` account meta must be backed by a
//!   verified ed25519 signature
//! - **Replay**: a committed signature is rejected again while it is within
//!   the last `signature_history_limit` transactions. Older replays are not
//!   detected.
//! - **Rent**: accounts holding data never drop below their floor
//!
//! # Example
//!
//! ```no_run
//! use donation_ledger::{Config, Runtime};
//!
//! fn main() -> donation_ledger::Result<()> {
//!     let runtime = Runtime::new(&Config::default())?;
//!     let events = runtime.subscribe();
//!     // runtime.process_transaction(&tx)?;
//!     Ok(())
//! }
//! ```

use crate::context::{AccountsOverlay, InvokeContext};
use crate::event::{EventRecord, LedgerEvent};
use crate::instruction::{LedgerInstruction, SystemInstruction};
use crate::metrics::Metrics;
use crate::processor;
use crate::rent::Rent;
use crate::storage::Snapshot;
use crate::transaction::Transaction;
use crate::types::{Account, Pubkey, Signature, SYSTEM_PROGRAM_ID};
use crate::{Config, Error, Result};
use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::path::Path;
use tracing::{debug, info, warn};

/// Outcome of a committed transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionReceipt {
    /// Transaction id
    pub signature: Signature,

    /// Slot the transaction committed in
    pub slot: u64,

    /// Encoded events (discriminator plus fields), in emission order
    pub logs: Vec<Vec<u8>>,
}

impl TransactionReceipt {
    /// Decode the event logs, skipping entries that are not ledger events
    pub fn events(&self) -> Vec<LedgerEvent> {
        self.logs
            .iter()
            .filter_map(|data| LedgerEvent::decode(data))
            .collect()
    }
}

/// Server-side filter for [`Runtime::program_accounts`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountFilter {
    /// Account data is exactly this many bytes
    DataSize(usize),

    /// Account data contains `bytes` at `offset`
    Memcmp {
        /// Byte offset into the data
        offset: usize,
        /// Bytes to compare
        bytes: Vec<u8>,
    },
}

impl AccountFilter {
    /// Whether `account` passes this filter
    pub fn matches(&self, account: &Account) -> bool {
        match self {
            AccountFilter::DataSize(size) => account.data.len() == *size,
            AccountFilter::Memcmp { offset, bytes } => account
                .data
                .get(*offset..offset.saturating_add(bytes.len()))
                .map_or(false, |window| window == bytes.as_slice()),
        }
    }
}

#[derive(Default)]
struct RuntimeState {
    accounts: BTreeMap<Pubkey, Account>,
    slot: u64,
    processed: SignatureHistory,
    events: VecDeque<EventRecord>,
    subscribers: Vec<Sender<EventRecord>>,
}

/// Committed signatures, oldest first, with a set for lookups
#[derive(Default)]
struct SignatureHistory {
    order: VecDeque<(u64, Signature)>,
    seen: HashSet<Signature>,
}

impl SignatureHistory {
    fn from_entries(entries: Vec<(u64, Signature)>, limit: usize) -> Self {
        let mut history = Self::default();
        for (slot, signature) in entries {
            history.insert(slot, signature, limit);
        }
        history
    }

    fn contains(&self, signature: &Signature) -> bool {
        self.seen.contains(signature)
    }

    fn insert(&mut self, slot: u64, signature: Signature, limit: usize) {
        if self.seen.insert(signature) {
            self.order.push_back((slot, signature));
        }
        if limit > 0 {
            while self.order.len() > limit {
                if let Some((_, old)) = self.order.pop_front() {
                    self.seen.remove(&old);
                }
            }
        }
    }

    fn entries(&self) -> Vec<(u64, Signature)> {
        self.order.iter().copied().collect()
    }
}

/// Host runtime with the donation ledger deployed
pub struct Runtime {
    program_id: Pubkey,
    rent: Rent,
    event_history_limit: usize,
    signature_history_limit: usize,
    state: Mutex<RuntimeState>,
    metrics: Metrics,
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("program_id", &self.program_id)
            .field("rent", &self.rent)
            .field("slot", &self.slot())
            .finish()
    }
}

impl Runtime {
    /// Create an empty runtime
    pub fn new(config: &Config) -> Result<Self> {
        let runtime = Self {
            program_id: config.program_id,
            rent: Rent::from(&config.rent),
            event_history_limit: config.runtime.event_history_limit,
            signature_history_limit: config.runtime.signature_history_limit,
            state: Mutex::new(RuntimeState::default()),
            metrics: Metrics::new()?,
        };

        info!(
            service = %config.service_name,
            program_id = %runtime.program_id,
            "runtime started"
        );
        Ok(runtime)
    }

    /// Create a runtime whose accounts and replay history come from a snapshot file
    pub fn from_snapshot(config: &Config, path: impl AsRef<Path>) -> Result<Self> {
        let snapshot = Snapshot::load(path)?;
        let runtime = Self::new(config)?;
        {
            let mut state = runtime.state.lock();
            state.slot = snapshot.slot;
            state.accounts = snapshot.accounts;
            state.processed =
                SignatureHistory::from_entries(snapshot.processed, runtime.signature_history_limit);
            runtime.metrics.set_accounts(state.accounts.len());
        }
        Ok(runtime)
    }

    /// Write every account and the replay history to a snapshot file
    pub fn save_snapshot(&self, path: impl AsRef<Path>) -> Result<()> {
        let snapshot = {
            let state = self.state.lock();
            Snapshot::new(state.slot, state.accounts.clone(), state.processed.entries())
        };
        snapshot.save(path)
    }

    /// Address of the deployed donation program
    pub fn program_id(&self) -> Pubkey {
        self.program_id
    }

    /// Rent parameters
    pub fn rent(&self) -> Rent {
        self.rent
    }

    /// Persistence floor for `data_len` bytes
    pub fn minimum_balance(&self, data_len: usize) -> u64 {
        self.rent.minimum_balance(data_len)
    }

    /// Slot of the last committed transaction
    pub fn slot(&self) -> u64 {
        self.state.lock().slot
    }

    /// Runtime metrics
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Mint lamports into a system account (test faucet)
    pub fn airdrop(&self, to: &Pubkey, lamports: u64) -> Result<()> {
        let mut state = self.state.lock();
        let account = state.accounts.entry(*to).or_insert_with(|| Account::new(0));
        account.lamports = account
            .lamports
            .checked_add(lamports)
            .ok_or(Error::CalculationFailure)?;
        let count = state.accounts.len();
        drop(state);

        self.metrics.set_accounts(count);
        debug!(%to, lamports, "airdrop");
        Ok(())
    }

    /// Committed state of an account
    pub fn get_account(&self, key: &Pubkey) -> Option<Account> {
        self.state.lock().accounts.get(key).cloned()
    }

    /// Lamports held by `key` (0 if absent)
    pub fn get_balance(&self, key: &Pubkey) -> u64 {
        self.state
            .lock()
            .accounts
            .get(key)
            .map(|a| a.lamports)
            .unwrap_or(0)
    }

    /// Every account owned by `owner` passing all `filters`, in address order
    pub fn program_accounts(&self, owner: &Pubkey, filters: &[AccountFilter]) -> Vec<(Pubkey, Account)> {
        self.state
            .lock()
            .accounts
            .iter()
            .filter(|(_, account)| account.owner == *owner)
            .filter(|(_, account)| filters.iter().all(|f| f.matches(account)))
            .map(|(key, account)| (*key, account.clone()))
            .collect()
    }

    /// Committed events still held in history, oldest first
    pub fn events(&self) -> Vec<EventRecord> {
        self.state.lock().events.iter().copied().collect()
    }

    /// Receive every event committed from now on, in commit order
    pub fn subscribe(&self) -> Receiver<EventRecord> {
        let (sender, receiver) = channel::unbounded();
        self.state.lock().subscribers.push(sender);
        receiver
    }

    /// Verify, execute and commit a transaction
    pub fn process_transaction(&self, tx: &Transaction) -> Result<TransactionReceipt> {
        let label = self.label(tx);
        let result = self.execute(tx);
        self.metrics.record_transaction(label, result.is_ok());

        match &result {
            Ok(receipt) => {
                self.metrics.record_events(&receipt.events());
                debug!(
                    signature = %receipt.signature,
                    slot = receipt.slot,
                    instruction = label,
                    "transaction committed"
                );
            }
            Err(e) => warn!(instruction = label, error = %e, "transaction rejected"),
        }
        result
    }

    fn execute(&self, tx: &Transaction) -> Result<TransactionReceipt> {
        let signers = tx.verify()?;
        let signature = tx.signature();

        let mut state = self.state.lock();
        if state.processed.contains(&signature) {
            return Err(Error::AlreadyProcessed(signature));
        }

        let mut staged = Vec::new();
        let dirty = {
            let mut overlay = AccountsOverlay::new(&state.accounts);
            self.run_instructions(&mut overlay, tx, &signers, &mut staged)?;
            overlay.check_invariants(&self.rent)?;
            overlay.into_dirty()
        };
        let logs = staged
            .iter()
            .map(LedgerEvent::encode)
            .collect::<Result<Vec<_>>>()?;

        // Commit
        for (key, account) in dirty {
            if account.is_empty() {
                state.accounts.remove(&key);
            } else {
                state.accounts.insert(key, account);
            }
        }
        state.slot += 1;
        let slot = state.slot;
        state
            .processed
            .insert(slot, signature, self.signature_history_limit);

        // Publish under the lock so subscribers observe commit order
        for event in &staged {
            let record = EventRecord {
                slot,
                signature,
                event: *event,
            };
            state.events.push_back(record);
            state.subscribers.retain(|s| s.send(record).is_ok());
        }
        if self.event_history_limit > 0 {
            while state.events.len() > self.event_history_limit {
                state.events.pop_front();
            }
        }
        self.metrics.set_accounts(state.accounts.len());

        Ok(TransactionReceipt {
            signature,
            slot,
            logs,
        })
    }

    fn run_instructions(
        &self,
        overlay: &mut AccountsOverlay<'_>,
        tx: &Transaction,
        signers: &HashSet<Pubkey>,
        staged: &mut Vec<LedgerEvent>,
    ) -> Result<()> {
        for ix in tx.instructions() {
            if let Some(meta) = ix
                .accounts
                .iter()
                .find(|m| m.is_signer && !signers.contains(&m.pubkey))
            {
                return Err(Error::MissingSignature(meta.pubkey));
            }

            if ix.program_id == self.program_id {
                let mut ctx =
                    InvokeContext::new(self.program_id, &self.rent, &ix.accounts, overlay, staged);
                processor::process_instruction(&mut ctx, &ix.data)?;
            } else if ix.program_id == SYSTEM_PROGRAM_ID {
                let mut ctx =
                    InvokeContext::new(SYSTEM_PROGRAM_ID, &self.rent, &ix.accounts, overlay, staged);
                process_system_instruction(&mut ctx, &ix.data)?;
            } else {
                return Err(Error::InvalidProgramId(ix.program_id));
            }
        }
        Ok(())
    }

    /// Metric label for a transaction: its first instruction's name
    fn label(&self, tx: &Transaction) -> &'static str {
        match tx.instructions().first() {
            Some(ix) if ix.program_id == self.program_id => LedgerInstruction::unpack(&ix.data)
                .map(|i| i.name())
                .unwrap_or("invalid"),
            Some(ix) if ix.program_id == SYSTEM_PROGRAM_ID => "system_transfer",
            Some(_) => "unknown_program",
            None => "empty",
        }
    }
}

fn process_system_instruction(ctx: &mut InvokeContext<'_, '_>, data: &[u8]) -> Result<()> {
    let instruction: SystemInstruction = bincode::deserialize(data)
        .map_err(|e| Error::InvalidInstructionData(format!("system: {}", e)))?;

    match instruction {
        SystemInstruction::Transfer { lamports } => {
            ctx.require_accounts(2)?;
            let from = ctx.key(0)?;
            let to = ctx.key(1)?;
            ctx.system_transfer(&from, &to, lamports)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;
    use crate::instruction::{self, system_transfer};
    use crate::pda;
    use crate::state::{Bank, LedgerAccount};

    fn runtime() -> Runtime {
        Runtime::new(&Config::default()).unwrap()
    }

    #[test]
    fn test_system_transfer_commits() {
        let rt = runtime();
        let payer = KeyPair::generate();
        let to = Pubkey::new_rand();
        rt.airdrop(&payer.pubkey(), 1_000).unwrap();

        let tx = Transaction::new_signed(
            vec![system_transfer(&payer.pubkey(), &to, 400).unwrap()],
            &[&payer],
        )
        .unwrap();
        let receipt = rt.process_transaction(&tx).unwrap();

        assert_eq!(receipt.slot, 1);
        assert_eq!(rt.get_balance(&payer.pubkey()), 600);
        assert_eq!(rt.get_balance(&to), 400);
    }

    #[test]
    fn test_replayed_transaction_rejected() {
        let rt = runtime();
        let payer = KeyPair::generate();
        rt.airdrop(&payer.pubkey(), 1_000).unwrap();

        let tx = Transaction::new_signed(
            vec![system_transfer(&payer.pubkey(), &Pubkey::new_rand(), 1).unwrap()],
            &[&payer],
        )
        .unwrap();
        rt.process_transaction(&tx).unwrap();
        assert_eq!(
            rt.process_transaction(&tx),
            Err(Error::AlreadyProcessed(tx.signature()))
        );
    }

    #[test]
    fn test_signer_meta_without_signature() {
        let rt = runtime();
        let payer = KeyPair::generate();
        let victim = KeyPair::generate();
        rt.airdrop(&victim.pubkey(), 1_000).unwrap();

        // Signed by payer, but moves victim's funds
        let tx = Transaction::new_signed(
            vec![system_transfer(&victim.pubkey(), &payer.pubkey(), 500).unwrap()],
            &[&payer],
        )
        .unwrap();
        assert_eq!(
            rt.process_transaction(&tx),
            Err(Error::MissingSignature(victim.pubkey()))
        );
        assert_eq!(rt.get_balance(&victim.pubkey()), 1_000);
    }

    #[test]
    fn test_failed_instruction_discards_earlier_writes() {
        let rt = runtime();
        let payer = KeyPair::generate();
        let to = Pubkey::new_rand();
        rt.airdrop(&payer.pubkey(), 1_000).unwrap();

        let tx = Transaction::new_signed(
            vec![
                system_transfer(&payer.pubkey(), &to, 600).unwrap(),
                system_transfer(&payer.pubkey(), &to, 600).unwrap(),
            ],
            &[&payer],
        )
        .unwrap();
        assert!(matches!(
            rt.process_transaction(&tx),
            Err(Error::InsufficientFunds { .. })
        ));

        assert_eq!(rt.get_balance(&payer.pubkey()), 1_000);
        assert!(rt.get_account(&to).is_none());
        assert_eq!(rt.slot(), 0);
    }

    #[test]
    fn test_unknown_program_rejected() {
        let rt = runtime();
        let payer = KeyPair::generate();
        let mut ix = system_transfer(&payer.pubkey(), &Pubkey::new_rand(), 1).unwrap();
        let stray = Pubkey::new_rand();
        ix.program_id = stray;

        let tx = Transaction::new_signed(vec![ix], &[&payer]).unwrap();
        assert_eq!(
            rt.process_transaction(&tx),
            Err(Error::InvalidProgramId(stray))
        );
    }

    #[test]
    fn test_program_accounts_filters() {
        let rt = runtime();
        let payer = KeyPair::generate();
        rt.airdrop(&payer.pubkey(), 10_000_000).unwrap();

        let authority = Pubkey::new_rand();
        let tx = Transaction::new_signed(
            vec![instruction::initialize(&rt.program_id(), &payer.pubkey(), &authority).unwrap()],
            &[&payer],
        )
        .unwrap();
        rt.process_transaction(&tx).unwrap();
        let bank = pda::bank_address(&authority, &rt.program_id()).0;

        let all = rt.program_accounts(&rt.program_id(), &[]);
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].0, bank);

        let by_size = rt.program_accounts(&rt.program_id(), &[AccountFilter::DataSize(Bank::LEN)]);
        assert_eq!(by_size.len(), 1);

        let by_authority = rt.program_accounts(
            &rt.program_id(),
            &[AccountFilter::Memcmp {
                offset: 8,
                bytes: authority.as_ref().to_vec(),
            }],
        );
        assert_eq!(by_authority.len(), 1);

        let past_end = AccountFilter::Memcmp {
            offset: 39,
            bytes: vec![0, 0],
        };
        assert!(rt.program_accounts(&rt.program_id(), &[past_end]).is_empty());
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accounts.snapshot");

        let rt = runtime();
        let key = Pubkey::new_rand();
        rt.airdrop(&key, 77).unwrap();
        rt.save_snapshot(&path).unwrap();

        let restored = Runtime::from_snapshot(&Config::default(), &path).unwrap();
        assert_eq!(restored.get_balance(&key), 77);
        assert_eq!(restored.slot(), rt.slot());
    }

    #[test]
    fn test_event_history_limit() {
        let mut config = Config::default();
        config.runtime.event_history_limit = 1;
        let rt = Runtime::new(&config).unwrap();

        let payer = KeyPair::generate();
        rt.airdrop(&payer.pubkey(), 100_000_000).unwrap();
        let program_id = rt.program_id();
        let tx = Transaction::new_signed(
            vec![instruction::initialize(&program_id, &payer.pubkey(), &payer.pubkey()).unwrap()],
            &[&payer],
        )
        .unwrap();
        rt.process_transaction(&tx).unwrap();
        let bank = pda::bank_address(&payer.pubkey(), &program_id).0;

        for amount in [1_000, 2_000, 3_000] {
            let tx = Transaction::new_signed(
                vec![instruction::make_donation(&program_id, &bank, &payer.pubkey(), amount).unwrap()],
                &[&payer],
            )
            .unwrap();
            rt.process_transaction(&tx).unwrap();
        }

        let events = rt.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event.as_donation().map(|e| e.amount), Some(3_000));
        assert_eq!(rt.metrics().lamports_donated.get(), 6_000);
    }

    #[test]
    fn test_signature_history_limit() {
        let mut config = Config::default();
        config.runtime.signature_history_limit = 2;
        let rt = Runtime::new(&config).unwrap();
        let payer = KeyPair::generate();
        rt.airdrop(&payer.pubkey(), 1_000).unwrap();

        let txs: Vec<Transaction> = (0..3)
            .map(|_| {
                Transaction::new_signed(
                    vec![system_transfer(&payer.pubkey(), &Pubkey::new_rand(), 1).unwrap()],
                    &[&payer],
                )
                .unwrap()
            })
            .collect();
        for tx in &txs {
            rt.process_transaction(tx).unwrap();
        }

        assert_eq!(
            rt.process_transaction(&txs[2]),
            Err(Error::AlreadyProcessed(txs[2].signature()))
        );
        assert_eq!(
            rt.process_transaction(&txs[1]),
            Err(Error::AlreadyProcessed(txs[1].signature()))
        );
        // Fell out of the window
        assert!(rt.process_transaction(&txs[0]).is_ok());
    }

    #[test]
    fn test_signature_history_trims_restored_entries() {
        let entries: Vec<(u64, Signature)> = (1..=5u8)
            .map(|i| (u64::from(i), Signature::from_bytes([i; 64])))
            .collect();
        let history = SignatureHistory::from_entries(entries, 3);

        assert_eq!(history.entries().len(), 3);
        assert_eq!(history.entries()[0].0, 3);
        assert!(!history.contains(&Signature::from_bytes([2; 64])));
        assert!(history.contains(&Signature::from_bytes([5; 64])));
    }

    #[test]
    fn test_receipt_logs_carry_encoded_events() {
        let rt = runtime();
        let payer = KeyPair::generate();
        rt.airdrop(&payer.pubkey(), 100_000_000).unwrap();
        let program_id = rt.program_id();
        let bank = pda::bank_address(&payer.pubkey(), &program_id).0;
        let tx = Transaction::new_signed(
            vec![
                instruction::initialize(&program_id, &payer.pubkey(), &payer.pubkey()).unwrap(),
                instruction::make_donation(&program_id, &bank, &payer.pubkey(), 4_000).unwrap(),
            ],
            &[&payer],
        )
        .unwrap();

        let receipt = rt.process_transaction(&tx).unwrap();
        assert_eq!(receipt.logs.len(), 1);
        assert_eq!(
            &receipt.logs[0][..8],
            &crate::crypto::discriminator("event", "DonationEvent")
        );
        assert_eq!(receipt.events()[0].as_donation().map(|e| e.amount), Some(4_000));
    }
}
