//! Account snapshots
//!
//! The runtime keeps its account store in memory. A snapshot is a single
//! bincode file holding the slot, every account and the recently committed
//! signatures, written atomically by renaming a temporary file over the
//! target.

use crate::types::{Account, Pubkey, Signature};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Snapshot format version
const SNAPSHOT_VERSION: u32 = 2;

/// Point-in-time copy of the account store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Format version
    pub version: u32,

    /// Slot of the last committed transaction
    pub slot: u64,

    /// Every account, keyed by address
    pub accounts: BTreeMap<Pubkey, Account>,

    /// Committed signatures with their slot, oldest first
    pub processed: Vec<(u64, Signature)>,
}

impl Snapshot {
    /// Capture the given state
    pub fn new(
        slot: u64,
        accounts: BTreeMap<Pubkey, Account>,
        processed: Vec<(u64, Signature)>,
    ) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            slot,
            accounts,
            processed,
        }
    }

    /// Write to `path`, replacing any previous snapshot
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }

        let encoded = bincode::serialize(self)?;
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, &encoded)?;
        std::fs::rename(&tmp, path)?;

        tracing::info!(
            path = %path.display(),
            slot = self.slot,
            accounts = self.accounts.len(),
            signatures = self.processed.len(),
            bytes = encoded.len(),
            "snapshot saved"
        );
        Ok(())
    }

    /// Read from `path`
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let snapshot: Snapshot = bincode::deserialize(&bytes)?;

        if snapshot.version != SNAPSHOT_VERSION {
            return Err(crate::Error::Serialization(format!(
                "unsupported snapshot version {} (expected {})",
                snapshot.version, SNAPSHOT_VERSION
            )));
        }

        tracing::info!(
            path = %path.display(),
            slot = snapshot.slot,
            accounts = snapshot.accounts.len(),
            "snapshot loaded"
        );
        Ok(snapshot)
    }
}
