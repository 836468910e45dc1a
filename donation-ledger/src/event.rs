//! Events emitted by the ledger program
//!
//! Events are staged with the transaction that emits them and only become
//! visible to subscribers once that transaction commits.

use crate::crypto::{discriminator, DISCRIMINATOR_LEN};
use crate::types::{Pubkey, Signature};
use crate::Result;
use serde::{Deserialize, Serialize};

/// Funds left a bank
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawEvent {
    /// Bank that was drained
    pub bank: Pubkey,
    /// Account that received the surplus
    pub destination: Pubkey,
    /// Lamports moved
    pub amount: u64,
}

/// Funds entered a bank
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonationEvent {
    /// Bank that received the contribution
    pub bank: Pubkey,
    /// Contributing party
    pub donor: Pubkey,
    /// Lamports contributed by this call
    pub amount: u64,
}

/// Any event the ledger emits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    /// See [`DonationEvent`]
    Donation(DonationEvent),
    /// See [`WithdrawEvent`]
    Withdraw(WithdrawEvent),
}

impl LedgerEvent {
    /// Event type name
    pub fn name(&self) -> &'static str {
        match self {
            LedgerEvent::Donation(_) => "DonationEvent",
            LedgerEvent::Withdraw(_) => "WithdrawEvent",
        }
    }

    /// Wire form: discriminator followed by the event fields
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut data = discriminator("event", self.name()).to_vec();
        let body = match self {
            LedgerEvent::Donation(event) => bincode::serialize(event)?,
            LedgerEvent::Withdraw(event) => bincode::serialize(event)?,
        };
        data.extend_from_slice(&body);
        Ok(data)
    }

    /// Decode the wire form produced by [`LedgerEvent::encode`]
    pub fn decode(data: &[u8]) -> Option<Self> {
        if data.len() < DISCRIMINATOR_LEN {
            return None;
        }
        let (tag, body) = data.split_at(DISCRIMINATOR_LEN);
        if tag == discriminator("event", "DonationEvent") {
            bincode::deserialize(body).ok().map(LedgerEvent::Donation)
        } else if tag == discriminator("event", "WithdrawEvent") {
            bincode::deserialize(body).ok().map(LedgerEvent::Withdraw)
        } else {
            None
        }
    }

    /// The withdraw payload, if this is one
    pub fn as_withdraw(&self) -> Option<&WithdrawEvent> {
        match self {
            LedgerEvent::Withdraw(event) => Some(event),
            _ => None,
        }
    }

    /// The donation payload, if this is one
    pub fn as_donation(&self) -> Option<&DonationEvent> {
        match self {
            LedgerEvent::Donation(event) => Some(event),
            _ => None,
        }
    }
}

/// A committed event and where it came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Slot of the committing transaction
    pub slot: u64,
    /// First signature of the committing transaction
    pub signature: Signature,
    /// The event
    pub event: LedgerEvent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_withdraw_event_wire_form() {
        let event = LedgerEvent::Withdraw(WithdrawEvent {
            bank: Pubkey::new_rand(),
            destination: Pubkey::new_rand(),
            amount: 40_000,
        });
        let data = event.encode().unwrap();

        assert_eq!(data.len(), 8 + 32 + 32 + 8);
        assert_eq!(&data[..8], &discriminator("event", "WithdrawEvent"));
        assert_eq!(LedgerEvent::decode(&data), Some(event));
    }

    #[test]
    fn test_decode_unknown() {
        assert_eq!(LedgerEvent::decode(&[0u8; 4]), None);
        assert_eq!(LedgerEvent::decode(&[0u8; 16]), None);
    }
}
