//! Signed transactions

use crate::crypto::KeyPair;
use crate::instruction::Instruction;
use crate::types::{Pubkey, Signature};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// The signed part of a transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Random value making otherwise identical messages distinct
    pub nonce: u64,

    /// Instructions, executed in order as one atomic unit
    pub instructions: Vec<Instruction>,
}

/// A message plus the signatures authorizing it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    /// Signed content
    pub message: Message,

    /// One signature per signer, first is the transaction id
    pub signatures: Vec<(Pubkey, Signature)>,
}

impl Transaction {
    /// Build and sign a transaction
    pub fn new_signed(instructions: Vec<Instruction>, signers: &[&KeyPair]) -> Result<Self> {
        let message = Message {
            nonce: rand::random(),
            instructions,
        };
        let bytes = bincode::serialize(&message)?;
        let signatures = signers
            .iter()
            .map(|keypair| (keypair.pubkey(), keypair.sign(&bytes)))
            .collect();

        Ok(Self {
            message,
            signatures,
        })
    }

    /// Instructions in execution order
    pub fn instructions(&self) -> &[Instruction] {
        &self.message.instructions
    }

    /// Transaction id (first signature)
    pub fn signature(&self) -> Signature {
        self.signatures
            .first()
            .map(|(_, signature)| *signature)
            .unwrap_or_default()
    }

    /// Verify every signature and return the set of signers
    pub fn verify(&self) -> Result<HashSet<Pubkey>> {
        if self.signatures.is_empty() {
            return Err(Error::SignatureError(
                "transaction carries no signatures".to_string(),
            ));
        }

        let bytes = bincode::serialize(&self.message)?;
        let mut signers = HashSet::with_capacity(self.signatures.len());
        for (pubkey, signature) in &self.signatures {
            if !signature.verify(&bytes, pubkey) {
                return Err(Error::SignatureError(format!("invalid signature for {}", pubkey)));
            }
            signers.insert(*pubkey);
        }
        Ok(signers)
    }
}
