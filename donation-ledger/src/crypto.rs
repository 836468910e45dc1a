//! Cryptographic operations for the ledger
//!
//! This module provides:
//! - Ed25519 key pairs for transaction signers
//! - SHA-256 hashing
//! - Name-derived 8-byte discriminators for accounts, instructions and events

use crate::types::{Pubkey, Signature};
use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use sha2::{Digest, Sha256};

/// Length of every discriminator prefix
pub const DISCRIMINATOR_LEN: usize = 8;

/// Ed25519 key pair for signing
#[derive(Debug)]
pub struct KeyPair {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
}

impl KeyPair {
    /// Generate a new random key pair
    pub fn generate() -> Self {
        let signing_key = SigningKey::from_bytes(&rand::random::<[u8; 32]>());
        let verifying_key = signing_key.verifying_key();

        Self {
            signing_key,
            verifying_key,
        }
    }

    /// Address of this signer
    pub fn pubkey(&self) -> Pubkey {
        Pubkey::new_from_array(self.verifying_key.to_bytes())
    }

    /// Sign a message
    pub fn sign(&self, message: &[u8]) -> Signature {
        let signature = self.signing_key.sign(message);
        Signature::from_bytes(signature.to_bytes())
    }
}

/// Hash arbitrary bytes using SHA-256
pub fn hash_bytes(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// First 8 bytes of `SHA-256("<namespace>:<name>")`.
///
/// Namespaces in use: `account`, `global` (instructions), `event`.
pub fn discriminator(namespace: &str, name: &str) -> [u8; DISCRIMINATOR_LEN] {
    let hash = hash_bytes(format!("{}:{}", namespace, name).as_bytes());
    let mut out = [0u8; DISCRIMINATOR_LEN];
    out.copy_from_slice(&hash[..DISCRIMINATOR_LEN]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify() {
        let keypair = KeyPair::generate();
        let message = b"test message";

        let signature = keypair.sign(message);
        assert!(signature.verify(message, &keypair.pubkey()));

        // Wrong message should fail
        assert!(!signature.verify(b"wrong message", &keypair.pubkey()));

        // Wrong key should fail
        let other = KeyPair::generate();
        assert!(!signature.verify(message, &other.pubkey()));
    }

    #[test]
    fn test_signer_address_is_on_curve() {
        let keypair = KeyPair::generate();
        assert!(keypair.pubkey().is_on_curve());
    }

    #[test]
    fn test_hash_bytes() {
        let hash1 = hash_bytes(b"test data");
        let hash2 = hash_bytes(b"test data");
        assert_eq!(hash1, hash2);
        assert_ne!(hash1, hash_bytes(b"different data"));
    }

    #[test]
    fn test_discriminator_depends_on_namespace() {
        let account = discriminator("account", "Registry");
        let event = discriminator("event", "Registry");
        assert_ne!(account, event);
        assert_eq!(account, discriminator("account", "Registry"));
        assert_eq!(&account[..], &hash_bytes(b"account:Registry")[..8]);
    }
}
