//! Core types shared by the ledger program and the host runtime
//!
//! All types are designed for:
//! - Deterministic serialization (bincode, fixed-width little endian)
//! - Base58 text form for addresses, matching how callers exchange them
//! - Memory safety (no unsafe code)

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Number of bytes in an address
pub const PUBKEY_BYTES: usize = 32;

/// Owner of every account not claimed by a program
pub const SYSTEM_PROGRAM_ID: Pubkey = Pubkey([0u8; PUBKEY_BYTES]);

/// 32-byte account address or ed25519 public key
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pubkey([u8; PUBKEY_BYTES]);

impl Pubkey {
    /// Create from raw bytes
    pub const fn new_from_array(bytes: [u8; PUBKEY_BYTES]) -> Self {
        Self(bytes)
    }

    /// Random address, for tests and throwaway destinations
    pub fn new_rand() -> Self {
        Self(rand::random::<[u8; PUBKEY_BYTES]>())
    }

    /// Get bytes
    pub fn to_bytes(self) -> [u8; PUBKEY_BYTES] {
        self.0
    }

    /// Whether these bytes decode to a point on the ed25519 curve.
    ///
    /// Only on-curve addresses can have a private key.
    pub fn is_on_curve(&self) -> bool {
        ed25519_dalek::VerifyingKey::from_bytes(&self.0).is_ok()
    }
}

impl AsRef<[u8]> for Pubkey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; PUBKEY_BYTES]> for Pubkey {
    fn from(bytes: [u8; PUBKEY_BYTES]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

/// Error parsing a base58 address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsePubkeyError(String);

impl fmt::Display for ParsePubkeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid pubkey: {}", self.0)
    }
}

impl std::error::Error for ParsePubkeyError {}

impl FromStr for Pubkey {
    type Err = ParsePubkeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| ParsePubkeyError(e.to_string()))?;
        let bytes: [u8; PUBKEY_BYTES] = bytes
            .try_into()
            .map_err(|v: Vec<u8>| ParsePubkeyError(format!("expected 32 bytes, got {}", v.len())))?;
        Ok(Self(bytes))
    }
}

// Text formats (TOML, JSON) carry base58; binary formats carry the raw 32
// bytes so account layouts stay fixed-width.
impl Serialize for Pubkey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_string())
        } else {
            self.0.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for Pubkey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            Pubkey::from_str(&s).map_err(de::Error::custom)
        } else {
            <[u8; PUBKEY_BYTES]>::deserialize(deserializer).map(Pubkey)
        }
    }
}

/// Digital signature (Ed25519)
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Signature {
    /// Signature bytes (64 bytes)
    #[serde(with = "serde_bytes")]
    bytes: [u8; 64],
}

impl Signature {
    /// Create from bytes
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self { bytes }
    }

    /// Get bytes
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.bytes
    }

    /// Verify signature
    pub fn verify(&self, message: &[u8], public_key: &Pubkey) -> bool {
        use ed25519_dalek::{Signature as DalekSignature, Verifier, VerifyingKey};

        let signature = DalekSignature::from_bytes(&self.bytes);

        let verifying_key = match VerifyingKey::from_bytes(&public_key.to_bytes()) {
            Ok(key) => key,
            Err(_) => return false,
        };

        verifying_key.verify(message, &signature).is_ok()
    }
}

impl Default for Signature {
    fn default() -> Self {
        Self { bytes: [0u8; 64] }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", bs58::encode(self.bytes).into_string())
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", self)
    }
}

/// Account as stored by the host runtime
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Native currency holding
    pub lamports: u64,

    /// Program-defined payload
    pub data: Vec<u8>,

    /// Program allowed to debit lamports and write data
    pub owner: Pubkey,
}

impl Account {
    /// Create a system-owned account with no data
    pub fn new(lamports: u64) -> Self {
        Self {
            lamports,
            data: Vec::new(),
            owner: SYSTEM_PROGRAM_ID,
        }
    }

    /// An account the runtime treats as absent: no lamports, no data
    pub fn is_empty(&self) -> bool {
        self.lamports == 0 && self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pubkey_base58_roundtrip() {
        let key = Pubkey::new_rand();
        let parsed: Pubkey = key.to_string().parse().unwrap();
        assert_eq!(parsed, key);
    }

    #[test]
    fn test_pubkey_rejects_wrong_length() {
        let short = bs58::encode([1u8; 31]).into_string();
        assert!(short.parse::<Pubkey>().is_err());
        assert!("not-base58-0OIl".parse::<Pubkey>().is_err());
    }

    #[test]
    fn test_system_program_id_text_form() {
        assert_eq!(
            SYSTEM_PROGRAM_ID.to_string(),
            "11111111111111111111111111111111"
        );
    }

    #[test]
    fn test_pubkey_binary_layout_is_raw_bytes() {
        let key = Pubkey::new_from_array([7u8; 32]);
        let encoded = bincode::serialize(&key).unwrap();
        assert_eq!(encoded, vec![7u8; 32]);
    }

    #[test]
    fn test_pubkey_text_layout_is_base58() {
        let key = Pubkey::new_from_array([7u8; 32]);
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, format!("\"{}\"", key));
        let back: Pubkey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
    }

    #[test]
    fn test_empty_account() {
        assert!(Account::default().is_empty());
        assert!(!Account::new(1).is_empty());
        assert_eq!(Account::new(1).owner, SYSTEM_PROGRAM_ID);
    }
}
