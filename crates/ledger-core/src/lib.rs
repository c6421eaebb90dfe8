use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::{
    fmt,
    str::FromStr,
    time::{SystemTime, UNIX_EPOCH},
};

pub mod chain;
pub mod constants;
pub mod error;
pub mod mine;

pub use chain::{BlockView, Chain};
pub use error::{IntegrityReason, IntegrityViolation, LedgerError, Result};
pub use mine::{MineLimits, Seal};
pub use pow::Difficulty;

use constants::GENESIS_ACCOUNT;

/// A transfer of `amount` coins from `sender` to `receiver`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RecordFields")]
pub struct Record {
    sender: String,
    receiver: String,
    amount: u64,
}

#[derive(Deserialize)]
struct RecordFields {
    sender: String,
    receiver: String,
    amount: u64,
}

impl TryFrom<RecordFields> for Record {
    type Error = LedgerError;

    fn try_from(fields: RecordFields) -> Result<Self> {
        Record::new(fields.sender, fields.receiver, fields.amount)
    }
}

impl Record {
    pub fn new(
        sender: impl Into<String>,
        receiver: impl Into<String>,
        amount: u64,
    ) -> Result<Self> {
        let sender = sender.into();
        let receiver = receiver.into();
        if sender.trim().is_empty() {
            return Err(LedgerError::payload("sender must not be empty"));
        }
        if receiver.trim().is_empty() {
            return Err(LedgerError::payload("receiver must not be empty"));
        }
        Ok(Self {
            sender,
            receiver,
            amount,
        })
    }

    /// Zero-amount sentinel carried by the genesis block.
    pub fn genesis() -> Self {
        Self {
            sender: GENESIS_ACCOUNT.to_string(),
            receiver: GENESIS_ACCOUNT.to_string(),
            amount: 0,
        }
    }

    /// Parses a JSON object with `sender`, `receiver` and `amount` keys.
    pub fn from_json(input: &str) -> Result<Self> {
        serde_json::from_str(input).map_err(|e| LedgerError::payload(e.to_string()))
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }

    pub fn receiver(&self) -> &str {
        &self.receiver
    }

    pub fn amount(&self) -> u64 {
        self.amount
    }

    /// Length-prefixed encoding used as hash input. Injective over
    /// `(sender, receiver, amount)`.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(8 + self.sender.len() + 8 + self.receiver.len() + 8);
        put_prefixed(&mut bytes, self.sender.as_bytes());
        put_prefixed(&mut bytes, self.receiver.as_bytes());
        bytes.extend_from_slice(&self.amount.to_le_bytes());
        bytes
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} sends {} coins to {}",
            self.sender, self.amount, self.receiver
        )
    }
}

/// Parses `sender:receiver:amount`.
impl FromStr for Record {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(':').collect();
        let [sender, receiver, amount] = parts.as_slice() else {
            return Err(LedgerError::payload(format!(
                "expected sender:receiver:amount, got {s:?}"
            )));
        };
        let amount = amount
            .parse::<u64>()
            .map_err(|e| LedgerError::payload(format!("invalid amount {amount:?}: {e}")))?;
        Record::new(*sender, *receiver, amount)
    }
}

fn put_prefixed(bytes: &mut Vec<u8>, field: &[u8]) {
    bytes.extend_from_slice(&(field.len() as u64).to_le_bytes());
    bytes.extend_from_slice(field);
}

/// Serializes the four hashed fields in a fixed order. Variable-length fields
/// are length-prefixed so no two distinct inputs share an encoding.
pub fn hash_bytes(
    previous_hash: &str,
    timestamp: u64,
    nonce: u64,
    canonical_payload: &[u8],
) -> Vec<u8> {
    let mut bytes =
        Vec::with_capacity(8 + previous_hash.len() + 8 + 8 + 8 + canonical_payload.len());
    put_prefixed(&mut bytes, previous_hash.as_bytes());
    bytes.extend_from_slice(&timestamp.to_le_bytes());
    bytes.extend_from_slice(&nonce.to_le_bytes());
    put_prefixed(&mut bytes, canonical_payload);
    bytes
}

/// SHA-256 over [`hash_bytes`], as 64 lowercase hex chars.
pub fn digest(
    previous_hash: &str,
    timestamp: u64,
    nonce: u64,
    canonical_payload: &[u8],
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(hash_bytes(previous_hash, timestamp, nonce, canonical_payload));
    hex::encode(hasher.finalize())
}

fn now_millis() -> Result<u64> {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| LedgerError::Clock(e.to_string()))?;
    u64::try_from(elapsed.as_millis())
        .map_err(|_| LedgerError::Clock("milliseconds since epoch overflow u64".into()))
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Block {
    timestamp: u64,
    payload: Record,
    previous_hash: String,
    nonce: u64,
    hash: String,
}

impl Block {
    /// Stamps the block with the current time and hashes it at nonce 0.
    pub fn create(payload: Record, previous_hash: impl Into<String>) -> Result<Self> {
        let timestamp = now_millis()?;
        Ok(Self::with_timestamp(payload, previous_hash, timestamp))
    }

    pub fn with_timestamp(
        payload: Record,
        previous_hash: impl Into<String>,
        timestamp: u64,
    ) -> Self {
        let mut block = Self {
            timestamp,
            payload,
            previous_hash: previous_hash.into(),
            nonce: 0,
            hash: String::new(),
        };
        block.hash = block.compute_hash();
        block
    }

    /// Recomputes the digest from the block's current fields.
    pub fn compute_hash(&self) -> String {
        digest(
            &self.previous_hash,
            self.timestamp,
            self.nonce,
            &self.payload.canonical_bytes(),
        )
    }

    /// True while the stored hash still matches the block's fields.
    pub fn is_consistent(&self) -> bool {
        self.hash == self.compute_hash()
    }

    /// Replaces the payload and leaves the stored hash stale. Only meant for
    /// exercising tamper detection.
    pub fn mutate_payload(&mut self, payload: Record) {
        self.payload = payload;
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn payload(&self) -> &Record {
        &self.payload
    }

    pub fn previous_hash(&self) -> &str {
        &self.previous_hash
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }
}

pub mod pow {
    use crate::{
        constants::MAX_DIFFICULTY,
        error::{LedgerError, Result},
    };
    use serde::Serialize;
    use std::fmt;

    /// Number of leading `'0'` hex characters a sealed hash must carry.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
    pub struct Difficulty(u32);

    impl Difficulty {
        pub const ZERO: Difficulty = Difficulty(0);

        pub fn new(zeros: u32) -> Result<Self> {
            if zeros > MAX_DIFFICULTY {
                return Err(LedgerError::difficulty(zeros));
            }
            Ok(Self(zeros))
        }

        pub fn get(self) -> u32 {
            self.0
        }

        /// The proof-of-work predicate.
        pub fn meets(self, hash: &str) -> bool {
            count_leading_zero_digits(hash) >= self.0 as usize
        }
    }

    impl TryFrom<u32> for Difficulty {
        type Error = LedgerError;

        fn try_from(zeros: u32) -> Result<Self> {
            Difficulty::new(zeros)
        }
    }

    impl fmt::Display for Difficulty {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.0)
        }
    }

    pub fn count_leading_zero_digits(hash: &str) -> usize {
        hash.bytes().take_while(|b| *b == b'0').count()
    }
}
