use crate::{digest, pow::Difficulty, Block, LedgerError, Result};
use serde::Serialize;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tracing::{info, warn};

/// Nonce and hash found by a proof-of-work search.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Seal {
    pub nonce: u64,
    pub hash: String,
}

/// Bounds for [`Block::mine_within`]. The default is unbounded.
#[derive(Clone, Debug, Default)]
pub struct MineLimits {
    max_attempts: Option<u64>,
    cancel: Option<Arc<AtomicBool>>,
}

impl MineLimits {
    pub fn max_attempts(mut self, attempts: u64) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    /// Abort once `flag` is set. Checked before every nonce increment.
    pub fn cancel_on(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn should_stop(&self, attempts: u64) -> bool {
        self.max_attempts.is_some_and(|max| attempts >= max)
            || self
                .cancel
                .as_ref()
                .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

impl Block {
    /// Mine the block by incrementing the nonce until the hash has at least
    /// `difficulty` leading zero hex digits.
    ///
    /// The search starts by rehashing the current fields, so a block whose
    /// payload was mutated gets sealed against the new payload.
    pub fn mine(&mut self, difficulty: Difficulty) -> Seal {
        let payload = self.payload.canonical_bytes();
        self.hash = digest(&self.previous_hash, self.timestamp, self.nonce, &payload);
        while !difficulty.meets(&self.hash) {
            self.nonce = self.nonce.wrapping_add(1);
            self.hash = digest(&self.previous_hash, self.timestamp, self.nonce, &payload);
        }
        info!("Mined block with nonce {} and hash {}", self.nonce, self.hash);
        self.seal()
    }

    /// Same search and predicate as [`Block::mine`], but gives up with
    /// [`LedgerError::MiningAborted`] when `limits` say so. Nonce and hash stay
    /// consistent with each other on abort.
    pub fn mine_within(&mut self, difficulty: Difficulty, limits: &MineLimits) -> Result<Seal> {
        let payload = self.payload.canonical_bytes();
        self.hash = digest(&self.previous_hash, self.timestamp, self.nonce, &payload);
        let mut attempts = 0u64;
        while !difficulty.meets(&self.hash) {
            if limits.should_stop(attempts) {
                warn!(
                    "Mining aborted after {} attempts at difficulty {}",
                    attempts, difficulty
                );
                return Err(LedgerError::MiningAborted { attempts });
            }
            self.nonce = self.nonce.wrapping_add(1);
            self.hash = digest(&self.previous_hash, self.timestamp, self.nonce, &payload);
            attempts += 1;
        }
        info!(
            "Mined block with nonce {} and hash {} after {} attempts",
            self.nonce, self.hash, attempts
        );
        Ok(self.seal())
    }

    fn seal(&self) -> Seal {
        Seal {
            nonce: self.nonce,
            hash: self.hash.clone(),
        }
    }
}
