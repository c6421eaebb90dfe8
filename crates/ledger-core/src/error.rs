use crate::constants::MAX_DIFFICULTY;

/// Errors surfaced by block construction, mining and record parsing.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("system clock unusable: {0}")]
    Clock(String),

    #[error("malformed payload: {0}")]
    PayloadFormat(String),

    #[error("difficulty {requested} exceeds the maximum of {max}")]
    InvalidDifficulty { requested: u32, max: u32 },

    #[error("mining aborted after {attempts} attempts")]
    MiningAborted { attempts: u64 },

    #[error("no block at index {0}")]
    BlockNotFound(usize),
}

impl LedgerError {
    pub fn payload(msg: impl Into<String>) -> Self {
        Self::PayloadFormat(msg.into())
    }

    pub(crate) fn difficulty(requested: u32) -> Self {
        Self::InvalidDifficulty {
            requested,
            max: MAX_DIFFICULTY,
        }
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;

/// Why a block failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityReason {
    /// Stored hash no longer matches the block's own fields.
    HashMismatch { stored: String, computed: String },
    /// `previous_hash` does not point at the preceding block.
    BrokenLink { expected: String, found: String },
}

impl std::fmt::Display for IntegrityReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IntegrityReason::HashMismatch { stored, computed } => {
                write!(f, "stored hash {stored} != recomputed {computed}")
            }
            IntegrityReason::BrokenLink { expected, found } => {
                write!(f, "previous hash {found} != predecessor hash {expected}")
            }
        }
    }
}

/// Result of a failed [`crate::chain::Chain::validate`] walk. Tampering is an
/// expected condition, so this is returned as a value rather than raised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("chain integrity violated at block {index}: {reason}")]
pub struct IntegrityViolation {
    pub index: usize,
    pub reason: IntegrityReason,
}

impl IntegrityViolation {
    pub fn is_hash_mismatch(&self) -> bool {
        matches!(self.reason, IntegrityReason::HashMismatch { .. })
    }

    pub fn is_broken_link(&self) -> bool {
        matches!(self.reason, IntegrityReason::BrokenLink { .. })
    }
}
