pub const HASH_SIZE: usize = 32;
pub const HASH_HEX_SIZE: usize = HASH_SIZE * 2;

/// Upper bound for [`crate::Difficulty`]; a hex digest has no more leading chars than this.
pub const MAX_DIFFICULTY: u32 = HASH_HEX_SIZE as u32;
pub const DEFAULT_DIFFICULTY: u32 = 4;

/// Previous-hash sentinel for the genesis block. Shorter than any digest, so
/// `digest` can never produce it.
pub const GENESIS_PREVIOUS_HASH: &str = "0";
pub const GENESIS_ACCOUNT: &str = "genesis";
