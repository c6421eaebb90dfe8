use crate::{
    constants::GENESIS_PREVIOUS_HASH,
    error::{IntegrityReason, IntegrityViolation, LedgerError, Result},
    mine::MineLimits,
    pow::Difficulty,
    Block, Record,
};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Append-only sequence of mined blocks. Index 0 is always the genesis block.
#[derive(Clone, Debug)]
pub struct Chain {
    blocks: Vec<Block>,
    difficulty: Difficulty,
}

/// Read-only projection of one block, for display and logging.
#[derive(Clone, Debug, Serialize)]
pub struct BlockView<'a> {
    pub index: usize,
    pub timestamp: u64,
    pub payload: &'a Record,
    pub previous_hash: &'a str,
    pub hash: &'a str,
    pub nonce: u64,
}

impl Chain {
    /// Mines a genesis block at `difficulty` and starts the chain with it.
    pub fn new(difficulty: Difficulty) -> Result<Self> {
        let mut genesis = genesis_block()?;
        genesis.mine(difficulty);
        debug!(
            "Genesis block sealed with hash {} at difficulty {}",
            genesis.hash(),
            difficulty
        );
        Ok(Self {
            blocks: vec![genesis],
            difficulty,
        })
    }

    pub fn with_difficulty(zeros: u32) -> Result<Self> {
        Self::new(Difficulty::new(zeros)?)
    }

    /// Builds a block on top of the current tail, mines it and appends it.
    pub fn append(&mut self, payload: Record) -> Result<&Block> {
        let mut block = Block::create(payload, self.latest().hash())?;
        block.mine(self.difficulty);
        Ok(self.push(block))
    }

    /// Like [`Chain::append`], but mining honours `limits`. An aborted search
    /// leaves the chain untouched.
    pub fn append_within(&mut self, payload: Record, limits: &MineLimits) -> Result<&Block> {
        let mut block = Block::create(payload, self.latest().hash())?;
        block.mine_within(self.difficulty, limits)?;
        Ok(self.push(block))
    }

    fn push(&mut self, block: Block) -> &Block {
        info!(
            "Appended block {} with hash {}",
            self.blocks.len(),
            block.hash()
        );
        self.blocks.push(block);
        self.latest()
    }

    pub fn latest(&self) -> &Block {
        self.blocks
            .last()
            .expect("chain is created with a genesis block and never shrinks")
    }

    pub fn get(&self, index: usize) -> Option<&Block> {
        self.blocks.get(index)
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Always false; kept alongside `len`.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn views(&self) -> impl Iterator<Item = BlockView<'_>> {
        self.blocks.iter().enumerate().map(|(index, block)| BlockView {
            index,
            timestamp: block.timestamp(),
            payload: block.payload(),
            previous_hash: block.previous_hash(),
            hash: block.hash(),
            nonce: block.nonce(),
        })
    }

    /// Tamper-test entry point: swaps the payload of the block at `index`
    /// without resealing it.
    pub fn mutate_payload(&mut self, index: usize, payload: Record) -> Result<()> {
        let block = self
            .blocks
            .get_mut(index)
            .ok_or(LedgerError::BlockNotFound(index))?;
        block.mutate_payload(payload);
        Ok(())
    }

    /// Walks the chain and reports the first block whose stored hash is stale
    /// or whose link to its predecessor is broken. Genesis only gets the
    /// self-hash check.
    pub fn validate(&self) -> std::result::Result<(), IntegrityViolation> {
        let result = self.walk();
        if let Err(violation) = &result {
            warn!("{}", violation);
        }
        result
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    fn walk(&self) -> std::result::Result<(), IntegrityViolation> {
        for (index, block) in self.blocks.iter().enumerate() {
            let computed = block.compute_hash();
            if block.hash() != computed {
                return Err(IntegrityViolation {
                    index,
                    reason: IntegrityReason::HashMismatch {
                        stored: block.hash().to_string(),
                        computed,
                    },
                });
            }

            if index == 0 {
                continue;
            }
            let previous = &self.blocks[index - 1];
            if block.previous_hash() != previous.hash() {
                return Err(IntegrityViolation {
                    index,
                    reason: IntegrityReason::BrokenLink {
                        expected: previous.hash().to_string(),
                        found: block.previous_hash().to_string(),
                    },
                });
            }
        }
        Ok(())
    }
}

/// An unmined genesis block: sentinel previous hash and zero-amount payload.
pub fn genesis_block() -> Result<Block> {
    Block::create(Record::genesis(), GENESIS_PREVIOUS_HASH)
}
