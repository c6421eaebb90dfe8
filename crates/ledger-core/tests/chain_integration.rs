use ledger_core::{
    constants::GENESIS_PREVIOUS_HASH, Chain, Difficulty, IntegrityReason, LedgerError,
    MineLimits, Record,
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::sync::{atomic::AtomicBool, Arc};

fn record(sender: &str, receiver: &str, amount: u64) -> Record {
    Record::new(sender, receiver, amount).unwrap()
}

#[test]
fn tamper_and_restore_scenario() {
    let mut chain = Chain::new(Difficulty::new(2).unwrap()).unwrap();
    chain.append(record("Alice", "Bob", 50)).unwrap();
    chain.append(record("Bob", "Charlie", 30)).unwrap();
    chain.append(record("Charlie", "David", 10)).unwrap();
    assert_eq!(chain.len(), 4);
    assert!(chain.validate().is_ok());

    let original = chain.get(1).unwrap().payload().clone();
    let tampered = Record::new(original.sender(), original.receiver(), 1000).unwrap();
    chain.mutate_payload(1, tampered).unwrap();

    let violation = chain.validate().unwrap_err();
    assert_eq!(violation.index, 1);
    assert!(matches!(
        violation.reason,
        IntegrityReason::HashMismatch { .. }
    ));

    // The stored hash was never touched, so restoring the payload restores validity.
    chain.mutate_payload(1, original).unwrap();
    assert!(chain.validate().is_ok());
}

#[test]
fn every_sealed_hash_meets_difficulty() {
    for zeros in 0..=3 {
        let difficulty = Difficulty::new(zeros).unwrap();
        let mut chain = Chain::new(difficulty).unwrap();
        chain.append(record("Alice", "Bob", 1)).unwrap();
        chain.append(record("Bob", "Alice", 1)).unwrap();
        for block in chain.blocks() {
            assert!(
                block.hash().starts_with(&"0".repeat(zeros as usize)),
                "hash {} at difficulty {zeros}",
                block.hash()
            );
            assert!(difficulty.meets(block.hash()));
        }
    }
}

#[test]
fn random_appends_keep_chain_valid() {
    let mut rng = StdRng::seed_from_u64(42);
    let names = ["Alice", "Bob", "Charlie", "David", "Eve"];
    let mut chain = Chain::with_difficulty(1).unwrap();
    let n = 25;
    for _ in 0..n {
        let prior = chain.latest().hash().to_string();
        let from = names[rng.gen_range(0..names.len())];
        let to = names[rng.gen_range(0..names.len())];
        let block = chain.append(record(from, to, rng.gen_range(0..1_000))).unwrap();
        assert_eq!(block.previous_hash(), prior);
    }
    assert_eq!(chain.len(), n + 1);
    assert!(chain.is_valid());
    assert_eq!(chain.blocks()[0].previous_hash(), GENESIS_PREVIOUS_HASH);
}

#[test]
fn tampering_any_non_genesis_block_is_located() {
    let mut chain = Chain::with_difficulty(1).unwrap();
    for i in 0..6 {
        chain.append(record("Alice", "Bob", i)).unwrap();
    }
    for index in 1..chain.len() {
        let mut copy = chain.clone();
        copy.mutate_payload(index, record("Mallory", "Mallory", 999))
            .unwrap();
        assert_eq!(copy.validate().unwrap_err().index, index);
    }
    assert!(chain.is_valid());
}

#[test]
fn cancelled_append_is_reported() {
    let mut chain = Chain::with_difficulty(4).unwrap();
    let tail = chain.latest().hash().to_string();
    let cancel = Arc::new(AtomicBool::new(true));

    let err = chain
        .append_within(
            record("Alice", "Bob", 5),
            &MineLimits::default().cancel_on(cancel),
        )
        .unwrap_err();
    assert!(matches!(err, LedgerError::MiningAborted { attempts: 0 }));
    assert_eq!(chain.len(), 1);
    assert_eq!(chain.latest().hash(), tail);

    let block = chain
        .append_within(
            record("Alice", "Bob", 5),
            &MineLimits::default().max_attempts(u64::MAX),
        )
        .unwrap();
    assert!(block.hash().starts_with("0000"));
    assert!(chain.is_valid());
}

#[test]
fn invalid_difficulty_is_rejected_before_mining() {
    assert!(matches!(
        Chain::with_difficulty(65),
        Err(LedgerError::InvalidDifficulty {
            requested: 65,
            max: 64
        })
    ));
}

#[test]
fn records_from_boundary_text() {
    let parsed: Record = "Alice:Bob:50".parse().unwrap();
    let json = Record::from_json(r#"{"sender":"Alice","receiver":"Bob","amount":50}"#).unwrap();
    assert_eq!(parsed, json);

    let mut chain = Chain::with_difficulty(0).unwrap();
    chain.append(parsed).unwrap();
    assert_eq!(chain.latest().payload(), &json);

    assert!(matches!(
        "Transaction: Alice sends 50 coins to Bob".parse::<Record>(),
        Err(LedgerError::PayloadFormat(_))
    ));
}
