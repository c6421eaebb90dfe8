use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use ledger_core::{constants::DEFAULT_DIFFICULTY, Chain, IntegrityViolation, MineLimits, Record};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde_json::json;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

const SAMPLE_TRANSFERS: [(&str, &str, u64); 3] = [
    ("Alice", "Bob", 50),
    ("Bob", "Charlie", 30),
    ("Charlie", "David", 10),
];
const RANDOM_NAMES: [&str; 6] = ["Alice", "Bob", "Charlie", "David", "Eve", "Frank"];
const TAMPER_INDEX: usize = 1;
const TAMPERED_AMOUNT: u64 = 1000;

#[derive(Parser, Debug)]
#[command(name = "ledger-cli")]
#[command(about = "Mine and inspect a minimal proof-of-work ledger")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Mine the sample transfers, print the chain and show tamper detection
    Demo {
        /// Leading zero hex digits required in every block hash
        #[arg(long, default_value_t = DEFAULT_DIFFICULTY)]
        difficulty: u32,
        /// Extra randomly generated transfers to mine after the samples
        #[arg(long, default_value_t = 0)]
        random: usize,
        /// Seed for the random transfers
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Print a JSON report instead of text
        #[arg(long)]
        json: bool,
    },
    /// Mine the given transfers onto a fresh chain and print it
    Append {
        /// Leading zero hex digits required in every block hash
        #[arg(long, default_value_t = DEFAULT_DIFFICULTY)]
        difficulty: u32,
        /// Transfer as sender:receiver:amount (repeatable)
        #[arg(long = "record", required = true)]
        records: Vec<Record>,
        /// Give up on a block after this many nonces
        #[arg(long)]
        max_attempts: Option<u64>,
        /// Print the chain as JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

struct TamperOutcome {
    index: usize,
    original: Record,
    forged: Record,
    detected: Option<IntegrityViolation>,
    restored_valid: bool,
}

fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .pretty()
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Demo {
            difficulty,
            random,
            seed,
            json,
        } => demo(difficulty, random, seed, json),
        Command::Append {
            difficulty,
            records,
            max_attempts,
            json,
        } => append(difficulty, records, max_attempts, json),
    }
}

fn demo(difficulty: u32, random: usize, seed: u64, json: bool) -> Result<()> {
    let mut chain = Chain::with_difficulty(difficulty)?;
    let mut records = SAMPLE_TRANSFERS
        .iter()
        .map(|(from, to, amount)| Record::new(*from, *to, *amount))
        .collect::<ledger_core::Result<Vec<_>>>()?;
    records.extend(random_records(random, seed)?);

    for record in records {
        if !json {
            println!("Mining block {}: {}", chain.len(), record);
        }
        chain.append(record)?;
    }
    if let Err(violation) = chain.validate() {
        bail!("freshly mined chain failed validation: {violation}");
    }
    let blocks = serde_json::to_value(chain.views().collect::<Vec<_>>())?;

    let outcome = tamper_check(&mut chain, TAMPER_INDEX)?;
    info!(
        "Tamper check at block {}: detected={}",
        outcome.index,
        outcome.detected.is_some()
    );

    if json {
        let report = json!({
            "difficulty": chain.difficulty(),
            "blocks": blocks,
            "valid": true,
            "tamper": {
                "index": outcome.index,
                "original": outcome.original,
                "forged": outcome.forged,
                "detected_at": outcome.detected.as_ref().map(|v| v.index),
                "restored_valid": outcome.restored_valid,
            },
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("\n=== Chain Contents ===");
        print_chain(&chain);
        println!("\n=== Chain Verification ===");
        println!("Chain is valid: all {} blocks are properly linked.", chain.len());
        println!("\n=== Tamper Detection ===");
        println!("Original data: {}", outcome.original);
        println!("Tampered data: {}", outcome.forged);
        match &outcome.detected {
            Some(violation) => println!("Tampering detected: {violation}"),
            None => println!("Tampering went undetected"),
        }
        println!(
            "Original data restored, chain valid: {}",
            outcome.restored_valid
        );
    }

    if outcome.detected.is_none() || !outcome.restored_valid {
        bail!("tamper check did not behave as expected");
    }
    Ok(())
}

fn append(
    difficulty: u32,
    records: Vec<Record>,
    max_attempts: Option<u64>,
    json: bool,
) -> Result<()> {
    let mut chain = Chain::with_difficulty(difficulty)?;
    let limits = max_attempts
        .map(|attempts| MineLimits::default().max_attempts(attempts))
        .unwrap_or_default();

    for record in records {
        let label = record.to_string();
        chain
            .append_within(record, &limits)
            .with_context(|| format!("mining block for {label}"))?;
    }

    let validation = chain.validate();
    if json {
        let report = json!({
            "difficulty": chain.difficulty(),
            "blocks": chain.views().collect::<Vec<_>>(),
            "valid": validation.is_ok(),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_chain(&chain);
    }
    validation?;
    Ok(())
}

/// Forges the amount of the block at `index`, validates, then puts the
/// original payload back and validates again.
fn tamper_check(chain: &mut Chain, index: usize) -> Result<TamperOutcome> {
    let original = chain
        .get(index)
        .with_context(|| format!("chain has no block {index} to tamper with"))?
        .payload()
        .clone();
    let forged = Record::new(original.sender(), original.receiver(), TAMPERED_AMOUNT)?;

    chain.mutate_payload(index, forged.clone())?;
    let detected = chain.validate().err();
    chain.mutate_payload(index, original.clone())?;
    let restored_valid = chain.is_valid();

    Ok(TamperOutcome {
        index,
        original,
        forged,
        detected,
        restored_valid,
    })
}

fn random_records(count: usize, seed: u64) -> ledger_core::Result<Vec<Record>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let from = RANDOM_NAMES[rng.gen_range(0..RANDOM_NAMES.len())];
            let to = RANDOM_NAMES[rng.gen_range(0..RANDOM_NAMES.len())];
            Record::new(from, to, rng.gen_range(1..=100))
        })
        .collect()
}

fn print_chain(chain: &Chain) {
    for view in chain.views() {
        println!("\nBlock #{}", view.index);
        println!("Timestamp: {}", view.timestamp);
        println!("Data: {}", view.payload);
        println!("Previous Hash: {}", view.previous_hash);
        println!("Hash: {}", view.hash);
        println!("Nonce: {}", view.nonce);
    }
}
