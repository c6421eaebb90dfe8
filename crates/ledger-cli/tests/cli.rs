use assert_cmd::Command;
use predicates::prelude::*;

fn ledger_cli() -> Command {
    Command::cargo_bin("ledger-cli").unwrap()
}

#[test]
fn demo_detects_tampering() {
    ledger_cli()
        .args(["demo", "--difficulty", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Block #3"))
        .stdout(predicate::str::contains(
            "Data: Charlie sends 10 coins to David",
        ))
        .stdout(predicate::str::contains("Tampering detected"))
        .stdout(predicate::str::contains("chain valid: true"));
}

#[test]
fn demo_json_report() {
    let output = ledger_cli()
        .args(["demo", "--difficulty", "1", "--random", "2", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["difficulty"], 1);
    assert_eq!(report["blocks"].as_array().unwrap().len(), 6);
    assert_eq!(report["blocks"][0]["previous_hash"], "0");
    assert_eq!(report["tamper"]["detected_at"], 1);
    assert_eq!(report["tamper"]["forged"]["amount"], 1000);
    assert_eq!(report["tamper"]["restored_valid"], true);
}

#[test]
fn append_prints_each_record() {
    ledger_cli()
        .args([
            "append",
            "--difficulty",
            "1",
            "--record",
            "Alice:Bob:5",
            "--record",
            "Bob:Alice:2",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Data: Alice sends 5 coins to Bob"))
        .stdout(predicate::str::contains("Data: Bob sends 2 coins to Alice"));
}

#[test]
fn append_rejects_malformed_record() {
    ledger_cli()
        .args(["append", "--record", "Alice sends 5 coins to Bob"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("malformed payload"));
}

#[test]
fn append_rejects_impossible_difficulty() {
    ledger_cli()
        .args(["append", "--difficulty", "65", "--record", "Alice:Bob:5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("exceeds the maximum"));
}

#[test]
fn append_gives_up_after_attempt_cap() {
    ledger_cli()
        .args([
            "append",
            "--difficulty",
            "4",
            "--max-attempts",
            "0",
            "--record",
            "Alice:Bob:5",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("mining aborted after 0 attempts"));
}
