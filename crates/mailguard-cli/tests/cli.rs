//! Binary-level smoke tests.

use assert_cmd::Command;
use predicates::prelude::*;

fn mailguard() -> Command {
    let mut cmd = Command::cargo_bin("mailguard").unwrap();
    cmd.env_remove("MAILGUARD_API_PASSWORD").env_remove("RUST_LOG");
    cmd
}

#[test]
fn help_lists_subcommands() {
    mailguard()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("flatten"))
        .stdout(predicate::str::contains("check"));
}

#[test]
fn missing_config_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    mailguard()
        .args(["--config"])
        .arg(dir.path().join("absent.toml"))
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("configuration error"))
        .stderr(predicate::str::contains("absent.toml"));
}

#[test]
fn run_without_password_fails_validation() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mailguard.toml");
    std::fs::write(
        &path,
        "[api]\nusername = \"robot\"\n\n[policy]\n\
         spf_record = \"v=spf1 -all\"\ndmarc_record = \"v=DMARC1; p=none\"\n",
    )
    .unwrap();

    mailguard()
        .arg("--config")
        .arg(&path)
        .args(["run", "--dry-run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("api.password missing"));
}

#[test]
fn unknown_output_format_is_rejected() {
    mailguard()
        .args(["--output", "yaml", "flatten"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("yaml"));
}
