use assert_cmd::Command;
use predicates::prelude::*;

fn drivepush_cmd() -> Command {
    let mut cmd = Command::cargo_bin("drivepush").unwrap();
    for var in [
        "DRIVEPUSH_CREDENTIALS_TEXT",
        "DRIVEPUSH_CREDENTIALS_PATH",
        "DRIVEPUSH_TOKEN_TEXT",
        "DRIVEPUSH_TOKEN_PATH",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn help_describes_the_tool() {
    drivepush_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Upload a file to Google Drive"))
        .stdout(predicate::str::contains("--remote-auth"));
}

#[test]
fn missing_file_argument_fails() {
    drivepush_cmd().assert().failure();
}

#[test]
fn nonexistent_source_file_fails_before_auth() {
    drivepush_cmd()
        .arg("/definitely/not/a/real/file.txt")
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn directory_argument_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    drivepush_cmd()
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("directory"));
}

#[test]
fn bad_credentials_path_names_the_tier() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("payload.txt");
    std::fs::write(&file, "data").unwrap();

    drivepush_cmd()
        .arg(&file)
        .args(["--credentials", "/nonexistent/credentials.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--credentials"));
}

#[test]
fn malformed_env_text_credentials_name_the_tier() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("payload.txt");
    std::fs::write(&file, "data").unwrap();

    drivepush_cmd()
        .arg(&file)
        .env("DRIVEPUSH_CREDENTIALS_TEXT", "{\"not\": \"a client\"}")
        .assert()
        .failure()
        .stderr(predicate::str::contains("DRIVEPUSH_CREDENTIALS_TEXT"));
}
