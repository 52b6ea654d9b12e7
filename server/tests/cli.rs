use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

#[test]
fn missing_port_flag_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("mvkv-server")?;
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("-p").or(predicate::str::contains("--port")));
    Ok(())
}

#[test]
fn unknown_flag_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("mvkv-server")?;
    cmd.arg("-p").arg("0").arg("--not-a-real-flag");
    cmd.assert().failure();
    Ok(())
}
