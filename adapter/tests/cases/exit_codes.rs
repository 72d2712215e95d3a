// SPDX-License-Identifier: GPL-3.0-or-later

use crate::fixtures::*;
use anyhow::Result;
use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn exit_code_for_empty_arguments() -> Result<()> {
    // Without the working directory it prints the usage, and fails.
    Command::cargo_bin(ADAPTER_BIN)?
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage: fsracer-adapter"));
    Ok(())
}

#[test]
fn exit_code_for_help() -> Result<()> {
    Command::cargo_bin(ADAPTER_BIN)?
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: fsracer-adapter").and(predicate::str::contains("--build-tool")));
    Ok(())
}

#[test]
fn exit_code_for_missing_input_file() -> Result<()> {
    let env = TestEnvironment::new()?;

    let result = env.run_adapter(&["--input", "missing.txt", BUILD_DIR])?;
    result.assert_failure()?;
    assert!(result.stderr().contains("Input file not found"));
    Ok(())
}

#[test]
fn exit_code_for_invalid_config() -> Result<()> {
    let env = TestEnvironment::new()?;
    let trace = env.create_trace(&["1 close(3) = 0"])?;
    let config = env.create_config("schema: 1.0\nmake:\n  include_extension: .d\n")?;

    let result = env.convert(&trace, &["--config", &config.to_string_lossy()])?;
    result.assert_failure()?;
    assert!(result.stdout().is_empty());
    Ok(())
}

#[test]
fn exit_code_for_orphan_resumed_call() -> Result<()> {
    let env = TestEnvironment::new()?;
    let trace = env.create_trace(&["1 close(3) = 0", "2 <... read resumed> \"abc\", 3) = 3"])?;

    let result = env.convert(&trace, &[])?;
    result.assert_failure()?;
    assert!(result.stderr().contains("read of process 2 resumed"));
    Ok(())
}

#[test]
fn exit_code_for_unknown_call() -> Result<()> {
    let env = TestEnvironment::new()?;
    let trace = env.create_trace(&["1 frobnicate(3) = 0"])?;

    let result = env.convert(&trace, &[])?;
    result.assert_failure()?;
    assert!(result.stderr().contains("unknown system call: frobnicate"));
    Ok(())
}

#[test]
fn exit_code_for_warnings() -> Result<()> {
    // Malformed lines, unbalanced markers and abandoned calls are reported only.
    let env = TestEnvironment::new()?;
    let trace = env.create_trace(&[
        "this is not a trace line",
        r#"1 write(2, "Makefile:1: ##BEGIN## all,\n", 26) = 26"#,
        "2 openat(AT_FDCWD, \"a.c\", <unfinished ...>",
    ])?;

    let result = env.convert(&trace, &[])?;
    result.assert_success()?;
    assert!(result.stderr().contains("Unbalanced task markers"));
    assert!(result.stderr().contains("was never resumed"));
    Ok(())
}
