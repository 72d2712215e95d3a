// SPDX-License-Identifier: GPL-3.0-or-later

//! Test infrastructure for the adapter end-to-end tests.
//!
//! Every test runs in its own temporary directory. The trace is written into
//! a file there, and the adapter is run on it with the given arguments.

use anyhow::{Context, Result};
use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Output;

pub const ADAPTER_BIN: &str = "fsracer-adapter";

/// The working directory of the traced builds in the test traces.
pub const BUILD_DIR: &str = "/src";

#[derive(Debug)]
pub struct TestEnvironment {
    temp_dir: tempfile::TempDir,
}

impl TestEnvironment {
    pub fn new() -> Result<Self> {
        let temp_dir = tempfile::TempDir::new().with_context(|| "Failed to create temp dir")?;
        Ok(Self { temp_dir })
    }

    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes the trace lines into a file, returns the path of it.
    pub fn create_trace(&self, lines: &[&str]) -> Result<PathBuf> {
        let path = self.temp_dir().join("trace.txt");
        let mut content = lines.join("\n");
        content.push('\n');
        fs::write(&path, content).with_context(|| format!("Failed to write file: {}", path.display()))?;
        Ok(path)
    }

    /// Create a configuration file (YAML format)
    pub fn create_config(&self, config_yaml: &str) -> Result<PathBuf> {
        let path = self.temp_dir().join("config.yml");
        fs::write(&path, config_yaml)?;
        Ok(path)
    }

    /// Run the adapter with the given arguments
    pub fn run_adapter(&self, args: &[&str]) -> Result<AdapterOutput> {
        let output = Command::cargo_bin(ADAPTER_BIN)?
            .current_dir(self.temp_dir())
            .env("RUST_LOG", "debug")
            .args(args)
            .output()?;
        Ok(AdapterOutput { output })
    }

    /// Run the adapter on a trace with the default build directory.
    pub fn convert(&self, trace: &Path, extra: &[&str]) -> Result<AdapterOutput> {
        let trace = trace.to_string_lossy();
        let mut args = vec!["--input", trace.as_ref()];
        args.extend_from_slice(extra);
        args.push(BUILD_DIR);
        self.run_adapter(&args)
    }
}

#[derive(Debug)]
pub struct AdapterOutput {
    output: Output,
}

impl AdapterOutput {
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.output.stdout).to_string()
    }

    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.output.stderr).to_string()
    }

    pub fn assert_success(&self) -> Result<()> {
        if !self.output.status.success() {
            anyhow::bail!("Expected success, got {:?}\nstderr: {}", self.output.status, self.stderr());
        }
        Ok(())
    }

    pub fn assert_failure(&self) -> Result<()> {
        if self.output.status.success() {
            anyhow::bail!("Expected failure, but succeeded\nstdout: {}", self.stdout());
        }
        Ok(())
    }
}
