// SPDX-License-Identifier: GPL-3.0-or-later

//! Writes the shell completion scripts of `fsracer-adapter` into the
//! directory given as the first argument (current directory by default).

use clap_complete::{Shell, generate_to};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

const BINARY_NAME: &str = "fsracer-adapter";

fn main() -> ExitCode {
    let directory = env::args().nth(1).map_or_else(|| PathBuf::from("."), PathBuf::from);

    for shell in [Shell::Bash, Shell::Zsh, Shell::Fish, Shell::Elvish, Shell::PowerShell] {
        let mut command = adapter::args::cli();
        match generate_to(shell, &mut command, BINARY_NAME, &directory) {
            Ok(path) => println!("Generated: {}", path.display()),
            Err(error) => {
                eprintln!("Failed to generate {shell} completion: {error}");
                return ExitCode::FAILURE;
            }
        }
    }
    ExitCode::SUCCESS
}
