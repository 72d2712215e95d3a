// SPDX-License-Identifier: GPL-3.0-or-later

use crate::pipeline::Pipeline;
use crate::tasks::BuildTool;
use crate::{args, config};
use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::PathBuf;
use std::process::ExitCode;

/// The name of the standard input on the command line.
const STDIN_NAME: &str = "-";

/// Where the trace is read from.
#[derive(Debug, PartialEq)]
pub enum Input {
    Stdin,
    File(PathBuf),
}

/// Represents a configured conversion run.
#[derive(Debug)]
pub struct Application {
    input: Input,
    directory: String,
    build_tool: BuildTool,
    config: config::Main,
}

impl Application {
    /// Configure the application based on the command line arguments and the configuration.
    ///
    /// The arguments are checked here, so the run can only fail because of
    /// the content of the trace.
    pub fn configure(args: args::Arguments, config: config::Main) -> Result<Self, ConfigurationError> {
        let input = match args.input.as_deref() {
            None | Some(STDIN_NAME) => Input::Stdin,
            Some(file_name) => {
                let path = PathBuf::from(file_name);
                if !path.is_file() {
                    return Err(ConfigurationError::InputNotFound(path));
                }
                Input::File(path)
            }
        };
        if args.directory.is_empty() {
            return Err(ConfigurationError::InvalidConfiguration("empty working directory".to_string()));
        }
        log::debug!("Input: {input:?}, build tool: {}", args.build_tool);

        Ok(Self { input, directory: args.directory, build_tool: args.build_tool, config })
    }

    /// It actually runs the conversion.
    ///
    /// The output goes to the standard output, the statistics of the run are
    /// logged at the end.
    pub fn run(self) -> ExitCode {
        let stdout = io::stdout();
        let output = BufWriter::new(stdout.lock());
        let pipeline = Pipeline::new(&self.config, self.build_tool, &self.directory, output);

        let result = match &self.input {
            Input::Stdin => pipeline.run(io::stdin().lock()),
            Input::File(path) => match File::open(path) {
                Ok(file) => pipeline.run(BufReader::new(file)),
                Err(error) => {
                    log::error!("fsracer-adapter: failed to open {}: {error}", path.display());
                    return ExitCode::FAILURE;
                }
            },
        };

        match result {
            Ok((statistics, _)) => {
                log::info!("{statistics}");
                ExitCode::SUCCESS
            }
            Err(error) => {
                log::error!("fsracer-adapter: {error}");
                ExitCode::FAILURE
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Input file not found: {0}")]
    InputNotFound(PathBuf),
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}
