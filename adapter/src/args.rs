// SPDX-License-Identifier: GPL-3.0-or-later

//! This module contains the command line interface of the application.
//!
//! The command line parsing is implemented using the `clap` library.
//! The `Arguments` type is the structured form of the program invocation.

use crate::tasks::BuildTool;
use anyhow::anyhow;
use clap::{ArgAction, ArgMatches, Command, arg, command};
use std::fmt;

const DEFAULT_BUILD_TOOL: &str = "make";

/// Represents the command line arguments of the application.
#[derive(Debug, PartialEq)]
pub struct Arguments {
    /// The working directory of the traced build.
    pub directory: String,
    /// The build tool which was traced.
    pub build_tool: BuildTool,
    /// The trace file, or the standard input when not given.
    pub input: Option<String>,
    /// The path of the configuration file.
    pub config: Option<String>,
    /// The number of verbosity flags.
    pub verbose: u8,
}

impl TryFrom<ArgMatches> for Arguments {
    type Error = anyhow::Error;

    fn try_from(matches: ArgMatches) -> Result<Self, Self::Error> {
        let directory = matches
            .get_one::<String>("DIRECTORY")
            .map(String::to_string)
            .ok_or_else(|| anyhow!("missing working directory"))?;
        let build_tool = matches
            .get_one::<String>("build-tool")
            .map_or(DEFAULT_BUILD_TOOL, String::as_str)
            .parse::<BuildTool>()
            .map_err(|message| anyhow!(message))?;
        let input = matches.get_one::<String>("input").map(String::to_string);
        let config = matches.get_one::<String>("config").map(String::to_string);
        let verbose = matches.get_count("verbose");

        Ok(Arguments { directory, build_tool, input, config, verbose })
    }
}

impl fmt::Display for Arguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Arguments: directory={}, build tool={}, input={}, config={}",
            self.directory,
            self.build_tool,
            self.input.as_deref().unwrap_or("<stdin>"),
            self.config.as_deref().unwrap_or("<default>")
        )
    }
}

/// Represents the command line interface of the application.
pub fn cli() -> Command {
    command!().arg_required_else_help(true).args(&[
        arg!(<DIRECTORY> "Working directory of the traced build"),
        arg!(-b --"build-tool" <TOOL> "The build tool which was traced")
            .value_parser(["make", "gradle"])
            .default_value(DEFAULT_BUILD_TOOL)
            .hide_default_value(false),
        arg!(-i --input <FILE> "Path of the trace file, standard input when not given"),
        arg!(-c --config <FILE> "Path of the config file"),
        arg!(-v --verbose ... "Sets the level of verbosity").action(ArgAction::Count),
    ])
}
