// SPDX-License-Identifier: GPL-3.0-or-later

//! This module reconstructs the task structure of the build.
//!
//! The build tools are instrumented to print markers at the begin and at
//! the end of the tasks. These markers are in the trace as the payload of
//! `write` calls. The handlers turn them into task statements, and keep
//! track of the nesting depth, which is the indentation of every other
//! statement in the output.

pub mod dependencies;
pub mod gradle;
pub mod include;
pub mod make;

use crate::config;
use crate::output::Statement;
use crate::trace::Call;
use crate::translate::{Operation, Written};
use std::fmt;
use std::str::FromStr;

pub use gradle::GradleHandler;
pub use make::MakeHandler;

/// The supported build tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildTool {
    Make,
    Gradle,
}

impl FromStr for BuildTool {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "make" => Ok(BuildTool::Make),
            "gradle" => Ok(BuildTool::Gradle),
            _ => Err(format!("unknown build tool: {value}")),
        }
    }
}

impl fmt::Display for BuildTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildTool::Make => write!(f, "make"),
            BuildTool::Gradle => write!(f, "gradle"),
        }
    }
}

/// A statement produced by a handler, with the depth it is rendered at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Emitted {
    pub depth: usize,
    pub statement: Statement,
}

impl Emitted {
    pub fn new(depth: usize, statement: Statement) -> Self {
        Self { depth, statement }
    }
}

/// Watches the trace for the markers of a build tool.
pub enum Handler {
    Make(MakeHandler),
    Gradle(GradleHandler),
}

impl Handler {
    pub fn new(tool: BuildTool, config: &config::Main, working_directory: &str) -> Self {
        match tool {
            BuildTool::Make => Handler::Make(MakeHandler::new(working_directory, &config.make.include_extension)),
            BuildTool::Gradle => Handler::Gradle(GradleHandler::new(&config.gradle)),
        }
    }

    /// The current nesting depth.
    pub fn depth(&self) -> usize {
        match self {
            Handler::Make(handler) => handler.depth(),
            Handler::Gradle(handler) => handler.depth(),
        }
    }

    pub fn on_write(&mut self, written: &Written) -> Vec<Emitted> {
        match self {
            Handler::Make(handler) => handler.on_write(written),
            Handler::Gradle(handler) => handler.on_write(written),
        }
    }

    /// Inspects the operations of a call. Only Make cares about them.
    pub fn observe(&mut self, call: &Call, operations: &[Operation]) -> Vec<Emitted> {
        match self {
            Handler::Make(handler) => handler.observe(call, operations),
            Handler::Gradle(_) => vec![],
        }
    }

    /// Called at the end of the stream.
    pub fn finish(&mut self) -> Vec<Emitted> {
        match self {
            Handler::Make(handler) => handler.finish(),
            Handler::Gradle(handler) => handler.finish(),
        }
    }
}
