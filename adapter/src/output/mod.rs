// SPDX-License-Identifier: GPL-3.0-or-later

//! This module is responsible for writing the fstrace output.
//!
//! Every output line is an instance of [`Statement`], rendered at a nesting
//! depth. The depth is the number of task blocks the statement is in, and
//! it is rendered as leading tabs.

pub mod statistics;

use crate::translate::Operation;
use std::fmt;
use std::io;

pub use statistics::Statistics;

/// The reserved id of the first system operation of the stream.
pub const INIT_SYSOP_ID: &str = "init";

/// The statements of the fstrace format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    /// The operations of one system call, rendered as a block.
    SysOp { id: String, pid: String, operations: Vec<Operation>, failed: bool },
    /// Opens the block of a task execution.
    TaskBegin { id: String },
    /// Closes the innermost task execution block.
    TaskEnd,
    /// Declares a sequential task.
    NewTask { id: String },
    Consumes { id: String, resource: String },
    Produces { id: String, resource: String },
    DependsOn { dependent: String, dependency: String },
    /// A statement the build tool printed in fstrace syntax already.
    Verbatim(String),
}

impl Statement {
    pub fn sysop(id: impl Into<String>, pid: &str, operations: Vec<Operation>, failed: bool) -> Self {
        Statement::SysOp { id: id.into(), pid: pid.to_string(), operations, failed }
    }
}

/// A statement at a nesting depth.
pub struct Indented<'a> {
    pub depth: usize,
    pub statement: &'a Statement,
}

impl fmt::Display for Indented<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let indent = "\t".repeat(self.depth);
        match self.statement {
            Statement::SysOp { id, pid, operations, failed } => {
                writeln!(f, "{indent}sysop {id} SYNC {{")?;
                let marker = if *failed { " !failed" } else { "" };
                for operation in operations {
                    writeln!(f, "{indent}\t{pid}, {operation}{marker}")?;
                }
                write!(f, "{indent}}}")
            }
            Statement::TaskBegin { id } => write!(f, "{indent}execTask {id} {{"),
            Statement::TaskEnd => write!(f, "{indent}}}"),
            Statement::NewTask { id } => write!(f, "{indent}newTask {id} S 0"),
            Statement::Consumes { id, resource } => write!(f, "{indent}consumes {id} \"{resource}\""),
            Statement::Produces { id, resource } => write!(f, "{indent}produces {id} \"{resource}\""),
            Statement::DependsOn { dependent, dependency } => {
                write!(f, "{indent}dependsOn {dependent} {dependency}")
            }
            Statement::Verbatim(text) => write!(f, "{indent}{text}"),
        }
    }
}

/// Writes statements to the output, one per line.
pub struct Emitter<W: io::Write> {
    output: W,
    statistics: Statistics,
}

impl<W: io::Write> Emitter<W> {
    pub fn new(output: W) -> Self {
        Self { output, statistics: Statistics::default() }
    }

    pub fn emit(&mut self, depth: usize, statement: &Statement) -> io::Result<()> {
        writeln!(self.output, "{}", Indented { depth, statement })?;
        self.statistics.count(statement);
        Ok(())
    }

    pub fn statistics(&self) -> &Statistics {
        &self.statistics
    }

    /// The counters of the input side are updated by the caller.
    pub fn statistics_mut(&mut self) -> &mut Statistics {
        &mut self.statistics
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.output.flush()
    }

    pub fn into_inner(self) -> W {
        self.output
    }
}
