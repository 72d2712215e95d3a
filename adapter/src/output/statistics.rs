// SPDX-License-Identifier: GPL-3.0-or-later

//! Counters of a conversion run, logged when the run is over.

use super::Statement;
use std::fmt;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Statistics {
    /// Number of input lines read.
    pub lines_read: usize,

    /// Number of complete calls, after the reassembly of interrupted ones.
    pub calls_parsed: usize,

    /// Number of lines which could not be parsed.
    pub lines_rejected: usize,

    /// Number of calls skipped because of a translation problem.
    pub calls_skipped: usize,

    /// Number of system operation blocks written.
    pub sysops: usize,

    /// Number of operations within the system operation blocks.
    pub operations: usize,

    /// Number of task declarations.
    pub tasks_declared: usize,

    /// Number of task execution blocks opened.
    pub tasks_executed: usize,

    /// Number of dependency edges.
    pub dependencies: usize,
}

impl Statistics {
    pub(super) fn count(&mut self, statement: &Statement) {
        match statement {
            Statement::SysOp { operations, .. } => {
                self.sysops += 1;
                self.operations += operations.len();
            }
            Statement::TaskBegin { .. } => self.tasks_executed += 1,
            Statement::NewTask { .. } => self.tasks_declared += 1,
            Statement::DependsOn { .. } => self.dependencies += 1,
            Statement::TaskEnd
            | Statement::Consumes { .. }
            | Statement::Produces { .. }
            | Statement::Verbatim(_) => {}
        }
    }
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Conversion:")?;
        writeln!(f, "  lines read: {}", self.lines_read)?;
        writeln!(f, "  lines rejected: {}", self.lines_rejected)?;
        writeln!(f, "  calls parsed: {}", self.calls_parsed)?;
        writeln!(f, "  calls skipped: {}", self.calls_skipped)?;
        writeln!(f, "  sysops written: {} ({} operations)", self.sysops, self.operations)?;
        writeln!(f, "  tasks declared: {}", self.tasks_declared)?;
        writeln!(f, "  tasks executed: {}", self.tasks_executed)?;
        write!(f, "  dependencies: {}", self.dependencies)
    }
}
