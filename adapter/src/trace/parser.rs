// SPDX-License-Identifier: GPL-3.0-or-later

use super::pending::{Abandoned, PendingCalls};
use super::split::split_arguments;
use super::{Call, ReturnValue};
use crate::config::{self, DuplicateUnfinished, OrphanResumed};
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

static LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\[pid\s+)?(\d+)\]?\s+(.*)$").expect("Invalid trace line regex pattern")
});

static UNFINISHED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([a-z0-9_]+)\((.*)\s+<unfinished \.\.\.>$").expect("Invalid unfinished call regex pattern")
});

static RESUMED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^<\.\.\. ([a-z0-9_]+) resumed>\s*(.*)\)\s*=\s*(0x[0-9a-f]+|-?[0-9]+|\?)")
        .expect("Invalid resumed call regex pattern")
});

static COMPLETE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([a-z0-9_]+)\((.*)\)\s*=\s*(0x[0-9a-f]+|-?[0-9]+|\?)").expect("Invalid call regex pattern")
});

/// The outcome of parsing one line of the trace.
#[derive(Debug, PartialEq)]
pub enum Parsed {
    /// A complete call: printed on one line, or reassembled.
    Call(Call),
    /// The line started a call which will be resumed later.
    Pending,
    /// The line carries no call (empty line, signal or exit notice).
    Ignored,
}

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("line {line}: not a system call: {text}")]
    Malformed { line: usize, text: String },
    #[error("line {line}: {name} of process {pid} resumed, but it was not started")]
    OrphanResumed { line: usize, pid: String, name: String },
    #[error("line {line}: {name} of process {pid} started again, it is pending since line {previous}")]
    DuplicateUnfinished { line: usize, pid: String, name: String, previous: usize },
}

impl ParseError {
    /// A fatal error stops the processing of the stream.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ParseError::Malformed { .. })
    }
}

/// Turns trace lines into calls.
///
/// Stateful: keeps the fragments of the interrupted calls until they are
/// resumed.
pub struct LineParser {
    pending: PendingCalls,
    duplicate_unfinished: DuplicateUnfinished,
    orphan_resumed: OrphanResumed,
}

impl LineParser {
    pub fn new(config: &config::Parser) -> Self {
        Self {
            pending: PendingCalls::default(),
            duplicate_unfinished: config.duplicate_unfinished,
            orphan_resumed: config.orphan_resumed,
        }
    }

    /// Parses one line. The line number is used in diagnostics only.
    pub fn parse(&mut self, line: &str, number: usize) -> Result<Parsed, ParseError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(Parsed::Ignored);
        }
        let malformed = || ParseError::Malformed { line: number, text: line.to_string() };

        let captures = LINE.captures(line).ok_or_else(malformed)?;
        let pid = &captures[1];
        let rest = captures.get(2).map_or("", |m| m.as_str());

        if rest.starts_with("---") || rest.starts_with("+++") {
            Ok(Parsed::Ignored)
        } else if rest.ends_with("<unfinished ...>") {
            let captures = UNFINISHED.captures(rest).ok_or_else(malformed)?;
            self.suspend(pid, &captures[1], &captures[2], number)
        } else if rest.starts_with("<...") {
            let captures = RESUMED.captures(rest).ok_or_else(malformed)?;
            let ret = captures[3].parse::<ReturnValue>().map_err(|_| malformed())?;
            self.resume(pid, &captures[1], &captures[2], ret, number)
        } else {
            let captures = COMPLETE.captures(rest).ok_or_else(malformed)?;
            let ret = captures[3].parse::<ReturnValue>().map_err(|_| malformed())?;
            let args = split_arguments(&captures[2]);
            Ok(Parsed::Call(Call::new(pid, &captures[1], args, ret)))
        }
    }

    /// Returns the calls which were started but never resumed.
    pub fn finish(&mut self) -> Vec<Abandoned> {
        self.pending.drain()
    }

    fn suspend(&mut self, pid: &str, name: &str, text: &str, line: usize) -> Result<Parsed, ParseError> {
        if self.duplicate_unfinished == DuplicateUnfinished::Fail {
            if let Some(previous) = self.pending.line_of(pid, name) {
                return Err(ParseError::DuplicateUnfinished {
                    line,
                    pid: pid.to_string(),
                    name: name.to_string(),
                    previous,
                });
            }
        }
        if let Some(previous) = self.pending.insert(pid, name, text, line) {
            log::warn!("line {line}: {name} of process {pid} started again, dropping the start from line {previous}");
        }
        Ok(Parsed::Pending)
    }

    fn resume(
        &mut self,
        pid: &str,
        name: &str,
        text: &str,
        ret: ReturnValue,
        line: usize,
    ) -> Result<Parsed, ParseError> {
        match self.pending.take(pid, name) {
            Some(mut arguments) => {
                arguments.push_str(text);
                Ok(Parsed::Call(Call::new(pid, name, split_arguments(&arguments), ret)))
            }
            None => match self.orphan_resumed {
                OrphanResumed::Fail => {
                    Err(ParseError::OrphanResumed { line, pid: pid.to_string(), name: name.to_string() })
                }
                OrphanResumed::Skip => {
                    log::warn!("line {line}: {name} of process {pid} resumed, but it was not started");
                    Ok(Parsed::Ignored)
                }
            },
        }
    }
}
