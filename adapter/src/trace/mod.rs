// SPDX-License-Identifier: GPL-3.0-or-later

//! This module reads the raw output of the system call tracer.
//!
//! The tracer (strace with `-f`) prints one system call per line, prefixed
//! with the process id. When two processes run at the same time, a call
//! can be interrupted by the output of another process and continued on a
//! later line. The [`parser::LineParser`] reunites these fragments and
//! produces complete [`Call`] records.

mod escape;
mod parser;
mod pending;
mod split;

pub use escape::{decode_string, decode_strings};
pub use parser::{LineParser, ParseError, Parsed};
pub use pending::{Abandoned, PendingCalls};
pub use split::split_arguments;

use std::fmt;
use std::str::FromStr;

/// The prefix the tracer prints for pointer arguments it could not
/// resolve to a string.
pub const UNRESOLVED_POINTER_PREFIX: &str = "0x";

/// Represents one system call invocation as captured by the tracer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub pid: String,
    pub name: String,
    pub args: Vec<String>,
    pub ret: ReturnValue,
}

impl Call {
    pub fn new(pid: &str, name: &str, args: Vec<String>, ret: ReturnValue) -> Self {
        Self { pid: pid.to_string(), name: name.to_string(), args, ret }
    }

    /// Returns the argument at the given position, if the tracer printed it.
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }

    /// The call is considered successful unless it returned a negative value.
    pub fn succeeded(&self) -> bool {
        !self.ret.is_negative()
    }
}

impl fmt::Display for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}({}) = {}", self.pid, self.name, self.args.join(", "), self.ret)
    }
}

/// The return value of a system call.
///
/// The tracer prints `?` when the value is not known, e.g. for calls that
/// never return to the caller, or for the parent side of a process
/// duplication that was interrupted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnValue {
    Value(i64),
    Unresolved,
}

impl ReturnValue {
    pub fn is_negative(&self) -> bool {
        matches!(self, ReturnValue::Value(value) if *value < 0)
    }

    pub fn is_unresolved(&self) -> bool {
        matches!(self, ReturnValue::Unresolved)
    }
}

impl fmt::Display for ReturnValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReturnValue::Value(value) => write!(f, "{value}"),
            ReturnValue::Unresolved => write!(f, "?"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid return value: {0}")]
pub struct InvalidReturnValue(String);

impl FromStr for ReturnValue {
    type Err = InvalidReturnValue;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value == "?" {
            return Ok(ReturnValue::Unresolved);
        }
        let parsed = match value.strip_prefix("0x") {
            // Addresses are printed in hexadecimal (mmap, brk); keep the bits.
            Some(hex) => u64::from_str_radix(hex, 16).map(|value| value as i64),
            None => value.parse::<i64>(),
        };
        parsed.map(ReturnValue::Value).map_err(|_| InvalidReturnValue(value.to_string()))
    }
}
