// SPDX-License-Identifier: GPL-3.0-or-later

//! This module translates system calls into file system operations.
//!
//! Every known call name has an entry in a static table. An entry is a
//! [`Translate`] implementation, usually a plain function wrapped into the
//! [`combinators::check_paths`] and [`combinators::gated`] guards. Calls
//! without a table entry are rejected: the table is a closed allow-list.
//!
//! The `write` and `writev` calls are not file system operations for this
//! model. Their payload carries the build tool's own output, so they are
//! decoded and returned as [`Written`] for the task handlers.

mod combinators;
mod table;

pub use combinators::{Gate, check_paths, gated};

use crate::trace::{Call, decode_string, decode_strings};
use std::fmt;
use thiserror::Error;

/// Responsible to turn one system call into file system operations.
pub trait Translate: Send + Sync {
    fn translate(&self, call: &Call) -> Result<Vec<Operation>, TranslationError>;
}

impl<F> Translate for F
where
    F: Fn(&Call) -> Result<Vec<Operation>, TranslationError> + Send + Sync,
{
    fn translate(&self, call: &Call) -> Result<Vec<Operation>, TranslationError> {
        self(call)
    }
}

/// The result of translating one call.
#[derive(Debug, PartialEq)]
pub enum Translation {
    Operations(Vec<Operation>),
    Write(Written),
}

#[derive(Debug, Error, PartialEq)]
pub enum TranslationError {
    #[error("unknown system call: {name}")]
    UnknownCall { name: String },
    #[error("{name}: missing argument at position {index}")]
    MissingArgument { name: String, index: usize },
    #[error("{name}: invalid argument at position {index}: {value}")]
    InvalidArgument { name: String, index: usize, value: String },
}

impl TranslationError {
    /// A fatal error stops the processing of the stream.
    pub fn is_fatal(&self) -> bool {
        matches!(self, TranslationError::UnknownCall { .. })
    }
}

/// Translates a single call.
pub fn translate(call: &Call) -> Result<Translation, TranslationError> {
    match call.name.as_str() {
        "write" | "writev" if !call.succeeded() => Ok(Translation::Operations(vec![])),
        "write" => Written::from_write(call).map(Translation::Write),
        "writev" => Written::from_writev(call).map(Translation::Write),
        name => table::lookup(name)
            .ok_or_else(|| TranslationError::UnknownCall { name: name.to_string() })?
            .translate(call)
            .map(Translation::Operations),
    }
}

/// The descriptor argument which stands for the current directory.
pub const AT_FDCWD: &str = "AT_FDCWD";

/// Returns the argument at the given position, or a missing argument error.
pub(crate) fn argument(call: &Call, index: usize) -> Result<&str, TranslationError> {
    call.arg(index)
        .ok_or_else(|| TranslationError::MissingArgument { name: call.name.clone(), index })
}

/// The operations of the fstrace format.
///
/// The descriptor and path tokens are kept as the tracer printed them: a
/// descriptor is a number or `AT_FDCWD`, a path is a quoted string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Touch { dirfd: String, path: String, mode: AccessMode, resolution: Resolution },
    SetCwd { path: String },
    SetCwdFd { fd: String },
    NewProc { share: ShareKind, pid: i64 },
    DelFd { fd: String },
    DupFd { old: String, new: String },
    Symlink { dirfd: String, path: String, target: String },
    Link { old_dirfd: String, old_path: String, new_dirfd: String, new_path: String },
    Rename { old_dirfd: String, old_path: String, new_dirfd: String, new_path: String },
    NewFd { dirfd: String, path: String, fd: i64 },
}

impl Operation {
    pub fn touch(dirfd: &str, path: &str, mode: AccessMode, resolution: Resolution) -> Self {
        Operation::Touch { dirfd: dirfd.to_string(), path: path.to_string(), mode, resolution }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Touch { dirfd, path, mode, resolution: Resolution::Follow } => {
                write!(f, "hpath {dirfd} {path} {mode}")
            }
            Operation::Touch { dirfd, path, mode, resolution: Resolution::NoFollow } => {
                write!(f, "hpathsym {dirfd} {path} {mode}")
            }
            Operation::SetCwd { path } => write!(f, "setcwd {path}"),
            Operation::SetCwdFd { fd } => write!(f, "setcwdfd {fd}"),
            Operation::NewProc { share, pid } => write!(f, "newproc {share} {pid}"),
            Operation::DelFd { fd } => write!(f, "delfd {fd}"),
            Operation::DupFd { old, new } => write!(f, "dupfd {old} {new}"),
            Operation::Symlink { dirfd, path, target } => write!(f, "symlink {dirfd} {path} {target}"),
            Operation::Link { old_dirfd, old_path, new_dirfd, new_path } => {
                write!(f, "link {old_dirfd} {old_path} {new_dirfd} {new_path}")
            }
            Operation::Rename { old_dirfd, old_path, new_dirfd, new_path } => {
                write!(f, "rename {old_dirfd} {old_path} {new_dirfd} {new_path}")
            }
            Operation::NewFd { dirfd, path, fd } => write!(f, "newfd {dirfd} {path} {fd}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    Consumed,
    Produced,
    Expunged,
    Touched,
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AccessMode::Consumed => "consumed",
            AccessMode::Produced => "produced",
            AccessMode::Expunged => "expunged",
            AccessMode::Touched => "touched",
        };
        write!(f, "{}", name)
    }
}

/// Whether the path lookup follows a symbolic link in the last component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Follow,
    NoFollow,
}

/// What the new process shares with its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareKind {
    None,
    Fd,
    Fs,
    FdFs,
}

impl ShareKind {
    pub fn new(descriptors: bool, filesystem: bool) -> Self {
        match (descriptors, filesystem) {
            (true, true) => ShareKind::FdFs,
            (true, false) => ShareKind::Fd,
            (false, true) => ShareKind::Fs,
            (false, false) => ShareKind::None,
        }
    }
}

impl fmt::Display for ShareKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ShareKind::None => "none",
            ShareKind::Fd => "fd",
            ShareKind::Fs => "fs",
            ShareKind::FdFs => "fdfs",
        };
        write!(f, "{}", name)
    }
}

/// The decoded payload of a `write` or `writev` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Written {
    pub pid: String,
    pub fd: i64,
    pub text: String,
}

impl Written {
    fn from_write(call: &Call) -> Result<Self, TranslationError> {
        let buffer = Self::buffer(call)?;
        Ok(Written {
            pid: call.pid.clone(),
            fd: Self::descriptor(call)?,
            text: decode_string(&buffer).unwrap_or_default(),
        })
    }

    fn from_writev(call: &Call) -> Result<Self, TranslationError> {
        let buffer = Self::buffer(call)?;
        Ok(Written { pid: call.pid.clone(), fd: Self::descriptor(call)?, text: decode_strings(&buffer) })
    }

    /// The descriptor is printed as a number, optionally followed by the
    /// path in angle brackets (`1</dev/pts/0>`).
    fn descriptor(call: &Call) -> Result<i64, TranslationError> {
        let text = argument(call, 0)?;
        let digits: String = text.chars().take_while(char::is_ascii_digit).collect();
        digits.parse().map_err(|_| TranslationError::InvalidArgument {
            name: call.name.clone(),
            index: 0,
            value: text.to_string(),
        })
    }

    /// The buffer is every argument between the descriptor and the length.
    /// The splitter may cut a buffer with escaped quotes in pieces, these
    /// are joined back together here.
    fn buffer(call: &Call) -> Result<String, TranslationError> {
        argument(call, 1)?;
        let end = call.args.len().saturating_sub(1).max(2);
        Ok(call.args[1..end.min(call.args.len())].join(", "))
    }
}
