// SPDX-License-Identifier: GPL-3.0-or-later

use super::combinators::{Gate, check_paths, gated};
use super::{AT_FDCWD, AccessMode, Operation, Resolution, ShareKind, Translate, TranslationError, argument};
use crate::trace::{Call, ReturnValue};
use std::collections::HashMap;
use std::sync::LazyLock;

type Result = std::result::Result<Vec<Operation>, TranslationError>;

/// Calls which are known, but have no effect on the file system model.
const IGNORED: &[&str] = &[
    "_llseek", "accept", "accept4", "alarm", "arch_prctl", "bind", "brk", "capget", "capset",
    "clock_getres", "clock_gettime", "clock_nanosleep", "close_range", "connect", "copy_file_range",
    "epoll_create", "epoll_create1", "epoll_ctl", "epoll_pwait", "epoll_wait", "eventfd2", "exit",
    "exit_group", "fadvise64", "fallocate", "fchmod", "fchown", "fdatasync", "fgetxattr", "flistxattr",
    "flock", "fsetxattr", "fstat", "fstat64", "fstatfs", "fstatfs64", "fsync", "ftruncate", "futex",
    "get_mempolicy", "get_robust_list", "getcpu", "getdents", "getdents64", "getegid", "geteuid",
    "getgid", "getgroups", "getitimer", "getpeername", "getpgid", "getpgrp", "getpid", "getppid",
    "getpriority", "getrandom", "getresgid", "getresuid", "getrlimit", "getrusage", "getsid",
    "getsockname", "getsockopt", "gettid", "gettimeofday", "getuid", "inotify_add_watch",
    "inotify_init1", "inotify_rm_watch", "ioctl", "kill", "listen", "lseek", "madvise", "membarrier",
    "mlock", "mmap", "mmap2", "mprotect", "mremap", "msync", "munlock", "munmap", "nanosleep",
    "pause", "personality", "pipe", "pipe2", "poll", "ppoll", "prctl", "pread64", "preadv",
    "prlimit64", "pselect6", "pwrite64", "pwritev", "read", "readv", "recvfrom", "recvmsg",
    "rseq", "rt_sigaction", "rt_sigpending", "rt_sigprocmask", "rt_sigreturn", "rt_sigsuspend",
    "rt_sigtimedwait", "sched_getaffinity", "sched_setaffinity", "sched_yield", "select",
    "sendfile", "sendmmsg", "sendmsg", "sendto", "set_mempolicy", "set_robust_list",
    "set_tid_address", "setgid", "setgroups", "setitimer", "setpgid", "setpriority",
    "setresgid", "setresuid", "setrlimit", "setsid", "setsockopt", "setuid", "shutdown",
    "sigaltstack", "socket", "socketpair", "splice", "sync", "syncfs", "sysinfo", "tee",
    "tgkill", "time", "times", "tkill", "umask", "uname", "vhangup", "wait4", "waitid",
];

static TABLE: LazyLock<HashMap<&'static str, Box<dyn Translate>>> = LazyLock::new(|| {
    let mut table: HashMap<&'static str, Box<dyn Translate>> = HashMap::new();

    use AccessMode::*;
    use Gate::*;
    use Resolution::*;

    // Path lookups, which are interesting even when the lookup failed.
    register(&mut table, &["stat", "stat64", "statfs", "statfs64", "getxattr"], || {
        check_paths(&[0], path(0, Consumed, Follow))
    });
    register(&mut table, &["lstat", "lstat64", "readlink", "lgetxattr"], || {
        check_paths(&[0], path(0, Consumed, NoFollow))
    });
    register(&mut table, &["newfstatat", "fstatat64"], || check_paths(&[1], stat_at(3)));
    register(&mut table, &["statx"], || check_paths(&[1], stat_at(2)));
    register(&mut table, &["readlinkat"], || check_paths(&[1], path_at(0, 1, Consumed, NoFollow)));
    register(&mut table, &["execve"], || check_paths(&[0], path(0, Consumed, Follow)));
    register(&mut table, &["execveat"], || check_paths(&[1], path_at(0, 1, Consumed, Follow)));

    // Path lookups and modifications, which are interesting only on success.
    register(&mut table, &["access", "chmod", "chown", "setxattr", "removexattr"], || {
        gated(Negative, check_paths(&[0], path(0, Consumed, Follow)))
    });
    register(&mut table, &["faccessat", "faccessat2", "fchmodat", "fchmodat2", "fchownat"], || {
        gated(Negative, check_paths(&[1], path_at(0, 1, Consumed, Follow)))
    });
    register(&mut table, &["lchown", "lsetxattr", "lremovexattr", "utime", "utimes"], || {
        gated(Negative, check_paths(&[0], path(0, Consumed, NoFollow)))
    });
    register(&mut table, &["utimensat"], || gated(Negative, check_paths(&[1], utimensat)));
    register(&mut table, &["truncate", "truncate64", "mkdir", "mknod"], || {
        gated(Negative, check_paths(&[0], path(0, Produced, Follow)))
    });
    register(&mut table, &["mkdirat", "mknodat"], || {
        gated(Negative, check_paths(&[1], path_at(0, 1, Produced, Follow)))
    });
    register(&mut table, &["rmdir", "unlink"], || {
        gated(Negative, check_paths(&[0], path(0, Expunged, NoFollow)))
    });
    register(&mut table, &["unlinkat"], || {
        gated(Negative, check_paths(&[1], path_at(0, 1, Expunged, NoFollow)))
    });

    // Working directory.
    register(&mut table, &["chdir", "getcwd"], || gated(Negative, check_paths(&[0], chdir)));
    register(&mut table, &["fchdir"], || gated(Negative, fchdir));

    // File descriptors.
    register(&mut table, &["open"], || gated(Negative, check_paths(&[0], open)));
    register(&mut table, &["creat"], || gated(Negative, check_paths(&[0], creat)));
    register(&mut table, &["openat", "openat2"], || gated(Negative, check_paths(&[1], openat)));
    register(&mut table, &["close"], || gated(Negative, close));
    register(&mut table, &["dup"], || gated(Negative, dup));
    register(&mut table, &["dup2", "dup3"], || gated(Negative, dup2));
    register(&mut table, &["fcntl", "fcntl64"], || gated(Negative, fcntl));

    // Processes.
    register(&mut table, &["clone"], || gated(NegativeOrUnresolved, clone));
    register(&mut table, &["clone3"], || gated(NegativeOrUnresolved, clone3));
    register(&mut table, &["fork", "vfork"], || gated(NegativeOrUnresolved, fork));

    // Directory entries.
    register(&mut table, &["link"], || gated(Negative, check_paths(&[0, 1], link)));
    register(&mut table, &["linkat"], || gated(Negative, check_paths(&[1, 3], linkat)));
    register(&mut table, &["rename"], || gated(Negative, check_paths(&[0, 1], rename)));
    register(&mut table, &["renameat", "renameat2"], || gated(Negative, check_paths(&[1, 3], renameat)));
    register(&mut table, &["symlink"], || gated(Negative, check_paths(&[0, 1], symlink)));
    register(&mut table, &["symlinkat"], || gated(Negative, check_paths(&[0, 2], symlinkat)));

    register(&mut table, IGNORED, || ignore);

    table
});

fn register<T>(
    table: &mut HashMap<&'static str, Box<dyn Translate>>,
    names: &[&'static str],
    factory: impl Fn() -> T,
) where
    T: Translate + 'static,
{
    for name in names {
        table.insert(*name, Box::new(factory()));
    }
}

/// Returns the translator of the given call name.
pub(super) fn lookup(name: &str) -> Option<&'static dyn Translate> {
    TABLE.get(name).map(|translator| translator.as_ref())
}

fn ignore(_: &Call) -> Result {
    Ok(vec![])
}

/// A path relative to the current working directory.
fn path(index: usize, mode: AccessMode, resolution: Resolution) -> impl Translate {
    move |call: &Call| -> Result {
        Ok(vec![Operation::touch(AT_FDCWD, argument(call, index)?, mode, resolution)])
    }
}

/// A path relative to a directory descriptor.
fn path_at(dirfd: usize, index: usize, mode: AccessMode, resolution: Resolution) -> impl Translate {
    move |call: &Call| -> Result {
        Ok(vec![Operation::touch(argument(call, dirfd)?, argument(call, index)?, mode, resolution)])
    }
}

/// The stat family with a flags argument, which can turn off the symbolic
/// link resolution.
fn stat_at(flags: usize) -> impl Translate {
    move |call: &Call| -> Result {
        let resolution = match call.arg(flags) {
            Some(flags) if flags.contains("AT_SYMLINK_NOFOLLOW") => Resolution::NoFollow,
            _ => Resolution::Follow,
        };
        Ok(vec![Operation::touch(argument(call, 0)?, argument(call, 1)?, AccessMode::Consumed, resolution)])
    }
}

fn utimensat(call: &Call) -> Result {
    let path = argument(call, 1)?;
    if path == "NULL" {
        return Ok(vec![]);
    }
    Ok(vec![Operation::touch(argument(call, 0)?, path, AccessMode::Consumed, Resolution::NoFollow)])
}

fn chdir(call: &Call) -> Result {
    Ok(vec![Operation::SetCwd { path: argument(call, 0)?.to_string() }])
}

fn fchdir(call: &Call) -> Result {
    Ok(vec![Operation::SetCwdFd { fd: argument(call, 0)?.to_string() }])
}

/// Opening a file with creation or truncation flags produces it.
fn open_mode(flags: &str) -> AccessMode {
    if flags.contains("O_CREAT") || flags.contains("O_TRUNC") {
        AccessMode::Produced
    } else {
        AccessMode::Consumed
    }
}

/// The new descriptor and the access of the path.
fn opened(call: &Call, dirfd: &str, path: &str, mode: AccessMode) -> Result {
    let Some(fd) = returned(call) else {
        return Ok(vec![]);
    };
    Ok(vec![
        Operation::NewFd { dirfd: dirfd.to_string(), path: path.to_string(), fd },
        Operation::touch(dirfd, path, mode, Resolution::Follow),
    ])
}

fn open(call: &Call) -> Result {
    let path = argument(call, 0)?;
    let mode = open_mode(argument(call, 1)?);
    opened(call, AT_FDCWD, path, mode)
}

fn creat(call: &Call) -> Result {
    opened(call, AT_FDCWD, argument(call, 0)?, AccessMode::Produced)
}

fn openat(call: &Call) -> Result {
    let dirfd = argument(call, 0)?;
    let path = argument(call, 1)?;
    let mode = open_mode(argument(call, 2)?);
    opened(call, dirfd, path, mode)
}

fn close(call: &Call) -> Result {
    Ok(vec![Operation::DelFd { fd: argument(call, 0)?.to_string() }])
}

fn dup(call: &Call) -> Result {
    let Some(fd) = returned(call) else {
        return Ok(vec![]);
    };
    Ok(vec![Operation::DupFd { old: argument(call, 0)?.to_string(), new: fd.to_string() }])
}

fn dup2(call: &Call) -> Result {
    Ok(vec![Operation::DupFd { old: argument(call, 0)?.to_string(), new: argument(call, 1)?.to_string() }])
}

fn fcntl(call: &Call) -> Result {
    if argument(call, 1)?.starts_with("F_DUPFD") {
        dup(call)
    } else {
        Ok(vec![])
    }
}

fn clone(call: &Call) -> Result {
    let flags = call
        .args
        .iter()
        .find(|arg| arg.starts_with("flags="))
        .map(String::as_str)
        .or_else(|| call.arg(1))
        .unwrap_or_default();
    new_process(call, share_kind(flags))
}

fn clone3(call: &Call) -> Result {
    new_process(call, share_kind(argument(call, 0)?))
}

fn fork(call: &Call) -> Result {
    new_process(call, ShareKind::None)
}

fn new_process(call: &Call, share: ShareKind) -> Result {
    Ok(returned(call).map(|pid| Operation::NewProc { share, pid }).into_iter().collect())
}

/// Looks for the sharing flags as whole tokens of the flags text.
fn share_kind(flags: &str) -> ShareKind {
    let tokens = flags
        .split(|c: char| matches!(c, '|' | '=' | ',' | '{' | '}') || c.is_whitespace())
        .filter(|token| !token.is_empty());
    let (mut descriptors, mut filesystem) = (false, false);
    for token in tokens {
        match token {
            "CLONE_FILES" => descriptors = true,
            "CLONE_FS" => filesystem = true,
            _ => {}
        }
    }
    ShareKind::new(descriptors, filesystem)
}

fn link(call: &Call) -> Result {
    let (old, new) = (argument(call, 0)?, argument(call, 1)?);
    Ok(vec![
        Operation::Link {
            old_dirfd: AT_FDCWD.to_string(),
            old_path: old.to_string(),
            new_dirfd: AT_FDCWD.to_string(),
            new_path: new.to_string(),
        },
        Operation::touch(AT_FDCWD, old, AccessMode::Consumed, Resolution::Follow),
        Operation::touch(AT_FDCWD, new, AccessMode::Produced, Resolution::Follow),
    ])
}

fn linkat(call: &Call) -> Result {
    let (old_dirfd, old) = (argument(call, 0)?, argument(call, 1)?);
    let (new_dirfd, new) = (argument(call, 2)?, argument(call, 3)?);
    Ok(vec![
        Operation::Link {
            old_dirfd: old_dirfd.to_string(),
            old_path: old.to_string(),
            new_dirfd: new_dirfd.to_string(),
            new_path: new.to_string(),
        },
        Operation::touch(old_dirfd, old, AccessMode::Consumed, Resolution::Follow),
        Operation::touch(new_dirfd, new, AccessMode::Produced, Resolution::Follow),
    ])
}

fn rename(call: &Call) -> Result {
    let (old, new) = (argument(call, 0)?, argument(call, 1)?);
    Ok(vec![
        Operation::Rename {
            old_dirfd: AT_FDCWD.to_string(),
            old_path: old.to_string(),
            new_dirfd: AT_FDCWD.to_string(),
            new_path: new.to_string(),
        },
        Operation::touch(AT_FDCWD, old, AccessMode::Expunged, Resolution::Follow),
        Operation::touch(AT_FDCWD, new, AccessMode::Produced, Resolution::Follow),
    ])
}

fn renameat(call: &Call) -> Result {
    let (old_dirfd, old) = (argument(call, 0)?, argument(call, 1)?);
    let (new_dirfd, new) = (argument(call, 2)?, argument(call, 3)?);
    Ok(vec![
        Operation::Rename {
            old_dirfd: old_dirfd.to_string(),
            old_path: old.to_string(),
            new_dirfd: new_dirfd.to_string(),
            new_path: new.to_string(),
        },
        Operation::touch(old_dirfd, old, AccessMode::Expunged, Resolution::Follow),
        Operation::touch(new_dirfd, new, AccessMode::Produced, Resolution::Follow),
    ])
}

fn symlink(call: &Call) -> Result {
    let (target, path) = (argument(call, 0)?, argument(call, 1)?);
    Ok(vec![
        Operation::Symlink { dirfd: AT_FDCWD.to_string(), path: path.to_string(), target: target.to_string() },
        Operation::touch(AT_FDCWD, path, AccessMode::Produced, Resolution::Follow),
    ])
}

fn symlinkat(call: &Call) -> Result {
    let (target, dirfd, path) = (argument(call, 0)?, argument(call, 1)?, argument(call, 2)?);
    Ok(vec![
        Operation::Symlink { dirfd: dirfd.to_string(), path: path.to_string(), target: target.to_string() },
        Operation::touch(dirfd, path, AccessMode::Produced, Resolution::Follow),
    ])
}

/// The return value of a successful call, when the tracer printed one.
fn returned(call: &Call) -> Option<i64> {
    match call.ret {
        ReturnValue::Value(value) if value >= 0 => Some(value),
        _ => None,
    }
}
