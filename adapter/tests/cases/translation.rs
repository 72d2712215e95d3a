// SPDX-License-Identifier: GPL-3.0-or-later

use crate::fixtures::*;
use anyhow::Result;

#[test]
fn failed_access_is_dropped() -> Result<()> {
    let env = TestEnvironment::new()?;
    let trace = env.create_trace(&[r#"6413 access("/etc/ld.so.nohwcap", F_OK) = -1 ENOENT (No such file or directory)"#])?;

    let result = env.convert(&trace, &[])?;
    result.assert_success()?;
    assert_eq!(result.stdout(), "sysop init SYNC {\n\t6413, setcwd \"/src\"\n}\n");
    Ok(())
}

#[test]
fn opened_file_is_consumed() -> Result<()> {
    let env = TestEnvironment::new()?;
    let trace = env.create_trace(&[r#"12498 openat(AT_FDCWD, "s1.c", O_RDONLY|O_NOCTTY) = 3"#])?;

    let result = env.convert(&trace, &[])?;
    result.assert_success()?;
    assert_eq!(
        result.stdout(),
        "sysop init SYNC {\n\t12498, setcwd \"/src\"\n}\n\
         sysop openat_1 SYNC {\n\t12498, newfd AT_FDCWD \"s1.c\" 3\n\t12498, hpath AT_FDCWD \"s1.c\" consumed\n}\n"
    );
    Ok(())
}

#[test]
fn interrupted_calls_are_reassembled() -> Result<()> {
    let env = TestEnvironment::new()?;
    let trace = env.create_trace(&[
        "12499 rt_sigprocmask(SIG_SETMASK, [],  <unfinished ...>",
        "12500 openat(AT_FDCWD, \"out.o\", <unfinished ...>",
        "12499 <... rt_sigprocmask resumed> NULL, 8) = 0",
        "12500 <... openat resumed> O_WRONLY|O_CREAT|O_TRUNC, 0666) = 4",
        "[pid 12500] close(4) = 0",
    ])?;

    let result = env.convert(&trace, &[])?;
    result.assert_success()?;
    assert_eq!(
        result.stdout(),
        "sysop init SYNC {\n\t12499, setcwd \"/src\"\n}\n\
         sysop openat_4 SYNC {\n\t12500, newfd AT_FDCWD \"out.o\" 4\n\t12500, hpath AT_FDCWD \"out.o\" produced\n}\n\
         sysop close_5 SYNC {\n\t12500, delfd 4\n}\n"
    );
    Ok(())
}

#[test]
fn process_creation() -> Result<()> {
    let env = TestEnvironment::new()?;
    let trace = env.create_trace(&[
        "100 clone(child_stack=NULL, flags=CLONE_CHILD_CLEARTID|CLONE_CHILD_SETTID|SIGCHLD, child_tidptr=0x7f) = 101",
        "100 vfork() = ?",
        "100 fork() = -1 EAGAIN (Resource temporarily unavailable)",
    ])?;

    let result = env.convert(&trace, &[])?;
    result.assert_success()?;
    assert_eq!(result.stdout(), "sysop init SYNC {\n\t100, setcwd \"/src\"\n}\nsysop clone_1 SYNC {\n\t100, newproc none 101\n}\n");
    Ok(())
}

#[test]
fn unresolved_pointers_are_dropped() -> Result<()> {
    let env = TestEnvironment::new()?;
    let trace = env.create_trace(&["7 unlink(0x7ffd5e) = 0", "7 unlink(\"tmp.o\") = 0"])?;

    let result = env.convert(&trace, &[])?;
    result.assert_success()?;
    assert!(!result.stdout().contains("unlink_1"));
    assert!(result.stdout().contains("sysop unlink_2 SYNC {\n\t7, hpathsym AT_FDCWD \"tmp.o\" expunged\n}\n"));
    Ok(())
}

#[test]
fn conversion_is_deterministic() -> Result<()> {
    let env = TestEnvironment::new()?;
    let trace = env.create_trace(&[
        r#"100 write(2, "Makefile:1: ##BEGIN## all,a.o b.o\n", 35) = 35"#,
        r#"100 write(2, "Makefile:3: ##BEGIN## a.o,a.c\n", 30) = 30"#,
        r#"101 openat(AT_FDCWD, "a.c", O_RDONLY) = 3"#,
        r###"100 write(1, "##END##\n", 8) = 8"###,
        r#"100 write(2, "Makefile:3: ##BEGIN## b.o,b.c\n", 30) = 30"#,
        r###"100 write(1, "##END##\n##END##\n", 16) = 16"###,
    ])?;

    let first = env.convert(&trace, &[])?;
    let second = env.convert(&trace, &[])?;
    first.assert_success()?;
    assert_eq!(first.stdout(), second.stdout());
    Ok(())
}
