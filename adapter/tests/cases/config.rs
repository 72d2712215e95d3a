// SPDX-License-Identifier: GPL-3.0-or-later

use crate::fixtures::*;
use anyhow::Result;

#[test]
fn unknown_calls_can_be_skipped() -> Result<()> {
    let env = TestEnvironment::new()?;
    let trace = env.create_trace(&["1 frobnicate(3) = 0", "1 frobnicate(4) = 0", "1 close(3) = 0"])?;
    let config = env.create_config("schema: 1.0\ntranslation:\n  unknown_calls: skip\n")?;

    let result = env.convert(&trace, &["--config", &config.to_string_lossy()])?;
    result.assert_success()?;
    assert!(result.stdout().contains("sysop close_3 SYNC {\n\t1, delfd 3\n}\n"));
    assert_eq!(result.stderr().matches("unknown system call: frobnicate").count(), 1);
    Ok(())
}

#[test]
fn orphan_resumed_calls_can_be_skipped() -> Result<()> {
    let env = TestEnvironment::new()?;
    let trace = env.create_trace(&["2 <... read resumed> \"abc\", 3) = 3", "2 close(3) = 0"])?;
    let config = env.create_config("schema: 1.0\nparser:\n  orphan_resumed: skip\n")?;

    let result = env.convert(&trace, &["--config", &config.to_string_lossy()])?;
    result.assert_success()?;
    assert!(result.stdout().contains("sysop close_2 SYNC {"));
    Ok(())
}

#[test]
fn duplicate_unfinished_calls_can_fail() -> Result<()> {
    let env = TestEnvironment::new()?;
    let trace = env.create_trace(&[
        "2 openat(AT_FDCWD, \"a\", <unfinished ...>",
        "2 openat(AT_FDCWD, \"b\", <unfinished ...>",
        "2 <... openat resumed> O_RDONLY) = 3",
    ])?;

    let result = env.convert(&trace, &[])?;
    result.assert_success()?;
    assert!(result.stdout().contains("newfd AT_FDCWD \"b\" 3"));

    let config = env.create_config("schema: 1.0\nparser:\n  duplicate_unfinished: fail\n")?;
    let result = env.convert(&trace, &["--config", &config.to_string_lossy()])?;
    result.assert_failure()?;
    Ok(())
}

#[test]
fn config_file_in_current_directory_is_found() -> Result<()> {
    let env = TestEnvironment::new()?;
    let trace = env.create_trace(&["1 frobnicate(3) = 0"])?;
    std::fs::write(env.temp_dir().join("fsracer-adapter.yml"), "schema: 1.0\ntranslation:\n  unknown_calls: skip\n")?;

    let result = env.convert(&trace, &[])?;
    result.assert_success()?;
    Ok(())
}

#[test]
fn custom_dependency_file_extension() -> Result<()> {
    let env = TestEnvironment::new()?;
    let trace = env.create_trace(&[
        r#"100 stat("foo.dep", 0x7ffc) = -1 ENOENT (No such file or directory)"#,
        r#"100 write(2, "Makefile:7: ##BEGIN## foo.o,foo.c\n", 34) = 34"#,
        r#"101 openat(AT_FDCWD, "foo.dep", O_WRONLY|O_CREAT|O_TRUNC, 0666) = 3"#,
        r#"101 write(3, "foo.o: foo.c foo.h\n", 19) = 19"#,
        r#"101 close(3) = 0"#,
        r###"100 write(1, "##END##\n", 8) = 8"###,
    ])?;
    let config = env.create_config("schema: 1.0\nmake:\n  include_extension: dep\n")?;

    let result = env.convert(&trace, &["--config", &config.to_string_lossy()])?;
    result.assert_success()?;
    assert!(result.stdout().contains("\tconsumes /src/Makefile_foo.o \"/src/foo.h\"\n"));
    Ok(())
}
