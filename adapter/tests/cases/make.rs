// SPDX-License-Identifier: GPL-3.0-or-later

use crate::fixtures::*;
use anyhow::Result;

#[test]
fn nested_tasks_are_indented() -> Result<()> {
    let env = TestEnvironment::new()?;
    let trace = env.create_trace(&[
        r#"100 write(2, "Makefile:1: ##BEGIN## all,main\n", 31) = 31"#,
        r#"101 write(2, "Makefile:4: ##BEGIN## main,main.c\n", 35) = 35"#,
        r#"102 openat(AT_FDCWD, "main.c", O_RDONLY) = 3"#,
        r###"101 write(1, "##END##\n", 8) = 8"###,
        r###"100 write(1, "##END##\n", 8) = 8"###,
    ])?;

    let result = env.convert(&trace, &[])?;
    result.assert_success()?;
    assert_eq!(
        result.stdout(),
        [
            "sysop init SYNC {",
            "\t100, setcwd \"/src\"",
            "}",
            "newTask /src/Makefile_all S 0",
            "consumes /src/Makefile_all \"/src/main\"",
            "execTask /src/Makefile_all {",
            "\tnewTask /src/Makefile_main S 0",
            "\tconsumes /src/Makefile_main \"/src/main.c\"",
            "\tdependsOn /src/Makefile_all /src/Makefile_main",
            "\texecTask /src/Makefile_main {",
            "\t\tsysop openat_3 SYNC {",
            "\t\t\t102, newfd AT_FDCWD \"main.c\" 3",
            "\t\t\t102, hpath AT_FDCWD \"main.c\" consumed",
            "\t\t}",
            "\t}",
            "}",
            "",
        ]
        .join("\n")
    );
    Ok(())
}

#[test]
fn recursive_make_scopes_the_targets() -> Result<()> {
    let env = TestEnvironment::new()?;
    let trace = env.create_trace(&[
        r#"100 write(2, "Makefile:2: ##BEGIN## all,\n", 27) = 27"#,
        r#"101 write(1, "make[1]: Entering directory '/src/lib'\n", 39) = 39"#,
        r#"101 write(2, "Makefile:1: ##BEGIN## lib.a,x.o\n", 33) = 33"#,
        r###"101 write(1, "##END##\n", 8) = 8"###,
        r#"101 write(1, "make[1]: Leaving directory '/src/lib'\n", 38) = 38"#,
        r###"100 write(1, "##END##\n", 8) = 8"###,
    ])?;

    let result = env.convert(&trace, &[])?;
    result.assert_success()?;
    assert_eq!(
        result.stdout(),
        [
            "sysop init SYNC {",
            "\t100, setcwd \"/src\"",
            "}",
            "newTask /src/Makefile_all S 0",
            "execTask /src/Makefile_all {",
            "\tnewTask /src/lib/Makefile_lib.a S 0",
            "\tconsumes /src/lib/Makefile_lib.a \"/src/lib/x.o\"",
            "\texecTask /src/lib/Makefile_lib.a {",
            "\t}",
            "}",
            "",
        ]
        .join("\n")
    );
    Ok(())
}

#[test]
fn dependency_file_adds_prerequisites() -> Result<()> {
    let env = TestEnvironment::new()?;
    let trace = env.create_trace(&[
        r#"100 stat("foo.d", 0x7ffc) = -1 ENOENT (No such file or directory)"#,
        r#"100 write(2, "Makefile:4: ##BEGIN## all,foo.o\n", 33) = 33"#,
        r#"100 write(2, "Makefile:7: ##BEGIN## foo.o,foo.c\n", 34) = 34"#,
        r#"101 openat(AT_FDCWD, "foo.d", O_WRONLY|O_CREAT|O_TRUNC, 0666) = 3"#,
        r#"101 write(3, "foo.o: foo.c foo.h \\\n /usr/include/stdio.h\n", 43) = 43"#,
        r#"101 close(3) = 0"#,
        r###"100 write(1, "##END##\n", 8) = 8"###,
        r###"100 write(1, "##END##\n", 8) = 8"###,
    ])?;

    let result = env.convert(&trace, &[])?;
    result.assert_success()?;
    assert_eq!(
        result.stdout(),
        [
            "sysop init SYNC {",
            "\t100, setcwd \"/src\"",
            "}",
            "sysop stat_1 SYNC {",
            "\t100, hpath AT_FDCWD \"foo.d\" consumed !failed",
            "}",
            "newTask /src/Makefile_all S 0",
            "consumes /src/Makefile_all \"/src/foo.o\"",
            "execTask /src/Makefile_all {",
            "\tnewTask /src/Makefile_foo.o S 0",
            "\tconsumes /src/Makefile_foo.o \"/src/foo.c\"",
            "\tdependsOn /src/Makefile_all /src/Makefile_foo.o",
            "\texecTask /src/Makefile_foo.o {",
            "\t\tsysop openat_4 SYNC {",
            "\t\t\t101, newfd AT_FDCWD \"foo.d\" 3",
            "\t\t\t101, hpath AT_FDCWD \"foo.d\" produced",
            "\t\t}",
            "\t\tsysop close_6 SYNC {",
            "\t\t\t101, delfd 3",
            "\t\t}",
            "\t\tconsumes /src/Makefile_foo.o \"/src/foo.h\"",
            "\t}",
            "}",
            "",
        ]
        .join("\n")
    );
    Ok(())
}

#[test]
fn unbalanced_end_marker_is_ignored() -> Result<()> {
    let env = TestEnvironment::new()?;
    let trace = env.create_trace(&[
        r###"100 write(1, "##END##\n", 8) = 8"###,
        r#"100 write(2, "Makefile:1: ##BEGIN## all,\n", 27) = 27"#,
        r###"100 write(1, "##END##\n", 8) = 8"###,
    ])?;

    let result = env.convert(&trace, &[])?;
    result.assert_success()?;
    assert!(result.stdout().ends_with("execTask /src/Makefile_all {\n}\n"));
    assert!(result.stderr().contains("Task end marker without a task"));
    Ok(())
}
