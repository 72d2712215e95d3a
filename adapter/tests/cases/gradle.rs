// SPDX-License-Identifier: GPL-3.0-or-later

use crate::fixtures::*;
use anyhow::Result;

#[test]
fn gradle_tasks_and_statements() -> Result<()> {
    let env = TestEnvironment::new()?;
    let trace = env.create_trace(&[
        r#"300 write(7, "newTask :jar W 0\n", 17) = 17"#,
        r#"300 write(7, "Begin :jar\n", 11) = 11"#,
        r#"301 openat(AT_FDCWD, "build/app.jar", O_WRONLY|O_CREAT|O_TRUNC, 0644) = 9"#,
        r#"300 write(1, "Begin :ignored\n", 15) = 15"#,
        r#"300 write(7, "produces :jar \"build/app.jar\"\n", 31) = 31"#,
        r#"300 write(7, "End :jar\n", 9) = 9"#,
    ])?;

    let result = env.convert(&trace, &["--build-tool", "gradle"])?;
    result.assert_success()?;
    assert_eq!(
        result.stdout(),
        [
            "sysop init SYNC {",
            "\t300, setcwd \"/src\"",
            "}",
            "newTask :jar W 0",
            "execTask :jar {",
            "\tsysop openat_3 SYNC {",
            "\t\t301, newfd AT_FDCWD \"build/app.jar\" 9",
            "\t\t301, hpath AT_FDCWD \"build/app.jar\" produced",
            "\t}",
            "\tproduces :jar \"build/app.jar\"",
            "}",
            "",
        ]
        .join("\n")
    );
    Ok(())
}

#[test]
fn make_markers_are_not_gradle_markers() -> Result<()> {
    let env = TestEnvironment::new()?;
    let trace = env.create_trace(&[r#"100 write(5, "Makefile:1: ##BEGIN## all,\n", 27) = 27"#])?;

    let result = env.convert(&trace, &["-b", "gradle"])?;
    result.assert_success()?;
    assert_eq!(result.stdout(), "sysop init SYNC {\n\t100, setcwd \"/src\"\n}\n");
    Ok(())
}

#[test]
fn gradle_plugin_task_graph() -> Result<()> {
    let env = TestEnvironment::new()?;
    let trace = env.create_trace(&[
        r#"300 write(7, "newEvent app:jar W 1\n", 21) = 21"#,
        r#"300 write(7, "input /src/build/classes\n", 25) = 25"#,
        r#"300 write(7, "output /src/build/libs/app.jar\n", 31) = 31"#,
        r#"300 write(7, "link app:classes app:jar\n", 24) = 24"#,
        r#"300 write(7, "Begin app:jar\n", 14) = 14"#,
        r#"300 write(7, "End app:jar\n", 12) = 12"#,
    ])?;

    let result = env.convert(&trace, &["--build-tool", "gradle"])?;
    result.assert_success()?;
    assert_eq!(
        result.stdout(),
        [
            "sysop init SYNC {",
            "\t300, setcwd \"/src\"",
            "}",
            "newTask app:jar W 1",
            "consumes app:jar \"/src/build/classes\"",
            "produces app:jar \"/src/build/libs/app.jar\"",
            "dependsOn app:jar app:classes",
            "execTask app:jar {",
            "}",
            "",
        ]
        .join("\n")
    );
    Ok(())
}
