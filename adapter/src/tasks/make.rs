// SPDX-License-Identifier: GPL-3.0-or-later

//! Recognition of the Make task structure.
//!
//! The traced Make prints a marker at the start and at the end of every
//! recipe (with `$(warning ##BEGIN## $@,$^)` and `$(info ##END##)`), and
//! reports the directory changes of the recursive invocations. These end
//! up in `write` calls of the Make processes.

use super::dependencies::{Edge, Scopes};
use super::include::IncludeState;
use super::Emitted;
use crate::output::Statement;
use crate::trace::{Call, decode_string};
use crate::translate::{AT_FDCWD, Operation, Written};
use regex::Regex;
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

static TASK_BEGIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.*):([0-9]+): +##BEGIN##+ (.*),(.*)$").expect("Invalid task begin regex pattern")
});

static TASK_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:.*:[0-9]+: +)?##END##").expect("Invalid task end regex pattern"));

static DIRECTORY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:.*/)?g?make(?:\[[0-9]+\])?: (Entering|Leaving) directory ['`](.*)'$")
        .expect("Invalid directory change regex pattern")
});

/// The calls which look up a path and may discover a dependency file.
const STAT_FAMILY: &[&str] = &["stat", "stat64", "lstat", "lstat64", "newfstatat", "fstatat64", "statx"];

pub struct MakeHandler {
    depth: usize,
    /// The bottom entry is the working directory, which is never left.
    directories: Vec<String>,
    declared: HashSet<String>,
    /// The directory and target of the tasks being executed, innermost last.
    executing: Vec<(String, String)>,
    scopes: Scopes,
    /// Dependency files Make looked for.
    included: HashSet<String>,
    include: Option<IncludeState>,
    include_extension: String,
}

impl MakeHandler {
    pub fn new(working_directory: &str, include_extension: &str) -> Self {
        Self {
            depth: 0,
            directories: vec![working_directory.to_string()],
            declared: HashSet::new(),
            executing: Vec::new(),
            scopes: Scopes::default(),
            included: HashSet::new(),
            include: None,
            include_extension: include_extension.to_string(),
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    fn working_directory(&self) -> &str {
        &self.directories[0]
    }

    fn current_directory(&self) -> &str {
        self.directories.last().map_or(self.working_directory(), String::as_str)
    }

    pub fn on_write(&mut self, written: &Written) -> Vec<Emitted> {
        if let Some(include) = self.include.as_mut() {
            if include.matches(&written.pid, written.fd) {
                include.append(&written.text);
                return vec![];
            }
        }

        let mut result = Vec::new();
        for line in written.text.lines() {
            self.on_line(line.trim(), &mut result);
        }
        result
    }

    fn on_line(&mut self, line: &str, result: &mut Vec<Emitted>) {
        if let Some(captures) = TASK_BEGIN.captures(line) {
            let makefile = &captures[1];
            let target = captures[3].trim();
            let prerequisites: Vec<String> = captures[4]
                .split([' ', ','])
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect();
            self.begin(makefile, target, &prerequisites, result);
        } else if TASK_END.is_match(line) {
            self.end(result);
        } else if let Some(captures) = DIRECTORY.captures(line) {
            match &captures[1] {
                "Entering" => {
                    log::debug!("Entering directory: {}", &captures[2]);
                    self.directories.push(captures[2].to_string());
                }
                _ => {
                    log::debug!("Leaving directory: {}", &captures[2]);
                    if self.directories.len() > 1 {
                        self.directories.pop();
                    } else {
                        log::warn!("Leaving directory {}, which was not entered", &captures[2]);
                    }
                }
            }
        }
    }

    fn begin(&mut self, makefile: &str, target: &str, prerequisites: &[String], result: &mut Vec<Emitted>) {
        let directory = self.current_directory().to_string();
        let task_id = format!("{}_{}", Path::new(&directory).join(makefile).display(), target);
        log::debug!("Task begins: {task_id} (depth {})", self.depth);

        if self.declared.insert(task_id.clone()) {
            result.push(Emitted::new(self.depth, Statement::NewTask { id: task_id.clone() }));
        }
        let added = self.scopes.record(&directory, target, &task_id, prerequisites);
        self.consumes(&directory, &task_id, &added, result);
        let edges = self.scopes.resolve(&directory);
        self.depends_on(edges, result);

        result.push(Emitted::new(self.depth, Statement::TaskBegin { id: task_id }));
        self.executing.push((directory, target.to_string()));
        self.depth += 1;
    }

    fn end(&mut self, result: &mut Vec<Emitted>) {
        if self.depth == 0 {
            log::warn!("Task end marker without a task being executed, ignored");
            return;
        }
        self.depth -= 1;
        self.executing.pop();
        log::debug!("Task ends (depth {})", self.depth);
        result.push(Emitted::new(self.depth, Statement::TaskEnd));
    }

    fn consumes(&self, directory: &str, task_id: &str, prerequisites: &[String], result: &mut Vec<Emitted>) {
        for prerequisite in prerequisites {
            let resource = Path::new(directory).join(prerequisite).display().to_string();
            result.push(Emitted::new(self.depth, Statement::Consumes { id: task_id.to_string(), resource }));
        }
    }

    fn depends_on(&self, edges: Vec<Edge>, result: &mut Vec<Emitted>) {
        for Edge { dependent, dependency } in edges {
            result.push(Emitted::new(self.depth, Statement::DependsOn { dependent, dependency }));
        }
    }

    /// Looks for the dependency files among the translated operations.
    pub fn observe(&mut self, call: &Call, operations: &[Operation]) -> Vec<Emitted> {
        let mut result = Vec::new();
        for operation in operations {
            match operation {
                Operation::Touch { dirfd, path, .. } if STAT_FAMILY.contains(&call.name.as_str()) => {
                    let Some(path) = self.absolute(dirfd, path) else {
                        continue;
                    };
                    if self.is_include_file(&path) {
                        log::debug!("Dependency file looked up: {path}");
                        self.included.insert(path);
                    }
                }
                Operation::NewFd { dirfd, path, fd } if self.include.is_none() => {
                    let Some(path) = self.absolute(dirfd, path) else {
                        continue;
                    };
                    if self.included.contains(&path) {
                        self.include = self.start_include(&call.pid, *fd, &path);
                    }
                }
                Operation::DelFd { fd } => {
                    let closes = self.include.as_ref().is_some_and(|include| {
                        fd.parse::<i64>().is_ok_and(|fd| include.matches(&call.pid, fd))
                    });
                    if closes {
                        if let Some(include) = self.include.take() {
                            self.finish_include(include, &mut result);
                        }
                    }
                }
                _ => {}
            }
        }
        result
    }

    /// Unquotes the path, and makes it absolute and lexically normal.
    ///
    /// A relative path is resolved against the current directory of Make
    /// for `AT_FDCWD`, and against the descriptor path when the tracer
    /// printed one (`3</src/lib>`). Returns `None` when the base of the
    /// path is not known.
    fn absolute(&self, dirfd: &str, path: &str) -> Option<String> {
        let path = decode_string(path).unwrap_or_else(|| path.to_string());
        let base = if Path::new(&path).is_absolute() || dirfd == AT_FDCWD {
            self.current_directory()
        } else {
            descriptor_path(dirfd)?
        };
        Some(normalize(&Path::new(base).join(path)))
    }

    fn is_include_file(&self, path: &str) -> bool {
        Path::new(path).extension().is_some_and(|extension| extension == self.include_extension.as_str())
    }

    /// Finds the target of the dependency file in the current scope.
    ///
    /// More targets may share the name without extension (`foo.o` and
    /// `foo.h`), the ones being executed are preferred.
    fn start_include(&self, pid: &str, fd: i64, path: &str) -> Option<IncludeState> {
        let directory = self.current_directory();
        let relative = Path::new(path).strip_prefix(directory).ok()?;
        let stem = relative.with_extension("");
        let matches = |target: &str| Path::new(target).with_extension("") == stem;

        let executing = self
            .executing
            .iter()
            .rev()
            .find(|(scope, target)| scope == directory && matches(target.as_str()))
            .and_then(|(_, target)| self.scopes.target(directory, target).map(|found| (target, found)));
        let (target, found) =
            executing.or_else(|| self.scopes.targets(directory).find(|(target, _)| matches(target.as_str())))?;

        log::debug!("Dependency file {path} of {target} is written by process {pid}");
        Some(IncludeState::new(pid, fd, directory, target, &found.task_id))
    }

    fn finish_include(&mut self, include: IncludeState, result: &mut Vec<Emitted>) {
        let prerequisites = include.prerequisites(self.working_directory()).unwrap_or_else(|| {
            log::warn!("Dependency file of {} is malformed, ignored", include.target);
            vec![]
        });
        let added = self.scopes.record(&include.directory, &include.target, &include.task_id, &prerequisites);
        self.consumes(&include.directory, &include.task_id, &added, result);
        let edges = self.scopes.resolve(&include.directory);
        self.depends_on(edges, result);
    }

    pub fn finish(&mut self) -> Vec<Emitted> {
        let mut result = Vec::new();
        let edges = self.scopes.resolve_all();
        self.depends_on(edges, &mut result);

        if self.depth != 0 {
            log::warn!("Unbalanced task markers: {} task(s) not finished", self.depth);
        }
        if let Some(include) = self.include.take() {
            log::warn!("Dependency file of {} was not closed, ignored", include.target);
        }
        result
    }
}

/// The path of a descriptor argument, printed by the tracer as `3</path>`.
fn descriptor_path(dirfd: &str) -> Option<&str> {
    let (_, rest) = dirfd.split_once('<')?;
    rest.strip_suffix('>')
}

/// Drops the `.` components, and resolves the `..` components lexically.
fn normalize(path: &Path) -> String {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                result.pop();
            }
            other => result.push(other),
        }
    }
    result.display().to_string()
}
