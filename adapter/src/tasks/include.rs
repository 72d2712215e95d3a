// SPDX-License-Identifier: GPL-3.0-or-later

//! Capture of the dependency files the compiler writes for Make.
//!
//! With `-MD` (or `-MMD`) the compiler writes a small makefile next to the
//! object file, which lists the headers of the translation unit as
//! prerequisites of the object. The makefile includes these files, so the
//! listed headers are prerequisites of the target as well.

use std::path::Path;

/// A dependency file which is being written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeState {
    pub pid: String,
    pub fd: i64,
    /// The directory scope of the target.
    pub directory: String,
    pub target: String,
    pub task_id: String,
    contents: String,
}

impl IncludeState {
    pub fn new(pid: &str, fd: i64, directory: &str, target: &str, task_id: &str) -> Self {
        Self {
            pid: pid.to_string(),
            fd,
            directory: directory.to_string(),
            target: target.to_string(),
            task_id: task_id.to_string(),
            contents: String::new(),
        }
    }

    pub fn matches(&self, pid: &str, fd: i64) -> bool {
        self.pid == pid && self.fd == fd
    }

    pub fn append(&mut self, text: &str) {
        self.contents.push_str(text);
    }

    /// Parses the written content into prerequisites of the target.
    ///
    /// Returns `None` when the content is not a rule list.
    pub fn prerequisites(&self, working_directory: &str) -> Option<Vec<String>> {
        let prerequisites = parse_rules(&self.contents)?;
        Some(
            prerequisites
                .into_iter()
                .filter_map(|prerequisite| relativize(&prerequisite, &self.directory, working_directory))
                .collect(),
        )
    }
}

/// Collects the prerequisites of every rule in the text.
///
/// Line continuations are joined, and escaped spaces are kept as part of
/// the name. Returns `None` if the text has no rule separator at all.
pub fn parse_rules(text: &str) -> Option<Vec<String>> {
    let joined = text.replace("\\\r\n", " ").replace("\\\n", " ");
    if !joined.contains(':') {
        return None;
    }

    let mut result: Vec<String> = Vec::new();
    for line in joined.lines() {
        let Some((_, prerequisites)) = line.split_once(':') else {
            continue;
        };
        for name in split_names(prerequisites) {
            if !result.contains(&name) {
                result.push(name);
            }
        }
    }
    Some(result)
}

/// Splits on whitespace, except the escaped ones.
fn split_names(text: &str) -> Vec<String> {
    let mut result = Vec::new();
    let mut current = String::new();
    let mut characters = text.chars().peekable();

    while let Some(character) = characters.next() {
        match character {
            '\\' if characters.peek() == Some(&' ') => {
                current.push(' ');
                characters.next();
            }
            c if c.is_whitespace() => {
                if !current.is_empty() {
                    result.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        result.push(current);
    }
    result
}

/// Makes the prerequisite relative to the scope directory when possible.
/// Absolute paths outside of the working directory (system headers) are
/// dropped.
fn relativize(prerequisite: &str, directory: &str, working_directory: &str) -> Option<String> {
    let path = Path::new(prerequisite);
    if !path.is_absolute() {
        return Some(prerequisite.to_string());
    }
    if let Ok(relative) = path.strip_prefix(directory) {
        return (!relative.as_os_str().is_empty()).then(|| relative.display().to_string());
    }
    path.starts_with(working_directory).then(|| prerequisite.to_string())
}
