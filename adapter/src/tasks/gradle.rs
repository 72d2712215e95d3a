// SPDX-License-Identifier: GPL-3.0-or-later

//! Recognition of the Gradle task structure.
//!
//! The build is instrumented by a plugin, which prints `Begin <task>` and
//! `End <task>` around the task actions. The task graph is printed before
//! the execution, either in fstrace syntax already, or in the vocabulary of
//! the plugin:
//!
//! ```text
//! newEvent app:jar W 1
//! input /src/build/classes
//! output /src/build/libs/app.jar
//! link app:classes app:jar
//! ```
//!
//! The `input` and `output` lines belong to the last declared task.

use super::Emitted;
use crate::config;
use crate::output::Statement;
use crate::translate::Written;

/// The statements which are copied to the output as they are.
const KEYWORDS: &[&str] = &["newTask", "consumes", "produces", "dependsOn"];

pub struct GradleHandler {
    depth: usize,
    min_descriptor: i64,
    max_descriptor: i64,
    /// The task of the last `newEvent` line.
    declared: Option<String>,
}

impl GradleHandler {
    pub fn new(config: &config::Gradle) -> Self {
        Self {
            depth: 0,
            min_descriptor: config.min_descriptor,
            max_descriptor: config.max_descriptor,
            declared: None,
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn on_write(&mut self, written: &Written) -> Vec<Emitted> {
        if written.fd <= self.min_descriptor || written.fd >= self.max_descriptor {
            return vec![];
        }
        written.text.lines().filter_map(|line| self.on_line(line.trim())).collect()
    }

    fn on_line(&mut self, line: &str) -> Option<Emitted> {
        if let Some(task) = line.strip_prefix("Begin ") {
            let emitted = Emitted::new(self.depth, Statement::TaskBegin { id: task.trim().to_string() });
            log::debug!("Task begins: {} (depth {})", task.trim(), self.depth);
            self.depth += 1;
            Some(emitted)
        } else if line.starts_with("End ") {
            if self.depth == 0 {
                log::warn!("Task end without a task being executed, ignored: {line}");
                return None;
            }
            self.depth -= 1;
            log::debug!("Task ends (depth {})", self.depth);
            Some(Emitted::new(self.depth, Statement::TaskEnd))
        } else if line.split_whitespace().next().is_some_and(|word| KEYWORDS.contains(&word)) {
            Some(Emitted::new(self.depth, Statement::Verbatim(line.to_string())))
        } else {
            let statement = self.translate(line);
            if statement.is_none() {
                log::debug!("Gradle output ignored: {line}");
            }
            statement.map(|statement| Emitted::new(self.depth, statement))
        }
    }

    /// Translates the task graph lines of the plugin into statements.
    fn translate(&mut self, line: &str) -> Option<Statement> {
        let (keyword, rest) = line.split_once(' ')?;
        let rest = rest.trim();
        match keyword {
            "newEvent" => {
                let task = rest.split_whitespace().next()?;
                self.declared = Some(task.to_string());
                Some(Statement::Verbatim(format!("newTask {rest}")))
            }
            "input" => {
                let id = self.declared.clone()?;
                Some(Statement::Consumes { id, resource: rest.to_string() })
            }
            "output" => {
                let id = self.declared.clone()?;
                Some(Statement::Produces { id, resource: rest.to_string() })
            }
            "link" => match rest.split_whitespace().collect::<Vec<_>>().as_slice() {
                [dependency, dependent] => Some(Statement::DependsOn {
                    dependent: dependent.to_string(),
                    dependency: dependency.to_string(),
                }),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn finish(&mut self) -> Vec<Emitted> {
        if self.depth != 0 {
            log::warn!("Unbalanced task markers: {} task(s) not finished", self.depth);
        }
        vec![]
    }
}
