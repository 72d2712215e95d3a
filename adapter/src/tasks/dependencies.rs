// SPDX-License-Identifier: GPL-3.0-or-later

//! Inference of the dependencies between Make tasks.
//!
//! Make runs the recipe of a target after the recipes of its prerequisites.
//! When a prerequisite is itself a target of the same directory scope, the
//! task of the target depends on the task of the prerequisite. Prerequisite
//! names are not resolved across directories.

use std::collections::{BTreeMap, HashSet};

/// A target and the task which builds it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub task_id: String,
    pub prerequisites: Vec<String>,
}

/// A `dependsOn` relation between two tasks.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Edge {
    pub dependent: String,
    pub dependency: String,
}

/// The known targets per directory, with the edges already reported.
#[derive(Debug, Default)]
pub struct Scopes {
    scopes: BTreeMap<String, BTreeMap<String, Target>>,
    emitted: HashSet<Edge>,
}

impl Scopes {
    /// Records the target and its prerequisites. Returns the prerequisites
    /// which were not known for this target before.
    ///
    /// When a target is recorded again, the prerequisites are merged and
    /// the first task id is kept.
    pub fn record(&mut self, directory: &str, target: &str, task_id: &str, prerequisites: &[String]) -> Vec<String> {
        let entry = self
            .scopes
            .entry(directory.to_string())
            .or_default()
            .entry(target.to_string())
            .or_insert_with(|| Target { task_id: task_id.to_string(), prerequisites: vec![] });

        if entry.task_id != task_id {
            log::debug!("Target {target} in {directory} is built by {} already, not by {task_id}", entry.task_id);
        }

        let mut added = Vec::new();
        for prerequisite in prerequisites {
            if !entry.prerequisites.contains(prerequisite) {
                entry.prerequisites.push(prerequisite.clone());
                added.push(prerequisite.clone());
            }
        }
        added
    }

    /// Returns the target recorded in the directory scope.
    pub fn target(&self, directory: &str, target: &str) -> Option<&Target> {
        self.scopes.get(directory).and_then(|scope| scope.get(target))
    }

    /// Iterates over the targets of a directory scope, in name order.
    pub fn targets<'a>(&'a self, directory: &str) -> impl Iterator<Item = (&'a String, &'a Target)> + use<'a> {
        self.scopes.get(directory).into_iter().flat_map(|scope| scope.iter())
    }

    /// Returns the edges of the directory scope which were not reported yet.
    pub fn resolve(&mut self, directory: &str) -> Vec<Edge> {
        let Some(scope) = self.scopes.get(directory) else {
            return vec![];
        };
        let mut result = Vec::new();
        for target in scope.values() {
            for prerequisite in &target.prerequisites {
                let Some(dependency) = scope.get(prerequisite) else {
                    continue;
                };
                if dependency.task_id == target.task_id {
                    continue;
                }
                let edge = Edge { dependent: target.task_id.clone(), dependency: dependency.task_id.clone() };
                if self.emitted.insert(edge.clone()) {
                    result.push(edge);
                }
            }
        }
        result
    }

    /// Returns the edges of every scope which were not reported yet.
    pub fn resolve_all(&mut self) -> Vec<Edge> {
        let directories: Vec<String> = self.scopes.keys().cloned().collect();
        directories.iter().flat_map(|directory| self.resolve(directory)).collect()
    }
}
