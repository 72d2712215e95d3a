// SPDX-License-Identifier: GPL-3.0-or-later

use std::collections::HashMap;

/// Calls which were interrupted by the output of another process.
///
/// An entry holds the argument text printed before the interruption. It is
/// keyed by process id and call name: one process can't have two calls of
/// the same name in flight.
#[derive(Debug, Default)]
pub struct PendingCalls {
    entries: HashMap<(String, String), Fragment>,
}

#[derive(Debug)]
struct Fragment {
    text: String,
    line: usize,
}

/// A call that was reported unfinished and never resumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Abandoned {
    pub pid: String,
    pub name: String,
    pub line: usize,
}

impl PendingCalls {
    /// Stores the fragment. Returns the line number of the fragment it
    /// replaced, if there was one for the same key.
    pub fn insert(&mut self, pid: &str, name: &str, text: &str, line: usize) -> Option<usize> {
        let fragment = Fragment { text: text.to_string(), line };
        self.entries
            .insert((pid.to_string(), name.to_string()), fragment)
            .map(|previous| previous.line)
    }

    /// Removes and returns the stored fragment text.
    pub fn take(&mut self, pid: &str, name: &str) -> Option<String> {
        self.entries.remove(&(pid.to_string(), name.to_string())).map(|fragment| fragment.text)
    }

    pub fn contains(&self, pid: &str, name: &str) -> bool {
        self.line_of(pid, name).is_some()
    }

    /// The line number where the pending call was started.
    pub fn line_of(&self, pid: &str, name: &str) -> Option<usize> {
        self.entries.get(&(pid.to_string(), name.to_string())).map(|fragment| fragment.line)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drains the table, in the order the calls were started.
    pub fn drain(&mut self) -> Vec<Abandoned> {
        let mut result: Vec<Abandoned> = self
            .entries
            .drain()
            .map(|((pid, name), fragment)| Abandoned { pid, name, line: fragment.line })
            .collect();
        result.sort_by_key(|abandoned| abandoned.line);
        result
    }
}
