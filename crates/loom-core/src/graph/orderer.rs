// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A stable constraint orderer built on Kahn's algorithm.
//!
//! Each entry carries an id and a list of constraints such as `"before:*"`,
//! `"after:Highlight"` or `"before:a,b"`. The result is a topological order
//! of the entries; whenever several entries are free to go next, the one
//! declared first wins, so unconstrained entries keep declaration order.

use ahash::AHashSet;
use std::collections::BTreeSet;
use std::fmt;

/// An error raised while declaring or ordering entries.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderError {
    /// Two entries were added with the same (case-insensitive) id.
    #[error("Duplicate ordering id '{0}'")]
    DuplicateId(String),
    /// A constraint string could not be parsed.
    #[error("Invalid ordering constraint '{constraint}' for '{id}': expected 'before:<ids>' or 'after:<ids>'")]
    InvalidConstraint {
        /// The entry declaring the constraint.
        id: String,
        /// The offending constraint text.
        constraint: String,
    },
    /// The constraints cannot all be satisfied.
    #[error("Ordering constraints form a cycle between: {}", .0.join(", "))]
    Cycle(Vec<String>),
}

/// Which entries a constraint refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// The `*` wildcard: every other entry.
    All,
    /// Explicit ids, matched case-insensitively.
    Ids(Vec<String>),
}

/// A parsed ordering constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    /// The entry must precede the targets.
    Before(Target),
    /// The entry must follow the targets.
    After(Target),
}

impl Constraint {
    /// Parses `before:<ids>` / `after:<ids>`; ids are comma separated, `*` is the wildcard.
    pub fn parse(text: &str) -> Option<Self> {
        let (kind, targets) = text.split_once(':')?;
        let targets = targets.trim();
        let target = if targets == "*" {
            Target::All
        } else {
            let ids: Vec<String> = targets
                .split(',')
                .map(|id| id.trim().to_lowercase())
                .filter(|id| !id.is_empty())
                .collect();
            if ids.is_empty() {
                return None;
            }
            Target::Ids(ids)
        };
        match kind.trim().to_lowercase().as_str() {
            "before" => Some(Constraint::Before(target)),
            "after" => Some(Constraint::After(target)),
            _ => None,
        }
    }

    fn is_before_all(&self) -> bool {
        matches!(self, Constraint::Before(Target::All))
    }

    fn is_after_all(&self) -> bool {
        matches!(self, Constraint::After(Target::All))
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (kind, target) = match self {
            Constraint::Before(target) => ("before", target),
            Constraint::After(target) => ("after", target),
        };
        match target {
            Target::All => write!(f, "{kind}:*"),
            Target::Ids(ids) => write!(f, "{kind}:{}", ids.join(",")),
        }
    }
}

struct Entry<T> {
    id: String,
    target: T,
    constraints: Vec<Constraint>,
}

/// Collects entries with ordering constraints and produces their order.
pub struct Orderer<T> {
    entries: Vec<Entry<T>>,
}

impl<T> Default for Orderer<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T> Orderer<T> {
    /// Creates an empty orderer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry with its constraints.
    pub fn add(&mut self, id: &str, target: T, constraints: &[&str]) -> Result<(), OrderError> {
        if self.position(id).is_some() {
            return Err(OrderError::DuplicateId(id.to_string()));
        }
        let parsed = constraints
            .iter()
            .map(|text| {
                Constraint::parse(text).ok_or_else(|| OrderError::InvalidConstraint {
                    id: id.to_string(),
                    constraint: text.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.entries.push(Entry {
            id: id.to_string(),
            target,
            constraints: parsed,
        });
        Ok(())
    }

    /// Number of entries added so far.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entries were added.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.id.eq_ignore_ascii_case(id))
    }

    fn edges(&self) -> AHashSet<(usize, usize)> {
        let mut edges = AHashSet::new();
        for (index, entry) in self.entries.iter().enumerate() {
            for constraint in &entry.constraints {
                match constraint {
                    Constraint::Before(Target::All) => {
                        for (other, candidate) in self.entries.iter().enumerate() {
                            if other != index && !candidate.constraints.iter().any(Constraint::is_before_all) {
                                edges.insert((index, other));
                            }
                        }
                    }
                    Constraint::After(Target::All) => {
                        for (other, candidate) in self.entries.iter().enumerate() {
                            if other != index && !candidate.constraints.iter().any(Constraint::is_after_all) {
                                edges.insert((other, index));
                            }
                        }
                    }
                    Constraint::Before(Target::Ids(ids)) | Constraint::After(Target::Ids(ids)) => {
                        for id in ids {
                            let Some(other) = self.position(id) else {
                                log::warn!(
                                    "Ordering constraint '{constraint}' of '{}' references unknown id '{id}'; ignored",
                                    entry.id
                                );
                                continue;
                            };
                            if other == index {
                                continue;
                            }
                            match constraint {
                                Constraint::Before(_) => edges.insert((index, other)),
                                Constraint::After(_) => edges.insert((other, index)),
                            };
                        }
                    }
                }
            }
        }
        edges
    }

    fn sorted_indices(&self) -> Result<Vec<usize>, OrderError> {
        let count = self.entries.len();
        let mut successors: Vec<Vec<usize>> = vec![Vec::new(); count];
        let mut in_degree = vec![0usize; count];

        for (parent, child) in self.edges() {
            successors[parent].push(child);
            in_degree[child] += 1;
        }

        // Ready entries, smallest declaration index first.
        let mut ready: BTreeSet<usize> = (0..count).filter(|&i| in_degree[i] == 0).collect();
        let mut sorted = Vec::with_capacity(count);
        while let Some(next) = ready.pop_first() {
            sorted.push(next);
            for &child in &successors[next] {
                in_degree[child] -= 1;
                if in_degree[child] == 0 {
                    ready.insert(child);
                }
            }
        }

        if sorted.len() != count {
            let stuck = (0..count)
                .filter(|i| in_degree[*i] > 0)
                .map(|i| self.entries[i].id.clone())
                .collect();
            return Err(OrderError::Cycle(stuck));
        }
        Ok(sorted)
    }

    /// Ids in their resolved order.
    pub fn ordered_ids(&self) -> Result<Vec<String>, OrderError> {
        Ok(self
            .sorted_indices()?
            .into_iter()
            .map(|i| self.entries[i].id.clone())
            .collect())
    }

    /// Consumes the orderer, returning `(id, target)` pairs in resolved order.
    pub fn into_ordered(self) -> Result<Vec<(String, T)>, OrderError> {
        let order = self.sorted_indices()?;
        let mut slots: Vec<Option<Entry<T>>> = self.entries.into_iter().map(Some).collect();
        Ok(order
            .into_iter()
            .filter_map(|i| slots[i].take())
            .map(|entry| (entry.id, entry.target))
            .collect())
    }
}
