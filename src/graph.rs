//! Dependency graph resolution and readiness ordering.
//!
//! The graph is built once from the full unit list and is immutable
//! afterwards. Cycle and unknown-reference detection happen at
//! construction, so runtime readiness queries are a pure function of
//! current task statuses.

use std::collections::HashMap;

use crate::errors::GraphError;
use crate::store::{StatusSnapshot, TaskState};
use crate::unit::Unit;

/// A validated, acyclic dependency graph over units.
#[derive(Debug)]
pub struct DependencyGraph {
    units: Vec<Unit>,
    by_name: HashMap<String, usize>,
    /// Direct dependents (reverse edges), by unit index.
    rdeps: Vec<Vec<usize>>,
}

impl DependencyGraph {
    /// Builds and validates the graph from units in declaration order.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownDependency`] if a declared
    /// dependency matches no unit name, or [`GraphError::Cycle`] naming
    /// a unit on the offending cycle if the relation is not a DAG.
    pub fn build(units: Vec<Unit>) -> Result<Self, GraphError> {
        let by_name: HashMap<String, usize> =
            units.iter().enumerate().map(|(i, u)| (u.name.clone(), i)).collect();

        let mut rdeps = vec![Vec::new(); units.len()];
        for (i, unit) in units.iter().enumerate() {
            for dep in &unit.dependencies {
                match by_name.get(dep) {
                    Some(&j) => rdeps[j].push(i),
                    None => {
                        return Err(GraphError::UnknownDependency {
                            unit: unit.name.clone(),
                            dependency: dep.clone(),
                        })
                    }
                }
            }
        }

        let graph = Self { units, by_name, rdeps };
        graph.check_acyclic()?;
        Ok(graph)
    }

    /// Three-color DFS over dependency edges; a back edge is a cycle.
    fn check_acyclic(&self) -> Result<(), GraphError> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            White,
            Gray,
            Black,
        }

        let mut marks = vec![Mark::White; self.units.len()];
        for start in 0..self.units.len() {
            if marks[start] != Mark::White {
                continue;
            }
            // Iterative DFS; the stack holds (node, next dependency offset).
            let mut stack = vec![(start, 0usize)];
            marks[start] = Mark::Gray;
            while let Some(frame) = stack.last_mut() {
                let (node, offset) = *frame;
                let deps = &self.units[node].dependencies;
                if offset < deps.len() {
                    frame.1 += 1;
                    let next = self.by_name[&deps[offset]];
                    match marks[next] {
                        Mark::White => {
                            marks[next] = Mark::Gray;
                            stack.push((next, 0));
                        }
                        Mark::Gray => {
                            return Err(GraphError::Cycle {
                                unit: self.units[next].name.clone(),
                            })
                        }
                        Mark::Black => {}
                    }
                } else {
                    marks[node] = Mark::Black;
                    stack.pop();
                }
            }
        }
        Ok(())
    }

    /// All units in declaration order.
    #[must_use]
    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    /// Looks up a unit by name.
    #[must_use]
    pub fn unit(&self, name: &str) -> Option<&Unit> {
        self.by_name.get(name).map(|&i| &self.units[i])
    }

    /// Returns the next unit eligible to start, or `None`.
    ///
    /// A unit is ready iff its status is Pending and every dependency
    /// is Succeeded. Ties break by declaration order, so runs are
    /// reproducible. Performs no mutation.
    #[must_use]
    pub fn next_ready<'a>(&'a self, snapshot: &StatusSnapshot) -> Option<&'a Unit> {
        self.units.iter().find(|unit| {
            snapshot.get(&unit.name).is_some_and(|r| r.state == TaskState::Pending)
                && unit.dependencies.iter().all(|dep| {
                    snapshot.get(dep).is_some_and(|r| r.state == TaskState::Succeeded)
                })
        })
    }

    /// Names of all units that transitively depend on `name`, in
    /// declaration order.
    #[must_use]
    pub fn dependents_of(&self, name: &str) -> Vec<String> {
        let Some(&start) = self.by_name.get(name) else {
            return Vec::new();
        };
        let mut seen = vec![false; self.units.len()];
        let mut queue = std::collections::VecDeque::from([start]);
        while let Some(node) = queue.pop_front() {
            for &dep in &self.rdeps[node] {
                if !seen[dep] {
                    seen[dep] = true;
                    queue.push_back(dep);
                }
            }
        }
        self.units
            .iter()
            .enumerate()
            .filter(|&(i, _)| seen[i])
            .map(|(_, u)| u.name.clone())
            .collect()
    }
}
