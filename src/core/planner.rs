//! Step ordering from requisite edges.
//!
//! Builds a DAG over every step in a [`DependencyClosure`] and computes a
//! topological order using Kahn's algorithm with alphabetical tie-breaking,
//! so the same closure always yields the same order.

use super::error::{CookError, Result};
use super::types::{DependencyClosure, RequisiteKind, StepId};
use indexmap::IndexMap;
use std::collections::{BTreeSet, HashMap, VecDeque};
use tracing::debug;

/// Topological step order plus the watch triggers of each step.
#[derive(Debug, Clone, Default)]
pub struct StepOrder {
    /// Every step, each after all of its requisites.
    pub order: Vec<StepId>,

    /// Watched step → steps that re-run when it changes.
    pub triggers: IndexMap<StepId, Vec<StepId>>,
}

impl StepOrder {
    pub fn position(&self, step: &StepId) -> Option<usize> {
        self.order.iter().position(|s| s == step)
    }
}

/// Order the steps of `closure` so every requisite runs first.
pub fn order_steps(closure: &DependencyClosure) -> Result<StepOrder> {
    let mut in_degree: HashMap<&StepId, usize> = closure.steps.iter().map(|s| (s, 0)).collect();
    let mut adjacency: HashMap<&StepId, Vec<&StepId>> = HashMap::new();
    let mut triggers: IndexMap<StepId, Vec<StepId>> = IndexMap::new();

    for edge in &closure.requisites {
        let from = closure
            .steps
            .get(&edge.from)
            .ok_or_else(|| unknown(&edge.from, &edge.from))?;
        let to = closure
            .canonical_step(&edge.to)
            .ok_or_else(|| unknown(&edge.from, &edge.to))?;
        let dependents = adjacency.entry(to).or_default();
        if !dependents.contains(&from) {
            dependents.push(from);
            *in_degree.entry(from).or_default() += 1;
        }
        if edge.kind == RequisiteKind::Watch {
            let watchers = triggers.entry(to.clone()).or_default();
            if !watchers.contains(from) {
                watchers.push(from.clone());
            }
        }
    }

    // Kahn's algorithm; the BTreeSet keeps ready steps sorted.
    let mut ready: BTreeSet<&StepId> = in_degree
        .iter()
        .filter(|(_, &d)| d == 0)
        .map(|(id, _)| *id)
        .collect();
    let mut queue: VecDeque<&StepId> = VecDeque::new();
    queue.extend(std::mem::take(&mut ready));

    let mut order = Vec::with_capacity(closure.steps.len());
    while let Some(current) = queue.pop_front() {
        order.push(current.clone());
        if let Some(dependents) = adjacency.get(current) {
            for dependent in dependents {
                if let Some(degree) = in_degree.get_mut(dependent) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.insert(*dependent);
                    }
                }
            }
        }
        queue.extend(std::mem::take(&mut ready));
    }

    if order.len() != closure.steps.len() {
        let mut members: Vec<String> = in_degree
            .iter()
            .filter(|(_, &d)| d > 0)
            .map(|(id, _)| id.to_string())
            .collect();
        members.sort();
        return Err(CookError::RequisiteCycle { members });
    }

    debug!(steps = order.len(), watched = triggers.len(), "ordered steps");
    Ok(StepOrder { order, triggers })
}

fn unknown(from: &StepId, to: &StepId) -> CookError {
    CookError::UnknownStep {
        from: from.to_string(),
        to: to.to_string(),
    }
}
