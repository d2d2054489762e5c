//! Dependency graph: tracks `depends_on`/`blocks` edges between tasks and
//! yields the set of tasks ready to dispatch.
//!
//! Cycle detection is Kahn's algorithm over a dense integer adjacency
//! list, the same approach `plan::parser::check_for_cycles` uses to
//! validate a `plan.toml`'s task dependencies -- generalized here from a
//! one-shot validation over a parsed file into a live, mutable graph that
//! tasks are added to one at a time.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use agentor_types::TaskId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeState {
    Pending,
    Completed,
    Failed,
    Blocked,
}

struct Node {
    dependencies: BTreeSet<TaskId>,
    dependents: BTreeSet<TaskId>,
    state: NodeState,
}

/// Live dependency graph over task ids. Holds no back-reference into
/// `Task` records (ownership note in §3): callers pair a `TaskId` here
/// with whatever task store they use to look up full records.
#[derive(Default)]
pub struct DependencyGraph {
    nodes: HashMap<TaskId, Node>,
}

/// A dependency set would introduce a cycle, or references an unknown
/// task.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("dependency cycle detected involving tasks: {0:?}")]
    CycleDetected(Vec<TaskId>),

    #[error("task {0} depends on unknown task {1}")]
    UnknownDependency(TaskId, TaskId),
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a task with its dependency set. Fails (leaving the graph
    /// unchanged) if any dependency is unknown or if adding this node
    /// would introduce a cycle.
    pub fn add(&mut self, task_id: TaskId, dependencies: BTreeSet<TaskId>) -> Result<(), GraphError> {
        for dep in &dependencies {
            if !self.nodes.contains_key(dep) {
                return Err(GraphError::UnknownDependency(task_id, *dep));
            }
        }

        // Tentatively insert, then verify acyclicity; roll back on failure
        // so a rejected submission never mutates the graph (§4.4 invariant).
        self.nodes.insert(
            task_id,
            Node {
                dependencies: dependencies.clone(),
                dependents: BTreeSet::new(),
                state: NodeState::Pending,
            },
        );
        for dep in &dependencies {
            self.nodes.get_mut(dep).unwrap().dependents.insert(task_id);
        }

        if let Err(cycle) = self.check_for_cycles() {
            for dep in &dependencies {
                self.nodes.get_mut(dep).unwrap().dependents.remove(&task_id);
            }
            self.nodes.remove(&task_id);
            return Err(GraphError::CycleDetected(cycle));
        }

        Ok(())
    }

    /// Kahn's algorithm: build in-degree counts over the live node set and
    /// peel off zero-in-degree nodes. If fewer than `n` nodes are ever
    /// peeled, the remainder form at least one cycle.
    fn check_for_cycles(&self) -> Result<(), Vec<TaskId>> {
        let ids: Vec<TaskId> = self.nodes.keys().copied().collect();
        let index: HashMap<TaskId, usize> =
            ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();

        let n = ids.len();
        let mut in_degree = vec![0usize; n];
        let mut adj: Vec<Vec<usize>> = vec![Vec::new(); n];

        for (id, node) in &self.nodes {
            let task_idx = index[id];
            for dep in &node.dependencies {
                let dep_idx = index[dep];
                adj[dep_idx].push(task_idx);
                in_degree[task_idx] += 1;
            }
        }

        let mut queue: VecDeque<usize> = VecDeque::new();
        for (i, deg) in in_degree.iter().enumerate() {
            if *deg == 0 {
                queue.push_back(i);
            }
        }

        let mut sorted_count = 0usize;
        while let Some(node) = queue.pop_front() {
            sorted_count += 1;
            for &neighbor in &adj[node] {
                in_degree[neighbor] -= 1;
                if in_degree[neighbor] == 0 {
                    queue.push_back(neighbor);
                }
            }
        }

        if sorted_count != n {
            let cycle: Vec<TaskId> = in_degree
                .iter()
                .enumerate()
                .filter(|(_, deg)| **deg > 0)
                .map(|(i, _)| ids[i])
                .collect();
            return Err(cycle);
        }

        Ok(())
    }

    /// Tasks whose every dependency is `Completed` and which are
    /// themselves still `Pending` (the glossary's definition of "ready").
    pub fn ready(&self) -> Vec<TaskId> {
        self.nodes
            .iter()
            .filter(|(_, node)| {
                node.state == NodeState::Pending
                    && node
                        .dependencies
                        .iter()
                        .all(|d| self.nodes.get(d).is_none_or(|n| n.state == NodeState::Completed))
            })
            .map(|(id, _)| *id)
            .collect()
    }

    /// Mark a task completed and recompute which dependents are now ready
    /// (a dependent only becomes a candidate for `ready()` once every one
    /// of its dependencies -- including this one -- is `Completed`; no
    /// extra bookkeeping is needed beyond the state flip, since `ready()`
    /// recomputes from scratch each call).
    pub fn mark_completed(&mut self, task_id: TaskId) {
        if let Some(node) = self.nodes.get_mut(&task_id) {
            node.state = NodeState::Completed;
        }
    }

    /// Mark a task failed. If `cascade`, every transitive dependent moves
    /// to `Blocked`; otherwise dependents are left `Pending` forever,
    /// requiring an external resolution such as `cancel` (§4.4). Returns
    /// the ids newly moved to `Blocked`, so a caller pairing this graph
    /// with a task store can mirror the transition there.
    pub fn mark_failed(&mut self, task_id: TaskId, cascade: bool) -> Vec<TaskId> {
        if let Some(node) = self.nodes.get_mut(&task_id) {
            node.state = NodeState::Failed;
        }
        if !cascade {
            return Vec::new();
        }
        let mut queue: VecDeque<TaskId> = self
            .nodes
            .get(&task_id)
            .map(|n| n.dependents.iter().copied().collect())
            .unwrap_or_default();
        let mut visited: HashSet<TaskId> = HashSet::new();
        let mut blocked = Vec::new();
        while let Some(id) = queue.pop_front() {
            if !visited.insert(id) {
                continue;
            }
            if let Some(node) = self.nodes.get_mut(&id) {
                if node.state == NodeState::Pending {
                    node.state = NodeState::Blocked;
                    blocked.push(id);
                }
                queue.extend(node.dependents.iter().copied());
            }
        }
        blocked
    }

    pub fn contains(&self, task_id: TaskId) -> bool {
        self.nodes.contains_key(&task_id)
    }

    pub fn dependencies_of(&self, task_id: TaskId) -> Option<&BTreeSet<TaskId>> {
        self.nodes.get(&task_id).map(|n| &n.dependencies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn independent_task_is_immediately_ready() {
        let mut g = DependencyGraph::new();
        let a = TaskId::new();
        g.add(a, BTreeSet::new()).unwrap();
        assert_eq!(g.ready(), vec![a]);
    }

    #[test]
    fn dependent_task_not_ready_until_dependency_completes() {
        let mut g = DependencyGraph::new();
        let a = TaskId::new();
        let b = TaskId::new();
        g.add(a, BTreeSet::new()).unwrap();
        g.add(b, BTreeSet::from([a])).unwrap();

        assert_eq!(g.ready(), vec![a]);
        g.mark_completed(a);
        assert_eq!(g.ready(), vec![b]);
    }

    #[test]
    fn unknown_dependency_is_rejected() {
        let mut g = DependencyGraph::new();
        let a = TaskId::new();
        let ghost = TaskId::new();
        let err = g.add(a, BTreeSet::from([ghost])).unwrap_err();
        assert!(matches!(err, GraphError::UnknownDependency(_, _)));
        assert!(!g.contains(a));
    }

    #[test]
    fn diamond_dependency_is_not_a_false_positive_cycle() {
        let mut g = DependencyGraph::new();
        let x = TaskId::new();
        let y = TaskId::new();
        let z = TaskId::new();
        g.add(x, BTreeSet::new()).unwrap();
        g.add(y, BTreeSet::from([x])).unwrap();
        g.add(z, BTreeSet::from([x, y])).unwrap();
        assert!(g.contains(z));
    }

    #[test]
    fn cascade_on_failure_blocks_transitive_dependents() {
        let mut g = DependencyGraph::new();
        let a = TaskId::new();
        let b = TaskId::new();
        let c = TaskId::new();
        g.add(a, BTreeSet::new()).unwrap();
        g.add(b, BTreeSet::from([a])).unwrap();
        g.add(c, BTreeSet::from([b])).unwrap();

        g.mark_failed(a, true);
        assert!(g.ready().is_empty());
    }

    #[test]
    fn no_cascade_leaves_dependents_pending() {
        let mut g = DependencyGraph::new();
        let a = TaskId::new();
        let b = TaskId::new();
        g.add(a, BTreeSet::new()).unwrap();
        g.add(b, BTreeSet::from([a])).unwrap();

        g.mark_failed(a, false);
        // b is still Pending but its dependency never completes, so it
        // never appears in ready() either -- distinguishing "blocked"
        // from "pending forever" requires inspecting state directly in a
        // real caller; here we only assert it doesn't spuriously become
        // ready.
        assert!(g.ready().is_empty());
    }
}
