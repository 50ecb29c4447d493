//! Derivation Graph
//!
//! The graph owns every declared computation and decides in which order they
//! are evaluated. It ensures that dependencies are always evaluated before
//! their dependents.
//!
//! # Algorithm
//!
//! 1. When an input changes, walk the reverse edges from the input to collect
//!    every node that transitively depends on it (the affected set).
//! 2. Extend that set with the ancestors of the affected nodes, so that a
//!    node whose other dependencies were never evaluated still sees
//!    up-to-date values.
//! 3. Sort the extended set topologically (Kahn's algorithm). When several
//!    nodes are ready at once, the one declared first goes first.
//! 4. Evaluate each node in order. Its memo decides whether to reuse the
//!    cache or recompute. A failed node poisons its dependents for the rest
//!    of the pass: they report `Unavailable` and are not evaluated.
//!
//! Only the affected nodes are reported back to the caller.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::Arc;

use indexmap::IndexMap;

use super::node::{Node, NodeId};
use crate::error::{ComputeError, Result, TallyError};
use crate::reactive::{Args, Fingerprint, Freshness, Memo, MemoStats, Source, ValueStore};
use crate::value::Value;

/// Result of evaluating one node during a pass.
pub type Outcome = Result<Arc<Value>>;

/// The directed acyclic graph of computations.
#[derive(Debug, Default)]
pub struct DerivationGraph {
    /// All nodes, in declaration order. Indices are stable: nodes are never
    /// removed.
    nodes: IndexMap<NodeId, Node>,

    /// Reverse edges: for each name (input or node), the indices of the nodes
    /// that read it, in declaration order.
    dependents: HashMap<NodeId, Vec<usize>>,
}

impl DerivationGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a computation.
    ///
    /// Dependency names may refer to inputs or to nodes, including nodes that
    /// are declared later. Fails with `CycleDetected` if any dependency
    /// already reaches `id`.
    pub fn add_node<I, D, F>(&mut self, id: impl Into<NodeId>, depends_on: I, compute: F) -> Result<()>
    where
        I: IntoIterator<Item = D>,
        D: Into<NodeId>,
        F: Fn(&Args) -> std::result::Result<Value, ComputeError> + Send + Sync + 'static,
    {
        let id = id.into();
        if self.nodes.contains_key(&id) {
            return Err(TallyError::DuplicateNode { id });
        }

        let node = Node::new(id.clone(), depends_on, Memo::new(compute));
        let mut visited = HashSet::new();
        for dep in node.dependencies() {
            if let Some(mut path) = self.path_between(dep, &id, &mut visited) {
                path.insert(0, id.to_string());
                return Err(TallyError::CycleDetected { node: id, path });
            }
        }

        let index = self.nodes.len();
        for dep in node.dependencies() {
            self.dependents.entry(dep.clone()).or_default().push(index);
        }
        tracing::trace!(node = %id, dependencies = ?node.dependencies(), "declared node");
        self.nodes.insert(id, node);
        Ok(())
    }

    /// A dependency path from `from` to `target`, following forward edges.
    fn path_between(
        &self,
        from: &NodeId,
        target: &NodeId,
        visited: &mut HashSet<NodeId>,
    ) -> Option<Vec<String>> {
        if from == target {
            return Some(vec![from.to_string()]);
        }
        if !visited.insert(from.clone()) {
            return None;
        }
        let node = self.nodes.get(from)?;
        for dep in node.dependencies() {
            if let Some(mut path) = self.path_between(dep, target, visited) {
                path.insert(0, from.to_string());
                return Some(path);
            }
        }
        None
    }

    /// Check that every dependency resolves to a node or a declared input, and
    /// that no node shadows an input.
    pub fn validate(&self, store: &ValueStore) -> Result<()> {
        for (id, node) in &self.nodes {
            if store.contains(id.as_str()) {
                return Err(TallyError::NameCollision { id: id.clone() });
            }
            for dep in node.dependencies() {
                if !self.nodes.contains_key(dep) && !store.contains(dep.as_str()) {
                    return Err(TallyError::UnknownInput {
                        name: dep.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Node ids in declaration order.
    pub fn node_ids(&self) -> impl Iterator<Item = &NodeId> {
        self.nodes.keys()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Counters of a node's memo.
    pub fn stats(&self, id: &str) -> Option<MemoStats> {
        self.nodes.get(id).map(|node| node.memo().stats())
    }

    /// The last successful result of a node, without evaluating anything.
    pub fn cached(&self, id: &str) -> Option<Arc<Value>> {
        self.nodes.get(id).and_then(|node| node.memo().cached().cloned())
    }

    /// Evaluate one node, bringing its ancestors up to date first.
    pub fn evaluate(&mut self, store: &ValueStore, id: &str) -> Outcome {
        let index = self
            .nodes
            .get_index_of(id)
            .ok_or_else(|| TallyError::UnknownNode { id: id.into() })?;
        let plan = self.plan(&[index]);
        self.run(store, &plan)
            .remove(&index)
            .unwrap_or_else(|| Err(TallyError::UnknownNode { id: id.into() }))
    }

    /// Re-evaluate every node downstream of `changed`, in topological order.
    pub fn recompute_affected(
        &mut self,
        store: &ValueStore,
        changed: &str,
    ) -> Result<Vec<(NodeId, Outcome)>> {
        self.recompute_all_affected(store, [changed])
    }

    /// Like [`recompute_affected`](Self::recompute_affected) for several
    /// changed inputs in a single pass.
    pub fn recompute_all_affected<I, S>(
        &mut self,
        store: &ValueStore,
        changed: I,
    ) -> Result<Vec<(NodeId, Outcome)>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut roots = Vec::new();
        for name in changed {
            let name = name.as_ref();
            if !store.contains(name) {
                return Err(TallyError::UnknownInput {
                    name: name.to_owned(),
                });
            }
            roots.push(name.to_owned());
        }

        let affected = self.affected_by(&roots);
        let plan = self.plan(&affected.iter().copied().collect::<Vec<_>>());
        tracing::debug!(
            changed = ?roots,
            affected = affected.len(),
            planned = plan.len(),
            "recompute pass"
        );

        let mut outcomes = self.run(store, &plan);
        Ok(plan
            .iter()
            .filter(|index| affected.contains(*index))
            .filter_map(|&index| {
                let id = self.nodes.get_index(index)?.0.clone();
                Some((id, outcomes.remove(&index)?))
            })
            .collect())
    }

    /// Indices of all nodes transitively reading any of `names`.
    fn affected_by(&self, names: &[String]) -> HashSet<usize> {
        let mut affected = HashSet::new();
        let mut queue: VecDeque<usize> = names
            .iter()
            .filter_map(|name| self.dependents.get(name.as_str()))
            .flatten()
            .copied()
            .collect();

        while let Some(index) = queue.pop_front() {
            if !affected.insert(index) {
                continue;
            }
            if let Some((id, _)) = self.nodes.get_index(index) {
                if let Some(next) = self.dependents.get(id) {
                    queue.extend(next.iter().copied());
                }
            }
        }
        affected
    }

    /// The given nodes plus all their node ancestors, topologically sorted
    /// with declaration order as tie-break.
    fn plan(&self, roots: &[usize]) -> Vec<usize> {
        // Ancestor closure.
        let mut members = HashSet::new();
        let mut stack = roots.to_vec();
        while let Some(index) = stack.pop() {
            if !members.insert(index) {
                continue;
            }
            for dep in self.node_dependencies(index) {
                stack.push(dep);
            }
        }

        // Kahn's algorithm over the closure.
        let mut in_degree: HashMap<usize, usize> = HashMap::new();
        let mut ready = BTreeSet::new();
        for &index in &members {
            let degree = self.node_dependencies(index).count();
            in_degree.insert(index, degree);
            if degree == 0 {
                ready.insert(index);
            }
        }

        let mut order = Vec::with_capacity(members.len());
        while let Some(index) = ready.pop_first() {
            order.push(index);
            let Some((id, _)) = self.nodes.get_index(index) else {
                continue;
            };
            for dependent in self.dependents.get(id).into_iter().flatten() {
                if let Some(degree) = in_degree.get_mut(dependent) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.insert(*dependent);
                    }
                }
            }
        }
        order
    }

    /// Indices of the nodes a node reads from. Input dependencies are skipped.
    fn node_dependencies(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        self.nodes
            .get_index(index)
            .into_iter()
            .flat_map(|(_, node)| node.dependencies())
            .filter_map(|dep| self.nodes.get_index_of(dep))
    }

    /// Evaluate the planned nodes in order.
    fn run(&mut self, store: &ValueStore, plan: &[usize]) -> HashMap<usize, Outcome> {
        let mut outcomes: HashMap<usize, Outcome> = HashMap::with_capacity(plan.len());
        // Failed nodes of this pass, mapped to the node that originally failed.
        let mut failed: HashMap<usize, NodeId> = HashMap::new();

        for &index in plan {
            let Some((id, _)) = self.nodes.get_index(index) else {
                continue;
            };
            let id = id.clone();

            let prepared = match self.prepare(store, index, &failed) {
                Ok(prepared) => prepared,
                Err(err) => {
                    let root = match &err {
                        TallyError::Unavailable { upstream, .. } => upstream.clone(),
                        _ => id.clone(),
                    };
                    tracing::debug!(node = %id, error = %err, "skipping node");
                    failed.insert(index, root);
                    outcomes.insert(index, Err(err));
                    continue;
                }
            };

            let Some((_, node)) = self.nodes.get_index_mut(index) else {
                continue;
            };
            let outcome = match node.memo_mut().evaluate(prepared.fingerprint, &prepared.args) {
                Ok((value, Freshness::Hit)) => {
                    tracing::debug!(node = %id, "cache hit");
                    Ok(value)
                }
                Ok((value, Freshness::Miss)) => {
                    tracing::debug!(node = %id, revision = node.memo().revision(), "recomputed");
                    Ok(value)
                }
                Err(cause) => {
                    tracing::warn!(node = %id, error = %cause, "computation failed");
                    failed.insert(index, id.clone());
                    Err(TallyError::Computation {
                        node: id.clone(),
                        cause,
                    })
                }
            };
            outcomes.insert(index, outcome);
        }
        outcomes
    }

    /// Fingerprint and arguments of a node, from the current store and the
    /// current revisions of its node dependencies.
    fn prepare(
        &self,
        store: &ValueStore,
        index: usize,
        failed: &HashMap<usize, NodeId>,
    ) -> Result<Prepared> {
        let Some((id, node)) = self.nodes.get_index(index) else {
            return Err(TallyError::UnknownNode { id: "?".into() });
        };

        let mut fingerprint = Fingerprint::builder();
        let mut args = Args::new();
        for dep in node.dependencies() {
            match self.nodes.get_full(dep) {
                Some((dep_index, _, dep_node)) => {
                    if let Some(upstream) = failed.get(&dep_index) {
                        return Err(TallyError::Unavailable {
                            node: id.clone(),
                            upstream: upstream.clone(),
                        });
                    }
                    // Ordered after its dependency, so the cache is current.
                    let value = dep_node.memo().cached().cloned().ok_or_else(|| {
                        TallyError::Unavailable {
                            node: id.clone(),
                            upstream: dep.clone(),
                        }
                    })?;
                    fingerprint.add(Source::Node, dep.as_str(), dep_node.memo().revision());
                    args.push(dep.clone(), value);
                }
                None => {
                    let (value, version) = store.get_shared(dep.as_str())?;
                    fingerprint.add(Source::Input, dep.as_str(), version);
                    args.push(dep.clone(), value);
                }
            }
        }
        Ok(Prepared {
            fingerprint: fingerprint.finish(),
            args,
        })
    }
}

struct Prepared {
    fingerprint: Fingerprint,
    args: Args,
}
