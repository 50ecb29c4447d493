//! Graph Nodes
//!
//! This module defines the node type that lives in the derivation graph.

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use smallvec::SmallVec;

use crate::reactive::Memo;

/// Identifier of a node in the derivation graph.
///
/// Node ids and input names share one namespace: a dependency name refers to
/// the node with that id if one is declared, otherwise to the input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeId(Arc<str>);

impl NodeId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for NodeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(Arc::from(id))
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self(Arc::from(id))
    }
}

impl From<&NodeId> for NodeId {
    fn from(id: &NodeId) -> Self {
        id.clone()
    }
}

/// Dependency names of a node. Most nodes read from a handful of values.
pub type Dependencies = SmallVec<[NodeId; 4]>;

/// A declared computation together with its edges.
pub struct Node {
    id: NodeId,

    /// Names this node reads from, in declaration order, without duplicates.
    dependencies: Dependencies,

    /// The memoized computation.
    memo: Memo,
}

impl Node {
    /// Create a node. Repeated dependency names are collapsed to their first
    /// occurrence.
    pub fn new<I, D>(id: NodeId, dependencies: I, memo: Memo) -> Self
    where
        I: IntoIterator<Item = D>,
        D: Into<NodeId>,
    {
        let mut deps = Dependencies::new();
        for dep in dependencies {
            let dep = dep.into();
            if !deps.contains(&dep) {
                deps.push(dep);
            }
        }
        Self {
            id,
            dependencies: deps,
            memo,
        }
    }

    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn dependencies(&self) -> &[NodeId] {
        &self.dependencies
    }

    pub fn depends_on(&self, name: &str) -> bool {
        self.dependencies.iter().any(|dep| dep.as_str() == name)
    }

    pub fn memo(&self) -> &Memo {
        &self.memo
    }

    pub fn memo_mut(&mut self) -> &mut Memo {
        &mut self.memo
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("dependencies", &self.dependencies)
            .field("memo", &self.memo)
            .finish()
    }
}
