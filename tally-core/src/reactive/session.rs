//! Sessions
//!
//! A session is the explicit context of one user's interactive use: one
//! value store, one derivation graph, the views bound to nodes and the sinks
//! outcomes are pushed to. Nothing is shared between sessions and nothing is
//! kept in process-wide state; two sessions wired the same way behave as two
//! independent dashboards.
//!
//! # Lifecycle
//!
//! 1. Wiring: declare inputs, add nodes, bind views, attach sinks.
//! 2. Validation: every dependency must resolve. This runs on the first
//!    input change after wiring, or explicitly through [`Session::validate`].
//! 3. Interaction: each [`Session::set`] runs one full recompute pass to
//!    completion and pushes the outcomes before returning.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::memo::Args;
use super::store::ValueStore;
use crate::config::SessionConfig;
use crate::data::csv;
use crate::error::{ComputeError, Result, TallyError};
use crate::graph::{DerivationGraph, NodeId, Outcome};
use crate::render::{Frame, RenderSink, View};
use crate::value::Value;

/// One isolated value store plus derivation graph.
pub struct Session {
    config: SessionConfig,
    store: ValueStore,
    graph: DerivationGraph,
    views: HashMap<NodeId, View>,
    sinks: Vec<Box<dyn RenderSink>>,
    /// Whether the wiring has been validated since it last changed.
    validated: bool,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            store: ValueStore::new(),
            graph: DerivationGraph::new(),
            views: HashMap::new(),
            sinks: Vec::new(),
            validated: false,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn store(&self) -> &ValueStore {
        &self.store
    }

    pub fn graph(&self) -> &DerivationGraph {
        &self.graph
    }

    // ------------------------------------------------------------------
    // Wiring
    // ------------------------------------------------------------------

    /// Declare an input with its default value.
    pub fn declare(&mut self, name: impl Into<String>, initial: impl Into<Value>) -> Result<()> {
        let name = name.into();
        if self.graph.contains(&name) {
            return Err(TallyError::NameCollision { id: name.into() });
        }
        self.validated = false;
        self.store.declare(name, initial)
    }

    /// Declare a computation over inputs and other nodes.
    pub fn add_node<I, D, F>(&mut self, id: impl Into<NodeId>, depends_on: I, compute: F) -> Result<()>
    where
        I: IntoIterator<Item = D>,
        D: Into<NodeId>,
        F: Fn(&Args) -> std::result::Result<Value, ComputeError> + Send + Sync + 'static,
    {
        let id = id.into();
        if self.store.contains(id.as_str()) {
            return Err(TallyError::NameCollision { id });
        }
        self.validated = false;
        self.graph.add_node(id, depends_on, compute)
    }

    /// Attach a view description to a node.
    pub fn bind(&mut self, node: impl Into<NodeId>, view: View) -> Result<()> {
        let node = node.into();
        if !self.graph.contains(node.as_str()) {
            return Err(TallyError::UnknownNode { id: node });
        }
        self.views.insert(node, view);
        Ok(())
    }

    pub fn view(&self, node: &str) -> Option<&View> {
        self.views.get(node)
    }

    /// Add a sink. Every later pass is pushed to it.
    pub fn attach(&mut self, sink: impl RenderSink + 'static) {
        self.sinks.push(Box::new(sink));
    }

    /// Check the wiring. Construction errors are returned here rather than
    /// surfacing in the middle of a recompute pass.
    pub fn validate(&mut self) -> Result<()> {
        if !self.validated {
            self.graph.validate(&self.store)?;
            self.validated = true;
            tracing::debug!(
                inputs = self.store.len(),
                nodes = self.graph.node_count(),
                "session wiring validated"
            );
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Interaction
    // ------------------------------------------------------------------

    /// Current value and version of an input.
    pub fn get(&self, name: &str) -> Result<(&Value, u64)> {
        self.store.get(name)
    }

    /// Change an input and recompute everything downstream of it.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<Vec<(NodeId, Outcome)>> {
        self.validate()?;
        self.store.set(name, value)?;
        self.flush()
    }

    /// Change an input without recomputing. Several staged changes are
    /// recomputed together by the next [`flush`](Self::flush), like a form
    /// that is only submitted once.
    pub fn stage(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        self.store.set(name, value).map(|_| ())
    }

    /// Recompute everything downstream of the inputs changed since the last
    /// pass, and push the outcomes to the sinks.
    pub fn flush(&mut self) -> Result<Vec<(NodeId, Outcome)>> {
        self.validate()?;
        let dirty = self.store.take_dirty();
        if dirty.is_empty() {
            return Ok(Vec::new());
        }
        let outcomes = self.graph.recompute_all_affected(&self.store, &dirty)?;
        self.publish(&outcomes);
        Ok(outcomes)
    }

    /// Parse an uploaded dataset and store it in `name`. On a parse error the
    /// input keeps its previous value and version.
    pub fn upload(&mut self, name: &str, bytes: &[u8]) -> Result<Vec<(NodeId, Outcome)>> {
        self.store.input(name)?;
        let table = csv::parse(bytes, &self.config.csv).map_err(|err| {
            tracing::warn!(input = %name, error = %err, "rejected upload");
            err
        })?;
        tracing::info!(
            input = %name,
            rows = table.row_count(),
            columns = table.column_count(),
            "dataset uploaded"
        );
        self.set(name, table)
    }

    /// Evaluate a single node on demand. Nothing is pushed to the sinks.
    pub fn evaluate(&mut self, id: &str) -> Result<Arc<Value>> {
        self.validate()?;
        self.graph.evaluate(&self.store, id)
    }

    /// Put every input back to its declared default and recompute.
    pub fn reset(&mut self) -> Result<Vec<(NodeId, Outcome)>> {
        self.validate()?;
        tracing::info!("session reset");
        self.store.reset();
        self.flush()
    }

    fn publish(&mut self, outcomes: &[(NodeId, Outcome)]) {
        for (node, outcome) in outcomes {
            let view = self.views.get(node);
            if view.is_none() && !self.config.publish_unbound {
                continue;
            }
            let frame = Frame { node, view, outcome };
            for sink in &mut self.sinks {
                sink.render(&frame);
            }
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("store", &self.store)
            .field("graph", &self.graph)
            .field("views", &self.views)
            .field("sinks", &self.sinks.len())
            .field("validated", &self.validated)
            .finish()
    }
}
