//! Derivation Graph
//!
//! This module implements the graph of declared computations and the order
//! in which they are brought up to date.
//!
//! # Overview
//!
//! The graph is a directed acyclic graph where:
//!
//! - Nodes are memoized computations
//! - Edges are dependencies: if A reads B, there is an edge from B to A
//! - Inputs from the value store are the roots; they have no node of their own
//!
//! When an input changes, we traverse the reverse edges to find all affected
//! nodes and evaluate them in dependency order. Each memo then decides on its
//! own whether its cached result is still valid.
//!
//! # Design Decisions
//!
//! 1. Nodes are declared once, at wiring time, and never removed. This keeps
//!    node indices stable and lets declaration order serve as the
//!    deterministic tie-break of the topological sort.
//!
//! 2. Cycles are rejected when a node is added, so evaluation never has to
//!    deal with them.
//!
//! 3. We keep forward edges on each node and reverse edges in the graph, for
//!    ancestor and descendant traversal respectively.

mod node;
mod scheduler;

pub use node::{Dependencies, Node, NodeId};
pub use scheduler::{DerivationGraph, Outcome};
