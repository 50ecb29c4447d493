//! Tally Core
//!
//! This crate provides the recomputation engine behind Tally's interactive
//! data dashboards. It implements:
//!
//! - A versioned store of named inputs (filters, selections, datasets)
//! - Memoized computations keyed by a fingerprint of their inputs
//! - A derivation graph that recomputes only what changed, in order
//! - Typed tables, CSV ingestion and descriptive statistics
//! - Render sinks that receive every outcome of a pass
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: Value store, memos and the per-session context
//! - `graph`: Derivation graph and scheduling
//! - `data`: Tables, CSV parsing and statistics
//! - `render`: Views and sinks
//! - `pool`: Many isolated sessions in one process
//!
//! # Example
//!
//! ```rust
//! use tally_core::data::stats;
//! use tally_core::{Session, Value};
//!
//! let mut session = Session::default();
//! session.declare("sales", vec![100.0, 200.0, 300.0]).unwrap();
//! session
//!     .add_node("mean_sales", ["sales"], |args| {
//!         Ok(Value::Float(stats::mean(&args.get("sales")?.numbers()?)?))
//!     })
//!     .unwrap();
//!
//! assert_eq!(*session.evaluate("mean_sales").unwrap(), Value::Float(200.0));
//!
//! // Updating the input recomputes the mean and reports it.
//! let outcomes = session.set("sales", vec![100.0, 200.0, 300.0, 400.0]).unwrap();
//! assert_eq!(outcomes[0].0.as_str(), "mean_sales");
//! assert_eq!(**outcomes[0].1.as_ref().unwrap(), Value::Float(250.0));
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod graph;
pub mod pool;
pub mod reactive;
pub mod render;
pub mod value;

pub use config::SessionConfig;
pub use error::{ComputeError, DatasetParseError, Result, TallyError};
pub use graph::{DerivationGraph, NodeId, Outcome};
pub use pool::{SessionId, SessionPool};
pub use reactive::{Args, Memo, Session, ValueStore};
pub use value::Value;
