//! Reactive Primitives
//!
//! This module implements the input side and the caching side of the
//! recomputation engine.
//!
//! # Concepts
//!
//! ## Inputs
//!
//! An input is a named, versioned value held by the [`ValueStore`]: a filter
//! selection, a slider position, an uploaded dataset. Every write bumps its
//! version.
//!
//! ## Memos
//!
//! A [`Memo`] is a pure computation with a cache. The cache is keyed by the
//! [`Fingerprint`] of the versions of everything the computation reads, so a
//! memo re-runs exactly when one of its dependencies was written.
//!
//! ## Sessions
//!
//! A [`Session`] ties one store and one derivation graph together and is
//! passed explicitly to every operation. There is no global runtime.

mod fingerprint;
mod memo;
mod session;
mod store;

pub use fingerprint::{Fingerprint, FingerprintBuilder, Source};
pub use memo::{Args, ComputeFn, Freshness, Memo, MemoState, MemoStats};
pub use session::Session;
pub use store::{Input, ValueStore};
