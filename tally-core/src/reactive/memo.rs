//! Memo Implementation
//!
//! A Memo wraps a pure computation and caches its last successful result
//! under the fingerprint of the dependency versions it was computed from.
//!
//! # How Memos Work
//!
//! 1. The graph fingerprints the node's dependencies and hands the memo the
//!    fingerprint together with the current argument values.
//!
//! 2. If the fingerprint equals the cached one, the cached result is returned
//!    as is. The computation is not called.
//!
//! 3. Otherwise the computation runs. On success the result and fingerprint
//!    replace the cache and the revision is bumped, which in turn changes the
//!    fingerprint of every downstream memo.
//!
//! 4. On failure the cache keeps its previous, still valid, contents.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use smallvec::SmallVec;

use super::fingerprint::Fingerprint;
use crate::error::ComputeError;
use crate::graph::NodeId;
use crate::value::Value;

/// Signature of a node's computation.
pub type ComputeFn = dyn Fn(&Args) -> Result<Value, ComputeError> + Send + Sync;

/// The dependency values a computation is called with, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct Args {
    entries: SmallVec<[(NodeId, Arc<Value>); 4]>,
}

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: NodeId, value: Arc<Value>) {
        self.entries.push((name, value));
    }

    /// The value of the dependency called `name`.
    pub fn get(&self, name: &str) -> Result<&Value, ComputeError> {
        self.entries
            .iter()
            .find(|(dep, _)| dep.as_str() == name)
            .map(|(_, value)| value.as_ref())
            .ok_or_else(|| ComputeError::MissingArgument {
                name: name.to_owned(),
            })
    }

    /// The value of the `index`-th dependency.
    pub fn at(&self, index: usize) -> Result<&Value, ComputeError> {
        self.entries
            .get(index)
            .map(|(_, value)| value.as_ref())
            .ok_or_else(|| ComputeError::MissingArgument {
                name: format!("#{index}"),
            })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, &Value)> {
        self.entries.iter().map(|(name, value)| (name, value.as_ref()))
    }
}

/// Cache state of a memo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoState {
    /// Never computed successfully.
    Empty,

    /// Holds a result for some fingerprint. Whether it is current depends on
    /// the dependency versions at the time of the next evaluation.
    Cached,
}

/// Counters kept per memo.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MemoStats {
    /// Times the computation was called.
    pub runs: u64,
    /// Evaluations answered from the cache.
    pub hits: u64,
    /// Runs that returned an error.
    pub failures: u64,
}

/// Whether an evaluation reused the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Hit,
    Miss,
}

struct Cached {
    fingerprint: Fingerprint,
    value: Arc<Value>,
}

/// A cached derived value that recomputes only when its dependencies change.
pub struct Memo {
    compute: Box<ComputeFn>,
    cached: Option<Cached>,
    /// Bumped on every successful recomputation. Acts as the node's version.
    revision: u64,
    stats: MemoStats,
}

impl Memo {
    /// Create a memo. Nothing runs until the first evaluation.
    pub fn new<F>(compute: F) -> Self
    where
        F: Fn(&Args) -> Result<Value, ComputeError> + Send + Sync + 'static,
    {
        Self {
            compute: Box::new(compute),
            cached: None,
            revision: 0,
            stats: MemoStats::default(),
        }
    }

    /// Return the cached result if `fingerprint` matches, otherwise run the
    /// computation with `args`.
    pub fn evaluate(
        &mut self,
        fingerprint: Fingerprint,
        args: &Args,
    ) -> Result<(Arc<Value>, Freshness), ComputeError> {
        if let Some(cached) = &self.cached {
            if cached.fingerprint == fingerprint {
                self.stats.hits += 1;
                return Ok((Arc::clone(&cached.value), Freshness::Hit));
            }
        }

        self.stats.runs += 1;
        match (self.compute)(args) {
            Ok(value) => {
                let value = Arc::new(value);
                self.cached = Some(Cached {
                    fingerprint,
                    value: Arc::clone(&value),
                });
                self.revision += 1;
                Ok((value, Freshness::Miss))
            }
            Err(err) => {
                self.stats.failures += 1;
                Err(err)
            }
        }
    }

    /// Whether a result for `fingerprint` is cached.
    pub fn is_fresh(&self, fingerprint: &Fingerprint) -> bool {
        self.cached
            .as_ref()
            .is_some_and(|cached| cached.fingerprint == *fingerprint)
    }

    /// The last successful result, current or not.
    pub fn cached(&self) -> Option<&Arc<Value>> {
        self.cached.as_ref().map(|cached| &cached.value)
    }

    pub fn state(&self) -> MemoState {
        if self.cached.is_some() {
            MemoState::Cached
        } else {
            MemoState::Empty
        }
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn stats(&self) -> MemoStats {
        self.stats
    }
}

impl fmt::Debug for Memo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memo")
            .field("state", &self.state())
            .field("revision", &self.revision)
            .field("stats", &self.stats)
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::fingerprint::Source;

    fn fp(version: u64) -> Fingerprint {
        Fingerprint::builder()
            .add(Source::Input, "x", version)
            .finish()
    }

    fn args(value: i64) -> Args {
        let mut args = Args::new();
        args.push("x".into(), Arc::new(Value::Int(value)));
        args
    }

    fn doubling() -> Memo {
        Memo::new(|args| Ok(Value::Int(args.get("x")?.as_i64()? * 2)))
    }

    #[test]
    fn memo_computes_on_first_evaluation() {
        let mut memo = doubling();
        assert_eq!(memo.state(), MemoState::Empty);

        let (value, freshness) = memo.evaluate(fp(1), &args(21)).unwrap();
        assert_eq!(*value, Value::Int(42));
        assert_eq!(freshness, Freshness::Miss);
        assert_eq!(memo.state(), MemoState::Cached);
        assert_eq!(memo.revision(), 1);
    }

    #[test]
    fn memo_returns_same_arc_on_hit() {
        let mut memo = doubling();
        let (first, _) = memo.evaluate(fp(1), &args(1)).unwrap();
        let (second, freshness) = memo.evaluate(fp(1), &args(1)).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(freshness, Freshness::Hit);
        assert_eq!(memo.stats(), MemoStats { runs: 1, hits: 1, failures: 0 });
        assert_eq!(memo.revision(), 1);
    }

    #[test]
    fn memo_recomputes_on_new_fingerprint() {
        let mut memo = doubling();
        memo.evaluate(fp(1), &args(1)).unwrap();
        let (value, freshness) = memo.evaluate(fp(2), &args(5)).unwrap();

        assert_eq!(*value, Value::Int(10));
        assert_eq!(freshness, Freshness::Miss);
        assert_eq!(memo.stats().runs, 2);
        assert_eq!(memo.revision(), 2);
    }

    #[test]
    fn failure_keeps_previous_cache() {
        let mut memo = Memo::new(|args| {
            let x = args.get("x")?.as_i64()?;
            if x < 0 {
                Err(ComputeError::failed("negative"))
            } else {
                Ok(Value::Int(x))
            }
        });

        memo.evaluate(fp(1), &args(3)).unwrap();
        assert!(memo.evaluate(fp(2), &args(-1)).is_err());

        assert_eq!(memo.cached().map(|v| v.as_ref()), Some(&Value::Int(3)));
        assert!(memo.is_fresh(&fp(1)));
        assert!(!memo.is_fresh(&fp(2)));
        assert_eq!(memo.revision(), 1);
        assert_eq!(memo.stats().failures, 1);
    }

    #[test]
    fn missing_argument_is_reported() {
        let args = Args::new();
        assert_eq!(
            args.get("y"),
            Err(ComputeError::MissingArgument { name: "y".into() })
        );
        assert!(args.at(0).is_err());
    }
}
