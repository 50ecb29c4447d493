//! Value Store
//!
//! The store holds the current value of every named input of a session:
//! widget selections, slider ranges, uploaded datasets.
//!
//! # Versions
//!
//! Every write takes the next tick of a store-wide clock, so versions are
//! unique and strictly increasing across all inputs. A write always bumps the
//! version, even when the new value equals the old one: every user
//! interaction counts as a change.
//!
//! # Dirty Tracking
//!
//! A write also marks the input dirty. The session drains the dirty set to
//! decide which part of the derivation graph to recompute.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::{Result, TallyError};
use crate::value::Value;

/// One named input.
#[derive(Debug, Clone)]
pub struct Input {
    value: Arc<Value>,
    initial: Arc<Value>,
    version: u64,
    dirty: bool,
}

impl Input {
    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

/// Named inputs with monotonically increasing versions.
#[derive(Debug, Default)]
pub struct ValueStore {
    inputs: IndexMap<String, Input>,
    clock: u64,
}

impl ValueStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    /// Register a new input with its initial value.
    pub fn declare(&mut self, name: impl Into<String>, initial: impl Into<Value>) -> Result<()> {
        let name = name.into();
        if self.inputs.contains_key(&name) {
            return Err(TallyError::DuplicateInput { name });
        }

        let initial = Arc::new(initial.into());
        let version = self.tick();
        tracing::trace!(input = %name, version, "declared input");
        self.inputs.insert(
            name,
            Input {
                value: Arc::clone(&initial),
                initial,
                version,
                dirty: false,
            },
        );
        Ok(())
    }

    /// Store a new value. Always assigns a new version and marks the input
    /// dirty. Returns the new version.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<u64> {
        if !self.inputs.contains_key(name) {
            return Err(unknown(name));
        }
        let version = self.tick();
        let input = self.inputs.get_mut(name).ok_or_else(|| unknown(name))?;
        input.value = Arc::new(value.into());
        input.version = version;
        input.dirty = true;
        tracing::debug!(input = %name, version, "input changed");
        Ok(version)
    }

    /// Current value and version.
    pub fn get(&self, name: &str) -> Result<(&Value, u64)> {
        self.input(name).map(|input| (input.value(), input.version))
    }

    /// Current value as a shared handle, for handing to computations.
    pub fn get_shared(&self, name: &str) -> Result<(Arc<Value>, u64)> {
        self.input(name)
            .map(|input| (Arc::clone(&input.value), input.version))
    }

    pub fn input(&self, name: &str) -> Result<&Input> {
        self.inputs.get(name).ok_or_else(|| unknown(name))
    }

    pub fn version(&self, name: &str) -> Result<u64> {
        self.input(name).map(Input::version)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inputs.contains_key(name)
    }

    /// Input names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.inputs.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Names of dirty inputs in declaration order. Clears the dirty marks.
    pub fn take_dirty(&mut self) -> Vec<String> {
        self.inputs
            .iter_mut()
            .filter(|(_, input)| input.dirty)
            .map(|(name, input)| {
                input.dirty = false;
                name.clone()
            })
            .collect()
    }

    /// Restore every input to its declared initial value. Each input gets a
    /// fresh version and is marked dirty.
    pub fn reset(&mut self) {
        for index in 0..self.inputs.len() {
            let version = self.tick();
            if let Some((_, input)) = self.inputs.get_index_mut(index) {
                input.value = Arc::clone(&input.initial);
                input.version = version;
                input.dirty = true;
            }
        }
    }
}

fn unknown(name: &str) -> TallyError {
    TallyError::UnknownInput {
        name: name.to_owned(),
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
