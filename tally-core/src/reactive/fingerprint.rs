//! Dependency fingerprints.
//!
//! A fingerprint summarizes the versions of everything a node reads. Two
//! evaluations with equal fingerprints saw exactly the same inputs, so the
//! second one can reuse the first one's result.

use std::fmt;

/// Where a dependency version came from. Inputs and nodes keep independent
/// counters, so the kind is part of the hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Input,
    Node,
}

/// BLAKE3 digest over `(kind, name, version)` of each dependency.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Fingerprint(blake3::Hash);

impl Fingerprint {
    pub fn builder() -> FingerprintBuilder {
        FingerprintBuilder(blake3::Hasher::new())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", &self.0.to_hex()[..16])
    }
}

/// Incremental fingerprint construction, one dependency at a time.
pub struct FingerprintBuilder(blake3::Hasher);

impl FingerprintBuilder {
    pub fn add(&mut self, source: Source, name: &str, version: u64) -> &mut Self {
        let tag: u8 = match source {
            Source::Input => 0,
            Source::Node => 1,
        };
        self.0.update(&[tag]);
        self.0.update(&(name.len() as u64).to_le_bytes());
        self.0.update(name.as_bytes());
        self.0.update(&version.to_le_bytes());
        self
    }

    pub fn finish(&self) -> Fingerprint {
        Fingerprint(self.0.finalize())
    }
}
