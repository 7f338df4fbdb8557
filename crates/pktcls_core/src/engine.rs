//! The capability seam between the evaluation driver and the engines.

use thiserror::Error;

use crate::rule::Packet;

/// Errors an engine can report while building or updating its index.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum EngineError {
    /// No index can be built from an empty rule set.
    #[error("cannot build an index from an empty rule set")]
    EmptyRuleSet,

    /// The engine has no incremental update path.
    #[error("engine does not support incremental update")]
    UnsupportedUpdate,
}

/// A classification engine: builds a self-contained index from a rule set
/// and answers "which highest-priority rule matches this packet" queries.
///
/// After `build` returns, the index owns everything it needs; the caller is
/// free to drop the rule buffers. Dropping the index releases all of its
/// storage.
pub trait Classifier: Sized {
    /// The rule form this engine consumes.
    type Rule;

    /// Build an index over `rules`.
    fn build(rules: &[Self::Rule]) -> Result<Self, EngineError>;

    /// Incrementally add `rules` to the existing index.
    fn insert_update(&mut self, rules: &[Self::Rule]) -> Result<(), EngineError>;

    /// Priority of the highest-priority (numerically smallest) rule
    /// matching `pkt`, or `None` when nothing matches.
    fn lookup(&self, pkt: &Packet) -> Option<u32>;
}
