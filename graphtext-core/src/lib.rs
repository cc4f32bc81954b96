//! # Graphtext Core
//!
//! Runtime-agnostic core types shared between the graphtext query planner
//! and the applications that embed it.
//!
//! This crate provides:
//! - The [`IndexStats`] oracle trait: read-only cardinality and multiplicity
//!   lookups against a pre-built RDF + text index
//! - [`MemoryIndexStats`]: a `HashMap`-backed oracle for tests and embedders
//!   that load statistics from serialized index metadata
//! - The text predicate vocabulary ([`vocab`])
//!
//! ## Design Principles
//!
//! 1. **Read-only**: the planner never writes; oracle implementations expose
//!    pre-computed metadata only
//! 2. **Safe for concurrent read**: `IndexStats` is `Send + Sync` so multiple
//!    planner invocations may share one oracle

pub mod index_stats;
pub mod vocab;

pub use index_stats::{IndexStats, MemoryIndexStats, PredicateStatEntry};
