//! # Graphtext Query
//!
//! Cost-based query planner for SPARQL triple patterns over an RDF index
//! extended with full-text search.
//!
//! This crate provides:
//! - A triple graph over the WHERE clause with text-clique collapsing
//! - Bottom-up dynamic-programming plan enumeration with cost-based pruning
//! - Specialized text operators (with and without filter) integrated into
//!   join planning
//! - The query execution tree type the planner emits
//!
//! ## Quick Start
//!
//! Build a [`ParsedQuery`] from the parser's raw strings, then call
//! [`plan`] with an [`IndexStats`] oracle to get a [`PlannedQuery`].
//!
//! The planner is a pure function of its inputs: no I/O, no shared state,
//! safe to run concurrently against one oracle.

pub mod error;
pub mod explain;
pub mod graph;
pub mod ir;
pub mod merge;
pub mod pattern;
pub mod plan;
pub mod planner;
pub mod qet;
pub mod seed;
pub mod var_registry;

// Re-exports
pub use error::{BadQuery, NotImplemented, PlanError, Result};
pub use explain::{explain, ExplainPlan, OperatorDisplay};
pub use graph::{Node, NodePayload, TextNode, TripleGraph};
pub use ir::{
    CompareOp, Filter, OrderKey, ParsedQuery, Query, SparqlFilter, SparqlOrderKey, SparqlTriple,
};
pub use merge::{connected, join_columns, merge};
pub use pattern::{Term, TriplePattern};
pub use plan::{PruningKey, SubtreePlan};
pub use planner::{plan, PlannedQuery};
pub use qet::{
    Distinct, IndexScan, Join, Operation, OrderBy, QueryExecutionTree, ScanKind, Sort,
    TextForContexts, TextWithFilter, TextWithoutFilter, VarColumns,
};
pub use seed::{pure_text_plan, seed_with_scans_and_text};
pub use var_registry::{score_name, VarId, VarRegistry};

// Re-export the oracle surface for convenience
pub use graphtext_core::{IndexStats, MemoryIndexStats, PredicateStatEntry};
