//! Error types for query planning
//!
//! Planning fails fast: any error aborts the current `plan` call with no
//! retry and no partial result. Two taxonomies exist. [`BadQuery`] covers
//! malformed input the user can fix; [`NotImplemented`] covers query shapes
//! the planner does not support yet. The calling layer translates both into
//! user-visible diagnostics.

use thiserror::Error;

/// Malformed query input.
///
/// Variants that concern a specific triple carry its lexical form verbatim.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BadQuery {
    /// Triple pattern with no variable in any position
    #[error("triples need at least one variable; not the case in: {0}")]
    TripleWithoutVariable(String),

    /// Text triple whose context side cannot be resolved to a context variable
    #[error("text triple is not anchored to a context variable: {0}")]
    UnanchoredTextTriple(String),

    /// Text clique with no word on the non-variable side of any triple
    #[error("need a word part for each text operation; none found for {0}")]
    MissingWordPart(String),

    /// Query without any triple patterns
    #[error("query has no triple patterns")]
    NoTriples,

    /// ORDER BY key that no plan binds
    #[error("ordering requested on unbound variable {0}")]
    UnboundOrderKey(String),

    /// Text limit string that is neither empty nor an unsigned integer
    #[error("text limit is not an unsigned integer: {0:?}")]
    BadTextLimit(String),
}

/// Query shapes the planner rejects as unsupported.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotImplemented {
    /// Variable in predicate position
    #[error("no predicate variables yet, please; triple in question: {0}")]
    PredicateVariable(String),

    /// Three or more distinct variables in one triple
    #[error("triples should have at most two variables; not the case in: {0}")]
    TooManyVariables(String),

    /// The same variable in subject and object position of one triple
    #[error("self-joining triples are not supported: {0}")]
    SelfJoinTriple(String),

    /// A merge that would need two or more join columns (cyclic query)
    #[error("joins should happen on one variable only for now; no cyclic queries either")]
    MultiColumnJoin,

    /// A cycle that would have to be broken through a text operation
    #[error("breaking a cycle through a text operation is not supported")]
    CycleThroughText,

    /// Query graph with two or more connected components
    #[error("disconnected query graphs (cartesian products) are not supported")]
    CartesianProduct,
}

/// Errors raised while building a query execution tree.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// User error: malformed query
    #[error("bad query: {0}")]
    BadQuery(#[from] BadQuery),

    /// Planner limitation
    #[error("not yet implemented: {0}")]
    NotImplemented(#[from] NotImplemented),

    /// Internal invariant violation (should not happen)
    #[error("internal planner error: {0}")]
    Internal(String),
}

/// Result type for planning operations
pub type Result<T> = std::result::Result<T, PlanError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_query_message_carries_triple() {
        let err = PlanError::from(BadQuery::TripleWithoutVariable("<s> <p> <o>".into()));
        let msg = err.to_string();
        assert!(msg.starts_with("bad query:"));
        assert!(msg.contains("<s> <p> <o>"));
    }

    #[test]
    fn test_not_implemented_message() {
        let err = PlanError::from(NotImplemented::MultiColumnJoin);
        assert!(err.to_string().starts_with("not yet implemented:"));
    }
}
