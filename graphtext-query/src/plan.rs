//! Candidate subtree plans and their pruning signature
//!
//! A [`SubtreePlan`] pairs a query execution tree with the set of triple
//! graph nodes it resolves and the set of filters already applied. Plans
//! sharing a [`PruningKey`] are interchangeable for further planning, so
//! only the cheapest per key is kept.

use crate::qet::QueryExecutionTree;
use crate::var_registry::VarId;
use std::collections::BTreeSet;
use std::sync::Arc;

/// A candidate plan covering a subset of the triple graph.
#[derive(Debug, Clone)]
pub struct SubtreePlan {
    /// The operator tree
    pub qet: Arc<QueryExecutionTree>,
    /// Ids of the triple-graph nodes this plan resolves
    pub covered_nodes: BTreeSet<usize>,
    /// Ids of the filters already applied inside the tree
    pub covered_filters: BTreeSet<usize>,
}

impl SubtreePlan {
    /// A leaf plan covering exactly one node, no filters applied.
    pub fn leaf(qet: QueryExecutionTree, node_id: usize) -> Self {
        Self {
            qet: Arc::new(qet),
            covered_nodes: BTreeSet::from([node_id]),
            covered_filters: BTreeSet::new(),
        }
    }

    pub fn cost_estimate(&self) -> u64 {
        self.qet.cost_estimate()
    }

    pub fn size_estimate(&self) -> u64 {
        self.qet.size_estimate()
    }

    /// Canonical signature under an assumed sort column.
    ///
    /// Two plans with the same signature cover the same nodes and present
    /// the same ordering to their parent, so the cheaper one subsumes the
    /// other.
    pub fn pruning_key(&self, assumed_sort_col: usize) -> PruningKey {
        PruningKey {
            sort_var: self.qet.var_columns().var_at(assumed_sort_col),
            covered_nodes: self.covered_nodes.iter().copied().collect(),
        }
    }
}

/// Structured pruning signature: the variable assumed sorted on, plus the
/// sorted covered node ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PruningKey {
    pub sort_var: Option<VarId>,
    pub covered_nodes: Vec<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qet::{IndexScan, Operation, VarColumns};
    use graphtext_core::{IndexStats, MemoryIndexStats};

    fn leaf(node_id: usize, var: VarId, stats: &dyn IndexStats) -> SubtreePlan {
        let scan = IndexScan::pos_bound_object("<p>".into(), "<o>".into(), stats);
        let columns: VarColumns = [(var, 0)].into_iter().collect();
        SubtreePlan::leaf(
            QueryExecutionTree::new(Operation::Scan(scan), columns, Some(0), Vec::new()),
            node_id,
        )
    }

    #[test]
    fn test_leaf_covers_one_node() {
        let stats = MemoryIndexStats::new();
        let plan = leaf(3, VarId(0), &stats);
        assert_eq!(plan.covered_nodes.iter().copied().collect::<Vec<_>>(), [3]);
        assert!(plan.covered_filters.is_empty());
    }

    #[test]
    fn test_pruning_key_is_sort_var_plus_sorted_nodes() {
        let stats = MemoryIndexStats::new();
        let mut plan = leaf(2, VarId(7), &stats);
        plan.covered_nodes.insert(0);

        let key = plan.pruning_key(0);
        assert_eq!(key.sort_var, Some(VarId(7)));
        assert_eq!(key.covered_nodes, vec![0, 2]);

        // A column with no variable yields a key without a sort variable.
        let key = plan.pruning_key(9);
        assert_eq!(key.sort_var, None);
    }

    #[test]
    fn test_same_shape_same_key() {
        let stats = MemoryIndexStats::new();
        let a = leaf(1, VarId(0), &stats);
        let b = leaf(1, VarId(0), &stats);
        assert_eq!(a.pruning_key(0), b.pruning_key(0));
    }
}
