//! Merging candidate plan sets
//!
//! Given the plans of two DP rows, enumerate every joinable pair and emit
//! the merged candidates: the ordinary sort-merge join, plus the
//! text-with-filter rewrite whenever exactly one side is a bare text
//! operation. Candidates are then pruned per [`PruningKey`], keeping the
//! cheapest plan of every signature.

use crate::error::{NotImplemented, Result};
use crate::graph::TripleGraph;
use crate::plan::{PruningKey, SubtreePlan};
use crate::qet::{Operation, QueryExecutionTree, TextWithFilter, VarColumns};
use graphtext_core::IndexStats;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Whether two plans may be joined: covered nodes disjoint, and a triple
/// graph edge from one side's nodes into the other's.
///
/// Not a symmetric connectivity predicate in the graph sense: overlapping
/// plans report false even when their nodes touch.
pub fn connected(a: &SubtreePlan, b: &SubtreePlan, tg: &TripleGraph) -> bool {
    if a.covered_nodes.intersection(&b.covered_nodes).next().is_some() {
        return false;
    }
    a.covered_nodes
        .iter()
        .flat_map(|&n| tg.neighbors(n))
        .any(|t| b.covered_nodes.contains(t))
}

/// Columns both plans bind, as (column in a, column in b) pairs in a's
/// column order.
pub fn join_columns(a: &SubtreePlan, b: &SubtreePlan) -> Vec<(usize, usize)> {
    a.qet
        .var_columns()
        .iter()
        .filter_map(|(var, a_col)| b.qet.variable_column(var).map(|b_col| (a_col, b_col)))
        .collect()
}

/// Merge two candidate sets over the triple graph.
pub fn merge(
    a: &[SubtreePlan],
    b: &[SubtreePlan],
    tg: &TripleGraph,
    stats: &dyn IndexStats,
) -> Result<Vec<SubtreePlan>> {
    let mut candidates: Vec<(PruningKey, SubtreePlan)> = Vec::new();

    for left in a {
        for right in b {
            if !connected(left, right, tg) {
                continue;
            }
            let jcs = join_columns(left, right);
            if jcs.len() != 1 {
                let through_text = is_bare_text(left) || is_bare_text(right);
                return Err(if through_text {
                    NotImplemented::CycleThroughText.into()
                } else {
                    NotImplemented::MultiColumnJoin.into()
                });
            }
            let jc = jcs[0];

            // A bare text operation on one side can absorb the other side
            // as its filter input. Emitted alongside the ordinary join, not
            // instead of it. Only an entity column (>= 2) can be restricted
            // this way; a join on the context variable stays a plain join.
            if is_bare_text(left) != is_bare_text(right) {
                let text_jc = if is_bare_text(left) { jc.0 } else { jc.1 };
                if text_jc >= 2 {
                    let plan = text_with_filter_plan(left, right, jc, stats);
                    candidates.push((plan.pruning_key(jc.0), plan));
                }
            }

            let plan = sort_merge_join_plan(left, right, jc);
            candidates.push((plan.pruning_key(jc.0), plan));
        }
    }

    Ok(prune(candidates))
}

/// Whether a plan is exactly a text operation without filter.
fn is_bare_text(plan: &SubtreePlan) -> bool {
    matches!(plan.qet.op(), Operation::TextWithoutFilter(_))
}

/// The ordinary sort-merge join of a joinable pair.
///
/// Either side gets a Sort inserted unless its result is already sorted on
/// the join column.
fn sort_merge_join_plan(left: &SubtreePlan, right: &SubtreePlan, jc: (usize, usize)) -> SubtreePlan {
    let l = sorted_on_column(&left.qet, jc.0);
    let r = sorted_on_column(&right.qet, jc.1);
    let tree = QueryExecutionTree::join(l, r, jc.0, jc.1);

    SubtreePlan {
        qet: Arc::new(tree),
        covered_nodes: left.covered_nodes.union(&right.covered_nodes).copied().collect(),
        covered_filters: left
            .covered_filters
            .union(&right.covered_filters)
            .copied()
            .collect(),
    }
}

/// The subtree itself if already sorted on `col`, else a Sort wrapper.
fn sorted_on_column(qet: &Arc<QueryExecutionTree>, col: usize) -> Arc<QueryExecutionTree> {
    if qet.sorted_on() == Some(col) {
        qet.clone()
    } else {
        Arc::new(QueryExecutionTree::sort(qet.clone(), col))
    }
}

/// Rewrite (text ⋈ other) into a TextWithFilter taking `other` as filter
/// input on the join column.
fn text_with_filter_plan(
    left: &SubtreePlan,
    right: &SubtreePlan,
    jc: (usize, usize),
    stats: &dyn IndexStats,
) -> SubtreePlan {
    let (text, other, other_col) = if is_bare_text(left) {
        (left, right, jc.1)
    } else {
        (right, left, jc.0)
    };
    let text_op = match text.qet.op() {
        Operation::TextWithoutFilter(op) => op,
        _ => unreachable!("caller checked exactly one bare text side"),
    };

    let op = TextWithFilter::new(
        text_op.word_part.clone(),
        text_op.entity_vars,
        other.qet.clone(),
        other_col,
        stats,
    );

    // Context and score keep their columns; the text operation's remaining
    // variables follow, minus the one the filter table provides (it keeps
    // its place among the filter columns appended after).
    let mut columns = VarColumns::new();
    let mut next = 2;
    for (var, col) in text.qet.var_columns().iter() {
        if col <= 1 {
            columns.insert(var, col);
        } else if !other.qet.var_covered(var) {
            columns.insert(var, next);
            next += 1;
        }
    }
    debug_assert_eq!(next, text.qet.width() - 1);
    for (var, col) in other.qet.var_columns().iter() {
        columns.insert(var, next + col);
    }

    let cvar = text.qet.context_vars()[0];
    let mut context_vars = other.qet.context_vars().to_vec();
    if !context_vars.contains(&cvar) {
        context_vars.push(cvar);
    }

    let tree = QueryExecutionTree::new(Operation::TextWithFilter(op), columns, None, context_vars);

    SubtreePlan {
        qet: Arc::new(tree),
        covered_nodes: text.covered_nodes.union(&other.covered_nodes).copied().collect(),
        covered_filters: text
            .covered_filters
            .union(&other.covered_filters)
            .copied()
            .collect(),
    }
}

/// Keep the cheapest plan per pruning key, first seen wins ties.
///
/// Output order is the first-appearance order of the keys, which keeps the
/// whole enumeration a deterministic function of input order.
fn prune(candidates: Vec<(PruningKey, SubtreePlan)>) -> Vec<SubtreePlan> {
    let total = candidates.len();
    let mut order: Vec<PruningKey> = Vec::new();
    let mut best: HashMap<PruningKey, SubtreePlan> = HashMap::new();

    for (key, plan) in candidates {
        match best.get(&key) {
            None => {
                order.push(key.clone());
                best.insert(key, plan);
            }
            Some(current) => {
                if plan.cost_estimate() < current.cost_estimate() {
                    best.insert(key, plan);
                }
            }
        }
    }

    if total > order.len() {
        debug!(
            pruned = total - order.len(),
            kept = order.len(),
            "pruned equivalent candidate plans"
        );
    }

    order
        .into_iter()
        .map(|key| best.remove(&key).expect("key recorded on insert"))
        .collect()
}
