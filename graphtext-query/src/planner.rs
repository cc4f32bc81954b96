//! Bottom-up plan enumeration
//!
//! The DP table holds, per subset size k, the pruned candidate plans
//! covering k graph nodes. Row 1 is seeded with scans and text leaves; row
//! k merges every split (i, k-i). Filters wrap a plan as soon as both their
//! variables are bound; ORDER BY and DISTINCT are appended after the table
//! is full; the cheapest plan of the last row wins.

use crate::error::{BadQuery, NotImplemented, Result};
use crate::graph::TripleGraph;
use crate::ir::{Filter, OrderKey, ParsedQuery};
use crate::merge::merge;
use crate::plan::SubtreePlan;
use crate::qet::QueryExecutionTree;
use crate::seed::{pure_text_plan, seed_with_scans_and_text};
use crate::var_registry::VarRegistry;
use graphtext_core::IndexStats;
use std::sync::Arc;
use tracing::debug;

/// The planner's output: the chosen execution tree plus the registry that
/// names its columns.
#[derive(Debug, Clone)]
pub struct PlannedQuery {
    pub tree: QueryExecutionTree,
    pub vars: VarRegistry,
}

/// Build the cost-minimal execution tree for a parsed query.
///
/// Pure function of the query and the index oracle; fails fast on malformed
/// or unsupported queries.
pub fn plan(pq: &ParsedQuery, stats: &dyn IndexStats) -> Result<PlannedQuery> {
    debug!("creating execution plan");
    let (query, mut vars) = pq.lower()?;
    if query.triples.is_empty() {
        return Err(BadQuery::NoTriples.into());
    }

    let mut graph = TripleGraph::build(&query.triples, &vars)?;
    graph.collapse_text_cliques(&vars)?;
    debug!(graph = %graph.display(&vars), "triple graph after text collapse");

    // A word-only query has exactly one plan; everything else goes through
    // the DP table.
    let mut table: Vec<Vec<SubtreePlan>> = if graph.is_pure_text_query() {
        vec![vec![pure_text_plan(&graph, &mut vars, stats)?]]
    } else {
        fill_dp_table(&graph, &query.filters, &mut vars, stats)?
    };

    if !query.order_by.is_empty() {
        let row = order_by_row(&query.order_by, table.last().expect("table nonempty"), &vars)?;
        table.push(row);
    }

    let last_row = table.last().expect("table nonempty");
    let best = min_cost_plan(last_row).ok_or(NotImplemented::CartesianProduct)?;

    let mut tree = (*best.qet).clone();
    if query.distinct {
        let keep: Vec<usize> = query
            .selected
            .iter()
            .filter_map(|&v| tree.variable_column(v))
            .collect();
        tree = QueryExecutionTree::distinct(Arc::new(tree), keep);
    }
    tree.set_text_limit(query.text_limit);

    debug!(
        cost = tree.cost_estimate(),
        size = tree.size_estimate(),
        "done creating execution plan"
    );
    Ok(PlannedQuery { tree, vars })
}

/// Fill the DP table bottom-up over the collapsed graph.
fn fill_dp_table(
    tg: &TripleGraph,
    filters: &[Filter],
    vars: &mut VarRegistry,
    stats: &dyn IndexStats,
) -> Result<Vec<Vec<SubtreePlan>>> {
    let n = tg.node_count();
    let mut table: Vec<Vec<SubtreePlan>> = Vec::with_capacity(n);

    let mut row = seed_with_scans_and_text(tg, vars, stats)?;
    apply_filters_if_possible(&mut row, filters);
    table.push(row);

    for k in 2..=n {
        table.push(Vec::new());
        for i in 1..=k / 2 {
            let merged = merge(&table[i - 1], &table[k - i - 1], tg, stats)?;
            table[k - 1].extend(merged);
            apply_filters_if_possible(&mut table[k - 1], filters);
        }
    }
    Ok(table)
}

/// Wrap every plan that newly binds both variables of a filter.
///
/// The filtered plan replaces its parent in the row; filtered and
/// unfiltered variants never coexist. Applying the pass twice is a no-op:
/// covered filter ids only grow.
fn apply_filters_if_possible(row: &mut [SubtreePlan], filters: &[Filter]) {
    for slot in row.iter_mut() {
        for (idx, f) in filters.iter().enumerate() {
            if slot.covered_filters.contains(&idx) {
                continue;
            }
            let (Some(lhs_col), Some(rhs_col)) = (
                slot.qet.variable_column(f.lhs),
                slot.qet.variable_column(f.rhs),
            ) else {
                continue;
            };
            let tree = QueryExecutionTree::filter(slot.qet.clone(), f.op, lhs_col, rhs_col);
            let mut covered_filters = slot.covered_filters.clone();
            covered_filters.insert(idx);
            *slot = SubtreePlan {
                qet: Arc::new(tree),
                covered_nodes: slot.covered_nodes.clone(),
                covered_filters,
            };
        }
    }
}

/// One more row: every previous plan made to satisfy the ORDER BY clause.
///
/// A plan already sorted on a single ascending key is reused unchanged;
/// otherwise a Sort (single ascending key) or OrderBy (anything else) is
/// inserted, preserving columns and covered sets.
fn order_by_row(
    order_by: &[OrderKey],
    previous: &[SubtreePlan],
    vars: &VarRegistry,
) -> Result<Vec<SubtreePlan>> {
    let mut row = Vec::with_capacity(previous.len());
    for plan in previous {
        let key_col = |key: &OrderKey| -> Result<usize> {
            plan.qet
                .variable_column(key.var)
                .ok_or_else(|| BadQuery::UnboundOrderKey(vars.name(key.var).to_string()).into())
        };

        if order_by.len() == 1 && !order_by[0].descending {
            let col = key_col(&order_by[0])?;
            if plan.qet.sorted_on() == Some(col) {
                row.push(plan.clone());
            } else {
                row.push(rewrapped(plan, QueryExecutionTree::sort(plan.qet.clone(), col)));
            }
        } else {
            let keys = order_by
                .iter()
                .map(|k| key_col(k).map(|col| (col, k.descending)))
                .collect::<Result<Vec<_>>>()?;
            row.push(rewrapped(
                plan,
                QueryExecutionTree::order_by(plan.qet.clone(), keys),
            ));
        }
    }
    Ok(row)
}

/// A plan with the same covered sets but a new root tree.
fn rewrapped(plan: &SubtreePlan, tree: QueryExecutionTree) -> SubtreePlan {
    SubtreePlan {
        qet: Arc::new(tree),
        covered_nodes: plan.covered_nodes.clone(),
        covered_filters: plan.covered_filters.clone(),
    }
}

/// The first plan with minimal cost estimate.
fn min_cost_plan(row: &[SubtreePlan]) -> Option<&SubtreePlan> {
    let mut best: Option<&SubtreePlan> = None;
    for plan in row {
        let better = match best {
            None => true,
            Some(b) => plan.cost_estimate() < b.cost_estimate(),
        };
        if better {
            best = Some(plan);
        }
    }
    best
}
