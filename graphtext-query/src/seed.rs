//! Leaf-level candidate plans
//!
//! Seeds the bottom row of the DP table: one or two index scans per regular
//! node, a [`TextWithoutFilter`] leaf per text node, and the single
//! [`TextForContexts`] plan of a word-only query.

use crate::error::{PlanError, Result};
use crate::graph::{Node, TextNode, TripleGraph};
use crate::pattern::TriplePattern;
use crate::plan::SubtreePlan;
use crate::qet::{
    IndexScan, Operation, QueryExecutionTree, TextForContexts, TextWithoutFilter, VarColumns,
};
use crate::var_registry::VarRegistry;
use graphtext_core::IndexStats;
use std::sync::Arc;

/// Produce the leaf plans for every node of the (collapsed) graph.
///
/// Regular nodes with one variable get the single scan direction their
/// bound positions allow; nodes with two variables get both free-scan
/// directions and the DP keeps whichever joins better downstream. Text
/// nodes get a [`TextWithoutFilter`] leaf.
pub fn seed_with_scans_and_text(
    tg: &TripleGraph,
    vars: &mut VarRegistry,
    stats: &dyn IndexStats,
) -> Result<Vec<SubtreePlan>> {
    let mut seeds = Vec::new();
    for node in tg.nodes() {
        if let Some(text) = node.as_text() {
            seeds.push(text_leaf_plan(node, text, vars, stats));
            continue;
        }
        let triple = node
            .as_triple()
            .ok_or_else(|| PlanError::Internal("node is neither triple nor text".into()))?;
        match node.vars.len() {
            1 => seeds.push(bound_scan_plan(node, triple, stats)?),
            2 => {
                seeds.push(free_scan_plan(node, triple, ScanDirection::SubjectFirst, stats)?);
                seeds.push(free_scan_plan(node, triple, ScanDirection::ObjectFirst, stats)?);
            }
            n => {
                return Err(PlanError::Internal(format!(
                    "node with {n} variables survived graph validation"
                )));
            }
        }
    }
    Ok(seeds)
}

/// Scan plan for a triple with exactly one variable.
fn bound_scan_plan(
    node: &Node,
    triple: &TriplePattern,
    stats: &dyn IndexStats,
) -> Result<SubtreePlan> {
    let predicate = triple
        .p
        .as_constant()
        .ok_or_else(|| PlanError::Internal("predicate variable in seeding".into()))?
        .clone();

    let (scan, var) = if let Some(var) = triple.s.as_var() {
        let object = triple
            .o
            .as_constant()
            .ok_or_else(|| PlanError::Internal("one-variable triple without bound object".into()))?
            .clone();
        (IndexScan::pos_bound_object(predicate, object, stats), var)
    } else if let Some(var) = triple.o.as_var() {
        let subject = triple
            .s
            .as_constant()
            .ok_or_else(|| PlanError::Internal("one-variable triple without bound subject".into()))?
            .clone();
        (IndexScan::pso_bound_subject(predicate, subject, stats), var)
    } else {
        return Err(PlanError::Internal(
            "one-variable triple binds neither subject nor object".into(),
        ));
    };

    let columns: VarColumns = [(var, 0)].into_iter().collect();
    let tree = QueryExecutionTree::new(Operation::Scan(scan), columns, Some(0), Vec::new());
    Ok(SubtreePlan::leaf(tree, node.id))
}

/// Which end of a two-variable scan comes first (and is sorted).
enum ScanDirection {
    SubjectFirst,
    ObjectFirst,
}

/// Scan plan for a triple with variable subject and object.
fn free_scan_plan(
    node: &Node,
    triple: &TriplePattern,
    direction: ScanDirection,
    stats: &dyn IndexStats,
) -> Result<SubtreePlan> {
    let predicate = triple
        .p
        .as_constant()
        .ok_or_else(|| PlanError::Internal("predicate variable in seeding".into()))?
        .clone();
    let (s_var, o_var) = match (triple.s.as_var(), triple.o.as_var()) {
        (Some(s), Some(o)) => (s, o),
        _ => {
            return Err(PlanError::Internal(
                "two-variable triple without variable ends".into(),
            ));
        }
    };

    let (scan, columns): (IndexScan, VarColumns) = match direction {
        ScanDirection::SubjectFirst => (
            IndexScan::pso_free_subject(predicate, stats),
            [(s_var, 0), (o_var, 1)].into_iter().collect(),
        ),
        ScanDirection::ObjectFirst => (
            IndexScan::pos_free_object(predicate, stats),
            [(o_var, 0), (s_var, 1)].into_iter().collect(),
        ),
    };
    let tree = QueryExecutionTree::new(Operation::Scan(scan), columns, Some(0), Vec::new());
    Ok(SubtreePlan::leaf(tree, node.id))
}

/// Text leaf: contexts and scores first, then the entity variables.
fn text_leaf_plan(
    node: &Node,
    text: &TextNode,
    vars: &mut VarRegistry,
    stats: &dyn IndexStats,
) -> SubtreePlan {
    let entity_vars = node.vars.len() - 1;
    let op = TextWithoutFilter::new(Arc::from(text.word_part.as_str()), entity_vars, stats);

    let mut columns = VarColumns::new();
    columns.insert(text.cvar, 0);
    columns.insert(vars.score_var(text.cvar), 1);
    let mut next = 2;
    for &v in &node.vars {
        if v != text.cvar {
            columns.insert(v, next);
            next += 1;
        }
    }

    let tree = QueryExecutionTree::new(
        Operation::TextWithoutFilter(op),
        columns,
        None,
        vec![text.cvar],
    );
    SubtreePlan::leaf(tree, node.id)
}

/// The single plan of a word-only query: one [`TextForContexts`] operator.
pub fn pure_text_plan(
    tg: &TripleGraph,
    vars: &mut VarRegistry,
    stats: &dyn IndexStats,
) -> Result<SubtreePlan> {
    let node = tg.node(0);
    let text = node
        .as_text()
        .ok_or_else(|| PlanError::Internal("pure text query without text node".into()))?;

    let op = TextForContexts::new(Arc::from(text.word_part.as_str()), stats);
    let mut columns = VarColumns::new();
    columns.insert(text.cvar, 0);
    columns.insert(vars.score_var(text.cvar), 1);

    let tree = QueryExecutionTree::new(
        Operation::TextForContexts(op),
        columns,
        None,
        vec![text.cvar],
    );
    Ok(SubtreePlan::leaf(tree, node.id))
}
