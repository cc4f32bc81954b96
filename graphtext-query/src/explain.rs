//! Query plan explanation
//!
//! Renders a chosen execution tree with its estimates for debugging and for
//! surfacing optimization decisions to callers. The output types serialize
//! so embedders can ship them as JSON diagnostics.

use crate::ir::CompareOp;
use crate::qet::{Operation, QueryExecutionTree};
use crate::var_registry::VarRegistry;
use serde::Serialize;
use std::fmt;

/// Explanation of a planned query.
#[derive(Debug, Clone, Serialize)]
pub struct ExplainPlan {
    /// Estimated result rows of the root
    pub size_estimate: u64,
    /// Estimated total cost of the root
    pub cost_estimate: u64,
    /// Text limit annotation on the chosen tree
    pub text_limit: u64,
    /// The operator tree
    pub root: OperatorDisplay,
}

/// One operator of the rendered tree.
#[derive(Debug, Clone, Serialize)]
pub struct OperatorDisplay {
    /// Operator name with its interesting arguments
    pub operator: String,
    /// Variable name per output column, in column order
    pub columns: Vec<ColumnDisplay>,
    /// Column the result is sorted on, if any
    pub sorted_on: Option<usize>,
    pub size_estimate: u64,
    pub cost_estimate: u64,
    pub children: Vec<OperatorDisplay>,
}

/// A (variable, column) pair of an operator's output.
#[derive(Debug, Clone, Serialize)]
pub struct ColumnDisplay {
    pub var: String,
    pub column: usize,
}

/// Render an execution tree for diagnostics.
pub fn explain(tree: &QueryExecutionTree, vars: &VarRegistry) -> ExplainPlan {
    ExplainPlan {
        size_estimate: tree.size_estimate(),
        cost_estimate: tree.cost_estimate(),
        text_limit: tree.text_limit(),
        root: render(tree, vars),
    }
}

fn render(tree: &QueryExecutionTree, vars: &VarRegistry) -> OperatorDisplay {
    let mut columns: Vec<ColumnDisplay> = tree
        .var_columns()
        .iter()
        .map(|(var, column)| ColumnDisplay {
            var: vars
                .try_name(var)
                .unwrap_or("?<unknown>")
                .to_string(),
            column,
        })
        .collect();
    columns.sort_by_key(|c| c.column);

    OperatorDisplay {
        operator: operator_line(tree.op()),
        columns,
        sorted_on: tree.sorted_on(),
        size_estimate: tree.size_estimate(),
        cost_estimate: tree.cost_estimate(),
        children: tree
            .op()
            .children()
            .into_iter()
            .map(|child| render(child, vars))
            .collect(),
    }
}

fn operator_line(op: &Operation) -> String {
    match op {
        Operation::Scan(scan) => {
            let fixed = scan
                .subject
                .as_deref()
                .or(scan.object.as_deref())
                .unwrap_or("");
            if fixed.is_empty() {
                format!("Scan {:?} {}", scan.kind, scan.predicate)
            } else {
                format!("Scan {:?} {} {}", scan.kind, scan.predicate, fixed)
            }
        }
        Operation::Join(j) => format!("Join on columns ({}, {})", j.left_col, j.right_col),
        Operation::Sort(s) => format!("Sort on column {}", s.col),
        Operation::OrderBy(o) => {
            let keys: Vec<String> = o
                .keys
                .iter()
                .map(|(col, desc)| format!("{}{}", col, if *desc { " desc" } else { "" }))
                .collect();
            format!("OrderBy on columns [{}]", keys.join(", "))
        }
        Operation::Filter(f) => format!(
            "Filter column {} {} column {}",
            f.lhs_col,
            op_symbol(f.op),
            f.rhs_col
        ),
        Operation::Distinct(d) => format!("Distinct keeping columns {:?}", d.keep_cols),
        Operation::TextWithoutFilter(t) => {
            format!("TextWithoutFilter \"{}\"", t.word_part)
        }
        Operation::TextWithFilter(t) => format!(
            "TextWithFilter \"{}\" filtered on column {}",
            t.word_part, t.filter_col
        ),
        Operation::TextForContexts(t) => format!("TextForContexts \"{}\"", t.word_part),
    }
}

fn op_symbol(op: CompareOp) -> &'static str {
    match op {
        CompareOp::Eq => "=",
        CompareOp::Ne => "!=",
        CompareOp::Lt => "<",
        CompareOp::Le => "<=",
        CompareOp::Gt => ">",
        CompareOp::Ge => ">=",
    }
}

impl fmt::Display for ExplainPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn write_op(
            f: &mut fmt::Formatter<'_>,
            op: &OperatorDisplay,
            depth: usize,
        ) -> fmt::Result {
            let indent = "  ".repeat(depth);
            writeln!(
                f,
                "{}{} [size={}, cost={}]",
                indent, op.operator, op.size_estimate, op.cost_estimate
            )?;
            for child in &op.children {
                write_op(f, child, depth + 1)?;
            }
            Ok(())
        }
        write_op(f, &self.root, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{ParsedQuery, SparqlTriple};
    use crate::planner::plan;
    use graphtext_core::{MemoryIndexStats, PredicateStatEntry};

    fn planned() -> crate::planner::PlannedQuery {
        let mut stats = MemoryIndexStats::new();
        for p in ["<p1>", "<p2>"] {
            stats.set_predicate(
                p,
                PredicateStatEntry {
                    count: 500,
                    ndv_subjects: 50,
                    ndv_objects: 25,
                },
            );
        }
        let pq = ParsedQuery {
            where_triples: vec![
                SparqlTriple::new("?x", "<p1>", "?y"),
                SparqlTriple::new("?y", "<p2>", "?z"),
            ],
            ..Default::default()
        };
        plan(&pq, &stats).unwrap()
    }

    #[test]
    fn test_explain_mirrors_tree_shape() {
        let planned = planned();
        let rendered = explain(&planned.tree, &planned.vars);

        assert!(rendered.root.operator.starts_with("Join"));
        assert_eq!(rendered.root.children.len(), 2);
        assert_eq!(rendered.size_estimate, planned.tree.size_estimate());
        assert_eq!(rendered.cost_estimate, planned.tree.cost_estimate());

        let vars: Vec<&str> = rendered.root.columns.iter().map(|c| c.var.as_str()).collect();
        assert_eq!(vars, vec!["?y", "?x", "?z"]);
    }

    #[test]
    fn test_display_indents_children() {
        let planned = planned();
        let text = explain(&planned.tree, &planned.vars).to_string();
        assert!(text.contains("Join on columns"));
        assert!(text.contains("\n  Scan"));
    }

    #[test]
    fn test_explain_serializes_to_json() {
        let planned = planned();
        let rendered = explain(&planned.tree, &planned.vars);
        let json = serde_json::to_value(&rendered).unwrap();
        assert!(json["root"]["operator"].as_str().unwrap().starts_with("Join"));
        assert!(json["cost_estimate"].as_u64().is_some());
    }
}
