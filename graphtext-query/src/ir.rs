//! Parsed query contract and lowering to the typed planner IR
//!
//! [`ParsedQuery`] is the string-based structure the SPARQL parser (outside
//! this crate) hands over. [`ParsedQuery::lower`] classifies every term by
//! lexical form, interns variable names into a [`VarRegistry`], and parses
//! the text limit, producing the typed [`Query`] all planner internals
//! operate on.

use crate::error::{BadQuery, Result};
use crate::pattern::TriplePattern;
use crate::var_registry::{VarId, VarRegistry};

/// A raw triple pattern as produced by the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SparqlTriple {
    pub s: String,
    pub p: String,
    pub o: String,
}

impl SparqlTriple {
    pub fn new(s: impl Into<String>, p: impl Into<String>, o: impl Into<String>) -> Self {
        Self {
            s: s.into(),
            p: p.into(),
            o: o.into(),
        }
    }
}

/// Comparison kind of a FILTER clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// A raw filter: comparison between two variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SparqlFilter {
    pub op: CompareOp,
    pub lhs: String,
    pub rhs: String,
}

/// A raw ORDER BY key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SparqlOrderKey {
    pub var: String,
    pub descending: bool,
}

/// The parsed query the planner consumes.
///
/// All terms are raw strings; see [`crate::pattern::Term::classify`] for how
/// they are interpreted.
#[derive(Debug, Clone, Default)]
pub struct ParsedQuery {
    /// WHERE-clause triple patterns, in query order
    pub where_triples: Vec<SparqlTriple>,
    /// FILTER clauses, in query order
    pub filters: Vec<SparqlFilter>,
    /// ORDER BY keys, outermost first
    pub order_by: Vec<SparqlOrderKey>,
    /// Whether SELECT DISTINCT was requested
    pub distinct: bool,
    /// Projected variable names, in selection order
    pub selected_variables: Vec<String>,
    /// Text limit: empty for the default, otherwise decimal digits
    pub text_limit: String,
}

/// A lowered filter over interned variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Filter {
    pub op: CompareOp,
    pub lhs: VarId,
    pub rhs: VarId,
}

/// A lowered ORDER BY key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderKey {
    pub var: VarId,
    pub descending: bool,
}

/// The typed query the planner operates on.
#[derive(Debug, Clone)]
pub struct Query {
    pub triples: Vec<TriplePattern>,
    pub filters: Vec<Filter>,
    pub order_by: Vec<OrderKey>,
    pub distinct: bool,
    pub selected: Vec<VarId>,
    pub text_limit: u64,
}

impl ParsedQuery {
    /// Lower the raw query to the typed IR, interning all variable names.
    ///
    /// Structural validation of triples (variable counts, predicate
    /// variables) happens later during triple-graph construction; lowering
    /// only classifies terms and parses the text limit.
    pub fn lower(&self) -> Result<(Query, VarRegistry)> {
        let mut vars = VarRegistry::new();

        let triples = self
            .where_triples
            .iter()
            .map(|t| TriplePattern::classify(&t.s, &t.p, &t.o, &mut vars))
            .collect();

        let filters = self
            .filters
            .iter()
            .map(|f| Filter {
                op: f.op,
                lhs: vars.get_or_insert(&f.lhs),
                rhs: vars.get_or_insert(&f.rhs),
            })
            .collect();

        let order_by = self
            .order_by
            .iter()
            .map(|k| OrderKey {
                var: vars.get_or_insert(&k.var),
                descending: k.descending,
            })
            .collect();

        let selected = self
            .selected_variables
            .iter()
            .map(|name| vars.get_or_insert(name))
            .collect();

        let text_limit = parse_text_limit(&self.text_limit)?;

        Ok((
            Query {
                triples,
                filters,
                order_by,
                distinct: self.distinct,
                selected,
                text_limit,
            },
            vars,
        ))
    }
}

/// Parse the text limit string: empty means 1, otherwise decimal digits.
fn parse_text_limit(raw: &str) -> Result<u64> {
    if raw.is_empty() {
        return Ok(1);
    }
    raw.parse::<u64>()
        .map_err(|_| BadQuery::BadTextLimit(raw.to_string()).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlanError;
    use crate::pattern::Term;

    #[test]
    fn test_lowering_interns_shared_variables() {
        let pq = ParsedQuery {
            where_triples: vec![
                SparqlTriple::new("?x", "<p1>", "?y"),
                SparqlTriple::new("?y", "<p2>", "?z"),
            ],
            ..Default::default()
        };
        let (query, vars) = pq.lower().unwrap();

        let y = vars.get("?y").unwrap();
        assert_eq!(query.triples[0].o, Term::Var(y));
        assert_eq!(query.triples[1].s, Term::Var(y));
    }

    #[test]
    fn test_lowering_filters_and_order() {
        let pq = ParsedQuery {
            where_triples: vec![SparqlTriple::new("?x", "<p>", "?z")],
            filters: vec![SparqlFilter {
                op: CompareOp::Lt,
                lhs: "?x".into(),
                rhs: "?z".into(),
            }],
            order_by: vec![SparqlOrderKey {
                var: "?x".into(),
                descending: true,
            }],
            ..Default::default()
        };
        let (query, vars) = pq.lower().unwrap();

        assert_eq!(query.filters[0].lhs, vars.get("?x").unwrap());
        assert_eq!(query.filters[0].rhs, vars.get("?z").unwrap());
        assert!(query.order_by[0].descending);
    }

    #[test]
    fn test_text_limit_parsing() {
        assert_eq!(parse_text_limit("").unwrap(), 1);
        assert_eq!(parse_text_limit("25").unwrap(), 25);
        assert!(matches!(
            parse_text_limit("many"),
            Err(PlanError::BadQuery(BadQuery::BadTextLimit(_)))
        ));
    }
}
