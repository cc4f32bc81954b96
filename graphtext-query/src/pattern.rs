//! Triple pattern terms for the planner's typed IR
//!
//! Terms are classified purely by lexical form: a leading `?` makes a
//! variable, a leading `<` an IRI, anything else non-empty a word literal
//! (a token for the text index). The SPARQL parser that produces the raw
//! strings lives outside this crate.

use crate::var_registry::{VarId, VarRegistry};
use graphtext_core::vocab;
use std::fmt;
use std::sync::Arc;

/// A term in a triple pattern.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Term {
    /// Variable binding
    Var(VarId),
    /// IRI in its raw lexical form, angle brackets included
    Iri(Arc<str>),
    /// Word literal: a context-search token
    Word(Arc<str>),
}

impl Term {
    /// Classify a raw term by lexical form, interning variables.
    ///
    /// `?`-prefixed strings become variables, `<`-prefixed strings IRIs,
    /// any other non-empty string a word. The empty string is an IRI.
    pub fn classify(raw: &str, vars: &mut VarRegistry) -> Term {
        if raw.starts_with('?') {
            Term::Var(vars.get_or_insert(raw))
        } else if raw.is_empty() || raw.starts_with('<') {
            Term::Iri(Arc::from(raw))
        } else {
            Term::Word(Arc::from(raw))
        }
    }

    /// Check if this term is a variable
    pub fn is_var(&self) -> bool {
        matches!(self, Term::Var(_))
    }

    /// Get the variable if this is a Var term
    pub fn as_var(&self) -> Option<VarId> {
        match self {
            Term::Var(v) => Some(*v),
            _ => None,
        }
    }

    /// Get the raw lexical form if this term is constant (IRI or word)
    pub fn as_constant(&self) -> Option<&Arc<str>> {
        match self {
            Term::Iri(s) | Term::Word(s) => Some(s),
            Term::Var(_) => None,
        }
    }

    /// Render the term back to its lexical form.
    pub fn display<'a>(&'a self, vars: &'a VarRegistry) -> &'a str {
        match self {
            Term::Var(v) => vars.name(*v),
            Term::Iri(s) | Term::Word(s) => s,
        }
    }
}

/// A triple pattern over typed terms.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TriplePattern {
    /// Subject term
    pub s: Term,
    /// Predicate term
    pub p: Term,
    /// Object term
    pub o: Term,
}

impl TriplePattern {
    /// Create a new triple pattern
    pub fn new(s: Term, p: Term, o: Term) -> Self {
        Self { s, p, o }
    }

    /// Classify three raw strings into a pattern, interning variables.
    pub fn classify(s: &str, p: &str, o: &str, vars: &mut VarRegistry) -> Self {
        Self {
            s: Term::classify(s, vars),
            p: Term::classify(p, vars),
            o: Term::classify(o, vars),
        }
    }

    /// Distinct variables of this pattern in s, p, o order.
    pub fn variables(&self) -> Vec<VarId> {
        let mut out = Vec::with_capacity(3);
        for term in [&self.s, &self.p, &self.o] {
            if let Term::Var(v) = term {
                if !out.contains(v) {
                    out.push(*v);
                }
            }
        }
        out
    }

    /// Check whether the predicate is one of the text predicates.
    pub fn is_text(&self) -> bool {
        matches!(&self.p, Term::Iri(iri) if vocab::is_text_predicate(iri))
    }

    /// Render the pattern back to its lexical form for error messages.
    pub fn display(&self, vars: &VarRegistry) -> String {
        format!(
            "{} {} {}",
            self.s.display(vars),
            self.p.display(vars),
            self.o.display(vars)
        )
    }
}

// Renders a term without access to variable names. Variables print by id
// (`?#3`); only for output where the registry is out of reach.
impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Var(v) => write!(f, "?#{}", v.0),
            Term::Iri(s) | Term::Word(s) => write!(f, "{s}"),
        }
    }
}
