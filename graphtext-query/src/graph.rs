//! Triple graph over the WHERE clause
//!
//! Nodes are triple patterns; an edge connects two nodes iff they share a
//! variable. Built once per query, mutated only by
//! [`TripleGraph::collapse_text_cliques`], then immutable for the rest of
//! planning. Node ids are dense (`0..n`), adjacency is a parallel
//! `Vec<Vec<usize>>`, which keeps subgraph construction a matter of an id
//! rewriting map.

use crate::error::{BadQuery, NotImplemented, PlanError, Result};
use crate::ir::Filter;
use crate::pattern::{Term, TriplePattern};
use crate::var_registry::{VarId, VarRegistry};
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt::Write as _;

/// A collapsed text operation: all text triples of one context variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextNode {
    /// The context variable tying the clique together
    pub cvar: VarId,
    /// Space-joined words from the non-variable sides, in insertion order
    pub word_part: String,
    /// The original text triples this node absorbed
    pub absorbed: Vec<TriplePattern>,
}

/// Payload of a triple-graph node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodePayload {
    /// A regular triple pattern
    Triple(TriplePattern),
    /// A collapsed text clique
    Text(TextNode),
}

/// A node of the triple graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// Dense id, position in the node list
    pub id: usize,
    /// Distinct variables this node covers. For text nodes the context
    /// variable comes first, the remaining variables in insertion order.
    pub vars: Vec<VarId>,
    pub payload: NodePayload,
}

impl Node {
    /// The collapsed text operation, if this is a text node.
    pub fn as_text(&self) -> Option<&TextNode> {
        match &self.payload {
            NodePayload::Text(t) => Some(t),
            NodePayload::Triple(_) => None,
        }
    }

    /// The triple pattern, if this is a regular node.
    pub fn as_triple(&self) -> Option<&TriplePattern> {
        match &self.payload {
            NodePayload::Triple(t) => Some(t),
            NodePayload::Text(_) => None,
        }
    }
}

/// Undirected graph of triple patterns sharing variables.
#[derive(Debug, Clone, Default)]
pub struct TripleGraph {
    nodes: Vec<Node>,
    adj: Vec<Vec<usize>>,
}

impl TripleGraph {
    /// Build the graph from the WHERE-clause triples, in insertion order.
    ///
    /// Rejects triples with no variable, with three or more distinct
    /// variables, with a variable in predicate position, and triples whose
    /// subject and object are the same variable.
    pub fn build(triples: &[TriplePattern], vars: &VarRegistry) -> Result<Self> {
        let mut graph = TripleGraph::default();

        for triple in triples {
            let node_vars = triple.variables();
            if node_vars.is_empty() {
                return Err(BadQuery::TripleWithoutVariable(triple.display(vars)).into());
            }
            if node_vars.len() >= 3 {
                return Err(NotImplemented::TooManyVariables(triple.display(vars)).into());
            }
            if triple.p.is_var() {
                return Err(NotImplemented::PredicateVariable(triple.display(vars)).into());
            }
            if triple.s.is_var() && triple.s == triple.o {
                return Err(NotImplemented::SelfJoinTriple(triple.display(vars)).into());
            }

            let id = graph.nodes.len();
            graph.adj.push(Vec::new());
            for other in 0..id {
                let shared = graph.nodes[other]
                    .vars
                    .iter()
                    .any(|v| node_vars.contains(v));
                if shared {
                    graph.adj[id].push(other);
                    graph.adj[other].push(id);
                }
            }
            graph.nodes.push(Node {
                id,
                vars: node_vars,
                payload: NodePayload::Triple(triple.clone()),
            });
        }

        Ok(graph)
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// All nodes, in id order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// A node by id.
    pub fn node(&self, id: usize) -> &Node {
        &self.nodes[id]
    }

    /// Neighbor ids of a node.
    pub fn neighbors(&self, id: usize) -> &[usize] {
        &self.adj[id]
    }

    /// Whether node `id` is an uncollapsed text triple.
    fn is_text_triple(&self, id: usize) -> bool {
        self.nodes[id].as_triple().is_some_and(|t| t.is_text())
    }

    /// True iff the collapsed graph is a single text operation over nothing
    /// but its context variable (a word-only query).
    pub fn is_pure_text_query(&self) -> bool {
        self.nodes.len() == 1 && self.nodes[0].as_text().is_some() && self.nodes[0].vars.len() == 1
    }

    /// Group the text triples by context variable.
    ///
    /// A context variable is the variable side of a text triple whose other
    /// operand is a word; text triples with two variables join the clique of
    /// whichever side is a known context variable. Returns the groups in
    /// first-appearance order of the context variable.
    fn identify_text_cliques(&self, vars: &VarRegistry) -> Result<Vec<(VarId, Vec<usize>)>> {
        // Pass 1: context variables, anchored by a word on the other side.
        let mut cvars: Vec<VarId> = Vec::new();
        for node in &self.nodes {
            if !self.is_text_triple(node.id) {
                continue;
            }
            let triple = node.as_triple().expect("text triple");
            let anchored = match (&triple.s, &triple.o) {
                (Term::Var(v), other) if !other.is_var() => Some(*v),
                (other, Term::Var(v)) if !other.is_var() => Some(*v),
                _ => None,
            };
            if let Some(cvar) = anchored {
                if !cvars.contains(&cvar) {
                    cvars.push(cvar);
                }
            }
        }

        // Pass 2: assign every text triple to its context variable's group.
        let mut groups: Vec<(VarId, Vec<usize>)> = cvars.iter().map(|&c| (c, Vec::new())).collect();
        for node in &self.nodes {
            if !self.is_text_triple(node.id) {
                continue;
            }
            let triple = node.as_triple().expect("text triple");
            let s_cvar = triple.s.as_var().filter(|v| cvars.contains(v));
            let o_cvar = triple.o.as_var().filter(|v| cvars.contains(v));
            let cvar = match (s_cvar, o_cvar) {
                (Some(_), Some(_)) => {
                    // Both sides are context variables: a join of two text
                    // operations, which only arises when a cycle runs
                    // through the text index.
                    return Err(NotImplemented::CycleThroughText.into());
                }
                (Some(c), None) | (None, Some(c)) => c,
                (None, None) => {
                    return Err(BadQuery::UnanchoredTextTriple(triple.display(vars)).into());
                }
            };
            let slot = groups
                .iter_mut()
                .find(|(c, _)| *c == cvar)
                .expect("cvar registered in pass 1");
            slot.1.push(node.id);
        }

        Ok(groups)
    }

    /// Collapse each text clique into a single text node.
    ///
    /// The new text nodes take ids `0..k`; surviving regular nodes follow,
    /// preserving their relative order. Adjacency is rebuilt through an
    /// old-id to new-id map; edges into an absorbed node are redirected to
    /// its text node, self-edges dropped, duplicates collapsed.
    pub fn collapse_text_cliques(&mut self, vars: &VarRegistry) -> Result<()> {
        let cliques = self.identify_text_cliques(vars)?;
        if cliques.is_empty() {
            return Ok(());
        }

        // Build the text nodes and their old-id adjacency unions.
        let mut removed: HashMap<usize, usize> = HashMap::new();
        let mut text_nodes: Vec<Node> = Vec::with_capacity(cliques.len());
        let mut text_adj_old: Vec<BTreeSet<usize>> = Vec::with_capacity(cliques.len());
        for (text_id, (cvar, member_ids)) in cliques.iter().enumerate() {
            let mut word_part = String::new();
            let mut absorbed = Vec::with_capacity(member_ids.len());
            let mut node_vars = vec![*cvar];
            let mut adj_old = BTreeSet::new();
            for &member in member_ids {
                removed.insert(member, text_id);
                adj_old.extend(self.adj[member].iter().copied());
                let triple = self.nodes[member]
                    .as_triple()
                    .ok_or_else(|| PlanError::Internal("text clique member is not a triple".into()))?
                    .clone();
                // The word comes from the side opposite the context variable.
                // Words of one clique are co-occurrence constraints on the
                // same context, so concatenation is the right combination.
                let opposite = if triple.s.as_var() == Some(*cvar) {
                    &triple.o
                } else {
                    &triple.s
                };
                if let Term::Word(word) = opposite {
                    if !word_part.is_empty() {
                        word_part.push(' ');
                    }
                    word_part.push_str(word);
                }
                for v in triple.variables() {
                    if !node_vars.contains(&v) {
                        node_vars.push(v);
                    }
                }
                absorbed.push(triple);
            }
            if word_part.is_empty() {
                return Err(BadQuery::MissingWordPart(vars.name(*cvar).to_string()).into());
            }
            text_nodes.push(Node {
                id: text_id,
                vars: node_vars,
                payload: NodePayload::Text(TextNode {
                    cvar: *cvar,
                    word_part,
                    absorbed,
                }),
            });
            text_adj_old.push(adj_old);
        }

        let old_nodes = std::mem::take(&mut self.nodes);
        let old_adj = std::mem::take(&mut self.adj);

        // Renumber: text nodes first, survivors appended in old order.
        let mut old_to_new: HashMap<usize, usize> = HashMap::new();
        let mut survivors_old_ids: Vec<usize> = Vec::new();
        let mut new_nodes = text_nodes;
        for node in old_nodes {
            if removed.contains_key(&node.id) {
                continue;
            }
            let new_id = new_nodes.len();
            old_to_new.insert(node.id, new_id);
            survivors_old_ids.push(node.id);
            new_nodes.push(Node { id: new_id, ..node });
        }

        let map_old = |old: usize| -> usize {
            match removed.get(&old) {
                Some(&text_id) => text_id,
                None => old_to_new[&old],
            }
        };

        // Adjacency for the text nodes, then for the survivors.
        let mut new_adj: Vec<Vec<usize>> = Vec::with_capacity(new_nodes.len());
        for (text_id, adj_old) in text_adj_old.iter().enumerate() {
            let targets: BTreeSet<usize> = adj_old
                .iter()
                .map(|&old| map_old(old))
                .filter(|&new| new != text_id)
                .collect();
            new_adj.push(targets.into_iter().collect());
        }
        for &old_id in &survivors_old_ids {
            let targets: BTreeSet<usize> = old_adj[old_id].iter().map(|&old| map_old(old)).collect();
            new_adj.push(targets.into_iter().collect());
        }

        self.nodes = new_nodes;
        self.adj = new_adj;
        Ok(())
    }

    /// Breadth-first search from `start`, never entering `leave_out` nodes.
    ///
    /// Returns the reachable node ids in visit order, `start` included.
    pub fn bfs_leave_out(&self, start: usize, leave_out: &HashSet<usize>) -> Vec<usize> {
        let mut result = Vec::new();
        let mut visited: HashSet<usize> = HashSet::new();
        let mut queue = VecDeque::new();
        queue.push_back(start);
        visited.insert(start);
        while let Some(n) = queue.pop_front() {
            result.push(n);
            for &next in &self.adj[n] {
                if !visited.contains(&next) && !leave_out.contains(&next) {
                    visited.insert(next);
                    queue.push_back(next);
                }
            }
        }
        result
    }

    /// Construct the subgraph induced by `keep`.
    ///
    /// Kept nodes are renumbered densely in ascending old-id order; edges to
    /// dropped nodes disappear.
    pub fn subgraph(&self, keep: &[usize]) -> TripleGraph {
        let keep_set: HashSet<usize> = keep.iter().copied().collect();
        let mut old_to_new: HashMap<usize, usize> = HashMap::new();
        let mut nodes = Vec::with_capacity(keep_set.len());
        for node in &self.nodes {
            if keep_set.contains(&node.id) {
                let new_id = nodes.len();
                old_to_new.insert(node.id, new_id);
                nodes.push(Node {
                    id: new_id,
                    ..node.clone()
                });
            }
        }
        let mut adj = Vec::with_capacity(nodes.len());
        for node in &self.nodes {
            if keep_set.contains(&node.id) {
                adj.push(
                    self.adj[node.id]
                        .iter()
                        .filter(|t| keep_set.contains(t))
                        .map(|t| old_to_new[t])
                        .collect(),
                );
            }
        }
        TripleGraph { nodes, adj }
    }

    /// Filters that reference at least one variable covered by `nodes`.
    pub fn pick_filters(&self, filters: &[Filter], nodes: &[usize]) -> Vec<Filter> {
        let covered: HashSet<VarId> = nodes
            .iter()
            .flat_map(|&n| self.nodes[n].vars.iter().copied())
            .collect();
        filters
            .iter()
            .filter(|f| covered.contains(&f.lhs) || covered.contains(&f.rhs))
            .copied()
            .collect()
    }

    /// Render nodes and adjacency for logs and tests.
    pub fn display(&self, vars: &VarRegistry) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            match &node.payload {
                NodePayload::Triple(t) => {
                    let _ = write!(out, "{} {}", node.id, t.display(vars));
                }
                NodePayload::Text(t) => {
                    let _ = write!(
                        out,
                        "{} {{TextOp for {}, word part: \"{}\"}}",
                        node.id,
                        vars.name(t.cvar),
                        t.word_part
                    );
                }
            }
            let targets: Vec<String> = self.adj[node.id].iter().map(|t| t.to_string()).collect();
            let _ = write!(out, " : ({})", targets.join(", "));
            if node.id + 1 < self.nodes.len() {
                out.push('\n');
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{CompareOp, ParsedQuery, SparqlTriple};
    use graphtext_core::vocab;

    fn build_graph(raw: &[(&str, &str, &str)]) -> (TripleGraph, VarRegistry) {
        let pq = ParsedQuery {
            where_triples: raw
                .iter()
                .map(|(s, p, o)| SparqlTriple::new(*s, *p, *o))
                .collect(),
            ..Default::default()
        };
        let (query, vars) = pq.lower().unwrap();
        let graph = TripleGraph::build(&query.triples, &vars).unwrap();
        (graph, vars)
    }

    fn try_build(raw: &[(&str, &str, &str)]) -> Result<TripleGraph> {
        let pq = ParsedQuery {
            where_triples: raw
                .iter()
                .map(|(s, p, o)| SparqlTriple::new(*s, *p, *o))
                .collect(),
            ..Default::default()
        };
        let (query, vars) = pq.lower().unwrap();
        TripleGraph::build(&query.triples, &vars)
    }

    #[test]
    fn test_edges_iff_shared_variable() {
        let (graph, _) = build_graph(&[
            ("?x", "<p1>", "?y"),
            ("?y", "<p2>", "?z"),
            ("?a", "<p3>", "<o>"),
        ]);

        assert_eq!(graph.neighbors(0), &[1]);
        assert_eq!(graph.neighbors(1), &[0]);
        assert!(graph.neighbors(2).is_empty());
    }

    #[test]
    fn test_edge_symmetry_no_self_edges() {
        let (graph, _) = build_graph(&[
            ("?x", "<p1>", "?y"),
            ("?y", "<p2>", "?z"),
            ("?z", "<p3>", "?x"),
        ]);

        for id in 0..graph.node_count() {
            for &t in graph.neighbors(id) {
                assert_ne!(t, id, "self edge at {id}");
                assert!(
                    graph.neighbors(t).contains(&id),
                    "edge ({id}, {t}) missing its mirror"
                );
            }
        }
    }

    #[test]
    fn test_rejects_malformed_triples() {
        assert!(matches!(
            try_build(&[("<s>", "<p>", "<o>")]),
            Err(PlanError::BadQuery(BadQuery::TripleWithoutVariable(_)))
        ));
        assert!(matches!(
            try_build(&[("?a", "?p", "?b")]),
            Err(PlanError::NotImplemented(NotImplemented::TooManyVariables(_)))
        ));
        assert!(matches!(
            try_build(&[("?a", "?p", "<o>")]),
            Err(PlanError::NotImplemented(NotImplemented::PredicateVariable(_)))
        ));
        assert!(matches!(
            try_build(&[("?a", "<p>", "?a")]),
            Err(PlanError::NotImplemented(NotImplemented::SelfJoinTriple(_)))
        ));
    }

    #[test]
    fn test_collapse_merges_clique_into_one_text_node() {
        let (mut graph, vars) = build_graph(&[
            ("?c", vocab::IN_CONTEXT, "climate"),
            ("?c", vocab::IN_CONTEXT, "change"),
            ("?x", vocab::IN_CONTEXT, "?c"),
            ("?x", "<p>", "<o>"),
        ]);
        graph.collapse_text_cliques(&vars).unwrap();

        assert_eq!(graph.node_count(), 2);
        let text = graph.node(0).as_text().expect("text node first");
        assert_eq!(text.cvar, vars.get("?c").unwrap());
        assert_eq!(text.word_part, "climate change");
        assert_eq!(text.absorbed.len(), 3);

        // The regular node survived with a new dense id and the edge moved.
        assert!(graph.node(1).as_triple().is_some());
        assert_eq!(graph.neighbors(0), &[1]);
        assert_eq!(graph.neighbors(1), &[0]);
    }

    #[test]
    fn test_collapse_conserves_absorbed_triples() {
        let (mut graph, vars) = build_graph(&[
            ("?c", vocab::IN_CONTEXT, "alpha"),
            ("?d", vocab::IN_CONTEXT, "beta"),
            ("?x", vocab::IN_CONTEXT, "?c"),
            ("?x", vocab::IN_CONTEXT, "?d"),
            ("?x", "<p>", "?y"),
        ]);
        let text_triples: Vec<_> = graph
            .nodes()
            .iter()
            .filter_map(|n| n.as_triple())
            .filter(|t| t.is_text())
            .cloned()
            .collect();
        graph.collapse_text_cliques(&vars).unwrap();

        let absorbed: Vec<_> = graph
            .nodes()
            .iter()
            .filter_map(|n| n.as_text())
            .flat_map(|t| t.absorbed.iter().cloned())
            .collect();
        assert_eq!(absorbed.len(), text_triples.len());
        for t in &text_triples {
            assert!(absorbed.contains(t));
        }
        // No regular triple was absorbed; the one regular node survives.
        assert_eq!(graph.node_count(), 3);
        assert!(graph.node(2).as_triple().is_some());
    }

    #[test]
    fn test_unanchored_text_triple_fails() {
        let (mut graph, vars) = build_graph(&[
            ("?x", vocab::IN_CONTEXT, "?c"),
            ("?x", "<p>", "<o>"),
        ]);
        let err = graph.collapse_text_cliques(&vars).unwrap_err();
        assert!(matches!(
            err,
            PlanError::BadQuery(BadQuery::UnanchoredTextTriple(_))
        ));
    }

    #[test]
    fn test_collapse_without_word_part_fails() {
        // The context is anchored by a constant, but an IRI is not a word.
        let (mut graph, vars) = build_graph(&[("?c", vocab::IN_CONTEXT, "<iri>")]);
        let err = graph.collapse_text_cliques(&vars).unwrap_err();
        assert!(matches!(
            err,
            PlanError::BadQuery(BadQuery::MissingWordPart(ref v)) if v == "?c"
        ));
    }

    #[test]
    fn test_text_triple_joining_two_contexts_fails() {
        // Both sides of the third triple are context variables.
        let (mut graph, vars) = build_graph(&[
            ("?c1", vocab::IN_CONTEXT, "alpha"),
            ("?c2", vocab::IN_CONTEXT, "beta"),
            ("?c1", vocab::IN_CONTEXT, "?c2"),
        ]);
        let err = graph.collapse_text_cliques(&vars).unwrap_err();
        assert!(matches!(
            err,
            PlanError::NotImplemented(NotImplemented::CycleThroughText)
        ));
    }

    #[test]
    fn test_collapse_leaves_plain_graphs_alone() {
        let (mut graph, vars) = build_graph(&[("?x", "<p1>", "?y"), ("?y", "<p2>", "?z")]);
        let before = graph.clone();
        graph.collapse_text_cliques(&vars).unwrap();
        assert_eq!(graph.node_count(), before.node_count());
        assert_eq!(graph.nodes(), before.nodes());
    }

    #[test]
    fn test_pure_text_query_detection() {
        let (mut graph, vars) = build_graph(&[("?c", vocab::IN_CONTEXT, "climate")]);
        graph.collapse_text_cliques(&vars).unwrap();
        assert!(graph.is_pure_text_query());

        // A text node with entity variables is not a pure text query.
        let (mut graph, vars) = build_graph(&[
            ("?c", vocab::IN_CONTEXT, "climate"),
            ("?x", vocab::IN_CONTEXT, "?c"),
        ]);
        graph.collapse_text_cliques(&vars).unwrap();
        assert_eq!(graph.node_count(), 1);
        assert!(!graph.is_pure_text_query());
    }

    #[test]
    fn test_bfs_leave_out() {
        let (graph, _) = build_graph(&[
            ("?a", "<p1>", "?b"),
            ("?b", "<p2>", "?c"),
            ("?c", "<p3>", "?d"),
        ]);
        let mut leave_out = HashSet::new();
        leave_out.insert(1);
        assert_eq!(graph.bfs_leave_out(0, &leave_out), vec![0]);
        assert_eq!(graph.bfs_leave_out(2, &leave_out), vec![2]);

        let reachable = graph.bfs_leave_out(0, &HashSet::new());
        assert_eq!(reachable.len(), 3);
    }

    #[test]
    fn test_subgraph_renumbers_densely() {
        let (graph, _) = build_graph(&[
            ("?a", "<p1>", "?b"),
            ("?b", "<p2>", "?c"),
            ("?c", "<p3>", "?d"),
        ]);
        let sub = graph.subgraph(&[1, 2]);
        assert_eq!(sub.node_count(), 2);
        assert_eq!(sub.node(0).id, 0);
        assert_eq!(sub.neighbors(0), &[1]);
        assert_eq!(sub.neighbors(1), &[0]);
    }

    #[test]
    fn test_pick_filters_by_covered_vars() {
        let (graph, vars) = build_graph(&[("?a", "<p1>", "?b"), ("?c", "<p2>", "?d")]);
        let filters = vec![
            Filter {
                op: CompareOp::Lt,
                lhs: vars.get("?a").unwrap(),
                rhs: vars.get("?b").unwrap(),
            },
            Filter {
                op: CompareOp::Lt,
                lhs: vars.get("?c").unwrap(),
                rhs: vars.get("?d").unwrap(),
            },
        ];
        let picked = graph.pick_filters(&filters, &[0]);
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].lhs, vars.get("?a").unwrap());
    }

    #[test]
    fn test_display_lists_nodes_and_adjacency() {
        let (mut graph, vars) = build_graph(&[
            ("?c", vocab::IN_CONTEXT, "climate"),
            ("?x", vocab::IN_CONTEXT, "?c"),
            ("?x", "<p>", "<o>"),
        ]);
        graph.collapse_text_cliques(&vars).unwrap();
        let rendered = graph.display(&vars);
        assert!(rendered.contains("TextOp for ?c"));
        assert!(rendered.contains("word part: \"climate\""));
        assert!(rendered.contains("?x <p> <o>"));
    }
}
