//! Well-known predicate IRIs.
//!
//! The planner recognizes text triples by comparing the predicate's lexical
//! form against these constants with plain string equality. Embedding
//! applications that use different IRIs for their text index rewrite them to
//! these before handing a parsed query to the planner.

/// Predicate linking a word or an entity to a text context it occurs in.
///
/// `?c <in-context> "word"` constrains the context `?c` to contain the word;
/// `?x <in-context> ?c` binds `?x` to entities mentioned in `?c`.
pub const IN_CONTEXT: &str = "<in-context>";

/// Inverse direction of [`IN_CONTEXT`]: an entity or word on the subject
/// side, the context on the object side.
pub const HAS_CONTEXT: &str = "<has-context>";

/// Check whether a predicate's lexical form is one of the text predicates.
pub fn is_text_predicate(predicate: &str) -> bool {
    predicate == IN_CONTEXT || predicate == HAS_CONTEXT
}
