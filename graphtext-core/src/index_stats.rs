//! Index statistics oracle for query planning.
//!
//! The planner never touches index data; it only asks an [`IndexStats`]
//! implementation for size estimates of leaf scan configurations and text
//! block lookups. Real deployments back this with on-disk index metadata;
//! [`MemoryIndexStats`] provides a `HashMap`-backed implementation for tests
//! and for embedders that load statistics from serialized form.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Read-only cardinality oracle over a pre-built RDF + text index.
///
/// All estimates are in number of triples (or text contexts for
/// [`text_hits`](IndexStats::text_hits)). Implementations must be cheap to
/// call and safe for concurrent read: the planner may be invoked from
/// multiple threads against one shared oracle.
pub trait IndexStats: Send + Sync {
    /// Total number of triples stored for a predicate.
    fn relation_size(&self, predicate: &str) -> u64;

    /// Number of triples for `predicate` with the given fixed subject.
    fn count_with_subject(&self, predicate: &str, subject: &str) -> u64;

    /// Number of triples for `predicate` with the given fixed object.
    fn count_with_object(&self, predicate: &str, object: &str) -> u64;

    /// Number of text contexts matching a space-separated word sequence.
    fn text_hits(&self, words: &str) -> u64;

    /// Average number of distinct entities mentioned per text context.
    ///
    /// Used to estimate the cross-product factor of text operations with
    /// entity variables. Must be at least 1.
    fn entities_per_context(&self) -> u64;
}

/// Statistics for a single predicate, as stored in index metadata.
///
/// `ndv_subjects` / `ndv_objects` are the number of distinct subjects and
/// objects occurring with the predicate; they drive the per-key estimates
/// when no exact per-key count is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredicateStatEntry {
    /// Total number of triples with this predicate
    pub count: u64,
    /// Number of distinct subjects occurring with this predicate
    pub ndv_subjects: u64,
    /// Number of distinct objects occurring with this predicate
    pub ndv_objects: u64,
}

impl PredicateStatEntry {
    /// Estimated triples per fixed subject: `ceil(count / ndv_subjects)`.
    fn per_subject(&self) -> u64 {
        if self.ndv_subjects == 0 {
            0
        } else {
            self.count.div_ceil(self.ndv_subjects)
        }
    }

    /// Estimated triples per fixed object: `ceil(count / ndv_objects)`.
    fn per_object(&self) -> u64 {
        if self.ndv_objects == 0 {
            0
        } else {
            self.count.div_ceil(self.ndv_objects)
        }
    }
}

/// In-memory [`IndexStats`] implementation.
///
/// Per-key overrides take precedence over the NDV-derived estimates from
/// [`PredicateStatEntry`]; unknown predicates and words estimate to zero.
#[derive(Debug, Default, Clone)]
pub struct MemoryIndexStats {
    predicates: HashMap<String, PredicateStatEntry>,
    subject_counts: HashMap<(String, String), u64>,
    object_counts: HashMap<(String, String), u64>,
    text_blocks: HashMap<String, u64>,
    entities_per_context: u64,
}

impl MemoryIndexStats {
    /// Create an empty oracle (every estimate is zero).
    pub fn new() -> Self {
        Self {
            entities_per_context: 1,
            ..Self::default()
        }
    }

    /// Build from deserialized predicate stat entries.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, PredicateStatEntry)>,
    {
        let mut stats = Self::new();
        for (predicate, entry) in entries {
            stats.predicates.insert(predicate, entry);
        }
        stats
    }

    /// Record statistics for a predicate.
    pub fn set_predicate(&mut self, predicate: &str, entry: PredicateStatEntry) -> &mut Self {
        self.predicates.insert(predicate.to_string(), entry);
        self
    }

    /// Record an exact triple count for a (predicate, subject) pair.
    pub fn set_subject_count(&mut self, predicate: &str, subject: &str, count: u64) -> &mut Self {
        self.subject_counts
            .insert((predicate.to_string(), subject.to_string()), count);
        self
    }

    /// Record an exact triple count for a (predicate, object) pair.
    pub fn set_object_count(&mut self, predicate: &str, object: &str, count: u64) -> &mut Self {
        self.object_counts
            .insert((predicate.to_string(), object.to_string()), count);
        self
    }

    /// Record the number of contexts matching a word sequence.
    pub fn set_text_hits(&mut self, words: &str, hits: u64) -> &mut Self {
        self.text_blocks.insert(words.to_string(), hits);
        self
    }

    /// Set the average number of distinct entities per context.
    ///
    /// Values below 1 are clamped to 1.
    pub fn set_entities_per_context(&mut self, avg: u64) -> &mut Self {
        self.entities_per_context = avg.max(1);
        self
    }
}

impl IndexStats for MemoryIndexStats {
    fn relation_size(&self, predicate: &str) -> u64 {
        self.predicates.get(predicate).map_or(0, |e| e.count)
    }

    fn count_with_subject(&self, predicate: &str, subject: &str) -> u64 {
        if let Some(&count) = self
            .subject_counts
            .get(&(predicate.to_string(), subject.to_string()))
        {
            return count;
        }
        self.predicates.get(predicate).map_or(0, |e| e.per_subject())
    }

    fn count_with_object(&self, predicate: &str, object: &str) -> u64 {
        if let Some(&count) = self
            .object_counts
            .get(&(predicate.to_string(), object.to_string()))
        {
            return count;
        }
        self.predicates.get(predicate).map_or(0, |e| e.per_object())
    }

    fn text_hits(&self, words: &str) -> u64 {
        self.text_blocks.get(words).copied().unwrap_or(0)
    }

    fn entities_per_context(&self) -> u64 {
        self.entities_per_context.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MemoryIndexStats {
        let mut stats = MemoryIndexStats::new();
        stats.set_predicate(
            "<p>",
            PredicateStatEntry {
                count: 1000,
                ndv_subjects: 100,
                ndv_objects: 10,
            },
        );
        stats.set_text_hits("climate", 40);
        stats
    }

    #[test]
    fn test_relation_size() {
        let stats = sample();
        assert_eq!(stats.relation_size("<p>"), 1000);
        assert_eq!(stats.relation_size("<missing>"), 0);
    }

    #[test]
    fn test_ndv_derived_estimates() {
        let stats = sample();
        // ceil(1000 / 100) and ceil(1000 / 10)
        assert_eq!(stats.count_with_subject("<p>", "<s>"), 10);
        assert_eq!(stats.count_with_object("<p>", "<o>"), 100);
    }

    #[test]
    fn test_per_key_override_wins() {
        let mut stats = sample();
        stats.set_object_count("<p>", "<rare>", 2);
        assert_eq!(stats.count_with_object("<p>", "<rare>"), 2);
        assert_eq!(stats.count_with_object("<p>", "<other>"), 100);
    }

    #[test]
    fn test_text_hits() {
        let stats = sample();
        assert_eq!(stats.text_hits("climate"), 40);
        assert_eq!(stats.text_hits("unknown words"), 0);
    }

    #[test]
    fn test_entities_per_context_clamped() {
        let mut stats = MemoryIndexStats::new();
        stats.set_entities_per_context(0);
        assert_eq!(stats.entities_per_context(), 1);
        stats.set_entities_per_context(3);
        assert_eq!(stats.entities_per_context(), 3);
    }

    #[test]
    fn test_entry_round_trips_through_json() {
        let entry = PredicateStatEntry {
            count: 7,
            ndv_subjects: 3,
            ndv_objects: 2,
        };
        let json = serde_json::to_string(&entry).unwrap();
        let back: PredicateStatEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
    }
}
