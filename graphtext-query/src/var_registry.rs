//! Variable registry for query planning
//!
//! Maps variable names (e.g., "?x", "?context") to compact [`VarId`] indices
//! used throughout the planner. Score pseudo-variables of text operations
//! (`SCORE(?c)`) are registered like any other name.

use std::collections::HashMap;
use std::sync::Arc;

/// Compact variable identifier.
///
/// u16 supports up to 65K variables per query (sufficient for any realistic query).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub u16);

impl VarId {
    /// Get the underlying index value
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// The name of the score pseudo-variable for a context variable.
///
/// A text operation over `?c` exposes its relevance score in a column
/// addressed as `SCORE(?c)`.
pub fn score_name(cvar_name: &str) -> String {
    format!("SCORE({cvar_name})")
}

/// Registry mapping variable names to compact VarId indices
///
/// Uses `Arc<str>` for cheap cloning of interned names.
#[derive(Debug, Default, Clone)]
pub struct VarRegistry {
    name_to_id: HashMap<Arc<str>, VarId>,
    id_to_name: Vec<Arc<str>>,
}

impl VarRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Get existing VarId or insert a new one
    pub fn get_or_insert(&mut self, name: &str) -> VarId {
        if let Some(&id) = self.name_to_id.get(name) {
            return id;
        }

        // VarId is u16; exceeding it would silently wrap and corrupt column maps.
        // Only reached when introducing a *new* name, i.e. at planning time.
        assert!(
            self.id_to_name.len() < u16::MAX as usize,
            "VarRegistry capacity exceeded ({}); refusing to wrap",
            self.id_to_name.len()
        );

        let id = VarId(self.id_to_name.len() as u16);
        let arc_name: Arc<str> = Arc::from(name);
        self.name_to_id.insert(arc_name.clone(), id);
        self.id_to_name.push(arc_name);
        id
    }

    /// Register the score pseudo-variable for a context variable.
    pub fn score_var(&mut self, cvar: VarId) -> VarId {
        let name = score_name(&self.id_to_name[cvar.index()]);
        self.get_or_insert(&name)
    }

    /// Get the VarId for a name, if it exists
    pub fn get(&self, name: &str) -> Option<VarId> {
        self.name_to_id.get(name).copied()
    }

    /// Get the name for a VarId
    ///
    /// # Panics
    ///
    /// Panics if the VarId is not in the registry (indicates a bug).
    pub fn name(&self, id: VarId) -> &str {
        &self.id_to_name[id.index()]
    }

    /// Get the name for a VarId, returning None if invalid
    pub fn try_name(&self, id: VarId) -> Option<&str> {
        self.id_to_name.get(id.index()).map(|s| s.as_ref())
    }

    /// Get the number of registered variables
    pub fn len(&self) -> usize {
        self.id_to_name.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.id_to_name.is_empty()
    }

    /// Iterate over all (name, VarId) pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, VarId)> {
        self.id_to_name
            .iter()
            .enumerate()
            .map(|(i, name)| (name.as_ref(), VarId(i as u16)))
    }
}
