//! Station name search.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;

use crate::domain::StationId;

/// A station returned by a name search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StationMatch {
    pub id: StationId,
    pub name: String,
}

#[derive(Debug)]
struct Entry {
    id: StationId,
    name: String,
    folded: String,
}

/// Immutable, cheaply cloned station lookup.
///
/// Entries are kept sorted by name so search results come out in a stable
/// order.
#[derive(Debug, Clone, Default)]
pub struct StationDirectory {
    entries: Arc<Vec<Entry>>,
}

impl StationDirectory {
    /// Build from `(id, name)` pairs. The first name seen for an id wins.
    pub fn from_entries<'a>(stations: impl IntoIterator<Item = (&'a StationId, &'a str)>) -> Self {
        let mut seen = HashSet::new();
        let mut entries: Vec<Entry> = stations
            .into_iter()
            .filter(|(id, _)| seen.insert((*id).clone()))
            .map(|(id, name)| Entry {
                id: id.clone(),
                name: name.to_string(),
                folded: name.to_lowercase(),
            })
            .collect();
        entries.sort_by(|a, b| a.folded.cmp(&b.folded).then_with(|| a.id.cmp(&b.id)));

        Self {
            entries: Arc::new(entries),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a station name by id.
    pub fn name(&self, id: &StationId) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| &e.id == id)
            .map(|e| e.name.as_str())
    }

    /// Case-insensitive substring search on station names.
    ///
    /// Names starting with the query come first, then names containing it
    /// elsewhere. A blank query matches nothing.
    pub fn search_by_name(&self, query: &str, limit: usize) -> Vec<StationMatch> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Vec::new();
        }

        let prefix = self.entries.iter().filter(|e| e.folded.starts_with(&query));
        let inner = self
            .entries
            .iter()
            .filter(|e| !e.folded.starts_with(&query) && e.folded.contains(&query));

        prefix
            .chain(inner)
            .take(limit)
            .map(|e| StationMatch {
                id: e.id.clone(),
                name: e.name.clone(),
            })
            .collect()
    }
}
