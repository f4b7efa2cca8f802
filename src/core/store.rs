use crate::domain::model::QueryId;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Address lines per finished query.
///
/// Written by the aggregator only and read by any number of pollers. Every
/// write replaces the whole entry under the write lock, so a reader sees either
/// no entry or the complete list for that query.
#[derive(Debug, Default)]
pub struct ResultStore {
    entries: RwLock<HashMap<QueryId, Vec<String>>>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `lines` under `id`, returning whatever was there before.
    pub fn insert(&self, id: QueryId, lines: Vec<String>) -> Option<Vec<String>> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(id, lines)
    }

    /// `None` covers pending, dropped and never-issued ids alike.
    pub fn get(&self, id: QueryId) -> Option<Vec<String>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(&id).cloned()
    }

    pub fn contains(&self, id: QueryId) -> bool {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
