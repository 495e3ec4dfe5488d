/*!
 * Prepared-statement registry shared by every session of one instance
 */

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// A statement text registered once and addressed by id afterwards
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedStatement {
    pub id: u64,
    pub sql: String,
    pub parameter_count: usize,
}

/// Maps SQL text to stable statement ids.
///
/// Registering SQL that is already known returns the existing id, and the
/// check and the insert happen under one map entry lock, so two sessions
/// racing on the same text always agree on the id.
#[derive(Debug)]
pub struct PreparedStatementRegistry {
    by_sql: DashMap<String, Arc<PreparedStatement>>,
    by_id: DashMap<u64, Arc<PreparedStatement>>,
    next_id: AtomicU64,
}

impl PreparedStatementRegistry {
    /// Ids start at 1
    pub fn new() -> Self {
        Self {
            by_sql: DashMap::new(),
            by_id: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register `sql` if absent and return its id
    pub fn register(&self, sql: &str, parameter_count: usize) -> u64 {
        match self.by_sql.entry(sql.to_string()) {
            Entry::Occupied(existing) => existing.get().id,
            Entry::Vacant(vacant) => {
                let statement = loop {
                    let id = self.next_id.fetch_add(1, Ordering::SeqCst);
                    // 0 is never handed out; ids still in use are skipped after a wrap
                    if id == 0 {
                        continue;
                    }
                    if let Entry::Vacant(slot) = self.by_id.entry(id) {
                        let statement = Arc::new(PreparedStatement {
                            id,
                            sql: sql.to_string(),
                            parameter_count,
                        });
                        slot.insert(Arc::clone(&statement));
                        break statement;
                    }
                };
                let id = statement.id;
                vacant.insert(statement);
                debug!(id, parameter_count, "Registered prepared statement");
                id
            }
        }
    }

    pub fn get(&self, id: u64) -> Option<Arc<PreparedStatement>> {
        self.by_id.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn id_of(&self, sql: &str) -> Option<u64> {
        self.by_sql.get(sql).map(|entry| entry.value().id)
    }

    /// Forget a statement; returns it if it was registered
    pub fn close(&self, id: u64) -> Option<Arc<PreparedStatement>> {
        let (_, statement) = self.by_id.remove(&id)?;
        self.by_sql.remove_if(&statement.sql, |_, current| current.id == id);
        Some(statement)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

impl Default for PreparedStatementRegistry {
    fn default() -> Self {
        Self::new()
    }
}
