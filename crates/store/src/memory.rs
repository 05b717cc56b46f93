use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use serde_json::{Map, Value};

use crate::error::StoreError;
use crate::schema::TableSchema;

/// Store-assigned primary key. Monotonically increasing, never reused.
pub type RecordId = u64;

/// A stored row: column name to JSON value.
pub type Row = Map<String, Value>;

struct Table {
    schema: TableSchema,
    next_id: RecordId,
    rows: BTreeMap<RecordId, Row>,
}

impl Table {
    /// Check every declared unique column of `candidate` against existing
    /// rows, ignoring `exclude` (the row being updated, if any). Runs under
    /// the store's write lock, so the check-then-write pair is atomic.
    fn check_unique(&self, candidate: &Row, exclude: Option<RecordId>) -> Result<(), StoreError> {
        for &column in self.schema.unique {
            let Some(value) = candidate.get(column) else {
                continue;
            };
            if value.is_null() {
                continue;
            }
            let collision = self
                .rows
                .iter()
                .filter(|(id, _)| Some(**id) != exclude)
                .any(|(_, row)| row.get(column) == Some(value));
            if collision {
                return Err(StoreError::UniqueViolation {
                    table: self.schema.name.to_string(),
                    column: column.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// In-process record store. Cheap to clone; all clones share state.
///
/// Stands in for an external relational engine: tables are defined up front
/// with an explicit schema, rows are JSON objects keyed by a store-assigned
/// integer id, and unique indexes are enforced under the table lock.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<HashMap<&'static str, Table>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table. Re-defining an existing table is a no-op so module
    /// restarts stay idempotent.
    pub fn define_table(&self, schema: TableSchema) {
        let mut tables = self.tables.write().expect("store lock poisoned");
        if tables.contains_key(schema.name) {
            tracing::debug!(table = schema.name, "table already defined");
            return;
        }
        tracing::info!(
            table = schema.name,
            unique = ?schema.unique,
            indexed = ?schema.indexed,
            "table defined"
        );
        tables.insert(
            schema.name,
            Table {
                schema,
                next_id: 1,
                rows: BTreeMap::new(),
            },
        );
    }

    /// Insert a row, returning the assigned id. Fails if a declared unique
    /// column collides with an existing row.
    pub fn insert(&self, table: &str, row: Row) -> Result<RecordId, StoreError> {
        let mut tables = self.tables.write().expect("store lock poisoned");
        let table = lookup_mut(&mut tables, table)?;
        table.check_unique(&row, None)?;
        let id = table.next_id;
        table.next_id += 1;
        table.rows.insert(id, row);
        Ok(id)
    }

    pub fn get(&self, table: &str, id: RecordId) -> Result<Row, StoreError> {
        let tables = self.tables.read().expect("store lock poisoned");
        let table = lookup(&tables, table)?;
        table.rows.get(&id).cloned().ok_or_else(|| StoreError::NotFound {
            table: table.schema.name.to_string(),
            id,
        })
    }

    /// Replace the row at `id` wholesale. The caller supplies the complete
    /// post-update row; merging partial changes is the caller's concern.
    pub fn update(&self, table: &str, id: RecordId, row: Row) -> Result<(), StoreError> {
        let mut tables = self.tables.write().expect("store lock poisoned");
        let table = lookup_mut(&mut tables, table)?;
        if !table.rows.contains_key(&id) {
            return Err(StoreError::NotFound {
                table: table.schema.name.to_string(),
                id,
            });
        }
        table.check_unique(&row, Some(id))?;
        table.rows.insert(id, row);
        Ok(())
    }

    pub fn delete(&self, table: &str, id: RecordId) -> Result<(), StoreError> {
        let mut tables = self.tables.write().expect("store lock poisoned");
        let table = lookup_mut(&mut tables, table)?;
        if table.rows.remove(&id).is_none() {
            return Err(StoreError::NotFound {
                table: table.schema.name.to_string(),
                id,
            });
        }
        Ok(())
    }

    /// All rows in id order.
    pub fn scan(&self, table: &str) -> Result<Vec<(RecordId, Row)>, StoreError> {
        let tables = self.tables.read().expect("store lock poisoned");
        let table = lookup(&tables, table)?;
        Ok(table.rows.iter().map(|(id, row)| (*id, row.clone())).collect())
    }

    pub fn count(&self, table: &str) -> Result<usize, StoreError> {
        let tables = self.tables.read().expect("store lock poisoned");
        Ok(lookup(&tables, table)?.rows.len())
    }

    /// Rows whose `column` equals `value`. Only columns declared in the
    /// schema as unique or indexed may be queried this way.
    pub fn find_by(
        &self,
        table: &str,
        column: &str,
        value: &Value,
    ) -> Result<Vec<(RecordId, Row)>, StoreError> {
        let tables = self.tables.read().expect("store lock poisoned");
        let table = lookup(&tables, table)?;
        if !table.schema.is_indexed(column) {
            return Err(StoreError::UnindexedColumn {
                table: table.schema.name.to_string(),
                column: column.to_string(),
            });
        }
        Ok(table
            .rows
            .iter()
            .filter(|(_, row)| row.get(column) == Some(value))
            .map(|(id, row)| (*id, row.clone()))
            .collect())
    }
}

fn lookup<'a>(
    tables: &'a HashMap<&'static str, Table>,
    name: &str,
) -> Result<&'a Table, StoreError> {
    tables
        .get(name)
        .ok_or_else(|| StoreError::UnknownTable(name.to_string()))
}

fn lookup_mut<'a>(
    tables: &'a mut HashMap<&'static str, Table>,
    name: &str,
) -> Result<&'a mut Table, StoreError> {
    tables
        .get_mut(name)
        .ok_or_else(|| StoreError::UnknownTable(name.to_string()))
}
