/// Declarative table definition applied to the store before first use.
///
/// Columns listed in `unique` get a uniqueness constraint checked on every
/// insert and update. Columns listed in `indexed` are eligible for
/// [`find_by`](crate::MemoryStore::find_by) lookups.
#[derive(Debug, Clone)]
pub struct TableSchema {
    pub name: &'static str,
    pub unique: &'static [&'static str],
    pub indexed: &'static [&'static str],
}

impl TableSchema {
    /// Whether `column` may be used for lookups (unique columns are
    /// implicitly indexed).
    pub fn is_indexed(&self, column: &str) -> bool {
        self.unique.contains(&column) || self.indexed.contains(&column)
    }
}
