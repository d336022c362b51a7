//! Entity metadata view.
//!
//! The compiler consumes this mapping; it never discovers table or column
//! names itself. Metadata is produced by the hosting layer (derive macro,
//! registry, hand-written) and handed in per call.

use serde::{Deserialize, Serialize};

/// One mapped column: a typed property name and its physical column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMeta {
    pub property: String,
    pub column: String,
    /// Marked as the primary key by the hosting layer.
    #[serde(default)]
    pub key: bool,
}

/// The external mapping from a typed record to its table, columns and key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityMeta {
    /// The entity type name, used for diagnostics and `<Entity>Id` key lookup.
    pub entity: String,
    /// Physical table name.
    pub table: String,
    /// Ordered column list. Order matters for mutation row values.
    pub columns: Vec<ColumnMeta>,
}

impl EntityMeta {
    pub fn new(entity: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            table: table.into(),
            columns: Vec::new(),
        }
    }

    /// Register a column mapped 1:1 from a property of the same name.
    pub fn column(self, name: impl AsRef<str>) -> Self {
        let name = name.as_ref();
        self.mapped_column(name, name)
    }

    /// Register a column with distinct property and physical names.
    pub fn mapped_column(mut self, property: impl Into<String>, column: impl Into<String>) -> Self {
        self.columns.push(ColumnMeta {
            property: property.into(),
            column: column.into(),
            key: false,
        });
        self
    }

    /// Register the key-marked column.
    pub fn key_column(mut self, name: impl AsRef<str>) -> Self {
        let name = name.as_ref();
        self.columns.push(ColumnMeta {
            property: name.to_string(),
            column: name.to_string(),
            key: true,
        });
        self
    }

    /// Physical column for a property name, if mapped.
    pub fn column_for(&self, property: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|c| c.property == property)
            .map(|c| c.column.as_str())
    }

    /// Ordered physical column names.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.column.as_str()).collect()
    }

    /// Primary key column, resolved by fallback: key-marked column, then a
    /// column literally named `Id`, then `<Entity>Id`. With no match this
    /// defaults to a literal `Id`, which fails at execution time if the
    /// table has no such column.
    pub fn primary_key(&self) -> String {
        if let Some(c) = self.columns.iter().find(|c| c.key) {
            return c.column.clone();
        }
        if let Some(c) = self.columns.iter().find(|c| c.column == "Id") {
            return c.column.clone();
        }
        let typed = format!("{}Id", self.entity);
        if let Some(c) = self.columns.iter().find(|c| c.column == typed) {
            return c.column.clone();
        }
        "Id".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_for_maps_property() {
        let meta = EntityMeta::new("User", "Users")
            .key_column("Id")
            .mapped_column("FullName", "full_name");
        assert_eq!(meta.column_for("FullName"), Some("full_name"));
        assert_eq!(meta.column_for("Missing"), None);
    }

    #[test]
    fn test_primary_key_prefers_key_marked() {
        let meta = EntityMeta::new("User", "Users")
            .column("Id")
            .key_column("UserKey");
        assert_eq!(meta.primary_key(), "UserKey");
    }

    #[test]
    fn test_primary_key_falls_back_to_id() {
        let meta = EntityMeta::new("User", "Users").column("Id").column("Name");
        assert_eq!(meta.primary_key(), "Id");
    }

    #[test]
    fn test_primary_key_falls_back_to_typed_id() {
        let meta = EntityMeta::new("User", "Users")
            .column("UserId")
            .column("Name");
        assert_eq!(meta.primary_key(), "UserId");
    }

    #[test]
    fn test_primary_key_silent_default() {
        let meta = EntityMeta::new("User", "Users").column("Name");
        // No key, no Id, no UserId: defaults to a literal Id that only
        // fails once the statement executes.
        assert_eq!(meta.primary_key(), "Id");
    }
}
