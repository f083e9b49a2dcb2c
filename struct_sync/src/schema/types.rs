//! Type definitions for parsed table structure

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::schema::parser::split_field_type;

/// Semantic description of one column, compared instead of the raw clause text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSchema {
    pub name: String,
    pub field_type: String,
    pub length: u32,
    pub allow_null: bool,
    pub default_value: String,
}

impl FieldSchema {
    /// Build a field from `SHOW COLUMNS` style metadata
    pub fn from_metadata(name: &str, type_text: &str, nullable: &str, default: Option<&str>) -> Self {
        let (field_type, length) = split_field_type(type_text);
        Self {
            name: name.to_string(),
            field_type,
            length,
            allow_null: nullable != "NO",
            default_value: default.unwrap_or("").trim_matches('\'').to_string(),
        }
    }

    /// Whether the column needs a `CHANGE` to match `other`
    pub fn differs_from(&self, other: &FieldSchema) -> bool {
        self.field_type != other.field_type
            || self.length != other.length
            || self.default_value != other.default_value
    }
}

/// Kind of a non-column line in a table definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexKind {
    Primary,
    SecondaryIndex,
    ForeignKey,
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexKind::Primary => write!(f, "PRIMARY"),
            IndexKind::SecondaryIndex => write!(f, "INDEX"),
            IndexKind::ForeignKey => write!(f, "FOREIGN KEY"),
        }
    }
}

/// Index or constraint parsed from one line of a table definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDescriptor {
    pub kind: IndexKind,
    pub name: String,
    /// Verbatim clause, compared textually and emitted as-is
    pub raw_clause: String,
    pub related_tables: IndexSet<String>,
}

impl IndexDescriptor {
    pub fn new(kind: IndexKind, name: &str, raw_clause: &str) -> Self {
        Self {
            kind,
            name: name.to_string(),
            raw_clause: raw_clause.to_string(),
            related_tables: IndexSet::new(),
        }
    }

    pub fn add_related_table(&mut self, table: &str) {
        let table = table.trim();
        if !table.is_empty() {
            self.related_tables.insert(table.to_string());
        }
    }
}

/// Structure of one table as read from one database snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    pub raw_ddl: String,
    /// `raw_ddl` without the auto-increment counter
    pub raw_ddl_normalized: String,
    pub field_raw_text: IndexMap<String, String>,
    pub fields: IndexMap<String, FieldSchema>,
    pub indexes: IndexMap<String, IndexDescriptor>,
    pub foreign_keys: IndexMap<String, IndexDescriptor>,
    pub options: IndexMap<String, String>,
}

impl TableSchema {
    pub fn field_names(&self) -> Vec<&str> {
        self.field_raw_text.keys().map(String::as_str).collect()
    }

    /// Tables referenced by any foreign key, without duplicates
    pub fn related_tables(&self) -> Vec<String> {
        let tables: IndexSet<&String> = self
            .foreign_keys
            .values()
            .flat_map(|fk| fk.related_tables.iter())
            .collect();
        tables.into_iter().cloned().collect()
    }

    /// Replace the fields derived from DDL with live column metadata
    pub fn apply_column_metadata(&mut self, fields: IndexMap<String, FieldSchema>) {
        if !fields.is_empty() {
            self.fields = fields;
        }
    }
}

fn key_width<V>(map: &IndexMap<String, V>) -> usize {
    map.keys().map(String::len).max().unwrap_or(0) + 2
}

impl fmt::Display for TableSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Fields:")?;
        let width = key_width(&self.field_raw_text);
        for (name, clause) in &self.field_raw_text {
            writeln!(f, "  {:>width$} : {}", name, clause, width = width)?;
        }

        writeln!(f, "Index:")?;
        let width = key_width(&self.indexes);
        for (name, idx) in &self.indexes {
            writeln!(f, "  {:>width$} : {}", name, idx.raw_clause, width = width)?;
        }

        writeln!(f, "ForeignKey:")?;
        let width = key_width(&self.foreign_keys);
        for (name, fk) in &self.foreign_keys {
            writeln!(f, "  {:>width$} : {}", name, fk.raw_clause, width = width)?;
        }

        writeln!(f, "Options:")?;
        let width = key_width(&self.options);
        for (name, value) in &self.options {
            writeln!(f, "  {:>width$} : {}", name, value, width = width)?;
        }

        Ok(())
    }
}
