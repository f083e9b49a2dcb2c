//! Schema difference calculator
//!
//! Compares the source and destination structure of one table and renders the
//! differences as `ALTER TABLE` clauses. Every compared element leaves an audit
//! record: changed elements at warn level, unchanged ones at info level.

use indexmap::IndexMap;
use std::sync::Arc;

use crate::schema::types::{IndexDescriptor, TableSchema};

const CHARSET_OPTION: &str = "CHARSET";

/// One table compared between the source and a destination
#[derive(Debug, Clone)]
pub struct TableDiff {
    pub table: String,
    pub source: Option<Arc<TableSchema>>,
    pub dest: Option<TableSchema>,
}

impl TableDiff {
    pub fn new(table: &str, source: Option<Arc<TableSchema>>, dest: Option<TableSchema>) -> Self {
        Self {
            table: table.to_string(),
            source,
            dest,
        }
    }

    /// Tables the source version of this table references through foreign keys
    pub fn related_tables(&self) -> Vec<String> {
        self.source
            .as_ref()
            .map(|schema| schema.related_tables())
            .unwrap_or_default()
    }

    pub fn normalized_ddl_matches(&self) -> bool {
        let source = self.source.as_ref().map(|s| s.raw_ddl_normalized.as_str()).unwrap_or("");
        let dest = self.dest.as_ref().map(|s| s.raw_ddl_normalized.as_str()).unwrap_or("");
        source == dest
    }

    /// Clauses that bring the destination to the source structure, in the order
    /// columns, indexes, foreign keys, table options. Empty when either side is
    /// missing or nothing differs.
    pub fn alter_clauses(&self, drop_unnecessary: bool) -> Vec<String> {
        let (Some(source), Some(dest)) = (self.source.as_deref(), self.dest.as_ref()) else {
            return Vec::new();
        };

        let mut lines = Vec::new();
        self.diff_columns(source, dest, drop_unnecessary, &mut lines);
        self.diff_indexes(
            "INDEX",
            &source.indexes,
            &dest.indexes,
            drop_unnecessary,
            &mut lines,
        );
        self.diff_indexes(
            "FOREIGN_KEY",
            &source.foreign_keys,
            &dest.foreign_keys,
            drop_unnecessary,
            &mut lines,
        );
        self.diff_options(source, dest, &mut lines);
        lines
    }

    fn record(&self, action: &str, name: &str, clause: Option<String>, lines: &mut Vec<String>) {
        let element = format!("{}.{}", self.table, name);
        match clause {
            Some(sql) => {
                tracing::warn!(table = %self.table, element = %element, sql = %sql, "[{}]", action);
                lines.push(sql);
            }
            None => {
                tracing::info!(table = %self.table, element = %element, "[{}] Same", action);
            }
        }
    }

    fn diff_columns(
        &self,
        source: &TableSchema,
        dest: &TableSchema,
        drop_unnecessary: bool,
        lines: &mut Vec<String>,
    ) {
        // Compare parsed attributes, not clause text, so formatting alone never
        // produces a CHANGE.
        for (name, clause) in &source.field_raw_text {
            let alter = match dest.field_raw_text.get(name) {
                Some(dest_clause) => {
                    let changed = match (source.fields.get(name), dest.fields.get(name)) {
                        (Some(src), Some(dst)) => src.differs_from(dst),
                        _ => clause != dest_clause,
                    };
                    changed.then(|| format!("CHANGE `{}` {}", name, clause))
                }
                None => Some(format!("ADD {}", clause)),
            };
            self.record("COLUMN.ALTER", name, alter, lines);
        }

        if drop_unnecessary {
            for name in dest.field_raw_text.keys() {
                let drop = (!source.field_raw_text.contains_key(name))
                    .then(|| format!("DROP `{}`", name));
                self.record("COLUMN.DROP", name, drop, lines);
            }
        }
    }

    fn diff_indexes(
        &self,
        section: &str,
        source: &IndexMap<String, IndexDescriptor>,
        dest: &IndexMap<String, IndexDescriptor>,
        drop_unnecessary: bool,
        lines: &mut Vec<String>,
    ) {
        let alter_action = format!("{}.ALTER", section);
        for (name, idx) in source {
            let alter = match dest.get(name) {
                Some(dest_idx) => (idx.raw_clause != dest_idx.raw_clause).then(|| idx.add_clause(true)),
                None => Some(idx.add_clause(false)),
            };
            self.record(&alter_action, name, alter, lines);
        }

        if drop_unnecessary {
            let drop_action = format!("{}.DROP", section);
            for (name, dest_idx) in dest {
                let drop = (!source.contains_key(name)).then(|| dest_idx.drop_clause());
                self.record(&drop_action, name, drop, lines);
            }
        }
    }

    // Options only present at the destination are left alone, even when
    // dropping unnecessary structure.
    fn diff_options(&self, source: &TableSchema, dest: &TableSchema, lines: &mut Vec<String>) {
        for (name, value) in &source.options {
            let alter = (dest.options.get(name) != Some(value)).then(|| {
                if name == CHARSET_OPTION {
                    format!("DEFAULT {}={}", name, value)
                } else {
                    format!("{}={}", name, value)
                }
            });
            self.record("EXTEND.ALTER", name, alter, lines);
        }
    }
}
