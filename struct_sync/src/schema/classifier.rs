//! Per-table alteration planning

use serde::Serialize;
use std::fmt;

use crate::schema::diff::TableDiff;

/// What has to happen to a destination table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AlterKind {
    NoChange,
    Create,
    Drop,
    Alter,
}

impl fmt::Display for AlterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AlterKind::NoChange => "not_change",
            AlterKind::Create => "create",
            AlterKind::Drop => "drop",
            AlterKind::Alter => "alter",
        };
        write!(f, "{}", name)
    }
}

/// Statement planned for one table on one destination
#[derive(Debug, Clone)]
pub struct AlterPlan {
    pub table: String,
    pub kind: AlterKind,
    pub statement: String,
    pub diff: Option<TableDiff>,
}

impl AlterPlan {
    pub fn no_change(table: &str) -> Self {
        Self {
            table: table.to_string(),
            kind: AlterKind::NoChange,
            statement: String::new(),
            diff: None,
        }
    }

    /// Drop plan for a table that only exists at the destination
    pub fn drop_table(table: &str) -> Self {
        Self {
            table: table.to_string(),
            kind: AlterKind::Drop,
            statement: format!("DROP TABLE `{}`", table),
            diff: None,
        }
    }

    pub fn related_tables(&self) -> Vec<String> {
        self.diff
            .as_ref()
            .map(TableDiff::related_tables)
            .unwrap_or_default()
    }

    /// Whether this change touches a foreign key relation to another table
    pub fn has_relations(&self) -> bool {
        !self.related_tables().is_empty()
    }
}

impl fmt::Display for AlterPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "-- Table : {}", self.table)?;
        writeln!(f, "-- Type  : {}", self.kind)?;
        writeln!(f, "-- RelationTables : {}", self.related_tables().join(","))?;
        writeln!(f, "-- SQL   :")?;
        writeln!(f, "{}", self.statement)
    }
}

/// Decide how the destination copy of `diff.table` must change
pub fn classify(diff: TableDiff, drop_unnecessary: bool) -> AlterPlan {
    let table = diff.table.clone();

    if diff.normalized_ddl_matches() {
        return AlterPlan::no_change(&table);
    }

    let (kind, statement) = match (&diff.source, &diff.dest) {
        (None, Some(_)) if drop_unnecessary => (AlterKind::Drop, format!("DROP TABLE `{}`", table)),
        (None, _) => return AlterPlan::no_change(&table),
        (Some(source), None) => (AlterKind::Create, source.raw_ddl.clone()),
        (Some(_), Some(_)) => {
            let clauses = diff.alter_clauses(drop_unnecessary);
            if clauses.is_empty() {
                return AlterPlan::no_change(&table);
            }
            (
                AlterKind::Alter,
                format!("ALTER TABLE `{}` {}", table, clauses.join(",\n")),
            )
        }
    };

    AlterPlan {
        table,
        kind,
        statement,
        diff: Some(diff),
    }
}
