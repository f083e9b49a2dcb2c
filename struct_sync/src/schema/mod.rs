//! Schema module for StructSync
//!
//! This module handles table definition parsing, comparison, and alteration planning.

pub mod analyzer;
pub mod classifier;
pub mod constraint;
pub mod diff;
pub mod parser;
pub mod types;

// Re-export key types
pub use analyzer::{SchemaAnalyzer, SourceTables};
pub use classifier::{classify, AlterKind, AlterPlan};
pub use constraint::parse_constraint_line;
pub use diff::TableDiff;
pub use parser::parse_table_schema;
pub use types::{FieldSchema, IndexDescriptor, IndexKind, TableSchema};
