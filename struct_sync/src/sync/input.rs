//! SQL file input
//!
//! In file mode the source is a plain statement file that is replayed as-is on
//! every destination, without diffing.

use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

const COMMENT_MARKER: &str = "--";
const TERMINATOR: char = ';';

/// Split statement text into individual statements. Blank and comment lines are
/// skipped, a statement ends on a line ending with `;`, and a trailing fragment
/// without terminator still becomes a statement.
pub fn split_sql_statements(text: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut content = String::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with(COMMENT_MARKER) {
            continue;
        }

        if !content.is_empty() {
            content.push('\n');
        }
        content.push_str(line);

        if line.ends_with(TERMINATOR) {
            statements.push(std::mem::take(&mut content));
        }
    }

    if !content.is_empty() {
        content.push(TERMINATOR);
        statements.push(content);
    }

    statements
}

/// Read and split a statement file
pub fn read_sql_file(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| {
        Error::ConfigError(format!("Parse SQL file {} failed: {}", path.display(), e))
    })?;

    let statements = split_sql_statements(&text);
    if statements.is_empty() {
        return Err(Error::ParseError(format!("SQL file {} is empty", path.display())));
    }

    Ok(statements)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_split_sql_statements() {
        let text = "-- schema dump\n\nCREATE TABLE `a` (\n  `id` int(11) NOT NULL\n) ENGINE=InnoDB;\n\nDROP TABLE `b`;\nALTER TABLE `c` ADD `x` int(11)\n";

        assert_eq!(
            split_sql_statements(text),
            vec![
                "CREATE TABLE `a` (\n`id` int(11) NOT NULL\n) ENGINE=InnoDB;".to_string(),
                "DROP TABLE `b`;".to_string(),
                "ALTER TABLE `c` ADD `x` int(11);".to_string(),
            ]
        );
    }

    #[test]
    fn test_only_comments_is_empty() {
        assert!(split_sql_statements("-- nothing\n   \n-- here").is_empty());
    }

    #[test]
    fn test_read_sql_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "DROP TABLE `a`;").unwrap();
        assert_eq!(read_sql_file(file.path()).unwrap(), vec!["DROP TABLE `a`;".to_string()]);

        let empty = tempfile::NamedTempFile::new().unwrap();
        assert!(matches!(read_sql_file(empty.path()), Err(Error::ParseError(_))));
    }
}
