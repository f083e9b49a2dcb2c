//! Table definition parser
//!
//! Turns the text of a `CREATE TABLE` statement, as printed by `SHOW CREATE TABLE`,
//! into a [`TableSchema`]. Column clauses are kept verbatim for emission and also
//! reduced to a [`FieldSchema`] for semantic comparison.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, Result};
use crate::schema::constraint::parse_constraint_line;
use crate::schema::types::{FieldSchema, IndexKind, TableSchema};

const FIELD_QUOTE: char = '`';
const AUTO_INCREMENT_OPTION: &str = "AUTO_INCREMENT";

static AUTO_INCREMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"AUTO_INCREMENT=[0-9]+\s*").expect("valid auto increment pattern"));

/// Remove the auto-increment counter, which is runtime state rather than structure
pub fn strip_auto_increment(ddl: &str) -> String {
    AUTO_INCREMENT_RE.replace_all(ddl, "").into_owned()
}

/// Parse one table definition
pub fn parse_table_schema(ddl: &str) -> Result<TableSchema> {
    let ddl = ddl.trim();
    if ddl.is_empty() {
        return Err(Error::ParseError("empty table definition".to_string()));
    }

    let mut schema = TableSchema {
        raw_ddl: ddl.to_string(),
        raw_ddl_normalized: strip_auto_increment(ddl),
        ..TableSchema::default()
    };

    for line in ddl.lines() {
        let line = line.trim();

        if line.is_empty() || line.starts_with("--") || line.starts_with("CREATE TABLE") {
            continue;
        }

        if line.starts_with(')') {
            schema.options = parse_table_options(line);
            continue;
        }

        let line = line.trim_end_matches(',');
        if line.starts_with(FIELD_QUOTE) {
            let name = field_name(line).ok_or_else(|| {
                Error::ParseError(format!("unterminated column name in line: {}", line))
            })?;
            if let Some(field) = parse_field_clause(line) {
                schema.fields.insert(name.to_string(), field);
            }
            schema.field_raw_text.insert(name.to_string(), line.to_string());
            continue;
        }

        let idx = parse_constraint_line(line)?;
        match idx.kind {
            IndexKind::ForeignKey => {
                schema.foreign_keys.insert(idx.name.clone(), idx);
            }
            _ => {
                schema.indexes.insert(idx.name.clone(), idx);
            }
        }
    }

    Ok(schema)
}

fn field_name(line: &str) -> Option<&str> {
    let rest = line.strip_prefix(FIELD_QUOTE)?;
    let end = rest.find(FIELD_QUOTE)?;
    Some(&rest[..end])
}

/// Parse the options tail, e.g. `) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COMMENT='a b'`
pub fn parse_table_options(line: &str) -> IndexMap<String, String> {
    let line = line.trim_start_matches(')').trim().trim_end_matches(';');

    let mut options = IndexMap::new();
    for token in split_quoted_tokens(line) {
        if token == "DEFAULT" {
            continue;
        }

        let Some((name, value)) = token.split_once('=') else {
            continue;
        };

        let name = name.trim();
        if name != AUTO_INCREMENT_OPTION {
            options.insert(name.to_string(), value.trim().to_string());
        }
    }

    options
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum QuoteState {
    Outside,
    Inside,
}

/// Split on spaces that are not inside single quotes. Quotes stay in the tokens.
pub fn split_quoted_tokens(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut buff = String::new();
    let mut state = QuoteState::Outside;

    for ch in text.chars() {
        match (state, ch) {
            (QuoteState::Inside, '\'') => {
                buff.push(ch);
                state = QuoteState::Outside;
            }
            (QuoteState::Inside, _) => buff.push(ch),
            (QuoteState::Outside, '\'') => {
                buff.push(ch);
                state = QuoteState::Inside;
            }
            (QuoteState::Outside, ' ') => {
                if !buff.is_empty() {
                    tokens.push(std::mem::take(&mut buff));
                }
            }
            (QuoteState::Outside, _) => buff.push(ch),
        }
    }

    if !buff.is_empty() {
        tokens.push(buff);
    }

    tokens
}

/// Split `varchar(32)` into (`varchar`, 32). Non-numeric arguments such as
/// `decimal(10,2)` or `enum('a','b')` stay part of the type with length 0.
pub fn split_field_type(type_text: &str) -> (String, u32) {
    let text = type_text.trim();

    if let (Some(open), Some(close)) = (text.find('('), text.find(')')) {
        if open < close {
            if let Ok(length) = text[open + 1..close].trim().parse::<u32>() {
                let base = format!("{} {}", &text[..open], &text[close + 1..]);
                let base = base.split_whitespace().collect::<Vec<_>>().join(" ");
                return (base, length);
            }
        }
    }

    (text.to_string(), 0)
}

/// Derive a [`FieldSchema`] from a verbatim column clause
pub fn parse_field_clause(clause: &str) -> Option<FieldSchema> {
    let name = field_name(clause)?;
    let tokens = split_quoted_tokens(clause);

    let mut type_text = tokens.get(1)?.clone();
    for modifier in tokens.iter().skip(2) {
        match modifier.as_str() {
            "unsigned" | "zerofill" => {
                type_text.push(' ');
                type_text.push_str(modifier);
            }
            _ => break,
        }
    }

    let not_null = tokens
        .windows(2)
        .any(|pair| pair[0].eq_ignore_ascii_case("NOT") && pair[1].eq_ignore_ascii_case("NULL"));

    let default = tokens
        .windows(2)
        .find(|pair| pair[0].eq_ignore_ascii_case("DEFAULT"))
        .map(|pair| pair[1].as_str())
        .filter(|value| !value.eq_ignore_ascii_case("NULL"));

    Some(FieldSchema::from_metadata(
        name,
        &type_text,
        if not_null { "NO" } else { "YES" },
        default,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    const USERS_DDL: &str = "CREATE TABLE `users` (
  `id` int(11) NOT NULL AUTO_INCREMENT,
  `name` varchar(64) NOT NULL DEFAULT '' COMMENT 'display name, DEFAULT x',
  `org_id` int(11) DEFAULT NULL,
  PRIMARY KEY (`id`),
  UNIQUE KEY `uk_name` (`name`),
  KEY `idx_org` (`org_id`),
  CONSTRAINT `fk_org` FOREIGN KEY (`org_id`) REFERENCES `orgs` (`id`)
) ENGINE=InnoDB AUTO_INCREMENT=42 DEFAULT CHARSET=utf8mb4 COMMENT='user accounts'";

    #[test]
    fn test_parse_table_schema() {
        let schema = parse_table_schema(USERS_DDL).unwrap();

        assert_eq!(schema.field_names(), vec!["id", "name", "org_id"]);
        assert_eq!(schema.field_raw_text["id"], "`id` int(11) NOT NULL AUTO_INCREMENT");
        assert_eq!(
            schema.indexes.keys().collect::<Vec<_>>(),
            vec!["PRIMARY KEY", "uk_name", "idx_org"]
        );
        assert_eq!(schema.foreign_keys.keys().collect::<Vec<_>>(), vec!["fk_org"]);
        assert_eq!(schema.related_tables(), vec!["orgs".to_string()]);

        assert_eq!(schema.options.get("ENGINE").map(String::as_str), Some("InnoDB"));
        assert_eq!(schema.options.get("CHARSET").map(String::as_str), Some("utf8mb4"));
        assert_eq!(schema.options.get("COMMENT").map(String::as_str), Some("'user accounts'"));
        assert!(!schema.options.contains_key("AUTO_INCREMENT"));
    }

    #[test]
    fn test_column_clause_key() {
        let schema = parse_table_schema("CREATE TABLE `t` (\n  `id` int(11) NOT NULL\n) ENGINE=InnoDB").unwrap();
        assert_eq!(schema.field_raw_text.get("id").map(String::as_str), Some("`id` int(11) NOT NULL"));
    }

    #[test]
    fn test_empty_definition_is_parse_error() {
        assert!(matches!(parse_table_schema("   \n"), Err(Error::ParseError(_))));
    }

    #[test]
    fn test_unknown_constraint_is_parse_error() {
        let ddl = "CREATE TABLE `t` (\n  `id` int(11) NOT NULL,\n  CHECK (`id` > 0)\n) ENGINE=InnoDB";
        assert!(matches!(parse_table_schema(ddl), Err(Error::ParseError(_))));
    }

    #[test]
    fn test_comment_and_blank_lines_are_skipped() {
        let ddl = "-- dumped\nCREATE TABLE `t` (\n\n  -- primary column\n  `id` int(11) NOT NULL\n) ENGINE=InnoDB";
        let schema = parse_table_schema(ddl).unwrap();
        assert_eq!(schema.field_names(), vec!["id"]);
    }

    #[test]
    fn test_strip_auto_increment() {
        let normalized = strip_auto_increment(") ENGINE=InnoDB AUTO_INCREMENT=1024 DEFAULT CHARSET=utf8");
        assert_eq!(normalized, ") ENGINE=InnoDB DEFAULT CHARSET=utf8");

        let a = parse_table_schema(&USERS_DDL.replace("AUTO_INCREMENT=42", "AUTO_INCREMENT=7")).unwrap();
        let b = parse_table_schema(USERS_DDL).unwrap();
        assert_eq!(a.raw_ddl_normalized, b.raw_ddl_normalized);
        assert_ne!(a.raw_ddl, b.raw_ddl);
    }

    #[test]
    fn test_split_quoted_tokens() {
        assert_eq!(
            split_quoted_tokens("ENGINE=InnoDB  COMMENT='a b  c' ROW_FORMAT=DYNAMIC"),
            vec!["ENGINE=InnoDB", "COMMENT='a b  c'", "ROW_FORMAT=DYNAMIC"]
        );
        assert_eq!(split_quoted_tokens("COMMENT='it''s here'"), vec!["COMMENT='it''s here'"]);
        assert!(split_quoted_tokens("   ").is_empty());
    }

    #[test]
    fn test_options_ignore_tokens_without_value() {
        let options = parse_table_options(") ENGINE=InnoDB DEFAULT CHARSET=latin1 STATS_PERSISTENT;");
        assert_eq!(options.len(), 2);
        assert_eq!(options["CHARSET"], "latin1");
    }

    #[rstest]
    #[case("varchar(32)", "varchar", 32)]
    #[case("int(10) unsigned", "int unsigned", 10)]
    #[case("bigint unsigned", "bigint unsigned", 0)]
    #[case("decimal(10,2)", "decimal(10,2)", 0)]
    #[case("enum('a','b')", "enum('a','b')", 0)]
    #[case("datetime", "datetime", 0)]
    fn test_split_field_type(#[case] input: &str, #[case] field_type: &str, #[case] length: u32) {
        assert_eq!(split_field_type(input), (field_type.to_string(), length));
    }

    #[test]
    fn test_parse_field_clause() {
        let field = parse_field_clause("`status` tinyint(4) unsigned NOT NULL DEFAULT '1' COMMENT 'state'").unwrap();
        assert_eq!(field.name, "status");
        assert_eq!(field.field_type, "tinyint unsigned");
        assert_eq!(field.length, 4);
        assert!(!field.allow_null);
        assert_eq!(field.default_value, "1");

        let field = parse_field_clause("`note` text").unwrap();
        assert!(field.allow_null);
        assert_eq!(field.default_value, "");

        let field = parse_field_clause("`org_id` int(11) DEFAULT NULL").unwrap();
        assert_eq!(field.default_value, "");
    }
}
