//! Index and constraint lines of a table definition

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, Result};
use crate::schema::types::{IndexDescriptor, IndexKind};

const PRIMARY_KEY_NAME: &str = "PRIMARY KEY";

//  UNIQUE KEY `idx_a` (`a`) USING HASH COMMENT 'xx'
//  FULLTEXT KEY `c` (`c`)
//  KEY `idx_e` (`e`)
static INDEX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Z]+\s)?KEY\s").expect("valid index pattern"));

//  CONSTRAINT `busi_ibfk_1` FOREIGN KEY (`repo_id`) REFERENCES `repo` (`repo_id`)
static FOREIGN_KEY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^CONSTRAINT `([^`]+)` FOREIGN KEY.+ REFERENCES `([^`]+)` ")
        .expect("valid foreign key pattern")
});

/// Parse a non-column line. Anything unrecognized is a hard error so structure
/// is never silently left out of a sync.
pub fn parse_constraint_line(line: &str) -> Result<IndexDescriptor> {
    let line = line.trim();

    if line.starts_with("PRIMARY") {
        return Ok(IndexDescriptor::new(IndexKind::Primary, PRIMARY_KEY_NAME, line));
    }

    if INDEX_RE.is_match(line) {
        let name = line.split('`').nth(1).ok_or_else(|| {
            Error::ParseError(format!("index without a quoted name: {}", line))
        })?;
        return Ok(IndexDescriptor::new(IndexKind::SecondaryIndex, name, line));
    }

    if let Some(caps) = FOREIGN_KEY_RE.captures(line) {
        let mut idx = IndexDescriptor::new(IndexKind::ForeignKey, &caps[1], line);
        idx.add_related_table(&caps[2]);
        return Ok(idx);
    }

    Err(Error::ParseError(format!(
        "unsupported index or constraint line: {}",
        line
    )))
}

impl IndexDescriptor {
    /// `ADD` clause for this index, preceded by its drop when it replaces an existing one
    pub fn add_clause(&self, replace: bool) -> String {
        let add = format!("ADD {}", self.raw_clause);
        if replace {
            format!("{},\n{}", self.drop_clause(), add)
        } else {
            add
        }
    }

    pub fn drop_clause(&self) -> String {
        match self.kind {
            IndexKind::Primary => "DROP PRIMARY KEY".to_string(),
            IndexKind::SecondaryIndex => format!("DROP INDEX `{}`", self.name),
            IndexKind::ForeignKey => format!("DROP FOREIGN KEY `{}`", self.name),
        }
    }
}
