//! Grouping of planned statements into execution buckets
//!
//! A plan whose source table has no foreign key goes to its own `single_<table>`
//! bucket. Every plan that references other tables shares the `multi` bucket,
//! which runs after all single buckets. Relational tables are not ordered among
//! themselves.

use indexmap::IndexMap;

use crate::schema::classifier::AlterPlan;

const SINGLE_PREFIX: &str = "single";
const MULTI_KEY: &str = "multi";

/// Execution phase, selected by bucket key prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Single,
    Multi,
}

impl Phase {
    /// Phases in execution order
    pub const ORDER: [Phase; 2] = [Phase::Single, Phase::Multi];

    pub fn prefix(self) -> &'static str {
        match self {
            Phase::Single => SINGLE_PREFIX,
            Phase::Multi => MULTI_KEY,
        }
    }
}

/// Bucket key for a plan
pub fn batch_key(plan: &AlterPlan) -> String {
    if plan.has_relations() {
        MULTI_KEY.to_string()
    } else {
        format!("{}_{}", SINGLE_PREFIX, plan.table)
    }
}

/// Plans of one destination grouped by batch key
#[derive(Debug, Default)]
pub struct Buckets {
    inner: IndexMap<String, Vec<AlterPlan>>,
}

impl Buckets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, plan: AlterPlan) {
        self.inner.entry(batch_key(&plan)).or_default().push(plan);
    }

    pub fn get(&self, key: &str) -> Option<&Vec<AlterPlan>> {
        self.inner.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.inner.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Buckets belonging to one phase
    pub fn phase(&self, phase: Phase) -> impl Iterator<Item = (&String, &Vec<AlterPlan>)> {
        self.inner
            .iter()
            .filter(move |(key, _)| key.starts_with(phase.prefix()))
    }

    /// Buckets in execution order: every single bucket, then the multi bucket
    pub fn in_execution_order(&self) -> impl Iterator<Item = (&String, &Vec<AlterPlan>)> {
        Phase::ORDER.into_iter().flat_map(move |phase| self.phase(phase))
    }
}

/// Statements of a bucket without trailing terminators
pub fn bucket_statements(plans: &[AlterPlan]) -> Vec<String> {
    plans
        .iter()
        .map(|plan| plan.statement.trim_end().trim_end_matches(';').to_string())
        .collect()
}

/// The statements joined into one semicolon-terminated script
pub fn bucket_script(statements: &[String]) -> String {
    format!("{};\n", statements.join(";\n"))
}
