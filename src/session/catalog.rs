//! Named tables and views owned by a session.

use std::fmt::Debug;
use std::sync::Arc;

use arrow::datatypes::SchemaRef;
use rustc_hash::FxHashMap;

use crate::error::{PipelineError, Result};
use crate::session::{Session, Table};

/// A stored query that is evaluated each time it is scanned
pub trait ViewDefinition: Debug + Send + Sync {
    /// Evaluate the query against the current contents of the session
    fn evaluate(&self, session: &Session) -> Result<Table>;

    /// Schema the query produces, checked when the view is created
    fn output_schema(&self, session: &Session) -> Result<SchemaRef>;

    /// Names of the relations the query reads from
    fn sources(&self) -> Vec<String>;
}

/// An entry in the catalog
#[derive(Debug, Clone)]
pub enum Relation {
    /// Materialized rows
    Table(Table),
    /// A query re-evaluated on every scan
    View(Arc<dyn ViewDefinition>),
}

impl Relation {
    /// Short kind name for log messages
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Table(_) => "table",
            Self::View(_) => "view",
        }
    }
}

/// Case-insensitive map of relation names
#[derive(Debug, Default)]
pub struct Catalog {
    entries: FxHashMap<String, (String, Relation)>,
}

impl Catalog {
    fn key(name: &str) -> String {
        name.to_ascii_lowercase()
    }

    /// Register a relation
    ///
    /// # Errors
    /// Returns `PipelineError::RelationExists` if `replace` is false and the
    /// name is taken.
    pub fn insert(&mut self, name: &str, relation: Relation, replace: bool) -> Result<()> {
        let key = Self::key(name);
        if !replace && self.entries.contains_key(&key) {
            return Err(PipelineError::RelationExists(name.to_string()));
        }
        self.entries.insert(key, (name.to_string(), relation));
        Ok(())
    }

    /// Look up a relation
    pub fn get(&self, name: &str) -> Result<&Relation> {
        self.entries
            .get(&Self::key(name))
            .map(|(_, relation)| relation)
            .ok_or_else(|| PipelineError::RelationNotFound(name.to_string()))
    }

    /// Remove a relation and return it
    pub fn remove(&mut self, name: &str) -> Result<Relation> {
        self.entries
            .remove(&Self::key(name))
            .map(|(_, relation)| relation)
            .ok_or_else(|| PipelineError::RelationNotFound(name.to_string()))
    }

    /// Whether a relation with this name exists
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&Self::key(name))
    }

    /// Relation names as they were created, sorted
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.values().map(|(name, _)| name.clone()).collect();
        names.sort();
        names
    }

    /// Number of relations
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the catalog is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every relation
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
