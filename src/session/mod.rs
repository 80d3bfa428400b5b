//! Scoped sessions over an in-memory catalog.
//!
//! A [`Session`] plays the part of a database connection: it owns the named
//! tables and views a pipeline creates and releases them when it closes.
//! Sessions are passed explicitly to every stage; there is no process-wide
//! connection.

pub mod catalog;
pub mod table;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arrow::datatypes::SchemaRef;
use rustc_hash::FxHashSet;
use serde::Serialize;

pub use catalog::{Catalog, Relation, ViewDefinition};
pub use table::{Table, resolve_column};

use crate::error::{PipelineError, Result};
use crate::schema::adapt::sql_type_name;
use crate::sink::{CopyOptions, CopySummary, write_table};

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// One row of `describe` output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDescription {
    pub column_name: String,
    pub column_type: String,
    pub nullable: bool,
}

/// An exclusively owned handle over a catalog of tables and views
#[derive(Debug)]
pub struct Session {
    id: u64,
    catalog: Catalog,
}

impl Default for Session {
    fn default() -> Self {
        Self::open()
    }
}

impl Session {
    /// Opens a new, empty session
    #[must_use]
    pub fn open() -> Self {
        let id = NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed);
        log::debug!("Opened session {id}");
        Self {
            id,
            catalog: Catalog::default(),
        }
    }

    /// Runs `f` with a fresh session and closes it afterwards
    ///
    /// The session is released on every exit path: normal return, error
    /// return, and unwinding. Scopes may nest; an inner scope closes before
    /// the enclosing one.
    pub fn scoped<T, F>(f: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        let mut session = Self::open();
        let result = f(&mut session);
        session.close();
        result
    }

    /// Closes the session and drops every relation it owns
    pub fn close(self) {
        // Release happens in Drop
    }

    /// Identifier of this session, unique within the process
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// The catalog of this session
    #[must_use]
    pub const fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Registers a new table
    ///
    /// # Errors
    /// Fails with `PipelineError::RelationExists` if the name is taken.
    pub fn create_table(&mut self, name: &str, table: Table) -> Result<()> {
        log::debug!("Session {}: creating table {name} ({} rows)", self.id, table.num_rows());
        self.catalog.insert(name, Relation::Table(table), false)
    }

    /// Registers a table, replacing any relation of the same name
    pub fn create_or_replace_table(&mut self, name: &str, table: Table) -> Result<()> {
        log::debug!(
            "Session {}: creating or replacing table {name} ({} rows)",
            self.id,
            table.num_rows()
        );
        self.catalog.insert(name, Relation::Table(table), true)
    }

    /// Registers a view, replacing any relation of the same name
    ///
    /// The view's query is bound against the current catalog before it is
    /// stored, so a view over a missing table or column is rejected here
    /// rather than at scan time.
    pub fn create_or_replace_view(
        &mut self,
        name: &str,
        definition: Arc<dyn ViewDefinition>,
    ) -> Result<()> {
        if self.reads_from(definition.sources(), name) {
            return Err(PipelineError::InvalidExpression(format!(
                "View {name} cannot read from itself"
            )));
        }

        definition.output_schema(self)?;
        log::debug!("Session {}: creating or replacing view {name}", self.id);
        self.catalog.insert(name, Relation::View(definition), true)
    }

    /// Whether `sources`, followed through any views, reach `name`
    fn reads_from(&self, sources: Vec<String>, name: &str) -> bool {
        let mut pending = sources;
        let mut visited = FxHashSet::default();
        while let Some(source) = pending.pop() {
            if source.eq_ignore_ascii_case(name) {
                return true;
            }
            if !visited.insert(source.to_ascii_lowercase()) {
                continue;
            }
            if let Ok(Relation::View(view)) = self.catalog.get(&source) {
                pending.extend(view.sources());
            }
        }
        false
    }

    /// Removes a table or view
    pub fn drop_relation(&mut self, name: &str) -> Result<()> {
        let relation = self.catalog.remove(name)?;
        log::debug!("Session {}: dropped {} {name}", self.id, relation.kind());
        Ok(())
    }

    /// Whether a table or view with this name exists
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.catalog.contains(name)
    }

    /// Reads the full contents of a table or view
    pub fn scan(&self, name: &str) -> Result<Table> {
        match self.catalog.get(name)? {
            Relation::Table(table) => Ok(table.clone()),
            Relation::View(definition) => definition.evaluate(self),
        }
    }

    /// Schema of a table or view
    pub fn schema(&self, name: &str) -> Result<SchemaRef> {
        match self.catalog.get(name)? {
            Relation::Table(table) => Ok(table.schema()),
            Relation::View(definition) => definition.output_schema(self),
        }
    }

    /// Column names and SQL types of a table or view
    pub fn describe(&self, name: &str) -> Result<Vec<ColumnDescription>> {
        let schema = self.schema(name)?;
        Ok(schema
            .fields()
            .iter()
            .map(|field| ColumnDescription {
                column_name: field.name().clone(),
                column_type: sql_type_name(field.data_type()),
                nullable: field.is_nullable(),
            })
            .collect())
    }

    /// Writes the contents of a table or view to `destination`
    pub fn copy_to(
        &self,
        name: &str,
        destination: &Path,
        options: &CopyOptions,
    ) -> Result<CopySummary> {
        let table = self.scan(name)?;
        write_table(&table, destination, options)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        log::debug!(
            "Closing session {}, releasing {:?}",
            self.id,
            self.catalog.names()
        );
        self.catalog.clear();
    }
}
