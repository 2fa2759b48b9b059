//! ODPS client layer.
//!
//! Provides a trait-based interface over the ODPS service so that the
//! engine can run against the REST API or an in-memory mock.

mod mock;
mod rest;
mod signer;
mod xml;

pub use mock::{FailingConnector, MockConnector, MockOdpsClient};
pub use rest::{RestConnector, RestOdpsClient};
pub use signer::Signer;

use crate::error::Result;
use crate::review::Row;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Column metadata from a table schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,

    /// ODPS type name, e.g. `bigint`, `string`, `decimal(10,2)`.
    #[serde(rename = "type")]
    pub data_type: String,

    #[serde(default)]
    pub comment: String,
}

impl ColumnSchema {
    pub fn new(
        name: impl Into<String>,
        data_type: impl Into<String>,
        comment: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            comment: comment.into(),
        }
    }
}

/// Table schema: data columns followed by partition columns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnSchema>,
    pub partition_columns: Vec<ColumnSchema>,
}

impl TableSchema {
    pub fn new(name: impl Into<String>, columns: Vec<ColumnSchema>) -> Self {
        Self {
            name: name.into(),
            columns,
            partition_columns: Vec::new(),
        }
    }

    /// Adds partition columns.
    pub fn with_partitions(mut self, partition_columns: Vec<ColumnSchema>) -> Self {
        self.partition_columns = partition_columns;
        self
    }

    /// All columns, data columns first.
    pub fn all_columns(&self) -> impl Iterator<Item = &ColumnSchema> {
        self.columns.iter().chain(self.partition_columns.iter())
    }
}

/// Handle to a submitted SQL instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlInstance {
    pub id: String,
    pub sql: String,
}

/// Materialized rows of a finished query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOutput {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl QueryOutput {
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }
}

/// Client for one ODPS project.
///
/// Every call blocks (awaits) until the remote side answers; there is no
/// cancellation.
#[async_trait]
pub trait OdpsClient: Send + Sync {
    /// The project this client is scoped to.
    fn project(&self) -> &str;

    /// Returns whether the named project exists.
    async fn exist_project(&self, name: &str) -> Result<bool>;

    /// Lists table names in the project.
    async fn list_tables(&self) -> Result<Vec<String>>;

    /// Fetches a table's schema.
    async fn get_table(&self, name: &str) -> Result<TableSchema>;

    /// Submits a SQL statement and returns its instance handle.
    async fn execute_sql(&self, sql: &str) -> Result<SqlInstance>;

    /// Waits until the instance terminates; errors if it failed.
    async fn wait_for_completion(&self, instance: &SqlInstance) -> Result<()>;

    /// Waits for the instance and reads all of its result rows.
    async fn read_result(&self, instance: &SqlInstance) -> Result<QueryOutput>;
}

/// Creates clients scoped to a project.
pub trait Connector: Send + Sync {
    fn connect(&self, project: &str) -> Result<Arc<dyn OdpsClient>>;
}
