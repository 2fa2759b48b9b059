//! Engine capability layer.
//!
//! The host platform drives every SQL engine through the `Engine` trait.
//! Only `get_connection` returns an error; every other operation folds
//! failures into the `error` field of its result object.

mod connection;
mod odps;

pub use connection::ConnectionManager;
pub use odps::OdpsEngine;

use crate::error::Result;
use crate::odps::OdpsClient;
use crate::review::{QueryCheck, ResultSet, ReviewSet};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// An approved unit of SQL submitted for execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workflow {
    /// Target project. `None` uses the engine's default project.
    pub db_name: Option<String>,
    pub sql_content: String,
}

impl Workflow {
    pub fn new(db_name: Option<String>, sql_content: impl Into<String>) -> Self {
        Self {
            db_name,
            sql_content: sql_content.into(),
        }
    }
}

/// Capabilities a SQL engine exposes to the review platform.
#[async_trait]
pub trait Engine: Send {
    /// Short engine name.
    fn name(&self) -> &str;

    /// Human-readable description.
    fn info(&self) -> &str;

    /// Returns the client for a project, connecting lazily.
    async fn get_connection(&mut self, db_name: Option<&str>) -> Result<Arc<dyn OdpsClient>>;

    /// Runs the engine's test query.
    async fn test_connection(&mut self) -> ResultSet;

    async fn get_all_databases(&mut self) -> ResultSet;

    async fn get_all_tables(&mut self, db_name: Option<&str>) -> ResultSet;

    async fn get_all_columns_by_tb(&mut self, db_name: Option<&str>, tb_name: &str) -> ResultSet;

    async fn describe_table(&mut self, db_name: Option<&str>, tb_name: &str) -> ResultSet;

    /// Runs a read-only query with a row limit.
    async fn query(&mut self, db_name: Option<&str>, sql: &str, limit: usize) -> ResultSet;

    /// Checks an interactive query without running it.
    fn query_check(&self, db_name: Option<&str>, sql: &str) -> QueryCheck;

    /// Audits workflow SQL without running it.
    fn execute_check(&self, db_name: Option<&str>, sql: &str) -> ReviewSet;

    /// Executes SQL statement by statement, stopping at the first failure.
    async fn execute(&mut self, db_name: Option<&str>, sql: &str, close_conn: bool) -> ReviewSet;

    /// Executes a workflow and releases the connection afterwards.
    async fn execute_workflow(&mut self, workflow: &Workflow) -> ReviewSet;
}
