//! Mock ODPS client for testing.
//!
//! Provides an in-memory project with scripted query results and failures,
//! and records every statement it is asked to run.

use super::{Connector, OdpsClient, QueryOutput, SqlInstance, TableSchema};
use crate::error::{EngineError, Result};
use crate::review::Value;
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct MockState {
    projects: BTreeSet<String>,
    tables: BTreeMap<String, TableSchema>,
    /// (sql fragment, result) pairs, checked in insertion order.
    results: Vec<(String, QueryOutput)>,
    /// (sql fragment, message) pairs, checked in insertion order.
    failures: Vec<(String, String)>,
    /// Like `failures`, but the statement is accepted and its task fails.
    task_failures: Vec<(String, String)>,
    executed: Vec<String>,
    connects: usize,
    next_instance: usize,
}

/// A mock ODPS client that returns predefined results.
///
/// Clones share state, so a test can keep one handle for assertions while
/// the engine owns another.
#[derive(Debug, Clone)]
pub struct MockOdpsClient {
    project: String,
    state: Arc<Mutex<MockState>>,
}

impl MockOdpsClient {
    /// Creates a mock client for an existing, empty project.
    pub fn new(project: impl Into<String>) -> Self {
        let project = project.into();
        let mut state = MockState::default();
        state.projects.insert(project.clone());
        Self {
            project,
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Registers an additional existing project.
    pub fn with_project(self, project: impl Into<String>) -> Self {
        self.lock().projects.insert(project.into());
        self
    }

    /// Adds a table.
    pub fn with_table(self, table: TableSchema) -> Self {
        self.lock().tables.insert(table.name.clone(), table);
        self
    }

    /// Returns `output` for any statement containing `fragment` (case-insensitive).
    pub fn with_result(self, fragment: impl Into<String>, output: QueryOutput) -> Self {
        self.lock()
            .results
            .push((fragment.into().to_lowercase(), output));
        self
    }

    /// Fails any statement containing `fragment` (case-insensitive) with `message`.
    pub fn fail_on(self, fragment: impl Into<String>, message: impl Into<String>) -> Self {
        self.lock()
            .failures
            .push((fragment.into().to_lowercase(), message.into()));
        self
    }

    /// Accepts any statement containing `fragment` (case-insensitive), then
    /// fails its task with `message` while it is awaited or read.
    pub fn fail_task_on(self, fragment: impl Into<String>, message: impl Into<String>) -> Self {
        self.lock()
            .task_failures
            .push((fragment.into().to_lowercase(), message.into()));
        self
    }

    /// Statements submitted so far, in order.
    pub fn executed(&self) -> Vec<String> {
        self.lock().executed.clone()
    }

    /// Number of clients handed out by a `MockConnector` sharing this state.
    pub fn connect_count(&self) -> usize {
        self.lock().connects
    }

    fn scoped_to(&self, project: &str) -> Self {
        Self {
            project: project.to_string(),
            state: Arc::clone(&self.state),
        }
    }

    fn check_task(&self, instance: &SqlInstance) -> Result<()> {
        let state = self.lock();
        let lowered = instance.sql.to_lowercase();
        if let Some((_, message)) = state
            .task_failures
            .iter()
            .find(|(fragment, _)| lowered.contains(fragment.as_str()))
        {
            return Err(EngineError::query(message.clone()));
        }
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        // A panicking test thread must not hide the state from the others.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl OdpsClient for MockOdpsClient {
    fn project(&self) -> &str {
        &self.project
    }

    async fn exist_project(&self, name: &str) -> Result<bool> {
        Ok(self.lock().projects.contains(name))
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        Ok(self.lock().tables.keys().cloned().collect())
    }

    async fn get_table(&self, name: &str) -> Result<TableSchema> {
        self.lock().tables.get(name).cloned().ok_or_else(|| {
            EngineError::query(format!(
                "ODPS-0130131: Table not found - table {}.{} cannot be resolved",
                self.project, name
            ))
        })
    }

    async fn execute_sql(&self, sql: &str) -> Result<SqlInstance> {
        let mut state = self.lock();
        state.executed.push(sql.to_string());

        let lowered = sql.to_lowercase();
        if let Some((_, message)) = state
            .failures
            .iter()
            .find(|(fragment, _)| lowered.contains(fragment.as_str()))
        {
            return Err(EngineError::query(message.clone()));
        }

        state.next_instance += 1;
        Ok(SqlInstance {
            id: format!("mock-{}", state.next_instance),
            sql: sql.to_string(),
        })
    }

    async fn wait_for_completion(&self, instance: &SqlInstance) -> Result<()> {
        self.check_task(instance)
    }

    async fn read_result(&self, instance: &SqlInstance) -> Result<QueryOutput> {
        self.check_task(instance)?;

        let state = self.lock();
        let lowered = instance.sql.to_lowercase();

        if let Some((_, output)) = state
            .results
            .iter()
            .find(|(fragment, _)| lowered.contains(fragment.as_str()))
        {
            return Ok(output.clone());
        }

        Ok(QueryOutput::new(
            vec!["result".to_string()],
            vec![vec![Value::String(format!(
                "Mock result for: {}",
                instance.sql
            ))]],
        ))
    }
}

/// Hands out mock clients that share one state.
#[derive(Debug, Clone)]
pub struct MockConnector {
    client: MockOdpsClient,
}

impl MockConnector {
    pub fn new(client: MockOdpsClient) -> Self {
        Self { client }
    }
}

impl Connector for MockConnector {
    fn connect(&self, project: &str) -> Result<Arc<dyn OdpsClient>> {
        self.client.lock().connects += 1;
        Ok(Arc::new(self.client.scoped_to(project)))
    }
}

/// A connector whose every connection attempt fails.
#[derive(Debug, Clone)]
pub struct FailingConnector {
    message: String,
}

impl FailingConnector {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Connector for FailingConnector {
    fn connect(&self, _project: &str) -> Result<Arc<dyn OdpsClient>> {
        Err(EngineError::connection(self.message.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::odps::ColumnSchema;

    #[tokio::test]
    async fn test_mock_select() {
        let client = MockOdpsClient::new("p");
        let instance = client.execute_sql("SELECT 1").await.unwrap();
        let output = client.read_result(&instance).await.unwrap();
        assert_eq!(output.rows.len(), 1);
        assert_eq!(output.columns, vec!["result"]);
    }

    #[tokio::test]
    async fn test_mock_scripted_result_and_failure() {
        let client = MockOdpsClient::new("p")
            .with_result(
                "from orders",
                QueryOutput::new(vec!["id".into()], vec![vec![Value::from("1")]]),
            )
            .fail_on("drop table", "ODPS-0130131: Table not found");

        let instance = client.execute_sql("select id FROM Orders").await.unwrap();
        let output = client.read_result(&instance).await.unwrap();
        assert_eq!(output.columns, vec!["id"]);

        let err = client.execute_sql("DROP TABLE missing").await.unwrap_err();
        assert_eq!(err.message(), "ODPS-0130131: Table not found");

        assert_eq!(
            client.executed(),
            vec!["select id FROM Orders", "DROP TABLE missing"]
        );
    }

    #[tokio::test]
    async fn test_mock_task_failure_after_submit() {
        let client = MockOdpsClient::new("p").fail_task_on("from broken", "ODPS-0123131: bad cast");

        let instance = client.execute_sql("select x from broken").await.unwrap();
        let err = client.wait_for_completion(&instance).await.unwrap_err();
        assert_eq!(err.message(), "ODPS-0123131: bad cast");
        assert!(client.read_result(&instance).await.is_err());

        let fine = client.execute_sql("select 1").await.unwrap();
        assert!(client.wait_for_completion(&fine).await.is_ok());
        assert_eq!(client.executed(), vec!["select x from broken", "select 1"]);
    }

    #[tokio::test]
    async fn test_mock_tables() {
        let client = MockOdpsClient::new("p").with_table(TableSchema::new(
            "orders",
            vec![ColumnSchema::new("id", "bigint", "")],
        ));
        assert_eq!(client.list_tables().await.unwrap(), vec!["orders"]);
        assert!(client.get_table("orders").await.is_ok());
        assert!(client.get_table("missing").await.is_err());
    }

    #[tokio::test]
    async fn test_connector_shares_state() {
        let client = MockOdpsClient::new("p1").with_project("p2");
        let connector = MockConnector::new(client.clone());

        let scoped = connector.connect("p2").unwrap();
        assert_eq!(scoped.project(), "p2");
        scoped.execute_sql("select 1").await.unwrap();

        assert_eq!(client.connect_count(), 1);
        assert_eq!(client.executed(), vec!["select 1"]);
    }

    #[test]
    fn test_failing_connector() {
        let connector = FailingConnector::new("endpoint unreachable");
        let err = connector.connect("p").err().unwrap();
        assert_eq!(err.category(), "Connection Error");
    }
}
