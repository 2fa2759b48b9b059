//! ODPS / MaxCompute engine.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{ConnectionManager, Engine, Workflow};
use crate::config::{EngineSettings, InstanceConfig};
use crate::error::{EngineError, Result};
use crate::odps::{Connector, OdpsClient, QueryOutput, RestConnector};
use crate::review::{self, BatchExecutor, QueryCheck, ResultSet, ReviewSet, Row, Value};
use crate::sql;

const ENGINE_NAME: &str = "ODPS";
const ENGINE_INFO: &str = "ODPS engine";

/// Query run by `test_connection`.
pub const TEST_QUERY: &str = "SELECT 1";

const SELECT_ONLY: &str = "only ODPS select statements are supported";

const COLUMN_HEADERS: [&str; 3] = ["COLUMN_NAME", "COLUMN_TYPE", "COLUMN_COMMENT"];

/// Engine bound to one ODPS instance.
pub struct OdpsEngine {
    connections: ConnectionManager,
}

impl OdpsEngine {
    /// Creates an engine that connects through `connector`.
    pub fn new(connector: Box<dyn Connector>, default_project: Option<String>) -> Self {
        Self {
            connections: ConnectionManager::new(connector, default_project),
        }
    }

    /// Creates an engine speaking the REST API for a configured instance.
    pub fn from_config(instance: &InstanceConfig, settings: &EngineSettings) -> Self {
        let connector = RestConnector::new(instance.clone(), settings.clone());
        Self::new(Box::new(connector), instance.project.clone())
    }

    /// Returns true while a client is held.
    pub fn is_connected(&self) -> bool {
        self.connections.is_connected()
    }

    /// Drops the held client.
    pub fn close(&mut self) {
        self.connections.release();
    }

    async fn fetch_databases(&mut self) -> Result<Vec<String>> {
        let client = self.get_connection(None).await?;
        let project = client.project().to_string();

        if !client.exist_project(&project).await? {
            return Err(EngineError::connection(format!(
                "[{project}] project does not exist"
            )));
        }
        Ok(vec![project])
    }

    async fn fetch_tables(&mut self, db_name: Option<&str>) -> Result<Vec<String>> {
        let client = self.get_connection(db_name).await?;
        client.list_tables().await
    }

    async fn fetch_columns(&mut self, db_name: Option<&str>, tb_name: &str) -> Result<Vec<Row>> {
        let client = self.get_connection(db_name).await?;
        let table = client.get_table(tb_name).await?;

        Ok(table
            .all_columns()
            .map(|col| {
                vec![
                    Value::from(col.name.as_str()),
                    Value::from(col.data_type.as_str()),
                    Value::from(col.comment.as_str()),
                ]
            })
            .collect())
    }

    async fn fetch_query(&mut self, db_name: Option<&str>, sql: &str) -> Result<QueryOutput> {
        let client = self.get_connection(db_name).await?;
        let instance = client.execute_sql(sql).await?;
        client.read_result(&instance).await
    }
}

#[async_trait]
impl Engine for OdpsEngine {
    fn name(&self) -> &str {
        ENGINE_NAME
    }

    fn info(&self) -> &str {
        ENGINE_INFO
    }

    async fn get_connection(&mut self, db_name: Option<&str>) -> Result<Arc<dyn OdpsClient>> {
        self.connections.get(db_name)
    }

    async fn test_connection(&mut self) -> ResultSet {
        self.query(None, TEST_QUERY, 1).await
    }

    async fn get_all_databases(&mut self) -> ResultSet {
        match self.fetch_databases().await {
            Ok(names) => ResultSet::from_names("project", names),
            Err(e) => {
                warn!("ODPS project lookup failed: {:?}", e);
                ResultSet::failed("", e.message())
            }
        }
    }

    async fn get_all_tables(&mut self, db_name: Option<&str>) -> ResultSet {
        match self.fetch_tables(db_name).await {
            Ok(names) => {
                debug!("Listed {} tables", names.len());
                ResultSet::from_names("table", names)
            }
            Err(e) => {
                warn!("ODPS table listing failed: {:?}", e);
                ResultSet::failed("", e.message())
            }
        }
    }

    async fn get_all_columns_by_tb(&mut self, db_name: Option<&str>, tb_name: &str) -> ResultSet {
        match self.fetch_columns(db_name, tb_name).await {
            Ok(rows) => ResultSet::with_data(
                COLUMN_HEADERS.iter().map(|h| h.to_string()).collect(),
                rows,
            ),
            Err(e) => {
                warn!("ODPS column lookup failed, table: {}, error: {:?}", tb_name, e);
                ResultSet::failed("", e.message())
            }
        }
    }

    async fn describe_table(&mut self, db_name: Option<&str>, tb_name: &str) -> ResultSet {
        self.get_all_columns_by_tb(db_name, tb_name).await
    }

    async fn query(&mut self, db_name: Option<&str>, sql: &str, limit: usize) -> ResultSet {
        // A trailing line comment would swallow an appended clause.
        let stripped = match sql::strip_comments(sql) {
            Ok(stripped) => stripped,
            Err(e) => {
                warn!("SQL parse failed before query: {:?}", e);
                return ResultSet::failed(sql, format!("SQL parse failed: {}", e.message()));
            }
        };
        if !sql::is_select(&stripped) {
            return ResultSet::failed(sql, SELECT_ONLY);
        }

        let limited = sql::apply_limit(&stripped, limit);

        match self.fetch_query(db_name, &limited).await {
            Ok(output) => {
                let mut result = ResultSet::with_data(output.columns, output.rows);
                result.full_sql = sql.to_string();
                result
            }
            Err(e) => {
                warn!("ODPS query failed, statement: {}, error: {:?}", limited, e);
                ResultSet::failed(sql, e.message())
            }
        }
    }

    fn query_check(&self, _db_name: Option<&str>, sql: &str) -> QueryCheck {
        review::query_check(sql)
    }

    fn execute_check(&self, _db_name: Option<&str>, sql: &str) -> ReviewSet {
        review::execute_check(sql)
    }

    async fn execute(&mut self, db_name: Option<&str>, sql: &str, close_conn: bool) -> ReviewSet {
        let statements = match sql::split_statements(sql) {
            Ok(statements) if !statements.is_empty() => statements,
            Ok(_) => {
                let mut review = ReviewSet::new(sql);
                review.error = Some(review::NO_VALID_STATEMENT.to_string());
                return review;
            }
            Err(e) => {
                warn!("SQL parse failed before execution: {:?}", e);
                let mut review = ReviewSet::new(sql);
                review.error = Some(format!("SQL parse failed: {}", e.message()));
                return review;
            }
        };

        let client = match self.get_connection(db_name).await {
            Ok(client) => client,
            Err(e) => {
                warn!("ODPS connection failed before execution: {:?}", e);
                let mut review = ReviewSet::new(sql);
                review.error = Some(e.message().to_string());
                return review;
            }
        };

        info!(
            "Executing {} statements in project {}",
            statements.len(),
            client.project()
        );
        let review = BatchExecutor::new(client.as_ref()).run(sql, statements).await;

        if close_conn {
            self.connections.release();
        }
        review
    }

    async fn execute_workflow(&mut self, workflow: &Workflow) -> ReviewSet {
        self.execute(workflow.db_name.as_deref(), &workflow.sql_content, true)
            .await
    }
}
