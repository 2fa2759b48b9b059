//! Engine integration tests.
//!
//! Drives `OdpsEngine` through the `Engine` trait against the mock client.

use odps_review::engine::{Engine, OdpsEngine, Workflow};
use odps_review::odps::{
    ColumnSchema, FailingConnector, MockConnector, MockOdpsClient, QueryOutput, TableSchema,
};
use odps_review::review::{ErrLevel, StageStatus, Value};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn sample_project() -> MockOdpsClient {
    MockOdpsClient::new("analytics")
        .with_project("warehouse")
        .with_table(
            TableSchema::new(
                "orders",
                vec![
                    ColumnSchema::new("order_id", "bigint", "primary key"),
                    ColumnSchema::new("amount", "double", ""),
                ],
            )
            .with_partitions(vec![ColumnSchema::new("ds", "string", "business date")]),
        )
        .with_table(TableSchema::new(
            "users",
            vec![ColumnSchema::new("user_id", "bigint", "")],
        ))
        .with_result(
            "from orders",
            QueryOutput::new(
                vec!["order_id".to_string(), "amount".to_string()],
                vec![
                    vec![Value::from("1"), Value::from("9.5")],
                    vec![Value::from("2"), Value::Null],
                ],
            ),
        )
}

fn engine(mock: &MockOdpsClient) -> OdpsEngine {
    OdpsEngine::new(
        Box::new(MockConnector::new(mock.clone())),
        Some("analytics".to_string()),
    )
}

#[tokio::test]
async fn test_engine_is_usable_as_trait_object() {
    let mock = sample_project();
    let mut engine: Box<dyn Engine> = Box::new(engine(&mock));

    assert_eq!(engine.name(), "ODPS");
    let result = engine.get_all_databases().await;
    assert_eq!(result.first_column(), vec!["analytics"]);
}

#[tokio::test]
async fn test_metadata_browsing() {
    let mock = sample_project();
    let mut engine = engine(&mock);

    let tables = engine.get_all_tables(None).await;
    assert_eq!(tables.first_column(), vec!["orders", "users"]);

    let columns = engine.get_all_columns_by_tb(None, "orders").await;
    assert_eq!(columns.first_column(), vec!["order_id", "amount", "ds"]);
    assert_eq!(columns.rows[0][2], Value::from("primary key"));

    let tables = engine.get_all_tables(Some("warehouse")).await;
    assert_eq!(tables.first_column(), vec!["orders", "users"]);
}

#[tokio::test]
async fn test_query_returns_rows_and_columns() {
    let mock = sample_project();
    let mut engine = engine(&mock);

    let result = engine
        .query(None, "select order_id, amount from orders limit 100", 10)
        .await;

    assert_eq!(result.error, None);
    assert_eq!(result.column_list, vec!["order_id", "amount"]);
    assert_eq!(result.affected_rows, 2);
    assert_eq!(result.rows[1][1], Value::Null);
    assert_eq!(
        mock.executed(),
        vec!["select order_id, amount from orders limit 10"]
    );
}

#[tokio::test]
async fn test_connection_is_memoized_per_project() {
    let mock = sample_project();
    let mut engine = engine(&mock);

    let first = engine.get_connection(None).await.unwrap();
    let second = engine.get_connection(Some("analytics")).await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(mock.connect_count(), 1);

    let other = engine.get_connection(Some("warehouse")).await.unwrap();
    assert_eq!(other.project(), "warehouse");
    assert_eq!(mock.connect_count(), 2);
}

#[tokio::test]
async fn test_workflow_short_circuits_and_releases() {
    let mock = sample_project().fail_on("insert into missing", "ODPS-0130131: Table not found");
    let mut engine = engine(&mock);

    let workflow = Workflow::new(
        None,
        "create table t1 (id bigint);\n\
         insert into missing select * from orders;\n\
         drop table t1;",
    );
    let review = engine.execute_workflow(&workflow).await;

    assert_eq!(
        review.error,
        Some("ODPS-0130131: Table not found".to_string())
    );
    let statuses: Vec<StageStatus> = review.rows.iter().map(|r| r.stagestatus).collect();
    assert_eq!(
        statuses,
        vec![
            StageStatus::ExecuteSuccessfully,
            StageStatus::ExecuteFailed,
            StageStatus::AuditCompleted,
        ]
    );
    assert_eq!(review.rows[2].errlevel, ErrLevel::Ok);
    assert_eq!(mock.executed().len(), 2);
    assert!(!engine.is_connected());
}

#[tokio::test]
async fn test_unreachable_service_is_folded_everywhere() {
    let mut engine = OdpsEngine::new(
        Box::new(FailingConnector::new("Failed to connect to ODPS endpoint")),
        Some("analytics".to_string()),
    );

    assert!(engine.get_all_databases().await.is_failed());
    assert!(engine.get_all_tables(None).await.is_failed());
    assert!(engine.describe_table(None, "orders").await.is_failed());
    assert!(engine.test_connection().await.is_failed());

    let review = engine.execute(None, "select 1", true).await;
    assert_eq!(
        review.error,
        Some("Failed to connect to ODPS endpoint".to_string())
    );
    assert!(review.rows.is_empty());

    assert!(engine.get_connection(None).await.is_err());
}
