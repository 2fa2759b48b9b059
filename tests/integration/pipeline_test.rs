//! Review pipeline integration tests.
//!
//! Audit first, then execute what passed, the way the review platform
//! drives a workflow.

use odps_review::engine::{Engine, OdpsEngine};
use odps_review::odps::{MockConnector, MockOdpsClient};
use odps_review::review::{self, ErrLevel, StageStatus};
use odps_review::sql;
use pretty_assertions::assert_eq;

const DEPLOY_SQL: &str = "\
-- nightly rebuild; do not edit
CREATE TABLE IF NOT EXISTS daily_sales (ds STRING, total DOUBLE);
/* backfill; one day only */
INSERT OVERWRITE TABLE daily_sales SELECT ds, sum(amount) FROM orders WHERE note = 'a;b' GROUP BY ds;
SELECT count(*) FROM daily_sales;
";

fn engine(mock: &MockOdpsClient) -> OdpsEngine {
    OdpsEngine::new(
        Box::new(MockConnector::new(mock.clone())),
        Some("analytics".to_string()),
    )
}

#[test]
fn test_split_ignores_semicolons_in_comments_and_strings() {
    let statements = sql::split_statements(DEPLOY_SQL).unwrap();

    assert_eq!(statements.len(), 3);
    assert!(statements[0].starts_with("CREATE TABLE"));
    assert!(statements[1].contains("note = 'a;b'"));
    assert_eq!(statements[2], "SELECT count(*) FROM daily_sales");
}

#[tokio::test]
async fn test_audit_then_execute_same_statements() {
    let audit = review::execute_check(DEPLOY_SQL);
    assert_eq!(audit.error_count, 0);
    assert_eq!(audit.rows.len(), 3);

    let mock = MockOdpsClient::new("analytics");
    let mut engine = engine(&mock);
    let executed = engine.execute(None, DEPLOY_SQL, true).await;

    assert_eq!(executed.error, None);
    let audited_sql: Vec<&str> = audit.rows.iter().map(|r| r.sql.as_str()).collect();
    let executed_sql: Vec<&str> = executed.rows.iter().map(|r| r.sql.as_str()).collect();
    assert_eq!(audited_sql, executed_sql);
    assert_eq!(mock.executed(), executed_sql);
}

#[test]
fn test_audit_flags_unsupported_statements() {
    let sql = "grant select on table orders to user bob;\nselect 1;\nset odps.sql.allow.fullscan=true;";
    let audit = review::execute_check(sql);

    assert_eq!(audit.error_count, 2);
    assert_eq!(audit.rows[0].errlevel, ErrLevel::Error);
    assert_eq!(audit.rows[0].stagestatus, StageStatus::AuditFailed);
    assert_eq!(audit.rows[1].errlevel, ErrLevel::Ok);
    assert_eq!(audit.rows[2].errlevel, ErrLevel::Error);
}

#[tokio::test]
async fn test_query_check_and_query_agree() {
    let mock = MockOdpsClient::new("analytics");
    let mut engine = engine(&mock);

    let check = engine.query_check(None, "/* top */ select * from orders; drop table orders");
    assert!(!check.bad_query);
    assert!(check.has_star);
    assert_eq!(check.filtered_sql, "select * from orders");

    let result = engine.query(None, &check.filtered_sql, 5).await;
    assert!(!result.is_failed());
    assert_eq!(mock.executed(), vec!["select * from orders limit 5;"]);
}

#[test]
fn test_review_set_json_shape() {
    let audit = review::execute_check("select 1; grant x");
    let json = serde_json::to_value(&audit).unwrap();

    assert_eq!(json["error_count"], 1);
    assert_eq!(json["rows"][0]["id"], 1);
    assert_eq!(json["rows"][1]["errlevel"], 2);
    assert_eq!(json["rows"][0]["stagestatus"], "Audit completed");
    assert_eq!(json["rows"][0]["execute_time"], 0.0);
}
