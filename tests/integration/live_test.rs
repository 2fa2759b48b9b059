//! Live ODPS tests.
//!
//! Require a reachable project. Set ODPS_ACCESS_ID, ODPS_ACCESS_KEY and
//! ODPS_PROJECT (and optionally ODPS_ENDPOINT) to run them.

use odps_review::config::{EngineSettings, InstanceConfig};
use odps_review::engine::{Engine, OdpsEngine};

/// Helper to build an instance config from the environment.
fn get_test_instance() -> Option<InstanceConfig> {
    let mut instance = InstanceConfig::default();
    instance.apply_env_defaults();

    if instance.access_id.is_none() || instance.access_key.is_none() || instance.project.is_none()
    {
        return None;
    }
    Some(instance)
}

fn get_test_engine() -> Option<OdpsEngine> {
    let instance = get_test_instance()?;
    Some(OdpsEngine::from_config(&instance, &EngineSettings::default()))
}

#[tokio::test]
async fn test_live_connection() {
    let Some(mut engine) = get_test_engine() else {
        eprintln!("Skipping test: ODPS credentials not set");
        return;
    };

    let result = engine.test_connection().await;
    assert!(!result.is_failed(), "test query failed: {:?}", result.error);
    assert_eq!(result.affected_rows, 1);
}

#[tokio::test]
async fn test_live_project_exists() {
    let Some(mut engine) = get_test_engine() else {
        eprintln!("Skipping test: ODPS credentials not set");
        return;
    };

    let result = engine.get_all_databases().await;
    assert!(!result.is_failed(), "lookup failed: {:?}", result.error);
    assert_eq!(result.rows.len(), 1);
}

#[tokio::test]
async fn test_live_tables_and_columns() {
    let Some(mut engine) = get_test_engine() else {
        eprintln!("Skipping test: ODPS credentials not set");
        return;
    };

    let tables = engine.get_all_tables(None).await;
    assert!(!tables.is_failed(), "listing failed: {:?}", tables.error);

    if let Some(table) = tables.first_column().first() {
        let columns = engine.describe_table(None, table).await;
        assert!(!columns.is_failed(), "describe failed: {:?}", columns.error);
        assert_eq!(columns.column_list.len(), 3);
    }
}

#[tokio::test(flavor = "current_thread")]
async fn test_live_bad_credentials_are_folded() {
    let Some(mut instance) = get_test_instance() else {
        eprintln!("Skipping test: ODPS credentials not set");
        return;
    };
    instance.access_key = Some("definitely-not-the-secret".to_string());

    let mut engine = OdpsEngine::from_config(&instance, &EngineSettings::default());
    let result = engine.get_all_databases().await;
    assert!(result.is_failed());
}
