//! odps-review - SQL review and execution for ODPS / MaxCompute.

mod cli;
mod output;

use cli::{Cli, Command};
use odps_review::config::{Config, EngineSettings, InstanceConfig};
use odps_review::engine::{Engine, OdpsEngine, Workflow};
use odps_review::error::Result;
use odps_review::logging;
use odps_review::odps::{MockConnector, MockOdpsClient};
use output::Renderer;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse_args();
    logging::init_stderr_logging(cli.verbose);

    match run(cli).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            error!("{}: {}", e.category(), e);
            std::process::exit(1);
        }
    }
}

/// Runs the selected command. Returns false when the result reports a failure.
async fn run(cli: Cli) -> Result<bool> {
    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let config = Config::load_from_file(&config_path)?;

    let instance = cli.resolve_instance(&config)?;
    info!("Instance: {}", instance.display_string());

    let mut engine = build_engine(&cli, &instance, &config.engine);
    let renderer = Renderer::new(cli.output);

    let (text, ok) = match &cli.command {
        Command::Databases => {
            let result = engine.get_all_databases().await;
            (renderer.result_set(&result), !result.is_failed())
        }
        Command::Tables { db } => {
            let result = engine.get_all_tables(db.as_deref()).await;
            (renderer.result_set(&result), !result.is_failed())
        }
        Command::Columns { table, db } => {
            let result = engine.get_all_columns_by_tb(db.as_deref(), table).await;
            (renderer.result_set(&result), !result.is_failed())
        }
        Command::Describe { table, db } => {
            let result = engine.describe_table(db.as_deref(), table).await;
            (renderer.result_set(&result), !result.is_failed())
        }
        Command::Query { sql, limit, db } => {
            let limit = limit.unwrap_or(config.engine.query_limit);
            let result = engine.query(db.as_deref(), sql, limit).await;
            (renderer.result_set(&result), !result.is_failed())
        }
        Command::QueryCheck { sql } => {
            let check = engine.query_check(None, sql);
            (renderer.query_check(&check), !check.bad_query)
        }
        Command::Check(input) => {
            let review = engine.execute_check(None, &input.read()?);
            let ok = !review.is_failed() && review.error_count == 0;
            (renderer.review_set(&review), ok)
        }
        Command::Execute {
            input,
            db,
            keep_conn,
        } => {
            let sql = input.read()?;
            let review = if *keep_conn {
                engine.execute(db.as_deref(), &sql, false).await
            } else {
                engine
                    .execute_workflow(&Workflow::new(db.clone(), sql))
                    .await
            };
            let ok = !review.is_failed();
            (renderer.review_set(&review), ok)
        }
        Command::Test => {
            let result = engine.test_connection().await;
            (renderer.result_set(&result), !result.is_failed())
        }
    };

    print!("{text}");
    Ok(ok)
}

fn build_engine(cli: &Cli, instance: &InstanceConfig, settings: &EngineSettings) -> OdpsEngine {
    if cli.mock {
        let project = instance
            .project
            .clone()
            .unwrap_or_else(|| "mock_project".to_string());
        info!("Using mock ODPS project {}", project);
        let client = MockOdpsClient::new(project.clone());
        return OdpsEngine::new(Box::new(MockConnector::new(client)), Some(project));
    }
    OdpsEngine::from_config(instance, settings)
}
