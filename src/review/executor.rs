//! Sequential statement execution with short-circuit on failure.
//!
//! Statements run strictly in order. Each ends in one of three states:
//! executed, failed, or skipped. The first failure halts the batch and
//! every statement after it is recorded as skipped, so the result always
//! holds one entry per input statement.

use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::{ErrLevel, ReviewSet, StageStatus};
use crate::error::Result;
use crate::odps::OdpsClient;
use crate::sql;

pub(crate) const NOT_EXECUTED: &str = "previous statement failed, not executed";

const EXECUTE_SUCCESSFULLY: &str = "execute successfully";

/// Terminal state of one statement.
#[derive(Debug, Clone, PartialEq)]
pub enum StatementOutcome {
    Executed {
        affected_rows: usize,
        execute_time: Duration,
    },
    Failed {
        message: String,
        execute_time: Duration,
    },
    Skipped,
}

/// Whether the batch still accepts work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BatchState {
    Running,
    Halted,
}

/// Runs a batch of statements against one client.
pub struct BatchExecutor<'a> {
    client: &'a dyn OdpsClient,
}

impl<'a> BatchExecutor<'a> {
    pub fn new(client: &'a dyn OdpsClient) -> Self {
        Self { client }
    }

    /// Executes statements in order, stopping at the first failure.
    ///
    /// The set-level `error` carries the failing statement's message.
    pub async fn run(&self, full_sql: &str, statements: Vec<String>) -> ReviewSet {
        let mut review = ReviewSet::new(full_sql);
        let mut state = BatchState::Running;

        for statement in statements {
            let outcome = match state {
                BatchState::Halted => StatementOutcome::Skipped,
                BatchState::Running => self.execute_one(&statement).await,
            };

            if let StatementOutcome::Failed { message, .. } = &outcome {
                review.error = Some(message.clone());
                state = BatchState::Halted;
            }

            record(&mut review, statement, outcome);
        }

        info!(
            "Executed batch in project {}: {} statements, halted: {}",
            self.client.project(),
            review.rows.len(),
            state == BatchState::Halted
        );
        review
    }

    async fn execute_one(&self, statement: &str) -> StatementOutcome {
        let start = Instant::now();
        let result = self.submit(statement).await;
        let execute_time = start.elapsed();

        match result {
            Ok(affected_rows) => {
                debug!("Statement finished in {:?}: {}", execute_time, statement);
                StatementOutcome::Executed {
                    affected_rows,
                    execute_time,
                }
            }
            Err(e) => {
                warn!(
                    "ODPS statement failed, statement: {}, error: {:?}",
                    statement, e
                );
                StatementOutcome::Failed {
                    message: e.message().to_string(),
                    execute_time,
                }
            }
        }
    }

    /// Runs one statement to completion and returns its affected row count.
    ///
    /// ODPS reports no row count for DML/DDL, so only queries count rows.
    async fn submit(&self, statement: &str) -> Result<usize> {
        let instance = self.client.execute_sql(statement).await?;

        if sql::is_select(statement) {
            let output = self.client.read_result(&instance).await?;
            Ok(output.rows.len())
        } else {
            self.client.wait_for_completion(&instance).await?;
            Ok(0)
        }
    }
}

fn record(review: &mut ReviewSet, statement: String, outcome: StatementOutcome) {
    match outcome {
        StatementOutcome::Executed {
            affected_rows,
            execute_time,
        } => review.push(
            ErrLevel::Ok,
            StageStatus::ExecuteSuccessfully,
            EXECUTE_SUCCESSFULLY,
            statement,
            affected_rows,
            execute_time,
        ),
        StatementOutcome::Failed {
            message,
            execute_time,
        } => review.push(
            ErrLevel::Error,
            StageStatus::ExecuteFailed,
            format!("execute failed: {message}"),
            statement,
            0,
            execute_time,
        ),
        StatementOutcome::Skipped => review.push(
            ErrLevel::Ok,
            StageStatus::AuditCompleted,
            NOT_EXECUTED,
            statement,
            0,
            Duration::ZERO,
        ),
    }
}
