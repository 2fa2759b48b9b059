//! Whitelist audit for workflow SQL and interactive queries.
//!
//! Neither function executes anything.

use std::time::Duration;
use tracing::{debug, warn};

use super::{ErrLevel, QueryCheck, ReviewSet, StageStatus};
use crate::sql::{self, Verdict, Whitelist};

pub(crate) const NO_VALID_STATEMENT: &str = "no valid SQL statement";

const PASSED_AUDIT: &str = "passed audit";

/// Audits every statement against the execute whitelist.
///
/// All statements are classified regardless of earlier rejections.
pub fn execute_check(full_sql: &str) -> ReviewSet {
    let mut check = ReviewSet::new(full_sql);

    let statements = match sql::split_statements(full_sql) {
        Ok(statements) => statements,
        Err(e) => {
            warn!("SQL parse failed during audit: {}", e);
            check.error = Some(format!("SQL parse failed: {}", e.message()));
            return check;
        }
    };

    if statements.is_empty() {
        check.error = Some(NO_VALID_STATEMENT.to_string());
        return check;
    }

    let whitelist = Whitelist::execute();
    for statement in statements {
        match whitelist.classify(&statement) {
            Verdict::Allowed => check.push(
                ErrLevel::Ok,
                StageStatus::AuditCompleted,
                PASSED_AUDIT,
                statement,
                0,
                Duration::ZERO,
            ),
            Verdict::Rejected(reason) => {
                check.error_count += 1;
                check.push(
                    ErrLevel::Error,
                    StageStatus::AuditFailed,
                    reason,
                    statement,
                    0,
                    Duration::ZERO,
                );
            }
        }
    }

    debug!(
        "Audited {} statements, {} rejected",
        check.rows.len(),
        check.error_count
    );
    check
}

/// Checks an interactive query: first statement only, `select` only.
pub fn query_check(full_sql: &str) -> QueryCheck {
    let mut result = QueryCheck {
        filtered_sql: full_sql.to_string(),
        ..Default::default()
    };

    let first = match sql::split_statements(full_sql) {
        Ok(statements) => statements.into_iter().next(),
        Err(e) => {
            warn!("SQL parse failed during query check: {}", e);
            None
        }
    };

    let Some(statement) = first else {
        result.bad_query = true;
        result.msg = NO_VALID_STATEMENT.to_string();
        return result;
    };

    result.filtered_sql = statement;

    if let Verdict::Rejected(reason) = Whitelist::query().classify(&result.filtered_sql) {
        result.bad_query = true;
        result.msg = reason;
        return result;
    }

    result.has_star = sql::has_wildcard(&result.filtered_sql);
    result
}
