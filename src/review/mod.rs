//! SQL review pipeline.
//!
//! Audit (whitelist classification) and sequential execution, plus the
//! result types both produce.

mod audit;
mod executor;
mod types;

pub use audit::{execute_check, query_check};
pub use executor::{BatchExecutor, StatementOutcome};
pub use types::{ErrLevel, QueryCheck, ResultSet, ReviewResult, ReviewSet, Row, StageStatus, Value};

pub(crate) use audit::NO_VALID_STATEMENT;
