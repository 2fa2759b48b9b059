//! Result types returned by the engine.
//!
//! `ReviewSet` carries per-statement audit/execution outcomes, `ResultSet`
//! carries tabular results for metadata and ad-hoc queries.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Severity of a single review outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ErrLevel {
    /// Statement passed audit or executed successfully.
    #[default]
    Ok,
    /// Statement was rejected or failed to execute.
    Error,
}

impl ErrLevel {
    /// Numeric level as used by review platforms (0 = ok, 2 = error).
    pub fn as_u8(&self) -> u8 {
        match self {
            Self::Ok => 0,
            Self::Error => 2,
        }
    }
}

impl Serialize for ErrLevel {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u8(self.as_u8())
    }
}

impl<'de> Deserialize<'de> for ErrLevel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        match u8::deserialize(deserializer)? {
            0 => Ok(Self::Ok),
            2 => Ok(Self::Error),
            other => Err(serde::de::Error::custom(format!(
                "invalid errlevel {other}, expected 0 or 2"
            ))),
        }
    }
}

/// Stage label attached to a review outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StageStatus {
    #[serde(rename = "Audit completed")]
    AuditCompleted,
    #[serde(rename = "Audit Failed")]
    AuditFailed,
    #[serde(rename = "Execute Successfully")]
    ExecuteSuccessfully,
    #[serde(rename = "Execute Failed")]
    ExecuteFailed,
}

impl StageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuditCompleted => "Audit completed",
            Self::AuditFailed => "Audit Failed",
            Self::ExecuteSuccessfully => "Execute Successfully",
            Self::ExecuteFailed => "Execute Failed",
        }
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome for one statement of a check or execute pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewResult {
    /// 1-based position among emitted results.
    pub id: usize,

    pub errlevel: ErrLevel,

    pub stagestatus: StageStatus,

    pub errormessage: String,

    /// Statement text, trailing semicolon stripped.
    pub sql: String,

    pub affected_rows: usize,

    /// Wall-clock execution time; zero for audit-only results.
    #[serde(with = "duration_secs")]
    pub execute_time: Duration,
}

impl ReviewResult {
    /// Returns true if this outcome is an error.
    pub fn is_error(&self) -> bool {
        self.errlevel == ErrLevel::Error
    }
}

/// Aggregate result of a check or execute pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewSet {
    /// The unsplit SQL text as submitted.
    pub full_sql: String,

    /// Set-level failure. When present the whole pass is failed.
    pub error: Option<String>,

    /// Number of statements rejected by audit.
    pub error_count: usize,

    pub rows: Vec<ReviewResult>,
}

impl ReviewSet {
    /// Creates an empty review set for the given SQL text.
    pub fn new(full_sql: impl Into<String>) -> Self {
        Self {
            full_sql: full_sql.into(),
            ..Default::default()
        }
    }

    /// Returns true if a set-level error was recorded.
    pub fn is_failed(&self) -> bool {
        self.error.as_deref().is_some_and(|e| !e.is_empty())
    }

    /// Returns the id the next appended result will get.
    pub fn next_id(&self) -> usize {
        self.rows.len() + 1
    }

    /// Appends a result, assigning the next sequential id.
    pub fn push(
        &mut self,
        errlevel: ErrLevel,
        stagestatus: StageStatus,
        errormessage: impl Into<String>,
        sql: impl Into<String>,
        affected_rows: usize,
        execute_time: Duration,
    ) {
        let id = self.next_id();
        self.rows.push(ReviewResult {
            id,
            errlevel,
            stagestatus,
            errormessage: errormessage.into(),
            sql: sql.into(),
            affected_rows,
            execute_time,
        });
    }
}

/// Tabular result for metadata and ad-hoc query operations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    /// SQL that produced this result, if any.
    pub full_sql: String,

    /// Column names, in order.
    pub column_list: Vec<String>,

    pub rows: Vec<Row>,

    pub affected_rows: usize,

    /// Set-level failure. When present the result is failed even if rows exist.
    pub error: Option<String>,
}

impl ResultSet {
    /// Creates an empty result set for the given SQL text.
    pub fn new(full_sql: impl Into<String>) -> Self {
        Self {
            full_sql: full_sql.into(),
            ..Default::default()
        }
    }

    /// Creates a result set with the given columns and rows.
    pub fn with_data(column_list: Vec<String>, rows: Vec<Row>) -> Self {
        let affected_rows = rows.len();
        Self {
            column_list,
            rows,
            affected_rows,
            ..Default::default()
        }
    }

    /// Creates a single-column result set from a list of names.
    pub fn from_names(column: &str, names: impl IntoIterator<Item = String>) -> Self {
        let rows: Vec<Row> = names.into_iter().map(|n| vec![Value::String(n)]).collect();
        Self::with_data(vec![column.to_string()], rows)
    }

    /// Creates a failed result set carrying only an error message.
    pub fn failed(full_sql: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            full_sql: full_sql.into(),
            error: Some(error.into()),
            ..Default::default()
        }
    }

    /// Returns true if a set-level error was recorded.
    pub fn is_failed(&self) -> bool {
        self.error.as_deref().is_some_and(|e| !e.is_empty())
    }

    /// Returns true if the result set has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the first column of every row rendered as text.
    pub fn first_column(&self) -> Vec<String> {
        self.rows
            .iter()
            .filter_map(|row| row.first().map(Value::to_display_string))
            .collect()
    }
}

/// Outcome of the interactive query pre-check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryCheck {
    /// Reason the query was rejected; empty when accepted.
    pub msg: String,

    pub bad_query: bool,

    /// First statement with comments stripped.
    pub filtered_sql: String,

    /// Whether the statement projects `*`. Advisory only.
    pub has_star: bool,
}

/// A row of data from a result set.
pub type Row = Vec<Value>;

/// A single cell of a result set.
///
/// Task results arrive as CSV without column types, so every non-NULL cell
/// is text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Value {
    Null,
    String(String),
}

impl Value {
    /// Text shown for the cell, with NULL spelled out.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::String(s) => s.clone(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_display_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

/// Serde support for Duration as fractional seconds.
mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
