//! ODPS REST payloads: XML request bodies and response parsing.

use serde::Deserialize;

use super::{ColumnSchema, QueryOutput, TableSchema};
use crate::error::{EngineError, Result};
use crate::review::{Row, Value};

/// Name of the single task in every submitted SQL job.
pub(crate) const SQL_TASK_NAME: &str = "AnonymousSQLTask";

/// ODPS writes NULL cells in CSV results as `\N`.
const CSV_NULL: &str = "\\N";

/// Builds the job body for a single SQL task.
pub(crate) fn sql_job_body(sql: &str) -> String {
    let mut query = sql.trim_end().to_string();
    if !query.ends_with(';') {
        query.push(';');
    }
    let query = query.replace("]]>", "]]]]><![CDATA[>");

    format!(
        concat!(
            r#"<?xml version="1.0" encoding="utf-8"?>"#,
            "<Instance><Job><Priority>9</Priority><Tasks><SQL>",
            "<Name>{name}</Name>",
            "<Query><![CDATA[{query}]]></Query>",
            "</SQL></Tasks></Job></Instance>"
        ),
        name = SQL_TASK_NAME,
        query = query
    )
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(rename = "Code", default)]
    code: String,
    #[serde(rename = "Message", default)]
    message: String,
    #[serde(rename = "RequestId", default)]
    request_id: String,
}

/// Turns an error body into a readable message; falls back to the raw text.
pub(crate) fn error_message(body: &str) -> String {
    match quick_xml::de::from_str::<ErrorResponse>(body) {
        Ok(err) if !err.code.is_empty() || !err.message.is_empty() => {
            let mut msg = format!("{}: {}", err.code, err.message);
            if !err.request_id.is_empty() {
                msg.push_str(&format!(" (request id {})", err.request_id));
            }
            msg
        }
        _ => body.trim().to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct TablesResponse {
    #[serde(rename = "Marker", default)]
    marker: Option<String>,
    #[serde(rename = "Table", default)]
    tables: Vec<TableEntry>,
}

#[derive(Debug, Deserialize)]
struct TableEntry {
    #[serde(rename = "Name")]
    name: String,
}

/// One page of a table listing.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct TablePage {
    pub names: Vec<String>,
    /// Marker for the next page; `None` on the last page.
    pub marker: Option<String>,
}

pub(crate) fn parse_table_page(body: &str) -> Result<TablePage> {
    let response: TablesResponse = quick_xml::de::from_str(body)
        .map_err(|e| EngineError::internal(format!("Failed to parse table list: {e}")))?;

    Ok(TablePage {
        names: response.tables.into_iter().map(|t| t.name).collect(),
        marker: response.marker.filter(|m| !m.trim().is_empty()),
    })
}

#[derive(Debug, Deserialize)]
struct TableResponse {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Schema", default)]
    schema: String,
}

#[derive(Debug, Default, Deserialize)]
struct SchemaJson {
    #[serde(default)]
    columns: Vec<ColumnSchema>,
    #[serde(rename = "partitionKeys", default)]
    partition_keys: Vec<ColumnSchema>,
}

/// Parses a table document; the schema itself is embedded JSON.
pub(crate) fn parse_table(body: &str) -> Result<TableSchema> {
    let response: TableResponse = quick_xml::de::from_str(body)
        .map_err(|e| EngineError::internal(format!("Failed to parse table: {e}")))?;

    let schema: SchemaJson = if response.schema.trim().is_empty() {
        SchemaJson::default()
    } else {
        serde_json::from_str(&response.schema)
            .map_err(|e| EngineError::internal(format!("Failed to parse table schema: {e}")))?
    };

    Ok(TableSchema {
        name: response.name,
        columns: schema.columns,
        partition_columns: schema.partition_keys,
    })
}

#[derive(Debug, Deserialize)]
struct InstanceResponse {
    #[serde(rename = "Status", default)]
    status: String,
    #[serde(rename = "Tasks", default)]
    tasks: TasksNode,
}

#[derive(Debug, Default, Deserialize)]
struct TasksNode {
    #[serde(rename = "Task", default)]
    tasks: Vec<TaskNode>,
}

#[derive(Debug, Deserialize)]
struct TaskNode {
    #[serde(rename = "Name", default)]
    name: String,
    #[serde(rename = "Status", default)]
    status: String,
    #[serde(rename = "Result", default)]
    result: Option<ResultNode>,
}

#[derive(Debug, Deserialize)]
struct ResultNode {
    #[serde(rename = "$text", default)]
    text: String,
}

/// Lifecycle state of a submitted instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum InstanceState {
    Running,
    Succeeded,
    /// Terminated with at least one failed or cancelled task.
    Failed,
}

/// Parses a `?taskstatus` document.
pub(crate) fn parse_instance_state(body: &str) -> Result<InstanceState> {
    let response: InstanceResponse = quick_xml::de::from_str(body)
        .map_err(|e| EngineError::internal(format!("Failed to parse instance status: {e}")))?;

    if !response.status.eq_ignore_ascii_case("terminated") {
        return Ok(InstanceState::Running);
    }

    let failed = response.tasks.tasks.iter().any(|task| {
        matches!(
            task.status.to_ascii_lowercase().as_str(),
            "failed" | "cancelled"
        )
    });

    Ok(if failed {
        InstanceState::Failed
    } else {
        InstanceState::Succeeded
    })
}

/// Extracts the SQL task's result text from a `?result` document.
pub(crate) fn parse_task_result(body: &str) -> Result<String> {
    let response: InstanceResponse = quick_xml::de::from_str(body)
        .map_err(|e| EngineError::internal(format!("Failed to parse instance result: {e}")))?;

    let task = response
        .tasks
        .tasks
        .iter()
        .find(|t| t.name == SQL_TASK_NAME)
        .or_else(|| response.tasks.tasks.first());

    Ok(task
        .and_then(|t| t.result.as_ref())
        .map(|r| r.text.clone())
        .unwrap_or_default())
}

/// Parses CSV result text; the first record is the header.
pub(crate) fn parse_csv(text: &str) -> Result<QueryOutput> {
    if text.trim().is_empty() {
        return Ok(QueryOutput::default());
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let columns: Vec<String> = reader
        .headers()
        .map_err(|e| EngineError::internal(format!("Failed to read result header: {e}")))?
        .iter()
        .map(String::from)
        .collect();

    let mut rows: Vec<Row> = Vec::new();
    for record in reader.records() {
        let record =
            record.map_err(|e| EngineError::internal(format!("Failed to read result row: {e}")))?;
        rows.push(record.iter().map(csv_value).collect());
    }

    Ok(QueryOutput { columns, rows })
}

fn csv_value(cell: &str) -> Value {
    if cell == CSV_NULL {
        Value::Null
    } else {
        Value::String(cell.to_string())
    }
}
