//! Command-line argument parsing for odps-review.
//!
//! Uses clap derive. Global flags select and override the ODPS instance;
//! each subcommand maps to one engine operation.

use clap::{Args, Parser, Subcommand};
use odps_review::config::{Config, InstanceConfig};
use odps_review::error::{EngineError, Result};
use std::io::Read;
use std::path::PathBuf;

/// Output format for command results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Aligned text tables.
    #[default]
    Text,
    /// Pretty-printed JSON of the result object.
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Invalid output format: {s}. Expected: text or json")),
        }
    }
}

/// Review and execute SQL against an ODPS / MaxCompute project.
#[derive(Parser, Debug)]
#[command(name = "odps-review")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Use named instance from config
    #[arg(short = 'i', long, global = true, value_name = "NAME")]
    pub instance: Option<String>,

    /// ODPS REST endpoint
    #[arg(long, global = true, value_name = "URL")]
    pub endpoint: Option<String>,

    /// AccessKey ID (the secret is read from config or ODPS_ACCESS_KEY)
    #[arg(long, global = true, value_name = "ID")]
    pub access_id: Option<String>,

    /// Default project
    #[arg(short = 'p', long, global = true, value_name = "PROJECT")]
    pub project: Option<String>,

    /// Output format
    #[arg(long, global = true, value_name = "FORMAT", default_value = "text")]
    pub output: OutputFormat,

    /// Use an in-memory mock project instead of the REST API
    #[arg(long, global = true)]
    pub mock: bool,

    /// Enable debug logging
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Show the configured project
    Databases,

    /// List tables in a project
    Tables {
        /// Project (defaults to the instance project)
        #[arg(long)]
        db: Option<String>,
    },

    /// List columns of a table
    Columns {
        table: String,
        #[arg(long)]
        db: Option<String>,
    },

    /// Describe a table
    Describe {
        table: String,
        #[arg(long)]
        db: Option<String>,
    },

    /// Run a select query with a row limit
    Query {
        sql: String,
        /// Row limit (defaults to engine.query_limit)
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        db: Option<String>,
    },

    /// Check a query without running it
    QueryCheck { sql: String },

    /// Audit SQL against the execution whitelist
    Check(SqlInput),

    /// Execute SQL statement by statement
    Execute {
        #[command(flatten)]
        input: SqlInput,
        #[arg(long)]
        db: Option<String>,
        /// Keep the connection open after execution
        #[arg(long)]
        keep_conn: bool,
    },

    /// Run the engine's test query
    Test,
}

/// SQL given inline or read from a file.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct SqlInput {
    /// SQL text
    #[arg(value_name = "SQL", required_unless_present = "file")]
    pub sql: Option<String>,

    /// Read SQL from a file ("-" for stdin)
    #[arg(short = 'f', long, value_name = "PATH", conflicts_with = "sql")]
    pub file: Option<PathBuf>,
}

impl SqlInput {
    /// Returns the SQL text, reading the file if one was given.
    pub fn read(&self) -> Result<String> {
        if let Some(sql) = &self.sql {
            return Ok(sql.clone());
        }

        match self.file.as_deref() {
            Some(path) if path.as_os_str() == "-" => {
                let mut sql = String::new();
                std::io::stdin()
                    .read_to_string(&mut sql)
                    .map_err(|e| EngineError::config(format!("Failed to read stdin: {e}")))?;
                Ok(sql)
            }
            Some(path) => std::fs::read_to_string(path).map_err(|e| {
                EngineError::config(format!("Failed to read {}: {e}", path.display()))
            }),
            None => Err(EngineError::validation("no SQL given")),
        }
    }
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path to use.
    ///
    /// Uses the --config argument if provided, otherwise the default path.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }

    /// Instance overrides given on the command line.
    pub fn instance_overrides(&self) -> InstanceConfig {
        InstanceConfig {
            endpoint: self.endpoint.clone(),
            access_id: self.access_id.clone(),
            access_key: None,
            project: self.project.clone(),
        }
    }

    /// Resolves the instance from CLI flags, config file and environment.
    ///
    /// Precedence: flags, then the named instance (or `default`), then env.
    pub fn resolve_instance(&self, config: &Config) -> Result<InstanceConfig> {
        let mut instance = match self.instance.as_deref() {
            Some(name) => config.get_instance(Some(name)).cloned().ok_or_else(|| {
                EngineError::config(format!("Instance '{}' not found in config file", name))
            })?,
            None => config.get_instance(None).cloned().unwrap_or_default(),
        };

        instance.merge(&self.instance_overrides());
        instance.apply_env_defaults();
        Ok(instance)
    }
}
