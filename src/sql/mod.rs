//! SQL text handling for the review pipeline.
//!
//! Splitting, whitelist classification and limit injection. Nothing here
//! talks to ODPS.

mod dialect;
mod limit;
mod splitter;
mod whitelist;

pub use dialect::OdpsDialect;
pub use limit::apply_limit;
pub use splitter::{split_statements, strip_comments};
pub use whitelist::{has_wildcard, is_select, Verdict, Whitelist, EXECUTE_WHITELIST, QUERY_WHITELIST};
