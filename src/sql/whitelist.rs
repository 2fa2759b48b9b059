//! Keyword whitelist classification and wildcard detection.
//!
//! Classification is a case-insensitive prefix match against a fixed keyword
//! set. It does not parse the statement: `selectx ...` passes the `select`
//! entry. Wildcard detection does parse, and walks every SELECT in the
//! statement.

use sqlparser::ast::{Query, Select, SelectItem, SetExpr, Statement, TableFactor, TableWithJoins};
use sqlparser::parser::Parser;

use super::OdpsDialect;

/// Statement kinds accepted for workflow execution.
pub const EXECUTE_WHITELIST: &[&str] = &[
    "select", "insert", "update", "delete", "create", "drop", "alter", "truncate", "merge",
    "with", "desc", "describe", "show", "explain",
];

/// Statement kinds accepted for interactive queries.
pub const QUERY_WHITELIST: &[&str] = &["select"];

/// Outcome of classifying one statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allowed,
    Rejected(String),
}

impl Verdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// Which path a whitelist guards; decides the rejection wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Execute,
    Query,
}

/// A keyword whitelist.
#[derive(Debug, Clone, Copy)]
pub struct Whitelist {
    keywords: &'static [&'static str],
    scope: Scope,
}

impl Whitelist {
    /// Whitelist for workflow audit and execution.
    pub const fn execute() -> Self {
        Self {
            keywords: EXECUTE_WHITELIST,
            scope: Scope::Execute,
        }
    }

    /// Whitelist for interactive queries.
    pub const fn query() -> Self {
        Self {
            keywords: QUERY_WHITELIST,
            scope: Scope::Query,
        }
    }

    pub fn keywords(&self) -> &'static [&'static str] {
        self.keywords
    }

    /// Classifies a statement by its leading keyword.
    pub fn classify(&self, statement: &str) -> Verdict {
        let lowered = statement.trim().to_lowercase();
        if self.keywords.iter().any(|kw| lowered.starts_with(kw)) {
            Verdict::Allowed
        } else {
            Verdict::Rejected(self.rejection_reason())
        }
    }

    fn rejection_reason(&self) -> String {
        match self.scope {
            Scope::Execute => format!(
                "unsupported SQL type, only supports: {}",
                self.keywords.join(", ")
            ),
            Scope::Query => format!("only supports {} syntax!", self.keywords.join(",")),
        }
    }
}

/// Returns true if the statement starts with `select` (case-insensitive).
pub fn is_select(statement: &str) -> bool {
    Whitelist::query().classify(statement).is_allowed()
}

/// Returns true if any SELECT in the statement projects `*` or `t.*`.
///
/// Statements that do not parse report false.
pub fn has_wildcard(sql: &str) -> bool {
    match Parser::parse_sql(&OdpsDialect, sql) {
        Ok(statements) => statements.iter().any(statement_has_wildcard),
        Err(_) => false,
    }
}

fn statement_has_wildcard(statement: &Statement) -> bool {
    match statement {
        Statement::Query(query) => query_has_wildcard(query),
        _ => false,
    }
}

fn query_has_wildcard(query: &Query) -> bool {
    let in_ctes = query
        .with
        .as_ref()
        .is_some_and(|with| with.cte_tables.iter().any(|cte| query_has_wildcard(&cte.query)));

    in_ctes || set_expr_has_wildcard(&query.body)
}

fn set_expr_has_wildcard(set_expr: &SetExpr) -> bool {
    match set_expr {
        SetExpr::Select(select) => select_has_wildcard(select),
        SetExpr::Query(query) => query_has_wildcard(query),
        SetExpr::SetOperation { left, right, .. } => {
            set_expr_has_wildcard(left) || set_expr_has_wildcard(right)
        }
        _ => false,
    }
}

fn select_has_wildcard(select: &Select) -> bool {
    let projects_star = select.projection.iter().any(|item| {
        matches!(
            item,
            SelectItem::Wildcard(_) | SelectItem::QualifiedWildcard(..)
        )
    });

    projects_star || select.from.iter().any(table_with_joins_has_wildcard)
}

fn table_with_joins_has_wildcard(twj: &TableWithJoins) -> bool {
    table_factor_has_wildcard(&twj.relation)
        || twj
            .joins
            .iter()
            .any(|join| table_factor_has_wildcard(&join.relation))
}

fn table_factor_has_wildcard(factor: &TableFactor) -> bool {
    match factor {
        TableFactor::Derived { subquery, .. } => query_has_wildcard(subquery),
        TableFactor::NestedJoin {
            table_with_joins, ..
        } => table_with_joins_has_wildcard(table_with_joins),
        _ => false,
    }
}
