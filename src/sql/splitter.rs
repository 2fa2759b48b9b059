//! Statement normalization: comment stripping and statement splitting.
//!
//! Uses the sqlparser tokenizer so that semicolons inside string literals,
//! quoted identifiers and comments never split a statement. Statement text
//! is sliced from the input by token location, so literals and
//! escapes are preserved exactly as written.

use sqlparser::tokenizer::{Token, Tokenizer, Whitespace};
use std::borrow::Cow;

use crate::error::{EngineError, Result};

use super::OdpsDialect;

/// Splits raw SQL into trimmed, non-empty statements with comments removed.
///
/// Each statement has its trailing `;` stripped. Returns an empty vector
/// when the input holds only whitespace, comments or bare semicolons.
pub fn split_statements(sql: &str) -> Result<Vec<String>> {
    let mut pieces = Vec::new();
    let mut current = String::new();

    for (token, text) in tokenize(sql)? {
        match token {
            Token::SemiColon => pieces.push(std::mem::take(&mut current)),
            Token::Whitespace(ws) => push_whitespace(&mut current, &ws, text),
            _ => current.push_str(text),
        }
    }
    pieces.push(current);

    Ok(pieces
        .iter()
        .filter_map(|piece| normalize_statement(piece))
        .collect())
}

/// Removes comments from SQL, keeping everything else verbatim.
pub fn strip_comments(sql: &str) -> Result<String> {
    let mut out = String::with_capacity(sql.len());

    for (token, text) in tokenize(sql)? {
        match token {
            Token::Whitespace(ws) => push_whitespace(&mut out, &ws, text),
            _ => out.push_str(text),
        }
    }

    Ok(out.trim().to_string())
}

/// Trims a statement and strips one trailing semicolon.
fn normalize_statement(piece: &str) -> Option<String> {
    let trimmed = piece.trim();
    let trimmed = trimmed.strip_suffix(';').unwrap_or(trimmed).trim_end();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Comments collapse to a separator so adjacent tokens stay apart.
fn push_whitespace(out: &mut String, ws: &Whitespace, text: &str) {
    match ws {
        Whitespace::SingleLineComment { .. } => out.push('\n'),
        Whitespace::MultiLineComment(_) => out.push(' '),
        _ => out.push_str(text),
    }
}

/// Tokenizes SQL and pairs every token with its source text.
fn tokenize(sql: &str) -> Result<Vec<(Token, &str)>> {
    let dialect = OdpsDialect;
    let unnested = unnest_block_comments(sql);
    let tokens = Tokenizer::new(&dialect, &unnested)
        .tokenize_with_location()
        .map_err(|e| EngineError::parse(e.to_string()))?;

    let index = LineIndex::new(sql);
    let starts: Vec<usize> = tokens
        .iter()
        .map(|t| index.offset(t.location.line, t.location.column))
        .collect();

    let mut out = Vec::with_capacity(tokens.len());
    for (i, t) in tokens.into_iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(sql.len());
        let start = starts[i].min(end);
        out.push((t.token, &sql[start..end]));
    }

    Ok(out)
}

/// Lexical context while scanning for block comments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scan {
    Code,
    Quoted(u8),
    LineComment,
    BlockComment,
}

/// Blanks the `/` of every `/*` that appears inside a block comment.
///
/// The tokenizer nests block comments but ODPS ends a comment at the first
/// `*/`. Only ASCII bytes are replaced, so offsets into the result are
/// offsets into `sql`.
fn unnest_block_comments(sql: &str) -> Cow<'_, str> {
    let bytes = sql.as_bytes();
    let mut masked = Vec::new();
    let mut state = Scan::Code;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        let next = bytes.get(i + 1).copied();
        match state {
            Scan::Code => match (b, next) {
                (b'\'' | b'"' | b'`', _) => state = Scan::Quoted(b),
                (b'-', Some(b'-')) => {
                    state = Scan::LineComment;
                    i += 1;
                }
                (b'/', Some(b'*')) => {
                    state = Scan::BlockComment;
                    i += 1;
                }
                _ => {}
            },
            Scan::Quoted(quote) => {
                if b == b'\\' && quote != b'`' {
                    i += 1;
                } else if b == quote {
                    state = Scan::Code;
                }
            }
            Scan::LineComment => {
                if b == b'\n' {
                    state = Scan::Code;
                }
            }
            Scan::BlockComment => match (b, next) {
                (b'*', Some(b'/')) => {
                    state = Scan::Code;
                    i += 1;
                }
                (b'/', Some(b'*')) => masked.push(i),
                _ => {}
            },
        }
        i += 1;
    }

    if masked.is_empty() {
        return Cow::Borrowed(sql);
    }

    let mut out = String::with_capacity(sql.len());
    let mut last = 0;
    for pos in masked {
        out.push_str(&sql[last..pos]);
        out.push(' ');
        last = pos + 1;
    }
    out.push_str(&sql[last..]);
    Cow::Owned(out)
}

/// Maps the tokenizer's 1-based (line, column) positions to byte offsets.
///
/// Columns count characters, not bytes.
struct LineIndex<'a> {
    sql: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    fn new(sql: &'a str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(sql.match_indices('\n').map(|(i, _)| i + 1));
        Self { sql, line_starts }
    }

    fn offset(&self, line: u64, column: u64) -> usize {
        let Some(&start) = self.line_starts.get(line.saturating_sub(1) as usize) else {
            return self.sql.len();
        };
        self.sql[start..]
            .char_indices()
            .nth(column.saturating_sub(1) as usize)
            .map(|(i, _)| start + i)
            .unwrap_or(self.sql.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn split(sql: &str) -> Vec<String> {
        split_statements(sql).unwrap()
    }

    #[test]
    fn test_single_statement() {
        assert_eq!(split("select 1"), vec!["select 1"]);
    }

    #[test]
    fn test_trailing_semicolon_stripped() {
        assert_eq!(split("select 1;"), vec!["select 1"]);
    }

    #[test]
    fn test_multiple_statements_in_order() {
        assert_eq!(
            split("create table t (id bigint);\ninsert into t values (1);\nselect * from t;"),
            vec![
                "create table t (id bigint)",
                "insert into t values (1)",
                "select * from t",
            ]
        );
    }

    #[test]
    fn test_semicolon_inside_string_does_not_split() {
        assert_eq!(
            split("select ';' as sep, 'a;b' from t; select 2"),
            vec!["select ';' as sep, 'a;b' from t", "select 2"]
        );
    }

    #[test]
    fn test_semicolon_inside_quoted_identifier_does_not_split() {
        assert_eq!(
            split("select `odd;name` from t; select 2"),
            vec!["select `odd;name` from t", "select 2"]
        );
    }

    #[test]
    fn test_semicolon_inside_double_quoted_string_does_not_split() {
        assert_eq!(
            split(r#"select "x;y" from t; select "a\";b" from t"#),
            vec![r#"select "x;y" from t"#, r#"select "a\";b" from t"#]
        );
    }

    #[test]
    fn test_escaped_double_quote_keeps_insert_whole() {
        let sql = r#"insert into t values ("say \"hi; drop table t; select \" now")"#;
        assert_eq!(split(sql), vec![sql]);
    }

    #[test]
    fn test_escaped_quotes_preserved_verbatim() {
        assert_eq!(
            split("select 'it''s;' from t; select 'a\\'b;' from t"),
            vec!["select 'it''s;' from t", "select 'a\\'b;' from t"]
        );
    }

    #[test]
    fn test_comments_removed() {
        let sql = "-- leading comment; with semicolon\n\
                   select 1; /* block ; comment */ select 2 -- trailing\n;";
        assert_eq!(split(sql), vec!["select 1", "select 2"]);
    }

    #[test]
    fn test_block_comments_do_not_nest() {
        assert_eq!(
            split("/* copied from /* old job */\nselect 1;\nselect 2;"),
            vec!["select 1", "select 2"]
        );
        assert_eq!(split("/* a /*/ select 1"), vec!["select 1"]);
        assert_eq!(
            split("select 1 /* x /* y /* z */; select 2"),
            vec!["select 1", "select 2"]
        );
    }

    #[test]
    fn test_comment_markers_in_literals_are_not_comments() {
        assert_eq!(
            split("select '/*' from t; select `a/*b` from u; -- /* note\nselect 3"),
            vec!["select '/*' from t", "select `a/*b` from u", "select 3"]
        );
    }

    #[test]
    fn test_unnest_keeps_byte_offsets() {
        let sql = "/* 中 /* x */ select 1";
        let unnested = unnest_block_comments(sql);
        assert_eq!(unnested.len(), sql.len());
        assert_eq!(unnested, "/* 中  * x */ select 1");
        assert!(matches!(unnest_block_comments("select 1"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_unterminated_block_comment_is_parse_error() {
        let err = split_statements("select 1; /* never closed").unwrap_err();
        assert_eq!(err.category(), "Parse Error");
    }

    #[test]
    fn test_comment_between_tokens_keeps_separation() {
        assert_eq!(split("select 1--note\nfrom t"), vec!["select 1\nfrom t"]);
        assert_eq!(split("select/*x*/1"), vec!["select 1"]);
    }

    #[test]
    fn test_empty_pieces_dropped() {
        assert_eq!(split(";;select 1;;  ;select 2;;"), vec!["select 1", "select 2"]);
    }

    #[test]
    fn test_empty_and_comment_only_input() {
        assert!(split("").is_empty());
        assert!(split("   \n\t ").is_empty());
        assert!(split("-- nothing here\n/* or here */").is_empty());
        assert!(split(";;;").is_empty());
    }

    #[test]
    fn test_multibyte_text_sliced_on_char_boundaries() {
        assert_eq!(
            split("select '中文;值' as 名字 from t;\nselect 2"),
            vec!["select '中文;值' as 名字 from t", "select 2"]
        );
    }

    #[test]
    fn test_unterminated_string_is_parse_error() {
        let err = split_statements("select 'oops from t").unwrap_err();
        assert_eq!(err.category(), "Parse Error");
    }

    #[test]
    fn test_strip_comments() {
        assert_eq!(
            strip_comments("/* header */ select 1; -- tail").unwrap(),
            "select 1;"
        );
    }

    #[test]
    fn test_line_index_offsets() {
        let sql = "ab\n中c";
        let index = LineIndex::new(sql);
        assert_eq!(index.offset(1, 1), 0);
        assert_eq!(index.offset(1, 2), 1);
        assert_eq!(index.offset(2, 1), 3);
        assert_eq!(index.offset(2, 2), 6);
        assert_eq!(index.offset(9, 1), sql.len());
    }
}
