//! ODPS SQL dialect for sqlparser.
//!
//! ODPS follows Hive conventions: backtick-quoted identifiers, and both
//! `'...'` and `"..."` are string literals with backslash escapes.

use sqlparser::dialect::Dialect;

#[derive(Debug, Default, Clone, Copy)]
pub struct OdpsDialect;

impl Dialect for OdpsDialect {
    fn is_identifier_start(&self, ch: char) -> bool {
        ch.is_alphabetic() || ch == '_'
    }

    fn is_identifier_part(&self, ch: char) -> bool {
        self.is_identifier_start(ch) || ch.is_ascii_digit() || ch == '$'
    }

    fn is_delimited_identifier_start(&self, ch: char) -> bool {
        ch == '`'
    }

    fn supports_string_literal_backslash_escape(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sqlparser::tokenizer::{Token, Tokenizer};

    fn tokens(sql: &str) -> Vec<Token> {
        Tokenizer::new(&OdpsDialect, sql)
            .tokenize()
            .unwrap()
            .into_iter()
            .filter(|t| !matches!(t, Token::Whitespace(_)))
            .collect()
    }

    #[test]
    fn test_double_quotes_are_string_literals() {
        assert_eq!(
            tokens(r#""a\";b""#),
            vec![Token::DoubleQuotedString("a\";b".to_string())]
        );
    }

    #[test]
    fn test_backticks_are_identifiers() {
        let toks = tokens("`odd;name`");
        assert_eq!(toks.len(), 1);
        assert!(matches!(
            &toks[0],
            Token::Word(w) if w.value == "odd;name" && w.quote_style == Some('`')
        ));
    }
}
