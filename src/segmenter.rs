//! Cuts a flat token stream into statements.
//!
//! Statements may follow each other with no delimiter at all, e.g.
//! `create a ( x int primary key ( x ) ) create b ( y int primary key ( y ) )`.
//! Each statement kind knows where it ends: CREATE at the `)` closing its
//! column group, INSERT after its second parenthesized group, DROP/LOAD/SAVE/EXIT
//! after a fixed number of tokens, and ALTER/SELECT/UPDATE at the next token
//! that starts a statement.

use std::fmt;

use crate::error::{Error, Result};
use crate::tokenizer::Token;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Create,
    Insert,
    Select,
    Update,
    Alter,
    Drop,
    Load,
    Save,
    Exit,
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Create => "create",
            Self::Insert => "insert",
            Self::Select => "select",
            Self::Update => "update",
            Self::Alter => "alter",
            Self::Drop => "drop",
            Self::Load => "load",
            Self::Save => "save",
            Self::Exit => "exit",
        })
    }
}

/// One statement's tokens, leading keyword included.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment<'a> {
    pub kind: StatementKind,
    pub tokens: &'a [Token],
}

/// Returns the kind of statement starting at `idx`, if any.
///
/// `drop` only starts a statement when followed by `table`, so that
/// `alter table t drop col` stays a single statement.
pub fn statement_kind_at(tokens: &[Token], idx: usize) -> Option<StatementKind> {
    let Some(Token::Word(word)) = tokens.get(idx) else {
        return None;
    };
    match word.as_str() {
        "create" => Some(StatementKind::Create),
        "insert" => Some(StatementKind::Insert),
        "select" => Some(StatementKind::Select),
        "update" => Some(StatementKind::Update),
        "alter" => Some(StatementKind::Alter),
        "load" => Some(StatementKind::Load),
        "save" => Some(StatementKind::Save),
        "exit" => Some(StatementKind::Exit),
        "drop" if tokens.get(idx + 1).is_some_and(|t| t.is_word("table")) => {
            Some(StatementKind::Drop)
        }
        _ => None,
    }
}

/// Iterator over the statements of a token stream.
///
/// Yields `Err` once on malformed input and then stops: tokens after the
/// error cannot be attributed to a statement reliably.
pub struct Segmenter<'a> {
    tokens: &'a [Token],
    position: usize,
}

impl<'a> Segmenter<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        Self {
            tokens,
            position: 0,
        }
    }

    fn next_segment(&mut self) -> Result<Segment<'a>> {
        let start = self.position;
        let kind = match statement_kind_at(self.tokens, start) {
            Some(kind) => kind,
            None => {
                return Err(Error::parse(format!(
                    "{} cannot start a statement",
                    self.tokens[start]
                )));
            }
        };

        let end = match kind {
            StatementKind::Create => self.group_end(start + 1, kind)?,
            StatementKind::Insert => {
                let columns_end = self.group_end(start + 1, kind)?;
                self.group_end(columns_end, kind)?
            }
            StatementKind::Alter | StatementKind::Select | StatementKind::Update => {
                self.next_statement_start(start + 1)
            }
            StatementKind::Drop => self.fixed_end(start, 3, kind)?,
            StatementKind::Load | StatementKind::Save => self.fixed_end(start, 2, kind)?,
            StatementKind::Exit => start + 1,
        };

        let tokens = self
            .tokens
            .get(start..end)
            .ok_or_else(|| Error::parse(format!("{kind} statement runs past end of input")))?;
        self.position = end;
        Ok(Segment { kind, tokens })
    }

    /// Finds the first `(` at or after `from` and returns the index just past
    /// its matching `)`. Nested groups are skipped whole.
    fn group_end(&self, from: usize, kind: StatementKind) -> Result<usize> {
        let mut idx = from;
        loop {
            match self.tokens.get(idx) {
                Some(Token::LeftParen) => break,
                Some(_) if statement_kind_at(self.tokens, idx).is_some() => {
                    return Err(Error::parse(format!(
                        "{kind} statement is missing a parenthesized group before {}",
                        self.tokens[idx]
                    )));
                }
                Some(_) => idx += 1,
                None => {
                    return Err(Error::parse(format!(
                        "{kind} statement is missing a parenthesized group"
                    )));
                }
            }
        }

        let mut depth = 0usize;
        while let Some(token) = self.tokens.get(idx) {
            match token {
                Token::LeftParen => depth += 1,
                Token::RightParen => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(idx + 1);
                    }
                }
                _ => {}
            }
            idx += 1;
        }
        Err(Error::parse(format!(
            "unbalanced parentheses in {kind} statement"
        )))
    }

    fn next_statement_start(&self, from: usize) -> usize {
        (from..self.tokens.len())
            .find(|&idx| statement_kind_at(self.tokens, idx).is_some())
            .unwrap_or(self.tokens.len())
    }

    fn fixed_end(&self, start: usize, len: usize, kind: StatementKind) -> Result<usize> {
        let end = start + len;
        if end > self.tokens.len() {
            return Err(Error::parse(format!(
                "{kind} statement expects {len} tokens"
            )));
        }
        Ok(end)
    }
}

impl<'a> Iterator for Segmenter<'a> {
    type Item = Result<Segment<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.position >= self.tokens.len() {
            return None;
        }
        let segment = self.next_segment();
        if segment.is_err() {
            self.position = self.tokens.len();
        }
        Some(segment)
    }
}

/// Splits `tokens` into statements, stopping at the first malformed one.
pub fn segment(tokens: &[Token]) -> Segmenter<'_> {
    Segmenter::new(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::tokenize;

    fn kinds_and_lens(input: &str) -> Vec<(StatementKind, usize)> {
        let tokens = tokenize(input).unwrap();
        segment(&tokens)
            .map(|s| s.map(|s| (s.kind, s.tokens.len())))
            .collect::<Result<_>>()
            .unwrap()
    }

    #[test]
    fn test_single_create() {
        let segments = kinds_and_lens("create person ( id int name string )");
        assert_eq!(segments, vec![(StatementKind::Create, 8)]);
    }

    #[test]
    fn test_create_skips_primary_key_group() {
        let segments =
            kinds_and_lens("create person ( id int primary key ( id ) name string )");
        assert_eq!(segments, vec![(StatementKind::Create, 13)]);
    }

    #[test]
    fn test_concatenated_creates() {
        let tokens = tokenize(
            "create a ( x int primary key ( x ) ) create b ( y string primary key ( y ) )",
        )
        .unwrap();
        let segments: Vec<_> = segment(&tokens).collect::<Result<_>>().unwrap();

        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].tokens[1], Token::Word("a".into()));
        assert_eq!(segments[1].tokens[1], Token::Word("b".into()));
        assert!(segments[1].tokens[0].is_word("create"));
    }

    #[test]
    fn test_concatenated_inserts() {
        let segments = kinds_and_lens(
            "insert into t ( a b ) values ( 1 2 ) insert into t ( a b ) values ( 3 4 )",
        );
        assert_eq!(
            segments,
            vec![(StatementKind::Insert, 11), (StatementKind::Insert, 11)]
        );
    }

    #[test]
    fn test_insert_values_may_look_like_keywords() {
        let segments =
            kinds_and_lens("insert into t ( a b ) values ( create select ) select * from t");
        assert_eq!(
            segments,
            vec![(StatementKind::Insert, 11), (StatementKind::Select, 4)]
        );
    }

    #[test]
    fn test_where_keyword_literal_must_be_quoted() {
        // a bare statement keyword always starts a new statement
        let segments = kinds_and_lens("select * from t where name = exit");
        assert_eq!(
            segments,
            vec![(StatementKind::Select, 7), (StatementKind::Exit, 1)]
        );

        let segments = kinds_and_lens("select * from t where name = 'exit'");
        assert_eq!(segments, vec![(StatementKind::Select, 8)]);
    }

    #[test]
    fn test_alter_ends_at_next_alter() {
        let segments = kinds_and_lens(
            "alter table t add c int alter table t drop c alter table t foreign key ( a ) references u ( b )",
        );
        assert_eq!(
            segments,
            vec![
                (StatementKind::Alter, 5),
                (StatementKind::Alter, 5),
                (StatementKind::Alter, 13),
            ]
        );
    }

    #[test]
    fn test_drop_table_ends_alter_but_drop_column_does_not() {
        let segments = kinds_and_lens("alter table t drop c drop table t");
        assert_eq!(
            segments,
            vec![(StatementKind::Alter, 5), (StatementKind::Drop, 3)]
        );
    }

    #[test]
    fn test_mixed_kinds() {
        let segments = kinds_and_lens(
            "create t ( a int primary key ( a ) ) insert into t ( a ) values ( 1 ) select * from t where a = 1 exit",
        );
        assert_eq!(
            segments,
            vec![
                (StatementKind::Create, 10),
                (StatementKind::Insert, 10),
                (StatementKind::Select, 8),
                (StatementKind::Exit, 1),
            ]
        );
    }

    #[test]
    fn test_unbalanced_create_is_parse_error() {
        let tokens = tokenize("create t ( a int primary key ( a )").unwrap();
        let results: Vec<_> = segment(&tokens).collect();

        assert_eq!(results.len(), 1);
        assert!(matches!(results[0], Err(Error::Parse(_))));
    }

    #[test]
    fn test_insert_missing_values_group() {
        let tokens = tokenize("insert into t ( a ) values").unwrap();
        let results: Vec<_> = segment(&tokens).collect();

        assert!(matches!(results.as_slice(), [Err(Error::Parse(_))]));
    }

    #[test]
    fn test_create_without_group_does_not_swallow_next_statement() {
        let tokens = tokenize("create t select * from t").unwrap();
        let results: Vec<_> = segment(&tokens).collect();

        assert!(matches!(results.as_slice(), [Err(Error::Parse(_))]));
    }

    #[test]
    fn test_statements_before_error_are_kept() {
        let tokens = tokenize("exit bogus exit").unwrap();
        let results: Vec<_> = segment(&tokens).collect();

        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
    }

    #[test]
    fn test_truncated_fixed_statements() {
        for input in ["drop table", "load", "save"] {
            let tokens = tokenize(input).unwrap();
            let results: Vec<_> = segment(&tokens).collect();
            assert!(
                matches!(results.as_slice(), [Err(Error::Parse(_))]),
                "{input} should not segment"
            );
        }
    }

    #[test]
    fn test_empty_input() {
        assert!(segment(&[]).next().is_none());
    }
}
