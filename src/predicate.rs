//! WHERE clauses: parsing into a [WherePattern] and evaluation over a table.
//!
//! A pattern is a flat list of conditions joined left to right by `and`/`or`.
//! There is no operator precedence. SELECT and UPDATE fold the per-condition
//! results differently, see [Fold].

use std::cmp::Ordering;

use bitvec::prelude::*;

use crate::column::{Column, ColumnData};
use crate::error::{Error, Result};
use crate::table::Table;
use crate::tokenizer::Token;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Eq,
    Lt,
    Gt,
    Le,
    Ge,
}

impl ComparisonOp {
    pub fn from_token(token: &Token) -> Option<Self> {
        match token {
            Token::Equal => Some(Self::Eq),
            Token::Lower => Some(Self::Lt),
            Token::Greater => Some(Self::Gt),
            Token::LowerEqual => Some(Self::Le),
            Token::GreaterEqual => Some(Self::Ge),
            _ => None,
        }
    }

    /// Whether `cell <op> target` holds given `cell.cmp(target)`.
    pub fn holds(self, ordering: Ordering) -> bool {
        match self {
            Self::Eq => ordering == Ordering::Equal,
            Self::Lt => ordering == Ordering::Less,
            Self::Gt => ordering == Ordering::Greater,
            Self::Le => ordering != Ordering::Greater,
            Self::Ge => ordering != Ordering::Less,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

/// `column <op> literal`. The literal stays raw until bound to a table.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub column: String,
    pub op: ComparisonOp,
    pub literal: String,
}

/// Conditions plus the connectives between them:
/// `logical_ops[i]` joins `conditions[i]` and `conditions[i + 1]`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WherePattern {
    pub conditions: Vec<Condition>,
    pub logical_ops: Vec<LogicalOp>,
}

/// How per-condition results combine into a row verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fold {
    /// SELECT semantics. The verdict starts as condition 0. A failing
    /// condition after `and` makes it false and stops evaluation; a passing
    /// condition after `or` raises a flag that admits the row no matter what
    /// the `and` chain decided.
    OrFlag,
    /// UPDATE semantics: `pass = pass && c` or `pass = pass || c`, strictly
    /// left to right.
    Running,
}

impl WherePattern {
    /// Parses the tokens following `where`.
    ///
    /// Tokens come in `column op value` triples separated by `and` / `or`.
    ///
    /// # Example
    /// ```
    /// # use oxyrel::tokenizer::tokenize;
    /// # use oxyrel::predicate::{LogicalOp, WherePattern};
    /// let tokens = tokenize("id > 0 and id < 5").unwrap();
    /// let pattern = WherePattern::parse(&tokens).unwrap();
    /// assert_eq!(pattern.conditions.len(), 2);
    /// assert_eq!(pattern.logical_ops, vec![LogicalOp::And]);
    /// ```
    pub fn parse(tokens: &[Token]) -> Result<Self> {
        let mut pattern = WherePattern::default();
        let mut rest = tokens;

        loop {
            let (condition, tail) = parse_condition(rest)?;
            pattern.conditions.push(condition);
            rest = tail;

            match rest.split_first() {
                None => break,
                Some((token, tail)) => {
                    let op = if token.is_word("and") {
                        LogicalOp::And
                    } else if token.is_word("or") {
                        LogicalOp::Or
                    } else {
                        return Err(Error::parse(format!(
                            "expected 'and' or 'or' between conditions, found {token}"
                        )));
                    };
                    pattern.logical_ops.push(op);
                    rest = tail;
                }
            }
        }

        Ok(pattern)
    }

    /// Evaluates the pattern against every row of `table`.
    ///
    /// Bit `i` of the result is set when row `i` passes.
    ///
    /// # Errors
    /// Returns a schema error if a condition names an unknown column or its
    /// literal does not fit the column's type. Nothing is evaluated then.
    pub fn matching_rows(&self, table: &Table, fold: Fold) -> Result<BitVec> {
        let bound = self
            .conditions
            .iter()
            .map(|condition| BoundCondition::bind(condition, table))
            .collect::<Result<Vec<_>>>()?;

        let mut mask = bitvec![0; table.row_count];
        for row in 0..table.row_count {
            let passed = self.fold(fold, |i| bound[i].matches(row));
            mask.set(row, passed);
        }
        Ok(mask)
    }

    /// Folds condition results, evaluating each one lazily through `eval`.
    pub fn fold(&self, fold: Fold, mut eval: impl FnMut(usize) -> bool) -> bool {
        if self.conditions.is_empty() {
            return true;
        }
        let ops = self
            .logical_ops
            .iter()
            .take(self.conditions.len() - 1)
            .enumerate();

        match fold {
            Fold::OrFlag => {
                let mut and_state = eval(0);
                let mut or_flag = false;
                for (i, op) in ops {
                    let passed = eval(i + 1);
                    match op {
                        LogicalOp::And if !passed => {
                            and_state = false;
                            break;
                        }
                        LogicalOp::Or if passed => or_flag = true,
                        _ => {}
                    }
                }
                and_state || or_flag
            }
            Fold::Running => {
                let mut pass = eval(0);
                for (i, op) in ops {
                    pass = match op {
                        LogicalOp::And => pass && eval(i + 1),
                        LogicalOp::Or => pass || eval(i + 1),
                    };
                }
                pass
            }
        }
    }
}

fn parse_condition(tokens: &[Token]) -> Result<(Condition, &[Token])> {
    let [column, op, literal, rest @ ..] = tokens else {
        return Err(Error::parse(
            "incomplete condition, expected '<column> <operator> <value>'",
        ));
    };
    let column = match column {
        Token::Word(w) if w != "and" && w != "or" => w.clone(),
        other => {
            return Err(Error::parse(format!(
                "expected a column name in condition, found {other}"
            )));
        }
    };
    let op = ComparisonOp::from_token(op)
        .ok_or_else(|| Error::parse(format!("{op} is not a comparison operator")))?;
    let literal = literal
        .text()
        .ok_or_else(|| Error::parse(format!("expected a value in condition, found {literal}")))?
        .to_string();

    Ok((
        Condition {
            column,
            op,
            literal,
        },
        rest,
    ))
}

/// A condition resolved against a table: the column is found and the
/// literal coerced to its type.
struct BoundCondition<'t> {
    column: &'t Column,
    op: ComparisonOp,
    target: Value,
}

impl<'t> BoundCondition<'t> {
    fn bind(condition: &Condition, table: &'t Table) -> Result<Self> {
        let column = table.column(&condition.column)?;
        let target = column.data_type.coerce(&condition.literal)?;
        Ok(Self {
            column,
            op: condition.op,
            target,
        })
    }

    fn matches(&self, row: usize) -> bool {
        let ordering = match (&self.column.data, &self.target) {
            (ColumnData::Int(cells), Value::Int(t)) => cells.get(row).map(|c| c.cmp(t)),
            (ColumnData::Float(cells), Value::Float(t)) => {
                cells.get(row).and_then(|c| c.partial_cmp(t))
            }
            (ColumnData::Text(cells), Value::Text(t)) => {
                cells.get(row).map(|c| c.as_str().cmp(t.as_str()))
            }
            _ => None,
        };
        ordering.is_some_and(|ordering| self.op.holds(ordering))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_type::DataType;
    use crate::table::ColumnDef;
    use crate::tokenizer::tokenize;

    fn pattern(input: &str) -> WherePattern {
        WherePattern::parse(&tokenize(input).unwrap()).unwrap()
    }

    fn scores() -> Table {
        let mut table = Table::new(
            "scores".into(),
            vec![
                ColumnDef {
                    name: "id".into(),
                    data_type: DataType::Int,
                },
                ColumnDef {
                    name: "name".into(),
                    data_type: DataType::Text,
                },
                ColumnDef {
                    name: "ratio".into(),
                    data_type: DataType::Float,
                },
            ],
            vec!["id".into()],
        );
        for (id, name, ratio) in [(1, "alice", 0.5), (3, "bob", 1.5), (7, "carol", 2.5)] {
            table
                .insert(vec![
                    Value::Int(id),
                    Value::Text(name.into()),
                    Value::Float(ratio),
                ])
                .unwrap();
        }
        table
    }

    fn rows(mask: &BitVec) -> Vec<usize> {
        mask.iter_ones().collect()
    }

    #[test]
    fn test_parse_triples_and_connectives() {
        let p = pattern("id >= 1 or name = bob and ratio < 2");

        assert_eq!(p.conditions.len(), 3);
        assert_eq!(p.conditions[0].op, ComparisonOp::Ge);
        assert_eq!(p.conditions[1].literal, "bob");
        assert_eq!(p.logical_ops, vec![LogicalOp::Or, LogicalOp::And]);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for input in ["id >", "id > 1 and", "id > 1 id < 3", "id ! 3", "and > 1"] {
            let result = WherePattern::parse(&tokenize(input).unwrap());
            assert!(
                matches!(result, Err(Error::Parse(_))),
                "{input} should not parse"
            );
        }
    }

    #[test]
    fn test_and_range() {
        let mask = pattern("id > 0 and id < 5")
            .matching_rows(&scores(), Fold::OrFlag)
            .unwrap();
        assert_eq!(rows(&mask), vec![0, 1]);
    }

    #[test]
    fn test_text_compares_lexicographically() {
        let mask = pattern("name >= bob")
            .matching_rows(&scores(), Fold::OrFlag)
            .unwrap();
        assert_eq!(rows(&mask), vec![1, 2]);
    }

    #[test]
    fn test_float_cells_are_compared() {
        let mask = pattern("ratio > 1")
            .matching_rows(&scores(), Fold::Running)
            .unwrap();
        assert_eq!(rows(&mask), vec![1, 2]);
    }

    #[test]
    fn test_unknown_column_and_bad_literal() {
        let table = scores();
        assert!(matches!(
            pattern("age > 1").matching_rows(&table, Fold::OrFlag),
            Err(Error::Schema(_))
        ));
        assert!(matches!(
            pattern("id = alice").matching_rows(&table, Fold::OrFlag),
            Err(Error::Schema(_))
        ));
    }

    #[test]
    fn test_or_flag_fold_keeps_row_after_failed_and() {
        // false or true and false: the or-flag admits the row even though the
        // and-chain failed afterwards
        let p = pattern("a = 1 or b = 1 and c = 1");
        let results = [false, true, false];
        assert!(p.fold(Fold::OrFlag, |i| results[i]));
        assert!(!p.fold(Fold::Running, |i| results[i]));
    }

    #[test]
    fn test_or_flag_fold_and_failure_stops_evaluation() {
        // true and false or true: the and-failure stops before the or is seen
        let p = pattern("a = 1 and b = 1 or c = 1");
        let results = [true, false, true];
        let mut evaluated = Vec::new();
        let verdict = p.fold(Fold::OrFlag, |i| {
            evaluated.push(i);
            results[i]
        });
        assert!(!verdict);
        assert_eq!(evaluated, vec![0, 1]);
        assert!(p.fold(Fold::Running, |i| results[i]));
    }

    #[test]
    fn test_folds_agree_on_simple_or() {
        let p = pattern("a = 1 or b = 1");
        for results in [[false, false], [false, true], [true, false], [true, true]] {
            assert_eq!(
                p.fold(Fold::OrFlag, |i| results[i]),
                p.fold(Fold::Running, |i| results[i]),
            );
        }
    }

    #[test]
    fn test_comparison_ops() {
        assert!(ComparisonOp::Le.holds(Ordering::Equal));
        assert!(ComparisonOp::Le.holds(Ordering::Less));
        assert!(!ComparisonOp::Le.holds(Ordering::Greater));
        assert!(ComparisonOp::Ge.holds(Ordering::Greater));
        assert!(!ComparisonOp::Gt.holds(Ordering::Equal));
        assert_eq!(ComparisonOp::from_token(&Token::Star), None);
    }
}
