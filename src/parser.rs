use std::path::PathBuf;

use crate::constraints::ForeignKey;
use crate::error::{Error, Result};
use crate::predicate::WherePattern;
use crate::segmenter::{Segment, StatementKind};
use crate::tokenizer::Token;
use crate::{ColumnDef, DataType, ast::*};

/// Turns one segmented statement into a [Statement].
///
/// Every access goes through [Parser::peek] / [Parser::next_token], which
/// report running off the end of the statement as a parse error.
pub struct Parser<'a> {
    tokens: &'a [Token],
    position: usize,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        Self {
            tokens,
            position: 0,
        }
    }

    pub fn parse(&mut self, kind: StatementKind) -> Result<Statement> {
        let statement = match kind {
            StatementKind::Create => self.parse_create_table(),
            StatementKind::Insert => self.parse_insert(),
            StatementKind::Select => self.parse_select(),
            StatementKind::Update => self.parse_update(),
            StatementKind::Alter => self.parse_alter(),
            StatementKind::Drop => self.parse_drop(),
            StatementKind::Load => {
                self.consume_word("load")?;
                Ok(Statement::Load(self.consume_path()?))
            }
            StatementKind::Save => {
                self.consume_word("save")?;
                Ok(Statement::Save(self.consume_path()?))
            }
            StatementKind::Exit => {
                self.consume_word("exit")?;
                Ok(Statement::Exit)
            }
        }?;

        // Check we are at the end of the statement
        if let Some(token) = self.peek() {
            return Err(Error::parse(format!(
                "unexpected {token} after {kind} statement"
            )));
        }

        Ok(statement)
    }

    //helpers
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.position)
    }

    fn peek_is_word(&self, word: &str) -> bool {
        self.peek().is_some_and(|t| t.is_word(word))
    }

    fn next_token(&mut self) -> Result<&'a Token> {
        let token = self
            .tokens
            .get(self.position)
            .ok_or_else(|| Error::parse("unexpected end of statement"))?;
        self.position += 1;
        Ok(token)
    }

    fn rest(&mut self) -> &'a [Token] {
        let rest = self.tokens.get(self.position..).unwrap_or_default();
        self.position = self.tokens.len();
        rest
    }

    fn consume(&mut self, expected: Token) -> Result<()> {
        let found = self.next_token()?;
        if *found == expected {
            Ok(())
        } else {
            Err(Error::parse(format!("expected {expected}, found {found}")))
        }
    }

    fn consume_word(&mut self, expected: &str) -> Result<()> {
        let found = self.next_token()?;
        if found.is_word(expected) {
            Ok(())
        } else {
            Err(Error::parse(format!("expected {expected:?}, found {found}")))
        }
    }

    fn consume_ident(&mut self) -> Result<String> {
        match self.next_token()? {
            Token::Word(word) => Ok(word.clone()),
            other => Err(Error::parse(format!(
                "expected identifier, found {other}"
            ))),
        }
    }

    fn consume_literal(&mut self) -> Result<String> {
        let token = self.next_token()?;
        token
            .text()
            .map(str::to_string)
            .ok_or_else(|| Error::parse(format!("expected a value, found {token}")))
    }

    fn consume_path(&mut self) -> Result<PathBuf> {
        self.consume_literal().map(PathBuf::from)
    }

    fn consume_data_type(&mut self) -> Result<DataType> {
        DataType::from_word(&self.consume_ident()?)
    }

    /// `( a b c )`, at least one identifier.
    fn parse_ident_group(&mut self) -> Result<Vec<String>> {
        self.consume(Token::LeftParen)?;
        let mut idents = vec![];
        while self.peek() != Some(&Token::RightParen) {
            idents.push(self.consume_ident()?);
        }
        self.consume(Token::RightParen)?;
        if idents.is_empty() {
            return Err(Error::parse("empty column list"));
        }
        Ok(idents)
    }

    fn parse_where(&mut self) -> Result<Option<WherePattern>> {
        if !self.peek_is_word("where") {
            return Ok(None);
        }
        self.position += 1;
        WherePattern::parse(self.rest()).map(Some)
    }

    fn parse_create_table(&mut self) -> Result<Statement> {
        self.consume_word("create")?;
        // `create table <name> (` and `create <name> (` are both accepted
        if self.peek_is_word("table") && self.tokens.get(self.position + 1) != Some(&Token::LeftParen)
        {
            self.position += 1;
        }
        let name = self.consume_ident()?;
        self.consume(Token::LeftParen)?;

        let mut columns: Vec<ColumnDef> = vec![];
        let mut primary_key: Vec<String> = vec![];
        loop {
            match self.peek() {
                Some(Token::RightParen) => {
                    self.position += 1;
                    break;
                }
                Some(token) if token.is_word("primary") => {
                    self.position += 1;
                    self.consume_word("key")?;
                    let named = if self.peek() == Some(&Token::LeftParen) {
                        self.parse_ident_group()?
                    } else {
                        // bare `<col> <type> primary key`
                        let last = columns.last().ok_or_else(|| {
                            Error::parse("'primary key' must follow a column definition")
                        })?;
                        vec![last.name.clone()]
                    };
                    for column in named {
                        if !primary_key.contains(&column) {
                            primary_key.push(column);
                        }
                    }
                }
                Some(_) => {
                    let name = self.consume_ident()?;
                    let data_type = self.consume_data_type()?;
                    columns.push(ColumnDef { name, data_type });
                }
                None => return Err(Error::parse("unterminated column definition list")),
            }
        }

        Ok(Statement::CreateTable(CreateTable {
            name,
            columns,
            primary_key,
        }))
    }

    fn parse_insert(&mut self) -> Result<Statement> {
        self.consume_word("insert")?;
        self.consume_word("into")?;
        let table = self.consume_ident()?;
        let columns = self.parse_ident_group()?;
        self.consume_word("values")?;

        self.consume(Token::LeftParen)?;
        let mut values = vec![];
        while self.peek() != Some(&Token::RightParen) {
            values.push(self.consume_literal()?);
        }
        self.consume(Token::RightParen)?;

        Ok(Statement::InsertInto(InsertInto {
            table,
            columns,
            values,
        }))
    }

    fn parse_select(&mut self) -> Result<Statement> {
        self.consume_word("select")?;

        let columns = if self.peek() == Some(&Token::Star) {
            self.position += 1;
            ColumnsSelect::Star
        } else {
            let mut names = vec![];
            while !self.peek_is_word("from") {
                names.push(self.consume_ident()?);
            }
            if names.is_empty() {
                return Err(Error::parse("select needs '*' or at least one column"));
            }
            ColumnsSelect::ColumnsNames(names)
        };

        self.consume_word("from")?;
        let table = self.consume_ident()?;
        let where_clause = self.parse_where()?;

        Ok(Statement::Select(Select {
            columns,
            table,
            where_clause,
        }))
    }

    fn parse_update(&mut self) -> Result<Statement> {
        self.consume_word("update")?;
        let table = self.consume_ident()?;
        self.consume_word("set")?;

        let mut assignments = vec![];
        while self.peek().is_some() && !self.peek_is_word("where") {
            let column = self.consume_ident()?;
            self.consume(Token::Equal)?;
            let value = self.consume_literal()?;
            assignments.push((column, value));
        }
        if assignments.is_empty() {
            return Err(Error::parse("update needs at least one '<column> = <value>'"));
        }
        let where_clause = self.parse_where()?;

        Ok(Statement::Update(Update {
            table,
            assignments,
            where_clause,
        }))
    }

    fn parse_alter(&mut self) -> Result<Statement> {
        self.consume_word("alter")?;
        self.consume_word("table")?;
        let table = self.consume_ident()?;

        let mut actions = vec![];
        while let Some(token) = self.peek() {
            let action = if token.is_word("add") {
                self.position += 1;
                let name = self.consume_ident()?;
                let data_type = self.consume_data_type()?;
                AlterAction::AddColumn(ColumnDef { name, data_type })
            } else if token.is_word("drop") {
                self.position += 1;
                AlterAction::DropColumn(self.consume_ident()?)
            } else if token.is_word("foreign") {
                self.position += 1;
                self.consume_word("key")?;
                let referencing_columns = self.parse_ident_group()?;
                self.consume_word("references")?;
                let referenced_table = self.consume_ident()?;
                let referenced_columns = self.parse_ident_group()?;
                AlterAction::AddForeignKey(ForeignKey {
                    referencing_table: table.clone(),
                    referencing_columns,
                    referenced_table,
                    referenced_columns,
                })
            } else {
                return Err(Error::parse(format!(
                    "expected 'add', 'drop' or 'foreign' in alter statement, found {token}"
                )));
            };
            actions.push(action);
        }
        if actions.is_empty() {
            return Err(Error::parse("alter table needs an 'add', 'drop' or 'foreign' clause"));
        }

        Ok(Statement::AlterTable(AlterTable { table, actions }))
    }

    fn parse_drop(&mut self) -> Result<Statement> {
        self.consume_word("drop")?;
        self.consume_word("table")?;
        Ok(Statement::DropTable(self.consume_ident()?))
    }
}

/// Parses one segment produced by the segmenter.
pub fn parse_segment(segment: &Segment<'_>) -> Result<Statement> {
    Parser::new(segment.tokens).parse(segment.kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::LogicalOp;
    use crate::segmenter::segment;
    use crate::tokenizer::tokenize;

    fn parse_one(input: &str) -> Result<Statement> {
        let tokens = tokenize(input).unwrap();
        let mut segments = segment(&tokens);
        let first = segments.next().expect("one statement")?;
        parse_segment(&first)
    }

    #[test]
    fn test_parse_create_table() {
        let statement =
            parse_one("create person ( id int primary key ( id ) name string )").unwrap();

        match statement {
            Statement::CreateTable(ct) => {
                assert_eq!(ct.name, "person");
                assert_eq!(ct.columns.len(), 2);
                assert_eq!(ct.columns[0].name, "id");
                assert_eq!(ct.columns[0].data_type, DataType::Int);
                assert_eq!(ct.columns[1].name, "name");
                assert_eq!(ct.columns[1].data_type, DataType::Text);
                assert_eq!(ct.primary_key, vec!["id".to_string()]);
            }
            _ => panic!("Expected CreateTable"),
        }
    }

    #[test]
    fn test_parse_create_bare_primary_key_and_table_keyword() {
        let statement =
            parse_one("CREATE TABLE item ( sku string primary key qty int price float )").unwrap();

        let Statement::CreateTable(ct) = statement else {
            panic!("Expected CreateTable");
        };
        assert_eq!(ct.name, "item");
        assert_eq!(ct.columns.len(), 3);
        assert_eq!(ct.columns[2].data_type, DataType::Float);
        assert_eq!(ct.primary_key, vec!["sku".to_string()]);
    }

    #[test]
    fn test_parse_create_composite_key() {
        let Statement::CreateTable(ct) =
            parse_one("create enrolment ( student int course int primary key ( student course ) )")
                .unwrap()
        else {
            panic!("Expected CreateTable");
        };
        assert_eq!(ct.primary_key, vec!["student".to_string(), "course".into()]);
    }

    #[test]
    fn test_parse_create_without_primary_key_still_parses() {
        let Statement::CreateTable(ct) = parse_one("create t ( a int )").unwrap() else {
            panic!("Expected CreateTable");
        };
        assert!(ct.primary_key.is_empty());
    }

    #[test]
    fn test_parse_create_unknown_type() {
        assert!(matches!(
            parse_one("create t ( a bool primary key ( a ) )"),
            Err(Error::Parse(_))
        ));
    }

    #[test]
    fn test_parse_insert() {
        let statement =
            parse_one("insert into person ( id, name ) values ( 1, 'Alice Smith' )").unwrap();

        assert_eq!(
            statement,
            Statement::InsertInto(InsertInto {
                table: "person".into(),
                columns: vec!["id".into(), "name".into()],
                values: vec!["1".into(), "Alice Smith".into()],
            })
        );
    }

    #[test]
    fn test_parse_select_star_and_columns() {
        let Statement::Select(select) = parse_one("select * from person").unwrap() else {
            panic!("Expected Select");
        };
        assert_eq!(select.columns, ColumnsSelect::Star);
        assert_eq!(select.where_clause, None);

        let Statement::Select(select) =
            parse_one("select id, name from person where id > 0 or name = bob").unwrap()
        else {
            panic!("Expected Select");
        };
        assert_eq!(
            select.columns,
            ColumnsSelect::ColumnsNames(vec!["id".into(), "name".into()])
        );
        let pattern = select.where_clause.unwrap();
        assert_eq!(pattern.logical_ops, vec![LogicalOp::Or]);
    }

    #[test]
    fn test_parse_select_errors() {
        assert!(parse_one("select from person").is_err());
        assert!(parse_one("select * person").is_err());
        assert!(parse_one("select * from").is_err());
        assert!(parse_one("select * from person extra").is_err());
    }

    #[test]
    fn test_parse_update() {
        let Statement::Update(update) =
            parse_one("update person set name = bob age=3 where id = 1").unwrap()
        else {
            panic!("Expected Update");
        };
        assert_eq!(update.table, "person");
        assert_eq!(
            update.assignments,
            vec![
                ("name".to_string(), "bob".to_string()),
                ("age".to_string(), "3".to_string())
            ]
        );
        assert_eq!(update.where_clause.unwrap().conditions.len(), 1);
    }

    #[test]
    fn test_parse_update_requires_assignment() {
        assert!(parse_one("update person set where id = 1").is_err());
        assert!(parse_one("update person set name bob").is_err());
    }

    #[test]
    fn test_parse_alter_actions() {
        let Statement::AlterTable(alter) = parse_one(
            "alter table orders add total float drop note foreign key ( pid ) references person ( id )",
        )
        .unwrap() else {
            panic!("Expected AlterTable");
        };
        assert_eq!(alter.table, "orders");
        assert_eq!(alter.actions.len(), 3);
        assert_eq!(
            alter.actions[0],
            AlterAction::AddColumn(ColumnDef {
                name: "total".into(),
                data_type: DataType::Float
            })
        );
        assert_eq!(alter.actions[1], AlterAction::DropColumn("note".into()));
        assert_eq!(
            alter.actions[2],
            AlterAction::AddForeignKey(ForeignKey {
                referencing_table: "orders".into(),
                referencing_columns: vec!["pid".into()],
                referenced_table: "person".into(),
                referenced_columns: vec!["id".into()],
            })
        );
    }

    #[test]
    fn test_parse_alter_errors() {
        assert!(parse_one("alter table orders").is_err());
        assert!(parse_one("alter table orders rename x").is_err());
        assert!(parse_one("alter table orders foreign key ( ) references p ( id )").is_err());
    }

    #[test]
    fn test_parse_drop_load_save_exit() {
        assert_eq!(
            parse_one("drop table person").unwrap(),
            Statement::DropTable("person".into())
        );
        assert_eq!(
            parse_one("load 'Scripts/Init.txt'").unwrap(),
            Statement::Load(PathBuf::from("Scripts/Init.txt"))
        );
        assert_eq!(
            parse_one("save out.txt").unwrap(),
            Statement::Save(PathBuf::from("out.txt"))
        );
        assert_eq!(parse_one("exit").unwrap(), Statement::Exit);
    }

    #[test]
    fn test_truncated_statement_is_parse_error() {
        let tokens = tokenize("insert into").unwrap();
        let result = Parser::new(&tokens).parse(StatementKind::Insert);
        assert!(matches!(result, Err(Error::Parse(_))));
    }
}
