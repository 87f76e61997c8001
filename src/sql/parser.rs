//! SQL parser - recursive descent over the token stream
//!
//! One token of lookahead. Expression parsing climbs precedence:
//! OR (lowest) < AND < comparison < atom, with parentheses overriding.
//! DATE/TIME/EMAIL are soft keywords: followed by a string literal they
//! start a typed literal, anywhere else they act as column identifiers.

use super::ast::*;
use super::token::{Token, TokenKind};
use crate::error::{Error, Result};
use crate::types::{validate, Value};

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    /// Parse a single statement, dispatching on the first token.
    pub fn parse(&mut self) -> Result<Statement> {
        let stmt = match self.cur().kind.clone() {
            TokenKind::Select => Statement::Select(self.parse_select()?),
            TokenKind::Insert => Statement::Insert(self.parse_insert()?),
            TokenKind::Update => Statement::Update(self.parse_update()?),
            TokenKind::Delete => Statement::Delete(self.parse_delete()?),
            TokenKind::Create => self.parse_create()?,
            TokenKind::Drop => self.parse_drop()?,
            TokenKind::Alter => self.parse_alter()?,
            TokenKind::Use => self.parse_use()?,
            _ => {
                return Err(self.error(
                    "expected a statement (SELECT, INSERT, UPDATE, DELETE, CREATE, DROP, ALTER, USE)",
                ))
            }
        };

        if self.cur().kind == TokenKind::Semicolon {
            self.advance();
        }
        if self.cur().kind != TokenKind::End {
            return Err(self.error("unexpected input after statement"));
        }
        Ok(stmt)
    }

    fn cur(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek(&self) -> &Token {
        let idx = (self.pos + 1).min(self.tokens.len() - 1);
        &self.tokens[idx]
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
    }

    fn error(&self, message: impl Into<String>) -> Error {
        let token = self.cur();
        Error::Parse {
            message: message.into(),
            token: token.kind.to_string(),
            line: token.line,
            column: token.column,
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<()> {
        if self.cur().kind == kind {
            self.advance();
            Ok(())
        } else {
            Err(self.error(format!("expected {}", what)))
        }
    }

    /// A table or database name. Strictly an identifier; names fold to
    /// lower case so catalog lookups are case-insensitive.
    fn name(&mut self, what: &str) -> Result<String> {
        let name = match &self.cur().kind {
            TokenKind::Ident(s) => s.to_lowercase(),
            _ => return Err(self.error(format!("expected {}", what))),
        };
        self.advance();
        Ok(name)
    }

    /// A column name: an identifier or one of the soft keywords.
    fn column_name(&mut self) -> Result<String> {
        let name = match &self.cur().kind {
            TokenKind::Ident(s) => s.to_lowercase(),
            TokenKind::Date => "date".to_string(),
            TokenKind::Time => "time".to_string(),
            TokenKind::Email => "email".to_string(),
            _ => return Err(self.error("expected column name")),
        };
        self.advance();
        Ok(name)
    }

    /// `column` or `table.column`.
    fn qualified_column(&mut self) -> Result<ColumnRef> {
        let first = self.column_name()?;
        if self.cur().kind == TokenKind::Dot {
            self.advance();
            let column = self.column_name()?;
            Ok(ColumnRef {
                table: Some(first),
                column,
            })
        } else {
            Ok(ColumnRef {
                table: None,
                column: first,
            })
        }
    }

    // --- Statements ---

    fn parse_select(&mut self) -> Result<SelectStmt> {
        self.advance(); // SELECT

        let fields = if self.cur().kind == TokenKind::Star {
            self.advance();
            FieldList::Star
        } else {
            let mut cols = vec![self.qualified_column()?];
            while self.cur().kind == TokenKind::Comma {
                self.advance();
                cols.push(self.qualified_column()?);
            }
            FieldList::Columns(cols)
        };

        self.expect(TokenKind::From, "FROM")?;
        let table = self.name("table name")?;

        let mut joins = Vec::new();
        while self.at_join_clause() {
            joins.push(self.parse_join()?);
        }

        let where_clause = self.parse_optional_where()?;

        Ok(SelectStmt {
            fields,
            table,
            joins,
            where_clause,
        })
    }

    fn at_join_clause(&self) -> bool {
        matches!(
            self.cur().kind,
            TokenKind::Join
                | TokenKind::Inner
                | TokenKind::Left
                | TokenKind::Right
                | TokenKind::Full
        )
    }

    /// `[INNER | LEFT [OUTER] | RIGHT [OUTER] | FULL [OUTER]] JOIN <table> ON <expr>`
    fn parse_join(&mut self) -> Result<JoinClause> {
        let join_type = match self.cur().kind.clone() {
            TokenKind::Inner => {
                self.advance();
                JoinType::Inner
            }
            TokenKind::Left => {
                self.advance();
                JoinType::Left
            }
            TokenKind::Right => {
                self.advance();
                JoinType::Right
            }
            TokenKind::Full => {
                self.advance();
                JoinType::Full
            }
            // Bare JOIN means INNER.
            TokenKind::Join => JoinType::Inner,
            _ => return Err(self.error("expected JOIN clause")),
        };

        if self.cur().kind == TokenKind::Outer {
            self.advance();
        }

        self.expect(TokenKind::Join, "JOIN")?;
        let table = self.name("table name after JOIN")?;
        self.expect(TokenKind::On, "ON")?;
        let on = self.parse_expression()?;

        Ok(JoinClause {
            join_type,
            table,
            on,
        })
    }

    fn parse_insert(&mut self) -> Result<InsertStmt> {
        self.advance(); // INSERT
        self.expect(TokenKind::Into, "INTO")?;
        let table = self.name("table name")?;

        // The column list is required.
        self.expect(TokenKind::LParen, "( before column list")?;
        let mut columns = vec![self.column_name()?];
        while self.cur().kind == TokenKind::Comma {
            self.advance();
            columns.push(self.column_name()?);
        }
        self.expect(TokenKind::RParen, ") after column list")?;

        self.expect(TokenKind::Values, "VALUES")?;
        self.expect(TokenKind::LParen, "( before value list")?;
        let mut values = vec![self.parse_expression()?];
        while self.cur().kind == TokenKind::Comma {
            self.advance();
            values.push(self.parse_expression()?);
        }
        self.expect(TokenKind::RParen, ") after value list")?;

        Ok(InsertStmt {
            table,
            columns,
            values,
        })
    }

    fn parse_update(&mut self) -> Result<UpdateStmt> {
        self.advance(); // UPDATE
        let table = self.name("table name")?;
        self.expect(TokenKind::Set, "SET")?;

        let mut assignments = vec![self.parse_assignment()?];
        while self.cur().kind == TokenKind::Comma {
            self.advance();
            assignments.push(self.parse_assignment()?);
        }

        let where_clause = self.parse_optional_where()?;

        Ok(UpdateStmt {
            table,
            assignments,
            where_clause,
        })
    }

    /// `<column> = <literal>`
    fn parse_assignment(&mut self) -> Result<(String, Value)> {
        let column = self.column_name()?;
        self.expect(TokenKind::Eq, "= in assignment")?;
        match self.parse_atom()? {
            Expr::Literal(value) => Ok((column, value)),
            _ => Err(self.error("expected literal value in SET clause")),
        }
    }

    fn parse_delete(&mut self) -> Result<DeleteStmt> {
        self.advance(); // DELETE
        self.expect(TokenKind::From, "FROM")?;
        let table = self.name("table name")?;
        let where_clause = self.parse_optional_where()?;

        Ok(DeleteStmt {
            table,
            where_clause,
        })
    }

    fn parse_optional_where(&mut self) -> Result<Option<Expr>> {
        if self.cur().kind == TokenKind::Where {
            self.advance();
            Ok(Some(self.parse_expression()?))
        } else {
            Ok(None)
        }
    }

    fn parse_create(&mut self) -> Result<Statement> {
        self.advance(); // CREATE
        self.expect(TokenKind::Database, "DATABASE after CREATE")?;
        Ok(Statement::CreateDatabase(self.name("database name")?))
    }

    fn parse_drop(&mut self) -> Result<Statement> {
        self.advance(); // DROP
        self.expect(TokenKind::Database, "DATABASE after DROP")?;
        Ok(Statement::DropDatabase(self.name("database name")?))
    }

    fn parse_alter(&mut self) -> Result<Statement> {
        self.advance(); // ALTER
        self.expect(TokenKind::Database, "DATABASE after ALTER")?;
        let name = self.name("database name")?;
        self.expect(TokenKind::Rename, "RENAME")?;
        self.expect(TokenKind::To, "TO")?;
        let new_name = self.name("new database name")?;
        Ok(Statement::AlterDatabaseRename { name, new_name })
    }

    fn parse_use(&mut self) -> Result<Statement> {
        self.advance(); // USE
        Ok(Statement::UseDatabase(self.name("database name after USE")?))
    }

    // --- Expressions ---

    pub fn parse_expression(&mut self) -> Result<Expr> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut left = self.parse_and()?;
        while self.cur().kind == TokenKind::Or {
            self.advance();
            let right = self.parse_and()?;
            left = Expr::Logical {
                left: Box::new(left),
                op: LogicalOp::Or,
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut left = self.parse_comparison()?;
        while self.cur().kind == TokenKind::And {
            self.advance();
            let right = self.parse_comparison()?;
            left = Expr::Logical {
                left: Box::new(left),
                op: LogicalOp::And,
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Expr> {
        // Parentheses group a full sub-expression.
        if self.cur().kind == TokenKind::LParen {
            self.advance();
            let expr = self.parse_expression()?;
            self.expect(TokenKind::RParen, ")")?;
            return Ok(expr);
        }

        let left = self.parse_atom()?;

        let op = match self.cur().kind {
            TokenKind::Eq => CompareOp::Eq,
            TokenKind::Ne => CompareOp::Ne,
            TokenKind::Lt => CompareOp::Lt,
            TokenKind::Gt => CompareOp::Gt,
            TokenKind::Le => CompareOp::Le,
            TokenKind::Ge => CompareOp::Ge,
            _ => return Ok(left),
        };
        self.advance();
        let right = self.parse_atom()?;

        Ok(Expr::Comparison {
            left: Box::new(left),
            op,
            right: Box::new(right),
        })
    }

    fn parse_atom(&mut self) -> Result<Expr> {
        match self.cur().kind.clone() {
            TokenKind::Ident(_) => {
                let col = self.qualified_column()?;
                Ok(Expr::Ident {
                    table: col.table,
                    name: col.column,
                })
            }
            // DATE/TIME/EMAIL followed by a string is a typed literal,
            // otherwise a column name.
            TokenKind::Date | TokenKind::Time | TokenKind::Email => {
                if matches!(self.peek().kind, TokenKind::Str(_)) {
                    self.parse_typed_literal()
                } else {
                    let col = self.qualified_column()?;
                    Ok(Expr::Ident {
                        table: col.table,
                        name: col.column,
                    })
                }
            }
            TokenKind::Str(s) => {
                self.advance();
                Ok(Expr::Literal(Value::Text(s)))
            }
            TokenKind::Integer(i) => {
                self.advance();
                Ok(Expr::Literal(Value::Int(i)))
            }
            TokenKind::Decimal(d) => {
                self.advance();
                Ok(Expr::Literal(Value::Float(d)))
            }
            TokenKind::Minus => {
                self.advance();
                match self.cur().kind.clone() {
                    TokenKind::Integer(i) => {
                        self.advance();
                        Ok(Expr::Literal(Value::Int(-i)))
                    }
                    TokenKind::Decimal(d) => {
                        self.advance();
                        Ok(Expr::Literal(Value::Float(-d)))
                    }
                    _ => Err(self.error("expected numeric literal after '-'")),
                }
            }
            TokenKind::True => {
                self.advance();
                Ok(Expr::Literal(Value::Bool(true)))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::Literal(Value::Bool(false)))
            }
            _ => Err(self.error("unexpected token in expression")),
        }
    }

    /// `DATE '...'` / `TIME '...'` / `EMAIL '...'`. Only typed literals
    /// validate their payload at parse time.
    fn parse_typed_literal(&mut self) -> Result<Expr> {
        let keyword = self.cur().kind.clone();
        self.advance();

        let payload = match self.cur().kind.clone() {
            TokenKind::Str(s) => s,
            _ => return Err(self.error("expected string literal after type keyword")),
        };

        let checked = match keyword {
            TokenKind::Date => validate::validate_date(&payload).map(|_| Value::Date(payload)),
            TokenKind::Time => validate::validate_time(&payload).map(|_| Value::Time(payload)),
            TokenKind::Email => validate::validate_email(&payload).map(|_| Value::Email(payload)),
            _ => unreachable!("caller checked the keyword"),
        };

        match checked {
            Ok(value) => {
                self.advance();
                Ok(Expr::Literal(value))
            }
            Err(detail) => Err(self.error(format!("{} validation failed: {}", keyword, detail))),
        }
    }
}

/// Lex and parse one statement.
pub fn parse_sql(sql: &str) -> Result<Statement> {
    let tokens = super::lexer::Lexer::new(sql).tokenize()?;
    Parser::new(tokens).parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(sql: &str) -> Statement {
        parse_sql(sql).unwrap()
    }

    #[test]
    fn test_select_star() {
        let stmt = parse("SELECT * FROM users;");
        match stmt {
            Statement::Select(s) => {
                assert_eq!(s.fields, FieldList::Star);
                assert_eq!(s.table, "users");
                assert!(s.joins.is_empty());
                assert!(s.where_clause.is_none());
            }
            other => panic!("expected SELECT, got {:?}", other),
        }
    }

    #[test]
    fn test_select_field_list() {
        let stmt = parse("SELECT id, users.name FROM users");
        match stmt {
            Statement::Select(s) => {
                assert_eq!(
                    s.fields,
                    FieldList::Columns(vec![
                        ColumnRef::bare("id"),
                        ColumnRef::qualified("users", "name"),
                    ])
                );
            }
            other => panic!("expected SELECT, got {:?}", other),
        }
    }

    #[test]
    fn test_where_precedence() {
        // a = 1 OR b = 2 AND c = 3 parses as a = 1 OR (b = 2 AND c = 3)
        let stmt = parse("SELECT * FROM t WHERE a = 1 OR b = 2 AND c = 3");
        let Statement::Select(s) = stmt else { panic!() };
        match s.where_clause.unwrap() {
            Expr::Logical {
                op: LogicalOp::Or,
                right,
                ..
            } => {
                assert!(matches!(
                    *right,
                    Expr::Logical {
                        op: LogicalOp::And,
                        ..
                    }
                ));
            }
            other => panic!("expected OR at the top, got {:?}", other),
        }
    }

    #[test]
    fn test_parens_override_precedence() {
        let stmt = parse("SELECT * FROM t WHERE (a = 1 OR b = 2) AND c = 3");
        let Statement::Select(s) = stmt else { panic!() };
        match s.where_clause.unwrap() {
            Expr::Logical {
                op: LogicalOp::And,
                left,
                ..
            } => {
                assert!(matches!(
                    *left,
                    Expr::Logical {
                        op: LogicalOp::Or,
                        ..
                    }
                ));
            }
            other => panic!("expected AND at the top, got {:?}", other),
        }
    }

    #[test]
    fn test_bare_join_means_inner() {
        let stmt = parse("SELECT * FROM a JOIN b ON a.id = b.a_id");
        let Statement::Select(s) = stmt else { panic!() };
        assert_eq!(s.joins.len(), 1);
        assert_eq!(s.joins[0].join_type, JoinType::Inner);
        assert_eq!(s.joins[0].table, "b");
    }

    #[test]
    fn test_outer_keyword_is_optional() {
        for sql in [
            "SELECT * FROM a LEFT JOIN b ON a.id = b.a_id",
            "SELECT * FROM a LEFT OUTER JOIN b ON a.id = b.a_id",
        ] {
            let Statement::Select(s) = parse(sql) else {
                panic!()
            };
            assert_eq!(s.joins[0].join_type, JoinType::Left);
        }
    }

    #[test]
    fn test_multiple_joins() {
        let stmt = parse(
            "SELECT * FROM a JOIN b ON a.id = b.a_id FULL OUTER JOIN c ON b.id = c.b_id",
        );
        let Statement::Select(s) = stmt else { panic!() };
        assert_eq!(s.joins.len(), 2);
        assert_eq!(s.joins[1].join_type, JoinType::Full);
    }

    #[test]
    fn test_insert() {
        let stmt = parse("INSERT INTO users (name, active) VALUES ('carol', true);");
        match stmt {
            Statement::Insert(s) => {
                assert_eq!(s.table, "users");
                assert_eq!(s.columns, vec!["name", "active"]);
                assert_eq!(
                    s.values,
                    vec![
                        Expr::Literal(Value::Text("carol".into())),
                        Expr::Literal(Value::Bool(true)),
                    ]
                );
            }
            other => panic!("expected INSERT, got {:?}", other),
        }
    }

    #[test]
    fn test_insert_requires_column_list() {
        assert!(parse_sql("INSERT INTO users VALUES (1)").is_err());
    }

    #[test]
    fn test_update() {
        let stmt = parse("UPDATE users SET active = false, name = 'bob' WHERE id = 2");
        match stmt {
            Statement::Update(s) => {
                assert_eq!(s.table, "users");
                assert_eq!(
                    s.assignments,
                    vec![
                        ("active".to_string(), Value::Bool(false)),
                        ("name".to_string(), Value::Text("bob".into())),
                    ]
                );
                assert!(s.where_clause.is_some());
            }
            other => panic!("expected UPDATE, got {:?}", other),
        }
    }

    #[test]
    fn test_update_rejects_identifier_value() {
        assert!(parse_sql("UPDATE users SET name = other_column").is_err());
    }

    #[test]
    fn test_delete_without_where() {
        let stmt = parse("DELETE FROM users");
        match stmt {
            Statement::Delete(s) => {
                assert_eq!(s.table, "users");
                assert!(s.where_clause.is_none());
            }
            other => panic!("expected DELETE, got {:?}", other),
        }
    }

    #[test]
    fn test_database_statements() {
        assert_eq!(
            parse("CREATE DATABASE shop"),
            Statement::CreateDatabase("shop".into())
        );
        assert_eq!(
            parse("DROP DATABASE shop;"),
            Statement::DropDatabase("shop".into())
        );
        assert_eq!(
            parse("ALTER DATABASE shop RENAME TO store"),
            Statement::AlterDatabaseRename {
                name: "shop".into(),
                new_name: "store".into(),
            }
        );
        assert_eq!(parse("USE shop"), Statement::UseDatabase("shop".into()));
    }

    #[test]
    fn test_typed_literals() {
        let stmt = parse("SELECT * FROM t WHERE birthday = DATE '2024-01-13'");
        let Statement::Select(s) = stmt else { panic!() };
        match s.where_clause.unwrap() {
            Expr::Comparison { right, .. } => {
                assert_eq!(*right, Expr::Literal(Value::Date("2024-01-13".into())));
            }
            other => panic!("expected comparison, got {:?}", other),
        }
    }

    #[test]
    fn test_typed_literal_validates_payload() {
        assert!(parse_sql("SELECT * FROM t WHERE birthday = DATE '2024-02-30'").is_err());
        assert!(parse_sql("SELECT * FROM t WHERE at = TIME '25:00'").is_err());
        assert!(parse_sql("SELECT * FROM t WHERE contact = EMAIL 'nobody'").is_err());
    }

    #[test]
    fn test_type_keyword_as_column_name() {
        let stmt = parse("SELECT date, email FROM t WHERE date = '2024-01-13'");
        let Statement::Select(s) = stmt else { panic!() };
        assert_eq!(
            s.fields,
            FieldList::Columns(vec![ColumnRef::bare("date"), ColumnRef::bare("email")])
        );
        match s.where_clause.unwrap() {
            Expr::Comparison { left, .. } => {
                assert_eq!(
                    *left,
                    Expr::Ident {
                        table: None,
                        name: "date".into()
                    }
                );
            }
            other => panic!("expected comparison, got {:?}", other),
        }
    }

    #[test]
    fn test_negative_numbers() {
        let stmt = parse("SELECT * FROM t WHERE delta = -5 OR ratio = -2.5");
        let Statement::Select(s) = stmt else { panic!() };
        let Expr::Logical { left, right, .. } = s.where_clause.unwrap() else {
            panic!()
        };
        match (*left, *right) {
            (Expr::Comparison { right: l, .. }, Expr::Comparison { right: r, .. }) => {
                assert_eq!(*l, Expr::Literal(Value::Int(-5)));
                assert_eq!(*r, Expr::Literal(Value::Float(-2.5)));
            }
            other => panic!("unexpected shape {:?}", other),
        }
    }

    #[test]
    fn test_identifiers_fold_to_lowercase() {
        let stmt = parse("SELECT Name FROM Users WHERE Active = TRUE");
        let Statement::Select(s) = stmt else { panic!() };
        assert_eq!(s.table, "users");
        assert_eq!(s.fields, FieldList::Columns(vec![ColumnRef::bare("name")]));
    }

    #[test]
    fn test_trailing_garbage_is_an_error() {
        assert!(parse_sql("SELECT * FROM t; garbage").is_err());
    }

    #[test]
    fn test_parse_error_carries_position() {
        let err = parse_sql("SELECT *\nFROM").unwrap_err();
        match err {
            Error::Parse { line, .. } => assert_eq!(line, 2),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_display_round_trip() {
        let statements = [
            "SELECT * FROM users",
            "SELECT name, users.active FROM users WHERE active = TRUE",
            "SELECT users.name, orders.amount FROM users INNER JOIN orders ON users.id = orders.user_id WHERE orders.amount > 2.0",
            "SELECT * FROM a LEFT JOIN b ON a.id = b.a_id RIGHT JOIN c ON b.id = c.b_id",
            "SELECT * FROM t WHERE (a = 1 OR b = 2) AND c = 3",
            "SELECT * FROM t WHERE birthday = DATE '2024-01-13' AND at > TIME '09:30'",
            "INSERT INTO users (name, active, score) VALUES ('carol', TRUE, -1.5)",
            "UPDATE users SET active = FALSE WHERE contact = EMAIL 'a@b.org'",
            "DELETE FROM orders WHERE user_id = 1",
            "CREATE DATABASE shop",
            "ALTER DATABASE shop RENAME TO store",
            "USE shop",
        ];

        for sql in statements {
            let first = parse_sql(sql).unwrap();
            let printed = first.to_string();
            let second = parse_sql(&printed)
                .unwrap_or_else(|e| panic!("reparse of {:?} failed: {}", printed, e));
            assert_eq!(first, second, "round trip changed {:?}", sql);
        }
    }
}
