//! Recursive-descent parser producing [`Ast`] values from source text.
//!
//! Statement rules are speculative only on their discriminating prefix: a
//! rule that cannot see its leading keyword(s) rewinds silently and the next
//! rule is tried, while a failure past the prefix is a hard parse error.
//! Expressions go through a Pratt loop driven by the binding powers on
//! [`Token`].

use crate::ast::{
    Ast, ColumnDefinition, CreateIndexStatement, CreateTableStatement, DropTableStatement,
    Expression, InsertStatement, SelectItem, SelectStatement, Statement,
};
use crate::lexer::{lex, Keyword, LexError, Location, Symbol, Token, TokenKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    Lex(LexError),
    Syntax {
        loc: Location,
        near: String,
        expected: String,
    },
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::Lex(err) => write!(f, "{}", err),
            ParseError::Syntax {
                loc,
                near,
                expected,
            } => write!(
                f,
                "[{}:{}]: {}, got {}",
                loc.line, loc.col, expected, near
            ),
        }
    }
}

impl std::error::Error for ParseError {}

impl From<LexError> for ParseError {
    fn from(err: LexError) -> Self {
        ParseError::Lex(err)
    }
}

/// Parse `source` into an ordered sequence of statements.
///
/// The token stream is extended with a trailing semicolon when the source
/// does not end in one, so every statement terminates uniformly. Statements
/// are separated by one or more semicolons.
pub fn parse(source: &str) -> Result<Ast, ParseError> {
    let mut tokens = lex(source)?;
    if tokens.last().map_or(true, |t| !t.is_symbol(Symbol::Semicolon)) {
        let loc = tokens.last().map(|t| t.loc).unwrap_or_default();
        tokens.push(Token {
            value: Symbol::Semicolon.as_str().to_string(),
            kind: TokenKind::Symbol,
            loc,
        });
    }

    Parser::new(tokens).parse_ast()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn current(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn syntax_error(&self, expected: impl Into<String>) -> ParseError {
        match self.tokens.get(self.pos).or_else(|| self.tokens.last()) {
            Some(token) => ParseError::Syntax {
                loc: token.loc,
                near: token.value.clone(),
                expected: expected.into(),
            },
            None => ParseError::Syntax {
                loc: Location::default(),
                near: String::new(),
                expected: expected.into(),
            },
        }
    }

    fn eat_keyword(&mut self, keyword: Keyword) -> bool {
        if self.current().is_some_and(|t| t.is_keyword(keyword)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_symbol(&mut self, symbol: Symbol) -> bool {
        if self.current().is_some_and(|t| t.is_symbol(symbol)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, keyword: Keyword, expected: &str) -> Result<(), ParseError> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            Err(self.syntax_error(expected))
        }
    }

    fn expect_symbol(&mut self, symbol: Symbol, expected: &str) -> Result<(), ParseError> {
        if self.eat_symbol(symbol) {
            Ok(())
        } else {
            Err(self.syntax_error(expected))
        }
    }

    fn expect_identifier(&mut self, expected: &str) -> Result<Token, ParseError> {
        match self.current() {
            Some(token) if token.kind == TokenKind::Identifier => {
                let token = token.clone();
                self.pos += 1;
                Ok(token)
            }
            _ => Err(self.syntax_error(expected)),
        }
    }

    fn at_delimiter(&self, delimiters: &[Token]) -> bool {
        match self.current() {
            Some(current) => delimiters.iter().any(|d| d == current),
            None => true,
        }
    }

    fn parse_ast(&mut self) -> Result<Ast, ParseError> {
        let mut statements = Vec::new();
        while self.pos < self.tokens.len() {
            // One or more semicolons separate statements.
            if self.eat_symbol(Symbol::Semicolon) {
                continue;
            }
            statements.push(self.parse_statement()?);
            self.expect_symbol(
                Symbol::Semicolon,
                "Expected semi-colon delimiter between statements",
            )?;
        }
        Ok(Ast { statements })
    }

    fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        if let Some(stmt) = self.parse_select()? {
            return Ok(Statement::Select(stmt));
        }
        if let Some(stmt) = self.parse_insert()? {
            return Ok(Statement::Insert(stmt));
        }
        if let Some(stmt) = self.parse_create_table()? {
            return Ok(Statement::CreateTable(stmt));
        }
        if let Some(stmt) = self.parse_create_index()? {
            return Ok(Statement::CreateIndex(stmt));
        }
        if let Some(stmt) = self.parse_drop_table()? {
            return Ok(Statement::DropTable(stmt));
        }
        Err(self.syntax_error("Expected a SQL statement"))
    }

    // SELECT <item_list> [FROM ident] [WHERE expr] [LIMIT expr] [OFFSET expr]
    fn parse_select(&mut self) -> Result<Option<SelectStatement>, ParseError> {
        if !self.eat_keyword(Keyword::Select) {
            return Ok(None);
        }

        let item_delimiters = [Token::keyword(Keyword::From), Token::symbol(Symbol::Semicolon)];
        let items = self.parse_select_items(&item_delimiters)?;

        let from = if self.eat_keyword(Keyword::From) {
            Some(self.expect_identifier("Expected FROM table name")?)
        } else {
            None
        };

        let where_clause = if self.eat_keyword(Keyword::Where) {
            let delimiters = [
                Token::keyword(Keyword::Limit),
                Token::keyword(Keyword::Offset),
                Token::symbol(Symbol::Semicolon),
            ];
            Some(self.parse_expression(&delimiters, 0)?)
        } else {
            None
        };

        let limit = if self.eat_keyword(Keyword::Limit) {
            let delimiters = [
                Token::keyword(Keyword::Offset),
                Token::symbol(Symbol::Semicolon),
            ];
            Some(self.parse_expression(&delimiters, 0)?)
        } else {
            None
        };

        let offset = if self.eat_keyword(Keyword::Offset) {
            Some(self.parse_expression(&[Token::symbol(Symbol::Semicolon)], 0)?)
        } else {
            None
        };

        Ok(Some(SelectStatement {
            items,
            from,
            where_clause,
            limit,
            offset,
        }))
    }

    fn parse_select_items(&mut self, delimiters: &[Token]) -> Result<Vec<SelectItem>, ParseError> {
        let mut items = Vec::new();
        loop {
            if self.current().is_none() {
                return Err(self.syntax_error("Expected select item"));
            }
            if self.at_delimiter(delimiters) {
                break;
            }

            if !items.is_empty() {
                self.expect_symbol(Symbol::Comma, "Expected comma")?;
            }

            if self.eat_symbol(Symbol::Asterisk) {
                items.push(SelectItem::Asterisk);
                continue;
            }

            let mut exp_delimiters = delimiters.to_vec();
            exp_delimiters.push(Token::symbol(Symbol::Comma));
            exp_delimiters.push(Token::keyword(Keyword::As));
            let exp = self.parse_expression(&exp_delimiters, 0)?;

            let alias = if self.eat_keyword(Keyword::As) {
                Some(self.expect_identifier("Expected identifier after AS")?)
            } else {
                None
            };

            items.push(SelectItem::Expression { exp, alias });
        }
        Ok(items)
    }

    // INSERT INTO ident VALUES ( expr [, expr]* )
    fn parse_insert(&mut self) -> Result<Option<InsertStatement>, ParseError> {
        if !self.eat_keyword(Keyword::Insert) {
            return Ok(None);
        }

        self.expect_keyword(Keyword::Into, "Expected INTO")?;
        let table = self.expect_identifier("Expected table name")?;
        self.expect_keyword(Keyword::Values, "Expected VALUES")?;
        self.expect_symbol(Symbol::LeftParen, "Expected left paren")?;
        let values = self.parse_expressions(&[Token::symbol(Symbol::RightParen)])?;
        self.expect_symbol(Symbol::RightParen, "Expected right paren")?;

        Ok(Some(InsertStatement { table, values }))
    }

    fn parse_expressions(&mut self, delimiters: &[Token]) -> Result<Vec<Expression>, ParseError> {
        let mut expressions: Vec<Expression> = Vec::new();
        loop {
            if self.current().is_none() {
                return Err(self.syntax_error("Expected expression"));
            }
            if self.at_delimiter(delimiters) {
                break;
            }

            if !expressions.is_empty() {
                self.expect_symbol(Symbol::Comma, "Expected comma")?;
            }

            let mut exp_delimiters = delimiters.to_vec();
            exp_delimiters.push(Token::symbol(Symbol::Comma));
            expressions.push(self.parse_expression(&exp_delimiters, 0)?);
        }
        Ok(expressions)
    }

    // CREATE TABLE ident ( column_def [, column_def]* )
    fn parse_create_table(&mut self) -> Result<Option<CreateTableStatement>, ParseError> {
        let start = self.pos;
        if !self.eat_keyword(Keyword::Create) {
            return Ok(None);
        }
        if !self.eat_keyword(Keyword::Table) {
            self.pos = start;
            return Ok(None);
        }

        let name = self.expect_identifier("Expected table name")?;
        self.expect_symbol(Symbol::LeftParen, "Expected left paren")?;

        let mut cols = Vec::new();
        loop {
            if self.eat_symbol(Symbol::RightParen) {
                break;
            }
            if !cols.is_empty() {
                self.expect_symbol(Symbol::Comma, "Expected comma")?;
            }

            let col_name = self.expect_identifier("Expected column name")?;
            let data_type = match self.current() {
                Some(token) if token.kind == TokenKind::Keyword => {
                    let token = token.clone();
                    self.pos += 1;
                    token
                }
                _ => return Err(self.syntax_error("Expected column datatype")),
            };
            let primary_key = self.eat_keyword(Keyword::PrimaryKey);

            cols.push(ColumnDefinition {
                name: col_name,
                data_type,
                primary_key,
            });
        }

        Ok(Some(CreateTableStatement { name, cols }))
    }

    // CREATE [UNIQUE] INDEX ident ON ident ( expr )
    fn parse_create_index(&mut self) -> Result<Option<CreateIndexStatement>, ParseError> {
        let start = self.pos;
        if !self.eat_keyword(Keyword::Create) {
            return Ok(None);
        }
        let unique = self.eat_keyword(Keyword::Unique);
        if !self.eat_keyword(Keyword::Index) {
            self.pos = start;
            return Ok(None);
        }

        let name = self.expect_identifier("Expected index name")?;
        self.expect_keyword(Keyword::On, "Expected ON")?;
        let table = self.expect_identifier("Expected table name")?;
        self.expect_symbol(Symbol::LeftParen, "Expected left paren")?;
        let exp = self.parse_expression(&[Token::symbol(Symbol::RightParen)], 0)?;
        self.expect_symbol(Symbol::RightParen, "Expected right paren")?;

        Ok(Some(CreateIndexStatement {
            name,
            unique,
            primary_key: false,
            table,
            exp,
        }))
    }

    // DROP TABLE ident
    fn parse_drop_table(&mut self) -> Result<Option<DropTableStatement>, ParseError> {
        if !self.eat_keyword(Keyword::Drop) {
            return Ok(None);
        }
        self.expect_keyword(Keyword::Table, "Expected TABLE")?;
        let name = self.expect_identifier("Expected table name")?;
        Ok(Some(DropTableStatement { name }))
    }

    /// Pratt expression loop.
    ///
    /// Parses a primary (a parenthesised group or a literal token), then
    /// extends it with binary operators while their binding power is at
    /// least `min_bp`. An operator that binds too loosely is unread again so
    /// the enclosing loop can pick it up.
    fn parse_expression(
        &mut self,
        delimiters: &[Token],
        min_bp: u32,
    ) -> Result<Expression, ParseError> {
        let mut exp = if self.eat_symbol(Symbol::LeftParen) {
            let mut inner_delimiters = delimiters.to_vec();
            inner_delimiters.push(Token::symbol(Symbol::RightParen));
            let inner = self.parse_expression(&inner_delimiters, 0)?;
            self.expect_symbol(Symbol::RightParen, "Expected closing paren")?;
            inner
        } else {
            self.parse_literal()?
        };

        while self.pos < self.tokens.len() {
            if self.at_delimiter(delimiters) {
                break;
            }

            let before_op = self.pos;
            let op = match self.current() {
                Some(token) if token.binding_power() > 0 => token.clone(),
                _ => return Err(self.syntax_error("Expected binary operator")),
            };
            self.pos += 1;

            let bp = op.binding_power();
            if bp < min_bp {
                self.pos = before_op;
                break;
            }

            let right = self.parse_expression(delimiters, bp)?;
            exp = Expression::binary(exp, right, op);
        }

        Ok(exp)
    }

    fn parse_literal(&mut self) -> Result<Expression, ParseError> {
        match self.current() {
            Some(token)
                if matches!(
                    token.kind,
                    TokenKind::Identifier
                        | TokenKind::Numeric
                        | TokenKind::String
                        | TokenKind::Boolean
                        | TokenKind::Null
                ) =>
            {
                let token = token.clone();
                self.pos += 1;
                Ok(Expression::Literal(token))
            }
            _ => Err(self.syntax_error("Expected expression")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::BinaryExpression;

    fn parse_one(source: &str) -> Statement {
        let ast = parse(source).unwrap_or_else(|e| panic!("{source}: {e}"));
        assert_eq!(ast.statements.len(), 1, "{source}");
        ast.statements.into_iter().next().unwrap()
    }

    fn select(source: &str) -> SelectStatement {
        match parse_one(source) {
            Statement::Select(stmt) => stmt,
            other => panic!("expected select, got {other:?}"),
        }
    }

    fn binary_parts(exp: &Expression) -> (&Expression, &str, &Expression) {
        match exp {
            Expression::Binary(b) => (&b.left, b.op.value.as_str(), &b.right),
            other => panic!("expected binary expression, got {other:?}"),
        }
    }

    fn literal_value(exp: &Expression) -> &str {
        match exp {
            Expression::Literal(token) => token.value.as_str(),
            other => panic!("expected literal, got {other:?}"),
        }
    }

    #[test]
    fn parse_select_star() {
        let stmt = select("SELECT * FROM users;");
        assert_eq!(stmt.items, vec![SelectItem::Asterisk]);
        assert_eq!(stmt.from.as_ref().unwrap().value, "users");
        assert!(stmt.where_clause.is_none());
        assert!(stmt.limit.is_none());
        assert!(stmt.offset.is_none());
    }

    #[test]
    fn parse_select_without_from() {
        let stmt = select("SELECT 1;");
        assert_eq!(stmt.items.len(), 1);
        assert!(stmt.from.is_none());
    }

    #[test]
    fn parse_select_empty_item_list() {
        let stmt = select("SELECT;");
        assert!(stmt.items.is_empty());
        assert!(stmt.from.is_none());
    }

    #[test]
    fn parse_select_items_with_alias() {
        let stmt = select("SELECT id AS user_id, name FROM users;");
        assert_eq!(stmt.items.len(), 2);
        match &stmt.items[0] {
            SelectItem::Expression { exp, alias } => {
                assert_eq!(literal_value(exp), "id");
                assert_eq!(alias.as_ref().unwrap().value, "user_id");
            }
            other => panic!("unexpected item {other:?}"),
        }
        match &stmt.items[1] {
            SelectItem::Expression { alias, .. } => assert!(alias.is_none()),
            other => panic!("unexpected item {other:?}"),
        }
    }

    #[test]
    fn parse_select_mixed_asterisk_items() {
        let stmt = select("SELECT x, *, z FROM t;");
        assert_eq!(stmt.items.len(), 3);
        assert!(matches!(stmt.items[1], SelectItem::Asterisk));
    }

    #[test]
    fn and_binds_looser_than_comparison() {
        let stmt = select("SELECT x FROM t WHERE a = 1 AND b = 2;");
        let where_clause = stmt.where_clause.unwrap();
        let (left, op, right) = binary_parts(&where_clause);
        assert_eq!(op, "and");
        let (ll, lop, lr) = binary_parts(left);
        assert_eq!((literal_value(ll), lop, literal_value(lr)), ("a", "=", "1"));
        let (rl, rop, rr) = binary_parts(right);
        assert_eq!((literal_value(rl), rop, literal_value(rr)), ("b", "=", "2"));
    }

    #[test]
    fn or_with_tighter_equality() {
        let stmt = select("SELECT x FROM t WHERE a OR b = c;");
        let where_clause = stmt.where_clause.unwrap();
        let (left, op, right) = binary_parts(&where_clause);
        assert_eq!(op, "or");
        assert_eq!(literal_value(left), "a");
        let (rl, rop, rr) = binary_parts(right);
        assert_eq!((literal_value(rl), rop, literal_value(rr)), ("b", "=", "c"));
    }

    #[test]
    fn parenthesised_group_overrides_binding() {
        let stmt = select("SELECT x FROM t WHERE (a OR b) AND c;");
        let where_clause = stmt.where_clause.unwrap();
        let (left, op, right) = binary_parts(&where_clause);
        assert_eq!(op, "and");
        let (_, lop, _) = binary_parts(left);
        assert_eq!(lop, "or");
        assert_eq!(literal_value(right), "c");
    }

    #[test]
    fn equal_binding_powers_extend_to_the_right() {
        let stmt = select("SELECT 1 + 2 + 3;");
        let exp = match &stmt.items[0] {
            SelectItem::Expression { exp, .. } => exp,
            other => panic!("unexpected item {other:?}"),
        };
        assert_eq!(exp.generate_code(), "(1 + (2 + 3))");
    }

    #[test]
    fn concat_and_plus_bind_tightest() {
        let stmt = select("SELECT x FROM t WHERE a = b + 1;");
        let where_clause = stmt.where_clause.unwrap();
        let (left, op, right) = binary_parts(&where_clause);
        assert_eq!(op, "=");
        assert_eq!(literal_value(left), "a");
        let (_, rop, _) = binary_parts(right);
        assert_eq!(rop, "+");
    }

    #[test]
    fn parse_select_limit_and_offset() {
        let stmt = select("SELECT x FROM t LIMIT 2 OFFSET 1;");
        assert_eq!(literal_value(stmt.limit.as_ref().unwrap()), "2");
        assert_eq!(literal_value(stmt.offset.as_ref().unwrap()), "1");
    }

    #[test]
    fn parse_where_stops_at_limit_keyword() {
        let stmt = select("SELECT x FROM t WHERE a = 1 LIMIT 5;");
        assert!(stmt.where_clause.is_some());
        assert_eq!(literal_value(stmt.limit.as_ref().unwrap()), "5");
    }

    #[test]
    fn parse_insert() {
        let stmt = parse_one("INSERT INTO users VALUES (1, 'Admin', true, null);");
        match stmt {
            Statement::Insert(insert) => {
                assert_eq!(insert.table.value, "users");
                assert_eq!(insert.values.len(), 4);
                assert_eq!(literal_value(&insert.values[1]), "Admin");
            }
            other => panic!("expected insert, got {other:?}"),
        }
    }

    #[test]
    fn parse_insert_with_expression_value() {
        let stmt = parse_one("INSERT INTO t VALUES (1 + 2);");
        match stmt {
            Statement::Insert(insert) => {
                let (_, op, _) = binary_parts(&insert.values[0]);
                assert_eq!(op, "+");
            }
            other => panic!("expected insert, got {other:?}"),
        }
    }

    #[test]
    fn parse_create_table() {
        let stmt = parse_one("CREATE TABLE users (id INT PRIMARY KEY, name TEXT, admin BOOLEAN);");
        match stmt {
            Statement::CreateTable(create) => {
                assert_eq!(create.name.value, "users");
                assert_eq!(create.cols.len(), 3);
                assert!(create.cols[0].primary_key);
                assert_eq!(create.cols[0].data_type.value, "int");
                assert!(!create.cols[1].primary_key);
                assert_eq!(create.cols[2].data_type.value, "boolean");
            }
            other => panic!("expected create table, got {other:?}"),
        }
    }

    #[test]
    fn parse_create_index() {
        let stmt = parse_one("CREATE INDEX xi ON t (x);");
        match stmt {
            Statement::CreateIndex(create) => {
                assert_eq!(create.name.value, "xi");
                assert_eq!(create.table.value, "t");
                assert!(!create.unique);
                assert!(!create.primary_key);
                assert_eq!(create.exp.generate_code(), "\"x\"");
            }
            other => panic!("expected create index, got {other:?}"),
        }
    }

    #[test]
    fn parse_create_unique_index() {
        let stmt = parse_one("CREATE UNIQUE INDEX xi ON t (x + 1);");
        match stmt {
            Statement::CreateIndex(create) => {
                assert!(create.unique);
                assert_eq!(create.exp.generate_code(), "(\"x\" + 1)");
            }
            other => panic!("expected create index, got {other:?}"),
        }
    }

    #[test]
    fn parse_drop_table() {
        let stmt = parse_one("DROP TABLE users;");
        match stmt {
            Statement::DropTable(drop) => assert_eq!(drop.name.value, "users"),
            other => panic!("expected drop table, got {other:?}"),
        }
    }

    #[test]
    fn trailing_semicolon_is_optional() {
        assert_eq!(parse("SELECT 1"), parse("SELECT 1;"));
    }

    #[test]
    fn statements_separated_by_many_semicolons() {
        let ast = parse("SELECT 1;;;SELECT 2;;").unwrap();
        assert_eq!(ast.statements.len(), 2);
    }

    #[test]
    fn missing_semicolon_between_statements_fails() {
        let err = parse("DROP TABLE a DROP TABLE b;").unwrap_err();
        match err {
            ParseError::Syntax { expected, .. } => {
                assert_eq!(expected, "Expected semi-colon delimiter between statements");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn hard_error_past_discriminating_prefix() {
        let err = parse("INSERT 5;").unwrap_err();
        match err {
            ParseError::Syntax { expected, near, .. } => {
                assert_eq!(expected, "Expected INTO");
                assert_eq!(near, "5");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn error_carries_token_location() {
        let err = parse("SELECT x FROM\nt WHERE !;").unwrap_err();
        match err {
            ParseError::Lex(lex) => {
                // '!' alone is not a symbol; the lexer rejects it first.
                assert_eq!(lex.loc.line, 1);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn unknown_statement_prefix_fails() {
        let err = parse("foo;").unwrap_err();
        match err {
            ParseError::Syntax { expected, .. } => {
                assert_eq!(expected, "Expected a SQL statement");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn quoted_identifiers_survive_parsing() {
        let stmt = select(r#"SELECT "MixedCase" FROM "My Table";"#);
        assert_eq!(stmt.from.as_ref().unwrap().value, "My Table");
        match &stmt.items[0] {
            SelectItem::Expression { exp, .. } => {
                assert_eq!(literal_value(exp), "MixedCase");
            }
            other => panic!("unexpected item {other:?}"),
        }
    }

    #[test]
    fn generated_code_round_trips() {
        let sources = [
            "SELECT id, name FROM users WHERE id = 2;",
            "SELECT * FROM t WHERE a = 1 AND b = 2 LIMIT 10 OFFSET 5;",
            "SELECT 'it''s' || name AS greeting FROM people;",
            "INSERT INTO foo VALUES (1, 'flubberty', true, null);",
            "CREATE TABLE users (id INT PRIMARY KEY, name TEXT);",
            "CREATE UNIQUE INDEX age_idx ON users (age);",
            "DROP TABLE foo;",
        ];
        for source in sources {
            let first = parse(source).unwrap_or_else(|e| panic!("{source}: {e}"));
            let regenerated = first.generate_code();
            let second =
                parse(&regenerated).unwrap_or_else(|e| panic!("{regenerated}: {e}"));
            assert_eq!(first, second, "{source} -> {regenerated}");
        }
    }

    #[test]
    fn parse_then_generate_canonical_select() {
        let ast = parse("select id , name from users where id=2").unwrap();
        assert_eq!(
            ast.generate_code(),
            "SELECT\n\t\"id\",\n\t\"name\"\nFROM\n\t\"users\"\nWHERE\n\t(\"id\" = 2);"
        );
    }

    #[test]
    fn binary_expression_structure_is_preserved() {
        let stmt = select("SELECT x FROM t WHERE x <= 3;");
        let where_clause = stmt.where_clause.unwrap();
        match &where_clause {
            Expression::Binary(b) => {
                let BinaryExpression { left, right, op } = b.as_ref();
                assert_eq!(literal_value(left), "x");
                assert_eq!(literal_value(right), "3");
                assert_eq!(op.value, "<=");
            }
            other => panic!("expected binary, got {other:?}"),
        }
    }
}
