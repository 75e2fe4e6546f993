//! Abstract syntax tree for the ShaleDB SQL dialect.
//!
//! Nodes are immutable once the parser has produced them. Every node can
//! regenerate a canonical SQL form: keywords upper-case, identifiers quoted,
//! strings single-quoted. The canonical form is a pure function of the tree,
//! so equal trees generate equal strings; the planner relies on that when
//! matching WHERE atoms against index key expressions.

use crate::lexer::{Token, TokenKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression {
    Literal(Token),
    Binary(Box<BinaryExpression>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryExpression {
    pub left: Expression,
    pub right: Expression,
    pub op: Token,
}

impl Expression {
    pub fn binary(left: Expression, right: Expression, op: Token) -> Expression {
        Expression::Binary(Box::new(BinaryExpression { left, right, op }))
    }

    pub fn generate_code(&self) -> String {
        match self {
            Expression::Literal(token) => match token.kind {
                TokenKind::Identifier => format!("\"{}\"", token.value.replace('"', "\"\"")),
                TokenKind::String => format!("'{}'", token.value.replace('\'', "''")),
                _ => token.value.clone(),
            },
            Expression::Binary(binary) => format!(
                "({} {} {})",
                binary.left.generate_code(),
                binary.op.value,
                binary.right.generate_code()
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectItem {
    Asterisk,
    Expression {
        exp: Expression,
        alias: Option<Token>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectStatement {
    pub items: Vec<SelectItem>,
    pub from: Option<Token>,
    pub where_clause: Option<Expression>,
    pub limit: Option<Expression>,
    pub offset: Option<Expression>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertStatement {
    pub table: Token,
    pub values: Vec<Expression>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDefinition {
    pub name: Token,
    pub data_type: Token,
    pub primary_key: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTableStatement {
    pub name: Token,
    pub cols: Vec<ColumnDefinition>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateIndexStatement {
    pub name: Token,
    pub unique: bool,
    pub primary_key: bool,
    pub table: Token,
    pub exp: Expression,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropTableStatement {
    pub name: Token,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Select(SelectStatement),
    Insert(InsertStatement),
    CreateTable(CreateTableStatement),
    CreateIndex(CreateIndexStatement),
    DropTable(DropTableStatement),
}

fn quote_ident(token: &Token) -> String {
    format!("\"{}\"", token.value.replace('"', "\"\""))
}

impl SelectStatement {
    fn generate_code(&self) -> String {
        let mut items = Vec::with_capacity(self.items.len());
        for item in &self.items {
            let code = match item {
                SelectItem::Asterisk => "\t*".to_string(),
                SelectItem::Expression { exp, alias } => {
                    let mut code = format!("\t{}", exp.generate_code());
                    if let Some(alias) = alias {
                        code = format!("{} AS {}", code, quote_ident(alias));
                    }
                    code
                }
            };
            items.push(code);
        }

        let mut code = format!("SELECT\n{}", items.join(",\n"));
        if let Some(from) = &self.from {
            code = format!("{}\nFROM\n\t{}", code, quote_ident(from));
        }
        if let Some(where_clause) = &self.where_clause {
            code = format!("{}\nWHERE\n\t{}", code, where_clause.generate_code());
        }
        if let Some(limit) = &self.limit {
            code = format!("{}\nLIMIT\n\t{}", code, limit.generate_code());
        }
        if let Some(offset) = &self.offset {
            code = format!("{}\nOFFSET\n\t{}", code, offset.generate_code());
        }
        code + ";"
    }
}

impl InsertStatement {
    fn generate_code(&self) -> String {
        let values: Vec<String> = self.values.iter().map(|v| v.generate_code()).collect();
        format!(
            "INSERT INTO {} VALUES ({});",
            quote_ident(&self.table),
            values.join(", ")
        )
    }
}

impl CreateTableStatement {
    fn generate_code(&self) -> String {
        let mut cols = Vec::with_capacity(self.cols.len());
        for col in &self.cols {
            let mut code = format!(
                "\t{} {}",
                quote_ident(&col.name),
                col.data_type.value.to_ascii_uppercase()
            );
            if col.primary_key {
                code += " PRIMARY KEY";
            }
            cols.push(code);
        }
        format!(
            "CREATE TABLE {} (\n{}\n);",
            quote_ident(&self.name),
            cols.join(",\n")
        )
    }
}

impl CreateIndexStatement {
    fn generate_code(&self) -> String {
        let unique = if self.unique { " UNIQUE" } else { "" };
        format!(
            "CREATE{} INDEX {} ON {} ({});",
            unique,
            quote_ident(&self.name),
            quote_ident(&self.table),
            self.exp.generate_code()
        )
    }
}

impl DropTableStatement {
    fn generate_code(&self) -> String {
        format!("DROP TABLE {};", quote_ident(&self.name))
    }
}

impl Statement {
    pub fn generate_code(&self) -> String {
        match self {
            Statement::Select(stmt) => stmt.generate_code(),
            Statement::Insert(stmt) => stmt.generate_code(),
            Statement::CreateTable(stmt) => stmt.generate_code(),
            Statement::CreateIndex(stmt) => stmt.generate_code(),
            Statement::DropTable(stmt) => stmt.generate_code(),
        }
    }
}

/// An ordered sequence of parsed statements.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Ast {
    pub statements: Vec<Statement>,
}

impl Ast {
    pub fn generate_code(&self) -> String {
        let statements: Vec<String> = self.statements.iter().map(|s| s.generate_code()).collect();
        statements.join("\n")
    }
}
