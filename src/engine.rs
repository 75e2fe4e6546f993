//! Statement runner tying the parser to the memory backend.
//!
//! [`ShaleDB`] owns one catalog and executes whole SQL strings, statement by
//! statement, in order. Results are rendered into
//! [`sqllogictest::DBOutput`], which is the surface the slt harness and the
//! runner binary consume; library callers wanting typed cells use
//! [`MemoryBackend`] directly.

use crate::ast::Statement;
use crate::parser::{self, ParseError};
use crate::storage::{ColumnType, MemoryBackend, MemoryCell, StorageError, TableMetadata};
use async_trait::async_trait;
use sqllogictest::{DBOutput, DefaultColumnType};

#[derive(Debug)]
pub struct ShaleDBError {
    message: String,
}

impl ShaleDBError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ShaleDBError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ShaleDBError {}

impl From<StorageError> for ShaleDBError {
    fn from(err: StorageError) -> Self {
        ShaleDBError::new(err.to_string())
    }
}

impl From<ParseError> for ShaleDBError {
    fn from(err: ParseError) -> Self {
        ShaleDBError::new(err.to_string())
    }
}

#[derive(Default)]
pub struct ShaleDB {
    backend: MemoryBackend,
}

impl ShaleDB {
    pub fn new() -> ShaleDB {
        ShaleDB::default()
    }

    pub fn get_tables(&self) -> Vec<TableMetadata> {
        self.backend.get_tables()
    }

    /// Parse and execute every statement in `sql`. The output of the last
    /// statement wins, so a trailing SELECT returns its rows.
    pub fn run_statement(&mut self, sql: &str) -> Result<DBOutput<DefaultColumnType>, ShaleDBError> {
        let ast = parser::parse(sql)?;

        let mut output = DBOutput::StatementComplete(0);
        for stmt in &ast.statements {
            output = match stmt {
                Statement::Select(select) => {
                    let results = self.backend.select(select)?;
                    let types = results
                        .columns
                        .iter()
                        .map(|c| match c.column_type {
                            ColumnType::Int => DefaultColumnType::Integer,
                            ColumnType::Text | ColumnType::Bool => DefaultColumnType::Text,
                        })
                        .collect();
                    let rows = results
                        .rows
                        .iter()
                        .map(|row| {
                            row.iter()
                                .zip(&results.columns)
                                .map(|(cell, col)| cell_to_string(cell, col.column_type))
                                .collect()
                        })
                        .collect();
                    DBOutput::Rows { types, rows }
                }
                Statement::Insert(insert) => {
                    self.backend.insert(insert)?;
                    DBOutput::StatementComplete(0)
                }
                Statement::CreateTable(create) => {
                    self.backend.create_table(create)?;
                    DBOutput::StatementComplete(0)
                }
                Statement::CreateIndex(create) => {
                    self.backend.create_index(create)?;
                    DBOutput::StatementComplete(0)
                }
                Statement::DropTable(drop) => {
                    self.backend.drop_table(drop)?;
                    DBOutput::StatementComplete(0)
                }
            };
        }
        Ok(output)
    }
}

fn cell_to_string(cell: &MemoryCell, column_type: ColumnType) -> String {
    let rendered = match column_type {
        ColumnType::Int => cell.as_int().map(|v| v.to_string()),
        ColumnType::Text => cell.as_text().map(|s| s.to_string()),
        ColumnType::Bool => cell.as_bool().map(|b| b.to_string()),
    };
    rendered.unwrap_or_else(|| "NULL".to_string())
}

#[async_trait]
impl sqllogictest::AsyncDB for ShaleDB {
    type Error = ShaleDBError;
    type ColumnType = DefaultColumnType;

    async fn run(&mut self, sql: &str) -> Result<DBOutput<Self::ColumnType>, Self::Error> {
        self.run_statement(sql)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows_of(output: DBOutput<DefaultColumnType>) -> Vec<Vec<String>> {
        match output {
            DBOutput::Rows { rows, .. } => rows,
            DBOutput::StatementComplete(n) => panic!("expected rows, got StatementComplete({n})"),
            _ => panic!("expected rows, got an unknown DBOutput variant"),
        }
    }

    #[test]
    fn run_statement_executes_batches() {
        let mut db = ShaleDB::new();
        let output = db
            .run_statement(
                "CREATE TABLE t (x INT, s TEXT, b BOOLEAN); \
                 INSERT INTO t VALUES (1, 'one', true); \
                 SELECT x, s, b FROM t;",
            )
            .unwrap();
        assert_eq!(
            rows_of(output),
            vec![vec!["1".to_string(), "one".to_string(), "true".to_string()]]
        );
    }

    #[test]
    fn nulls_render_as_null() {
        let mut db = ShaleDB::new();
        db.run_statement("CREATE TABLE t (x INT); INSERT INTO t VALUES (null);")
            .unwrap();
        let output = db.run_statement("SELECT x FROM t;").unwrap();
        assert_eq!(rows_of(output), vec![vec!["NULL".to_string()]]);
    }

    #[test]
    fn column_types_map_to_slt_types() {
        let mut db = ShaleDB::new();
        db.run_statement("CREATE TABLE t (x INT, s TEXT); INSERT INTO t VALUES (1, 'a');")
            .unwrap();
        match db.run_statement("SELECT x, s FROM t;").unwrap() {
            DBOutput::Rows { types, .. } => {
                assert_eq!(
                    types,
                    vec![DefaultColumnType::Integer, DefaultColumnType::Text]
                );
            }
            DBOutput::StatementComplete(n) => panic!("expected rows, got StatementComplete({n})"),
            _ => panic!("expected rows, got an unknown DBOutput variant"),
        }
    }

    #[test]
    fn ddl_returns_statement_complete() {
        let mut db = ShaleDB::new();
        let output = db.run_statement("CREATE TABLE t (x INT);").unwrap();
        assert!(matches!(output, DBOutput::StatementComplete(0)));
    }

    #[test]
    fn errors_carry_display_messages() {
        let mut db = ShaleDB::new();
        let err = match db.run_statement("SELECT * FROM missing;") {
            Err(e) => e,
            Ok(_) => panic!("expected an error"),
        };
        assert_eq!(err.to_string(), "table does not exist");

        let err = match db.run_statement("SELEC 1;") {
            Err(e) => e,
            Ok(_) => panic!("expected an error"),
        };
        assert!(err.to_string().contains("Expected a SQL statement"), "{err}");
    }

    #[test]
    fn metadata_is_exposed_through_the_engine() {
        let mut db = ShaleDB::new();
        db.run_statement("CREATE TABLE t (id INT PRIMARY KEY);").unwrap();
        let tables = db.get_tables();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].indexes[0].kind, "rbtree");
    }
}
