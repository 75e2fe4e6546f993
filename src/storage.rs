//! In-memory table and index store for ShaleDB.
//!
//! Rows are stored as sequences of [`MemoryCell`]s, the byte-level encoding
//! of one scalar: NULL is the empty cell, ints are 4-byte big-endian
//! two's-complement, bools are a single byte, text is raw UTF-8. The byte
//! encoding never leaves this module; callers read cells through the typed
//! accessors.
//!
//! Indexes are ordered maps from key cell to the row-ids that produced the
//! key. Row-ids are dense offsets into the owning table's row vector and
//! stay stable because rows are only ever appended. The query planner in
//! [`MemoryBackend::select`] matches WHERE atoms against index key
//! expressions by canonical code and narrows the scanned row set through
//! the matching indexes before evaluating the predicate row by row.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::Bound;

use crate::ast::{
    BinaryExpression, CreateIndexStatement, CreateTableStatement, DropTableStatement, Expression,
    InsertStatement, SelectItem, SelectStatement,
};
use crate::lexer::{Keyword, Location, Token, TokenKind};

pub type RowId = usize;

/// Display name for result columns that are not plain column references.
const ANONYMOUS_COLUMN: &str = "?column?";

/// Kind label reported for ordered indexes.
const ORDERED_INDEX_KIND: &str = "rbtree";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    TableDoesNotExist,
    TableAlreadyExists,
    /// An expression referenced a column the bound table does not have.
    ColumnDoesNotExist,
    /// A column definition used a type keyword other than int/text/boolean.
    InvalidDatatype,
    DuplicateColumn,
    IndexAlreadyExists,
    PrimaryKeyAlreadyExists,
    ViolatesUniqueConstraint,
    ViolatesNotNullConstraint,
    /// INSERT supplied a value count different from the column count.
    MissingValues,
    InvalidSelectItem,
    /// An expression had a shape the evaluator cannot produce a cell for.
    InvalidCell,
    /// Operand types did not fit the operator.
    InvalidOperands,
    NegativeLimit,
    NegativeOffset,
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::TableDoesNotExist => write!(f, "table does not exist"),
            StorageError::TableAlreadyExists => write!(f, "table already exists"),
            StorageError::ColumnDoesNotExist => write!(f, "column does not exist"),
            StorageError::InvalidDatatype => write!(f, "invalid datatype"),
            StorageError::DuplicateColumn => write!(f, "duplicate column name"),
            StorageError::IndexAlreadyExists => write!(f, "index already exists"),
            StorageError::PrimaryKeyAlreadyExists => write!(f, "primary key already exists"),
            StorageError::ViolatesUniqueConstraint => {
                write!(f, "duplicate key value violates unique constraint")
            }
            StorageError::ViolatesNotNullConstraint => {
                write!(f, "value violates not null constraint")
            }
            StorageError::MissingValues => write!(f, "missing values"),
            StorageError::InvalidSelectItem => write!(f, "select item is not valid"),
            StorageError::InvalidCell => write!(f, "cell is invalid"),
            StorageError::InvalidOperands => write!(f, "operands are invalid"),
            StorageError::NegativeLimit => write!(f, "invalid, negative limit"),
            StorageError::NegativeOffset => write!(f, "invalid, negative offset"),
        }
    }
}

impl std::error::Error for StorageError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Int,
    Text,
    Bool,
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColumnType::Int => write!(f, "integer"),
            ColumnType::Text => write!(f, "text"),
            ColumnType::Bool => write!(f, "boolean"),
        }
    }
}

/// Byte encoding of one scalar value, possibly NULL.
///
/// The derived ordering is raw byte order, which is what the index trees
/// key on. The evaluator's notion of equality is [`MemoryCell::equals`],
/// where a NULL cell is unequal to everything including another NULL.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct MemoryCell(Vec<u8>);

impl MemoryCell {
    pub(crate) fn null() -> MemoryCell {
        MemoryCell(Vec::new())
    }

    pub(crate) fn from_int(value: i32) -> MemoryCell {
        MemoryCell(value.to_be_bytes().to_vec())
    }

    pub(crate) fn from_bool(value: bool) -> MemoryCell {
        MemoryCell(vec![value as u8])
    }

    pub(crate) fn from_text(value: &str) -> MemoryCell {
        MemoryCell(value.as_bytes().to_vec())
    }

    pub fn is_null(&self) -> bool {
        self.0.is_empty()
    }

    /// The decoded integer, or `None` for NULL and for cells that are not
    /// four bytes long.
    pub fn as_int(&self) -> Option<i32> {
        let bytes: [u8; 4] = self.0.as_slice().try_into().ok()?;
        Some(i32::from_be_bytes(bytes))
    }

    pub fn as_text(&self) -> Option<&str> {
        if self.0.is_empty() {
            return None;
        }
        std::str::from_utf8(&self.0).ok()
    }

    pub fn as_bool(&self) -> Option<bool> {
        if self.0.len() != 1 {
            return None;
        }
        Some(self.0[0] == 1)
    }

    fn equals(&self, other: &MemoryCell) -> bool {
        if self.is_null() || other.is_null() {
            return false;
        }
        self.0 == other.0
    }

    fn concat(&self, other: &MemoryCell) -> MemoryCell {
        let mut bytes = self.0.clone();
        bytes.extend_from_slice(&other.0);
        MemoryCell(bytes)
    }

    #[cfg(test)]
    fn bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Conversion defined only for literal tokens. Numeric lexemes that do not
/// parse as 32-bit integers become NULL.
fn literal_to_cell(token: &Token) -> MemoryCell {
    match token.kind {
        TokenKind::Numeric => match token.value.parse::<i32>() {
            Ok(value) => MemoryCell::from_int(value),
            Err(_) => MemoryCell::null(),
        },
        TokenKind::String => MemoryCell::from_text(&token.value),
        TokenKind::Boolean => MemoryCell::from_bool(token.value == "true"),
        _ => MemoryCell::null(),
    }
}

#[derive(Debug, Clone)]
struct Index {
    name: String,
    exp: Expression,
    unique: bool,
    primary_key: bool,
    tree: BTreeMap<MemoryCell, Vec<RowId>>,
    kind: &'static str,
}

impl Index {
    fn new(name: String, exp: Expression, unique: bool, primary_key: bool) -> Index {
        Index {
            name,
            exp,
            unique,
            primary_key,
            tree: BTreeMap::new(),
            kind: ORDERED_INDEX_KIND,
        }
    }

    /// Evaluate the key expression for one row and check the not-null and
    /// uniqueness constraints against the current tree.
    fn key_for(&self, table: &Table, row_id: RowId) -> Result<MemoryCell, StorageError> {
        let (key, _, _) = table.eval_cell(row_id, &self.exp)?;
        if key.is_null() {
            return Err(StorageError::ViolatesNotNullConstraint);
        }
        if self.unique && self.tree.contains_key(&key) {
            return Err(StorageError::ViolatesUniqueConstraint);
        }
        Ok(key)
    }

    fn add_entry(&mut self, key: MemoryCell, row_id: RowId) {
        self.tree.entry(key).or_default().push(row_id);
    }

    /// The literal operand to probe this index with, when `exp` is a
    /// comparison whose one side stringifies to the index key expression
    /// and whose other side is a literal.
    fn applicable_value(&self, exp: &Expression) -> Option<Expression> {
        let binary = match exp {
            Expression::Binary(binary) => binary,
            _ => return None,
        };

        if binary.op.kind != TokenKind::Symbol
            || !matches!(binary.op.value.as_str(), "=" | "<>" | "<" | "<=" | ">" | ">=")
        {
            return None;
        }

        let key_code = self.exp.generate_code();
        let (column_exp, value_exp) = if binary.left.generate_code() == key_code {
            (&binary.left, &binary.right)
        } else {
            (&binary.right, &binary.left)
        };
        if column_exp.generate_code() != key_code {
            return None;
        }

        if !matches!(value_exp, Expression::Literal(_)) {
            return None;
        }

        Some(value_exp.clone())
    }

    /// Row-ids satisfying `atom`, in index-traversal order: ascending for
    /// `=`, `<>`, `>`, `>=`; descending from the probe for `<`, `<=`.
    fn subset(&self, atom: &Expression) -> Option<Vec<RowId>> {
        let value_exp = self.applicable_value(atom)?;
        let binary = match atom {
            Expression::Binary(binary) => binary,
            _ => return None,
        };

        let (probe, _, _) = Table::anonymous().eval_cell(0, &value_exp).ok()?;

        let mut row_ids = Vec::new();
        match binary.op.value.as_str() {
            "=" => {
                if let Some(ids) = self.tree.get(&probe) {
                    row_ids.extend_from_slice(ids);
                }
            }
            "<>" => {
                for (key, ids) in &self.tree {
                    if *key != probe {
                        row_ids.extend_from_slice(ids);
                    }
                }
            }
            "<" => {
                for (_, ids) in self
                    .tree
                    .range((Bound::Unbounded, Bound::Excluded(probe)))
                    .rev()
                {
                    row_ids.extend_from_slice(ids);
                }
            }
            "<=" => {
                for (_, ids) in self
                    .tree
                    .range((Bound::Unbounded, Bound::Included(probe)))
                    .rev()
                {
                    row_ids.extend_from_slice(ids);
                }
            }
            ">" => {
                for (_, ids) in self.tree.range((Bound::Excluded(probe), Bound::Unbounded)) {
                    row_ids.extend_from_slice(ids);
                }
            }
            ">=" => {
                for (_, ids) in self.tree.range((Bound::Included(probe), Bound::Unbounded)) {
                    row_ids.extend_from_slice(ids);
                }
            }
            _ => return None,
        }

        Some(row_ids)
    }
}

#[derive(Debug, Clone, Default)]
struct Table {
    name: String,
    columns: Vec<String>,
    column_types: Vec<ColumnType>,
    rows: Vec<Vec<MemoryCell>>,
    indexes: Vec<Index>,
}

impl Table {
    /// Throwaway table used to fold constant expressions.
    fn anonymous() -> Table {
        Table {
            name: "?tmp?".to_string(),
            ..Default::default()
        }
    }

    /// Anonymous table with one empty row, the scan target of a FROM-less
    /// SELECT.
    fn single_empty_row() -> Table {
        Table {
            rows: vec![Vec::new()],
            ..Table::anonymous()
        }
    }

    /// Row-at-a-time evaluation: produce the cell, display name, and type
    /// of `exp` evaluated against row `row_id`.
    fn eval_cell(
        &self,
        row_id: RowId,
        exp: &Expression,
    ) -> Result<(MemoryCell, String, ColumnType), StorageError> {
        match exp {
            Expression::Literal(token) => self.eval_literal_cell(row_id, token),
            Expression::Binary(binary) => self.eval_binary_cell(row_id, binary),
        }
    }

    fn eval_literal_cell(
        &self,
        row_id: RowId,
        token: &Token,
    ) -> Result<(MemoryCell, String, ColumnType), StorageError> {
        if token.kind == TokenKind::Identifier {
            for (i, column) in self.columns.iter().enumerate() {
                if *column == token.value {
                    let cell = self
                        .rows
                        .get(row_id)
                        .and_then(|row| row.get(i))
                        .ok_or(StorageError::InvalidCell)?;
                    return Ok((cell.clone(), column.clone(), self.column_types[i]));
                }
            }
            return Err(StorageError::ColumnDoesNotExist);
        }

        let column_type = match token.kind {
            TokenKind::String => ColumnType::Text,
            TokenKind::Boolean => ColumnType::Bool,
            _ => ColumnType::Int,
        };
        Ok((
            literal_to_cell(token),
            ANONYMOUS_COLUMN.to_string(),
            column_type,
        ))
    }

    fn eval_binary_cell(
        &self,
        row_id: RowId,
        binary: &BinaryExpression,
    ) -> Result<(MemoryCell, String, ColumnType), StorageError> {
        let (l, _, lt) = self.eval_cell(row_id, &binary.left)?;
        let (r, _, rt) = self.eval_cell(row_id, &binary.right)?;

        let anonymous = ANONYMOUS_COLUMN.to_string();
        match binary.op.kind {
            TokenKind::Symbol => match binary.op.value.as_str() {
                "=" => {
                    if l.is_null() || r.is_null() {
                        return Ok((MemoryCell::null(), anonymous, ColumnType::Bool));
                    }
                    let eq = lt == rt && l.equals(&r);
                    Ok((MemoryCell::from_bool(eq), anonymous, ColumnType::Bool))
                }
                "<>" => {
                    if l.is_null() || r.is_null() {
                        return Ok((MemoryCell::null(), anonymous, ColumnType::Bool));
                    }
                    let neq = lt != rt || !l.equals(&r);
                    Ok((MemoryCell::from_bool(neq), anonymous, ColumnType::Bool))
                }
                "||" => {
                    if l.is_null() || r.is_null() {
                        return Ok((MemoryCell::null(), anonymous, ColumnType::Text));
                    }
                    if lt != ColumnType::Text || rt != ColumnType::Text {
                        return Err(StorageError::InvalidOperands);
                    }
                    Ok((l.concat(&r), anonymous, ColumnType::Text))
                }
                "+" => {
                    if l.is_null() || r.is_null() {
                        return Ok((MemoryCell::null(), anonymous, ColumnType::Int));
                    }
                    if lt != ColumnType::Int || rt != ColumnType::Int {
                        return Err(StorageError::InvalidOperands);
                    }
                    let li = l.as_int().ok_or(StorageError::InvalidCell)?;
                    let ri = r.as_int().ok_or(StorageError::InvalidCell)?;
                    Ok((
                        MemoryCell::from_int(li.wrapping_add(ri)),
                        anonymous,
                        ColumnType::Int,
                    ))
                }
                op @ ("<" | "<=" | ">" | ">=") => {
                    if l.is_null() || r.is_null() {
                        return Ok((MemoryCell::null(), anonymous, ColumnType::Bool));
                    }
                    if lt != ColumnType::Int || rt != ColumnType::Int {
                        return Err(StorageError::InvalidOperands);
                    }
                    let li = l.as_int().ok_or(StorageError::InvalidCell)?;
                    let ri = r.as_int().ok_or(StorageError::InvalidCell)?;
                    let result = match op {
                        "<" => li < ri,
                        "<=" => li <= ri,
                        ">" => li > ri,
                        _ => li >= ri,
                    };
                    Ok((MemoryCell::from_bool(result), anonymous, ColumnType::Bool))
                }
                _ => Err(StorageError::InvalidCell),
            },
            TokenKind::Keyword => match binary.op.value.as_str() {
                "and" => {
                    if lt != ColumnType::Bool || rt != ColumnType::Bool {
                        return Err(StorageError::InvalidOperands);
                    }
                    let cell = match (l.as_bool(), r.as_bool()) {
                        (Some(false), _) | (_, Some(false)) => MemoryCell::from_bool(false),
                        (None, _) | (_, None) => MemoryCell::null(),
                        _ => MemoryCell::from_bool(true),
                    };
                    Ok((cell, anonymous, ColumnType::Bool))
                }
                "or" => {
                    if lt != ColumnType::Bool || rt != ColumnType::Bool {
                        return Err(StorageError::InvalidOperands);
                    }
                    let cell = match (l.as_bool(), r.as_bool()) {
                        (Some(true), _) | (_, Some(true)) => MemoryCell::from_bool(true),
                        (None, _) | (_, None) => MemoryCell::null(),
                        _ => MemoryCell::from_bool(false),
                    };
                    Ok((cell, anonymous, ColumnType::Bool))
                }
                _ => Err(StorageError::InvalidCell),
            },
            _ => Err(StorageError::InvalidCell),
        }
    }

    /// Flatten the WHERE clause into a conjunction of atoms and pair each
    /// atom with every index it can probe. An OR node stops the descent for
    /// its branch.
    fn applicable_indexes(&self, where_clause: Option<&Expression>) -> Vec<(usize, Expression)> {
        fn linearize(exp: &Expression, atoms: &mut Vec<Expression>) {
            match exp {
                Expression::Binary(binary) => {
                    if binary.op.is_keyword(Keyword::Or) {
                        return;
                    }
                    if binary.op.is_keyword(Keyword::And) {
                        linearize(&binary.left, atoms);
                        linearize(&binary.right, atoms);
                        return;
                    }
                    atoms.push(exp.clone());
                }
                other => atoms.push(other.clone()),
            }
        }

        let mut atoms = Vec::new();
        if let Some(where_clause) = where_clause {
            linearize(where_clause, &mut atoms);
        }

        let mut pairs = Vec::new();
        for atom in &atoms {
            for (pos, index) in self.indexes.iter().enumerate() {
                if index.applicable_value(atom).is_some() {
                    pairs.push((pos, atom.clone()));
                }
            }
        }
        pairs
    }

    /// Header name and type of a select item without evaluating a row.
    /// Used when a query keeps no rows but still reports its columns.
    fn static_item_header(&self, exp: &Expression) -> Result<(String, ColumnType), StorageError> {
        match exp {
            Expression::Literal(token) => {
                if token.kind == TokenKind::Identifier {
                    for (i, column) in self.columns.iter().enumerate() {
                        if *column == token.value {
                            return Ok((column.clone(), self.column_types[i]));
                        }
                    }
                    return Err(StorageError::ColumnDoesNotExist);
                }
                let column_type = match token.kind {
                    TokenKind::String => ColumnType::Text,
                    TokenKind::Boolean => ColumnType::Bool,
                    _ => ColumnType::Int,
                };
                Ok((ANONYMOUS_COLUMN.to_string(), column_type))
            }
            Expression::Binary(binary) => {
                let column_type = match (binary.op.kind, binary.op.value.as_str()) {
                    (TokenKind::Symbol, "=" | "<>" | "<" | "<=" | ">" | ">=") => ColumnType::Bool,
                    (TokenKind::Symbol, "+") => ColumnType::Int,
                    (TokenKind::Symbol, "||") => ColumnType::Text,
                    (TokenKind::Keyword, "and" | "or") => ColumnType::Bool,
                    _ => return Err(StorageError::InvalidCell),
                };
                Ok((ANONYMOUS_COLUMN.to_string(), column_type))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultColumn {
    pub name: String,
    pub column_type: ColumnType,
    pub not_null: bool,
}

/// Rows and header returned by a successful SELECT.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Results {
    pub columns: Vec<ResultColumn>,
    pub rows: Vec<Vec<MemoryCell>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexMetadata {
    pub name: String,
    pub exp: String,
    pub kind: String,
    pub unique: bool,
    pub primary_key: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableMetadata {
    pub name: String,
    pub columns: Vec<ResultColumn>,
    pub indexes: Vec<IndexMetadata>,
}

/// The catalog: every table, addressed by name.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    tables: HashMap<String, Table>,
}

impl MemoryBackend {
    pub fn new() -> MemoryBackend {
        MemoryBackend::default()
    }

    pub fn create_table(&mut self, stmt: &CreateTableStatement) -> Result<(), StorageError> {
        if self.tables.contains_key(&stmt.name.value) {
            return Err(StorageError::TableAlreadyExists);
        }

        let mut table = Table {
            name: stmt.name.value.clone(),
            ..Default::default()
        };

        let mut primary_key: Option<Token> = None;
        for col in &stmt.cols {
            let column_type = match col.data_type.value.as_str() {
                "int" => ColumnType::Int,
                "text" => ColumnType::Text,
                "boolean" => ColumnType::Bool,
                _ => return Err(StorageError::InvalidDatatype),
            };

            if table
                .columns
                .iter()
                .any(|c| c.eq_ignore_ascii_case(&col.name.value))
            {
                return Err(StorageError::DuplicateColumn);
            }

            if col.primary_key {
                if primary_key.is_some() {
                    return Err(StorageError::PrimaryKeyAlreadyExists);
                }
                primary_key = Some(col.name.clone());
            }

            table.columns.push(col.name.value.clone());
            table.column_types.push(column_type);
        }

        if let Some(pkey) = primary_key {
            let index_stmt = CreateIndexStatement {
                name: Token {
                    value: format!("{}_pkey", table.name),
                    kind: TokenKind::Identifier,
                    loc: Location::default(),
                },
                unique: true,
                primary_key: true,
                table: stmt.name.clone(),
                exp: Expression::Literal(pkey),
            };
            let index = Self::build_index(&table, &index_stmt)?;
            table.indexes.push(index);
        }

        self.tables.insert(table.name.clone(), table);
        Ok(())
    }

    pub fn create_index(&mut self, stmt: &CreateIndexStatement) -> Result<(), StorageError> {
        let table = self
            .tables
            .get_mut(&stmt.table.value)
            .ok_or(StorageError::TableDoesNotExist)?;

        if table.indexes.iter().any(|i| i.name == stmt.name.value) {
            return Err(StorageError::IndexAlreadyExists);
        }

        // Built standalone and attached only on success, so a failed
        // backfill leaves the table untouched.
        let index = Self::build_index(table, stmt)?;
        table.indexes.push(index);
        Ok(())
    }

    fn build_index(table: &Table, stmt: &CreateIndexStatement) -> Result<Index, StorageError> {
        let mut index = Index::new(
            stmt.name.value.clone(),
            stmt.exp.clone(),
            stmt.unique,
            stmt.primary_key,
        );
        for row_id in 0..table.rows.len() {
            let key = index.key_for(table, row_id)?;
            index.add_entry(key, row_id);
        }
        Ok(index)
    }

    pub fn drop_table(&mut self, stmt: &DropTableStatement) -> Result<(), StorageError> {
        match self.tables.remove(&stmt.name.value) {
            Some(_) => Ok(()),
            None => Err(StorageError::TableDoesNotExist),
        }
    }

    pub fn insert(&mut self, stmt: &InsertStatement) -> Result<(), StorageError> {
        let table = self
            .tables
            .get_mut(&stmt.table.value)
            .ok_or(StorageError::TableDoesNotExist)?;

        if stmt.values.len() != table.columns.len() {
            return Err(StorageError::MissingValues);
        }

        // Value expressions are folded against an empty table, so constant
        // arithmetic works and column references fail.
        let folder = Table::anonymous();
        let mut row = Vec::with_capacity(stmt.values.len());
        for value in &stmt.values {
            let (cell, _, _) = folder.eval_cell(0, value)?;
            row.push(cell);
        }

        let row_id = table.rows.len();
        table.rows.push(row);

        // Validate every index key before committing any entry; the first
        // rejection removes the appended row and leaves the indexes as they
        // were.
        let keys: Result<Vec<MemoryCell>, StorageError> = {
            let table_ref: &Table = table;
            table_ref
                .indexes
                .iter()
                .map(|index| index.key_for(table_ref, row_id))
                .collect()
        };
        let keys = match keys {
            Ok(keys) => keys,
            Err(err) => {
                table.rows.pop();
                return Err(err);
            }
        };

        for (index, key) in table.indexes.iter_mut().zip(keys) {
            index.add_entry(key, row_id);
        }
        Ok(())
    }

    pub fn select(&self, stmt: &SelectStatement) -> Result<Results, StorageError> {
        let synthetic;
        let table = match &stmt.from {
            Some(from) => self
                .tables
                .get(&from.value)
                .ok_or(StorageError::TableDoesNotExist)?,
            None => {
                synthetic = Table::single_empty_row();
                &synthetic
            }
        };

        if stmt.items.is_empty() {
            return Ok(Results::default());
        }

        // Narrow the scanned row set through every applicable index. The
        // first narrowing replaces insertion order with index-traversal
        // order; later ones intersect with the surviving set.
        let mut row_ids: Vec<RowId> = (0..table.rows.len()).collect();
        for (index_pos, atom) in table.applicable_indexes(stmt.where_clause.as_ref()) {
            if let Some(matched) = table.indexes[index_pos].subset(&atom) {
                let surviving: HashSet<RowId> = row_ids.iter().copied().collect();
                row_ids = matched
                    .into_iter()
                    .filter(|id| surviving.contains(id))
                    .collect();
            }
        }

        // Expand `*` into one item per column, in declared order. Narrowing
        // never changes the schema, so the expansion always follows the
        // declared column order.
        let mut final_items: Vec<(Expression, Option<Token>)> = Vec::new();
        for item in &stmt.items {
            match item {
                SelectItem::Asterisk => {
                    for column in &table.columns {
                        final_items.push((
                            Expression::Literal(Token {
                                value: column.clone(),
                                kind: TokenKind::Identifier,
                                loc: Location::default(),
                            }),
                            None,
                        ));
                    }
                }
                SelectItem::Expression { exp, alias } => {
                    final_items.push((exp.clone(), alias.clone()));
                }
            }
        }

        let eval_scalar = |exp: &Expression| -> Result<i32, StorageError> {
            let cell = match row_ids.first() {
                Some(&row_id) => table.eval_cell(row_id, exp)?.0,
                None => Table::anonymous().eval_cell(0, exp)?.0,
            };
            cell.as_int().ok_or(StorageError::InvalidOperands)
        };

        let limit = match &stmt.limit {
            Some(exp) => {
                let value = eval_scalar(exp)?;
                if value < 0 {
                    return Err(StorageError::NegativeLimit);
                }
                value as usize
            }
            None => row_ids.len(),
        };
        let offset = match &stmt.offset {
            Some(exp) => {
                let value = eval_scalar(exp)?;
                if value < 0 {
                    return Err(StorageError::NegativeOffset);
                }
                value as usize
            }
            None => 0,
        };

        let mut columns: Vec<ResultColumn> = Vec::new();
        let mut rows: Vec<Vec<MemoryCell>> = Vec::new();
        let mut surviving = 0usize;

        for &row_id in &row_ids {
            if let Some(where_clause) = &stmt.where_clause {
                let (cell, _, _) = table.eval_cell(row_id, where_clause)?;
                // NULL counts as not-true.
                if cell.as_bool() != Some(true) {
                    continue;
                }
            }

            // OFFSET skips before LIMIT counts.
            surviving += 1;
            if surviving <= offset {
                continue;
            }
            if rows.len() >= limit {
                break;
            }

            let is_first_row = rows.is_empty();
            let mut result = Vec::with_capacity(final_items.len());
            for (exp, alias) in &final_items {
                let (value, column_name, column_type) = table.eval_cell(row_id, exp)?;
                if is_first_row {
                    let name = match alias {
                        Some(alias) => alias.value.clone(),
                        None => column_name,
                    };
                    columns.push(ResultColumn {
                        name,
                        column_type,
                        not_null: false,
                    });
                }
                result.push(value);
            }
            rows.push(result);
        }

        // No surviving rows: the header still carries every item.
        if rows.is_empty() {
            columns.clear();
            for (exp, alias) in &final_items {
                let (name, column_type) = table.static_item_header(exp)?;
                let name = match alias {
                    Some(alias) => alias.value.clone(),
                    None => name,
                };
                columns.push(ResultColumn {
                    name,
                    column_type,
                    not_null: false,
                });
            }
        }

        Ok(Results { columns, rows })
    }

    /// Catalog metadata for every table, sorted by name. A column is
    /// not-null exactly when the table's primary-key index is keyed on it.
    pub fn get_tables(&self) -> Vec<TableMetadata> {
        let mut out = Vec::new();
        for (name, table) in &self.tables {
            let mut pkey_exp = String::new();
            let mut indexes = Vec::new();
            for index in &table.indexes {
                if index.primary_key {
                    pkey_exp = index.exp.generate_code();
                }
                indexes.push(IndexMetadata {
                    name: index.name.clone(),
                    exp: index.exp.generate_code(),
                    kind: index.kind.to_string(),
                    unique: index.unique,
                    primary_key: index.primary_key,
                });
            }

            let mut columns = Vec::new();
            for (i, column) in table.columns.iter().enumerate() {
                columns.push(ResultColumn {
                    name: column.clone(),
                    column_type: table.column_types[i],
                    not_null: pkey_exp == format!("\"{}\"", column),
                });
            }

            out.push(TableMetadata {
                name: name.clone(),
                columns,
                indexes,
            });
        }
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }
}
