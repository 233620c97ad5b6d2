//! Schema model
//!
//! Table and column metadata the validator checks statements against. The
//! schema is filled by its owner (tests, the shell registering CREATE TABLE
//! statements) and is only read while validating.

pub mod validate;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{Error, ErrorCode, Result};
use crate::parser::ast::{Ast, NodeId, NodeKind};
use crate::parser::tokenizer::TokenKind;

pub use validate::{validate, Diagnostic, DiagnosticKind, Validator};

// ============================================================================
// Data Types
// ============================================================================

/// Declared column type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Int,
    Varchar,
    Char,
    Text,
    Float,
    Double,
    Date,
    Boolean,
}

/// Family of literal values a column type accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Affinity {
    Integer,
    Real,
    Text,
    Date,
    Boolean,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Int => "INT",
            DataType::Varchar => "VARCHAR",
            DataType::Char => "CHAR",
            DataType::Text => "TEXT",
            DataType::Float => "FLOAT",
            DataType::Double => "DOUBLE",
            DataType::Date => "DATE",
            DataType::Boolean => "BOOLEAN",
        }
    }

    pub fn affinity(&self) -> Affinity {
        match self {
            DataType::Int => Affinity::Integer,
            DataType::Varchar | DataType::Char | DataType::Text => Affinity::Text,
            DataType::Float | DataType::Double => Affinity::Real,
            DataType::Date => Affinity::Date,
            DataType::Boolean => Affinity::Boolean,
        }
    }

    /// Check whether a literal of the given affinity may be stored in or
    /// compared with a column of this type.
    ///
    /// Integers widen to real columns and date literals are valid text.
    pub fn accepts(&self, literal: Affinity) -> bool {
        let column = self.affinity();
        column == literal
            || (column == Affinity::Real && literal == Affinity::Integer)
            || (column == Affinity::Text && literal == Affinity::Date)
    }
}

impl FromStr for DataType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "INT" | "INTEGER" => Ok(DataType::Int),
            "VARCHAR" => Ok(DataType::Varchar),
            "CHAR" => Ok(DataType::Char),
            "TEXT" => Ok(DataType::Text),
            "FLOAT" => Ok(DataType::Float),
            "DOUBLE" => Ok(DataType::Double),
            "DATE" => Ok(DataType::Date),
            "BOOLEAN" => Ok(DataType::Boolean),
            _ => Err(Error::with_message(
                ErrorCode::Schema,
                format!("unknown datatype: {}", s),
            )),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Affinity of a literal node, `None` for NULL and non-literals
pub fn literal_affinity(kind: NodeKind, token: Option<TokenKind>) -> Option<Affinity> {
    match kind {
        NodeKind::Number if token == Some(TokenKind::Double) => Some(Affinity::Real),
        NodeKind::Number => Some(Affinity::Integer),
        NodeKind::String => Some(Affinity::Text),
        NodeKind::Date => Some(Affinity::Date),
        NodeKind::Boolean => Some(Affinity::Boolean),
        _ => None,
    }
}

// ============================================================================
// Column Definition
// ============================================================================

/// Column in a table
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Column name
    pub name: String,
    /// Declared type
    pub datatype: DataType,
    /// Declared length, e.g. `VARCHAR(50)`
    pub length: Option<u32>,
    /// Part of the primary key
    pub is_primary_key: bool,
    /// UNIQUE constraint
    pub is_unique: bool,
    /// NOT NULL constraint
    pub is_not_null: bool,
    /// DEFAULT literal as written
    pub default: Option<String>,
}

impl Column {
    pub fn new(name: impl Into<String>, datatype: DataType) -> Self {
        Self {
            name: name.into(),
            datatype,
            length: None,
            is_primary_key: false,
            is_unique: false,
            is_not_null: false,
            default: None,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.is_primary_key = true;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.is_not_null = true;
        self
    }
}

// ============================================================================
// Table
// ============================================================================

/// Table metadata
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    /// Table name
    pub name: String,
    /// Columns in declaration order
    pub columns: Vec<Column>,
    /// Foreign keys: column name to `table.column`
    pub foreign_keys: HashMap<String, String>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Builder-style column addition
    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    /// Builder-style foreign key addition
    pub fn with_foreign_key(mut self, column: impl Into<String>, reference: impl Into<String>) -> Self {
        self.foreign_keys.insert(column.into(), reference.into());
        self
    }

    /// Get column by name (case-insensitive)
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns
            .iter_mut()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Foreign key target of a column (case-insensitive)
    pub fn foreign_key(&self, column: &str) -> Option<&str> {
        self.foreign_keys
            .iter()
            .find(|(c, _)| c.eq_ignore_ascii_case(column))
            .map(|(_, target)| target.as_str())
    }

    /// Build table metadata from a parsed CREATE TABLE statement
    pub fn from_create(ast: &Ast) -> Result<Table> {
        let query = ast
            .statement()
            .filter(|&q| ast.kind(q) == NodeKind::Query && ast.value(q) == "CREATE")
            .ok_or_else(|| schema_error("not a CREATE TABLE statement"))?;
        let name = ast
            .child_of_kind(query, NodeKind::Table)
            .map(|t| ast.value(t).to_string())
            .ok_or_else(|| schema_error("CREATE TABLE without a table name"))?;

        let mut table = Table::new(name);
        if let Some(columns) = ast.child_of_kind(query, NodeKind::Columns) {
            for &def in ast.children(columns) {
                table.add_definition(ast, def)?;
            }
        }

        for &constraint in ast.children(query) {
            if ast.kind(constraint) == NodeKind::Constraint {
                table.add_table_constraint(ast, constraint)?;
            }
        }

        if table.columns.is_empty() {
            return Err(schema_error(format!("table {} has no columns", table.name)));
        }
        Ok(table)
    }

    /// One `COLUMN: name TYPE` definition with its constraint children
    fn add_definition(&mut self, ast: &Ast, def: NodeId) -> Result<()> {
        let (name, type_name) = ast
            .value(def)
            .split_once(' ')
            .ok_or_else(|| schema_error(format!("malformed column definition: {}", ast.value(def))))?;
        if self.has_column(name) {
            return Err(schema_error(format!(
                "duplicate column {} in table {}",
                name, self.name
            )));
        }

        let mut column = Column::new(name, type_name.parse()?);
        for &child in ast.children(def) {
            match (ast.kind(child), ast.value(child)) {
                (NodeKind::Number, length) => {
                    column.length = length.parse().ok();
                }
                (NodeKind::Constraint, "PRIMARY_KEY") => column.is_primary_key = true,
                (NodeKind::Constraint, "NOT_NULL") => column.is_not_null = true,
                (NodeKind::Constraint, "UNIQUE") => column.is_unique = true,
                (NodeKind::Constraint, "FOREIGN_KEY") => {
                    if let Some(reference) = ast.child_of_kind(child, NodeKind::Reference) {
                        self.foreign_keys
                            .insert(name.to_string(), ast.value(reference).to_string());
                    }
                }
                (NodeKind::Constraint, "DEFAULT") => {
                    column.default = ast
                        .child(child, 0)
                        .and_then(|value| ast.child(value, 0))
                        .map(|literal| ast.value(literal).to_string());
                }
                _ => {}
            }
        }

        self.columns.push(column);
        Ok(())
    }

    /// Table-level `PRIMARY KEY (..)` or `FOREIGN KEY (..) REFERENCES ..`
    fn add_table_constraint(&mut self, ast: &Ast, constraint: NodeId) -> Result<()> {
        let columns: Vec<String> = ast
            .children(constraint)
            .iter()
            .filter(|&&c| ast.kind(c) == NodeKind::Column)
            .map(|&c| ast.value(c).to_string())
            .collect();
        for name in &columns {
            if !self.has_column(name) {
                return Err(schema_error(format!(
                    "constraint names unknown column {} in table {}",
                    name, self.name
                )));
            }
        }

        match ast.value(constraint) {
            "PRIMARY_KEY" => {
                for name in &columns {
                    if let Some(column) = self.column_mut(name) {
                        column.is_primary_key = true;
                    }
                }
            }
            "FOREIGN_KEY" => {
                if let Some(reference) = ast.child_of_kind(constraint, NodeKind::Reference) {
                    for name in columns {
                        self.foreign_keys
                            .insert(name, ast.value(reference).to_string());
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }
}

fn schema_error(message: impl Into<String>) -> Error {
    Error::with_message(ErrorCode::Schema, message)
}

// ============================================================================
// Schema
// ============================================================================

/// Catalog of known tables
#[derive(Debug, Clone, Default)]
pub struct Schema {
    /// Tables keyed by lower-cased name
    tables: HashMap<String, Arc<Table>>,
}

impl Schema {
    /// Create a new empty schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table; names are unique regardless of case
    pub fn add_table(&mut self, table: Table) -> Result<()> {
        let key = table.name.to_lowercase();
        if self.tables.contains_key(&key) {
            return Err(Error::with_message(
                ErrorCode::Exists,
                format!("table {} already exists", table.name),
            ));
        }
        tracing::debug!(target: "toysql.validate", table = %table.name, "table registered");
        self.tables.insert(key, Arc::new(table));
        Ok(())
    }

    /// Check if table exists
    pub fn table_exists(&self, name: &str) -> bool {
        self.tables.contains_key(&name.to_lowercase())
    }

    /// Get table by name (case-insensitive)
    pub fn table(&self, name: &str) -> Option<Arc<Table>> {
        self.tables.get(&name.to_lowercase()).cloned()
    }

    /// Borrow a table by name (case-insensitive)
    pub fn get_table(&self, name: &str) -> Option<&Table> {
        self.tables.get(&name.to_lowercase()).map(|t| t.as_ref())
    }

    /// All tables ordered by name
    pub fn tables(&self) -> Vec<&Table> {
        let mut tables: Vec<&Table> = self.tables.values().map(|t| t.as_ref()).collect();
        tables.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        tables
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Table: {}", self.name)?;
        for column in &self.columns {
            let datatype = match column.length {
                Some(length) => format!("{}({})", column.datatype, length),
                None => column.datatype.to_string(),
            };
            writeln!(
                f,
                "  Column: {} (Type: {}, PrimaryKey: {}, Unique: {}, NotNull: {})",
                column.name, datatype, column.is_primary_key, column.is_unique, column.is_not_null
            )?;
        }
        let mut foreign_keys: Vec<_> = self.foreign_keys.iter().collect();
        foreign_keys.sort();
        for (column, target) in foreign_keys {
            writeln!(f, "  ForeignKey: {} -> {}", column, target)?;
        }
        Ok(())
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for table in self.tables() {
            write!(f, "{}", table)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::grammar::parse;
    use crate::parser::tokenizer::tokenize;

    fn users() -> Table {
        Table::new("users")
            .with_column(Column::new("id", DataType::Int).primary_key())
            .with_column(Column::new("name", DataType::Varchar).not_null())
    }

    #[test]
    fn test_datatype_from_str() {
        assert_eq!("int".parse::<DataType>().unwrap(), DataType::Int);
        assert_eq!("INTEGER".parse::<DataType>().unwrap(), DataType::Int);
        assert_eq!("Double".parse::<DataType>().unwrap(), DataType::Double);
        assert_eq!("BLOB".parse::<DataType>().unwrap_err().code, ErrorCode::Schema);
    }

    #[test]
    fn test_datatype_accepts() {
        assert!(DataType::Int.accepts(Affinity::Integer));
        assert!(!DataType::Int.accepts(Affinity::Text));
        assert!(!DataType::Int.accepts(Affinity::Real));
        assert!(DataType::Double.accepts(Affinity::Integer));
        assert!(DataType::Varchar.accepts(Affinity::Date));
        assert!(!DataType::Date.accepts(Affinity::Text));
        assert!(DataType::Boolean.accepts(Affinity::Boolean));
    }

    #[test]
    fn test_literal_affinity() {
        assert_eq!(
            literal_affinity(NodeKind::Number, Some(TokenKind::Number)),
            Some(Affinity::Integer)
        );
        assert_eq!(
            literal_affinity(NodeKind::Number, Some(TokenKind::Double)),
            Some(Affinity::Real)
        );
        assert_eq!(literal_affinity(NodeKind::Null, None), None);
        assert_eq!(literal_affinity(NodeKind::Column, None), None);
    }

    #[test]
    fn test_add_and_lookup_table() {
        let mut schema = Schema::new();
        schema.add_table(users()).unwrap();
        assert!(schema.table_exists("users"));
        assert!(schema.table_exists("USERS"));
        assert!(!schema.table_exists("orders"));

        let table = schema.get_table("Users").unwrap();
        assert_eq!(table.column("NAME").unwrap().datatype, DataType::Varchar);
        assert!(table.column("email").is_none());
        assert_eq!(schema.table("users").unwrap().columns.len(), 2);
    }

    #[test]
    fn test_add_duplicate_table() {
        let mut schema = Schema::new();
        schema.add_table(users()).unwrap();
        let err = schema.add_table(Table::new("USERS")).unwrap_err();
        assert_eq!(err.code, ErrorCode::Exists);
        assert_eq!(schema.len(), 1);
    }

    #[test]
    fn test_from_create() {
        let ast = parse(tokenize(
            "CREATE TABLE orders (id INT PRIMARY KEY, user_id INT NOT NULL REFERENCES users (id), \
             note VARCHAR(200) DEFAULT 'none', placed DATE UNIQUE);",
        ))
        .unwrap();
        let table = Table::from_create(&ast).unwrap();
        assert_eq!(table.name, "orders");
        let names: Vec<&str> = table.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "user_id", "note", "placed"]);

        assert!(table.column("id").unwrap().is_primary_key);
        assert!(table.column("user_id").unwrap().is_not_null);
        assert_eq!(table.foreign_key("user_id"), Some("users.id"));
        let note = table.column("note").unwrap();
        assert_eq!(note.length, Some(200));
        assert_eq!(note.default.as_deref(), Some("none"));
        assert!(table.column("placed").unwrap().is_unique);
    }

    #[test]
    fn test_from_create_table_constraints() {
        let ast = parse(tokenize(
            "CREATE TABLE o (id INT, uid INT, PRIMARY KEY (id), FOREIGN KEY (uid) REFERENCES users (id))",
        ))
        .unwrap();
        let table = Table::from_create(&ast).unwrap();
        assert!(table.column("id").unwrap().is_primary_key);
        assert_eq!(table.foreign_key("uid"), Some("users.id"));
    }

    #[test]
    fn test_from_create_rejects_bad_trees() {
        let ast = parse(tokenize("SELECT * FROM t")).unwrap();
        assert_eq!(Table::from_create(&ast).unwrap_err().code, ErrorCode::Schema);

        let ast = parse(tokenize("CREATE TABLE t (a INT, A TEXT)")).unwrap();
        assert!(Table::from_create(&ast).is_err());

        let ast = parse(tokenize("CREATE TABLE t (a INT, PRIMARY KEY (b))")).unwrap();
        assert!(Table::from_create(&ast).is_err());
    }

    #[test]
    fn test_schema_display() {
        let mut schema = Schema::new();
        schema
            .add_table(
                Table::new("orders")
                    .with_column(Column::new("user_id", DataType::Int))
                    .with_foreign_key("user_id", "users.id"),
            )
            .unwrap();
        schema.add_table(users()).unwrap();

        let text = schema.to_string();
        let expected = "Table: orders\n\
                        \x20 Column: user_id (Type: INT, PrimaryKey: false, Unique: false, NotNull: false)\n\
                        \x20 ForeignKey: user_id -> users.id\n\
                        Table: users\n\
                        \x20 Column: id (Type: INT, PrimaryKey: true, Unique: false, NotNull: false)\n\
                        \x20 Column: name (Type: VARCHAR, PrimaryKey: false, Unique: false, NotNull: true)\n";
        assert_eq!(text, expected);
    }
}
