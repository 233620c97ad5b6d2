//! Semantic validation of syntax trees against a schema
//!
//! Walks every node of a parsed statement and records a `Diagnostic` for
//! each reference the schema cannot satisfy. Validation never stops early:
//! one statement can produce many diagnostics.
//!
//! Column references are resolved through scopes. Each QUERY or SELECT node
//! is a scope whose bindings are the tables it reads (FROM and JOIN tables,
//! derived tables, the target of INSERT/UPDATE/DELETE) plus their aliases.
//! A reference is looked up in its nearest scope first, then in enclosing
//! scopes, so correlated subqueries resolve against the outer statement.

use std::fmt;

use crate::parser::ast::{Ast, NodeId, NodeKind, WalkResult};
use crate::schema::{literal_affinity, Column, Schema, Table};

// ============================================================================
// Diagnostics
// ============================================================================

/// Kind of validation finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    UnknownTable,
    UnknownColumn,
    TypeMismatch,
    InvalidForeignKey,
    MissingReference,
    /// INSERT row width differs from the column list or table
    ValueCountMismatch,
    /// NULL written to, or no value supplied for, a NOT NULL column
    NotNullViolation,
}

impl DiagnosticKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticKind::UnknownTable => "unknown table",
            DiagnosticKind::UnknownColumn => "unknown column",
            DiagnosticKind::TypeMismatch => "type mismatch",
            DiagnosticKind::InvalidForeignKey => "invalid foreign key",
            DiagnosticKind::MissingReference => "missing reference",
            DiagnosticKind::ValueCountMismatch => "value count mismatch",
            DiagnosticKind::NotNullViolation => "not null violation",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A non-fatal validation finding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// Kind of the offending node
    pub node: NodeKind,
    /// Value of the offending node
    pub value: String,
    /// Table the offending node was resolved against, when known
    pub table: Option<String>,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

// ============================================================================
// Name Resolution
// ============================================================================

/// A table visible in a scope
#[derive(Debug, Clone, Copy)]
struct Binding<'a> {
    /// Table name as written, `None` for derived tables
    name: Option<&'a str>,
    alias: Option<&'a str>,
    /// Schema entry, `None` for derived or unknown tables
    table: Option<&'a Table>,
}

impl Binding<'_> {
    fn matches(&self, qualifier: &str) -> bool {
        match self.alias {
            Some(alias) => alias.eq_ignore_ascii_case(qualifier),
            None => self
                .name
                .is_some_and(|name| name.eq_ignore_ascii_case(qualifier)),
        }
    }

    /// Columns of this binding cannot be checked
    fn is_opaque(&self) -> bool {
        self.table.is_none()
    }
}

/// Outcome of resolving one column reference
enum Resolution<'a> {
    Resolved(&'a Table, &'a Column),
    /// Qualifier names no table or alias in scope
    TableNotFound(String),
    /// Column absent from the table(s) it must belong to
    ColumnNotFound(Option<String>),
    /// Bound to a derived table, an unknown table or a select-list alias
    Opaque,
}

// ============================================================================
// Validator
// ============================================================================

/// Schema validator
pub struct Validator<'a> {
    schema: &'a Schema,
}

impl<'a> Validator<'a> {
    pub fn new(schema: &'a Schema) -> Self {
        Validator { schema }
    }

    /// Validate a syntax tree, returning every finding
    pub fn validate(&self, ast: &Ast) -> Vec<Diagnostic> {
        let span = tracing::debug_span!(
            target: "toysql.validate",
            "validate",
            nodes_visited = tracing::field::Empty,
            diagnostics = tracing::field::Empty,
        );
        let _guard = span.enter();

        let mut pass = Pass {
            schema: self.schema,
            ast,
            scope_index: ScopeIndex::build(ast),
            diagnostics: Vec::new(),
            nodes_visited: 0,
        };
        ast.walk(ast.root(), |_, id, _| {
            pass.visit(id);
            WalkResult::Continue
        });

        span.record("nodes_visited", pass.nodes_visited);
        span.record("diagnostics", pass.diagnostics.len() as u64);
        pass.diagnostics
    }
}

/// Validate a syntax tree against a schema
pub fn validate(ast: &Ast, schema: &Schema) -> Vec<Diagnostic> {
    Validator::new(schema).validate(ast)
}

/// Per-node scope information, filled in one pre-order pass
struct ScopeIndex {
    /// Nearest enclosing QUERY/SELECT of each node
    enclosing: Vec<Option<NodeId>>,
    /// Child of the enclosing scope that contains each node
    clause: Vec<Option<NodeId>>,
}

impl ScopeIndex {
    fn build(ast: &Ast) -> Self {
        let mut enclosing = vec![None; ast.len()];
        let mut clause = vec![None; ast.len()];
        ast.walk(ast.root(), |ast, id, _| {
            if let Some(parent) = ast.parent(id) {
                if ast.kind(parent).is_scope() {
                    enclosing[id.index()] = Some(parent);
                    clause[id.index()] = Some(id);
                } else {
                    enclosing[id.index()] = enclosing[parent.index()];
                    clause[id.index()] = clause[parent.index()];
                }
            }
            WalkResult::Continue
        });
        ScopeIndex { enclosing, clause }
    }

    fn enclosing(&self, id: NodeId) -> Option<NodeId> {
        self.enclosing.get(id.index()).copied().flatten()
    }

    fn clause(&self, id: NodeId) -> Option<NodeId> {
        self.clause.get(id.index()).copied().flatten()
    }
}

/// State for one validation run
struct Pass<'a> {
    schema: &'a Schema,
    ast: &'a Ast,
    scope_index: ScopeIndex,
    diagnostics: Vec<Diagnostic>,
    nodes_visited: u64,
}

impl<'a> Pass<'a> {
    fn visit(&mut self, id: NodeId) {
        self.nodes_visited += 1;
        let ast = self.ast;

        match ast.kind(id) {
            NodeKind::Table => self.check_table(id),
            NodeKind::Column => self.check_column(id),
            NodeKind::Comparison => {
                if let (Some(left), Some(right)) = (ast.child(id, 0), ast.child(id, 2)) {
                    self.check_operands(left, right);
                    self.check_operands(right, left);
                }
            }
            NodeKind::Assign => self.check_assignment(id),
            NodeKind::In => {
                if let (Some(left), Some(list)) = (ast.child(id, 0), ast.child(id, 1)) {
                    if ast.kind(list) == NodeKind::ValueList {
                        for &value in ast.children(list) {
                            self.check_operands(left, value);
                        }
                    }
                }
            }
            NodeKind::Between => {
                if let Some(left) = ast.child(id, 0) {
                    for &bound in ast.children(id).iter().skip(1) {
                        self.check_operands(left, bound);
                    }
                }
            }
            NodeKind::Constraint => {
                if ast.value(id) == "FOREIGN_KEY" {
                    self.check_foreign_key(id);
                }
            }
            NodeKind::Values => self.check_insert(id),
            NodeKind::Root
            | NodeKind::Query
            | NodeKind::Select
            | NodeKind::SelectList
            | NodeKind::Wildcard
            | NodeKind::Alias
            | NodeKind::Function
            | NodeKind::Args
            | NodeKind::From
            | NodeKind::Join
            | NodeKind::JoinType
            | NodeKind::On
            | NodeKind::Where
            | NodeKind::Condition
            | NodeKind::LogicalOp
            | NodeKind::Group
            | NodeKind::Operator
            | NodeKind::Like
            | NodeKind::Is
            | NodeKind::Not
            | NodeKind::Exists
            | NodeKind::ValueList
            | NodeKind::Number
            | NodeKind::String
            | NodeKind::Date
            | NodeKind::Boolean
            | NodeKind::Null
            | NodeKind::GroupBy
            | NodeKind::Having
            | NodeKind::OrderBy
            | NodeKind::OrderExpr
            | NodeKind::Direction
            | NodeKind::Limit
            | NodeKind::Value
            | NodeKind::Set
            | NodeKind::Left
            | NodeKind::Right
            | NodeKind::Reference
            | NodeKind::Columns
            | NodeKind::Distinct => {}
        }
    }

    // ========================================================================
    // Node Checks
    // ========================================================================

    fn check_table(&mut self, id: NodeId) {
        if self.in_create(id) {
            return;
        }
        let ast = self.ast;
        let name = ast.value(id);
        if !self.schema.table_exists(name) {
            self.report(
                DiagnosticKind::UnknownTable,
                id,
                None,
                format!("table '{}' does not exist", name),
            );
        }
    }

    fn check_column(&mut self, id: NodeId) {
        if self.in_create(id) {
            return;
        }
        let ast = self.ast;
        let value = ast.value(id);
        match self.resolve(id) {
            Resolution::Resolved(..) | Resolution::Opaque => {}
            Resolution::TableNotFound(qualifier) => {
                let message = format!("no table or alias '{}' for column '{}'", qualifier, value);
                self.report(DiagnosticKind::UnknownTable, id, Some(qualifier), message);
            }
            Resolution::ColumnNotFound(table) => {
                let message = match &table {
                    Some(table) => format!("column '{}' does not exist in table '{}'", value, table),
                    None => format!("column '{}' does not exist", value),
                };
                self.report(DiagnosticKind::UnknownColumn, id, table, message);
            }
        }
    }

    /// Type agreement between a column operand and a literal operand
    fn check_operands(&mut self, column: NodeId, literal: NodeId) {
        if self.ast.kind(column) != NodeKind::Column {
            return;
        }
        if let Resolution::Resolved(table, col) = self.resolve(column) {
            self.check_literal(table, col, literal);
        }
    }

    fn check_literal(&mut self, table: &Table, column: &Column, literal: NodeId) {
        let ast = self.ast;
        let node = ast.node(literal);
        let Some(affinity) = literal_affinity(node.kind, node.token) else {
            return;
        };
        if !column.datatype.accepts(affinity) {
            let message = format!(
                "column '{}.{}' is {} but {} '{}' was given",
                table.name, column.name, column.datatype, node.kind, node.value
            );
            self.report(
                DiagnosticKind::TypeMismatch,
                literal,
                Some(table.name.clone()),
                message,
            );
        }
    }

    /// Reject NULL literals for NOT NULL columns
    fn check_not_null(&mut self, table: &Table, column: &Column, literal: NodeId) {
        if column.is_not_null && self.ast.kind(literal) == NodeKind::Null {
            let message = format!(
                "column '{}.{}' cannot be NULL",
                table.name, column.name
            );
            self.report(
                DiagnosticKind::NotNullViolation,
                literal,
                Some(table.name.clone()),
                message,
            );
        }
    }

    fn check_assignment(&mut self, id: NodeId) {
        let ast = self.ast;
        let target = ast
            .child_of_kind(id, NodeKind::Left)
            .and_then(|left| ast.child(left, 0));
        let value = ast
            .child_of_kind(id, NodeKind::Right)
            .and_then(|right| ast.child(right, 0));
        if let (Some(target), Some(value)) = (target, value) {
            if let Resolution::Resolved(table, column) = self.resolve(target) {
                self.check_literal(table, column, value);
                self.check_not_null(table, column, value);
            }
        }
    }

    /// Row widths, literal types and NOT NULL columns of INSERT ... VALUES
    fn check_insert(&mut self, values: NodeId) {
        let ast = self.ast;
        let schema = self.schema;
        let Some(query) = ast.parent(values) else {
            return;
        };
        let Some(table) = ast
            .child_of_kind(query, NodeKind::Table)
            .and_then(|t| schema.get_table(ast.value(t)))
        else {
            return;
        };

        // Target columns: the explicit list, or every column in order
        let targets: Vec<Option<&Column>> = match ast.child_of_kind(query, NodeKind::Columns) {
            Some(list) => ast
                .children(list)
                .iter()
                .map(|&c| table.column(ast.value(c)))
                .collect(),
            None => table.columns.iter().map(Some).collect(),
        };

        if let Some(list) = ast.child_of_kind(query, NodeKind::Columns) {
            for column in &table.columns {
                let listed = ast
                    .children(list)
                    .iter()
                    .any(|&c| ast.value(c).eq_ignore_ascii_case(&column.name));
                if column.is_not_null && column.default.is_none() && !listed {
                    let message = format!(
                        "no value supplied for NOT NULL column '{}.{}'",
                        table.name, column.name
                    );
                    self.report(
                        DiagnosticKind::NotNullViolation,
                        list,
                        Some(table.name.clone()),
                        message,
                    );
                }
            }
        }

        for &row in ast.children(values) {
            let width = ast.children(row).len();
            if width != targets.len() {
                let message = format!(
                    "{} values given for {} columns of table '{}'",
                    width,
                    targets.len(),
                    table.name
                );
                self.report(
                    DiagnosticKind::ValueCountMismatch,
                    row,
                    Some(table.name.clone()),
                    message,
                );
                continue;
            }
            for (&value, target) in ast.children(row).iter().zip(&targets) {
                if let Some(column) = target {
                    self.check_literal(table, column, value);
                    self.check_not_null(table, column, value);
                }
            }
        }
    }

    /// FOREIGN_KEY constraints need exactly one well-formed REFERENCE
    fn check_foreign_key(&mut self, id: NodeId) {
        let ast = self.ast;
        let defined = self.defined_table();
        let references: Vec<NodeId> = ast
            .children(id)
            .iter()
            .copied()
            .filter(|&c| ast.kind(c) == NodeKind::Reference)
            .collect();

        let reference = match references.as_slice() {
            [] => {
                self.report(
                    DiagnosticKind::MissingReference,
                    id,
                    defined.map(|(_, name)| name.to_string()),
                    "FOREIGN KEY has no REFERENCES clause".to_string(),
                );
                return;
            }
            [reference] => *reference,
            [_, extra, ..] => {
                self.report(
                    DiagnosticKind::InvalidForeignKey,
                    *extra,
                    None,
                    "FOREIGN KEY has more than one REFERENCES clause".to_string(),
                );
                return;
            }
        };

        let target = ast.value(reference);
        let Some((table_name, column_name)) = target
            .split_once('.')
            .filter(|(t, c)| !t.is_empty() && !c.is_empty())
        else {
            self.report(
                DiagnosticKind::InvalidForeignKey,
                reference,
                None,
                format!("malformed reference '{}'", target),
            );
            return;
        };

        // A table may reference its own columns while being created
        if let Some((query, name)) = defined {
            if name.eq_ignore_ascii_case(table_name) {
                if !self.defines_column(query, column_name) {
                    self.report(
                        DiagnosticKind::InvalidForeignKey,
                        reference,
                        Some(table_name.to_string()),
                        format!("referenced column '{}' does not exist", target),
                    );
                }
                return;
            }
        }

        match self.schema.get_table(table_name) {
            None => self.report(
                DiagnosticKind::InvalidForeignKey,
                reference,
                Some(table_name.to_string()),
                format!("referenced table '{}' does not exist", table_name),
            ),
            Some(table) if !table.has_column(column_name) => self.report(
                DiagnosticKind::InvalidForeignKey,
                reference,
                Some(table.name.clone()),
                format!("referenced column '{}' does not exist", target),
            ),
            Some(_) => {}
        }
    }

    // ========================================================================
    // Scopes
    // ========================================================================

    /// Resolve a COLUMN node to its table and column
    fn resolve(&self, id: NodeId) -> Resolution<'a> {
        let value = self.ast.value(id);
        match value.split_once('.') {
            Some((qualifier, name)) => self.resolve_qualified(id, qualifier, name),
            None => self.resolve_unqualified(id, value),
        }
    }

    fn resolve_qualified(&self, id: NodeId, qualifier: &str, name: &str) -> Resolution<'a> {
        for scope in self.visible_scopes(id) {
            if let Some(binding) = self.bindings(scope).into_iter().find(|b| b.matches(qualifier)) {
                return match binding.table {
                    None => Resolution::Opaque,
                    Some(table) => match table.column(name) {
                        Some(column) => Resolution::Resolved(table, column),
                        None => Resolution::ColumnNotFound(Some(table.name.clone())),
                    },
                };
            }
        }
        Resolution::TableNotFound(qualifier.to_string())
    }

    fn resolve_unqualified(&self, id: NodeId, name: &str) -> Resolution<'a> {
        let mut nearest: Option<String> = None;
        for (i, scope) in self.visible_scopes(id).enumerate() {
            let bindings = self.bindings(scope);
            for binding in &bindings {
                if let Some(table) = binding.table {
                    if let Some(column) = table.column(name) {
                        return Resolution::Resolved(table, column);
                    }
                }
            }
            if bindings.iter().any(|b| b.is_opaque()) {
                return Resolution::Opaque;
            }
            // Select-list aliases are visible to the clauses after the list
            if i == 0 && !self.in_select_list(id) && self.is_select_alias(scope, name) {
                return Resolution::Opaque;
            }
            if nearest.is_none() {
                nearest = bindings
                    .first()
                    .and_then(|b| b.table)
                    .map(|t| t.name.clone());
            }
        }
        Resolution::ColumnNotFound(nearest)
    }

    /// Enclosing QUERY/SELECT nodes, nearest first
    fn scopes(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.scope_index.enclosing(id), move |&scope| {
            self.scope_index.enclosing(scope)
        })
    }

    /// Scopes a reference may resolve against. A derived table in FROM or
    /// JOIN cannot see the query it is nested in.
    fn visible_scopes(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let mut open = true;
        self.scopes(id).take_while(move |&scope| {
            let visible = open;
            open = !self.is_derived(scope);
            visible
        })
    }

    fn is_derived(&self, scope: NodeId) -> bool {
        let ast = self.ast;
        ast.kind(scope) == NodeKind::Select
            && ast
                .parent(scope)
                .is_some_and(|p| matches!(ast.kind(p), NodeKind::From | NodeKind::Join))
    }

    fn in_select_list(&self, id: NodeId) -> bool {
        self.scope_index
            .clause(id)
            .is_some_and(|clause| self.ast.kind(clause) == NodeKind::SelectList)
    }

    /// Tables visible in a scope
    fn bindings(&self, scope: NodeId) -> Vec<Binding<'a>> {
        let ast = self.ast;
        let mut bindings = Vec::new();
        for &child in ast.children(scope) {
            match ast.kind(child) {
                NodeKind::Table => bindings.push(self.binding(child)),
                NodeKind::From => {
                    for &source in ast.children(child) {
                        match ast.kind(source) {
                            NodeKind::Table | NodeKind::Select => {
                                bindings.push(self.binding(source))
                            }
                            NodeKind::Join => {
                                for &joined in ast.children(source) {
                                    if matches!(ast.kind(joined), NodeKind::Table | NodeKind::Select) {
                                        bindings.push(self.binding(joined));
                                    }
                                }
                            }
                            _ => {}
                        }
                    }
                }
                _ => {}
            }
        }
        bindings
    }

    fn binding(&self, source: NodeId) -> Binding<'a> {
        let ast = self.ast;
        let alias = ast
            .child_of_kind(source, NodeKind::Alias)
            .map(|a| ast.value(a));
        if ast.kind(source) == NodeKind::Table {
            let name = ast.value(source);
            Binding {
                name: Some(name),
                alias,
                table: self.schema.get_table(name),
            }
        } else {
            Binding {
                name: None,
                alias,
                table: None,
            }
        }
    }

    /// Check for a select-list alias of this name in the scope
    fn is_select_alias(&self, scope: NodeId, name: &str) -> bool {
        let ast = self.ast;
        let Some(list) = ast.child_of_kind(scope, NodeKind::SelectList) else {
            return false;
        };
        ast.children(list).iter().any(|&item| {
            ast.child_of_kind(item, NodeKind::Alias)
                .is_some_and(|alias| ast.value(alias).eq_ignore_ascii_case(name))
        })
    }

    /// Inside a CREATE TABLE statement, where names are definitions
    fn in_create(&self, id: NodeId) -> bool {
        self.scopes(id)
            .next()
            .is_some_and(|scope| self.ast.value(scope) == "CREATE")
    }

    /// QUERY node and table name of the CREATE TABLE being validated
    fn defined_table(&self) -> Option<(NodeId, &'a str)> {
        let ast = self.ast;
        let query = ast.statement().filter(|&q| ast.value(q) == "CREATE")?;
        let table = ast.child_of_kind(query, NodeKind::Table)?;
        Some((query, ast.value(table)))
    }

    fn defines_column(&self, query: NodeId, name: &str) -> bool {
        let ast = self.ast;
        ast.child_of_kind(query, NodeKind::Columns)
            .is_some_and(|columns| {
                ast.children(columns).iter().any(|&def| {
                    ast.value(def)
                        .split(' ')
                        .next()
                        .is_some_and(|n| n.eq_ignore_ascii_case(name))
                })
            })
    }

    fn report(&mut self, kind: DiagnosticKind, id: NodeId, table: Option<String>, message: String) {
        let ast = self.ast;
        let node = ast.node(id);
        tracing::warn!(
            target: "toysql.validate",
            kind = %kind,
            node = %node.kind,
            value = %node.value,
            "{}",
            message
        );
        self.diagnostics.push(Diagnostic {
            kind,
            node: node.kind,
            value: node.value.clone(),
            table,
            message,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::grammar::parse;
    use crate::parser::tokenizer::{tokenize, TokenKind};
    use crate::schema::{Column, DataType, Table};

    fn schema() -> Schema {
        let mut schema = Schema::new();
        schema
            .add_table(
                Table::new("users")
                    .with_column(Column::new("id", DataType::Int).primary_key())
                    .with_column(Column::new("name", DataType::Varchar).not_null())
                    .with_column(Column::new("age", DataType::Int))
                    .with_column(Column::new("email", DataType::Text))
                    .with_column(Column::new("balance", DataType::Double))
                    .with_column(Column::new("joined", DataType::Date))
                    .with_column(Column::new("active", DataType::Boolean)),
            )
            .unwrap();
        schema
            .add_table(
                Table::new("orders")
                    .with_column(Column::new("id", DataType::Int).primary_key())
                    .with_column(Column::new("user_id", DataType::Int))
                    .with_column(Column::new("total", DataType::Double))
                    .with_column(Column::new("placed", DataType::Date))
                    .with_foreign_key("user_id", "users.id"),
            )
            .unwrap();
        schema
    }

    fn check_against(sql: &str, schema: &Schema) -> Vec<Diagnostic> {
        let ast = parse(tokenize(sql)).unwrap();
        validate(&ast, schema)
    }

    fn check(sql: &str) -> Vec<Diagnostic> {
        check_against(sql, &schema())
    }

    fn kinds(diagnostics: &[Diagnostic]) -> Vec<DiagnosticKind> {
        diagnostics.iter().map(|d| d.kind).collect()
    }

    #[test]
    fn test_valid_select() {
        assert!(check("SELECT id, name FROM users WHERE age > 25;").is_empty());
        assert!(check("SELECT * FROM users WHERE email IS NULL AND active = TRUE").is_empty());
        assert!(check("SELECT * FROM users WHERE joined = '2024-01-31'").is_empty());
    }

    #[test]
    fn test_unknown_table() {
        let diagnostics = check("SELECT * FROM customers");
        assert_eq!(kinds(&diagnostics), vec![DiagnosticKind::UnknownTable]);
        assert_eq!(diagnostics[0].node, NodeKind::Table);
        assert_eq!(diagnostics[0].value, "customers");
    }

    #[test]
    fn test_unknown_table_does_not_cascade() {
        let diagnostics = check("SELECT foo FROM ghosts WHERE bar = 1");
        assert_eq!(kinds(&diagnostics), vec![DiagnosticKind::UnknownTable]);
    }

    #[test]
    fn test_unknown_column() {
        let diagnostics = check("SELECT nickname FROM users");
        assert_eq!(kinds(&diagnostics), vec![DiagnosticKind::UnknownColumn]);
        assert_eq!(diagnostics[0].value, "nickname");
        assert_eq!(diagnostics[0].table.as_deref(), Some("users"));
    }

    #[test]
    fn test_type_mismatch() {
        let diagnostics = check("SELECT * FROM users WHERE age = 'old'");
        assert_eq!(kinds(&diagnostics), vec![DiagnosticKind::TypeMismatch]);
        assert_eq!(diagnostics[0].node, NodeKind::String);
        assert_eq!(diagnostics[0].value, "old");
        assert_eq!(diagnostics[0].table.as_deref(), Some("users"));

        let diagnostics = check("SELECT * FROM users WHERE 'old' = age");
        assert_eq!(kinds(&diagnostics), vec![DiagnosticKind::TypeMismatch]);
    }

    #[test]
    fn test_numeric_agreement() {
        assert!(check("SELECT * FROM users WHERE balance > 100").is_empty());
        assert!(check("SELECT * FROM users WHERE balance > -1500.50").is_empty());
        assert_eq!(
            kinds(&check("SELECT * FROM users WHERE age > 1.5")),
            vec![DiagnosticKind::TypeMismatch]
        );
        assert!(check("SELECT * FROM users WHERE age = NULL").is_empty());
    }

    #[test]
    fn test_in_and_between_types() {
        assert_eq!(
            kinds(&check("SELECT * FROM users WHERE age IN (1, 'two', 3)")),
            vec![DiagnosticKind::TypeMismatch]
        );
        assert_eq!(
            kinds(&check(
                "SELECT * FROM users WHERE joined BETWEEN '2024-01-01' AND 5"
            )),
            vec![DiagnosticKind::TypeMismatch]
        );
    }

    #[test]
    fn test_multiple_diagnostics() {
        let diagnostics = check("SELECT nick FROM users WHERE age = 'x' AND ghost = 1");
        assert_eq!(
            kinds(&diagnostics),
            vec![
                DiagnosticKind::UnknownColumn,
                DiagnosticKind::TypeMismatch,
                DiagnosticKind::UnknownColumn,
            ]
        );
    }

    #[test]
    fn test_join_resolution() {
        assert!(check(
            "SELECT u.name, o.total FROM users u LEFT JOIN orders o ON u.id = o.user_id \
             WHERE o.total > 10.5"
        )
        .is_empty());

        let diagnostics = check("SELECT u.name FROM users u JOIN orders o ON u.id = o.missing");
        assert_eq!(kinds(&diagnostics), vec![DiagnosticKind::UnknownColumn]);
        assert_eq!(diagnostics[0].table.as_deref(), Some("orders"));

        // Unqualified names search every joined table
        assert!(check("SELECT name, total FROM users JOIN orders ON users.id = user_id").is_empty());
    }

    #[test]
    fn test_join_condition_types() {
        let diagnostics =
            check("SELECT * FROM users u JOIN orders o ON o.placed = 42");
        assert_eq!(kinds(&diagnostics), vec![DiagnosticKind::TypeMismatch]);
        assert_eq!(diagnostics[0].table.as_deref(), Some("orders"));
    }

    #[test]
    fn test_unknown_qualifier() {
        let diagnostics = check("SELECT x.name FROM users u");
        assert_eq!(kinds(&diagnostics), vec![DiagnosticKind::UnknownTable]);
        assert_eq!(diagnostics[0].node, NodeKind::Column);
        assert_eq!(diagnostics[0].table.as_deref(), Some("x"));
    }

    #[test]
    fn test_correlated_subquery() {
        assert!(check(
            "SELECT name FROM users u WHERE EXISTS \
             (SELECT * FROM orders o WHERE o.user_id = u.id)"
        )
        .is_empty());
        assert!(check("SELECT * FROM users WHERE id IN (SELECT user_id FROM orders)").is_empty());
    }

    #[test]
    fn test_derived_table_is_opaque() {
        assert!(check("SELECT s.anything FROM (SELECT id FROM users) AS s").is_empty());
        let diagnostics = check("SELECT s.id FROM (SELECT nope FROM users) AS s");
        assert_eq!(kinds(&diagnostics), vec![DiagnosticKind::UnknownColumn]);
        assert_eq!(diagnostics[0].value, "nope");
        assert_eq!(diagnostics[0].table.as_deref(), Some("users"));
    }

    #[test]
    fn test_derived_table_cannot_see_outer_query() {
        let diagnostics = check(
            "SELECT * FROM orders o JOIN (SELECT id FROM users WHERE ghost = 1) d ON o.user_id = d.id",
        );
        assert_eq!(kinds(&diagnostics), vec![DiagnosticKind::UnknownColumn]);
        assert_eq!(diagnostics[0].value, "ghost");

        let diagnostics = check("SELECT * FROM orders o, (SELECT o.total FROM users) d");
        assert_eq!(kinds(&diagnostics), vec![DiagnosticKind::UnknownTable]);
        assert_eq!(diagnostics[0].table.as_deref(), Some("o"));
    }

    #[test]
    fn test_select_alias_resolves() {
        assert!(check("SELECT name AS n FROM users ORDER BY n").is_empty());
        assert!(check(
            "SELECT age, COUNT(*) AS c FROM users GROUP BY age HAVING COUNT(*) > 1 ORDER BY c DESC"
        )
        .is_empty());
    }

    #[test]
    fn test_select_alias_does_not_hide_list_columns() {
        let diagnostics = check("SELECT nope AS nope FROM users");
        assert_eq!(kinds(&diagnostics), vec![DiagnosticKind::UnknownColumn]);

        let diagnostics = check("SELECT name AS b, b FROM users");
        assert_eq!(kinds(&diagnostics), vec![DiagnosticKind::UnknownColumn]);
        assert_eq!(diagnostics[0].value, "b");

        assert!(check("SELECT name AS b FROM users ORDER BY b").is_empty());
    }

    #[test]
    fn test_long_condition_chain() {
        let terms: Vec<String> = (0..20_000).map(|i| format!("age = {}", i)).collect();
        let sql = format!("SELECT * FROM users WHERE {} AND nope = 1", terms.join(" AND "));
        let diagnostics = check(&sql);
        assert_eq!(kinds(&diagnostics), vec![DiagnosticKind::UnknownColumn]);
    }

    #[test]
    fn test_foreign_key_to_missing_table() {
        let diagnostics = check_against(
            "CREATE TABLE orders (id INT PRIMARY KEY, user_id INT FOREIGN_KEY REFERENCES users (id));",
            &Schema::new(),
        );
        assert_eq!(kinds(&diagnostics), vec![DiagnosticKind::InvalidForeignKey]);
        assert_eq!(diagnostics[0].value, "users.id");
    }

    #[test]
    fn test_foreign_key_targets() {
        assert!(check("CREATE TABLE notes (id INT, user_id INT REFERENCES users (id))").is_empty());
        assert_eq!(
            kinds(&check(
                "CREATE TABLE notes (id INT, user_id INT REFERENCES users (uid))"
            )),
            vec![DiagnosticKind::InvalidForeignKey]
        );
        assert!(check_against(
            "CREATE TABLE emp (id INT PRIMARY KEY, boss INT REFERENCES emp (id))",
            &Schema::new()
        )
        .is_empty());
    }

    #[test]
    fn test_create_definitions_not_checked() {
        assert!(check_against("CREATE TABLE t (id INT PRIMARY KEY);", &Schema::new()).is_empty());
        assert!(check_against(
            "CREATE TABLE t (id INT, PRIMARY KEY (id))",
            &Schema::new()
        )
        .is_empty());
    }

    #[test]
    fn test_missing_reference() {
        let mut ast = Ast::new();
        let query = ast.append(ast.root(), NodeKind::Query, "CREATE", None);
        ast.append(query, NodeKind::Table, "t", Some(TokenKind::Identifier));
        let columns = ast.append(query, NodeKind::Columns, "", None);
        let column = ast.append(columns, NodeKind::Column, "a INT", Some(TokenKind::Datatype));
        ast.append(column, NodeKind::Constraint, "FOREIGN_KEY", Some(TokenKind::Constraint));

        let diagnostics = validate(&ast, &schema());
        assert_eq!(kinds(&diagnostics), vec![DiagnosticKind::MissingReference]);
        assert_eq!(diagnostics[0].node, NodeKind::Constraint);
        assert_eq!(diagnostics[0].table.as_deref(), Some("t"));
    }

    #[test]
    fn test_malformed_reference() {
        let mut ast = Ast::new();
        let query = ast.append(ast.root(), NodeKind::Query, "CREATE", None);
        ast.append(query, NodeKind::Table, "t", None);
        let constraint = ast.append(query, NodeKind::Constraint, "FOREIGN_KEY", None);
        ast.append(constraint, NodeKind::Reference, "users", None);

        let diagnostics = validate(&ast, &schema());
        assert_eq!(kinds(&diagnostics), vec![DiagnosticKind::InvalidForeignKey]);
        assert!(diagnostics[0].message.contains("malformed"));
    }

    #[test]
    fn test_insert_checks() {
        assert!(check("INSERT INTO users (id, name) VALUES (1, 'Ann'), (2, 'Bob')").is_empty());
        assert!(check(
            "INSERT INTO users VALUES (1, 'Ann', 30, 'a@b.c', 1.5, '2024-01-01', TRUE)"
        )
        .is_empty());

        assert_eq!(
            kinds(&check("INSERT INTO users (id, name) VALUES (1)")),
            vec![DiagnosticKind::ValueCountMismatch]
        );
        assert_eq!(
            kinds(&check("INSERT INTO users (id, name) VALUES ('x', 'Ann')")),
            vec![DiagnosticKind::TypeMismatch]
        );
        assert_eq!(
            kinds(&check("INSERT INTO users (id, name) VALUES (1, NULL)")),
            vec![DiagnosticKind::NotNullViolation]
        );
        assert_eq!(
            kinds(&check("INSERT INTO users (id, age) VALUES (1, 3)")),
            vec![DiagnosticKind::NotNullViolation]
        );
        assert_eq!(
            kinds(&check("INSERT INTO users VALUES (1, 'Ann')")),
            vec![DiagnosticKind::ValueCountMismatch]
        );
    }

    #[test]
    fn test_insert_unknown_column() {
        let diagnostics = check("INSERT INTO users (id, name, nick) VALUES (1, 'a', 'b')");
        assert_eq!(kinds(&diagnostics), vec![DiagnosticKind::UnknownColumn]);
        assert_eq!(diagnostics[0].value, "nick");
    }

    #[test]
    fn test_update_checks() {
        assert!(check("UPDATE users SET age = 31, email = 'x' WHERE id = 1").is_empty());
        assert_eq!(
            kinds(&check("UPDATE users SET age = 'x' WHERE id = 1")),
            vec![DiagnosticKind::TypeMismatch]
        );
        assert_eq!(
            kinds(&check("UPDATE users SET name = NULL")),
            vec![DiagnosticKind::NotNullViolation]
        );
        assert_eq!(
            kinds(&check("UPDATE users SET nick = 1")),
            vec![DiagnosticKind::UnknownColumn]
        );
    }

    #[test]
    fn test_delete_checks() {
        assert!(check("DELETE FROM orders WHERE total < 5.0").is_empty());
        assert_eq!(
            kinds(&check("DELETE FROM users WHERE ghost = 1")),
            vec![DiagnosticKind::UnknownColumn]
        );
    }

    #[test]
    fn test_diagnostic_display() {
        let diagnostics = check("SELECT * FROM customers");
        assert_eq!(
            diagnostics[0].to_string(),
            "unknown table: table 'customers' does not exist"
        );
    }
}
