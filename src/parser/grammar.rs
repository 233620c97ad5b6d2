//! SQL Grammar/Parser
//!
//! A recursive descent parser over the token sequence produced by the
//! tokenizer. Every rule attaches the nodes it builds to the parent it is
//! given; left-associative operators are formed by wrapping the parent's
//! last child. Parsing is fail-fast: the first unmet expectation aborts the
//! statement and leaves whatever was already attached in the tree.

use crate::config::{Config, DEFAULT_MAX_DEPTH};
use crate::error::{Error, ErrorCode, Result};
use crate::parser::ast::{Ast, JoinFlags, NodeId, NodeKind};
use crate::parser::tokenizer::{Token, TokenKind};

/// Aggregate function names recognised before `(`
const AGGREGATES: [&str; 5] = ["COUNT", "SUM", "AVG", "MIN", "MAX"];

/// Comparison operators accepted between two values
const COMPARISON_OPS: [&str; 7] = ["=", "<>", "!=", "<", ">", "<=", ">="];

// ============================================================================
// Commands
// ============================================================================

/// Leading statement keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Select,
    Insert,
    Update,
    Delete,
    Create,
}

impl Command {
    /// Recognise the command keyword of a token
    pub fn from_token(token: &Token) -> Option<Self> {
        if token.kind != TokenKind::Keyword {
            return None;
        }
        match token.normalized.as_str() {
            "SELECT" => Some(Command::Select),
            "INSERT" => Some(Command::Insert),
            "UPDATE" => Some(Command::Update),
            "DELETE" => Some(Command::Delete),
            "CREATE" => Some(Command::Create),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Select => "SELECT",
            Command::Insert => "INSERT",
            Command::Update => "UPDATE",
            Command::Delete => "DELETE",
            Command::Create => "CREATE",
        }
    }
}

// ============================================================================
// Parser
// ============================================================================

/// Position in the token sequence plus the current nesting depth
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Cursor {
    pos: usize,
    depth: usize,
}

/// SQL parser
pub struct Parser {
    tokens: Vec<Token>,
    cursor: Cursor,
    max_depth: usize,
    ast: Ast,
}

impl Parser {
    /// Create a parser over one statement's tokens
    pub fn new(tokens: Vec<Token>) -> Self {
        Self::build(tokens, DEFAULT_MAX_DEPTH)
    }

    /// Create a parser using the limits from `config`
    pub fn with_config(tokens: Vec<Token>, config: &Config) -> Self {
        Self::build(tokens, config.max_depth)
    }

    fn build(mut tokens: Vec<Token>, max_depth: usize) -> Self {
        if tokens.last().map(|t| t.kind) != Some(TokenKind::Eof) {
            let end = tokens.last().map(|t| t.end()).unwrap_or(0);
            let (line, column) = tokens.last().map(|t| (t.line, t.column)).unwrap_or((1, 1));
            tokens.push(Token::new(TokenKind::Eof, "", "", end, line, column));
        }
        Parser {
            tokens,
            cursor: Cursor::default(),
            max_depth,
            ast: Ast::new(),
        }
    }

    /// Parse the statement into the tree
    pub fn parse(&mut self) -> Result<()> {
        let span = tracing::debug_span!(
            target: "toysql.parse",
            "parse",
            command = %self.current().normalized
        );
        let _guard = span.enter();

        let result = self.parse_statement();
        if let Err(ref err) = result {
            tracing::debug!(
                target: "toysql.parse",
                code = %err.code,
                error = %err.message,
                "parse failed"
            );
        }
        result
    }

    /// The tree built so far, complete or not
    pub fn ast(&self) -> &Ast {
        &self.ast
    }

    pub fn into_ast(self) -> Ast {
        self.ast
    }

    // ========================================================================
    // Statement Parsers
    // ========================================================================

    fn parse_statement(&mut self) -> Result<()> {
        let Some(command) = Command::from_token(self.current()) else {
            let msg = if self.is_eof() {
                "expected statement".to_string()
            } else {
                format!("unsupported command '{}'", self.current().original)
            };
            return Err(self.error_code(ErrorCode::Unsupported, &msg));
        };

        let root = self.ast.root();
        let query = self.ast.append(root, NodeKind::Query, command.as_str(), None);

        match command {
            Command::Select => self.parse_select(query)?,
            Command::Insert => self.parse_insert(query)?,
            Command::Update => self.parse_update(query)?,
            Command::Delete => self.parse_delete(query)?,
            Command::Create => self.parse_create(query)?,
        }

        self.match_punct(';');
        if !self.is_eof() {
            return Err(self.error("unexpected token after end of statement"));
        }
        Ok(())
    }

    /// SELECT body; `scope` is the QUERY node or a nested SELECT node
    fn parse_select(&mut self, scope: NodeId) -> Result<()> {
        self.expect_keyword("SELECT")?;

        if self.match_keyword("DISTINCT") {
            self.ast.append(scope, NodeKind::Distinct, "DISTINCT", None);
        }

        let list = self.ast.append(scope, NodeKind::SelectList, "", None);
        loop {
            let item = self.parse_select_expr(list)?;
            self.parse_alias(item)?;
            if !self.match_punct(',') {
                break;
            }
        }

        self.expect_keyword("FROM")?;
        let from = self.ast.append(scope, NodeKind::From, "", None);
        self.parse_from(from)?;

        if self.match_keyword("WHERE") {
            let clause = self.ast.append(scope, NodeKind::Where, "", None);
            self.parse_condition(clause)?;
        }

        if self.match_keyword("GROUP") {
            self.expect_keyword("BY")?;
            let group_by = self.ast.append(scope, NodeKind::GroupBy, "", None);
            loop {
                self.parse_value(group_by)?;
                if !self.match_punct(',') {
                    break;
                }
            }
        }

        if self.match_keyword("HAVING") {
            let clause = self.ast.append(scope, NodeKind::Having, "", None);
            self.parse_condition(clause)?;
        }

        if self.match_keyword("ORDER") {
            self.expect_keyword("BY")?;
            let order_by = self.ast.append(scope, NodeKind::OrderBy, "", None);
            loop {
                let term = self.ast.append(order_by, NodeKind::OrderExpr, "", None);
                self.parse_value(term)?;
                let direction = if self.match_keyword("DESC") {
                    "DESC"
                } else {
                    self.match_keyword("ASC");
                    "ASC"
                };
                self.ast.append(term, NodeKind::Direction, direction, None);
                if !self.match_punct(',') {
                    break;
                }
            }
        }

        if self.match_keyword("LIMIT") {
            let token = self.current().clone();
            if token.kind != TokenKind::Number || token.normalized.starts_with('-') {
                return Err(self.error("expected row count after LIMIT"));
            }
            self.advance();
            self.ast
                .append(scope, NodeKind::Limit, token.normalized, Some(TokenKind::Number));
        }

        Ok(())
    }

    fn parse_insert(&mut self, query: NodeId) -> Result<()> {
        self.expect_keyword("INSERT")?;
        self.expect_keyword("INTO")?;
        self.parse_table_name(query)?;

        if self.match_punct('(') {
            let columns = self.ast.append(query, NodeKind::Columns, "", None);
            loop {
                let name = self.expect_identifier("column name")?;
                self.ast
                    .append(columns, NodeKind::Column, name, Some(TokenKind::Identifier));
                if !self.match_punct(',') {
                    break;
                }
            }
            self.expect_punct(')')?;
        }

        if self.match_keyword("VALUES") {
            let values = self.ast.append(query, NodeKind::Values, "", None);
            loop {
                self.expect_punct('(')?;
                let row = self.ast.append(values, NodeKind::ValueList, "", None);
                loop {
                    self.parse_value(row)?;
                    if !self.match_punct(',') {
                        break;
                    }
                }
                self.expect_punct(')')?;
                if !self.match_punct(',') {
                    break;
                }
            }
            Ok(())
        } else if self.check_keyword("SELECT") {
            self.nested(|p| {
                let select = p.ast.append(query, NodeKind::Select, "", None);
                p.parse_select(select)
            })
        } else if self.check_punct('(') && self.peek(1).is_keyword("SELECT") {
            self.parse_subquery(query).map(|_| ())
        } else {
            Err(self.error("expected VALUES or SELECT"))
        }
    }

    fn parse_update(&mut self, query: NodeId) -> Result<()> {
        self.expect_keyword("UPDATE")?;
        self.parse_table_name(query)?;
        self.expect_keyword("SET")?;

        let set = self.ast.append(query, NodeKind::Set, "", None);
        loop {
            let assign = self.ast.append(set, NodeKind::Assign, "=", None);
            let left = self.ast.append(assign, NodeKind::Left, "", None);
            self.parse_column_ref(left)?;
            if !self.current().is_operator("=") {
                return Err(self.error("expected '=' in assignment"));
            }
            self.advance();
            self.ast
                .append(assign, NodeKind::Operator, "=", Some(TokenKind::Operator));
            let right = self.ast.append(assign, NodeKind::Right, "", None);
            self.parse_value(right)?;
            if !self.match_punct(',') {
                break;
            }
        }

        if self.match_keyword("WHERE") {
            let clause = self.ast.append(query, NodeKind::Where, "", None);
            self.parse_condition(clause)?;
        }
        Ok(())
    }

    fn parse_delete(&mut self, query: NodeId) -> Result<()> {
        self.expect_keyword("DELETE")?;
        self.expect_keyword("FROM")?;
        self.parse_table_name(query)?;

        if self.match_keyword("WHERE") {
            let clause = self.ast.append(query, NodeKind::Where, "", None);
            self.parse_condition(clause)?;
        }
        Ok(())
    }

    fn parse_create(&mut self, query: NodeId) -> Result<()> {
        self.expect_keyword("CREATE")?;
        self.expect_keyword("TABLE")?;
        self.parse_table_name(query)?;
        self.expect_punct('(')?;

        let columns = self.ast.append(query, NodeKind::Columns, "", None);
        loop {
            let table_level = self.peek(1).is_punct('(');
            if table_level && self.current().is_constraint("PRIMARY_KEY") {
                self.advance();
                let constraint = self.ast.append(
                    query,
                    NodeKind::Constraint,
                    "PRIMARY_KEY",
                    Some(TokenKind::Constraint),
                );
                self.parse_column_name_list(constraint)?;
            } else if table_level && self.current().is_constraint("FOREIGN_KEY") {
                self.advance();
                let constraint = self.ast.append(
                    query,
                    NodeKind::Constraint,
                    "FOREIGN_KEY",
                    Some(TokenKind::Constraint),
                );
                self.parse_column_name_list(constraint)?;
                self.parse_reference(constraint)?;
            } else {
                self.parse_column_def(columns)?;
            }

            if !self.match_punct(',') {
                break;
            }
        }

        self.expect_punct(')')
    }

    // ========================================================================
    // Column Definitions
    // ========================================================================

    fn parse_column_def(&mut self, columns: NodeId) -> Result<()> {
        let name = self.expect_identifier("column name")?;
        let datatype = self.current().clone();
        if datatype.kind != TokenKind::Datatype {
            return Err(self.error("expected datatype"));
        }
        self.advance();

        let column = self.ast.append(
            columns,
            NodeKind::Column,
            format!("{} {}", name, datatype.normalized),
            Some(TokenKind::Datatype),
        );

        if self.match_punct('(') {
            let length = self.current().clone();
            if length.kind != TokenKind::Number {
                return Err(self.error("expected length"));
            }
            self.advance();
            self.ast
                .append(column, NodeKind::Number, length.normalized, Some(TokenKind::Number));
            self.expect_punct(')')?;
        }

        loop {
            let token = self.current().clone();
            match (token.kind, token.normalized.as_str()) {
                (TokenKind::Constraint, "PRIMARY_KEY") | (TokenKind::Constraint, "NOT_NULL") => {
                    self.advance();
                    self.ast.append(
                        column,
                        NodeKind::Constraint,
                        token.normalized.clone(),
                        Some(TokenKind::Constraint),
                    );
                }
                (TokenKind::Constraint, "FOREIGN_KEY") => {
                    self.advance();
                    let constraint = self.ast.append(
                        column,
                        NodeKind::Constraint,
                        "FOREIGN_KEY",
                        Some(TokenKind::Constraint),
                    );
                    self.parse_reference(constraint)?;
                }
                (TokenKind::Keyword, "REFERENCES") => {
                    let constraint = self.ast.append(
                        column,
                        NodeKind::Constraint,
                        "FOREIGN_KEY",
                        Some(TokenKind::Constraint),
                    );
                    self.parse_reference(constraint)?;
                }
                (TokenKind::Keyword, "UNIQUE") => {
                    self.advance();
                    self.ast
                        .append(column, NodeKind::Constraint, "UNIQUE", Some(TokenKind::Keyword));
                }
                (TokenKind::Keyword, "DEFAULT") => {
                    self.advance();
                    let constraint = self.ast.append(
                        column,
                        NodeKind::Constraint,
                        "DEFAULT",
                        Some(TokenKind::Keyword),
                    );
                    let value = self.ast.append(constraint, NodeKind::Value, "", None);
                    self.parse_literal(value)?;
                }
                // Explicitly nullable; nothing to record
                (TokenKind::Keyword, "NULL") => self.advance(),
                _ => break,
            }
        }
        Ok(())
    }

    /// `REFERENCES table (column)` as a REFERENCE child of `constraint`
    fn parse_reference(&mut self, constraint: NodeId) -> Result<()> {
        if !self.match_keyword("REFERENCES") {
            return Err(self.error("expected REFERENCES in FOREIGN KEY clause"));
        }
        let table = self.expect_identifier("referenced table")?;
        self.expect_punct('(')?;
        let column = self.expect_identifier("referenced column")?;
        self.expect_punct(')')?;
        self.ast.append(
            constraint,
            NodeKind::Reference,
            format!("{}.{}", table, column),
            Some(TokenKind::Identifier),
        );
        Ok(())
    }

    /// `( name, ... )` as COLUMN children of `parent`
    fn parse_column_name_list(&mut self, parent: NodeId) -> Result<()> {
        self.expect_punct('(')?;
        loop {
            let name = self.expect_identifier("column name")?;
            self.ast
                .append(parent, NodeKind::Column, name, Some(TokenKind::Identifier));
            if !self.match_punct(',') {
                break;
            }
        }
        self.expect_punct(')')
    }

    // ========================================================================
    // Select List and FROM
    // ========================================================================

    fn parse_select_expr(&mut self, list: NodeId) -> Result<NodeId> {
        if self.current().is_operator("*") {
            self.advance();
            return Ok(self
                .ast
                .append(list, NodeKind::Wildcard, "*", Some(TokenKind::Operator)));
        }

        if self.check(TokenKind::Identifier)
            && self.peek(1).is_punct('.')
            && self.peek(2).is_operator("*")
        {
            let table = self.current().normalized.clone();
            self.advance();
            self.advance();
            self.advance();
            return Ok(self.ast.append(
                list,
                NodeKind::Wildcard,
                format!("{}.*", table),
                Some(TokenKind::Operator),
            ));
        }

        if self.at_aggregate() {
            return self.parse_function(list);
        }
        if self.check(TokenKind::Identifier) {
            return self.parse_column_ref(list);
        }
        Err(self.error("expected column, '*' or aggregate"))
    }

    /// `AS name` or a bare trailing identifier
    fn parse_alias(&mut self, target: NodeId) -> Result<()> {
        let name = if self.match_keyword("AS") {
            self.expect_identifier("alias")?
        } else if self.check(TokenKind::Identifier) {
            let name = self.current().normalized.clone();
            self.advance();
            name
        } else {
            return Ok(());
        };
        self.ast
            .append(target, NodeKind::Alias, name, Some(TokenKind::Identifier));
        Ok(())
    }

    fn parse_from(&mut self, from: NodeId) -> Result<()> {
        loop {
            self.parse_table_ref(from)?;
            while let Some(flags) = self.parse_join_type()? {
                let join = self.ast.append(from, NodeKind::Join, "", None);
                self.ast
                    .append(join, NodeKind::JoinType, flags.keyword(), Some(TokenKind::Keyword));
                self.parse_table_ref(join)?;
                self.expect_keyword("ON")?;
                let on = self.ast.append(join, NodeKind::On, "", None);
                self.parse_condition(on)?;
            }
            if !self.match_punct(',') {
                break;
            }
        }
        Ok(())
    }

    /// Join keywords up to and including JOIN, or `None` when no join follows
    fn parse_join_type(&mut self) -> Result<Option<JoinFlags>> {
        let flags = if self.match_keyword("INNER") {
            JoinFlags::INNER
        } else if self.match_keyword("LEFT") {
            JoinFlags::LEFT
        } else if self.match_keyword("RIGHT") {
            JoinFlags::RIGHT
        } else if self.match_keyword("FULL") {
            JoinFlags::LEFT | JoinFlags::RIGHT
        } else if self.match_keyword("JOIN") {
            return Ok(Some(JoinFlags::INNER));
        } else {
            return Ok(None);
        };

        let flags = if flags.is_outer() && self.match_keyword("OUTER") {
            flags | JoinFlags::OUTER
        } else {
            flags
        };
        self.expect_keyword("JOIN")?;
        Ok(Some(flags))
    }

    /// Table name or derived table, with optional alias
    fn parse_table_ref(&mut self, parent: NodeId) -> Result<()> {
        let source = if self.check_punct('(') && self.peek(1).is_keyword("SELECT") {
            self.parse_subquery(parent)?
        } else {
            self.parse_table_name(parent)?
        };
        self.parse_alias(source)
    }

    fn parse_table_name(&mut self, parent: NodeId) -> Result<NodeId> {
        let name = self.expect_identifier("table name")?;
        Ok(self
            .ast
            .append(parent, NodeKind::Table, name, Some(TokenKind::Identifier)))
    }

    /// `( SELECT ... )` as a SELECT child of `parent`
    fn parse_subquery(&mut self, parent: NodeId) -> Result<NodeId> {
        self.nested(|p| {
            p.expect_punct('(')?;
            let select = p.ast.append(parent, NodeKind::Select, "", None);
            p.parse_select(select)?;
            p.expect_punct(')')?;
            Ok(select)
        })
    }

    // ========================================================================
    // Conditions
    // ========================================================================

    fn parse_condition(&mut self, parent: NodeId) -> Result<()> {
        let condition = self.ast.append(parent, NodeKind::Condition, "", None);
        self.parse_or(condition)
    }

    fn parse_or(&mut self, parent: NodeId) -> Result<()> {
        self.parse_and(parent)?;
        while self.match_keyword("OR") {
            let op = self.ast.wrap_last_child(parent, NodeKind::LogicalOp, "OR");
            self.parse_and(op)?;
        }
        Ok(())
    }

    fn parse_and(&mut self, parent: NodeId) -> Result<()> {
        self.parse_factor(parent)?;
        while self.match_keyword("AND") {
            let op = self.ast.wrap_last_child(parent, NodeKind::LogicalOp, "AND");
            self.parse_factor(op)?;
        }
        Ok(())
    }

    fn parse_factor(&mut self, parent: NodeId) -> Result<()> {
        if self.match_keyword("NOT") {
            return self.nested(|p| {
                let not = p.ast.append(parent, NodeKind::Not, "NOT", Some(TokenKind::Keyword));
                p.parse_factor(not)
            });
        }

        if self.match_keyword("EXISTS") {
            let exists = self
                .ast
                .append(parent, NodeKind::Exists, "EXISTS", Some(TokenKind::Keyword));
            self.parse_subquery(exists)?;
            return Ok(());
        }

        if self.check_punct('(') && !self.peek(1).is_keyword("SELECT") {
            self.nested(|p| {
                p.advance();
                let group = p.ast.append(parent, NodeKind::Group, "", None);
                p.parse_or(group)?;
                p.expect_punct(')')
            })?;
            return self.parse_comparison_tail(parent);
        }

        self.parse_value(parent)?;
        self.parse_comparison_tail(parent)
    }

    /// Operator following a left operand already attached to `parent`
    fn parse_comparison_tail(&mut self, parent: NodeId) -> Result<()> {
        let negated = self.check_keyword("NOT")
            && ["LIKE", "IN", "BETWEEN"]
                .iter()
                .any(|kw| self.peek(1).is_keyword(kw));
        if negated {
            self.advance();
        }

        let token = self.current().clone();
        match token.kind {
            TokenKind::Operator if COMPARISON_OPS.contains(&token.normalized.as_str()) => {
                self.advance();
                let cmp = self
                    .ast
                    .wrap_last_child(parent, NodeKind::Comparison, token.normalized.clone());
                self.ast
                    .append(cmp, NodeKind::Operator, token.normalized, Some(TokenKind::Operator));
                self.parse_value(cmp)?;
            }
            TokenKind::Keyword => match token.normalized.as_str() {
                "LIKE" => {
                    self.advance();
                    let like = self.ast.wrap_last_child(parent, NodeKind::Like, "LIKE");
                    self.parse_value(like)?;
                }
                "IN" => {
                    self.advance();
                    let node = self.ast.wrap_last_child(parent, NodeKind::In, "IN");
                    if self.check_punct('(') && self.peek(1).is_keyword("SELECT") {
                        self.parse_subquery(node)?;
                    } else {
                        self.expect_punct('(')?;
                        let list = self.ast.append(node, NodeKind::ValueList, "", None);
                        loop {
                            self.parse_value(list)?;
                            if !self.match_punct(',') {
                                break;
                            }
                        }
                        self.expect_punct(')')?;
                    }
                }
                "BETWEEN" => {
                    self.advance();
                    let between = self.ast.wrap_last_child(parent, NodeKind::Between, "BETWEEN");
                    self.parse_value(between)?;
                    self.expect_keyword("AND")?;
                    self.parse_value(between)?;
                }
                "IS" => {
                    self.advance();
                    self.parse_is(parent)?;
                }
                _ => {}
            },
            _ => {}
        }

        if negated {
            self.ast.wrap_last_child(parent, NodeKind::Not, "NOT");
        }
        Ok(())
    }

    /// Right side of IS; `IS NOT NULL` arrives as a folded constraint token
    fn parse_is(&mut self, parent: NodeId) -> Result<()> {
        if self.current().is_constraint("NOT_NULL") {
            self.advance();
            let is = self.ast.wrap_last_child(parent, NodeKind::Is, "IS NOT");
            self.ast
                .append(is, NodeKind::Null, "NULL", Some(TokenKind::Keyword));
            return Ok(());
        }
        let value = if self.match_keyword("NOT") {
            "IS NOT"
        } else {
            "IS"
        };
        let is = self.ast.wrap_last_child(parent, NodeKind::Is, value);
        self.parse_value(is)?;
        Ok(())
    }

    // ========================================================================
    // Values
    // ========================================================================

    fn parse_value(&mut self, parent: NodeId) -> Result<NodeId> {
        let token = self.current().clone();
        match token.kind {
            TokenKind::Identifier => {
                if self.at_aggregate() {
                    self.parse_function(parent)
                } else {
                    self.parse_column_ref(parent)
                }
            }
            TokenKind::Punctuation if token.normalized == "(" => {
                if self.peek(1).is_keyword("SELECT") {
                    self.parse_subquery(parent)
                } else {
                    self.nested(|p| {
                        p.advance();
                        let group = p.ast.append(parent, NodeKind::Group, "", None);
                        p.parse_or(group)?;
                        p.expect_punct(')')?;
                        Ok(group)
                    })
                }
            }
            _ => self.parse_literal(parent),
        }
    }

    fn parse_literal(&mut self, parent: NodeId) -> Result<NodeId> {
        let token = self.current().clone();
        let kind = match (token.kind, token.normalized.as_str()) {
            (TokenKind::Number, _) | (TokenKind::Double, _) => NodeKind::Number,
            (TokenKind::String, _) => NodeKind::String,
            (TokenKind::Date, _) => NodeKind::Date,
            (TokenKind::Keyword, "NULL") => NodeKind::Null,
            (TokenKind::Keyword, "TRUE") | (TokenKind::Keyword, "FALSE") => NodeKind::Boolean,
            _ => return Err(self.error("expected value")),
        };
        self.advance();
        Ok(self
            .ast
            .append(parent, kind, token.normalized, Some(token.kind)))
    }

    /// `name` or `table.name`
    fn parse_column_ref(&mut self, parent: NodeId) -> Result<NodeId> {
        let mut name = self.expect_identifier("column name")?;
        if self.check_punct('.') && self.peek(1).kind == TokenKind::Identifier {
            self.advance();
            let column = self.expect_identifier("column name")?;
            name = format!("{}.{}", name, column);
        }
        Ok(self
            .ast
            .append(parent, NodeKind::Column, name, Some(TokenKind::Identifier)))
    }

    /// `AGG ( * | value )`
    fn parse_function(&mut self, parent: NodeId) -> Result<NodeId> {
        let name = self.current().normalized.to_ascii_uppercase();
        self.advance();
        let function = self
            .ast
            .append(parent, NodeKind::Function, name, Some(TokenKind::Identifier));

        self.expect_punct('(')?;
        let args = self.ast.append(function, NodeKind::Args, "", None);
        if self.current().is_operator("*") {
            self.advance();
            self.ast
                .append(args, NodeKind::Wildcard, "*", Some(TokenKind::Operator));
        } else {
            self.parse_value(args)?;
        }
        self.expect_punct(')')?;
        Ok(function)
    }

    fn at_aggregate(&self) -> bool {
        self.check(TokenKind::Identifier)
            && self.peek(1).is_punct('(')
            && AGGREGATES
                .iter()
                .any(|agg| self.current().normalized.eq_ignore_ascii_case(agg))
    }

    // ========================================================================
    // Helper Methods
    // ========================================================================

    /// Run `f` one nesting level deeper
    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.cursor.depth >= self.max_depth {
            let msg = format!("nesting exceeds maximum depth of {}", self.max_depth);
            return Err(self.error_code(ErrorCode::TooDeep, &msg));
        }
        self.cursor.depth += 1;
        let result = f(self);
        self.cursor.depth -= 1;
        result
    }

    fn current(&self) -> &Token {
        &self.tokens[self.cursor.pos]
    }

    /// Token `n` places ahead, clamped to the trailing Eof
    fn peek(&self, n: usize) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.cursor.pos + n).min(last)]
    }

    fn advance(&mut self) {
        if self.cursor.pos < self.tokens.len() - 1 {
            self.cursor.pos += 1;
        }
    }

    fn is_eof(&self) -> bool {
        self.current().kind == TokenKind::Eof
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current().kind == kind
    }

    fn check_keyword(&self, keyword: &str) -> bool {
        self.current().is_keyword(keyword)
    }

    fn match_keyword(&mut self, keyword: &str) -> bool {
        if self.check_keyword(keyword) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<()> {
        if self.match_keyword(keyword) {
            Ok(())
        } else {
            Err(self.error(&format!("expected {}", keyword)))
        }
    }

    fn check_punct(&self, punct: char) -> bool {
        self.current().is_punct(punct)
    }

    fn match_punct(&mut self, punct: char) -> bool {
        if self.check_punct(punct) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, punct: char) -> Result<()> {
        if self.match_punct(punct) {
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", punct)))
        }
    }

    fn expect_identifier(&mut self, what: &str) -> Result<String> {
        if self.check(TokenKind::Identifier) {
            let name = self.current().normalized.clone();
            self.advance();
            Ok(name)
        } else {
            Err(self.error(&format!("expected {}", what)))
        }
    }

    fn error(&self, msg: &str) -> Error {
        self.error_code(ErrorCode::Syntax, msg)
    }

    fn error_code(&self, code: ErrorCode, msg: &str) -> Error {
        let token = self.current();
        let msg = match token.kind {
            TokenKind::Error if token.normalized == "unclosed_string_literal" => {
                format!("{}: unclosed string literal", msg)
            }
            TokenKind::Error => format!("{}: invalid token '{}'", msg, token.original),
            _ => msg.to_string(),
        };
        Error::with_message(
            code,
            format!("{} at line {}, column {}", msg, token.line, token.column),
        )
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Parse one statement's tokens into a syntax tree
pub fn parse(tokens: Vec<Token>) -> Result<Ast> {
    let mut parser = Parser::new(tokens);
    parser.parse()?;
    Ok(parser.into_ast())
}

/// Parse with the limits from `config`
pub fn parse_with_config(tokens: Vec<Token>, config: &Config) -> Result<Ast> {
    let mut parser = Parser::with_config(tokens, config);
    parser.parse()?;
    Ok(parser.into_ast())
}

// ============================================================================
// Tests
// ============================================================================
