//! Abstract Syntax Tree
//!
//! The parser builds one tree per statement inside an arena. Nodes refer to
//! each other through `NodeId` handles: children are an ordered list of ids
//! and every node but the root records the id of its parent. Dropping the
//! `Ast` frees the whole tree.

use std::fmt;

use crate::parser::tokenizer::TokenKind;

// ============================================================================
// Node Kinds
// ============================================================================

/// Syntax tree node tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Root,
    Query,
    Select,
    SelectList,
    Column,
    Wildcard,
    Alias,
    Function,
    Args,
    Table,
    From,
    Join,
    JoinType,
    On,
    Where,
    Condition,
    LogicalOp,
    Group,
    Comparison,
    Operator,
    Like,
    In,
    Between,
    Is,
    Not,
    Exists,
    ValueList,
    Number,
    String,
    Date,
    Boolean,
    Null,
    GroupBy,
    Having,
    OrderBy,
    OrderExpr,
    Direction,
    Limit,
    Values,
    Value,
    Set,
    Assign,
    Left,
    Right,
    Constraint,
    Reference,
    Columns,
    Distinct,
}

impl NodeKind {
    /// Tag name as printed in tree dumps
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Root => "ROOT",
            NodeKind::Query => "QUERY",
            NodeKind::Select => "SELECT",
            NodeKind::SelectList => "SELECT_LIST",
            NodeKind::Column => "COLUMN",
            NodeKind::Wildcard => "WILDCARD",
            NodeKind::Alias => "ALIAS",
            NodeKind::Function => "FUNCTION",
            NodeKind::Args => "ARGS",
            NodeKind::Table => "TABLE",
            NodeKind::From => "FROM",
            NodeKind::Join => "JOIN",
            NodeKind::JoinType => "JOIN_TYPE",
            NodeKind::On => "ON",
            NodeKind::Where => "WHERE",
            NodeKind::Condition => "CONDITION",
            NodeKind::LogicalOp => "LOGICAL_OP",
            NodeKind::Group => "GROUP",
            NodeKind::Comparison => "COMPARISON",
            NodeKind::Operator => "OPERATOR",
            NodeKind::Like => "LIKE",
            NodeKind::In => "IN",
            NodeKind::Between => "BETWEEN",
            NodeKind::Is => "IS",
            NodeKind::Not => "NOT",
            NodeKind::Exists => "EXISTS",
            NodeKind::ValueList => "VALUE_LIST",
            NodeKind::Number => "NUMBER",
            NodeKind::String => "STRING",
            NodeKind::Date => "DATE",
            NodeKind::Boolean => "BOOLEAN",
            NodeKind::Null => "NULL",
            NodeKind::GroupBy => "GROUP_BY",
            NodeKind::Having => "HAVING",
            NodeKind::OrderBy => "ORDER_BY",
            NodeKind::OrderExpr => "ORDER_EXPR",
            NodeKind::Direction => "DIRECTION",
            NodeKind::Limit => "LIMIT",
            NodeKind::Values => "VALUES",
            NodeKind::Value => "VALUE",
            NodeKind::Set => "SET",
            NodeKind::Assign => "ASSIGN",
            NodeKind::Left => "LEFT",
            NodeKind::Right => "RIGHT",
            NodeKind::Constraint => "CONSTRAINT",
            NodeKind::Reference => "REFERENCE",
            NodeKind::Columns => "COLUMNS",
            NodeKind::Distinct => "DISTINCT",
        }
    }

    /// Check if this node opens a name scope (a statement or subquery)
    pub fn is_scope(&self) -> bool {
        matches!(self, NodeKind::Query | NodeKind::Select)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Join Types
// ============================================================================

bitflags::bitflags! {
    /// Join type flags
    ///
    /// `LEFT | OUTER` is LEFT OUTER JOIN; `LEFT | RIGHT` is FULL JOIN.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct JoinFlags: u8 {
        /// Inner join, explicit or implied by a bare JOIN
        const INNER = 0x01;
        /// Left outer join
        const LEFT  = 0x02;
        /// Right outer join
        const RIGHT = 0x04;
        /// The OUTER keyword is present
        const OUTER = 0x08;
    }
}

impl JoinFlags {
    /// Check if this is an outer join (LEFT, RIGHT, or FULL)
    pub fn is_outer(&self) -> bool {
        self.intersects(JoinFlags::LEFT | JoinFlags::RIGHT)
    }

    /// Keyword spelling stored in JOIN_TYPE nodes
    pub fn keyword(&self) -> &'static str {
        let full = JoinFlags::LEFT | JoinFlags::RIGHT;
        let outer = self.contains(JoinFlags::OUTER);
        if self.contains(full) {
            if outer {
                "FULL OUTER"
            } else {
                "FULL"
            }
        } else if self.contains(JoinFlags::LEFT) {
            if outer {
                "LEFT OUTER"
            } else {
                "LEFT"
            }
        } else if self.contains(JoinFlags::RIGHT) {
            if outer {
                "RIGHT OUTER"
            } else {
                "RIGHT"
            }
        } else {
            "INNER"
        }
    }
}

// ============================================================================
// Nodes
// ============================================================================

/// Handle to a node inside an `Ast`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Arena index of this node
    pub fn index(&self) -> usize {
        self.0
    }
}

/// A syntax tree node
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub value: String,
    /// Kind of the token the node was built from, for literals and names
    pub token: Option<TokenKind>,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
}

impl Node {
    fn new(kind: NodeKind, value: String, token: Option<TokenKind>) -> Self {
        Node {
            kind,
            value,
            token,
            children: Vec::new(),
            parent: None,
        }
    }

    /// Children in the order the grammar consumed them
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Enclosing node, `None` for the root and detached nodes
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }
}

/// Result of a walker callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkResult {
    /// Continue walking.
    Continue,
    /// Skip the children of this node.
    Prune,
    /// Abort the walk.
    Abort,
}

// ============================================================================
// Tree
// ============================================================================

/// Arena-backed syntax tree for one statement
#[derive(Debug, Clone, PartialEq)]
pub struct Ast {
    nodes: Vec<Node>,
}

impl Default for Ast {
    fn default() -> Self {
        Self::new()
    }
}

impl Ast {
    /// Create a tree holding only the ROOT node
    pub fn new() -> Self {
        Ast {
            nodes: vec![Node::new(NodeKind::Root, String::new(), None)],
        }
    }

    /// The ROOT node
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Number of nodes, detached ones included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: the root exists from construction
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.nodes[id.0].kind
    }

    pub fn value(&self, id: NodeId) -> &str {
        &self.nodes[id.0].value
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// The `index`-th child, if present
    pub fn child(&self, id: NodeId, index: usize) -> Option<NodeId> {
        self.children(id).get(index).copied()
    }

    /// First child with the given kind
    pub fn child_of_kind(&self, id: NodeId, kind: NodeKind) -> Option<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .find(|&c| self.kind(c) == kind)
    }

    /// Create a detached node
    pub fn add(
        &mut self,
        kind: NodeKind,
        value: impl Into<String>,
        token: Option<TokenKind>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(kind, value.into(), token));
        id
    }

    /// Append `child` to `parent`'s children and set its parent link
    pub fn attach(&mut self, parent: NodeId, child: NodeId) {
        debug_assert!(self.nodes[child.0].parent.is_none());
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Create a node and attach it to `parent`
    pub fn append(
        &mut self,
        parent: NodeId,
        kind: NodeKind,
        value: impl Into<String>,
        token: Option<TokenKind>,
    ) -> NodeId {
        let id = self.add(kind, value, token);
        self.attach(parent, id);
        id
    }

    /// Replace `parent`'s last child with a new node that adopts it.
    ///
    /// Used for left-associative operators: after the left operand has been
    /// attached, the operator node takes its place and becomes its parent.
    /// With no children the new node is simply appended.
    pub fn wrap_last_child(
        &mut self,
        parent: NodeId,
        kind: NodeKind,
        value: impl Into<String>,
    ) -> NodeId {
        let last = self.nodes[parent.0].children.pop();
        let wrapper = self.append(parent, kind, value, None);
        if let Some(last) = last {
            self.nodes[last.0].parent = None;
            self.attach(wrapper, last);
        }
        wrapper
    }

    /// Ancestors of `id`, nearest first, excluding `id` itself
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            ast: self,
            next: self.parent(id),
        }
    }

    /// Distance from the root
    pub fn depth(&self, id: NodeId) -> usize {
        self.ancestors(id).count()
    }

    /// Pre-order traversal starting at `start`.
    ///
    /// The visitor receives each node with its depth relative to `start`.
    /// Uses an explicit stack, so tree height is not bounded by the call stack.
    pub fn walk<F>(&self, start: NodeId, mut visit: F) -> WalkResult
    where
        F: FnMut(&Ast, NodeId, usize) -> WalkResult,
    {
        let mut stack = vec![(start, 0)];
        while let Some((id, depth)) = stack.pop() {
            match visit(self, id, depth) {
                WalkResult::Abort => return WalkResult::Abort,
                WalkResult::Prune => continue,
                WalkResult::Continue => {}
            }
            for &child in self.children(id).iter().rev() {
                stack.push((child, depth + 1));
            }
        }
        WalkResult::Continue
    }

    /// All attached nodes of a kind, in pre-order
    pub fn find_all(&self, kind: NodeKind) -> Vec<NodeId> {
        let mut found = Vec::new();
        self.walk(self.root(), |ast, id, _| {
            if ast.kind(id) == kind {
                found.push(id);
            }
            WalkResult::Continue
        });
        found
    }

    /// First attached node of a kind, in pre-order
    pub fn find(&self, kind: NodeKind) -> Option<NodeId> {
        let mut found = None;
        self.walk(self.root(), |ast, id, _| {
            if ast.kind(id) == kind {
                found = Some(id);
                WalkResult::Abort
            } else {
                WalkResult::Continue
            }
        });
        found
    }

    /// The statement node (QUERY) under ROOT, if parsing got that far
    pub fn statement(&self) -> Option<NodeId> {
        self.child(self.root(), 0)
    }

    /// Indented dump of the whole tree
    pub fn render(&self) -> String {
        self.render_from(self.root())
    }

    /// Indented dump of the subtree at `start`, two spaces per level
    pub fn render_from(&self, start: NodeId) -> String {
        let mut out = String::new();
        self.walk(start, |ast, id, depth| {
            let node = ast.node(id);
            for _ in 0..depth {
                out.push_str("  ");
            }
            out.push_str(node.kind.as_str());
            if !node.value.is_empty() {
                out.push_str(": ");
                out.push_str(&node.value);
            }
            out.push('\n');
            WalkResult::Continue
        });
        out
    }
}

impl fmt::Display for Ast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Iterator over a node's ancestors
pub struct Ancestors<'a> {
    ast: &'a Ast,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.ast.parent(current);
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Ast, NodeId, NodeId) {
        let mut ast = Ast::new();
        let root = ast.root();
        let query = ast.append(root, NodeKind::Query, "SELECT", None);
        let list = ast.append(query, NodeKind::SelectList, "", None);
        ast.append(list, NodeKind::Wildcard, "*", None);
        let from = ast.append(query, NodeKind::From, "", None);
        let table = ast.append(from, NodeKind::Table, "users", Some(TokenKind::Identifier));
        (ast, query, table)
    }

    #[test]
    fn test_new_has_root_only() {
        let ast = Ast::new();
        assert_eq!(ast.len(), 1);
        assert_eq!(ast.kind(ast.root()), NodeKind::Root);
        assert!(ast.children(ast.root()).is_empty());
        assert_eq!(ast.statement(), None);
    }

    #[test]
    fn test_append_sets_parent_and_order() {
        let (ast, query, table) = sample();
        assert_eq!(ast.parent(query), Some(ast.root()));
        let kinds: Vec<NodeKind> = ast.children(query).iter().map(|&c| ast.kind(c)).collect();
        assert_eq!(kinds, vec![NodeKind::SelectList, NodeKind::From]);
        assert_eq!(ast.value(table), "users");
        assert_eq!(ast.node(table).token, Some(TokenKind::Identifier));
    }

    #[test]
    fn test_ancestors_nearest_first() {
        let (ast, query, table) = sample();
        let chain: Vec<NodeKind> = ast.ancestors(table).map(|id| ast.kind(id)).collect();
        assert_eq!(chain, vec![NodeKind::From, NodeKind::Query, NodeKind::Root]);
        assert_eq!(ast.depth(table), 3);
        assert_eq!(ast.depth(query), 1);
    }

    #[test]
    fn test_wrap_last_child() {
        let mut ast = Ast::new();
        let cond = ast.append(ast.root(), NodeKind::Condition, "", None);
        let left = ast.append(cond, NodeKind::Column, "a", None);
        let op = ast.wrap_last_child(cond, NodeKind::LogicalOp, "OR");
        ast.append(op, NodeKind::Column, "b", None);

        assert_eq!(ast.children(cond), &[op]);
        assert_eq!(ast.children(op)[0], left);
        assert_eq!(ast.parent(left), Some(op));
        assert_eq!(ast.children(op).len(), 2);
    }

    #[test]
    fn test_walk_prune_and_abort() {
        let (ast, query, _) = sample();

        let mut seen = Vec::new();
        ast.walk(ast.root(), |ast, id, _| {
            seen.push(ast.kind(id));
            if ast.kind(id) == NodeKind::SelectList {
                WalkResult::Prune
            } else {
                WalkResult::Continue
            }
        });
        assert!(!seen.contains(&NodeKind::Wildcard));
        assert!(seen.contains(&NodeKind::Table));

        let mut count = 0;
        let result = ast.walk(query, |ast, id, _| {
            count += 1;
            if ast.kind(id) == NodeKind::Wildcard {
                WalkResult::Abort
            } else {
                WalkResult::Continue
            }
        });
        assert_eq!(result, WalkResult::Abort);
        assert_eq!(count, 3);
    }

    #[test]
    fn test_walk_deep_tree() {
        let mut ast = Ast::new();
        let mut parent = ast.root();
        for _ in 0..200_000 {
            parent = ast.append(parent, NodeKind::Not, "NOT", None);
        }
        let mut deepest = 0;
        let result = ast.walk(ast.root(), |_, _, depth| {
            deepest = deepest.max(depth);
            WalkResult::Continue
        });
        assert_eq!(result, WalkResult::Continue);
        assert_eq!(deepest, 200_000);
        assert_eq!(ast.find_all(NodeKind::Not).len(), 200_000);
    }

    #[test]
    fn test_render_indents_by_depth() {
        let (ast, _, _) = sample();
        let expected = "ROOT\n  QUERY: SELECT\n    SELECT_LIST\n      WILDCARD: *\n    FROM\n      TABLE: users\n";
        assert_eq!(ast.render(), expected);
        assert_eq!(ast.to_string(), expected);
    }

    #[test]
    fn test_find() {
        let (ast, _, table) = sample();
        assert_eq!(ast.find(NodeKind::Table), Some(table));
        assert_eq!(ast.find_all(NodeKind::Wildcard).len(), 1);
        assert_eq!(ast.find(NodeKind::Where), None);
    }

    #[test]
    fn test_join_flags_keyword() {
        assert_eq!(JoinFlags::INNER.keyword(), "INNER");
        assert_eq!((JoinFlags::LEFT | JoinFlags::OUTER).keyword(), "LEFT OUTER");
        assert_eq!((JoinFlags::LEFT | JoinFlags::RIGHT).keyword(), "FULL");
        assert!(JoinFlags::RIGHT.is_outer());
        assert!(!JoinFlags::INNER.is_outer());
    }
}
