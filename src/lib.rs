//! toysql - a toy SQL front end
//!
//! Statements flow through three stages: the tokenizer turns text into
//! classified tokens, the recursive-descent parser builds a syntax tree, and
//! the validator checks the tree against a schema of known tables.

pub mod config;
pub mod error;
pub mod parser;
pub mod schema;
pub mod shell;

// Re-export main public types
pub use config::Config;
pub use error::{Error, ErrorCode, Result};
pub use parser::ast::{Ast, NodeId, NodeKind};
pub use parser::grammar::{parse, Parser};
pub use parser::tokenizer::{tokenize, Token, TokenKind};
pub use parser::parse_sql;
pub use schema::{validate, Column, DataType, Diagnostic, DiagnosticKind, Schema, Table};
pub use shell::{Session, Shell};
