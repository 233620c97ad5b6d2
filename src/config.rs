//! Front-end configuration
//!
//! Parser limits and the display switches used by the shell. Everything has
//! a sensible default; the shell changes values through `.set KEY VALUE` and
//! command-line flags.

use crate::error::{Error, ErrorCode, Result};

// ============================================================================
// Defaults
// ============================================================================

/// Default bound on nested parentheses and subqueries
pub const DEFAULT_MAX_DEPTH: usize = 64;

// ============================================================================
// Config
// ============================================================================

/// Settings shared by the parser and the shell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Maximum nesting of parenthesised conditions and subqueries
    pub max_depth: usize,
    /// Print the token table for each statement
    pub show_tokens: bool,
    /// Print the syntax tree for each statement
    pub show_ast: bool,
    /// Echo each statement before processing it
    pub echo: bool,
    /// Add tables from valid CREATE TABLE statements to the session schema
    pub register_tables: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            show_tokens: true,
            show_ast: true,
            echo: false,
            register_tables: true,
        }
    }
}

impl Config {
    /// Create the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value by name (`max_depth`, `tokens`, `ast`, `echo`, `register`)
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key.to_ascii_lowercase().as_str() {
            "max_depth" | "depth" => {
                let depth: usize = value.parse().map_err(|_| {
                    Error::with_message(
                        ErrorCode::Misuse,
                        format!("invalid depth: {}", value),
                    )
                })?;
                if depth == 0 {
                    return Err(Error::with_message(
                        ErrorCode::Misuse,
                        "depth must be at least 1",
                    ));
                }
                self.max_depth = depth;
            }
            "tokens" | "show_tokens" => self.show_tokens = parse_switch(value)?,
            "ast" | "show_ast" => self.show_ast = parse_switch(value)?,
            "echo" => self.echo = parse_switch(value)?,
            "register" | "register_tables" => self.register_tables = parse_switch(value)?,
            _ => {
                return Err(Error::with_message(
                    ErrorCode::Misuse,
                    format!("unknown setting: {}", key),
                ))
            }
        }
        Ok(())
    }
}

/// Parse an on/off style switch
fn parse_switch(value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "on" | "yes" | "true" | "1" => Ok(true),
        "off" | "no" | "false" | "0" => Ok(false),
        _ => Err(Error::with_message(
            ErrorCode::Misuse,
            format!("expected on or off, got {}", value),
        )),
    }
}
