//! Interactive front end
//!
//! Splits input into statements and dot commands, runs each statement
//! through the tokenizer, parser and validator, and prints what happened.
//! The binary in `src/bin/toysql.rs` is a thin wrapper around [`Shell`].

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::parser::ast::Ast;
use crate::parser::grammar::Parser;
use crate::parser::tokenizer::{tokenize, Token, TokenKind};
use crate::schema::{validate, Diagnostic, Schema, Table};

// ============================================================================
// Statement Splitting
// ============================================================================

/// One unit of shell input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// SQL text up to and including the line holding `;`
    Statement(String),
    /// A dot command line, e.g. `.schema users`
    Command(String),
    /// `exit` or `quit`
    Exit,
}

/// Accumulates lines until a statement is complete
#[derive(Debug, Default)]
pub struct StatementBuffer {
    buffer: String,
}

impl StatementBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line, returning an input once one is complete
    pub fn push_line(&mut self, line: &str) -> Option<Input> {
        let line = line.trim();
        if line.is_empty() || line.starts_with("--") {
            return None;
        }

        if is_exit(line) {
            self.buffer.clear();
            return Some(Input::Exit);
        }

        if self.buffer.is_empty() && line.starts_with('.') {
            return Some(Input::Command(line.to_string()));
        }

        self.buffer.push_str(line);
        self.buffer.push(' ');
        if line.contains(';') {
            let sql = self.buffer.trim_end().to_string();
            self.buffer.clear();
            return Some(Input::Statement(sql));
        }
        None
    }

    /// True when no partial statement is pending
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Flush a trailing statement that never saw its `;`
    pub fn finish(&mut self) -> Option<Input> {
        let sql = self.buffer.trim().to_string();
        self.buffer.clear();
        if sql.is_empty() {
            None
        } else {
            Some(Input::Statement(sql))
        }
    }
}

fn is_exit(line: &str) -> bool {
    let word = line.trim_end_matches(';').trim_end();
    word.eq_ignore_ascii_case("exit") || word.eq_ignore_ascii_case("quit")
}

/// Iterator over the inputs in a line-oriented reader
pub struct StatementReader<R> {
    reader: R,
    buffer: StatementBuffer,
    done: bool,
}

impl<R: BufRead> StatementReader<R> {
    pub fn new(reader: R) -> Self {
        StatementReader {
            reader,
            buffer: StatementBuffer::new(),
            done: false,
        }
    }
}

impl<R: BufRead> Iterator for StatementReader<R> {
    type Item = io::Result<Input>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut line = String::new();
        loop {
            line.clear();
            match self.reader.read_line(&mut line) {
                Ok(0) => {
                    self.done = true;
                    return self.buffer.finish().map(Ok);
                }
                Ok(_) => {
                    if let Some(input) = self.buffer.push_line(&line) {
                        if input == Input::Exit {
                            self.done = true;
                        }
                        return Some(Ok(input));
                    }
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

// ============================================================================
// Session
// ============================================================================

/// How a statement fared
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Parsed and validated without findings
    Valid,
    /// Parsed, but the validator reported problems
    Diagnostics(Vec<Diagnostic>),
    /// Parsing or table registration failed
    Failed(Error),
}

/// Everything produced while processing one statement
#[derive(Debug)]
pub struct Report {
    pub tokens: Vec<Token>,
    /// Syntax tree, present when parsing succeeded
    pub ast: Option<Ast>,
    pub outcome: Outcome,
    /// Name of the table added to the schema by a CREATE TABLE
    pub registered: Option<String>,
}

impl Report {
    pub fn is_valid(&self) -> bool {
        self.outcome == Outcome::Valid
    }
}

/// Schema and settings that persist across statements
#[derive(Debug, Default)]
pub struct Session {
    schema: Schema,
    config: Config,
}

impl Session {
    pub fn new(config: Config) -> Self {
        Session {
            schema: Schema::new(),
            config,
        }
    }

    /// Start from an existing schema
    pub fn with_schema(schema: Schema, config: Config) -> Self {
        Session { schema, config }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn schema_mut(&mut self) -> &mut Schema {
        &mut self.schema
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Tokenize, parse and validate one statement
    pub fn run(&mut self, sql: &str) -> Report {
        let tokens = tokenize(sql);
        let mut parser = Parser::with_config(tokens.clone(), &self.config);
        if let Err(err) = parser.parse() {
            return Report {
                tokens,
                ast: None,
                outcome: Outcome::Failed(err),
                registered: None,
            };
        }
        let ast = parser.into_ast();

        let diagnostics = validate(&ast, &self.schema);
        let mut registered = None;
        let outcome = if !diagnostics.is_empty() {
            Outcome::Diagnostics(diagnostics)
        } else if self.config.register_tables && is_create(&ast) {
            match self.register(&ast) {
                Ok(name) => {
                    registered = Some(name);
                    Outcome::Valid
                }
                Err(err) => Outcome::Failed(err),
            }
        } else {
            Outcome::Valid
        };

        Report {
            tokens,
            ast: Some(ast),
            outcome,
            registered,
        }
    }

    fn register(&mut self, ast: &Ast) -> Result<String> {
        let table = Table::from_create(ast)?;
        let name = table.name.clone();
        self.schema.add_table(table)?;
        Ok(name)
    }

    /// Print a report according to the display switches
    pub fn write_report<W: Write>(&self, out: &mut W, sql: &str, report: &Report) -> Result<()> {
        if self.config.echo {
            writeln!(out, "You entered: {}", sql)?;
        }
        if self.config.show_tokens {
            writeln!(out, "Tokens:")?;
            write!(out, "{}", format_tokens(&report.tokens))?;
        }
        if self.config.show_ast {
            if let Some(ast) = &report.ast {
                writeln!(out, "AST:")?;
                write!(out, "{}", ast.render())?;
            }
        }

        match &report.outcome {
            Outcome::Valid => writeln!(out, "OK")?,
            Outcome::Failed(err) => writeln!(out, "Error: {}", err)?,
            Outcome::Diagnostics(diagnostics) => {
                writeln!(out, "Validation failed: {} problem(s)", diagnostics.len())?;
                for diagnostic in diagnostics {
                    writeln!(out, "  {}", diagnostic)?;
                }
            }
        }
        if let Some(name) = &report.registered {
            writeln!(out, "Table {} added to schema", name)?;
        }
        Ok(())
    }
}

fn is_create(ast: &Ast) -> bool {
    ast.statement().is_some_and(|q| ast.value(q) == "CREATE")
}

/// Token table, one `KIND : value` line per token
pub fn format_tokens(tokens: &[Token]) -> String {
    let mut text = String::new();
    for token in tokens.iter().filter(|t| t.kind != TokenKind::Eof) {
        text.push_str(&format!("  {:<11} : {}\n", token.kind.as_str(), token.normalized));
    }
    text
}

// ============================================================================
// Shell
// ============================================================================

/// Command loop writing to `out`
pub struct Shell<W: Write> {
    session: Session,
    out: W,
}

impl<W: Write> Shell<W> {
    pub fn new(session: Session, out: W) -> Self {
        Shell { session, out }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Process every input from `reader`; returns false if it asked to exit
    pub fn run<R: BufRead>(&mut self, reader: R) -> Result<bool> {
        for input in StatementReader::new(reader) {
            if !self.handle(input?)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Process one input; returns false to stop the loop
    pub fn handle(&mut self, input: Input) -> Result<bool> {
        match input {
            Input::Exit => Ok(false),
            Input::Command(line) => self.dot_command(&line),
            Input::Statement(sql) => {
                let report = self.session.run(&sql);
                self.session.write_report(&mut self.out, &sql, &report)?;
                self.out.flush()?;
                Ok(true)
            }
        }
    }

    /// Process a dot command
    fn dot_command(&mut self, line: &str) -> Result<bool> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some(first) = parts.first() else {
            return Ok(true);
        };

        let cmd = first.to_lowercase();
        match cmd.as_str() {
            ".quit" | ".exit" | ".q" => return Ok(false),
            ".help" => self.print_help()?,
            ".tables" => {
                let names: Vec<&str> = self
                    .session
                    .schema()
                    .tables()
                    .iter()
                    .map(|t| t.name.as_str())
                    .collect();
                writeln!(self.out, "{}", names.join(" "))?;
            }
            ".schema" => match parts.get(1) {
                Some(name) => match self.session.schema().get_table(name) {
                    Some(table) => write!(self.out, "{}", table)?,
                    None => writeln!(self.out, "Error: no such table: {}", name)?,
                },
                None => write!(self.out, "{}", self.session.schema())?,
            },
            ".set" => match (parts.get(1), parts.get(2)) {
                (Some(key), Some(value)) => {
                    if let Err(e) = self.session.config_mut().set(key, value) {
                        writeln!(self.out, "Error: {}", e)?;
                    }
                }
                _ => self.print_settings()?,
            },
            ".read" => match parts.get(1) {
                Some(path) => return self.read_file(path),
                None => writeln!(self.out, "Error: .read requires a filename")?,
            },
            _ => writeln!(self.out, "Error: unknown command: {}", cmd)?,
        }
        self.out.flush()?;
        Ok(true)
    }

    fn read_file(&mut self, path: &str) -> Result<bool> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) => {
                writeln!(self.out, "Error: cannot open {}: {}", path, e)?;
                return Ok(true);
            }
        };
        tracing::debug!(target: "toysql.shell", path = %path, "reading script");
        self.run(BufReader::new(file))
    }

    fn print_help(&mut self) -> Result<()> {
        writeln!(
            self.out,
            r#".exit                  Exit this program
.help                  Show this message
.quit                  Exit this program
.read FILENAME         Process SQL in FILENAME
.schema ?TABLE?        Show known tables and their columns
.set ?KEY VALUE?       Change a setting (tokens, ast, echo, register, max_depth)
.tables                List names of tables"#
        )?;
        Ok(())
    }

    fn print_settings(&mut self) -> Result<()> {
        let config = self.session.config().clone();
        writeln!(self.out, "tokens: {}", on_off(config.show_tokens))?;
        writeln!(self.out, "ast: {}", on_off(config.show_ast))?;
        writeln!(self.out, "echo: {}", on_off(config.echo))?;
        writeln!(self.out, "register: {}", on_off(config.register_tables))?;
        writeln!(self.out, "max_depth: {}", config.max_depth)?;
        Ok(())
    }
}

fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}
