//! SQL tokenization
//!
//! Splits one statement into classified tokens. The scanner accumulates
//! word characters until a delimiter (whitespace, punctuation, operator or
//! quote) arrives, then classifies the accumulated word. Lexical problems
//! never abort the scan: they become `TokenKind::Error` tokens and the
//! parser decides what to do with them.

use std::collections::HashSet;
use std::fmt;

use lazy_static::lazy_static;

// ============================================================================
// Token Types
// ============================================================================

/// Token kind enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Keyword,
    Identifier,
    Operator,
    Datatype,
    /// Folded multi-word constraint (`PRIMARY_KEY`, `NOT_NULL`, `FOREIGN_KEY`)
    Constraint,
    Number,
    Double,
    String,
    Date,
    Punctuation,
    /// Unrecognised character run or unterminated literal
    Error,
    Eof,
}

impl TokenKind {
    /// Upper-case display name used in token dumps
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Keyword => "KEYWORD",
            TokenKind::Identifier => "IDENTIFIER",
            TokenKind::Operator => "OPERATOR",
            TokenKind::Datatype => "DATATYPE",
            TokenKind::Constraint => "CONSTRAINT",
            TokenKind::Number => "NUMBER",
            TokenKind::Double => "DOUBLE",
            TokenKind::String => "STRING",
            TokenKind::Date => "DATE",
            TokenKind::Punctuation => "PUNCTUATION",
            TokenKind::Error => "ERROR",
            TokenKind::Eof => "EOF",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Vocabulary
// ============================================================================

lazy_static! {
    static ref KEYWORDS: HashSet<&'static str> = [
        "SELECT", "FROM", "WHERE", "INSERT", "INTO", "VALUES", "UPDATE", "SET", "DELETE",
        "CREATE", "TABLE", "DROP", "ALTER", "ADD", "NULL", "PRIMARY", "FOREIGN", "KEY",
        "DEFAULT", "UNIQUE", "REFERENCES", "DISTINCT", "AS", "JOIN", "INNER", "LEFT",
        "RIGHT", "FULL", "OUTER", "ON", "GROUP", "BY", "HAVING", "ORDER", "ASC", "DESC",
        "LIMIT", "TRUE", "FALSE",
    ]
    .into_iter()
    .collect();

    /// Operators spelled as words; classified as keywords for the grammar
    static ref OPERATOR_WORDS: HashSet<&'static str> = [
        "AND", "OR", "NOT", "IN", "LIKE", "BETWEEN", "IS", "EXISTS", "ALL", "ANY",
    ]
    .into_iter()
    .collect();

    static ref DATATYPES: HashSet<&'static str> = [
        "INT", "INTEGER", "VARCHAR", "CHAR", "TEXT", "FLOAT", "DOUBLE", "DATE", "BOOLEAN",
    ]
    .into_iter()
    .collect();

    static ref CONSTRAINT_WORDS: HashSet<&'static str> =
        ["PRIMARY_KEY", "NOT_NULL", "FOREIGN_KEY"].into_iter().collect();
}

/// Keyword pairs folded into a single constraint token
const CONSTRAINT_PAIRS: [(&str, &str, &str); 3] = [
    ("PRIMARY", "KEY", "PRIMARY_KEY"),
    ("NOT", "NULL", "NOT_NULL"),
    ("FOREIGN", "KEY", "FOREIGN_KEY"),
];

// ============================================================================
// Token
// ============================================================================

/// A token from the SQL source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Token type
    pub kind: TokenKind,
    /// Upper-cased for keywords, datatypes and constraints; unquoted content
    /// for string and date literals; verbatim otherwise
    pub normalized: String,
    /// Source text exactly as written
    pub original: String,
    /// Byte offset of the first character
    pub offset: usize,
    /// Line number (1-based)
    pub line: u32,
    /// Column number (1-based)
    pub column: u32,
}

impl Token {
    /// Create a new token
    pub fn new(
        kind: TokenKind,
        normalized: impl Into<String>,
        original: impl Into<String>,
        offset: usize,
        line: u32,
        column: u32,
    ) -> Self {
        Token {
            kind,
            normalized: normalized.into(),
            original: original.into(),
            offset,
            line,
            column,
        }
    }

    /// Byte offset one past the last character
    pub fn end(&self) -> usize {
        self.offset + self.original.len()
    }

    /// Check for a specific keyword (case-insensitive)
    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.kind == TokenKind::Keyword && self.normalized.eq_ignore_ascii_case(keyword)
    }

    /// Check for a specific punctuation character
    pub fn is_punct(&self, punct: char) -> bool {
        self.kind == TokenKind::Punctuation && self.normalized.len() == 1 && self.normalized.starts_with(punct)
    }

    /// Check for a specific operator
    pub fn is_operator(&self, op: &str) -> bool {
        self.kind == TokenKind::Operator && self.normalized == op
    }

    /// Check for a specific folded constraint
    pub fn is_constraint(&self, name: &str) -> bool {
        self.kind == TokenKind::Constraint && self.normalized == name
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.normalized)
    }
}

// ============================================================================
// Tokenizer
// ============================================================================

/// Start of the word currently being accumulated
#[derive(Debug, Clone, Copy)]
struct Pending {
    start: usize,
    line: u32,
    column: u32,
}

/// SQL tokenizer
pub struct Tokenizer<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
    line: u32,
    column: u32,
    pending: Option<Pending>,
    tokens: Vec<Token>,
}

impl<'a> Tokenizer<'a> {
    /// Create a new tokenizer
    pub fn new(source: &'a str) -> Self {
        Tokenizer {
            source,
            bytes: source.as_bytes(),
            pos: 0,
            line: 1,
            column: 1,
            pending: None,
            tokens: Vec::new(),
        }
    }

    /// Tokenize the entire source. The result always ends with `Eof`.
    pub fn tokenize(mut self) -> Vec<Token> {
        while !self.is_eof() {
            let c = self.current();
            match c {
                b' ' | b'\t' | b'\r' | b'\n' => {
                    self.flush();
                    self.advance();
                }
                b'\'' => {
                    self.flush();
                    self.scan_string();
                }
                b',' | b';' | b'(' | b')' => {
                    self.flush();
                    self.emit_single(TokenKind::Punctuation);
                }
                b'.' => {
                    if self.number_takes_dot() {
                        self.advance();
                    } else {
                        self.flush();
                        self.emit_single(TokenKind::Punctuation);
                    }
                }
                b'+' | b'-' if self.starts_signed_number() => {
                    self.begin_word();
                    self.advance();
                }
                b'+' | b'-' | b'*' | b'/' | b'=' | b'<' | b'>' | b'!' => {
                    self.flush();
                    self.scan_operator();
                }
                b'&' | b'|' if self.peek() == Some(c) => {
                    self.flush();
                    self.scan_operator();
                }
                _ => {
                    self.begin_word();
                    self.advance();
                }
            }
        }

        self.flush();
        let (offset, line, column) = (self.pos, self.line, self.column);
        self.tokens
            .push(Token::new(TokenKind::Eof, "", "", offset, line, column));

        let errors = self
            .tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Error)
            .count();
        tracing::debug!(
            target: "toysql.parse",
            tokens = self.tokens.len(),
            errors,
            "tokenized statement"
        );
        self.tokens
    }

    /// Scan a quoted string or date literal
    fn scan_string(&mut self) {
        let start = self.pos;
        let (line, column) = (self.line, self.column);
        self.advance(); // opening quote

        let mut content = String::new();
        let mut segment = self.pos;
        loop {
            if self.is_eof() {
                // Nothing after an unterminated quote is tokenized.
                self.push(Token::new(
                    TokenKind::Error,
                    "unclosed_string_literal",
                    &self.source[start..],
                    start,
                    line,
                    column,
                ));
                return;
            }
            if self.current() == b'\'' {
                content.push_str(&self.source[segment..self.pos]);
                if self.peek() == Some(b'\'') {
                    content.push('\'');
                    self.advance();
                    self.advance();
                    segment = self.pos;
                    continue;
                }
                self.advance(); // closing quote
                break;
            }
            self.advance();
        }

        let kind = if is_date_literal(&content) {
            TokenKind::Date
        } else {
            TokenKind::String
        };
        let original = &self.source[start..self.pos];
        self.push(Token::new(kind, content, original, start, line, column));
    }

    /// Scan a one- or two-character operator
    fn scan_operator(&mut self) {
        let start = self.pos;
        let (line, column) = (self.line, self.column);
        let c = self.current();
        self.advance();

        if !self.is_eof() {
            let two = matches!(
                (c, self.current()),
                (b'<', b'=') | (b'>', b'=') | (b'<', b'>') | (b'!', b'=') | (b'&', b'&') | (b'|', b'|')
            );
            if two {
                self.advance();
            }
        }

        let text = &self.source[start..self.pos];
        self.push(Token::new(TokenKind::Operator, text, text, start, line, column));
    }

    /// Emit the current character as a token of its own
    fn emit_single(&mut self, kind: TokenKind) {
        let start = self.pos;
        let (line, column) = (self.line, self.column);
        self.advance();
        let text = &self.source[start..self.pos];
        self.push(Token::new(kind, text, text, start, line, column));
    }

    /// Start accumulating a word unless one is already pending
    fn begin_word(&mut self) {
        if self.pending.is_none() {
            self.pending = Some(Pending {
                start: self.pos,
                line: self.line,
                column: self.column,
            });
        }
    }

    /// Classify and emit the pending word, if any
    fn flush(&mut self) {
        if let Some(pending) = self.pending.take() {
            let word = &self.source[pending.start..self.pos];
            let (kind, normalized) = classify_word(word);
            self.push(Token::new(
                kind,
                normalized,
                word,
                pending.start,
                pending.line,
                pending.column,
            ));
        }
    }

    /// Append a token, folding multi-word constraints
    fn push(&mut self, token: Token) {
        tracing::trace!(
            target: "toysql.parse",
            kind = %token.kind,
            value = %token.normalized,
            line = token.line,
            column = token.column,
            "token"
        );

        if token.kind == TokenKind::Keyword {
            if let Some(prev) = self.tokens.last() {
                if prev.kind == TokenKind::Keyword {
                    let folded = CONSTRAINT_PAIRS
                        .iter()
                        .find(|(first, second, _)| {
                            prev.normalized == *first && token.normalized == *second
                        })
                        .map(|(_, _, name)| *name);
                    if let Some(name) = folded {
                        let start = prev.offset;
                        let (line, column) = (prev.line, prev.column);
                        let original = &self.source[start..token.end()];
                        self.tokens.pop();
                        self.tokens.push(Token::new(
                            TokenKind::Constraint,
                            name,
                            original,
                            start,
                            line,
                            column,
                        ));
                        return;
                    }
                }
            }
        }

        self.tokens.push(token);
    }

    /// A sign opens a number only where an operand is expected
    fn starts_signed_number(&self) -> bool {
        if self.pending.is_some() {
            return false;
        }
        if !matches!(self.peek(), Some(d) if d.is_ascii_digit()) {
            return false;
        }
        match self.tokens.last() {
            None => true,
            Some(prev) => match prev.kind {
                TokenKind::Operator | TokenKind::Keyword | TokenKind::Constraint => true,
                TokenKind::Punctuation => prev.is_punct('(') || prev.is_punct(','),
                _ => false,
            },
        }
    }

    /// A dot continues a pending integer when a digit follows
    fn number_takes_dot(&self) -> bool {
        let Some(pending) = self.pending else {
            return false;
        };
        if !matches!(self.peek(), Some(d) if d.is_ascii_digit()) {
            return false;
        }
        let word = &self.source[pending.start..self.pos];
        let digits = word.strip_prefix(['+', '-']).unwrap_or(word);
        !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
    }

    /// Check if at end of input
    fn is_eof(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    /// Get current byte
    fn current(&self) -> u8 {
        self.bytes[self.pos]
    }

    /// Peek at next byte
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos + 1).copied()
    }

    /// Advance to next byte, keeping line and column current
    fn advance(&mut self) {
        let c = self.bytes[self.pos];
        self.pos += 1;
        if c == b'\n' {
            self.line += 1;
            self.column = 1;
        } else if c & 0xC0 != 0x80 {
            // Continuation bytes belong to the character already counted.
            self.column += 1;
        }
    }
}

// ============================================================================
// Word Classification
// ============================================================================

/// Classify an accumulated word, returning its kind and normalized value
fn classify_word(word: &str) -> (TokenKind, String) {
    let upper = word.to_ascii_uppercase();
    if KEYWORDS.contains(upper.as_str()) || OPERATOR_WORDS.contains(upper.as_str()) {
        return (TokenKind::Keyword, upper);
    }
    if CONSTRAINT_WORDS.contains(upper.as_str()) {
        return (TokenKind::Constraint, upper);
    }
    if DATATYPES.contains(upper.as_str()) {
        return (TokenKind::Datatype, upper);
    }
    if is_double(word) {
        return (TokenKind::Double, word.to_string());
    }
    if is_integer(word) {
        return (TokenKind::Number, word.to_string());
    }
    if is_identifier(word) {
        return (TokenKind::Identifier, word.to_string());
    }
    (TokenKind::Error, word.to_string())
}

fn strip_sign(word: &str) -> &str {
    word.strip_prefix(['+', '-']).unwrap_or(word)
}

/// Optional sign followed by digits only
fn is_integer(word: &str) -> bool {
    let digits = strip_sign(word);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Optional sign, digits, one dot, digits
fn is_double(word: &str) -> bool {
    let body = strip_sign(word);
    match body.split_once('.') {
        Some((whole, frac)) => {
            !whole.is_empty()
                && !frac.is_empty()
                && whole.bytes().all(|b| b.is_ascii_digit())
                && frac.bytes().all(|b| b.is_ascii_digit())
        }
        None => false,
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`
fn is_identifier(word: &str) -> bool {
    let mut bytes = word.bytes();
    match bytes.next() {
        Some(first) if first.is_ascii_alphabetic() || first == b'_' => {}
        _ => return false,
    }
    bytes.all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

/// Strict `DDDD-DD-DD` with month 1-12 and day 1-31
pub fn is_date_literal(text: &str) -> bool {
    let b = text.as_bytes();
    if b.len() != 10 || b[4] != b'-' || b[7] != b'-' {
        return false;
    }
    let digits_ok = b
        .iter()
        .enumerate()
        .all(|(i, c)| i == 4 || i == 7 || c.is_ascii_digit());
    if !digits_ok {
        return false;
    }
    let month = (b[5] - b'0') * 10 + (b[6] - b'0');
    let day = (b[8] - b'0') * 10 + (b[9] - b'0');
    (1..=12).contains(&month) && (1..=31).contains(&day)
}

// ============================================================================
// Public API
// ============================================================================

/// Tokenize a SQL string
pub fn tokenize(source: &str) -> Vec<Token> {
    Tokenizer::new(source).tokenize()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(tokens: &[Token]) -> Vec<TokenKind> {
        tokens.iter().map(|t| t.kind).collect()
    }

    fn values(tokens: &[Token]) -> Vec<&str> {
        tokens.iter().map(|t| t.normalized.as_str()).collect()
    }

    #[test]
    fn test_tokenize_select_star() {
        let tokens = tokenize("SELECT * FROM users;");
        assert_eq!(
            kinds(&tokens),
            vec![
                TokenKind::Keyword,
                TokenKind::Operator,
                TokenKind::Keyword,
                TokenKind::Identifier,
                TokenKind::Punctuation,
                TokenKind::Eof,
            ]
        );
        assert_eq!(values(&tokens), vec!["SELECT", "*", "FROM", "users", ";", ""]);
    }

    #[test]
    fn test_tokenize_case_insensitive() {
        let tokens = tokenize("select FROM Where");
        assert_eq!(values(&tokens)[..3], ["SELECT", "FROM", "WHERE"]);
        assert_eq!(tokens[0].original, "select");
        assert_eq!(tokens[2].original, "Where");
    }

    #[test]
    fn test_tokenize_identifiers() {
        let tokens = tokenize("foo bar123 _baz");
        assert_eq!(tokens[0].kind, TokenKind::Identifier);
        assert_eq!(tokens[1].kind, TokenKind::Identifier);
        assert_eq!(tokens[2].kind, TokenKind::Identifier);
        assert_eq!(tokens[1].normalized, "bar123");
    }

    #[test]
    fn test_tokenize_datatypes() {
        let tokens = tokenize("int Varchar(50) DOUBLE");
        assert_eq!(tokens[0].kind, TokenKind::Datatype);
        assert_eq!(tokens[0].normalized, "INT");
        assert_eq!(tokens[1].normalized, "VARCHAR");
        assert!(tokens[2].is_punct('('));
        assert_eq!(tokens[3].kind, TokenKind::Number);
        assert!(tokens[4].is_punct(')'));
        assert_eq!(tokens[5].kind, TokenKind::Datatype);
    }

    #[test]
    fn test_tokenize_numbers() {
        let tokens = tokenize("42 3.14 99.99");
        assert_eq!(tokens[0].kind, TokenKind::Number);
        assert_eq!(tokens[1].kind, TokenKind::Double);
        assert_eq!(tokens[1].normalized, "3.14");
        assert_eq!(tokens[2].kind, TokenKind::Double);
    }

    #[test]
    fn test_signed_number_after_operator() {
        let tokens = tokenize("salary = -1500.50");
        assert_eq!(tokens[2].kind, TokenKind::Double);
        assert_eq!(tokens[2].normalized, "-1500.50");
    }

    #[test]
    fn test_minus_after_identifier_is_operator() {
        let tokens = tokenize("a-1");
        assert_eq!(
            kinds(&tokens),
            vec![
                TokenKind::Identifier,
                TokenKind::Operator,
                TokenKind::Number,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_second_dot_ends_number() {
        let tokens = tokenize("1.2.3");
        assert_eq!(tokens[0].kind, TokenKind::Double);
        assert_eq!(tokens[0].normalized, "1.2");
        assert!(tokens[1].is_punct('.'));
        assert_eq!(tokens[2].kind, TokenKind::Number);
    }

    #[test]
    fn test_qualified_column_splits_on_dot() {
        let tokens = tokenize("u.id");
        assert_eq!(values(&tokens), vec!["u", ".", "id", ""]);
        assert!(tokens[1].is_punct('.'));
    }

    #[test]
    fn test_tokenize_strings_and_dates() {
        let tokens = tokenize("'hello' 'it''s' '2023-12-25' '2023-13-01'");
        assert_eq!(tokens[0].kind, TokenKind::String);
        assert_eq!(tokens[0].normalized, "hello");
        assert_eq!(tokens[0].original, "'hello'");
        assert_eq!(tokens[1].normalized, "it's");
        assert_eq!(tokens[2].kind, TokenKind::Date);
        assert_eq!(tokens[2].normalized, "2023-12-25");
        assert_eq!(tokens[3].kind, TokenKind::String);
    }

    #[test]
    fn test_date_pattern() {
        assert!(is_date_literal("2024-01-31"));
        assert!(!is_date_literal("2024-00-10"));
        assert!(!is_date_literal("2024-01-32"));
        assert!(!is_date_literal("2024-1-31"));
        assert!(!is_date_literal("20a4-01-31"));
    }

    #[test]
    fn test_unclosed_string() {
        let tokens = tokenize("SELECT * FROM t WHERE name = 'abc;");
        let errors: Vec<_> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Error)
            .collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].normalized, "unclosed_string_literal");
        assert_eq!(errors[0].original, "'abc;");
        assert_eq!(tokens.last().map(|t| t.kind), Some(TokenKind::Eof));
    }

    #[test]
    fn test_tokenize_operators() {
        let tokens = tokenize("+ - * / = <> != <= >= < > ! && ||");
        let ops: Vec<&str> = tokens
            .iter()
            .take_while(|t| t.kind == TokenKind::Operator)
            .map(|t| t.normalized.as_str())
            .collect();
        assert_eq!(
            ops,
            vec!["+", "-", "*", "/", "=", "<>", "!=", "<=", ">=", "<", ">", "!", "&&", "||"]
        );
    }

    #[test]
    fn test_operators_split_words() {
        let tokens = tokenize("age>=18");
        assert_eq!(values(&tokens), vec!["age", ">=", "18", ""]);
    }

    #[test]
    fn test_lone_ampersand_is_error() {
        let tokens = tokenize("a & b");
        assert_eq!(tokens[1].kind, TokenKind::Error);
        assert_eq!(tokens[1].normalized, "&");
    }

    #[test]
    fn test_operator_words_are_keywords() {
        let tokens = tokenize("and Or not in like between is exists all any");
        assert!(tokens[..10].iter().all(|t| t.kind == TokenKind::Keyword));
        assert_eq!(tokens[1].normalized, "OR");
    }

    #[test]
    fn test_primary_key_folds() {
        let tokens = tokenize("id INT PRIMARY KEY");
        assert_eq!(tokens.len(), 4);
        assert_eq!(tokens[2].kind, TokenKind::Constraint);
        assert_eq!(tokens[2].normalized, "PRIMARY_KEY");
        assert_eq!(tokens[2].original, "PRIMARY KEY");
    }

    #[test]
    fn test_not_null_and_foreign_key_fold() {
        let tokens = tokenize("NOT NULL foreign   key");
        assert!(tokens[0].is_constraint("NOT_NULL"));
        assert!(tokens[1].is_constraint("FOREIGN_KEY"));
        assert_eq!(tokens[1].original, "foreign   key");
    }

    #[test]
    fn test_primary_without_key_does_not_fold() {
        let tokens = tokenize("PRIMARY INDEX");
        assert_eq!(tokens[0].kind, TokenKind::Keyword);
        assert_eq!(tokens[0].normalized, "PRIMARY");
        assert_eq!(tokens[1].kind, TokenKind::Identifier);
    }

    #[test]
    fn test_folded_constraint_is_terminal() {
        // KEY after a folded PRIMARY_KEY stays a keyword
        let tokens = tokenize("PRIMARY KEY KEY");
        assert!(tokens[0].is_constraint("PRIMARY_KEY"));
        assert!(tokens[1].is_keyword("KEY"));
    }

    #[test]
    fn test_single_word_constraint() {
        let tokens = tokenize("FOREIGN_KEY not_null");
        assert!(tokens[0].is_constraint("FOREIGN_KEY"));
        assert!(tokens[1].is_constraint("NOT_NULL"));
    }

    #[test]
    fn test_constraint_retokenizes_to_same_kind() {
        for source in ["PRIMARY KEY", "NOT NULL", "FOREIGN KEY", "SELECT", "between"] {
            let first = &tokenize(source)[0];
            let again = &tokenize(&first.original)[0];
            assert_eq!(first.kind, again.kind);
            assert_eq!(first.normalized, again.normalized);
        }
    }

    #[test]
    fn test_unknown_word_is_error() {
        let tokens = tokenize("9abc");
        assert_eq!(tokens[0].kind, TokenKind::Error);
        assert_eq!(tokens[0].normalized, "9abc");
    }

    #[test]
    fn test_token_position() {
        let tokens = tokenize("SELECT\n  name\nFROM t");
        assert_eq!((tokens[0].line, tokens[0].column), (1, 1));
        assert_eq!((tokens[1].line, tokens[1].column), (2, 3));
        assert_eq!(tokens[1].offset, 9);
        assert_eq!((tokens[2].line, tokens[2].column), (3, 1));
    }

    #[test]
    fn test_newline_inside_string_advances_line() {
        let tokens = tokenize("'a\nb' x");
        assert_eq!(tokens[0].normalized, "a\nb");
        assert_eq!(tokens[1].line, 2);
        assert_eq!(tokens[1].column, 4);
    }

    #[test]
    fn test_multibyte_column() {
        let tokens = tokenize("'é' x");
        assert_eq!(tokens[1].column, 5);
    }
}
