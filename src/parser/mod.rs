//! SQL parser: tokenization and AST

pub mod ast;
pub mod grammar;
pub mod tokenizer;

use crate::error::Result;

/// Tokenize and parse one statement
pub fn parse_sql(sql: &str) -> Result<ast::Ast> {
    grammar::parse(tokenizer::tokenize(sql))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ast::NodeKind;

    #[test]
    fn test_parse_sql() {
        let ast = parse_sql("DELETE FROM users WHERE id = 3;").unwrap();
        let query = ast.statement().unwrap();
        assert_eq!(ast.kind(query), NodeKind::Query);
        assert_eq!(ast.value(query), "DELETE");
        assert!(parse_sql("DROP TABLE users").is_err());
    }
}
