//! Expression parser for node types, conditions and filters
//!
//! ```text
//! expr   := name params? args?
//! params := '{' <anything but braces> '}'
//! args   := '(' [expr (',' expr)*] ')'
//! ```
//!
//! Whitespace between tokens is ignored. Parameters are handed to the
//! factories verbatim, trimmed.

use crate::error::{AiError, Result};

/// Deepest accepted nesting of `(..)` argument lists
pub const MAX_DEPTH: usize = 64;

/// One parsed `Name{params}(args)` expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expr {
    pub name: String,
    pub parameters: String,
    pub args: Vec<Expr>,
}

impl Expr {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            parameters: String::new(),
            args: Vec::new(),
        }
    }
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn error(&self, reason: impl Into<String>) -> AiError {
        AiError::Syntax {
            input: self.input.to_string(),
            offset: self.pos,
            reason: reason.into(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if !c.is_whitespace() {
                break;
            }
            self.pos += c.len_utf8();
        }
    }

    fn eat(&mut self, expected: char) -> bool {
        self.skip_whitespace();
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn name(&mut self) -> Result<String> {
        self.skip_whitespace();
        let start = self.pos;
        while let Some(c) = self.peek() {
            if !(c.is_alphanumeric() || c == '_' || c == ':') {
                break;
            }
            self.pos += c.len_utf8();
        }
        if start == self.pos {
            return Err(self.error("expected a name"));
        }
        Ok(self.input[start..self.pos].to_string())
    }

    fn parameters(&mut self) -> Result<String> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            match c {
                '}' => {
                    let parameters = self.input[start..self.pos].trim().to_string();
                    self.pos += 1;
                    return Ok(parameters);
                }
                '{' => return Err(self.error("nested '{' in parameters")),
                _ => self.pos += c.len_utf8(),
            }
        }
        Err(self.error("unterminated parameters, missing '}'"))
    }

    fn expr(&mut self) -> Result<Expr> {
        let mut expr = Expr::new(&self.name()?);
        if self.eat('{') {
            expr.parameters = self.parameters()?;
        }
        if self.eat('(') {
            if self.depth == MAX_DEPTH {
                return Err(self.error(format!("nesting deeper than {} levels", MAX_DEPTH)));
            }
            self.depth += 1;
            if !self.eat(')') {
                loop {
                    expr.args.push(self.expr()?);
                    if self.eat(',') {
                        continue;
                    }
                    if self.eat(')') {
                        break;
                    }
                    return Err(self.error("expected ',' or ')'"));
                }
            }
            self.depth -= 1;
        }
        Ok(expr)
    }
}

/// Parse a complete expression such as `And(HasEnemies{2},Not(IsInGroup))`
pub fn parse_expression(input: &str) -> Result<Expr> {
    let mut parser = Parser {
        input,
        pos: 0,
        depth: 0,
    };
    let expr = parser.expr()?;
    parser.skip_whitespace();
    if parser.pos != input.len() {
        return Err(parser.error("unexpected trailing input"));
    }
    Ok(expr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_name() {
        let expr = parse_expression("  True ").unwrap();
        assert_eq!(expr, Expr::new("True"));
    }

    #[test]
    fn test_parameters_and_args() {
        let expr = parse_expression("Random{2}( SelectZone , Union(SelectHighestAggro,SelectGroupMembers{ 3 }) )").unwrap();
        assert_eq!(expr.name, "Random");
        assert_eq!(expr.parameters, "2");
        assert_eq!(expr.args.len(), 2);
        assert_eq!(expr.args[1].args[1].name, "SelectGroupMembers");
        assert_eq!(expr.args[1].args[1].parameters, "3");
    }

    #[test]
    fn test_empty_args() {
        let expr = parse_expression("And()").unwrap();
        assert!(expr.args.is_empty());
    }

    #[test]
    fn test_node_type() {
        let expr = parse_expression("ProbabilitySelector{0.5,0.5}").unwrap();
        assert_eq!(expr.name, "ProbabilitySelector");
        assert_eq!(expr.parameters, "0.5,0.5");

        let steer = parse_expression("Steer{0.7,0.3}(GroupFlee{2},TargetSeek{1:0:-1})").unwrap();
        assert_eq!(steer.args[1].parameters, "1:0:-1");
    }

    #[test]
    fn test_syntax_errors_report_offset() {
        match parse_expression("Not(True") {
            Err(AiError::Syntax { offset, .. }) => assert_eq!(offset, 8),
            other => panic!("unexpected {:?}", other),
        }
        assert!(parse_expression("Limit{3").is_err());
        assert!(parse_expression("").is_err());
        assert!(parse_expression("True False").is_err());
        assert!(parse_expression("And(True,)").is_err());
    }

    #[test]
    fn test_nesting_depth_capped() {
        let nested = |depth: usize| format!("{}True{}", "Not(".repeat(depth), ")".repeat(depth));

        let expr = parse_expression(&nested(MAX_DEPTH)).unwrap();
        assert_eq!(expr.name, "Not");

        match parse_expression(&nested(100_000)) {
            Err(AiError::Syntax { offset, reason, .. }) => {
                assert_eq!(offset, (MAX_DEPTH + 1) * 4);
                assert!(reason.contains("nesting"), "{}", reason);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
