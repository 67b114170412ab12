//! Recursive-descent parser for filter expressions
//!
//! ```text
//! filter    := [WHERE] or_expr EOF
//! or_expr   := and_expr ((OR | '||') and_expr)*
//! and_expr  := unary ((AND | '&&') unary)*
//! unary     := (NOT | '!') unary | primary
//! primary   := '(' or_expr ')' | predicate
//! predicate := key cmp_op literal
//!            | key [NOT] IN '(' literal (',' literal)* ')'
//!            | key NIN '(' literal (',' literal)* ')'
//! key       := IDENT ('.' IDENT)* | QUOTED_STRING
//! literal   := QUOTED_STRING | NUMBER | TRUE | FALSE
//! ```
//!
//! Positions in errors are reported against the `WHERE`-prefixed text (see
//! [`FilterParseError`]).

use vectormap_core::MetadataValue;

use crate::ast::{ComparisonOp, FilterExpression};
use crate::error::{FilterParseError, FilterResult};
use crate::lexer::{tokenize, Token, TokenKind};

const WHERE_PREFIX: &str = "WHERE ";

/// Parse filter text into an expression tree
///
/// # Example
///
/// ```
/// use vectormap_filter::parse;
///
/// let expr = parse("country == 'BG' && year >= 2020").unwrap();
/// assert_eq!(expr.to_string(), "(country == 'BG' && year >= 2020)");
///
/// let err = parse("country == NL").unwrap_err();
/// assert_eq!(err.to_string(), "Line: 1:17, Error: no viable alternative at input 'NL'");
/// ```
pub fn parse(text: &str) -> FilterResult<FilterExpression> {
    let tokens = if starts_with_where(text) {
        tokenize(text)?
    } else {
        tokenize(&format!("{}{}", WHERE_PREFIX, text))?
    };
    Parser { tokens, pos: 0 }.filter()
}

fn starts_with_where(text: &str) -> bool {
    let head: String = text.chars().take(6).collect();
    let mut chars = head.chars();
    let keyword: String = chars.by_ref().take(5).collect();
    keyword.eq_ignore_ascii_case("where")
        && chars
            .next()
            .map_or(true, |c| !(c.is_alphanumeric() || c == '_'))
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        // tokenize() guarantees a trailing Eof, and advance() never moves past it
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.peek().kind == kind
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn error_at(token: &Token, message: String) -> FilterParseError {
        FilterParseError::new(token.line, token.column, message)
    }

    fn no_viable_alternative(&self) -> FilterParseError {
        let token = self.peek();
        Self::error_at(
            token,
            format!("no viable alternative at input '{}'", token.text),
        )
    }

    fn mismatched(&self, expecting: &str) -> FilterParseError {
        let token = self.peek();
        Self::error_at(
            token,
            format!("mismatched input '{}' expecting {}", token.text, expecting),
        )
    }

    fn filter(mut self) -> FilterResult<FilterExpression> {
        self.eat(&TokenKind::Where);
        let expr = self.or_expr()?;
        if !self.check(&TokenKind::Eof) {
            let token = self.peek();
            return Err(Self::error_at(
                token,
                format!("extraneous input '{}' expecting <EOF>", token.text),
            ));
        }
        Ok(expr)
    }

    fn or_expr(&mut self) -> FilterResult<FilterExpression> {
        let mut left = self.and_expr()?;
        while self.eat(&TokenKind::Or) {
            let right = self.and_expr()?;
            left = FilterExpression::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> FilterResult<FilterExpression> {
        let mut left = self.unary()?;
        while self.eat(&TokenKind::And) {
            let right = self.unary()?;
            left = FilterExpression::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn unary(&mut self) -> FilterResult<FilterExpression> {
        if self.eat(&TokenKind::Not) {
            let inner = self.unary()?;
            return Ok(FilterExpression::Not(Box::new(inner)));
        }
        self.primary()
    }

    fn primary(&mut self) -> FilterResult<FilterExpression> {
        if self.eat(&TokenKind::LParen) {
            let inner = self.or_expr()?;
            if !self.eat(&TokenKind::RParen) {
                let token = self.peek();
                return Err(Self::error_at(
                    token,
                    format!("missing ')' at '{}'", token.text),
                ));
            }
            return Ok(inner);
        }
        self.predicate()
    }

    fn key(&mut self) -> FilterResult<String> {
        match self.peek().kind.clone() {
            TokenKind::Str(s) => {
                self.advance();
                Ok(s)
            }
            TokenKind::Ident(first) => {
                self.advance();
                let mut key = first;
                while self.check(&TokenKind::Dot) {
                    self.advance();
                    match self.peek().kind.clone() {
                        TokenKind::Ident(segment) => {
                            self.advance();
                            key.push('.');
                            key.push_str(&segment);
                        }
                        _ => return Err(self.mismatched("IDENTIFIER")),
                    }
                }
                Ok(key)
            }
            _ => Err(self.no_viable_alternative()),
        }
    }

    fn predicate(&mut self) -> FilterResult<FilterExpression> {
        let key = self.key()?;

        let op = match self.peek().kind.clone() {
            TokenKind::Eq => Some(ComparisonOp::Eq),
            TokenKind::Ne => Some(ComparisonOp::Ne),
            TokenKind::Gt => Some(ComparisonOp::Gt),
            TokenKind::Ge => Some(ComparisonOp::Ge),
            TokenKind::Lt => Some(ComparisonOp::Lt),
            TokenKind::Le => Some(ComparisonOp::Le),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let value = self.literal()?;
            if op.is_ordering() && matches!(value, MetadataValue::Bool(_)) {
                return Err(FilterParseError::new(
                    self.tokens[self.pos - 1].line,
                    self.tokens[self.pos - 1].column,
                    format!(
                        "mismatched input '{}' expecting {{NUMBER, STRING}}",
                        self.tokens[self.pos - 1].text
                    ),
                ));
            }
            return Ok(FilterExpression::Compare { key, op, value });
        }

        let negated = match self.peek().kind.clone() {
            TokenKind::In => false,
            TokenKind::Nin => true,
            TokenKind::Not => {
                self.advance();
                if !self.check(&TokenKind::In) {
                    return Err(self.mismatched("IN"));
                }
                true
            }
            _ => {
                return Err(self.mismatched(
                    "{'==', '!=', '>', '>=', '<', '<=', IN, NIN, NOT IN}",
                ))
            }
        };
        self.advance();

        if !self.eat(&TokenKind::LParen) {
            return Err(self.mismatched("'('"));
        }
        let mut values = vec![self.literal()?];
        while self.eat(&TokenKind::Comma) {
            values.push(self.literal()?);
        }
        if !self.eat(&TokenKind::RParen) {
            return Err(self.mismatched("{',', ')'}"));
        }

        Ok(FilterExpression::In {
            key,
            values,
            negated,
        })
    }

    fn literal(&mut self) -> FilterResult<MetadataValue> {
        let value = match &self.peek().kind {
            TokenKind::Str(s) => MetadataValue::String(s.clone()),
            TokenKind::Int(i) => MetadataValue::Integer(*i),
            TokenKind::Float(f) => MetadataValue::Float(*f),
            TokenKind::True => MetadataValue::Bool(true),
            TokenKind::False => MetadataValue::Bool(false),
            _ => return Err(self.no_viable_alternative()),
        };
        self.advance();
        Ok(value)
    }
}
