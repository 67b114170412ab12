//! Filter expression lexer
//!
//! Splits filter text into tokens carrying their source position. Keywords
//! are case-insensitive; identifiers keep their case.

use crate::error::{FilterParseError, FilterResult};

/// Token kinds
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Bare identifier (metadata key segment)
    Ident(String),
    /// Quoted string, escapes resolved
    Str(String),
    /// Integer literal
    Int(i64),
    /// Decimal literal
    Float(f64),
    /// `true`
    True,
    /// `false`
    False,
    /// `AND` / `&&`
    And,
    /// `OR` / `||`
    Or,
    /// `NOT` / `!`
    Not,
    /// `IN`
    In,
    /// `NIN`
    Nin,
    /// `WHERE`
    Where,
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `,`
    Comma,
    /// `.`
    Dot,
    /// End of input
    Eof,
}

/// A token with its original text and position
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// Kind and payload
    pub kind: TokenKind,
    /// Source text as written (`<EOF>` for the end marker)
    pub text: String,
    /// 1-based line
    pub line: usize,
    /// 0-based column
    pub column: usize,
}

fn keyword(word: &str) -> Option<TokenKind> {
    const KEYWORDS: [(&str, TokenKind); 8] = [
        ("and", TokenKind::And),
        ("or", TokenKind::Or),
        ("not", TokenKind::Not),
        ("in", TokenKind::In),
        ("nin", TokenKind::Nin),
        ("true", TokenKind::True),
        ("false", TokenKind::False),
        ("where", TokenKind::Where),
    ];
    KEYWORDS
        .iter()
        .find(|(kw, _)| word.eq_ignore_ascii_case(kw))
        .map(|(_, kind)| kind.clone())
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            chars: text.chars().peekable(),
            line: 1,
            column: 0,
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn bump_if(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn recognition_error(&self, line: usize, column: usize, text: &str) -> FilterParseError {
        FilterParseError::new(line, column, format!("token recognition error at: '{}'", text))
    }

    fn string(&mut self, quote: char, line: usize, column: usize) -> FilterResult<Token> {
        let mut raw = String::from(quote);
        let mut value = String::new();
        loop {
            match self.bump() {
                Some(c) if c == quote => {
                    raw.push(c);
                    break;
                }
                Some('\\') => {
                    raw.push('\\');
                    match self.bump() {
                        Some(escaped) => {
                            raw.push(escaped);
                            value.push(match escaped {
                                'n' => '\n',
                                't' => '\t',
                                other => other,
                            });
                        }
                        None => return Err(self.recognition_error(line, column, &raw)),
                    }
                }
                Some(c) => {
                    raw.push(c);
                    value.push(c);
                }
                None => return Err(self.recognition_error(line, column, &raw)),
            }
        }
        Ok(Token {
            kind: TokenKind::Str(value),
            text: raw,
            line,
            column,
        })
    }

    fn number(&mut self, first: char, line: usize, column: usize) -> FilterResult<Token> {
        let mut raw = String::from(first);
        let mut is_float = false;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                raw.push(c);
                self.bump();
            } else if c == '.' && !is_float {
                is_float = true;
                raw.push(c);
                self.bump();
            } else if (c == 'e' || c == 'E') && raw.chars().any(|d| d.is_ascii_digit()) {
                is_float = true;
                raw.push(c);
                self.bump();
                if let Some(sign) = self.peek().filter(|s| *s == '+' || *s == '-') {
                    raw.push(sign);
                    self.bump();
                }
            } else {
                break;
            }
        }

        let kind = if is_float {
            raw.parse::<f64>().ok().map(TokenKind::Float)
        } else {
            raw.parse::<i64>().ok().map(TokenKind::Int)
        };
        match kind {
            Some(kind) => Ok(Token {
                kind,
                text: raw,
                line,
                column,
            }),
            None => Err(self.recognition_error(line, column, &raw)),
        }
    }

    fn next_token(&mut self) -> FilterResult<Token> {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }

        let (line, column) = (self.line, self.column);
        let c = match self.bump() {
            Some(c) => c,
            None => {
                return Ok(Token {
                    kind: TokenKind::Eof,
                    text: "<EOF>".to_string(),
                    line,
                    column,
                })
            }
        };

        let simple = |kind: TokenKind, text: &str| Token {
            kind,
            text: text.to_string(),
            line,
            column,
        };

        let token = match c {
            '(' => simple(TokenKind::LParen, "("),
            ')' => simple(TokenKind::RParen, ")"),
            ',' => simple(TokenKind::Comma, ","),
            '.' => simple(TokenKind::Dot, "."),
            '=' if self.bump_if('=') => simple(TokenKind::Eq, "=="),
            '!' if self.bump_if('=') => simple(TokenKind::Ne, "!="),
            '!' => simple(TokenKind::Not, "!"),
            '>' if self.bump_if('=') => simple(TokenKind::Ge, ">="),
            '>' => simple(TokenKind::Gt, ">"),
            '<' if self.bump_if('=') => simple(TokenKind::Le, "<="),
            '<' => simple(TokenKind::Lt, "<"),
            '&' if self.bump_if('&') => simple(TokenKind::And, "&&"),
            '|' if self.bump_if('|') => simple(TokenKind::Or, "||"),
            '\'' | '"' => return self.string(c, line, column),
            '-' if self.peek().is_some_and(|d| d.is_ascii_digit()) => {
                return self.number(c, line, column)
            }
            d if d.is_ascii_digit() => return self.number(d, line, column),
            s if is_ident_start(s) => {
                let mut word = String::from(s);
                while let Some(n) = self.peek().filter(|n| is_ident_continue(*n)) {
                    word.push(n);
                    self.bump();
                }
                let kind = keyword(&word).unwrap_or_else(|| TokenKind::Ident(word.clone()));
                Token {
                    kind,
                    text: word,
                    line,
                    column,
                }
            }
            other => return Err(self.recognition_error(line, column, &other.to_string())),
        };
        Ok(token)
    }
}

/// Tokenize filter text; the last token is always `Eof`
pub fn tokenize(text: &str) -> FilterResult<Vec<Token>> {
    let mut lexer = Lexer::new(text);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token()?;
        let done = token.kind == TokenKind::Eof;
        tokens.push(token);
        if done {
            return Ok(tokens);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(text: &str) -> Vec<TokenKind> {
        tokenize(text).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_comparison_tokens() {
        assert_eq!(
            kinds("country == 'NL'"),
            vec![
                TokenKind::Ident("country".into()),
                TokenKind::Eq,
                TokenKind::Str("NL".into()),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_symbolic_and_keyword_operators() {
        assert_eq!(
            kinds("a && b AND c || d or NOT e !f"),
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::And,
                TokenKind::Ident("b".into()),
                TokenKind::And,
                TokenKind::Ident("c".into()),
                TokenKind::Or,
                TokenKind::Ident("d".into()),
                TokenKind::Or,
                TokenKind::Not,
                TokenKind::Ident("e".into()),
                TokenKind::Not,
                TokenKind::Ident("f".into()),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("1 -2 3.5 1e3 -0.25"),
            vec![
                TokenKind::Int(1),
                TokenKind::Int(-2),
                TokenKind::Float(3.5),
                TokenKind::Float(1000.0),
                TokenKind::Float(-0.25),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_string_escapes_and_double_quotes() {
        assert_eq!(
            kinds(r#""it's" 'a\'b'"#),
            vec![
                TokenKind::Str("it's".into()),
                TokenKind::Str("a'b".into()),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_positions() {
        let tokens = tokenize("a ==\n  'x'").unwrap();
        assert_eq!((tokens[0].line, tokens[0].column), (1, 0));
        assert_eq!((tokens[1].line, tokens[1].column), (1, 2));
        assert_eq!((tokens[2].line, tokens[2].column), (2, 2));
        assert_eq!(tokens[2].text, "'x'");
    }

    #[test]
    fn test_unterminated_string() {
        let err = tokenize("a == 'abc").unwrap_err();
        assert_eq!(err.column, 5);
        assert_eq!(err.message, "token recognition error at: ''abc'");
    }

    #[test]
    fn test_single_equals_is_rejected() {
        let err = tokenize("a = 1").unwrap_err();
        assert_eq!(err.message, "token recognition error at: '='");
        assert_eq!(err.column, 2);
    }

    #[test]
    fn test_keywords_case_insensitive() {
        assert_eq!(
            kinds("In NIN True FALSE where"),
            vec![
                TokenKind::In,
                TokenKind::Nin,
                TokenKind::True,
                TokenKind::False,
                TokenKind::Where,
                TokenKind::Eof
            ]
        );
    }
}
