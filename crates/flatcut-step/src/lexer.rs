//! Part 21 (STEP physical file) tokenizer.
//!
//! Produces a flat token stream with source positions. Comments (`/* */`)
//! and whitespace are dropped. Keywords are upper-cased; user-defined
//! keywords keep their leading `!`.

use crate::error::{Result, StepError};

/// A lexical token.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Keyword or standard identifier (`CARTESIAN_POINT`, `ISO-10303-21`).
    Keyword(String),
    /// Instance name `#123`.
    EntityRef(u64),
    /// String literal with `''` escapes resolved.
    String(String),
    /// Real literal.
    Real(f64),
    /// Integer literal.
    Integer(i64),
    /// Enumeration literal `.NAME.` (dots stripped).
    Enum(String),
    /// Binary literal `"..."` (kept as hex text).
    Binary(String),
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `,`
    Comma,
    /// `;`
    Semicolon,
    /// `=`
    Equals,
    /// `*`
    Asterisk,
    /// `$`
    Dollar,
}

/// Token plus the line/column where it starts.
#[derive(Debug, Clone)]
pub struct SpannedToken {
    /// The token.
    pub token: Token,
    /// Line number (1-indexed).
    pub line: usize,
    /// Column number (1-indexed).
    pub col: usize,
}

/// Byte-oriented cursor over the input.
pub struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
    line: usize,
    col: usize,
}

impl<'a> Lexer<'a> {
    /// Create a lexer over raw file bytes.
    pub fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    /// Tokenize the whole input.
    pub fn tokenize(mut self) -> Result<Vec<SpannedToken>> {
        let mut tokens = Vec::with_capacity(self.input.len() / 4);
        while let Some(tok) = self.next_token()? {
            tokens.push(tok);
        }
        Ok(tokens)
    }

    fn next_token(&mut self) -> Result<Option<SpannedToken>> {
        self.skip_trivia()?;
        let Some(ch) = self.peek() else {
            return Ok(None);
        };
        let (line, col) = (self.line, self.col);

        let token = match ch {
            b'(' => self.single(Token::LParen),
            b')' => self.single(Token::RParen),
            b',' => self.single(Token::Comma),
            b';' => self.single(Token::Semicolon),
            b'=' => self.single(Token::Equals),
            b'*' => self.single(Token::Asterisk),
            b'$' => self.single(Token::Dollar),
            b'#' => self.entity_ref()?,
            b'\'' => self.string()?,
            b'"' => self.binary()?,
            b'.' if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) => self.number()?,
            b'.' => self.enumeration()?,
            b'-' | b'+' => self.number()?,
            b'0'..=b'9' => self.number()?,
            b'!' | b'A'..=b'Z' | b'a'..=b'z' | b'_' => self.keyword(),
            other => {
                return Err(StepError::lexer(
                    line,
                    col,
                    format!("unexpected character '{}'", other as char),
                ))
            }
        };

        Ok(Some(SpannedToken { token, line, col }))
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let ch = self.peek()?;
        self.pos += 1;
        if ch == b'\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(ch)
    }

    fn single(&mut self, token: Token) -> Token {
        self.bump();
        token
    }

    fn take_while(&mut self, pred: impl Fn(u8) -> bool) -> &'a [u8] {
        let start = self.pos;
        while self.peek().is_some_and(&pred) {
            self.bump();
        }
        &self.input[start..self.pos]
    }

    fn skip_trivia(&mut self) -> Result<()> {
        loop {
            self.take_while(|c| c.is_ascii_whitespace());
            if self.peek() == Some(b'/') && self.peek_at(1) == Some(b'*') {
                let (line, col) = (self.line, self.col);
                self.bump();
                self.bump();
                loop {
                    match self.bump() {
                        Some(b'*') if self.peek() == Some(b'/') => {
                            self.bump();
                            break;
                        }
                        Some(_) => {}
                        None => return Err(StepError::lexer(line, col, "unterminated comment")),
                    }
                }
                continue;
            }
            return Ok(());
        }
    }

    fn entity_ref(&mut self) -> Result<Token> {
        let (line, col) = (self.line, self.col);
        self.bump();
        let digits = self.take_while(|c| c.is_ascii_digit());
        std::str::from_utf8(digits)
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Token::EntityRef)
            .ok_or_else(|| StepError::lexer(line, col, "expected digits after '#'"))
    }

    fn string(&mut self) -> Result<Token> {
        let (line, col) = (self.line, self.col);
        self.bump();
        let mut content = Vec::new();
        loop {
            match self.bump() {
                Some(b'\'') if self.peek() == Some(b'\'') => {
                    self.bump();
                    content.push(b'\'');
                }
                Some(b'\'') => break,
                // line breaks inside strings are not significant in Part 21
                Some(b'\r' | b'\n') => {}
                Some(c) => content.push(c),
                None => return Err(StepError::lexer(line, col, "unterminated string")),
            }
        }
        Ok(Token::String(String::from_utf8_lossy(&content).into_owned()))
    }

    fn binary(&mut self) -> Result<Token> {
        let (line, col) = (self.line, self.col);
        self.bump();
        let body = self.take_while(|c| c != b'"');
        if self.bump() != Some(b'"') {
            return Err(StepError::lexer(line, col, "unterminated binary literal"));
        }
        Ok(Token::Binary(String::from_utf8_lossy(body).into_owned()))
    }

    fn enumeration(&mut self) -> Result<Token> {
        let (line, col) = (self.line, self.col);
        self.bump();
        let name = self.take_while(|c| c.is_ascii_alphanumeric() || c == b'_');
        if name.is_empty() || self.bump() != Some(b'.') {
            return Err(StepError::lexer(line, col, "malformed enumeration"));
        }
        Ok(Token::Enum(
            String::from_utf8_lossy(name).to_ascii_uppercase(),
        ))
    }

    fn number(&mut self) -> Result<Token> {
        let (line, col) = (self.line, self.col);
        let start = self.pos;
        if matches!(self.peek(), Some(b'-' | b'+')) {
            self.bump();
        }
        self.take_while(|c| c.is_ascii_digit());
        let mut is_real = false;
        if self.peek() == Some(b'.') {
            is_real = true;
            self.bump();
            self.take_while(|c| c.is_ascii_digit());
        }
        if matches!(self.peek(), Some(b'E' | b'e')) {
            is_real = true;
            self.bump();
            if matches!(self.peek(), Some(b'-' | b'+')) {
                self.bump();
            }
            self.take_while(|c| c.is_ascii_digit());
        }

        let text = std::str::from_utf8(&self.input[start..self.pos]).unwrap_or_default();
        let bad = || StepError::lexer(line, col, format!("invalid number '{text}'"));
        if is_real {
            // "1." is valid Part 21 and parses as f64
            text.parse::<f64>().map(Token::Real).map_err(|_| bad())
        } else {
            text.parse::<i64>().map(Token::Integer).map_err(|_| bad())
        }
    }

    fn keyword(&mut self) -> Token {
        let name = self.take_while(|c| c.is_ascii_alphanumeric() || c == b'_' || c == b'-' || c == b'!');
        Token::Keyword(String::from_utf8_lossy(name).to_ascii_uppercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        Lexer::new(input.as_bytes())
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.token)
            .collect()
    }

    #[test]
    fn test_instance_line() {
        assert_eq!(
            tokens("#12 = CARTESIAN_POINT('', (0., 1.5E-2, -3));"),
            vec![
                Token::EntityRef(12),
                Token::Equals,
                Token::Keyword("CARTESIAN_POINT".into()),
                Token::LParen,
                Token::String(String::new()),
                Token::Comma,
                Token::LParen,
                Token::Real(0.0),
                Token::Comma,
                Token::Real(0.015),
                Token::Comma,
                Token::Integer(-3),
                Token::RParen,
                Token::RParen,
                Token::Semicolon,
            ]
        );
    }

    #[test]
    fn test_strings_and_enums() {
        assert_eq!(tokens("'it''s'"), vec![Token::String("it's".into())]);
        assert_eq!(tokens(".t."), vec![Token::Enum("T".into())]);
        assert_eq!(tokens("\"0A1\""), vec![Token::Binary("0A1".into())]);
    }

    #[test]
    fn test_header_keywords_and_comments() {
        assert_eq!(
            tokens("ISO-10303-21; /* note */ end-iso-10303-21;"),
            vec![
                Token::Keyword("ISO-10303-21".into()),
                Token::Semicolon,
                Token::Keyword("END-ISO-10303-21".into()),
                Token::Semicolon,
            ]
        );
    }

    #[test]
    fn test_positions() {
        let toks = Lexer::new(b"#1\n  #2").tokenize().unwrap();
        assert_eq!((toks[1].line, toks[1].col), (2, 3));
    }

    #[test]
    fn test_errors() {
        assert!(Lexer::new(b"'open").tokenize().is_err());
        assert!(Lexer::new(b"/* open").tokenize().is_err());
        assert!(Lexer::new(b"#").tokenize().is_err());
        assert!(Lexer::new(b"@").tokenize().is_err());
    }
}
