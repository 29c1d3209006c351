// ABOUTME: Scanner module converting source text into a token stream

use crate::error::ParseError;
use crate::token::{keyword, Position, Token, TokenKind};

/// Converts a source string into tokens on demand.
///
/// Mirrors a classic hand-rolled lexer: a rune buffer with a forward cursor
/// and one-rune lookback, rather than a combinator parser, since tokens here
/// need `(line, column)` tracked as we go.
pub struct Scanner {
    src: Vec<char>,
    offset: usize,
    line: usize,
    line_head: usize,
}

impl Scanner {
    pub fn new(src: &str) -> Self {
        Scanner {
            src: src.chars().collect(),
            offset: 0,
            line: 0,
            line_head: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.src.get(self.offset).copied()
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek() {
            if c == '\n' {
                self.line += 1;
                self.line_head = self.offset + 1;
            }
            self.offset += 1;
        }
    }

    fn pos(&self) -> Position {
        Position::new(self.line + 1, self.offset - self.line_head + 1)
    }

    fn skip_blank_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(' ') | Some('\t') | Some('\n') => self.advance(),
                Some('#') => {
                    while !matches!(self.peek(), None | Some('\n')) {
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    /// Scans and returns the next token, or a `ParseError` for malformed
    /// literals (multi-dot numbers, unterminated/unescaped strings).
    pub fn scan(&mut self) -> Result<Token, ParseError> {
        self.skip_blank_and_comments();
        let pos = self.pos();

        let ch = match self.peek() {
            None => return Ok(Token::new(TokenKind::Eof, "", pos)),
            Some(c) => c,
        };

        if is_letter(ch) {
            return Ok(self.scan_identifier(pos));
        }
        if ch.is_ascii_digit() {
            return self.scan_number(pos);
        }
        if ch == '"' {
            return self.scan_string(pos);
        }

        self.advance();
        let tok = match ch {
            '=' if self.peek() == Some('=') => {
                self.advance();
                Token::new(TokenKind::Eq, "==", pos)
            }
            '=' => Token::new(TokenKind::Assign, "=", pos),
            '!' if self.peek() == Some('=') => {
                self.advance();
                Token::new(TokenKind::Ne, "!=", pos)
            }
            '>' if self.peek() == Some('=') => {
                self.advance();
                Token::new(TokenKind::Ge, ">=", pos)
            }
            '>' => Token::new(TokenKind::Gt, ">", pos),
            '<' if self.peek() == Some('=') => {
                self.advance();
                Token::new(TokenKind::Le, "<=", pos)
            }
            '<' => Token::new(TokenKind::Lt, "<", pos),
            '&' if self.peek() == Some('&') => {
                self.advance();
                Token::new(TokenKind::AndAnd, "&&", pos)
            }
            '|' if self.peek() == Some('|') => {
                self.advance();
                Token::new(TokenKind::OrOr, "||", pos)
            }
            '+' if self.peek() == Some('+') => {
                self.advance();
                Token::new(TokenKind::Inc, "++", pos)
            }
            '+' if self.peek() == Some('=') => {
                self.advance();
                Token::new(TokenKind::PlusAssign, "+=", pos)
            }
            '+' => Token::new(TokenKind::Plus, "+", pos),
            '-' if self.peek() == Some('-') => {
                self.advance();
                Token::new(TokenKind::Dec, "--", pos)
            }
            '-' if self.peek() == Some('=') => {
                self.advance();
                Token::new(TokenKind::MinusAssign, "-=", pos)
            }
            '-' => Token::new(TokenKind::Minus, "-", pos),
            '*' => Token::new(TokenKind::Star, "*", pos),
            '/' => Token::new(TokenKind::Slash, "/", pos),
            '%' => Token::new(TokenKind::Percent, "%", pos),
            '(' => Token::new(TokenKind::LParen, "(", pos),
            ')' => Token::new(TokenKind::RParen, ")", pos),
            '{' => Token::new(TokenKind::LBrace, "{", pos),
            '}' => Token::new(TokenKind::RBrace, "}", pos),
            '[' => Token::new(TokenKind::LBracket, "[", pos),
            ']' => Token::new(TokenKind::RBracket, "]", pos),
            ';' => Token::new(TokenKind::Semi, ";", pos),
            ',' => Token::new(TokenKind::Comma, ",", pos),
            '.' => Token::new(TokenKind::Dot, ".", pos),
            ':' => Token::new(TokenKind::Colon, ":", pos),
            other => {
                return Err(ParseError::new(
                    pos.line,
                    pos.column,
                    format!("unexpected character '{}'", other),
                ))
            }
        };
        Ok(tok)
    }

    fn scan_identifier(&mut self, pos: Position) -> Token {
        let mut lit = String::new();
        while let Some(c) = self.peek() {
            if is_letter(c) || c.is_ascii_digit() {
                lit.push(c);
                self.advance();
            } else {
                break;
            }
        }
        match keyword(&lit) {
            Some(kind) => Token::new(kind, lit, pos),
            None => Token::new(TokenKind::Ident, lit, pos),
        }
    }

    fn scan_number(&mut self, pos: Position) -> Result<Token, ParseError> {
        let mut lit = String::new();
        let mut dots = 0;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                lit.push(c);
                self.advance();
            } else if c == '.' {
                dots += 1;
                lit.push(c);
                self.advance();
            } else {
                break;
            }
        }
        if dots > 1 {
            return Err(ParseError::new(
                pos.line,
                pos.column,
                format!("malformed number literal '{}'", lit),
            ));
        }
        Ok(Token::new(TokenKind::Number, lit, pos))
    }

    fn scan_string(&mut self, pos: Position) -> Result<Token, ParseError> {
        self.advance(); // opening quote
        let mut lit = String::new();
        loop {
            match self.peek() {
                None => {
                    return Err(ParseError::new(
                        pos.line,
                        pos.column,
                        "unterminated string literal",
                    ))
                }
                Some('"') => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    self.advance();
                    let escaped = match self.peek() {
                        Some('b') => '\u{8}',
                        Some('f') => '\u{c}',
                        Some('r') => '\r',
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some(other) => {
                            return Err(ParseError::new(
                                pos.line,
                                pos.column,
                                format!("invalid escape sequence '\\{}'", other),
                            ))
                        }
                        None => {
                            return Err(ParseError::new(
                                pos.line,
                                pos.column,
                                "unterminated string literal",
                            ))
                        }
                    };
                    lit.push(escaped);
                    self.advance();
                }
                Some(c) => {
                    lit.push(c);
                    self.advance();
                }
            }
        }
        Ok(Token::new(TokenKind::String, lit, pos))
    }

    /// Scan all remaining tokens (including trailing EOF) eagerly.
    pub fn scan_all(mut self) -> Result<Vec<Token>, ParseError> {
        let mut tokens = Vec::new();
        loop {
            let tok = self.scan()?;
            let is_eof = tok.kind == TokenKind::Eof;
            tokens.push(tok);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }
}

fn is_letter(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}
