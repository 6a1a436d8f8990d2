//! Lexical analyzer

use std::iter::Peekable;
use std::str::Chars;

use crate::diag::Position;
use crate::token::{lookup_ident, Token, TokenKind};

/// Turn source text into a sequence of tokens, one per call to `next_token()`.
#[derive(Debug)]
pub struct Lexer<'a> {
    input: Peekable<Chars<'a>>,
    line: Position,

    // Buffer used when scanning longer tokens.  Allocated here to reuse memory.
    buf: String,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer operating on `input`.
    pub fn new(input: &'a str) -> Lexer<'a> {
        Lexer {
            input: input.chars().peekable(),
            line: 1,
            buf: String::new(),
        }
    }

    /// Line the cursor is currently on.
    pub fn line(&self) -> Position {
        self.line
    }

    /// Scan next token and return it.  Once the input is exhausted, every call returns `Eof`.
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        let ch = match self.input.next() {
            None => return Token::new(TokenKind::Eof, ""),
            Some(ch) => ch,
        };

        match ch {
            '=' => self.one_or_two(ch, TokenKind::Assign, TokenKind::Eq),
            '!' => self.one_or_two(ch, TokenKind::Bang, TokenKind::NotEq),
            '+' => Token::new(TokenKind::Plus, "+"),
            '-' => Token::new(TokenKind::Minus, "-"),
            '*' => Token::new(TokenKind::Asterisk, "*"),
            '/' => Token::new(TokenKind::Slash, "/"),
            '<' => Token::new(TokenKind::Lt, "<"),
            '>' => Token::new(TokenKind::Gt, ">"),
            ',' => Token::new(TokenKind::Comma, ","),
            ';' => Token::new(TokenKind::Semicolon, ";"),
            ':' => Token::new(TokenKind::Colon, ":"),
            '(' => Token::new(TokenKind::LParen, "("),
            ')' => Token::new(TokenKind::RParen, ")"),
            '{' => Token::new(TokenKind::LBrace, "{"),
            '}' => Token::new(TokenKind::RBrace, "}"),
            '[' => Token::new(TokenKind::LBracket, "["),
            ']' => Token::new(TokenKind::RBracket, "]"),
            '"' => self.scan_string(),
            '0'..='9' => self.scan_number(ch),
            'a'..='z' | 'A'..='Z' | '_' => self.scan_identifier(ch),
            _ => Token::new(TokenKind::Illegal, ch.to_string()),
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(&ch) = self.input.peek() {
            match ch {
                '\n' => self.line += 1,
                ' ' | '\t' | '\r' => (),
                _ => break,
            }
            self.input.next();
        }
    }

    /// `first` was just consumed; glue a following `=` into the two-character kind.
    fn one_or_two(&mut self, first: char, single: TokenKind, double: TokenKind) -> Token {
        if self.input.next_if_eq(&'=').is_some() {
            let mut literal = String::with_capacity(2);
            literal.push(first);
            literal.push('=');
            Token::new(double, literal)
        } else {
            Token::new(single, first.to_string())
        }
    }

    fn scan_number(&mut self, first_digit: char) -> Token {
        self.buf.clear();
        self.buf.push(first_digit);
        while let Some(ch) = self.input.next_if(char::is_ascii_digit) {
            self.buf.push(ch);
        }
        Token::new(TokenKind::Int, self.buf.as_str())
    }

    fn scan_identifier(&mut self, first_char: char) -> Token {
        self.buf.clear();
        self.buf.push(first_char);
        while let Some(ch) = self
            .input
            .next_if(|ch| ch.is_ascii_alphanumeric() || *ch == '_')
        {
            self.buf.push(ch);
        }
        Token::new(lookup_ident(&self.buf), self.buf.as_str())
    }

    /// Opening quote already consumed.  Reads up to the closing quote or the end of input.
    fn scan_string(&mut self) -> Token {
        self.buf.clear();
        while let Some(ch) = self.input.next() {
            match ch {
                '"' => break,
                '\\' => match self.input.next() {
                    Some('"') => self.buf.push('"'),
                    Some('\\') => self.buf.push('\\'),
                    Some('n') => self.buf.push('\n'),
                    Some('t') => self.buf.push('\t'),
                    Some('r') => self.buf.push('\r'),
                    Some(other) => {
                        self.buf.push('\\');
                        self.buf.push(other);
                    }
                    None => self.buf.push('\\'),
                },
                '\n' => {
                    self.line += 1;
                    self.buf.push(ch);
                }
                _ => self.buf.push(ch),
            }
        }
        Token::new(TokenKind::String, self.buf.as_str())
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        let token = self.next_token();
        if token.is(TokenKind::Eof) {
            None
        } else {
            Some(token)
        }
    }
}
