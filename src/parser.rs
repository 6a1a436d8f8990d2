//! Pratt parser: recursive descent for statements, precedence climbing for expressions.

use std::fmt;
use std::mem;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::ast::{
    BlockStatement, Expression, FunctionLiteral, Identifier, InfixOperator, PrefixOperator,
    Program, Statement,
};
use crate::diag::{FullParseError, ParseError, Position};
use crate::lexer::Lexer;
use crate::token::{Token, TokenKind};

/// Binding power of operators, weakest first.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
enum Precedence {
    Lowest,
    Equals,
    LessGreater,
    Sum,
    Product,
    Prefix,
    Call,
    Index,
}

impl Precedence {
    fn of(kind: TokenKind) -> Precedence {
        match kind {
            TokenKind::Eq | TokenKind::NotEq => Precedence::Equals,
            TokenKind::Lt | TokenKind::Gt => Precedence::LessGreater,
            TokenKind::Plus | TokenKind::Minus => Precedence::Sum,
            TokenKind::Asterisk | TokenKind::Slash => Precedence::Product,
            TokenKind::LParen => Precedence::Call,
            TokenKind::LBracket => Precedence::Index,
            _ => Precedence::Lowest,
        }
    }
}

/// Called when a token starts an expression.
type PrefixParseFn<'a> = fn(&mut Parser<'a>) -> Option<Expression>;

/// Called when a token continues an already parsed left-hand expression.
type InfixParseFn<'a> = fn(&mut Parser<'a>, Expression) -> Option<Expression>;

/// Build a syntax tree out of the tokens produced by a `Lexer`.
///
/// Parsing never stops on a syntax error: the offending construct is dropped, a diagnostic is
/// recorded and parsing resumes.  Always check `errors()` before trusting the returned
/// `Program`.
pub struct Parser<'a> {
    lexer: Lexer<'a>,

    current: Token,
    current_pos: Position,
    peek: Token,
    peek_pos: Position,

    errors: Vec<FullParseError>,

    prefix_fns: FxHashMap<TokenKind, PrefixParseFn<'a>>,
    infix_fns: FxHashMap<TokenKind, InfixParseFn<'a>>,
}

impl fmt::Debug for Parser<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parser")
            .field("current", &self.current)
            .field("peek", &self.peek)
            .field("errors", &self.errors)
            .finish()
    }
}

impl<'a> Parser<'a> {
    pub fn new(lexer: Lexer<'a>) -> Parser<'a> {
        let mut prefix_fns: FxHashMap<TokenKind, PrefixParseFn<'a>> = FxHashMap::default();
        prefix_fns.insert(TokenKind::Ident, Self::parse_identifier);
        prefix_fns.insert(TokenKind::Int, Self::parse_integer_literal);
        prefix_fns.insert(TokenKind::String, Self::parse_string_literal);
        prefix_fns.insert(TokenKind::Bang, Self::parse_prefix_expression);
        prefix_fns.insert(TokenKind::Minus, Self::parse_prefix_expression);
        prefix_fns.insert(TokenKind::True, Self::parse_boolean);
        prefix_fns.insert(TokenKind::False, Self::parse_boolean);
        prefix_fns.insert(TokenKind::LParen, Self::parse_grouped_expression);
        prefix_fns.insert(TokenKind::If, Self::parse_if_expression);
        prefix_fns.insert(TokenKind::Function, Self::parse_function_literal);
        prefix_fns.insert(TokenKind::LBracket, Self::parse_array_literal);
        prefix_fns.insert(TokenKind::LBrace, Self::parse_hash_literal);

        let mut infix_fns: FxHashMap<TokenKind, InfixParseFn<'a>> = FxHashMap::default();
        for kind in [
            TokenKind::Plus,
            TokenKind::Minus,
            TokenKind::Asterisk,
            TokenKind::Slash,
            TokenKind::Lt,
            TokenKind::Gt,
            TokenKind::Eq,
            TokenKind::NotEq,
        ] {
            infix_fns.insert(kind, Self::parse_infix_expression);
        }
        infix_fns.insert(TokenKind::LParen, Self::parse_call_expression);
        infix_fns.insert(TokenKind::LBracket, Self::parse_index_expression);

        let mut parser = Parser {
            lexer,
            current: Token::new(TokenKind::Eof, ""), // we haven't scanned anything yet
            current_pos: 1,
            peek: Token::new(TokenKind::Eof, ""),
            peek_pos: 1,
            errors: vec![],
            prefix_fns,
            infix_fns,
        };
        parser.next_token();
        parser.next_token();
        parser
    }

    /// Parse the whole input.  The program is returned even when syntax errors were found.
    pub fn parse_program(&mut self) -> Program {
        let mut program = Program::default();
        while !self.current_is(TokenKind::Eof) {
            if let Some(stmt) = self.parse_statement() {
                program.statements.push(stmt);
            }
            self.next_token();
        }
        program
    }

    /// Syntax errors in the order they were encountered.
    pub fn errors(&self) -> &[FullParseError] {
        &self.errors
    }

    fn parse_statement(&mut self) -> Option<Statement> {
        match self.current.kind {
            TokenKind::Let => self.parse_let_statement(),
            TokenKind::Return => self.parse_return_statement(),
            _ => self.parse_expression_statement(),
        }
    }

    /// Current token is `let`.
    fn parse_let_statement(&mut self) -> Option<Statement> {
        if !self.expect_peek(TokenKind::Ident) {
            return None;
        }
        let name = Identifier::new(self.current.literal.as_str());
        if !self.expect_peek(TokenKind::Assign) {
            return None;
        }
        self.next_token();

        let value = match self.parse_expression(Precedence::Lowest) {
            Some(value) => value,
            None => {
                self.skip_to_semicolon();
                return None;
            }
        };
        if !self.expect_peek(TokenKind::Semicolon) {
            self.skip_to_semicolon();
            return None;
        }
        Some(Statement::Let { name, value })
    }

    /// Current token is `return`.
    fn parse_return_statement(&mut self) -> Option<Statement> {
        if self.peek_is(TokenKind::Semicolon) {
            self.next_token();
            return Some(Statement::Return(None));
        }
        self.next_token();

        let value = match self.parse_expression(Precedence::Lowest) {
            Some(value) => value,
            None => {
                self.skip_to_semicolon();
                return None;
            }
        };
        if !self.expect_peek(TokenKind::Semicolon) {
            self.skip_to_semicolon();
            return None;
        }
        Some(Statement::Return(Some(value)))
    }

    fn parse_expression_statement(&mut self) -> Option<Statement> {
        let expr = self.parse_expression(Precedence::Lowest);
        if self.peek_is(TokenKind::Semicolon) {
            self.next_token();
        }
        Some(Statement::Expression(expr?))
    }

    /// Current token is `{`.  Stops on the closing `}` or at the end of input.
    fn parse_block_statement(&mut self) -> BlockStatement {
        let mut block = BlockStatement::default();
        self.next_token();
        while !self.current_is(TokenKind::RBrace) && !self.current_is(TokenKind::Eof) {
            if let Some(stmt) = self.parse_statement() {
                block.statements.push(stmt);
            }
            self.next_token();
        }
        block
    }

    fn parse_expression(&mut self, precedence: Precedence) -> Option<Expression> {
        let prefix = match self.prefix_fns.get(&self.current.kind).copied() {
            Some(prefix) => prefix,
            None => {
                self.push_error(
                    self.current_pos,
                    ParseError::NoPrefixParseFn(self.current.kind),
                );
                return None;
            }
        };
        let mut left = prefix(self)?;

        while !self.peek_is(TokenKind::Semicolon) && precedence < self.peek_precedence() {
            let infix = match self.infix_fns.get(&self.peek.kind).copied() {
                Some(infix) => infix,
                None => return Some(left),
            };
            self.next_token();
            left = infix(self, left)?;
        }
        Some(left)
    }

    fn parse_identifier(&mut self) -> Option<Expression> {
        Some(Expression::Identifier(Identifier::new(
            self.current.literal.as_str(),
        )))
    }

    fn parse_integer_literal(&mut self) -> Option<Expression> {
        match self.current.literal.parse::<i64>() {
            Ok(n) => Some(Expression::Integer(n)),
            Err(_) => {
                self.push_error(
                    self.current_pos,
                    ParseError::BadIntegerLiteral(self.current.literal.clone()),
                );
                None
            }
        }
    }

    fn parse_string_literal(&mut self) -> Option<Expression> {
        Some(Expression::String(self.current.literal.clone()))
    }

    fn parse_boolean(&mut self) -> Option<Expression> {
        Some(Expression::Boolean(self.current_is(TokenKind::True)))
    }

    fn parse_prefix_expression(&mut self) -> Option<Expression> {
        let operator = match self.current.kind {
            TokenKind::Bang => PrefixOperator::Bang,
            TokenKind::Minus => PrefixOperator::Minus,
            kind => {
                self.push_error(self.current_pos, ParseError::NoPrefixParseFn(kind));
                return None;
            }
        };
        self.next_token();
        let right = self.parse_expression(Precedence::Prefix)?;
        Some(Expression::Prefix {
            operator,
            right: Box::new(right),
        })
    }

    fn parse_grouped_expression(&mut self) -> Option<Expression> {
        self.next_token();
        let expr = self.parse_expression(Precedence::Lowest)?;
        if !self.expect_peek(TokenKind::RParen) {
            return None;
        }
        Some(expr)
    }

    fn parse_if_expression(&mut self) -> Option<Expression> {
        if !self.expect_peek(TokenKind::LParen) {
            return None;
        }
        self.next_token();
        let condition = self.parse_expression(Precedence::Lowest)?;
        if !self.expect_peek(TokenKind::RParen) || !self.expect_peek(TokenKind::LBrace) {
            return None;
        }
        let consequence = self.parse_block_statement();

        let alternative = if self.peek_is(TokenKind::Else) {
            self.next_token();
            if !self.expect_peek(TokenKind::LBrace) {
                return None;
            }
            Some(self.parse_block_statement())
        } else {
            None
        };

        Some(Expression::If {
            condition: Box::new(condition),
            consequence,
            alternative,
        })
    }

    fn parse_function_literal(&mut self) -> Option<Expression> {
        if !self.expect_peek(TokenKind::LParen) {
            return None;
        }
        let parameters = self.parse_function_parameters()?;
        if !self.expect_peek(TokenKind::LBrace) {
            return None;
        }
        let body = self.parse_block_statement();
        Some(Expression::Function(Rc::new(FunctionLiteral {
            parameters,
            body,
        })))
    }

    /// Current token is `(`.
    fn parse_function_parameters(&mut self) -> Option<Vec<Identifier>> {
        let mut params = vec![];
        if self.peek_is(TokenKind::RParen) {
            self.next_token();
            return Some(params);
        }

        if !self.expect_peek(TokenKind::Ident) {
            return None;
        }
        params.push(Identifier::new(self.current.literal.as_str()));
        while self.peek_is(TokenKind::Comma) {
            self.next_token();
            if !self.expect_peek(TokenKind::Ident) {
                return None;
            }
            params.push(Identifier::new(self.current.literal.as_str()));
        }

        if !self.expect_peek(TokenKind::RParen) {
            return None;
        }
        Some(params)
    }

    fn parse_array_literal(&mut self) -> Option<Expression> {
        let elements = self.parse_expression_list(TokenKind::RBracket)?;
        Some(Expression::Array(elements))
    }

    fn parse_hash_literal(&mut self) -> Option<Expression> {
        let mut pairs = vec![];
        while !self.peek_is(TokenKind::RBrace) {
            self.next_token();
            let key = self.parse_expression(Precedence::Lowest)?;
            if !self.expect_peek(TokenKind::Colon) {
                return None;
            }
            self.next_token();
            let value = self.parse_expression(Precedence::Lowest)?;
            pairs.push((key, value));

            if !self.peek_is(TokenKind::RBrace) && !self.expect_peek(TokenKind::Comma) {
                return None;
            }
        }
        if !self.expect_peek(TokenKind::RBrace) {
            return None;
        }
        Some(Expression::Hash(pairs))
    }

    fn parse_infix_expression(&mut self, left: Expression) -> Option<Expression> {
        let operator = match self.current.kind {
            TokenKind::Plus => InfixOperator::Plus,
            TokenKind::Minus => InfixOperator::Minus,
            TokenKind::Asterisk => InfixOperator::Asterisk,
            TokenKind::Slash => InfixOperator::Slash,
            TokenKind::Lt => InfixOperator::Lt,
            TokenKind::Gt => InfixOperator::Gt,
            TokenKind::Eq => InfixOperator::Eq,
            TokenKind::NotEq => InfixOperator::NotEq,
            _ => return Some(left),
        };
        let precedence = self.current_precedence();
        self.next_token();
        let right = self.parse_expression(precedence)?;
        Some(Expression::Infix {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    fn parse_call_expression(&mut self, function: Expression) -> Option<Expression> {
        let arguments = self.parse_expression_list(TokenKind::RParen)?;
        Some(Expression::Call {
            function: Box::new(function),
            arguments,
        })
    }

    fn parse_index_expression(&mut self, left: Expression) -> Option<Expression> {
        self.next_token();
        let index = self.parse_expression(Precedence::Lowest)?;
        if !self.expect_peek(TokenKind::RBracket) {
            return None;
        }
        Some(Expression::Index {
            left: Box::new(left),
            index: Box::new(index),
        })
    }

    /// Comma-separated expressions up to `end`.  Current token is the opening delimiter.
    fn parse_expression_list(&mut self, end: TokenKind) -> Option<Vec<Expression>> {
        let mut list = vec![];
        if self.peek_is(end) {
            self.next_token();
            return Some(list);
        }

        self.next_token();
        list.push(self.parse_expression(Precedence::Lowest)?);
        while self.peek_is(TokenKind::Comma) {
            self.next_token();
            self.next_token();
            list.push(self.parse_expression(Precedence::Lowest)?);
        }

        if !self.expect_peek(end) {
            return None;
        }
        Some(list)
    }

    fn next_token(&mut self) {
        self.current = mem::replace(&mut self.peek, self.lexer.next_token());
        self.current_pos = self.peek_pos;
        self.peek_pos = self.lexer.line();
    }

    fn skip_to_semicolon(&mut self) {
        while !self.current_is(TokenKind::Semicolon) && !self.current_is(TokenKind::Eof) {
            self.next_token();
        }
    }

    fn current_is(&self, kind: TokenKind) -> bool {
        self.current.is(kind)
    }

    fn peek_is(&self, kind: TokenKind) -> bool {
        self.peek.is(kind)
    }

    /// Advance if the next token is of the given kind, record a diagnostic otherwise.
    fn expect_peek(&mut self, kind: TokenKind) -> bool {
        if self.peek_is(kind) {
            self.next_token();
            true
        } else {
            self.push_error(
                self.peek_pos,
                ParseError::UnexpectedToken {
                    expected: kind,
                    got: self.peek.kind,
                },
            );
            false
        }
    }

    fn current_precedence(&self) -> Precedence {
        Precedence::of(self.current.kind)
    }

    fn peek_precedence(&self) -> Precedence {
        Precedence::of(self.peek.kind)
    }

    fn push_error(&mut self, pos: Position, error: ParseError) {
        tracing::debug!(line = pos, %error, "syntax error");
        self.errors.push(FullParseError { pos, error });
    }
}
