//! API to control the interpreter.

use std::io;
use std::io::prelude::*;
use std::rc::Rc;

use thiserror::Error;

use crate::ast::Program;
use crate::diag::FullParseError;
use crate::environment::Environment;
use crate::eval::eval_program;
use crate::lexer::Lexer;
use crate::object::Object;
use crate::parser::Parser;
use crate::token::Token;

/// Tree-walk interpreter.
///
/// # Example
///
/// Invoke the interpreter a first time to define a function then additional times to call this
/// function:
///
/// ```
/// # use monkey::interpreter::{Interpreter, MonkeyError};
/// # use monkey::object::Object;
///
/// let mut interp = Interpreter::new();
///
/// let func_def = r#"
///     let max = fn(x, y) {
///         if (x > y) {
///             return x;
///         } else {
///             return y;
///         }
///     };
/// "#;
/// assert_eq!(interp.eval(func_def)?, None);
///
/// assert_eq!(interp.eval("max(10, 20)")?, Some(Object::Integer(20)));
/// assert_eq!(interp.eval("max(5, 4)")?, Some(Object::Integer(5)));
/// # Ok::<(), MonkeyError>(())
/// ```
#[derive(Debug)]
pub struct Interpreter {
    env: Rc<Environment>,
}

/// Errors preventing a program from being evaluated at all.
///
/// Runtime errors are not in here: evaluation reports them as `Object::Error` values.
#[derive(Debug, Error)]
pub enum MonkeyError {
    /// Syntax errors, in source order.
    #[error("{}", join_lines(.0))]
    Parse(Vec<FullParseError>),

    /// Failure to read the program text.
    #[error("cannot read program: {0}")]
    Io(#[from] io::Error),
}

fn join_lines(errors: &[FullParseError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

impl Interpreter {
    pub fn new() -> Interpreter {
        Interpreter {
            env: Environment::new(),
        }
    }

    /// Parse and evaluate `input` in this session's top-level environment.
    ///
    /// Bindings made by earlier calls are visible.  Returns the value of the last statement, if
    /// it has one.  Nothing is evaluated when the input has syntax errors.
    pub fn eval(&mut self, input: &str) -> Result<Option<Object>, MonkeyError> {
        let program = parse(input)?;
        Ok(eval_program(&program, &self.env))
    }

    /// Like `eval()` with the program text read from `input`.
    pub fn eval_reader<R: BufRead>(&mut self, mut input: R) -> Result<Option<Object>, MonkeyError> {
        let mut text = String::new();
        input.read_to_string(&mut text)?;
        self.eval(&text)
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse `input` into a program, failing on the first batch of syntax errors.
pub fn parse(input: &str) -> Result<Program, MonkeyError> {
    let mut parser = Parser::new(Lexer::new(input));
    let program = parser.parse_program();
    if parser.errors().is_empty() {
        Ok(program)
    } else {
        tracing::debug!(count = parser.errors().len(), "program rejected");
        Err(MonkeyError::Parse(parser.errors().to_vec()))
    }
}

/// Every token of `input`, without the final EOF.
pub fn tokenize(input: &str) -> Vec<Token> {
    Lexer::new(input).collect()
}
