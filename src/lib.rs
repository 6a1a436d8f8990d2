//! Tree-walking interpreter for the Monkey language.
//!
//! See [Writing An Interpreter In Go](https://interpreterbook.com/).
//!
//! Source text goes through [`lexer::Lexer`], [`parser::Parser`] and [`eval::eval_program`].
//! [`interpreter::Interpreter`] chains the three and keeps bindings across calls.
//!
//! # Examples
//!
//! See [`crate::interpreter::Interpreter`].
//!
//! # Limitations
//!
//! - Reference cycles between closures and their environment are never freed.
//! - Deep recursion in user programs can overflow the host stack.

#![warn(rust_2018_idioms)]
#![warn(missing_debug_implementations)]

pub mod ast;
pub mod builtins;
pub mod diag;
pub mod environment;
pub mod eval;
pub mod interpreter;
pub mod lexer;
pub mod object;
pub mod parser;
pub mod token;
