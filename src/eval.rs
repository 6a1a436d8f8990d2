//! Tree-walking evaluator.
//!
//! Runtime failures are `Object::Error` values.  Every step that evaluates a sub-node checks for
//! an error right away and hands it back unchanged, so the first error aborts the whole program.
//! `return` travels the same way as `Object::ReturnValue`, also out of expression position (e.g.
//! an `if` used as an operand), and is unwrapped at exactly two places: the program root and
//! function application.

use std::rc::Rc;

use crate::ast::{
    BlockStatement, Expression, Identifier, InfixOperator, PrefixOperator, Program, Statement,
};
use crate::builtins;
use crate::environment::Environment;
use crate::object::{Function, HashObject, Object, NULL};

/// Hand an error or a pending `return` back to the caller as soon as it shows up.
macro_rules! propagate {
    ($value:expr) => {{
        let value = $value;
        if value.is_signal() {
            return value;
        }
        value
    }};
}

/// Evaluate `program` in `env`.
///
/// Returns the value of the last statement, `None` if it has no value (e.g. `let`).  A runtime
/// error stops evaluation and is returned as `Object::Error`.
pub fn eval_program(program: &Program, env: &Rc<Environment>) -> Option<Object> {
    tracing::trace!(statements = program.statements.len(), "evaluating program");
    let mut result = None;
    for stmt in &program.statements {
        match eval_stmt(stmt, env) {
            Some(Object::ReturnValue(value)) => return Some(*value),
            Some(err @ Object::Error(_)) => return Some(err),
            other => result = other,
        }
    }
    result
}

/// Like `eval_program()` but a `ReturnValue` is passed up as is.
fn eval_block(block: &BlockStatement, env: &Rc<Environment>) -> Option<Object> {
    let mut result = None;
    for stmt in &block.statements {
        result = eval_stmt(stmt, env);
        if let Some(Object::ReturnValue(_) | Object::Error(_)) = result {
            break;
        }
    }
    result
}

fn eval_stmt(stmt: &Statement, env: &Rc<Environment>) -> Option<Object> {
    match stmt {
        Statement::Let { name, value } => {
            let value = eval_expr(value, env);
            if value.is_signal() {
                return Some(value);
            }
            env.set(&name.name, value);
            None
        }
        Statement::Return(value) => {
            let value = match value {
                Some(expr) => eval_expr(expr, env),
                None => NULL,
            };
            if value.is_signal() {
                return Some(value);
            }
            Some(Object::ReturnValue(Box::new(value)))
        }
        Statement::Expression(expr) => Some(eval_expr(expr, env)),
    }
}

/// Value of a block in expression position: an empty block is `null`.
fn eval_block_expr(block: &BlockStatement, env: &Rc<Environment>) -> Object {
    eval_block(block, env).unwrap_or(NULL)
}

fn eval_expr(expr: &Expression, env: &Rc<Environment>) -> Object {
    match expr {
        Expression::Integer(n) => Object::Integer(*n),
        Expression::String(s) => Object::string(s),
        Expression::Boolean(b) => Object::from_bool(*b),
        Expression::Identifier(ident) => eval_identifier(ident, env),
        Expression::Prefix { operator, right } => {
            let right = propagate!(eval_expr(right, env));
            eval_prefix(*operator, right)
        }
        Expression::Infix {
            operator,
            left,
            right,
        } => {
            let left = propagate!(eval_expr(left, env));
            let right = propagate!(eval_expr(right, env));
            eval_infix(*operator, &left, &right)
        }
        Expression::If {
            condition,
            consequence,
            alternative,
        } => {
            let condition = propagate!(eval_expr(condition, env));
            if condition.is_truthy() {
                eval_block_expr(consequence, env)
            } else if let Some(alt) = alternative {
                eval_block_expr(alt, env)
            } else {
                NULL
            }
        }
        Expression::Function(literal) => Object::Function(Rc::new(Function {
            literal: Rc::clone(literal),
            env: Rc::clone(env),
        })),
        Expression::Call {
            function,
            arguments,
        } => {
            let function = propagate!(eval_expr(function, env));
            let args = match eval_exprs(arguments, env) {
                Ok(args) => args,
                Err(err) => return err,
            };
            apply_function(&function, args)
        }
        Expression::Array(elements) => match eval_exprs(elements, env) {
            Ok(elements) => Object::array(elements),
            Err(err) => err,
        },
        Expression::Index { left, index } => {
            let left = propagate!(eval_expr(left, env));
            let index = propagate!(eval_expr(index, env));
            eval_index(&left, &index)
        }
        Expression::Hash(pairs) => eval_hash_literal(pairs, env),
    }
}

/// Evaluate left to right, stopping at the first error or `return`.
fn eval_exprs(exprs: &[Expression], env: &Rc<Environment>) -> Result<Vec<Object>, Object> {
    let mut values = Vec::with_capacity(exprs.len());
    for expr in exprs {
        let value = eval_expr(expr, env);
        if value.is_signal() {
            return Err(value);
        }
        values.push(value);
    }
    Ok(values)
}

fn eval_identifier(ident: &Identifier, env: &Rc<Environment>) -> Object {
    env.get(&ident.name)
        .or_else(|| builtins::lookup(&ident.name))
        .unwrap_or_else(|| Object::error(format!("identifier not found: {}", ident.name)))
}

fn eval_prefix(operator: PrefixOperator, right: Object) -> Object {
    match operator {
        PrefixOperator::Bang => Object::from_bool(!right.is_truthy()),
        PrefixOperator::Minus => match right {
            Object::Integer(n) => Object::Integer(n.wrapping_neg()),
            other => Object::error(format!("unknown operator: -{}", other.kind())),
        },
    }
}

fn eval_infix(operator: InfixOperator, left: &Object, right: &Object) -> Object {
    match (left, right) {
        (Object::Integer(l), Object::Integer(r)) => eval_integer_infix(operator, *l, *r),
        (Object::String(l), Object::String(r)) => match operator {
            InfixOperator::Plus => {
                let mut s = String::with_capacity(l.len() + r.len());
                s.push_str(l);
                s.push_str(r);
                Object::string(&s)
            }
            _ => Object::error(format!(
                "unknown operator: {} {} {}",
                left.kind(),
                operator,
                right.kind()
            )),
        },
        _ => match operator {
            InfixOperator::Eq => Object::from_bool(left.is_identical(right)),
            InfixOperator::NotEq => Object::from_bool(!left.is_identical(right)),
            _ if left.kind() != right.kind() => Object::error(format!(
                "type mismatch: {} {} {}",
                left.kind(),
                operator,
                right.kind()
            )),
            _ => Object::error(format!(
                "unknown operator: {} {} {}",
                left.kind(),
                operator,
                right.kind()
            )),
        },
    }
}

fn eval_integer_infix(operator: InfixOperator, l: i64, r: i64) -> Object {
    match operator {
        InfixOperator::Plus => Object::Integer(l.wrapping_add(r)),
        InfixOperator::Minus => Object::Integer(l.wrapping_sub(r)),
        InfixOperator::Asterisk => Object::Integer(l.wrapping_mul(r)),
        InfixOperator::Slash => {
            if r == 0 {
                Object::error("division by zero")
            } else {
                Object::Integer(l.wrapping_div(r))
            }
        }
        InfixOperator::Lt => Object::from_bool(l < r),
        InfixOperator::Gt => Object::from_bool(l > r),
        InfixOperator::Eq => Object::from_bool(l == r),
        InfixOperator::NotEq => Object::from_bool(l != r),
    }
}

#[tracing::instrument(level = "trace", skip_all, fields(function = %function.kind()))]
fn apply_function(function: &Object, args: Vec<Object>) -> Object {
    match function {
        Object::Function(func) => {
            let env = extend_function_env(func, args);
            match eval_block(func.body(), &env) {
                Some(Object::ReturnValue(value)) => *value,
                Some(value) => value,
                None => NULL,
            }
        }
        Object::Builtin(builtin) => {
            tracing::debug!(builtin = builtin.name, args = args.len(), "calling builtin");
            builtin.call(&args)
        }
        other => Object::error(format!("not a function: {}", other.kind())),
    }
}

/// Call frame: parameters bound positionally on top of the captured environment.
///
/// Arity is not checked.  Parameters without an argument are bound to `null`, extra arguments
/// are dropped.
fn extend_function_env(func: &Function, args: Vec<Object>) -> Rc<Environment> {
    let env = Environment::enclosed(Rc::clone(&func.env));
    let params = func.parameters();
    if params.len() != args.len() {
        tracing::debug!(
            params = params.len(),
            args = args.len(),
            "argument count differs from parameter count"
        );
    }
    let mut args = args.into_iter();
    for param in params {
        env.set(&param.name, args.next().unwrap_or(NULL));
    }
    env
}

fn eval_index(left: &Object, index: &Object) -> Object {
    match (left, index) {
        (Object::Array(elements), Object::Integer(i)) => usize::try_from(*i)
            .ok()
            .and_then(|i| elements.get(i))
            .cloned()
            .unwrap_or(NULL),
        (Object::Hash(hash), _) => match index.hash_key() {
            Some(key) => hash.get(&key).map(|pair| pair.value.clone()).unwrap_or(NULL),
            None => Object::error(format!("unusable as hash key: {}", index.kind())),
        },
        _ => Object::error(format!("index operator not supported: {}", left.kind())),
    }
}

fn eval_hash_literal(pairs: &[(Expression, Expression)], env: &Rc<Environment>) -> Object {
    let mut hash = HashObject::default();
    for (key_expr, value_expr) in pairs {
        let key = propagate!(eval_expr(key_expr, env));
        let hash_key = match key.hash_key() {
            Some(hash_key) => hash_key,
            None => return Object::error(format!("unusable as hash key: {}", key.kind())),
        };
        let value = propagate!(eval_expr(value_expr, env));
        hash.insert(hash_key, key, value);
    }
    Object::Hash(Rc::new(hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::object::{FALSE, TRUE};
    use crate::parser::Parser;
    use pretty_assertions::assert_eq;

    fn eval_in(input: &str, env: &Rc<Environment>) -> Option<Object> {
        let mut parser = Parser::new(Lexer::new(input));
        let program = parser.parse_program();
        assert!(
            parser.errors().is_empty(),
            "parse errors for {:?}: {:?}",
            input,
            parser.errors()
        );
        eval_program(&program, env)
    }

    fn eval(input: &str) -> Object {
        eval_in(input, &Environment::new()).unwrap_or_else(|| panic!("no value for {:?}", input))
    }

    fn check(cases: &[(&str, Object)]) {
        for (input, expected) in cases {
            assert_eq!(&eval(input), expected, "input: {}", input);
        }
    }

    fn int(n: i64) -> Object {
        Object::Integer(n)
    }

    #[test]
    fn integer_expressions() {
        check(&[
            ("5", int(5)),
            ("10", int(10)),
            ("-5", int(-5)),
            ("-10", int(-10)),
            ("5 + 5 + 5 + 5 - 10", int(10)),
            ("2 * 2 * 2 * 2 * 2", int(32)),
            ("-50 + 100 + -50", int(0)),
            ("5 * 2 + 10", int(20)),
            ("5 + 2 * 10", int(25)),
            ("20 + 2 * -10", int(0)),
            ("50 / 2 * 2 + 10", int(60)),
            ("2 * (5 + 10)", int(30)),
            ("3 * 3 * 3 + 10", int(37)),
            ("3 * (3 * 3) + 10", int(37)),
            ("(5 + 10 * 2 + 15 / 3) * 2 + -10", int(50)),
        ]);
    }

    #[test]
    fn division_truncates() {
        check(&[("7 / 2", int(3)), ("-7 / 2", int(-3))]);
    }

    #[test]
    fn division_by_zero() {
        assert_eq!(eval("1 / 0"), Object::error("division by zero"));
    }

    #[test]
    fn boolean_expressions() {
        check(&[
            ("true", TRUE),
            ("false", FALSE),
            ("1 < 2", TRUE),
            ("1 > 2", FALSE),
            ("1 < 1", FALSE),
            ("1 > 1", FALSE),
            ("1 == 1", TRUE),
            ("1 != 1", FALSE),
            ("1 == 2", FALSE),
            ("1 != 2", TRUE),
            ("true == true", TRUE),
            ("false == false", TRUE),
            ("true == false", FALSE),
            ("true != false", TRUE),
            ("false != true", TRUE),
            ("(1 < 2) == true", TRUE),
            ("(1 < 2) == false", FALSE),
            ("(1 > 2) == true", FALSE),
            ("(1 > 2) == false", TRUE),
        ]);
    }

    #[test]
    fn bang_operator() {
        check(&[
            ("!true", FALSE),
            ("!false", TRUE),
            ("!5", FALSE),
            ("!0", FALSE),
            ("!!true", TRUE),
            ("!!false", FALSE),
            ("!!5", TRUE),
            ("!if (false) { 1 }", TRUE),
        ]);
    }

    #[test]
    fn mixed_type_equality_is_identity() {
        check(&[
            ("1 == true", FALSE),
            ("1 != true", TRUE),
            ("[1] == [1]", FALSE),
            ("let a = [1]; a == a", TRUE),
            ("let f = fn() { 1 }; f == f", TRUE),
            ("fn() { 1 } == fn() { 1 }", FALSE),
            ("len == len", TRUE),
            ("if (false) { 1 } == if (false) { 2 }", TRUE),
        ]);
    }

    #[test]
    fn if_else_expressions() {
        check(&[
            ("if (true) { 10 }", int(10)),
            ("if (false) { 10 }", NULL),
            ("if (1) { 10 }", int(10)),
            ("if (1 < 2) { 10 }", int(10)),
            ("if (1 > 2) { 10 }", NULL),
            ("if (1 > 2) { 10 } else { 20 }", int(20)),
            ("if (1 < 2) { 10 } else { 20 }", int(10)),
            ("if (true) { }", NULL),
        ]);
    }

    #[test]
    fn return_statements() {
        check(&[
            ("return 10;", int(10)),
            ("return 10; 9;", int(10)),
            ("return 2 * 5; 9;", int(10)),
            ("9; return 2 * 5; 9;", int(10)),
            ("return;", NULL),
            (
                "if (10 > 1) { if (10 > 1) { return 10; } return 1; }",
                int(10),
            ),
            (
                "let f = fn(x) { return x; x + 10; }; f(10);",
                int(10),
            ),
            (
                "let f = fn(x) { let result = x + 10; return result; return 10; }; f(10);",
                int(20),
            ),
        ]);
    }

    #[test]
    fn return_inside_expression_propagates() {
        check(&[
            (
                "let f = fn() { let x = if (true) { return 5; }; 10 }; f()",
                int(5),
            ),
            ("let x = if (true) { return 5; }; x + 1", int(5)),
            ("let f = fn() { [if (true) { return 1; }] }; f()", int(1)),
            (
                "let g = fn(x) { x }; let f = fn() { g(if (true) { return 1; }) + 1 }; f()",
                int(1),
            ),
            (
                "let f = fn() { {\"k\": if (true) { return 3; }} }; f()",
                int(3),
            ),
            ("let f = fn() { -if (true) { return 4; } }; f()", int(4)),
            ("let f = fn() { [7][if (true) { return 0; }] }; f()", int(0)),
        ]);
    }

    #[test]
    fn return_value_is_never_stored() {
        let env = Environment::new();
        assert_eq!(
            eval_in("let x = if (true) { return 5; };", &env),
            Some(int(5))
        );
        assert_eq!(env.get("x"), None);

        let value = eval("let f = fn() { [1, if (true) { return [2]; }] }; [f()]");
        assert_eq!(value, Object::array(vec![Object::array(vec![int(2)])]));
    }

    #[test]
    fn error_handling() {
        let cases = [
            ("5 + true;", "type mismatch: INTEGER + BOOLEAN"),
            ("5 + true; 5;", "type mismatch: INTEGER + BOOLEAN"),
            ("-true", "unknown operator: -BOOLEAN"),
            ("true + false;", "unknown operator: BOOLEAN + BOOLEAN"),
            ("5; true + false; 5", "unknown operator: BOOLEAN + BOOLEAN"),
            (
                "if (10 > 1) { true + false; }",
                "unknown operator: BOOLEAN + BOOLEAN",
            ),
            (
                "if (10 > 1) { if (10 > 1) { return true + false; } return 1; }",
                "unknown operator: BOOLEAN + BOOLEAN",
            ),
            ("foobar", "identifier not found: foobar"),
            (r#""Hello" - "World""#, "unknown operator: STRING - STRING"),
            (r#""a" == "a""#, "unknown operator: STRING == STRING"),
            (
                r#"{"name": "Monkey"}[fn(x) { x }];"#,
                "unusable as hash key: FUNCTION",
            ),
            (r#"{[1]: 2}"#, "unusable as hash key: ARRAY"),
            ("1[0]", "index operator not supported: INTEGER"),
            ("5(1)", "not a function: INTEGER"),
            ("let x = -true; 5", "unknown operator: -BOOLEAN"),
            ("[1, 2 + true, 3]", "type mismatch: INTEGER + BOOLEAN"),
            ("len(1, undefined)", "identifier not found: undefined"),
            ("[1] + [2]", "unknown operator: ARRAY + ARRAY"),
            ("[1] + 2", "type mismatch: ARRAY + INTEGER"),
        ];
        for (input, message) in cases {
            assert_eq!(eval(input), Object::error(message), "input: {}", input);
        }
    }

    #[test]
    fn let_statements() {
        check(&[
            ("let a = 5; a;", int(5)),
            ("let a = 5 * 5; a;", int(25)),
            ("let a = 5; let b = a; b;", int(5)),
            ("let a = 5; let b = a; let c = a + b + 5; c;", int(15)),
        ]);
    }

    #[test]
    fn let_has_no_value() {
        assert_eq!(eval_in("let a = 5;", &Environment::new()), None);
        assert_eq!(eval_in("", &Environment::new()), None);
    }

    #[test]
    fn function_object() {
        let value = eval("fn(x) { x + 2; };");
        let func = match &value {
            Object::Function(func) => func,
            other => panic!("not a function: {:?}", other),
        };
        assert_eq!(func.parameters().to_vec(), vec![Identifier::new("x")]);
        assert_eq!(func.body().to_string(), "{ (x + 2) }");
        assert_eq!(value.to_string(), "fn(x) { (x + 2) }");
    }

    #[test]
    fn function_application() {
        check(&[
            ("let identity = fn(x) { x; }; identity(5);", int(5)),
            ("let identity = fn(x) { return x; }; identity(5);", int(5)),
            ("let double = fn(x) { x * 2; }; double(5);", int(10)),
            ("let add = fn(x, y) { x + y; }; add(5, 5);", int(10)),
            (
                "let add = fn(x, y) { x + y; }; add(5 + 5, add(5, 5));",
                int(20),
            ),
            ("fn(x) { x; }(5)", int(5)),
            ("fn() { }()", NULL),
        ]);
    }

    #[test]
    fn permissive_arity() {
        check(&[
            ("fn(x, y) { y }(1)", NULL),
            ("fn(x) { x }(1, 2, 3)", int(1)),
        ]);
    }

    #[test]
    fn closures() {
        check(&[
            (
                "let newAdder = fn(x) { fn(y) { x + y } }; let addTwo = newAdder(2); addTwo(2);",
                int(4),
            ),
            (
                "let x = 1; let f = fn() { let x = 2; x }; f() + x;",
                int(3),
            ),
        ]);
    }

    #[test]
    fn closures_see_later_bindings_of_captured_scope() {
        check(&[(
            "let f = fn() { y }; let y = 7; f();",
            int(7),
        )]);
    }

    #[test]
    fn recursion() {
        check(&[(
            "let fib = fn(n) { if (n < 2) { return n; } fib(n - 1) + fib(n - 2) }; fib(15);",
            int(610),
        )]);
    }

    #[test]
    fn string_literals_and_concatenation() {
        check(&[
            (r#""Hello World!""#, Object::string("Hello World!")),
            (
                r#""Hello" + " " + "World!""#,
                Object::string("Hello World!"),
            ),
            ("\"5\"", Object::string("5")),
        ]);
    }

    #[test]
    fn builtin_functions() {
        check(&[
            (r#"len("")"#, int(0)),
            (r#"len("four")"#, int(4)),
            (r#"len("hello world")"#, int(11)),
            (
                "len(1)",
                Object::error("argument to `len` not supported, got INTEGER"),
            ),
            (
                r#"len("one", "two")"#,
                Object::error("wrong number of arguments. got=2, want=1"),
            ),
            ("len([1, 2, 3])", int(3)),
            ("first([1, 2, 3])", int(1)),
            ("first([])", NULL),
            ("last([1, 2, 3])", int(3)),
            ("rest([1, 2, 3])", Object::array(vec![int(2), int(3)])),
            ("rest([])", NULL),
            (
                "push([1, 2], 3)",
                Object::array(vec![int(1), int(2), int(3)]),
            ),
        ]);
    }

    #[test]
    fn push_leaves_original_array_alone() {
        check(&[(
            "let a = [1, 2]; let b = push(a, 3); a",
            Object::array(vec![int(1), int(2)]),
        )]);
    }

    #[test]
    fn user_bindings_shadow_builtins() {
        check(&[("let len = fn(x) { 42 }; len([1]);", int(42))]);
    }

    #[test]
    fn array_literals() {
        assert_eq!(
            eval("[1, 2 * 2, 3 + 3]"),
            Object::array(vec![int(1), int(4), int(6)])
        );
    }

    #[test]
    fn array_index_expressions() {
        check(&[
            ("[1, 2, 3][0]", int(1)),
            ("[1, 2, 3][1]", int(2)),
            ("[1, 2, 3][2]", int(3)),
            ("let i = 0; [1][i];", int(1)),
            ("[1, 2, 3][1 + 1];", int(3)),
            ("let myArray = [1, 2, 3]; myArray[2];", int(3)),
            (
                "let myArray = [1, 2, 3]; myArray[0] + myArray[1] + myArray[2];",
                int(6),
            ),
            (
                "let myArray = [1, 2, 3]; let i = myArray[0]; myArray[i]",
                int(2),
            ),
            ("[1, 2, 3][3]", NULL),
            ("[1, 2, 3][5]", NULL),
            ("[1, 2, 3][-1]", NULL),
        ]);
    }

    #[test]
    fn hash_literals() {
        let value = eval(
            r#"let two = "two";
            {
                "one": 10 - 9,
                two: 1 + 1,
                "thr" + "ee": 6 / 2,
                4: 4,
                true: 5,
                false: 6
            }"#,
        );
        let hash = match &value {
            Object::Hash(hash) => hash,
            other => panic!("not a hash: {:?}", other),
        };
        let expected = [
            (Object::string("one"), 1),
            (Object::string("two"), 2),
            (Object::string("three"), 3),
            (int(4), 4),
            (TRUE, 5),
            (FALSE, 6),
        ];
        assert_eq!(hash.len(), expected.len());
        for (key, value) in expected {
            let hash_key = key.hash_key().expect("hashable key");
            assert_eq!(hash.get(&hash_key).map(|p| p.value.clone()), Some(int(value)));
        }
        assert_eq!(
            value.to_string(),
            "{one: 1, two: 2, three: 3, 4: 4, true: 5, false: 6}"
        );
    }

    #[test]
    fn hash_index_expressions() {
        check(&[
            (r#"{"foo": 5}["foo"]"#, int(5)),
            (r#"{"foo": 5}["bar"]"#, NULL),
            (r#"let key = "foo"; {"foo": 5}[key]"#, int(5)),
            (r#"{}["foo"]"#, NULL),
            ("{5: 5}[5]", int(5)),
            ("{true: 5}[true]", int(5)),
            ("{false: 5}[false]", int(5)),
            (r#"{"one": 1, "two": 2}["o" + "ne"]"#, int(1)),
        ]);
    }

    #[test]
    fn environment_persists_between_programs() {
        let env = Environment::new();
        assert_eq!(eval_in("let a = 2;", &env), None);
        assert_eq!(eval_in("let sq = fn(x) { x * x };", &env), None);
        assert_eq!(eval_in("sq(a)", &env), Some(int(4)));
    }
}
