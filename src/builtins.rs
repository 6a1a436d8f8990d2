//! Native functions available to every program.

use crate::object::{Builtin, Object, NULL};

const BUILTINS: [Builtin; 5] = [
    Builtin {
        name: "len",
        func: builtin_len,
    },
    Builtin {
        name: "first",
        func: builtin_first,
    },
    Builtin {
        name: "last",
        func: builtin_last,
    },
    Builtin {
        name: "rest",
        func: builtin_rest,
    },
    Builtin {
        name: "push",
        func: builtin_push,
    },
];

/// The builtin registered under `name`, if any.
pub fn lookup(name: &str) -> Option<Object> {
    BUILTINS
        .iter()
        .find(|b| b.name == name)
        .map(|b| Object::Builtin(*b))
}

fn check_arity(args: &[Object], want: usize) -> Result<(), Object> {
    if args.len() == want {
        Ok(())
    } else {
        Err(Object::error(format!(
            "wrong number of arguments. got={}, want={}",
            args.len(),
            want
        )))
    }
}

fn array_arg<'a>(name: &str, arg: &'a Object) -> Result<&'a [Object], Object> {
    match arg {
        Object::Array(elements) => Ok(elements.as_slice()),
        other => Err(Object::error(format!(
            "argument to `{}` must be ARRAY, got {}",
            name,
            other.kind()
        ))),
    }
}

fn builtin_len(args: &[Object]) -> Object {
    if let Err(e) = check_arity(args, 1) {
        return e;
    }
    match &args[0] {
        Object::String(s) => Object::Integer(s.chars().count() as i64),
        Object::Array(elements) => Object::Integer(elements.len() as i64),
        other => Object::error(format!(
            "argument to `len` not supported, got {}",
            other.kind()
        )),
    }
}

fn builtin_first(args: &[Object]) -> Object {
    let elements = match check_arity(args, 1).and_then(|_| array_arg("first", &args[0])) {
        Ok(elements) => elements,
        Err(e) => return e,
    };
    elements.first().cloned().unwrap_or(NULL)
}

fn builtin_last(args: &[Object]) -> Object {
    let elements = match check_arity(args, 1).and_then(|_| array_arg("last", &args[0])) {
        Ok(elements) => elements,
        Err(e) => return e,
    };
    elements.last().cloned().unwrap_or(NULL)
}

fn builtin_rest(args: &[Object]) -> Object {
    let elements = match check_arity(args, 1).and_then(|_| array_arg("rest", &args[0])) {
        Ok(elements) => elements,
        Err(e) => return e,
    };
    match elements.split_first() {
        Some((_, rest)) => Object::array(rest.to_vec()),
        None => NULL,
    }
}

/// Returns a new array; the argument is left untouched.
fn builtin_push(args: &[Object]) -> Object {
    let elements = match check_arity(args, 2).and_then(|_| array_arg("push", &args[0])) {
        Ok(elements) => elements,
        Err(e) => return e,
    };
    let mut pushed = Vec::with_capacity(elements.len() + 1);
    pushed.extend_from_slice(elements);
    pushed.push(args[1].clone());
    Object::array(pushed)
}
