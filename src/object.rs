//! Runtime values.

use std::fmt;
use std::hash::Hasher;
use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHasher};

use crate::ast::{BlockStatement, FunctionLiteral, Identifier};
use crate::environment::Environment;

/// Type tag of a runtime value, as shown in error messages.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum ObjectType {
    Integer,
    Boolean,
    Null,
    String,
    Array,
    Hash,
    Function,
    Builtin,
    ReturnValue,
    Error,
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ObjectType::Integer => "INTEGER",
            ObjectType::Boolean => "BOOLEAN",
            ObjectType::Null => "NULL",
            ObjectType::String => "STRING",
            ObjectType::Array => "ARRAY",
            ObjectType::Hash => "HASH",
            ObjectType::Function => "FUNCTION",
            ObjectType::Builtin => "BUILTIN",
            ObjectType::ReturnValue => "RETURN_VALUE",
            ObjectType::Error => "ERROR",
        };
        f.write_str(name)
    }
}

/// A runtime value.
///
/// `ReturnValue` and `Error` are evaluation signals: they travel up the evaluator's call stack
/// and are never stored inside arrays, hashes or environments.
///
/// `PartialEq` is structural and exists for the host side (tests, embedding).  The language's
/// own `==` is `is_identical()`.
#[derive(Debug, PartialEq, Clone)]
pub enum Object {
    Integer(i64),
    Boolean(bool),
    Null,
    String(Rc<str>),
    Array(Rc<Vec<Object>>),
    Hash(Rc<HashObject>),
    Function(Rc<Function>),
    Builtin(Builtin),
    ReturnValue(Box<Object>),
    Error(String),
}

pub const TRUE: Object = Object::Boolean(true);
pub const FALSE: Object = Object::Boolean(false);
pub const NULL: Object = Object::Null;

impl Object {
    pub fn kind(&self) -> ObjectType {
        match self {
            Object::Integer(_) => ObjectType::Integer,
            Object::Boolean(_) => ObjectType::Boolean,
            Object::Null => ObjectType::Null,
            Object::String(_) => ObjectType::String,
            Object::Array(_) => ObjectType::Array,
            Object::Hash(_) => ObjectType::Hash,
            Object::Function(_) => ObjectType::Function,
            Object::Builtin(_) => ObjectType::Builtin,
            Object::ReturnValue(_) => ObjectType::ReturnValue,
            Object::Error(_) => ObjectType::Error,
        }
    }

    pub fn error(message: impl Into<String>) -> Object {
        Object::Error(message.into())
    }

    pub fn string(s: &str) -> Object {
        Object::String(Rc::from(s))
    }

    pub fn array(elements: Vec<Object>) -> Object {
        Object::Array(Rc::new(elements))
    }

    /// One of the `TRUE` / `FALSE` constants.
    pub fn from_bool(b: bool) -> Object {
        if b {
            TRUE
        } else {
            FALSE
        }
    }

    /// `Error` or `ReturnValue`: has to travel up unchanged to the nearest unwrap point.
    pub fn is_signal(&self) -> bool {
        matches!(self, Object::Error(_) | Object::ReturnValue(_))
    }

    /// `null` and `false` are falsy, everything else (including `0`) is truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Object::Null | Object::Boolean(false))
    }

    /// Key under which this value is stored in a hash, if it can be one.
    pub fn hash_key(&self) -> Option<HashKey> {
        let value = match self {
            Object::Integer(n) => *n as u64,
            Object::Boolean(b) => u64::from(*b),
            Object::String(s) => {
                let mut hasher = FxHasher::default();
                hasher.write(s.as_bytes());
                hasher.finish()
            }
            _ => return None,
        };
        Some(HashKey {
            kind: self.kind(),
            value,
        })
    }

    /// Equality used by the language's `==` when operands are not both integers.
    ///
    /// Booleans and null behave as the shared `TRUE` / `FALSE` / `NULL` constants.  Heap values
    /// are only equal to themselves.
    pub fn is_identical(&self, other: &Object) -> bool {
        match (self, other) {
            (Object::Integer(l), Object::Integer(r)) => l == r,
            (Object::Boolean(l), Object::Boolean(r)) => l == r,
            (Object::Null, Object::Null) => true,
            (Object::String(l), Object::String(r)) => Rc::ptr_eq(l, r),
            (Object::Array(l), Object::Array(r)) => Rc::ptr_eq(l, r),
            (Object::Hash(l), Object::Hash(r)) => Rc::ptr_eq(l, r),
            (Object::Function(l), Object::Function(r)) => Rc::ptr_eq(l, r),
            (Object::Builtin(l), Object::Builtin(r)) => l.name == r.name,
            _ => false,
        }
    }
}

fn write_separated<T: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    items: impl Iterator<Item = T>,
) -> fmt::Result {
    for (i, item) in items.enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Object::Integer(n) => write!(f, "{}", n),
            Object::Boolean(b) => write!(f, "{}", b),
            Object::Null => write!(f, "null"),
            Object::String(s) => write!(f, "{}", s),
            Object::Array(elements) => {
                write!(f, "[")?;
                write_separated(f, elements.iter())?;
                write!(f, "]")
            }
            Object::Hash(hash) => {
                write!(f, "{{")?;
                write_separated(
                    f,
                    hash.iter()
                        .map(|pair| format!("{}: {}", pair.key, pair.value)),
                )?;
                write!(f, "}}")
            }
            Object::Function(func) => write!(f, "{}", func.literal),
            Object::Builtin(_) => write!(f, "builtin function"),
            Object::ReturnValue(value) => write!(f, "{}", value),
            Object::Error(message) => write!(f, "ERROR: {}", message),
        }
    }
}

/// Structural key of a hashable value: equal values always give equal keys.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct HashKey {
    kind: ObjectType,
    value: u64,
}

#[derive(Debug, PartialEq, Clone)]
pub struct HashPair {
    pub key: Object,
    pub value: Object,
}

/// Hash map value.  Iterates in key insertion order.
#[derive(Debug, PartialEq, Clone, Default)]
pub struct HashObject {
    pairs: Vec<HashPair>,
    index: FxHashMap<HashKey, usize>,
}

impl HashObject {
    /// Insert or overwrite.  An overwritten key keeps its original position.
    pub fn insert(&mut self, hash_key: HashKey, key: Object, value: Object) {
        if let Some(&i) = self.index.get(&hash_key) {
            self.pairs[i] = HashPair { key, value };
        } else {
            self.index.insert(hash_key, self.pairs.len());
            self.pairs.push(HashPair { key, value });
        }
    }

    pub fn get(&self, hash_key: &HashKey) -> Option<&HashPair> {
        self.index.get(hash_key).map(|&i| &self.pairs[i])
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HashPair> {
        self.pairs.iter()
    }
}

/// User function: the literal it was created from plus the environment it closes over.
pub struct Function {
    pub literal: Rc<FunctionLiteral>,
    pub env: Rc<Environment>,
}

impl Function {
    pub fn parameters(&self) -> &[Identifier] {
        &self.literal.parameters
    }

    pub fn body(&self) -> &BlockStatement {
        &self.literal.body
    }
}

// The captured environment may contain the function itself: don't dump it.
impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("literal", &self.literal.to_string())
            .finish()
    }
}

impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.literal, &other.literal) && Rc::ptr_eq(&self.env, &other.env)
    }
}

pub type BuiltinFn = fn(&[Object]) -> Object;

/// Native function.  Validates its own arguments and reports violations as `Object::Error`.
#[derive(Clone, Copy)]
pub struct Builtin {
    pub name: &'static str,
    pub func: BuiltinFn,
}

impl Builtin {
    pub fn call(&self, args: &[Object]) -> Object {
        (self.func)(args)
    }
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Builtin({})", self.name)
    }
}

impl PartialEq for Builtin {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_hash_key() {
        let hello1 = Object::string("Hello World");
        let hello2 = Object::string("Hello World");
        let diff1 = Object::string("My name is johnny");
        let diff2 = Object::string("My name is johnny");

        assert_eq!(hello1.hash_key(), hello2.hash_key());
        assert_eq!(diff1.hash_key(), diff2.hash_key());
        assert_ne!(hello1.hash_key(), diff1.hash_key());
    }

    #[test]
    fn hash_keys_are_tagged_with_type() {
        assert_eq!(Object::Integer(1).hash_key(), Object::Integer(1).hash_key());
        assert_ne!(Object::Integer(1).hash_key(), TRUE.hash_key());
        assert_ne!(Object::Integer(0).hash_key(), FALSE.hash_key());
    }

    #[test]
    fn unhashable_values() {
        assert_eq!(NULL.hash_key(), None);
        assert_eq!(Object::array(vec![]).hash_key(), None);
        assert_eq!(Object::Hash(Rc::default()).hash_key(), None);
    }

    #[test]
    fn truthiness() {
        assert!(Object::Integer(0).is_truthy());
        assert!(Object::string("").is_truthy());
        assert!(TRUE.is_truthy());
        assert!(!FALSE.is_truthy());
        assert!(!NULL.is_truthy());
    }

    #[test]
    fn signals() {
        assert!(Object::error("boom").is_signal());
        assert!(Object::ReturnValue(Box::new(NULL)).is_signal());
        assert!(!NULL.is_signal());
        assert!(!Object::Integer(1).is_signal());
    }

    #[test]
    fn identity() {
        let arr = Object::array(vec![Object::Integer(1)]);
        assert!(arr.is_identical(&arr.clone()));
        assert!(!arr.is_identical(&Object::array(vec![Object::Integer(1)])));
        assert!(Object::from_bool(true).is_identical(&TRUE));
        assert!(NULL.is_identical(&NULL));
        assert!(!NULL.is_identical(&FALSE));
        assert!(!Object::Integer(1).is_identical(&TRUE));
    }

    #[test]
    fn inspect() {
        assert_eq!(Object::Integer(-7).to_string(), "-7");
        assert_eq!(TRUE.to_string(), "true");
        assert_eq!(NULL.to_string(), "null");
        assert_eq!(Object::string("raw text").to_string(), "raw text");
        assert_eq!(
            Object::array(vec![Object::Integer(1), Object::string("two")]).to_string(),
            "[1, two]"
        );
        assert_eq!(Object::error("boom").to_string(), "ERROR: boom");
        assert_eq!(
            Object::ReturnValue(Box::new(Object::Integer(3))).to_string(),
            "3"
        );
    }

    #[test]
    fn hash_keeps_insertion_order() {
        let mut hash = HashObject::default();
        for (k, v) in [("b", 1), ("a", 2), ("b", 3)] {
            let key = Object::string(k);
            let hash_key = key.hash_key().expect("strings are hashable");
            hash.insert(hash_key, key, Object::Integer(v));
        }
        assert_eq!(hash.len(), 2);
        assert_eq!(Object::Hash(Rc::new(hash)).to_string(), "{b: 3, a: 2}");
    }
}
