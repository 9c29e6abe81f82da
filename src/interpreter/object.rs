use super::builtins::Builtin;
use super::environment::Environment;
use super::errors::RuntimeError;
use crate::frontend::ast::{Block, Identifier, Param};
use crate::frontend::operator::{InfixOperator, PrefixOperator};

use fnv::FnvHasher;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hasher;
use std::rc::Rc;

/// A runtime value. Scalars are owned; composites are shared behind `Rc`
/// so that equality and index assignment see one identity.
#[derive(Clone)]
pub enum Object {
    Null,
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Str(String),
    Array(Rc<RefCell<Vec<Object>>>),
    Hash(Rc<RefCell<HashData>>),
    Function(Rc<FunctionData>),
    Builtin(Builtin),
    Class(Rc<ClassData>),
    Instance(Rc<InstanceData>),
    Interface(Rc<InterfaceData>),
    Error(String),
    /// A value flagged as failed. Transparent to operators and truthiness;
    /// only the error-inspection builtins see the wrapper.
    WithError(Box<Object>, String),
}

pub struct FunctionData {
    pub name: Option<Identifier>,
    pub params: Vec<Param>,
    pub body: Block,
    /// The captured scope. Cleared on deep copy; member access rebinds it
    /// to the owning instance.
    pub env: RefCell<Option<Environment>>,
}

pub struct ClassData {
    pub name: String,
    pub parents: Vec<Rc<ClassData>>,
    pub interface: Option<Rc<InterfaceData>>,
    pub env: Environment,
}

pub struct InstanceData {
    pub class: Rc<ClassData>,
    pub env: Environment,
}

pub struct InterfaceData {
    pub name: String,
    pub methods: Vec<String>,
}

/// Hash storage that remembers insertion order through per-pair indices.
pub struct HashData {
    pairs: HashMap<HashKey, HashPair>,
    next_index: u64,
}

#[derive(Clone)]
pub struct HashPair {
    pub key: Object,
    pub value: Object,
    pub index: u64,
}

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct HashKey {
    kind: HashKind,
    value: u64,
}

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
enum HashKind {
    Integer,
    Float,
    Boolean,
    Str,
}

impl HashData {
    pub fn new() -> Self {
        HashData {
            pairs: HashMap::new(),
            next_index: 0,
        }
    }

    /// Updating an existing key keeps its original position.
    pub fn insert(&mut self, hash_key: HashKey, key: Object, value: Object) {
        match self.pairs.get_mut(&hash_key) {
            Some(pair) => pair.value = value,
            None => {
                let index = self.next_index;
                self.next_index += 1;
                self.pairs.insert(hash_key, HashPair { key, value, index });
            }
        }
    }

    pub fn get(&self, hash_key: &HashKey) -> Option<&HashPair> {
        self.pairs.get(hash_key)
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Pairs in ascending insertion order.
    pub fn ordered_pairs(&self) -> Vec<&HashPair> {
        let mut pairs: Vec<&HashPair> = self.pairs.values().collect();
        pairs.sort_by_key(|pair| pair.index);
        pairs
    }
}

impl Default for HashData {
    fn default() -> Self {
        HashData::new()
    }
}

impl Object {
    pub fn type_tag(&self) -> &'static str {
        match self {
            Object::Null => "NULL",
            Object::Integer(_) => "INTEGER",
            Object::Float(_) => "FLOAT",
            Object::Boolean(_) => "BOOLEAN",
            Object::Str(_) => "STRING",
            Object::Array(_) => "ARRAY",
            Object::Hash(_) => "HASH",
            Object::Function(_) => "FUNCTION",
            Object::Builtin(_) => "BUILTIN",
            Object::Class(_) => "CLASS",
            Object::Instance(_) => "OBJECT",
            Object::Interface(_) => "INTERFACE",
            Object::Error(_) => "ERROR",
            Object::WithError(inner, _) => inner.type_tag(),
        }
    }

    /// Sees through `WithError` wrappers to the carried value.
    pub fn plain(&self) -> &Object {
        match self {
            Object::WithError(inner, _) => inner.plain(),
            other => other,
        }
    }

    /// Only `false` and null are falsy; zero is truthy.
    pub fn is_truthy(&self) -> bool {
        match self.plain() {
            Object::Boolean(value) => *value,
            Object::Null => false,
            _ => true,
        }
    }

    pub fn hash_key(&self) -> Option<HashKey> {
        let key = match self.plain() {
            Object::Integer(value) => HashKey {
                kind: HashKind::Integer,
                value: *value as u64,
            },
            Object::Float(value) => HashKey {
                kind: HashKind::Float,
                value: value.to_bits(),
            },
            Object::Boolean(value) => HashKey {
                kind: HashKind::Boolean,
                value: *value as u64,
            },
            Object::Str(value) => {
                let mut hasher = FnvHasher::default();
                hasher.write(value.as_bytes());
                HashKey {
                    kind: HashKind::Str,
                    value: hasher.finish(),
                }
            }
            _ => return None,
        };
        Some(key)
    }

    /// Structural copy. Arrays, hashes and error wrappers copy recursively;
    /// functions lose their captured scope; classes, instances and builtins
    /// stay shared.
    pub fn deep_clone(&self) -> Object {
        match self {
            Object::Array(elements) => {
                let copied = elements.borrow().iter().map(Object::deep_clone).collect();
                Object::Array(Rc::new(RefCell::new(copied)))
            }
            Object::Hash(data) => {
                let data = data.borrow();
                let mut copied = HashData {
                    pairs: HashMap::new(),
                    next_index: data.next_index,
                };
                for (hash_key, pair) in &data.pairs {
                    copied.pairs.insert(
                        *hash_key,
                        HashPair {
                            key: pair.key.deep_clone(),
                            value: pair.value.deep_clone(),
                            index: pair.index,
                        },
                    );
                }
                Object::Hash(Rc::new(RefCell::new(copied)))
            }
            Object::Function(func) => Object::Function(Rc::new(FunctionData {
                name: func.name.clone(),
                params: func.params.clone(),
                body: func.body.clone(),
                env: RefCell::new(None),
            })),
            Object::WithError(inner, message) => {
                Object::WithError(Box::new(inner.deep_clone()), message.clone())
            }
            other => other.clone(),
        }
    }

    pub fn apply_prefix_op(op: PrefixOperator, value: &Object) -> Result<Object, RuntimeError> {
        match op {
            PrefixOperator::LogicalNot => Ok(Object::Boolean(!value.is_truthy())),
            PrefixOperator::Negate => match value {
                Object::Integer(value) => Ok(Object::Integer(value.wrapping_neg())),
                Object::Float(value) => Ok(Object::Float(-value)),
                other => Err(RuntimeError::new(format!(
                    "unknown operator: -{}",
                    other.type_tag()
                ))),
            },
        }
    }

    pub fn apply_infix_op(
        op: InfixOperator,
        lhs: &Object,
        rhs: &Object,
    ) -> Result<Object, RuntimeError> {
        match (lhs, rhs) {
            (Object::Integer(a), Object::Integer(b)) => integer_infix(op, *a, *b),
            (Object::Float(a), Object::Float(b)) => float_infix(op, *a, *b),
            (Object::Str(a), Object::Str(b)) => string_infix(op, a, b),
            _ => match op {
                // Mixed and composite operands compare by identity.
                InfixOperator::EqualTo => Ok(Object::Boolean(lhs == rhs)),
                InfixOperator::NotEqualTo => Ok(Object::Boolean(lhs != rhs)),
                _ if lhs.type_tag() != rhs.type_tag() => Err(RuntimeError::new(format!(
                    "type mismatch: {} {} {}",
                    lhs.type_tag(),
                    op.symbol(),
                    rhs.type_tag()
                ))),
                _ => Err(unknown_operator(op, lhs, rhs)),
            },
        }
    }

    /// Human-readable form, used by the REPL and `puts`.
    pub fn inspect(&self) -> String {
        match self {
            Object::Null => "null".to_owned(),
            Object::Integer(value) => value.to_string(),
            Object::Float(value) => value.to_string(),
            Object::Boolean(value) => value.to_string(),
            Object::Str(value) => value.clone(),
            Object::Array(elements) => {
                let elements: Vec<String> =
                    elements.borrow().iter().map(Object::inspect).collect();
                format!("[{}]", elements.join(", "))
            }
            Object::Hash(data) => {
                let pairs: Vec<String> = data
                    .borrow()
                    .ordered_pairs()
                    .iter()
                    .map(|pair| format!("{}: {}", pair.key.inspect(), pair.value.inspect()))
                    .collect();
                format!("{{{}}}", pairs.join(", "))
            }
            Object::Function(func) => match &func.name {
                Some(name) => format!("<fn {}>", name.name),
                None => "<fn>".to_owned(),
            },
            Object::Builtin(builtin) => format!("<builtin {}>", builtin.name()),
            Object::Class(class) => format!("<class {}>", class.name),
            Object::Instance(instance) => format!("<object {}>", instance.class.name),
            Object::Interface(interface) => format!("<interface {}>", interface.name),
            Object::Error(message) => format!("ERROR: {}", message),
            Object::WithError(inner, _) => inner.inspect(),
        }
    }

    /// Serialized form. Hash pairs render in insertion order; values with
    /// no serialization become `null`.
    pub fn json(&self) -> String {
        match self {
            Object::Null => "null".to_owned(),
            Object::Integer(value) => value.to_string(),
            Object::Float(value) => value.to_string(),
            Object::Boolean(value) => value.to_string(),
            Object::Str(value) => quote_json(value),
            Object::Array(elements) => {
                let elements: Vec<String> = elements.borrow().iter().map(Object::json).collect();
                format!("[{}]", elements.join(","))
            }
            Object::Hash(data) => {
                let pairs: Vec<String> = data
                    .borrow()
                    .ordered_pairs()
                    .iter()
                    .map(|pair| {
                        let key = match &pair.key {
                            Object::Str(key) => quote_json(key),
                            other => quote_json(&other.inspect()),
                        };
                        format!("{}:{}", key, pair.value.json())
                    })
                    .collect();
                format!("{{{}}}", pairs.join(","))
            }
            Object::WithError(inner, _) => inner.json(),
            _ => "null".to_owned(),
        }
    }
}

fn integer_infix(op: InfixOperator, a: i64, b: i64) -> Result<Object, RuntimeError> {
    let result = match op {
        InfixOperator::Add => Object::Integer(a.wrapping_add(b)),
        InfixOperator::Subtract => Object::Integer(a.wrapping_sub(b)),
        InfixOperator::Multiply => Object::Integer(a.wrapping_mul(b)),
        InfixOperator::Divide => {
            if b == 0 {
                return Err(RuntimeError::new("division by zero"));
            }
            Object::Integer(a.wrapping_div(b))
        }
        InfixOperator::LessThan => Object::Boolean(a < b),
        InfixOperator::GreaterThan => Object::Boolean(a > b),
        InfixOperator::LessEq => Object::Boolean(a <= b),
        InfixOperator::GreaterEq => Object::Boolean(a >= b),
        InfixOperator::EqualTo => Object::Boolean(a == b),
        InfixOperator::NotEqualTo => Object::Boolean(a != b),
        _ => {
            return Err(unknown_operator(
                op,
                &Object::Integer(a),
                &Object::Integer(b),
            ))
        }
    };
    Ok(result)
}

fn float_infix(op: InfixOperator, a: f64, b: f64) -> Result<Object, RuntimeError> {
    let result = match op {
        InfixOperator::Add => Object::Float(a + b),
        InfixOperator::Subtract => Object::Float(a - b),
        InfixOperator::Multiply => Object::Float(a * b),
        InfixOperator::Divide => Object::Float(a / b),
        InfixOperator::LessThan => Object::Boolean(a < b),
        InfixOperator::GreaterThan => Object::Boolean(a > b),
        InfixOperator::LessEq => Object::Boolean(a <= b),
        InfixOperator::GreaterEq => Object::Boolean(a >= b),
        InfixOperator::EqualTo => Object::Boolean(a == b),
        InfixOperator::NotEqualTo => Object::Boolean(a != b),
        _ => return Err(unknown_operator(op, &Object::Float(a), &Object::Float(b))),
    };
    Ok(result)
}

fn string_infix(op: InfixOperator, a: &str, b: &str) -> Result<Object, RuntimeError> {
    match op {
        InfixOperator::Add => Ok(Object::Str(format!("{}{}", a, b))),
        InfixOperator::EqualTo => Ok(Object::Boolean(a == b)),
        InfixOperator::NotEqualTo => Ok(Object::Boolean(a != b)),
        _ => Err(unknown_operator(
            op,
            &Object::Str(a.to_owned()),
            &Object::Str(b.to_owned()),
        )),
    }
}

fn unknown_operator(op: InfixOperator, lhs: &Object, rhs: &Object) -> RuntimeError {
    RuntimeError::new(format!(
        "unknown operator: {} {} {}",
        lhs.type_tag(),
        op.symbol(),
        rhs.type_tag()
    ))
}

fn quote_json(value: &str) -> String {
    let escaped = value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t");
    format!("\"{}\"", escaped)
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Object::Null, Object::Null) => true,
            (Object::Integer(a), Object::Integer(b)) => a == b,
            (Object::Float(a), Object::Float(b)) => a == b,
            (Object::Boolean(a), Object::Boolean(b)) => a == b,
            (Object::Str(a), Object::Str(b)) => a == b,
            (Object::Array(a), Object::Array(b)) => Rc::ptr_eq(a, b),
            (Object::Hash(a), Object::Hash(b)) => Rc::ptr_eq(a, b),
            (Object::Function(a), Object::Function(b)) => Rc::ptr_eq(a, b),
            (Object::Builtin(a), Object::Builtin(b)) => a == b,
            (Object::Class(a), Object::Class(b)) => Rc::ptr_eq(a, b),
            (Object::Instance(a), Object::Instance(b)) => Rc::ptr_eq(a, b),
            (Object::Interface(a), Object::Interface(b)) => Rc::ptr_eq(a, b),
            (Object::Error(a), Object::Error(b)) => a == b,
            (Object::WithError(a, am), Object::WithError(b, bm)) => a == b && am == bm,
            _ => false,
        }
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.inspect())
    }
}
