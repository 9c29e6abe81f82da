use super::object::Object;

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

pub type BuiltinFn = fn(Vec<Object>) -> Object;

pub struct BuiltinData {
    name: String,
    func: BuiltinFn,
}

/// A named host function. Equality is identity, like user functions.
#[derive(Clone)]
pub struct Builtin(Rc<BuiltinData>);

impl Builtin {
    pub fn new(name: &str, func: BuiltinFn) -> Self {
        Builtin(Rc::new(BuiltinData {
            name: name.to_owned(),
            func,
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn call(&self, args: Vec<Object>) -> Object {
        (self.0.func)(args)
    }
}

impl PartialEq for Builtin {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "<builtin {}>", self.0.name)
    }
}

/// The host functions and host-backed constructors visible to scripts.
/// Lookup happens only after the environment misses, so scripts may
/// shadow any entry with their own definitions.
pub struct BuiltinRegistry {
    builtins: HashMap<String, Builtin>,
    constructors: HashMap<String, Rc<dyn Fn() -> Object>>,
}

impl BuiltinRegistry {
    pub fn empty() -> Self {
        BuiltinRegistry {
            builtins: HashMap::new(),
            constructors: HashMap::new(),
        }
    }

    pub fn core() -> Self {
        let mut registry = BuiltinRegistry::empty();
        registry.register("len", builtin_len);
        registry.register("puts", builtin_puts);
        registry.register("first", builtin_first);
        registry.register("last", builtin_last);
        registry.register("rest", builtin_rest);
        registry.register("push", builtin_push);
        registry.register("typeof", builtin_typeof);
        registry.register("json_encode", builtin_json_encode);
        registry.register("with_error", builtin_with_error);
        registry.register("is_with_error", builtin_is_with_error);
        registry.register("get_error_message", builtin_get_error_message);
        registry
    }

    pub fn register(&mut self, name: &str, func: BuiltinFn) {
        self.builtins
            .insert(name.to_owned(), Builtin::new(name, func));
    }

    pub fn register_constructor(&mut self, name: &str, ctor: Rc<dyn Fn() -> Object>) {
        self.constructors.insert(name.to_owned(), ctor);
    }

    pub fn lookup(&self, name: &str) -> Option<Object> {
        self.builtins
            .get(name)
            .map(|builtin| Object::Builtin(builtin.clone()))
    }

    pub fn construct(&self, name: &str) -> Option<Object> {
        self.constructors.get(name).map(|ctor| ctor())
    }
}

impl Default for BuiltinRegistry {
    fn default() -> Self {
        BuiltinRegistry::core()
    }
}

fn arg_count_error(got: usize, want: usize) -> Object {
    Object::Error(format!(
        "wrong number of arguments. got={}, want={}",
        got, want
    ))
}

fn builtin_len(args: Vec<Object>) -> Object {
    if args.len() != 1 {
        return arg_count_error(args.len(), 1);
    }
    match args[0].plain() {
        Object::Str(value) => Object::Integer(value.len() as i64),
        Object::Array(elements) => Object::Integer(elements.borrow().len() as i64),
        Object::Hash(data) => Object::Integer(data.borrow().len() as i64),
        other => Object::Error(format!(
            "argument to `len` not supported, got={}",
            other.type_tag()
        )),
    }
}

fn builtin_puts(args: Vec<Object>) -> Object {
    for arg in &args {
        println!("{}", arg.inspect());
    }
    Object::Null
}

fn builtin_first(args: Vec<Object>) -> Object {
    if args.len() != 1 {
        return arg_count_error(args.len(), 1);
    }
    match args[0].plain() {
        Object::Array(elements) => match elements.borrow().first() {
            Some(element) => element.clone(),
            None => Object::Null,
        },
        other => Object::Error(format!(
            "argument to `first` must be ARRAY, got {}",
            other.type_tag()
        )),
    }
}

fn builtin_last(args: Vec<Object>) -> Object {
    if args.len() != 1 {
        return arg_count_error(args.len(), 1);
    }
    match args[0].plain() {
        Object::Array(elements) => match elements.borrow().last() {
            Some(element) => element.clone(),
            None => Object::Null,
        },
        other => Object::Error(format!(
            "argument to `last` must be ARRAY, got {}",
            other.type_tag()
        )),
    }
}

fn builtin_rest(args: Vec<Object>) -> Object {
    if args.len() != 1 {
        return arg_count_error(args.len(), 1);
    }
    match args[0].plain() {
        Object::Array(elements) => {
            let elements = elements.borrow();
            if elements.is_empty() {
                return Object::Null;
            }
            Object::Array(Rc::new(RefCell::new(elements[1..].to_vec())))
        }
        other => Object::Error(format!(
            "argument to `rest` must be ARRAY, got {}",
            other.type_tag()
        )),
    }
}

fn builtin_push(args: Vec<Object>) -> Object {
    if args.len() != 2 {
        return arg_count_error(args.len(), 2);
    }
    match args[0].plain() {
        Object::Array(elements) => {
            let mut copied = elements.borrow().clone();
            copied.push(args[1].clone());
            Object::Array(Rc::new(RefCell::new(copied)))
        }
        other => Object::Error(format!(
            "argument to `push` must be ARRAY, got {}",
            other.type_tag()
        )),
    }
}

fn builtin_typeof(args: Vec<Object>) -> Object {
    if args.len() != 1 {
        return arg_count_error(args.len(), 1);
    }
    Object::Str(args[0].plain().type_tag().to_lowercase())
}

fn builtin_json_encode(args: Vec<Object>) -> Object {
    if args.len() != 1 {
        return arg_count_error(args.len(), 1);
    }
    Object::Str(args[0].json())
}

fn builtin_with_error(args: Vec<Object>) -> Object {
    if args.len() != 2 {
        return arg_count_error(args.len(), 2);
    }
    let message = match &args[1] {
        Object::Str(message) => message.clone(),
        other => other.inspect(),
    };
    Object::WithError(Box::new(args[0].clone()), message)
}

fn builtin_is_with_error(args: Vec<Object>) -> Object {
    if args.len() != 1 {
        return arg_count_error(args.len(), 1);
    }
    Object::Boolean(matches!(args[0], Object::WithError(_, _)))
}

fn builtin_get_error_message(args: Vec<Object>) -> Object {
    if args.len() != 1 {
        return arg_count_error(args.len(), 1);
    }
    match &args[0] {
        Object::WithError(_, message) => Object::Str(message.clone()),
        _ => Object::Null,
    }
}
