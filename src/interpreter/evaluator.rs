use super::builtins::BuiltinRegistry;
use super::environment::Environment;
use super::errors::{EvalResult, Signal};
use super::object::{
    ClassData, FunctionData, HashData, InstanceData, InterfaceData, Object,
};
use crate::frontend::ast::{
    Block, ClassLit, Expr, FunctionLit, Identifier, InterfaceLit, Program, Stmt,
};
use crate::frontend::operator::InfixOperator;

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

/// Tree-walking evaluator. Holds no script state of its own; all bindings
/// live in the environment chain passed to `eval_program`.
pub struct Evaluator {
    registry: BuiltinRegistry,
}

impl Evaluator {
    pub fn new() -> Self {
        Evaluator {
            registry: BuiltinRegistry::core(),
        }
    }

    pub fn with_registry(registry: BuiltinRegistry) -> Self {
        Evaluator { registry }
    }

    /// Runs a program to a final value. A top-level `return` yields its
    /// value, a stray `break` is absorbed, and an error signal surfaces as
    /// an error value.
    pub fn eval_program(&self, program: &Program, env: &Environment) -> Object {
        match self.eval_stmts(&program.stmts, env) {
            Ok(value) => value,
            Err(Signal::Return(value)) => value,
            Err(Signal::Break) => Object::Null,
            Err(Signal::Error(err)) => Object::Error(err.message),
        }
    }

    /// Runs statements in order, yielding the last value. `defer` blocks
    /// are hoisted: wherever they sit in the list, they run as its very
    /// last action, whether it finished or unwound; their own signals are
    /// discarded.
    fn eval_stmts(&self, stmts: &[Stmt], env: &Environment) -> EvalResult {
        let mut last = Object::Null;
        let mut outcome = Ok(());

        for stmt in stmts {
            if matches!(stmt, Stmt::Defer(_)) {
                continue;
            }
            match self.eval_statement(stmt, env) {
                Ok(value) => last = value,
                Err(signal) => {
                    outcome = Err(signal);
                    break;
                }
            }
        }
        for stmt in stmts {
            if let Stmt::Defer(block) = stmt {
                let _ = self.eval_block(block, env);
            }
        }
        outcome.map(|_| last)
    }

    fn eval_block(&self, block: &Block, env: &Environment) -> EvalResult {
        self.eval_stmts(&block.stmts, env)
    }

    fn eval_statement(&self, stmt: &Stmt, env: &Environment) -> EvalResult {
        match stmt {
            Stmt::Let(name, expr) => {
                let value = self.eval_expression(expr, env)?;
                env.define(qualified_name(name), value);
                Ok(Object::Null)
            }
            Stmt::Return(expr) => {
                let value = match expr {
                    Some(expr) => self.eval_expression(expr, env)?,
                    None => Object::Null,
                };
                Err(Signal::Return(value))
            }
            Stmt::Expression(expr) => self.eval_expression(expr, env),
            // Handled by eval_stmts.
            Stmt::Defer(_) => Ok(Object::Null),
        }
    }

    fn eval_expression(&self, expr: &Expr, env: &Environment) -> EvalResult {
        match expr {
            Expr::Identifier(ident) => self.eval_identifier(ident, env),
            Expr::IntegerLiteral(value) => Ok(Object::Integer(*value)),
            Expr::FloatLiteral(value) => Ok(Object::Float(*value)),
            Expr::StringLiteral(value) => Ok(Object::Str(value.clone())),
            Expr::BooleanLiteral(value) => Ok(Object::Boolean(*value)),
            Expr::Prefix(op, operand) => {
                let operand = self.eval_expression(operand, env)?;
                Object::apply_prefix_op(*op, operand.plain()).map_err(Signal::Error)
            }
            Expr::Infix(op, lhs, rhs) => self.eval_infix(*op, lhs, rhs, env),
            Expr::If {
                condition,
                consequence,
                alternative,
            } => {
                let branch_env = Environment::with_enclosing(env);
                if self.eval_expression(condition, &branch_env)?.is_truthy() {
                    self.eval_block(consequence, &branch_env)
                } else {
                    match alternative {
                        Some(alternative) => self.eval_block(alternative, &branch_env),
                        None => Ok(Object::Null),
                    }
                }
            }
            Expr::While { condition, body } => {
                let loop_env = Environment::with_enclosing(env);
                let mut last = Object::Null;
                loop {
                    if !self.eval_expression(condition, &loop_env)?.is_truthy() {
                        return Ok(last);
                    }
                    match self.eval_block(body, &loop_env) {
                        Ok(value) => last = value,
                        Err(Signal::Break) => return Ok(Object::Null),
                        Err(signal) => return Err(signal),
                    }
                }
            }
            Expr::For {
                init,
                condition,
                after,
                body,
            } => {
                let loop_env = Environment::with_enclosing(env);
                self.eval_statement(init, &loop_env)?;
                loop {
                    if !self.eval_expression(condition, &loop_env)?.is_truthy() {
                        return Ok(Object::Null);
                    }
                    // The step expression runs even on the breaking pass.
                    match self.eval_block(body, &loop_env) {
                        Ok(_) => {
                            self.eval_expression(after, &loop_env)?;
                        }
                        Err(Signal::Break) => {
                            self.eval_expression(after, &loop_env)?;
                            return Ok(Object::Null);
                        }
                        Err(signal) => return Err(signal),
                    }
                }
            }
            Expr::Function(func) => Ok(self.eval_function_literal(func, env)),
            Expr::Call { func, args } => {
                let callee = self.eval_expression(func, env)?;
                let args = self.eval_expressions(args, env)?;
                self.apply(&callee, args)
            }
            Expr::Array(elements) => {
                let elements = self.eval_expressions(elements, env)?;
                Ok(Object::Array(Rc::new(RefCell::new(elements))))
            }
            Expr::Index(target, index) => {
                let target = self.eval_expression(target, env)?;
                let index = self.eval_expression(index, env)?;
                self.eval_index(target.plain(), index.plain())
            }
            Expr::HashLiteral(pairs) => {
                let mut data = HashData::new();
                for (key, value) in pairs {
                    let key = self.eval_expression(key, env)?;
                    let key = key.plain().clone();
                    let hash_key = key.hash_key().ok_or_else(|| {
                        Signal::error(format!("unusable as hash key: {}", key.type_tag()))
                    })?;
                    let value = self.eval_expression(value, env)?;
                    data.insert(hash_key, key, value);
                }
                Ok(Object::Hash(Rc::new(RefCell::new(data))))
            }
            Expr::HashAssign {
                target,
                index,
                value,
            } => self.eval_index_assign(target, index, value, env),
            Expr::Member(target, name) => {
                let target = self.eval_expression(target, env)?;
                match target.plain() {
                    Object::Instance(instance) => {
                        match instance.env.get(name, None) {
                            Some(value) => {
                                bind_function_env(&value, &instance.env);
                                Ok(value)
                            }
                            None => Err(Signal::error(format!("identifier not found:{}", name))),
                        }
                    }
                    other => Err(Signal::error(format!(
                        "member access not supported: {}",
                        other.type_tag()
                    ))),
                }
            }
            Expr::Static(target, name) => {
                let target = self.eval_expression(target, env)?;
                match target.plain() {
                    Object::Class(class) => {
                        if name.starts_with('_') {
                            return Err(Signal::error(format!(
                                "cannot access private member `{}`",
                                name
                            )));
                        }
                        match find_static(class, name) {
                            Some(value) => Ok(value),
                            None => Err(Signal::error(format!("identifier not found:{}", name))),
                        }
                    }
                    other => Err(Signal::error(format!(
                        "static access not supported: {}",
                        other.type_tag()
                    ))),
                }
            }
            Expr::Class(class) => self.eval_class_literal(class, env),
            Expr::Interface(interface) => self.eval_interface_literal(interface, env),
            Expr::New { class, args } => self.eval_new(class, args, env),
            Expr::Break => Err(Signal::Break),
        }
    }

    fn eval_expressions(&self, exprs: &[Expr], env: &Environment) -> Result<Vec<Object>, Signal> {
        exprs
            .iter()
            .map(|expr| self.eval_expression(expr, env))
            .collect()
    }

    /// Name resolution order: environment chain, then host builtins, then
    /// host constructors, then the source-location pseudo names.
    fn eval_identifier(&self, ident: &Identifier, env: &Environment) -> EvalResult {
        if let Some(value) = env.get(&ident.name, ident.package.as_deref()) {
            return Ok(value);
        }
        if let Some(value) = self.registry.lookup(&ident.name) {
            return Ok(value);
        }
        if let Some(value) = self.registry.construct(&ident.name) {
            return Ok(value);
        }
        match ident.name.as_str() {
            "__FILE__" => Ok(Object::Str(ident.file.clone())),
            "__DIR__" => {
                let dir = Path::new(&ident.file)
                    .parent()
                    .map(|parent| parent.display().to_string())
                    .unwrap_or_default();
                Ok(Object::Str(dir))
            }
            _ => Err(Signal::error(format!(
                "identifier not found:{}",
                ident.name
            ))),
        }
    }

    fn eval_infix(
        &self,
        op: InfixOperator,
        lhs: &Expr,
        rhs: &Expr,
        env: &Environment,
    ) -> EvalResult {
        match op {
            InfixOperator::LogicalAnd => {
                if !self.eval_expression(lhs, env)?.is_truthy() {
                    return Ok(Object::Boolean(false));
                }
                let rhs = self.eval_expression(rhs, env)?;
                Ok(Object::Boolean(rhs.is_truthy()))
            }
            InfixOperator::LogicalOr => {
                if self.eval_expression(lhs, env)?.is_truthy() {
                    return Ok(Object::Boolean(true));
                }
                let rhs = self.eval_expression(rhs, env)?;
                Ok(Object::Boolean(rhs.is_truthy()))
            }
            _ if op.is_assignment() => {
                let current = self.eval_expression(lhs, env)?;
                let operand = self.eval_expression(rhs, env)?;
                let value = match op {
                    InfixOperator::Assign => operand,
                    InfixOperator::AddAssign | InfixOperator::Increment => {
                        Object::apply_infix_op(InfixOperator::Add, current.plain(), operand.plain())
                            .map_err(Signal::Error)?
                    }
                    InfixOperator::SubtractAssign | InfixOperator::Decrement => {
                        Object::apply_infix_op(
                            InfixOperator::Subtract,
                            current.plain(),
                            operand.plain(),
                        )
                        .map_err(Signal::Error)?
                    }
                    InfixOperator::MultiplyAssign => Object::apply_infix_op(
                        InfixOperator::Multiply,
                        current.plain(),
                        operand.plain(),
                    )
                    .map_err(Signal::Error)?,
                    _ => Object::apply_infix_op(
                        InfixOperator::Divide,
                        current.plain(),
                        operand.plain(),
                    )
                    .map_err(Signal::Error)?,
                };
                if let Expr::Identifier(ident) = lhs {
                    env.assign(&ident.name, ident.package.as_deref(), value.clone());
                }
                Ok(value)
            }
            _ => {
                let lhs = self.eval_expression(lhs, env)?;
                let rhs = self.eval_expression(rhs, env)?;
                Object::apply_infix_op(op, lhs.plain(), rhs.plain()).map_err(Signal::Error)
            }
        }
    }

    fn eval_function_literal(&self, func: &FunctionLit, env: &Environment) -> Object {
        let object = Object::Function(Rc::new(FunctionData {
            name: func.name.clone(),
            params: func.params.clone(),
            body: func.body.clone(),
            env: RefCell::new(Some(env.clone())),
        }));
        if let Some(name) = &func.name {
            env.define(qualified_name(name), object.clone());
        }
        object
    }

    fn apply(&self, callee: &Object, args: Vec<Object>) -> EvalResult {
        match callee.plain() {
            Object::Function(func) => self.call_function(func, args),
            Object::Builtin(builtin) => match builtin.call(args) {
                Object::Error(message) => Err(Signal::error(message)),
                value => Ok(value),
            },
            other => Err(Signal::error(format!(
                "not a function: {}",
                other.type_tag()
            ))),
        }
    }

    /// Binds arguments positionally; a missing argument falls back to the
    /// parameter default, extra arguments are dropped. The body's last value
    /// is the implicit return.
    pub fn call_function(&self, func: &Rc<FunctionData>, args: Vec<Object>) -> EvalResult {
        let closure = func.env.borrow().clone().unwrap_or_else(Environment::new);
        let local = Environment::with_enclosing(&closure);

        let mut args = args.into_iter();
        for param in &func.params {
            let value = match args.next() {
                Some(value) => value,
                None => match &param.default {
                    Some(default) => self.eval_expression(default, &local)?,
                    None => {
                        return Err(Signal::error(format!(
                            "missing argument for parameter `{}`",
                            param.name
                        )))
                    }
                },
            };
            local.define(param.name.clone(), value);
        }

        match self.eval_stmts(&func.body.stmts, &local) {
            Ok(last) => Ok(last),
            Err(Signal::Return(value)) => Ok(value),
            Err(Signal::Break) => Ok(Object::Null),
            Err(signal) => Err(signal),
        }
    }

    fn eval_index(&self, target: &Object, index: &Object) -> EvalResult {
        match (target, index) {
            (Object::Array(elements), Object::Integer(index)) => {
                if *index < 0 {
                    return Ok(Object::Null);
                }
                match elements.borrow().get(*index as usize) {
                    Some(element) => Ok(element.clone()),
                    None => Ok(Object::Null),
                }
            }
            (Object::Str(value), Object::Integer(index)) => {
                if *index < 0 {
                    return Ok(Object::Null);
                }
                match value.chars().nth(*index as usize) {
                    Some('\n') => Ok(Object::Str("\\n".to_owned())),
                    Some(ch) => Ok(Object::Str(ch.to_string())),
                    None => Ok(Object::Null),
                }
            }
            (Object::Hash(data), key) => {
                let hash_key = key.hash_key().ok_or_else(|| {
                    Signal::error(format!("unusable as hash key: {}", key.type_tag()))
                })?;
                match data.borrow().get(&hash_key) {
                    Some(pair) => Ok(pair.value.clone()),
                    None => Ok(Object::Null),
                }
            }
            (other, _) => Err(Signal::error(format!(
                "index operator not supported: {}",
                other.type_tag()
            ))),
        }
    }

    fn eval_index_assign(
        &self,
        target: &Identifier,
        index: &Expr,
        value: &Expr,
        env: &Environment,
    ) -> EvalResult {
        let collection = env
            .get(&target.name, target.package.as_deref())
            .ok_or_else(|| Signal::error(format!("identifier not found:{}", target.name)))?;
        let index = self.eval_expression(index, env)?;
        let value = self.eval_expression(value, env)?;

        match collection.plain() {
            Object::Hash(data) => {
                let key = index.plain().clone();
                let hash_key = key.hash_key().ok_or_else(|| {
                    Signal::error(format!("unusable as hash key: {}", key.type_tag()))
                })?;
                data.borrow_mut().insert(hash_key, key, value.clone());
                Ok(value)
            }
            Object::Array(elements) => match index.plain() {
                Object::Integer(i) => {
                    let mut elements = elements.borrow_mut();
                    if *i < 0 || *i as usize >= elements.len() {
                        return Err(Signal::error(format!("index out of range: {}", i)));
                    }
                    elements[*i as usize] = value.clone();
                    Ok(value)
                }
                _ => Err(Signal::error("index operator not supported: ARRAY")),
            },
            other => Err(Signal::error(format!(
                "index assignment not supported: {}",
                other.type_tag()
            ))),
        }
    }

    fn eval_class_literal(&self, class: &ClassLit, env: &Environment) -> EvalResult {
        let mut parents = Vec::new();
        for parent in &class.parents {
            match env
                .get(&parent.name, parent.package.as_deref())
                .as_ref()
                .map(Object::plain)
            {
                Some(Object::Class(data)) => parents.push(data.clone()),
                _ => return Err(Signal::error(format!("class not found: {}", parent.name))),
            }
        }
        let interface = match &class.interface {
            Some(name) => match env
                .get(&name.name, name.package.as_deref())
                .as_ref()
                .map(Object::plain)
            {
                Some(Object::Interface(data)) => Some(data.clone()),
                _ => {
                    return Err(Signal::error(format!(
                        "interface not found: {}",
                        name.name
                    )))
                }
            },
            None => None,
        };

        // Properties and methods live in the class scope under bare names;
        // instances copy them out at construction time.
        let class_env = Environment::with_enclosing(env);
        for (name, expr) in &class.lets {
            let value = self.eval_expression(expr, &class_env)?;
            class_env.define(name.name.clone(), value);
        }
        for method in &class.methods {
            let object = Object::Function(Rc::new(FunctionData {
                name: method.name.clone(),
                params: method.params.clone(),
                body: method.body.clone(),
                env: RefCell::new(Some(class_env.clone())),
            }));
            if let Some(name) = &method.name {
                class_env.define(name.name.clone(), object);
            }
        }

        if let Some(interface) = &interface {
            for method in &interface.methods {
                if !class_defines(&class_env, &parents, method) {
                    return Err(Signal::error(format!(
                        "class {} does not implement {}",
                        class.name.name, interface.name
                    )));
                }
            }
        }

        let object = Object::Class(Rc::new(ClassData {
            name: class.name.name.clone(),
            parents,
            interface,
            env: class_env,
        }));
        env.define(qualified_name(&class.name), object.clone());
        Ok(object)
    }

    fn eval_interface_literal(&self, interface: &InterfaceLit, env: &Environment) -> EvalResult {
        let mut methods = Vec::new();
        for parent in &interface.parents {
            match env
                .get(&parent.name, parent.package.as_deref())
                .as_ref()
                .map(Object::plain)
            {
                Some(Object::Interface(data)) => {
                    for method in &data.methods {
                        if !methods.contains(method) {
                            methods.push(method.clone());
                        }
                    }
                }
                _ => {
                    return Err(Signal::error(format!(
                        "interface not found: {}",
                        parent.name
                    )))
                }
            }
        }
        for sig in &interface.methods {
            if !methods.contains(&sig.name) {
                methods.push(sig.name.clone());
            }
        }

        let object = Object::Interface(Rc::new(InterfaceData {
            name: interface.name.name.clone(),
            methods,
        }));
        env.define(qualified_name(&interface.name), object.clone());
        Ok(object)
    }

    /// Builds an instance by copying properties from the ancestor chain
    /// (most distant first, so closer classes override) and then from the
    /// class itself. Single-underscore names do not cross the inheritance
    /// boundary; dunder names like `__init` do.
    fn eval_new(&self, class: &Identifier, args: &[Expr], env: &Environment) -> EvalResult {
        let class_obj = env
            .get(&class.name, class.package.as_deref())
            .ok_or_else(|| Signal::error(format!("class not found: {}", class.name)))?;
        let class_data = match class_obj.plain() {
            Object::Class(data) => data.clone(),
            _ => return Err(Signal::error(format!("class not found: {}", class.name))),
        };
        let args = self.eval_expressions(args, env)?;

        let instance_env = Environment::with_enclosing(&class_data.env);
        let mut ancestors = Vec::new();
        collect_ancestors(&class_data, &mut ancestors);
        for ancestor in &ancestors {
            for (name, value) in ancestor.env.bindings() {
                if name.starts_with('_') && !name.starts_with("__") {
                    continue;
                }
                instance_env.define(name, value.deep_clone());
            }
        }
        for (name, value) in class_data.env.bindings() {
            instance_env.define(name, value.deep_clone());
        }

        let object = Object::Instance(Rc::new(InstanceData {
            class: class_data,
            env: instance_env.clone(),
        }));
        instance_env.define("this".to_owned(), object.clone());

        if let Some(init) = instance_env.get_here("__init") {
            bind_function_env(&init, &instance_env);
            if let Object::Function(init) = &init {
                self.call_function(init, args)?;
            }
        }
        Ok(object)
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Evaluator::new()
    }
}

fn qualified_name(ident: &Identifier) -> String {
    match &ident.package {
        Some(package) => format!("{}.{}", package, ident.name),
        None => ident.name.clone(),
    }
}

/// An unbound function fetched from an instance or class scope adopts that
/// scope, so its body sees properties and `this`.
fn bind_function_env(value: &Object, env: &Environment) {
    if let Object::Function(func) = value {
        let unbound = func.env.borrow().is_none();
        if unbound {
            *func.env.borrow_mut() = Some(env.clone());
        }
    }
}

fn find_static(class: &Rc<ClassData>, name: &str) -> Option<Object> {
    if let Some(value) = class.env.get_here(name) {
        bind_function_env(&value, &class.env);
        return Some(value);
    }
    class
        .parents
        .iter()
        .find_map(|parent| find_static(parent, name))
}

fn class_defines(class_env: &Environment, parents: &[Rc<ClassData>], name: &str) -> bool {
    if class_env.get_here(name).is_some() {
        return true;
    }
    parents
        .iter()
        .any(|parent| class_defines(&parent.env, &parent.parents, name))
}

fn collect_ancestors(class: &Rc<ClassData>, out: &mut Vec<Rc<ClassData>>) {
    for parent in &class.parents {
        collect_ancestors(parent, out);
        out.push(parent.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::{Parser, SourceReader};
    use std::collections::HashMap;

    fn run(source: &str) -> Object {
        let program = Parser::new(source, "test.qu").parse().unwrap();
        Evaluator::new().eval_program(&program, &Environment::new())
    }

    fn error(message: &str) -> Object {
        Object::Error(message.to_owned())
    }

    fn str_obj(value: &str) -> Object {
        Object::Str(value.to_owned())
    }

    #[test]
    fn test_integer_arithmetic() {
        assert_eq!(run("5 + 2 * 5"), Object::Integer(15));
        assert_eq!(run("7 / 2"), Object::Integer(3));
        assert_eq!(run("(5 + 10 * 2 + 15 / 3) * 2 + -10"), Object::Integer(50));
    }

    #[test]
    fn test_float_arithmetic() {
        assert_eq!(run("1.5 + 2.25"), Object::Float(3.75));
        assert_eq!(run("1 == 1.0"), Object::Boolean(false));
    }

    #[test]
    fn test_string_operations() {
        assert_eq!(run("\"foo\" + \"bar\""), str_obj("foobar"));
        assert_eq!(run("\"a\" == \"a\""), Object::Boolean(true));
        assert_eq!(run("\"a\" != \"b\""), Object::Boolean(true));
        assert_eq!(
            run("\"a\" - \"b\""),
            error("unknown operator: STRING - STRING")
        );
    }

    #[test]
    fn test_zero_is_truthy() {
        assert_eq!(run("if (0) { 1 } else { 2 }"), Object::Integer(1));
        assert_eq!(run("!0"), Object::Boolean(false));
    }

    #[test]
    fn test_operator_errors() {
        assert_eq!(run("5 + true"), error("type mismatch: INTEGER + BOOLEAN"));
        assert_eq!(run("5 + true; 5"), error("type mismatch: INTEGER + BOOLEAN"));
        assert_eq!(run("true + false"), error("unknown operator: BOOLEAN + BOOLEAN"));
        assert_eq!(run("-true"), error("unknown operator: -BOOLEAN"));
        assert_eq!(run("5 / 0"), error("division by zero"));
    }

    #[test]
    fn test_let_bindings() {
        assert_eq!(run("let a = 5; let b = a; a + b"), Object::Integer(10));
        assert_eq!(run("foobar"), error("identifier not found:foobar"));
    }

    #[test]
    fn test_if_else() {
        assert_eq!(run("if (false) { 1 }"), Object::Null);
        assert_eq!(run("if (1 < 2) { 10 } else { 20 }"), Object::Integer(10));
        assert_eq!(
            run("let x = 3; if (x == 1) { \"a\" } else if (x == 3) { \"c\" } else { \"z\" }"),
            str_obj("c")
        );
    }

    #[test]
    fn test_while_loops() {
        assert_eq!(
            run("let i = 0; while (i < 3) { i = i + 1 }; i"),
            Object::Integer(3)
        );
        let source = "
            let i = 0
            while (true) {
                i = i + 1
                if (i == 4) { break }
            }
            i
        ";
        assert_eq!(run(source), Object::Integer(4));
    }

    #[test]
    fn test_for_loops() {
        assert_eq!(
            run("let sum = 0; for (let i = 0; i < 10; i++) { sum += i }; sum"),
            Object::Integer(45)
        );
        // The loop variable stays inside the loop scope.
        assert_eq!(
            run("for (let i = 0; i < 3; i++) { i }; i"),
            error("identifier not found:i")
        );
    }

    #[test]
    fn test_for_step_runs_on_break() {
        let source = "
            let steps = 0
            for (let i = 0; i < 10; steps++) {
                i++
                if (i == 3) { break }
            }
            steps
        ";
        assert_eq!(run(source), Object::Integer(3));
    }

    #[test]
    fn test_step_and_compound_assignment() {
        assert_eq!(run("let i = 0; i++; i"), Object::Integer(1));
        assert_eq!(run("let i = 10; i--; i"), Object::Integer(9));
        assert_eq!(run("let x = 2; x *= 3; x"), Object::Integer(6));
        assert_eq!(run("let x = 9; x /= 3; x"), Object::Integer(3));
        assert_eq!(run("y += 1"), error("identifier not found:y"));
    }

    #[test]
    fn test_closures() {
        let source = "
            let newAdder = fn(x) {
                fn(y) { x + y }
            }
            let addTwo = newAdder(2)
            addTwo(3)
        ";
        assert_eq!(run(source), Object::Integer(5));
    }

    #[test]
    fn test_return_unwinds() {
        assert_eq!(
            run("if (true) { if (true) { return 10 } return 1 }"),
            Object::Integer(10)
        );
        assert_eq!(
            run("let f = fn() { return 2; 3 }; f()"),
            Object::Integer(2)
        );
        // The last body value is the implicit return.
        assert_eq!(run("let f = fn() { 7 }; f()"), Object::Integer(7));
    }

    #[test]
    fn test_parameter_defaults() {
        let source = "
            fn greet(name, greeting = \"Yo\") {
                return greeting + \", \" + name
            }
            greet(\"Bob\")
        ";
        assert_eq!(run(source), str_obj("Yo, Bob"));
        assert_eq!(
            run("fn f(a, b) { a }; f(1)"),
            error("missing argument for parameter `b`")
        );
        // Extra arguments are dropped.
        assert_eq!(run("fn f(a) { a }; f(1, 2, 3)"), Object::Integer(1));
    }

    #[test]
    fn test_named_functions_see_themselves() {
        let source = "
            fn fact(n) {
                (n < 2) ? 1 : fact(n - 1) * n
            }
            fact(5)
        ";
        assert_eq!(run(source), Object::Integer(120));
    }

    #[test]
    fn test_ternary() {
        assert_eq!(run("true ? 1 : 2"), Object::Integer(1));
        assert_eq!(run("false ? 1 : 2"), Object::Integer(2));
    }

    #[test]
    fn test_arrays() {
        assert_eq!(run("[1, 2 * 2, 3 + 3][2]"), Object::Integer(6));
        assert_eq!(run("[1, 2][5]"), Object::Null);
        assert_eq!(run("[1, 2][-1]"), Object::Null);
        assert_eq!(run("5[0]"), error("index operator not supported: INTEGER"));
    }

    #[test]
    fn test_string_index() {
        assert_eq!(run("\"hello\"[0]"), str_obj("h"));
        assert_eq!(run("\"hi\"[9]"), Object::Null);
        assert_eq!(run("\"a\nb\"[1]"), str_obj("\\n"));
    }

    #[test]
    fn test_builtins() {
        assert_eq!(run("len(\"hello\")"), Object::Integer(5));
        assert_eq!(
            run("len(1)"),
            error("argument to `len` not supported, got=INTEGER")
        );
        assert_eq!(
            run("len()"),
            error("wrong number of arguments. got=0, want=1")
        );
        assert_eq!(
            run("let a = [1]; let b = push(a, 2); len(a)"),
            Object::Integer(1)
        );
        assert_eq!(run("typeof(3.5)"), str_obj("float"));
        // A script binding shadows the builtin of the same name.
        assert_eq!(run("let len = fn(x) { 99 }; len([1, 2, 3])"), Object::Integer(99));
        assert_eq!(run("5(1)"), error("not a function: INTEGER"));
    }

    #[test]
    fn test_hashes() {
        assert_eq!(run("{\"a\": 1, \"b\": 2}[\"b\"]"), Object::Integer(2));
        assert_eq!(run("{1: \"one\"}[1]"), str_obj("one"));
        assert_eq!(run("{true: 1}[true]"), Object::Integer(1));
        assert_eq!(run("{\"a\": 1}[\"missing\"]"), Object::Null);
        assert_eq!(
            run("{fn(x) { x }: 1}"),
            error("unusable as hash key: FUNCTION")
        );
        assert_eq!(
            run("{\"a\": 1}[fn(x) { x }]"),
            error("unusable as hash key: FUNCTION")
        );
    }

    #[test]
    fn test_json_preserves_insertion_order() {
        assert_eq!(
            run("json_encode({\"b\": 2, \"a\": 1, 3: true})"),
            str_obj("{\"b\":2,\"a\":1,\"3\":true}")
        );
        let source = "
            let h = {\"b\": 2, \"a\": 1}
            h[\"b\"] = 20
            h[\"c\"] = 3
            json_encode(h)
        ";
        assert_eq!(run(source), str_obj("{\"b\":20,\"a\":1,\"c\":3}"));
    }

    #[test]
    fn test_index_assignment() {
        assert_eq!(
            run("let a = [1, 2, 3]; a[1] = 20; a[1]"),
            Object::Integer(20)
        );
        assert_eq!(
            run("let a = [1]; a[5] = 2"),
            error("index out of range: 5")
        );
        assert_eq!(
            run("let x = 1; x[0] = 2"),
            error("index assignment not supported: INTEGER")
        );
    }

    #[test]
    fn test_logic_short_circuits() {
        assert_eq!(run("let crash = fn() { boom }; false && crash()"), Object::Boolean(false));
        assert_eq!(run("let crash = fn() { boom }; true || crash()"), Object::Boolean(true));
        assert_eq!(run("1 && 2"), Object::Boolean(true));
        assert_eq!(run("false || false"), Object::Boolean(false));
    }

    #[test]
    fn test_class_with_init_and_method() {
        let source = "
            class Person {
                let name = \"\"
                fn __init(n) {
                    name = n
                }
                fn greet() {
                    return \"Hello, \" + name
                }
            }
            let p = new Person(\"Ada\")
            p -> greet()
        ";
        assert_eq!(run(source), str_obj("Hello, Ada"));
    }

    #[test]
    fn test_instances_are_isolated() {
        let source = "
            class Counter {
                let count = 0
                fn bump() {
                    count = count + 1
                    return count
                }
            }
            let a = new Counter()
            let b = new Counter()
            a -> bump()
            a -> bump()
            [a -> bump(), b -> bump()]
        ";
        assert_eq!(run(source).inspect(), "[3, 1]");
    }

    #[test]
    fn test_inheritance() {
        let source = "
            class Animal {
                let legs = 4
                fn speak() { return \"...\" }
            }
            class Dog extends Animal {
                fn speak() { return \"woof\" }
            }
            let d = new Dog()
            [d -> legs, d -> speak()]
        ";
        assert_eq!(run(source).inspect(), "[4, woof]");
        assert_eq!(
            run("class Dog extends Animal { }"),
            error("class not found: Animal")
        );
    }

    #[test]
    fn test_private_members_stay_behind() {
        let source = "
            class Vault {
                let _secret = 42
                fn reveal() { return _secret }
            }
            class Child extends Vault { }
            let c = new Child()
            c -> reveal()
        ";
        assert_eq!(run(source), error("identifier not found:_secret"));

        let source = "
            class Vault {
                let _secret = 42
                fn reveal() { return _secret }
            }
            let v = new Vault()
            v -> reveal()
        ";
        assert_eq!(run(source), Object::Integer(42));
    }

    #[test]
    fn test_statics() {
        let source = "
            class Circle {
                let pi = 3.14
                fn area(r) { return pi * r * r }
            }
            Circle :: area(2.0)
        ";
        assert_eq!(run(source), Object::Float(3.14 * 2.0 * 2.0));

        let source = "
            class Shape {
                fn describe() { return \"shape\" }
            }
            class Square extends Shape { }
            Square :: describe()
        ";
        assert_eq!(run(source), str_obj("shape"));

        assert_eq!(
            run("class C { let _hidden = 1 }; C :: _hidden"),
            error("cannot access private member `_hidden`")
        );
    }

    #[test]
    fn test_interfaces() {
        let source = "
            interface Greeter {
                fn greet(name);
            }
            class Friendly implement Greeter {
                fn greet(name) { return \"hi \" + name }
            }
            (new Friendly()) -> greet(\"bo\")
        ";
        assert_eq!(run(source), str_obj("hi bo"));

        let source = "
            interface Greeter {
                fn greet(name);
            }
            class Rude implement Greeter { }
        ";
        assert_eq!(run(source), error("class Rude does not implement Greeter"));
    }

    #[test]
    fn test_defer_runs_after_body() {
        let source = "
            let log = [\"start\"]
            fn work() {
                defer { log = push(log, \"closed\") }
                log = push(log, \"opened\")
                return 1
            }
            work()
            log
        ";
        assert_eq!(run(source).inspect(), "[start, opened, closed]");
    }

    #[test]
    fn test_defer_after_return_still_runs() {
        let source = "
            let log = []
            fn work() {
                return 1
                defer { log = push(log, \"cleanup\") }
            }
            work()
            log
        ";
        assert_eq!(run(source).inspect(), "[cleanup]");
    }

    #[test]
    fn test_defer_runs_on_break() {
        let source = "
            let log = []
            let i = 0
            while (true) {
                defer { log = push(log, \"tick\") }
                i++
                if (i == 2) { break }
            }
            json_encode(log)
        ";
        assert_eq!(run(source), str_obj("[\"tick\",\"tick\"]"));
    }

    #[test]
    fn test_defer_runs_on_error() {
        let source = "
            let log = []
            fn work() {
                defer { log = push(log, \"cleanup\") }
                boom
            }
            work()
        ";
        assert_eq!(run(source), error("identifier not found:boom"));
    }

    #[test]
    fn test_with_error_values() {
        let source = "
            let v = with_error(0, \"exploded\")
            [is_with_error(v), get_error_message(v), v + 1]
        ";
        assert_eq!(run(source).inspect(), "[true, exploded, 1]");
        assert_eq!(run("is_with_error(5)"), Object::Boolean(false));
    }

    #[test]
    fn test_package_qualified_lookup() {
        let source = "
            package math
            let pi = 3
            pi * 2
        ";
        assert_eq!(run(source), Object::Integer(6));
    }

    #[test]
    fn test_break_is_absorbed_at_boundaries() {
        assert_eq!(run("break; 5"), Object::Null);
        assert_eq!(run("fn f() { break; return 2 }; f()"), Object::Null);
    }

    #[test]
    fn test_reference_equality_for_composites() {
        assert_eq!(run("let a = [1]; a == a"), Object::Boolean(true));
        assert_eq!(run("[1] == [1]"), Object::Boolean(false));
    }

    #[test]
    fn test_file_pseudo_identifier() {
        assert_eq!(run("__FILE__"), str_obj("test.qu"));
    }

    struct MapReader(HashMap<String, String>);

    impl SourceReader for MapReader {
        fn read_source(&self, path: &Path) -> Result<String, String> {
            let key = path.display().to_string();
            self.0
                .get(&key)
                .cloned()
                .ok_or_else(|| "not found".to_owned())
        }
    }

    #[test]
    fn test_imported_definitions_are_package_qualified() {
        let mut sources = HashMap::new();
        sources.insert(
            "lib.qu".to_owned(),
            "package lib\nfn triple(x) { return x * 3 }".to_owned(),
        );
        let program = Parser::new("import \"lib\"\nlib.triple(3)", "main.qu")
            .with_reader(Rc::new(MapReader(sources)))
            .parse()
            .unwrap();

        let result = Evaluator::new().eval_program(&program, &Environment::new());
        assert_eq!(result, Object::Integer(9));
    }

    #[test]
    fn test_registered_constructor_resolves_after_env() {
        let mut registry = BuiltinRegistry::core();
        registry.register_constructor("hostval", Rc::new(|| Object::Integer(7)));
        let evaluator = Evaluator::with_registry(registry);

        let program = Parser::new("hostval + 1", "test.qu").parse().unwrap();
        assert_eq!(
            evaluator.eval_program(&program, &Environment::new()),
            Object::Integer(8)
        );

        let program = Parser::new("let hostval = 1; hostval", "test.qu")
            .parse()
            .unwrap();
        assert_eq!(
            evaluator.eval_program(&program, &Environment::new()),
            Object::Integer(1)
        );
    }
}
