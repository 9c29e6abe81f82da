use super::operator::{InfixOperator, PrefixOperator};

use std::fmt;

/// A parsed source file, with any imported files spliced in.
#[derive(Debug, PartialEq, Clone)]
pub struct Program {
    pub stmts: Vec<Stmt>,
}

/// A name reference, stamped with the package of the file it was parsed in
/// and the file itself. The package drives qualified lookup; the file backs
/// `__FILE__` and `__DIR__`.
#[derive(Debug, PartialEq, Clone)]
pub struct Identifier {
    pub name: String,
    pub package: Option<String>,
    pub file: String,
}

#[derive(Debug, PartialEq, Clone)]
pub enum Stmt {
    Let(Identifier, Expr),
    Return(Option<Expr>),
    Expression(Expr),
    Defer(Block),
}

#[derive(Debug, PartialEq, Clone)]
pub struct Block {
    pub stmts: Vec<Stmt>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct Param {
    pub name: String,
    pub default: Option<Expr>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct FunctionLit {
    pub name: Option<Identifier>,
    pub params: Vec<Param>,
    pub body: Block,
}

#[derive(Debug, PartialEq, Clone)]
pub struct ClassLit {
    pub name: Identifier,
    pub parents: Vec<Identifier>,
    pub interface: Option<Identifier>,
    pub lets: Vec<(Identifier, Expr)>,
    pub methods: Vec<FunctionLit>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct MethodSig {
    pub name: String,
    pub params: Vec<String>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct InterfaceLit {
    pub name: Identifier,
    pub parents: Vec<Identifier>,
    pub methods: Vec<MethodSig>,
}

#[derive(Debug, PartialEq, Clone)]
pub enum Expr {
    Identifier(Identifier),
    IntegerLiteral(i64),
    FloatLiteral(f64),
    StringLiteral(String),
    BooleanLiteral(bool),
    Prefix(PrefixOperator, Box<Expr>),
    Infix(InfixOperator, Box<Expr>, Box<Expr>),
    If {
        condition: Box<Expr>,
        consequence: Block,
        alternative: Option<Block>,
    },
    While {
        condition: Box<Expr>,
        body: Block,
    },
    For {
        init: Box<Stmt>,
        condition: Box<Expr>,
        after: Box<Expr>,
        body: Block,
    },
    Function(FunctionLit),
    Call {
        func: Box<Expr>,
        args: Vec<Expr>,
    },
    Array(Vec<Expr>),
    Index(Box<Expr>, Box<Expr>),
    /// Pair order is source order; it carries through to the runtime hash.
    HashLiteral(Vec<(Expr, Expr)>),
    HashAssign {
        target: Identifier,
        index: Box<Expr>,
        value: Box<Expr>,
    },
    Member(Box<Expr>, String),
    Static(Box<Expr>, String),
    Class(ClassLit),
    Interface(InterfaceLit),
    New {
        class: Identifier,
        args: Vec<Expr>,
    },
    Break,
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", join(&self.stmts, " "))
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Stmt::Let(name, value) => write!(f, "let {} = {};", name, value),
            Stmt::Return(None) => write!(f, "return;"),
            Stmt::Return(Some(value)) => write!(f, "return {};", value),
            Stmt::Expression(expr) => write!(f, "{};", expr),
            Stmt::Defer(block) => write!(f, "defer {}", block),
        }
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.stmts.is_empty() {
            write!(f, "{{ }}")
        } else {
            write!(f, "{{ {} }}", join(&self.stmts, " "))
        }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.default {
            Some(default) => write!(f, "{} = {}", self.name, default),
            None => write!(f, "{}", self.name),
        }
    }
}

impl fmt::Display for FunctionLit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "fn {}({}) {}", name, join(&self.params, ", "), self.body),
            None => write!(f, "fn({}) {}", join(&self.params, ", "), self.body),
        }
    }
}

impl fmt::Display for MethodSig {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "fn {}({});", self.name, self.params.join(", "))
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Expr::Identifier(ident) => write!(f, "{}", ident),
            Expr::IntegerLiteral(value) => write!(f, "{}", value),
            // Debug formatting keeps the decimal point, so a float stays a
            // float when the rendering is parsed again.
            Expr::FloatLiteral(value) => write!(f, "{:?}", value),
            Expr::StringLiteral(value) => write!(f, "\"{}\"", value),
            Expr::BooleanLiteral(value) => write!(f, "{}", value),
            Expr::Prefix(op, operand) => write!(f, "({}{})", op, operand),
            Expr::Infix(op, lhs, rhs) => write!(f, "({} {} {})", lhs, op, rhs),
            Expr::If {
                condition,
                consequence,
                alternative,
            } => {
                write!(f, "if ({}) {}", condition, consequence)?;
                if let Some(alternative) = alternative {
                    write!(f, " else {}", alternative)?;
                }
                Ok(())
            }
            Expr::While { condition, body } => write!(f, "while ({}) {}", condition, body),
            Expr::For {
                init,
                condition,
                after,
                body,
            } => write!(f, "for ({} {}; {}) {}", init, condition, after, body),
            Expr::Function(func) => write!(f, "{}", func),
            Expr::Call { func, args } => write!(f, "{}({})", func, join(args, ", ")),
            Expr::Array(elements) => write!(f, "[{}]", join(elements, ", ")),
            Expr::Index(target, index) => write!(f, "({}[{}])", target, index),
            Expr::HashLiteral(pairs) => {
                let pairs: Vec<String> = pairs
                    .iter()
                    .map(|(key, value)| format!("{}: {}", key, value))
                    .collect();
                write!(f, "{{{}}}", pairs.join(", "))
            }
            Expr::HashAssign {
                target,
                index,
                value,
            } => write!(f, "{}[{}] = {}", target, index, value),
            Expr::Member(target, name) => write!(f, "({} -> {})", target, name),
            Expr::Static(target, name) => write!(f, "({} :: {})", target, name),
            Expr::Class(class) => {
                write!(f, "class {}", class.name)?;
                if !class.parents.is_empty() {
                    write!(f, " extends {}", join(&class.parents, ", "))?;
                }
                if let Some(interface) = &class.interface {
                    write!(f, " implement {}", interface)?;
                }
                write!(f, " {{")?;
                for (name, value) in &class.lets {
                    write!(f, " let {} = {};", name, value)?;
                }
                for method in &class.methods {
                    write!(f, " {}", method)?;
                }
                write!(f, " }}")
            }
            Expr::Interface(interface) => {
                write!(f, "interface {}", interface.name)?;
                if !interface.parents.is_empty() {
                    write!(f, " extends {}", join(&interface.parents, ", "))?;
                }
                write!(f, " {{")?;
                for method in &interface.methods {
                    write!(f, " {}", method)?;
                }
                write!(f, " }}")
            }
            Expr::New { class, args } => write!(f, "new {}({})", class, join(args, ", ")),
            Expr::Break => write!(f, "break"),
        }
    }
}

fn join<T: fmt::Display>(items: &[T], sep: &str) -> String {
    items
        .iter()
        .map(|item| item.to_string())
        .collect::<Vec<_>>()
        .join(sep)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(name: &str) -> Identifier {
        Identifier {
            name: name.to_owned(),
            package: None,
            file: "test.qu".to_owned(),
        }
    }

    #[test]
    fn test_stmt_rendering() {
        let stmt = Stmt::Let(
            ident("answer"),
            Expr::Infix(
                InfixOperator::Multiply,
                Box::new(Expr::IntegerLiteral(6)),
                Box::new(Expr::IntegerLiteral(7)),
            ),
        );
        assert_eq!(stmt.to_string(), "let answer = (6 * 7);");
    }

    #[test]
    fn test_float_rendering_keeps_point() {
        assert_eq!(Expr::FloatLiteral(3.0).to_string(), "3.0");
        assert_eq!(Expr::FloatLiteral(3.14).to_string(), "3.14");
    }

    #[test]
    fn test_member_and_static_rendering() {
        let member = Expr::Member(
            Box::new(Expr::Identifier(ident("p"))),
            "say_hi".to_owned(),
        );
        assert_eq!(member.to_string(), "(p -> say_hi)");

        let stat = Expr::Static(
            Box::new(Expr::Identifier(ident("Circle"))),
            "area".to_owned(),
        );
        assert_eq!(stat.to_string(), "(Circle :: area)");
    }

    #[test]
    fn test_hash_rendering_keeps_order() {
        let hash = Expr::HashLiteral(vec![
            (
                Expr::StringLiteral("b".to_owned()),
                Expr::IntegerLiteral(2),
            ),
            (
                Expr::StringLiteral("a".to_owned()),
                Expr::IntegerLiteral(1),
            ),
        ]);
        assert_eq!(hash.to_string(), "{\"b\": 2, \"a\": 1}");
    }
}
