use super::token::Token;

use std::fmt;

/// Binding power, weakest first. Derived `Ord` gives the climbing order.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
pub enum Precedence {
    Lowest,
    Assign,
    Ternary,
    Logic,
    Equality,
    Relational,
    Sum,
    Product,
    Prefix,
    Call,
    Index,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum PrefixOperator {
    LogicalNot,
    Negate,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum InfixOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    EqualTo,
    NotEqualTo,
    LessThan,
    GreaterThan,
    LessEq,
    GreaterEq,
    LogicalAnd,
    LogicalOr,
    Assign,
    AddAssign,
    SubtractAssign,
    MultiplyAssign,
    DivideAssign,
    Increment,
    Decrement,
}

impl InfixOperator {
    pub fn from_token(token: &Token) -> Option<InfixOperator> {
        let op = match token {
            Token::Plus => InfixOperator::Add,
            Token::Minus => InfixOperator::Subtract,
            Token::Asterisk => InfixOperator::Multiply,
            Token::Slash => InfixOperator::Divide,
            Token::DoubleEq => InfixOperator::EqualTo,
            Token::BangEq => InfixOperator::NotEqualTo,
            Token::LeftAngle => InfixOperator::LessThan,
            Token::RightAngle => InfixOperator::GreaterThan,
            Token::LeftAngleEq => InfixOperator::LessEq,
            Token::RightAngleEq => InfixOperator::GreaterEq,
            Token::AndAnd => InfixOperator::LogicalAnd,
            Token::OrOr => InfixOperator::LogicalOr,
            Token::Assign => InfixOperator::Assign,
            Token::PlusEq => InfixOperator::AddAssign,
            Token::MinusEq => InfixOperator::SubtractAssign,
            Token::AsteriskEq => InfixOperator::MultiplyAssign,
            Token::SlashEq => InfixOperator::DivideAssign,
            Token::PlusPlus => InfixOperator::Increment,
            Token::MinusMinus => InfixOperator::Decrement,
            _ => return None,
        };
        Some(op)
    }

    /// Operators that store their result back into an identifier target.
    pub fn is_assignment(&self) -> bool {
        matches!(
            self,
            InfixOperator::Assign
                | InfixOperator::AddAssign
                | InfixOperator::SubtractAssign
                | InfixOperator::MultiplyAssign
                | InfixOperator::DivideAssign
                | InfixOperator::Increment
                | InfixOperator::Decrement
        )
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            InfixOperator::Add => "+",
            InfixOperator::Subtract => "-",
            InfixOperator::Multiply => "*",
            InfixOperator::Divide => "/",
            InfixOperator::EqualTo => "==",
            InfixOperator::NotEqualTo => "!=",
            InfixOperator::LessThan => "<",
            InfixOperator::GreaterThan => ">",
            InfixOperator::LessEq => "<=",
            InfixOperator::GreaterEq => ">=",
            InfixOperator::LogicalAnd => "&&",
            InfixOperator::LogicalOr => "||",
            InfixOperator::Assign => "=",
            InfixOperator::AddAssign => "+=",
            InfixOperator::SubtractAssign => "-=",
            InfixOperator::MultiplyAssign => "*=",
            InfixOperator::DivideAssign => "/=",
            InfixOperator::Increment => "++",
            InfixOperator::Decrement => "--",
        }
    }
}

impl PrefixOperator {
    pub fn from_token(token: &Token) -> Option<PrefixOperator> {
        match token {
            Token::Bang => Some(PrefixOperator::LogicalNot),
            Token::Minus => Some(PrefixOperator::Negate),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            PrefixOperator::LogicalNot => "!",
            PrefixOperator::Negate => "-",
        }
    }
}

impl fmt::Display for InfixOperator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

impl fmt::Display for PrefixOperator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// How strongly a token binds when seen in infix position.
pub fn token_precedence(token: &Token) -> Precedence {
    match token {
        Token::Assign => Precedence::Assign,
        Token::Question => Precedence::Ternary,
        Token::AndAnd | Token::OrOr => Precedence::Logic,
        Token::DoubleEq | Token::BangEq => Precedence::Equality,
        Token::LeftAngle
        | Token::RightAngle
        | Token::LeftAngleEq
        | Token::RightAngleEq
        | Token::PlusEq
        | Token::MinusEq
        | Token::AsteriskEq
        | Token::SlashEq
        | Token::PlusPlus
        | Token::MinusMinus => Precedence::Relational,
        Token::Plus | Token::Minus => Precedence::Sum,
        Token::Asterisk | Token::Slash => Precedence::Product,
        Token::LeftParen => Precedence::Call,
        Token::LeftBracket | Token::Arrow | Token::DoubleColon => Precedence::Index,
        _ => Precedence::Lowest,
    }
}
