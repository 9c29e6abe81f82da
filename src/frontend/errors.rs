use super::token::{Span, Token};

use std::fmt;

#[derive(Debug, PartialEq, Clone)]
pub enum ParseError {
    ExpectedToken(Token, Span, Token),
    ExpectedExpr(Span, Token),
    ExpectedIdentifier(Span),
    IllegalToken(Span, String),
    UnparsableNumber(Span, String),
    PackageNotFirst(Span),
    ImportNotTopLevel(Span),
    ImportNotFound(Span, String),
    UnclosedBlock(Span),
    ExpectedClassMember(Span, Token),
}

pub type ParseResult<T> = Result<T, ParseError>;

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ParseError::ExpectedToken(expected, span, got) => {
                write!(
                    f,
                    "Expected {:?} on line {}, but instead got {:?}.",
                    expected, span.line, got
                )
            }
            ParseError::ExpectedExpr(span, got) => {
                write!(
                    f,
                    "Expected expression on line {}, but instead got {:?}.",
                    span.line, got
                )
            }
            ParseError::ExpectedIdentifier(span) => {
                write!(f, "Expected identifier on line {}.", span.line)
            }
            ParseError::IllegalToken(span, string) => {
                write!(f, "Illegal token on line {}: {}", span.line, string)
            }
            ParseError::UnparsableNumber(span, string) => {
                write!(f, "Unparsable number `{}` on line {}.", string, span.line)
            }
            ParseError::PackageNotFirst(span) => {
                write!(
                    f,
                    "A package declaration must be the first statement of a file (line {}).",
                    span.line
                )
            }
            ParseError::ImportNotTopLevel(span) => {
                write!(
                    f,
                    "Imports are only allowed at the top level (line {}).",
                    span.line
                )
            }
            ParseError::ImportNotFound(span, path) => {
                write!(
                    f,
                    "Cannot read imported file `{}` on line {}.",
                    path, span.line
                )
            }
            ParseError::UnclosedBlock(span) => {
                write!(f, "Unclosed block starting before line {}.", span.line)
            }
            ParseError::ExpectedClassMember(span, got) => {
                write!(
                    f,
                    "Expected a field or method on line {}, but instead got {:?}.",
                    span.line, got
                )
            }
        }
    }
}
