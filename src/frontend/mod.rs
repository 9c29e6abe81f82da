pub mod ast;
pub mod errors;
mod lexer;
pub mod operator;
mod parser;
pub mod token;

pub use lexer::Lexer;
pub use parser::{FsReader, Parser, SourceReader};
