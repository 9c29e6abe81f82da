pub mod frontend;
pub mod interpreter;

pub use frontend::{FsReader, Parser, SourceReader};
pub use interpreter::{BuiltinRegistry, Environment, Evaluator, Object};
