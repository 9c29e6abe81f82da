pub mod builtins;
mod environment;
pub mod errors;
mod evaluator;
pub mod object;

pub use builtins::{Builtin, BuiltinRegistry};
pub use environment::Environment;
pub use evaluator::Evaluator;
pub use object::Object;
