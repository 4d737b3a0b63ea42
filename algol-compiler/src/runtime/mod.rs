mod callable;
mod containers;
mod environment;
mod error;
mod interpreter;
mod natives;
mod value;

pub use callable::{Class, ClassParents, EnumMember, Function, Instance, NativeFunction};
pub use environment::Environment;
pub use error::{RuntimeError, Signal};
pub use interpreter::{Interpreter, OutputBuffer, TestOutcome, TestStatus};
pub use natives::{NativeKind, NativeSpec, NATIVES};
pub use value::Value;
