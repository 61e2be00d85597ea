//! A tree-walking interpreter for a small, indentation-structured,
//! dynamically-typed scripting language: a lexer turning source text into
//! tokens, a tagged value/class/instance runtime, and an AST node set that
//! evaluates directly against that runtime. There is no parser here —
//! trees are built directly out of the `ast` module's node constructors.

pub mod ast;
pub mod context;
pub mod error;
pub mod lexer;
pub mod value;

pub use context::{Context, Output};
pub use error::{LexError, RuntimeError};
pub use value::{Scope, Value};
