//! Error types for the two error domains described by the spec: lexical
//! errors (raised while turning source bytes into tokens) and runtime
//! errors (raised while executing an AST). Neither domain needs a
//! hierarchy beyond distinguishing cases for message text, so both are
//! flat `enum`s behind `thiserror`.

use span::Span;
use thiserror::Error;

pub type LexResult<T> = Result<T, LexError>;
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// A failure while tokenizing source text. Every variant carries the span
/// of the offending input so a future parser or CLI can point at it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
  #[error("unterminated string literal")]
  UnterminatedString { span: Span },
  #[error("unrecognized escape sequence '\\{ch}'")]
  UnknownEscape { span: Span, ch: char },
  #[error("'!' must be followed by '='")]
  DanglingBang { span: Span },
  #[error("unexpected character '{ch}'")]
  UnexpectedChar { span: Span, ch: char },
  #[error("indentation must change in steps of exactly two spaces")]
  BadIndent { span: Span },
  #[error("number literal does not fit in a 64-bit integer")]
  NumberOverflow { span: Span },
}

impl LexError {
  pub fn span(&self) -> Span {
    match self {
      LexError::UnterminatedString { span }
      | LexError::UnknownEscape { span, .. }
      | LexError::DanglingBang { span }
      | LexError::UnexpectedChar { span, .. }
      | LexError::BadIndent { span }
      | LexError::NumberOverflow { span } => *span,
    }
  }
}

/// A failure while executing an AST against a scope and a value system.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
  #[error("undefined variable '{0}'")]
  UndefinedVariable(String),
  #[error("cannot access field '{field}' on a non-instance value")]
  FieldAccessOnNonInstance { field: String },
  #[error("no method '{name}' with {arity} argument(s)")]
  NoSuchMethod { name: String, arity: usize },
  #[error("'+' is not supported between these operand types")]
  InvalidAdd,
  #[error("operands of '-' must both be numbers")]
  InvalidSub,
  #[error("operands of '*' must both be numbers")]
  InvalidMult,
  #[error("operands of '/' must both be numbers")]
  InvalidDiv,
  #[error("division by zero")]
  DivisionByZero,
  #[error("cannot compare these values")]
  Incomparable,
  #[error("cannot compare these values for {0}")]
  CompareFailed(&'static str),
  #[error("recursion limit exceeded")]
  RecursionLimit,
  #[error("'return' used outside of a method body")]
  BareReturn,
  #[error("I/O error: {0}")]
  Io(String),
}

pub(crate) fn io_err(e: std::io::Error) -> RuntimeError {
  RuntimeError::Io(e.to_string())
}
