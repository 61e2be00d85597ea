//! The statement/expression node set executed against a `Scope` and a
//! `Context`. Node enumeration style (one flat `Stmt` enum over boxed
//! payload structs) follows the teacher's `crates/syntax/src/ast.rs`; the
//! node set itself and each node's semantics are ported one-for-one from
//! `statement.cpp`'s `Assignment`/`VariableValue`/`Print`/`MethodCall`/
//! `Stringify`/`Add`/`Sub`/`Mult`/`Div`/`Compound`/`Return`/
//! `ClassDefinition`/`FieldAssignment`/`IfElse`/`Or`/`And`/`Not`/
//! `Comparison`/`NewInstance`/`MethodBody` node types.
//!
//! There is no parser in scope: trees are built by hand (by tests, and by
//! any future embedder) directly out of these node constructors.

use std::rc::Rc;

use crate::context::Context;
use crate::error::{RuntimeError, RuntimeResult};
use crate::value::{self, ClassDef, Object, Scope, Value, ADD_METHOD, INIT_METHOD};

/// Non-local control transfer threaded alongside ordinary errors through
/// every node's `execute`. `Return` is the only variant with Language-level
/// meaning (it implements the `return` statement) and is caught exactly
/// once, by `MethodBody::execute`; `Error` just rides the same `Result` so
/// `?` keeps working without a second error channel.
enum Unwind {
  Error(RuntimeError),
  Return(Value),
}

impl From<RuntimeError> for Unwind {
  fn from(e: RuntimeError) -> Self {
    Unwind::Error(e)
  }
}

type ExecResult = Result<Value, Unwind>;

/// Runs `stmt` as a top-level program (not inside a method body): a
/// `return` reaching this point, with nothing left to catch it, is a
/// `RuntimeError::BareReturn` rather than undefined behavior.
pub fn execute(stmt: &Stmt, scope: &mut Scope, ctx: &mut Context<'_>) -> RuntimeResult<Value> {
  match stmt.execute(scope, ctx) {
    Ok(v) => Ok(v),
    Err(Unwind::Return(_)) => Err(RuntimeError::BareReturn),
    Err(Unwind::Error(e)) => Err(e),
  }
}

pub enum Stmt {
  Assignment(Assignment),
  VariableValue(VariableValue),
  FieldAssignment(FieldAssignment),
  Print(Print),
  MethodCall(MethodCall),
  Stringify(Stringify),
  Add(BinOp),
  Sub(BinOp),
  Mult(BinOp),
  Div(BinOp),
  Compound(Compound),
  Return(Return),
  ClassDefinition(ClassDefinition),
  IfElse(IfElse),
  Or(BinOp),
  And(BinOp),
  Not(Not),
  Comparison(Comparison),
  NewInstance(NewInstance),
  MethodBody(MethodBody),
  /// A literal value with no sub-evaluation, used to build test fixtures
  /// and to express `None`/number/string/bool constants in a tree.
  Literal(Value),
}

impl Stmt {
  fn execute(&self, scope: &mut Scope, ctx: &mut Context<'_>) -> ExecResult {
    match self {
      Stmt::Assignment(n) => n.execute(scope, ctx),
      Stmt::VariableValue(n) => n.execute(scope),
      Stmt::FieldAssignment(n) => n.execute(scope, ctx),
      Stmt::Print(n) => n.execute(scope, ctx),
      Stmt::MethodCall(n) => n.execute(scope, ctx),
      Stmt::Stringify(n) => n.execute(scope, ctx),
      Stmt::Add(n) => n.execute_add(scope, ctx),
      Stmt::Sub(n) => n.execute_sub(scope, ctx),
      Stmt::Mult(n) => n.execute_mult(scope, ctx),
      Stmt::Div(n) => n.execute_div(scope, ctx),
      Stmt::Compound(n) => n.execute(scope, ctx),
      Stmt::Return(n) => n.execute(scope, ctx),
      Stmt::ClassDefinition(n) => n.execute(scope),
      Stmt::IfElse(n) => n.execute(scope, ctx),
      Stmt::Or(n) => n.execute_or(scope, ctx),
      Stmt::And(n) => n.execute_and(scope, ctx),
      Stmt::Not(n) => n.execute(scope, ctx),
      Stmt::Comparison(n) => n.execute(scope, ctx),
      Stmt::NewInstance(n) => n.execute(scope, ctx),
      Stmt::MethodBody(n) => n.execute(scope, ctx).map_err(Unwind::Error),
      Stmt::Literal(v) => Ok(v.share()),
    }
  }
}

/// `name = expr`. Evaluates `expr`, binds it (by a shared handle) to `name`
/// in the current scope, and returns that same value.
pub struct Assignment {
  pub name: String,
  pub expr: Box<Stmt>,
}

impl Assignment {
  pub fn new(name: impl Into<String>, expr: Stmt) -> Self {
    Assignment {
      name: name.into(),
      expr: Box::new(expr),
    }
  }

  fn execute(&self, scope: &mut Scope, ctx: &mut Context<'_>) -> ExecResult {
    let value = self.expr.execute(scope, ctx)?;
    scope.insert(self.name.clone(), value.share());
    Ok(value)
  }
}

/// A dotted variable reference: `a`, or `a.b.c`. The first segment is
/// looked up in scope; each further segment walks one field deeper into an
/// instance, failing if any intermediate value isn't an instance.
pub struct VariableValue {
  pub path: Vec<String>,
}

impl VariableValue {
  pub fn new(path: Vec<String>) -> Self {
    assert!(!path.is_empty(), "a variable reference needs at least one segment");
    VariableValue { path }
  }

  fn execute(&self, scope: &Scope) -> ExecResult {
    let mut segments = self.path.iter();
    let first = segments.next().expect("path is non-empty by construction");
    let mut current = scope
      .get(first)
      .ok_or_else(|| RuntimeError::UndefinedVariable(first.clone()))?
      .share();
    for field in segments {
      let inst = current.as_instance().ok_or_else(|| RuntimeError::FieldAccessOnNonInstance {
        field: field.clone(),
      })?;
      current = inst
        .fields
        .borrow()
        .get(field)
        .ok_or_else(|| RuntimeError::UndefinedVariable(field.clone()))?
        .share();
    }
    Ok(current)
  }
}

/// `object.field = expr`, where `object` is resolved first (left to right)
/// and then `expr`. A no-op, not an error, if `object` doesn't resolve to
/// an instance.
pub struct FieldAssignment {
  pub object: VariableValue,
  pub field: String,
  pub expr: Box<Stmt>,
}

impl FieldAssignment {
  pub fn new(object: VariableValue, field: impl Into<String>, expr: Stmt) -> Self {
    FieldAssignment {
      object,
      field: field.into(),
      expr: Box::new(expr),
    }
  }

  fn execute(&self, scope: &mut Scope, ctx: &mut Context<'_>) -> ExecResult {
    let object = self.object.execute(scope)?;
    let value = self.expr.execute(scope, ctx)?;
    if let Some(inst) = object.as_instance() {
      inst.fields.borrow_mut().insert(self.field.clone(), value.share());
    }
    Ok(value)
  }
}

/// `print a, b, c`: arguments are space-separated, the whole line is
/// newline-terminated, and `None` prints as the literal text `None`.
pub struct Print {
  pub args: Vec<Stmt>,
}

impl Print {
  pub fn new(args: Vec<Stmt>) -> Self {
    Print { args }
  }

  fn execute(&self, scope: &mut Scope, ctx: &mut Context<'_>) -> ExecResult {
    use std::io::Write as _;
    for (i, arg) in self.args.iter().enumerate() {
      let value = arg.execute(scope, ctx)?;
      if i > 0 {
        write!(ctx.output(), " ").map_err(crate::error::io_err)?;
      }
      value.print(ctx).map_err(Unwind::Error)?;
    }
    writeln!(ctx.output()).map_err(crate::error::io_err)?;
    Ok(Value::none())
  }
}

/// `receiver.method(args...)`. Silently evaluates to `None` if `receiver`
/// isn't a class instance; arity/name mismatches on an instance receiver
/// are a `RuntimeError`.
pub struct MethodCall {
  pub receiver: Box<Stmt>,
  pub method: String,
  pub args: Vec<Stmt>,
}

impl MethodCall {
  pub fn new(receiver: Stmt, method: impl Into<String>, args: Vec<Stmt>) -> Self {
    MethodCall {
      receiver: Box::new(receiver),
      method: method.into(),
      args,
    }
  }

  fn execute(&self, scope: &mut Scope, ctx: &mut Context<'_>) -> ExecResult {
    let receiver = self.receiver.execute(scope, ctx)?;
    if receiver.as_instance().is_none() {
      return Ok(Value::none());
    }
    let mut args = Vec::with_capacity(self.args.len());
    for arg in &self.args {
      args.push(arg.execute(scope, ctx)?);
    }
    value::call_method(&receiver, &self.method, args, ctx).map_err(Unwind::Error)
  }
}

/// `str(expr)`: renders `expr` exactly as `print` would, into a string
/// value instead of to the output sink, by redirecting a throwaway
/// `Context` at an in-memory buffer.
pub struct Stringify {
  pub arg: Box<Stmt>,
}

impl Stringify {
  pub fn new(arg: Stmt) -> Self {
    Stringify { arg: Box::new(arg) }
  }

  fn execute(&self, scope: &mut Scope, ctx: &mut Context<'_>) -> ExecResult {
    let value = self.arg.execute(scope, ctx)?;
    let mut buf: Vec<u8> = Vec::new();
    {
      let mut tmp = Context::new(&mut buf);
      value.print(&mut tmp).map_err(Unwind::Error)?;
    }
    Ok(Value::string(String::from_utf8_lossy(&buf).into_owned()))
  }
}

/// Shared payload for every binary operator node (`+ - * / or and`).
pub struct BinOp {
  pub lhs: Box<Stmt>,
  pub rhs: Box<Stmt>,
}

impl BinOp {
  pub fn new(lhs: Stmt, rhs: Stmt) -> Self {
    BinOp {
      lhs: Box::new(lhs),
      rhs: Box::new(rhs),
    }
  }

  fn execute_add(&self, scope: &mut Scope, ctx: &mut Context<'_>) -> ExecResult {
    let lhs = self.lhs.execute(scope, ctx)?;
    let rhs = self.rhs.execute(scope, ctx)?;
    if let (Some(a), Some(b)) = (lhs.as_number(), rhs.as_number()) {
      return Ok(Value::number(a.wrapping_add(b)));
    }
    if let (Some(a), Some(b)) = (lhs.as_string(), rhs.as_string()) {
      return Ok(Value::string(format!("{a}{b}")));
    }
    if let Some(inst) = lhs.as_instance() {
      if inst.class.has_method(ADD_METHOD, 1) {
        return value::call_method(&lhs, ADD_METHOD, vec![rhs], ctx).map_err(Unwind::Error);
      }
    }
    Err(Unwind::Error(RuntimeError::InvalidAdd))
  }

  fn execute_sub(&self, scope: &mut Scope, ctx: &mut Context<'_>) -> ExecResult {
    let lhs = self.lhs.execute(scope, ctx)?;
    let rhs = self.rhs.execute(scope, ctx)?;
    match (lhs.as_number(), rhs.as_number()) {
      (Some(a), Some(b)) => Ok(Value::number(a.wrapping_sub(b))),
      _ => Err(Unwind::Error(RuntimeError::InvalidSub)),
    }
  }

  fn execute_mult(&self, scope: &mut Scope, ctx: &mut Context<'_>) -> ExecResult {
    let lhs = self.lhs.execute(scope, ctx)?;
    let rhs = self.rhs.execute(scope, ctx)?;
    match (lhs.as_number(), rhs.as_number()) {
      (Some(a), Some(b)) => Ok(Value::number(a.wrapping_mul(b))),
      _ => Err(Unwind::Error(RuntimeError::InvalidMult)),
    }
  }

  fn execute_div(&self, scope: &mut Scope, ctx: &mut Context<'_>) -> ExecResult {
    let lhs = self.lhs.execute(scope, ctx)?;
    let rhs = self.rhs.execute(scope, ctx)?;
    match (lhs.as_number(), rhs.as_number()) {
      (Some(_), Some(0)) => Err(Unwind::Error(RuntimeError::DivisionByZero)),
      (Some(a), Some(b)) => Ok(Value::number(a.wrapping_div(b))),
      _ => Err(Unwind::Error(RuntimeError::InvalidDiv)),
    }
  }

  fn execute_or(&self, scope: &mut Scope, ctx: &mut Context<'_>) -> ExecResult {
    if self.lhs.execute(scope, ctx)?.truthy() {
      return Ok(Value::boolean(true));
    }
    Ok(Value::boolean(self.rhs.execute(scope, ctx)?.truthy()))
  }

  fn execute_and(&self, scope: &mut Scope, ctx: &mut Context<'_>) -> ExecResult {
    if !self.lhs.execute(scope, ctx)?.truthy() {
      return Ok(Value::boolean(false));
    }
    Ok(Value::boolean(self.rhs.execute(scope, ctx)?.truthy()))
  }
}

/// A sequence of statements executed in order; evaluates to `None`.
pub struct Compound {
  pub stmts: Vec<Stmt>,
}

impl Compound {
  pub fn new(stmts: Vec<Stmt>) -> Self {
    Compound { stmts }
  }

  fn execute(&self, scope: &mut Scope, ctx: &mut Context<'_>) -> ExecResult {
    for stmt in &self.stmts {
      stmt.execute(scope, ctx)?;
    }
    Ok(Value::none())
  }
}

/// `return expr`. Never itself produces a value in the ordinary sense: it
/// always unwinds to the nearest enclosing `MethodBody`.
pub struct Return {
  pub expr: Box<Stmt>,
}

impl Return {
  pub fn new(expr: Stmt) -> Self {
    Return { expr: Box::new(expr) }
  }

  fn execute(&self, scope: &mut Scope, ctx: &mut Context<'_>) -> ExecResult {
    let value = self.expr.execute(scope, ctx)?;
    Err(Unwind::Return(value))
  }
}

/// Binds an already-built class's name in scope and returns a handle to it.
pub struct ClassDefinition {
  pub class: Rc<ClassDef>,
}

impl ClassDefinition {
  pub fn new(class: Rc<ClassDef>) -> Self {
    ClassDefinition { class }
  }

  fn execute(&self, scope: &mut Scope) -> ExecResult {
    let handle = Value::owned(Object::Class(self.class.clone()));
    scope.insert(self.class.name.clone(), handle.share());
    Ok(handle)
  }
}

/// `if cond: if_body [else: else_body]`.
pub struct IfElse {
  pub cond: Box<Stmt>,
  pub if_body: Box<Stmt>,
  pub else_body: Option<Box<Stmt>>,
}

impl IfElse {
  pub fn new(cond: Stmt, if_body: Stmt, else_body: Option<Stmt>) -> Self {
    IfElse {
      cond: Box::new(cond),
      if_body: Box::new(if_body),
      else_body: else_body.map(Box::new),
    }
  }

  fn execute(&self, scope: &mut Scope, ctx: &mut Context<'_>) -> ExecResult {
    if self.cond.execute(scope, ctx)?.truthy() {
      self.if_body.execute(scope, ctx)
    } else if let Some(else_body) = &self.else_body {
      else_body.execute(scope, ctx)
    } else {
      Ok(Value::none())
    }
  }
}

pub struct Not {
  pub arg: Box<Stmt>,
}

impl Not {
  pub fn new(arg: Stmt) -> Self {
    Not { arg: Box::new(arg) }
  }

  fn execute(&self, scope: &mut Scope, ctx: &mut Context<'_>) -> ExecResult {
    let value = self.arg.execute(scope, ctx)?;
    Ok(Value::boolean(!value.truthy()))
  }
}

#[derive(Clone, Copy)]
pub enum Comparator {
  Equal,
  NotEqual,
  Less,
  Greater,
  LessOrEqual,
  GreaterOrEqual,
}

impl Comparator {
  fn label(self) -> &'static str {
    match self {
      Comparator::Equal => "==",
      Comparator::NotEqual => "!=",
      Comparator::Less => "<",
      Comparator::Greater => ">",
      Comparator::LessOrEqual => "<=",
      Comparator::GreaterOrEqual => ">=",
    }
  }
}

/// `lhs <op> rhs` for one of `== != < > <= >=`. Equality and `<` dispatch
/// directly to `__eq__`/`__lt__`; the other four derive from those two and
/// rewrap any failure into a single generic "can't compare" error for that
/// operator, matching the source's own re-throw-as-generic behavior.
pub struct Comparison {
  pub cmp: Comparator,
  pub lhs: Box<Stmt>,
  pub rhs: Box<Stmt>,
}

impl Comparison {
  pub fn new(cmp: Comparator, lhs: Stmt, rhs: Stmt) -> Self {
    Comparison {
      cmp,
      lhs: Box::new(lhs),
      rhs: Box::new(rhs),
    }
  }

  fn execute(&self, scope: &mut Scope, ctx: &mut Context<'_>) -> ExecResult {
    let lhs = self.lhs.execute(scope, ctx)?;
    let rhs = self.rhs.execute(scope, ctx)?;
    let result = match self.cmp {
      Comparator::Equal => value::equal(&lhs, &rhs, ctx),
      Comparator::NotEqual => value::not_equal(&lhs, &rhs, ctx),
      Comparator::Less => value::less(&lhs, &rhs, ctx),
      Comparator::Greater => value::greater(&lhs, &rhs, ctx),
      Comparator::LessOrEqual => value::less_or_equal(&lhs, &rhs, ctx),
      Comparator::GreaterOrEqual => value::greater_or_equal(&lhs, &rhs, ctx),
    }
    .map_err(|_| RuntimeError::CompareFailed(self.cmp.label()))?;
    Ok(Value::boolean(result))
  }
}

/// `Class(args...)`. Builds a fresh, fieldless instance, then calls
/// `__init__` if one exists matching the given argument count (or, with no
/// arguments at all, if a zero-arity `__init__` exists); otherwise the
/// instance is returned uninitialized, without error.
pub struct NewInstance {
  pub class: Rc<ClassDef>,
  pub args: Vec<Stmt>,
}

impl NewInstance {
  pub fn new(class: Rc<ClassDef>, args: Vec<Stmt>) -> Self {
    NewInstance { class, args }
  }

  fn execute(&self, scope: &mut Scope, ctx: &mut Context<'_>) -> ExecResult {
    let instance = value::new_instance(self.class.clone());
    if self.class.has_method(INIT_METHOD, self.args.len()) {
      let mut args = Vec::with_capacity(self.args.len());
      for arg in &self.args {
        args.push(arg.execute(scope, ctx)?);
      }
      value::call_method(&instance, INIT_METHOD, args, ctx).map_err(Unwind::Error)?;
    }
    Ok(instance)
  }
}

/// Wraps a method's body so that a `return` inside it is caught here
/// rather than propagating further: this is the only place `Unwind::Return`
/// is ever observed instead of re-propagated. A body that runs to
/// completion without a `return` evaluates to `None`.
pub struct MethodBody {
  pub body: Box<Stmt>,
}

impl MethodBody {
  pub fn new(body: Stmt) -> Self {
    MethodBody { body: Box::new(body) }
  }

  pub(crate) fn execute(&self, scope: &mut Scope, ctx: &mut Context<'_>) -> RuntimeResult<Value> {
    match self.body.execute(scope, ctx) {
      Ok(_) => Ok(Value::none()),
      Err(Unwind::Return(value)) => Ok(value),
      Err(Unwind::Error(e)) => Err(e),
    }
  }

  #[cfg(test)]
  pub(crate) fn for_test() -> Self {
    MethodBody::new(Stmt::Compound(Compound::new(vec![])))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::value::Method;

  fn run(stmt: &Stmt) -> RuntimeResult<Value> {
    let mut buf = Vec::new();
    let mut ctx = Context::new(&mut buf);
    let mut scope = Scope::new();
    execute(stmt, &mut scope, &mut ctx)
  }

  #[test]
  fn assignment_binds_and_returns_value() {
    let stmt = Stmt::Assignment(Assignment::new("x", Stmt::Literal(Value::number(42))));
    let result = run(&stmt).unwrap();
    assert_eq!(result.as_number(), Some(42));
  }

  #[test]
  fn undefined_variable_is_a_runtime_error() {
    let stmt = Stmt::VariableValue(VariableValue::new(vec!["missing".to_string()]));
    let err = run(&stmt).unwrap_err();
    assert_eq!(err, RuntimeError::UndefinedVariable("missing".to_string()));
  }

  #[test]
  fn division_by_zero_errors() {
    let stmt = Stmt::Div(BinOp::new(Stmt::Literal(Value::number(1)), Stmt::Literal(Value::number(0))));
    assert_eq!(run(&stmt).unwrap_err(), RuntimeError::DivisionByZero);
  }

  #[test]
  fn string_concatenation_via_add() {
    let stmt = Stmt::Add(BinOp::new(
      Stmt::Literal(Value::string("foo")),
      Stmt::Literal(Value::string("bar")),
    ));
    assert_eq!(run(&stmt).unwrap().as_string(), Some("foobar"));
  }

  #[test]
  fn and_short_circuits() {
    // `False and (1/0)` must not evaluate the right-hand side.
    let stmt = Stmt::And(BinOp::new(
      Stmt::Literal(Value::boolean(false)),
      Stmt::Div(BinOp::new(Stmt::Literal(Value::number(1)), Stmt::Literal(Value::number(0)))),
    ));
    assert_eq!(run(&stmt).unwrap().as_bool(), Some(false));
  }

  #[test]
  fn or_short_circuits() {
    let stmt = Stmt::Or(BinOp::new(
      Stmt::Literal(Value::boolean(true)),
      Stmt::Div(BinOp::new(Stmt::Literal(Value::number(1)), Stmt::Literal(Value::number(0)))),
    ));
    assert_eq!(run(&stmt).unwrap().as_bool(), Some(true));
  }

  #[test]
  fn bare_return_outside_method_body_is_a_runtime_error() {
    let stmt = Stmt::Return(Return::new(Stmt::Literal(Value::number(1))));
    assert_eq!(run(&stmt).unwrap_err(), RuntimeError::BareReturn);
  }

  #[test]
  fn method_body_catches_return() {
    let body = MethodBody::new(Stmt::Compound(Compound::new(vec![
      Stmt::Return(Return::new(Stmt::Literal(Value::number(7)))),
      Stmt::Return(Return::new(Stmt::Literal(Value::number(99)))),
    ])));
    let mut buf = Vec::new();
    let mut ctx = Context::new(&mut buf);
    let mut scope = Scope::new();
    let result = body.execute(&mut scope, &mut ctx).unwrap();
    assert_eq!(result.as_number(), Some(7));
  }

  #[test]
  fn new_instance_calls_matching_init() {
    let init_body = Rc::new(MethodBody::new(Stmt::FieldAssignment(FieldAssignment::new(
      VariableValue::new(vec!["self".to_string()]),
      "value",
      Stmt::VariableValue(VariableValue::new(vec!["n".to_string()])),
    ))));
    let init = Method::new(INIT_METHOD, vec!["n".to_string()], init_body);
    let class = Rc::new(ClassDef::new("Box", vec![init], None));
    let stmt = Stmt::NewInstance(NewInstance::new(class, vec![Stmt::Literal(Value::number(5))]));
    let instance = run(&stmt).unwrap();
    let inst = instance.as_instance().unwrap();
    assert_eq!(inst.fields.borrow().get("value").unwrap().as_number(), Some(5));
  }

  #[test]
  fn field_assignment_is_a_no_op_on_non_instance() {
    let stmt = Stmt::FieldAssignment(FieldAssignment::new(
      VariableValue::new(vec!["x".to_string()]),
      "y",
      Stmt::Literal(Value::number(1)),
    ));
    let mut buf = Vec::new();
    let mut ctx = Context::new(&mut buf);
    let mut scope = Scope::new();
    scope.insert("x".to_string(), Value::number(10));
    let result = execute(&stmt, &mut scope, &mut ctx).unwrap();
    assert_eq!(result.as_number(), Some(1));
  }
}
