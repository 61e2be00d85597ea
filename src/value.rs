//! The value universe: a small tagged union of `Number`/`String`/`Bool`/
//! `Class`/`Instance`, plus the `None` handle, all behind one reference-
//! counted `Value` type. Shaped after the teacher's shared-ownership handle
//! (`crates/value/src/ptr.rs`'s `Ptr<T>(Rc<RefCell<T>>)`) and its class/
//! method-table layout (`crates/value/src/object/class.rs`), with the
//! truthiness/equality/method-dispatch rules themselves ported from the
//! source this spec distills (`runtime.cpp`'s `IsTrue`, `Class::GetMethod`,
//! `ClassInstance::Call`, and the `Equal`/`Less`/derived comparisons).

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write as _;
use std::rc::Rc;

use crate::ast::MethodBody;
use crate::context::Context;
use crate::error::{RuntimeError, RuntimeResult};

/// Dunder method names with dispatch meaning to the evaluator.
pub const INIT_METHOD: &str = "__init__";
pub const STR_METHOD: &str = "__str__";
pub const ADD_METHOD: &str = "__add__";
pub const EQ_METHOD: &str = "__eq__";
pub const LT_METHOD: &str = "__lt__";

/// A mapping from identifier to value, used both as a class instance's
/// field table and as a method call's local scope.
pub type Scope = HashMap<String, Value>;

/// One method on a class: a name (used for dispatch and arity checks), its
/// formal parameter names, and a body that has already been wrapped in a
/// `MethodBody` node so `return` is caught exactly once per call.
#[derive(Clone)]
pub struct Method {
  pub name: String,
  pub params: Vec<String>,
  pub body: Rc<MethodBody>,
}

impl Method {
  pub fn new(name: impl Into<String>, params: Vec<String>, body: Rc<MethodBody>) -> Self {
    Method {
      name: name.into(),
      params,
      body,
    }
  }
}

/// A class: a name, an ordered list of methods (first match wins, see
/// `find_method`), and at most one parent class consulted one level deep.
pub struct ClassDef {
  pub name: String,
  pub methods: Vec<Method>,
  pub parent: Option<Rc<ClassDef>>,
}

impl ClassDef {
  pub fn new(name: impl Into<String>, methods: Vec<Method>, parent: Option<Rc<ClassDef>>) -> Self {
    ClassDef {
      name: name.into(),
      methods,
      parent,
    }
  }

  /// Looks up `name` in this class's own methods, then, only if not found
  /// there, in the immediate parent's own methods. Does not recurse past
  /// one level, even if the parent itself has a parent.
  pub fn find_method(&self, name: &str) -> Option<&Method> {
    if let Some(method) = self.methods.iter().find(|m| m.name == name) {
      return Some(method);
    }
    self.parent.as_deref()?.methods.iter().find(|m| m.name == name)
  }

  pub fn has_method(&self, name: &str, arity: usize) -> bool {
    self
      .find_method(name)
      .map(|m| m.params.len() == arity)
      .unwrap_or(false)
  }
}

/// A live object of some class: the class it was built from, and a mutable
/// field table shared by every handle pointing at this same instance.
pub struct Instance {
  pub class: Rc<ClassDef>,
  pub fields: RefCell<Scope>,
}

pub enum Object {
  Number(i64),
  String(String),
  Bool(bool),
  Class(Rc<ClassDef>),
  Instance(Instance),
}

/// A handle to a value. `None` (the empty handle) is represented by the
/// inner `Option` being empty; every other value is a reference-counted
/// `Object`. Cloning a handle (`share`) is always a cheap `Rc` clone, never
/// a deep copy — this is what lets `self` be bound into a method call
/// without copying the receiver.
#[derive(Clone)]
pub struct Value(Option<Rc<Object>>);

impl Value {
  pub fn none() -> Self {
    Value(None)
  }

  pub fn owned(object: Object) -> Self {
    Value(Some(Rc::new(object)))
  }

  pub fn number(n: i64) -> Self {
    Value::owned(Object::Number(n))
  }

  pub fn string(s: impl Into<String>) -> Self {
    Value::owned(Object::String(s.into()))
  }

  pub fn boolean(b: bool) -> Self {
    Value::owned(Object::Bool(b))
  }

  /// Produces a non-owning handle sharing the same underlying object (or
  /// the same emptiness) as `self`. Always O(1): just an `Rc` clone.
  pub fn share(&self) -> Value {
    Value(self.0.clone())
  }

  pub fn is_none(&self) -> bool {
    self.0.is_none()
  }

  pub fn as_object(&self) -> Option<&Object> {
    self.0.as_deref()
  }

  pub fn as_number(&self) -> Option<i64> {
    match self.as_object() {
      Some(Object::Number(n)) => Some(*n),
      _ => None,
    }
  }

  pub fn as_string(&self) -> Option<&str> {
    match self.as_object() {
      Some(Object::String(s)) => Some(s),
      _ => None,
    }
  }

  pub fn as_bool(&self) -> Option<bool> {
    match self.as_object() {
      Some(Object::Bool(b)) => Some(*b),
      _ => None,
    }
  }

  pub fn as_class(&self) -> Option<&Rc<ClassDef>> {
    match self.as_object() {
      Some(Object::Class(c)) => Some(c),
      _ => None,
    }
  }

  pub fn as_instance(&self) -> Option<&Instance> {
    match self.as_object() {
      Some(Object::Instance(inst)) => Some(inst),
      _ => None,
    }
  }

  /// `None`, `Bool(false)`, `Number(0)`, and `String("")` are falsy. Every
  /// `Class` and `Instance` reference is *also* falsy — not the usual
  /// Python-like convention, but preserved intentionally from the source
  /// this evaluator was distilled from.
  pub fn truthy(&self) -> bool {
    match self.as_object() {
      None => false,
      Some(Object::Bool(b)) => *b,
      Some(Object::Number(n)) => *n != 0,
      Some(Object::String(s)) => !s.is_empty(),
      Some(Object::Class(_)) | Some(Object::Instance(_)) => false,
    }
  }

  /// Writes this value's textual representation to `ctx`'s output, calling
  /// `__str__` for an instance that defines one.
  pub fn print(&self, ctx: &mut Context<'_>) -> RuntimeResult<()> {
    match self.as_object() {
      None => write!(ctx.output(), "None").map_err(crate::error::io_err),
      Some(Object::Number(n)) => write!(ctx.output(), "{n}").map_err(crate::error::io_err),
      Some(Object::String(s)) => write!(ctx.output(), "{s}").map_err(crate::error::io_err),
      Some(Object::Bool(b)) => {
        write!(ctx.output(), "{}", if *b { "True" } else { "False" }).map_err(crate::error::io_err)
      }
      Some(Object::Class(class)) => write!(ctx.output(), "Class({})", class.name).map_err(crate::error::io_err),
      Some(Object::Instance(inst)) => {
        if inst.class.has_method(STR_METHOD, 0) {
          let rendered = call_method(self, STR_METHOD, vec![], ctx)?;
          return rendered.print(ctx);
        }
        write!(ctx.output(), "<{} instance>", inst.class.name).map_err(crate::error::io_err)
      }
    }
  }
}

pub fn new_instance(class: Rc<ClassDef>) -> Value {
  Value::owned(Object::Instance(Instance {
    class,
    fields: RefCell::new(Scope::new()),
  }))
}

/// Calls `method` on `receiver` with `args`, binding `self` to a shared
/// (non-owning) handle of the receiver and each parameter positionally.
/// `receiver` must already be known to be an instance; callers that aren't
/// sure should check `as_instance()` first (see `ast::MethodCall`, which
/// silently no-ops on a non-instance receiver instead of calling this).
pub fn call_method(receiver: &Value, method: &str, args: Vec<Value>, ctx: &mut Context<'_>) -> RuntimeResult<Value> {
  let inst = receiver
    .as_instance()
    .expect("call_method requires an instance receiver");
  let method_def = inst
    .class
    .find_method(method)
    .filter(|m| m.params.len() == args.len())
    .cloned()
    .ok_or_else(|| RuntimeError::NoSuchMethod {
      name: method.to_string(),
      arity: args.len(),
    })?;
  log::debug!("calling {}.{}/{}", inst.class.name, method_def.name, method_def.params.len());

  let mut scope = Scope::new();
  scope.insert("self".to_string(), receiver.share());
  for (param, arg) in method_def.params.iter().zip(args) {
    scope.insert(param.clone(), arg);
  }

  let mut guard = ctx.enter_call()?;
  method_def.body.execute(&mut scope, guard.ctx())
}

fn dispatch_compare(
  lhs: &Value,
  rhs: &Value,
  ctx: &mut Context<'_>,
  dunder: &str,
  numbers: impl Fn(i64, i64) -> bool,
  strings: impl Fn(&str, &str) -> bool,
  bools: impl Fn(bool, bool) -> bool,
) -> RuntimeResult<bool> {
  match (lhs.as_object(), rhs.as_object()) {
    (Some(Object::Number(a)), Some(Object::Number(b))) => Ok(numbers(*a, *b)),
    (Some(Object::String(a)), Some(Object::String(b))) => Ok(strings(a, b)),
    (Some(Object::Bool(a)), Some(Object::Bool(b))) => Ok(bools(*a, *b)),
    _ => {
      if let Some(inst) = lhs.as_instance() {
        if inst.class.has_method(dunder, 1) {
          let result = call_method(lhs, dunder, vec![rhs.share()], ctx)?;
          return result.as_bool().ok_or(RuntimeError::Incomparable);
        }
      }
      Err(RuntimeError::Incomparable)
    }
  }
}

pub fn equal(lhs: &Value, rhs: &Value, ctx: &mut Context<'_>) -> RuntimeResult<bool> {
  if lhs.is_none() && rhs.is_none() {
    return Ok(true);
  }
  dispatch_compare(lhs, rhs, ctx, EQ_METHOD, |a, b| a == b, |a, b| a == b, |a, b| a == b)
}

pub fn less(lhs: &Value, rhs: &Value, ctx: &mut Context<'_>) -> RuntimeResult<bool> {
  dispatch_compare(lhs, rhs, ctx, LT_METHOD, |a, b| a < b, |a, b| a < b, |a, b| !a & b)
}

pub fn not_equal(lhs: &Value, rhs: &Value, ctx: &mut Context<'_>) -> RuntimeResult<bool> {
  equal(lhs, rhs, ctx).map(|b| !b).map_err(|_| RuntimeError::CompareFailed("!="))
}

pub fn greater(lhs: &Value, rhs: &Value, ctx: &mut Context<'_>) -> RuntimeResult<bool> {
  let is_less = less(lhs, rhs, ctx).map_err(|_| RuntimeError::CompareFailed(">"))?;
  let is_equal = equal(lhs, rhs, ctx).map_err(|_| RuntimeError::CompareFailed(">"))?;
  Ok(!is_less && !is_equal)
}

pub fn less_or_equal(lhs: &Value, rhs: &Value, ctx: &mut Context<'_>) -> RuntimeResult<bool> {
  greater(lhs, rhs, ctx).map(|b| !b).map_err(|_| RuntimeError::CompareFailed("<="))
}

pub fn greater_or_equal(lhs: &Value, rhs: &Value, ctx: &mut Context<'_>) -> RuntimeResult<bool> {
  less(lhs, rhs, ctx).map(|b| !b).map_err(|_| RuntimeError::CompareFailed(">="))
}
