//! End-to-end scenarios run against hand-built trees (there is no parser in
//! scope, so these stand in for source-level integration tests): class
//! definition, field assignment, `__str__` dispatch, one-level-only
//! inheritance, self-recursion, and the call-depth budget.

use std::rc::Rc;

use scriptlang::ast::{
  Assignment, BinOp, Comparator, Comparison, Compound, FieldAssignment, IfElse, MethodCall, NewInstance, Print,
  Return, Stmt, Stringify, VariableValue,
};
use scriptlang::value::{ClassDef, Method, Scope, Value, INIT_METHOD, STR_METHOD};
use scriptlang::{ast, Context};

fn var(name: &str) -> Stmt {
  Stmt::VariableValue(VariableValue::new(vec![name.to_string()]))
}

fn field(object: &str, field: &str) -> VariableValue {
  VariableValue::new(vec![object.to_string(), field.to_string()])
}

#[test]
fn class_instance_is_stringified_via_dunder_str() {
  let init_body = Stmt::Compound(Compound::new(vec![
    Stmt::FieldAssignment(FieldAssignment::new(
      VariableValue::new(vec!["self".to_string()]),
      "x",
      var("x"),
    )),
    Stmt::FieldAssignment(FieldAssignment::new(
      VariableValue::new(vec!["self".to_string()]),
      "y",
      var("y"),
    )),
  ]));
  let str_body = Stmt::Return(Return::new(Stmt::Add(BinOp::new(
    Stmt::Add(BinOp::new(
      Stmt::Stringify(Stringify::new(Stmt::VariableValue(field("self", "x")))),
      Stmt::Literal(Value::string(",")),
    )),
    Stmt::Stringify(Stringify::new(Stmt::VariableValue(field("self", "y")))),
  ))));

  let init = Method::new(
    INIT_METHOD,
    vec!["x".to_string(), "y".to_string()],
    Rc::new(ast::MethodBody::new(init_body)),
  );
  let to_str = Method::new(STR_METHOD, vec![], Rc::new(ast::MethodBody::new(str_body)));
  let class = Rc::new(ClassDef::new("Point", vec![init, to_str], None));

  let program = Stmt::Compound(Compound::new(vec![
    Stmt::Assignment(Assignment::new(
      "p",
      Stmt::NewInstance(NewInstance::new(
        class,
        vec![Stmt::Literal(Value::number(3)), Stmt::Literal(Value::number(4))],
      )),
    )),
    Stmt::Print(Print::new(vec![var("p")])),
  ]));

  let mut buf = Vec::new();
  let mut ctx = Context::new(&mut buf);
  let mut scope = Scope::new();
  ast::execute(&program, &mut scope, &mut ctx).unwrap();
  assert_eq!(buf, b"3,4\n");
}

#[test]
fn inheritance_resolves_one_level_up_but_no_further() {
  let greet_body = Stmt::Return(Return::new(Stmt::Literal(Value::string("hi"))));
  let greet = Method::new("greet", vec![], Rc::new(ast::MethodBody::new(greet_body)));
  let parent = Rc::new(ClassDef::new("Parent", vec![greet], None));
  let child = Rc::new(ClassDef::new("Child", vec![], Some(parent)));
  let grandchild = Rc::new(ClassDef::new("Grandchild", vec![], Some(child.clone())));

  let call_greet = |class: Rc<ClassDef>| -> Result<Value, scriptlang::RuntimeError> {
    let program = Stmt::Compound(Compound::new(vec![
      Stmt::Assignment(Assignment::new("obj", Stmt::NewInstance(NewInstance::new(class, vec![])))),
      Stmt::MethodCall(MethodCall::new(var("obj"), "greet", vec![])),
    ]));
    let mut buf = Vec::new();
    let mut ctx = Context::new(&mut buf);
    let mut scope = Scope::new();
    ast::execute(&program, &mut scope, &mut ctx)
  };

  assert_eq!(call_greet(child).unwrap().as_string(), Some("hi"));
  assert!(matches!(
    call_greet(grandchild).unwrap_err(),
    scriptlang::RuntimeError::NoSuchMethod { .. }
  ));
}

#[test]
fn self_recursive_method_computes_factorial() {
  let n_le_1 = Stmt::Comparison(Comparison::new(Comparator::LessOrEqual, var("n"), Stmt::Literal(Value::number(1))));
  let recurse = Stmt::MethodCall(MethodCall::new(
    var("self"),
    "factorial",
    vec![Stmt::Sub(BinOp::new(var("n"), Stmt::Literal(Value::number(1))))],
  ));
  let body = Stmt::Compound(Compound::new(vec![
    Stmt::IfElse(IfElse::new(n_le_1, Stmt::Return(Return::new(Stmt::Literal(Value::number(1)))), None)),
    Stmt::Return(Return::new(Stmt::Mult(BinOp::new(var("n"), recurse)))),
  ]));
  let factorial = Method::new("factorial", vec!["n".to_string()], Rc::new(ast::MethodBody::new(body)));
  let class = Rc::new(ClassDef::new("Calc", vec![factorial], None));

  let program = Stmt::Compound(Compound::new(vec![
    Stmt::Assignment(Assignment::new("calc", Stmt::NewInstance(NewInstance::new(class, vec![])))),
    Stmt::Assignment(Assignment::new(
      "result",
      Stmt::MethodCall(MethodCall::new(var("calc"), "factorial", vec![Stmt::Literal(Value::number(10))])),
    )),
  ]));

  let mut buf = Vec::new();
  let mut ctx = Context::new(&mut buf);
  let mut scope = Scope::new();
  ast::execute(&program, &mut scope, &mut ctx).unwrap();
  assert_eq!(scope.get("result").unwrap().as_number(), Some(3_628_800));
}

#[test]
fn unbounded_recursion_hits_the_call_depth_budget() {
  let body = Stmt::Return(Return::new(Stmt::MethodCall(MethodCall::new(var("self"), "spin", vec![]))));
  let spin = Method::new("spin", vec![], Rc::new(ast::MethodBody::new(body)));
  let class = Rc::new(ClassDef::new("Looper", vec![spin], None));

  let program = Stmt::Compound(Compound::new(vec![
    Stmt::Assignment(Assignment::new("l", Stmt::NewInstance(NewInstance::new(class, vec![])))),
    Stmt::MethodCall(MethodCall::new(var("l"), "spin", vec![])),
  ]));

  let mut buf = Vec::new();
  let mut ctx = Context::new(&mut buf).with_max_call_depth(8);
  let mut scope = Scope::new();
  let err = ast::execute(&program, &mut scope, &mut ctx).unwrap_err();
  assert_eq!(err, scriptlang::RuntimeError::RecursionLimit);
}
