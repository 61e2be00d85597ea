//! Execution context threaded through every `ast::Stmt::execute` call: where
//! output goes, and how deep the call stack is allowed to get. Shaped after
//! the teacher's builder-chain diagnostics type (`hebi_diag::ReportBuilder`),
//! adapted to a single tunable knob instead of a multi-stage report builder.

use std::io::Write;

use crate::error::{RuntimeError, RuntimeResult};

/// Anything a program can print to. Implemented for everything that
/// implements `std::io::Write` so callers can hand in `Vec<u8>`, a
/// `std::io::Stdout` lock, or any other sink without writing an adapter.
pub trait Output: Write {}
impl<T: Write> Output for T {}

/// Default number of nested method calls allowed before execution gives up
/// and returns `RuntimeError::RecursionLimit` rather than overflowing the
/// native stack. Grounded on the teacher's `check-recursion-limit` feature.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 512;

pub struct Context<'out> {
  output: &'out mut dyn Output,
  call_depth: usize,
  max_call_depth: usize,
}

impl<'out> Context<'out> {
  pub fn new(output: &'out mut dyn Output) -> Self {
    Context {
      output,
      call_depth: 0,
      max_call_depth: DEFAULT_MAX_CALL_DEPTH,
    }
  }

  pub fn with_max_call_depth(mut self, max_call_depth: usize) -> Self {
    self.max_call_depth = max_call_depth;
    self
  }

  pub fn output(&mut self) -> &mut dyn Output {
    self.output
  }

  pub fn call_depth(&self) -> usize {
    self.call_depth
  }

  /// Enters a method call, returning a guard that decrements the depth
  /// counter on drop (including on an error unwind), so the budget never
  /// leaks no matter how the call below returns.
  pub(crate) fn enter_call(&mut self) -> RuntimeResult<CallGuard<'_, 'out>> {
    if self.call_depth >= self.max_call_depth {
      return Err(RuntimeError::RecursionLimit);
    }
    self.call_depth += 1;
    log::trace!("call depth now {}", self.call_depth);
    Ok(CallGuard { ctx: self })
  }
}

pub(crate) struct CallGuard<'a, 'out> {
  ctx: &'a mut Context<'out>,
}

impl<'a, 'out> CallGuard<'a, 'out> {
  pub fn ctx(&mut self) -> &mut Context<'out> {
    self.ctx
  }
}

impl Drop for CallGuard<'_, '_> {
  fn drop(&mut self) {
    self.ctx.call_depth -= 1;
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn call_depth_tracks_nesting() {
    let mut buf = Vec::new();
    let mut ctx = Context::new(&mut buf);
    assert_eq!(ctx.call_depth(), 0);
    {
      let mut guard = ctx.enter_call().unwrap();
      assert_eq!(guard.ctx().call_depth(), 1);
    }
    assert_eq!(ctx.call_depth(), 0);
  }

  #[test]
  fn call_depth_budget_is_enforced() {
    let mut buf = Vec::new();
    let mut ctx = Context::new(&mut buf).with_max_call_depth(1);
    let mut guard = ctx.enter_call().unwrap();
    assert!(guard.ctx().enter_call().is_err());
  }
}
