//! Host-provided functions.
//!
//! A [`HostFn`] is a callable supplied by the embedder. The parameter count
//! is 0–3 and each arity has its own entry point; encoding the entries as an
//! enum of `fn` pointers makes larger arities unrepresentable.

use crate::error::{RunError, RunResult};
use crate::value::Value;

/// Arity-specialized entry points.
#[derive(Clone, Copy)]
pub enum HostFnEntry {
    Fn0(fn() -> Value),
    Fn1(fn(Value) -> Value),
    Fn2(fn(Value, Value) -> Value),
    Fn3(fn(Value, Value, Value) -> Value),
}

/// A named host callable.
pub struct HostFn {
    name: &'static str,
    entry: HostFnEntry,
}

impl HostFn {
    #[must_use]
    pub fn new(name: &'static str, entry: HostFnEntry) -> Self {
        Self { name, entry }
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Declared parameter count, derived from the entry point.
    #[inline]
    #[must_use]
    pub fn num_params(&self) -> usize {
        match self.entry {
            HostFnEntry::Fn0(_) => 0,
            HostFnEntry::Fn1(_) => 1,
            HostFnEntry::Fn2(_) => 2,
            HostFnEntry::Fn3(_) => 3,
        }
    }

    /// Invoke through the entry point matching the argument count.
    ///
    /// The call protocol validates arity before dispatching, so a mismatch
    /// here is reported on the same error channel rather than panicking.
    pub fn invoke(&self, args: &[Value]) -> RunResult<Value> {
        match (self.entry, args) {
            (HostFnEntry::Fn0(f), []) => Ok(f()),
            (HostFnEntry::Fn1(f), [a]) => Ok(f(a.clone())),
            (HostFnEntry::Fn2(f), [a, b]) => Ok(f(a.clone(), b.clone())),
            (HostFnEntry::Fn3(f), [a, b, c]) => Ok(f(a.clone(), b.clone(), c.clone())),
            _ => Err(RunError::ArityMismatch {
                got: args.len(),
                want: self.num_params(),
                src_pos: None,
            }),
        }
    }
}

impl std::fmt::Debug for HostFn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HostFn({}/{})", self.name, self.num_params())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answer() -> Value {
        Value::Int64(42)
    }

    fn double(v: Value) -> Value {
        match v {
            Value::Int64(i) => Value::Int64(i * 2),
            other => other,
        }
    }

    fn add(a: Value, b: Value) -> Value {
        match (a, b) {
            (Value::Int64(x), Value::Int64(y)) => Value::Int64(x + y),
            _ => Value::UNDEF,
        }
    }

    fn pick(sel: Value, a: Value, b: Value) -> Value {
        if sel == Value::TRUE { a } else { b }
    }

    #[test]
    fn test_num_params() {
        assert_eq!(HostFn::new("answer", HostFnEntry::Fn0(answer)).num_params(), 0);
        assert_eq!(HostFn::new("double", HostFnEntry::Fn1(double)).num_params(), 1);
        assert_eq!(HostFn::new("add", HostFnEntry::Fn2(add)).num_params(), 2);
        assert_eq!(HostFn::new("pick", HostFnEntry::Fn3(pick)).num_params(), 3);
    }

    #[test]
    fn test_invoke_each_arity() {
        let f0 = HostFn::new("answer", HostFnEntry::Fn0(answer));
        assert_eq!(f0.invoke(&[]).unwrap(), Value::Int64(42));

        let f1 = HostFn::new("double", HostFnEntry::Fn1(double));
        assert_eq!(f1.invoke(&[Value::Int64(21)]).unwrap(), Value::Int64(42));

        let f2 = HostFn::new("add", HostFnEntry::Fn2(add));
        assert_eq!(
            f2.invoke(&[Value::Int64(40), Value::Int64(2)]).unwrap(),
            Value::Int64(42)
        );

        let f3 = HostFn::new("pick", HostFnEntry::Fn3(pick));
        assert_eq!(
            f3.invoke(&[Value::TRUE, Value::Int64(1), Value::Int64(2)]).unwrap(),
            Value::Int64(1)
        );
    }

    #[test]
    fn test_invoke_arity_mismatch() {
        let f1 = HostFn::new("double", HostFnEntry::Fn1(double));
        let err = f1.invoke(&[]).unwrap_err();
        assert!(matches!(err, RunError::ArityMismatch { got: 0, want: 1, .. }));
    }
}
