//! Mutable value arrays.

use crate::value::Value;
use std::cell::RefCell;
use std::rc::Rc;

/// An ordered, growable sequence of values.
#[derive(Clone)]
pub struct Arr(Rc<RefCell<Vec<Value>>>);

impl Arr {
    /// Create an empty array.
    #[must_use]
    pub fn new() -> Self {
        Arr(Rc::new(RefCell::new(Vec::new())))
    }

    /// Create an array of `len` undefined elements.
    #[must_use]
    pub fn with_len(len: usize) -> Self {
        Arr(Rc::new(RefCell::new(vec![Value::UNDEF; len])))
    }

    /// Create an array from existing values.
    #[must_use]
    pub fn from_vec(values: Vec<Value>) -> Self {
        Arr(Rc::new(RefCell::new(values)))
    }

    /// Handle identity.
    #[inline]
    #[must_use]
    pub fn ptr_eq(a: &Arr, b: &Arr) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    /// The element at `idx`, if in bounds.
    #[must_use]
    pub fn get(&self, idx: usize) -> Option<Value> {
        self.0.borrow().get(idx).cloned()
    }

    /// Replace the element at `idx`. Returns `None` when out of bounds.
    #[must_use]
    pub fn set(&self, idx: usize, val: Value) -> Option<()> {
        let mut values = self.0.borrow_mut();
        let slot = values.get_mut(idx)?;
        *slot = val;
        Some(())
    }

    /// Append an element.
    pub fn push(&self, val: Value) {
        self.0.borrow_mut().push(val);
    }
}

impl Default for Arr {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Arr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Arr(len={})", self.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_len_fills_undef() {
        let a = Arr::with_len(4);
        assert_eq!(a.len(), 4);
        for i in 0..4 {
            assert_eq!(a.get(i), Some(Value::UNDEF));
        }
    }

    #[test]
    fn test_get_set_push() {
        let a = Arr::with_len(2);
        assert_eq!(a.set(1, Value::Int64(9)), Some(()));
        assert_eq!(a.get(1), Some(Value::Int64(9)));
        assert_eq!(a.set(2, Value::Int64(1)), None);
        assert_eq!(a.get(2), None);

        a.push(Value::Int64(3));
        assert_eq!(a.len(), 3);
        assert_eq!(a.get(2), Some(Value::Int64(3)));
    }

    #[test]
    fn test_aliasing() {
        let a = Arr::new();
        let alias = a.clone();
        alias.push(Value::Int64(1));
        assert_eq!(a.len(), 1);
        assert!(Arr::ptr_eq(&a, &alias));
    }
}
