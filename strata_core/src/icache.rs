//! Inline caches for repeated field lookups.
//!
//! An [`ICache`] memoizes the slot index a field name was last found in on
//! some object. When the hinted slot still carries the name the lookup is
//! O(1); otherwise the object is rescanned and the hint overwritten. The
//! hint is never trusted without a confirming name match, so a cache can be
//! shared across objects with different layouts and only lose speed.
//!
//! Each cache is owned by the call site that uses it (a field of the
//! interpreter or engine struct), never a process-wide global.

use crate::array::Arr;
use crate::error::{RunError, RunResult};
use crate::object::Obj;
use crate::string::Str;
use crate::value::Value;
use std::cell::Cell;

/// A per-call-site field lookup cache.
pub struct ICache {
    /// Field name to look up.
    field: &'static str,
    /// Slot index of the last hit.
    slot: Cell<usize>,
}

impl ICache {
    #[must_use]
    pub fn new(field: &'static str) -> Self {
        Self {
            field,
            slot: Cell::new(0),
        }
    }

    /// The field name this cache looks up.
    #[must_use]
    pub fn field(&self) -> &'static str {
        self.field
    }

    /// Look the field up on `obj`, updating the slot hint.
    pub fn get_field(&self, obj: &Obj) -> RunResult<Value> {
        match obj.lookup(self.field.as_bytes(), self.slot.get()) {
            Some((val, slot)) => {
                self.slot.set(slot);
                Ok(val)
            }
            None => Err(RunError::missing_field(self.field)),
        }
    }

    /// Look up an `Int64` field.
    pub fn get_int64(&self, obj: &Obj) -> RunResult<i64> {
        match self.get_field(obj)? {
            Value::Int64(i) => Ok(i),
            other => Err(RunError::type_mismatch("int64", other.tag().name())),
        }
    }

    /// Look up a string field.
    pub fn get_str(&self, obj: &Obj) -> RunResult<Str> {
        match self.get_field(obj)? {
            Value::Str(s) => Ok(s),
            other => Err(RunError::type_mismatch("string", other.tag().name())),
        }
    }

    /// Look up an object field.
    pub fn get_obj(&self, obj: &Obj) -> RunResult<Obj> {
        match self.get_field(obj)? {
            Value::Object(o) => Ok(o),
            other => Err(RunError::type_mismatch("object", other.tag().name())),
        }
    }

    /// Look up an array field.
    pub fn get_arr(&self, obj: &Obj) -> RunResult<Arr> {
        match self.get_field(obj)? {
            Value::Array(a) => Ok(a),
            other => Err(RunError::type_mismatch("array", other.tag().name())),
        }
    }
}

impl std::fmt::Debug for ICache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ICache({:?} @slot {})", self.field, self.slot.get())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obj_with(fields: &[(&str, i64)]) -> Obj {
        let o = Obj::new();
        for (name, val) in fields {
            o.set_field(&Str::from(*name), Value::Int64(*val));
        }
        o
    }

    #[test]
    fn test_hit_remembers_slot() {
        let ic = ICache::new("op");
        let o = obj_with(&[("idx", 0), ("op", 1)]);
        assert_eq!(ic.get_field(&o).unwrap(), Value::Int64(1));
        assert_eq!(ic.slot.get(), 1);
        // Second access hits the hinted slot directly.
        assert_eq!(ic.get_field(&o).unwrap(), Value::Int64(1));
    }

    #[test]
    fn test_hint_mismatch_falls_back_to_scan() {
        let ic = ICache::new("op");
        let a = obj_with(&[("idx", 0), ("op", 1)]);
        let b = obj_with(&[("op", 9)]);
        assert_eq!(ic.get_field(&a).unwrap(), Value::Int64(1));
        // b stores "op" at slot 0; the stale hint (1) must not mislead.
        assert_eq!(ic.get_field(&b).unwrap(), Value::Int64(9));
        assert_eq!(ic.slot.get(), 0);
    }

    #[test]
    fn test_cached_lookup_agrees_with_fresh_scan() {
        let ic = ICache::new("x");
        let o = obj_with(&[("a", 1), ("x", 2), ("b", 3)]);
        let cached = ic.get_field(&o).unwrap();
        let fresh = o.get_field("x").unwrap();
        assert_eq!(cached, fresh);
    }

    #[test]
    fn test_missing_field() {
        let ic = ICache::new("absent");
        let o = obj_with(&[("present", 1)]);
        assert_eq!(
            ic.get_field(&o).unwrap_err(),
            RunError::missing_field("absent")
        );
    }

    #[test]
    fn test_typed_accessors() {
        let ic = ICache::new("v");
        let o = Obj::new();
        o.set_field(&Str::from("v"), Value::Int64(7));
        assert_eq!(ic.get_int64(&o).unwrap(), 7);
        assert!(matches!(
            ic.get_str(&o).unwrap_err(),
            RunError::TypeMismatch {
                expected: "string",
                found: "int64"
            }
        ));

        o.set_field(&Str::from("v"), Value::from("s"));
        assert_eq!(ic.get_str(&o).unwrap(), Str::from("s"));
        assert!(ic.get_arr(&o).is_err());
        assert!(ic.get_obj(&o).is_err());
    }
}
