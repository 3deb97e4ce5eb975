//! Slot-indexed objects.
//!
//! An [`Obj`] stores its fields as insertion-ordered `(name, value)` slots.
//! The slot index of a field is stable for the object's lifetime: setting an
//! existing field overwrites its slot in place, new fields append. Lookups
//! report the slot they found the field in, and a caller holding a slot hint
//! gets a constant-time hit when the hinted slot still carries the name.
//! That contract is what the inline cache builds on.

use crate::string::Str;
use crate::value::Value;
use smallvec::SmallVec;
use std::cell::RefCell;
use std::rc::Rc;

/// Identity of an object, derived from its allocation.
///
/// Used as the key of the opcode memo cache and the block-version table.
/// Holders of an `ObjId` key must also keep the `Obj` alive so the address
/// cannot be recycled under them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjId(usize);

impl ObjId {
    /// The raw address, for diagnostics.
    #[inline]
    #[must_use]
    pub fn raw(self) -> usize {
        self.0
    }
}

type Slots = SmallVec<[(Str, Value); 8]>;

/// An object with slot-indexed field storage.
#[derive(Clone)]
pub struct Obj(Rc<RefCell<Slots>>);

impl Obj {
    /// Create an empty object.
    #[must_use]
    pub fn new() -> Self {
        Obj(Rc::new(RefCell::new(SmallVec::new())))
    }

    /// Create an empty object with room for at least `capacity` slots.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Obj(Rc::new(RefCell::new(SmallVec::with_capacity(capacity))))
    }

    /// Handle identity.
    #[inline]
    #[must_use]
    pub fn ptr_eq(a: &Obj, b: &Obj) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }

    /// Identity key for process-wide caches.
    #[inline]
    #[must_use]
    pub fn id(&self) -> ObjId {
        ObjId(Rc::as_ptr(&self.0) as usize)
    }

    /// Number of fields.
    #[must_use]
    pub fn num_fields(&self) -> usize {
        self.0.borrow().len()
    }

    /// Whether a field named `name` exists.
    #[must_use]
    pub fn has_field(&self, name: &[u8]) -> bool {
        self.0
            .borrow()
            .iter()
            .any(|(slot_name, _)| slot_name.as_bytes() == name)
    }

    /// Look up a field, trying `hint` before scanning.
    ///
    /// Returns the value and the slot index it was found in. The hint is
    /// only trusted after its name matches, so a stale hint degrades to the
    /// scan, never to a wrong answer.
    #[must_use]
    pub fn lookup(&self, name: &[u8], hint: usize) -> Option<(Value, usize)> {
        let slots = self.0.borrow();

        if let Some((slot_name, val)) = slots.get(hint) {
            if slot_name.as_bytes() == name {
                return Some((val.clone(), hint));
            }
        }

        slots
            .iter()
            .position(|(slot_name, _)| slot_name.as_bytes() == name)
            .map(|slot| (slots[slot].1.clone(), slot))
    }

    /// Look up a field by name.
    #[must_use]
    pub fn get_field(&self, name: &str) -> Option<Value> {
        self.lookup(name.as_bytes(), 0).map(|(val, _)| val)
    }

    /// Set a field, overwriting in place or appending a new slot.
    pub fn set_field(&self, name: &Str, val: Value) {
        let mut slots = self.0.borrow_mut();
        match slots
            .iter_mut()
            .find(|(slot_name, _)| slot_name == name)
        {
            Some((_, slot_val)) => *slot_val = val,
            None => slots.push((name.clone(), val)),
        }
    }

    /// Field name stored at `slot`, if any.
    #[must_use]
    pub fn field_name(&self, slot: usize) -> Option<Str> {
        self.0.borrow().get(slot).map(|(name, _)| name.clone())
    }
}

impl Default for Obj {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Obj {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Obj({} fields @{:#x})", self.num_fields(), self.id().raw())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obj_abc() -> Obj {
        let o = Obj::new();
        o.set_field(&Str::from("a"), Value::Int64(1));
        o.set_field(&Str::from("b"), Value::Int64(2));
        o.set_field(&Str::from("c"), Value::Int64(3));
        o
    }

    #[test]
    fn test_insertion_order_slots() {
        let o = obj_abc();
        assert_eq!(o.lookup(b"a", 0), Some((Value::Int64(1), 0)));
        assert_eq!(o.lookup(b"b", 0), Some((Value::Int64(2), 1)));
        assert_eq!(o.lookup(b"c", 0), Some((Value::Int64(3), 2)));
    }

    #[test]
    fn test_overwrite_keeps_slot() {
        let o = obj_abc();
        o.set_field(&Str::from("b"), Value::Int64(20));
        assert_eq!(o.lookup(b"b", 0), Some((Value::Int64(20), 1)));
        assert_eq!(o.num_fields(), 3);
    }

    #[test]
    fn test_hint_hit_and_stale_hint() {
        let o = obj_abc();
        // Correct hint returns in place.
        assert_eq!(o.lookup(b"c", 2), Some((Value::Int64(3), 2)));
        // A wrong hint still finds the field by scanning.
        assert_eq!(o.lookup(b"c", 0), Some((Value::Int64(3), 2)));
        // A hint past the slot count is ignored.
        assert_eq!(o.lookup(b"a", 99), Some((Value::Int64(1), 0)));
    }

    #[test]
    fn test_missing_field() {
        let o = obj_abc();
        assert!(o.lookup(b"missing", 0).is_none());
        assert!(!o.has_field(b"missing"));
        assert!(o.has_field(b"a"));
    }

    #[test]
    fn test_identity() {
        let o = obj_abc();
        let alias = o.clone();
        assert!(Obj::ptr_eq(&o, &alias));
        assert_eq!(o.id(), alias.id());
        assert!(!Obj::ptr_eq(&o, &obj_abc()));
    }

    #[test]
    fn test_with_capacity() {
        let o = Obj::with_capacity(32);
        assert_eq!(o.num_fields(), 0);
        o.set_field(&Str::from("x"), Value::UNDEF);
        assert_eq!(o.num_fields(), 1);
    }

    #[test]
    fn test_field_name() {
        let o = obj_abc();
        assert_eq!(o.field_name(1), Some(Str::from("b")));
        assert_eq!(o.field_name(3), None);
    }
}
