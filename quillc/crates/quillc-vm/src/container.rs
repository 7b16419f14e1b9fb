//! List and map payloads for boxed container values, plus the value
//! equality/hashing used by both the `equal` opcode and map key lookup.
//!
//! Map hashing deliberately mixes two different notions (see `SPEC_FULL.md`
//! §4.D and the Design Notes' open question on this): numeric keys hash and
//! compare by value (so `1` and `1.0` collide), but other boxed non-string
//! keys hash by heap identity, not structural content. This is preserved
//! as-is, not "fixed" - it's load-bearing for map performance and is
//! documented, not silently changed.

use crate::heap::{Heap, HeapRef};
use crate::value::Value;

/// Compares two values using the VM's `equal` semantics: different variants
/// are unequal except int/float (compared numerically) and any combination
/// of short/const/boxed strings (compared by codepoint sequence).
pub fn value_eq(a: &Value, b: &Value, heap: &Heap) -> bool {
    use Value::*;
    match (a, b) {
        (Int(x), Int(y)) => x == y,
        (Float(x), Float(y)) => x == y,
        (Int(x), Float(y)) | (Float(y), Int(x)) => *x as f64 == *y,
        (Bool(x), Bool(y)) => x == y,
        (None, None) => true,
        (Invalid, Invalid) => true,
        (CFuncRef(x), CFuncRef(y)) => x == y,
        _ => match (string_codepoints(a, heap), string_codepoints(b, heap)) {
            (Some(x), Some(y)) => x == y,
            _ => match (a, b) {
                (Boxed(x), Boxed(y)) => x == y,
                _ => false,
            },
        },
    }
}

/// Returns the codepoint sequence of `v` if it is any of the three string
/// variants, else `None`.
pub(crate) fn string_codepoints<'h>(v: &'h Value, heap: &'h Heap) -> Option<std::borrow::Cow<'h, [u32]>> {
    match v {
        Value::ShortStr(s) => Some(std::borrow::Cow::Borrowed(s.codepoints())),
        Value::ConstStr(s) => Some(std::borrow::Cow::Borrowed(s.codepoints())),
        Value::Boxed(r) => heap
            .get_string(*r)
            .map(|s| std::borrow::Cow::Owned(s.codepoints().to_vec())),
        _ => None,
    }
}

/// Hashes a value for map-key purposes. Ints and floats that compare equal
/// (`1` and `1.0`) MUST hash equal; strings hash by codepoint content;
/// every other boxed value hashes by heap identity (its `HeapRef`), which
/// means structurally-equal lists or maps used as keys will NOT collide
/// with each other. That asymmetry is intentional (see module docs).
pub fn value_hash(v: &Value, heap: &Heap) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = rustc_hash::FxHasher::default();
    match v {
        Value::Int(x) => (*x as f64).to_bits().hash(&mut hasher),
        Value::Float(x) => x.to_bits().hash(&mut hasher),
        Value::Bool(b) => b.hash(&mut hasher),
        Value::None => 0u8.hash(&mut hasher),
        Value::Invalid => 1u8.hash(&mut hasher),
        Value::CFuncRef(idx) => idx.hash(&mut hasher),
        _ => match string_codepoints(v, heap) {
            Some(cps) => cps.hash(&mut hasher),
            None => match v {
                Value::Boxed(r) => r.hash(&mut hasher),
                _ => 0u8.hash(&mut hasher),
            },
        },
    }
    hasher.finish()
}

/// A growable, 1-based-externally-indexed list of values.
#[derive(Debug, Default)]
pub struct ValueList {
    items: Vec<Value>,
}

impl ValueList {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn push(&mut self, value: Value) {
        self.items.push(value);
    }

    /// Gets the element at 1-based index `i`, or `None` if `i < 1` or
    /// `i > len`.
    pub fn get(&self, i: i64) -> Option<&Value> {
        if i < 1 || i as usize > self.items.len() {
            return None;
        }
        self.items.get(i as usize - 1)
    }

    pub fn set(&mut self, i: i64, value: Value) -> Option<Value> {
        if i < 1 || i as usize > self.items.len() {
            return None;
        }
        let slot = &mut self.items[i as usize - 1];
        Some(std::mem::replace(slot, value))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.items.iter()
    }
}

enum Slot {
    Empty,
    Occupied { key: Value, value: Value, hash: u64 },
    Tombstone,
}

/// Open-addressed hash table from value to value, keyed with
/// [`value_eq`]/[`value_hash`]. Grows (doubling capacity, rehashing live
/// entries) once the load factor exceeds 3/4.
pub struct ValueMap {
    slots: Vec<Slot>,
    len: usize,
}

impl Default for ValueMap {
    fn default() -> Self {
        Self::new()
    }
}

impl ValueMap {
    const INITIAL_CAPACITY: usize = 8;
    const MAX_LOAD_NUM: usize = 3;
    const MAX_LOAD_DEN: usize = 4;

    pub fn new() -> Self {
        Self {
            slots: (0..Self::INITIAL_CAPACITY).map(|_| Slot::Empty).collect(),
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn probe(&self, hash: u64, key: &Value, heap: &Heap) -> usize {
        let mask = self.slots.len() - 1;
        let mut idx = hash as usize & mask;
        loop {
            match &self.slots[idx] {
                Slot::Empty => return idx,
                Slot::Occupied { key: k, hash: h, .. } if *h == hash && value_eq(k, key, heap) => {
                    return idx
                }
                _ => idx = (idx + 1) & mask,
            }
        }
    }

    /// Inserts `key -> value`, returning the previous value if `key` was
    /// already present (overwriting it, matching a conventional map
    /// `insert`; the boxed-value identity the previous entry held is the
    /// caller's responsibility to release).
    pub fn insert(&mut self, key: Value, value: Value, heap: &Heap) -> Option<Value> {
        if (self.len + 1) * Self::MAX_LOAD_DEN > self.slots.len() * Self::MAX_LOAD_NUM {
            self.grow(heap);
        }
        let hash = value_hash(&key, heap);
        let idx = self.probe(hash, &key, heap);
        match std::mem::replace(&mut self.slots[idx], Slot::Empty) {
            Slot::Occupied { value: old, .. } => {
                self.slots[idx] = Slot::Occupied { key, value, hash };
                Some(old)
            }
            _ => {
                self.slots[idx] = Slot::Occupied { key, value, hash };
                self.len += 1;
                None
            }
        }
    }

    pub fn get(&self, key: &Value, heap: &Heap) -> Option<&Value> {
        let hash = value_hash(key, heap);
        let mask = self.slots.len() - 1;
        let mut idx = hash as usize & mask;
        loop {
            match &self.slots[idx] {
                Slot::Empty => return None,
                Slot::Occupied { key: k, hash: h, value } if *h == hash && value_eq(k, key, heap) => {
                    return Some(value)
                }
                _ => idx = (idx + 1) & mask,
            }
        }
    }

    pub fn remove(&mut self, key: &Value, heap: &Heap) -> Option<(Value, Value)> {
        let hash = value_hash(key, heap);
        let mask = self.slots.len() - 1;
        let mut idx = hash as usize & mask;
        loop {
            match &self.slots[idx] {
                Slot::Empty => return None,
                Slot::Occupied { key: k, hash: h, .. } if *h == hash && value_eq(k, key, heap) => {
                    let removed = std::mem::replace(&mut self.slots[idx], Slot::Tombstone);
                    self.len -= 1;
                    if let Slot::Occupied { key, value, .. } = removed {
                        return Some((key, value));
                    }
                    unreachable!()
                }
                _ => idx = (idx + 1) & mask,
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Value, &Value)> {
        self.slots.iter().filter_map(|s| match s {
            Slot::Occupied { key, value, .. } => Some((key, value)),
            _ => None,
        })
    }

    fn grow(&mut self, heap: &Heap) {
        let new_cap = (self.slots.len() * 2).max(Self::INITIAL_CAPACITY);
        let old = std::mem::replace(
            &mut self.slots,
            (0..new_cap).map(|_| Slot::Empty).collect(),
        );
        self.len = 0;
        for slot in old {
            if let Slot::Occupied { key, value, .. } = slot {
                self.insert(key, value, heap);
            }
        }
    }
}

/// Cheap marker kept on a [`ValueList`]/[`ValueMap`] caller's behalf when it
/// needs a stable identity independent of structural content (used by
/// `value_hash` for boxed non-string keys).
pub type Identity = HeapRef;
