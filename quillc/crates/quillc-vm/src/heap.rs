//! Size-class pool allocator and the boxed heap objects it hands out.
//!
//! Every boxed value (string, list, map) lives in one slot of one of a
//! handful of fixed size classes. A size class is a `Vec<Option<Slot>>`
//! plus a free list of indices into it; when the free list is empty the
//! slab for that class doubles. This gives O(1) alloc/free without a
//! tracing collector: liveness is tracked purely by the internal/external
//! refcount pair on [`HeapObject`], and an object is only ever freed when
//! both hit zero.

use std::cell::Cell;

use crate::config::VmConfig;
use crate::container::{ValueList, ValueMap};
use crate::error::RaisedError;

/// A handle to a boxed heap object. Stable for the object's lifetime;
/// reused (via the free list) only after the object it named has been
/// fully released, so a stale `HeapRef` kept past that point is a logic
/// bug in the caller, not something the heap can detect on its own.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HeapRef {
    class: SizeClass,
    slot: u32,
    /// Incremented every time `slot` is reused, so a `HeapRef` captured
    /// before a free and compared after a reuse never silently aliases.
    generation: u32,
}

/// Which free list and slab an object's shell was allocated from. Strings
/// carry their codepoints inline in the object payload up to a small cap
/// and spill to a heap-allocated buffer above it; lists and maps are
/// classed by their own payload kind since their growth is unbounded
/// regardless of slot size.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum SizeClass {
    Str,
    List,
    Map,
}

const SIZE_CLASSES: [SizeClass; 3] = [SizeClass::Str, SizeClass::List, SizeClass::Map];

/// The owned payload of a boxed heap object.
pub enum ObjectPayload {
    Str(StringObj),
    List(ValueList),
    Map(ValueMap),
}

/// A boxed string's codepoint buffer, with a lazily computed and cached
/// letter length (grapheme count). Strings are immutable after
/// construction, so the cache never needs invalidating.
pub struct StringObj {
    codepoints: Box<[u32]>,
    letter_len: Cell<Option<usize>>,
}

impl StringObj {
    pub fn new(codepoints: Vec<u32>) -> Self {
        Self {
            codepoints: codepoints.into_boxed_slice(),
            letter_len: Cell::new(None),
        }
    }

    pub fn codepoints(&self) -> &[u32] {
        &self.codepoints
    }

    pub fn len(&self) -> usize {
        self.codepoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codepoints.is_empty()
    }

    /// Grapheme-cluster length, computed once and cached on first demand.
    pub fn letter_len(&self) -> usize {
        if let Some(cached) = self.letter_len.get() {
            return cached;
        }
        let computed = crate::codec::letter_len(&self.codepoints);
        self.letter_len.set(Some(computed));
        computed
    }
}

/// A boxed heap object: a type tag (implicit in [`ObjectPayload`]) and an
/// external refcount (references held by stack slots / globals), plus the
/// payload.
///
/// This slice does not track a separate internal refcount for references
/// held by other heap objects (a list or map holding a `Boxed` element
/// does not take its own ref on that element; the element's external
/// refcount stays owned by whoever put it in the container). That means a
/// container cycle (a list containing a reference back to itself,
/// directly or through other containers) leaks rather than being
/// collected - there is no tracing collector here to find it. Acceptable
/// for this slice since nothing in the instruction set constructs such a
/// cycle; see DESIGN.md.
pub struct HeapObject {
    payload: ObjectPayload,
    external_rc: usize,
}

impl HeapObject {
    fn new(payload: ObjectPayload) -> Self {
        Self {
            payload,
            external_rc: 1,
        }
    }

    pub fn payload(&self) -> &ObjectPayload {
        &self.payload
    }

    pub fn payload_mut(&mut self) -> &mut ObjectPayload {
        &mut self.payload
    }

    pub fn external_rc(&self) -> usize {
        self.external_rc
    }
}

enum Slot {
    Free { next_free: Option<u32> },
    Occupied { object: HeapObject, generation: u32 },
}

struct SizeClassPool {
    slots: Vec<Slot>,
    free_head: Option<u32>,
    next_generation: u32,
    slab_grow_to: usize,
}

impl SizeClassPool {
    fn new(initial_objects: usize) -> Self {
        Self {
            slots: Vec::new(),
            free_head: None,
            next_generation: 0,
            slab_grow_to: initial_objects.max(1),
        }
    }

    fn grow(&mut self, max_objects: Option<usize>) -> Result<(), RaisedError> {
        let old_len = self.slots.len();
        let mut new_len = self.slab_grow_to.max(old_len + 1);
        if let Some(max) = max_objects {
            if old_len >= max {
                return Err(RaisedError::out_of_memory());
            }
            new_len = new_len.min(max);
        }
        for i in old_len..new_len {
            let next_free = if i + 1 < new_len { Some(i as u32 + 1) } else { self.free_head };
            self.slots.push(Slot::Free { next_free });
        }
        self.free_head = Some(old_len as u32);
        self.slab_grow_to = new_len.saturating_mul(2).max(new_len + 1);
        Ok(())
    }

    fn alloc(&mut self, payload: ObjectPayload, max_objects: Option<usize>) -> Result<(u32, u32), RaisedError> {
        if self.free_head.is_none() {
            self.grow(max_objects)?;
        }
        let idx = self.free_head.expect("grow() must populate free_head on success");
        let next_free = match &self.slots[idx as usize] {
            Slot::Free { next_free } => *next_free,
            Slot::Occupied { .. } => unreachable!("free list points at an occupied slot"),
        };
        self.free_head = next_free;
        let generation = self.next_generation;
        self.next_generation = self.next_generation.wrapping_add(1);
        self.slots[idx as usize] = Slot::Occupied {
            object: HeapObject::new(payload),
            generation,
        };
        Ok((idx, generation))
    }

    fn get(&self, slot: u32, generation: u32) -> Option<&HeapObject> {
        match self.slots.get(slot as usize)? {
            Slot::Occupied { object, generation: g } if *g == generation => Some(object),
            _ => None,
        }
    }

    fn get_mut(&mut self, slot: u32, generation: u32) -> Option<&mut HeapObject> {
        match self.slots.get_mut(slot as usize)? {
            Slot::Occupied { object, generation: g } if *g == generation => Some(object),
            _ => None,
        }
    }

    fn free(&mut self, slot: u32, generation: u32) {
        if let Some(Slot::Occupied { generation: g, .. }) = self.slots.get(slot as usize) {
            if *g != generation {
                return;
            }
        } else {
            return;
        }
        self.slots[slot as usize] = Slot::Free { next_free: self.free_head };
        self.free_head = Some(slot);
    }
}

/// The size-class pool allocator backing all boxed values for one VM
/// thread. Per §5, pools are thread-local; a multi-threaded embedder must
/// give each thread its own `Heap`.
pub struct Heap {
    pools: [SizeClassPool; SIZE_CLASSES.len()],
    max_objects_per_class: Option<usize>,
}

impl Heap {
    pub fn new(config: &VmConfig) -> Self {
        Self {
            pools: [
                SizeClassPool::new(config.pool_slab_initial_objects),
                SizeClassPool::new(config.pool_slab_initial_objects),
                SizeClassPool::new(config.pool_slab_initial_objects),
            ],
            max_objects_per_class: config.pool_max_objects,
        }
    }

    fn pool_mut(&mut self, class: SizeClass) -> &mut SizeClassPool {
        &mut self.pools[SIZE_CLASSES.iter().position(|c| *c == class).unwrap()]
    }

    fn pool(&self, class: SizeClass) -> &SizeClassPool {
        &self.pools[SIZE_CLASSES.iter().position(|c| *c == class).unwrap()]
    }

    fn alloc(&mut self, class: SizeClass, payload: ObjectPayload) -> Result<HeapRef, RaisedError> {
        let max = self.max_objects_per_class;
        let (slot, generation) = self.pool_mut(class).alloc(payload, max)?;
        Ok(HeapRef { class, slot, generation })
    }

    pub fn alloc_string(&mut self, codepoints: Vec<u32>) -> Result<HeapRef, RaisedError> {
        self.alloc(SizeClass::Str, ObjectPayload::Str(StringObj::new(codepoints)))
    }

    pub fn alloc_list(&mut self) -> Result<HeapRef, RaisedError> {
        self.alloc(SizeClass::List, ObjectPayload::List(ValueList::new()))
    }

    pub fn alloc_map(&mut self) -> Result<HeapRef, RaisedError> {
        self.alloc(SizeClass::Map, ObjectPayload::Map(ValueMap::new()))
    }

    pub fn get(&self, r: HeapRef) -> Option<&HeapObject> {
        self.pool(r.class).get(r.slot, r.generation)
    }

    pub fn get_mut(&mut self, r: HeapRef) -> Option<&mut HeapObject> {
        self.pool_mut(r.class).get_mut(r.slot, r.generation)
    }

    pub fn get_string(&self, r: HeapRef) -> Option<&StringObj> {
        match self.get(r)?.payload() {
            ObjectPayload::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn get_list(&self, r: HeapRef) -> Option<&ValueList> {
        match self.get(r)?.payload() {
            ObjectPayload::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn get_list_mut(&mut self, r: HeapRef) -> Option<&mut ValueList> {
        match self.get_mut(r)?.payload_mut() {
            ObjectPayload::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn get_map(&self, r: HeapRef) -> Option<&ValueMap> {
        match self.get(r)?.payload() {
            ObjectPayload::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn get_map_mut(&mut self, r: HeapRef) -> Option<&mut ValueMap> {
        match self.get_mut(r)?.payload_mut() {
            ObjectPayload::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Runs `f` against the map at `r` with read access to the rest of the
    /// heap at the same time.
    ///
    /// A map's `insert`/`remove` need to hash and compare keys, which may
    /// themselves be boxed strings living elsewhere on this same heap -
    /// there's no way to hold `&mut ValueMap` (borrowed out of this heap)
    /// and `&Heap` simultaneously through ordinary field borrows, since the
    /// map IS part of the heap's storage. This sidesteps it by temporarily
    /// taking the map out of its slot (leaving an empty placeholder),
    /// running `f` against the now-detached map plus a plain `&Heap`, then
    /// putting the (mutated) map back.
    pub fn with_map_mut<R>(&mut self, r: HeapRef, f: impl FnOnce(&mut ValueMap, &Heap) -> R) -> Option<R> {
        let mut map = std::mem::take(self.get_map_mut(r)?);
        let result = f(&mut map, self);
        if let Some(slot) = self.get_map_mut(r) {
            *slot = map;
        }
        Some(result)
    }

    pub fn add_external_ref(&mut self, r: HeapRef) {
        if let Some(obj) = self.get_mut(r) {
            obj.external_rc += 1;
        }
    }

    /// Decrements `r`'s external refcount; if it is now zero, frees the
    /// object and returns its pool slot to the free list.
    pub fn release_external_ref(&mut self, r: HeapRef) {
        let should_free = if let Some(obj) = self.get_mut(r) {
            obj.external_rc = obj.external_rc.saturating_sub(1);
            obj.external_rc == 0
        } else {
            false
        };
        if should_free {
            self.pool_mut(r.class).free(r.slot, r.generation);
        }
    }

    /// Total live external refcount across every boxed object in this
    /// heap, summed for leak-detection assertions in tests (see property
    /// 1, refcount balance at program termination).
    pub fn total_external_refcount(&self) -> usize {
        self.pools
            .iter()
            .flat_map(|p| p.slots.iter())
            .map(|s| match s {
                Slot::Occupied { object, .. } => object.external_rc,
                Slot::Free { .. } => 0,
            })
            .sum()
    }

    pub fn live_object_count(&self) -> usize {
        self.pools
            .iter()
            .flat_map(|p| p.slots.iter())
            .filter(|s| matches!(s, Slot::Occupied { .. }))
            .count()
    }
}
