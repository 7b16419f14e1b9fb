//! Runtime configuration for a VM instance.
//!
//! Everything here is a knob the embedder sets once before running a
//! program; nothing is mutated by the dispatch loop itself.

/// How invalid bytes are handled when decoding UTF-8 into codepoints.
///
/// The source interpreter this VM is modeled on hardcodes surrogate-escape
/// at every call site; we keep that as the default but expose the other two
/// policies it supports internally so embedders can choose fail-fast
/// behavior for trusted input or lossy replacement for display purposes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UnicodePolicy {
    /// Reject the whole input on the first invalid byte.
    Fail,
    /// Replace invalid bytes with `U+FFFD`.
    ReplaceWithFffd,
    /// Map each invalid byte `b` to the codepoint `0xDC80 + b`, so the
    /// original bytes can be recovered exactly on re-encode.
    #[default]
    SurrogateEscape,
}

/// Configuration for constructing a [`crate::frame::VmThread`] and its
/// backing [`crate::heap::Heap`].
#[derive(Clone, Debug)]
pub struct VmConfig {
    /// Number of value slots reserved in the evaluation stack up front.
    /// Growing past this re-allocates, so sizing it close to the program's
    /// real working set avoids reallocation during hot loops.
    pub initial_stack_slots: usize,
    /// Number of objects a freshly grown slab holds, per size class, the
    /// first time that class is touched. Doubles on each subsequent growth.
    pub pool_slab_initial_objects: usize,
    /// Hard ceiling on live objects per size class. `None` means unbounded
    /// (grow until the process itself runs out of memory). Mainly useful
    /// for exercising the `out-of-memory-error` path deterministically in
    /// tests and embedders with a real memory budget.
    pub pool_max_objects: Option<usize>,
    /// Invalid-byte policy used when decoding UTF-8 string literals and
    /// `indexbyexpr` results into codepoints.
    pub unicode_policy: UnicodePolicy,
    /// When set, the dispatch loop logs each executed instruction at
    /// `trace` level before acting on it. Off by default; the `trace!`
    /// calls themselves are cheap when disabled, but formatting the operand
    /// summary is not, so we gate it to avoid paying for it unconditionally.
    pub enable_debug_trace: bool,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            initial_stack_slots: 256,
            pool_slab_initial_objects: 16,
            pool_max_objects: None,
            unicode_policy: UnicodePolicy::default(),
            enable_debug_trace: false,
        }
    }
}
