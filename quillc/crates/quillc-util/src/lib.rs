//! quillc-util - Core utilities shared by the Quill runtime.
//!
//! This crate provides foundation types used by `quillc-vm` and `quillt`:
//!
//! - [`index_vec`]: a typed, zero-cost alternative to `Vec<T>` indexed by a
//!   newtype instead of `usize`. The VM's program tables (functions,
//!   classes, globals) are each an `IndexVec` so that, say, a `ClassIndex`
//!   can never be used to index the function table by accident.
//! - [`symbol`]: a global, thread-safe string interner. Function, class, and
//!   global names are interned once and then compared and copied as a
//!   4-byte handle rather than a heap-allocated `String`.
//! - [`error`]: shared error types for the utilities above.

pub mod error;
pub mod index_vec;
pub mod symbol;

pub use index_vec::{Idx, IndexVec};
pub use symbol::Symbol;
