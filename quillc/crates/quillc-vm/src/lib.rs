//! quillc-vm - the stack-based bytecode virtual machine core.
//!
//! This crate is the hard core of the Quill runtime: a tagged value model
//! with inline short-strings and a reference-counted, pool-allocated heap
//! (components [`value`]/[`heap`]/[`container`]), a UTF-8/UTF-32 codec
//! with surrogate-escape ([`codec`]), a per-thread evaluation stack and
//! program table ([`frame`]/[`program`]), and the binary/unary instruction
//! dispatch that is the centerpiece of the interpreter ([`dispatch`]).
//!
//! What it deliberately does NOT do: lexing, parsing, scope/import
//! resolution, or any on-disk program format - those live above this
//! crate (in `quillt`, for this workspace) as external collaborators with
//! the thin contract described in [`program`]. `quillc-vm` never depends
//! on `serde`; the program table is built purely in memory via
//! [`program::Program`]'s `register_*` calls.

pub mod codec;
pub mod config;
pub mod container;
pub mod dispatch;
pub mod error;
pub mod frame;
pub mod heap;
pub mod program;
pub mod value;

pub use config::{UnicodePolicy, VmConfig};
pub use error::{ErrorKind, Fault, RaisedError};
pub use frame::{StopReason, VmThread};
pub use program::Program;
pub use value::Value;
