//! The program table: functions, classes, globals, and the registration
//! API a front-end or embedder uses to build one.
//!
//! Construction and execution are deliberately two phases (per the Design
//! Notes' "global mutable program table" note): [`Program::new`] plus the
//! `register_*`/`add_class` calls mutate it; once a [`crate::frame::VmThread`]
//! is running against it, nothing here is mutated again. Nothing enforces
//! that split at the type level - like the source, this is a convention
//! the embedder must respect.

use quillc_util::index_vec::{define_idx, IndexVec};
use quillc_util::Symbol;

use crate::value::Value;

define_idx!(FuncIndex);
define_idx!(ClassIndex);
define_idx!(GlobalIndex);

/// A class's method table: a dense array of function indices, one per
/// declared method slot.
#[derive(Clone, Debug)]
pub struct ClassDef {
    pub name: Symbol,
    pub member_count: usize,
    pub method_func_idx: Vec<FuncIndex>,
}

/// A native function's callback: receives the thread and the stack bottom
/// of its own arguments, writes a result into the designated return slot,
/// and reports success/failure. Matches the source's native ABI (§6):
/// "returns 1 on success, 0 on failure".
pub type NativeFn = fn(&mut crate::frame::VmThread, usize) -> bool;

/// Either a bytecode function body or a native callback, plus the call
/// metadata shared by both.
pub enum FunctionBody {
    Native(NativeFn),
    Bytecode(Vec<crate::dispatch::Instruction>),
}

pub struct FunctionDef {
    pub name: Symbol,
    pub arg_count: usize,
    pub last_is_multiarg: bool,
    pub stack_slots_used: usize,
    pub is_threadable: bool,
    pub associated_class_index: Option<ClassIndex>,
    pub body: FunctionBody,
}

impl FunctionDef {
    pub fn is_native(&self) -> bool {
        matches!(self.body, FunctionBody::Native(_))
    }
}

/// Optional debug symbols for a function: the name it was registered
/// under, its declared argument names, the file it came from, and its
/// module path. The core never reads these at dispatch time; they exist
/// purely for diagnostics.
#[derive(Clone, Debug)]
pub struct DebugSymbol {
    pub name: Symbol,
    pub arg_names: Vec<Symbol>,
    pub file_uri: String,
    pub module_path: String,
    pub library: Option<String>,
}

/// The immutable (post-construction) program image a [`crate::frame::VmThread`]
/// executes against.
#[derive(Default)]
pub struct Program {
    pub globals: IndexVec<GlobalIndex, Value>,
    pub classes: IndexVec<ClassIndex, ClassDef>,
    pub functions: IndexVec<FuncIndex, FunctionDef>,
    pub symbols: Vec<DebugSymbol>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a native function, returning its dense function index.
    #[allow(clippy::too_many_arguments)]
    pub fn register_native_function(
        &mut self,
        name: &str,
        callback: NativeFn,
        file_uri: &str,
        arg_count: usize,
        arg_names: &[&str],
        last_is_multiarg: bool,
        module_path: &str,
        library: Option<&str>,
        threadable: bool,
        class_idx: Option<ClassIndex>,
    ) -> FuncIndex {
        let sym = Symbol::intern(name);
        self.symbols.push(DebugSymbol {
            name: sym,
            arg_names: arg_names.iter().map(|n| Symbol::intern(n)).collect(),
            file_uri: file_uri.to_string(),
            module_path: module_path.to_string(),
            library: library.map(str::to_string),
        });
        self.functions.push(FunctionDef {
            name: sym,
            arg_count,
            last_is_multiarg,
            stack_slots_used: arg_count,
            is_threadable: threadable,
            associated_class_index: class_idx,
            body: FunctionBody::Native(callback),
        })
    }

    /// Registers a bytecode function, returning its dense function index.
    #[allow(clippy::too_many_arguments)]
    pub fn register_bytecode_function(
        &mut self,
        name: &str,
        instructions: Vec<crate::dispatch::Instruction>,
        arg_count: usize,
        arg_names: &[&str],
        last_is_multiarg: bool,
        stack_slots_used: usize,
        file_uri: &str,
        module_path: &str,
        threadable: bool,
        class_idx: Option<ClassIndex>,
    ) -> FuncIndex {
        let sym = Symbol::intern(name);
        self.symbols.push(DebugSymbol {
            name: sym,
            arg_names: arg_names.iter().map(|n| Symbol::intern(n)).collect(),
            file_uri: file_uri.to_string(),
            module_path: module_path.to_string(),
            library: None,
        });
        self.functions.push(FunctionDef {
            name: sym,
            arg_count,
            last_is_multiarg,
            stack_slots_used,
            is_threadable: threadable,
            associated_class_index: class_idx,
            body: FunctionBody::Bytecode(instructions),
        })
    }

    pub fn add_class(
        &mut self,
        name: &str,
        member_count: usize,
        method_func_idx: Vec<FuncIndex>,
    ) -> ClassIndex {
        self.classes.push(ClassDef {
            name: Symbol::intern(name),
            member_count,
            method_func_idx,
        })
    }

    pub fn push_global(&mut self, value: Value) -> GlobalIndex {
        self.globals.push(value)
    }
}
