//! The on-disk JSON program format.
//!
//! `quillc_vm` never depends on `serde` (`SPEC_FULL.md` §6): this format,
//! and the conversion into the VM's in-memory `Instruction`/`ConstValue`
//! types, is entirely a `quillt` concern. A `ProgramFile` is a flat list
//! of functions; `quillt run` picks one by name (or the first one) and
//! drives it through `quillc_vm::dispatch::run`.

use serde::{Deserialize, Serialize};

use quillc_vm::dispatch::{BinOpType, ConstValue, Instruction, UnOpType};
use quillc_vm::ErrorKind;

use crate::error::{QuilltError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramFile {
    pub functions: Vec<FunctionFile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionFile {
    pub name: String,
    #[serde(default)]
    pub stack_slots_used: usize,
    pub instructions: Vec<InstructionFile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum InstructionFile {
    SetConst { slot: usize, value: ConstValueFile },
    BinOp { kind: BinOpFile, slotto: usize, arg1: usize, arg2: usize },
    UnOp { kind: UnOpFile, slotto: usize, arg: usize },
    RaiseError { kind: ErrorKindFile, message: String },
    Return { slot: usize },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConstValueFile {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    #[serde(rename = "none")]
    None,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinOpFile {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Equal,
    NotEqual,
    LargerOrEqual,
    SmallerOrEqual,
    Larger,
    Smaller,
    BoolAnd,
    BoolOr,
    IndexByExpr,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnOpFile {
    BoolNot,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKindFile {
    TypeError,
    MathError,
    IndexError,
    OutOfMemoryError,
}

impl From<BinOpFile> for BinOpType {
    fn from(op: BinOpFile) -> Self {
        match op {
            BinOpFile::Add => BinOpType::Add,
            BinOpFile::Subtract => BinOpType::Subtract,
            BinOpFile::Multiply => BinOpType::Multiply,
            BinOpFile::Divide => BinOpType::Divide,
            BinOpFile::Modulo => BinOpType::Modulo,
            BinOpFile::Equal => BinOpType::Equal,
            BinOpFile::NotEqual => BinOpType::NotEqual,
            BinOpFile::LargerOrEqual => BinOpType::LargerOrEqual,
            BinOpFile::SmallerOrEqual => BinOpType::SmallerOrEqual,
            BinOpFile::Larger => BinOpType::Larger,
            BinOpFile::Smaller => BinOpType::Smaller,
            BinOpFile::BoolAnd => BinOpType::BoolAnd,
            BinOpFile::BoolOr => BinOpType::BoolOr,
            BinOpFile::IndexByExpr => BinOpType::IndexByExpr,
        }
    }
}

impl From<UnOpFile> for UnOpType {
    fn from(op: UnOpFile) -> Self {
        match op {
            UnOpFile::BoolNot => UnOpType::BoolNot,
        }
    }
}

impl From<ErrorKindFile> for ErrorKind {
    fn from(kind: ErrorKindFile) -> Self {
        match kind {
            ErrorKindFile::TypeError => ErrorKind::TypeError,
            ErrorKindFile::MathError => ErrorKind::MathError,
            ErrorKindFile::IndexError => ErrorKind::IndexError,
            ErrorKindFile::OutOfMemoryError => ErrorKind::OutOfMemoryError,
        }
    }
}

impl From<ConstValueFile> for ConstValue {
    fn from(value: ConstValueFile) -> Self {
        match value {
            ConstValueFile::Int(i) => ConstValue::Int(i),
            ConstValueFile::Float(f) => ConstValue::Float(f),
            ConstValueFile::Bool(b) => ConstValue::Bool(b),
            ConstValueFile::Str(s) => ConstValue::Str(s.chars().map(|c| c as u32).collect()),
            ConstValueFile::None => ConstValue::None,
        }
    }
}

impl From<InstructionFile> for Instruction {
    fn from(instr: InstructionFile) -> Self {
        match instr {
            InstructionFile::SetConst { slot, value } => {
                Instruction::StackSetConst { slot, value: value.into() }
            }
            InstructionFile::BinOp { kind, slotto, arg1, arg2 } => Instruction::BinOp {
                optype: kind.into(),
                slotto,
                arg1slotfrom: arg1,
                arg2slotfrom: arg2,
            },
            InstructionFile::UnOp { kind, slotto, arg } => {
                Instruction::UnOp { optype: kind.into(), slotto, argslotfrom: arg }
            }
            InstructionFile::RaiseError { kind, message } => {
                Instruction::RaiseError { kind: kind.into(), message }
            }
            InstructionFile::Return { slot } => Instruction::Return { slot },
        }
    }
}

impl ProgramFile {
    pub fn parse(source: &str) -> Result<Self> {
        serde_json::from_str(source).map_err(QuilltError::from)
    }

    pub fn find(&self, name: &str) -> Result<&FunctionFile> {
        self.functions
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| QuilltError::ProgramFile(format!("no function named {name:?}")))
    }

    pub fn entry(&self) -> Result<&FunctionFile> {
        self.functions
            .first()
            .ok_or_else(|| QuilltError::ProgramFile("program file has no functions".to_string()))
    }
}

impl FunctionFile {
    pub fn instructions(&self) -> Vec<Instruction> {
        self.instructions.iter().cloned().map(Instruction::from).collect()
    }
}
