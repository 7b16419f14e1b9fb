//! End-to-end scenario tests driven through the public `run` entry point,
//! exercising a thread the way a caller outside the crate would: build a
//! `Program`, a `VmThread`, a flat instruction slice, and read back the
//! `StopReason`. These complement the white-box `exec_*` tests in
//! `dispatch.rs`'s own `#[cfg(test)]` module, which can reach for the
//! private helpers directly.

use quillc_vm::dispatch::{run, BinOpType, ConstValue, Instruction, UnOpType};
use quillc_vm::{Program, StopReason, Value, VmConfig, VmThread};

fn new_thread(program: &Program) -> VmThread<'_> {
    let mut t = VmThread::new(program, VmConfig::default());
    t.push_frame(8);
    t
}

// S1: basic integer division.
#[test]
fn divide_basic_returns_quotient() {
    let program = Program::new();
    let mut t = new_thread(&program);
    let instrs = vec![
        Instruction::StackSetConst { slot: 0, value: ConstValue::Int(7) },
        Instruction::StackSetConst { slot: 1, value: ConstValue::Int(3) },
        Instruction::BinOp { optype: BinOpType::Divide, slotto: 2, arg1slotfrom: 0, arg2slotfrom: 1 },
        Instruction::Return { slot: 2 },
    ];
    match run(&mut t, &instrs) {
        StopReason::Returned(v) => assert_eq!(v, Value::Int(2)),
        other => panic!("expected Returned, got {other:?}"),
    }
}

// S2: division by zero surfaces as an unhandled raise, not a panic.
#[test]
fn divide_by_zero_is_unhandled_not_a_fault() {
    let program = Program::new();
    let mut t = new_thread(&program);
    let instrs = vec![
        Instruction::StackSetConst { slot: 0, value: ConstValue::Int(1) },
        Instruction::StackSetConst { slot: 1, value: ConstValue::Int(0) },
        Instruction::BinOp { optype: BinOpType::Divide, slotto: 2, arg1slotfrom: 0, arg2slotfrom: 1 },
        Instruction::Return { slot: 2 },
    ];
    match run(&mut t, &instrs) {
        StopReason::Unhandled(err) => assert_eq!(err.kind, quillc_vm::ErrorKind::MathError),
        other => panic!("expected Unhandled, got {other:?}"),
    }
}

// S3: short-string + short-string concatenation that overflows SHORTSTR_CAP
// promotes to a boxed string.
#[test]
fn string_concat_promotes_past_short_string_cap() {
    let program = Program::new();
    let mut t = new_thread(&program);
    let instrs = vec![
        Instruction::StackSetConst { slot: 0, value: ConstValue::Str("ab".chars().map(|c| c as u32).collect()) },
        Instruction::StackSetConst { slot: 1, value: ConstValue::Str("cd".chars().map(|c| c as u32).collect()) },
        Instruction::BinOp { optype: BinOpType::Add, slotto: 2, arg1slotfrom: 0, arg2slotfrom: 1 },
        Instruction::Return { slot: 2 },
    ];
    match run(&mut t, &instrs) {
        StopReason::Returned(Value::Boxed(r)) => {
            let s = t.heap().get_string(r).unwrap();
            assert_eq!(s.codepoints(), &[b'a' as u32, b'b' as u32, b'c' as u32, b'd' as u32]);
        }
        other => panic!("expected a boxed string, got {other:?}"),
    }
}

// S4/S5: list indexing, hit and out-of-range, through the public API.
#[test]
fn list_index_hit_and_out_of_range() {
    let program = Program::new();
    let mut t = new_thread(&program);
    let r = t.heap_mut().alloc_list().unwrap();
    for v in [10, 20, 30] {
        t.heap_mut().get_list_mut(r).unwrap().push(Value::Int(v));
    }
    t.set_slot(0, Value::Boxed(r));

    t.set_slot(1, Value::Int(2));
    let instrs = vec![
        Instruction::BinOp { optype: BinOpType::IndexByExpr, slotto: 2, arg1slotfrom: 0, arg2slotfrom: 1 },
        Instruction::Return { slot: 2 },
    ];
    match run(&mut t, &instrs) {
        StopReason::Returned(v) => assert_eq!(v, Value::Int(20)),
        other => panic!("expected Returned, got {other:?}"),
    }

    t.set_slot(1, Value::Int(99));
    let instrs = vec![
        Instruction::BinOp { optype: BinOpType::IndexByExpr, slotto: 2, arg1slotfrom: 0, arg2slotfrom: 1 },
        Instruction::Return { slot: 2 },
    ];
    match run(&mut t, &instrs) {
        StopReason::Unhandled(err) => assert_eq!(err.kind, quillc_vm::ErrorKind::IndexError),
        other => panic!("expected Unhandled, got {other:?}"),
    }
}

// S6: map lookup with an int key finds a value inserted under the
// numerically-equal float key (documented hashing asymmetry).
#[test]
fn map_lookup_treats_int_and_float_keys_as_the_same_slot() {
    let program = Program::new();
    let mut t = new_thread(&program);
    let r = t.heap_mut().alloc_map().unwrap();
    t.heap_mut()
        .with_map_mut(r, |m, heap| m.insert(Value::Float(1.0), Value::Int(42), heap));
    t.set_slot(0, Value::Boxed(r));
    t.set_slot(1, Value::Int(1));
    let instrs = vec![
        Instruction::BinOp { optype: BinOpType::IndexByExpr, slotto: 2, arg1slotfrom: 0, arg2slotfrom: 1 },
        Instruction::Return { slot: 2 },
    ];
    match run(&mut t, &instrs) {
        StopReason::Returned(v) => assert_eq!(v, Value::Int(42)),
        other => panic!("expected Returned, got {other:?}"),
    }
}

// S7: bool-and short-circuits and never evaluates a right-hand side that
// would otherwise raise a type error.
#[test]
fn bool_and_short_circuit_skips_invalid_rhs() {
    let program = Program::new();
    let mut t = new_thread(&program);
    let instrs = vec![
        Instruction::StackSetConst { slot: 0, value: ConstValue::Bool(false) },
        Instruction::StackSetConst { slot: 1, value: ConstValue::Int(5) },
        Instruction::BinOp { optype: BinOpType::BoolAnd, slotto: 2, arg1slotfrom: 0, arg2slotfrom: 1 },
        Instruction::Return { slot: 2 },
    ];
    match run(&mut t, &instrs) {
        StopReason::Returned(v) => assert_eq!(v, Value::Bool(false)),
        other => panic!("expected Returned, got {other:?}"),
    }
}

#[test]
fn bool_not_negates_through_run() {
    let program = Program::new();
    let mut t = new_thread(&program);
    let instrs = vec![
        Instruction::StackSetConst { slot: 0, value: ConstValue::Bool(false) },
        Instruction::UnOp { optype: UnOpType::BoolNot, slotto: 1, argslotfrom: 0 },
        Instruction::Return { slot: 1 },
    ];
    match run(&mut t, &instrs) {
        StopReason::Returned(v) => assert_eq!(v, Value::Bool(true)),
        other => panic!("expected Returned, got {other:?}"),
    }
}

#[test]
fn raise_error_instruction_surfaces_as_unhandled() {
    let program = Program::new();
    let mut t = new_thread(&program);
    let instrs = vec![Instruction::RaiseError {
        kind: quillc_vm::ErrorKind::IndexError,
        message: "out of bounds".to_string(),
    }];
    match run(&mut t, &instrs) {
        StopReason::Unhandled(err) => {
            assert_eq!(err.kind, quillc_vm::ErrorKind::IndexError);
            assert_eq!(err.message, "out of bounds");
        }
        other => panic!("expected Unhandled, got {other:?}"),
    }
}
