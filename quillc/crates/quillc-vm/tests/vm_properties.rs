//! Property-level integration tests for the invariants in `SPEC_FULL.md`
//! section 8 ("Testable properties"), driven through the crate's public
//! surface rather than the private `dispatch` helpers.

use quickcheck_macros::quickcheck;

use quillc_vm::codec::{utf32_to_utf8, utf8_to_utf32};
use quillc_vm::dispatch::{run, BinOpType, ConstValue, Instruction};
use quillc_vm::{Program, StopReason, UnicodePolicy, Value, VmConfig, VmThread};

fn new_thread(program: &Program) -> VmThread<'_> {
    let mut t = VmThread::new(program, VmConfig::default());
    t.push_frame(8);
    t
}

fn binop(a: Value, b: Value, op: BinOpType) -> StopReason {
    let program = Program::new();
    let mut t = new_thread(&program);
    t.set_slot(0, a);
    t.set_slot(1, b);
    run(
        &mut t,
        &[
            Instruction::BinOp { optype: op, slotto: 2, arg1slotfrom: 0, arg2slotfrom: 1 },
            Instruction::Return { slot: 2 },
        ],
    )
}

// Property 1: refcount balance. A program that never leaks a boxed value
// into a global ends with zero live external refs once its frame pops.
#[test]
fn property_refcount_balance_on_frame_pop() {
    let program = Program::new();
    let mut t = new_thread(&program);
    let r = t.heap_mut().alloc_string(vec![b'h' as u32, b'i' as u32]).unwrap();
    t.set_slot(0, Value::Boxed(r));
    assert_eq!(t.live_external_refcount(), 1);
    t.pop_frame(0);
    assert_eq!(t.live_external_refcount(), 0);
    assert_eq!(t.heap().live_object_count(), 0);
}

// Property 2: aliasing safety. `s := s + s` matches the non-aliased
// three-slot computation and leaves exactly one live reference, not a
// leaked intermediate.
#[test]
fn property_aliasing_safety_self_add() {
    let program = Program::new();

    let aliased_codepoints = {
        let mut t = new_thread(&program);
        let r = t.heap_mut().alloc_string(vec![b'x' as u32]).unwrap();
        t.set_slot(0, Value::Boxed(r));
        let outcome = run(&mut t, &[
            Instruction::BinOp { optype: BinOpType::Add, slotto: 0, arg1slotfrom: 0, arg2slotfrom: 0 },
            Instruction::Return { slot: 0 },
        ]);
        let StopReason::Returned(Value::Boxed(result_ref)) = outcome else {
            panic!("expected a boxed string result")
        };
        let codepoints = t.heap().get_string(result_ref).unwrap().codepoints().to_vec();
        assert_eq!(t.live_external_refcount(), 1, "aliasing must not leak the discarded operand");
        codepoints
    };

    let nonaliased_codepoints = {
        let mut t = new_thread(&program);
        let r1 = t.heap_mut().alloc_string(vec![b'x' as u32]).unwrap();
        let r2 = t.heap_mut().alloc_string(vec![b'x' as u32]).unwrap();
        t.set_slot(0, Value::Boxed(r1));
        t.set_slot(1, Value::Boxed(r2));
        let outcome = run(&mut t, &[
            Instruction::BinOp { optype: BinOpType::Add, slotto: 2, arg1slotfrom: 0, arg2slotfrom: 1 },
            Instruction::Return { slot: 2 },
        ]);
        let StopReason::Returned(Value::Boxed(result_ref)) = outcome else {
            panic!("expected a boxed string result")
        };
        t.heap().get_string(result_ref).unwrap().codepoints().to_vec()
    };

    assert_eq!(aliased_codepoints, nonaliased_codepoints);
}

// Property 3: numeric identity for non-overflowing integers.
#[quickcheck]
fn property_numeric_identity_add_then_sub(a: i32, b: i32) -> bool {
    let a = a as i64;
    let b = b as i64;
    let Some(sum) = a.checked_add(b) else { return true };
    let plus = binop(Value::Int(a), Value::Int(b), BinOpType::Add);
    let StopReason::Returned(Value::Int(got_sum)) = plus else { return false };
    if got_sum != sum {
        return false;
    }
    let minus = binop(Value::Int(got_sum), Value::Int(b), BinOpType::Subtract);
    matches!(minus, StopReason::Returned(Value::Int(back)) if back == a)
}

// Property 4: modulo result always has the same sign as the divisor.
#[quickcheck]
fn property_modulo_sign_follows_divisor(a: i32, b: i32) -> bool {
    if b == 0 {
        return true;
    }
    let outcome = binop(Value::Int(a as i64), Value::Int(b as i64), BinOpType::Modulo);
    match outcome {
        StopReason::Returned(Value::Int(r)) => {
            (r == 0) || ((r < 0) == (b < 0) && r.unsigned_abs() < (b as i64).unsigned_abs())
        }
        _ => false,
    }
}

// Property 5: UTF-8 <-> UTF-32 round trip for well-formed (non-surrogate)
// sequences.
#[quickcheck]
fn property_utf32_utf8_round_trip(chars: Vec<char>) -> bool {
    let codepoints: Vec<u32> = chars.iter().map(|c| *c as u32).collect();
    let Some(bytes) = utf32_to_utf8(&codepoints) else { return false };
    let Ok(decoded) = utf8_to_utf32(&bytes, UnicodePolicy::Fail) else { return false };
    decoded == codepoints
}

// Property 6: list index bounds, both ends.
#[test]
fn property_list_index_bounds_both_ends_raise() {
    let program = Program::new();
    let mut t = new_thread(&program);
    let r = t.heap_mut().alloc_list().unwrap();
    for v in [1, 2, 3] {
        t.heap_mut().get_list_mut(r).unwrap().push(Value::Int(v));
    }
    t.set_slot(0, Value::Boxed(r));

    for idx in [0i64, 4i64] {
        t.set_slot(1, Value::Int(idx));
        let outcome = run(&mut t, &[
            Instruction::BinOp { optype: BinOpType::IndexByExpr, slotto: 2, arg1slotfrom: 0, arg2slotfrom: 1 },
            Instruction::Return { slot: 2 },
        ]);
        assert!(matches!(outcome, StopReason::Unhandled(_)), "index {idx} should be out of range");
    }
    for idx in [1i64, 2, 3] {
        t.set_slot(1, Value::Int(idx));
        let outcome = run(&mut t, &[
            Instruction::BinOp { optype: BinOpType::IndexByExpr, slotto: 2, arg1slotfrom: 0, arg2slotfrom: 1 },
            Instruction::Return { slot: 2 },
        ]);
        assert!(matches!(outcome, StopReason::Returned(_)), "index {idx} should succeed");
    }
}

// Property 7: short-string threshold at SHORTSTR_CAP.
#[test]
fn property_short_string_threshold() {
    use quillc_vm::value::SHORTSTR_CAP;
    let program = Program::new();

    let within = vec![ConstValue::Str(vec![b'a' as u32]), ConstValue::Str(vec![b'b' as u32; SHORTSTR_CAP - 1])];
    let mut t = new_thread(&program);
    let instrs = vec![
        Instruction::StackSetConst { slot: 0, value: within[0].clone() },
        Instruction::StackSetConst { slot: 1, value: within[1].clone() },
        Instruction::BinOp { optype: BinOpType::Add, slotto: 2, arg1slotfrom: 0, arg2slotfrom: 1 },
        Instruction::Return { slot: 2 },
    ];
    match run(&mut t, &instrs) {
        StopReason::Returned(Value::ShortStr(_)) => {}
        other => panic!("expected ShortStr at the threshold, got {other:?}"),
    }

    let mut t = new_thread(&program);
    let instrs = vec![
        Instruction::StackSetConst { slot: 0, value: ConstValue::Str(vec![b'a' as u32]) },
        Instruction::StackSetConst { slot: 1, value: ConstValue::Str(vec![b'b' as u32; SHORTSTR_CAP]) },
        Instruction::BinOp { optype: BinOpType::Add, slotto: 2, arg1slotfrom: 0, arg2slotfrom: 1 },
        Instruction::Return { slot: 2 },
    ];
    match run(&mut t, &instrs) {
        StopReason::Returned(Value::Boxed(_)) => {}
        other => panic!("expected a boxed string above the threshold, got {other:?}"),
    }
}

// Property 8: short-circuit. `false and E` never evaluates E.
#[test]
fn property_short_circuit_never_evaluates_rhs() {
    let program = Program::new();
    let mut t = new_thread(&program);
    // slot 1 holds a value that would raise a type error if coerced to bool.
    t.set_slot(0, Value::Bool(false));
    t.set_slot(1, Value::Int(123));
    let outcome = run(&mut t, &[
        Instruction::BinOp { optype: BinOpType::BoolAnd, slotto: 2, arg1slotfrom: 0, arg2slotfrom: 1 },
        Instruction::Return { slot: 2 },
    ]);
    assert!(matches!(outcome, StopReason::Returned(Value::Bool(false))));
}
