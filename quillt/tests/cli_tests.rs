//! CLI-level end-to-end tests for `quillt`, driven through the compiled
//! binary with `assert_cmd`, matching `faxt`'s e2e test convention.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::NamedTempFile;

fn quillt_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_quillt"))
}

fn write_program(json: &str) -> NamedTempFile {
    let file = NamedTempFile::new().expect("create temp program file");
    std::fs::write(file.path(), json).expect("write temp program file");
    file
}

const DIVIDE_PROGRAM: &str = r#"{
    "functions": [
        {
            "name": "main",
            "stack_slots_used": 3,
            "instructions": [
                {"op": "set_const", "slot": 0, "value": 7},
                {"op": "set_const", "slot": 1, "value": 3},
                {"op": "bin_op", "kind": "divide", "slotto": 2, "arg1": 0, "arg2": 1},
                {"op": "return", "slot": 2}
            ]
        }
    ]
}"#;

const DIVIDE_BY_ZERO_PROGRAM: &str = r#"{
    "functions": [
        {
            "name": "main",
            "stack_slots_used": 3,
            "instructions": [
                {"op": "set_const", "slot": 0, "value": 1},
                {"op": "set_const", "slot": 1, "value": 0},
                {"op": "bin_op", "kind": "divide", "slotto": 2, "arg1": 0, "arg2": 1},
                {"op": "return", "slot": 2}
            ]
        }
    ]
}"#;

#[test]
fn help_mentions_usage() {
    quillt_bin()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage").or(predicate::str::contains("quillt")));
}

#[test]
fn run_divide_program_prints_result() {
    let file = write_program(DIVIDE_PROGRAM);
    quillt_bin()
        .arg("run")
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains('2'));
}

#[test]
fn run_divide_by_zero_exits_nonzero() {
    let file = write_program(DIVIDE_BY_ZERO_PROGRAM);
    quillt_bin().arg("run").arg(file.path()).assert().failure();
}

#[test]
fn disasm_lists_instructions() {
    let file = write_program(DIVIDE_PROGRAM);
    quillt_bin()
        .arg("disasm")
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Divide").or(predicate::str::contains("function main")));
}

#[test]
fn run_missing_function_exits_nonzero() {
    let file = write_program(DIVIDE_PROGRAM);
    quillt_bin()
        .arg("run")
        .arg(file.path())
        .arg("--function")
        .arg("does-not-exist")
        .assert()
        .failure();
}
