//! `quillt disasm` - print a function's instructions without running them.

use std::path::PathBuf;

use quillc_vm::dispatch::Instruction;

use crate::commands::common::load_program;
use crate::commands::traits::{Command, CommandDescription};
use crate::error::Result;

#[derive(Debug, Clone)]
pub struct DisasmArgs {
    pub program: PathBuf,
    pub function: Option<String>,
}

pub struct DisasmCommand {
    args: DisasmArgs,
}

impl DisasmCommand {
    pub fn new(args: DisasmArgs) -> Self {
        Self { args }
    }

    pub fn run(&self) -> Result<()> {
        let program_file = load_program(&self.args.program)?;
        let function_file = match &self.args.function {
            Some(name) => program_file.find(name)?,
            None => program_file.entry()?,
        };

        println!("function {} ({} slots)", function_file.name, function_file.stack_slots_used);
        for (ip, instr) in function_file.instructions().iter().enumerate() {
            println!("  {:4} {}", ip, format_instruction(instr));
        }
        Ok(())
    }
}

fn format_instruction(instr: &Instruction) -> String {
    match instr {
        Instruction::StackSetConst { slot, value } => format!("set_const slot{slot} = {value:?}"),
        Instruction::BinOp { optype, slotto, arg1slotfrom, arg2slotfrom } => {
            format!("{optype:?} slot{slotto} <- slot{arg1slotfrom}, slot{arg2slotfrom}")
        }
        Instruction::UnOp { optype, slotto, argslotfrom } => {
            format!("{optype:?} slot{slotto} <- slot{argslotfrom}")
        }
        Instruction::RaiseError { kind, message } => format!("raise {kind} {message:?}"),
        Instruction::Return { slot } => format!("return slot{slot}"),
    }
}

impl Command for DisasmCommand {
    type Args = DisasmArgs;
    type Output = ();

    fn new(args: Self::Args) -> Self {
        Self { args }
    }

    fn execute(&self) -> Result<Self::Output> {
        self.run()
    }

    fn name() -> &'static str {
        "disasm"
    }
}

impl CommandDescription for DisasmCommand {
    fn description() -> &'static str {
        "Print a program file's instructions without executing them"
    }
}

pub fn run_disasm(args: DisasmArgs) -> Result<()> {
    DisasmCommand::new(args).run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

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

    #[test]
    fn disasm_runs_without_error() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), DIVIDE_PROGRAM).unwrap();
        let args = DisasmArgs { program: file.path().to_path_buf(), function: None };
        assert!(run_disasm(args).is_ok());
    }

    #[test]
    fn disasm_unknown_function_errors() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), DIVIDE_PROGRAM).unwrap();
        let args = DisasmArgs {
            program: file.path().to_path_buf(),
            function: Some("missing".to_string()),
        };
        assert!(run_disasm(args).is_err());
    }
}
