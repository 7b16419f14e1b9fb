//! `quillt run` - load a program file and execute one of its functions.

use std::path::PathBuf;

use quillc_vm::{Program, StopReason, Value, VmConfig, VmThread};

use crate::commands::common::{load_program, output_messages};
use crate::commands::traits::{Command, CommandDescription};
use crate::error::{QuilltError, Result};

#[derive(Debug, Clone)]
pub struct RunArgs {
    pub program: PathBuf,
    pub function: Option<String>,
    pub verbose: bool,
    pub vm_config: VmConfig,
}

pub struct RunCommand {
    args: RunArgs,
}

fn format_value(value: &Value) -> String {
    match value {
        Value::Int(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::None => "none".to_string(),
        Value::ShortStr(s) => {
            let text: String = s
                .codepoints()
                .iter()
                .map(|&c| char::from_u32(c).unwrap_or('\u{FFFD}'))
                .collect();
            format!("{text:?}")
        }
        _ => format!("{value:?}"),
    }
}

impl RunCommand {
    pub fn new(args: RunArgs) -> Self {
        Self { args }
    }

    pub fn run(&self) -> Result<()> {
        let program_file = load_program(&self.args.program)?;
        let function_file = match &self.args.function {
            Some(name) => program_file.find(name)?,
            None => program_file.entry()?,
        };

        let instructions = function_file.instructions();
        let program = Program::new();
        let mut thread = VmThread::new(&program, self.args.vm_config.clone());
        thread.push_frame(function_file.stack_slots_used.max(instructions.len() + 1));

        let outcome = quillc_vm::dispatch::run(&mut thread, &instructions);
        self.report(&outcome)
    }

    fn report(&self, outcome: &StopReason) -> Result<()> {
        match outcome {
            StopReason::Returned(value) => {
                if self.args.verbose {
                    eprintln!("{}: {}", output_messages::RETURNED, format_value(value));
                }
                println!("{}", format_value(value));
                Ok(())
            }
            StopReason::Unhandled(err) => {
                eprintln!("{}: {err}", output_messages::UNHANDLED);
                Err(QuilltError::Unhandled(err.to_string()))
            }
            StopReason::Cancelled => {
                eprintln!("{}", output_messages::CANCELLED);
                Err(QuilltError::Validation("execution was cancelled".to_string()))
            }
        }
    }
}

impl Command for RunCommand {
    type Args = RunArgs;
    type Output = ();

    fn new(args: Self::Args) -> Self {
        Self { args }
    }

    fn execute(&self) -> Result<Self::Output> {
        self.run()
    }

    fn name() -> &'static str {
        "run"
    }
}

impl CommandDescription for RunCommand {
    fn description() -> &'static str {
        "Run a function from a program file"
    }
}

pub fn run_run(args: RunArgs) -> Result<()> {
    RunCommand::new(args).run()
}
