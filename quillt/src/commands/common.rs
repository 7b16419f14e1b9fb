//! Shared helpers for `quillt` commands.

use std::path::Path;

use crate::error::Result;
use crate::program_file::ProgramFile;

/// Load and parse a program file from disk.
pub fn load_program(path: &Path) -> Result<ProgramFile> {
    let content = std::fs::read_to_string(path)?;
    ProgramFile::parse(&content)
}

pub mod output_messages {
    pub const RETURNED: &str = "returned";
    pub const UNHANDLED: &str = "unhandled error";
    pub const CANCELLED: &str = "cancelled";
}
