//! JSON output for CLI commands

use std::io::{self, Write};

use serde_json::Value;

use super::errors::CliResult;

/// Write a pretty-printed JSON document to stdout
pub fn write_json(value: &Value) -> CliResult<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    serde_json::to_writer_pretty(&mut handle, value)?;
    writeln!(handle)?;
    handle.flush()?;
    Ok(())
}
