//! JSON I/O handling for CLI
//!
//! - Input: one JSON object, from a file or stdin
//! - Output: one JSON object on stdout
//! - UTF-8 only

use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use serde_json::{json, Value};

use super::errors::{CliError, CliResult};

/// Read a JSON payload from a file, or from stdin when the path is "-"
pub fn read_payload(path: &Path) -> CliResult<Value> {
    let content = if path == Path::new("-") {
        let mut buf = String::new();
        io::stdin().lock().read_to_string(&mut buf)?;
        buf
    } else {
        fs::read_to_string(path)
            .map_err(|e| CliError::io_error(format!("Failed to read {}: {}", path.display(), e)))?
    };

    if content.trim().is_empty() {
        return Err(CliError::io_error("Empty input"));
    }

    let value: Value = serde_json::from_str(&content)?;
    Ok(value)
}

/// Write `{"status": "ok", "data": ...}` to stdout
pub fn write_response(data: Value) -> CliResult<()> {
    emit(&json!({ "status": "ok", "data": data }))
}

/// Write `{"status": "error", "code": ..., "message": ...}` to stdout
pub fn write_error(code: &str, message: &str) -> CliResult<()> {
    emit(&json!({ "status": "error", "code": code, "message": message }))
}

fn emit(line: &Value) -> CliResult<()> {
    emit_to(&mut io::stdout().lock(), line)
}

/// One JSON document per line, flushed.
fn emit_to(out: &mut impl Write, line: &Value) -> CliResult<()> {
    serde_json::to_writer(&mut *out, line)?;
    out.write_all(b"\n")?;
    out.flush()?;
    Ok(())
}
