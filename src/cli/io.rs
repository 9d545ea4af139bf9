//! JSON I/O handling for CLI
//!
//! - Input: one JSON document via stdin (may span several lines)
//! - Output: one JSON object per line via stdout
//! - UTF-8 only

use std::io::{self, Read, Write};

use serde_json::{json, Value};

use crate::schema::ValidationErrors;

use super::errors::{CliError, CliErrorCode, CliResult};

/// Read a JSON document from stdin
pub fn read_request() -> CliResult<Value> {
    let mut input = String::new();
    io::stdin().lock().read_to_string(&mut input)?;
    parse_request(&input)
}

fn parse_request(input: &str) -> CliResult<Value> {
    if input.trim().is_empty() {
        return Err(CliError::invalid_input("Empty input"));
    }
    Ok(serde_json::from_str(input)?)
}

/// Write a success response to stdout
pub fn write_response(data: Value) -> CliResult<()> {
    emit(&mut io::stdout(), &json!({ "status": "ok", "data": data }))
}

/// Write an error response to stdout
pub fn write_error(code: &str, message: &str) -> CliResult<()> {
    emit(&mut io::stdout(), &error_body(code, message))
}

/// Write a validation rejection, listing every reported error
pub fn write_rejection(errors: &ValidationErrors) -> CliResult<()> {
    emit(&mut io::stdout(), &rejection_body(errors))
}

fn error_body(code: &str, message: &str) -> Value {
    json!({ "status": "error", "code": code, "message": message })
}

fn rejection_body(errors: &ValidationErrors) -> Value {
    json!({
        "status": "error",
        "code": CliErrorCode::Rejected.code(),
        "errors": errors,
    })
}

fn emit<W: Write>(writer: &mut W, response: &Value) -> CliResult<()> {
    serde_json::to_writer(&mut *writer, response)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}
