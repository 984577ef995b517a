//! Line-delimited JSON decoder for Export API response bodies
//!
//! The service answers with independent JSON records separated by newlines,
//! not a JSON array. In streaming mode the transport's chunk boundaries do
//! not line up with record boundaries, so each decode step carries the
//! unparsed tail of its input forward as an explicit remainder value.

use crate::errors::{ExportError, Result};

/// One decoded response record
pub type Record = serde_json::Value;

/// Output of one streaming decode step
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedBatch {
    /// Records completed by this chunk, in arrival order
    pub records: Vec<Record>,

    /// Trailing newline-unterminated fragment, to be prepended to the next
    /// chunk
    pub remainder: String,
}

/// Decode a complete response body.
///
/// Every non-blank line must parse as one JSON value; the final line may lack
/// its trailing newline but is still expected to be complete. A first record
/// shaped `{error, code}` turns the whole body into a service failure.
pub fn decode_body(body: &str) -> Result<Vec<Record>> {
    let mut records = Vec::new();

    for line in body.split('\n') {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        records.push(parse_line(line)?);
    }

    check_service_fault(&records)?;
    Ok(records)
}

/// Decode one streaming step over `remainder + chunk`.
///
/// Only the trailing fragment without a newline may be deferred as the new
/// remainder; it is presumed incomplete, not malformed. A line *before* the
/// final newline that fails to parse is genuinely malformed data and fails
/// the call.
pub fn decode_chunk(remainder: &str, chunk: &str) -> Result<DecodedBatch> {
    let mut input = String::with_capacity(remainder.len() + chunk.len());
    input.push_str(remainder);
    input.push_str(chunk);

    let (complete, tail) = match input.rfind('\n') {
        Some(pos) => (&input[..pos], &input[pos + 1..]),
        None => ("", input.as_str()),
    };

    let mut records = Vec::new();
    for line in complete.split('\n') {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        records.push(parse_line(line)?);
    }

    check_service_fault(&records)?;
    Ok(DecodedBatch {
        records,
        remainder: tail.to_string(),
    })
}

fn parse_line(line: &str) -> Result<Record> {
    serde_json::from_str(line).map_err(|e| ExportError::Parse(e.to_string()))
}

/// The service signals failure in-band: a first record carrying an `error`
/// message (and usually a numeric `code`) instead of data.
fn check_service_fault(records: &[Record]) -> Result<()> {
    if let Some(first) = records.first() {
        if let Some(message) = first.get("error").and_then(Record::as_str) {
            let code = first.get("code").and_then(Record::as_i64).unwrap_or(0);
            return Err(ExportError::Service {
                message: message.to_string(),
                code,
            });
        }
    }
    Ok(())
}
