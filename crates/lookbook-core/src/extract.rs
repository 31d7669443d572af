//! Garment-list extraction from a free-text model reply.
//!
//! Vision models are instructed to return a bare JSON array, but replies may
//! arrive wrapped in prose. The extractor tries a strict parse of the whole
//! reply first, then falls back to the first balanced `[...]` or `{...}`
//! span. Entries are validated individually against the garment schema;
//! non-conforming entries are skipped rather than failing the batch.

use serde_json::Value;

use crate::models::GarmentRecord;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("no JSON value found in model reply")]
    NoJson,

    #[error("model reply contained no valid garment entries")]
    NoValidGarments,
}

/// Extract the garment list from a model reply.
pub fn extract_garments(text: &str) -> Result<Vec<GarmentRecord>, ExtractError> {
    let candidate: Value = match serde_json::from_str(text.trim()) {
        Ok(value) => value,
        Err(_) => {
            let span = find_json_span(text).ok_or(ExtractError::NoJson)?;
            serde_json::from_str(span).map_err(|_| ExtractError::NoJson)?
        }
    };

    let items = match candidate {
        Value::Array(items) => items,
        object @ Value::Object(_) => vec![object],
        _ => return Err(ExtractError::NoJson),
    };

    let mut garments = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        match serde_json::from_value::<GarmentRecord>(item) {
            Ok(garment) => garments.push(garment),
            Err(err) => {
                tracing::warn!(index, error = %err, "Skipping non-conforming garment entry");
            }
        }
    }

    if garments.is_empty() {
        return Err(ExtractError::NoValidGarments);
    }

    Ok(garments)
}

/// Find the first balanced `[...]` or `{...}` span in `text`.
///
/// Brackets inside JSON string literals are ignored. Returns the span from
/// the first opening bracket to the bracket that returns the nesting depth
/// to zero, or `None` if the reply never closes it.
fn find_json_span(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    let start = bytes.iter().position(|&b| b == b'[' || b == b'{')?;

    let mut depth: usize = 0;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'[' | b'{' => depth += 1,
            b']' | b'}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&text[start..=i]);
                }
            }
            _ => {}
        }
    }

    None
}
