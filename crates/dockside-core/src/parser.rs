//! CLI output parsing
//!
//! `docker ... --format json` and `colima list --json` print one JSON
//! object per line; `colima status --json` and `docker info` print a single
//! object. Decoding is tolerant: a bad line is dropped, never fatal.

use serde::de::DeserializeOwned;

/// One GiB in bytes
pub const GIB: u64 = 1 << 30;

/// Decode every non-blank line as one record, skipping lines that fail.
pub fn parse_record_stream<T: DeserializeOwned>(text: &str) -> Vec<T> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| match serde_json::from_str::<T>(line) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!("Skipping undecodable line ({}): {}", e, line);
                None
            }
        })
        .collect()
}

/// Decode the whole trimmed text as a single record.
pub fn parse_single_record<T: DeserializeOwned>(text: &str) -> Option<T> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    match serde_json::from_str(trimmed) {
        Ok(record) => Some(record),
        Err(e) => {
            tracing::warn!("Failed to decode output as JSON: {}", e);
            None
        }
    }
}

/// Normalize a VM memory/disk size to GiB.
///
/// Depending on its version the VM manager reports sizes either in bytes or
/// already in GiB. Values of at least one GiB worth of bytes are treated as
/// bytes and rounded; smaller values are passed through as GiB.
pub fn normalize_gib(raw: u64) -> u64 {
    if raw >= GIB {
        (raw as f64 / GIB as f64).round() as u64
    } else {
        raw
    }
}

/// Parse a percentage such as `"10.5%"`; anything unparsable is 0.
pub fn parse_percent(raw: &str) -> f64 {
    raw.trim()
        .trim_end_matches('%')
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}
