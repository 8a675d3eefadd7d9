//! Parsing of the one-line request format used by the interactive console:
//!
//! ```text
//! <threads>; <search text>; <input dir>; <output path>; <ext> <ext> ...
//! 15; password; /var/log; /tmp/out.txt; txt log out err
//! ```

use std::num::NonZeroUsize;
use std::path::PathBuf;

use crate::config::{ScanConfig, ScanRequest};
use crate::errors::{SearchError, SearchResult};

const FIELD_COUNT: usize = 5;

/// Splits a request line into a [`ScanConfig`], keeping every other setting from `base`.
///
/// Only the shape of the line is checked here; [`parse_request_line`] also validates it.
pub fn parse_request_fields(line: &str, base: &ScanConfig) -> SearchResult<ScanConfig> {
    let fields: Vec<&str> = line.split(';').map(str::trim).collect();
    if fields.len() != FIELD_COUNT {
        return Err(SearchError::config_error(format!(
            "Expected {} fields separated by ';', found {}",
            FIELD_COUNT,
            fields.len()
        )));
    }

    let threads: usize = fields[0].parse().map_err(|_| {
        SearchError::config_error(format!("Thread count is not a number: '{}'", fields[0]))
    })?;
    let thread_count = NonZeroUsize::new(threads)
        .ok_or_else(|| SearchError::config_error("Thread count must be greater than zero"))?;

    if fields[2].is_empty() {
        return Err(SearchError::config_error("Input directory is empty"));
    }
    if fields[3].is_empty() {
        return Err(SearchError::config_error("Output path is empty"));
    }
    if fields[4].is_empty() {
        return Err(SearchError::invalid_extension("no extensions were given"));
    }

    Ok(ScanConfig {
        thread_count,
        search_text: fields[1].to_string(),
        input_dir: PathBuf::from(fields[2]),
        output_path: PathBuf::from(fields[3]),
        extensions: fields[4]
            .split_whitespace()
            .map(str::to_lowercase)
            .collect(),
        ..base.clone()
    })
}

/// Parses and validates a request line
pub fn parse_request_line(line: &str, base: &ScanConfig) -> SearchResult<ScanRequest> {
    parse_request_fields(line, base)?.validate()
}
