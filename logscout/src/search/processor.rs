use std::borrow::Cow;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use tracing::{trace, warn};

use super::matcher::LineMatcher;
use crate::config::EncodingMode;
use crate::errors::{SearchError, SearchResult};
use crate::results::MatchedLine;

// Constants for file processing
const BUFFER_CAPACITY: usize = 65536;
const LINE_CAPACITY: usize = 256;

/// Decodes one line according to the encoding mode.
/// Returns the text and whether any byte had to be replaced.
fn decode_line(bytes: &[u8], encoding_mode: EncodingMode) -> (Cow<'_, str>, bool) {
    if bytes.is_ascii() {
        // ASCII is valid in both modes; from_utf8_lossy borrows without copying
        return (String::from_utf8_lossy(bytes), false);
    }
    match encoding_mode {
        EncodingMode::Latin1 => (Cow::Owned(bytes.iter().map(|&b| char::from(b)).collect()), false),
        EncodingMode::Utf8 => {
            let cow = String::from_utf8_lossy(bytes);
            let replaced = matches!(cow, Cow::Owned(_));
            (cow, replaced)
        }
    }
}

/// Outcome of reading one line
#[derive(Debug, PartialEq, Eq)]
enum LineRead {
    /// Nothing left to read
    Eof,
    /// A line is in the buffer; `consumed` counts its terminator too
    Line { consumed: usize },
    /// The line grew past the limit before a terminator was found
    TooLong,
}

/// Reads one line into `buffer`, without its terminator.
///
/// `\n`, `\r\n` and a lone `\r` all end a line. The buffer never grows much past `limit`
/// because the read stops as soon as the limit is crossed.
fn read_line<R: BufRead>(reader: &mut R, buffer: &mut Vec<u8>, limit: usize) -> io::Result<LineRead> {
    let mut consumed = 0;
    loop {
        let available = match reader.fill_buf() {
            Ok(available) => available,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        if available.is_empty() {
            return Ok(if consumed == 0 {
                LineRead::Eof
            } else {
                LineRead::Line { consumed }
            });
        }

        match available.iter().position(|&b| b == b'\n' || b == b'\r') {
            Some(end) => {
                buffer.extend_from_slice(&available[..end]);
                let terminator = available[end];
                reader.consume(end + 1);
                consumed += end + 1;
                if buffer.len() > limit {
                    return Ok(LineRead::TooLong);
                }
                if terminator == b'\r' && reader.fill_buf()?.first() == Some(&b'\n') {
                    reader.consume(1);
                    consumed += 1;
                }
                return Ok(LineRead::Line { consumed });
            }
            None => {
                let len = available.len();
                buffer.extend_from_slice(available);
                reader.consume(len);
                consumed += len;
                if buffer.len() > limit {
                    return Ok(LineRead::TooLong);
                }
            }
        }
    }
}

/// Everything one file contributed
#[derive(Debug, Default)]
pub struct FileScan {
    /// Matching lines in source order
    pub lines: Vec<MatchedLine>,
    /// Bytes read from the file
    pub bytes: u64,
}

/// Handles file processing operations
#[derive(Debug)]
pub struct FileProcessor {
    matcher: LineMatcher,
    encoding_mode: EncodingMode,
    max_line_bytes: usize,
}

impl FileProcessor {
    /// Creates a new FileProcessor with the given line matcher
    pub fn new(matcher: LineMatcher, encoding_mode: EncodingMode, max_line_bytes: usize) -> Self {
        Self {
            matcher,
            encoding_mode,
            max_line_bytes,
        }
    }

    /// Reads the file line by line and collects every matching line.
    ///
    /// The whole file is read before anything is returned, so the caller gets either all of a
    /// file's matches or an error, never a prefix.
    pub fn search_file(&self, path: &Path) -> SearchResult<FileScan> {
        trace!("Searching file: {}", path.display());

        let file = File::open(path).map_err(|e| SearchError::from_io(path, e))?;
        let mut reader = BufReader::with_capacity(BUFFER_CAPACITY, file);
        self.search_reader(path, &mut reader)
    }

    /// Same as [`FileProcessor::search_file`] over an already opened reader.
    /// `path` is only used for error reporting.
    pub fn search_reader<R: BufRead>(&self, path: &Path, reader: &mut R) -> SearchResult<FileScan> {
        let limit = self.max_line_bytes;
        let mut scan = FileScan::default();
        let mut buffer = Vec::with_capacity(LINE_CAPACITY);
        let mut line_number = 0;
        let mut replaced_any = false;

        loop {
            buffer.clear();
            let read = read_line(reader, &mut buffer, limit).map_err(|e| SearchError::from_io(path, e))?;
            line_number += 1;
            let consumed = match read {
                LineRead::Eof => break,
                LineRead::TooLong => return Err(SearchError::line_too_long(path, line_number, limit)),
                LineRead::Line { consumed } => consumed,
            };
            scan.bytes += consumed as u64;

            let (text, replaced) = decode_line(&buffer, self.encoding_mode);
            replaced_any |= replaced;
            if self.matcher.is_match(&text) {
                scan.lines.push(MatchedLine {
                    line_number,
                    text: text.into_owned(),
                });
            }
        }

        if replaced_any {
            warn!("Invalid UTF-8 replaced in file: {}", path.display());
        }
        Ok(scan)
    }
}
