//! Text capture dumps.
//!
//! ```text
//! # comment
//! cc <pts> <hex>               one cc_data() block
//! l21 <line> <pts> <hex4>      one line-21 byte pair, parity included
//! xds <hex4>                   one XDS byte pair
//! <hex>                        cc_data() block, pts one frame after the last
//! ```

use std::io::BufRead;

use bytes::Bytes;
use cc_protocol::{parse_hex, ProtocolError};
use thiserror::Error;

/// 90 kHz ticks per frame at 29.97 Hz.
pub const FRAME_PTS: i64 = 3003;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    CcData { pts: i64, data: Bytes },
    Line21 { line: u32, pts: i64, pair: [u8; 2] },
    Xds { pair: [u8; 2] },
}

impl Record {
    pub fn pts(&self) -> Option<i64> {
        match self {
            Record::CcData { pts, .. } | Record::Line21 { pts, .. } => Some(*pts),
            Record::Xds { .. } => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: {source}")]
    Protocol { line: usize, source: ProtocolError },

    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },
}

fn pair(s: &str, line: usize) -> Result<[u8; 2], ReplayError> {
    let bytes = parse_hex(s).map_err(|source| ReplayError::Protocol { line, source })?;
    match bytes[..] {
        [d1, d2] => Ok([d1, d2]),
        _ => Err(ReplayError::Syntax { line, message: format!("expected two bytes, got {}", bytes.len()) }),
    }
}

fn number<T: std::str::FromStr>(s: Option<&str>, what: &str, line: usize) -> Result<T, ReplayError> {
    s.and_then(|s| s.parse().ok())
        .ok_or_else(|| ReplayError::Syntax { line, message: format!("missing or invalid {}", what) })
}

/// Parse one dump line. Blank and comment lines yield `None`.
///
/// `last_pts` is the pts of the previous record, used to stamp bare hex
/// lines.
pub fn parse_line(text: &str, line: usize, last_pts: i64) -> Result<Option<Record>, ReplayError> {
    let text = text.trim();
    if text.is_empty() || text.starts_with('#') {
        return Ok(None);
    }

    let mut fields = text.split_whitespace();
    let record = match fields.next() {
        Some("cc") => {
            let pts = number(fields.next(), "pts", line)?;
            let hex: String = fields.collect();
            let data = parse_hex(&hex).map_err(|source| ReplayError::Protocol { line, source })?;
            Record::CcData { pts, data }
        }
        Some("l21") => {
            let vbi_line = number(fields.next(), "line number", line)?;
            let pts = number(fields.next(), "pts", line)?;
            let hex: String = fields.collect();
            Record::Line21 { line: vbi_line, pts, pair: pair(&hex, line)? }
        }
        Some("xds") => {
            let hex: String = fields.collect();
            Record::Xds { pair: pair(&hex, line)? }
        }
        _ => {
            let data = parse_hex(text).map_err(|source| ReplayError::Protocol { line, source })?;
            Record::CcData { pts: last_pts + FRAME_PTS, data }
        }
    };
    Ok(Some(record))
}

/// Iterator over the records of a dump.
pub struct Replay<R> {
    reader: R,
    line: usize,
    last_pts: i64,
    buf: String,
}

impl<R: BufRead> Replay<R> {
    pub fn new(reader: R) -> Self {
        Self { reader, line: 0, last_pts: -FRAME_PTS, buf: String::new() }
    }

    /// Line number of the last record returned.
    pub fn line(&self) -> usize {
        self.line
    }
}

impl<R: BufRead> Iterator for Replay<R> {
    type Item = Result<Record, ReplayError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            match self.reader.read_line(&mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => return Some(Err(e.into())),
            }
            self.line += 1;

            match parse_line(&self.buf, self.line, self.last_pts) {
                Ok(Some(record)) => {
                    if let Some(pts) = record.pts() {
                        self.last_pts = pts;
                    }
                    return Some(Ok(record));
                }
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_records() {
        assert_eq!(
            parse_line("cc 9000 03 41 ff fc 94 20", 1, 0).unwrap(),
            Some(Record::CcData { pts: 9000, data: Bytes::from_static(&[0x03, 0x41, 0xFF, 0xFC, 0x94, 0x20]) })
        );
        assert_eq!(
            parse_line("l21 284 12 8180", 2, 0).unwrap(),
            Some(Record::Line21 { line: 284, pts: 12, pair: [0x81, 0x80] })
        );
        assert_eq!(parse_line("xds 0f1c", 3, 0).unwrap(), Some(Record::Xds { pair: [0x0F, 0x1C] }));
        assert_eq!(parse_line("  # note", 4, 0).unwrap(), None);
        assert_eq!(parse_line("", 5, 0).unwrap(), None);
    }

    #[test]
    fn test_bare_hex_gets_next_frame_pts() {
        let record = parse_line("0341fffc9420", 1, 6006).unwrap().unwrap();
        assert_eq!(record.pts(), Some(6006 + FRAME_PTS));
    }

    #[test]
    fn test_syntax_errors() {
        assert!(matches!(parse_line("l21 x 0 8080", 7, 0), Err(ReplayError::Syntax { line: 7, .. })));
        assert!(matches!(parse_line("xds 0f", 8, 0), Err(ReplayError::Syntax { line: 8, .. })));
        assert!(matches!(parse_line("cc 0 0g", 9, 0), Err(ReplayError::Protocol { line: 9, .. })));
    }

    #[test]
    fn test_replay_iterator() {
        let dump = "# header\ncc 100 03 41 ff\n\n03 41 ff\nxds 0101\n";
        let records: Vec<Record> = Replay::new(dump.as_bytes()).map(Result::unwrap).collect();
        assert_eq!(records.len(), 3);
        assert_eq!(records[1].pts(), Some(100 + FRAME_PTS));
        assert_eq!(records[2], Record::Xds { pair: [0x01, 0x01] });
    }
}
