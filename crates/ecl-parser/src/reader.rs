//! Lazy reader for binary keyword streams.

use bytes::Buf;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;
use tracing::trace;

use crate::error::{EclError, EclResult};
use crate::types::{EclArray, EclType, KeywordRecord, RecordHeader};

/// Byte length of the header payload: keyword, count and type tag.
const HEADER_LEN: i32 = 16;

/// Streaming reader over keyword records.
///
/// [`EclReader::next_header`] only decodes the record header. The payload is
/// decoded on demand by [`EclReader::read_array`]; if the caller moves on
/// without reading it, the payload is skipped.
pub struct EclReader<R> {
    inner: R,
    pending: Option<RecordHeader>,
    offset: u64,
}

impl EclReader<BufReader<File>> {
    /// Open a keyword file. The handle is closed when the reader is dropped.
    pub fn open(path: impl AsRef<Path>) -> EclResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| EclError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: Read> EclReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            pending: None,
            offset: 0,
        }
    }

    /// Byte offset of the next unread byte.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Advance to the next record header, skipping any unread payload.
    ///
    /// Returns `Ok(None)` at a clean end of stream.
    pub fn next_header(&mut self) -> EclResult<Option<RecordHeader>> {
        if let Some(previous) = self.pending.take() {
            self.skip_payload(&previous)?;
        }

        let start = self.offset;
        let mut head = [0u8; 24];
        let filled = self.fill(&mut head)?;
        if filled == 0 {
            return Ok(None);
        }
        if filled < head.len() {
            return Err(EclError::Truncated {
                offset: start,
                expected: head.len(),
                found: filled,
            });
        }

        let mut buf = &head[..];
        let lead = buf.get_i32();
        if lead != HEADER_LEN {
            return Err(EclError::invalid(
                start,
                format!("header marker {} (expected {})", lead, HEADER_LEN),
            ));
        }

        let keyword = String::from_utf8_lossy(&buf[..8]).trim_end().to_string();
        buf.advance(8);
        let count = buf.get_i32();
        let ecl_type = EclType::from_tag(&buf[..4])?;
        buf.advance(4);
        let trail = buf.get_i32();
        if trail != HEADER_LEN {
            return Err(EclError::invalid(
                start,
                format!("trailing header marker {} for {}", trail, keyword),
            ));
        }
        let count = usize::try_from(count).map_err(|_| {
            EclError::invalid(start, format!("negative element count for {}", keyword))
        })?;

        trace!(keyword = %keyword, count, offset = start, "Read record header");

        let header = RecordHeader {
            keyword,
            count,
            ecl_type,
        };
        self.pending = Some(header.clone());
        Ok(Some(header))
    }

    /// Decode the payload of the record returned by the last `next_header`.
    pub fn read_array(&mut self) -> EclResult<EclArray> {
        let header = self.pending.take().ok_or(EclError::NoPendingRecord)?;
        let mut array = empty_array(&header);

        self.for_each_block(&header, |_, mut block| {
            match &mut array {
                EclArray::Int(v) => {
                    while block.has_remaining() {
                        v.push(block.get_i32());
                    }
                }
                EclArray::Real(v) => {
                    while block.has_remaining() {
                        v.push(block.get_f32());
                    }
                }
                EclArray::Double(v) => {
                    while block.has_remaining() {
                        v.push(block.get_f64());
                    }
                }
                EclArray::Logical(v) => {
                    while block.has_remaining() {
                        v.push(block.get_i32() != 0);
                    }
                }
                EclArray::Char(v) => {
                    for chunk in block.chunks(8) {
                        v.push(String::from_utf8_lossy(chunk).trim_end().to_string());
                    }
                }
                EclArray::Str { width, values } => {
                    for chunk in block.chunks(*width) {
                        values.push(String::from_utf8_lossy(chunk).trim_end().to_string());
                    }
                }
                EclArray::Message => {}
            }
        })?;

        Ok(array)
    }

    /// Collect the remaining records eagerly.
    pub fn read_records(&mut self) -> EclResult<Vec<KeywordRecord>> {
        let mut records = Vec::new();
        while let Some(header) = self.next_header()? {
            let array = self.read_array()?;
            records.push(KeywordRecord {
                keyword: header.keyword,
                array,
            });
        }
        Ok(records)
    }

    fn skip_payload(&mut self, header: &RecordHeader) -> EclResult<()> {
        self.for_each_block(header, |_, _| {})
    }

    /// Walk the data blocks of a record, validating both markers of each.
    fn for_each_block<F>(&mut self, header: &RecordHeader, mut visit: F) -> EclResult<()>
    where
        F: FnMut(EclType, &[u8]),
    {
        let element_size = header.ecl_type.element_size();
        if element_size == 0 || header.count == 0 {
            return Ok(());
        }

        let mut remaining = header.count;
        let mut payload = Vec::new();
        while remaining > 0 {
            let in_block = remaining.min(header.ecl_type.block_size());
            let block_bytes = in_block * element_size;

            let lead = self.read_marker()?;
            if lead != block_bytes {
                return Err(EclError::invalid(
                    self.offset,
                    format!(
                        "block marker {} for {} (expected {})",
                        lead, header.keyword, block_bytes
                    ),
                ));
            }

            payload.resize(block_bytes, 0);
            self.read_exact(&mut payload)?;
            visit(header.ecl_type, &payload);

            let trail = self.read_marker()?;
            if trail != block_bytes {
                return Err(EclError::invalid(
                    self.offset,
                    format!("trailing block marker {} for {}", trail, header.keyword),
                ));
            }
            remaining -= in_block;
        }
        Ok(())
    }

    fn read_marker(&mut self) -> EclResult<usize> {
        let mut raw = [0u8; 4];
        self.read_exact(&mut raw)?;
        let value = i32::from_be_bytes(raw);
        usize::try_from(value)
            .map_err(|_| EclError::invalid(self.offset, format!("negative block marker {}", value)))
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> EclResult<()> {
        let start = self.offset;
        let filled = self.fill(buf)?;
        if filled < buf.len() {
            return Err(EclError::Truncated {
                offset: start,
                expected: buf.len(),
                found: filled,
            });
        }
        Ok(())
    }

    /// Read until `buf` is full or the stream ends; returns bytes read.
    fn fill(&mut self, buf: &mut [u8]) -> EclResult<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        self.offset += filled as u64;
        Ok(filled)
    }
}

/// Storage for a record's values. The header count is untrusted, so at
/// most one block is reserved up front; the vector grows as blocks are
/// read and validated.
fn empty_array(header: &RecordHeader) -> EclArray {
    let n = header.count.min(header.ecl_type.block_size());
    match header.ecl_type {
        EclType::Inte => EclArray::Int(Vec::with_capacity(n)),
        EclType::Real => EclArray::Real(Vec::with_capacity(n)),
        EclType::Doub => EclArray::Double(Vec::with_capacity(n)),
        EclType::Logi => EclArray::Logical(Vec::with_capacity(n)),
        EclType::Char => EclArray::Char(Vec::with_capacity(n)),
        EclType::Str(width) => EclArray::Str {
            width,
            values: Vec::with_capacity(n),
        },
        EclType::Mess => EclArray::Message,
    }
}

/// Read every record of a keyword file.
pub fn read_records(path: impl AsRef<Path>) -> EclResult<Vec<KeywordRecord>> {
    EclReader::open(path)?.read_records()
}

/// Read the first record named `keyword` (case-insensitive).
pub fn read_keyword(path: impl AsRef<Path>, keyword: &str) -> EclResult<EclArray> {
    let mut reader = EclReader::open(path)?;
    while let Some(header) = reader.next_header()? {
        if header.keyword.eq_ignore_ascii_case(keyword) {
            return reader.read_array();
        }
    }
    Err(EclError::KeywordNotFound(keyword.to_string()))
}
