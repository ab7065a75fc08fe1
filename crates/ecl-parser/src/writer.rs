//! Writer for binary keyword streams.

use bytes::{BufMut, BytesMut};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::{EclError, EclResult};
use crate::types::EclArray;

/// Writes keyword records in the blocked big-endian layout read by
/// [`crate::EclReader`].
pub struct EclWriter<W: Write> {
    inner: W,
}

impl EclWriter<BufWriter<File>> {
    /// Create (or truncate) a keyword file.
    pub fn create(path: impl AsRef<Path>) -> EclResult<Self> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|source| EclError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> EclWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Append one record.
    pub fn write_record(&mut self, keyword: &str, array: &EclArray) -> EclResult<()> {
        if keyword.len() > 8 || !keyword.is_ascii() {
            return Err(EclError::InvalidKeyword(keyword.to_string()));
        }

        let ecl_type = array.ecl_type();
        let mut header = BytesMut::with_capacity(24);
        header.put_i32(16);
        header.put_slice(format!("{:<8}", keyword).as_bytes());
        header.put_i32(array.len() as i32);
        header.put_slice(ecl_type.tag().as_bytes());
        header.put_i32(16);
        self.inner.write_all(&header)?;

        let element_size = ecl_type.element_size();
        if element_size == 0 {
            return Ok(());
        }

        let block_size = ecl_type.block_size();
        let mut start = 0;
        while start < array.len() {
            let end = (start + block_size).min(array.len());
            let block_bytes = (end - start) * element_size;
            let mut block = BytesMut::with_capacity(block_bytes + 8);
            block.put_i32(block_bytes as i32);
            encode_range(&mut block, array, start..end);
            block.put_i32(block_bytes as i32);
            self.inner.write_all(&block)?;
            start = end;
        }
        Ok(())
    }

    /// Flush and return the underlying writer.
    pub fn finish(mut self) -> EclResult<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }

    /// Return the underlying writer without flushing.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

fn encode_range(block: &mut BytesMut, array: &EclArray, range: std::ops::Range<usize>) {
    match array {
        EclArray::Int(v) => v[range].iter().for_each(|&x| block.put_i32(x)),
        EclArray::Real(v) => v[range].iter().for_each(|&x| block.put_f32(x)),
        EclArray::Double(v) => v[range].iter().for_each(|&x| block.put_f64(x)),
        EclArray::Logical(v) => v[range]
            .iter()
            .for_each(|&b| block.put_i32(if b { -1 } else { 0 })),
        EclArray::Char(v) => v[range]
            .iter()
            .for_each(|s| put_padded(block, s, 8)),
        EclArray::Str { width, values } => values[range]
            .iter()
            .for_each(|s| put_padded(block, s, *width)),
        EclArray::Message => {}
    }
}

fn put_padded(block: &mut BytesMut, value: &str, width: usize) {
    let bytes = value.as_bytes();
    let n = bytes.len().min(width);
    block.put_slice(&bytes[..n]);
    block.put_bytes(b' ', width - n);
}
