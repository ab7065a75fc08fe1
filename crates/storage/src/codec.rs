//! Binary encoding of field blobs.
//!
//! Layout (little-endian): magic `ENSF`, version `u32`, `nx, ny, nz` as
//! `u32`, then `nx * ny * nz` `f32` values in column-major order.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use ens_common::{fortran_values, GridShape};
use ndarray::Array3;

use crate::error::{StorageError, StorageResult};

const MAGIC: &[u8; 4] = b"ENSF";
const VERSION: u32 = 1;
const HEADER_LEN: usize = 4 + 4 + 3 * 4;

pub fn encode_field(array: &Array3<f32>) -> Bytes {
    let (nx, ny, nz) = array.dim();
    let mut buf = BytesMut::with_capacity(HEADER_LEN + array.len() * 4);
    buf.put_slice(MAGIC);
    buf.put_u32_le(VERSION);
    buf.put_u32_le(nx as u32);
    buf.put_u32_le(ny as u32);
    buf.put_u32_le(nz as u32);
    for value in fortran_values(array) {
        buf.put_f32_le(value);
    }
    buf.freeze()
}

pub fn decode_field(data: &[u8]) -> StorageResult<Array3<f32>> {
    if data.len() < HEADER_LEN {
        return Err(StorageError::Codec(format!(
            "field blob has {} bytes, header needs {}",
            data.len(),
            HEADER_LEN
        )));
    }
    let mut buf = data;
    if &buf[..4] != MAGIC {
        return Err(StorageError::Codec("bad field blob magic".to_string()));
    }
    buf.advance(4);

    let version = buf.get_u32_le();
    if version != VERSION {
        return Err(StorageError::Codec(format!(
            "unsupported field blob version {}",
            version
        )));
    }

    let shape = GridShape::new(
        buf.get_u32_le() as usize,
        buf.get_u32_le() as usize,
        buf.get_u32_le() as usize,
    )?;
    if buf.remaining() != shape.len() * 4 {
        return Err(StorageError::Codec(format!(
            "field blob for {} has {} value bytes, expected {}",
            shape,
            buf.remaining(),
            shape.len() * 4
        )));
    }

    let mut values = Vec::with_capacity(shape.len());
    while buf.has_remaining() {
        values.push(buf.get_f32_le());
    }
    Ok(shape.array_from_fortran(values)?)
}
