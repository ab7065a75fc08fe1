//! Reader and writer for simulator keyword files.
//!
//! Grid files (`.EGRID`, `.GRID`) and binary parameter files are Fortran
//! unformatted sequential files: a stream of big-endian records, each a
//! keyword header followed by a blocked data payload. The [`EclReader`]
//! walks the stream lazily so callers can stop once they have what they
//! need without decoding large payloads.
//!
//! The [`grdecl`] module handles the plain-text GRDECL variant used for
//! hand-written or exported property files.

pub mod error;
pub mod grdecl;
pub mod reader;
pub mod types;
pub mod writer;

pub use error::{EclError, EclResult};
pub use grdecl::{
    parse_grdecl_keyword, parse_grdecl_keyword_bounded, read_grdecl_keyword,
    read_grdecl_keyword_bounded, write_grdecl_keyword, MAX_GRDECL_VALUES,
};
pub use reader::{read_keyword, read_records, EclReader};
pub use types::{EclArray, EclType, KeywordRecord, RecordHeader};
pub use writer::EclWriter;
