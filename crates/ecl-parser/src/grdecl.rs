//! GRDECL text property files.
//!
//! A GRDECL file is a sequence of keywords, each followed by whitespace
//! separated values and a terminating `/`. `--` starts a comment. Values may
//! use a repeat count, `N*value`.

use std::fs;
use std::io::Write;
use std::path::Path;

use crate::error::{EclError, EclResult};

const VALUES_PER_LINE: usize = 6;

/// Upper bound on the values of one keyword when the caller gives none.
pub const MAX_GRDECL_VALUES: usize = 1 << 28;

/// Read the values of `keyword` from a GRDECL file.
pub fn read_grdecl_keyword(path: impl AsRef<Path>, keyword: &str) -> EclResult<Vec<f32>> {
    read_grdecl_keyword_bounded(path, keyword, MAX_GRDECL_VALUES)
}

/// Like [`read_grdecl_keyword`], failing once the keyword expands to more
/// than `max_values` values.
pub fn read_grdecl_keyword_bounded(
    path: impl AsRef<Path>,
    keyword: &str,
    max_values: usize,
) -> EclResult<Vec<f32>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| EclError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    parse_grdecl_keyword_bounded(&content, keyword, max_values)
}

/// Parse the values of the first occurrence of `keyword` (case-insensitive).
pub fn parse_grdecl_keyword(content: &str, keyword: &str) -> EclResult<Vec<f32>> {
    parse_grdecl_keyword_bounded(content, keyword, MAX_GRDECL_VALUES)
}

/// Parse with an upper bound on the number of values. Repeat counts are
/// checked before they are expanded.
pub fn parse_grdecl_keyword_bounded(
    content: &str,
    keyword: &str,
    max_values: usize,
) -> EclResult<Vec<f32>> {
    let mut values = Vec::new();
    let mut found = false;

    for (line_no, raw_line) in content.lines().enumerate() {
        let line = match raw_line.find("--") {
            Some(pos) => &raw_line[..pos],
            None => raw_line,
        };

        for token in line.split_whitespace() {
            if !found {
                found = token.eq_ignore_ascii_case(keyword);
                continue;
            }

            let (value_part, terminated) = match token.find('/') {
                Some(pos) => (&token[..pos], true),
                None => (token, false),
            };
            if !value_part.is_empty() {
                push_value(&mut values, value_part, line_no + 1, max_values)?;
            }
            if terminated {
                return Ok(values);
            }
        }
    }

    if found {
        Err(EclError::Grdecl {
            line: content.lines().count(),
            reason: format!("keyword {} is not terminated by '/'", keyword),
        })
    } else {
        Err(EclError::KeywordNotFound(keyword.to_string()))
    }
}

fn push_value(values: &mut Vec<f32>, token: &str, line: usize, max: usize) -> EclResult<()> {
    let syntax = |reason: String| EclError::Grdecl { line, reason };
    let too_many = || syntax(format!("more than {} values", max));

    match token.split_once('*') {
        Some((count, value)) => {
            let count: usize = count
                .parse()
                .map_err(|_| syntax(format!("invalid repeat count in {:?}", token)))?;
            if value.is_empty() {
                return Err(syntax(format!(
                    "defaulted values ({:?}) are not supported for properties",
                    token
                )));
            }
            let value: f32 = value
                .parse()
                .map_err(|_| syntax(format!("invalid number {:?}", value)))?;
            if count > max - values.len() {
                return Err(too_many());
            }
            values.extend(std::iter::repeat(value).take(count));
        }
        None => {
            let value: f32 = token
                .parse()
                .map_err(|_| syntax(format!("invalid number {:?}", token)))?;
            if values.len() >= max {
                return Err(too_many());
            }
            values.push(value);
        }
    }
    Ok(())
}

/// Write one keyword with its values and terminator.
pub fn write_grdecl_keyword<W: Write>(
    writer: &mut W,
    keyword: &str,
    values: &[f32],
) -> EclResult<()> {
    writeln!(writer, "{}", keyword)?;
    for line in values.chunks(VALUES_PER_LINE) {
        let formatted: Vec<String> = line.iter().map(|v| format!("{}", v)).collect();
        writeln!(writer, "  {}", formatted.join(" "))?;
    }
    writeln!(writer, "/")?;
    Ok(())
}
