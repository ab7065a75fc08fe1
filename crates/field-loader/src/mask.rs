//! Active-cell masks read from grid files, with a process-wide cache.
//!
//! The grid file is scanned record by record and only the records that
//! carry dimensions or cell activity are decoded.

use dashmap::DashMap;
use ecl_parser::{EclArray, EclReader};
use ens_common::{ActiveMask, GridShape, InactiveMask};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{FieldError, FieldResult};

/// Offset of the activity flag inside a COORDS record.
const COORDS_ACTIVE_FLAG: usize = 4;

/// Cell activity of one grid together with its resolved dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct GridMask {
    pub active: ActiveMask,
    pub shape: GridShape,
}

impl GridMask {
    pub fn inactive(&self) -> InactiveMask {
        self.active.to_inactive()
    }
}

/// What the scan found before it stopped.
#[derive(Default)]
struct GridScan {
    gridhead: Option<GridShape>,
    dimens: Option<GridShape>,
    actnum: Option<Vec<bool>>,
    /// 1-based coordinates of cells flagged inactive by COORDS records.
    inactive_coords: Vec<(i64, i64, i64)>,
}

impl GridScan {
    fn shape(&self) -> Option<GridShape> {
        self.gridhead.or(self.dimens)
    }

    fn complete(&self) -> bool {
        self.actnum.is_some() && self.shape().is_some()
    }
}

fn scan_grid(path: &Path) -> FieldResult<GridScan> {
    let invalid = |reason: String| FieldError::InvalidGrid {
        path: path.to_path_buf(),
        reason,
    };
    let shape_at = |array: &EclArray, offsets: [usize; 3], keyword: &str| -> FieldResult<GridShape> {
        match offsets.map(|o| array.int_at(o)) {
            [Some(nx), Some(ny), Some(nz)] => Ok(GridShape::from_signed(nx, ny, nz)?),
            _ => Err(invalid(format!("{} record is too short", keyword))),
        }
    };

    let mut reader = EclReader::open(path)?;
    let mut scan = GridScan::default();

    while let Some(header) = reader.next_header()? {
        match header.keyword.as_str() {
            "GRIDHEAD" if scan.gridhead.is_none() => {
                let array = reader.read_array()?;
                scan.gridhead = Some(shape_at(&array, [1, 2, 3], "GRIDHEAD")?);
            }
            "DIMENS" if scan.dimens.is_none() => {
                let array = reader.read_array()?;
                scan.dimens = Some(shape_at(&array, [0, 1, 2], "DIMENS")?);
            }
            "ACTNUM" if scan.actnum.is_none() => {
                let flags = reader
                    .read_array()?
                    .to_flags()
                    .ok_or_else(|| invalid("ACTNUM is not integer data".to_string()))?;
                scan.actnum = Some(flags);
            }
            "COORDS" => {
                let array = reader.read_array()?;
                let fields: Vec<i64> = (0..=COORDS_ACTIVE_FLAG)
                    .map(|o| array.int_at(o))
                    .collect::<Option<_>>()
                    .ok_or_else(|| invalid("COORDS record is too short".to_string()))?;
                if fields[COORDS_ACTIVE_FLAG] == 0 {
                    scan.inactive_coords.push((fields[0], fields[1], fields[2]));
                }
            }
            _ => {}
        }

        if scan.complete() {
            debug!(path = %path.display(), offset = reader.offset(), "Grid mask and shape found, stopping scan");
            break;
        }
    }

    Ok(scan)
}

/// Read the mask of cells to exclude from a grid file.
///
/// `shape`, when given, overrides the dimensions recorded in the file.
pub fn read_inactive_mask(
    grid_file: &Path,
    shape: Option<GridShape>,
) -> FieldResult<(InactiveMask, GridShape)> {
    let scan = scan_grid(grid_file)?;
    let shape = shape
        .or(scan.shape())
        .ok_or_else(|| FieldError::MissingShape(grid_file.to_path_buf()))?;

    let mask = if let Some(actnum) = scan.actnum {
        if actnum.len() != shape.len() {
            return Err(FieldError::InvalidGrid {
                path: grid_file.to_path_buf(),
                reason: format!(
                    "ACTNUM has {} values but grid {} has {} cells",
                    actnum.len(),
                    shape,
                    shape.len()
                ),
            });
        }
        InactiveMask::from_fortran_flags(shape, actnum.into_iter().map(|a| !a).collect())?
    } else {
        let mut mask = InactiveMask::none(shape);
        for (i, j, k) in scan.inactive_coords {
            let (ci, cj, ck) = zero_based(i, j, k, shape)?;
            mask.set(ci, cj, ck, true);
        }
        mask
    };

    Ok((mask, shape))
}

/// Read the active-cell mask of a grid file. See [`read_inactive_mask`].
pub fn read_active_mask(
    grid_file: &Path,
    shape: Option<GridShape>,
) -> FieldResult<(ActiveMask, GridShape)> {
    let (inactive, shape) = read_inactive_mask(grid_file, shape)?;
    Ok((inactive.to_active(), shape))
}

fn zero_based(i: i64, j: i64, k: i64, shape: GridShape) -> FieldResult<(usize, usize, usize)> {
    let out_of_bounds = || FieldError::CoordinateOutOfBounds { i, j, k, shape };
    let conv = |v: i64| usize::try_from(v - 1).map_err(|_| out_of_bounds());
    let (ci, cj, ck) = (conv(i)?, conv(j)?, conv(k)?);
    if !shape.contains(ci, cj, ck) {
        return Err(out_of_bounds());
    }
    Ok((ci, cj, ck))
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MaskKey {
    path: PathBuf,
    shape: Option<GridShape>,
}

/// Statistics for the grid mask cache
#[derive(Debug, Default, Clone)]
pub struct MaskCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

impl MaskCacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

/// Reads grid masks and keeps every result for the life of the process.
///
/// Grid files are assumed immutable while the process runs, so entries
/// are never invalidated. Concurrent readers of the same grid may both
/// miss; the first stored result wins and both receive it.
#[derive(Default)]
pub struct GridMaskReader {
    cache: DashMap<MaskKey, Arc<GridMask>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl GridMaskReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mask and shape of `grid_file`, read once per (path, shape) key.
    pub fn get(&self, grid_file: &Path, shape: Option<GridShape>) -> FieldResult<Arc<GridMask>> {
        let key = MaskKey {
            path: std::path::absolute(grid_file)?,
            shape,
        };

        if let Some(entry) = self.cache.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Arc::clone(entry.value()));
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let (active, resolved) = read_active_mask(&key.path, shape)?;
        info!(
            grid = %key.path.display(),
            shape = %resolved,
            active_cells = active.active_count(),
            "Read grid mask"
        );

        let mask = Arc::new(GridMask {
            active,
            shape: resolved,
        });
        let entry = self.cache.entry(key).or_insert(mask);
        Ok(Arc::clone(entry.value()))
    }

    pub fn stats(&self) -> MaskCacheStats {
        MaskCacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.cache.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ecl_parser::EclWriter;

    fn write_records(path: &Path, records: &[(&str, EclArray)]) {
        let mut writer = EclWriter::create(path).unwrap();
        for (keyword, array) in records {
            writer.write_record(keyword, array).unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn test_actnum_inverts_to_inactive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("GRID.EGRID");
        write_records(
            &path,
            &[
                ("GRIDHEAD", EclArray::Int(vec![1, 2, 1, 1])),
                ("ACTNUM", EclArray::Int(vec![1, 0])),
            ],
        );

        let (inactive, shape) = read_inactive_mask(&path, None).unwrap();
        assert_eq!(shape, GridShape::new(2, 1, 1).unwrap());
        assert!(!inactive.is_masked(0, 0, 0));
        assert!(inactive.is_masked(1, 0, 0));

        let (active, _) = read_active_mask(&path, None).unwrap();
        assert!(active.is_active(0, 0, 0));
        assert!(!active.is_active(1, 0, 0));
    }

    #[test]
    fn test_gridhead_wins_over_earlier_dimens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("GRID.EGRID");
        write_records(
            &path,
            &[
                ("DIMENS", EclArray::Int(vec![9, 9, 9])),
                ("GRIDHEAD", EclArray::Int(vec![1, 2, 3, 4])),
            ],
        );

        let (_, shape) = read_active_mask(&path, None).unwrap();
        assert_eq!(shape, GridShape::new(2, 3, 4).unwrap());
    }

    #[test]
    fn test_oversized_gridhead_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("GRID.EGRID");
        write_records(
            &path,
            &[
                ("GRIDHEAD", EclArray::Int(vec![1, 100_000, 100_000, 100_000])),
                ("ACTNUM", EclArray::Int(vec![1])),
            ],
        );

        assert!(matches!(
            read_inactive_mask(&path, None),
            Err(FieldError::Common(_))
        ));
    }

    #[test]
    fn test_coords_flag_zero_marks_inactive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("GRID.EGRID");
        write_records(
            &path,
            &[
                ("GRIDHEAD", EclArray::Int(vec![1, 2, 2, 1])),
                ("COORDS", EclArray::Int(vec![1, 1, 1, 1, 1])),
                ("COORDS", EclArray::Int(vec![2, 2, 1, 4, 0])),
            ],
        );

        let (active, _) = read_active_mask(&path, None).unwrap();
        assert!(active.is_active(0, 0, 0));
        assert!(!active.is_active(1, 1, 0));
        assert_eq!(active.active_count(), 3);
    }

    #[test]
    fn test_coords_out_of_bounds() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("GRID.EGRID");
        write_records(
            &path,
            &[
                ("GRIDHEAD", EclArray::Int(vec![1, 2, 2, 1])),
                ("COORDS", EclArray::Int(vec![3, 1, 1, 1, 0])),
            ],
        );

        let result = read_active_mask(&path, None);
        assert!(matches!(
            result,
            Err(FieldError::CoordinateOutOfBounds { i: 3, .. })
        ));
    }

    #[test]
    fn test_actnum_length_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("GRID.EGRID");
        write_records(
            &path,
            &[
                ("GRIDHEAD", EclArray::Int(vec![1, 2, 2, 1])),
                ("ACTNUM", EclArray::Int(vec![1, 1, 1])),
            ],
        );

        assert!(matches!(
            read_active_mask(&path, None),
            Err(FieldError::InvalidGrid { .. })
        ));
    }

    #[test]
    fn test_cache_counts_hits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("GRID.EGRID");
        write_records(&path, &[("DIMENS", EclArray::Int(vec![2, 2, 2]))]);

        let reader = GridMaskReader::new();
        let first = reader.get(&path, None).unwrap();
        let second = reader.get(&path, None).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let stats = reader.stats();
        assert_eq!((stats.hits, stats.misses, stats.entries), (1, 1, 1));
        assert_eq!(stats.hit_rate(), 50.0);
    }
}
