//! Grid-file driven tests for mask reading and masked field loading.

use ecl_parser::EclError;
use ens_common::GridShape;
use field_loader::{
    mask_data, read_active_mask, read_masked_field, FieldError, GridMaskReader,
};
use test_utils::{
    active_values, assert_fields_eq, checkerboard_actnum, inactive_layer_actnum, sequential_field,
    shapes, write_binary_values, write_grdecl_field, write_grdecl_values, GridFileBuilder,
    ShapeRecord,
};

#[test]
fn test_actnum_all_ones_is_all_active() {
    let dir = tempfile::tempdir().unwrap();
    let grid = GridFileBuilder::new(shapes::SMALL)
        .actnum(vec![true; shapes::SMALL.len()])
        .write(dir.path().join("CASE.EGRID"));

    let (active, shape) = read_active_mask(&grid, None).unwrap();
    assert_eq!(shape, shapes::SMALL);
    assert_eq!(active.active_count(), shapes::SMALL.len());
}

#[test]
fn test_coords_flag_marks_single_cell() {
    let dir = tempfile::tempdir().unwrap();
    let shape = shapes::SMALL;
    let mut flags = vec![true; shape.len()];
    flags[shape.flat_index(2, 1, 1)] = false;
    let grid = GridFileBuilder::new(shape)
        .coords(flags)
        .write(dir.path().join("CASE.EGRID"));

    let (active, _) = read_active_mask(&grid, None).unwrap();
    for (idx, &is_active) in active.as_array().indexed_iter() {
        assert_eq!(is_active, idx != (2, 1, 1), "cell {:?}", idx);
    }
}

#[test]
fn test_gridhead_beats_earlier_dimens() {
    let dir = tempfile::tempdir().unwrap();
    let wrong = GridShape::new(7, 7, 7).unwrap();
    let grid = GridFileBuilder::new(shapes::SMALL)
        .shape_record(ShapeRecord::DimensThenGridhead(wrong))
        .write(dir.path().join("CASE.EGRID"));

    let (_, shape) = read_active_mask(&grid, None).unwrap();
    assert_eq!(shape, shapes::SMALL);
}

#[test]
fn test_missing_shape_needs_caller_shape() {
    let dir = tempfile::tempdir().unwrap();
    let grid = GridFileBuilder::new(shapes::COLUMN)
        .shape_record(ShapeRecord::None)
        .write(dir.path().join("CASE.EGRID"));

    assert!(matches!(
        read_active_mask(&grid, None),
        Err(FieldError::MissingShape(_))
    ));

    let (active, shape) = read_active_mask(&grid, Some(shapes::COLUMN)).unwrap();
    assert_eq!(shape, shapes::COLUMN);
    assert_eq!(active.active_count(), 5);
}

#[test]
fn test_caller_shape_overrides_file() {
    let dir = tempfile::tempdir().unwrap();
    let grid = GridFileBuilder::new(shapes::SMALL).write(dir.path().join("CASE.EGRID"));
    let override_shape = GridShape::new(2, 2, 2).unwrap();

    let (_, shape) = read_active_mask(&grid, Some(override_shape)).unwrap();
    assert_eq!(shape, override_shape);
}

#[test]
fn test_masked_grdecl_load_sets_inactive_to_nan() {
    let dir = tempfile::tempdir().unwrap();
    let shape = shapes::SMALL;
    let flags = checkerboard_actnum(shape);
    let grid = GridFileBuilder::new(shape)
        .actnum(flags.clone())
        .write(dir.path().join("CASE.EGRID"));
    let source = sequential_field(shape);
    let data_file = dir.path().join("poro.grdecl");
    write_grdecl_field(&data_file, "PORO", &source);

    let loaded = read_masked_field(&data_file, "PORO", &grid, None).unwrap();

    assert_eq!(GridShape::of(&loaded), shape);
    for (n, &active) in flags.iter().enumerate() {
        let (i, j, k) = shape.unflatten(n);
        if active {
            assert_eq!(loaded[[i, j, k]], n as f32);
        } else {
            assert!(loaded[[i, j, k]].is_nan());
        }
    }
}

#[test]
fn test_active_only_binary_field_is_scattered() {
    let dir = tempfile::tempdir().unwrap();
    let shape = shapes::MULTI_BLOCK;
    let flags = inactive_layer_actnum(shape, 3);
    let grid = GridFileBuilder::new(shape)
        .actnum(flags.clone())
        .write(dir.path().join("CASE.EGRID"));
    let source = sequential_field(shape);
    let data_file = dir.path().join("PERMX.INC");
    write_binary_values(&data_file, "PERMX", &active_values(&source, &flags));

    let loaded = read_masked_field(&data_file, "permx", &grid, None).unwrap();

    let mut expected = source.clone();
    for (n, &active) in flags.iter().enumerate() {
        if !active {
            let (i, j, k) = shape.unflatten(n);
            expected[[i, j, k]] = f32::NAN;
        }
    }
    assert_fields_eq!(&loaded, &expected);
}

#[test]
fn test_wrong_value_count_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let grid = GridFileBuilder::new(shapes::SMALL).write(dir.path().join("CASE.EGRID"));
    let data_file = dir.path().join("poro.grdecl");
    write_grdecl_values(&data_file, "PORO", &[0.1; 5]);

    assert!(matches!(
        read_masked_field(&data_file, "PORO", &grid, None),
        Err(FieldError::FieldSize { found: 5, .. })
    ));
}

#[test]
fn test_repeat_count_beyond_grid_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let grid = GridFileBuilder::new(shapes::SMALL).write(dir.path().join("CASE.EGRID"));
    let data_file = dir.path().join("poro.grdecl");
    std::fs::write(&data_file, "PORO\n 2147483647*0.25 /\n").unwrap();

    assert!(matches!(
        read_masked_field(&data_file, "PORO", &grid, None),
        Err(FieldError::Ecl(EclError::Grdecl { .. }))
    ));
}

#[test]
fn test_roff_field_is_unsupported() {
    let dir = tempfile::tempdir().unwrap();
    let grid = GridFileBuilder::new(shapes::SMALL).write(dir.path().join("CASE.EGRID"));
    let data_file = dir.path().join("poro.roff");
    std::fs::write(&data_file, b"roff-bin").unwrap();

    assert!(matches!(
        read_masked_field(&data_file, "PORO", &grid, None),
        Err(FieldError::UnsupportedFormat("ROFF"))
    ));
}

#[test]
fn test_mask_data_uses_inactive_polarity() {
    let dir = tempfile::tempdir().unwrap();
    let shape = shapes::SMALL;
    let flags = checkerboard_actnum(shape);
    let grid = GridFileBuilder::new(shape)
        .actnum(flags.clone())
        .write(dir.path().join("CASE.EGRID"));

    let masked = mask_data(sequential_field(shape), &grid, None).unwrap();

    assert_eq!(masked.mask().masked_count(), shape.len() / 2);
    let (i, j, k) = shape.unflatten(1);
    assert!(masked.mask().is_masked(i, j, k));
    assert!(masked.filled()[[i, j, k]].is_nan());
    assert_eq!(masked.data()[[i, j, k]], 1.0);

    let wrong = ndarray::Array3::zeros((1, 1, 1));
    assert!(matches!(
        mask_data(wrong, &grid, None),
        Err(FieldError::ShapeMismatch { .. })
    ));
}

#[test]
fn test_cached_reader_matches_uncached() {
    let dir = tempfile::tempdir().unwrap();
    let shape = shapes::SMALL;
    let grid = GridFileBuilder::new(shape)
        .actnum(checkerboard_actnum(shape))
        .write(dir.path().join("CASE.EGRID"));
    let data_file = dir.path().join("poro.grdecl");
    write_grdecl_field(&data_file, "PORO", &sequential_field(shape));

    let reader = GridMaskReader::new();
    let cached = reader
        .read_masked_field(&data_file, "PORO", &grid, None)
        .unwrap();
    let again = reader
        .read_masked_field(&data_file, "PORO", &grid, None)
        .unwrap();
    let uncached = read_masked_field(&data_file, "PORO", &grid, None).unwrap();

    assert_fields_eq!(&cached, &uncached);
    assert_fields_eq!(&again, &uncached);
    assert_eq!(reader.stats().misses, 1);
    assert_eq!(reader.stats().hits, 1);
}

#[test]
fn test_cached_reader_shared_across_threads() {
    let dir = tempfile::tempdir().unwrap();
    let grid = GridFileBuilder::new(shapes::SMALL)
        .actnum(checkerboard_actnum(shapes::SMALL))
        .write(dir.path().join("CASE.EGRID"));
    let reader = std::sync::Arc::new(GridMaskReader::new());

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let reader = reader.clone();
            let grid = grid.clone();
            std::thread::spawn(move || reader.get(&grid, None).unwrap().active.active_count())
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), 12);
    }
    assert_eq!(reader.len(), 1);
}
