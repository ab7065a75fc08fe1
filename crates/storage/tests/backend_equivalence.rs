//! The file and memory backends must behave the same for the same calls.

use ens_common::RealizationState;
use ndarray::Array3;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use storage::{
    EnsembleParams, FileTreeBackend, LocalEnsemble, LocalStorage, MemoryBackend, StorageBackend,
    StorageError,
};
use test_utils::{assert_fields_eq, porosity_field, shapes};

/// Outcome of one step, reduced to something comparable across backends.
#[derive(Debug, PartialEq)]
enum Step {
    Ok,
    Bool(bool),
    State(RealizationState),
    Field(Vec<u32>),
    Bytes(Vec<u8>),
    Err(&'static str),
}

fn err_kind(err: &StorageError) -> &'static str {
    match err {
        StorageError::AlreadyExists { .. } => "already-exists",
        StorageError::IndexExists(_) => "index-exists",
        StorageError::RealizationOutOfRange { .. } => "out-of-range",
        StorageError::NotFound(_) => "not-found",
        StorageError::MissingParent(_) => "missing-parent",
        _ => "other",
    }
}

fn step<T>(result: Result<T, StorageError>, ok: impl FnOnce(T) -> Step) -> Step {
    match result {
        Ok(value) => ok(value),
        Err(e) => Step::Err(err_kind(&e)),
    }
}

/// Overwrite a blob and record what readers see while the writer is open
/// and after it commits.
fn replace_blob(backend: &dyn StorageBackend, dir: &Path) -> Step {
    let blob = dir.join("blob.bin");
    let names = |backend: &dyn StorageBackend| -> String {
        backend
            .list(dir)
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(",")
    };

    backend.mkdir(dir).unwrap();
    backend.write_all(&blob, b"old").unwrap();
    let mut writer = backend.open_scoped_write(&blob).unwrap();
    writer.write_all(b"new").unwrap();
    let before = backend.read(&blob).unwrap();
    let listed = names(backend);
    writer.finish().unwrap();
    let after = backend.read(&blob).unwrap();

    let mut seen = before.to_vec();
    seen.extend_from_slice(format!("|{}|", listed).as_bytes());
    seen.extend_from_slice(&after);
    Step::Bytes(seen)
}

fn run_sequence(backend: Arc<dyn StorageBackend>, root: &Path, surface_file: &Path) -> Vec<Step> {
    let field = porosity_field(shapes::SMALL);
    let ens_path = root.join("ens");
    let mut params = EnsembleParams::new("prior", 3);
    params.id = uuid::Uuid::nil();
    let ensemble = LocalEnsemble::create(backend.clone(), &ens_path, params.clone()).unwrap();
    let bits = |a: Array3<f32>| Step::Field(a.iter().map(|v| v.to_bits()).collect());

    vec![
        step(LocalEnsemble::create(backend.clone(), &ens_path, params).map(|_| ()), |_| Step::Ok),
        step(ensemble.field_has_data("PORO", 0), Step::Bool),
        step(ensemble.save_field("PORO", 0, &field), |_| Step::Ok),
        step(ensemble.field_has_data("PORO", 0), Step::Bool),
        step(ensemble.save_field("PORO", 0, &field), |_| Step::Ok),
        step(ensemble.load_field("PORO", 0), bits),
        step(ensemble.load_field("PORO", 1), bits),
        step(ensemble.save_field("PORO", 3, &field), |_| Step::Ok),
        step(ensemble.save_surface_file("TOP", 1, surface_file), |_| Step::Ok),
        step(ensemble.has_surface_data("TOP", 1), Step::Bool),
        step(ensemble.load_surface("TOP", 1), |b| Step::Bytes(b.to_vec())),
        step(ensemble.set_state(0, RealizationState::HasData), |_| Step::Ok),
        step(ensemble.set_state(2, RealizationState::LoadFailure), |_| Step::Ok),
        step(
            LocalEnsemble::open(backend.clone(), &ens_path).and_then(|e| e.get_state(0)),
            Step::State,
        ),
        step(
            LocalEnsemble::open(backend.clone(), &ens_path).and_then(|e| e.get_state(2)),
            Step::State,
        ),
        step(backend.read(&ens_path.join("missing.json")), |b| Step::Bytes(b.to_vec())),
        step(backend.write_all(&ens_path.join("no/such/dir"), b"x"), |_| Step::Ok),
        step(backend.list(&ens_path), |children| {
            Step::Bytes(
                children
                    .iter()
                    .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
                    .collect::<Vec<_>>()
                    .join(",")
                    .into_bytes(),
            )
        }),
        replace_blob(backend.as_ref(), &root.join("scratch")),
    ]
}

#[test]
fn test_backends_agree() {
    let scratch = tempfile::tempdir().unwrap();
    let surface_file = scratch.path().join("top.irap");
    std::fs::write(&surface_file, b"-996 2 50.0 50.0").unwrap();

    let file_root = scratch.path().join("file-root");
    std::fs::create_dir(&file_root).unwrap();
    let on_disk = run_sequence(Arc::new(FileTreeBackend::new()), &file_root, &surface_file);
    let in_memory = run_sequence(
        Arc::new(MemoryBackend::new()),
        Path::new("/memory-root"),
        &surface_file,
    );

    assert_eq!(on_disk, in_memory);
    assert_eq!(on_disk[0], Step::Err("index-exists"));
    assert_eq!(on_disk[1], Step::Bool(false));
    assert_eq!(on_disk[3], Step::Bool(true));
    assert_eq!(on_disk[4], Step::Err("already-exists"));
    assert_eq!(on_disk[6], Step::Err("not-found"));
    assert_eq!(on_disk[7], Step::Err("out-of-range"));
    assert_eq!(on_disk[13], Step::State(RealizationState::HasData));
    assert_eq!(on_disk[16], Step::Err("missing-parent"));
    assert_eq!(on_disk[18], Step::Bytes(b"old|blob.bin|new".to_vec()));
}

#[test]
fn test_file_backend_layout() {
    let scratch = tempfile::tempdir().unwrap();
    let storage = LocalStorage::open(Arc::new(FileTreeBackend::new()), scratch.path()).unwrap();
    let ensemble = storage
        .create_ensemble(uuid::Uuid::new_v4(), "prior", 2, 0, None)
        .unwrap();
    let field = porosity_field(shapes::SMALL);
    ensemble.save_field("PORO", 1, &field).unwrap();

    let ens_dir = scratch
        .path()
        .join("ensembles")
        .join(ensemble.id().to_string());
    assert!(ens_dir.join("index.json").is_file());
    assert!(ens_dir.join("state_map.json").is_file());
    assert!(ens_dir.join("realization-1/PORO.field").is_file());

    let states: Vec<String> =
        serde_json::from_slice(&std::fs::read(ens_dir.join("state_map.json")).unwrap()).unwrap();
    assert_eq!(states, vec!["UNDEFINED", "UNDEFINED"]);

    let reopened = storage.open_ensemble(ensemble.id()).unwrap();
    assert_fields_eq!(&reopened.load_field("PORO", 1).unwrap(), &field);
}

#[test]
fn test_concurrent_saves_to_distinct_realizations() {
    let storage = LocalStorage::open(Arc::new(MemoryBackend::new()), Path::new("/s")).unwrap();
    let ensemble = Arc::new(
        storage
            .create_ensemble(uuid::Uuid::new_v4(), "prior", 8, 0, None)
            .unwrap(),
    );

    std::thread::scope(|scope| {
        for iens in 0..8 {
            let ensemble = Arc::clone(&ensemble);
            scope.spawn(move || {
                let field = Array3::from_elem((2, 2, 2), iens as f32);
                ensemble.save_field("PORO", iens, &field).unwrap();
                ensemble.set_state(iens, RealizationState::HasData).unwrap();
            });
        }
    });

    let reopened = storage.open_ensemble(ensemble.id()).unwrap();
    assert_eq!(
        reopened.state_map().realizations_in(RealizationState::HasData),
        (0..8).collect::<Vec<_>>()
    );
    for iens in 0..8 {
        assert_eq!(reopened.load_field("PORO", iens).unwrap()[[1, 1, 1]], iens as f32);
    }
}
