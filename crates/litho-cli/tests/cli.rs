//! Drives the `litho` binary.

use std::path::Path;
use std::process::Command;

use approx::assert_relative_eq;
use image::{Rgba, RgbaImage};
use litho_booleans::{BooleanComposer, ExternalEngine, FeatureMesh};
use litho_mesh::{load_stl, save_stl, validate_mesh, Point3, TriangleMesh};
use litho_pipeline::CancellationToken;

fn litho() -> Command {
    Command::new(env!("CARGO_BIN_EXE_litho"))
}

fn write_image(path: &Path) {
    let image = RgbaImage::from_fn(12, 8, |x, _| {
        let v = (x * 20) as u8;
        Rgba([v, v, v, 255])
    });
    image.save(path).unwrap();
}

#[test]
fn test_external_engine_matches_in_process() {
    let base = TriangleMesh::cuboid(Point3::origin(), Point3::new(10.0, 10.0, 2.0));
    let features = vec![
        FeatureMesh::subtractive(
            "Hole",
            TriangleMesh::cuboid(Point3::new(3.0, 3.0, -1.0), Point3::new(5.0, 5.0, 3.0)),
        ),
        FeatureMesh::additive(
            "Stand",
            TriangleMesh::cuboid(Point3::new(0.0, -3.0, 0.0), Point3::new(10.0, 1.0, 1.0)),
        ),
    ];
    let cancel = CancellationToken::new();

    let engine = ExternalEngine::new(env!("CARGO_BIN_EXE_litho")).with_batch_args(["engine"]);
    let external = BooleanComposer::new(Box::new(engine))
        .compose(&base, &features, &cancel)
        .unwrap();
    let in_process = BooleanComposer::in_process()
        .compose(&base, &features, &cancel)
        .unwrap();

    assert!(external.bounds().approx_eq(&in_process.bounds(), 1e-4));
    assert!(validate_mesh(&external).is_printable());
    assert_eq!(external.num_triangles(), in_process.num_triangles());
    assert_relative_eq!(
        external.signed_volume(),
        in_process.signed_volume(),
        epsilon = 1e-3
    );
}

#[test]
fn test_box_with_subtracted_feature() {
    let dir = tempfile::tempdir().unwrap();
    let image = dir.path().join("panel.png");
    let hole = dir.path().join("hole.stl");
    let output = dir.path().join("panel.stl");
    write_image(&image);
    save_stl(
        &TriangleMesh::cuboid(Point3::new(2.0, 2.0, -1.0), Point3::new(4.0, 4.0, 5.0)),
        &hole,
    )
    .unwrap();

    let status = litho()
        .arg("box")
        .arg(&image)
        .arg("-o")
        .arg(&output)
        .args(["--ppi", "25.4", "--nozzle-size", "0", "--layer-height", "0"])
        .arg("--subtract")
        .arg(&hole)
        .current_dir(dir.path())
        .status()
        .unwrap();
    assert!(status.success());

    let mesh = load_stl(&output).unwrap();
    let bounds = mesh.bounds();
    assert_relative_eq!(bounds.length(), 11.0, epsilon = 1e-4);
    assert_relative_eq!(bounds.width(), 7.0, epsilon = 1e-4);
    let report = validate_mesh(&mesh);
    assert!(report.is_printable(), "{report}");
}

#[test]
fn test_tube_default_output_name() {
    let dir = tempfile::tempdir().unwrap();
    let image = dir.path().join("mug.png");
    write_image(&image);

    let status = litho()
        .arg("tube")
        .arg(&image)
        .args(["--ppi", "25.4", "--nozzle-size", "0"])
        .current_dir(dir.path())
        .status()
        .unwrap();
    assert!(status.success());

    let mesh = load_stl(dir.path().join("mug_Result.stl")).unwrap();
    assert!(validate_mesh(&mesh).is_watertight());
}

#[test]
fn test_import_then_measure() {
    let dir = tempfile::tempdir().unwrap();
    let image = dir.path().join("photo.png");
    let state = dir.path().join("photo.json");
    let output = dir.path().join("photo.stl");
    write_image(&image);

    let status = litho()
        .arg("import")
        .arg(&image)
        .args(["--ppi", "25.4", "--nozzle-size", "0", "--layer-height", "0"])
        .current_dir(dir.path())
        .status()
        .unwrap();
    assert!(status.success());
    assert!(state.is_file());

    // The image is no longer needed once the state is saved
    std::fs::remove_file(&image).unwrap();
    let status = litho()
        .arg("box")
        .arg(&state)
        .arg("-o")
        .arg(&output)
        .current_dir(dir.path())
        .status()
        .unwrap();
    assert!(status.success());

    let out = litho()
        .arg("measure")
        .arg(&output)
        .args(["--unit", "cm", "--decimals", "1"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8(out.stdout).unwrap();
    assert!(stdout.contains("Length (X): 1.1 cm"));
    assert!(stdout.contains("Width (Y): 0.7 cm"));
}

#[test]
fn test_external_backend_without_engine_fails() {
    let dir = tempfile::tempdir().unwrap();
    let image = dir.path().join("panel.png");
    write_image(&image);

    let status = litho()
        .arg("box")
        .arg(&image)
        .args(["--backend", "external"])
        .current_dir(dir.path())
        .status()
        .unwrap();
    assert!(!status.success());
}
