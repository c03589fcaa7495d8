use approx::assert_relative_eq;
use flatcut::{
    prepare_step, run_batch, run_batch_with, BatchReport, CancellationToken, Config, ErrorKind,
    ExportTarget, FileOutcome, Units,
};
use flatcut_dxf::{build_outline, decode_entities, DxfDocument};
use flatcut_math::{Axis, Point2, Rigid2};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../flatcut-step/tests/fixtures")
        .join(name)
}

fn mm_config() -> Config {
    Config {
        units: Units::Mm,
        ..Default::default()
    }
}

/// A closed 40 x 10 rectangle turned by 20 degrees.
fn tilted_rectangle_dxf() -> String {
    let tilt = Rigid2::rotation(20f64.to_radians());
    let mut body = String::from("  0\nLWPOLYLINE\n  5\n40\n  8\n0\n 90\n4\n 70\n1\n");
    for (x, y) in [(0.0, 0.0), (40.0, 0.0), (40.0, 10.0), (0.0, 10.0)] {
        let p = tilt.apply_point(&Point2::new(x, y));
        body.push_str(&format!(" 10\n{}\n 20\n{}\n", p.x, p.y));
    }
    format!("  0\nSECTION\n  2\nENTITIES\n{body}  0\nENDSEC\n  0\nEOF\n")
}

fn outcome_of<'a>(report: &'a BatchReport, name: &str) -> &'a FileOutcome {
    &report
        .files
        .iter()
        .find(|f| f.input.file_name().is_some_and(|n| n == name))
        .unwrap_or_else(|| panic!("{name} missing from report"))
        .outcome
}

#[test]
fn test_plate_in_millimetres() {
    let part = prepare_step(&fixture("plate_with_hole.step"), &mm_config()).unwrap();
    let s = &part.summary;
    assert_eq!(s.axis, Axis::Z);
    assert_eq!(s.solid, "plate");
    assert_eq!(s.solids, 1);
    assert_relative_eq!(s.thickness, 3.0, epsilon = 1e-9);
    assert_relative_eq!(s.width, 100.0, epsilon = 1e-6);
    assert_relative_eq!(s.height, 50.0, epsilon = 1e-6);
    assert_relative_eq!(s.angle_deg, 0.0, epsilon = 1e-6);
    assert_eq!(s.holes, 1);
    assert!(s.arcs >= 1);

    let bb = part.outline.bbox();
    assert_relative_eq!(bb.min.x, 0.0, epsilon = 1e-9);
    assert_relative_eq!(bb.min.y, 0.0, epsilon = 1e-9);
    let hole_area = std::f64::consts::PI * 100.0;
    assert_relative_eq!(part.outline.area(), 5000.0 - hole_area, epsilon = 1e-3);
}

#[test]
fn test_default_units_are_inches() {
    let part = prepare_step(&fixture("plate_with_hole.step"), &Config::default()).unwrap();
    assert_eq!(part.summary.units, Units::Inch);
    assert_relative_eq!(part.summary.width, 100.0 / 25.4, epsilon = 1e-6);
    assert_relative_eq!(part.summary.thickness, 3.0 / 25.4, epsilon = 1e-9);

    let inch = prepare_step(&fixture("plate_inch.step"), &Config::default()).unwrap();
    assert_eq!(inch.summary.source_unit, "INCH");
    assert_relative_eq!(inch.summary.width, 4.0, epsilon = 1e-6);
    assert_relative_eq!(inch.summary.height, 2.0, epsilon = 1e-6);
    assert_relative_eq!(inch.summary.thickness, 0.125, epsilon = 1e-9);
}

#[test]
fn test_tilted_strip_is_straightened() {
    let part = prepare_step(&fixture("tilted_strip.step"), &mm_config()).unwrap();
    assert_eq!(part.summary.axis, Axis::Z);
    assert_relative_eq!(part.summary.thickness, 2.0, epsilon = 1e-9);
    assert_relative_eq!(part.summary.angle_deg, -30.0, epsilon = 1e-4);
    assert_relative_eq!(part.summary.width, 80.0, epsilon = 1e-4);
    assert_relative_eq!(part.summary.height, 20.0, epsilon = 1e-4);
    assert_eq!(part.summary.holes, 0);
}

#[test]
fn test_batch_writes_every_format() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("plate with hole.step");
    fs::copy(fixture("plate_with_hole.step"), &input).unwrap();
    let out = dir.path().join("out");

    let config = Config {
        output_dir: Some(out.clone()),
        ..mm_config()
    };
    let report = run_batch(&[input], &config, &CancellationToken::new()).unwrap();
    assert_eq!(report.succeeded(), 1);

    let FileOutcome::Succeeded { outputs, summary } = &report.files[0].outcome else {
        panic!("expected success, got {:?}", report.files[0].outcome);
    };
    let expected: Vec<PathBuf> = ExportTarget::ALL
        .iter()
        .map(|t| out.join(format!("plate_with_hole.{}", t.extension())))
        .collect();
    assert_eq!(outputs, &expected);
    for path in outputs {
        assert!(path.is_file(), "{} not written", path.display());
    }
    assert_eq!(summary.as_ref().unwrap().name, "plate_with_hole");

    // the DXF reads back as the same plate
    let doc = DxfDocument::read(&expected[0]).unwrap();
    let drawing = build_outline(&decode_entities(&doc).unwrap(), 1e-6, 64);
    let outline = drawing.outline.unwrap();
    assert_eq!(outline.holes.len(), 1);
    assert_relative_eq!(outline.bbox().width(), 100.0, epsilon = 1e-6);

    let pdf = fs::read(&expected[2]).unwrap();
    assert!(String::from_utf8_lossy(&pdf).contains("(plate_with_hole) Tj"));
}

#[test]
fn test_mixed_batch_reports_each_file() {
    let dir = tempfile::tempdir().unwrap();
    let drawing = dir.path().join("bracket.dxf");
    fs::write(&drawing, tilted_rectangle_dxf()).unwrap();
    let earlier = dir.path().join("bracket_old_rotated.dxf");
    fs::write(&earlier, tilted_rectangle_dxf()).unwrap();
    let broken = dir.path().join("broken.step");
    fs::write(&broken, "this is not a STEP file").unwrap();
    let notes = dir.path().join("notes.txt");
    fs::write(&notes, "cut list").unwrap();

    let inputs = vec![
        drawing.clone(),
        earlier.clone(),
        broken.clone(),
        notes.clone(),
    ];
    let progress = AtomicUsize::new(0);
    let config = Config {
        threads: 2,
        ..Default::default()
    };
    let report = run_batch_with(&inputs, &config, &CancellationToken::new(), |_, done, total| {
        assert!(done <= total);
        progress.fetch_add(1, Ordering::SeqCst);
    })
    .unwrap();
    assert_eq!(progress.load(Ordering::SeqCst), 4);

    let order: Vec<&PathBuf> = report.files.iter().map(|f| &f.input).collect();
    assert_eq!(order, inputs.iter().collect::<Vec<_>>());
    assert_eq!(report.succeeded(), 1);
    assert_eq!(report.skipped(), 1);
    assert_eq!(report.failed(), 2);
    assert!(report.has_failures());

    let rotated = dir.path().join("bracket_rotated.dxf");
    assert!(matches!(
        outcome_of(&report, "bracket.dxf"),
        FileOutcome::Succeeded { outputs, .. } if outputs == &vec![rotated.clone()]
    ));
    assert!(matches!(
        outcome_of(&report, "bracket_old_rotated.dxf"),
        FileOutcome::Skipped { .. }
    ));
    assert!(matches!(
        outcome_of(&report, "broken.step"),
        FileOutcome::Failed { kind: ErrorKind::Load, .. }
    ));
    assert!(matches!(
        outcome_of(&report, "notes.txt"),
        FileOutcome::Failed { kind: ErrorKind::Load, .. }
    ));

    // the rotated copy lies flat at the origin
    let doc = DxfDocument::read(&rotated).unwrap();
    let drawing = build_outline(&decode_entities(&doc).unwrap(), 1e-6, 64);
    let bb = drawing.outline.unwrap().bbox();
    assert_relative_eq!(bb.min.x, 0.0, epsilon = 1e-6);
    assert_relative_eq!(bb.min.y, 0.0, epsilon = 1e-6);
    assert_relative_eq!(bb.width(), 40.0, epsilon = 1e-6);
    assert_relative_eq!(bb.height(), 10.0, epsilon = 1e-6);

    let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
    assert_eq!(json["files"][0]["status"], "succeeded");
    assert_eq!(json["files"][1]["status"], "skipped");
    assert_eq!(json["files"][2]["kind"], "Load");
}

#[test]
fn test_same_stem_inputs_do_not_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let plate = dir.path().join("part.step");
    fs::copy(fixture("plate_with_hole.step"), &plate).unwrap();
    let strip = dir.path().join("part.stp");
    fs::copy(fixture("tilted_strip.step"), &strip).unwrap();
    let out = dir.path().join("out");

    let config = Config {
        output_dir: Some(out.clone()),
        formats: vec![ExportTarget::Dxf],
        threads: 2,
        ..mm_config()
    };
    let report = run_batch(&[plate, strip], &config, &CancellationToken::new()).unwrap();
    assert_eq!(report.succeeded(), 1);
    assert!(matches!(
        outcome_of(&report, "part.step"),
        FileOutcome::Succeeded { outputs, .. } if outputs == &vec![out.join("part.dxf")]
    ));
    let FileOutcome::Failed { kind, message } = outcome_of(&report, "part.stp") else {
        panic!("part.stp should fail");
    };
    assert_eq!(*kind, ErrorKind::ExportWrite);
    assert!(message.contains("part.dxf"), "{message}");

    // the drawing on disk is the plate, not the strip
    let doc = DxfDocument::read(out.join("part.dxf")).unwrap();
    let drawing = build_outline(&decode_entities(&doc).unwrap(), 1e-6, 64);
    let bb = drawing.outline.unwrap().bbox();
    assert_relative_eq!(bb.width(), 100.0, epsilon = 1e-6);
    assert_relative_eq!(bb.height(), 50.0, epsilon = 1e-6);
}

#[test]
fn test_sanitized_names_do_not_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let spaced = dir.path().join("a b.step");
    fs::copy(fixture("plate_with_hole.step"), &spaced).unwrap();
    let underscored = dir.path().join("a_b.step");
    fs::copy(fixture("tilted_strip.step"), &underscored).unwrap();

    let config = Config {
        formats: vec![ExportTarget::Svg],
        ..mm_config()
    };
    let report = run_batch(&[spaced, underscored], &config, &CancellationToken::new()).unwrap();
    assert_eq!(report.succeeded(), 1);
    assert!(matches!(
        outcome_of(&report, "a_b.step"),
        FileOutcome::Failed { kind: ErrorKind::ExportWrite, .. }
    ));
    assert!(dir.path().join("a_b.svg").is_file());
}

#[test]
fn test_cancelled_batch_skips_everything() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("plate.step");
    fs::copy(fixture("plate_with_hole.step"), &input).unwrap();

    let cancel = CancellationToken::new();
    cancel.cancel();
    let report = run_batch(&[input.clone(), input], &Config::default(), &cancel).unwrap();
    assert_eq!(report.skipped(), 2);
    assert!(!dir.path().join("plate.dxf").exists());
}

#[test]
fn test_config_errors_stop_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("plate.step");
    fs::copy(fixture("plate_with_hole.step"), &input).unwrap();

    let config = Config {
        formats: Vec::new(),
        ..Default::default()
    };
    assert!(run_batch(&[input], &config, &CancellationToken::new()).is_err());
    assert!(!dir.path().join("plate.dxf").exists());
}
