use std::path::PathBuf;

use approx::assert_relative_eq;
use glam::{DAffine3, DVec3};
use slicer_fiducials::{FiducialError, FiducialSet, FiducialTable, Format, Space};
use tempfile::TempDir;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

fn legacy() -> FiducialSet {
    FiducialSet::open(fixture("landmarks_legacy.fcsv")).unwrap()
}

fn markups() -> FiducialSet {
    FiducialSet::open(fixture("landmarks_markups.fcsv")).unwrap()
}

const NAMES: [&str; 5] = ["AC", "LE", "PC", "RE", "genu"];

#[test]
fn test_formats_detected() {
    assert_eq!(legacy().format(), Format::Legacy);
    assert_eq!(markups().format(), Format::Extended);
}

#[test]
fn test_names_sorted() {
    assert_eq!(legacy().names(), NAMES);
    assert_eq!(markups().names(), NAMES);
}

#[test]
fn test_iteration_follows_label_order() {
    let set = legacy();
    let labels: Vec<&str> = set.iter().map(|(label, _)| label).collect();
    assert_eq!(labels, NAMES);
    // restartable
    assert_eq!(set.iter().count(), set.iter().count());
}

#[test]
fn test_query_physical() {
    let le = legacy().query("LE", Space::Physical).unwrap();
    assert_relative_eq!(le.x, 30.672317504882816);
    assert_relative_eq!(le.y, -64.453857421875);
    assert_relative_eq!(le.z, 13.664093017578123);
}

#[test]
fn test_distance_agrees_between_layouts() {
    let a = legacy().distance("RE", "LE").unwrap();
    let b = markups().distance("LE", "RE").unwrap();
    assert_relative_eq!(a, 64.53, epsilon = 0.05);
    assert_relative_eq!(a, b, epsilon = 0.01);
    assert_eq!(markups().distance("LE", "LE").unwrap(), 0.0);
}

#[test]
fn test_unknown_labels() {
    assert!(matches!(
        legacy().distance("Left Hand", "Right Hand"),
        Err(FiducialError::UnknownLabel(_))
    ));
}

#[test]
fn test_as_format_is_idempotent() {
    let set = legacy();
    assert_eq!(&set.as_format(Format::Legacy), set.table());
    let set = markups();
    assert_eq!(&set.as_format(Format::Extended), set.table());
}

#[test]
fn test_legacy_extended_legacy_round_trip() {
    let set = legacy();
    let extended = FiducialSet::from_table(set.as_format(Format::Extended)).unwrap();
    assert_eq!(extended.format(), Format::Extended);

    let FiducialTable::Legacy(back) = extended.as_format(Format::Legacy) else {
        panic!("expected legacy table");
    };
    let FiducialTable::Legacy(original) = set.table() else {
        panic!("expected legacy table");
    };
    assert_eq!(back.len(), original.len());
    for (b, o) in back.iter().zip(original) {
        assert_eq!(b.label, o.label);
        assert_eq!((b.sel, b.vis), (o.sel, o.vis));
        assert_relative_eq!(b.x, o.x, epsilon = 1e-3);
        assert_relative_eq!(b.y, o.y, epsilon = 1e-3);
        assert_relative_eq!(b.z, o.z, epsilon = 1e-3);
    }
}

#[test]
fn test_extended_projection_ids_follow_sorted_order() {
    let FiducialTable::Extended(rows) = legacy().as_format(Format::Extended) else {
        panic!("expected extended table");
    };
    let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
    let labels: Vec<&str> = rows.iter().map(|r| r.label.as_str()).collect();
    assert_eq!(ids[0], "vtkMRMLMarkupsFiducialNode_0");
    assert_eq!(ids[4], "vtkMRMLMarkupsFiducialNode_4");
    assert_eq!(labels, NAMES);
}

#[test]
fn test_write_and_reload() {
    let dir = TempDir::new().unwrap();
    let set = legacy();

    let markups_path = dir.path().join("out_markups.fcsv");
    set.write(&markups_path, Some(Format::Extended)).unwrap();
    let text = std::fs::read_to_string(&markups_path).unwrap();
    assert!(text.starts_with(Format::Extended.header()));
    assert!(text.contains(",LE,"));

    let reloaded = FiducialSet::open(&markups_path).unwrap();
    assert_eq!(reloaded.format(), Format::Extended);
    assert_eq!(reloaded.names(), set.names());
    for (label, p) in &set {
        let q = reloaded.query(label, Space::Physical).unwrap();
        assert!(p.distance(q) < 1e-3, "{label}: {p} vs {q}");
    }

    let legacy_path = dir.path().join("out_legacy.fcsv");
    set.write(&legacy_path, None).unwrap();
    let text = std::fs::read_to_string(&legacy_path).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("#label,x,y,z,sel,vis"));
    assert_eq!(lines.next(), Some("AC,0.413,-1.234,-2.100,1,1"));
}

#[test]
fn test_diff_between_layouts() {
    let delta = FiducialSet::diff(&legacy(), &markups()).unwrap();
    assert_eq!(delta.format(), Format::Legacy);
    assert_eq!(delta.names(), NAMES);
    for (_, p) in &delta {
        assert!(p.length() < 1e-3);
    }

    let zero = FiducialSet::diff(&legacy(), &legacy()).unwrap();
    assert!(zero.iter().all(|(_, p)| p == DVec3::ZERO));
}

#[test]
fn test_diff_mismatch() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("eyes.fcsv");
    std::fs::write(&path, "#label,x,y,z,sel,vis\nLE,1,2,3,1,1\nRE,4,5,6,1,1\n").unwrap();
    let eyes = FiducialSet::open(&path).unwrap();
    assert!(matches!(
        FiducialSet::diff(&legacy(), &eyes),
        Err(FiducialError::Mismatch(_))
    ));
}

#[test]
fn test_schema_rejection() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("wide.fcsv");
    std::fs::write(&path, "AC,0,0,0,1,1,0,0\n").unwrap();
    assert!(matches!(
        FiducialSet::open(&path),
        Err(FiducialError::Schema { columns: 8 })
    ));
}

#[test]
fn test_missing_file() {
    assert!(matches!(
        FiducialSet::open(fixture("missing.fcsv")),
        Err(FiducialError::Io(_))
    ));
}

#[test]
fn test_transform_then_write() {
    let dir = TempDir::new().unwrap();
    let shift = DAffine3::from_translation(DVec3::new(0.0, 0.0, 10.0));
    let moved = markups().transformed(&shift).unwrap();

    let path = dir.path().join("moved.fcsv");
    moved.write(&path, None).unwrap();
    let reloaded = FiducialSet::open(&path).unwrap();
    let before = markups().query("AC", Space::Physical).unwrap();
    let after = reloaded.query("AC", Space::Physical).unwrap();
    assert_relative_eq!(after.z - before.z, 10.0, epsilon = 1e-9);
    assert_relative_eq!(after.x, before.x);
}
