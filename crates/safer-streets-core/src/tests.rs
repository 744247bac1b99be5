//! Unit tests for safer-streets-core loading and repository behaviour

use std::fs;
use std::sync::Arc;

use serde_json::json;

use crate::test_utils::*;
use crate::*;

#[test]
fn test_load_catalog() {
    let root = create_test_data_root();
    let catalog = load_catalog(root.path()).unwrap();

    insta::assert_json_snapshot!(catalog.stats(), @r###"
    {
      "areas": 4,
      "datasets": 4,
      "series": 1,
      "categories": 2,
      "cells": 3
    }
    "###);
    assert_eq!(catalog.series(), vec!["risk".to_string()]);
    assert_eq!(catalog.categories().collect::<Vec<_>>(), vec!["burglary", "robbery"]);
}

#[test]
fn test_every_area_resolves_by_its_id() {
    let root = create_test_data_root();
    let catalog = load_catalog(root.path()).unwrap();
    for area in catalog.areas().iter() {
        let found = catalog.resolve_area(area.id.as_str()).unwrap();
        assert_eq!(found, area);
    }
}

#[test]
fn test_missing_root_is_data_load_error() {
    let root = tempfile::TempDir::new().unwrap();
    let err = load_catalog(&root.path().join("nope")).unwrap_err();
    assert!(matches!(err, CoreError::DataLoad { .. }));
}

#[test]
fn test_missing_area_registry_is_data_load_error() {
    let root = tempfile::TempDir::new().unwrap();
    let err = load_catalog(root.path()).unwrap_err();
    assert!(matches!(err, CoreError::DataLoad { ref path, .. } if path.ends_with("areas.json")));
}

#[test]
fn test_malformed_record_rejected() {
    let root = create_test_data_root();
    fs::write(root.path().join("datasets/broken.json"), "{ \"schema_version\": 1, \"records\": [").unwrap();
    let err = load_catalog(root.path()).unwrap_err();
    assert!(matches!(err, CoreError::DataLoad { ref path, .. } if path.ends_with("broken.json")));
}

#[test]
fn test_unsupported_schema_rejected() {
    let root = create_test_data_root();
    write_json(&root.path().join("datasets/future.json"), &json!({
        "schema_version": 2,
        "records": []
    }));
    let err = load_catalog(root.path()).unwrap_err();
    assert!(err.to_string().contains("unsupported schema version 2"));
}

#[test]
fn test_duplicate_record_rejected() {
    let root = create_test_data_root();
    write_json(&root.path().join("datasets/dupes.json"), &json!({
        "schema_version": 1,
        "records": [
            { "area_id": WEST_YORKSHIRE },
            { "area_id": WEST_YORKSHIRE }
        ]
    }));
    let err = load_catalog(root.path()).unwrap_err();
    assert!(err.to_string().contains("duplicate record"));
}

#[test]
fn test_record_for_unknown_area_rejected() {
    let root = create_test_data_root();
    write_json(&root.path().join("datasets/stray.json"), &json!({
        "schema_version": 1,
        "records": [{ "area_id": "W99999999" }]
    }));
    assert!(load_catalog(root.path()).is_err());
}

#[test]
fn test_count_row_length_checked() {
    let root = create_test_data_root();
    write_json(&root.path().join("counts/drugs.json"), &json!({
        "months": ["2024-01", "2024-02"],
        "cells": [{ "spatial_unit": 1, "area_id": WEST_YORKSHIRE, "counts": [1] }]
    }));
    let err = load_catalog(root.path()).unwrap_err();
    assert!(err.to_string().contains("1 counts for 2 months"));
}

#[test]
fn test_series_without_snapshot_rejected() {
    let root = create_test_data_root();
    write_json(&root.path().join("datasets/untagged.json"), &json!({
        "schema_version": 1,
        "series": "risk",
        "records": []
    }));
    assert!(load_catalog(root.path()).is_err());
}

#[test]
fn test_duplicate_snapshot_in_series_rejected() {
    let root = create_test_data_root();
    write_json(&root.path().join("datasets/risk-copy.json"), &json!({
        "schema_version": 1,
        "series": "risk",
        "snapshot": "2024-02",
        "records": [{ "area_id": WEST_YORKSHIRE, "classification": "high" }]
    }));
    let err = load_catalog(root.path()).unwrap_err();
    assert!(matches!(err, CoreError::DataLoad { .. }));
    assert!(err.to_string().contains("snapshot 2024-02 of series risk"));

    // the same tag in another series is fine
    write_json(&root.path().join("datasets/risk-copy.json"), &json!({
        "schema_version": 1,
        "series": "deprivation",
        "snapshot": "2024-02",
        "records": []
    }));
    assert_eq!(load_catalog(root.path()).unwrap().series().len(), 2);
}

#[test]
fn test_repeated_loads_are_identical() {
    let root = create_test_data_root();
    let first = load_catalog(root.path()).unwrap();
    let second = load_catalog(root.path()).unwrap();
    assert!(first.content_eq(&second));

    let ids = |c: &Catalog| c.areas().iter().map(|a| a.id.clone()).collect::<Vec<_>>();
    assert_eq!(ids(&first), ids(&second));
    assert_eq!(
        first.record("demographics", &AreaId::from(WEST_YORKSHIRE)).unwrap(),
        second.record("demographics", &AreaId::from(WEST_YORKSHIRE)).unwrap()
    );
}

#[test]
fn test_repository_get() {
    let root = create_test_data_root();
    let repo = Repository::load(root.path()).unwrap();

    let record = repo.get("demographics", &AreaId::from(WEST_YORKSHIRE)).unwrap();
    assert_eq!(record.values["population"], json!(2351600));

    let err = repo.get("demographics", &AreaId::from(METROPOLITAN)).unwrap_err();
    assert!(matches!(err, CoreError::RecordNotFound { .. }));

    let err = repo.get("nonexistent", &AreaId::from(WEST_YORKSHIRE)).unwrap_err();
    assert!(matches!(err, CoreError::DatasetNotFound { .. }));
}

#[test]
fn test_reload_swaps_catalog() {
    let root = create_test_data_root();
    let repo = Repository::load(root.path()).unwrap();
    let before = repo.current();

    write_json(&root.path().join("datasets/extra.json"), &json!({
        "schema_version": 1,
        "records": [{ "area_id": METROPOLITAN, "values": { "officers": 33000 } }]
    }));
    let after = repo.reload().unwrap();

    assert!(!Arc::ptr_eq(&before, &after));
    assert!(before.dataset("extra").is_err());
    assert!(repo.current().dataset("extra").is_ok());
}

#[test]
fn test_failed_reload_keeps_previous_catalog() {
    let root = create_test_data_root();
    let repo = Repository::load(root.path()).unwrap();
    let before = repo.current();

    fs::write(root.path().join("areas.json"), "not json").unwrap();
    assert!(repo.reload().is_err());

    assert!(Arc::ptr_eq(&before, &repo.current()));
    assert_eq!(repo.current().areas().len(), 4);
}

#[test]
fn test_snapshots_ordered_by_id() {
    let root = create_test_data_root();
    let catalog = load_catalog(root.path()).unwrap();
    let ids: Vec<String> = catalog
        .snapshots("risk")
        .unwrap()
        .iter()
        .map(|s| s.id().to_string())
        .collect();
    assert_eq!(ids, vec!["2024-01", "2024-02", "2024-03"]);
    assert!(matches!(catalog.snapshots("nope"), Err(CoreError::SeriesNotFound { .. })));
}

#[test]
fn test_persistence_over_series() {
    let root = create_test_data_root();
    let catalog = load_catalog(root.path()).unwrap();
    let snapshots = catalog.snapshots("risk").unwrap();

    let wy = analyze_persistence(&AreaId::from(WEST_YORKSHIRE), &snapshots).unwrap();
    assert_eq!(wy.stability, Some(0.5));
    assert_eq!(wy.latest.as_deref(), Some("medium"));

    let sy = analyze_persistence(&AreaId::from(SOUTH_YORKSHIRE), &snapshots).unwrap();
    assert_eq!(sy.gaps, vec!["2024-02".to_string()]);
    assert_eq!(sy.stability, Some(1.0));

    let met = analyze_persistence(&AreaId::from(METROPOLITAN), &snapshots);
    assert!(matches!(met, Err(CoreError::InsufficientData { .. })));
}

#[test]
fn test_hotspot_repetition_from_fixture() {
    let root = create_test_data_root();
    let catalog = load_catalog(root.path()).unwrap();
    let counts = catalog.counts("burglary").unwrap().for_area(&AreaId::from(WEST_YORKSHIRE));
    assert_eq!(counts.rows().len(), 4);

    let rep = counts
        .repetition(RepetitionParams { window: 3, step: 3, prediction: 3, n_hotspots: 1 })
        .unwrap();
    assert_eq!(rep.observations, 2);
    // 101 leads January to March (26 vs 15), 102 leads April to June (27 vs 24)
    assert_eq!(rep.windows[0].hotspots, vec![101]);
    assert_eq!(rep.windows[1].hotspots, vec![102]);
    let predicted = rep.windows[0].prediction.as_ref().unwrap().predicted_pct;
    assert!((predicted - 100.0 * 24.0 / 53.0).abs() < 1e-9);
}

#[test]
fn test_cells_lookup_skips_unknown() {
    let root = create_test_data_root();
    let catalog = load_catalog(root.path()).unwrap();
    let cells = catalog.cells(&[103, 101, 999, 101]);
    let ids: Vec<_> = cells.iter().map(|c| c.spatial_unit).collect();
    assert_eq!(ids, vec![101, 103]);
}

#[test]
fn test_fixture_resolution_rules() {
    let root = create_test_data_root();
    let catalog = load_catalog(root.path()).unwrap();

    assert_eq!(catalog.resolve_area("wyp").unwrap().id.as_str(), WEST_YORKSHIRE);
    assert_eq!(catalog.resolve_area("  metropolitan   police ").unwrap().id.as_str(), METROPOLITAN);

    match catalog.resolve_area("Yorkshire").unwrap_err() {
        CoreError::AmbiguousArea { candidates, .. } => {
            let ids: Vec<_> = candidates.iter().map(|c| c.id.as_str()).collect();
            assert_eq!(ids, vec![NORTH_YORKSHIRE, SOUTH_YORKSHIRE]);
        }
        other => panic!("expected ambiguity, got {other:?}"),
    }
    assert!(catalog.resolve_area("Nonexistent County").unwrap_err().is_not_found());
}
