//! Test utilities for Safer Streets

use std::fs;
use std::path::Path;

use serde_json::{json, Value};
use tempfile::TempDir;

pub const WEST_YORKSHIRE: &str = "E23000010";
pub const SOUTH_YORKSHIRE: &str = "E23000011";
pub const NORTH_YORKSHIRE: &str = "E23000009";
pub const METROPOLITAN: &str = "E23000001";

/// Create a temporary data root with four forces, a demographics dataset,
/// a three-month `risk` series, burglary and robbery counts and cell geometry.
pub fn create_test_data_root() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    write_test_data(temp_dir.path());
    temp_dir
}

/// Write the fixture files into an existing directory.
pub fn write_test_data(root: &Path) {
    fs::create_dir_all(root.join("datasets")).unwrap();
    fs::create_dir_all(root.join("counts")).unwrap();

    write_json(&root.join("areas.json"), &json!({
        "schema_version": 1,
        "areas": [
            {
                "id": WEST_YORKSHIRE,
                "name": "West Yorkshire",
                "aliases": ["WYP", "West Yorkshire Police"],
                "area_km2": 2029.0,
                "centroid": { "lat": 53.75, "lon": -1.7 },
                "properties": { "population": 2351600 }
            },
            {
                "id": SOUTH_YORKSHIRE,
                "name": "South Yorkshire",
                "aliases": ["SYP", "Yorkshire"],
                "area_km2": 1552.0,
                "centroid": { "lat": 53.47, "lon": -1.33 }
            },
            {
                "id": NORTH_YORKSHIRE,
                "name": "North Yorkshire",
                "aliases": ["NYP", "Yorkshire"],
                "area_km2": 8654.0
            },
            {
                "id": METROPOLITAN,
                "name": "Metropolitan Police",
                "aliases": ["The Met", "London"],
                "area_km2": 1572.0
            }
        ]
    }));

    write_json(&root.join("datasets/demographics.json"), &json!({
        "schema_version": 1,
        "records": [
            {
                "area_id": WEST_YORKSHIRE,
                "values": { "population": 2351600, "white_pct": 77.1, "asian_pct": 15.4 }
            },
            {
                "area_id": SOUTH_YORKSHIRE,
                "values": { "population": 1379900, "white_pct": 86.6, "asian_pct": 6.1 }
            }
        ]
    }));

    write_risk(root, "2024-01", &[(WEST_YORKSHIRE, "high"), (SOUTH_YORKSHIRE, "low"), (NORTH_YORKSHIRE, "medium")]);
    write_risk(root, "2024-02", &[(WEST_YORKSHIRE, "high"), (NORTH_YORKSHIRE, "medium")]);
    write_risk(root, "2024-03", &[(WEST_YORKSHIRE, "medium"), (SOUTH_YORKSHIRE, "low"), (NORTH_YORKSHIRE, "medium")]);

    let months = json!(["2024-01", "2024-02", "2024-03", "2024-04", "2024-05", "2024-06"]);
    write_json(&root.join("counts/burglary.json"), &json!({
        "months": months,
        "cells": [
            { "spatial_unit": 101, "area_id": WEST_YORKSHIRE, "counts": [9, 8, 9, 7, 8, 9] },
            { "spatial_unit": 102, "area_id": WEST_YORKSHIRE, "counts": [4, 6, 5, 8, 9, 10] },
            { "spatial_unit": 103, "area_id": WEST_YORKSHIRE, "counts": [1, 0, 2, 1, 0, 1] },
            { "spatial_unit": 104, "area_id": WEST_YORKSHIRE, "counts": [0, 0, 0, 0, 0, 0] },
            { "spatial_unit": 201, "area_id": SOUTH_YORKSHIRE, "counts": [3, 3, 3, 3, 3, 3] }
        ]
    }));
    write_json(&root.join("counts/robbery.json"), &json!({
        "months": months,
        "cells": [
            { "spatial_unit": 101, "area_id": WEST_YORKSHIRE, "counts": [1, 0, 1, 0, 1, 0] },
            { "spatial_unit": 102, "area_id": WEST_YORKSHIRE, "counts": [0, 2, 0, 2, 0, 2] }
        ]
    }));

    write_json(&root.join("cells.json"), &json!({
        "cells": [
            { "spatial_unit": 101, "geometry": hex(-1.55, 53.80) },
            { "spatial_unit": 102, "geometry": hex(-1.54, 53.80) },
            { "spatial_unit": 103, "geometry": hex(-1.53, 53.80) }
        ]
    }));
}

fn write_risk(root: &Path, month: &str, entries: &[(&str, &str)]) {
    let records: Vec<Value> = entries
        .iter()
        .map(|(area, class)| json!({ "area_id": area, "classification": class }))
        .collect();
    write_json(&root.join(format!("datasets/risk-{}.json", month)), &json!({
        "schema_version": 1,
        "series": "risk",
        "snapshot": month,
        "records": records
    }));
}

fn hex(lon: f64, lat: f64) -> Value {
    let d = 0.001;
    json!({
        "type": "Polygon",
        "coordinates": [[
            [lon + d, lat], [lon + d / 2.0, lat + d], [lon - d / 2.0, lat + d],
            [lon - d, lat], [lon - d / 2.0, lat - d], [lon + d / 2.0, lat - d],
            [lon + d, lat]
        ]]
    })
}

pub fn write_json(path: &Path, value: &Value) {
    fs::write(path, serde_json::to_string_pretty(value).unwrap()).unwrap();
}
