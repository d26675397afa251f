mod common;

use common::{case_dir, write_step, CONFIG, INNER_OUTER};
use snappystep::{run, RunOptions};
use snappystep_core::config::ConfigError;
use snappystep_core::foam::{read_file, FoamValue};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

fn listing(root: &Path) -> BTreeSet<PathBuf> {
    let mut found = BTreeSet::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in std::fs::read_dir(&dir).expect("list dir") {
            let path = entry.expect("entry").path();
            if path.is_dir() {
                stack.push(path);
            } else {
                found.insert(path);
            }
        }
    }
    found
}

fn relative(root: &Path, paths: &BTreeSet<PathBuf>) -> BTreeSet<String> {
    paths
        .iter()
        .map(|p| {
            p.strip_prefix(root)
                .unwrap_or(p)
                .to_string_lossy()
                .replace('\\', "/")
        })
        .collect()
}

fn close(expected: f64, value: Option<&FoamValue>) -> bool {
    value
        .and_then(FoamValue::as_f64)
        .map(|v| (v - expected).abs() < 1e-9)
        .unwrap_or(false)
}

#[test]
fn writes_meshes_dictionaries_and_scripts() {
    let root = case_dir("full", "triSurface", CONFIG);
    write_step(&root.join("constant/triSurface"), "model.step", &INNER_OUTER);

    let summary = run(&root, &RunOptions::default()).expect("run succeeds");
    assert_eq!("Outer", summary.default_volume);

    let written: BTreeSet<PathBuf> = summary.written.iter().cloned().collect();
    let expected: BTreeSet<String> = [
        "constant/triSurface/model.stl",
        "constant/triSurface/Inner_Outer_interface.stl",
        "constant/triSurface/edges/Inner_default_edge.vtk",
        "constant/triSurface/edges/Outer_default_edge.vtk",
        "constant/triSurface/edges/Inner_Outer_interface_edge.vtk",
        "constant/triSurface/Inner_refinement_region.stl",
        "constant/triSurface/Outer_refinement_region.stl",
        "system/snappyHexMeshDict",
        "system/blockMeshDict",
        "system/meshQualityDict",
        "snappyStepSplitMeshRegions.sh",
        "snappyStepGenerateMesh.sh",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    assert_eq!(expected, relative(&root, &written));
    for path in &summary.written {
        assert!(path.is_file(), "{path:?}");
    }

    let stl = std::fs::read_to_string(root.join("constant/triSurface/model.stl")).expect("stl");
    assert!(stl.starts_with("solid Inner_default\n"));
    assert!(stl.contains("solid Outer_default\n"));

    let split = std::fs::read_to_string(root.join("snappyStepSplitMeshRegions.sh")).expect("script");
    assert_eq!(
        "splitMeshRegions -cellZones -defaultRegionName Outer -useFaceZones -overwrite\n",
        split
    );
    let generate = std::fs::read_to_string(root.join("snappyStepGenerateMesh.sh")).expect("script");
    assert_eq!(
        "blockMesh\nsnappyHexMesh -overwrite\n./snappyStepSplitMeshRegions.sh\ncheckMesh\n",
        generate
    );
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(root.join("snappyStepGenerateMesh.sh"))
            .expect("metadata")
            .permissions()
            .mode();
        assert_eq!(0o755, mode & 0o777);
    }

    let snappy = read_file(&root.join("system/snappyHexMeshDict"))
        .expect("readable")
        .expect("present");
    assert_eq!(
        Some(&FoamValue::word("Inner")),
        snappy.get_path(&[
            "castellatedMeshControls",
            "refinementSurfaces",
            "Inner_Outer_interface",
            "cellZone"
        ])
    );
    assert!(snappy.get_path(&["geometry", "model", "regions", "Inner_default"]).is_some());

    let _ = std::fs::remove_dir_all(&root);
}

#[test]
fn block_mesh_pads_the_model_to_whole_cells() {
    let root = case_dir("block", "geometry", CONFIG);
    write_step(&root.join("constant/geometry"), "model.stp", &INNER_OUTER);
    run(&root, &RunOptions::default()).expect("run succeeds");

    let block = read_file(&root.join("system/blockMeshDict"))
        .expect("readable")
        .expect("present");
    assert_eq!(Some(&FoamValue::Int(7)), block.get("xCells"));
    assert_eq!(Some(&FoamValue::Int(4)), block.get("yCells"));
    assert_eq!(Some(&FoamValue::Int(4)), block.get("zCells"));
    assert!(close(-0.05, block.get("xMin")));
    assert!(close(2.05, block.get("xMax")));
    assert!(close(-0.1, block.get("yMin")));
    assert!(close(1.1, block.get("zMax")));
    assert_eq!(
        Some(&FoamValue::word("background")),
        block.get_path(&["defaultPatch", "name"])
    );

    let _ = std::fs::remove_dir_all(&root);
}

#[test]
fn rerun_regenerates_identical_outputs() {
    let root = case_dir("rerun", "geometry", CONFIG);
    write_step(&root.join("constant/geometry"), "model.step", &INNER_OUTER);

    run(&root, &RunOptions::default()).expect("first run");
    let first_files = listing(&root);
    let first_dict = std::fs::read(root.join("system/snappyHexMeshDict")).expect("dict");
    let first_stl = std::fs::read(root.join("constant/geometry/model.stl")).expect("stl");

    run(&root, &RunOptions::default()).expect("second run");
    assert_eq!(first_files, listing(&root));
    assert_eq!(
        first_dict,
        std::fs::read(root.join("system/snappyHexMeshDict")).expect("dict")
    );
    assert_eq!(
        first_stl,
        std::fs::read(root.join("constant/geometry/model.stl")).expect("stl")
    );

    let _ = std::fs::remove_dir_all(&root);
}

#[test]
fn file_names_with_spaces_rerun_cleanly() {
    let root = case_dir("spaces", "triSurface", CONFIG);
    write_step(&root.join("constant/triSurface"), "my model.step", &INNER_OUTER);

    run(&root, &RunOptions::default()).expect("first run");
    let dict_path = root.join("system/snappyHexMeshDict");
    let first = std::fs::read(&dict_path).expect("dict");
    run(&root, &RunOptions::default()).expect("second run reads its own dictionary");
    assert_eq!(first, std::fs::read(&dict_path).expect("dict"));

    assert!(root.join("constant/triSurface/my_model.stl").is_file());
    let dict = read_file(&dict_path).expect("readable").expect("present");
    assert!(dict.get_path(&["geometry", "my_model", "regions"]).is_some());
    assert!(dict
        .get_path(&["castellatedMeshControls", "refinementSurfaces", "my_model"])
        .is_some());

    let _ = std::fs::remove_dir_all(&root);
}

#[test]
fn report_directory_failure_is_an_error() {
    let root = case_dir("reportdir", "geometry", CONFIG);
    write_step(&root.join("constant/geometry"), "model.step", &INNER_OUTER);
    std::fs::write(root.join("out"), "a file, not a directory").expect("blocker");
    let options = RunOptions {
        report: Some(PathBuf::from("out/report.json")),
        ..RunOptions::default()
    };
    let err = run(&root, &options).expect_err("report dir cannot be created");
    assert!(format!("{err:#}").contains("create report directory"), "{err:#}");

    let _ = std::fs::remove_dir_all(&root);
}

#[test]
fn merge_keeps_levels_edited_between_runs() {
    let config = CONFIG.replace("overwriteRefinements true;", "overwriteRefinements false;");
    let root = case_dir("merge", "geometry", &config);
    write_step(&root.join("constant/geometry"), "model.step", &INNER_OUTER);
    run(&root, &RunOptions::default()).expect("first run");

    let dict_path = root.join("system/snappyHexMeshDict");
    let text = std::fs::read_to_string(&dict_path).expect("dict");
    let edited = text.replace(
        "castellatedMeshControls\n{\n",
        "castellatedMeshControls\n{\n    maxGlobalCells  2000000;\n",
    );
    std::fs::write(&dict_path, edited).expect("edit dict");

    run(&root, &RunOptions::default()).expect("second run");
    let dict = read_file(&dict_path).expect("readable").expect("present");
    assert_eq!(
        Some(&FoamValue::Int(2_000_000)),
        dict.get_path(&["castellatedMeshControls", "maxGlobalCells"])
    );

    let _ = std::fs::remove_dir_all(&root);
}

#[test]
fn report_lists_owners_and_default_volume() {
    let root = case_dir("report", "geometry", CONFIG);
    write_step(&root.join("constant/geometry"), "model.step", &INNER_OUTER);
    let options = RunOptions {
        report: Some(PathBuf::from("out/report.json")),
        ..RunOptions::default()
    };
    run(&root, &options).expect("run succeeds");

    let text = std::fs::read_to_string(root.join("out/report.json")).expect("report");
    let report: serde_json::Value = serde_json::from_str(&text).expect("json");
    assert_eq!("model.step", report["source"]);
    assert_eq!("Outer", report["default_volume"]);
    assert_eq!("Inner_Outer_interface", report["interfaces"][0]["name"]);
    assert_eq!("Inner", report["interfaces"][0]["cell_zone"]);
    assert_eq!(2, report["volumes"].as_array().map(Vec::len).unwrap_or(0));

    let _ = std::fs::remove_dir_all(&root);
}

#[test]
fn missing_configuration_stops_before_geometry_work() {
    let root = case_dir("noconfig", "geometry", CONFIG);
    std::fs::remove_file(root.join("system/snappyStepDict")).expect("remove config");
    write_step(&root.join("constant/geometry"), "model.step", &INNER_OUTER);

    let err = run(&root, &RunOptions::default()).expect_err("config required");
    assert!(matches!(
        err.downcast_ref::<ConfigError>(),
        Some(ConfigError::Missing { .. })
    ));
    assert!(!root.join("constant/geometry/model.stl").exists());

    let _ = std::fs::remove_dir_all(&root);
}

#[test]
fn template_round_trips_through_the_loader() {
    let root = common::temp_dir("template");
    let path = snappystep::write_template(&root).expect("template written");
    assert!(path.ends_with("system/snappyStepDict"));
    snappystep_core::config::Config::read(&root).expect("template is a valid config");

    let _ = std::fs::remove_dir_all(&root);
}
