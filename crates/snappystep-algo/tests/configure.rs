mod common;

use common::{config, BoxKernel, CONFIG};
use snappystep_algo::classify::classify;
use snappystep_algo::configure::{build_snappy_dict, carry_forward, patch_type};
use snappystep_algo::locate::resolve_inside_points;
use snappystep_algo::ownership::assign_default_owner;
use snappystep_algo::Classification;
use snappystep_core::config::Config;
use snappystep_core::foam::{parse, to_foam_string, FoamDict, FoamValue};
use snappystep_core::geom::Vec3;

fn prepared(config: &Config) -> (Classification, Option<usize>) {
    let kernel = BoxKernel::with_boxes(&[
        ("Inner", [0.0, 0.0, 0.0], [1.0, 1.0, 1.0]),
        ("Outer", [1.0, 0.0, 0.0], [2.0, 1.0, 1.0]),
    ]);
    let mut c = classify(&kernel).expect("classifies");
    let default = assign_default_owner(&mut c);
    resolve_inside_points(&kernel, &mut c, config).expect("inside points");
    (c, default)
}

fn get<'a>(dict: &'a FoamDict, path: &[&str]) -> &'a FoamValue {
    dict.get_path(path)
        .unwrap_or_else(|| panic!("missing {}", path.join("/")))
}

const PRIOR: &str = r#"
castellatedMesh true;
addLayers on;
mergeTolerance 1e-05;
geometry
{
    stale { type triSurfaceMesh; file "stale.stl"; }
}
castellatedMeshControls
{
    maxGlobalCells 2000000;
    features
    (
        { file "edges/Inner_Outer_interface_edge.vtk"; level 5; }
    );
    refinementSurfaces
    {
        model
        {
            level (1 1);
            regions
            {
                Inner_default { level (4 4); patchInfo { type patch; } }
            }
        }
        Inner_Outer_interface { level (3 3); }
        old_interface { level (9 9); }
    }
    refinementRegions
    {
        Inner_refinement_region { mode inside; levels ((0.1 3)); }
    }
}
snapControls
{
    nSmoothPatch 3;
}
"#;

#[test]
fn fresh_dictionary_has_every_section() {
    let config = config();
    let (c, default) = prepared(&config);
    let dict = build_snappy_dict(&c, default, "model", &config, None);

    assert_eq!(
        vec![
            "#includeEtc",
            "castellatedMesh",
            "snap",
            "addLayers",
            "geometry",
            "castellatedMeshControls",
            "snapControls",
            "mergeTolerance"
        ],
        dict.keys().collect::<Vec<_>>()
    );
    assert_eq!(&FoamValue::switch(true), get(&dict, &["castellatedMesh"]));
    assert_eq!(&FoamValue::switch(false), get(&dict, &["addLayers"]));
    assert_eq!(&FoamValue::Float(1e-6), get(&dict, &["mergeTolerance"]));

    // geometry
    assert_eq!(
        &FoamValue::string("model.stl"),
        get(&dict, &["geometry", "model", "file"])
    );
    assert_eq!(
        &FoamValue::word("Outer_default"),
        get(&dict, &["geometry", "model", "regions", "Outer_default", "name"])
    );
    assert_eq!(
        &FoamValue::string("Inner_Outer_interface.stl"),
        get(&dict, &["geometry", "Inner_Outer_interface", "file"])
    );
    assert_eq!(
        &FoamValue::string("Inner_refinement_region.stl"),
        get(&dict, &["geometry", "Inner_refinement_region", "file"])
    );

    // refinementSurfaces
    let surfaces = ["castellatedMeshControls", "refinementSurfaces"];
    let at = |rest: &[&str]| {
        let mut path = surfaces.to_vec();
        path.extend_from_slice(rest);
        get(&dict, &path).clone()
    };
    assert_eq!(FoamValue::ints(&[2, 2]), at(&["model", "level"]));
    assert_eq!(
        FoamValue::word("wall"),
        at(&["model", "regions", "Inner_default", "patchInfo", "type"])
    );
    assert_eq!(FoamValue::word("Inner"), at(&["Inner_Outer_interface", "cellZone"]));
    assert_eq!(
        FoamValue::word("insidePoint"),
        at(&["Inner_Outer_interface", "mode"])
    );
    assert_eq!(
        FoamValue::point(Vec3::new(0.5, 0.5, 0.5)),
        at(&["Inner_Outer_interface", "insidePoint"])
    );
    assert_eq!(
        FoamValue::word("Inner_Outer_interface"),
        at(&["Inner_Outer_interface", "faceZone"])
    );

    // default volume's point drives the background fill
    assert_eq!(
        &FoamValue::point(Vec3::new(1.5, 0.5, 0.5)),
        get(&dict, &["castellatedMeshControls", "insidePoint"])
    );

    let features = get(&dict, &["castellatedMeshControls", "features"])
        .as_list()
        .expect("feature list");
    let files: Vec<&str> = features
        .iter()
        .filter_map(|f| f.as_dict()?.get("file")?.as_str())
        .collect();
    assert_eq!(
        vec![
            "edges/Inner_default_edge.vtk",
            "edges/Outer_default_edge.vtk",
            "edges/Inner_Outer_interface_edge.vtk"
        ],
        files
    );

    assert_eq!(
        &FoamValue::List(vec![
            FoamValue::List(vec![FoamValue::Float(0.5), FoamValue::Int(1)]),
            FoamValue::List(vec![FoamValue::Int(1), FoamValue::Int(2)]),
        ]),
        get(
            &dict,
            &["castellatedMeshControls", "refinementRegions", "Outer_refinement_region", "levels"]
        )
    );

    assert_eq!(
        &FoamValue::bool(true),
        get(&dict, &["snapControls", "explicitFeatureSnap"])
    );
    assert_eq!(
        &FoamValue::bool(false),
        get(&dict, &["snapControls", "implicitFeatureSnap"])
    );
    assert_eq!(
        &FoamValue::bool(true),
        get(&dict, &["snapControls", "multiRegionFeatureSnap"])
    );
}

#[test]
fn prior_levels_survive_and_new_regions_get_defaults() {
    let config = config();
    let (c, default) = prepared(&config);
    let prior = parse(PRIOR).expect("prior parses");
    let dict = build_snappy_dict(&c, default, "model", &config, Some(&prior));

    let surfaces = ["castellatedMeshControls", "refinementSurfaces"];
    let at = |rest: &[&str]| {
        let mut path = surfaces.to_vec();
        path.extend_from_slice(rest);
        dict.get_path(&path).cloned()
    };
    assert_eq!(Some(FoamValue::ints(&[1, 1])), at(&["model", "level"]));
    assert_eq!(
        Some(FoamValue::ints(&[4, 4])),
        at(&["model", "regions", "Inner_default", "level"])
    );
    assert_eq!(
        Some(FoamValue::word("patch")),
        at(&["model", "regions", "Inner_default", "patchInfo", "type"])
    );
    assert_eq!(
        Some(FoamValue::ints(&[2, 2])),
        at(&["model", "regions", "Outer_default", "level"])
    );
    assert_eq!(
        Some(FoamValue::ints(&[3, 3])),
        at(&["Inner_Outer_interface", "level"])
    );
    assert_eq!(None, at(&["old_interface"]));
    assert_eq!(None, dict.get_path(&["geometry", "stale"]));

    let features = get(&dict, &["castellatedMeshControls", "features"])
        .as_list()
        .expect("feature list");
    let level_of = |file: &str| {
        features
            .iter()
            .filter_map(FoamValue::as_dict)
            .find(|d| d.get("file").and_then(FoamValue::as_str) == Some(file))
            .and_then(|d| d.get("level"))
            .cloned()
    };
    assert_eq!(
        Some(FoamValue::Int(5)),
        level_of("edges/Inner_Outer_interface_edge.vtk")
    );
    assert_eq!(Some(FoamValue::Int(1)), level_of("edges/Inner_default_edge.vtk"));

    assert_eq!(
        &FoamValue::List(vec![FoamValue::List(vec![
            FoamValue::Float(0.1),
            FoamValue::Int(3)
        ])]),
        get(
            &dict,
            &["castellatedMeshControls", "refinementRegions", "Inner_refinement_region", "levels"]
        )
    );

    // switches and user scalars carried forward
    assert_eq!(&FoamValue::word("true"), get(&dict, &["castellatedMesh"]));
    assert_eq!(&FoamValue::switch(true), get(&dict, &["addLayers"]));
    assert_eq!(&FoamValue::Float(1e-5), get(&dict, &["mergeTolerance"]));
    assert_eq!(
        &FoamValue::Int(2_000_000),
        get(&dict, &["castellatedMeshControls", "maxGlobalCells"])
    );
    assert_eq!(&FoamValue::Int(3), get(&dict, &["snapControls", "nSmoothPatch"]));
}

#[test]
fn overwrite_ignores_prior_refinements() {
    let mut config = config();
    config.setup.overwrite_refinements = true;
    let (c, default) = prepared(&config);
    let prior = parse(PRIOR).expect("prior parses");
    let dict = build_snappy_dict(&c, default, "model", &config, Some(&prior));

    assert_eq!(
        &FoamValue::ints(&[2, 2]),
        get(
            &dict,
            &["castellatedMeshControls", "refinementSurfaces", "model", "regions", "Inner_default", "level"]
        )
    );
    assert_eq!(
        None,
        dict.get_path(&["castellatedMeshControls", "maxGlobalCells"])
    );
    // Top-level switches still follow the previous run.
    assert_eq!(&FoamValue::switch(true), get(&dict, &["addLayers"]));
}

#[test]
fn optional_sections_follow_flags() {
    let text = CONFIG
        .replace("edgeMesh true;", "edgeMesh false;")
        .replace("refinementRegions true;", "refinementRegions false;")
        .replace("multiRegionFeatureSnap true;", "");
    let config = Config::from_foam(&parse(&text).expect("parses")).expect("valid");
    let (c, default) = prepared(&config);
    let dict = build_snappy_dict(&c, default, "model", &config, None);

    assert_eq!(None, dict.get_path(&["castellatedMeshControls", "features"]));
    assert_eq!(
        None,
        dict.get_path(&["castellatedMeshControls", "refinementRegions"])
    );
    assert_eq!(None, dict.get_path(&["geometry", "Inner_refinement_region"]));
    assert_eq!(Some(&FoamDict::new()), dict.get_dict("snapControls"));
}

#[test]
fn regenerating_from_own_output_is_stable() {
    let config = config();
    let (c, default) = prepared(&config);
    let first = to_foam_string(
        &build_snappy_dict(&c, default, "model", &config, None),
        "snappyHexMeshDict",
    )
    .expect("renders");
    let again = to_foam_string(
        &build_snappy_dict(&c, default, "model", &config, None),
        "snappyHexMeshDict",
    )
    .expect("renders");
    assert_eq!(first, again);

    let mut prior = parse(&first).expect("output parses");
    prior.remove("FoamFile");
    let merged = to_foam_string(
        &build_snappy_dict(&c, default, "model", &config, Some(&prior)),
        "snappyHexMeshDict",
    )
    .expect("renders");
    assert_eq!(first, merged);
}

#[test]
fn carry_forward_copies_only_missing_scalars() {
    let prior = parse(
        "a 1; b word; nested { keep 2; deep { x 3; } } geometry { s 1; } list (1 2); only { y 4; }",
    )
    .expect("parses");
    let mut target = parse("b other; nested { deep { } }").expect("parses");

    let copied = carry_forward(&prior, &mut target);
    assert_eq!(3, copied);
    assert_eq!(Some(&FoamValue::Int(1)), target.get("a"));
    assert_eq!(Some(&FoamValue::word("other")), target.get("b"));
    assert_eq!(Some(&FoamValue::Int(2)), target.get_path(&["nested", "keep"]));
    assert_eq!(Some(&FoamValue::Int(3)), target.get_path(&["nested", "deep", "x"]));
    assert!(!target.contains_key("geometry"));
    assert!(!target.contains_key("list"));
    assert!(!target.contains_key("only"));
}

#[test]
fn wall_like_patch_names_become_walls() {
    assert_eq!("wall", patch_type("Tank_default"));
    assert_eq!("wall", patch_type("outer_wall"));
    assert_eq!("patch", patch_type("inlet"));
}
