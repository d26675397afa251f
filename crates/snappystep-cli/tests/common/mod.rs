#![allow(dead_code)]

use std::path::{Path, PathBuf};

pub const CONFIG: &str = r#"
gmsh
{
    meshSizeMax 0.5;
    meshSizeMin 0;
    meshSizeFactor 1;
    meshSizeFromCurvature 0;
    meshAlgorithm 6;
    scaling 1;
}
snappyHexMeshSetup
{
    edgeMesh true;
    refinementRegions true;
    multiRegionFeatureSnap true;
    generateBlockMeshDict true;
    backgroundMeshSize (0.3 0.3 0.3);
    defaultSurfaceRefinement (2 2);
    defaultEdgeRefinement 1;
    defaultRegionRefinement ((0.1 1));
    overwriteRefinements true;
}
"#;

/// Fresh, empty directory under the system temp dir.
pub fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("snappystep-cli-{name}-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).expect("temp dir");
    dir
}

/// Case root with `constant/<geometry>` and `system/snappyStepDict`.
pub fn case_dir(name: &str, geometry: &str, config: &str) -> PathBuf {
    let root = temp_dir(name);
    std::fs::create_dir_all(root.join("constant").join(geometry)).expect("geometry dir");
    std::fs::create_dir_all(root.join("system")).expect("system dir");
    std::fs::write(root.join("system/snappyStepDict"), config).expect("config");
    root
}

pub fn write_step(dir: &Path, file: &str, boxes: &[(&str, [f64; 3], [f64; 3])]) -> PathBuf {
    let path = dir.join(file);
    std::fs::write(&path, boxes_step(boxes)).expect("step file");
    path
}

const HEADER: &str = "FILE_DESCRIPTION((''),'2;1');
FILE_NAME('boxes.stp','',(''),(''),'','','');
FILE_SCHEMA(('CONFIG_CONTROL_DESIGN'));";

/// STEP text with one faceted box solid per entry, in metres.
pub fn boxes_step(boxes: &[(&str, [f64; 3], [f64; 3])]) -> String {
    let mut data = Vec::new();
    let mut next = 1;
    let mut id = || {
        let current = next;
        next += 1;
        current
    };
    let plane = id();
    data.push(format!("#{plane}=PLANE('',$);"));
    for (name, min, max) in boxes {
        let mut corners = [0; 8];
        for (i, slot) in corners.iter_mut().enumerate() {
            let x = if i & 1 == 0 { min[0] } else { max[0] };
            let y = if i & 2 == 0 { min[1] } else { max[1] };
            let z = if i & 4 == 0 { min[2] } else { max[2] };
            *slot = id();
            data.push(format!("#{}=CARTESIAN_POINT('',({x:?},{y:?},{z:?}));", *slot));
        }
        let loops = [
            [0, 2, 3, 1],
            [4, 5, 7, 6],
            [0, 1, 5, 4],
            [2, 6, 7, 3],
            [0, 4, 6, 2],
            [1, 3, 7, 5],
        ];
        let mut faces = Vec::new();
        for l in loops {
            let poly = id();
            let refs: Vec<String> = l.iter().map(|&i| format!("#{}", corners[i])).collect();
            data.push(format!("#{poly}=POLY_LOOP('',({}));", refs.join(",")));
            let bound = id();
            data.push(format!("#{bound}=FACE_OUTER_BOUND('',#{poly},.T.);"));
            let face = id();
            data.push(format!("#{face}=FACE_SURFACE('',(#{bound}),#{plane},.T.);"));
            faces.push(format!("#{face}"));
        }
        let shell = id();
        data.push(format!("#{shell}=CLOSED_SHELL('',({}));", faces.join(",")));
        let brep = id();
        data.push(format!("#{brep}=FACETED_BREP('{name}',#{shell});"));
    }
    let unit = id();
    data.push(format!("#{unit}=(LENGTH_UNIT()NAMED_UNIT(*)SI_UNIT($,.METRE.));"));
    format!(
        "ISO-10303-21;\nHEADER;\n{HEADER}\nENDSEC;\nDATA;\n{}\nENDSEC;\nEND-ISO-10303-21;\n",
        data.join("\n")
    )
}

pub const INNER_OUTER: [(&str, [f64; 3], [f64; 3]); 2] = [
    ("Inner", [0.0, 0.0, 0.0], [1.0, 1.0, 1.0]),
    ("Outer", [1.0, 0.0, 0.0], [2.0, 1.0, 1.0]),
];
