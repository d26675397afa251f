use snappystep_core::foam::{FoamDict, FoamValue};
use snappystep_core::geom::BBox3;

const AXES: [&str; 3] = ["x", "y", "z"];

/// Corner order of the background hex, as blockMesh expects.
const CORNERS: [[&str; 3]; 8] = [
    ["$xMin", "$yMin", "$zMin"],
    ["$xMax", "$yMin", "$zMin"],
    ["$xMax", "$yMax", "$zMin"],
    ["$xMin", "$yMax", "$zMin"],
    ["$xMin", "$yMin", "$zMax"],
    ["$xMax", "$yMin", "$zMax"],
    ["$xMax", "$yMax", "$zMax"],
    ["$xMin", "$yMax", "$zMax"],
];

fn words(items: &[&str]) -> FoamValue {
    FoamValue::List(items.iter().map(|w| FoamValue::word(*w)).collect())
}

/// Single-block background mesh around `bbox` with cells of `cell_size`.
/// Each axis is padded equally on both sides so the cell count is whole.
pub fn block_mesh_dict(bbox: &BBox3, cell_size: [f64; 3]) -> FoamDict {
    let min = bbox.min.to_array();
    let max = bbox.max.to_array();

    let mut dict = FoamDict::new().with(
        "defaultPatch",
        FoamDict::new()
            .with("name", FoamValue::word("background"))
            .with("type", FoamValue::word("patch")),
    );
    let mut cells = [0_i64; 3];
    for (i, axis) in AXES.iter().enumerate() {
        let length = max[i] - min[i];
        let count = (length / cell_size[i]).ceil().max(1.0);
        let buffer = (count * cell_size[i] - length) / 2.0;
        dict.insert(format!("{axis}Min"), FoamValue::Float(min[i] - buffer));
        dict.insert(format!("{axis}Max"), FoamValue::Float(max[i] + buffer));
        cells[i] = count as i64;
    }
    for (axis, count) in AXES.iter().zip(cells) {
        dict.insert(format!("{axis}Cells"), FoamValue::Int(count));
    }
    dict.insert("scale", FoamValue::Int(1));
    dict.insert(
        "vertices",
        FoamValue::List(CORNERS.iter().map(|c| words(c)).collect()),
    );
    dict.insert(
        "blocks",
        FoamValue::List(vec![
            FoamValue::word("hex"),
            FoamValue::ints(&[0, 1, 2, 3, 4, 5, 6, 7]),
            words(&["$xCells", "$yCells", "$zCells"]),
            FoamValue::word("simpleGrading"),
            FoamValue::ints(&[1, 1, 1]),
        ]),
    );
    dict.insert("edges", FoamValue::List(Vec::new()));
    dict.insert("mergePatchPairs", FoamValue::List(Vec::new()));
    dict
}

/// `meshQualityDict` that only pulls in the standard settings.
pub fn mesh_quality_dict() -> FoamDict {
    FoamDict::new().with(
        "#includeEtc",
        FoamValue::string("caseDicts/mesh/generation/meshQualityDict.cfg"),
    )
}
