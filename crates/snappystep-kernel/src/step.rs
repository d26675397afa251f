//! Reader for planar B-rep solids in ISO 10303-21 (STEP) exchange files.
//!
//! Only the topology needed for faceted solids is understood:
//! `MANIFOLD_SOLID_BREP`/`FACETED_BREP` -> shell -> faces -> one outer bound
//! built from an `EDGE_LOOP` or a `POLY_LOOP`, with `PLANE` surfaces.

use nalgebra::Vector3;
use ruststep::ast::{EntityInstance, Name, Parameter, Record};
use ruststep::parser::parse;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct StepFace {
    pub id: u64,
    pub name: Option<String>,
    /// Outer loop as (point id, coordinates in file units).
    pub points: Vec<(u64, Vector3<f64>)>,
}

#[derive(Debug, Clone)]
pub struct StepSolid {
    pub id: u64,
    pub name: Option<String>,
    pub faces: Vec<StepFace>,
}

#[derive(Debug, Clone)]
pub struct StepShapes {
    /// Metres per file length unit.
    pub length_unit: f64,
    pub solids: Vec<StepSolid>,
}

#[derive(Debug, Error)]
pub enum StepError {
    #[error("malformed exchange structure: {0}")]
    Syntax(String),
    #[error("file has no DATA section")]
    NoData,
    #[error("no MANIFOLD_SOLID_BREP entities found")]
    NoSolids,
    #[error("reference to missing entity #{0}")]
    MissingEntity(u64),
    #[error("#{id} is a {found}, expected {expected}")]
    WrongEntity {
        id: u64,
        found: String,
        expected: String,
    },
    #[error("#{id}: expected {what} at parameter {index}")]
    BadParameter {
        id: u64,
        index: usize,
        what: &'static str,
    },
    #[error("face #{face} lies on a {surface}; only planar faces are supported")]
    NonPlanarFace { face: u64, surface: String },
    #[error("face #{face} has {bounds} bounds; faces with holes are not supported")]
    FaceWithHoles { face: u64, bounds: usize },
    #[error("#{0}: solids with voids are not supported")]
    SolidWithVoids(u64),
    #[error("{entity} #{id}: {message}")]
    Topology {
        entity: &'static str,
        id: u64,
        message: String,
    },
}

fn as_ref_id(param: &Parameter) -> Option<u64> {
    match param {
        Parameter::Ref(Name::Entity(id)) => Some(*id),
        _ => None,
    }
}

fn as_flag(param: &Parameter) -> Option<bool> {
    match param {
        Parameter::Enumeration(e) if e == "T" => Some(true),
        Parameter::Enumeration(e) if e == "F" => Some(false),
        _ => None,
    }
}

fn as_number(param: &Parameter) -> Option<f64> {
    match param {
        Parameter::Real(v) => Some(*v),
        Parameter::Integer(v) => Some(*v as f64),
        Parameter::Typed { parameter, .. } => as_number(parameter),
        _ => None,
    }
}

fn label(param: &Parameter) -> Option<String> {
    match param {
        Parameter::String(s) if !s.trim().is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// Arguments of a record; a bare parameter counts as a single argument.
fn args(record: &Record) -> &[Parameter] {
    match &record.parameter {
        Parameter::List(items) => items,
        other => std::slice::from_ref(other),
    }
}

pub fn read_step(text: &str) -> Result<StepShapes, StepError> {
    let exchange = parse(text).map_err(|err| StepError::Syntax(err.to_string()))?;
    if exchange.data.is_empty() {
        return Err(StepError::NoData);
    }

    let mut simple: HashMap<u64, &Record> = HashMap::new();
    let mut complex: Vec<(u64, &[Record])> = Vec::new();
    for entity in exchange.data.iter().flat_map(|section| &section.entities) {
        match entity {
            EntityInstance::Simple { id, record } => {
                simple.insert(*id, record);
            }
            EntityInstance::Complex { id, subsuper } => complex.push((*id, subsuper.0.as_slice())),
        }
    }
    complex.sort_by_key(|(id, _)| *id);

    let length_unit = detect_length_unit(&simple, &complex);
    let reader = Reader { records: &simple };

    let mut brep_ids: Vec<u64> = simple
        .iter()
        .filter(|(_, r)| {
            matches!(
                r.name.as_str(),
                "MANIFOLD_SOLID_BREP" | "FACETED_BREP" | "BREP_WITH_VOIDS"
            )
        })
        .map(|(id, _)| *id)
        .collect();
    brep_ids.sort_unstable();
    if brep_ids.is_empty() {
        return Err(StepError::NoSolids);
    }

    let mut solids = Vec::with_capacity(brep_ids.len());
    for id in brep_ids {
        solids.push(reader.solid(id)?);
    }
    debug!(solids = solids.len(), length_unit, "parsed STEP data section");
    Ok(StepShapes { length_unit, solids })
}

struct Reader<'a> {
    records: &'a HashMap<u64, &'a Record>,
}

impl Reader<'_> {
    fn get(&self, id: u64) -> Result<&Record, StepError> {
        self.records
            .get(&id)
            .copied()
            .ok_or(StepError::MissingEntity(id))
    }

    fn param(&self, id: u64, index: usize) -> Result<&Parameter, StepError> {
        args(self.get(id)?).get(index).ok_or(StepError::BadParameter {
            id,
            index,
            what: "a value",
        })
    }

    fn ref_param(&self, id: u64, index: usize) -> Result<u64, StepError> {
        as_ref_id(self.param(id, index)?).ok_or(StepError::BadParameter {
            id,
            index,
            what: "an entity reference",
        })
    }

    fn list_param(&self, id: u64, index: usize) -> Result<&[Parameter], StepError> {
        match self.param(id, index)? {
            Parameter::List(items) => Ok(items),
            _ => Err(StepError::BadParameter {
                id,
                index,
                what: "a list",
            }),
        }
    }

    fn expect(&self, id: u64, keywords: &[&str]) -> Result<&Record, StepError> {
        let record = self.get(id)?;
        if keywords.contains(&record.name.as_str()) {
            Ok(record)
        } else {
            Err(StepError::WrongEntity {
                id,
                found: record.name.clone(),
                expected: keywords.join(" or "),
            })
        }
    }

    fn refs(&self, id: u64, index: usize, entity: &'static str) -> Result<Vec<u64>, StepError> {
        self.list_param(id, index)?
            .iter()
            .map(|item| {
                as_ref_id(item).ok_or_else(|| StepError::Topology {
                    entity,
                    id,
                    message: "lists a non-reference item".to_string(),
                })
            })
            .collect()
    }

    fn solid(&self, id: u64) -> Result<StepSolid, StepError> {
        let record = self.get(id)?;
        if record.name == "BREP_WITH_VOIDS" {
            return Err(StepError::SolidWithVoids(id));
        }
        let name = args(record).first().and_then(label);
        let shell = self.ref_param(id, 1)?;
        self.expect(shell, &["CLOSED_SHELL", "OPEN_SHELL"])?;

        let mut faces = Vec::new();
        for face_id in self.refs(shell, 1, "shell")? {
            faces.push(self.face(face_id)?);
        }
        Ok(StepSolid { id, name, faces })
    }

    fn face(&self, id: u64) -> Result<StepFace, StepError> {
        let record = self.expect(id, &["ADVANCED_FACE", "FACE_SURFACE"])?;
        let name = args(record).first().and_then(label);

        let surface = self.ref_param(id, 2)?;
        let surface_kind = &self.get(surface)?.name;
        if surface_kind != "PLANE" {
            return Err(StepError::NonPlanarFace {
                face: id,
                surface: surface_kind.clone(),
            });
        }

        let bounds = self.refs(id, 1, "face")?;
        let &[bound] = bounds.as_slice() else {
            return Err(StepError::FaceWithHoles {
                face: id,
                bounds: bounds.len(),
            });
        };
        self.expect(bound, &["FACE_OUTER_BOUND", "FACE_BOUND"])?;
        let loop_id = self.ref_param(bound, 1)?;
        let loop_forward = as_flag(self.param(bound, 2)?).unwrap_or(true);

        let mut points = match self.get(loop_id)?.name.as_str() {
            "EDGE_LOOP" => self.edge_loop(loop_id)?,
            "POLY_LOOP" => self.poly_loop(loop_id)?,
            other => {
                return Err(StepError::Topology {
                    entity: "loop",
                    id: loop_id,
                    message: format!("unsupported loop type {other}"),
                })
            }
        };
        if !loop_forward {
            points.reverse();
        }
        Ok(StepFace { id, name, points })
    }

    fn edge_loop(&self, id: u64) -> Result<Vec<(u64, Vector3<f64>)>, StepError> {
        let mut points = Vec::new();
        for oriented in self.refs(id, 1, "edge loop")? {
            self.expect(oriented, &["ORIENTED_EDGE"])?;
            let edge = self.ref_param(oriented, 3)?;
            let forward = as_flag(self.param(oriented, 4)?).unwrap_or(true);
            self.expect(edge, &["EDGE_CURVE"])?;
            let start = self.ref_param(edge, if forward { 1 } else { 2 })?;
            self.expect(start, &["VERTEX_POINT"])?;
            let point = self.ref_param(start, 1)?;
            points.push((point, self.point(point)?));
        }
        Ok(points)
    }

    fn poly_loop(&self, id: u64) -> Result<Vec<(u64, Vector3<f64>)>, StepError> {
        let mut points = Vec::new();
        for point in self.refs(id, 1, "poly loop")? {
            points.push((point, self.point(point)?));
        }
        Ok(points)
    }

    fn point(&self, id: u64) -> Result<Vector3<f64>, StepError> {
        self.expect(id, &["CARTESIAN_POINT"])?;
        let coords: Vec<f64> = self.list_param(id, 1)?.iter().filter_map(as_number).collect();
        match coords.as_slice() {
            [x, y, z] => Ok(Vector3::new(*x, *y, *z)),
            [x, y] => Ok(Vector3::new(*x, *y, 0.0)),
            _ => Err(StepError::Topology {
                entity: "point",
                id,
                message: format!("expected 2 or 3 coordinates, found {}", coords.len()),
            }),
        }
    }
}

/// Metres per SI length unit, from the prefix argument of `SI_UNIT`.
fn si_length(record: &Record) -> Option<f64> {
    let [prefix, Parameter::Enumeration(unit)] = args(record) else {
        return None;
    };
    if unit != "METRE" {
        return None;
    }
    match prefix {
        Parameter::Enumeration(p) => match p.as_str() {
            "MILLI" => Some(1e-3),
            "CENTI" => Some(1e-2),
            "MICRO" => Some(1e-6),
            "KILO" => Some(1e3),
            _ => None,
        },
        _ => Some(1.0),
    }
}

/// Metres per length unit. Conversion-based units win over the SI metre
/// they are defined in terms of.
fn detect_length_unit(simple: &HashMap<u64, &Record>, complex: &[(u64, &[Record])]) -> f64 {
    let mut si = None;
    for (_, parts) in complex {
        if !parts.iter().any(|r| r.name == "LENGTH_UNIT") {
            continue;
        }
        for part in parts.iter() {
            match part.name.as_str() {
                "CONVERSION_BASED_UNIT" => {
                    let factor = match args(part).first() {
                        Some(Parameter::String(n)) if n.eq_ignore_ascii_case("INCH") => Some(0.0254),
                        Some(Parameter::String(n)) if n.eq_ignore_ascii_case("FOOT") => Some(0.3048),
                        _ => None,
                    };
                    if let Some(factor) = factor {
                        return factor;
                    }
                }
                "SI_UNIT" => {
                    if let Some(unit) = si_length(part) {
                        si.get_or_insert(unit);
                    }
                }
                _ => {}
            }
        }
    }
    if si.is_none() {
        // Some writers emit the unit as a plain SI_UNIT instance.
        let mut ids: Vec<&u64> = simple.keys().collect();
        ids.sort_unstable();
        si = ids
            .into_iter()
            .filter(|id| simple[*id].name == "SI_UNIT")
            .find_map(|id| si_length(simple[id]));
    }
    si.unwrap_or_else(|| {
        warn!("no length unit declared in STEP file, assuming millimetres");
        1e-3
    })
}
