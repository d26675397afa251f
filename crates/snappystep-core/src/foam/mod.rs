//! OpenFOAM dictionary files: an ordered value tree, a reader and a writer.
//!
//! Only the subset needed for mesh-configuration dictionaries is supported:
//! nested dictionaries, lists (optionally count-prefixed), words, quoted
//! strings, numbers, multi-token entries and `#directive value` lines.

mod read;
mod write;

pub use read::parse;
pub use write::{to_foam_string, write_file};

use crate::geom::Vec3;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FoamError {
    #[error("syntax error at line {line}: {message}")]
    Syntax { line: usize, message: String },
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not render dictionary: {0}")]
    Format(#[from] std::fmt::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub enum FoamValue {
    Word(String),
    /// Quoted string, stored without the quotes.
    Str(String),
    Int(i64),
    Float(f64),
    List(Vec<FoamValue>),
    Dict(FoamDict),
    /// Several value tokens in one entry, e.g. `hex (0 1 2 3) (4 4 4)`.
    Seq(Vec<FoamValue>),
}

impl FoamValue {
    pub fn word(s: impl Into<String>) -> Self {
        FoamValue::Word(s.into())
    }

    pub fn string(s: impl Into<String>) -> Self {
        FoamValue::Str(s.into())
    }

    pub fn bool(v: bool) -> Self {
        FoamValue::Word(if v { "true" } else { "false" }.to_string())
    }

    pub fn switch(on: bool) -> Self {
        FoamValue::Word(if on { "on" } else { "off" }.to_string())
    }

    pub fn point(p: Vec3) -> Self {
        FoamValue::List(vec![
            FoamValue::Float(p.x),
            FoamValue::Float(p.y),
            FoamValue::Float(p.z),
        ])
    }

    pub fn ints(values: &[i64]) -> Self {
        FoamValue::List(values.iter().copied().map(FoamValue::Int).collect())
    }

    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            FoamValue::Word(_) | FoamValue::Str(_) | FoamValue::Int(_) | FoamValue::Float(_)
        )
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FoamValue::Word(s) | FoamValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FoamValue::Int(v) => Some(*v as f64),
            FoamValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FoamValue::Word(w) => match w.as_str() {
                "true" | "on" | "yes" | "y" => Some(true),
                "false" | "off" | "no" | "n" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[FoamValue]> {
        match self {
            FoamValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&FoamDict> {
        match self {
            FoamValue::Dict(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_dict_mut(&mut self) -> Option<&mut FoamDict> {
        match self {
            FoamValue::Dict(d) => Some(d),
            _ => None,
        }
    }
}

impl From<i64> for FoamValue {
    fn from(v: i64) -> Self {
        FoamValue::Int(v)
    }
}

impl From<f64> for FoamValue {
    fn from(v: f64) -> Self {
        FoamValue::Float(v)
    }
}

impl From<FoamDict> for FoamValue {
    fn from(d: FoamDict) -> Self {
        FoamValue::Dict(d)
    }
}

/// Dictionary that keeps entries in insertion order; inserting an existing
/// key replaces the value in place.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FoamDict {
    entries: Vec<(String, FoamValue)>,
}

impl FoamDict {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FoamValue>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<FoamValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&FoamValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut FoamValue> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn remove(&mut self, key: &str) -> Option<FoamValue> {
        let idx = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(idx).1)
    }

    pub fn get_dict(&self, key: &str) -> Option<&FoamDict> {
        self.get(key).and_then(FoamValue::as_dict)
    }

    /// Follows nested dictionaries, e.g. `["castellatedMeshControls", "refinementSurfaces"]`.
    pub fn get_path(&self, path: &[&str]) -> Option<&FoamValue> {
        let (last, parents) = path.split_last()?;
        let mut dict = self;
        for key in parents {
            dict = dict.get_dict(key)?;
        }
        dict.get(last)
    }

    /// Sub-dictionary under `key`, created (or replacing a non-dictionary value) if needed.
    pub fn dict_entry(&mut self, key: &str) -> &mut FoamDict {
        let idx = match self.entries.iter().position(|(k, _)| k == key) {
            Some(idx) => idx,
            None => {
                self.entries
                    .push((key.to_string(), FoamValue::Dict(FoamDict::new())));
                self.entries.len() - 1
            }
        };
        let slot = &mut self.entries[idx].1;
        if !matches!(slot, FoamValue::Dict(_)) {
            *slot = FoamValue::Dict(FoamDict::new());
        }
        match slot {
            FoamValue::Dict(d) => d,
            _ => unreachable!("entry was just made a dictionary"),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FoamValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}

/// Reads a dictionary file. An absent file yields `Ok(None)`; the
/// `FoamFile` header entry is dropped from the result.
pub fn read_file(path: &Path) -> Result<Option<FoamDict>, FoamError> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(FoamError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    let mut dict = parse(&text)?;
    dict.remove("FoamFile");
    Ok(Some(dict))
}
