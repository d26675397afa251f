use super::{FoamDict, FoamError, FoamValue};
use std::fmt::{self, Write as _};
use std::path::Path;

const INDENT: &str = "    ";
const KEY_WIDTH: usize = 15;

/// Renders `dict` as an OpenFOAM dictionary file with a `FoamFile` header
/// naming `object`. Output depends only on the dictionary contents.
pub fn to_foam_string(dict: &FoamDict, object: &str) -> Result<String, FoamError> {
    let mut out = String::new();
    writeln!(
        out,
        "/*--------------------------------*- C++ -*----------------------------------*\\"
    )?;
    writeln!(out, "  Generated by snappystep")?;
    writeln!(
        out,
        "\\*---------------------------------------------------------------------------*/"
    )?;
    let header = FoamDict::new()
        .with("version", FoamValue::Float(2.0))
        .with("format", FoamValue::word("ascii"))
        .with("class", FoamValue::word("dictionary"))
        .with("object", FoamValue::word(object));
    write_entry(&mut out, "FoamFile", &FoamValue::Dict(header), 0)?;
    writeln!(
        out,
        "// * * * * * * * * * * * * * * * * * * * * * * * * * * * * * * * * * * * * * //"
    )?;
    writeln!(out)?;
    write_entries(&mut out, dict, 0)?;
    writeln!(out)?;
    writeln!(
        out,
        "// ************************************************************************* //"
    )?;
    Ok(out)
}

/// Writes `dict` to `path`, removing any previous file first.
pub fn write_file(path: &Path, dict: &FoamDict, object: &str) -> Result<(), FoamError> {
    let text = to_foam_string(dict, object)?;
    if path.is_file() {
        std::fs::remove_file(path).map_err(|source| FoamError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|source| FoamError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }
    std::fs::write(path, text).map_err(|source| FoamError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn write_entries(out: &mut String, dict: &FoamDict, depth: usize) -> fmt::Result {
    for (key, value) in dict.iter() {
        write_entry(out, key, value, depth)?;
    }
    Ok(())
}

fn write_entry(out: &mut String, key: &str, value: &FoamValue, depth: usize) -> fmt::Result {
    let pad = INDENT.repeat(depth);
    if key.starts_with('#') {
        return writeln!(out, "{pad}{key} {}", inline(value));
    }
    match value {
        FoamValue::Dict(d) => {
            writeln!(out, "{pad}{key}")?;
            writeln!(out, "{pad}{{")?;
            write_entries(out, d, depth + 1)?;
            writeln!(out, "{pad}}}")?;
            if depth == 0 {
                writeln!(out)?;
            }
        }
        FoamValue::List(items) if !is_inline(value) => {
            writeln!(out, "{pad}{key}")?;
            writeln!(out, "{pad}(")?;
            for item in items {
                write_item(out, item, depth + 1)?;
            }
            writeln!(out, "{pad});")?;
            if depth == 0 {
                writeln!(out)?;
            }
        }
        _ => {
            writeln!(
                out,
                "{pad}{key:<width$} {};",
                inline(value),
                width = KEY_WIDTH
            )?;
        }
    }
    Ok(())
}

fn write_item(out: &mut String, item: &FoamValue, depth: usize) -> fmt::Result {
    let pad = INDENT.repeat(depth);
    match item {
        FoamValue::Dict(d) => {
            writeln!(out, "{pad}{{")?;
            write_entries(out, d, depth + 1)?;
            writeln!(out, "{pad}}}")?;
        }
        FoamValue::Seq(parts) if !is_inline(item) => {
            if let [FoamValue::Word(name), FoamValue::Dict(d)] = parts.as_slice() {
                writeln!(out, "{pad}{name}")?;
                writeln!(out, "{pad}{{")?;
                write_entries(out, d, depth + 1)?;
                writeln!(out, "{pad}}}")?;
            } else {
                for part in parts {
                    write_item(out, part, depth)?;
                }
            }
        }
        FoamValue::List(items) if !is_inline(item) => {
            writeln!(out, "{pad}(")?;
            for inner in items {
                write_item(out, inner, depth + 1)?;
            }
            writeln!(out, "{pad})")?;
        }
        _ => {
            writeln!(out, "{pad}{}", inline(item))?;
        }
    }
    Ok(())
}

fn is_inline(value: &FoamValue) -> bool {
    match value {
        FoamValue::Dict(_) => false,
        FoamValue::List(items) | FoamValue::Seq(items) => items.iter().all(is_inline),
        _ => true,
    }
}

fn inline(value: &FoamValue) -> String {
    match value {
        FoamValue::Word(w) => w.clone(),
        FoamValue::Str(s) => format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
        FoamValue::Int(v) => v.to_string(),
        FoamValue::Float(v) => fmt_float(*v),
        FoamValue::List(items) => {
            let parts: Vec<String> = items.iter().map(inline).collect();
            format!("({})", parts.join(" "))
        }
        FoamValue::Seq(items) => {
            let parts: Vec<String> = items.iter().map(inline).collect();
            parts.join(" ")
        }
        FoamValue::Dict(d) => {
            let entries: Vec<String> = d.iter().map(|(k, v)| format!(" {k} {};", inline(v))).collect();
            format!("{{{} }}", entries.concat())
        }
    }
}

fn fmt_float(v: f64) -> String {
    if !v.is_finite() {
        return "0".to_string();
    }
    // Debug keeps a decimal point or exponent, so the value reads back as a float.
    let s = format!("{v:?}");
    if s == "-0.0" {
        "0.0".to_string()
    } else {
        s
    }
}
