/// Normalizes a CAD entity name into a token usable as a dictionary key,
/// file name and shell argument.
///
/// Everything up to and including the last `/` is dropped, then leading dots,
/// then every character outside `[A-Za-z0-9_]` becomes `_`. The output only
/// contains `[A-Za-z0-9_]`, so applying it twice changes nothing. An input
/// with nothing left after stripping yields an empty string, which callers
/// treat as "unnamed".
pub fn validate_name(raw: &str) -> String {
    let tail = match raw.rfind('/') {
        Some(idx) => &raw[idx + 1..],
        None => raw,
    };
    let tail = tail.trim_start_matches('.');
    tail.chars()
        .map(|c| if is_name_char(c) { c } else { '_' })
        .collect()
}

pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(is_name_char)
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Validated name, or `None` when the raw name is blank or validates to nothing.
pub fn validated_label(raw: Option<&str>) -> Option<String> {
    let raw = raw?;
    if raw.trim().is_empty() {
        return None;
    }
    let name = validate_name(raw);
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}
