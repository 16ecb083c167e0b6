//! Conversion between dotted and undotted code identifiers.

use regex::Regex;
use std::sync::LazyLock;

static CODE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z][0-9][0-9A-Z](\.[0-9A-Z]{1,4})?$").expect("static pattern"));

/// `E11.621` -> `E11621`
pub fn remove_dots(code: &str) -> String {
    code.replace('.', "")
}

/// `E11621` -> `E11.621`; codes of three characters or fewer are returned as-is.
pub fn add_dots(code: &str) -> String {
    let bare = remove_dots(code);
    if bare.chars().count() <= 3 {
        return bare;
    }
    let split = bare.char_indices().nth(3).map(|(i, _)| i).unwrap_or(bare.len());
    format!("{}.{}", &bare[..split], &bare[split..])
}

/// Canonical form: trimmed, upper-cased, dot after the third character.
pub fn normalize_code(code: &str) -> String {
    add_dots(&code.trim().to_uppercase())
}

/// Whether a normalized identifier has the letter + digits shape.
pub fn is_well_formed(code: &str) -> bool {
    CODE_PATTERN.is_match(code)
}

/// The three-character category stem of a code (`E11.621` -> `E11`).
pub fn category_stem(code: &str) -> String {
    remove_dots(&normalize_code(code)).chars().take(3).collect()
}
