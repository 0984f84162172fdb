// 🔤 Name Normalization
// Comparison keys and base identities for fund names.
//
// key           = uppercase, whitespace runs collapsed, trimmed
// base identity = dashes blanked, strip terms removed in configured order

/// Dash characters treated as word separators: hyphen, en-dash, em-dash.
const DASHES: [char; 3] = ['-', '\u{2013}', '\u{2014}'];

/// Comparison key for a fund name. Idempotent.
pub fn normalize(name: &str) -> String {
    name.to_uppercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Replace every dash with a space, then normalize.
pub fn cleanse_dashes(name: &str) -> String {
    normalize(&name.replace(DASHES, " "))
}

/// Name with plan/option qualifiers stripped, used to group variants.
///
/// Each term is removed as a plain case-insensitive substring from the
/// result of the previous removal, so term order matters and a term can
/// eat part of an unrelated word. Both behaviours are kept as configured;
/// surrounding spaces in a term are part of the term.
pub fn base_identity(name: &str, strip_terms: &[String]) -> String {
    let mut stripped = cleanse_dashes(name);
    for term in strip_terms {
        if term.trim().is_empty() {
            continue;
        }
        stripped = stripped.replace(&term.to_uppercase(), "");
    }
    normalize(&stripped)
}
