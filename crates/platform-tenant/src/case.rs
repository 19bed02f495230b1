//! camelCase ↔ snake_case key translation
//!
//! The backend stores keys in snake_case while the rendering edge and the
//! browser speak camelCase. Lookups go through [`key_variants`] so either
//! spelling finds the same value.

/// Convert a key to snake_case (`apiUrl` → `api_url`).
///
/// Dots are left alone so dotted paths translate segment by segment.
pub fn to_snake_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    let mut prev: Option<char> = None;

    for c in key.chars() {
        if c.is_ascii_uppercase() {
            if matches!(prev, Some(p) if p.is_ascii_lowercase() || p.is_ascii_digit()) {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
        prev = Some(c);
    }

    out
}

/// Convert a key to camelCase (`api_url` → `apiUrl`).
pub fn to_camel_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut upper_next = false;

    for c in key.chars() {
        match c {
            '_' if !out.is_empty() && !out.ends_with('.') => upper_next = true,
            _ if upper_next => {
                out.push(c.to_ascii_uppercase());
                upper_next = false;
            }
            _ => out.push(c),
        }
    }

    out
}

/// The spellings a lookup should try, in order: as given, snake, camel.
pub fn key_variants(key: &str) -> Vec<String> {
    let mut variants = vec![key.to_string()];

    for candidate in [to_snake_case(key), to_camel_case(key)] {
        if !variants.contains(&candidate) {
            variants.push(candidate);
        }
    }

    variants
}
