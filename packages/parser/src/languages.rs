//! Code block language table
//!
//! Process-wide alias table, built once on first use and read-only after.

use once_cell::sync::Lazy;
use std::collections::HashMap;

static LANGUAGE_ALIASES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("html", "html"),
        ("xml", "html"),
        ("css", "css"),
        ("js", "javascript"),
        ("javascript", "javascript"),
        ("ts", "typescript"),
        ("typescript", "typescript"),
        ("py", "python"),
        ("python", "python"),
        ("java", "java"),
        ("json", "json"),
        ("sh", "bash"),
        ("shell", "bash"),
        ("bash", "bash"),
        ("sql", "sql"),
        ("md", "markdown"),
        ("markdown", "markdown"),
        ("rs", "rust"),
        ("rust", "rust"),
        ("plaintext", "plaintext"),
        ("text", "plaintext"),
    ])
});

/// Canonical name for a language tag; unknown tags pass through lowercased
pub fn canonical_language(name: &str) -> String {
    let lower = name.trim().to_ascii_lowercase();
    match LANGUAGE_ALIASES.get(lower.as_str()) {
        Some(canonical) => (*canonical).to_string(),
        None => lower,
    }
}

pub fn is_known_language(name: &str) -> bool {
    LANGUAGE_ALIASES.contains_key(name.trim().to_ascii_lowercase().as_str())
}
