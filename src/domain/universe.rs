//! The configured list of indices to process.

use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IndexEntry {
    pub code: String,
    pub name: String,
}

impl IndexEntry {
    /// `None` for a blank code. A blank name falls back to the code.
    pub fn new(code: &str, name: Option<&str>) -> Option<Self> {
        let code = code.trim();
        if code.is_empty() {
            return None;
        }
        let name = name.map(str::trim).filter(|n| !n.is_empty()).unwrap_or(code);
        Some(IndexEntry {
            code: code.to_string(),
            name: name.to_string(),
        })
    }

    pub fn label(&self) -> String {
        format!("{} ({})", self.name, self.code)
    }

    /// `<name>_<code>` with path separators replaced, for output file names.
    pub fn file_stem(&self) -> String {
        format!("{}_{}", self.name, self.code).replace(['/', '\\'], "_")
    }
}

/// `enabled` column semantics: missing means enabled; otherwise one of
/// true/1/yes/on, case-insensitive.
pub fn is_enabled(value: Option<&str>) -> bool {
    match value.map(|v| v.trim().to_lowercase()) {
        None => true,
        Some(v) if v.is_empty() => true,
        Some(v) => matches!(v.as_str(), "true" | "1" | "yes" | "on"),
    }
}

/// Comma-separated codes, e.g. from `--code sh000001,sz399006`. Blank tokens
/// and repeats are dropped.
pub fn parse_codes(input: &str) -> Vec<IndexEntry> {
    let mut seen = HashSet::new();
    input
        .split(',')
        .filter_map(|token| IndexEntry::new(token, None))
        .filter(|entry| seen.insert(entry.code.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_defaults_name_to_code() {
        let e = IndexEntry::new(" sh000001 ", Some("  ")).unwrap();
        assert_eq!(e.code, "sh000001");
        assert_eq!(e.name, "sh000001");
        assert!(IndexEntry::new("  ", Some("Name")).is_none());
    }

    #[test]
    fn entry_label_and_stem() {
        let e = IndexEntry::new("sz399006", Some("ChiNext/GEM")).unwrap();
        assert_eq!(e.label(), "ChiNext/GEM (sz399006)");
        assert_eq!(e.file_stem(), "ChiNext_GEM_sz399006");
    }

    #[test]
    fn enabled_values() {
        assert!(is_enabled(None));
        assert!(is_enabled(Some("")));
        assert!(is_enabled(Some("TRUE")));
        assert!(is_enabled(Some("yes")));
        assert!(is_enabled(Some(" on ")));
        assert!(is_enabled(Some("1")));
        assert!(!is_enabled(Some("false")));
        assert!(!is_enabled(Some("0")));
        assert!(!is_enabled(Some("off")));
    }

    #[test]
    fn parse_codes_skips_blanks_and_repeats() {
        let entries = parse_codes("sh000001, ,sz399006,sh000001");
        let codes: Vec<&str> = entries.iter().map(|e| e.code.as_str()).collect();
        assert_eq!(codes, vec!["sh000001", "sz399006"]);
    }
}
