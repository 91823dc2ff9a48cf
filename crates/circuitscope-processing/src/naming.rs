//! Slugs, collision-free filenames and sheet titles.

use regex::Regex;
use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

static TITLE_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?is)<title>(.*?)</title>").ok());

/// URL-safe slug: NFKD-folded to ASCII, lowercased, runs of anything outside
/// `[a-z0-9]` collapsed to `-`. Empty results become `fallback`.
pub fn slugify(value: &str, fallback: &str) -> String {
    let ascii: String = value
        .nfkd()
        .filter(char::is_ascii)
        .collect::<String>()
        .to_ascii_lowercase();

    let mut slug = String::with_capacity(ascii.len());
    let mut pending_dash = false;
    for c in ascii.chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        fallback.to_string()
    } else {
        slug
    }
}

/// Hands out filenames unique within one output directory.
#[derive(Debug, Default)]
pub struct UniqueNames {
    used: HashSet<String>,
}

impl UniqueNames {
    pub fn new() -> Self {
        Self::default()
    }

    /// `{base}{extension}`, or `{base}-1{extension}`, `{base}-2{extension}`, ... if taken.
    /// `extension` includes the dot.
    pub fn claim(&mut self, base: &str, extension: &str) -> String {
        let mut candidate = format!("{}{}", base, extension);
        let mut counter = 1;
        while self.used.contains(&candidate) {
            candidate = format!("{}-{}{}", base, counter, extension);
            counter += 1;
        }
        self.used.insert(candidate.clone());
        candidate
    }
}

/// Title of an exported sheet: its first `<title>` element, else the file stem.
pub fn sheet_title(markup: &str, path: &Path) -> String {
    let from_markup = TITLE_RE
        .as_ref()
        .and_then(|re| re.captures(markup))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string());

    match from_markup {
        Some(title) => title,
        None => path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("01-Power Supply", "sheet"), "01-power-supply");
        assert_eq!(slugify("  Ünïcödé  / Filter ", "sheet"), "unicode-filter");
        assert_eq!(slugify("--A__B--", "sheet"), "a-b");
        assert_eq!(slugify("日本", "sheet"), "sheet");
        assert_eq!(slugify("", "photo"), "photo");
    }

    #[test]
    fn test_unique_names() {
        let mut names = UniqueNames::new();
        assert_eq!(names.claim("01-root", ".svg"), "01-root.svg");
        assert_eq!(names.claim("01-root", ".svg"), "01-root-1.svg");
        assert_eq!(names.claim("01-root", ".svg"), "01-root-2.svg");
        assert_eq!(names.claim("01-root", ".png"), "01-root.png");
    }

    #[test]
    fn test_sheet_title() {
        let path = Path::new("/tmp/amp-power.svg");
        assert_eq!(
            sheet_title("<svg><TITLE> Power </TITLE></svg>", path),
            "Power"
        );
        assert_eq!(sheet_title("<svg><g/></svg>", path), "amp-power");
    }
}
