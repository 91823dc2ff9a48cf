//! Relative path sanitization.
//!
//! Every storage key derived from archive contents and every asset path supplied by a
//! client goes through [`sanitize_relative_path`] before it is joined onto anything.
//! The check is purely lexical: it never consults the filesystem.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

/// Normalize a relative path, rejecting anything that could escape its root.
///
/// Both `/` and `\` are treated as separators. Empty and `.` segments are dropped and
/// the result is joined with `/`. Fails with [`PathError::InvalidPath`] when the input is
/// absolute (leading separator or a drive prefix such as `C:`), contains a `..` segment,
/// contains a NUL byte, or normalizes to nothing.
pub fn sanitize_relative_path(raw: &str) -> Result<String, PathError> {
    if raw.contains('\0') {
        return Err(PathError::InvalidPath("path contains a NUL byte".to_string()));
    }
    if raw.starts_with('/') || raw.starts_with('\\') || has_drive_prefix(raw) {
        return Err(PathError::InvalidPath(format!("absolute path: {}", raw)));
    }

    let mut segments = Vec::new();
    for segment in raw.split(['/', '\\']) {
        match segment {
            "" | "." => continue,
            ".." => {
                return Err(PathError::InvalidPath(format!(
                    "parent directory segment in: {}",
                    raw
                )))
            }
            other => segments.push(other),
        }
    }

    if segments.is_empty() {
        return Err(PathError::InvalidPath("empty path".to_string()));
    }

    Ok(segments.join("/"))
}

fn has_drive_prefix(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// Case-insensitive extension check against an allow-list (entries without the dot).
pub fn has_allowed_extension(path: &str, allowed: &[&str]) -> bool {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => {
            let ext = ext.to_ascii_lowercase();
            allowed.iter().any(|a| *a == ext)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalizes_segments() {
        assert_eq!(
            sanitize_relative_path("schematics/01-root.svg").unwrap(),
            "schematics/01-root.svg"
        );
        assert_eq!(
            sanitize_relative_path("./layouts//front.svg").unwrap(),
            "layouts/front.svg"
        );
        assert_eq!(
            sanitize_relative_path("models\\board.glb").unwrap(),
            "models/board.glb"
        );
    }

    #[test]
    fn test_rejects_traversal_and_absolute() {
        for bad in [
            "../index.json",
            "schematics/../../etc/passwd",
            "a\\..\\b",
            "/etc/passwd",
            "\\windows\\system32",
            "C:/boot.ini",
            "",
            ".",
            "./",
            "file\0.svg",
        ] {
            assert!(
                matches!(sanitize_relative_path(bad), Err(PathError::InvalidPath(_))),
                "expected {:?} to be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_dotted_names_are_not_traversal() {
        assert_eq!(
            sanitize_relative_path("photos/..hidden.png").unwrap(),
            "photos/..hidden.png"
        );
    }

    #[test]
    fn test_has_allowed_extension() {
        let allowed = ["svg", "glb"];
        assert!(has_allowed_extension("layouts/front.svg", &allowed));
        assert!(has_allowed_extension("models/BOARD.GLB", &allowed));
        assert!(!has_allowed_extension("index.json", &allowed));
        assert!(!has_allowed_extension("layouts/.svg", &allowed));
        assert!(!has_allowed_extension("noext", &allowed));
    }

    mod proptests {
        use super::super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_parent_segment_never_accepted(
                prefix in "[a-z]{0,6}(/[a-z]{1,6}){0,3}",
                suffix in "([a-z]{1,6}/){0,3}[a-z]{1,6}\\.svg",
            ) {
                let raw = if prefix.is_empty() {
                    format!("../{}", suffix)
                } else {
                    format!("{}/../{}", prefix, suffix)
                };
                prop_assert!(sanitize_relative_path(&raw).is_err());
            }

            #[test]
            fn prop_absolute_never_accepted(rest in "[a-z/]{0,20}") {
                let raw = format!("/{}", rest);
                prop_assert!(sanitize_relative_path(&raw).is_err());
            }

            #[test]
            fn prop_output_is_clean(raw in "[a-z./\\\\]{1,30}") {
                if let Ok(clean) = sanitize_relative_path(&raw) {
                    prop_assert!(!clean.starts_with('/'));
                    prop_assert!(!clean.contains('\\'));
                    prop_assert!(clean.split('/').all(|s| !s.is_empty() && s != "." && s != ".."));
                }
            }
        }
    }
}
