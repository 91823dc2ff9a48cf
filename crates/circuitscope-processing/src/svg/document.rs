use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;
use std::sync::LazyLock;

use super::composer::ComposeError;

static LENGTH_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^\s*([+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?)").ok()
});

/// A parsed SVG drawing: its extents, the namespace declarations of its root and the
/// raw markup of the root's children.
#[derive(Debug, Clone, PartialEq)]
pub struct SvgDocument {
    pub width: f64,
    pub height: f64,
    /// `xmlns:*` declarations from the root element, other than the default namespace.
    pub namespaces: Vec<(String, String)>,
    /// Children of the root element, verbatim.
    pub content: String,
}

/// Leading number of a length attribute such as `210mm` or `297.5`.
fn parse_length(value: &str) -> Option<f64> {
    LENGTH_RE
        .as_ref()?
        .captures(value)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v > 0.0)
}

fn parse_view_box(value: &str) -> Option<(f64, f64)> {
    let parts: Vec<f64> = value
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|p| !p.is_empty())
        .map(|p| p.parse::<f64>().ok())
        .collect::<Option<Vec<_>>>()?;
    match parts.as_slice() {
        [_, _, w, h] if w.is_finite() && h.is_finite() && *w > 0.0 && *h > 0.0 => Some((*w, *h)),
        _ => None,
    }
}

struct RootAttributes {
    width: Option<String>,
    height: Option<String>,
    view_box: Option<String>,
    namespaces: Vec<(String, String)>,
}

fn root_attributes(element: &BytesStart<'_>) -> Result<RootAttributes, ComposeError> {
    let mut attrs = RootAttributes {
        width: None,
        height: None,
        view_box: None,
        namespaces: Vec::new(),
    };

    for attr in element.attributes() {
        let attr = attr.map_err(|e| ComposeError::Xml(e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| ComposeError::Xml(e.to_string()))?
            .into_owned();
        match key.as_str() {
            "width" => attrs.width = Some(value),
            "height" => attrs.height = Some(value),
            "viewBox" => attrs.view_box = Some(value),
            k if k.starts_with("xmlns:") => attrs.namespaces.push((k.to_string(), value)),
            _ => {}
        }
    }

    Ok(attrs)
}

impl SvgDocument {
    /// Parse an SVG document. `source` names the input in error messages.
    ///
    /// Extents come from `width`/`height` when both are numeric, otherwise from the
    /// last two `viewBox` components.
    pub fn parse(markup: &str, source: &str) -> Result<Self, ComposeError> {
        let mut reader = Reader::from_str(markup);

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) if e.local_name().as_ref() == b"svg" => {
                    let attrs = root_attributes(&e)?;
                    let (width, height) = Self::extents(&attrs, source)?;
                    let content = reader
                        .read_text(e.name())
                        .map_err(|err| ComposeError::Xml(err.to_string()))?
                        .into_owned();
                    return Ok(Self {
                        width,
                        height,
                        namespaces: attrs.namespaces,
                        content,
                    });
                }
                Ok(Event::Empty(e)) if e.local_name().as_ref() == b"svg" => {
                    let attrs = root_attributes(&e)?;
                    let (width, height) = Self::extents(&attrs, source)?;
                    return Ok(Self {
                        width,
                        height,
                        namespaces: attrs.namespaces,
                        content: String::new(),
                    });
                }
                Ok(Event::Start(_)) | Ok(Event::Empty(_)) => {
                    return Err(ComposeError::Xml(format!("{}: root element is not <svg>", source)))
                }
                Ok(Event::Eof) => {
                    return Err(ComposeError::Xml(format!("{}: no <svg> element", source)))
                }
                Ok(_) => {}
                Err(e) => return Err(ComposeError::Xml(format!("{}: {}", source, e))),
            }
        }
    }

    fn extents(attrs: &RootAttributes, source: &str) -> Result<(f64, f64), ComposeError> {
        let width = attrs.width.as_deref().and_then(parse_length);
        let height = attrs.height.as_deref().and_then(parse_length);
        if let (Some(w), Some(h)) = (width, height) {
            return Ok((w, h));
        }

        attrs
            .view_box
            .as_deref()
            .and_then(parse_view_box)
            .ok_or_else(|| ComposeError::UnreadableDimensions(source.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_length() {
        assert_eq!(parse_length("297mm"), Some(297.0));
        assert_eq!(parse_length(" 12.5"), Some(12.5));
        assert_eq!(parse_length("1e2px"), Some(100.0));
        assert_eq!(parse_length("100%"), Some(100.0));
        assert_eq!(parse_length("auto"), None);
        assert_eq!(parse_length("0"), None);
        assert_eq!(parse_length("-5"), None);
    }

    #[test]
    fn test_dimensions_from_attributes() {
        let doc = SvgDocument::parse(
            r#"<?xml version="1.0"?>
<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="297mm" height="210mm" viewBox="0 0 1 1"><title>Root</title><rect width="10" height="5"/></svg>"#,
            "root.svg",
        )
        .unwrap();
        assert_eq!((doc.width, doc.height), (297.0, 210.0));
        assert_eq!(
            doc.namespaces,
            vec![(
                "xmlns:xlink".to_string(),
                "http://www.w3.org/1999/xlink".to_string()
            )]
        );
        assert_eq!(doc.content, r#"<title>Root</title><rect width="10" height="5"/>"#);
    }

    #[test]
    fn test_dimensions_from_view_box() {
        let doc = SvgDocument::parse(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="auto" viewBox="0, 0, 420 297"/>"#,
            "a.svg",
        )
        .unwrap();
        assert_eq!((doc.width, doc.height), (420.0, 297.0));
        assert!(doc.content.is_empty());
    }

    #[test]
    fn test_unreadable_dimensions() {
        let err = SvgDocument::parse(
            r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 abc"><g/></svg>"#,
            "bad.svg",
        )
        .unwrap_err();
        assert!(matches!(err, ComposeError::UnreadableDimensions(ref s) if s == "bad.svg"));
    }

    #[test]
    fn test_not_svg() {
        assert!(matches!(
            SvgDocument::parse("<html></html>", "x"),
            Err(ComposeError::Xml(_))
        ));
    }
}
