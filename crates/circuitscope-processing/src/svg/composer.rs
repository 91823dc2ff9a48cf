//! Grid composition of several SVG drawings into one.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::Writer;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use super::document::SvgDocument;

const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";
const SCALE_TOLERANCE: f64 = 1e-9;

#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    #[error("Unable to read dimensions from {0}")]
    UnreadableDimensions(String),

    #[error("No drawings supplied for composition")]
    Empty,

    #[error("SVG error: {0}")]
    Xml(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// `(columns, rows)` of the balanced grid for `count` items:
/// `columns = ceil(sqrt(count))`, `rows = ceil(count / columns)`.
pub fn grid_shape(count: usize) -> (usize, usize) {
    if count == 0 {
        return (1, 1);
    }
    let mut columns = (count as f64).sqrt().ceil() as usize;
    // Correct float rounding at perfect squares.
    while columns > 1 && (columns - 1) * (columns - 1) >= count {
        columns -= 1;
    }
    while columns * columns < count {
        columns += 1;
    }
    (columns, count.div_ceil(columns))
}

/// Placement geometry for a composed grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLayout {
    pub columns: usize,
    pub rows: usize,
    pub max_width: f64,
    pub max_height: f64,
    pub padding_x: f64,
    pub padding_y: f64,
    pub width: f64,
    pub height: f64,
}

impl GridLayout {
    /// Layout for drawings of the given `(width, height)` extents.
    pub fn new(extents: &[(f64, f64)], padding_ratio: f64) -> Result<Self, ComposeError> {
        if extents.is_empty() {
            return Err(ComposeError::Empty);
        }

        let max_width = extents.iter().map(|e| e.0).fold(0.0_f64, f64::max);
        let max_height = extents.iter().map(|e| e.1).fold(0.0_f64, f64::max);
        let (columns, rows) = grid_shape(extents.len());

        let padding_x = max_width * padding_ratio;
        let padding_y = max_height * padding_ratio;

        Ok(Self {
            columns,
            rows,
            max_width,
            max_height,
            padding_x,
            padding_y,
            width: columns as f64 * (max_width + padding_x) - padding_x,
            height: rows as f64 * (max_height + padding_y) - padding_y,
        })
    }

    pub fn cell_width(&self) -> f64 {
        self.max_width + self.padding_x
    }

    pub fn cell_height(&self) -> f64 {
        self.max_height + self.padding_y
    }

    /// Translation of the item at `index`, filled row by row.
    pub fn offset(&self, index: usize) -> (f64, f64) {
        let row = index / self.columns;
        let col = index % self.columns;
        (col as f64 * self.cell_width(), row as f64 * self.cell_height())
    }

    /// Uniform scale bringing an item up to the cell extents, or `None` when it would
    /// be a no-op.
    pub fn scale_for(&self, width: f64, height: f64) -> Option<f64> {
        let sx = if width > 0.0 { self.max_width / width } else { 1.0 };
        let sy = if height > 0.0 { self.max_height / height } else { 1.0 };
        let scale = sx.min(sy);
        if (scale - 1.0).abs() <= SCALE_TOLERANCE * scale.abs().max(1.0) {
            None
        } else {
            Some(scale)
        }
    }
}

fn xml_err(e: impl std::fmt::Display) -> ComposeError {
    ComposeError::Xml(e.to_string())
}

/// Composes drawings into one grid drawing.
#[derive(Debug, Clone, Copy)]
pub struct SvgComposer {
    padding_ratio: f64,
}

impl Default for SvgComposer {
    fn default() -> Self {
        Self { padding_ratio: 0.05 }
    }
}

impl SvgComposer {
    pub fn new(padding_ratio: f64) -> Self {
        Self { padding_ratio }
    }

    /// Compose parsed documents into SVG markup. Inputs are only read.
    pub fn compose(&self, documents: &[SvgDocument]) -> Result<(String, GridLayout), ComposeError> {
        let extents: Vec<(f64, f64)> = documents.iter().map(|d| (d.width, d.height)).collect();
        let layout = GridLayout::new(&extents, self.padding_ratio)?;

        let mut writer = Writer::new(Vec::new());
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
            .map_err(xml_err)?;
        writer.get_mut().write_all(b"\n")?;

        let width = layout.width.to_string();
        let height = layout.height.to_string();
        let view_box = format!("0 0 {} {}", layout.width, layout.height);

        let mut root = BytesStart::new("svg");
        root.push_attribute(("xmlns", SVG_NAMESPACE));
        let mut declared: Vec<&str> = Vec::new();
        for (prefix, uri) in documents.iter().flat_map(|d| d.namespaces.iter()) {
            if !declared.contains(&prefix.as_str()) {
                declared.push(prefix.as_str());
                root.push_attribute((prefix.as_str(), uri.as_str()));
            }
        }
        root.push_attribute(("width", width.as_str()));
        root.push_attribute(("height", height.as_str()));
        root.push_attribute(("viewBox", view_box.as_str()));
        root.push_attribute(("version", "1.1"));
        writer.write_event(Event::Start(root)).map_err(xml_err)?;

        for (index, doc) in documents.iter().enumerate() {
            let (x, y) = layout.offset(index);
            let translate = format!("translate({},{})", x, y);
            let mut placed = BytesStart::new("g");
            placed.push_attribute(("transform", translate.as_str()));
            writer.write_event(Event::Start(placed)).map_err(xml_err)?;

            let mut sheet = BytesStart::new("g");
            let scale = layout
                .scale_for(doc.width, doc.height)
                .map(|s| format!("scale({})", s));
            if let Some(scale) = &scale {
                sheet.push_attribute(("transform", scale.as_str()));
            }
            writer.write_event(Event::Start(sheet)).map_err(xml_err)?;
            writer.get_mut().write_all(doc.content.as_bytes())?;
            writer
                .write_event(Event::End(BytesEnd::new("g")))
                .map_err(xml_err)?;

            writer
                .write_event(Event::End(BytesEnd::new("g")))
                .map_err(xml_err)?;
        }

        writer
            .write_event(Event::End(BytesEnd::new("svg")))
            .map_err(xml_err)?;

        let markup = String::from_utf8(writer.into_inner()).map_err(xml_err)?;
        Ok((markup, layout))
    }

    /// Read `inputs`, compose them in order and write the result to `destination`.
    ///
    /// Blocking; fails as a whole if any input has unreadable dimensions.
    pub fn compose_files(
        &self,
        inputs: &[PathBuf],
        destination: &Path,
    ) -> Result<GridLayout, ComposeError> {
        let mut documents = Vec::with_capacity(inputs.len());
        for input in inputs {
            let markup = std::fs::read_to_string(input)?;
            let name = input.display().to_string();
            documents.push(SvgDocument::parse(&markup, &name)?);
        }

        let (markup, layout) = self.compose(&documents)?;
        if let Some(dir) = destination.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(destination, markup)?;
        Ok(layout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(width: f64, height: f64, content: &str) -> SvgDocument {
        SvgDocument {
            width,
            height,
            namespaces: Vec::new(),
            content: content.to_string(),
        }
    }

    #[test]
    fn test_grid_shape() {
        assert_eq!(grid_shape(1), (1, 1));
        assert_eq!(grid_shape(2), (2, 1));
        assert_eq!(grid_shape(3), (2, 2));
        assert_eq!(grid_shape(4), (2, 2));
        assert_eq!(grid_shape(5), (3, 2));
        assert_eq!(grid_shape(9), (3, 3));
        assert_eq!(grid_shape(10), (4, 3));
    }

    #[test]
    fn test_layout_geometry() {
        let layout = GridLayout::new(&[(100.0, 50.0), (80.0, 60.0), (100.0, 50.0)], 0.1).unwrap();
        assert_eq!((layout.columns, layout.rows), (2, 2));
        assert!((layout.padding_x - 10.0).abs() < 1e-9);
        assert!((layout.width - 210.0).abs() < 1e-9);
        assert!((layout.height - 126.0).abs() < 1e-9);
        assert_eq!(layout.offset(0), (0.0, 0.0));
        assert_eq!(layout.offset(1), (110.0, 0.0));
        assert_eq!(layout.offset(2), (0.0, 66.0));
    }

    #[test]
    fn test_scale_only_when_needed() {
        let layout = GridLayout::new(&[(100.0, 50.0), (50.0, 20.0)], 0.05).unwrap();
        assert_eq!(layout.scale_for(100.0, 50.0), None);
        assert_eq!(layout.scale_for(50.0, 20.0), Some(2.0));
    }

    #[test]
    fn test_compose_markup() {
        let composer = SvgComposer::default();
        let (markup, layout) = composer
            .compose(&[
                doc(100.0, 50.0, r#"<rect id="a"/>"#),
                doc(50.0, 25.0, r#"<circle id="b"/>"#),
            ])
            .unwrap();

        assert_eq!((layout.columns, layout.rows), (2, 1));
        assert!(markup.starts_with("<?xml"));
        assert!(markup.contains(r#"viewBox="0 0 205 50""#));
        assert!(markup.contains(r#"version="1.1""#));
        assert!(markup.contains(r#"<g transform="translate(0,0)"><g><rect id="a"/></g></g>"#));
        assert!(markup.contains(
            r#"<g transform="translate(105,0)"><g transform="scale(2)"><circle id="b"/></g></g>"#
        ));
    }

    #[test]
    fn test_compose_carries_namespaces() {
        let mut first = doc(10.0, 10.0, r##"<use xlink:href="#s"/>"##);
        first.namespaces = vec![(
            "xmlns:xlink".to_string(),
            "http://www.w3.org/1999/xlink".to_string(),
        )];
        let second = first.clone();
        let (markup, _) = SvgComposer::default().compose(&[first, second]).unwrap();
        assert_eq!(markup.matches("xmlns:xlink=").count(), 1);
        let parsed = SvgDocument::parse(&markup, "composed").unwrap();
        assert_eq!(parsed.namespaces.len(), 1);
    }

    #[test]
    fn test_compose_empty() {
        assert!(matches!(
            SvgComposer::default().compose(&[]),
            Err(ComposeError::Empty)
        ));
    }

    #[test]
    fn test_compose_files_unreadable_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.svg");
        let bad = dir.path().join("bad.svg");
        std::fs::write(&good, r#"<svg width="10" height="10"><g/></svg>"#).unwrap();
        std::fs::write(&bad, r#"<svg><g/></svg>"#).unwrap();
        let out = dir.path().join("out/grid.svg");

        let err = SvgComposer::default()
            .compose_files(&[good, bad], &out)
            .unwrap_err();
        assert!(matches!(err, ComposeError::UnreadableDimensions(_)));
        assert!(!out.exists());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn extents() -> impl Strategy<Value = Vec<(f64, f64)>> {
            prop::collection::vec((1.0f64..2000.0, 1.0f64..2000.0), 1..20)
        }

        proptest! {
            #[test]
            fn canvas_width_matches_formula(dims in extents(), ratio in 0.0f64..0.5) {
                let layout = GridLayout::new(&dims, ratio).unwrap();
                let n = dims.len();
                let columns = (n as f64).sqrt().ceil() as usize;
                let max_w = dims.iter().map(|d| d.0).fold(0.0, f64::max);
                let expected = columns as f64 * (max_w * (1.0 + ratio)) - max_w * ratio;

                prop_assert_eq!(layout.columns, columns);
                prop_assert_eq!(layout.rows, n.div_ceil(columns));
                prop_assert!(layout.columns * layout.rows >= n);
                prop_assert!((layout.width - expected).abs() <= 1e-6 * expected.max(1.0));
            }

            #[test]
            fn every_item_inside_canvas(dims in extents()) {
                let layout = GridLayout::new(&dims, 0.05).unwrap();
                for (i, (w, h)) in dims.iter().enumerate() {
                    let (x, y) = layout.offset(i);
                    let scale = layout.scale_for(*w, *h).unwrap_or(1.0);
                    prop_assert!(x + w * scale <= layout.width + 1e-6);
                    prop_assert!(y + h * scale <= layout.height + 1e-6);
                }
            }

            #[test]
            fn content_preserved_exactly_once(
                dims in extents(),
                children in 1usize..5,
            ) {
                let docs: Vec<SvgDocument> = dims
                    .iter()
                    .enumerate()
                    .map(|(i, (w, h))| {
                        let content: String = (0..children)
                            .map(|j| format!(r#"<rect id="s{}-r{}"/>"#, i, j))
                            .collect();
                        doc(*w, *h, &content)
                    })
                    .collect();

                let (markup, _) = SvgComposer::default().compose(&docs).unwrap();

                prop_assert_eq!(markup.matches("translate(").count(), docs.len());
                prop_assert_eq!(markup.matches("<rect ").count(), docs.len() * children);
                for i in 0..docs.len() {
                    for j in 0..children {
                        let id = format!(r#"id="s{}-r{}""#, i, j);
                        prop_assert_eq!(markup.matches(id.as_str()).count(), 1);
                    }
                }
                for d in &docs {
                    prop_assert!(d.content.contains("<rect "));
                }
            }
        }
    }
}
