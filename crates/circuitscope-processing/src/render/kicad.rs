//! `kicad-cli` argument vectors.

use std::ffi::OsString;
use std::path::Path;

/// One board layer drawing to export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerSpec {
    /// Semantic key, also the output file stem.
    pub key: &'static str,
    pub title: &'static str,
    /// Physical layers included in the drawing.
    pub layers: &'static [&'static str],
    pub mirror: bool,
}

/// Layer drawings attempted for every board, in manifest order. Inner layers missing
/// from a board make the export fail; that is expected.
pub const BOARD_LAYER_SPECS: &[LayerSpec] = &[
    LayerSpec {
        key: "front",
        title: "Front copper",
        layers: &["F.Cu", "F.Mask", "F.SilkS", "Edge.Cuts", "User.Drawings"],
        mirror: false,
    },
    LayerSpec {
        key: "back",
        title: "Back copper",
        layers: &["B.Cu", "B.Mask", "B.SilkS", "Edge.Cuts", "User.Drawings"],
        mirror: true,
    },
    LayerSpec {
        key: "inner-1",
        title: "Inner copper 1",
        layers: &["In1.Cu", "Edge.Cuts"],
        mirror: false,
    },
    LayerSpec {
        key: "inner-2",
        title: "Inner copper 2",
        layers: &["In2.Cu", "Edge.Cuts"],
        mirror: false,
    },
    LayerSpec {
        key: "inner-3",
        title: "Inner copper 3",
        layers: &["In3.Cu", "Edge.Cuts"],
        mirror: false,
    },
    LayerSpec {
        key: "inner-4",
        title: "Inner copper 4",
        layers: &["In4.Cu", "Edge.Cuts"],
        mirror: false,
    },
];

fn args<const N: usize>(fixed: [&str; N]) -> Vec<OsString> {
    fixed.iter().map(OsString::from).collect()
}

/// Export every sheet of `source` as SVG files into `output_dir`.
pub fn schematic_svg_args(source: &Path, output_dir: &Path) -> Vec<OsString> {
    let mut out = args(["sch", "export", "svg", "--output"]);
    out.push(output_dir.as_os_str().to_owned());
    out.extend(args(["--exclude-drawing-sheet", "--no-background-color"]));
    out.push(source.as_os_str().to_owned());
    out
}

/// Export one layer set of `source` into the SVG file `output`.
pub fn board_layer_svg_args(source: &Path, output: &Path, spec: &LayerSpec) -> Vec<OsString> {
    let mut out = args(["pcb", "export", "svg", "--output"]);
    out.push(output.as_os_str().to_owned());
    out.push("--layers".into());
    out.push(spec.layers.join(",").into());
    out.extend(args(["--exclude-drawing-sheet", "--page-size-mode", "2"]));
    if spec.mirror {
        out.push("--mirror".into());
    }
    out.push(source.as_os_str().to_owned());
    out
}

/// Export a GLB model of `source` with copper, pads, zones, silkscreen and soldermask,
/// substituting placeholder footprint models.
pub fn board_glb_args(source: &Path, output: &Path) -> Vec<OsString> {
    let mut out = args(["pcb", "export", "glb", "--output"]);
    out.push(output.as_os_str().to_owned());
    out.extend(args([
        "--include-tracks",
        "--include-pads",
        "--include-zones",
        "--include-silkscreen",
        "--include-soldermask",
        "--subst-models",
    ]));
    out.push(source.as_os_str().to_owned());
    out
}
