//! SVG export serializer.
//!
//! Converts Bezier paths into an SVG string using the [`svg`] crate for
//! document construction and XML escaping.
//!
//! All paths share one `<g>` carrying the stroke style and, for
//! millimetre canvases, the pixel-to-millimetre transform. Each path
//! becomes a `<path>` of one `M` command followed by `C` commands.
//!
//! Optional [`SvgMetadata`] embeds `<title>`, `<desc>` and a
//! `<metadata>` block carrying the pipeline configuration.
//!
//! This is a pure function with no I/O -- it returns a `String`.

use std::fmt::Write;

use svg::Document;
use svg::node::element::{Description, Element, Group, Path, Title};
use svg::node::{Node, Text};

use plotline_pipeline::{BezierPath, CanvasMode, CanvasTransform, PipelineError, ProcessResult, Stage};

/// Namespace of the `<plotline:pipeline>` metadata element.
const PIPELINE_NAMESPACE: &str = "urn:plotline:pipeline:1";

/// Metadata to embed in the SVG document.
///
/// All fields are optional. Text values are XML-escaped automatically
/// by the `svg` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct SvgMetadata<'a> {
    /// Document title, emitted as `<title>`.
    ///
    /// Typically the source image filename (without extension).
    pub title: Option<&'a str>,

    /// Document description, emitted as `<desc>`.
    ///
    /// Typically the pipeline parameters in human-readable form.
    pub description: Option<&'a str>,

    /// Serialized [`PipelineConfig`](plotline_pipeline::PipelineConfig)
    /// JSON, emitted inside `<metadata>` in a namespaced
    /// `<plotline:pipeline>` element so a drawing can be reproduced.
    pub config_json: Option<&'a str>,
}

/// Stage 8: pipeline result to SVG document.
#[derive(Debug, Clone, Copy, Default)]
pub struct SvgEmitter<'a> {
    /// Metadata written into every emitted document.
    pub metadata: SvgMetadata<'a>,
}

impl Stage<&ProcessResult> for SvgEmitter<'_> {
    type Output = String;

    fn name(&self) -> &'static str {
        "emit-svg"
    }

    fn run(&self, result: &ProcessResult) -> Result<String, PipelineError> {
        Ok(to_svg(result, &self.metadata))
    }
}

/// Build an SVG path `d` attribute string from a Bezier path.
///
/// Coordinates are written with two decimal places. Returns an empty
/// string for paths without segments.
///
/// # Examples
///
/// ```
/// use plotline_pipeline::{BezierPath, BezierSegment, Point};
/// use plotline_export::build_path_data;
///
/// let path = BezierPath {
///     start: Point::new(10.0, 20.0),
///     segments: vec![BezierSegment {
///         start: Point::new(10.0, 20.0),
///         control1: Point::new(15.0, 20.0),
///         control2: Point::new(25.0, 40.0),
///         end: Point::new(30.0, 40.0),
///     }],
/// };
/// assert_eq!(
///     build_path_data(&path),
///     "M 10.00,20.00 C 15.00,20.00 25.00,40.00 30.00,40.00"
/// );
/// ```
#[must_use]
pub fn build_path_data(path: &BezierPath) -> String {
    if path.segments.is_empty() {
        return String::new();
    }

    let mut d = format!("M {:.2},{:.2}", path.start.x, path.start.y);
    for s in &path.segments {
        let _ = write!(
            d,
            " C {:.2},{:.2} {:.2},{:.2} {:.2},{:.2}",
            s.control1.x, s.control1.y, s.control2.x, s.control2.y, s.end.x, s.end.y,
        );
    }
    d
}

/// The group `transform` attribute for a millimetre canvas.
///
/// `scale(s) translate(tx/s,ty/s)` places image pixel `(x, y)` at
/// `(tx + s*x, ty + s*y)` millimetres. Returns `None` in pixel mode.
#[must_use]
pub fn transform_attribute(transform: &CanvasTransform) -> Option<String> {
    match transform.mode {
        CanvasMode::Pixels { .. } => None,
        CanvasMode::Millimetres { .. } => Some(format!(
            "scale({:.6}) translate({:.6},{:.6})",
            transform.scale,
            transform.translate_x / transform.scale,
            transform.translate_y / transform.scale,
        )),
    }
}

/// Serialize a pipeline result as an SVG document string.
///
/// Pixel-mode documents are sized in pixels with a `viewBox` matching
/// the image. Millimetre documents are sized in millimetres with a
/// `viewBox` in millimetres, so one user unit is one millimetre.
///
/// Output is deterministic: identical inputs yield identical strings.
#[must_use]
pub fn to_svg(result: &ProcessResult, metadata: &SvgMetadata<'_>) -> String {
    let mut doc = match result.transform.mode {
        CanvasMode::Pixels { width, height } => Document::new()
            .set("width", width)
            .set("height", height)
            .set("viewBox", (0, 0, width, height)),
        CanvasMode::Millimetres {
            width_mm,
            height_mm,
        } => Document::new()
            .set("width", format!("{width_mm}mm"))
            .set("height", format!("{height_mm}mm"))
            .set("viewBox", format!("0 0 {width_mm} {height_mm}")),
    };

    if let Some(title) = metadata.title {
        doc = doc.add(Title::new(title));
    }

    if let Some(description) = metadata.description {
        doc = doc.add(Description::new().add(Text::new(description)));
    }

    if let Some(config_json) = metadata.config_json {
        let mut pipeline_el = Element::new("plotline:pipeline");
        pipeline_el.assign("xmlns:plotline", PIPELINE_NAMESPACE);
        pipeline_el.append(Text::new(config_json));
        let mut metadata_el = Element::new("metadata");
        metadata_el.append(pipeline_el);
        doc = doc.add(metadata_el);
    }

    let mut group = Group::new()
        .set("stroke", "black")
        .set("stroke-width", format!("{:.6}", result.transform.stroke_width))
        .set("fill", "none");
    if let Some(transform) = transform_attribute(&result.transform) {
        group = group.set("transform", transform);
    }

    let mut emitted = 0_usize;
    for path in &result.paths {
        let d = build_path_data(path);
        if d.is_empty() {
            continue;
        }
        group = group.add(Path::new().set("d", d));
        emitted += 1;
    }
    doc = doc.add(group);

    tracing::debug!(
        paths = emitted,
        physical = result.transform.is_physical(),
        "serialized svg"
    );

    // The svg crate omits the XML declaration, so we prepend it.
    format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{doc}\n")
}
