//! plotline-export: Pure SVG serializer (sans-IO)
//!
//! Converts fitted Bezier paths and their canvas mapping into a
//! plotter-ready SVG document string.

pub mod svg;

pub use svg::{SvgEmitter, SvgMetadata, build_path_data, to_svg, transform_attribute};
