//! SVG to PNG data URI for destinations that drop inline vector markup.

use super::svg::svg_dimensions;
use crate::error::MdbError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use log::debug;
use std::sync::{Arc, OnceLock};

/// Supersampling multiplier for crisp output on high-density displays.
pub const DEFAULT_SCALE: f32 = 3.0;

/// Larger pixmaps are refused instead of allocated.
const MAX_SIDE: f32 = 16_384.0;

static FONT_DB: OnceLock<Arc<usvg::fontdb::Database>> = OnceLock::new();

fn font_database() -> Arc<usvg::fontdb::Database> {
    FONT_DB
        .get_or_init(|| {
            let mut db = usvg::fontdb::Database::new();
            db.load_system_fonts();
            debug!("loaded {} font faces for rasterization", db.len());
            Arc::new(db)
        })
        .clone()
}

/// Render `svg` at `scale` and return a `data:image/png;base64,...` URI.
///
/// The output size is the intrinsic size from [`svg_dimensions`] times
/// `scale`, whatever the document's own sizing says.
pub fn rasterize_svg(svg: &str, scale: f32) -> Result<String, MdbError> {
    let scale = if scale.is_finite() && scale > 0.0 {
        scale
    } else {
        DEFAULT_SCALE
    };
    let (width, height) = svg_dimensions(svg);

    let mut options = usvg::Options::default();
    options.fontdb = font_database();
    let tree = usvg::Tree::from_data(svg.as_bytes(), &options)
        .map_err(|e| MdbError::Raster(format!("invalid SVG: {e}")))?;

    let target_w = (width as f32 * scale).ceil();
    let target_h = (height as f32 * scale).ceil();
    if target_w > MAX_SIDE || target_h > MAX_SIDE {
        return Err(MdbError::Raster(format!(
            "diagram too large to rasterize ({target_w}x{target_h})"
        )));
    }

    let mut pixmap = tiny_skia::Pixmap::new(target_w as u32, target_h as u32).ok_or_else(|| {
        MdbError::Raster(format!("cannot allocate {target_w}x{target_h} pixmap"))
    })?;

    let size = tree.size();
    let sx = target_w / size.width().max(1.0);
    let sy = target_h / size.height().max(1.0);
    resvg::render(
        &tree,
        tiny_skia::Transform::from_scale(sx, sy),
        &mut pixmap.as_mut(),
    );

    let png = pixmap
        .encode_png()
        .map_err(|e| MdbError::Raster(format!("PNG encoding failed: {e}")))?;
    debug!(
        "rasterized diagram {width}x{height} at {scale}x into {} bytes",
        png.len()
    );
    Ok(format!("data:image/png;base64,{}", STANDARD.encode(png)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn produces_png_data_uri() {
        let svg = r##"<svg xmlns="http://www.w3.org/2000/svg" width="20" height="10"><rect width="20" height="10" fill="#f00"/></svg>"##;
        let uri = rasterize_svg(svg, 2.0).unwrap();
        assert!(uri.starts_with("data:image/png;base64,iVBORw0KGgo"));
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(rasterize_svg("not svg", 3.0), Err(MdbError::Raster(_))));
    }
}
