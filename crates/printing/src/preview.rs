use std::path::Path;

use crate::layout::{thumbnail, PrintableArea};
use crate::raster::{PageBitmap, PdfBackend, RasterError, Rasterizer};

/// Bounding box of the preview pane, in pixels.
pub const PREVIEW_BOUNDS: PrintableArea = PrintableArea::new(500, 600);

/// Renders the preview bitmap for a queued file.
///
/// The first page is rasterized from disk on every call and shrunk to
/// [`PREVIEW_BOUNDS`]; there is no cache.
/// 為佇列中的檔案產生預覽點陣圖。
pub fn render_preview<B: PdfBackend>(
    rasterizer: &Rasterizer<B>,
    path: &Path,
) -> Result<PageBitmap, RasterError> {
    let first_page = rasterizer.render_preview(path)?;
    Ok(thumbnail(first_page, PREVIEW_BOUNDS))
}
