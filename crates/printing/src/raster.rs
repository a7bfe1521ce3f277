use std::path::{Path, PathBuf};

use image::RgbImage;
use thiserror::Error;

/// Zoom used when rendering pages for the printer (144 dpi page space).
pub const PRINT_ZOOM: f32 = 2.0;
/// Zoom used when rendering the first page for the preview pane.
pub const PREVIEW_ZOOM: f32 = 0.5;

/// Errors produced while turning a file into page bitmaps.
/// 將檔案轉為頁面點陣圖時可能發生的錯誤。
#[derive(Debug, Error)]
pub enum RasterError {
    #[error("unsupported file type: {0}")]
    Unsupported(PathBuf),
    #[error("failed to decode image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to render {path}: {message}")]
    Document { path: PathBuf, message: String },
    #[error("document {0} has no pages")]
    EmptyDocument(PathBuf),
    #[error("PDF renderer unavailable: {0}")]
    Backend(String),
}

/// Transient RGB raster for a single page.
/// 單一頁面的暫存 RGB 點陣圖。
#[derive(Debug, Clone, PartialEq)]
pub struct PageBitmap {
    image: RgbImage,
}

impl PageBitmap {
    pub fn new(image: RgbImage) -> Self {
        Self { image }
    }

    /// Builds a bitmap from tightly packed RGBA rows, dropping alpha.
    pub fn from_rgba(width: u32, height: u32, rgba: &[u8]) -> Option<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(4)?;
        if rgba.len() != expected {
            return None;
        }
        let rgb: Vec<u8> = rgba
            .chunks_exact(4)
            .flat_map(|px| [px[0], px[1], px[2]])
            .collect();
        RgbImage::from_raw(width, height, rgb).map(Self::new)
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }
}

/// Document variants distinguished by the print pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// Single raster image printed as one page.
    Image,
    /// Paginated document rendered page by page.
    Paginated,
}

impl DocumentKind {
    pub const IMAGE_EXTENSIONS: [&'static str; 4] = ["jpg", "jpeg", "png", "bmp"];

    /// Classifies a path by extension; `None` means the file is not printable.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        if ext == "pdf" {
            Some(DocumentKind::Paginated)
        } else if Self::IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Some(DocumentKind::Image)
        } else {
            None
        }
    }
}

/// Which pages a paginated backend should render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSelection {
    First,
    All,
}

/// Renders paginated documents into bitmaps.
/// 將分頁文件繪製為點陣圖的後端介面。
pub trait PdfBackend: Send + Sync {
    /// Renders the selected pages at `zoom` relative to 72 dpi, in page order.
    fn render(
        &self,
        path: &Path,
        zoom: f32,
        pages: PageSelection,
    ) -> Result<Vec<PageBitmap>, RasterError>;
}

/// Produces page bitmaps for both document variants.
///
/// Nothing is cached; every call reads the file from disk again.
#[derive(Debug, Clone, Default)]
pub struct Rasterizer<B> {
    backend: B,
}

impl<B: PdfBackend> Rasterizer<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// First page only, at [`PREVIEW_ZOOM`] for paginated documents.
    pub fn render_preview(&self, path: &Path) -> Result<PageBitmap, RasterError> {
        match DocumentKind::from_path(path) {
            Some(DocumentKind::Image) => load_image(path),
            Some(DocumentKind::Paginated) => self
                .backend
                .render(path, PREVIEW_ZOOM, PageSelection::First)?
                .into_iter()
                .next()
                .ok_or_else(|| RasterError::EmptyDocument(path.to_path_buf())),
            None => Err(RasterError::Unsupported(path.to_path_buf())),
        }
    }

    /// Every page at [`PRINT_ZOOM`]; images yield exactly one bitmap.
    /// A paginated document without pages is an error, never an empty job.
    pub fn render_pages(&self, path: &Path) -> Result<Vec<PageBitmap>, RasterError> {
        match DocumentKind::from_path(path) {
            Some(DocumentKind::Image) => Ok(vec![load_image(path)?]),
            Some(DocumentKind::Paginated) => {
                let pages = self.backend.render(path, PRINT_ZOOM, PageSelection::All)?;
                if pages.is_empty() {
                    return Err(RasterError::EmptyDocument(path.to_path_buf()));
                }
                Ok(pages)
            }
            None => Err(RasterError::Unsupported(path.to_path_buf())),
        }
    }
}

/// Decodes a raster image file into an RGB bitmap.
pub fn load_image(path: &Path) -> Result<PageBitmap, RasterError> {
    let decoded = image::open(path).map_err(|source| RasterError::Image {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(PageBitmap::new(decoded.to_rgb8()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct CountingBackend {
        calls: Mutex<Vec<(f32, PageSelection)>>,
    }

    impl PdfBackend for CountingBackend {
        fn render(
            &self,
            _path: &Path,
            zoom: f32,
            pages: PageSelection,
        ) -> Result<Vec<PageBitmap>, RasterError> {
            self.calls.lock().unwrap().push((zoom, pages));
            let count = match pages {
                PageSelection::First => 1,
                PageSelection::All => 3,
            };
            Ok((0..count)
                .map(|_| PageBitmap::new(RgbImage::new(4, 4)))
                .collect())
        }
    }

    #[test]
    fn extension_dispatch_is_case_insensitive() {
        assert_eq!(
            DocumentKind::from_path(Path::new("scan.PDF")),
            Some(DocumentKind::Paginated)
        );
        assert_eq!(
            DocumentKind::from_path(Path::new("photo.JpEg")),
            Some(DocumentKind::Image)
        );
        assert_eq!(DocumentKind::from_path(Path::new("notes.txt")), None);
        assert_eq!(DocumentKind::from_path(Path::new("README")), None);
    }

    #[test]
    fn preview_uses_reduced_zoom_and_first_page() {
        let rasterizer = Rasterizer::new(CountingBackend::default());
        rasterizer.render_preview(Path::new("a.pdf")).unwrap();
        rasterizer.render_pages(Path::new("a.pdf")).unwrap();
        // no caching: a second preview renders again
        rasterizer.render_preview(Path::new("a.pdf")).unwrap();

        let calls = rasterizer.backend().calls.lock().unwrap().clone();
        assert_eq!(
            calls,
            vec![
                (PREVIEW_ZOOM, PageSelection::First),
                (PRINT_ZOOM, PageSelection::All),
                (PREVIEW_ZOOM, PageSelection::First),
            ]
        );
    }

    #[test]
    fn unsupported_paths_are_rejected() {
        let rasterizer = Rasterizer::new(CountingBackend::default());
        assert!(matches!(
            rasterizer.render_pages(Path::new("song.mp3")),
            Err(RasterError::Unsupported(_))
        ));
        assert!(rasterizer.backend().calls.lock().unwrap().is_empty());
    }

    struct NoPages;

    impl PdfBackend for NoPages {
        fn render(
            &self,
            _path: &Path,
            _zoom: f32,
            _pages: PageSelection,
        ) -> Result<Vec<PageBitmap>, RasterError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn documents_without_pages_are_errors() {
        let rasterizer = Rasterizer::new(NoPages);
        assert!(matches!(
            rasterizer.render_pages(Path::new("blank.pdf")),
            Err(RasterError::EmptyDocument(_))
        ));
        assert!(matches!(
            rasterizer.render_preview(Path::new("blank.pdf")),
            Err(RasterError::EmptyDocument(_))
        ));
    }

    #[test]
    fn rgba_conversion_drops_alpha() {
        let bitmap = PageBitmap::from_rgba(1, 2, &[1, 2, 3, 255, 4, 5, 6, 0]).unwrap();
        assert_eq!(bitmap.image().as_raw(), &vec![1, 2, 3, 4, 5, 6]);
        assert!(PageBitmap::from_rgba(2, 2, &[0; 4]).is_none());
    }

    #[test]
    fn image_files_decode_to_single_page() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dot.png");
        RgbImage::from_pixel(3, 2, image::Rgb([10, 20, 30]))
            .save(&path)
            .unwrap();

        let rasterizer = Rasterizer::new(CountingBackend::default());
        let pages = rasterizer.render_pages(&path).unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].dimensions(), (3, 2));
    }
}
