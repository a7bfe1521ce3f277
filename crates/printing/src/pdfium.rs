//! pdfium-backed renderer for paginated documents.
//! 以 pdfium 實作的分頁文件繪製後端。

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use pdfium_render::prelude::*;

use crate::raster::{PageBitmap, PageSelection, PdfBackend, RasterError};

/// Renders PDFs with one pdfium binding per backend, made on first use from
/// `library_dir` and then from the system search path. A failed bind is not
/// remembered, so a later call retries.
#[derive(Default)]
pub struct PdfiumBackend {
    library_dir: Option<PathBuf>,
    pdfium: Mutex<Option<Arc<Pdfium>>>,
}

impl PdfiumBackend {
    pub fn new(library_dir: Option<PathBuf>) -> Self {
        Self {
            library_dir,
            pdfium: Mutex::new(None),
        }
    }

    fn pdfium(&self) -> Result<Arc<Pdfium>, RasterError> {
        let mut slot = self
            .pdfium
            .lock()
            .map_err(|_| RasterError::Backend("pdfium binding lock poisoned".into()))?;
        if let Some(pdfium) = slot.as_ref() {
            return Ok(Arc::clone(pdfium));
        }
        let bindings = match &self.library_dir {
            Some(dir) => {
                let dir = dir.to_string_lossy();
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(&*dir))
                    .or_else(|_| Pdfium::bind_to_system_library())
            }
            None => Pdfium::bind_to_system_library(),
        }
        .map_err(|err| RasterError::Backend(err.to_string()))?;
        let pdfium = Arc::new(Pdfium::new(bindings));
        log::debug!("bound pdfium library");
        *slot = Some(Arc::clone(&pdfium));
        Ok(pdfium)
    }
}

impl PdfBackend for PdfiumBackend {
    fn render(
        &self,
        path: &Path,
        zoom: f32,
        pages: PageSelection,
    ) -> Result<Vec<PageBitmap>, RasterError> {
        let pdfium = self.pdfium()?;
        let document_error = |message: String| RasterError::Document {
            path: path.to_path_buf(),
            message,
        };

        let document = pdfium
            .load_pdf_from_file(path, None)
            .map_err(|err| document_error(err.to_string()))?;
        let config = PdfRenderConfig::new().scale_page_by_factor(zoom);

        let mut output = Vec::new();
        for page in document.pages().iter() {
            let bitmap = page
                .render_with_config(&config)
                .map_err(|err| document_error(err.to_string()))?;
            let width = bitmap.width().max(0) as u32;
            let height = bitmap.height().max(0) as u32;
            let page_bitmap = PageBitmap::from_rgba(width, height, &bitmap.as_rgba_bytes())
                .ok_or_else(|| document_error("renderer returned a malformed bitmap".into()))?;
            output.push(page_bitmap);
            if pages == PageSelection::First {
                break;
            }
        }
        log::debug!(
            "rendered {} page(s) of {} at {zoom}x",
            output.len(),
            path.display()
        );
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shared_across_threads<T: Send + Sync>() {}

    #[test]
    fn backend_is_shareable_with_the_batch_worker() {
        shared_across_threads::<PdfiumBackend>();
    }

    #[test]
    fn failed_render_does_not_poison_later_calls() {
        let dir = tempfile::tempdir().unwrap();
        let backend = PdfiumBackend::new(Some(dir.path().join("no-lib-here")));
        let missing = dir.path().join("missing.pdf");

        // either the library is absent or the file is; both are errors
        for _ in 0..2 {
            let err = backend
                .render(&missing, 1.0, PageSelection::First)
                .unwrap_err();
            assert!(matches!(
                err,
                RasterError::Backend(_) | RasterError::Document { .. }
            ));
        }
    }
}
