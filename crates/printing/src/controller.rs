use std::fmt::Display;
use std::path::Path;

use thiserror::Error;

use crate::job::PrintConfig;
use crate::layout::{thumbnail, DrawRect, PrintableArea};
use crate::platform::{DeviceContext, PlatformAdapter};
use crate::raster::{DocumentKind, PageBitmap, PdfBackend, RasterError, Rasterizer};

/// Result produced after handling one file.
/// 處理單一檔案後所產生的結果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrintOutcome {
    /// The document was submitted with this many page brackets.
    Printed { pages: usize },
    /// The extension is not printable; nothing was opened.
    Skipped,
}

/// Errors raised while running the print pipeline.
/// 列印管線執行時可能發生的錯誤。
#[derive(Debug, Error)]
pub enum PrintJobError {
    #[error(transparent)]
    Raster(#[from] RasterError),
    #[error("platform adapter failed: {0}")]
    Platform(String),
}

/// Prints one file on the configured printer.
///
/// Images are drawn once, shrunk to the printable area. Paginated documents
/// get one start/end page bracket per page, rendered at print zoom and shrunk
/// only when `fit_to_page` is set. All pages share a single document bracket.
/// 以設定的印表機列印單一檔案。
pub fn print_document<A, B>(
    adapter: &A,
    rasterizer: &Rasterizer<B>,
    path: &Path,
    config: &PrintConfig,
) -> Result<PrintOutcome, PrintJobError>
where
    A: PlatformAdapter,
    A::Error: Display,
    B: PdfBackend,
{
    let Some(kind) = DocumentKind::from_path(path) else {
        log::debug!("skipping {}: unsupported extension", path.display());
        return Ok(PrintOutcome::Skipped);
    };

    let pages = rasterizer.render_pages(path)?;
    let device = adapter
        .open_device(&config.printer, &config.device_settings())
        .map_err(platform_error)?;
    let area = PrintableArea::from_capabilities(&device.capabilities());
    let shrink = kind == DocumentKind::Image || config.fit_to_page;

    let title = path.display().to_string();
    let page_count = pages.len();
    spool_pages(device, &title, pages, area, shrink)?;
    log::info!(
        "submitted {title} to '{}' ({page_count} page(s), {} copies)",
        config.printer,
        config.copies
    );
    Ok(PrintOutcome::Printed { pages: page_count })
}

fn spool_pages<D>(
    mut device: D,
    title: &str,
    pages: Vec<PageBitmap>,
    area: PrintableArea,
    shrink: bool,
) -> Result<(), PrintJobError>
where
    D: DeviceContext,
    D::Error: Display,
{
    let drawn = (|| {
        device.start_doc(title)?;
        for (index, page) in pages.into_iter().enumerate() {
            let page = if shrink { thumbnail(page, area) } else { page };
            log::debug!(
                "page {} of {title}: {}x{} px",
                index + 1,
                page.width(),
                page.height()
            );
            device.start_page()?;
            device.draw_bitmap(&page, DrawRect::at_origin(&page))?;
            device.end_page()?;
        }
        Ok::<(), D::Error>(())
    })();

    match drawn {
        Ok(()) => device.end_doc().map_err(platform_error),
        Err(err) => {
            let reason = err.to_string();
            device.abort(&reason);
            Err(PrintJobError::Platform(reason))
        }
    }
}

fn platform_error<E: Display>(err: E) -> PrintJobError {
    PrintJobError::Platform(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{DeviceCall, DeviceCapabilities, MockPlatformAdapter};
    use crate::raster::PageSelection;
    use image::RgbImage;

    struct FixedPages(usize);

    impl PdfBackend for FixedPages {
        fn render(
            &self,
            _path: &Path,
            _zoom: f32,
            pages: PageSelection,
        ) -> Result<Vec<PageBitmap>, RasterError> {
            let count = if pages == PageSelection::First { 1 } else { self.0 };
            Ok((0..count)
                .map(|_| PageBitmap::new(RgbImage::new(300, 400)))
                .collect())
        }
    }

    fn adapter() -> MockPlatformAdapter {
        MockPlatformAdapter::new(DeviceCapabilities {
            horizontal_res: 150,
            vertical_res: 1000,
            dpi: 300,
        })
    }

    #[test]
    fn unsupported_extension_opens_no_device() {
        let adapter = adapter();
        let config = PrintConfig::new("Mock", 1).unwrap();
        let outcome = print_document(
            &adapter,
            &Rasterizer::new(FixedPages(2)),
            Path::new("notes.docx"),
            &config,
        )
        .unwrap();
        assert_eq!(outcome, PrintOutcome::Skipped);
        assert!(adapter.drain_jobs().is_empty());
    }

    #[test]
    fn paginated_pages_are_shrunk_only_when_fitting() {
        let adapter = adapter();
        let rasterizer = Rasterizer::new(FixedPages(1));

        let fit = PrintConfig::new("Mock", 1).unwrap();
        print_document(&adapter, &rasterizer, Path::new("a.pdf"), &fit).unwrap();
        let no_fit = fit.clone().with_fit_to_page(false);
        print_document(&adapter, &rasterizer, Path::new("a.pdf"), &no_fit).unwrap();

        let jobs = adapter.drain_jobs();
        let draws: Vec<_> = jobs
            .iter()
            .flat_map(|job| job.calls.iter())
            .filter_map(|call| match call {
                DeviceCall::Draw(rect) => Some((rect.width, rect.height)),
                _ => None,
            })
            .collect();
        assert_eq!(draws, vec![(150, 200), (300, 400)]);
    }

    #[test]
    fn unknown_printer_is_a_platform_error() {
        let adapter = adapter();
        let config = PrintConfig::new("Elsewhere", 1).unwrap();
        let err = print_document(
            &adapter,
            &Rasterizer::new(FixedPages(1)),
            Path::new("a.pdf"),
            &config,
        )
        .unwrap_err();
        assert!(matches!(err, PrintJobError::Platform(msg) if msg.contains("Elsewhere")));
    }
}
