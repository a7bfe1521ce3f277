//! Print pipeline shared by the GUI and CLI front-ends: printer access,
//! document rasterization, the session queue and the batch worker.

pub mod batch;
pub mod controller;
pub mod job;
pub mod layout;
pub mod pdfium;
pub mod platform;
pub mod preview;
pub mod queue;
pub mod raster;
pub mod spooler;

pub use batch::{run_batch, BatchHandle, BatchReport, BatchWorker, FileOutcome, FileStatus};
pub use controller::{print_document, PrintJobError, PrintOutcome};
pub use job::{
    parse_copies, ConfigError, DeviceSettings, PaperId, PaperSize, PrintConfig, PrintJobId,
};
pub use layout::{fit_within, thumbnail, DrawRect, PrintableArea};
pub use pdfium::PdfiumBackend;
pub use platform::{DeviceCapabilities, DeviceContext, PlatformAdapter, PrinterInfo};
pub use preview::{render_preview, PREVIEW_BOUNDS};
pub use queue::{PrintQueue, QueuedFile};
pub use raster::{
    load_image, DocumentKind, PageBitmap, PageSelection, PdfBackend, RasterError, Rasterizer,
    PREVIEW_ZOOM, PRINT_ZOOM,
};
pub use spooler::{SpoolerAdapter, SpoolerDevice, SpoolerError, SPOOL_DPI};

/// Rasterizer wired to the pdfium backend.
pub type PdfiumRasterizer = Rasterizer<PdfiumBackend>;
