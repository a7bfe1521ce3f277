use std::fmt::Display;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::controller::{print_document, PrintOutcome};
use crate::job::PrintConfig;
use crate::platform::PlatformAdapter;
use crate::raster::{PdfBackend, Rasterizer};

/// What happened to one file of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileStatus {
    Printed { pages: usize },
    Skipped,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub status: FileStatus,
}

/// Per-file results of a batch, in the order the files were attempted.
/// 批次列印的逐檔結果，依嘗試順序排列。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub outcomes: Vec<FileOutcome>,
}

impl BatchReport {
    pub fn printed(&self) -> usize {
        self.count(|status| matches!(status, FileStatus::Printed { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|status| matches!(status, FileStatus::Skipped))
    }

    pub fn failed(&self) -> usize {
        self.count(|status| matches!(status, FileStatus::Failed(_)))
    }

    fn count(&self, predicate: impl Fn(&FileStatus) -> bool) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| predicate(&outcome.status))
            .count()
    }
}

/// Prints `files` one after another. A failing file is logged and recorded;
/// the remaining files are still attempted.
/// 依序列印檔案；失敗的檔案會被記錄，其餘檔案仍會繼續處理。
pub fn run_batch<A, B>(
    adapter: &A,
    rasterizer: &Rasterizer<B>,
    files: &[PathBuf],
    config: &PrintConfig,
) -> BatchReport
where
    A: PlatformAdapter,
    A::Error: Display,
    B: PdfBackend,
{
    let mut report = BatchReport::default();
    for path in files {
        let status = match print_document(adapter, rasterizer, path, config) {
            Ok(PrintOutcome::Printed { pages }) => FileStatus::Printed { pages },
            Ok(PrintOutcome::Skipped) => FileStatus::Skipped,
            Err(err) => {
                log::warn!("failed to print {}: {err}", path.display());
                FileStatus::Failed(err.to_string())
            }
        };
        report.outcomes.push(FileOutcome {
            path: path.clone(),
            status,
        });
    }
    log::info!(
        "batch finished: {} printed, {} skipped, {} failed",
        report.printed(),
        report.skipped(),
        report.failed()
    );
    report
}

/// Handle to a running batch thread.
#[derive(Debug)]
pub struct BatchHandle {
    inner: JoinHandle<BatchReport>,
}

impl BatchHandle {
    pub fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }

    /// Waits for the batch; a panicked worker yields `None`.
    pub fn join(self) -> Option<BatchReport> {
        self.inner.join().ok()
    }
}

/// Spawns background print batches.
pub struct BatchWorker;

impl BatchWorker {
    /// Runs [`run_batch`] on a new thread and calls `on_complete` with the
    /// report once every file has been attempted. There is no cancellation.
    pub fn spawn<A, B, F>(
        adapter: Arc<A>,
        rasterizer: Arc<Rasterizer<B>>,
        files: Vec<PathBuf>,
        config: PrintConfig,
        on_complete: F,
    ) -> std::io::Result<BatchHandle>
    where
        A: PlatformAdapter + 'static,
        A::Error: Display,
        B: PdfBackend + 'static,
        F: FnOnce(&BatchReport) + Send + 'static,
    {
        let inner = thread::Builder::new()
            .name("print-batch".into())
            .spawn(move || {
                let report = run_batch(adapter.as_ref(), rasterizer.as_ref(), &files, &config);
                on_complete(&report);
                report
            })?;
        Ok(BatchHandle { inner })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{DeviceCapabilities, MockPlatformAdapter};
    use crate::raster::{PageBitmap, PageSelection, RasterError};
    use image::RgbImage;
    use std::path::Path;
    use std::sync::mpsc;

    struct BrokenFirst;

    impl PdfBackend for BrokenFirst {
        fn render(
            &self,
            path: &Path,
            _zoom: f32,
            _pages: PageSelection,
        ) -> Result<Vec<PageBitmap>, RasterError> {
            if path.ends_with("broken.pdf") {
                return Err(RasterError::Document {
                    path: path.to_path_buf(),
                    message: "corrupt xref".into(),
                });
            }
            Ok(vec![PageBitmap::new(RgbImage::new(2, 2)); 2])
        }
    }

    #[test]
    fn worker_reports_through_callback() {
        let adapter = Arc::new(MockPlatformAdapter::new(DeviceCapabilities {
            horizontal_res: 10,
            vertical_res: 10,
            dpi: 72,
        }));
        let (tx, rx) = mpsc::channel();
        let files = vec![
            PathBuf::from("broken.pdf"),
            PathBuf::from("list.txt"),
            PathBuf::from("good.pdf"),
        ];
        let config = PrintConfig::new("Mock", 1).unwrap();

        let handle = BatchWorker::spawn(
            adapter.clone(),
            Arc::new(Rasterizer::new(BrokenFirst)),
            files,
            config,
            move |report| {
                tx.send(report.clone()).unwrap();
            },
        )
        .unwrap();

        let from_callback = rx.recv().unwrap();
        let joined = handle.join().unwrap();
        assert_eq!(from_callback, joined);
        assert_eq!(joined.failed(), 1);
        assert_eq!(joined.skipped(), 1);
        assert_eq!(joined.printed(), 1);
        assert_eq!(
            joined.outcomes[2].status,
            FileStatus::Printed { pages: 2 }
        );
        assert_eq!(adapter.drain_jobs().len(), 1);
    }
}
