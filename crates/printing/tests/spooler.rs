#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use image::{Rgb, RgbImage};
use printstation_printing::{
    print_document, run_batch, FileStatus, PageBitmap, PageSelection, PdfBackend,
    PlatformAdapter, PrintConfig, PrintJobError, PrintOutcome, RasterError, Rasterizer,
    SpoolerAdapter, SPOOL_DPI,
};
use tempfile::{tempdir, TempDir};

struct NoPdf;

impl PdfBackend for NoPdf {
    fn render(
        &self,
        path: &Path,
        _zoom: f32,
        _pages: PageSelection,
    ) -> Result<Vec<PageBitmap>, RasterError> {
        Err(RasterError::Backend(format!("{} not expected", path.display())))
    }
}

/// Paginated backend that always yields the same number of blank pages.
struct BlankPages(usize);

impl PdfBackend for BlankPages {
    fn render(
        &self,
        _path: &Path,
        zoom: f32,
        _pages: PageSelection,
    ) -> Result<Vec<PageBitmap>, RasterError> {
        let (width, height) = ((100.0 * zoom) as u32, (140.0 * zoom) as u32);
        Ok((0..self.0)
            .map(|_| PageBitmap::new(RgbImage::from_pixel(width, height, Rgb([255, 255, 255]))))
            .collect())
    }
}

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Fake `lpstat` with two queues and `lp` that records its arguments.
fn fake_spooler(lp_exit: i32) -> (TempDir, SpoolerAdapter, PathBuf) {
    let dir = tempdir().unwrap();
    let record = dir.path().join("lp-args.txt");
    let lpstat = write_script(
        dir.path(),
        "lpstat",
        r#"case "$1" in
  -e) printf 'Office\nPhoto\n' ;;
  -d) echo 'system default destination: Photo' ;;
esac"#,
    );
    let lp = write_script(
        dir.path(),
        "lp",
        &format!(
            "printf '%s\\n' \"$@\" > '{}'\necho 'queue is paused' >&2\nexit {lp_exit}",
            record.display()
        ),
    );
    (dir, SpoolerAdapter::with_programs(lp, lpstat), record)
}

#[test]
fn enumeration_marks_default_printer() {
    let (_dir, adapter, _) = fake_spooler(0);
    let printers = adapter.enumerate_printers().unwrap();
    let summary: Vec<_> = printers
        .iter()
        .map(|p| (p.name.as_str(), p.is_default))
        .collect();
    assert_eq!(summary, [("Office", false), ("Photo", true)]);
}

#[test]
fn image_job_is_submitted_with_copies_and_media() {
    let (dir, adapter, record) = fake_spooler(0);
    let image_path = dir.path().join("label.png");
    RgbImage::from_pixel(40, 20, Rgb([0, 0, 0]))
        .save(&image_path)
        .unwrap();
    let config = PrintConfig::new("Office", 2).unwrap();

    let outcome =
        print_document(&adapter, &Rasterizer::new(NoPdf), &image_path, &config).unwrap();
    assert_eq!(outcome, PrintOutcome::Printed { pages: 1 });

    let args: Vec<String> = fs::read_to_string(&record)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect();
    assert_eq!(&args[..4], ["-d", "Office", "-n", "2"]);
    assert!(args.contains(&"media=A4".to_string()));
    assert!(args.contains(&format!("ppi={SPOOL_DPI}")));
    assert!(args.contains(&image_path.display().to_string()));
    assert!(args.last().unwrap().ends_with("page-0001.png"));
}

#[test]
fn unknown_printer_is_rejected_before_spooling() {
    let (dir, adapter, record) = fake_spooler(0);
    let image_path = dir.path().join("label.png");
    RgbImage::new(4, 4).save(&image_path).unwrap();
    let config = PrintConfig::new("Basement", 1).unwrap();

    let err = print_document(&adapter, &Rasterizer::new(NoPdf), &image_path, &config)
        .unwrap_err();
    assert!(matches!(err, PrintJobError::Platform(ref msg) if msg.contains("Basement")));
    assert!(!record.exists());
}

#[test]
fn spooler_failure_carries_stderr() {
    let (dir, adapter, _) = fake_spooler(1);
    let image_path = dir.path().join("label.png");
    RgbImage::new(4, 4).save(&image_path).unwrap();
    let config = PrintConfig::new("Photo", 1).unwrap();

    let err = print_document(&adapter, &Rasterizer::new(NoPdf), &image_path, &config)
        .unwrap_err();
    assert!(err.to_string().contains("queue is paused"), "{err}");
}

#[test]
fn multi_page_document_is_one_lp_call_with_ordered_pages() {
    let (dir, adapter, record) = fake_spooler(0);
    let pdf = dir.path().join("report.pdf");
    fs::write(&pdf, "").unwrap();
    let config = PrintConfig::new("Office", 1).unwrap();

    let outcome = print_document(&adapter, &Rasterizer::new(BlankPages(3)), &pdf, &config).unwrap();
    assert_eq!(outcome, PrintOutcome::Printed { pages: 3 });

    let args: Vec<String> = fs::read_to_string(&record)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect();
    let separator = args.iter().position(|arg| arg == "--").unwrap();
    let files = &args[separator + 1..];
    assert_eq!(files.len(), 3);
    for (index, file) in files.iter().enumerate() {
        assert!(
            file.ends_with(&format!("page-{:04}.png", index + 1)),
            "{file}"
        );
    }
}

#[test]
fn document_without_pages_never_reaches_lp() {
    let (dir, adapter, record) = fake_spooler(0);
    let pdf = dir.path().join("blank.pdf");
    fs::write(&pdf, "").unwrap();
    let config = PrintConfig::new("Office", 1).unwrap();

    let report = run_batch(
        &adapter,
        &Rasterizer::new(BlankPages(0)),
        std::slice::from_ref(&pdf),
        &config,
    );

    assert!(matches!(report.outcomes[0].status, FileStatus::Failed(_)));
    assert_eq!(report.printed(), 0);
    assert!(!record.exists());
}
