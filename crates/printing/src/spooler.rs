//! System spooler backend driven through the `lpstat` / `lp` commands.
//! 透過 `lpstat` / `lp` 指令驅動的系統列印佇列後端。

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use image::{imageops, Rgb, RgbImage};
use tempfile::TempDir;
use thiserror::Error;

use crate::job::{DeviceSettings, PrintJobId};
use crate::layout::DrawRect;
use crate::platform::{DeviceCapabilities, DeviceContext, PlatformAdapter, PrinterInfo};
use crate::raster::PageBitmap;

/// Resolution of the page canvases handed to the spooler.
pub const SPOOL_DPI: u32 = 300;

const DEFAULT_PREFIX: &str = "system default destination:";

/// Errors raised by the spooler backend.
/// 列印佇列後端可能發生的錯誤。
#[derive(Debug, Error)]
pub enum SpoolerError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("{program} exited with {status}: {stderr}")]
    CommandFailed {
        program: String,
        status: String,
        stderr: String,
    },
    #[error("printer '{0}' not found")]
    UnknownPrinter(String),
    #[error("{0} called outside of a document")]
    NoDocument(&'static str),
    #[error("{0} called outside of a page")]
    NoPage(&'static str),
    #[error("spool file error: {0}")]
    Io(#[from] io::Error),
    #[error("failed to encode page: {0}")]
    Encode(#[from] image::ImageError),
}

/// [`PlatformAdapter`] backed by the CUPS command line tools.
#[derive(Debug, Clone)]
pub struct SpoolerAdapter {
    lp: OsString,
    lpstat: OsString,
}

impl Default for SpoolerAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl SpoolerAdapter {
    pub fn new() -> Self {
        Self::with_programs("lp", "lpstat")
    }

    /// Uses alternative programs in place of `lp` and `lpstat`.
    pub fn with_programs(lp: impl Into<OsString>, lpstat: impl Into<OsString>) -> Self {
        Self {
            lp: lp.into(),
            lpstat: lpstat.into(),
        }
    }

    fn lpstat(&self, flag: &str) -> Result<String, SpoolerError> {
        let output = run(Command::new(&self.lpstat).arg(flag), &self.lpstat)?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl PlatformAdapter for SpoolerAdapter {
    type Error = SpoolerError;
    type Device = SpoolerDevice;

    fn enumerate_printers(&self) -> Result<Vec<PrinterInfo>, Self::Error> {
        let names = parse_destinations(&self.lpstat("-e")?);
        // a missing default is reported as a failure by some lpstat builds
        let default = self
            .lpstat("-d")
            .ok()
            .and_then(|out| parse_default_destination(&out));
        Ok(names
            .into_iter()
            .map(|name| {
                let is_default = default.as_deref() == Some(name.as_str());
                PrinterInfo { name, is_default }
            })
            .collect())
    }

    fn open_device(
        &self,
        printer: &str,
        settings: &DeviceSettings,
    ) -> Result<Self::Device, Self::Error> {
        let known = parse_destinations(&self.lpstat("-e")?);
        if !known.iter().any(|name| name == printer) {
            return Err(SpoolerError::UnknownPrinter(printer.to_string()));
        }
        let (horizontal_res, vertical_res) = settings.paper.size().to_pixels(SPOOL_DPI);
        Ok(SpoolerDevice {
            lp: self.lp.clone(),
            printer: printer.to_string(),
            settings: *settings,
            capabilities: DeviceCapabilities {
                horizontal_res,
                vertical_res,
                dpi: SPOOL_DPI,
            },
            document: None,
        })
    }
}

/// Device context that collects page canvases and submits them with `lp`.
#[derive(Debug)]
pub struct SpoolerDevice {
    lp: OsString,
    printer: String,
    settings: DeviceSettings,
    capabilities: DeviceCapabilities,
    document: Option<SpoolDocument>,
}

#[derive(Debug)]
struct SpoolDocument {
    job_id: PrintJobId,
    title: String,
    dir: TempDir,
    pages: Vec<PathBuf>,
    canvas: Option<RgbImage>,
}

impl SpoolerDevice {
    fn document(&mut self, call: &'static str) -> Result<&mut SpoolDocument, SpoolerError> {
        self.document.as_mut().ok_or(SpoolerError::NoDocument(call))
    }
}

impl DeviceContext for SpoolerDevice {
    type Error = SpoolerError;

    fn capabilities(&self) -> DeviceCapabilities {
        self.capabilities
    }

    fn start_doc(&mut self, title: &str) -> Result<(), Self::Error> {
        let job_id = PrintJobId::new();
        let dir = tempfile::Builder::new()
            .prefix(&format!("{job_id}-"))
            .tempdir()?;
        log::debug!("{job_id}: spooling '{title}' in {}", dir.path().display());
        self.document = Some(SpoolDocument {
            job_id,
            title: title.to_string(),
            dir,
            pages: Vec::new(),
            canvas: None,
        });
        Ok(())
    }

    fn start_page(&mut self) -> Result<(), Self::Error> {
        let (width, height) = (
            self.capabilities.horizontal_res,
            self.capabilities.vertical_res,
        );
        let document = self.document("start_page")?;
        document.canvas = Some(RgbImage::from_pixel(width, height, Rgb([255, 255, 255])));
        Ok(())
    }

    fn draw_bitmap(&mut self, bitmap: &PageBitmap, target: DrawRect) -> Result<(), Self::Error> {
        let document = self.document("draw_bitmap")?;
        let canvas = document
            .canvas
            .as_mut()
            .ok_or(SpoolerError::NoPage("draw_bitmap"))?;
        blit(canvas, bitmap, target);
        Ok(())
    }

    fn end_page(&mut self) -> Result<(), Self::Error> {
        let document = self.document("end_page")?;
        let canvas = document
            .canvas
            .take()
            .ok_or(SpoolerError::NoPage("end_page"))?;
        let path = document
            .dir
            .path()
            .join(format!("page-{:04}.png", document.pages.len() + 1));
        canvas.save(&path)?;
        document.pages.push(path);
        Ok(())
    }

    fn end_doc(mut self) -> Result<(), Self::Error> {
        let document = self.document.take().ok_or(SpoolerError::NoDocument("end_doc"))?;
        if document.pages.is_empty() {
            log::warn!("{}: '{}' has no pages, nothing submitted", document.job_id, document.title);
            return Ok(());
        }
        let args = lp_arguments(
            &self.printer,
            &self.settings,
            self.capabilities.dpi,
            &document.title,
            &document.pages,
        );
        run(Command::new(&self.lp).args(&args), &self.lp)?;
        log::info!(
            "{}: handed {} page(s) to spooler queue '{}'",
            document.job_id,
            document.pages.len(),
            self.printer
        );
        Ok(())
    }

    fn abort(mut self, reason: &str) {
        if let Some(document) = self.document.take() {
            log::warn!("{}: aborted '{}': {reason}", document.job_id, document.title);
        }
    }
}

/// Copies `bitmap` onto the canvas, scaling it to the target rectangle and
/// clipping at the canvas edge.
fn blit(canvas: &mut RgbImage, bitmap: &PageBitmap, target: DrawRect) {
    if target.width == 0 || target.height == 0 {
        return;
    }
    if bitmap.dimensions() == (target.width, target.height) {
        imageops::replace(canvas, bitmap.image(), target.x as i64, target.y as i64);
    } else {
        let scaled = imageops::resize(
            bitmap.image(),
            target.width,
            target.height,
            imageops::FilterType::Triangle,
        );
        imageops::replace(canvas, &scaled, target.x as i64, target.y as i64);
    }
}

/// Command line for `lp`; copies and media come from the device settings.
pub fn lp_arguments(
    printer: &str,
    settings: &DeviceSettings,
    dpi: u32,
    title: &str,
    pages: &[PathBuf],
) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "-d".into(),
        printer.into(),
        "-n".into(),
        settings.copies.to_string().into(),
        "-o".into(),
        format!("media={}", settings.paper.media_name()).into(),
        "-o".into(),
        format!("ppi={dpi}").into(),
        "-t".into(),
        title.into(),
        "--".into(),
    ];
    args.extend(pages.iter().map(|page| page.as_os_str().to_os_string()));
    args
}

/// Destination names from `lpstat -e` output, one per line.
pub fn parse_destinations(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Default destination from `lpstat -d` output.
pub fn parse_default_destination(output: &str) -> Option<String> {
    output.lines().find_map(|line| {
        line.trim()
            .strip_prefix(DEFAULT_PREFIX)
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
    })
}

fn run(command: &mut Command, program: &OsString) -> Result<Output, SpoolerError> {
    let program = Path::new(program).display().to_string();
    let output = command.output().map_err(|source| SpoolerError::Spawn {
        program: program.clone(),
        source,
    })?;
    if !output.status.success() {
        return Err(SpoolerError::CommandFailed {
            program,
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::PaperId;

    #[test]
    fn destinations_skip_blank_lines() {
        let parsed = parse_destinations("Office_Laser\n\n  Photo \n");
        assert_eq!(parsed, vec!["Office_Laser".to_string(), "Photo".to_string()]);
    }

    #[test]
    fn default_destination_is_parsed() {
        assert_eq!(
            parse_default_destination("system default destination: Office_Laser\n"),
            Some("Office_Laser".to_string())
        );
        assert_eq!(parse_default_destination("no system default destination\n"), None);
    }

    #[test]
    fn lp_arguments_forward_copies_media_and_title() {
        let settings = DeviceSettings {
            copies: 3,
            paper: PaperId::Photo10x15,
        };
        let args = lp_arguments(
            "Photo",
            &settings,
            300,
            "/tmp/cat.png",
            &[PathBuf::from("page-0001.png")],
        );
        let args: Vec<String> = args
            .iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            [
                "-d",
                "Photo",
                "-n",
                "3",
                "-o",
                "media=4x6",
                "-o",
                "ppi=300",
                "-t",
                "/tmp/cat.png",
                "--",
                "page-0001.png"
            ]
        );
    }

    #[test]
    fn blit_clips_at_canvas_edge() {
        let mut canvas = RgbImage::from_pixel(4, 4, Rgb([255, 255, 255]));
        let bitmap = PageBitmap::new(RgbImage::from_pixel(3, 3, Rgb([0, 0, 0])));
        blit(
            &mut canvas,
            &bitmap,
            DrawRect {
                x: 2,
                y: 2,
                width: 3,
                height: 3,
            },
        );
        assert_eq!(canvas.get_pixel(1, 1), &Rgb([255, 255, 255]));
        assert_eq!(canvas.get_pixel(3, 3), &Rgb([0, 0, 0]));
    }

    #[test]
    fn drawing_outside_a_page_is_rejected() {
        let mut device = SpoolerDevice {
            lp: "lp".into(),
            printer: "Office".into(),
            settings: DeviceSettings::default(),
            capabilities: DeviceCapabilities {
                horizontal_res: 10,
                vertical_res: 10,
                dpi: SPOOL_DPI,
            },
            document: None,
        };
        let bitmap = PageBitmap::new(RgbImage::new(1, 1));
        assert!(matches!(
            device.start_page(),
            Err(SpoolerError::NoDocument("start_page"))
        ));
        device.start_doc("doc").unwrap();
        assert!(matches!(
            device.draw_bitmap(&bitmap, DrawRect::at_origin(&bitmap)),
            Err(SpoolerError::NoPage("draw_bitmap"))
        ));
    }
}
