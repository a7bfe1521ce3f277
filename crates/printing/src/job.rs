use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;

/// Opaque identifier for a print job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PrintJobId(u64);

impl PrintJobId {
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for PrintJobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PrintJobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "print-job-{}", self.0)
    }
}

/// Supported paper identifiers for quick selection.
/// 可快速選取的紙張識別碼。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PaperId {
    #[default]
    A4,
    Letter,
    A3,
    Photo10x15,
}

impl PaperId {
    pub const ALL: [PaperId; 4] = [
        PaperId::A4,
        PaperId::Letter,
        PaperId::A3,
        PaperId::Photo10x15,
    ];

    /// Display label, also accepted by [`FromStr`].
    pub const fn label(self) -> &'static str {
        match self {
            PaperId::A4 => "A4",
            PaperId::Letter => "Letter",
            PaperId::A3 => "A3",
            PaperId::Photo10x15 => "10x15",
        }
    }

    /// Media keyword understood by the system spooler.
    pub const fn media_name(self) -> &'static str {
        match self {
            PaperId::A4 => "A4",
            PaperId::Letter => "Letter",
            PaperId::A3 => "A3",
            PaperId::Photo10x15 => "4x6",
        }
    }

    pub const fn size(self) -> PaperSize {
        match self {
            PaperId::A4 => PaperSize::new(PaperId::A4, 210.0, 297.0),
            PaperId::Letter => PaperSize::new(PaperId::Letter, 215.9, 279.4),
            PaperId::A3 => PaperSize::new(PaperId::A3, 297.0, 420.0),
            PaperId::Photo10x15 => PaperSize::new(PaperId::Photo10x15, 100.0, 150.0),
        }
    }
}

impl fmt::Display for PaperId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PaperId {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        PaperId::ALL
            .into_iter()
            .find(|paper| paper.label().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| ConfigError::UnknownPaper(trimmed.to_string()))
    }
}

/// Represents a paper size in millimetres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaperSize {
    pub id: PaperId,
    pub width_mm: f32,
    pub height_mm: f32,
}

impl PaperSize {
    pub const fn new(id: PaperId, width_mm: f32, height_mm: f32) -> Self {
        Self {
            id,
            width_mm,
            height_mm,
        }
    }

    /// Converts the sheet to device pixels at the given resolution.
    /// 以指定解析度將紙張尺寸換算為裝置像素。
    pub fn to_pixels(&self, dpi: u32) -> (u32, u32) {
        const MM_PER_INCH: f32 = 25.4;
        let width = self.width_mm / MM_PER_INCH * dpi as f32;
        let height = self.height_mm / MM_PER_INCH * dpi as f32;
        (width.floor().max(1.0) as u32, height.floor().max(1.0) as u32)
    }
}

/// Errors raised while assembling a print configuration.
/// 組合列印設定時可能發生的錯誤。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("no printer selected")]
    MissingPrinter,
    #[error("copy count must be a positive integer, got '{0}'")]
    InvalidCopies(String),
    #[error("unknown paper size '{0}'")]
    UnknownPaper(String),
}

/// User-selected print parameters shared by every file of a batch.
/// 批次中所有檔案共用的列印參數。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintConfig {
    pub printer: String,
    pub copies: u32,
    pub paper: PaperId,
    pub fit_to_page: bool,
}

impl PrintConfig {
    pub fn new(printer: impl Into<String>, copies: u32) -> Result<Self, ConfigError> {
        let printer = printer.into();
        if printer.trim().is_empty() {
            return Err(ConfigError::MissingPrinter);
        }
        if copies == 0 {
            return Err(ConfigError::InvalidCopies(copies.to_string()));
        }
        Ok(Self {
            printer,
            copies,
            paper: PaperId::default(),
            fit_to_page: true,
        })
    }

    pub fn with_paper(mut self, paper: PaperId) -> Self {
        self.paper = paper;
        self
    }

    pub fn with_fit_to_page(mut self, fit: bool) -> Self {
        self.fit_to_page = fit;
        self
    }

    /// Settings handed to the platform adapter when a device is opened.
    pub fn device_settings(&self) -> DeviceSettings {
        DeviceSettings {
            copies: self.copies,
            paper: self.paper,
        }
    }
}

/// Parses a copy count typed into a text field.
pub fn parse_copies(input: &str) -> Result<u32, ConfigError> {
    match input.trim().parse::<u32>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(ConfigError::InvalidCopies(input.trim().to_string())),
    }
}

/// Per-device print settings (the DEVMODE-like structure).
/// 每個裝置的列印設定（類似 DEVMODE 的結構）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceSettings {
    pub copies: u32,
    pub paper: PaperId,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            copies: 1,
            paper: PaperId::default(),
        }
    }
}
