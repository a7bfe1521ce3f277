use image::imageops::{self, FilterType};

use crate::platform::DeviceCapabilities;
use crate::raster::PageBitmap;

/// Represents the printable area in device pixels.
/// 以裝置像素表示的可列印範圍。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrintableArea {
    pub width_px: u32,
    pub height_px: u32,
}

impl PrintableArea {
    pub const fn new(width_px: u32, height_px: u32) -> Self {
        Self {
            width_px,
            height_px,
        }
    }

    pub fn from_capabilities(caps: &DeviceCapabilities) -> Self {
        Self::new(caps.horizontal_res, caps.vertical_res)
    }
}

/// Destination rectangle for a bitmap blit, in device pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl DrawRect {
    /// Rectangle anchored at the device origin with the bitmap's own size.
    pub fn at_origin(bitmap: &PageBitmap) -> Self {
        Self {
            x: 0,
            y: 0,
            width: bitmap.width(),
            height: bitmap.height(),
        }
    }
}

/// Largest size that fits inside `area` while preserving the aspect ratio.
/// Never enlarges: a size already inside the area is returned unchanged.
/// 在保持長寬比的前提下，計算可放入範圍的最大尺寸；不會放大。
pub fn fit_within(width: u32, height: u32, area: PrintableArea) -> (u32, u32) {
    if width <= area.width_px && height <= area.height_px {
        return (width, height);
    }
    if width == 0 || height == 0 {
        return (width.min(area.width_px), height.min(area.height_px));
    }
    let scale_w = area.width_px as f64 / width as f64;
    let scale_h = area.height_px as f64 / height as f64;
    let scale = scale_w.min(scale_h);
    let fitted_w = ((width as f64 * scale).round() as u32).clamp(1, area.width_px.max(1));
    let fitted_h = ((height as f64 * scale).round() as u32).clamp(1, area.height_px.max(1));
    (fitted_w, fitted_h)
}

/// Shrinks a bitmap with Lanczos resampling when it exceeds `area`.
pub fn thumbnail(bitmap: PageBitmap, area: PrintableArea) -> PageBitmap {
    let (width, height) = bitmap.dimensions();
    let (target_w, target_h) = fit_within(width, height, area);
    if (target_w, target_h) == (width, height) {
        return bitmap;
    }
    let resized = imageops::resize(bitmap.image(), target_w, target_h, FilterType::Lanczos3);
    PageBitmap::new(resized)
}
