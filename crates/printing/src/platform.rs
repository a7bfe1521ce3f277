use crate::job::DeviceSettings;
use crate::layout::DrawRect;
use crate::raster::PageBitmap;
#[cfg(test)]
use std::sync::{Arc, Mutex};

/// Printer entry reported by the platform enumeration.
/// 平台列舉出的印表機項目。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrinterInfo {
    pub name: String,
    pub is_default: bool,
}

impl PrinterInfo {
    pub fn new(name: impl Into<String>, is_default: bool) -> Self {
        Self {
            name: name.into(),
            is_default,
        }
    }
}

/// Printable area of an open device, in device pixels.
/// 已開啟裝置的可列印範圍（裝置像素）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceCapabilities {
    pub horizontal_res: u32,
    pub vertical_res: u32,
    pub dpi: u32,
}

/// Drawable surface bound to one printer.
///
/// Calls follow the spooler bracket order: `start_doc`, then any number of
/// `start_page` / `draw_bitmap` / `end_page` groups, then `end_doc`. Dropping
/// a device without `end_doc` or `abort` must not submit anything.
/// 綁定至單一印表機的繪圖介面。
pub trait DeviceContext {
    type Error;

    fn capabilities(&self) -> DeviceCapabilities;
    fn start_doc(&mut self, title: &str) -> Result<(), Self::Error>;
    fn start_page(&mut self) -> Result<(), Self::Error>;
    fn draw_bitmap(&mut self, bitmap: &PageBitmap, target: DrawRect) -> Result<(), Self::Error>;
    fn end_page(&mut self) -> Result<(), Self::Error>;
    fn end_doc(self) -> Result<(), Self::Error>;
    fn abort(self, reason: &str);
}

/// Abstraction over platform-specific print APIs.
/// 平台列印 API 的抽象介面。
pub trait PlatformAdapter: Send + Sync {
    type Error;
    type Device: DeviceContext<Error = Self::Error>;

    fn enumerate_printers(&self) -> Result<Vec<PrinterInfo>, Self::Error>;
    fn open_device(
        &self,
        printer: &str,
        settings: &DeviceSettings,
    ) -> Result<Self::Device, Self::Error>;
}

/// Bracket or draw call observed by the mock adapter.
#[cfg(test)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceCall {
    StartDoc(String),
    StartPage,
    Draw(DrawRect),
    EndPage,
    EndDoc,
    Abort(String),
}

/// Recorded job metadata produced by the mock adapter.
/// 模擬介面所記錄的列印作業中繼資料。
#[cfg(test)]
#[derive(Debug, Clone)]
pub struct RecordedJob {
    pub printer: String,
    pub settings: DeviceSettings,
    pub calls: Vec<DeviceCall>,
}

/// In-memory implementation of [`PlatformAdapter`] used for tests.
/// 測試使用的記憶體內部平台介面實作。
#[cfg(test)]
#[derive(Clone)]
pub struct MockPlatformAdapter {
    printers: Vec<PrinterInfo>,
    capabilities: DeviceCapabilities,
    jobs: Arc<Mutex<Vec<RecordedJob>>>,
}

#[cfg(test)]
impl MockPlatformAdapter {
    pub fn new(capabilities: DeviceCapabilities) -> Self {
        Self {
            printers: vec![PrinterInfo::new("Mock", true)],
            capabilities,
            jobs: Arc::default(),
        }
    }

    pub fn drain_jobs(&self) -> Vec<RecordedJob> {
        self.jobs.lock().expect("lock poisoned").drain(..).collect()
    }
}

#[cfg(test)]
pub struct MockDevice {
    job: RecordedJob,
    capabilities: DeviceCapabilities,
    sink: Arc<Mutex<Vec<RecordedJob>>>,
}

#[cfg(test)]
impl MockDevice {
    fn close(mut self, call: DeviceCall) {
        self.job.calls.push(call);
        self.sink.lock().expect("lock poisoned").push(self.job);
    }
}

#[cfg(test)]
impl PlatformAdapter for MockPlatformAdapter {
    type Error = String;
    type Device = MockDevice;

    fn enumerate_printers(&self) -> Result<Vec<PrinterInfo>, Self::Error> {
        Ok(self.printers.clone())
    }

    fn open_device(
        &self,
        printer: &str,
        settings: &DeviceSettings,
    ) -> Result<Self::Device, Self::Error> {
        if !self.printers.iter().any(|info| info.name == printer) {
            return Err(format!("printer '{printer}' not found"));
        }
        Ok(MockDevice {
            job: RecordedJob {
                printer: printer.to_string(),
                settings: *settings,
                calls: Vec::new(),
            },
            capabilities: self.capabilities,
            sink: self.jobs.clone(),
        })
    }
}

#[cfg(test)]
impl DeviceContext for MockDevice {
    type Error = String;

    fn capabilities(&self) -> DeviceCapabilities {
        self.capabilities
    }

    fn start_doc(&mut self, title: &str) -> Result<(), Self::Error> {
        self.job.calls.push(DeviceCall::StartDoc(title.to_string()));
        Ok(())
    }

    fn start_page(&mut self) -> Result<(), Self::Error> {
        self.job.calls.push(DeviceCall::StartPage);
        Ok(())
    }

    fn draw_bitmap(&mut self, _bitmap: &PageBitmap, target: DrawRect) -> Result<(), Self::Error> {
        self.job.calls.push(DeviceCall::Draw(target));
        Ok(())
    }

    fn end_page(&mut self) -> Result<(), Self::Error> {
        self.job.calls.push(DeviceCall::EndPage);
        Ok(())
    }

    fn end_doc(self) -> Result<(), Self::Error> {
        self.close(DeviceCall::EndDoc);
        Ok(())
    }

    fn abort(self, reason: &str) {
        self.close(DeviceCall::Abort(reason.to_string()));
    }
}
