pub mod config;
pub mod localization;

pub use config::{StationConfig, LOCALE_DIR_VAR, LOCALE_VAR, PDFIUM_DIR_VAR};
pub use localization::{
    LocaleSummary, LocalizationError, LocalizationManager, LocalizationParams,
    DEFAULT_LOCALE_CODE,
};
