use std::env;
use std::path::PathBuf;

use crate::localization::DEFAULT_LOCALE_CODE;

pub const LOCALE_VAR: &str = "PRINTSTATION_LOCALE";
pub const LOCALE_DIR_VAR: &str = "PRINTSTATION_LOCALE_DIR";
pub const PDFIUM_DIR_VAR: &str = "PRINTSTATION_PDFIUM_DIR";

/// 執行期設定，來源為環境變數（不寫入磁碟）。 / Runtime settings read from the environment; nothing is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationConfig {
    /// 初始介面語系。 / Initial UI locale code.
    pub locale: String,
    /// 額外語系包目錄。 / Directory with extra locale packs.
    pub locale_dir: Option<PathBuf>,
    /// pdfium 動態函式庫所在目錄。 / Directory holding the pdfium library.
    pub pdfium_dir: Option<PathBuf>,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            locale: DEFAULT_LOCALE_CODE.to_string(),
            locale_dir: None,
            pdfium_dir: None,
        }
    }
}

impl StationConfig {
    /// 從行程環境讀取設定。 / Reads the configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// 以自訂查詢函式讀取設定，空字串視為未設定。 / Reads the configuration through `lookup`; empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();
        Self {
            locale: read(LOCALE_VAR).unwrap_or(defaults.locale),
            locale_dir: read(LOCALE_DIR_VAR).map(PathBuf::from),
            pdfium_dir: read(PDFIUM_DIR_VAR).map(PathBuf::from),
        }
    }
}
