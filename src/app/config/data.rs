use serde::{Deserialize, Serialize};

use crate::{ArcPath, ArcStr, log::LogLevel};

/// Options for path-based configuration values that can be accessed and modified.
#[derive(Debug, Clone, Copy)]
pub enum PathOpt {
    /// Directory where log files are stored
    LogDir,
    /// File holding durable user preferences
    PrefsPath,
}

/// Options for numeric configuration values that can be accessed and modified.
#[derive(Debug, Clone, Copy)]
pub enum USizeOpt {
    /// Maximum age of log files in days before they are deleted
    MaxAge,
    /// Timeout for network requests in seconds
    Timeout,
    /// Number of articles per list page
    PageSize,
    /// Quiet period of the search box, in milliseconds
    DebounceMs,
    /// Default freshness window of cached list data, in milliseconds
    StaleTimeMs,
    /// Freshness window of article details, in milliseconds
    DetailStaleTimeMs,
    /// How long an unused cache entry survives, in milliseconds
    GcTimeMs,
    /// Period of the eviction sweep, in milliseconds
    GcIntervalMs,
    /// Default number of retries for failed fetches
    Retry,
}

/// Options for string configuration values that can be accessed and modified.
#[derive(Debug, Clone, Copy)]
pub enum StrOpt {
    /// Base URL of the content service, without a trailing slash
    ApiBaseUrl,
}

/// The configuration data structure that holds all configurable values.
///
/// Missing fields in the TOML file fall back to their defaults, so a config
/// written by an older build keeps loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Data {
    api_base_url: ArcStr,
    log_dir: ArcPath,
    prefs_path: ArcPath,
    log_level: LogLevel,
    max_age: usize,
    timeout: usize,
    page_size: usize,
    debounce_ms: usize,
    stale_time_ms: usize,
    detail_stale_time_ms: usize,
    gc_time_ms: usize,
    gc_interval_ms: usize,
    retry: usize,
}

impl Default for Data {
    fn default() -> Self {
        Self {
            api_base_url: ArcStr::from("http://localhost:8000/api"),
            log_dir: ArcPath::from(std::path::Path::new("/tmp/rss-reader/logs")),
            prefs_path: ArcPath::from(std::path::Path::new("/tmp/rss-reader/prefs.toml")),
            log_level: LogLevel::Warning,
            max_age: 0,
            timeout: 10,
            page_size: 20,
            debounce_ms: 300,
            stale_time_ms: 0,
            detail_stale_time_ms: 60_000,
            gc_time_ms: 300_000,
            gc_interval_ms: 60_000,
            retry: 0,
        }
    }
}

impl Data {
    pub fn path(&self, opt: PathOpt) -> ArcPath {
        match opt {
            PathOpt::LogDir => self.log_dir.clone(),
            PathOpt::PrefsPath => self.prefs_path.clone(),
        }
    }

    pub fn set_path(&mut self, opt: PathOpt, path: ArcPath) {
        match opt {
            PathOpt::LogDir => self.log_dir = path,
            PathOpt::PrefsPath => self.prefs_path = path,
        }
    }

    pub fn log_level(&self) -> LogLevel {
        self.log_level
    }

    pub fn set_log_level(&mut self, level: LogLevel) {
        self.log_level = level;
    }

    pub fn usize(&self, opt: USizeOpt) -> usize {
        match opt {
            USizeOpt::MaxAge => self.max_age,
            USizeOpt::Timeout => self.timeout,
            USizeOpt::PageSize => self.page_size,
            USizeOpt::DebounceMs => self.debounce_ms,
            USizeOpt::StaleTimeMs => self.stale_time_ms,
            USizeOpt::DetailStaleTimeMs => self.detail_stale_time_ms,
            USizeOpt::GcTimeMs => self.gc_time_ms,
            USizeOpt::GcIntervalMs => self.gc_interval_ms,
            USizeOpt::Retry => self.retry,
        }
    }

    pub fn set_usize(&mut self, opt: USizeOpt, value: usize) {
        match opt {
            USizeOpt::MaxAge => self.max_age = value,
            USizeOpt::Timeout => self.timeout = value,
            USizeOpt::PageSize => self.page_size = value,
            USizeOpt::DebounceMs => self.debounce_ms = value,
            USizeOpt::StaleTimeMs => self.stale_time_ms = value,
            USizeOpt::DetailStaleTimeMs => self.detail_stale_time_ms = value,
            USizeOpt::GcTimeMs => self.gc_time_ms = value,
            USizeOpt::GcIntervalMs => self.gc_interval_ms = value,
            USizeOpt::Retry => self.retry = value,
        }
    }

    pub fn str(&self, opt: StrOpt) -> ArcStr {
        match opt {
            StrOpt::ApiBaseUrl => self.api_base_url.clone(),
        }
    }

    /// Trailing slashes are stripped from the base URL so endpoint paths can
    /// be appended verbatim.
    pub fn set_str(&mut self, opt: StrOpt, value: ArcStr) {
        match opt {
            StrOpt::ApiBaseUrl => self.api_base_url = ArcStr::from(value.trim_end_matches('/')),
        }
    }
}
