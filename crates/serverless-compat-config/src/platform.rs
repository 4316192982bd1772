// Platform target selection based on the host operating system name
//
// - Windows: OS name contains "win"
// - Linux: OS name contains "linux"
// - Anything else is unsupported

use std::path::{Path, PathBuf};

pub const WINDOWS_BUNDLED_PATH: &str = "bin/windows-amd64/datadog-serverless-compat.exe";
const WINDOWS_TEMP_DIR: &str = "C:/local/Temp/datadog";
pub const LINUX_BUNDLED_PATH: &str = "bin/linux-amd64/datadog-serverless-compat";
const LINUX_TEMP_DIR: &str = "/tmp/datadog";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    Linux,
}

impl Platform {
    /// Select a platform from an OS name. Matching is case-insensitive.
    pub fn from_os_name(os_name: &str) -> Option<Self> {
        let os_name = os_name.to_lowercase();
        if os_name.contains("win") {
            Some(Platform::Windows)
        } else if os_name.contains("linux") {
            Some(Platform::Linux)
        } else {
            None
        }
    }

    /// Get the bundled payload and extraction directory for this platform
    pub fn target(&self) -> PlatformTarget {
        match self {
            Platform::Windows => PlatformTarget {
                bundled_path: WINDOWS_BUNDLED_PATH,
                temp_dir: PathBuf::from(WINDOWS_TEMP_DIR),
            },
            Platform::Linux => PlatformTarget {
                bundled_path: LINUX_BUNDLED_PATH,
                temp_dir: PathBuf::from(LINUX_TEMP_DIR),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformTarget {
    /// Path of the payload relative to the bundle root, always '/'-separated
    pub bundled_path: &'static str,
    pub temp_dir: PathBuf,
}

impl PlatformTarget {
    /// File name the payload is extracted under.
    pub fn file_name(&self) -> &'static str {
        self.bundled_path
            .rsplit('/')
            .next()
            .unwrap_or(self.bundled_path)
    }

    pub fn extracted_path(&self) -> PathBuf {
        self.temp_dir.join(self.file_name())
    }

    /// Same target extracted somewhere else.
    pub fn with_temp_dir(mut self, temp_dir: impl AsRef<Path>) -> Self {
        self.temp_dir = temp_dir.as_ref().to_path_buf();
        self
    }
}
