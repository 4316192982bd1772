// serverless-compat-config - Environment detection and launch configuration
//
// All values are computed once at startup from an EnvSource and passed to the
// launcher explicitly:
// 1. Cloud environment classification (marker variables)
// 2. Platform target (host OS name)
// 3. Launch settings (override binary path, package version)
// 4. Log settings (DD_LOG_LEVEL, DD_LOG_FORMAT)

use anyhow::{Context, Result};
use std::path::PathBuf;

pub mod env;
mod environment;
mod platform;
mod validation;

pub use env::{EnvSource, StdEnvSource};
pub use environment::CloudEnvironment;
pub use platform::{
    Platform, PlatformTarget, LINUX_BUNDLED_PATH, WINDOWS_BUNDLED_PATH,
};
pub use validation::is_azure_flex_without_resource_group;

/// Reported to the child process when the build carries no version.
pub const UNKNOWN_VERSION: &str = "unknown";

/// Settings for a single launch attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchConfig {
    /// Lower-cased host OS name
    pub os_name: String,
    /// Binary to run instead of the extracted payload
    pub binary_path: Option<PathBuf>,
    pub package_version: Option<String>,
    /// Replaces the platform's default extraction directory
    pub extract_dir: Option<PathBuf>,
}

impl LaunchConfig {
    /// Build the launch settings for the current host.
    pub fn from_env<E: EnvSource + ?Sized>(env: &E) -> Self {
        Self::for_os(std::env::consts::OS, env)
    }

    /// Build launch settings for an explicit OS name (useful for testing)
    pub fn for_os<E: EnvSource + ?Sized>(os_name: &str, env: &E) -> Self {
        let binary_path = env
            .get_os(env::DD_SERVERLESS_COMPAT_PATH)
            .filter(|path| !path.is_empty())
            .map(PathBuf::from);

        Self {
            os_name: os_name.to_lowercase(),
            binary_path,
            package_version: None,
            extract_dir: None,
        }
    }

    pub fn with_package_version(mut self, version: Option<&str>) -> Self {
        self.package_version = version.map(str::to_string);
        self
    }

    pub fn with_extract_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.extract_dir = Some(dir.into());
        self
    }

    pub fn platform(&self) -> Option<Platform> {
        Platform::from_os_name(&self.os_name)
    }

    /// Platform target with the extraction directory override applied.
    pub fn target(&self) -> Option<PlatformTarget> {
        let target = self.platform()?.target();
        Some(match &self.extract_dir {
            Some(dir) => target.with_temp_dir(dir),
            None => target,
        })
    }

    /// Version string handed to the child, "unknown" when missing or blank.
    pub fn version(&self) -> &str {
        self.package_version
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(UNKNOWN_VERSION)
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub log_level: String,
    pub log_format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
        }
    }
}

impl LogConfig {
    /// Read log settings. An invalid DD_LOG_FORMAT leaves the text format in
    /// place and is handed back so it can be reported once logging is up.
    pub fn from_env<E: EnvSource + ?Sized>(env: &E) -> (Self, Option<anyhow::Error>) {
        let mut config = Self::default();
        let mut format_error = None;

        if let Some(level) = env.get(env::DD_LOG_LEVEL).filter(|l| !l.is_empty()) {
            config.log_level = level.to_lowercase();
        }
        if let Some(format) = env.get(env::DD_LOG_FORMAT) {
            match format
                .parse::<LogFormat>()
                .context("Invalid DD_LOG_FORMAT value")
            {
                Ok(parsed) => config.log_format = parsed,
                Err(err) => format_error = Some(err),
            }
        }

        (config, format_error)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Text => write!(f, "text"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "text" | "plain" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => anyhow::bail!("Unsupported log format: {}. Supported: text, json", s),
        }
    }
}
