// Environment variable access
//
// Everything that reads the environment goes through EnvSource so detection
// and configuration can be exercised with a plain map instead of mutating the
// process environment.

use std::collections::HashMap;
use std::env::{self, VarError};
use std::ffi::OsString;
use tracing::warn;

/// Set on Azure Functions hosts.
pub const FUNCTIONS_EXTENSION_VERSION: &str = "FUNCTIONS_EXTENSION_VERSION";
/// Set on Azure Functions hosts alongside the extension version.
pub const FUNCTIONS_WORKER_RUNTIME: &str = "FUNCTIONS_WORKER_RUNTIME";
/// Set on Azure Spring Apps.
pub const AZURE_SPRING_APP_NAME: &str = "ASCSVCRT_SPRING__APPLICATION__NAME";
/// Set on Google Cloud Run functions (1st gen).
pub const FUNCTION_NAME: &str = "FUNCTION_NAME";
/// Set on Google Cloud Run functions (1st gen) alongside the function name.
pub const GCP_PROJECT: &str = "GCP_PROJECT";
/// Azure App Service plan SKU.
pub const WEBSITE_SKU: &str = "WEBSITE_SKU";
pub const DD_AZURE_RESOURCE_GROUP: &str = "DD_AZURE_RESOURCE_GROUP";
/// User supplied path to a serverless-compat binary to run instead of the bundled one.
pub const DD_SERVERLESS_COMPAT_PATH: &str = "DD_SERVERLESS_COMPAT_PATH";
/// Injected into the child process environment.
pub const DD_SERVERLESS_COMPAT_VERSION: &str = "DD_SERVERLESS_COMPAT_VERSION";
pub const DD_LOG_LEVEL: &str = "DD_LOG_LEVEL";
pub const DD_LOG_FORMAT: &str = "DD_LOG_FORMAT";

/// Abstraction over environment-variable lookups.
pub trait EnvSource {
    fn get(&self, key: &str) -> Option<String>;

    /// Raw value, for variables that hold paths and need not be unicode.
    fn get_os(&self, key: &str) -> Option<OsString> {
        self.get(key).map(OsString::from)
    }

    /// Whether the variable is present at all. Empty values count as present.
    fn is_set(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}

/// Reads the real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdEnvSource;

impl EnvSource for StdEnvSource {
    fn get(&self, key: &str) -> Option<String> {
        match env::var(key) {
            Ok(value) => Some(value),
            Err(VarError::NotPresent) => None,
            Err(VarError::NotUnicode(value)) => {
                warn!(key, value = ?value, "Ignoring environment variable that is not valid unicode");
                None
            }
        }
    }

    fn get_os(&self, key: &str) -> Option<OsString> {
        env::var_os(key)
    }

    fn is_set(&self, key: &str) -> bool {
        env::var_os(key).is_some()
    }
}

impl EnvSource for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

impl EnvSource for HashMap<&str, &str> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).map(|v| v.to_string())
    }
}
