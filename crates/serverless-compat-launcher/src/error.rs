//! Launch outcomes and error types

use serverless_compat_config::CloudEnvironment;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Expected reasons for not starting the serverless-compat binary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("{0} environment detected, will not start the Datadog Serverless Compatibility Layer")]
    UnknownEnvironment(CloudEnvironment),

    #[error("Unsupported operating system {0}")]
    UnsupportedOs(String),

    #[error("Azure function detected on flex consumption plan without DD_AZURE_RESOURCE_GROUP set. Please set the DD_AZURE_RESOURCE_GROUP environment variable to your resource group name in Azure app settings. Shutting down Datadog Serverless Compatibility Layer.")]
    FlexConsumptionWithoutResourceGroup,
}

/// Failures while extracting or starting the serverless-compat binary
#[derive(Debug, Error)]
pub enum LaunchError {
    /// The payload for the selected platform is not part of the bundle
    #[error("{path} not found")]
    PayloadNotFound { path: String },

    #[error("Failed to create directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to extract {}: {source}", .path.display())]
    Extract {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to mark {} executable: {source}", .path.display())]
    Permissions {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to start {}: {source}", .path.display())]
    Spawn {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl LaunchError {
    /// File the failing step was operating on.
    pub fn path(&self) -> String {
        match self {
            LaunchError::PayloadNotFound { path } => path.clone(),
            LaunchError::CreateDir { path, .. }
            | LaunchError::Extract { path, .. }
            | LaunchError::Permissions { path, .. }
            | LaunchError::Spawn { path, .. } => path.display().to_string(),
        }
    }
}

/// Result type alias for LaunchError
pub type Result<T> = std::result::Result<T, LaunchError>;
