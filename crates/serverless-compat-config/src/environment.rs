// Cloud environment detection based on environment variables
//
// Checked in order, first match wins:
// - Azure Functions: FUNCTIONS_EXTENSION_VERSION and FUNCTIONS_WORKER_RUNTIME
// - Azure Spring Apps: ASCSVCRT_SPRING__APPLICATION__NAME
// - Google Cloud Run functions (1st gen): FUNCTION_NAME and GCP_PROJECT
// - Unknown otherwise

use crate::env::{
    EnvSource, AZURE_SPRING_APP_NAME, FUNCTIONS_EXTENSION_VERSION, FUNCTIONS_WORKER_RUNTIME,
    FUNCTION_NAME, GCP_PROJECT,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloudEnvironment {
    AzureFunction,
    AzureSpringApp,
    GoogleCloudRunFunction1stGen,
    Unknown,
}

impl CloudEnvironment {
    /// Classify the environment from marker variables. Not cached.
    pub fn detect<E: EnvSource + ?Sized>(env: &E) -> Self {
        if env.is_set(FUNCTIONS_EXTENSION_VERSION) && env.is_set(FUNCTIONS_WORKER_RUNTIME) {
            CloudEnvironment::AzureFunction
        } else if env.is_set(AZURE_SPRING_APP_NAME) {
            CloudEnvironment::AzureSpringApp
        } else if env.is_set(FUNCTION_NAME) && env.is_set(GCP_PROJECT) {
            CloudEnvironment::GoogleCloudRunFunction1stGen
        } else {
            CloudEnvironment::Unknown
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, CloudEnvironment::Unknown)
    }
}

impl std::fmt::Display for CloudEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CloudEnvironment::AzureFunction => write!(f, "AZURE_FUNCTION"),
            CloudEnvironment::AzureSpringApp => write!(f, "AZURE_SPRING_APP"),
            CloudEnvironment::GoogleCloudRunFunction1stGen => {
                write!(f, "GOOGLE_CLOUD_RUN_FUNCTION_1ST_GEN")
            }
            CloudEnvironment::Unknown => write!(f, "UNKNOWN"),
        }
    }
}
