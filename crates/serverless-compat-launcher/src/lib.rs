// serverless-compat-launcher - Starts the Datadog serverless compatibility layer
//
// Detects Azure Functions, Azure Spring Apps and Google Cloud Run functions
// (1st gen), extracts the bundled serverless-compat binary for the host OS and
// spawns it detached with inherited stdio.

pub mod bundle;
pub mod error;
mod init;
mod launch;

pub use bundle::{Bundle, ChainedBundle, DirBundle, EmbeddedBundle};
pub use error::{LaunchError, SkipReason};
pub use init::init_tracing;
pub use launch::{launch, start, LaunchOutcome, Launched};

use serverless_compat_config::{LaunchConfig, StdEnvSource};

/// Version reported to the child via DD_SERVERLESS_COMPAT_VERSION
pub const PACKAGE_VERSION: Option<&str> = option_env!("CARGO_PKG_VERSION");

/// Launch settings for this process, read from the real environment.
pub fn config_from_env() -> LaunchConfig {
    LaunchConfig::from_env(&StdEnvSource).with_package_version(PACKAGE_VERSION)
}

/// Run the launch sequence against the process environment.
pub fn start_from_env<B: Bundle + ?Sized>(bundle: &B) -> Option<Launched> {
    start(&config_from_env(), &StdEnvSource, bundle)
}
