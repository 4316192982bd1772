use clap::Parser;
use serverless_compat_config::{LogConfig, LogFormat, StdEnvSource};
use serverless_compat_launcher::{init_tracing, start_from_env, ChainedBundle, DirBundle};
use std::path::PathBuf;
use tracing::{debug, warn};

/// Starts the Datadog Serverless Compatibility Layer on supported FaaS hosts
#[derive(Parser)]
#[command(name = "datadog-serverless-compat-launcher")]
#[command(version)]
#[command(about = "Starts the Datadog Serverless Compatibility Layer on supported FaaS hosts", long_about = None)]
struct Cli {
    /// Directory holding bin/<platform>/ payloads; replaces the embedded and beside-executable payloads
    #[arg(short, long, value_name = "DIR")]
    bundle_dir: Option<PathBuf>,

    /// Log level: trace, debug, info, warn, error (overrides DD_LOG_LEVEL)
    #[arg(short = 'v', long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Log format: text or json (overrides DD_LOG_FORMAT)
    #[arg(long, value_name = "FORMAT")]
    log_format: Option<LogFormat>,
}

fn main() {
    let cli = Cli::parse();

    let (mut log_config, mut format_error) = LogConfig::from_env(&StdEnvSource);
    if let Some(level) = &cli.log_level {
        log_config.log_level = level.clone();
    }
    if let Some(format) = cli.log_format {
        log_config.log_format = format;
        format_error = None;
    }
    init_tracing(&log_config);
    if let Some(err) = format_error {
        warn!(error = %format!("{:#}", err), "Falling back to text log format");
    }

    let explicit_dir = cli.bundle_dir.map(DirBundle::new);
    let beside_exe = if explicit_dir.is_none() {
        DirBundle::beside_current_exe()
            .map_err(|err| debug!(error = %err, "No bundle directory beside executable"))
            .ok()
    } else {
        None
    };

    // The host keeps running whatever happens here
    start_from_env(&ChainedBundle::for_launcher(
        explicit_dir.as_ref(),
        beside_exe.as_ref(),
    ));
}
