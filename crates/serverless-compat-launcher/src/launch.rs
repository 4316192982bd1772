// Extract-and-launch procedure
//
// Single linear attempt: classify the host, pick the platform payload, copy it
// to the extraction directory, then spawn it detached. The child is never
// waited on, restarted or signalled once started.

use crate::bundle::Bundle;
use crate::error::{LaunchError, Result, SkipReason};
use serverless_compat_config::env::DD_SERVERLESS_COMPAT_VERSION;
use serverless_compat_config::{
    is_azure_flex_without_resource_group, CloudEnvironment, EnvSource, LaunchConfig,
    PlatformTarget,
};
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, error, info};

/// What a launch attempt ended with when nothing failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchOutcome {
    Started(Launched),
    Skipped(SkipReason),
}

/// A serverless-compat process that was started and detached
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Launched {
    pub environment: CloudEnvironment,
    pub pid: u32,
    /// Binary that was spawned
    pub executable: PathBuf,
    /// Where the bundled payload was extracted
    pub extracted: PathBuf,
    pub version: String,
}

/// Run the launch sequence, reporting skips and failures to the caller.
pub fn launch<E, B>(config: &LaunchConfig, env: &E, bundle: &B) -> Result<LaunchOutcome>
where
    E: EnvSource + ?Sized,
    B: Bundle + ?Sized,
{
    let environment = CloudEnvironment::detect(env);
    debug!(%environment, "Environment detected");

    if !environment.is_known() {
        return Ok(LaunchOutcome::Skipped(SkipReason::UnknownEnvironment(
            environment,
        )));
    }

    let target = match config.target() {
        Some(target) => target,
        None => {
            return Ok(LaunchOutcome::Skipped(SkipReason::UnsupportedOs(
                config.os_name.clone(),
            )))
        }
    };
    debug!(os = %config.os_name, bundled_path = target.bundled_path, "Detected operating system");

    if environment == CloudEnvironment::AzureFunction && is_azure_flex_without_resource_group(env)
    {
        return Ok(LaunchOutcome::Skipped(
            SkipReason::FlexConsumptionWithoutResourceGroup,
        ));
    }

    let payload = bundle
        .open(target.bundled_path)
        .ok_or_else(|| LaunchError::PayloadNotFound {
            path: target.bundled_path.to_string(),
        })?;

    let extracted = extract(payload, &target)?;
    set_executable(&extracted)?;

    let executable = match &config.binary_path {
        Some(binary_path) => {
            debug!(path = %binary_path.display(), "Detected user configured binary path");
            set_executable(binary_path)?;
            binary_path.clone()
        }
        None => extracted.clone(),
    };

    let version = config.version().to_string();
    debug!(%version, "Found package version");

    let pid = spawn_detached(&executable, &version)?;

    Ok(LaunchOutcome::Started(Launched {
        environment,
        pid,
        executable,
        extracted,
        version,
    }))
}

/// Entry point for the host runtime. Logs the outcome and never fails.
pub fn start<E, B>(config: &LaunchConfig, env: &E, bundle: &B) -> Option<Launched>
where
    E: EnvSource + ?Sized,
    B: Bundle + ?Sized,
{
    match launch(config, env, bundle) {
        Ok(LaunchOutcome::Started(launched)) => {
            info!(
                pid = launched.pid,
                executable = %launched.executable.display(),
                environment = %launched.environment,
                version = %launched.version,
                "Started Datadog Serverless Compatibility Layer"
            );
            Some(launched)
        }
        Ok(LaunchOutcome::Skipped(reason)) => {
            error!("{}", reason);
            None
        }
        Err(err @ LaunchError::PayloadNotFound { .. }) => {
            error!("{}", err);
            None
        }
        Err(err) => {
            error!(file = %err.path(), error = %err, "Exception when starting serverless-compat binary");
            None
        }
    }
}

/// Copy the payload into the target directory, replacing any previous copy.
fn extract(mut payload: impl Read, target: &PlatformTarget) -> Result<PathBuf> {
    fs::create_dir_all(&target.temp_dir).map_err(|source| LaunchError::CreateDir {
        path: target.temp_dir.clone(),
        source,
    })?;

    let path = target.extracted_path();
    let extract_err = |source| LaunchError::Extract {
        path: path.clone(),
        source,
    };

    // Unlink first so a copy still executing from a previous run is not written into
    match fs::remove_file(&path) {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => return Err(extract_err(err)),
    }

    let mut file = File::create(&path).map_err(extract_err)?;
    let bytes = io::copy(&mut payload, &mut file).map_err(extract_err)?;
    file.sync_all().map_err(extract_err)?;

    debug!(path = %path.display(), bytes, "Extracted serverless-compat binary");
    Ok(path)
}

/// Add the owner execute bit. Only checks the file exists on non-unix hosts.
fn set_executable(path: &Path) -> Result<()> {
    let permissions_err = |source| LaunchError::Permissions {
        path: path.to_path_buf(),
        source,
    };

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let mut permissions = fs::metadata(path).map_err(permissions_err)?.permissions();
        permissions.set_mode(permissions.mode() | 0o100);
        fs::set_permissions(path, permissions).map_err(permissions_err)?;
    }

    #[cfg(not(unix))]
    {
        fs::metadata(path).map_err(permissions_err)?;
    }

    Ok(())
}

/// Start the binary with inherited stdio and drop the handle without waiting.
fn spawn_detached(executable: &Path, version: &str) -> Result<u32> {
    let spawn_err = |source| LaunchError::Spawn {
        path: executable.to_path_buf(),
        source,
    };

    let program = std::path::absolute(executable).map_err(spawn_err)?;
    let child = Command::new(&program)
        .env(DD_SERVERLESS_COMPAT_VERSION, version)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(spawn_err)?;

    Ok(child.id())
}
