// Payloads in these tests are shell scripts.
#![cfg(unix)]

use anyhow::Result;
use serverless_compat_config::env::{
    AZURE_SPRING_APP_NAME, DD_AZURE_RESOURCE_GROUP, DD_SERVERLESS_COMPAT_PATH,
    FUNCTIONS_EXTENSION_VERSION, FUNCTIONS_WORKER_RUNTIME, FUNCTION_NAME, GCP_PROJECT,
    WEBSITE_SKU,
};
use serverless_compat_config::{CloudEnvironment, LaunchConfig, LINUX_BUNDLED_PATH};
use serverless_compat_launcher::{
    launch, start, DirBundle, LaunchError, LaunchOutcome, Launched, SkipReason,
};
use std::collections::HashMap;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;

// Writing an executable while another thread forks can make exec fail with
// ETXTBSY, so tests in this file run one at a time.
static SERIAL: Mutex<()> = Mutex::new(());

fn serial() -> MutexGuard<'static, ()> {
    SERIAL.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

struct Fixture {
    bundle: TempDir,
    work: TempDir,
}

impl Fixture {
    fn new() -> Result<Self> {
        Ok(Self {
            bundle: TempDir::new()?,
            work: TempDir::new()?,
        })
    }

    fn extract_dir(&self) -> PathBuf {
        self.work.path().join("datadog")
    }

    fn output(&self, name: &str) -> PathBuf {
        self.work.path().join(name)
    }

    fn bundle(&self) -> DirBundle {
        DirBundle::new(self.bundle.path())
    }

    /// Bundle a payload that records the version it was started with.
    fn with_linux_payload(self) -> Result<Self> {
        let payload = self.bundle.path().join(LINUX_BUNDLED_PATH);
        fs::create_dir_all(payload.parent().unwrap())?;
        fs::write(&payload, recording_script(&self.output("bundled.out"), ""))?;
        Ok(self)
    }

    fn config(&self, env: &HashMap<&str, &str>, version: Option<&str>) -> LaunchConfig {
        LaunchConfig::for_os("linux", env)
            .with_extract_dir(self.extract_dir())
            .with_package_version(version)
    }
}

fn recording_script(output: &Path, prefix: &str) -> String {
    let out = output.display();
    format!(
        "#!/bin/sh\nprintf '{prefix}%s' \"$DD_SERVERLESS_COMPAT_VERSION\" > \"{out}.tmp\" && mv \"{out}.tmp\" \"{out}\"\n"
    )
}

fn wait_for_file(path: &Path) -> Option<String> {
    let deadline = Instant::now() + Duration::from_secs(10);
    while Instant::now() < deadline {
        if let Ok(content) = fs::read_to_string(path) {
            return Some(content);
        }
        thread::sleep(Duration::from_millis(20));
    }
    None
}

fn gcp_env() -> HashMap<&'static str, &'static str> {
    HashMap::from([(FUNCTION_NAME, "handler"), (GCP_PROJECT, "my-project")])
}

fn azure_function_env() -> HashMap<&'static str, &'static str> {
    HashMap::from([
        (FUNCTIONS_EXTENSION_VERSION, "~4"),
        (FUNCTIONS_WORKER_RUNTIME, "java"),
    ])
}

fn expect_started(outcome: LaunchOutcome) -> Launched {
    match outcome {
        LaunchOutcome::Started(launched) => launched,
        LaunchOutcome::Skipped(reason) => panic!("launch skipped: {reason}"),
    }
}

#[test]
fn test_unknown_environment_skips_without_touching_disk() -> Result<()> {
    let _guard = serial();
    let fixture = Fixture::new()?.with_linux_payload()?;
    let env = HashMap::new();

    let outcome = launch(&fixture.config(&env, Some("1.0.0")), &env, &fixture.bundle())?;

    assert_eq!(
        outcome,
        LaunchOutcome::Skipped(SkipReason::UnknownEnvironment(CloudEnvironment::Unknown))
    );
    assert!(!fixture.extract_dir().exists());
    Ok(())
}

#[test]
fn test_unsupported_os_skips_before_extraction() -> Result<()> {
    let _guard = serial();
    let fixture = Fixture::new()?.with_linux_payload()?;
    let env = gcp_env();
    let config = LaunchConfig::for_os("SunOS", &env).with_extract_dir(fixture.extract_dir());

    let outcome = launch(&config, &env, &fixture.bundle())?;

    assert_eq!(
        outcome,
        LaunchOutcome::Skipped(SkipReason::UnsupportedOs("sunos".to_string()))
    );
    assert!(!fixture.extract_dir().exists());
    Ok(())
}

#[test]
fn test_flex_consumption_without_resource_group_skips() -> Result<()> {
    let _guard = serial();
    let fixture = Fixture::new()?.with_linux_payload()?;
    let mut env = azure_function_env();
    env.insert(WEBSITE_SKU, "FlexConsumption");

    let outcome = launch(&fixture.config(&env, Some("1.0.0")), &env, &fixture.bundle())?;

    assert_eq!(
        outcome,
        LaunchOutcome::Skipped(SkipReason::FlexConsumptionWithoutResourceGroup)
    );
    assert!(!fixture.extract_dir().exists());
    Ok(())
}

#[test]
fn test_flex_consumption_guard_only_applies_to_azure_functions() -> Result<()> {
    let _guard = serial();
    let fixture = Fixture::new()?.with_linux_payload()?;
    let mut env = gcp_env();
    env.insert(WEBSITE_SKU, "FlexConsumption");

    let launched = expect_started(launch(
        &fixture.config(&env, Some("1.0.0")),
        &env,
        &fixture.bundle(),
    )?);

    assert_eq!(
        launched.environment,
        CloudEnvironment::GoogleCloudRunFunction1stGen
    );
    assert_eq!(
        wait_for_file(&fixture.output("bundled.out")).as_deref(),
        Some("1.0.0")
    );
    Ok(())
}

#[test]
fn test_flex_consumption_with_resource_group_launches() -> Result<()> {
    let _guard = serial();
    let fixture = Fixture::new()?.with_linux_payload()?;
    let mut env = azure_function_env();
    env.insert(WEBSITE_SKU, "FlexConsumption");
    env.insert(DD_AZURE_RESOURCE_GROUP, "my-resource-group");

    let launched = expect_started(launch(
        &fixture.config(&env, Some("2.1.0")),
        &env,
        &fixture.bundle(),
    )?);

    assert_eq!(launched.environment, CloudEnvironment::AzureFunction);
    assert_eq!(
        wait_for_file(&fixture.output("bundled.out")).as_deref(),
        Some("2.1.0")
    );
    Ok(())
}

#[test]
fn test_missing_payload_fails_before_creating_directory() -> Result<()> {
    let _guard = serial();
    let fixture = Fixture::new()?;
    let env = gcp_env();
    let config = fixture.config(&env, Some("1.0.0"));

    let err = launch(&config, &env, &fixture.bundle()).unwrap_err();
    assert!(matches!(err, LaunchError::PayloadNotFound { .. }));
    assert_eq!(err.path(), LINUX_BUNDLED_PATH);
    assert!(!fixture.extract_dir().exists());

    // The entry point absorbs the failure
    assert!(start(&config, &env, &fixture.bundle()).is_none());
    assert!(!fixture.extract_dir().exists());
    Ok(())
}

#[test]
fn test_extracts_and_launches_with_version() -> Result<()> {
    let _guard = serial();
    let fixture = Fixture::new()?.with_linux_payload()?;
    let env = gcp_env();

    let launched = start(
        &fixture.config(&env, Some("1.2.3")),
        &env,
        &fixture.bundle(),
    )
    .expect("launch should start the payload");

    let extracted = fixture.extract_dir().join("datadog-serverless-compat");
    assert_eq!(launched.extracted, extracted);
    assert_eq!(launched.executable, extracted);
    assert_eq!(launched.version, "1.2.3");
    assert!(launched.pid > 0);
    assert_eq!(
        wait_for_file(&fixture.output("bundled.out")).as_deref(),
        Some("1.2.3")
    );

    let mode = fs::metadata(&extracted)?.permissions().mode();
    assert_ne!(mode & 0o100, 0, "extracted payload should be executable");
    Ok(())
}

#[test]
fn test_repeat_launch_overwrites_extracted_payload() -> Result<()> {
    let _guard = serial();
    let fixture = Fixture::new()?.with_linux_payload()?;
    let env = HashMap::from([(AZURE_SPRING_APP_NAME, "orders")]);
    let extracted = fixture.extract_dir().join("datadog-serverless-compat");

    fs::create_dir_all(fixture.extract_dir())?;
    fs::write(&extracted, "stale contents from an older release")?;

    let launched = expect_started(launch(
        &fixture.config(&env, Some("3.0.0")),
        &env,
        &fixture.bundle(),
    )?);

    assert_eq!(launched.environment, CloudEnvironment::AzureSpringApp);
    assert_eq!(
        fs::read_to_string(&extracted)?,
        recording_script(&fixture.output("bundled.out"), "")
    );
    assert_eq!(
        wait_for_file(&fixture.output("bundled.out")).as_deref(),
        Some("3.0.0")
    );
    Ok(())
}

#[test]
fn test_user_override_binary_is_launched() -> Result<()> {
    let _guard = serial();
    let fixture = Fixture::new()?.with_linux_payload()?;
    let override_path = fixture.work.path().join("custom-compat");
    fs::write(
        &override_path,
        recording_script(&fixture.output("override.out"), "override-"),
    )?;
    fs::set_permissions(&override_path, fs::Permissions::from_mode(0o644))?;

    let override_str = override_path.to_string_lossy().to_string();
    let mut env: HashMap<&str, &str> = gcp_env();
    env.insert(DD_SERVERLESS_COMPAT_PATH, override_str.as_str());

    let launched = expect_started(launch(
        &fixture.config(&env, Some("1.5.0")),
        &env,
        &fixture.bundle(),
    )?);

    assert_eq!(launched.executable, override_path);
    // The bundled payload is still extracted, just not started
    assert!(launched.extracted.is_file());
    assert_eq!(
        wait_for_file(&fixture.output("override.out")).as_deref(),
        Some("override-1.5.0")
    );
    assert!(!fixture.output("bundled.out").exists());

    let mode = fs::metadata(&override_path)?.permissions().mode();
    assert_ne!(mode & 0o100, 0, "override binary should be executable");
    Ok(())
}

#[test]
fn test_missing_override_binary_fails_after_extraction() -> Result<()> {
    let _guard = serial();
    let fixture = Fixture::new()?.with_linux_payload()?;
    let missing = fixture.work.path().join("does-not-exist");
    let missing_str = missing.to_string_lossy().to_string();
    let mut env: HashMap<&str, &str> = gcp_env();
    env.insert(DD_SERVERLESS_COMPAT_PATH, missing_str.as_str());

    let err = launch(&fixture.config(&env, Some("1.0.0")), &env, &fixture.bundle()).unwrap_err();

    assert!(matches!(err, LaunchError::Permissions { ref path, .. } if *path == missing));
    assert!(fixture
        .extract_dir()
        .join("datadog-serverless-compat")
        .is_file());
    Ok(())
}

#[test]
fn test_unknown_version_is_reported_to_child() -> Result<()> {
    let _guard = serial();
    let fixture = Fixture::new()?.with_linux_payload()?;
    let env = gcp_env();

    let launched = expect_started(launch(&fixture.config(&env, None), &env, &fixture.bundle())?);

    assert_eq!(launched.version, "unknown");
    assert_eq!(
        wait_for_file(&fixture.output("bundled.out")).as_deref(),
        Some("unknown")
    );
    Ok(())
}
