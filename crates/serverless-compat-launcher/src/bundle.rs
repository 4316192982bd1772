//! Access to the serverless-compat payloads shipped with the launcher.
//!
//! Payloads are addressed by their '/'-separated path relative to the bundle
//! root, e.g. `bin/linux-amd64/datadog-serverless-compat`.

use std::fs::File;
use std::io::{self, Cursor, Read};
use std::path::PathBuf;
use tracing::warn;

/// Read-only source of bundled payloads.
pub trait Bundle {
    /// Open a payload, or `None` when the bundle does not contain it.
    fn open(&self, relative_path: &str) -> Option<Box<dyn Read + '_>>;
}

/// Payloads compiled into the launcher binary.
///
/// `build.rs` enables each payload only when its file exists under the crate's
/// `bin/` directory at build time; anything else is reported as missing.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedBundle;

impl EmbeddedBundle {
    fn payload(relative_path: &str) -> Option<&'static [u8]> {
        match relative_path {
            #[cfg(embedded_linux_payload)]
            serverless_compat_config::LINUX_BUNDLED_PATH => Some(include_bytes!(concat!(
                env!("CARGO_MANIFEST_DIR"),
                "/bin/linux-amd64/datadog-serverless-compat"
            ))),
            #[cfg(embedded_windows_payload)]
            serverless_compat_config::WINDOWS_BUNDLED_PATH => Some(include_bytes!(concat!(
                env!("CARGO_MANIFEST_DIR"),
                "/bin/windows-amd64/datadog-serverless-compat.exe"
            ))),
            _ => None,
        }
    }
}

impl Bundle for EmbeddedBundle {
    fn open(&self, relative_path: &str) -> Option<Box<dyn Read + '_>> {
        Self::payload(relative_path).map(|bytes| Box::new(Cursor::new(bytes)) as Box<dyn Read>)
    }
}

/// Payloads laid out on disk under a root directory.
#[derive(Debug, Clone)]
pub struct DirBundle {
    root: PathBuf,
}

impl DirBundle {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Bundle rooted at the directory holding the running executable.
    pub fn beside_current_exe() -> io::Result<Self> {
        let exe = std::env::current_exe()?;
        let root = exe
            .parent()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "executable has no parent"))?;
        Ok(Self::new(root))
    }

    fn resolve(&self, relative_path: &str) -> PathBuf {
        relative_path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .fold(self.root.clone(), |path, segment| path.join(segment))
    }
}

impl Bundle for DirBundle {
    fn open(&self, relative_path: &str) -> Option<Box<dyn Read + '_>> {
        let path = self.resolve(relative_path);
        match File::open(&path) {
            Ok(file) if file.metadata().map(|m| m.is_file()).unwrap_or(false) => {
                Some(Box::new(file) as Box<dyn Read>)
            }
            Ok(_) => None,
            Err(err) if err.kind() == io::ErrorKind::NotFound => None,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Unable to open bundled payload");
                None
            }
        }
    }
}

/// Tries each bundle in order and returns the first payload found.
pub struct ChainedBundle<'a> {
    bundles: Vec<&'a dyn Bundle>,
}

impl<'a> ChainedBundle<'a> {
    pub fn new(bundles: Vec<&'a dyn Bundle>) -> Self {
        Self { bundles }
    }

    /// Payload lookup order for the launcher binary.
    ///
    /// An explicitly requested directory is the only source consulted.
    /// Otherwise embedded payloads win over a directory beside the executable.
    pub fn for_launcher(
        explicit_dir: Option<&'a DirBundle>,
        beside_exe: Option<&'a DirBundle>,
    ) -> Self {
        if let Some(dir) = explicit_dir {
            return Self::new(vec![dir as &dyn Bundle]);
        }

        let mut bundles: Vec<&'a dyn Bundle> = vec![&EmbeddedBundle as &dyn Bundle];
        if let Some(dir) = beside_exe {
            bundles.push(dir);
        }
        Self::new(bundles)
    }
}

impl Bundle for ChainedBundle<'_> {
    fn open(&self, relative_path: &str) -> Option<Box<dyn Read + '_>> {
        self.bundles
            .iter()
            .find_map(|bundle| bundle.open(relative_path))
    }
}
