//! Root / OS integrity heuristics.
//!
//! The check runs once at process start. Its result is advisory: it is
//! logged and reported in [`DeviceInfo`](crate::device::DeviceInfo) but never
//! gates activation or enforcement.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde::{Deserialize, Serialize};

/// Well-known locations of `su` binaries and superuser packages.
pub const SU_BINARY_PATHS: &[&str] = &[
    "/system/app/Superuser.apk",
    "/sbin/su",
    "/system/bin/su",
    "/system/xbin/su",
    "/data/local/xbin/su",
    "/data/local/bin/su",
    "/system/sd/xbin/su",
    "/system/bin/failsafe/su",
    "/data/local/su",
];

const BUILD_PROP_PATH: &str = "/system/build.prop";
const WHICH_PATH: &str = "/system/xbin/which";

/// A single sign of a compromised OS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RootIndicator {
    /// The build is signed with test keys.
    TestKeysBuild,
    /// A `su` binary or superuser package exists.
    SuBinary {
        /// Where it was found.
        path: PathBuf,
    },
    /// `which su` found a binary on the search path.
    SuOnPath,
}

/// Raw observations the heuristics run on.
pub trait IntegrityProbe {
    /// The `ro.build.tags` property, if readable.
    fn build_tags(&self) -> Option<String>;

    /// Whether `path` exists.
    fn path_exists(&self, path: &Path) -> bool;

    /// Whether a `which su` lookup printed anything.
    fn su_on_path(&self) -> bool;
}

/// Probe reading the real filesystem and build properties.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostIntegrityProbe;

impl IntegrityProbe for HostIntegrityProbe {
    fn build_tags(&self) -> Option<String> {
        let props = std::fs::read_to_string(BUILD_PROP_PATH).ok()?;
        props
            .lines()
            .find_map(|line| line.strip_prefix("ro.build.tags="))
            .map(|tags| tags.trim().to_string())
    }

    fn path_exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn su_on_path(&self) -> bool {
        Command::new(WHICH_PATH)
            .arg("su")
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .is_ok_and(|output| !output.stdout.is_empty())
    }
}

/// Outcome of the integrity check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityReport {
    /// Every indicator found, in check order.
    pub indicators: Vec<RootIndicator>,
}

impl IntegrityReport {
    /// Whether any indicator was found.
    #[must_use]
    pub fn is_compromised(&self) -> bool {
        !self.indicators.is_empty()
    }
}

/// Runs every heuristic against `probe`. Probes that cannot answer count as
/// no indicator.
#[must_use]
pub fn check_integrity(probe: &impl IntegrityProbe) -> IntegrityReport {
    let mut indicators = Vec::new();

    if probe
        .build_tags()
        .is_some_and(|tags| tags.contains("test-keys"))
    {
        indicators.push(RootIndicator::TestKeysBuild);
    }

    indicators.extend(
        SU_BINARY_PATHS
            .iter()
            .map(Path::new)
            .filter(|path| probe.path_exists(path))
            .map(|path| RootIndicator::SuBinary {
                path: path.to_path_buf(),
            }),
    );

    if probe.su_on_path() {
        indicators.push(RootIndicator::SuOnPath);
    }

    IntegrityReport { indicators }
}
