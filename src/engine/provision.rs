//! Materializing the private engine binaries on disk.
//!
//! The provisioner writes three artifacts (client, daemon, network proxy) into
//! a deployment directory. Each session gets a fresh directory under the
//! configured base with a random eight-character component; it is never
//! removed. Writing is best-effort: an artifact that cannot be written is
//! logged and reported, and the remaining artifacts are still attempted.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use tracing::{debug, info, warn};

use crate::error::FilesystemError;

/// One of the executables making up a private engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Artifact {
    /// The engine client.
    Client,
    /// The engine daemon.
    Daemon,
    /// The daemon's userland network proxy.
    NetworkProxy,
}

impl Artifact {
    /// Every artifact, in the order they are written.
    pub const ALL: [Self; 3] = [Self::Client, Self::Daemon, Self::NetworkProxy];

    /// File name without the platform executable suffix.
    #[must_use]
    pub const fn stem(self) -> &'static str {
        match self {
            Self::Client => "docker",
            Self::Daemon => "dockerd",
            Self::NetworkProxy => "docker-proxy",
        }
    }

    /// File name including the platform executable suffix.
    #[must_use]
    pub fn file_name(self) -> String {
        format!("{}{}", self.stem(), std::env::consts::EXE_SUFFIX)
    }

    /// Location of this artifact inside `dir`.
    #[must_use]
    pub fn path_in(self, dir: &Utf8Path) -> Utf8PathBuf {
        dir.join(self.file_name())
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.stem())
    }
}

/// Supplies the bytes of each artifact.
pub trait PayloadSource: Send + Sync {
    /// Return the executable bytes for `artifact`.
    ///
    /// # Errors
    ///
    /// Returns [`FilesystemError::PayloadUnavailable`] when the source has no
    /// bytes for `artifact`.
    fn payload(&self, artifact: Artifact) -> Result<Vec<u8>, FilesystemError>;
}

/// Reads artifacts from a directory of bundled executables.
#[derive(Debug, Clone)]
pub struct BundleDirectory {
    root: Utf8PathBuf,
}

impl BundleDirectory {
    /// Read artifacts from `root`.
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Read artifacts shipped next to the running executable.
    ///
    /// # Errors
    ///
    /// Returns [`FilesystemError`] when the current executable cannot be
    /// located or its directory is not valid UTF-8.
    pub fn beside_current_exe() -> Result<Self, FilesystemError> {
        let exe = std::env::current_exe()
            .map_err(|e| FilesystemError::from_io("current executable", &e))?;
        let dir = exe.parent().map(std::path::Path::to_path_buf).unwrap_or_default();
        let utf8 = Utf8PathBuf::from_path_buf(dir).map_err(|path| FilesystemError::IoError {
            path,
            message: String::from("path is not valid UTF-8"),
        })?;
        Ok(Self::new(utf8))
    }

    /// The bundle directory.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }
}

impl PayloadSource for BundleDirectory {
    fn payload(&self, artifact: Artifact) -> Result<Vec<u8>, FilesystemError> {
        let unavailable = |message: String| FilesystemError::PayloadUnavailable {
            artifact: artifact.file_name(),
            message,
        };
        let dir = Dir::open_ambient_dir(&self.root, ambient_authority())
            .map_err(|e| unavailable(format!("cannot open {}: {e}", self.root)))?;
        dir.read(artifact.file_name())
            .map_err(|e| unavailable(format!("cannot read from {}: {e}", self.root)))
    }
}

/// Artifact bytes held in memory, for embedders that link the payload in.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPayloads {
    payloads: HashMap<Artifact, Arc<[u8]>>,
}

impl InMemoryPayloads {
    /// Create an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `bytes` for `artifact`, replacing any earlier registration.
    #[must_use]
    pub fn with(mut self, artifact: Artifact, bytes: impl Into<Arc<[u8]>>) -> Self {
        self.payloads.insert(artifact, bytes.into());
        self
    }
}

impl PayloadSource for InMemoryPayloads {
    fn payload(&self, artifact: Artifact) -> Result<Vec<u8>, FilesystemError> {
        self.payloads
            .get(&artifact)
            .map(|bytes| bytes.to_vec())
            .ok_or_else(|| FilesystemError::PayloadUnavailable {
                artifact: artifact.file_name(),
                message: String::from("not registered"),
            })
    }
}

/// What one provisioning pass produced.
#[derive(Debug)]
pub struct ProvisionReport {
    /// The deployment directory.
    pub path: Utf8PathBuf,
    /// Artifacts written successfully.
    pub written: Vec<Artifact>,
    /// Artifacts that could not be written, with the cause.
    pub failed: Vec<(Artifact, FilesystemError)>,
}

impl ProvisionReport {
    /// Returns `true` when every artifact was written.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.written.len() == Artifact::ALL.len()
    }
}

/// Writes the private engine artifacts into a deployment directory.
#[derive(Clone)]
pub struct BinaryProvisioner {
    payloads: Arc<dyn PayloadSource>,
    base_dir: Utf8PathBuf,
}

impl fmt::Debug for BinaryProvisioner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BinaryProvisioner")
            .field("base_dir", &self.base_dir)
            .finish_non_exhaustive()
    }
}

impl BinaryProvisioner {
    /// Create a provisioner placing deployments under `base_dir`.
    pub fn new(payloads: Arc<dyn PayloadSource>, base_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            payloads,
            base_dir: base_dir.into(),
        }
    }

    /// Materialize every artifact.
    ///
    /// Writes into `existing` when given, otherwise into a new randomly named
    /// directory under the base directory. Files already present at an
    /// artifact's path are replaced.
    ///
    /// # Errors
    ///
    /// Returns [`FilesystemError`] only when the deployment directory itself
    /// cannot be created or opened. Per-artifact failures are recorded in the
    /// report instead.
    pub fn provision(
        &self,
        existing: Option<&Utf8Path>,
    ) -> Result<ProvisionReport, FilesystemError> {
        let path = match existing {
            Some(dir) => dir.to_path_buf(),
            None => self.create_deployment_dir()?,
        };
        let dir = Dir::open_ambient_dir(&path, ambient_authority())
            .map_err(|e| FilesystemError::from_io(path.as_std_path(), &e))?;

        let mut report = ProvisionReport {
            path,
            written: Vec::with_capacity(Artifact::ALL.len()),
            failed: Vec::new(),
        };

        for artifact in Artifact::ALL {
            match self.write_artifact(&dir, &report.path, artifact) {
                Ok(()) => {
                    debug!(%artifact, path = %artifact.path_in(&report.path), "artifact written");
                    report.written.push(artifact);
                }
                Err(error) => {
                    warn!(%artifact, %error, "failed to write engine artifact");
                    report.failed.push((artifact, error));
                }
            }
        }

        info!(
            path = %report.path,
            written = report.written.len(),
            failed = report.failed.len(),
            "engine artifacts provisioned"
        );
        Ok(report)
    }

    fn create_deployment_dir(&self) -> Result<Utf8PathBuf, FilesystemError> {
        let base = self.base_dir.as_std_path();
        Dir::create_ambient_dir_all(&self.base_dir, ambient_authority())
            .map_err(|e| FilesystemError::from_io(base, &e))?;

        let kept = tempfile::Builder::new()
            .prefix("dockshim-")
            .suffix(".deploy")
            .rand_bytes(8)
            .tempdir_in(base)
            .map_err(|e| FilesystemError::from_io(base, &e))?
            .keep();

        Utf8PathBuf::from_path_buf(kept).map_err(|path| FilesystemError::IoError {
            path,
            message: String::from("path is not valid UTF-8"),
        })
    }

    fn write_artifact(
        &self,
        dir: &Dir,
        deployment: &Utf8Path,
        artifact: Artifact,
    ) -> Result<(), FilesystemError> {
        let bytes = self.payloads.payload(artifact)?;
        let name = artifact.file_name();
        let target = artifact.path_in(deployment);
        let io_error = |e: &std::io::Error| FilesystemError::from_io(target.as_std_path(), e);

        match dir.remove_file(&name) {
            Ok(()) => debug!(%artifact, "replaced existing artifact"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(io_error(&e)),
        }
        dir.write(&name, bytes).map_err(|e| io_error(&e))?;
        mark_executable(dir, &name).map_err(|e| io_error(&e))
    }
}

#[cfg(unix)]
fn mark_executable(dir: &Dir, name: &str) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let permissions = cap_std::fs::Permissions::from_std(std::fs::Permissions::from_mode(0o755));
    dir.set_permissions(name, permissions)
}

#[cfg(not(unix))]
fn mark_executable(_dir: &Dir, _name: &str) -> std::io::Result<()> {
    Ok(())
}
