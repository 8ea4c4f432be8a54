//! The container aggregate: immutable configuration, mutable runtime
//! state, and the per-container lock.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use cradle_common::config::CradleConfig;
use cradle_common::constants::{ARTIFACTS_DIR, ATTACH_SOCKET_NAME, LOG_FILE_NAME};
use cradle_common::error::{CradleError, Result};
use cradle_common::names;
use cradle_common::spec::ProcessSpec;
use cradle_common::types::{ContainerId, ContainerState};
use serde::{Deserialize, Serialize};

use crate::lock::{LockFile, LockGuard};
use crate::services::Services;

/// Configuration fixed at container creation.
///
/// `static_dir` is the one exception: it is assigned once by the storage
/// engine during storage setup and stable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerConfig {
    /// Unique identifier, generated at creation.
    pub id: ContainerId,
    /// Human-readable name, generated if not supplied.
    pub name: String,
    /// Creation timestamp.
    pub created: DateTime<Utc>,
    /// The container's own copy of the caller-supplied process spec.
    pub spec: ProcessSpec,
    /// Size of the shared-memory tmpfs, in bytes.
    pub shm_size: u64,
    /// Mountpoint of the shared-memory tmpfs; no shm mount is managed
    /// when unset.
    pub shm_dir: Option<PathBuf>,
    /// Parent cgroup under which the container's cgroup is created.
    pub cgroup_parent: String,
    /// ID of the image backing the root filesystem.
    pub rootfs_image_id: String,
    /// Name of the image backing the root filesystem.
    pub rootfs_image_name: String,
    /// Security-context label applied to the container's mounts.
    pub mount_label: String,
    /// Static bundle directory, assigned at storage setup.
    pub static_dir: PathBuf,
    /// Auxiliary mount targets managed alongside the root filesystem.
    pub mounts: Vec<PathBuf>,
}

/// Mutable runtime state, persisted through the state store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerRuntimeState {
    /// Current lifecycle state.
    pub state: ContainerState,
    /// Ephemeral runtime directory, reassigned after every host reboot.
    pub run_dir: PathBuf,
    /// Whether the root filesystem is currently mounted.
    pub mounted: bool,
    /// Root filesystem mountpoint; `Some` iff `mounted`.
    pub mountpoint: Option<PathBuf>,
    /// PID of the container process, if one exists.
    pub pid: Option<u32>,
    /// Exit code, once the process has exited.
    pub exit_code: Option<i32>,
    /// Time the process exited, once it has.
    pub finished_at: Option<DateTime<Utc>>,
}

/// A single container instance.
///
/// The handle caches the persisted record and owns the container's
/// exclusive lock. Every state-mutating operation must run with the lock
/// held; operations on different containers proceed fully in parallel.
#[derive(Debug)]
pub struct Container {
    pub(crate) config: ContainerConfig,
    pub(crate) state: ContainerRuntimeState,
    pub(crate) lock: LockFile,
    pub(crate) valid: bool,
    pub(crate) locked: bool,
}

impl Container {
    /// Creates a new container in the `Configured` state.
    ///
    /// Generates a fresh ID and a random human name, stores an
    /// independent copy of the supplied spec, applies the scalar defaults
    /// from `config`, and creates the container's lock file under
    /// `config.lock_dir`. The returned handle is not yet backed by
    /// storage.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if no spec is supplied, or an I/O error
    /// if the lock file cannot be created.
    pub fn new(spec: Option<&ProcessSpec>, config: &CradleConfig) -> Result<Self> {
        let spec = spec.ok_or_else(|| CradleError::InvalidArgument {
            message: "a process spec is required to create a container".into(),
        })?;

        let id = ContainerId::generate();
        let name = names::random_name();

        std::fs::create_dir_all(&config.lock_dir).map_err(|e| CradleError::Io {
            path: config.lock_dir.clone(),
            source: e,
        })?;
        let lock_path = config.lock_dir.join(id.as_str());
        let lock = LockFile::create(&lock_path).map_err(|e| CradleError::Io {
            path: lock_path.clone(),
            source: e,
        })?;

        tracing::debug!(id = %id, name = %name, "container created");

        Ok(Self {
            config: ContainerConfig {
                id,
                name,
                created: Utc::now(),
                spec: spec.clone(),
                shm_size: config.shm_size,
                shm_dir: None,
                cgroup_parent: config.cgroup_parent.clone(),
                rootfs_image_id: String::new(),
                rootfs_image_name: String::new(),
                mount_label: String::new(),
                static_dir: PathBuf::new(),
                mounts: Vec::new(),
            },
            state: ContainerRuntimeState::default(),
            lock,
            valid: true,
            locked: false,
        })
    }

    /// Unique identifier of the container.
    #[must_use]
    pub fn id(&self) -> &ContainerId {
        &self.config.id
    }

    /// Human-readable name of the container.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Full immutable configuration.
    #[must_use]
    pub fn config(&self) -> &ContainerConfig {
        &self.config
    }

    /// The container's copy of the process spec.
    #[must_use]
    pub fn spec(&self) -> &ProcessSpec {
        &self.config.spec
    }

    /// Current cached lifecycle state.
    #[must_use]
    pub fn state(&self) -> ContainerState {
        self.state.state
    }

    /// Whether the root filesystem is currently mounted.
    #[must_use]
    pub fn mounted(&self) -> bool {
        self.state.mounted
    }

    /// Root filesystem mountpoint, while mounted.
    #[must_use]
    pub fn mountpoint(&self) -> Option<&Path> {
        self.state.mountpoint.as_deref()
    }

    /// Ephemeral runtime directory.
    #[must_use]
    pub fn run_dir(&self) -> &Path {
        &self.state.run_dir
    }

    /// Whether this handle is still valid for use.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// The bundle directory — where the runtime spec and auxiliary files
    /// live.
    #[must_use]
    pub fn bundle_path(&self) -> &Path {
        &self.config.static_dir
    }

    /// Path of the container's log file.
    #[must_use]
    pub fn log_path(&self) -> PathBuf {
        self.config.static_dir.join(LOG_FILE_NAME)
    }

    /// Path of the named artifact under the bundle directory.
    ///
    /// A pure path join; the artifact may or may not exist.
    #[must_use]
    pub fn artifact_path(&self, name: &str) -> PathBuf {
        self.config.static_dir.join(ARTIFACTS_DIR).join(name)
    }

    /// Path of the container's attach socket inside the process runtime's
    /// socket directory.
    #[must_use]
    pub fn attach_socket_path(&self, services: &Services) -> PathBuf {
        services
            .oci
            .sockets_dir()
            .join(self.config.id.as_str())
            .join(ATTACH_SOCKET_NAME)
    }

    /// Sets the image reference backing the root filesystem. Both fields
    /// must be set before storage setup.
    pub fn set_rootfs_image(&mut self, image_id: impl Into<String>, image_name: impl Into<String>) {
        self.config.rootfs_image_id = image_id.into();
        self.config.rootfs_image_name = image_name.into();
    }

    /// Sets the security-context label applied to the container's mounts.
    pub fn set_mount_label(&mut self, label: impl Into<String>) {
        self.config.mount_label = label.into();
    }

    /// Configures the shared-memory tmpfs mountpoint and registers it as
    /// an auxiliary mount so that storage cleanup detaches it.
    pub fn set_shm_dir(&mut self, dir: PathBuf) {
        if !self.config.mounts.contains(&dir) {
            self.config.mounts.push(dir.clone());
        }
        self.config.shm_dir = Some(dir);
    }

    /// Registers an auxiliary mount target to be detached during storage
    /// cleanup.
    pub fn add_mount(&mut self, target: PathBuf) {
        self.config.mounts.push(target);
    }

    /// Marks this handle permanently invalid. Called by the orchestration
    /// layer once the container's record has been deleted; every further
    /// operation on the handle fails with `Removed`.
    pub fn invalidate(&mut self) {
        self.valid = false;
    }

    /// Takes the container's exclusive lock, blocking until it is held.
    ///
    /// Callers sequence multi-operation critical sections with this;
    /// operations that lock internally (such as `refresh`) must not be
    /// called while holding the guard.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock file cannot be locked.
    pub fn acquire_lock(&self) -> Result<LockGuard> {
        self.lock.acquire().map_err(|e| CradleError::Io {
            path: self.lock.path().to_path_buf(),
            source: e,
        })
    }

    /// Runs `f` with the lock held, tracking the reentrancy flag so that
    /// lock-aware operations like `is_stopped` can tell they are already
    /// inside a critical section.
    pub(crate) fn with_lock<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let _guard = self.acquire_lock()?;
        self.locked = true;
        let result = f(self);
        self.locked = false;
        result
    }
}

/// Wraps a storage-service failure with the operation and container
/// identifiers, so the error is actionable without a debugger.
pub(crate) fn storage_err(
    operation: &'static str,
    id: &ContainerId,
    err: &CradleError,
) -> CradleError {
    CradleError::Storage {
        operation,
        id: id.to_string(),
        message: err.to_string(),
    }
}
