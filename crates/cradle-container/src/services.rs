//! Interfaces to the container core's external collaborators.
//!
//! The storage engine, the durable state store, and the process runtime
//! all fail independently; the container core coordinates them but never
//! implements them.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use cradle_common::error::Result;
use cradle_common::types::{ContainerId, ContainerState};
use cradle_storage::service::{ImageContext, StorageService};

use crate::container::ContainerRuntimeState;

/// Live status observed from the process runtime.
#[derive(Debug, Clone)]
pub struct ContainerStatus {
    /// Observed lifecycle state.
    pub state: ContainerState,
    /// PID of the container process, if one exists.
    pub pid: Option<u32>,
    /// Exit code, once the process has exited.
    pub exit_code: Option<i32>,
    /// Time the process exited, once it has.
    pub finished_at: Option<DateTime<Utc>>,
}

/// Durable persistence for container records.
pub trait StateStore: Send + Sync {
    /// Writes the current runtime state of a container.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be written.
    fn save_container(&self, id: &ContainerId, state: &ContainerRuntimeState) -> Result<()>;

    /// Reloads the persisted runtime state of a container, picking up
    /// changes made by other processes. Returns `None` when the record no
    /// longer exists — the container was removed externally.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be read.
    fn update_container(&self, id: &ContainerId) -> Result<Option<ContainerRuntimeState>>;
}

/// External supervisor of the live container process.
pub trait ProcessRuntime: Send + Sync {
    /// Queries the live status of a container's process.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime cannot be queried.
    fn container_status(&self, id: &ContainerId) -> Result<ContainerStatus>;

    /// Directory under which the runtime keeps per-container control
    /// sockets.
    fn sockets_dir(&self) -> PathBuf;
}

/// The external collaborators a container operates against.
///
/// Shared handles so that many containers, possibly on different threads,
/// can use the same collaborators.
pub struct Services {
    /// The layered, copy-on-write storage engine.
    pub storage: Arc<dyn StorageService>,
    /// Durable key-value persistence for container records.
    pub state: Arc<dyn StateStore>,
    /// The OCI process runtime supervising container processes.
    pub oci: Arc<dyn ProcessRuntime>,
    /// Platform context for image operations.
    pub image_context: ImageContext,
}
