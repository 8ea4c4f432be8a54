//! Query and mutation interface of the layered storage engine.

use std::path::PathBuf;

use cradle_common::error::Result;
use cradle_common::types::{ContainerId, LayerId};
use serde::{Deserialize, Serialize};

/// Platform context handed to the storage engine when materializing
/// container storage from an image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageContext {
    /// Target operating system.
    pub os: String,
    /// Target architecture.
    pub arch: String,
}

impl Default for ImageContext {
    fn default() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
        }
    }
}

/// Directories allocated for one container by the storage engine.
#[derive(Debug, Clone)]
pub struct ContainerDirs {
    /// Static bundle directory, stable for the container's lifetime.
    pub bundle_dir: PathBuf,
    /// Ephemeral runtime directory, lost across host reboots.
    pub run_dir: PathBuf,
}

/// The storage engine's own record of a container.
#[derive(Debug, Clone)]
pub struct ContainerStorageRecord {
    /// The container's top (mutable) layer.
    pub layer_id: LayerId,
}

/// One layer in the parent-linked storage chain.
#[derive(Debug, Clone)]
pub struct Layer {
    /// Content-addressed layer identifier.
    pub id: LayerId,
    /// Parent layer; `None` for the base layer.
    pub parent: Option<LayerId>,
}

/// Operations the container core consumes from the storage engine.
///
/// Implementations own their own timeout and retry policy; every call
/// here is synchronous and must not block indefinitely.
pub trait StorageService: Send + Sync {
    /// Materializes container storage from the referenced image and
    /// returns the allocated directories.
    fn create_container_storage(
        &self,
        ctx: &ImageContext,
        image_name: &str,
        image_id: &str,
        container_name: &str,
        container_id: &ContainerId,
        mount_label: &str,
    ) -> Result<ContainerDirs>;

    /// Mounts the container's root filesystem image and returns the
    /// mountpoint.
    fn mount_container_image(&self, id: &ContainerId) -> Result<PathBuf>;

    /// Unmounts the container's root filesystem image.
    fn unmount_container_image(&self, id: &ContainerId) -> Result<()>;

    /// Permanently deletes the container's storage.
    fn delete_container(&self, id: &ContainerId) -> Result<()>;

    /// Returns the container's current run directory, recreating it if it
    /// was lost across a reboot.
    fn run_dir(&self, id: &ContainerId) -> Result<PathBuf>;

    /// Looks up the storage engine's record for a container.
    fn container_record(&self, id: &ContainerId) -> Result<ContainerStorageRecord>;

    /// Looks up a layer by its ID.
    fn layer(&self, id: &LayerId) -> Result<Layer>;

    /// Returns the byte size of the content difference between a layer
    /// and its parent; a `None` parent diffs against the empty base.
    fn diff_size(&self, parent: Option<&LayerId>, layer: &LayerId) -> Result<u64>;
}
