//! Storage lifecycle of a container: setup, mounting, cleanup, and
//! teardown of the root filesystem and its auxiliary mounts.

use std::path::PathBuf;

use cradle_common::constants::ARTIFACTS_DIR;
use cradle_common::error::{CradleError, Result};
use cradle_common::types::ContainerState;
use cradle_storage::mount;

use crate::container::{Container, storage_err};
use crate::services::Services;

impl Container {
    /// Allocates root filesystem storage for the container and records
    /// the directories the storage engine assigned.
    ///
    /// Creates the artifacts directory under the bundle so later stages
    /// can drop auxiliary files there. Only a `Configured` container can
    /// have storage set up, and the image reference must have been set
    /// first.
    ///
    /// # Errors
    ///
    /// Returns `Removed` if the handle is invalid, `InvalidState` if the
    /// container is past the `Configured` state, `InvalidArgument` if the
    /// image reference is incomplete, and `Storage` if the engine fails.
    pub fn setup_storage(&mut self, services: &Services) -> Result<()> {
        if !self.valid {
            return Err(CradleError::Removed {
                id: self.config.id.to_string(),
            });
        }
        if self.state.state != ContainerState::Configured {
            return Err(CradleError::InvalidState {
                id: self.config.id.to_string(),
                message: format!(
                    "storage can only be set up in the configured state, not {}",
                    self.state.state
                ),
            });
        }
        if self.config.rootfs_image_id.is_empty() || self.config.rootfs_image_name.is_empty() {
            return Err(CradleError::InvalidArgument {
                message: "both an image ID and an image name are required to set up storage"
                    .into(),
            });
        }

        let dirs = services
            .storage
            .create_container_storage(
                &services.image_context,
                &self.config.rootfs_image_name,
                &self.config.rootfs_image_id,
                &self.config.name,
                &self.config.id,
                &self.config.mount_label,
            )
            .map_err(|e| storage_err("creating container storage", &self.config.id, &e))?;

        self.config.static_dir = dirs.bundle_dir;
        self.state.run_dir = dirs.run_dir;

        let artifacts = self.config.static_dir.join(ARTIFACTS_DIR);
        let mut builder = std::fs::DirBuilder::new();
        let _ = builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            let _ = builder.mode(0o755);
        }
        builder.create(&artifacts).map_err(|e| CradleError::Io {
            path: artifacts,
            source: e,
        })?;

        tracing::debug!(
            id = %self.config.id,
            bundle = %self.config.static_dir.display(),
            run_dir = %self.state.run_dir.display(),
            "container storage created"
        );
        Ok(())
    }

    /// Mounts the container's root filesystem and returns the mountpoint.
    ///
    /// Already-mounted containers return the recorded mountpoint without
    /// touching the storage engine. When a shared-memory directory is
    /// configured, its tmpfs is mounted first. The new mount state is
    /// persisted before returning; a persistence failure rolls the mounts
    /// back so no unrecorded mount survives.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` when the container claims to be mounted
    /// without a recorded mountpoint, and `Storage`, `Mount` or
    /// `Persistence` errors from the respective stages.
    pub fn mount_storage(&mut self, services: &Services) -> Result<PathBuf> {
        if self.state.mounted {
            return self
                .state
                .mountpoint
                .clone()
                .ok_or_else(|| CradleError::InvalidState {
                    id: self.config.id.to_string(),
                    message: "mounted but no mountpoint is recorded".into(),
                });
        }

        if let Some(shm_dir) = &self.config.shm_dir {
            mount::mount_shm(shm_dir, self.config.shm_size, &self.config.mount_label)?;
        }

        let mountpoint = services
            .storage
            .mount_container_image(&self.config.id)
            .map_err(|e| storage_err("mounting container storage", &self.config.id, &e))?;

        self.state.mounted = true;
        self.state.mountpoint = Some(mountpoint.clone());

        if let Err(save_err) = self.save(services) {
            if let Err(cleanup_err) = self.cleanup_storage(services) {
                tracing::error!(
                    id = %self.config.id,
                    error = %cleanup_err,
                    "error rolling back storage mounts after a failed state save"
                );
            }
            return Err(save_err);
        }

        tracing::debug!(
            id = %self.config.id,
            mountpoint = %mountpoint.display(),
            "container storage mounted"
        );
        Ok(mountpoint)
    }

    /// Unmounts the root filesystem and every auxiliary mount, then
    /// persists the unmounted state.
    ///
    /// Auxiliary mounts are best effort: a target that is not mounted is
    /// silently skipped and any other detach failure is logged as a
    /// warning, since neither prevents the primary unmount from
    /// proceeding. The mount flags are cleared and persisted only once
    /// the primary unmount has succeeded, so a failed cleanup leaves the
    /// container recorded as mounted and can be retried. A container
    /// that is not mounted is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the primary unmount fails, with the mount
    /// state left intact, and `Persistence` if the cleared state cannot
    /// be saved.
    pub fn cleanup_storage(&mut self, services: &Services) -> Result<()> {
        if !self.state.mounted {
            tracing::debug!(id = %self.config.id, "storage is not mounted, skipping cleanup");
            return Ok(());
        }

        for target in &self.config.mounts {
            if let Err(errno) = mount::detach_mount(target) {
                // EINVAL means the target is not a mountpoint, which is
                // fine after a reboot or a partial mount.
                if errno != nix::errno::Errno::EINVAL {
                    tracing::warn!(
                        id = %self.config.id,
                        target = %target.display(),
                        error = %errno,
                        "failed to detach auxiliary mount"
                    );
                }
            }
        }

        // The record keeps saying mounted until the unmount actually
        // succeeded; otherwise a retry would no-op on a still-mounted
        // filesystem.
        services
            .storage
            .unmount_container_image(&self.config.id)
            .map_err(|e| storage_err("unmounting container storage", &self.config.id, &e))?;

        self.state.mounted = false;
        self.state.mountpoint = None;
        self.save(services)?;

        tracing::debug!(id = %self.config.id, "container storage cleaned up");
        Ok(())
    }

    /// Permanently removes the container's storage: artifacts, mounts,
    /// and the root filesystem layer.
    ///
    /// Unlike cleanup this fails fast, so a stuck unmount is reported
    /// before the layer would be deleted underneath it.
    ///
    /// # Errors
    ///
    /// Returns `Removed` if the handle is invalid, `InvalidState` while
    /// the container is running or paused, and the first error of any
    /// stage otherwise.
    pub fn teardown_storage(&mut self, services: &Services) -> Result<()> {
        if !self.valid {
            return Err(CradleError::Removed {
                id: self.config.id.to_string(),
            });
        }
        if matches!(
            self.state.state,
            ContainerState::Running | ContainerState::Paused
        ) {
            return Err(CradleError::InvalidState {
                id: self.config.id.to_string(),
                message: format!(
                    "storage cannot be removed while the container is {}",
                    self.state.state
                ),
            });
        }

        let artifacts = self.config.static_dir.join(ARTIFACTS_DIR);
        if let Err(e) = std::fs::remove_dir_all(&artifacts) {
            if e.kind() != std::io::ErrorKind::NotFound {
                return Err(CradleError::Io {
                    path: artifacts,
                    source: e,
                });
            }
        }

        self.cleanup_storage(services)?;

        services
            .storage
            .delete_container(&self.config.id)
            .map_err(|e| storage_err("deleting container storage", &self.config.id, &e))?;

        tracing::debug!(id = %self.config.id, "container storage removed");
        Ok(())
    }
}
