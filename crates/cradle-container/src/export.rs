//! Exporting a container's root filesystem and staging host files into
//! its run directory.

use std::path::{Path, PathBuf};

use cradle_common::error::{CradleError, Result};
use cradle_storage::label;

use crate::container::{Container, storage_err};
use crate::services::Services;

impl Container {
    /// Writes the container's root filesystem to `path` as an
    /// uncompressed tar archive.
    ///
    /// An already-mounted container is archived from its recorded
    /// mountpoint. Otherwise the image is mounted transiently and
    /// unmounted afterwards without touching the container's recorded
    /// state; a failure of that unmount is logged but does not fail an
    /// export that already completed.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the transient mount fails, `InvalidState` if
    /// the mount state is inconsistent, and `Io` if the archive cannot
    /// be written.
    pub fn export(&self, services: &Services, path: &Path) -> Result<()> {
        let id = &self.config.id;

        if self.state.mounted {
            let mountpoint = self.state.mountpoint.as_deref().ok_or_else(|| {
                CradleError::InvalidState {
                    id: id.to_string(),
                    message: "mounted but no mountpoint is recorded".into(),
                }
            })?;
            return write_archive(mountpoint, path);
        }

        let mountpoint = services
            .storage
            .mount_container_image(id)
            .map_err(|e| storage_err("mounting container storage for export", id, &e))?;

        let result = write_archive(&mountpoint, path);

        if let Err(e) = services.storage.unmount_container_image(id) {
            tracing::error!(
                id = %id,
                error = %e,
                "error unmounting container storage after export"
            );
        }

        result
    }

    /// Copies a file from the host into the container's run directory,
    /// applying the container's mount label, and returns the path of the
    /// copy.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for a source path without a file name,
    /// and `Io` if the copy or relabel fails.
    pub fn copy_host_file_to_run_dir(&self, source: &Path) -> Result<PathBuf> {
        let file_name = source.file_name().ok_or_else(|| {
            CradleError::InvalidArgument {
                message: format!("{} has no file name to copy", source.display()),
            }
        })?;
        let dest = self.state.run_dir.join(file_name);

        let _ = std::fs::copy(source, &dest).map_err(|e| CradleError::Io {
            path: source.to_path_buf(),
            source: e,
        })?;
        label::relabel(&dest, &self.config.mount_label)?;

        Ok(dest)
    }
}

fn write_archive(mountpoint: &Path, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path).map_err(|e| CradleError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut builder = tar::Builder::new(file);
    builder.follow_symlinks(false);
    builder
        .append_dir_all(".", mountpoint)
        .map_err(|e| CradleError::Io {
            path: mountpoint.to_path_buf(),
            source: e,
        })?;
    builder.finish().map_err(|e| CradleError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}
