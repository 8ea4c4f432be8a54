//! Security-context label helpers for mounts and files.

use std::path::Path;

use cradle_common::error::{CradleError, Result};

/// Appends an SELinux context to a set of mount options.
///
/// Returns the options unchanged when no label is configured.
#[must_use]
pub fn format_mount_label(options: &str, mount_label: &str) -> String {
    if mount_label.is_empty() {
        options.to_string()
    } else if options.is_empty() {
        format!("context=\"{mount_label}\"")
    } else {
        format!("{options},context=\"{mount_label}\"")
    }
}

/// Applies `mount_label` as the security context of the file at `path`.
///
/// A no-op when the label is empty or the filesystem does not support
/// security labels.
///
/// # Errors
///
/// Returns an error if the label cannot be applied for any other reason.
#[cfg(target_os = "linux")]
pub fn relabel(path: &Path, mount_label: &str) -> Result<()> {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    if mount_label.is_empty() {
        return Ok(());
    }

    let c_path = CString::new(path.as_os_str().as_bytes()).map_err(|_| {
        CradleError::InvalidArgument {
            message: format!("path {} contains an interior NUL byte", path.display()),
        }
    })?;

    // SAFETY: both pointers reference NUL-terminated buffers that outlive
    // the call; the value buffer length is passed explicitly.
    let rc = unsafe {
        libc::lsetxattr(
            c_path.as_ptr(),
            c"security.selinux".as_ptr(),
            mount_label.as_ptr().cast(),
            mount_label.len(),
            0,
        )
    };
    if rc == 0 {
        return Ok(());
    }

    let err = std::io::Error::last_os_error();
    if err.raw_os_error() == Some(libc::ENOTSUP) {
        tracing::debug!(path = %path.display(), "filesystem does not support security labels");
        return Ok(());
    }
    Err(CradleError::Io {
        path: path.to_path_buf(),
        source: err,
    })
}

/// Stub for non-Linux platforms; labels are not supported and silently
/// skipped, matching the empty-label behavior on Linux.
///
/// # Errors
///
/// Never fails.
#[cfg(not(target_os = "linux"))]
pub fn relabel(_path: &Path, _mount_label: &str) -> Result<()> {
    Ok(())
}
