//! OS mount helpers for container storage.
//!
//! Covers the shared-memory tmpfs mount and lazy detaching of auxiliary
//! mounts. Root filesystem mounts go through the storage engine instead.

use std::path::Path;

use cradle_common::error::{CradleError, Result};

/// Returns whether `path` is currently a mountpoint.
///
/// # Errors
///
/// Returns an error if the mount table cannot be read.
#[cfg(target_os = "linux")]
pub fn is_mounted(path: &Path) -> Result<bool> {
    const MOUNT_TABLE: &str = "/proc/self/mounts";

    let table = std::fs::read_to_string(MOUNT_TABLE).map_err(|e| CradleError::Io {
        path: MOUNT_TABLE.into(),
        source: e,
    })?;
    let wanted = path.to_string_lossy();
    Ok(table.lines().any(|line| {
        line.split_whitespace()
            .nth(1)
            .is_some_and(|target| unescape_mount_field(target) == wanted)
    }))
}

/// Stub for non-Linux platforms; nothing is ever mounted.
#[cfg(not(target_os = "linux"))]
pub fn is_mounted(_path: &Path) -> Result<bool> {
    Ok(false)
}

/// Decodes the octal escapes the kernel uses for whitespace in mount
/// table fields (`\040` for space, `\011` for tab, ...).
#[cfg(target_os = "linux")]
fn unescape_mount_field(field: &str) -> String {
    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 3 < bytes.len() {
            if let Ok(code) = u8::from_str_radix(&field[i + 1..i + 4], 8) {
                out.push(code);
                i += 4;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Ensures a shared-memory tmpfs is mounted at `dir`.
///
/// An existing mount is reused rather than remounted. New mounts carry
/// `mode=1777,size=<size>` plus the container's security label, with the
/// noexec, nosuid, and nodev flags set.
///
/// # Errors
///
/// Returns an error if the mount table cannot be read, the directory
/// cannot be created, or the `mount(2)` syscall fails.
#[cfg(target_os = "linux")]
pub fn mount_shm(dir: &Path, size: u64, mount_label: &str) -> Result<()> {
    use nix::mount::{MsFlags, mount};

    if is_mounted(dir)? {
        return Ok(());
    }

    std::fs::create_dir_all(dir).map_err(|e| CradleError::Io {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let options = crate::label::format_mount_label(&format!("mode=1777,size={size}"), mount_label);
    mount(
        Some("shm"),
        dir,
        Some("tmpfs"),
        MsFlags::MS_NOEXEC | MsFlags::MS_NOSUID | MsFlags::MS_NODEV,
        Some(options.as_str()),
    )
    .map_err(|e| CradleError::Mount {
        path: dir.to_path_buf(),
        message: format!("failed to mount shm tmpfs: {e}"),
    })?;

    tracing::debug!(path = %dir.display(), size, "shm tmpfs mounted");
    Ok(())
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error — tmpfs mounting requires Linux.
#[cfg(not(target_os = "linux"))]
pub fn mount_shm(dir: &Path, _size: u64, _mount_label: &str) -> Result<()> {
    Err(CradleError::Mount {
        path: dir.to_path_buf(),
        message: "Linux required for shm tmpfs mounts".into(),
    })
}

/// Lazily detaches the mount at `target` with `MNT_DETACH`.
///
/// Returns the raw errno so callers can treat `EINVAL` (target is not a
/// mountpoint) as benign.
///
/// # Errors
///
/// Returns the errno from `umount2(2)` on failure.
#[cfg(target_os = "linux")]
pub fn detach_mount(target: &Path) -> nix::Result<()> {
    nix::mount::umount2(target, nix::mount::MntFlags::MNT_DETACH)
}

/// Stub for non-Linux platforms; detaching is a no-op.
///
/// # Errors
///
/// Never fails.
#[cfg(not(target_os = "linux"))]
pub fn detach_mount(_target: &Path) -> nix::Result<()> {
    Ok(())
}
