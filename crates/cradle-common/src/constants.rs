//! System-wide constants and default paths.

/// Default base directory for Cradle data.
pub const SYSTEM_DATA_DIR: &str = "/var/lib/cradle";

/// Default size of the per-container shared-memory tmpfs, in bytes (64 MiB).
pub const DEFAULT_SHM_SIZE: u64 = 64 * 1024 * 1024;

/// Default parent cgroup under which container cgroups are created.
pub const DEFAULT_CGROUP_PARENT: &str = "/cradle_parent";

/// Name of the per-container subdirectory holding auxiliary artifact files,
/// relative to the bundle directory.
pub const ARTIFACTS_DIR: &str = "artifacts";

/// File name of the container log inside the bundle directory.
pub const LOG_FILE_NAME: &str = "ctr.log";

/// File name of the attach socket inside the process runtime's
/// per-container socket directory.
pub const ATTACH_SOCKET_NAME: &str = "attach";
