//! Global configuration model for the Cradle runtime.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for the Cradle runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CradleConfig {
    /// Base directory for Cradle state and data.
    pub data_dir: PathBuf,
    /// Directory holding the per-container lock files.
    pub lock_dir: PathBuf,
    /// Default size of the per-container shared-memory tmpfs, in bytes.
    pub shm_size: u64,
    /// Default parent cgroup for container cgroups.
    pub cgroup_parent: String,
}

impl Default for CradleConfig {
    fn default() -> Self {
        let data_dir = PathBuf::from(crate::constants::SYSTEM_DATA_DIR);
        let lock_dir = data_dir.join("locks");
        Self {
            data_dir,
            lock_dir,
            shm_size: crate::constants::DEFAULT_SHM_SIZE,
            cgroup_parent: crate::constants::DEFAULT_CGROUP_PARENT.to_string(),
        }
    }
}
