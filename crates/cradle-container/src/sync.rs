//! Keeping the in-memory container handle consistent with the durable
//! state store and the live process runtime.

use cradle_common::error::{CradleError, Result};
use cradle_common::types::ContainerState;

use crate::container::Container;
use crate::services::Services;

/// Merges the state observed from the process runtime into the cached
/// one. The runtime is authoritative for live process states, but it
/// knows nothing about containers it has never seen, so an `Unknown` or
/// `Configured` observation keeps the cached state.
#[must_use]
pub fn reconcile(cached: ContainerState, observed: ContainerState) -> ContainerState {
    match observed {
        ContainerState::Unknown | ContainerState::Configured => cached,
        other => other,
    }
}

impl Container {
    /// Persists the current runtime state through the state store.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the record cannot be written.
    pub fn save(&self, services: &Services) -> Result<()> {
        services
            .state
            .save_container(&self.config.id, &self.state)
            .map_err(|e| CradleError::Persistence {
                id: self.config.id.to_string(),
                message: format!("failed to save container state: {e}"),
            })
    }

    /// Brings the handle up to date with the state store and the process
    /// runtime.
    ///
    /// First reloads the persisted record, picking up changes made by
    /// other processes; a missing record invalidates the handle. Then,
    /// for containers the runtime could know about, queries the live
    /// process status and persists the merged state if it changed.
    ///
    /// Must be called with the container lock held.
    ///
    /// # Errors
    ///
    /// Returns `Removed` when the container was deleted externally, and
    /// propagates state-store and runtime query failures.
    pub fn sync_container(&mut self, services: &Services) -> Result<()> {
        match services
            .state
            .update_container(&self.config.id)
            .map_err(|e| CradleError::Persistence {
                id: self.config.id.to_string(),
                message: format!("failed to reload container state: {e}"),
            })? {
            Some(state) => self.state = state,
            None => self.valid = false,
        }

        // The runtime has no record of a container that was never
        // created there, so skip the query for those.
        if self.valid
            && !matches!(
                self.state.state,
                ContainerState::Unknown | ContainerState::Configured
            )
        {
            let old_state = self.state.state;
            let status = services.oci.container_status(&self.config.id)?;
            self.state.state = reconcile(old_state, status.state);
            if !matches!(
                status.state,
                ContainerState::Unknown | ContainerState::Configured
            ) {
                self.state.pid = status.pid;
                self.state.exit_code = status.exit_code;
                self.state.finished_at = status.finished_at;
            }
            if self.state.state != old_state {
                self.save(services)?;
            }
        }

        if !self.valid {
            return Err(CradleError::Removed {
                id: self.config.id.to_string(),
            });
        }
        Ok(())
    }

    /// Rebuilds the parts of the container's state that do not survive a
    /// host reboot. The run directory was lost with the reboot, so a new
    /// one is fetched from the storage engine and persisted.
    ///
    /// # Errors
    ///
    /// Returns `Removed` if the handle is invalid, and propagates
    /// storage and persistence failures.
    pub fn refresh(&mut self, services: &Services) -> Result<()> {
        self.with_lock(|ctr| ctr.refresh_locked(services))
    }

    fn refresh_locked(&mut self, services: &Services) -> Result<()> {
        if !self.valid {
            return Err(CradleError::Removed {
                id: self.config.id.to_string(),
            });
        }

        let run_dir = services
            .storage
            .run_dir(&self.config.id)
            .map_err(|e| crate::container::storage_err(
                "retrieving the run directory",
                &self.config.id,
                &e,
            ))?;
        self.state.run_dir = run_dir;

        self.save(services)?;
        tracing::debug!(
            id = %self.config.id,
            run_dir = %self.state.run_dir.display(),
            "container state refreshed after reboot"
        );
        Ok(())
    }

    /// Whether the container is currently stopped, after a full sync.
    ///
    /// Safe to call both inside and outside a locked section; the lock is
    /// taken only when not already held by this handle.
    ///
    /// # Errors
    ///
    /// Propagates sync failures.
    pub fn is_stopped(&mut self, services: &Services) -> Result<bool> {
        if self.locked {
            self.sync_container(services)?;
            Ok(self.state.state == ContainerState::Stopped)
        } else {
            self.with_lock(|ctr| {
                ctr.sync_container(services)?;
                Ok(ctr.state.state == ContainerState::Stopped)
            })
        }
    }
}
