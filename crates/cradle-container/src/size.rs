//! Disk usage accounting over the container's layer chain.

use std::collections::HashSet;

use cradle_common::error::{CradleError, Result};
use cradle_common::types::LayerId;
use thiserror::Error;

use crate::container::{Container, storage_err};
use crate::services::Services;

/// A size walk that failed partway through.
///
/// The bytes accumulated before the failure are still reported, so a
/// caller can show a lower bound instead of nothing.
#[derive(Debug, Error)]
#[error("size accounting failed after {partial_bytes} bytes: {source}")]
pub struct PartialSizeError {
    /// Bytes counted before the walk failed.
    pub partial_bytes: u64,
    /// The failure that stopped the walk.
    #[source]
    pub source: CradleError,
}

impl Container {
    /// Size in bytes of the container's writable top layer, measured as
    /// the diff against its parent.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the layer chain cannot be queried.
    pub fn rw_size(&self, services: &Services) -> Result<u64> {
        let id = &self.config.id;
        let record = services
            .storage
            .container_record(id)
            .map_err(|e| storage_err("looking up the container record", id, &e))?;
        let top = services
            .storage
            .layer(&record.layer_id)
            .map_err(|e| storage_err("looking up the top layer", id, &e))?;
        services
            .storage
            .diff_size(top.parent.as_ref(), &top.id)
            .map_err(|e| storage_err("measuring the top layer diff", id, &e))
    }

    /// Size in bytes of the container's immutable root filesystem: the
    /// sum of the layer diffs below the writable top layer, down to and
    /// including the base layer.
    ///
    /// # Errors
    ///
    /// Returns a [`PartialSizeError`] carrying the bytes counted so far
    /// when the walk fails, including on a malformed chain (a top layer
    /// with no parent, or a parent cycle).
    pub fn root_fs_size(
        &self,
        services: &Services,
    ) -> std::result::Result<u64, PartialSizeError> {
        let id = &self.config.id;
        let at = |partial_bytes: u64| {
            move |source: CradleError| PartialSizeError {
                partial_bytes,
                source,
            }
        };

        let record = services
            .storage
            .container_record(id)
            .map_err(|e| storage_err("looking up the container record", id, &e))
            .map_err(at(0))?;
        let top = services
            .storage
            .layer(&record.layer_id)
            .map_err(|e| storage_err("looking up the top layer", id, &e))
            .map_err(at(0))?;

        // The writable top layer is not part of the root filesystem.
        let first = top.parent.ok_or_else(|| PartialSizeError {
            partial_bytes: 0,
            source: storage_err(
                "walking the layer chain",
                id,
                &CradleError::InvalidArgument {
                    message: format!("top layer {} has no parent layer", top.id),
                },
            ),
        })?;
        let mut layer = services
            .storage
            .layer(&first)
            .map_err(|e| storage_err("looking up an image layer", id, &e))
            .map_err(at(0))?;

        let mut size: u64 = 0;
        let mut seen: HashSet<LayerId> = HashSet::new();
        while let Some(parent) = layer.parent.clone() {
            if !seen.insert(layer.id.clone()) {
                return Err(PartialSizeError {
                    partial_bytes: size,
                    source: storage_err(
                        "walking the layer chain",
                        id,
                        &CradleError::InvalidArgument {
                            message: format!("layer chain cycles at {}", layer.id),
                        },
                    ),
                });
            }
            size += services
                .storage
                .diff_size(Some(&parent), &layer.id)
                .map_err(|e| storage_err("measuring a layer diff", id, &e))
                .map_err(at(size))?;
            layer = services
                .storage
                .layer(&parent)
                .map_err(|e| storage_err("looking up an image layer", id, &e))
                .map_err(at(size))?;
        }

        // The base layer diffs against the empty layer, which the loop
        // condition cannot express.
        size += services
            .storage
            .diff_size(None, &layer.id)
            .map_err(|e| storage_err("measuring the base layer diff", id, &e))
            .map_err(at(size))?;

        Ok(size)
    }
}
