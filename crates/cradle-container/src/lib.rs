//! Container lifecycle core for the Cradle runtime.
//!
//! Manages the on-disk lifecycle of a single container instance:
//! allocating and tearing down its root filesystem, mounting and
//! unmounting it, accounting mutable and immutable storage layers, and
//! keeping the in-memory [`container::Container`] handle consistent with
//! both the durable state store and the external process runtime.
//!
//! Operations on the same container are serialized by a file-backed
//! advisory lock, so exclusion holds across processes as well as threads.

#![allow(unsafe_code)]
#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod container;
pub mod export;
pub mod lock;
pub mod services;
pub mod size;
pub mod storage;
pub mod sync;
