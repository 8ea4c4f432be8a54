//! # cradle-storage
//!
//! The interface boundary to the layered, copy-on-write storage engine,
//! plus the OS mount and security-label utilities the container core
//! needs around it.
//!
//! The storage engine itself (layer diffing, content hashing) lives
//! outside this workspace; this crate only defines how it is consumed.

#![allow(unsafe_code)]
#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod label;
pub mod mount;
pub mod service;
