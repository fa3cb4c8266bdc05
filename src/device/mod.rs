//! Device tree access module
//!
//! This module provides access to the host's device tree through libudev,
//! loaded at runtime.
//!
//! # Submodules
//!
//! - `libudev` - Runtime loading of libudev and its C entry points
//! - `udev` - Safe context, device and enumerator handles
//! - `traits` - Abstraction traits for testability
//!
//! # Architecture
//!
//! Reproducers are written against `DeviceTree` / `DeviceHandle`:
//!
//! - `Udev` / `UdevDevice` - the real library
//! - `testdb::MockDeviceTree` - an in-memory tree with switchable library quirks
//!
//! Both implement the same traits, so every reproducer runs unchanged
//! against either.

pub mod libudev;
pub mod traits;
pub mod udev;

// Re-export commonly used types for convenience
pub use libudev::{LibUdev, DEFAULT_CANDIDATES};
pub use traits::{DeviceHandle, DeviceTree, EnumerationFilter, ListEntry, Match};
pub use udev::{Udev, UdevDevice};
