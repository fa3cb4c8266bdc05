//! Runtime binding to `libudev.so`
//!
//! The library is opened with `libloading` instead of being linked, so the
//! binary builds without libudev headers and a host without libudev gets a
//! clean `LibraryNotFound` error instead of a loader failure.
//!
//! Only the entry points the reproducers call are resolved. All of them are
//! plain C functions, copied out of the `Library` as function pointers; the
//! `Library` is stored alongside them so the pointers stay valid for the
//! lifetime of [`LibUdev`].

#![allow(non_camel_case_types)]

use crate::core::error::{ReproError, Result};
use libloading::Library;
use log::{debug, trace, warn};
use std::ffi::CStr;
use std::os::raw::{c_char, c_int};

/// Default shared object names, tried in order
pub const DEFAULT_CANDIDATES: &[&str] = &["libudev.so.1", "libudev.so.0", "libudev.so"];

/// Opaque `struct udev`
#[repr(C)]
pub struct udev {
    _opaque: [u8; 0],
}

/// Opaque `struct udev_device`
#[repr(C)]
pub struct udev_device {
    _opaque: [u8; 0],
}

/// Opaque `struct udev_enumerate`
#[repr(C)]
pub struct udev_enumerate {
    _opaque: [u8; 0],
}

/// Opaque `struct udev_list_entry`
#[repr(C)]
pub struct udev_list_entry {
    _opaque: [u8; 0],
}

/// Resolved libudev entry points
pub struct LibUdev {
    /// Name the library was loaded under
    pub name: String,

    // context
    pub udev_new: unsafe extern "C" fn() -> *mut udev,
    pub udev_unref: unsafe extern "C" fn(*mut udev) -> *mut udev,

    // enumeration
    pub udev_enumerate_new: unsafe extern "C" fn(*mut udev) -> *mut udev_enumerate,
    pub udev_enumerate_unref: unsafe extern "C" fn(*mut udev_enumerate) -> *mut udev_enumerate,
    pub udev_enumerate_add_match_subsystem:
        unsafe extern "C" fn(*mut udev_enumerate, *const c_char) -> c_int,
    pub udev_enumerate_add_nomatch_subsystem:
        unsafe extern "C" fn(*mut udev_enumerate, *const c_char) -> c_int,
    pub udev_enumerate_add_match_sysattr:
        unsafe extern "C" fn(*mut udev_enumerate, *const c_char, *const c_char) -> c_int,
    pub udev_enumerate_add_nomatch_sysattr:
        unsafe extern "C" fn(*mut udev_enumerate, *const c_char, *const c_char) -> c_int,
    pub udev_enumerate_add_match_parent:
        unsafe extern "C" fn(*mut udev_enumerate, *mut udev_device) -> c_int,
    pub udev_enumerate_scan_devices: unsafe extern "C" fn(*mut udev_enumerate) -> c_int,
    pub udev_enumerate_get_list_entry:
        unsafe extern "C" fn(*mut udev_enumerate) -> *mut udev_list_entry,

    // list entries
    pub udev_list_entry_get_next: unsafe extern "C" fn(*mut udev_list_entry) -> *mut udev_list_entry,
    pub udev_list_entry_get_name: unsafe extern "C" fn(*mut udev_list_entry) -> *const c_char,
    pub udev_list_entry_get_value: unsafe extern "C" fn(*mut udev_list_entry) -> *const c_char,
    pub udev_list_entry_get_by_name:
        unsafe extern "C" fn(*mut udev_list_entry, *const c_char) -> *mut udev_list_entry,

    // devices
    pub udev_device_new_from_syspath:
        unsafe extern "C" fn(*mut udev, *const c_char) -> *mut udev_device,
    pub udev_device_new_from_subsystem_sysname:
        unsafe extern "C" fn(*mut udev, *const c_char, *const c_char) -> *mut udev_device,
    pub udev_device_ref: unsafe extern "C" fn(*mut udev_device) -> *mut udev_device,
    pub udev_device_unref: unsafe extern "C" fn(*mut udev_device) -> *mut udev_device,
    pub udev_device_get_parent: unsafe extern "C" fn(*mut udev_device) -> *mut udev_device,
    pub udev_device_get_syspath: unsafe extern "C" fn(*mut udev_device) -> *const c_char,
    pub udev_device_get_sysname: unsafe extern "C" fn(*mut udev_device) -> *const c_char,
    pub udev_device_get_subsystem: unsafe extern "C" fn(*mut udev_device) -> *const c_char,
    pub udev_device_get_sysattr_value:
        unsafe extern "C" fn(*mut udev_device, *const c_char) -> *const c_char,
    pub udev_device_get_sysattr_list_entry:
        unsafe extern "C" fn(*mut udev_device) -> *mut udev_list_entry,

    _library: Library,
}

impl LibUdev {
    /// Load the first candidate that opens and has every entry point
    ///
    /// A candidate lacking a symbol is skipped. If no candidate loads at all
    /// the error is `LibraryNotFound`; if the last one that loaded lacked a
    /// symbol, that `MissingSymbol` is returned instead.
    pub fn load<S: AsRef<str>>(candidates: &[S]) -> Result<Self> {
        let mut last_error = String::from("no candidates given");
        let mut symbol_error = None;

        for candidate in candidates {
            let name = candidate.as_ref();
            // SAFETY: loading libudev runs no initialisers with preconditions.
            match unsafe { Library::new(name) } {
                Ok(library) => {
                    debug!("Loaded {}", name);
                    match Self::from_library(library, name) {
                        Ok(lib) => return Ok(lib),
                        Err(e) => {
                            warn!("Skipping {}: {}", name, e);
                            symbol_error = Some(e);
                        }
                    }
                }
                Err(e) => {
                    debug!("Could not load {}: {}", name, e);
                    last_error = e.to_string();
                }
            }
        }

        if let Some(e) = symbol_error {
            return Err(e);
        }

        Err(ReproError::LibraryNotFound {
            tried: candidates
                .iter()
                .map(|c| c.as_ref())
                .collect::<Vec<_>>()
                .join(", "),
            reason: last_error,
        })
    }

    fn from_library(library: Library, name: &str) -> Result<Self> {
        // SAFETY: every type below matches the prototype in libudev.h.
        unsafe {
            Ok(Self {
                name: name.to_string(),
                udev_new: symbol(&library, "udev_new")?,
                udev_unref: symbol(&library, "udev_unref")?,
                udev_enumerate_new: symbol(&library, "udev_enumerate_new")?,
                udev_enumerate_unref: symbol(&library, "udev_enumerate_unref")?,
                udev_enumerate_add_match_subsystem: symbol(
                    &library,
                    "udev_enumerate_add_match_subsystem",
                )?,
                udev_enumerate_add_nomatch_subsystem: symbol(
                    &library,
                    "udev_enumerate_add_nomatch_subsystem",
                )?,
                udev_enumerate_add_match_sysattr: symbol(
                    &library,
                    "udev_enumerate_add_match_sysattr",
                )?,
                udev_enumerate_add_nomatch_sysattr: symbol(
                    &library,
                    "udev_enumerate_add_nomatch_sysattr",
                )?,
                udev_enumerate_add_match_parent: symbol(
                    &library,
                    "udev_enumerate_add_match_parent",
                )?,
                udev_enumerate_scan_devices: symbol(&library, "udev_enumerate_scan_devices")?,
                udev_enumerate_get_list_entry: symbol(&library, "udev_enumerate_get_list_entry")?,
                udev_list_entry_get_next: symbol(&library, "udev_list_entry_get_next")?,
                udev_list_entry_get_name: symbol(&library, "udev_list_entry_get_name")?,
                udev_list_entry_get_value: symbol(&library, "udev_list_entry_get_value")?,
                udev_list_entry_get_by_name: symbol(&library, "udev_list_entry_get_by_name")?,
                udev_device_new_from_syspath: symbol(&library, "udev_device_new_from_syspath")?,
                udev_device_new_from_subsystem_sysname: symbol(
                    &library,
                    "udev_device_new_from_subsystem_sysname",
                )?,
                udev_device_ref: symbol(&library, "udev_device_ref")?,
                udev_device_unref: symbol(&library, "udev_device_unref")?,
                udev_device_get_parent: symbol(&library, "udev_device_get_parent")?,
                udev_device_get_syspath: symbol(&library, "udev_device_get_syspath")?,
                udev_device_get_sysname: symbol(&library, "udev_device_get_sysname")?,
                udev_device_get_subsystem: symbol(&library, "udev_device_get_subsystem")?,
                udev_device_get_sysattr_value: symbol(&library, "udev_device_get_sysattr_value")?,
                udev_device_get_sysattr_list_entry: symbol(
                    &library,
                    "udev_device_get_sysattr_list_entry",
                )?,
                _library: library,
            })
        }
    }
}

/// Resolve one symbol and copy the function pointer out
///
/// # Safety
/// `T` must be the exact function pointer type of the C symbol.
unsafe fn symbol<T: Copy>(library: &Library, name: &str) -> Result<T> {
    trace!("Resolving {}", name);
    let resolved = library
        .get::<T>(name.as_bytes())
        .map_err(|e| ReproError::MissingSymbol {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
    Ok(*resolved)
}

/// Copy a C string returned by libudev into an owned `String`
///
/// # Safety
/// `ptr` must be NULL or point to a NUL-terminated string that stays valid
/// for the duration of the call.
pub unsafe fn owned_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        None
    } else {
        Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
    }
}

/// Copy a C string returned by libudev into raw bytes (without the NUL)
///
/// # Safety
/// Same contract as [`owned_string`].
pub unsafe fn owned_bytes(ptr: *const c_char) -> Option<Vec<u8>> {
    if ptr.is_null() {
        None
    } else {
        Some(CStr::from_ptr(ptr).to_bytes().to_vec())
    }
}
