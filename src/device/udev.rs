//! Safe handles over the loaded libudev
//!
//! `Udev` owns the `struct udev *` context, `UdevDevice` owns one device
//! reference, and scans build a short-lived enumerator that is released on
//! drop. Devices hold the context through an `Rc`, so no device can outlive
//! the context it came from.

use super::libudev::{
    owned_bytes, owned_string, udev, udev_device, udev_enumerate, udev_list_entry, LibUdev,
};
use super::traits::{DeviceHandle, DeviceTree, EnumerationFilter, ListEntry, Match};
use crate::core::error::{check_status, ReproError, Result};
use log::{debug, trace, warn};
use std::ffi::CString;
use std::fmt;
use std::os::raw::c_char;
use std::ptr::{self, NonNull};
use std::rc::Rc;

struct ContextInner {
    lib: LibUdev,
    raw: NonNull<udev>,
}

impl Drop for ContextInner {
    fn drop(&mut self) {
        // SAFETY: `raw` came from udev_new and is released exactly once.
        unsafe {
            (self.lib.udev_unref)(self.raw.as_ptr());
        }
    }
}

/// A libudev context (`udev_new`)
#[derive(Clone)]
pub struct Udev {
    inner: Rc<ContextInner>,
}

impl Udev {
    /// Create a context on an already loaded library
    pub fn new(lib: LibUdev) -> Result<Self> {
        // SAFETY: udev_new takes no arguments.
        let raw = unsafe { (lib.udev_new)() };
        let raw = NonNull::new(raw).ok_or(ReproError::ContextUnavailable)?;
        debug!("Created udev context from {}", lib.name);
        Ok(Self {
            inner: Rc::new(ContextInner { lib, raw }),
        })
    }

    /// Load the library from `candidates` and create a context
    pub fn open<S: AsRef<str>>(candidates: &[S]) -> Result<Self> {
        Self::new(LibUdev::load(candidates)?)
    }

    /// Name of the shared object in use
    pub fn library_name(&self) -> &str {
        &self.inner.lib.name
    }

    fn lib(&self) -> &LibUdev {
        &self.inner.lib
    }

    fn wrap_device(&self, raw: *mut udev_device) -> Option<UdevDevice> {
        NonNull::new(raw).map(|raw| UdevDevice {
            context: Rc::clone(&self.inner),
            raw,
        })
    }

    fn apply(&self, enumerator: &Enumerator<'_>, clause: &Match) -> Result<()> {
        let lib = self.lib();
        let raw = enumerator.raw;
        debug!("Adding filter: {}", clause);

        // SAFETY: `raw` is a live enumerator and every CString outlives its call.
        let (call, code) = unsafe {
            match clause {
                Match::Subsystem(subsystem) => {
                    let subsystem = c_string("udev_enumerate_add_match_subsystem", subsystem)?;
                    (
                        "udev_enumerate_add_match_subsystem",
                        (lib.udev_enumerate_add_match_subsystem)(raw, subsystem.as_ptr()),
                    )
                }
                Match::NoSubsystem(subsystem) => {
                    let subsystem = c_string("udev_enumerate_add_nomatch_subsystem", subsystem)?;
                    (
                        "udev_enumerate_add_nomatch_subsystem",
                        (lib.udev_enumerate_add_nomatch_subsystem)(raw, subsystem.as_ptr()),
                    )
                }
                Match::Sysattr { name, value } => {
                    let name = c_string("udev_enumerate_add_match_sysattr", name)?;
                    let value = optional_c_string("udev_enumerate_add_match_sysattr", value)?;
                    (
                        "udev_enumerate_add_match_sysattr",
                        (lib.udev_enumerate_add_match_sysattr)(
                            raw,
                            name.as_ptr(),
                            value.as_ref().map_or(ptr::null(), |v| v.as_ptr()),
                        ),
                    )
                }
                Match::NoSysattr { name, value } => {
                    let name = c_string("udev_enumerate_add_nomatch_sysattr", name)?;
                    let value = optional_c_string("udev_enumerate_add_nomatch_sysattr", value)?;
                    (
                        "udev_enumerate_add_nomatch_sysattr",
                        (lib.udev_enumerate_add_nomatch_sysattr)(
                            raw,
                            name.as_ptr(),
                            value.as_ref().map_or(ptr::null(), |v| v.as_ptr()),
                        ),
                    )
                }
                Match::Parent(syspath) => match self.device_from_syspath(syspath)? {
                    Some(parent) => (
                        "udev_enumerate_add_match_parent",
                        (lib.udev_enumerate_add_match_parent)(raw, parent.raw.as_ptr()),
                    ),
                    None => {
                        // libudev treats a NULL parent as "no constraint"
                        warn!("Parent {} not found, parent filter ignored", syspath);
                        return Ok(());
                    }
                },
            }
        };

        check_status(call, code)?;
        Ok(())
    }
}

impl fmt::Debug for Udev {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Udev")
            .field("library", &self.inner.lib.name)
            .finish()
    }
}

impl DeviceTree for Udev {
    type Device = UdevDevice;

    fn device_from_syspath(&self, syspath: &str) -> Result<Option<UdevDevice>> {
        let path = c_string("udev_device_new_from_syspath", syspath)?;
        // SAFETY: live context, NUL-terminated path.
        let raw = unsafe {
            (self.lib().udev_device_new_from_syspath)(self.inner.raw.as_ptr(), path.as_ptr())
        };
        let device = self.wrap_device(raw);
        trace!("new_from_syspath({}) -> {}", syspath, device.is_some());
        Ok(device)
    }

    fn device_from_subsystem_sysname(
        &self,
        subsystem: &str,
        sysname: &str,
    ) -> Result<Option<UdevDevice>> {
        let c_subsystem = c_string("udev_device_new_from_subsystem_sysname", subsystem)?;
        let c_sysname = c_string("udev_device_new_from_subsystem_sysname", sysname)?;
        // SAFETY: live context, NUL-terminated arguments.
        let raw = unsafe {
            (self.lib().udev_device_new_from_subsystem_sysname)(
                self.inner.raw.as_ptr(),
                c_subsystem.as_ptr(),
                c_sysname.as_ptr(),
            )
        };
        let device = self.wrap_device(raw);
        trace!(
            "new_from_subsystem_sysname({}, {}) -> {}",
            subsystem,
            sysname,
            device.is_some()
        );
        Ok(device)
    }

    fn scan(&self, filter: &EnumerationFilter) -> Result<Vec<ListEntry>> {
        let enumerator = Enumerator::new(self)?;

        for clause in &filter.matches {
            self.apply(&enumerator, clause)?;
        }

        // SAFETY: live enumerator.
        let code = unsafe { (self.lib().udev_enumerate_scan_devices)(enumerator.raw) };
        check_status("udev_enumerate_scan_devices", code)?;

        // SAFETY: the list belongs to the enumerator, which outlives the walk.
        let entries = unsafe {
            walk_list(
                self.lib(),
                (self.lib().udev_enumerate_get_list_entry)(enumerator.raw),
            )
        };
        debug!("Scan returned {} devices", entries.len());
        Ok(entries)
    }
}

/// RAII guard for `struct udev_enumerate`
struct Enumerator<'a> {
    context: &'a Udev,
    raw: *mut udev_enumerate,
}

impl<'a> Enumerator<'a> {
    fn new(context: &'a Udev) -> Result<Self> {
        // SAFETY: live context.
        let raw = unsafe { (context.lib().udev_enumerate_new)(context.inner.raw.as_ptr()) };
        if raw.is_null() {
            // -ENOMEM, the only way udev_enumerate_new fails
            return Err(ReproError::Status {
                call: "udev_enumerate_new",
                code: -12,
            });
        }
        Ok(Self { context, raw })
    }
}

impl Drop for Enumerator<'_> {
    fn drop(&mut self) {
        // SAFETY: `raw` came from udev_enumerate_new and is released once.
        unsafe {
            (self.context.lib().udev_enumerate_unref)(self.raw);
        }
    }
}

/// One owned `struct udev_device` reference
pub struct UdevDevice {
    context: Rc<ContextInner>,
    raw: NonNull<udev_device>,
}

impl UdevDevice {
    fn lib(&self) -> &LibUdev {
        &self.context.lib
    }

    fn get(&self, accessor: unsafe extern "C" fn(*mut udev_device) -> *const c_char) -> Option<String> {
        // SAFETY: live device; the returned string is owned by it.
        unsafe { owned_string(accessor(self.raw.as_ptr())) }
    }

    fn list(
        &self,
        head: unsafe extern "C" fn(*mut udev_device) -> *mut udev_list_entry,
    ) -> Vec<ListEntry> {
        // SAFETY: the list is owned by the device, which outlives the walk.
        unsafe { walk_list(self.lib(), head(self.raw.as_ptr())) }
    }
}

impl Drop for UdevDevice {
    fn drop(&mut self) {
        // SAFETY: this handle owns exactly one reference.
        unsafe {
            (self.context.lib.udev_device_unref)(self.raw.as_ptr());
        }
    }
}

impl fmt::Debug for UdevDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UdevDevice({:?})", self.syspath())
    }
}

impl DeviceHandle for UdevDevice {
    fn syspath(&self) -> Option<String> {
        self.get(self.lib().udev_device_get_syspath)
    }

    fn sysname(&self) -> Option<String> {
        self.get(self.lib().udev_device_get_sysname)
    }

    fn subsystem(&self) -> Option<String> {
        self.get(self.lib().udev_device_get_subsystem)
    }

    fn parent(&self) -> Option<Self> {
        let lib = self.lib();
        // SAFETY: get_parent returns a borrowed pointer; taking a reference
        // makes it ours to unref.
        let raw = unsafe {
            let parent = (lib.udev_device_get_parent)(self.raw.as_ptr());
            if parent.is_null() {
                return None;
            }
            (lib.udev_device_ref)(parent)
        };
        NonNull::new(raw).map(|raw| UdevDevice {
            context: Rc::clone(&self.context),
            raw,
        })
    }

    fn sysattr_value(&self, name: &str) -> Result<Option<Vec<u8>>> {
        let c_name = c_string("udev_device_get_sysattr_value", name)?;
        // SAFETY: live device, NUL-terminated name.
        Ok(unsafe {
            owned_bytes((self.lib().udev_device_get_sysattr_value)(
                self.raw.as_ptr(),
                c_name.as_ptr(),
            ))
        })
    }

    fn sysattr_entries(&self) -> Vec<ListEntry> {
        self.list(self.lib().udev_device_get_sysattr_list_entry)
    }

    fn sysattr_entry_by_name(&self, name: &str) -> Result<Option<ListEntry>> {
        let c_name = c_string("udev_list_entry_get_by_name", name)?;
        let lib = self.lib();
        // SAFETY: the list head and the found entry are owned by the device.
        unsafe {
            let head = (lib.udev_device_get_sysattr_list_entry)(self.raw.as_ptr());
            if head.is_null() {
                return Ok(None);
            }
            let found = (lib.udev_list_entry_get_by_name)(head, c_name.as_ptr());
            if found.is_null() {
                return Ok(None);
            }
            Ok(Some(ListEntry {
                name: owned_string((lib.udev_list_entry_get_name)(found)).unwrap_or_default(),
                value: owned_string((lib.udev_list_entry_get_value)(found)),
            }))
        }
    }
}

/// Walk a libudev list from `entry` to its end
///
/// # Safety
/// `entry` must be NULL or the head of a list that stays alive for the walk.
unsafe fn walk_list(lib: &LibUdev, mut entry: *mut udev_list_entry) -> Vec<ListEntry> {
    let mut entries = Vec::new();
    while !entry.is_null() {
        entries.push(ListEntry {
            name: owned_string((lib.udev_list_entry_get_name)(entry)).unwrap_or_default(),
            value: owned_string((lib.udev_list_entry_get_value)(entry)),
        });
        entry = (lib.udev_list_entry_get_next)(entry);
    }
    entries
}

fn c_string(call: &'static str, value: &str) -> Result<CString> {
    CString::new(value).map_err(|e| ReproError::InvalidArgument {
        call,
        message: e.to_string(),
    })
}

fn optional_c_string(call: &'static str, value: &Option<String>) -> Result<Option<CString>> {
    value.as_deref().map(|v| c_string(call, v)).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::libudev::DEFAULT_CANDIDATES;

    fn host_udev() -> Option<Udev> {
        match Udev::open(DEFAULT_CANDIDATES) {
            Ok(udev) => Some(udev),
            Err(e) => {
                eprintln!("skipping, libudev unavailable: {}", e);
                None
            }
        }
    }

    #[test]
    fn test_c_string_rejects_interior_nul() {
        let err = c_string("udev_device_new_from_syspath", "/sys/\0devices").unwrap_err();
        assert!(matches!(
            err,
            ReproError::InvalidArgument {
                call: "udev_device_new_from_syspath",
                ..
            }
        ));
    }

    #[test]
    fn test_optional_c_string() {
        assert!(optional_c_string("x", &None).unwrap().is_none());
        let value = optional_c_string("x", &Some("PNP0A08".to_string())).unwrap();
        assert_eq!(value.unwrap().to_str().unwrap(), "PNP0A08");
    }

    #[test]
    fn test_missing_syspath_is_none() {
        let Some(udev) = host_udev() else { return };
        let device = udev
            .device_from_syspath("/sys/devices/definitely-not-a-device-0000")
            .unwrap();
        assert!(device.is_none());
    }

    #[test]
    fn test_interior_nul_never_reaches_library() {
        let Some(udev) = host_udev() else { return };
        assert!(udev.device_from_syspath("/sys\0/devices").is_err());
    }

    #[test]
    fn test_filtered_scan_is_subset_of_full_scan() {
        let Some(udev) = host_udev() else { return };
        let Ok(all) = udev.scan_all() else { return };
        let filtered = udev
            .scan(&EnumerationFilter::new().match_subsystem("block"))
            .unwrap_or_default();
        for entry in &filtered {
            assert!(all.iter().any(|e| e.name == entry.name));
        }
    }

    #[test]
    fn test_unknown_parent_leaves_scan_unconstrained() {
        let Some(udev) = host_udev() else { return };
        let Ok(all) = udev.scan_all() else { return };
        let under_missing_parent = udev
            .scan(&EnumerationFilter::new().match_parent("/sys/devices/udev-repro-no-such-parent"))
            .unwrap();
        assert_eq!(under_missing_parent.len(), all.len());
    }
}
