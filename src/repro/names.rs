//! Lookups by subsystem and sysname
//!
//! sysfs stores a '/' inside a device name as '!', and libudev reports the
//! sysname with '!' turned back into '/'. Whether a lookup accepts that
//! reported name is what these cases check.

use super::Transcript;
use crate::core::config::{NameLookup, SubsystemSysnameInput, SysnameRoundTripInput};
use crate::core::error::Result;
use crate::device::traits::{or_null, DeviceHandle, DeviceTree};
use log::warn;

/// Suggest a spelling that may succeed where `lookup` failed
pub fn lookup_hint(lookup: &NameLookup) -> Option<String> {
    let prefix = format!("{}/", lookup.subsystem);
    if let Some(stripped) = lookup.sysname.strip_prefix(&prefix) {
        return Some(format!(
            "'{}' carries the subsystem as prefix, as udevadm prints it; try '{}'",
            lookup.sysname, stripped
        ));
    }
    if lookup.sysname.contains('/') {
        return Some(format!(
            "'{}' contains '/' and its prefix is not the subsystem '{}'; sysfs names it '{}'",
            lookup.sysname,
            lookup.subsystem,
            lookup.sysname.replace('/', "!")
        ));
    }
    None
}

/// Look up every configured pair; the first miss decides the status
pub fn run_lookups<T: DeviceTree>(
    tree: &T,
    input: &SubsystemSysnameInput,
    out: &mut Transcript,
) -> Result<i32> {
    let total = input.lookups.len();

    for (index, lookup) in input.lookups.iter().enumerate() {
        match tree.device_from_subsystem_sysname(&lookup.subsystem, &lookup.sysname)? {
            Some(device) => {
                out.line(format!(
                    "{} {}: {}",
                    lookup.subsystem,
                    lookup.sysname,
                    or_null(device.syspath().as_deref())
                ));
            }
            None => {
                warn!("No device {} in subsystem {}", lookup.sysname, lookup.subsystem);
                out.line(format!("{} {}: (null)", lookup.subsystem, lookup.sysname));
                if let Some(hint) = lookup_hint(lookup) {
                    out.note(hint);
                }
                return Ok((total - index) as i32);
            }
        }
    }

    Ok(0)
}

/// syspath -> (subsystem, sysname) -> device
pub fn run_round_trip<T: DeviceTree>(
    tree: &T,
    input: &SysnameRoundTripInput,
    out: &mut Transcript,
) -> Result<i32> {
    let Some(device) = tree.device_from_syspath(&input.syspath)? else {
        out.note(format!("no device at {}", input.syspath));
        return Ok(1);
    };

    let Some(sysname) = device.sysname() else {
        return Ok(2);
    };
    out.line(sysname.clone());

    let Some(subsystem) = device.subsystem() else {
        return Ok(3);
    };
    out.line(subsystem.clone());

    match tree.device_from_subsystem_sysname(&subsystem, &sysname)? {
        Some(found) => {
            let found_path = found.syspath();
            if found_path.as_deref() != Some(input.syspath.as_str()) {
                out.note(format!(
                    "lookup returned a different device: {}",
                    or_null(found_path.as_deref())
                ));
            }
            Ok(0)
        }
        None => {
            if let Some(hint) = lookup_hint(&NameLookup::new(&subsystem, &sysname)) {
                out.note(hint);
            }
            Ok(4)
        }
    }
}
