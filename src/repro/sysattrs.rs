//! Four passes over one device's sysattr list
//!
//! 1. values carried by the list entries themselves
//! 2. `udev_device_get_sysattr_value` for every listed name
//! 3. the value of an attribute that does not exist
//! 4. `udev_list_entry_get_by_name` for every listed name, then its value

use super::Transcript;
use crate::core::config::SysattrValuesInput;
use crate::core::error::Result;
use crate::device::traits::{or_null, DeviceHandle, DeviceTree};

pub fn run<T: DeviceTree>(
    tree: &T,
    input: &SysattrValuesInput,
    out: &mut Transcript,
) -> Result<i32> {
    let Some(device) = tree.device_from_syspath(&input.syspath)? else {
        out.note(format!("no device at {}", input.syspath));
        return Ok(1);
    };

    let entries = device.sysattr_entries();

    out.line("udev_list_entry_get_value()");
    out.line("Expected: list entries carry no values.");
    for entry in &entries {
        out.line(format!("{}: {}", entry.name, or_null(entry.value.as_deref())));
    }
    out.blank();

    out.line("udev_device_get_sysattr_value()");
    out.line("Expected: every readable attribute has a value (physical_node included).");
    let mut valueless = Vec::new();
    for entry in &entries {
        let value = device.sysattr_string(&entry.name)?;
        if value.is_none() {
            valueless.push(entry.name.as_str());
        }
        out.line(format!("{}: {}", entry.name, or_null(value.as_deref())));
    }
    out.blank();

    out.line(format!(
        "udev_device_get_sysattr_value({})",
        input.bogus_attribute
    ));
    out.line("Expected: an attribute that does not exist is NULL.");
    let bogus = device.sysattr_string(&input.bogus_attribute)?;
    out.line(format!(
        "{}: {}",
        input.bogus_attribute,
        or_null(bogus.as_deref())
    ));
    out.blank();

    out.line("udev_list_entry_get_by_name()");
    out.line("Expected: same as the first pass.");
    let mut mismatched = Vec::new();
    for entry in &entries {
        let found = device.sysattr_entry_by_name(&entry.name)?;
        let value = found.as_ref().and_then(|f| f.value.clone());
        if found.is_none() || value != entry.value {
            mismatched.push(entry.name.as_str());
        }
        out.line(format!("{}: {}", entry.name, or_null(value.as_deref())));
    }
    out.blank();

    out.note(format!("{} attributes listed", entries.len()));
    if !valueless.is_empty() {
        out.note(format!("listed but without value: {}", valueless.join(", ")));
    }
    if bogus.is_some() {
        out.note(format!(
            "'{}' unexpectedly has a value",
            input.bogus_attribute
        ));
    }
    if !mismatched.is_empty() {
        out.note(format!(
            "get_by_name disagrees with the list for: {}",
            mismatched.join(", ")
        ));
    }

    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testdb::{MockAttribute, MockDevice, MockDeviceTree};

    const ACPI: &str = "/sys/devices/LNXSYSTM:00/LNXSYBUS:00/PNP0A08:00/device:26/device:27";

    fn acpi_tree() -> MockDeviceTree {
        MockDeviceTree::new().with_device(
            MockDevice::new(ACPI)
                .subsystem("acpi")
                .attribute("path", "\\_SB_.PCI0.RP05.PXSX")
                .attribute("hid", "device")
                .attribute_with("physical_node", MockAttribute::unreadable())
                .attribute_with("power", MockAttribute::unreadable()),
        )
    }

    #[test]
    fn test_four_passes_are_printed() {
        let mut out = Transcript::new();
        let status = run(&acpi_tree(), &SysattrValuesInput::default(), &mut out).unwrap();
        assert_eq!(status, 0);

        let lines = out.lines();
        assert_eq!(lines[0], "udev_list_entry_get_value()");
        assert!(lines.contains(&"hid: (null)".to_string()));
        assert!(lines.contains(&"hid: device".to_string()));
        assert!(lines.contains(&"bogus: (null)".to_string()));
        assert!(lines.contains(&"udev_list_entry_get_by_name()".to_string()));
        // two header lines and a blank line around each pass
        assert_eq!(lines.len(), (3 + 4) + (3 + 4) + (3 + 1) + (3 + 4));
    }

    #[test]
    fn test_valueless_attributes_are_noted() {
        let mut out = Transcript::new();
        run(&acpi_tree(), &SysattrValuesInput::default(), &mut out).unwrap();
        assert!(out
            .notes()
            .contains(&"listed but without value: physical_node, power".to_string()));
        assert!(!out.notes().iter().any(|n| n.contains("get_by_name")));
    }

    #[test]
    fn test_list_values_populated() {
        let tree = acpi_tree().with_list_values();
        let mut out = Transcript::new();
        run(&tree, &SysattrValuesInput::default(), &mut out).unwrap();
        assert_eq!(out.lines()[2], "hid: device");
    }

    #[test]
    fn test_missing_device() {
        let mut out = Transcript::new();
        let status = run(&MockDeviceTree::new(), &SysattrValuesInput::default(), &mut out).unwrap();
        assert_eq!(status, 1);
        assert!(out.lines().is_empty());
    }

    #[test]
    fn test_bogus_attribute_with_value_is_noted() {
        let tree = MockDeviceTree::new()
            .with_device(MockDevice::new(ACPI).attribute("bogus", "1"));
        let mut out = Transcript::new();
        run(&tree, &SysattrValuesInput::default(), &mut out).unwrap();
        assert!(out.lines().contains(&"bogus: 1".to_string()));
        assert!(out.notes().iter().any(|n| n.contains("unexpectedly has a value")));
    }
}
