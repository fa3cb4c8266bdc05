//! Subsystem and sysattr enumeration filters

use super::Transcript;
use crate::core::config::{FilterMode, SubsystemFilterInput, SysattrFilterInput};
use crate::core::error::Result;
use crate::device::traits::{or_null, DeviceHandle, DeviceTree, EnumerationFilter, ListEntry};

fn print_names(entries: &[ListEntry], out: &mut Transcript) {
    for entry in entries {
        out.line(entry.name.clone());
    }
}

pub fn run_subsystem<T: DeviceTree>(
    tree: &T,
    input: &SubsystemFilterInput,
    out: &mut Transcript,
) -> Result<i32> {
    let filter = match input.mode {
        FilterMode::None => EnumerationFilter::new(),
        FilterMode::Match => EnumerationFilter::new().match_subsystem(&input.subsystem),
        FilterMode::NoMatch => EnumerationFilter::new().nomatch_subsystem(&input.subsystem),
    };
    for clause in &filter.matches {
        out.note(format!("filter: {}", clause));
    }

    let entries = tree.scan(&filter)?;
    print_names(&entries, out);
    out.note(format!("{} devices listed", entries.len()));

    Ok(0)
}

pub fn run_sysattr<T: DeviceTree>(
    tree: &T,
    input: &SysattrFilterInput,
    out: &mut Transcript,
) -> Result<i32> {
    let Some(device) = tree.device_from_syspath(&input.syspath)? else {
        out.note(format!("no device at {}", input.syspath));
        return Ok(1);
    };

    let before = device.sysattr_string(&input.attribute)?;
    out.line(format!(
        "{} before: {}",
        input.attribute,
        or_null(before.as_deref())
    ));

    let filter = match input.mode {
        FilterMode::None => EnumerationFilter::new(),
        FilterMode::Match => {
            EnumerationFilter::new().match_sysattr(&input.attribute, before.as_deref())
        }
        FilterMode::NoMatch => {
            EnumerationFilter::new().nomatch_sysattr(&input.attribute, before.as_deref())
        }
    };
    for clause in &filter.matches {
        out.note(format!("filter: {}", clause));
    }

    out.line("Printing devices...");
    let entries = tree.scan(&filter)?;
    print_names(&entries, out);

    let after = device.sysattr_string(&input.attribute)?;
    out.line(format!(
        "{} after: {}",
        input.attribute,
        or_null(after.as_deref())
    ));

    let listed = entries.iter().any(|e| e.name == input.syspath);
    out.note(format!(
        "{} {} listed",
        input.syspath,
        if listed { "is" } else { "is not" }
    ));
    if input.mode == FilterMode::Match && !listed {
        out.note("the device does not match its own attribute value");
    }
    if before != after {
        out.note(format!("{} changed during the scan", input.attribute));
    }

    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ReproError;
    use crate::testdb::{MockDevice, MockDeviceTree};

    const PCI0: &str = "/sys/devices/LNXSYSTM:00/LNXSYBUS:00/PNP0A08:00";

    fn i2c_tree() -> MockDeviceTree {
        MockDeviceTree::new()
            .with_device(MockDevice::new("/sys/devices/pci0000:00/0000:00:02.0/i2c-0").subsystem("i2c"))
            .with_device(MockDevice::new("/sys/devices/pci0000:00/0000:00:02.0/i2c-1").subsystem("i2c"))
            .with_device(MockDevice::new("/sys/devices/virtual/net/lo").subsystem("net"))
    }

    fn acpi_tree() -> MockDeviceTree {
        MockDeviceTree::new()
            .with_device(MockDevice::new(PCI0).subsystem("acpi").attribute("path", "\\_SB_.PCI0"))
            .with_device(
                MockDevice::new(format!("{}/device:00", PCI0))
                    .subsystem("acpi")
                    .attribute("path", "\\_SB_.PCI0.P0P1"),
            )
    }

    fn subsystem_input(mode: FilterMode) -> SubsystemFilterInput {
        SubsystemFilterInput {
            subsystem: "i2c".to_string(),
            mode,
        }
    }

    #[test]
    fn test_subsystem_modes() {
        let tree = i2c_tree();

        let mut out = Transcript::new();
        assert_eq!(run_subsystem(&tree, &subsystem_input(FilterMode::None), &mut out).unwrap(), 0);
        assert_eq!(out.lines().len(), 3);

        let mut out = Transcript::new();
        run_subsystem(&tree, &subsystem_input(FilterMode::Match), &mut out).unwrap();
        assert_eq!(out.lines().len(), 2);
        assert!(out.lines().iter().all(|l| l.contains("i2c-")));
        assert_eq!(out.notes()[0], "filter: subsystem == i2c");

        let mut out = Transcript::new();
        run_subsystem(&tree, &subsystem_input(FilterMode::NoMatch), &mut out).unwrap();
        assert_eq!(out.lines(), &["/sys/devices/virtual/net/lo".to_string()]);
    }

    #[test]
    fn test_subsystem_scan_failure() {
        let tree = i2c_tree().failing_scan(-22);
        let mut out = Transcript::new();
        let err = run_subsystem(&tree, &subsystem_input(FilterMode::Match), &mut out).unwrap_err();
        assert!(matches!(err, ReproError::Status { code: -22, .. }));
    }

    #[test]
    fn test_sysattr_match_lists_device() {
        let mut out = Transcript::new();
        let status = run_sysattr(&acpi_tree(), &SysattrFilterInput::default(), &mut out).unwrap();
        assert_eq!(status, 0);
        assert_eq!(
            out.lines(),
            &[
                "path before: \\_SB_.PCI0".to_string(),
                "Printing devices...".to_string(),
                PCI0.to_string(),
                "path after: \\_SB_.PCI0".to_string(),
            ]
        );
        assert!(out.notes().iter().any(|n| n.ends_with("is listed")));
    }

    #[test]
    fn test_broken_sysattr_match_lists_nothing() {
        let tree = acpi_tree().broken_sysattr_match();
        let mut out = Transcript::new();
        run_sysattr(&tree, &SysattrFilterInput::default(), &mut out).unwrap();
        assert_eq!(out.lines().len(), 3);
        assert!(out
            .notes()
            .contains(&"the device does not match its own attribute value".to_string()));
    }

    #[test]
    fn test_sysattr_nomatch_lists_the_others() {
        let input = SysattrFilterInput {
            mode: FilterMode::NoMatch,
            ..Default::default()
        };
        let mut out = Transcript::new();
        run_sysattr(&acpi_tree(), &input, &mut out).unwrap();
        assert_eq!(out.lines()[2], format!("{}/device:00", PCI0));
        assert!(out.notes().iter().any(|n| n.ends_with("is not listed")));
    }

    #[test]
    fn test_sysattr_missing_device() {
        let mut out = Transcript::new();
        let status = run_sysattr(&MockDeviceTree::new(), &SysattrFilterInput::default(), &mut out)
            .unwrap();
        assert_eq!(status, 1);
        assert!(out.lines().is_empty());
    }
}
