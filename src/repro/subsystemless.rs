//! Whether an unfiltered scan lists a device that has no subsystem

use super::Transcript;
use crate::core::config::SubsystemlessEnumerationInput;
use crate::core::error::Result;
use crate::device::traits::{DeviceHandle, DeviceTree};
use log::{info, warn};

/// How the device under test was picked
enum Target<D> {
    Found(D),
    /// Status to exit with
    Missing(i32),
}

fn pick_target<T: DeviceTree>(
    tree: &T,
    input: &SubsystemlessEnumerationInput,
    out: &mut Transcript,
) -> Result<Target<T::Device>> {
    if let Some(lookup) = &input.ancestor_of {
        let Some(child) = tree.device_from_subsystem_sysname(&lookup.subsystem, &lookup.sysname)?
        else {
            out.note(format!(
                "no device {} in subsystem {}",
                lookup.sysname, lookup.subsystem
            ));
            return Ok(Target::Missing(3));
        };
        return Ok(
            match child.ancestors().into_iter().find(|a| a.subsystem().is_none()) {
                Some(ancestor) => Target::Found(ancestor),
                None => {
                    out.note(format!(
                        "every ancestor of {} has a subsystem",
                        lookup.sysname
                    ));
                    Target::Missing(5)
                }
            },
        );
    }

    let Some(syspath) = &input.syspath else {
        warn!("Neither syspath nor ancestor_of is configured");
        out.note("no device configured");
        return Ok(Target::Missing(3));
    };
    match tree.device_from_syspath(syspath)? {
        Some(device) => Ok(Target::Found(device)),
        None => {
            out.note(format!("no device at {}", syspath));
            Ok(Target::Missing(3))
        }
    }
}

pub fn run<T: DeviceTree>(
    tree: &T,
    input: &SubsystemlessEnumerationInput,
    out: &mut Transcript,
) -> Result<i32> {
    let device = match pick_target(tree, input, out)? {
        Target::Found(device) => device,
        Target::Missing(status) => return Ok(status),
    };

    let Some(syspath) = device.syspath() else {
        return Ok(4);
    };
    out.line(syspath.clone());

    if let Some(subsystem) = device.subsystem() {
        out.note(format!(
            "{} has subsystem {}, so it is expected to be listed",
            syspath, subsystem
        ));
    }

    let entries = tree.scan_all()?;
    let listed = entries.iter().any(|e| e.name == syspath);
    info!("{} of {} devices match {}", listed as usize, entries.len(), syspath);
    out.line(format!("listed: {}", listed));

    Ok(if listed { 2 } else { 0 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::NameLookup;
    use crate::testdb::{MockDevice, MockDeviceTree};

    const ATA1: &str = "/sys/devices/pci0000:00/0000:00:1f.2/ata1";
    const SDA: &str = "/sys/devices/pci0000:00/0000:00:1f.2/ata1/host0/target0:0:0/0:0:0:0/block/sda";

    fn ata_tree() -> MockDeviceTree {
        MockDeviceTree::new()
            .with_device(MockDevice::new("/sys/devices/pci0000:00/0000:00:1f.2").subsystem("pci"))
            .with_device(MockDevice::new(ATA1))
            .with_device(MockDevice::new(format!("{}/host0", ATA1)).subsystem("scsi"))
            .with_device(MockDevice::new(SDA).subsystem("block"))
    }

    #[test]
    fn test_subsystemless_device_is_not_listed() {
        let mut out = Transcript::new();
        let status = run(&ata_tree(), &SubsystemlessEnumerationInput::default(), &mut out).unwrap();
        assert_eq!(status, 0);
        assert_eq!(out.lines(), &[ATA1.to_string(), "listed: false".to_string()]);
    }

    #[test]
    fn test_listing_subsystemless_devices_is_status_two() {
        let tree = ata_tree().listing_subsystemless();
        let mut out = Transcript::new();
        let status = run(&tree, &SubsystemlessEnumerationInput::default(), &mut out).unwrap();
        assert_eq!(status, 2);
        assert_eq!(out.lines()[1], "listed: true");
    }

    #[test]
    fn test_ancestor_search_wins_over_syspath() {
        let input = SubsystemlessEnumerationInput {
            syspath: Some("/sys/devices/nowhere".to_string()),
            ancestor_of: Some(NameLookup::new("block", "sda")),
        };
        let mut out = Transcript::new();
        assert_eq!(run(&ata_tree(), &input, &mut out).unwrap(), 0);
        assert_eq!(out.lines()[0], ATA1);
    }

    #[test]
    fn test_no_subsystemless_ancestor() {
        let tree = MockDeviceTree::new()
            .with_device(MockDevice::new("/sys/devices/virtual").subsystem("virtual"))
            .with_device(MockDevice::new("/sys/devices/virtual/net").subsystem("net_class"))
            .with_device(MockDevice::new("/sys/devices/virtual/net/lo").subsystem("net"));
        let input = SubsystemlessEnumerationInput {
            syspath: None,
            ancestor_of: Some(NameLookup::new("net", "lo")),
        };
        let mut out = Transcript::new();
        assert_eq!(run(&tree, &input, &mut out).unwrap(), 5);
        assert!(out.lines().is_empty());
    }

    #[test]
    fn test_missing_device_and_nothing_configured() {
        let mut out = Transcript::new();
        let input = SubsystemlessEnumerationInput {
            syspath: Some("/sys/devices/nowhere".to_string()),
            ancestor_of: None,
        };
        assert_eq!(run(&ata_tree(), &input, &mut out).unwrap(), 3);

        let input = SubsystemlessEnumerationInput {
            syspath: None,
            ancestor_of: None,
        };
        assert_eq!(run(&ata_tree(), &input, &mut out).unwrap(), 3);

        let input = SubsystemlessEnumerationInput {
            syspath: None,
            ancestor_of: Some(NameLookup::new("block", "sdz")),
        };
        assert_eq!(run(&ata_tree(), &input, &mut out).unwrap(), 3);
    }

    #[test]
    fn test_device_with_subsystem_is_listed_and_noted() {
        let input = SubsystemlessEnumerationInput {
            syspath: Some(SDA.to_string()),
            ancestor_of: None,
        };
        let mut out = Transcript::new();
        assert_eq!(run(&ata_tree(), &input, &mut out).unwrap(), 2);
        assert!(out.notes()[0].contains("has subsystem block"));
    }
}
