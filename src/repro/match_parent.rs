//! Enumeration restricted to the subtree of one parent device

use super::Transcript;
use crate::core::config::MatchParentInput;
use crate::core::error::Result;
use crate::device::traits::{DeviceTree, EnumerationFilter};
use log::warn;

pub fn run<T: DeviceTree>(
    tree: &T,
    input: &MatchParentInput,
    out: &mut Transcript,
) -> Result<i32> {
    if tree.device_from_syspath(&input.parent_syspath)?.is_none() {
        warn!("No device at {}", input.parent_syspath);
        out.note(format!(
            "no device at {}; the parent filter is dropped",
            input.parent_syspath
        ));
    }

    let filter = EnumerationFilter::new().match_parent(&input.parent_syspath);
    let entries = tree.scan(&filter)?;

    for entry in &entries {
        out.line(entry.name.clone());
    }

    let outside = entries
        .iter()
        .filter(|e| !e.name.starts_with(&input.parent_syspath))
        .count();
    out.note(format!("{} devices listed", entries.len()));
    if outside > 0 {
        out.note(format!(
            "{} of them are outside {}",
            outside, input.parent_syspath
        ));
    }

    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testdb::{MockDevice, MockDeviceTree};

    fn memory_tree() -> MockDeviceTree {
        MockDeviceTree::new()
            .with_device(MockDevice::new("/sys/devices/system/memory").subsystem("memory"))
            .with_device(MockDevice::new("/sys/devices/system/memory/memory0").subsystem("memory"))
            .with_device(MockDevice::new("/sys/devices/system/memory/memory1").subsystem("memory"))
            .with_device(MockDevice::new("/sys/devices/system/cpu/cpu0").subsystem("cpu"))
    }

    #[test]
    fn test_lists_parent_and_children() {
        let mut out = Transcript::new();
        let status = run(&memory_tree(), &MatchParentInput::default(), &mut out).unwrap();

        assert_eq!(status, 0);
        assert_eq!(
            out.lines(),
            &[
                "/sys/devices/system/memory".to_string(),
                "/sys/devices/system/memory/memory0".to_string(),
                "/sys/devices/system/memory/memory1".to_string(),
            ]
        );
        assert!(out.notes().iter().any(|n| n == "3 devices listed"));
    }

    #[test]
    fn test_missing_parent_lists_everything() {
        let input = MatchParentInput {
            parent_syspath: "/sys/devices/system/nothing".to_string(),
        };
        let mut out = Transcript::new();
        let status = run(&memory_tree(), &input, &mut out).unwrap();

        assert_eq!(status, 0);
        assert_eq!(out.lines().len(), 4);
        assert!(out.notes()[0].contains("parent filter is dropped"));
        assert!(out.notes().iter().any(|n| n.contains("4 of them are outside")));
    }

    #[test]
    fn test_scan_failure_propagates_status() {
        let tree = memory_tree().failing_scan(-12);
        let mut out = Transcript::new();
        let err = run(&tree, &MatchParentInput::default(), &mut out).unwrap_err();
        assert_eq!(err.status_code(), Some(-12));
    }
}
