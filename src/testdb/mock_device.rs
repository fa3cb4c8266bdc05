//! Mock device tree for running reproducers without a host libudev
//!
//! Devices are keyed by syspath. A device's parent is the closest registered
//! device whose syspath is a directory prefix of its own, the way sysfs
//! nests them. The library behaviors the reproducers exercise are switches on
//! `MockTreeConfig`; the defaults follow a current libudev.

use crate::core::error::{ReproError, Result};
use crate::device::traits::{DeviceHandle, DeviceTree, EnumerationFilter, ListEntry, Match};
use log::debug;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Library behaviors the mock reproduces
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockTreeConfig {
    /// Sysattr list entries carry the attribute value
    pub list_values: bool,
    /// Devices without a subsystem show up in scans
    pub list_subsystemless: bool,
    /// Subsystem/sysname lookups turn '/' in the sysname into '!'
    pub translate_sysname_slash: bool,
    /// `add_match_sysattr` never matches anything
    pub sysattr_match_broken: bool,
    /// Attribute values end at the first NUL byte
    pub truncate_at_nul: bool,
    /// Status returned by every scan instead of a result
    pub scan_status: Option<i32>,
}

impl Default for MockTreeConfig {
    fn default() -> Self {
        Self {
            list_values: false,
            list_subsystemless: false,
            translate_sysname_slash: true,
            sysattr_match_broken: false,
            truncate_at_nul: true,
            scan_status: None,
        }
    }
}

/// Contents of one sysfs attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockAttribute {
    /// `None` when the library reports no value
    pub content: Option<Vec<u8>>,
}

impl MockAttribute {
    pub fn text(value: &str) -> Self {
        Self {
            content: Some(value.as_bytes().to_vec()),
        }
    }

    pub fn binary(bytes: &[u8]) -> Self {
        Self {
            content: Some(bytes.to_vec()),
        }
    }

    /// Listed, but the library returns NULL for its value
    pub fn unreadable() -> Self {
        Self { content: None }
    }
}

/// A device as registered in the mock tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockDevice {
    pub syspath: String,
    pub subsystem: Option<String>,
    attributes: BTreeMap<String, MockAttribute>,
}

impl MockDevice {
    pub fn new(syspath: impl Into<String>) -> Self {
        Self {
            syspath: syspath.into(),
            subsystem: None,
            attributes: BTreeMap::new(),
        }
    }

    pub fn subsystem(mut self, subsystem: &str) -> Self {
        self.subsystem = Some(subsystem.to_string());
        self
    }

    /// Add a text attribute
    pub fn attribute(self, name: &str, value: &str) -> Self {
        self.attribute_with(name, MockAttribute::text(value))
    }

    pub fn attribute_with(mut self, name: &str, attribute: MockAttribute) -> Self {
        self.attributes.insert(name.to_string(), attribute);
        self
    }

    /// Last path component as sysfs spells it ('!' for '/')
    pub fn kernel_name(&self) -> &str {
        self.syspath.rsplit('/').next().unwrap_or(&self.syspath)
    }
}

#[derive(Debug, Clone, Default)]
struct TreeData {
    devices: BTreeMap<String, MockDevice>,
    config: MockTreeConfig,
}

impl TreeData {
    fn read_attribute(&self, device: &MockDevice, name: &str) -> Option<Vec<u8>> {
        let mut bytes = device.attributes.get(name)?.content.clone()?;
        if self.config.truncate_at_nul {
            if let Some(nul) = bytes.iter().position(|b| *b == 0) {
                bytes.truncate(nul);
            }
        }
        Some(bytes)
    }

    fn read_attribute_string(&self, device: &MockDevice, name: &str) -> Option<String> {
        self.read_attribute(device, name)
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
    }

    fn sysattr_equals(&self, device: &MockDevice, name: &str, value: Option<&str>) -> bool {
        match (self.read_attribute_string(device, name), value) {
            (Some(_), None) => true,
            (Some(actual), Some(wanted)) => actual == wanted,
            (None, _) => false,
        }
    }

    fn matches(&self, device: &MockDevice, clause: &Match) -> bool {
        match clause {
            Match::Subsystem(s) => device.subsystem.as_deref() == Some(s.as_str()),
            Match::NoSubsystem(s) => device.subsystem.as_deref() != Some(s.as_str()),
            Match::Sysattr { name, value } => {
                !self.config.sysattr_match_broken
                    && self.sysattr_equals(device, name, value.as_deref())
            }
            Match::NoSysattr { name, value } => {
                !self.sysattr_equals(device, name, value.as_deref())
            }
            Match::Parent(parent) => {
                // an unknown parent leaves the enumerator unconstrained
                !self.devices.contains_key(parent)
                    || device.syspath == *parent
                    || device.syspath.starts_with(&format!("{}/", parent))
            }
        }
    }
}

/// In-memory `DeviceTree`
#[derive(Debug, Clone, Default)]
pub struct MockDeviceTree {
    data: Rc<TreeData>,
}

impl MockDeviceTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: MockTreeConfig) -> Self {
        Rc::make_mut(&mut self.data).config = config;
        self
    }

    /// Register a device, replacing any device with the same syspath
    pub fn with_device(mut self, device: MockDevice) -> Self {
        Rc::make_mut(&mut self.data)
            .devices
            .insert(device.syspath.clone(), device);
        self
    }

    pub fn with_list_values(self) -> Self {
        self.configure(|c| c.list_values = true)
    }

    pub fn listing_subsystemless(self) -> Self {
        self.configure(|c| c.list_subsystemless = true)
    }

    pub fn without_sysname_translation(self) -> Self {
        self.configure(|c| c.translate_sysname_slash = false)
    }

    pub fn broken_sysattr_match(self) -> Self {
        self.configure(|c| c.sysattr_match_broken = true)
    }

    pub fn without_nul_truncation(self) -> Self {
        self.configure(|c| c.truncate_at_nul = false)
    }

    /// Every scan fails with `status`
    pub fn failing_scan(self, status: i32) -> Self {
        self.configure(|c| c.scan_status = Some(status))
    }

    fn configure(mut self, change: impl FnOnce(&mut MockTreeConfig)) -> Self {
        change(&mut Rc::make_mut(&mut self.data).config);
        self
    }

    pub fn device_count(&self) -> usize {
        self.data.devices.len()
    }

    pub fn device(&self, syspath: &str) -> Option<&MockDevice> {
        self.data.devices.get(syspath)
    }

    fn handle(&self, syspath: &str) -> MockDeviceHandle {
        MockDeviceHandle {
            data: Rc::clone(&self.data),
            syspath: syspath.to_string(),
        }
    }
}

impl DeviceTree for MockDeviceTree {
    type Device = MockDeviceHandle;

    fn device_from_syspath(&self, syspath: &str) -> Result<Option<MockDeviceHandle>> {
        Ok(self
            .data
            .devices
            .contains_key(syspath)
            .then(|| self.handle(syspath)))
    }

    fn device_from_subsystem_sysname(
        &self,
        subsystem: &str,
        sysname: &str,
    ) -> Result<Option<MockDeviceHandle>> {
        let wanted = if self.data.config.translate_sysname_slash {
            sysname.replace('/', "!")
        } else {
            sysname.to_string()
        };
        Ok(self
            .data
            .devices
            .values()
            .find(|d| d.subsystem.as_deref() == Some(subsystem) && d.kernel_name() == wanted)
            .map(|d| self.handle(&d.syspath)))
    }

    fn scan(&self, filter: &EnumerationFilter) -> Result<Vec<ListEntry>> {
        if let Some(code) = self.data.config.scan_status {
            return Err(ReproError::Status {
                call: "udev_enumerate_scan_devices",
                code,
            });
        }

        let entries: Vec<ListEntry> = self
            .data
            .devices
            .values()
            .filter(|d| self.data.config.list_subsystemless || d.subsystem.is_some())
            .filter(|d| filter.matches.iter().all(|m| self.data.matches(d, m)))
            .map(|d| ListEntry::named(&d.syspath))
            .collect();
        debug!("Mock scan with {} clauses: {} devices", filter.matches.len(), entries.len());
        Ok(entries)
    }
}

/// A device handed out by `MockDeviceTree`
#[derive(Debug, Clone)]
pub struct MockDeviceHandle {
    data: Rc<TreeData>,
    syspath: String,
}

impl MockDeviceHandle {
    fn device(&self) -> Option<&MockDevice> {
        self.data.devices.get(&self.syspath)
    }
}

impl DeviceHandle for MockDeviceHandle {
    fn syspath(&self) -> Option<String> {
        Some(self.syspath.clone())
    }

    fn sysname(&self) -> Option<String> {
        self.device().map(|d| d.kernel_name().replace('!', "/"))
    }

    fn subsystem(&self) -> Option<String> {
        self.device()?.subsystem.clone()
    }

    fn parent(&self) -> Option<Self> {
        self.data
            .devices
            .keys()
            .filter(|k| self.syspath.starts_with(&format!("{}/", k)))
            .max_by_key(|k| k.len())
            .map(|k| MockDeviceHandle {
                data: Rc::clone(&self.data),
                syspath: k.clone(),
            })
    }

    fn sysattr_value(&self, name: &str) -> Result<Option<Vec<u8>>> {
        Ok(self
            .device()
            .and_then(|d| self.data.read_attribute(d, name)))
    }

    fn sysattr_entries(&self) -> Vec<ListEntry> {
        let Some(device) = self.device() else {
            return Vec::new();
        };
        device
            .attributes
            .keys()
            .map(|name| ListEntry {
                name: name.clone(),
                value: if self.data.config.list_values {
                    self.data.read_attribute_string(device, name)
                } else {
                    None
                },
            })
            .collect()
    }

    fn sysattr_entry_by_name(&self, name: &str) -> Result<Option<ListEntry>> {
        Ok(self.sysattr_entries().into_iter().find(|e| e.name == name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ILO: &str = "/sys/devices/pci0000:00/0000:00:1c.2/0000:01:00.2/iLO/hpilo!d0ccb0";

    fn sample_tree() -> MockDeviceTree {
        MockDeviceTree::new()
            .with_device(MockDevice::new("/sys/devices/pci0000:00").subsystem("pci"))
            .with_device(MockDevice::new("/sys/devices/pci0000:00/0000:00:1c.2"))
            .with_device(
                MockDevice::new(ILO)
                    .subsystem("iLO")
                    .attribute("dev", "250:0")
                    .attribute_with("vpd", MockAttribute::binary(b"ab\x00cd")),
            )
    }

    #[test]
    fn test_registered_devices() {
        let tree = sample_tree();
        assert_eq!(tree.device_count(), 3);
        assert!(tree.device(ILO).is_some());
        assert!(tree.device_from_syspath("/sys/nothing").unwrap().is_none());
    }

    #[test]
    fn test_sysname_is_reported_with_slash() {
        let tree = sample_tree();
        let device = tree.device_from_syspath(ILO).unwrap().unwrap();
        assert_eq!(device.sysname().as_deref(), Some("hpilo/d0ccb0"));
        assert_eq!(tree.device(ILO).unwrap().kernel_name(), "hpilo!d0ccb0");
    }

    #[test]
    fn test_lookup_translation_switch() {
        let tree = sample_tree();
        assert!(tree
            .device_from_subsystem_sysname("iLO", "hpilo/d0ccb0")
            .unwrap()
            .is_some());
        let strict = tree.without_sysname_translation();
        assert!(strict
            .device_from_subsystem_sysname("iLO", "hpilo/d0ccb0")
            .unwrap()
            .is_none());
        assert!(strict
            .device_from_subsystem_sysname("iLO", "hpilo!d0ccb0")
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_parent_is_closest_registered_prefix() {
        let tree = sample_tree();
        let device = tree.device_from_syspath(ILO).unwrap().unwrap();
        let ancestors: Vec<_> = device
            .ancestors()
            .into_iter()
            .filter_map(|a| a.syspath())
            .collect();
        assert_eq!(
            ancestors,
            vec![
                "/sys/devices/pci0000:00/0000:00:1c.2".to_string(),
                "/sys/devices/pci0000:00".to_string(),
            ]
        );
    }

    #[test]
    fn test_scan_omits_subsystemless_by_default() {
        let tree = sample_tree();
        assert_eq!(tree.scan_all().unwrap().len(), 2);
        assert_eq!(tree.listing_subsystemless().scan_all().unwrap().len(), 3);
    }

    #[test]
    fn test_binary_values_truncate_at_nul() {
        let tree = sample_tree();
        let device = tree.device_from_syspath(ILO).unwrap().unwrap();
        assert_eq!(device.sysattr_value("vpd").unwrap().unwrap(), b"ab");

        let whole = tree.without_nul_truncation();
        let device = whole.device_from_syspath(ILO).unwrap().unwrap();
        assert_eq!(device.sysattr_value("vpd").unwrap().unwrap(), b"ab\x00cd");
    }

    #[test]
    fn test_list_values_switch() {
        let tree = sample_tree();
        let device = tree.device_from_syspath(ILO).unwrap().unwrap();
        assert!(device.sysattr_entries().iter().all(|e| e.value.is_none()));

        let tree = tree.with_list_values();
        let device = tree.device_from_syspath(ILO).unwrap().unwrap();
        let entry = device.sysattr_entry_by_name("dev").unwrap().unwrap();
        assert_eq!(entry.value.as_deref(), Some("250:0"));
    }

    #[test]
    fn test_sysattr_matching() {
        let tree = sample_tree();
        let filter = EnumerationFilter::new().match_sysattr("dev", Some("250:0"));
        assert_eq!(tree.scan(&filter).unwrap().len(), 1);
        assert!(tree.broken_sysattr_match().scan(&filter).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_parent_is_ignored() {
        let tree = sample_tree();
        let filter = EnumerationFilter::new().match_parent("/sys/devices/nothing");
        assert_eq!(tree.scan(&filter).unwrap().len(), 2);
        let filter = EnumerationFilter::new().match_parent("/sys/devices/pci0000:00/0000:00:1c.2");
        assert_eq!(tree.scan(&filter).unwrap(), vec![ListEntry::named(ILO)]);
    }

    #[test]
    fn test_failing_scan() {
        let err = sample_tree().failing_scan(-12).scan_all().unwrap_err();
        assert_eq!(err.status_code(), Some(-12));
        assert_eq!(err.failed_call(), Some("udev_enumerate_scan_devices"));
    }

    #[test]
    fn test_with_config_sets_every_switch() {
        let tree = sample_tree().with_config(MockTreeConfig {
            list_values: true,
            list_subsystemless: true,
            translate_sysname_slash: false,
            sysattr_match_broken: true,
            truncate_at_nul: false,
            scan_status: None,
        });
        let device = tree.device_from_syspath(ILO).unwrap().unwrap();
        assert_eq!(
            device.sysattr_entry_by_name("dev").unwrap().unwrap().value.as_deref(),
            Some("250:0")
        );
        assert_eq!(device.sysattr_value("vpd").unwrap().unwrap(), b"ab\x00cd");
        assert_eq!(tree.scan_all().unwrap().len(), 3);
        assert!(tree
            .scan(&EnumerationFilter::new().match_sysattr("dev", None))
            .unwrap()
            .is_empty());
        assert!(tree
            .device_from_subsystem_sysname("iLO", "hpilo/d0ccb0")
            .unwrap()
            .is_none());
    }
}
