//! Survey of attributes that are listed but have no value
//!
//! Listed-but-valueless attributes are normally symlinks to directories
//! (`driver`, `subsystem`, `firmware_node`, ...). Anything else is checked on
//! disk and reported.

use super::Transcript;
use crate::core::config::ValuelessAttributesInput;
use crate::core::error::Result;
use crate::device::traits::{DeviceHandle, DeviceTree, EnumerationFilter};
use log::{debug, warn};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

/// What an attribute looks like in sysfs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeFile {
    /// A symlink that resolves to a directory
    SymlinkedDirectory,
    /// Anything else that exists
    Other { owner_readable: bool },
    /// Nothing at that path
    Missing,
}

impl AttributeFile {
    pub fn is_expected(&self) -> bool {
        matches!(self, AttributeFile::SymlinkedDirectory)
    }

    pub fn is_owner_readable(&self) -> bool {
        matches!(
            self,
            AttributeFile::Other {
                owner_readable: true
            }
        )
    }
}

/// Inspect `path` the way `os.path.islink`/`isdir` and `stat` would
pub fn classify(path: &Path) -> AttributeFile {
    let Ok(link) = fs::symlink_metadata(path) else {
        return AttributeFile::Missing;
    };
    let target = fs::metadata(path).ok();

    if link.file_type().is_symlink() && target.as_ref().is_some_and(|m| m.is_dir()) {
        return AttributeFile::SymlinkedDirectory;
    }

    AttributeFile::Other {
        owner_readable: target.is_some_and(|m| m.permissions().mode() & 0o400 != 0),
    }
}

/// Findings for one device
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceSurvey {
    pub syspath: String,
    pub valueless: Vec<String>,
    pub surprises: Vec<String>,
    pub readable: Vec<String>,
}

impl DeviceSurvey {
    /// Status contribution: 2 readable surprises, 1 surprises, 0 none
    pub fn status(&self) -> i32 {
        if !self.readable.is_empty() {
            2
        } else if !self.surprises.is_empty() {
            1
        } else {
            0
        }
    }
}

/// Survey one device; `None` when every listed attribute has a value
pub fn survey_device<D: DeviceHandle>(device: &D) -> Result<Option<DeviceSurvey>> {
    let Some(syspath) = device.syspath() else {
        return Ok(None);
    };

    let mut valueless = Vec::new();
    for entry in device.sysattr_entries() {
        if device.sysattr_value(&entry.name)?.is_none() {
            valueless.push(entry.name);
        }
    }
    if valueless.is_empty() {
        return Ok(None);
    }

    let mut survey = DeviceSurvey {
        syspath,
        ..Default::default()
    };
    for name in &valueless {
        let kind = classify(&Path::new(&survey.syspath).join(name));
        debug!("{}/{}: {:?}", survey.syspath, name, kind);
        if !kind.is_expected() {
            survey.surprises.push(name.clone());
            if kind.is_owner_readable() {
                survey.readable.push(name.clone());
            }
        }
    }
    survey.valueless = valueless;

    Ok(Some(survey))
}

pub fn run<T: DeviceTree>(
    tree: &T,
    input: &ValuelessAttributesInput,
    out: &mut Transcript,
) -> Result<i32> {
    let filter = match &input.subsystem {
        Some(subsystem) => EnumerationFilter::new().match_subsystem(subsystem),
        None => EnumerationFilter::new(),
    };

    let mut status = 0;
    let mut devices_with_findings = 0;

    for entry in tree.scan(&filter)? {
        let Some(device) = tree.device_from_syspath(&entry.name)? else {
            warn!("{} disappeared during the survey", entry.name);
            continue;
        };
        let Some(survey) = survey_device(&device)? else {
            continue;
        };

        devices_with_findings += 1;
        out.line(format!("{}: {}", survey.syspath, survey.valueless.join(", ")));
        if !survey.surprises.is_empty() {
            out.line(format!(
                "SURPRISE (not symlinked directories): {}",
                survey.surprises.join(", ")
            ));
        }
        if !survey.readable.is_empty() {
            out.line(format!(
                "a subset were readable: {}",
                survey.readable.join(", ")
            ));
        }
        status = status.max(survey.status());
    }

    out.note(format!(
        "{} devices list attributes without a value",
        devices_with_findings
    ));
    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testdb::{MockAttribute, MockDevice, MockDeviceTree};
    use std::os::unix::fs::symlink;
    use tempfile::TempDir;

    struct FakeSysfs {
        dir: TempDir,
    }

    impl FakeSysfs {
        fn new() -> Self {
            Self {
                dir: TempDir::new().unwrap(),
            }
        }

        fn device(&self, name: &str) -> String {
            let path = self.dir.path().join("devices").join(name);
            fs::create_dir_all(&path).unwrap();
            path.to_string_lossy().into_owned()
        }

        fn linked_dir(&self, device: &str, attribute: &str) {
            let target = self.dir.path().join("targets").join(attribute);
            fs::create_dir_all(&target).unwrap();
            symlink(&target, Path::new(device).join(attribute)).unwrap();
        }

        fn file(&self, device: &str, attribute: &str, mode: u32) {
            let path = Path::new(device).join(attribute);
            fs::write(&path, b"\x00\x83").unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(mode)).unwrap();
        }
    }

    #[test]
    fn test_classify_symlinked_directory() {
        let sysfs = FakeSysfs::new();
        let device = sysfs.device("pci0000:00");
        sysfs.linked_dir(&device, "driver");
        assert_eq!(
            classify(&Path::new(&device).join("driver")),
            AttributeFile::SymlinkedDirectory
        );
    }

    #[test]
    fn test_classify_plain_files() {
        let sysfs = FakeSysfs::new();
        let device = sysfs.device("pci0000:00");
        sysfs.file(&device, "vpd_pg83", 0o400);
        sysfs.file(&device, "remove", 0o200);
        assert_eq!(
            classify(&Path::new(&device).join("vpd_pg83")),
            AttributeFile::Other {
                owner_readable: true
            }
        );
        assert_eq!(
            classify(&Path::new(&device).join("remove")),
            AttributeFile::Other {
                owner_readable: false
            }
        );
    }

    #[test]
    fn test_classify_missing() {
        let sysfs = FakeSysfs::new();
        let device = sysfs.device("pci0000:00");
        assert_eq!(
            classify(&Path::new(&device).join("nothing")),
            AttributeFile::Missing
        );
        assert!(!AttributeFile::Missing.is_owner_readable());
    }

    #[test]
    fn test_survey_reports_surprises_and_readables() {
        let sysfs = FakeSysfs::new();
        let device = sysfs.device("0:0:0:0");
        sysfs.linked_dir(&device, "driver");
        sysfs.file(&device, "vpd_pg83", 0o444);
        sysfs.file(&device, "delete", 0o200);

        let tree = MockDeviceTree::new().with_device(
            MockDevice::new(&device)
                .subsystem("scsi")
                .attribute("model", "QEMU HARDDISK")
                .attribute_with("driver", MockAttribute::unreadable())
                .attribute_with("vpd_pg83", MockAttribute::unreadable())
                .attribute_with("delete", MockAttribute::unreadable()),
        );

        let mut out = Transcript::new();
        let status = run(&tree, &ValuelessAttributesInput::default(), &mut out).unwrap();

        assert_eq!(status, 2);
        assert_eq!(
            out.lines(),
            &[
                format!("{}: delete, driver, vpd_pg83", device),
                "SURPRISE (not symlinked directories): delete, vpd_pg83".to_string(),
                "a subset were readable: vpd_pg83".to_string(),
            ]
        );
    }

    #[test]
    fn test_only_symlinked_directories_is_clean() {
        let sysfs = FakeSysfs::new();
        let device = sysfs.device("input0");
        sysfs.linked_dir(&device, "subsystem");

        let tree = MockDeviceTree::new().with_device(
            MockDevice::new(&device)
                .subsystem("input")
                .attribute("name", "Power Button")
                .attribute_with("subsystem", MockAttribute::unreadable()),
        );

        let mut out = Transcript::new();
        assert_eq!(
            run(&tree, &ValuelessAttributesInput::default(), &mut out).unwrap(),
            0
        );
        assert_eq!(out.lines().len(), 1);
        assert_eq!(out.notes()[0], "1 devices list attributes without a value");
    }

    #[test]
    fn test_unreadable_surprise_is_status_one() {
        let sysfs = FakeSysfs::new();
        let device = sysfs.device("card0");
        sysfs.file(&device, "reset", 0o200);

        let tree = MockDeviceTree::new().with_device(
            MockDevice::new(&device)
                .subsystem("drm")
                .attribute_with("reset", MockAttribute::unreadable()),
        );

        let mut out = Transcript::new();
        assert_eq!(
            run(&tree, &ValuelessAttributesInput::default(), &mut out).unwrap(),
            1
        );
    }

    #[test]
    fn test_subsystem_restriction() {
        let tree = MockDeviceTree::new()
            .with_device(
                MockDevice::new("/sys/devices/virtual/net/lo")
                    .subsystem("net")
                    .attribute_with("phys_port_id", MockAttribute::unreadable()),
            )
            .with_device(
                MockDevice::new("/sys/devices/virtual/block/loop0")
                    .subsystem("block")
                    .attribute("size", "0"),
            );
        let input = ValuelessAttributesInput {
            subsystem: Some("block".to_string()),
        };
        let mut out = Transcript::new();
        assert_eq!(run(&tree, &input, &mut out).unwrap(), 0);
        assert!(out.lines().is_empty());
    }

    #[test]
    fn test_device_survey_status() {
        let mut survey = DeviceSurvey::default();
        assert_eq!(survey.status(), 0);
        survey.surprises.push("reset".to_string());
        assert_eq!(survey.status(), 1);
        survey.readable.push("reset".to_string());
        assert_eq!(survey.status(), 2);
    }
}
