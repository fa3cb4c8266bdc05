//! Device tree abstraction traits for testability
//!
//! Reproducers only ever talk to these traits. The libudev-backed context
//! implements them for real runs, and `testdb::MockDeviceTree` implements
//! them so every reproducer can be exercised without a host device tree.
//!
//! # Architecture
//!
//! - `DeviceTree` - Context-level queries (lookup by syspath or name, scans)
//! - `DeviceHandle` - Per-device queries (names, attributes, parent)
//! - `ListEntry` - One name/value entry of a libudev list
//! - `EnumerationFilter` - Ordered match clauses applied before a scan
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use udev_repro::device::traits::{DeviceTree, EnumerationFilter};
//!
//! fn block_devices<T: DeviceTree>(tree: &T) -> udev_repro::core::error::Result<Vec<String>> {
//!     let filter = EnumerationFilter::new().match_subsystem("block");
//!     Ok(tree.scan(&filter)?.into_iter().map(|e| e.name).collect())
//! }
//! ```

use crate::core::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// One entry of a libudev linked list
///
/// `value` is `None` wherever `udev_list_entry_get_value` returned NULL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListEntry {
    pub name: String,
    pub value: Option<String>,
}

impl ListEntry {
    /// Create an entry that carries a name only
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            value: None,
        }
    }
}

/// Render an optional library string the way C's printf renders NULL
pub fn or_null(value: Option<&str>) -> &str {
    value.unwrap_or("(null)")
}

/// A single enumeration filter clause
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Match {
    /// `udev_enumerate_add_match_subsystem`
    Subsystem(String),
    /// `udev_enumerate_add_nomatch_subsystem`
    NoSubsystem(String),
    /// `udev_enumerate_add_match_sysattr`; a `None` value matches presence
    Sysattr { name: String, value: Option<String> },
    /// `udev_enumerate_add_nomatch_sysattr`
    NoSysattr { name: String, value: Option<String> },
    /// `udev_enumerate_add_match_parent`, given as the parent's syspath
    Parent(String),
}

impl Display for Match {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Match::Subsystem(s) => write!(f, "subsystem == {}", s),
            Match::NoSubsystem(s) => write!(f, "subsystem != {}", s),
            Match::Sysattr { name, value } => {
                write!(f, "sysattr {} == {}", name, or_null(value.as_deref()))
            }
            Match::NoSysattr { name, value } => {
                write!(f, "sysattr {} != {}", name, or_null(value.as_deref()))
            }
            Match::Parent(p) => write!(f, "parent {}", p),
        }
    }
}

/// Ordered set of match clauses for one scan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumerationFilter {
    pub matches: Vec<Match>,
}

impl EnumerationFilter {
    /// An empty filter selects every device
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, clause: Match) -> Self {
        self.matches.push(clause);
        self
    }

    pub fn match_subsystem(self, subsystem: &str) -> Self {
        self.with(Match::Subsystem(subsystem.to_string()))
    }

    pub fn nomatch_subsystem(self, subsystem: &str) -> Self {
        self.with(Match::NoSubsystem(subsystem.to_string()))
    }

    pub fn match_sysattr(self, name: &str, value: Option<&str>) -> Self {
        self.with(Match::Sysattr {
            name: name.to_string(),
            value: value.map(String::from),
        })
    }

    pub fn nomatch_sysattr(self, name: &str, value: Option<&str>) -> Self {
        self.with(Match::NoSysattr {
            name: name.to_string(),
            value: value.map(String::from),
        })
    }

    pub fn match_parent(self, syspath: &str) -> Self {
        self.with(Match::Parent(syspath.to_string()))
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}

/// Per-device queries
///
/// Every getter mirrors one libudev accessor and returns `None` where that
/// accessor returns NULL.
pub trait DeviceHandle: Sized {
    fn syspath(&self) -> Option<String>;

    fn sysname(&self) -> Option<String>;

    fn subsystem(&self) -> Option<String>;

    /// The parent device, if any
    fn parent(&self) -> Option<Self>;

    /// All ancestors from the immediate parent upwards
    fn ancestors(&self) -> Vec<Self> {
        let mut ancestors = Vec::new();
        let mut current = self.parent();
        while let Some(device) = current {
            current = device.parent();
            ancestors.push(device);
        }
        ancestors
    }

    /// `udev_device_get_sysattr_value`, as the bytes up to the first NUL
    fn sysattr_value(&self, name: &str) -> Result<Option<Vec<u8>>>;

    /// Lossy string form of [`DeviceHandle::sysattr_value`]
    fn sysattr_string(&self, name: &str) -> Result<Option<String>> {
        Ok(self
            .sysattr_value(name)?
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
    }

    /// Walk `udev_device_get_sysattr_list_entry`
    fn sysattr_entries(&self) -> Vec<ListEntry>;

    /// `udev_list_entry_get_by_name` on the sysattr list
    fn sysattr_entry_by_name(&self, name: &str) -> Result<Option<ListEntry>>;
}

/// Context-level queries
pub trait DeviceTree {
    /// The device handle type this tree hands out
    type Device: DeviceHandle;

    /// `udev_device_new_from_syspath`
    fn device_from_syspath(&self, syspath: &str) -> Result<Option<Self::Device>>;

    /// `udev_device_new_from_subsystem_sysname`
    fn device_from_subsystem_sysname(
        &self,
        subsystem: &str,
        sysname: &str,
    ) -> Result<Option<Self::Device>>;

    /// Apply `filter` to a fresh enumerator, scan, and walk the result list
    ///
    /// Entry names are syspaths. A negative status from any filter call or
    /// from the scan is returned as `ReproError::Status`.
    fn scan(&self, filter: &EnumerationFilter) -> Result<Vec<ListEntry>>;

    /// Every device the library lists with no filter applied
    fn scan_all(&self) -> Result<Vec<ListEntry>> {
        self.scan(&EnumerationFilter::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_builder_keeps_order() {
        let filter = EnumerationFilter::new()
            .match_subsystem("block")
            .nomatch_subsystem("i2c")
            .match_sysattr("path", Some("\\_SB_"))
            .match_parent("/sys/devices/system/memory");

        assert_eq!(filter.matches.len(), 4);
        assert_eq!(filter.matches[0], Match::Subsystem("block".to_string()));
        assert_eq!(filter.matches[1], Match::NoSubsystem("i2c".to_string()));
        assert_eq!(
            filter.matches[3],
            Match::Parent("/sys/devices/system/memory".to_string())
        );
    }

    #[test]
    fn test_empty_filter() {
        assert!(EnumerationFilter::new().is_empty());
        assert!(!EnumerationFilter::new().match_subsystem("input").is_empty());
    }

    #[test]
    fn test_match_display_renders_null_values() {
        let clause = Match::Sysattr {
            name: "path".to_string(),
            value: None,
        };
        assert_eq!(clause.to_string(), "sysattr path == (null)");
        assert_eq!(
            Match::NoSubsystem("i2c".to_string()).to_string(),
            "subsystem != i2c"
        );
    }

    #[test]
    fn test_or_null() {
        assert_eq!(or_null(Some("event0")), "event0");
        assert_eq!(or_null(None), "(null)");
    }

    #[test]
    fn test_named_list_entry_has_no_value() {
        assert_eq!(ListEntry::named("size").value, None);
    }
}
