//! The reproducers
//!
//! Each case issues a short, fixed sequence of libudev calls and reports
//! what came back. Cases share nothing but the `DeviceTree` they run on.
//!
//! # Submodules
//!
//! - `report` - Transcript and report types
//! - `match_parent` - Enumeration below a parent device
//! - `names` - Lookups by subsystem and sysname
//! - `sysattrs` - Sysattr list entries vs. per-attribute lookups
//! - `valueless` - Attributes listed without a value, checked on disk
//! - `subsystemless` - Enumeration of devices without a subsystem
//! - `binary_sysattr` - Binary attribute contents
//! - `filters` - Subsystem and sysattr enumeration filters

pub mod binary_sysattr;
pub mod filters;
pub mod match_parent;
pub mod names;
pub mod report;
pub mod subsystemless;
pub mod sysattrs;
pub mod valueless;

pub use report::{Attachment, Report, Transcript, Verdict};

use crate::core::config::CaseInputs;
use crate::core::error::Result;
use crate::device::traits::DeviceTree;
use log::info;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One reproducer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Case {
    MatchParent,
    SubsystemSysname,
    SysnameRoundTrip,
    SysattrValues,
    ValuelessAttributes,
    SubsystemlessEnumeration,
    BinarySysattr,
    SubsystemFilter,
    SysattrFilter,
}

impl Case {
    /// Every case, in bug number order
    pub const ALL: [Case; 9] = [
        Case::MatchParent,
        Case::SubsystemSysname,
        Case::SysnameRoundTrip,
        Case::SysattrValues,
        Case::ValuelessAttributes,
        Case::SubsystemlessEnumeration,
        Case::BinarySysattr,
        Case::SubsystemFilter,
        Case::SysattrFilter,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Case::MatchParent => "match-parent",
            Case::SubsystemSysname => "subsystem-sysname",
            Case::SysnameRoundTrip => "sysname-round-trip",
            Case::SysattrValues => "sysattr-values",
            Case::ValuelessAttributes => "valueless-attributes",
            Case::SubsystemlessEnumeration => "subsystemless-enumeration",
            Case::BinarySysattr => "binary-sysattr",
            Case::SubsystemFilter => "subsystem-filter",
            Case::SysattrFilter => "sysattr-filter",
        }
    }

    /// Bug number the behavior was reported under
    pub fn bug(&self) -> &'static str {
        match self {
            Case::MatchParent => "1255191",
            Case::SubsystemSysname | Case::SysnameRoundTrip => "1263351",
            Case::SysattrValues | Case::ValuelessAttributes => "1265315",
            Case::SubsystemlessEnumeration => "1297512",
            Case::BinarySysattr => "1302359",
            Case::SubsystemFilter => "1346446",
            Case::SysattrFilter => "1347299",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Case::MatchParent => "Enumerate the devices below a parent",
            Case::SubsystemSysname => "Look devices up by subsystem and sysname",
            Case::SysnameRoundTrip => "Round-trip a device through its subsystem and sysname",
            Case::SysattrValues => "Sysattr list values vs. per-attribute lookups",
            Case::ValuelessAttributes => "Attributes listed without a value",
            Case::SubsystemlessEnumeration => "Enumeration of devices without a subsystem",
            Case::BinarySysattr => "Binary attribute reported empty or populated",
            Case::SubsystemFilter => "Subsystem match and nomatch filters",
            Case::SysattrFilter => "Sysattr match and nomatch filters",
        }
    }

    /// What the library is expected to do and what was observed
    pub fn description(&self) -> &'static str {
        match self {
            Case::MatchParent => {
                "Scans with udev_enumerate_add_match_parent() on a device that has \
                 children and prints every syspath returned. The parent itself is \
                 part of the result. A parent that cannot be resolved leaves the \
                 enumerator unconstrained, so every device is printed."
            }
            Case::SubsystemSysname => {
                "Looks up devices with udev_device_new_from_subsystem_sysname(). The \
                 real sysname always works. A name as udevadm prints it, with the \
                 subsystem as prefix, fails; stripping the prefix works. A name whose \
                 prefix differs from the subsystem string fails either way."
            }
            Case::SysnameRoundTrip => {
                "Creates a device from its syspath, reads back its sysname and \
                 subsystem, then looks it up again by that pair. Input devices round \
                 trip. Devices whose sysfs name contains '!' (reported as '/') do not."
            }
            Case::SysattrValues => {
                "Walks the sysattr list four ways. List entries carry no values, \
                 which is correct. udev_device_get_sysattr_value() returns NULL for \
                 some listed attributes that have readable content (physical_node). \
                 A bogus attribute is NULL. udev_list_entry_get_by_name() matches \
                 the first pass."
            }
            Case::ValuelessAttributes => {
                "Surveys every device for attributes that are listed but have no \
                 value. Those are expected to be symlinked directories. Anything \
                 else is a surprise, and owner-readable surprises are reported \
                 separately."
            }
            Case::SubsystemlessEnumeration => {
                "Takes a device that has no subsystem (an ancestor of a block \
                 device, say) and checks whether an unfiltered scan lists it. \
                 The library omits such devices even though they have a valid \
                 syspath; a device with a subsystem is listed."
            }
            Case::BinarySysattr => {
                "Reads a binary attribute (vpd_pg83) on two devices whose sysfs \
                 files both carry binary data. On one the library reports an \
                 empty value, on the other a non-empty one. The value is cut at \
                 the first NUL byte."
            }
            Case::SubsystemFilter => {
                "Scans with no filter, with udev_enumerate_add_match_subsystem() or \
                 with udev_enumerate_add_nomatch_subsystem() and prints the result."
            }
            Case::SysattrFilter => {
                "Reads a sysattr from a device, then scans with \
                 udev_enumerate_add_match_sysattr() on that exact value. The match \
                 comes back empty; nomatch lists the device."
            }
        }
    }

    /// Documented status codes
    pub fn status_codes(&self) -> &'static [(i32, &'static str)] {
        match self {
            Case::MatchParent | Case::SubsystemFilter => &[
                (0, "scan completed"),
                (-1, "negative: status of the failing libudev call"),
            ],
            Case::SubsystemSysname => &[
                (0, "every lookup succeeded"),
                (1, "last lookup failed"),
                (2, "second-to-last lookup failed"),
                (3, "third-to-last lookup failed"),
            ],
            Case::SysnameRoundTrip => &[
                (0, "device found again by subsystem and sysname"),
                (1, "no device at syspath"),
                (2, "device has no sysname"),
                (3, "device has no subsystem"),
                (4, "lookup by subsystem and sysname failed"),
            ],
            Case::SysattrValues => &[(0, "all passes printed"), (1, "no device at syspath")],
            Case::ValuelessAttributes => &[
                (0, "every valueless attribute is a symlinked directory"),
                (1, "some valueless attributes are not symlinked directories"),
                (2, "some of those are readable by their owner"),
            ],
            Case::SubsystemlessEnumeration => &[
                (0, "device is not listed"),
                (2, "device is listed"),
                (3, "device not found"),
                (4, "device has no syspath"),
                (5, "no ancestor without a subsystem"),
            ],
            Case::BinarySysattr => &[
                (0, "first value empty, second value non-empty"),
                (1, "first device not found"),
                (2, "first device lacks the attribute"),
                (3, "first value unexpectedly non-empty"),
                (4, "second device not found"),
                (5, "second device lacks the attribute"),
                (6, "second value unexpectedly empty"),
            ],
            Case::SysattrFilter => &[
                (0, "scan completed"),
                (1, "no device at syspath"),
                (-1, "negative: status of the failing libudev call"),
            ],
        }
    }

    /// Run this case on `tree`
    ///
    /// A negative library status ends the case with that status, the way the
    /// standalone programs returned it from `main`. Other errors propagate.
    pub fn run<T: DeviceTree>(&self, tree: &T, inputs: &CaseInputs) -> Result<Report> {
        info!("Running {} (bug {})", self.name(), self.bug());
        let mut transcript = Transcript::new();

        let outcome = match self {
            Case::MatchParent => match_parent::run(tree, &inputs.match_parent, &mut transcript),
            Case::SubsystemSysname => {
                names::run_lookups(tree, &inputs.subsystem_sysname, &mut transcript)
            }
            Case::SysnameRoundTrip => {
                names::run_round_trip(tree, &inputs.sysname_round_trip, &mut transcript)
            }
            Case::SysattrValues => sysattrs::run(tree, &inputs.sysattr_values, &mut transcript),
            Case::ValuelessAttributes => {
                valueless::run(tree, &inputs.valueless_attributes, &mut transcript)
            }
            Case::SubsystemlessEnumeration => {
                subsystemless::run(tree, &inputs.subsystemless_enumeration, &mut transcript)
            }
            Case::BinarySysattr => {
                binary_sysattr::run(tree, &inputs.binary_sysattr, &mut transcript)
            }
            Case::SubsystemFilter => {
                filters::run_subsystem(tree, &inputs.subsystem_filter, &mut transcript)
            }
            Case::SysattrFilter => {
                filters::run_sysattr(tree, &inputs.sysattr_filter, &mut transcript)
            }
        };

        let (status, failed_call) = match outcome {
            Ok(status) => (status, None),
            Err(e) => match e.status_code() {
                Some(code) => {
                    transcript.note(e.to_string());
                    (code, e.failed_call())
                }
                None => return Err(e),
            },
        };

        info!("{} finished with status {}", self.name(), status);
        Ok(Report::new(
            self.name(),
            self.bug(),
            status,
            transcript,
            failed_call,
        ))
    }
}

impl fmt::Display for Case {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Case {
    type Err = String;

    /// Accepts a case name or a bug number (the first case filed under it)
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('_', "-");
        Case::ALL
            .iter()
            .find(|case| case.name() == wanted || case.bug() == wanted)
            .copied()
            .ok_or_else(|| {
                format!(
                    "unknown case '{}' (known: {})",
                    s,
                    Case::ALL
                        .iter()
                        .map(|c| c.name())
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip_through_from_str() {
        for case in Case::ALL {
            assert_eq!(case.name().parse::<Case>().unwrap(), case);
        }
    }

    #[test]
    fn test_from_str_accepts_bug_numbers() {
        assert_eq!("1255191".parse::<Case>().unwrap(), Case::MatchParent);
        assert_eq!("1263351".parse::<Case>().unwrap(), Case::SubsystemSysname);
        assert_eq!("1347299".parse::<Case>().unwrap(), Case::SysattrFilter);
    }

    #[test]
    fn test_from_str_is_lenient_about_spelling() {
        assert_eq!(
            "Binary_Sysattr".parse::<Case>().unwrap(),
            Case::BinarySysattr
        );
    }

    #[test]
    fn test_from_str_unknown_lists_cases() {
        let err = "hwdb".parse::<Case>().unwrap_err();
        assert!(err.contains("unknown case 'hwdb'"));
        assert!(err.contains("match-parent"));
    }

    #[test]
    fn test_every_case_documents_status_zero() {
        for case in Case::ALL {
            assert!(
                case.status_codes().iter().any(|(code, _)| *code == 0),
                "{} lacks status 0",
                case
            );
            assert!(!case.description().is_empty());
        }
    }

    #[test]
    fn test_serde_names_match_display() {
        let json = serde_json::to_string(&Case::SubsystemlessEnumeration).unwrap();
        assert_eq!(json, "\"subsystemless-enumeration\"");
    }
}
