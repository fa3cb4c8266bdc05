//! Predefined scenarios for every reproducer
//!
//! Each scenario pairs a mock tree with a case and its inputs, plus what the
//! run should produce. Most cases come in a variant where the mock behaves
//! like a current libudev and one where a library quirk is switched.

use super::mock_device::{MockAttribute, MockDevice, MockDeviceTree};
use crate::core::config::{CaseInputs, FilterMode, NameLookup};
use crate::repro::Case;

/// A complete scenario: tree, case, inputs and expectations
#[derive(Debug, Clone)]
pub struct TestScenario {
    /// Scenario name for identification
    pub name: String,
    /// What this scenario checks
    pub description: String,
    pub case: Case,
    pub tree: MockDeviceTree,
    pub inputs: CaseInputs,
    pub expected: ExpectedResults,
    /// Tags for filtering scenarios
    pub tags: Vec<String>,
}

/// Expected outcome of a scenario run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpectedResults {
    pub status: i32,
    /// Substrings that must appear in the printed lines or notes
    pub fragments: Vec<String>,
    /// Substrings that must not appear anywhere
    pub absent: Vec<String>,
}

impl ExpectedResults {
    pub fn status(status: i32) -> Self {
        Self {
            status,
            ..Default::default()
        }
    }

    pub fn mentioning(mut self, fragment: &str) -> Self {
        self.fragments.push(fragment.to_string());
        self
    }

    pub fn not_mentioning(mut self, fragment: &str) -> Self {
        self.absent.push(fragment.to_string());
        self
    }
}

impl TestScenario {
    pub fn new(
        name: &str,
        description: &str,
        case: Case,
        tree: MockDeviceTree,
        expected: ExpectedResults,
    ) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            case,
            tree,
            inputs: CaseInputs::default(),
            expected,
            tags: vec![case.name().to_string()],
        }
    }

    /// Adjust the inputs starting from the defaults
    pub fn with_inputs(mut self, change: impl FnOnce(&mut CaseInputs)) -> Self {
        change(&mut self.inputs);
        self
    }

    /// Add tags to the scenario
    pub fn with_tags(mut self, tags: Vec<&str>) -> Self {
        self.tags.extend(tags.into_iter().map(String::from));
        self
    }
}

const MEMORY: &str = "/sys/devices/system/memory";
const SDAJ: &str = "/sys/devices/pci0000:00/0000:00:1f.2/ata9/host8/target8:0:0/8:0:0:0/block/sdaj";
const EVENT0: &str = "/sys/devices/LNXSYSTM:00/LNXPWRBN:00/input/input0/event0";
const ILO_DIR: &str = "/sys/devices/pci0000:00/0000:00:1c.2/0000:01:00.2/iLO";
const ACPI_DEVICE: &str = "/sys/devices/LNXSYSTM:00/LNXSYBUS:00/PNP0A08:00/device:26/device:27";
const PCI0: &str = "/sys/devices/LNXSYSTM:00/LNXSYBUS:00/PNP0A08:00";
const PLATFORM: &str = "/sys/devices/platform/udev-repro-mock.0";
const ATA1: &str = "/sys/devices/pci0000:00/0000:00:1f.2/ata1";
const VPD_EMPTY: &[u8] = b"\x00\x83\x00\x0c\x01\x03\x00\x08\x20\x00\x00\x00";
const VPD_FULL: &[u8] = b"\x01\x83\x00\x0c\x01\x03\x00\x08\x20\x00\x00\x00";

/// Collection of all predefined scenarios
pub struct ScenarioLibrary;

impl ScenarioLibrary {
    // =========================================================================
    // DEVICE TREES
    // =========================================================================

    fn memory_tree() -> MockDeviceTree {
        MockDeviceTree::new()
            .with_device(MockDevice::new(MEMORY).subsystem("memory"))
            .with_device(MockDevice::new(format!("{}/memory0", MEMORY)).subsystem("memory"))
            .with_device(MockDevice::new(format!("{}/memory1", MEMORY)).subsystem("memory"))
            .with_device(MockDevice::new("/sys/devices/system/cpu/cpu0").subsystem("cpu"))
    }

    fn named_tree() -> MockDeviceTree {
        MockDeviceTree::new()
            .with_device(MockDevice::new(SDAJ).subsystem("block"))
            .with_device(MockDevice::new(EVENT0).subsystem("input"))
            .with_device(MockDevice::new(format!("{}/hpilo!d0ccb0", ILO_DIR)).subsystem("iLO"))
    }

    fn acpi_tree() -> MockDeviceTree {
        MockDeviceTree::new()
            .with_device(
                MockDevice::new(PCI0)
                    .subsystem("acpi")
                    .attribute("path", "\\_SB_.PCI0")
                    .attribute("hid", "PNP0A08"),
            )
            .with_device(
                MockDevice::new(ACPI_DEVICE)
                    .subsystem("acpi")
                    .attribute("path", "\\_SB_.PCI0.RP05.PXSX")
                    .attribute("hid", "device")
                    .attribute_with("physical_node", MockAttribute::unreadable())
                    .attribute_with("power", MockAttribute::unreadable()),
            )
    }

    /// Devices whose syspaths do not exist on any host
    fn platform_tree() -> MockDeviceTree {
        MockDeviceTree::new()
            .with_device(
                MockDevice::new(PLATFORM)
                    .subsystem("platform")
                    .attribute("modalias", "platform:udev-repro")
                    .attribute_with("firmware_node", MockAttribute::unreadable())
                    .attribute_with("driver_override", MockAttribute::unreadable()),
            )
            .with_device(
                MockDevice::new(format!("{}/input/input9", PLATFORM))
                    .subsystem("input")
                    .attribute("name", "Mock Button"),
            )
    }

    fn ata_tree() -> MockDeviceTree {
        MockDeviceTree::new()
            .with_device(MockDevice::new("/sys/devices/pci0000:00/0000:00:1f.2").subsystem("pci"))
            .with_device(MockDevice::new(ATA1))
            .with_device(MockDevice::new(format!("{}/host0", ATA1)).subsystem("scsi"))
            .with_device(
                MockDevice::new(format!("{}/host0/target0:0:0/0:0:0:0/block/sda", ATA1))
                    .subsystem("block"),
            )
    }

    fn scsi_tree() -> MockDeviceTree {
        let inputs = CaseInputs::default();
        MockDeviceTree::new()
            .with_device(
                MockDevice::new(&inputs.binary_sysattr.empty_syspath)
                    .subsystem("scsi")
                    .attribute_with("vpd_pg83", MockAttribute::binary(VPD_EMPTY)),
            )
            .with_device(
                MockDevice::new(&inputs.binary_sysattr.populated_syspath)
                    .subsystem("scsi")
                    .attribute_with("vpd_pg83", MockAttribute::binary(VPD_FULL)),
            )
    }

    fn i2c_tree() -> MockDeviceTree {
        MockDeviceTree::new()
            .with_device(
                MockDevice::new("/sys/devices/pci0000:00/0000:00:1f.3/i2c-0").subsystem("i2c"),
            )
            .with_device(
                MockDevice::new("/sys/devices/pci0000:00/0000:00:1f.3/i2c-0/0-0050")
                    .subsystem("i2c"),
            )
            .with_device(MockDevice::new("/sys/devices/virtual/net/lo").subsystem("net"))
    }

    // =========================================================================
    // ENUMERATION BELOW A PARENT
    // =========================================================================

    pub fn match_parent_subtree() -> TestScenario {
        TestScenario::new(
            "match_parent_subtree",
            "Parent and children are listed, nothing else",
            Case::MatchParent,
            Self::memory_tree(),
            ExpectedResults::status(0)
                .mentioning("/sys/devices/system/memory/memory1")
                .mentioning("3 devices listed")
                .not_mentioning("cpu0"),
        )
        .with_tags(vec!["healthy"])
    }

    pub fn match_parent_unknown_parent() -> TestScenario {
        TestScenario::new(
            "match_parent_unknown_parent",
            "A parent that does not resolve drops the filter",
            Case::MatchParent,
            Self::memory_tree(),
            ExpectedResults::status(0)
                .mentioning("parent filter is dropped")
                .mentioning("cpu0"),
        )
        .with_inputs(|i| i.match_parent.parent_syspath = "/sys/devices/system/node".to_string())
        .with_tags(vec!["defect"])
    }

    pub fn match_parent_scan_failure() -> TestScenario {
        TestScenario::new(
            "match_parent_scan_failure",
            "A failing scan returns the library status",
            Case::MatchParent,
            Self::memory_tree().failing_scan(-12),
            ExpectedResults::status(-12).mentioning("udev_enumerate_scan_devices returned -12"),
        )
        .with_tags(vec!["error"])
    }

    // =========================================================================
    // LOOKUPS BY NAME
    // =========================================================================

    pub fn subsystem_sysname_defaults() -> TestScenario {
        TestScenario::new(
            "subsystem_sysname_defaults",
            "The configured iLO name is not present",
            Case::SubsystemSysname,
            Self::named_tree(),
            ExpectedResults::status(1).mentioning("iLO hpilo/d0ccb10: (null)"),
        )
        .with_tags(vec!["defect"])
    }

    pub fn subsystem_sysname_all_found() -> TestScenario {
        TestScenario::new(
            "subsystem_sysname_all_found",
            "Every lookup resolves when '/' maps to '!'",
            Case::SubsystemSysname,
            Self::named_tree()
                .with_device(MockDevice::new(format!("{}/hpilo!d0ccb10", ILO_DIR)).subsystem("iLO")),
            ExpectedResults::status(0).mentioning("hpilo!d0ccb10"),
        )
        .with_tags(vec!["healthy"])
    }

    pub fn subsystem_sysname_udevadm_spelling() -> TestScenario {
        TestScenario::new(
            "subsystem_sysname_udevadm_spelling",
            "A name with the subsystem as prefix does not resolve",
            Case::SubsystemSysname,
            Self::named_tree(),
            ExpectedResults::status(2).mentioning("try 'event0'"),
        )
        .with_inputs(|i| {
            i.subsystem_sysname.lookups = vec![
                NameLookup::new("block", "sdaj"),
                NameLookup::new("input", "input/event0"),
                NameLookup::new("iLO", "hpilo/d0ccb0"),
            ]
        })
        .with_tags(vec!["defect"])
    }

    pub fn sysname_round_trip_translated() -> TestScenario {
        TestScenario::new(
            "sysname_round_trip_translated",
            "A '!' device is found again by its reported sysname",
            Case::SysnameRoundTrip,
            Self::named_tree(),
            ExpectedResults::status(0).mentioning("hpilo/d0ccb0"),
        )
        .with_tags(vec!["healthy"])
    }

    pub fn sysname_round_trip_untranslated() -> TestScenario {
        TestScenario::new(
            "sysname_round_trip_untranslated",
            "The lookup does not map '/' back to '!'",
            Case::SysnameRoundTrip,
            Self::named_tree().without_sysname_translation(),
            ExpectedResults::status(4).mentioning("sysfs names it 'hpilo!d0ccb0'"),
        )
        .with_tags(vec!["defect"])
    }

    pub fn sysname_round_trip_input_device() -> TestScenario {
        TestScenario::new(
            "sysname_round_trip_input_device",
            "Input devices round trip even without translation",
            Case::SysnameRoundTrip,
            Self::named_tree().without_sysname_translation(),
            ExpectedResults::status(0).mentioning("event0"),
        )
        .with_inputs(|i| i.sysname_round_trip.syspath = EVENT0.to_string())
        .with_tags(vec!["healthy"])
    }

    // =========================================================================
    // SYSATTR VALUES
    // =========================================================================

    pub fn sysattr_values_physical_node() -> TestScenario {
        TestScenario::new(
            "sysattr_values_physical_node",
            "Listed attributes without a value are called out",
            Case::SysattrValues,
            Self::acpi_tree(),
            ExpectedResults::status(0)
                .mentioning("listed but without value: physical_node, power")
                .mentioning("bogus: (null)")
                .not_mentioning("get_by_name disagrees"),
        )
        .with_tags(vec!["defect"])
    }

    pub fn sysattr_values_list_carries_values() -> TestScenario {
        TestScenario::new(
            "sysattr_values_list_carries_values",
            "List entries that carry values show them in the first pass",
            Case::SysattrValues,
            Self::acpi_tree().with_list_values(),
            ExpectedResults::status(0).mentioning("path: \\_SB_.PCI0.RP05.PXSX"),
        )
        .with_tags(vec!["healthy"])
    }

    pub fn sysattr_values_missing_device() -> TestScenario {
        TestScenario::new(
            "sysattr_values_missing_device",
            "No device at the configured syspath",
            Case::SysattrValues,
            MockDeviceTree::new(),
            ExpectedResults::status(1).mentioning("no device at"),
        )
        .with_tags(vec!["error"])
    }

    pub fn valueless_none() -> TestScenario {
        TestScenario::new(
            "valueless_none",
            "Every listed attribute has a value",
            Case::ValuelessAttributes,
            Self::memory_tree(),
            ExpectedResults::status(0).mentioning("0 devices list attributes without a value"),
        )
        .with_tags(vec!["healthy"])
    }

    pub fn valueless_not_on_disk() -> TestScenario {
        TestScenario::new(
            "valueless_not_on_disk",
            "Valueless attributes that are not symlinked directories",
            Case::ValuelessAttributes,
            Self::platform_tree(),
            ExpectedResults::status(1)
                .mentioning("SURPRISE (not symlinked directories): driver_override, firmware_node")
                .not_mentioning("a subset were readable"),
        )
        .with_tags(vec!["defect"])
    }

    // =========================================================================
    // SUBSYSTEM-LESS DEVICES
    // =========================================================================

    pub fn subsystemless_omitted() -> TestScenario {
        TestScenario::new(
            "subsystemless_omitted",
            "A device without a subsystem is not listed",
            Case::SubsystemlessEnumeration,
            Self::ata_tree(),
            ExpectedResults::status(0).mentioning("listed: false"),
        )
        .with_tags(vec!["defect"])
    }

    pub fn subsystemless_listed() -> TestScenario {
        TestScenario::new(
            "subsystemless_listed",
            "A library that lists subsystem-less devices",
            Case::SubsystemlessEnumeration,
            Self::ata_tree().listing_subsystemless(),
            ExpectedResults::status(2).mentioning("listed: true"),
        )
        .with_tags(vec!["healthy"])
    }

    pub fn subsystemless_found_by_ancestry() -> TestScenario {
        TestScenario::new(
            "subsystemless_found_by_ancestry",
            "The first subsystem-less ancestor of sda is picked",
            Case::SubsystemlessEnumeration,
            Self::ata_tree(),
            ExpectedResults::status(0).mentioning(ATA1),
        )
        .with_inputs(|i| {
            i.subsystemless_enumeration.syspath = None;
            i.subsystemless_enumeration.ancestor_of = Some(NameLookup::new("block", "sda"));
        })
        .with_tags(vec!["defect"])
    }

    pub fn subsystemless_no_ancestor() -> TestScenario {
        TestScenario::new(
            "subsystemless_no_ancestor",
            "Every ancestor has a subsystem",
            Case::SubsystemlessEnumeration,
            Self::memory_tree(),
            ExpectedResults::status(5).mentioning("every ancestor of memory0"),
        )
        .with_inputs(|i| {
            i.subsystemless_enumeration.ancestor_of = Some(NameLookup::new("memory", "memory0"));
        })
        .with_tags(vec!["error"])
    }

    // =========================================================================
    // BINARY ATTRIBUTES
    // =========================================================================

    pub fn binary_sysattr_truncated() -> TestScenario {
        TestScenario::new(
            "binary_sysattr_truncated",
            "A page starting with NUL reads back empty",
            Case::BinarySysattr,
            Self::scsi_tree(),
            ExpectedResults::status(0).mentioning("vpd_pg83: 0 bytes"),
        )
        .with_tags(vec!["defect"])
    }

    pub fn binary_sysattr_whole() -> TestScenario {
        TestScenario::new(
            "binary_sysattr_whole",
            "A library that returns whole binary values",
            Case::BinarySysattr,
            Self::scsi_tree().without_nul_truncation(),
            ExpectedResults::status(3).mentioning("vpd_pg83: 12 bytes"),
        )
        .with_tags(vec!["healthy"])
    }

    pub fn binary_sysattr_missing_device() -> TestScenario {
        TestScenario::new(
            "binary_sysattr_missing_device",
            "The second device is absent",
            Case::BinarySysattr,
            Self::scsi_tree(),
            ExpectedResults::status(4).mentioning("no second device"),
        )
        .with_inputs(|i| i.binary_sysattr.populated_syspath = "/sys/devices/none".to_string())
        .with_tags(vec!["error"])
    }

    // =========================================================================
    // ENUMERATION FILTERS
    // =========================================================================

    pub fn subsystem_filter_none() -> TestScenario {
        TestScenario::new(
            "subsystem_filter_none",
            "Without a filter every device is listed",
            Case::SubsystemFilter,
            Self::i2c_tree(),
            ExpectedResults::status(0).mentioning("3 devices listed"),
        )
        .with_tags(vec!["healthy"])
    }

    pub fn subsystem_filter_match() -> TestScenario {
        TestScenario::new(
            "subsystem_filter_match",
            "Only i2c devices are listed",
            Case::SubsystemFilter,
            Self::i2c_tree(),
            ExpectedResults::status(0)
                .mentioning("0-0050")
                .not_mentioning("/sys/devices/virtual/net/lo"),
        )
        .with_inputs(|i| i.subsystem_filter.mode = FilterMode::Match)
        .with_tags(vec!["healthy"])
    }

    pub fn subsystem_filter_nomatch() -> TestScenario {
        TestScenario::new(
            "subsystem_filter_nomatch",
            "i2c devices are left out",
            Case::SubsystemFilter,
            Self::i2c_tree(),
            ExpectedResults::status(0)
                .mentioning("/sys/devices/virtual/net/lo")
                .not_mentioning("i2c-0"),
        )
        .with_inputs(|i| i.subsystem_filter.mode = FilterMode::NoMatch)
        .with_tags(vec!["healthy"])
    }

    pub fn sysattr_filter_match() -> TestScenario {
        TestScenario::new(
            "sysattr_filter_match",
            "The device matches its own attribute value",
            Case::SysattrFilter,
            Self::acpi_tree(),
            ExpectedResults::status(0)
                .mentioning("path before: \\_SB_.PCI0")
                .mentioning(&format!("{} is listed", PCI0)),
        )
        .with_tags(vec!["healthy"])
    }

    pub fn sysattr_filter_broken_match() -> TestScenario {
        TestScenario::new(
            "sysattr_filter_broken_match",
            "Matching on the exact value lists nothing",
            Case::SysattrFilter,
            Self::acpi_tree().broken_sysattr_match(),
            ExpectedResults::status(0)
                .mentioning("does not match its own attribute value")
                .not_mentioning(ACPI_DEVICE),
        )
        .with_tags(vec!["defect"])
    }

    pub fn sysattr_filter_nomatch() -> TestScenario {
        TestScenario::new(
            "sysattr_filter_nomatch",
            "nomatch lists every other device",
            Case::SysattrFilter,
            Self::acpi_tree().broken_sysattr_match(),
            ExpectedResults::status(0)
                .mentioning(ACPI_DEVICE)
                .mentioning(&format!("{} is not listed", PCI0)),
        )
        .with_inputs(|i| i.sysattr_filter.mode = FilterMode::NoMatch)
        .with_tags(vec!["defect"])
    }

    pub fn sysattr_filter_scan_failure() -> TestScenario {
        TestScenario::new(
            "sysattr_filter_scan_failure",
            "A failing scan returns the library status",
            Case::SysattrFilter,
            Self::acpi_tree().failing_scan(-22),
            ExpectedResults::status(-22).mentioning("path before"),
        )
        .with_tags(vec!["error"])
    }

    /// Get all available scenarios
    pub fn all_scenarios() -> Vec<TestScenario> {
        vec![
            Self::match_parent_subtree(),
            Self::match_parent_unknown_parent(),
            Self::match_parent_scan_failure(),
            Self::subsystem_sysname_defaults(),
            Self::subsystem_sysname_all_found(),
            Self::subsystem_sysname_udevadm_spelling(),
            Self::sysname_round_trip_translated(),
            Self::sysname_round_trip_untranslated(),
            Self::sysname_round_trip_input_device(),
            Self::sysattr_values_physical_node(),
            Self::sysattr_values_list_carries_values(),
            Self::sysattr_values_missing_device(),
            Self::valueless_none(),
            Self::valueless_not_on_disk(),
            Self::subsystemless_omitted(),
            Self::subsystemless_listed(),
            Self::subsystemless_found_by_ancestry(),
            Self::subsystemless_no_ancestor(),
            Self::binary_sysattr_truncated(),
            Self::binary_sysattr_whole(),
            Self::binary_sysattr_missing_device(),
            Self::subsystem_filter_none(),
            Self::subsystem_filter_match(),
            Self::subsystem_filter_nomatch(),
            Self::sysattr_filter_match(),
            Self::sysattr_filter_broken_match(),
            Self::sysattr_filter_nomatch(),
            Self::sysattr_filter_scan_failure(),
        ]
    }

    /// Get scenarios by tag
    pub fn scenarios_by_tag(tag: &str) -> Vec<TestScenario> {
        Self::all_scenarios()
            .into_iter()
            .filter(|s| s.tags.iter().any(|t| t == tag))
            .collect()
    }

    pub fn scenario(name: &str) -> Option<TestScenario> {
        Self::all_scenarios().into_iter().find(|s| s.name == name)
    }

    /// One healthy scenario per case
    pub fn quick_scenarios() -> Vec<TestScenario> {
        vec![
            Self::match_parent_subtree(),
            Self::subsystem_sysname_all_found(),
            Self::sysname_round_trip_translated(),
            Self::sysattr_values_list_carries_values(),
            Self::valueless_none(),
            Self::subsystemless_listed(),
            Self::binary_sysattr_whole(),
            Self::subsystem_filter_match(),
            Self::sysattr_filter_match(),
        ]
    }
}
