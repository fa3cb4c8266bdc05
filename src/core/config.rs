//! Configuration module for the reproducers
//!
//! Supports loading configuration from a TOML file.
//! Configuration is stored in a standard location:
//! - `$XDG_CONFIG_HOME/udev_repro/config.toml` (usually `~/.config/udev_repro/config.toml`)
//!
//! The `[cases.*]` tables hold the inputs each reproducer works on. Their
//! defaults are the device paths and names the reproducers were first
//! written against; on another host they almost always need adjusting.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Application name used for config directory
const APP_NAME: &str = "udev_repro";

/// Default config file name
const CONFIG_FILE_NAME: &str = "config.toml";

/// Config file name looked up in the current directory
const LOCAL_CONFIG_FILE_NAME: &str = "udev-repro.toml";

/// Get the standard configuration directory for the application.
pub fn get_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_NAME))
}

/// Get the standard configuration file path.
pub fn get_config_path() -> Option<PathBuf> {
    get_config_dir().map(|dir| dir.join(CONFIG_FILE_NAME))
}

/// Ensure the configuration directory exists.
pub fn ensure_config_dir() -> Result<PathBuf, ConfigError> {
    let config_dir = get_config_dir().ok_or(ConfigError::ConfigDirNotFound)?;

    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)
            .map_err(|e| ConfigError::WriteError(config_dir.clone(), e.to_string()))?;
    }

    Ok(config_dir)
}

/// Initialize the configuration file if it doesn't exist.
///
/// Returns the path to the config file.
pub fn init_config() -> Result<PathBuf, ConfigError> {
    let config_dir = ensure_config_dir()?;
    let config_path = config_dir.join(CONFIG_FILE_NAME);

    if !config_path.exists() {
        write_default_config(&config_path)?;
    }

    Ok(config_path)
}

/// Write the commented default template to `path`, replacing what is there.
pub fn write_default_config(path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)
                .map_err(|e| ConfigError::WriteError(parent.to_path_buf(), e.to_string()))?;
        }
    }
    fs::write(path, Config::generate_default_config())
        .map_err(|e| ConfigError::WriteError(path.to_path_buf(), e.to_string()))
}

/// Open the configuration file in the desktop's default editor.
pub fn open_config_in_editor() -> Result<PathBuf, ConfigError> {
    let config_path = init_config()?;

    std::process::Command::new("xdg-open")
        .arg(&config_path)
        .spawn()
        .map_err(|e| ConfigError::OpenError(config_path.clone(), e.to_string()))?;

    Ok(config_path)
}

/// How reports are printed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Printed lines followed by the status
    #[default]
    Text,
    /// One JSON report per case
    Json,
}

/// Which enumeration filter a filter reproducer installs
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    /// No filter at all
    None,
    /// `add_match_*`
    #[default]
    Match,
    /// `add_nomatch_*`
    NoMatch,
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Library loading settings
    pub library: LibraryConfig,

    /// Logging settings
    pub logging: LoggingConfig,

    /// Output settings
    pub output: OutputConfig,

    /// Per-reproducer inputs
    pub cases: CaseInputs,
}

/// Library loading configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Shared object names or paths, tried in order
    pub candidates: Vec<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log to file
    pub log_to_file: bool,

    /// Log file path
    pub log_file: PathBuf,
}

/// Output configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Report format
    pub format: OutputFormat,
}

/// A subsystem/sysname pair for `udev_device_new_from_subsystem_sysname`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameLookup {
    pub subsystem: String,
    pub sysname: String,
}

impl NameLookup {
    pub fn new(subsystem: &str, sysname: &str) -> Self {
        Self {
            subsystem: subsystem.to_string(),
            sysname: sysname.to_string(),
        }
    }
}

/// Inputs for every reproducer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CaseInputs {
    pub match_parent: MatchParentInput,
    pub subsystem_sysname: SubsystemSysnameInput,
    pub sysname_round_trip: SysnameRoundTripInput,
    pub sysattr_values: SysattrValuesInput,
    pub valueless_attributes: ValuelessAttributesInput,
    pub subsystemless_enumeration: SubsystemlessEnumerationInput,
    pub binary_sysattr: BinarySysattrInput,
    pub subsystem_filter: SubsystemFilterInput,
    pub sysattr_filter: SysattrFilterInput,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchParentInput {
    /// Device whose subtree is enumerated
    pub parent_syspath: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubsystemSysnameInput {
    /// Lookups in order; the first failure exits with `len - index`
    pub lookups: Vec<NameLookup>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SysnameRoundTripInput {
    pub syspath: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SysattrValuesInput {
    pub syspath: String,
    /// Attribute name that should not exist on the device
    pub bogus_attribute: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ValuelessAttributesInput {
    /// Restrict the survey to one subsystem
    pub subsystem: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubsystemlessEnumerationInput {
    /// A device known to have no subsystem
    #[serde(default)]
    pub syspath: Option<String>,
    /// Search the ancestors of this device instead; wins over `syspath`
    pub ancestor_of: Option<NameLookup>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BinarySysattrInput {
    pub attribute: String,
    /// Device on which the library reports the attribute as empty
    pub empty_syspath: String,
    /// Device on which the library reports the attribute with content
    pub populated_syspath: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubsystemFilterInput {
    pub subsystem: String,
    pub mode: FilterMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SysattrFilterInput {
    pub syspath: String,
    pub attribute: String,
    pub mode: FilterMode,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            candidates: crate::device::DEFAULT_CANDIDATES
                .iter()
                .map(|c| c.to_string())
                .collect(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            log_to_file: false,
            log_file: PathBuf::from("./udev-repro.log"),
        }
    }
}

impl Default for MatchParentInput {
    fn default() -> Self {
        Self {
            parent_syspath: "/sys/devices/system/memory".to_string(),
        }
    }
}

impl Default for SubsystemSysnameInput {
    fn default() -> Self {
        Self {
            lookups: vec![
                NameLookup::new("block", "sdaj"),
                NameLookup::new("input", "event0"),
                NameLookup::new("iLO", "hpilo/d0ccb10"),
            ],
        }
    }
}

impl Default for SysnameRoundTripInput {
    fn default() -> Self {
        Self {
            syspath: "/sys/devices/pci0000:00/0000:00:1c.2/0000:01:00.2/iLO/hpilo!d0ccb0"
                .to_string(),
        }
    }
}

impl Default for SysattrValuesInput {
    fn default() -> Self {
        Self {
            syspath: "/sys/devices/LNXSYSTM:00/LNXSYBUS:00/PNP0A08:00/device:26/device:27"
                .to_string(),
            bogus_attribute: "bogus".to_string(),
        }
    }
}

impl Default for SubsystemlessEnumerationInput {
    fn default() -> Self {
        Self {
            syspath: Some("/sys/devices/pci0000:00/0000:00:1f.2/ata1".to_string()),
            ancestor_of: None,
        }
    }
}

impl Default for BinarySysattrInput {
    fn default() -> Self {
        Self {
            attribute: "vpd_pg83".to_string(),
            empty_syspath:
                "/sys/devices/pci0000:00/0000:00:03.0/0000:03:00.0/host1/target1:0:0/1:0:0:0"
                    .to_string(),
            populated_syspath:
                "/sys/devices/pci0000:80/0000:80:02.0/0000:81:00.0/host2/target2:0:9/2:0:9:0"
                    .to_string(),
        }
    }
}

impl Default for SubsystemFilterInput {
    fn default() -> Self {
        Self {
            subsystem: "i2c".to_string(),
            mode: FilterMode::None,
        }
    }
}

impl Default for SysattrFilterInput {
    fn default() -> Self {
        Self {
            syspath: "/sys/devices/LNXSYSTM:00/LNXSYBUS:00/PNP0A08:00".to_string(),
            attribute: "path".to_string(),
            mode: FilterMode::Match,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(path.to_path_buf(), e.to_string()))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;

        Ok(config)
    }

    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./udev-repro.toml (current directory)
    /// 2. Standard config location
    ///
    /// If no config file is found, returns default configuration.
    pub fn load_default() -> Result<Self, ConfigError> {
        let local = PathBuf::from(".").join(LOCAL_CONFIG_FILE_NAME);
        if local.exists() {
            return Self::load(&local);
        }

        if let Some(config_path) = get_config_path() {
            if config_path.exists() {
                return Self::load(&config_path);
            }
        }

        Ok(Self::default())
    }

    /// Get the path where the config file is (or would be) located.
    pub fn get_active_config_path() -> PathBuf {
        let local = PathBuf::from(".").join(LOCAL_CONFIG_FILE_NAME);
        if local.exists() {
            return local;
        }

        get_config_path().unwrap_or(local)
    }

    /// Save configuration to a file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        fs::write(path.as_ref(), content)
            .map_err(|e| ConfigError::WriteError(path.as_ref().to_path_buf(), e.to_string()))?;

        Ok(())
    }

    /// Generate a default config file with comments
    pub fn generate_default_config() -> String {
        include_str!("../../config.example.toml").to_string()
    }

    /// Library candidates with an optional command-line override in front
    pub fn library_candidates(&self, preferred: Option<&str>) -> Vec<String> {
        let mut candidates = Vec::with_capacity(self.library.candidates.len() + 1);
        if let Some(name) = preferred {
            candidates.push(name.to_string());
        }
        candidates.extend(
            self.library
                .candidates
                .iter()
                .filter(|c| Some(c.as_str()) != preferred)
                .cloned(),
        );
        candidates
    }
}

/// Errors from loading, writing or opening the configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no config file at {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("cannot read {}: {1}", .0.display())]
    ReadError(PathBuf, String),

    /// Invalid TOML or a value of the wrong type
    #[error("cannot parse {}: {1}", .0.display())]
    ParseError(PathBuf, String),

    #[error("cannot serialize configuration: {0}")]
    SerializeError(String),

    #[error("cannot write {}: {1}", .0.display())]
    WriteError(PathBuf, String),

    /// `dirs::config_dir()` had no answer for this user
    #[error("no configuration directory for this user")]
    ConfigDirNotFound,

    #[error("cannot open {} in an editor: {1}", .0.display())]
    OpenError(PathBuf, String),
}
