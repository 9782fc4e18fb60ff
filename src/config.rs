//! Machine configuration records
//!
//! A machine is described as a list of devices, each with a kind, a base
//! address and an optional ROM source. The records are plain serde structs
//! read from JSON; numeric fields are range checked when the machine is
//! built from them.
//!
//! Example:
//! ```json
//! {
//!   "devices": [
//!     { "kind": "megarom", "base": 16384, "rom": { "path": "game.rom" }, "mapper": "konami5" },
//!     { "kind": "ram", "base": 49152, "size": 16384 }
//!   ]
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cartridge::RomPatch;
use crate::mappers::MapperType;
use crate::memory::ADDRESS_SPACE_SIZE;

/// Default size of a mega-ROM window: 0x4000 - 0xBFFF
pub const DEFAULT_MEGAROM_SIZE: u32 = 0x8000;

/// Default size of a RAM device
pub const DEFAULT_RAM_SIZE: u32 = 0x4000;

/// Largest image still treated as a plain ROM when no mapper is configured
pub const PLAIN_ROM_LIMIT: usize = 0x8000;

/// Errors that can occur when reading a machine configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("device {device}: unknown mapper type '{name}'")]
    UnknownMapper { device: String, name: String },

    #[error("device {device}: {field} ${value:X} is out of range")]
    InvalidNumber {
        device: String,
        field: &'static str,
        value: u64,
    },

    #[error("device {device}: a {kind} device needs a ROM image")]
    MissingRom { device: String, kind: DeviceKind },
}

/// What kind of device to instantiate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    Ram,
    Rom,
    Megarom,
}

impl std::fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            DeviceKind::Ram => "ram",
            DeviceKind::Rom => "rom",
            DeviceKind::Megarom => "megarom",
        })
    }
}

/// Where a ROM image comes from
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RomSource {
    pub path: PathBuf,

    /// Leading bytes to drop (file headers)
    #[serde(default)]
    pub skip_header: usize,

    /// Byte patches applied after loading
    #[serde(default)]
    pub patches: Vec<RomPatch>,
}

/// One device of the machine
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeviceConfig {
    /// Name used in logs; defaults to the kind
    #[serde(default)]
    pub name: Option<String>,

    pub kind: DeviceKind,

    /// First address of the device's window
    pub base: u64,

    /// Window size in bytes; defaults depend on the kind
    #[serde(default)]
    pub size: Option<u64>,

    #[serde(default)]
    pub rom: Option<RomSource>,

    /// Mapper override for mega-ROMs; detected from the image when absent
    #[serde(default)]
    pub mapper: Option<String>,
}

impl DeviceConfig {
    /// Name used in logs
    pub fn display_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.kind.to_string())
    }

    /// Checked base address
    pub fn base(&self) -> Result<u16, ConfigError> {
        u16::try_from(self.base).map_err(|_| self.invalid("base", self.base))
    }

    /// Checked window size, if configured
    pub fn size(&self) -> Result<Option<u32>, ConfigError> {
        match self.size {
            Some(size) if size == 0 || size > ADDRESS_SPACE_SIZE as u64 => {
                Err(self.invalid("size", size))
            }
            Some(size) => Ok(Some(size as u32)),
            None => Ok(None),
        }
    }

    /// Parsed mapper override
    pub fn mapper_type(&self) -> Result<Option<MapperType>, ConfigError> {
        self.mapper
            .as_deref()
            .map(|name| {
                name.parse().map_err(|_| ConfigError::UnknownMapper {
                    device: self.display_name(),
                    name: name.to_string(),
                })
            })
            .transpose()
    }

    /// ROM source, required for `rom` and `megarom` devices
    pub fn rom_source(&self) -> Result<&RomSource, ConfigError> {
        self.rom.as_ref().ok_or_else(|| ConfigError::MissingRom {
            device: self.display_name(),
            kind: self.kind,
        })
    }

    fn invalid(&self, field: &'static str, value: u64) -> ConfigError {
        ConfigError::InvalidNumber {
            device: self.display_name(),
            field,
            value,
        }
    }
}

/// The whole machine
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MachineConfig {
    pub devices: Vec<DeviceConfig>,
}

impl MachineConfig {
    /// Parse a configuration from JSON text
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Read a configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}
