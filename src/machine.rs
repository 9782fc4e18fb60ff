//! MSX memory system
//!
//! This module ties the memory core together: it builds devices from a
//! [`MachineConfig`], registers them in the address space and offers the
//! interface the CPU core drives. The machine owns every device it mounts and
//! unregisters all of them when it is dropped.

use log::info;
use thiserror::Error;

use crate::cartridge::{MegaRomDevice, RomError, RomImage};
use crate::config::{
    ConfigError, DeviceConfig, DeviceKind, MachineConfig, DEFAULT_MEGAROM_SIZE, DEFAULT_RAM_SIZE,
    PLAIN_ROM_LIMIT,
};
use crate::device::{CacheLine, MemoryDevice};
use crate::invalidate::InvalidatorRef;
use crate::mappers::MapperType;
use crate::memory::{DeviceId, MemoryError, MultiMemDevice, RangeInfo, ADDRESS_SPACE_SIZE};
use crate::plain::{RamDevice, RomDevice};
use crate::time::EmuTime;

/// Errors that can occur when building a machine
#[derive(Error, Debug)]
pub enum MachineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Memory(#[from] MemoryError),

    #[error("device {device}: {source}")]
    Rom {
        device: String,
        #[source]
        source: RomError,
    },
}

/// A device mounted by the machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountedDevice {
    pub id: DeviceId,
    pub base: u16,
    pub size: u32,

    /// Mapper in use, for mega-ROM cartridges
    pub mapper: Option<MapperType>,
}

/// Represents the memory side of an MSX machine
pub struct Machine {
    /// The composed 64KB address space
    memory: MultiMemDevice,

    /// Everything registered in `memory`, in mount order
    mounted: Vec<MountedDevice>,

    /// Handed to every device that remaps memory
    invalidator: InvalidatorRef,
}

impl Machine {
    /// Create a machine with nothing mapped
    pub fn new(invalidator: InvalidatorRef) -> Self {
        Machine {
            memory: MultiMemDevice::new(invalidator.clone()),
            mounted: Vec::new(),
            invalidator,
        }
    }

    /// Build a machine from a configuration.
    ///
    /// Devices are mounted in order; the first failure aborts construction
    /// and everything mounted so far is released.
    pub fn from_config(config: &MachineConfig, invalidator: InvalidatorRef) -> Result<Self, MachineError> {
        let mut machine = Machine::new(invalidator);
        for device in &config.devices {
            machine.mount_config(device)?;
        }
        info!("Machine ready with {} devices", machine.mounted.len());
        Ok(machine)
    }

    /// Instantiate and register one configured device
    pub fn mount_config(&mut self, config: &DeviceConfig) -> Result<DeviceId, MachineError> {
        let name = config.display_name();
        let base = config.base()?;
        let size = config.size()?;

        let id = match config.kind {
            DeviceKind::Ram => {
                self.insert_ram(name, base, size.unwrap_or(DEFAULT_RAM_SIZE))?
            }
            DeviceKind::Rom => {
                let image = Self::load_image(&name, config)?;
                self.insert_rom(name, base, size, image)?
            }
            DeviceKind::Megarom => {
                let mapper = config.mapper_type()?;
                let image = Self::load_image(&name, config)?;
                self.insert_cartridge(name, base, size.unwrap_or(DEFAULT_MEGAROM_SIZE), image, mapper)?
            }
        };
        Ok(id)
    }

    fn load_image(name: &str, config: &DeviceConfig) -> Result<RomImage, MachineError> {
        let source = config.rom_source()?;
        RomImage::from_file(&source.path, source.skip_header, &source.patches).map_err(|source| {
            MachineError::Rom {
                device: name.to_string(),
                source,
            }
        })
    }

    /// Register an arbitrary device
    pub fn insert(
        &mut self,
        device: Box<dyn MemoryDevice>,
        base: u16,
        size: u32,
    ) -> Result<DeviceId, MemoryError> {
        self.insert_with_mapper(device, base, size, None)
    }

    fn insert_with_mapper(
        &mut self,
        device: Box<dyn MemoryDevice>,
        base: u16,
        size: u32,
        mapper: Option<MapperType>,
    ) -> Result<DeviceId, MemoryError> {
        let id = self.memory.add(device, base, size)?;
        self.mounted.push(MountedDevice {
            id,
            base,
            size,
            mapper,
        });
        Ok(id)
    }

    /// Mount `size` bytes of RAM at `base`
    pub fn insert_ram(&mut self, name: impl Into<String>, base: u16, size: u32) -> Result<DeviceId, MemoryError> {
        let ram = RamDevice::new(name, base, size as usize);
        self.insert(Box::new(ram), base, size)
    }

    /// Mount a plain ROM at `base`.
    ///
    /// Without an explicit size the window covers the image, cut off at the
    /// end of the address space.
    pub fn insert_rom(
        &mut self,
        name: impl Into<String>,
        base: u16,
        size: Option<u32>,
        image: RomImage,
    ) -> Result<DeviceId, MemoryError> {
        let room = ADDRESS_SPACE_SIZE - base as u32;
        let size = size.unwrap_or_else(|| (image.len() as u32).min(room));
        let rom = RomDevice::new(name, base, image.into_bytes());
        self.insert(Box::new(rom), base, size)
    }

    /// Mount a cartridge over `[base, base + size)`.
    ///
    /// A cartridge with no configured mapper that fits in 32KB is a plain
    /// ROM; anything larger gets a detected mapper.
    pub fn insert_cartridge(
        &mut self,
        name: impl Into<String>,
        base: u16,
        size: u32,
        image: RomImage,
        mapper: Option<MapperType>,
    ) -> Result<DeviceId, MemoryError> {
        let name = name.into();
        if mapper.is_none() && image.len() <= PLAIN_ROM_LIMIT {
            info!("{}: {}KB image, mounting as plain ROM", name, image.len() / 1024);
            return self.insert_rom(name, base, Some(size), image);
        }

        let mapper_type = image.mapper_type(mapper);
        if mapper.is_none() {
            info!("{}: detected mapper {}", name, mapper_type);
        }
        let cartridge = MegaRomDevice::new(name, image, mapper_type, self.invalidator.clone());
        self.insert_with_mapper(Box::new(cartridge), base, size, Some(mapper_type))
    }

    /// Unregister a device and hand it back
    pub fn remove(&mut self, id: DeviceId) -> Option<Box<dyn MemoryDevice>> {
        let index = self.mounted.iter().position(|m| m.id == id)?;
        let mounted = self.mounted.remove(index);
        Some(self.memory.remove(mounted.id, mounted.base, mounted.size))
    }

    /// Devices mounted so far, in mount order
    pub fn mounted(&self) -> &[MountedDevice] {
        &self.mounted
    }

    /// Registered ranges, in lookup order
    pub fn ranges(&self) -> Vec<RangeInfo> {
        self.memory.ranges()
    }

    /// The composed address space
    pub fn memory(&self) -> &MultiMemDevice {
        &self.memory
    }

    /// Borrow a mounted device
    pub fn device(&self, id: DeviceId) -> Option<&dyn MemoryDevice> {
        self.memory.device(id)
    }

    /// Reset a single mounted device; false if `id` is not mounted
    pub fn reset_device(&mut self, id: DeviceId, time: EmuTime) -> bool {
        match self.memory.device_mut(id) {
            Some(device) => {
                info!("Resetting {} at {}", device.name(), time);
                device.reset(time);
                true
            }
            None => false,
        }
    }

    #[inline]
    pub fn read_byte(&mut self, addr: u16, time: EmuTime) -> u8 {
        self.memory.read_byte(addr, time)
    }

    #[inline]
    pub fn write_byte(&mut self, addr: u16, value: u8, time: EmuTime) {
        self.memory.write_byte(addr, value, time)
    }

    #[inline]
    pub fn peek_byte(&self, addr: u16) -> u8 {
        self.memory.peek_byte(addr)
    }

    pub fn read_cache_line(&self, start: u16) -> Option<&CacheLine> {
        self.memory.read_cache_line(start)
    }

    pub fn write_cache_line(&mut self, start: u16) -> Option<&mut CacheLine> {
        self.memory.write_cache_line(start)
    }

    /// Peek `len` bytes from `start`, wrapping at the end of the address space
    pub fn peek_range(&self, start: u16, len: usize) -> Vec<u8> {
        (0..len)
            .map(|i| self.memory.peek_byte(start.wrapping_add(i as u16)))
            .collect()
    }

    /// Reset every mounted device
    pub fn reset(&mut self, time: EmuTime) {
        info!("Resetting machine at {}", time);
        self.memory.reset(time);
    }
}

impl Drop for Machine {
    fn drop(&mut self) {
        while let Some(mounted) = self.mounted.pop() {
            self.memory.remove(mounted.id, mounted.base, mounted.size);
        }
    }
}
