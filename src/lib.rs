//! RustyMSX - the memory core of an MSX emulator
//!
//! Composes RAM, ROM and bank-switched cartridges into the Z80's 64KB address
//! space and gives the CPU core both a byte-level interface and direct cache
//! lines into backing storage, with explicit invalidation on every remap.

pub mod cartridge;
pub mod config;
pub mod device;
pub mod invalidate;
pub mod machine;
pub mod mappers;
pub mod memory;
pub mod plain;
pub mod scc;
pub mod storage;
pub mod time;
pub mod util;

pub use cartridge::{MegaRomDevice, RomError, RomImage, RomPatch};
pub use config::{ConfigError, DeviceConfig, DeviceKind, MachineConfig};
pub use device::{CacheLine, DummyDevice, MemoryDevice, CACHE_LINE_SIZE};
pub use invalidate::{CacheInvalidator, InvalidationLog, InvalidatorRef, NoInvalidation};
pub use machine::{Machine, MachineError, MountedDevice};
pub use mappers::{guess_mapper_type, MapperState, MapperType};
pub use memory::{DeviceId, MemoryError, MultiMemDevice};
pub use time::EmuTime;
