//! BlackBox configuration model
//!
//! This package holds everything the register map projects:
//! - Validated configuration parameters
//! - Capability traits of live hardware interfaces and servers
//! - Configuration objects with load/save/erase/apply against a key/value store
//! - The [`BlackBox`] device registry

pub mod configuration;
pub mod drivers;
pub mod error;
pub mod parameter;
pub mod registry;

#[cfg(test)]
mod mock;

pub use configuration::{
    Configuration, HardwareInterfaceConfiguration, HardwareInterfaceType, ServerConfiguration,
    ServerType,
};
pub use error::{Error, Result};
pub use parameter::ConfigurationParameter;
pub use registry::{BlackBox, FirmwareInfo, HardwareInfo, Version};
