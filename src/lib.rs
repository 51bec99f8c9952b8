//! BlackBox: configuration and control plane for embedded devices
//!
//! Hardware interfaces and servers of a device are described by persisted,
//! validated configuration objects collected in a [`BlackBox`] registry. A
//! [`RegisterMapGateway`] exposes the registry as a Modbus register map so
//! any Modbus client can inspect and reconfigure the device.
//!
//! The workspace packages are re-exported here:
//! - [`storage`]: key/value stores the configuration is persisted in
//! - [`core`]: configuration parameters, objects, driver traits and the registry
//! - [`protocol`]: register map layout, memory areas and the Modbus frame adapter
//!
//! The binary helpers (logger bootstrap, device description file, simulated
//! drivers and the TCP listener) live in this crate.

pub mod boot;
pub mod config;
pub mod server;
pub mod simulated;

pub use blackbox_core as core;
pub use blackbox_protocol as protocol;
pub use blackbox_utils as storage;

pub use blackbox_core::{BlackBox, Configuration, FirmwareInfo, HardwareInfo, Version};
pub use blackbox_protocol::{MemoryMap, RegisterMapGateway};
pub use config::DeviceConfig;
