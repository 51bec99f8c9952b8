//! Persisted, validated configuration objects bound to live entities
//!
//! Each object owns one storage namespace and one live entity handle for its
//! whole lifetime. Values are buffered in [`ConfigurationParameter`]s and only
//! reach the entity through [`Configuration::apply`].
//!
//! Lock order is configuration first, then the entity, then (for Modbus servers)
//! the transport server underneath.
//!
//! [`ConfigurationParameter`]: crate::parameter::ConfigurationParameter

mod general;
mod hardware_interface;
mod network_interface;
mod server;

pub use general::{GeneralConfiguration, DEFAULT_GENERAL_NAMESPACE};
pub use hardware_interface::{
    HardwareInterfaceConfiguration, HardwareInterfaceKind, UartConfiguration,
};
pub use network_interface::{
    NetworkInterfaceConfiguration, NetworkParameters, NetworkStatus, WiFiStationConfiguration,
};
pub use server::{
    ModbusServerConfiguration, NetworkServerConfiguration, ServerConfiguration, ServerKind,
};

use num_enum::{IntoPrimitive, TryFromPrimitive};
use parking_lot::{Mutex, MutexGuard};
use std::time::Duration;
use strum::{Display, EnumIter};

use blackbox_utils::{KeyValueStore, Namespace};

use crate::error::{Error, Result};

/// Storage key shared by every hardware interface and server configuration
pub const ENABLED_KEY: &str = "enabled";

pub trait Configuration: Send + Sync {
    fn namespace(&self) -> &str;

    /// Read every persisted key that exists; missing keys keep their value.
    fn load(&self, store: &dyn KeyValueStore) -> Result<()>;

    /// Write every key unconditionally.
    fn save(&self, store: &dyn KeyValueStore) -> Result<()>;

    /// [`save`](Self::save), giving up with [`Error::LockTimeout`] when the
    /// configuration stays locked longer than `timeout`.
    fn save_within(&self, store: &dyn KeyValueStore, _timeout: Option<Duration>) -> Result<()> {
        self.save(store)
    }

    fn erase(&self, store: &dyn KeyValueStore) -> Result<()> {
        Namespace::new(store, self.namespace()).erase()?;
        log::debug!("Erased configuration namespace {}", self.namespace());
        Ok(())
    }

    /// Push every value into the live entity, switching it on or off last.
    fn apply(&self) -> Result<()>;
}

/// Wire discriminant of a hardware interface configuration
#[repr(u16)]
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive, Display, EnumIter,
)]
#[strum(serialize_all = "snake_case")]
pub enum HardwareInterfaceType {
    Unknown = 0,
    Uart = 1,
    NetworkInterface = 2,
    Ethernet = 3,
    WiFiStation = 4,
    UsbDeviceCdc = 5,
}

/// Wire discriminant of a server configuration
#[repr(u16)]
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive, Display, EnumIter,
)]
#[strum(serialize_all = "snake_case")]
pub enum ServerType {
    Unknown = 0,
    StreamServer = 1,
    NetworkServer = 2,
    StreamModbusServer = 3,
    NetworkModbusServer = 4,
    HttpServer = 5,
    MdnsServer = 6,
}

/// Lock `mutex`, giving up after `timeout` when one is given
pub(crate) fn lock_within<'a, T: ?Sized>(
    mutex: &'a Mutex<T>,
    timeout: Option<Duration>,
    target: &str,
) -> Result<MutexGuard<'a, T>> {
    match timeout {
        None => Ok(mutex.lock()),
        Some(timeout) => mutex
            .try_lock_for(timeout)
            .ok_or_else(|| Error::lock_timeout(target)),
    }
}
