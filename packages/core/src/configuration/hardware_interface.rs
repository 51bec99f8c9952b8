use parking_lot::{Mutex, MutexGuard};
use std::time::Duration;

use blackbox_utils::{KeyValueStore, Namespace};

use super::{
    lock_within, Configuration, HardwareInterfaceType, NetworkInterfaceConfiguration,
    NetworkStatus, WiFiStationConfiguration, ENABLED_KEY,
};
use crate::{
    drivers::{
        HardwareInterface, SharedHardwareInterface, SharedNetworkInterface, SharedUart,
        SharedWiFiStation, Uart, UartFlowControl, UartParity, UartStopBits,
    },
    error::{Error, Result},
    parameter::ConfigurationParameter,
};

pub struct UartConfiguration {
    pub baud_rate: ConfigurationParameter<u32>,
    pub data_bits: ConfigurationParameter<u16>,
    pub parity: ConfigurationParameter<UartParity>,
    pub stop_bits: ConfigurationParameter<UartStopBits>,
    pub flow_control: ConfigurationParameter<UartFlowControl>,
    uart: SharedUart,
}

impl UartConfiguration {
    fn new(uart: SharedUart) -> Self {
        let entity = uart.lock();
        let configuration = Self {
            baud_rate: ConfigurationParameter::new("baudRate", entity.baud_rate()),
            data_bits: ConfigurationParameter::new("dataBits", entity.data_bits()),
            parity: ConfigurationParameter::new("parity", entity.parity()),
            stop_bits: ConfigurationParameter::new("stopBits", entity.stop_bits()),
            flow_control: ConfigurationParameter::new("flowControl", entity.flow_control()),
            uart: uart.clone(),
        };
        drop(entity);
        configuration
    }

    pub fn uart(&self) -> &SharedUart {
        &self.uart
    }

    fn load(&self, namespace: &Namespace) -> Result<()> {
        self.baud_rate.load(namespace)?;
        self.data_bits.load(namespace)?;
        self.parity.load(namespace)?;
        self.stop_bits.load(namespace)?;
        self.flow_control.load(namespace)
    }

    fn save(&self, namespace: &Namespace) -> Result<()> {
        self.baud_rate.save(namespace)?;
        self.data_bits.save(namespace)?;
        self.parity.save(namespace)?;
        self.stop_bits.save(namespace)?;
        self.flow_control.save(namespace)
    }

    fn apply_to<U: Uart + ?Sized>(&self, entity: &mut U) -> anyhow::Result<()> {
        entity.set_baud_rate(self.baud_rate.value())?;
        entity.set_data_bits(self.data_bits.value())?;
        entity.set_parity(self.parity.value())?;
        entity.set_stop_bits(self.stop_bits.value())?;
        entity.set_flow_control(self.flow_control.value())
    }

    pub fn disable_value_validation(&self) {
        self.baud_rate.disable_value_validation();
        self.data_bits.disable_value_validation();
        self.parity.disable_value_validation();
        self.stop_bits.disable_value_validation();
        self.flow_control.disable_value_validation();
    }
}

/// Type-specific part of a hardware interface configuration
pub enum HardwareInterfaceKind {
    Generic(SharedHardwareInterface),
    Uart(UartConfiguration),
    NetworkInterface(NetworkInterfaceConfiguration),
    Ethernet(NetworkInterfaceConfiguration),
    WiFiStation(WiFiStationConfiguration),
    UsbDeviceCdc(SharedHardwareInterface),
}

impl HardwareInterfaceKind {
    pub fn interface_type(&self) -> HardwareInterfaceType {
        match self {
            HardwareInterfaceKind::Generic(_) => HardwareInterfaceType::Unknown,
            HardwareInterfaceKind::Uart(_) => HardwareInterfaceType::Uart,
            HardwareInterfaceKind::NetworkInterface(_) => HardwareInterfaceType::NetworkInterface,
            HardwareInterfaceKind::Ethernet(_) => HardwareInterfaceType::Ethernet,
            HardwareInterfaceKind::WiFiStation(_) => HardwareInterfaceType::WiFiStation,
            HardwareInterfaceKind::UsbDeviceCdc(_) => HardwareInterfaceType::UsbDeviceCdc,
        }
    }

    fn is_entity_enabled(&self) -> bool {
        match self {
            HardwareInterfaceKind::Generic(entity) | HardwareInterfaceKind::UsbDeviceCdc(entity) => {
                entity.lock().is_enabled()
            }
            HardwareInterfaceKind::Uart(configuration) => configuration.uart.lock().is_enabled(),
            HardwareInterfaceKind::NetworkInterface(configuration)
            | HardwareInterfaceKind::Ethernet(configuration) => {
                configuration.interface.lock().is_enabled()
            }
            HardwareInterfaceKind::WiFiStation(configuration) => {
                configuration.station.lock().is_enabled()
            }
        }
    }
}

fn switch<I: HardwareInterface + ?Sized>(entity: &mut I, enabled: bool) -> anyhow::Result<()> {
    if enabled {
        entity.enable()
    } else {
        entity.disable()
    }
}

pub struct HardwareInterfaceConfiguration {
    namespace: String,
    lock: Mutex<()>,
    pub enabled: ConfigurationParameter<bool>,
    kind: HardwareInterfaceKind,
}

impl HardwareInterfaceConfiguration {
    fn with_kind(namespace: impl Into<String>, kind: HardwareInterfaceKind) -> Self {
        let enabled = ConfigurationParameter::new(ENABLED_KEY, kind.is_entity_enabled());
        Self {
            namespace: namespace.into(),
            lock: Mutex::new(()),
            enabled,
            kind,
        }
    }

    pub fn generic(interface: SharedHardwareInterface, namespace: impl Into<String>) -> Self {
        Self::with_kind(namespace, HardwareInterfaceKind::Generic(interface))
    }

    pub fn uart(uart: SharedUart, namespace: impl Into<String>) -> Self {
        Self::with_kind(
            namespace,
            HardwareInterfaceKind::Uart(UartConfiguration::new(uart)),
        )
    }

    pub fn network_interface(
        interface: SharedNetworkInterface,
        namespace: impl Into<String>,
    ) -> Self {
        Self::with_kind(
            namespace,
            HardwareInterfaceKind::NetworkInterface(NetworkInterfaceConfiguration::new(interface)),
        )
    }

    pub fn ethernet(interface: SharedNetworkInterface, namespace: impl Into<String>) -> Self {
        Self::with_kind(
            namespace,
            HardwareInterfaceKind::Ethernet(NetworkInterfaceConfiguration::new(interface)),
        )
    }

    pub fn wifi_station(station: SharedWiFiStation, namespace: impl Into<String>) -> Self {
        Self::with_kind(
            namespace,
            HardwareInterfaceKind::WiFiStation(WiFiStationConfiguration::new(station)),
        )
    }

    pub fn usb_device_cdc(interface: SharedHardwareInterface, namespace: impl Into<String>) -> Self {
        Self::with_kind(namespace, HardwareInterfaceKind::UsbDeviceCdc(interface))
    }

    pub fn kind(&self) -> &HardwareInterfaceKind {
        &self.kind
    }

    pub fn interface_type(&self) -> HardwareInterfaceType {
        self.kind.interface_type()
    }

    /// Guard serialising multi-field access to this configuration
    pub fn lock(&self, timeout: Option<Duration>) -> Result<MutexGuard<'_, ()>> {
        lock_within(&self.lock, timeout, &self.namespace)
    }

    /// Name reported by the live entity
    pub fn entity_name(&self, timeout: Option<Duration>) -> Result<String> {
        let target = &self.namespace;
        Ok(match &self.kind {
            HardwareInterfaceKind::Generic(entity) | HardwareInterfaceKind::UsbDeviceCdc(entity) => {
                lock_within(entity, timeout, target)?.name()
            }
            HardwareInterfaceKind::Uart(configuration) => {
                lock_within(&configuration.uart, timeout, target)?.name()
            }
            HardwareInterfaceKind::NetworkInterface(configuration)
            | HardwareInterfaceKind::Ethernet(configuration) => {
                lock_within(&configuration.interface, timeout, target)?.name()
            }
            HardwareInterfaceKind::WiFiStation(configuration) => {
                lock_within(&configuration.station, timeout, target)?.name()
            }
        })
    }

    /// Live state of the entity, `None` for kinds without an IP stack
    pub fn network_status(&self, timeout: Option<Duration>) -> Result<Option<NetworkStatus>> {
        let target = &self.namespace;
        Ok(match &self.kind {
            HardwareInterfaceKind::NetworkInterface(configuration)
            | HardwareInterfaceKind::Ethernet(configuration) => Some(NetworkStatus::capture(
                &*lock_within(&configuration.interface, timeout, target)?,
            )),
            HardwareInterfaceKind::WiFiStation(configuration) => Some(NetworkStatus::capture(
                &*lock_within(&configuration.station, timeout, target)?,
            )),
            _ => None,
        })
    }

    /// Open every parameter to any value
    pub fn disable_value_validation(&self) {
        self.enabled.disable_value_validation();
        match &self.kind {
            HardwareInterfaceKind::Uart(configuration) => configuration.disable_value_validation(),
            HardwareInterfaceKind::NetworkInterface(configuration)
            | HardwareInterfaceKind::Ethernet(configuration) => {
                configuration.network.disable_value_validation()
            }
            HardwareInterfaceKind::WiFiStation(configuration) => {
                configuration.disable_value_validation()
            }
            HardwareInterfaceKind::Generic(_) | HardwareInterfaceKind::UsbDeviceCdc(_) => {}
        }
    }

    fn push_to_entity(&self) -> anyhow::Result<()> {
        let enabled = self.enabled.value();
        match &self.kind {
            HardwareInterfaceKind::Generic(entity) | HardwareInterfaceKind::UsbDeviceCdc(entity) => {
                switch(&mut *entity.lock(), enabled)
            }
            HardwareInterfaceKind::Uart(configuration) => {
                let mut entity = configuration.uart.lock();
                configuration.apply_to(&mut *entity)?;
                switch(&mut *entity, enabled)
            }
            HardwareInterfaceKind::NetworkInterface(configuration)
            | HardwareInterfaceKind::Ethernet(configuration) => {
                let mut entity = configuration.interface.lock();
                configuration.network.apply_to(&mut *entity)?;
                switch(&mut *entity, enabled)
            }
            HardwareInterfaceKind::WiFiStation(configuration) => {
                let mut entity = configuration.station.lock();
                configuration.apply_to(&mut *entity)?;
                switch(&mut *entity, enabled)
            }
        }
    }
}

impl Configuration for HardwareInterfaceConfiguration {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn load(&self, store: &dyn KeyValueStore) -> Result<()> {
        let _guard = self.lock.lock();
        let namespace = Namespace::new(store, &self.namespace);
        match &self.kind {
            HardwareInterfaceKind::Uart(configuration) => configuration.load(&namespace)?,
            HardwareInterfaceKind::NetworkInterface(configuration)
            | HardwareInterfaceKind::Ethernet(configuration) => {
                configuration.network.load(&namespace)?
            }
            HardwareInterfaceKind::WiFiStation(configuration) => configuration.load(&namespace)?,
            HardwareInterfaceKind::Generic(_) | HardwareInterfaceKind::UsbDeviceCdc(_) => {}
        }
        self.enabled.load(&namespace)
    }

    fn save(&self, store: &dyn KeyValueStore) -> Result<()> {
        self.save_within(store, None)
    }

    fn save_within(&self, store: &dyn KeyValueStore, timeout: Option<Duration>) -> Result<()> {
        let _guard = self.lock(timeout)?;
        let namespace = Namespace::new(store, &self.namespace);
        match &self.kind {
            HardwareInterfaceKind::Uart(configuration) => configuration.save(&namespace)?,
            HardwareInterfaceKind::NetworkInterface(configuration)
            | HardwareInterfaceKind::Ethernet(configuration) => {
                configuration.network.save(&namespace)?
            }
            HardwareInterfaceKind::WiFiStation(configuration) => configuration.save(&namespace)?,
            HardwareInterfaceKind::Generic(_) | HardwareInterfaceKind::UsbDeviceCdc(_) => {}
        }
        self.enabled.save(&namespace)
    }

    fn apply(&self) -> Result<()> {
        let _guard = self.lock.lock();
        self.push_to_entity()
            .map_err(|err| Error::driver(self.namespace.clone(), err))?;
        log::debug!(
            "Applied {} configuration {} (enabled: {})",
            self.interface_type(),
            self.namespace,
            self.enabled.value()
        );
        Ok(())
    }
}
