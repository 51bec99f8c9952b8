//! Device registry
//!
//! [`BlackBox`] owns the ordered hardware interface and server configurations of
//! the device. Insertion order is the index used by the register map. The
//! collection locks are only held long enough to clone the `Arc`s out, so work on
//! one configuration never blocks access to another.

use parking_lot::{Mutex, RwLock};
use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use blackbox_utils::{KeyValueStore, Namespace};

use crate::{
    configuration::{
        Configuration, GeneralConfiguration, HardwareInterfaceConfiguration, ServerConfiguration,
    },
    drivers::{
        SharedHardwareInterface, SharedModbusServer, SharedNetworkInterface, SharedNetworkServer,
        SharedServer, SharedUart, SharedWiFiStation,
    },
    error::{Error, Result},
};

pub const DEFAULT_HARDWARE_INFO_NAMESPACE: &str = "plbbHwInfo";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Version {
    pub major: u16,
    pub minor: u16,
    pub patch: u16,
}

impl Version {
    pub const fn new(major: u16, minor: u16, patch: u16) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Board identity, provisioned into storage at manufacturing time
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HardwareInfo {
    pub name: String,
    pub version: Version,
    pub uid: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FirmwareInfo {
    pub name: String,
    pub version: Version,
}

struct HardwareInfoCache {
    namespace: String,
    info: Option<HardwareInfo>,
}

type RestartHandler = Arc<dyn Fn() + Send + Sync>;

pub struct BlackBox {
    store: Arc<dyn KeyValueStore>,
    general: Arc<GeneralConfiguration>,
    firmware_info: FirmwareInfo,
    hardware_info: Mutex<HardwareInfoCache>,
    restarted: AtomicBool,
    restart_handler: RwLock<RestartHandler>,
    hardware_interfaces: RwLock<Vec<Arc<HardwareInterfaceConfiguration>>>,
    servers: RwLock<Vec<Arc<ServerConfiguration>>>,
    others: RwLock<Vec<Arc<dyn Configuration>>>,
}

impl BlackBox {
    pub fn new(store: Arc<dyn KeyValueStore>, firmware_info: FirmwareInfo) -> Self {
        let restart_handler: RestartHandler = Arc::new(|| {
            log::warn!("Restart requested, terminating the process");
            std::process::exit(0);
        });
        Self {
            store,
            general: Arc::new(GeneralConfiguration::default()),
            firmware_info,
            hardware_info: Mutex::new(HardwareInfoCache {
                namespace: DEFAULT_HARDWARE_INFO_NAMESPACE.to_string(),
                info: None,
            }),
            restarted: AtomicBool::new(true),
            restart_handler: RwLock::new(restart_handler),
            hardware_interfaces: RwLock::new(Vec::new()),
            servers: RwLock::new(Vec::new()),
            others: RwLock::new(Vec::new()),
        }
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    pub fn general_configuration(&self) -> &Arc<GeneralConfiguration> {
        &self.general
    }

    pub fn device_name(&self) -> String {
        self.general.device_name()
    }

    pub fn set_device_name(&self, name: impl Into<String>) {
        self.general.set_device_name(name);
    }

    pub fn firmware_info(&self) -> &FirmwareInfo {
        &self.firmware_info
    }

    /// Hardware info, read from storage on first access and cached afterwards
    pub fn hardware_info(&self) -> Result<HardwareInfo> {
        let mut cache = self.hardware_info.lock();
        if let Some(info) = &cache.info {
            return Ok(info.clone());
        }

        let namespace = Namespace::new(self.store.as_ref(), &cache.namespace);
        let mut info = HardwareInfo::default();
        if let Some(name) = namespace.read_string("name")? {
            info.name = name;
        }
        if let Some(major) = namespace.read_u16("verMajor")? {
            info.version.major = major;
        }
        if let Some(minor) = namespace.read_u16("verMinor")? {
            info.version.minor = minor;
        }
        if let Some(patch) = namespace.read_u16("verPatch")? {
            info.version.patch = patch;
        }
        if let Some(uid) = namespace.read_string("uid")? {
            info.uid = uid;
        }

        log::debug!(
            "Loaded hardware info from {}: {} {} ({})",
            cache.namespace,
            info.name,
            info.version,
            info.uid
        );
        cache.info = Some(info.clone());
        Ok(info)
    }

    pub fn hardware_info_namespace(&self) -> String {
        self.hardware_info.lock().namespace.clone()
    }

    /// Point hardware info at another namespace; the next read reloads it
    pub fn set_hardware_info_namespace(&self, namespace: impl Into<String>) {
        let mut cache = self.hardware_info.lock();
        cache.namespace = namespace.into();
        cache.info = None;
    }

    /// True from boot until explicitly cleared
    pub fn restarted_flag(&self) -> bool {
        self.restarted.load(Ordering::SeqCst)
    }

    pub fn clear_restarted_flag(&self) {
        if self.restarted.swap(false, Ordering::SeqCst) {
            log::info!("Restarted flag cleared");
        }
    }

    pub fn set_restart_handler(&self, handler: impl Fn() + Send + Sync + 'static) {
        *self.restart_handler.write() = Arc::new(handler);
    }

    /// Run the restart handler. The default one terminates the process.
    pub fn restart(&self) {
        let handler = self.restart_handler.read().clone();
        log::info!("Device restart requested");
        handler();
    }

    pub fn add_hardware_interface_configuration(
        &self,
        configuration: HardwareInterfaceConfiguration,
    ) -> Arc<HardwareInterfaceConfiguration> {
        let configuration = Arc::new(configuration);
        let mut list = self.hardware_interfaces.write();
        log::debug!(
            "Registered {} configuration {} at index {}",
            configuration.interface_type(),
            configuration.namespace(),
            list.len()
        );
        list.push(configuration.clone());
        configuration
    }

    pub fn add_generic_hardware_interface_configuration(
        &self,
        interface: SharedHardwareInterface,
        namespace: impl Into<String>,
    ) -> Arc<HardwareInterfaceConfiguration> {
        self.add_hardware_interface_configuration(HardwareInterfaceConfiguration::generic(
            interface, namespace,
        ))
    }

    pub fn add_uart_configuration(
        &self,
        uart: SharedUart,
        namespace: impl Into<String>,
    ) -> Arc<HardwareInterfaceConfiguration> {
        self.add_hardware_interface_configuration(HardwareInterfaceConfiguration::uart(
            uart, namespace,
        ))
    }

    pub fn add_network_interface_configuration(
        &self,
        interface: SharedNetworkInterface,
        namespace: impl Into<String>,
    ) -> Arc<HardwareInterfaceConfiguration> {
        self.add_hardware_interface_configuration(
            HardwareInterfaceConfiguration::network_interface(interface, namespace),
        )
    }

    pub fn add_ethernet_configuration(
        &self,
        interface: SharedNetworkInterface,
        namespace: impl Into<String>,
    ) -> Arc<HardwareInterfaceConfiguration> {
        self.add_hardware_interface_configuration(HardwareInterfaceConfiguration::ethernet(
            interface, namespace,
        ))
    }

    pub fn add_wifi_station_configuration(
        &self,
        station: SharedWiFiStation,
        namespace: impl Into<String>,
    ) -> Arc<HardwareInterfaceConfiguration> {
        self.add_hardware_interface_configuration(HardwareInterfaceConfiguration::wifi_station(
            station, namespace,
        ))
    }

    pub fn add_usb_device_cdc_configuration(
        &self,
        interface: SharedHardwareInterface,
        namespace: impl Into<String>,
    ) -> Arc<HardwareInterfaceConfiguration> {
        self.add_hardware_interface_configuration(HardwareInterfaceConfiguration::usb_device_cdc(
            interface, namespace,
        ))
    }

    pub fn add_server_configuration(
        &self,
        configuration: ServerConfiguration,
    ) -> Arc<ServerConfiguration> {
        let configuration = Arc::new(configuration);
        let mut list = self.servers.write();
        log::debug!(
            "Registered {} configuration {} at index {}",
            configuration.server_type(),
            configuration.namespace(),
            list.len()
        );
        list.push(configuration.clone());
        configuration
    }

    pub fn add_generic_server_configuration(
        &self,
        server: SharedServer,
        namespace: impl Into<String>,
    ) -> Arc<ServerConfiguration> {
        self.add_server_configuration(ServerConfiguration::generic(server, namespace))
    }

    pub fn add_stream_server_configuration(
        &self,
        server: SharedServer,
        namespace: impl Into<String>,
    ) -> Arc<ServerConfiguration> {
        self.add_server_configuration(ServerConfiguration::stream(server, namespace))
    }

    pub fn add_network_server_configuration(
        &self,
        server: SharedNetworkServer,
        namespace: impl Into<String>,
    ) -> Arc<ServerConfiguration> {
        self.add_server_configuration(ServerConfiguration::network(server, namespace))
    }

    pub fn add_http_server_configuration(
        &self,
        server: SharedNetworkServer,
        namespace: impl Into<String>,
    ) -> Arc<ServerConfiguration> {
        self.add_server_configuration(ServerConfiguration::http(server, namespace))
    }

    pub fn add_mdns_server_configuration(
        &self,
        server: SharedNetworkServer,
        namespace: impl Into<String>,
    ) -> Arc<ServerConfiguration> {
        self.add_server_configuration(ServerConfiguration::mdns(server, namespace))
    }

    pub fn add_modbus_server_configuration(
        &self,
        server: SharedModbusServer,
        namespace: impl Into<String>,
    ) -> Arc<ServerConfiguration> {
        self.add_server_configuration(ServerConfiguration::modbus(server, namespace))
    }

    /// Register an application-defined configuration for load/save/erase
    pub fn add_configuration(&self, configuration: Arc<dyn Configuration>) {
        self.others.write().push(configuration);
    }

    pub fn hardware_interface_configurations(&self) -> Vec<Arc<HardwareInterfaceConfiguration>> {
        self.hardware_interfaces.read().clone()
    }

    pub fn hardware_interface_configuration(
        &self,
        index: usize,
    ) -> Option<Arc<HardwareInterfaceConfiguration>> {
        self.hardware_interfaces.read().get(index).cloned()
    }

    pub fn hardware_interface_count(&self) -> usize {
        self.hardware_interfaces.read().len()
    }

    pub fn server_configurations(&self) -> Vec<Arc<ServerConfiguration>> {
        self.servers.read().clone()
    }

    pub fn server_configuration(&self, index: usize) -> Option<Arc<ServerConfiguration>> {
        self.servers.read().get(index).cloned()
    }

    pub fn server_count(&self) -> usize {
        self.servers.read().len()
    }

    fn all_configurations(&self) -> Vec<Arc<dyn Configuration>> {
        let mut all: Vec<Arc<dyn Configuration>> = vec![self.general.clone()];
        all.extend(
            self.hardware_interfaces
                .read()
                .iter()
                .map(|configuration| configuration.clone() as Arc<dyn Configuration>),
        );
        all.extend(
            self.servers
                .read()
                .iter()
                .map(|configuration| configuration.clone() as Arc<dyn Configuration>),
        );
        all.extend(self.others.read().iter().cloned());
        all
    }

    pub fn load_all_configurations(&self) -> Result<()> {
        for configuration in self.all_configurations() {
            configuration.load(self.store.as_ref())?;
        }
        log::info!("Configuration loaded");
        Ok(())
    }

    pub fn save_all_configurations(&self) -> Result<()> {
        self.save_all_configurations_within(None)
    }

    /// Save everything, failing with [`Error::LockTimeout`] instead of waiting
    /// longer than `timeout` for any one configuration.
    pub fn save_all_configurations_within(&self, timeout: Option<Duration>) -> Result<()> {
        for configuration in self.all_configurations() {
            configuration.save_within(self.store.as_ref(), timeout)?;
        }
        log::info!("Configuration saved");
        Ok(())
    }

    pub fn erase_all_configurations(&self) -> Result<()> {
        for configuration in self.all_configurations() {
            configuration.erase(self.store.as_ref())?;
        }
        log::info!("Configuration erased");
        Ok(())
    }

    /// Apply every hardware interface configuration, returning the first failure
    pub fn apply_hardware_interface_configurations(&self) -> Result<()> {
        apply_each(self.hardware_interface_configurations())
    }

    /// Apply every server configuration, returning the first failure
    pub fn apply_server_configurations(&self) -> Result<()> {
        apply_each(self.server_configurations())
    }
}

fn apply_each<C: Configuration + ?Sized>(configurations: Vec<Arc<C>>) -> Result<()> {
    let mut first_error: Option<Error> = None;
    for configuration in configurations {
        if let Err(err) = configuration.apply() {
            log::warn!("Failed to apply {}: {err}", configuration.namespace());
            first_error.get_or_insert(err);
        }
    }
    first_error.map_or(Ok(()), Err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{Journal, MockModbusServer, MockUart, MockWiFi};
    use blackbox_utils::MemoryStore;
    use std::sync::atomic::AtomicUsize;

    fn black_box(store: Arc<MemoryStore>) -> BlackBox {
        BlackBox::new(
            store,
            FirmwareInfo {
                name: "blackbox".into(),
                version: Version::new(1, 2, 3),
            },
        )
    }

    #[test]
    fn test_indices_follow_insertion_order() {
        let journal = Journal::default();
        let black_box = black_box(Arc::new(MemoryStore::new()));
        black_box.add_uart_configuration(MockUart::shared(&journal), "uart");
        black_box.add_wifi_station_configuration(MockWiFi::shared(&journal), "wifi");
        black_box.add_modbus_server_configuration(MockModbusServer::shared(&journal, None), "mb");

        assert_eq!(black_box.hardware_interface_count(), 2);
        assert_eq!(black_box.server_count(), 1);
        assert_eq!(
            black_box
                .hardware_interface_configuration(1)
                .map(|configuration| configuration.interface_type()),
            Some(crate::HardwareInterfaceType::WiFiStation)
        );
        assert!(black_box.hardware_interface_configuration(2).is_none());
    }

    #[test]
    fn test_hardware_info_is_cached_until_namespace_changes() {
        let store = Arc::new(MemoryStore::new());
        let namespace = Namespace::new(store.as_ref(), DEFAULT_HARDWARE_INFO_NAMESPACE);
        namespace.write_string("name", "PLBB-1").unwrap();
        namespace.write_u16("verMajor", 2).unwrap();
        namespace.write_string("uid", "0001").unwrap();

        let black_box = black_box(store.clone());
        let info = black_box.hardware_info().unwrap();
        assert_eq!(info.name, "PLBB-1");
        assert_eq!(info.version, Version::new(2, 0, 0));

        namespace.write_string("name", "changed").unwrap();
        assert_eq!(black_box.hardware_info().unwrap().name, "PLBB-1");

        Namespace::new(store.as_ref(), "factory")
            .write_string("name", "PLBB-2")
            .unwrap();
        black_box.set_hardware_info_namespace("factory");
        let info = black_box.hardware_info().unwrap();
        assert_eq!(info.name, "PLBB-2");
        assert_eq!(info.uid, "");
    }

    #[test]
    fn test_restarted_flag_clears_once() {
        let black_box = black_box(Arc::new(MemoryStore::new()));
        assert!(black_box.restarted_flag());
        black_box.clear_restarted_flag();
        assert!(!black_box.restarted_flag());
        black_box.clear_restarted_flag();
        assert!(!black_box.restarted_flag());
    }

    #[test]
    fn test_restart_runs_installed_handler() {
        let black_box = black_box(Arc::new(MemoryStore::new()));
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        black_box.set_restart_handler(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        black_box.restart();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_save_load_erase_all() {
        let journal = Journal::default();
        let store = Arc::new(MemoryStore::new());

        let saved = black_box(store.clone());
        saved.set_device_name("line-3");
        let uart = saved.add_uart_configuration(MockUart::shared(&journal), "uart");
        uart.disable_value_validation();
        uart.enabled.set_value(true).unwrap();
        saved.save_all_configurations().unwrap();
        assert!(store.contains_namespace("uart"));
        assert!(store.contains_namespace("plbbConfig"));

        let loaded = black_box(store.clone());
        let uart = loaded.add_uart_configuration(MockUart::shared(&journal), "uart");
        uart.disable_value_validation();
        loaded.load_all_configurations().unwrap();
        assert_eq!(loaded.device_name(), "line-3");
        assert!(uart.enabled.value());

        loaded.erase_all_configurations().unwrap();
        assert!(!store.contains_namespace("uart"));
        assert!(!store.contains_namespace("plbbConfig"));
    }

    #[test]
    fn test_bounded_save_gives_up_on_held_configuration() {
        let journal = Journal::default();
        let store = Arc::new(MemoryStore::new());
        let black_box = black_box(store.clone());
        let uart = black_box.add_uart_configuration(MockUart::shared(&journal), "uart");

        let guard = uart.lock(None).unwrap();
        let result = black_box.save_all_configurations_within(Some(Duration::from_millis(5)));
        assert!(matches!(result, Err(Error::LockTimeout { target }) if target == "uart"));
        assert!(!store.contains_namespace("uart"));

        drop(guard);
        black_box
            .save_all_configurations_within(Some(Duration::from_millis(5)))
            .unwrap();
        assert!(store.contains_namespace("uart"));
    }

    #[test]
    fn test_apply_continues_after_failure() {
        let journal = Journal::default();
        let black_box = black_box(Arc::new(MemoryStore::new()));
        let failing = MockUart::shared(&journal);
        failing.lock().fail_enable = true;
        let working = MockUart::shared(&journal);

        for (entity, namespace) in [(failing, "uart0"), (working.clone(), "uart1")] {
            let configuration = black_box.add_uart_configuration(entity, namespace);
            configuration.disable_value_validation();
            configuration.enabled.set_value(true).unwrap();
        }

        assert!(black_box.apply_hardware_interface_configurations().is_err());
        assert!(working.lock().enabled);
    }
}
