//! Device description file
//!
//! A TOML file lists the hardware interfaces and servers to register, in map
//! order. Every entity is backed by a simulated driver.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    net::{Ipv4Addr, SocketAddr, SocketAddrV4},
    path::{Path, PathBuf},
};

use blackbox_core::{
    configuration::{HardwareInterfaceKind, ServerKind},
    drivers::{
        ModbusProtocol, ModbusTransport, SharedModbusServer, SharedNetworkServer, SharedServer,
    },
    BlackBox, FirmwareInfo, HardwareInterfaceConfiguration, ServerConfiguration, Version,
};

use crate::simulated::{
    SimulatedHardwareInterface, SimulatedModbusServer, SimulatedNetworkInterface,
    SimulatedNetworkServer, SimulatedServer, SimulatedUart,
};

pub const DEFAULT_LISTEN: SocketAddr =
    SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 5020));

const STANDARD_BAUD_RATES: [u32; 11] = [
    1200, 2400, 4800, 9600, 19200, 38400, 57600, 115200, 230400, 460800, 921600,
];

/// Which values a configuration accepts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Validation {
    /// Anything the field can encode
    #[default]
    Open,
    /// Values a real device would accept
    Strict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterfaceKind {
    Generic,
    Uart,
    NetworkInterface,
    Ethernet,
    WifiStation,
    UsbDeviceCdc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareInterfaceEntry {
    pub kind: InterfaceKind,
    pub name: String,
    /// Storage namespace, the name when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default)]
    pub validation: Validation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerKindName {
    Generic,
    Stream,
    Network,
    Http,
    Mdns,
    Modbus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    Stream,
    Network,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerEntry {
    pub kind: ServerKindName,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Port of network servers and of Modbus network transports
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_clients: Option<u16>,
    /// Modbus servers only; no transport when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport: Option<TransportKind>,
    #[serde(default)]
    pub validation: Validation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirmwareEntry {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Device name used until one is stored
    pub device_name: String,
    pub storage: PathBuf,
    pub listen: SocketAddr,
    pub unit_id: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firmware: Option<FirmwareEntry>,
    pub hardware_interfaces: Vec<HardwareInterfaceEntry>,
    pub servers: Vec<ServerEntry>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        let interface = |kind, name: &str| HardwareInterfaceEntry {
            kind,
            name: name.to_string(),
            namespace: None,
            validation: Validation::Open,
        };
        let server = |kind, name: &str, port, transport| ServerEntry {
            kind,
            name: name.to_string(),
            namespace: None,
            port,
            max_clients: port.map(|_| 4),
            transport,
            validation: Validation::Open,
        };
        Self {
            device_name: "blackbox".to_string(),
            storage: PathBuf::from("blackbox-config.json"),
            listen: DEFAULT_LISTEN,
            unit_id: 1,
            firmware: None,
            hardware_interfaces: vec![
                interface(InterfaceKind::Uart, "uart0"),
                interface(InterfaceKind::Ethernet, "eth0"),
                interface(InterfaceKind::WifiStation, "wlan0"),
            ],
            servers: vec![
                server(
                    ServerKindName::Modbus,
                    "mbRtu",
                    None,
                    Some(TransportKind::Stream),
                ),
                server(
                    ServerKindName::Modbus,
                    "mbTcp",
                    Some(502),
                    Some(TransportKind::Network),
                ),
                server(ServerKindName::Http, "http", Some(80), None),
            ],
        }
    }
}

fn namespace_of<'a>(namespace: &'a Option<String>, name: &'a str) -> &'a str {
    namespace.as_deref().unwrap_or(name)
}

fn version_part(part: u64) -> u16 {
    u16::try_from(part).unwrap_or(u16::MAX)
}

fn parse_version(text: &str) -> Result<Version> {
    let version = semver::Version::parse(text)
        .with_context(|| format!("Invalid firmware version '{text}'"))?;
    Ok(Version::new(
        version_part(version.major),
        version_part(version.minor),
        version_part(version.patch),
    ))
}

impl DeviceConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read device description {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("Invalid device description {}", path.display()))
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Firmware identity, defaulting to this crate's name and version
    pub fn firmware_info(&self) -> Result<FirmwareInfo> {
        let (name, version) = match &self.firmware {
            Some(firmware) => (firmware.name.clone(), firmware.version.as_str()),
            None => (
                env!("CARGO_PKG_NAME").to_string(),
                env!("CARGO_PKG_VERSION"),
            ),
        };
        Ok(FirmwareInfo {
            name,
            version: parse_version(version)?,
        })
    }

    /// Create the simulated entities and register their configurations in order
    pub fn register(&self, black_box: &BlackBox) -> Result<()> {
        black_box.set_device_name(self.device_name.clone());
        for entry in &self.hardware_interfaces {
            let configuration = register_hardware_interface(black_box, entry);
            match entry.validation {
                Validation::Open => configuration.disable_value_validation(),
                Validation::Strict => strict_hardware_interface(&configuration),
            }
        }
        for entry in &self.servers {
            let configuration = register_server(black_box, entry)?;
            match entry.validation {
                Validation::Open => configuration.disable_value_validation(),
                Validation::Strict => strict_server(&configuration),
            }
        }
        log::info!(
            "Registered {} hardware interface(s) and {} server(s)",
            black_box.hardware_interface_count(),
            black_box.server_count()
        );
        Ok(())
    }
}

fn register_hardware_interface(
    black_box: &BlackBox,
    entry: &HardwareInterfaceEntry,
) -> std::sync::Arc<HardwareInterfaceConfiguration> {
    let namespace = namespace_of(&entry.namespace, &entry.name);
    let name = entry.name.as_str();
    match entry.kind {
        InterfaceKind::Generic => black_box.add_generic_hardware_interface_configuration(
            SimulatedHardwareInterface::shared(name),
            namespace,
        ),
        InterfaceKind::UsbDeviceCdc => black_box
            .add_usb_device_cdc_configuration(SimulatedHardwareInterface::shared(name), namespace),
        InterfaceKind::Uart => {
            black_box.add_uart_configuration(SimulatedUart::shared(name), namespace)
        }
        InterfaceKind::NetworkInterface => black_box.add_network_interface_configuration(
            SimulatedNetworkInterface::ethernet(name),
            namespace,
        ),
        InterfaceKind::Ethernet => black_box
            .add_ethernet_configuration(SimulatedNetworkInterface::ethernet(name), namespace),
        InterfaceKind::WifiStation => black_box
            .add_wifi_station_configuration(SimulatedNetworkInterface::wifi(name), namespace),
    }
}

fn register_server(
    black_box: &BlackBox,
    entry: &ServerEntry,
) -> Result<std::sync::Arc<ServerConfiguration>> {
    let namespace = namespace_of(&entry.namespace, &entry.name);
    let name = entry.name.as_str();
    let network = || -> Result<SharedNetworkServer> {
        let port = entry
            .port
            .with_context(|| format!("Server {name} needs a port"))?;
        Ok(SimulatedNetworkServer::shared(
            name,
            port,
            entry.max_clients.unwrap_or(4),
        ))
    };

    Ok(match entry.kind {
        ServerKindName::Generic => {
            black_box.add_generic_server_configuration(SimulatedServer::shared(name), namespace)
        }
        ServerKindName::Stream => {
            black_box.add_stream_server_configuration(SimulatedServer::shared(name), namespace)
        }
        ServerKindName::Network => black_box.add_network_server_configuration(network()?, namespace),
        ServerKindName::Http => black_box.add_http_server_configuration(network()?, namespace),
        ServerKindName::Mdns => black_box.add_mdns_server_configuration(network()?, namespace),
        ServerKindName::Modbus => {
            let (protocol, transport) = match entry.transport {
                Some(TransportKind::Network) => {
                    (ModbusProtocol::Tcp, Some(ModbusTransport::Network(network()?)))
                }
                Some(TransportKind::Stream) => {
                    let stream: SharedServer = SimulatedServer::shared(format!("{name}-stream"));
                    (ModbusProtocol::Rtu, Some(ModbusTransport::Stream(stream)))
                }
                None => (ModbusProtocol::Rtu, None),
            };
            let server: SharedModbusServer = SimulatedModbusServer::shared(name, protocol, transport);
            black_box.add_modbus_server_configuration(server, namespace)
        }
    })
}

fn strict_hardware_interface(configuration: &HardwareInterfaceConfiguration) {
    configuration.disable_value_validation();
    match configuration.kind() {
        HardwareInterfaceKind::Uart(uart) => {
            uart.baud_rate.set_valid_values(STANDARD_BAUD_RATES.to_vec());
            uart.data_bits.set_value_validator(|bits| (7..=8).contains(bits));
        }
        HardwareInterfaceKind::WiFiStation(station) => {
            station.ssid.set_value_validator(|ssid| ssid.len() <= 32);
            station
                .password
                .set_value_validator(|password| password.is_empty() || (8..=64).contains(&password.len()));
        }
        _ => {}
    }
}

fn strict_server(configuration: &ServerConfiguration) {
    configuration.disable_value_validation();
    match configuration.kind() {
        ServerKind::Network(network) | ServerKind::Http(network) | ServerKind::Mdns(network) => {
            network.port.set_value_validator(|port| *port != 0);
            network
                .max_clients
                .set_value_validator(|max_clients| (1..=16).contains(max_clients));
        }
        ServerKind::Modbus(modbus) => {
            modbus
                .station_address
                .set_value_validator(|address| (1..=247).contains(address));
        }
        ServerKind::Generic(_) | ServerKind::Stream(_) => {}
    }
}
