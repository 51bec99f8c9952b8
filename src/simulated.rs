//! In-process drivers for running the configuration plane without hardware
//!
//! They keep their state in plain fields and report every change at debug
//! level. Network interfaces hand out a fixed DHCP lease while a DHCP client
//! is enabled.

use anyhow::{ensure, Result};
use parking_lot::Mutex;
use std::{
    net::{Ipv4Addr, Ipv6Addr},
    sync::Arc,
};

use blackbox_core::drivers::{
    HardwareInterface, ModbusProtocol, ModbusServer, ModbusTransport, NetworkInterface,
    NetworkServer, Server, Uart, UartFlowControl, UartParity, UartStopBits, WiFiStation,
};

fn shared<T>(value: T) -> Arc<Mutex<T>> {
    Arc::new(Mutex::new(value))
}

/// Interface without settings of its own, such as a USB CDC device
#[derive(Debug, Clone)]
pub struct SimulatedHardwareInterface {
    pub name: String,
    pub enabled: bool,
}

impl SimulatedHardwareInterface {
    pub fn shared(name: impl Into<String>) -> Arc<Mutex<Self>> {
        shared(Self {
            name: name.into(),
            enabled: false,
        })
    }
}

impl HardwareInterface for SimulatedHardwareInterface {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn enable(&mut self) -> Result<()> {
        log::debug!("{}: enabled", self.name);
        self.enabled = true;
        Ok(())
    }

    fn disable(&mut self) -> Result<()> {
        log::debug!("{}: disabled", self.name);
        self.enabled = false;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SimulatedUart {
    pub name: String,
    pub enabled: bool,
    pub baud_rate: u32,
    pub data_bits: u16,
    pub parity: UartParity,
    pub stop_bits: UartStopBits,
    pub flow_control: UartFlowControl,
}

impl SimulatedUart {
    pub fn shared(name: impl Into<String>) -> Arc<Mutex<Self>> {
        shared(Self {
            name: name.into(),
            enabled: false,
            baud_rate: 115200,
            data_bits: 8,
            parity: UartParity::None,
            stop_bits: UartStopBits::One,
            flow_control: UartFlowControl::None,
        })
    }
}

impl HardwareInterface for SimulatedUart {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn enable(&mut self) -> Result<()> {
        log::debug!(
            "{}: enabled at {} baud, {} data bits, parity {}, stop bits {}",
            self.name,
            self.baud_rate,
            self.data_bits,
            self.parity,
            self.stop_bits
        );
        self.enabled = true;
        Ok(())
    }

    fn disable(&mut self) -> Result<()> {
        log::debug!("{}: disabled", self.name);
        self.enabled = false;
        Ok(())
    }
}

impl Uart for SimulatedUart {
    fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    fn set_baud_rate(&mut self, baud_rate: u32) -> Result<()> {
        ensure!(baud_rate > 0, "baud rate must not be zero");
        self.baud_rate = baud_rate;
        Ok(())
    }

    fn data_bits(&self) -> u16 {
        self.data_bits
    }

    fn set_data_bits(&mut self, data_bits: u16) -> Result<()> {
        ensure!((5..=9).contains(&data_bits), "unsupported data bits {data_bits}");
        self.data_bits = data_bits;
        Ok(())
    }

    fn parity(&self) -> UartParity {
        self.parity
    }

    fn set_parity(&mut self, parity: UartParity) -> Result<()> {
        self.parity = parity;
        Ok(())
    }

    fn stop_bits(&self) -> UartStopBits {
        self.stop_bits
    }

    fn set_stop_bits(&mut self, stop_bits: UartStopBits) -> Result<()> {
        self.stop_bits = stop_bits;
        Ok(())
    }

    fn flow_control(&self) -> UartFlowControl {
        self.flow_control
    }

    fn set_flow_control(&mut self, flow_control: UartFlowControl) -> Result<()> {
        self.flow_control = flow_control;
        Ok(())
    }
}

/// Addresses handed out while a DHCP client is enabled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DhcpLease {
    pub ipv4_address: Ipv4Addr,
    pub ipv4_netmask: Ipv4Addr,
    pub ipv4_gateway: Ipv4Addr,
    pub ipv6_global_address: Ipv6Addr,
}

impl Default for DhcpLease {
    fn default() -> Self {
        Self {
            ipv4_address: Ipv4Addr::new(192, 168, 4, 20),
            ipv4_netmask: Ipv4Addr::new(255, 255, 255, 0),
            ipv4_gateway: Ipv4Addr::new(192, 168, 4, 1),
            ipv6_global_address: Ipv6Addr::new(0x2001, 0xdb8, 0, 4, 0, 0, 0, 0x20),
        }
    }
}

/// Wired or wireless network interface
///
/// Static addresses are kept while a DHCP client runs and come back once it is
/// disabled. A wireless interface only connects once it has an SSID.
#[derive(Debug, Clone)]
pub struct SimulatedNetworkInterface {
    pub name: String,
    pub wireless: bool,
    pub enabled: bool,
    pub ipv4_dhcp_client: bool,
    pub ipv4_address: Ipv4Addr,
    pub ipv4_netmask: Ipv4Addr,
    pub ipv4_gateway: Ipv4Addr,
    pub ipv6_dhcp_client: bool,
    pub ipv6_global_address: Ipv6Addr,
    pub lease: DhcpLease,
    pub ssid: String,
    pub password: String,
}

impl SimulatedNetworkInterface {
    fn new(name: String, wireless: bool) -> Self {
        Self {
            name,
            wireless,
            enabled: false,
            ipv4_dhcp_client: true,
            ipv4_address: Ipv4Addr::UNSPECIFIED,
            ipv4_netmask: Ipv4Addr::UNSPECIFIED,
            ipv4_gateway: Ipv4Addr::UNSPECIFIED,
            ipv6_dhcp_client: true,
            ipv6_global_address: Ipv6Addr::UNSPECIFIED,
            lease: DhcpLease::default(),
            ssid: String::new(),
            password: String::new(),
        }
    }

    pub fn ethernet(name: impl Into<String>) -> Arc<Mutex<Self>> {
        shared(Self::new(name.into(), false))
    }

    pub fn wifi(name: impl Into<String>) -> Arc<Mutex<Self>> {
        shared(Self::new(name.into(), true))
    }

    fn has_lease(&self, dhcp_client: bool) -> bool {
        dhcp_client && self.is_connected()
    }
}

impl HardwareInterface for SimulatedNetworkInterface {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn enable(&mut self) -> Result<()> {
        self.enabled = true;
        log::debug!("{}: up (connected: {})", self.name, self.is_connected());
        Ok(())
    }

    fn disable(&mut self) -> Result<()> {
        log::debug!("{}: down", self.name);
        self.enabled = false;
        Ok(())
    }
}

impl NetworkInterface for SimulatedNetworkInterface {
    fn is_connected(&self) -> bool {
        self.enabled && (!self.wireless || !self.ssid.is_empty())
    }

    fn is_ipv4_dhcp_client_enabled(&self) -> bool {
        self.ipv4_dhcp_client
    }

    fn enable_ipv4_dhcp_client(&mut self) -> Result<()> {
        self.ipv4_dhcp_client = true;
        Ok(())
    }

    fn disable_ipv4_dhcp_client(&mut self) -> Result<()> {
        self.ipv4_dhcp_client = false;
        Ok(())
    }

    fn ipv4_address(&self) -> Ipv4Addr {
        if self.has_lease(self.ipv4_dhcp_client) {
            self.lease.ipv4_address
        } else {
            self.ipv4_address
        }
    }

    fn set_ipv4_address(&mut self, address: Ipv4Addr) -> Result<()> {
        self.ipv4_address = address;
        Ok(())
    }

    fn ipv4_netmask(&self) -> Ipv4Addr {
        if self.has_lease(self.ipv4_dhcp_client) {
            self.lease.ipv4_netmask
        } else {
            self.ipv4_netmask
        }
    }

    fn set_ipv4_netmask(&mut self, netmask: Ipv4Addr) -> Result<()> {
        self.ipv4_netmask = netmask;
        Ok(())
    }

    fn ipv4_gateway(&self) -> Ipv4Addr {
        if self.has_lease(self.ipv4_dhcp_client) {
            self.lease.ipv4_gateway
        } else {
            self.ipv4_gateway
        }
    }

    fn set_ipv4_gateway(&mut self, gateway: Ipv4Addr) -> Result<()> {
        self.ipv4_gateway = gateway;
        Ok(())
    }

    fn is_ipv6_dhcp_client_enabled(&self) -> bool {
        self.ipv6_dhcp_client
    }

    fn enable_ipv6_dhcp_client(&mut self) -> Result<()> {
        self.ipv6_dhcp_client = true;
        Ok(())
    }

    fn disable_ipv6_dhcp_client(&mut self) -> Result<()> {
        self.ipv6_dhcp_client = false;
        Ok(())
    }

    fn ipv6_global_address(&self) -> Ipv6Addr {
        if self.has_lease(self.ipv6_dhcp_client) {
            self.lease.ipv6_global_address
        } else {
            self.ipv6_global_address
        }
    }

    fn set_ipv6_global_address(&mut self, address: Ipv6Addr) -> Result<()> {
        self.ipv6_global_address = address;
        Ok(())
    }

    // fe80::/64 with an interface id derived from the name
    fn ipv6_link_local_address(&self) -> Ipv6Addr {
        let id = self
            .name
            .bytes()
            .fold(0u16, |id, byte| id.rotate_left(5) ^ u16::from(byte));
        Ipv6Addr::new(0xfe80, 0, 0, 0, 0x0200, 0x5eff, 0xfe00, id)
    }
}

impl WiFiStation for SimulatedNetworkInterface {
    fn ssid(&self) -> String {
        self.ssid.clone()
    }

    fn set_ssid(&mut self, ssid: &str) -> Result<()> {
        self.ssid = ssid.to_string();
        Ok(())
    }

    fn password(&self) -> String {
        self.password.clone()
    }

    fn set_password(&mut self, password: &str) -> Result<()> {
        self.password = password.to_string();
        Ok(())
    }
}

/// Server without settings of its own, such as a serial stream server
#[derive(Debug, Clone)]
pub struct SimulatedServer {
    pub name: String,
    pub enabled: bool,
}

impl SimulatedServer {
    pub fn shared(name: impl Into<String>) -> Arc<Mutex<Self>> {
        shared(Self {
            name: name.into(),
            enabled: false,
        })
    }
}

impl Server for SimulatedServer {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn enable(&mut self) -> Result<()> {
        log::debug!("{}: started", self.name);
        self.enabled = true;
        Ok(())
    }

    fn disable(&mut self) -> Result<()> {
        log::debug!("{}: stopped", self.name);
        self.enabled = false;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SimulatedNetworkServer {
    pub name: String,
    pub enabled: bool,
    pub port: u16,
    pub max_clients: u16,
}

impl SimulatedNetworkServer {
    pub fn shared(name: impl Into<String>, port: u16, max_clients: u16) -> Arc<Mutex<Self>> {
        shared(Self {
            name: name.into(),
            enabled: false,
            port,
            max_clients,
        })
    }
}

impl Server for SimulatedNetworkServer {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn enable(&mut self) -> Result<()> {
        log::debug!(
            "{}: listening on port {} for up to {} clients",
            self.name,
            self.port,
            self.max_clients
        );
        self.enabled = true;
        Ok(())
    }

    fn disable(&mut self) -> Result<()> {
        log::debug!("{}: stopped", self.name);
        self.enabled = false;
        Ok(())
    }
}

impl NetworkServer for SimulatedNetworkServer {
    fn port(&self) -> u16 {
        self.port
    }

    fn set_port(&mut self, port: u16) -> Result<()> {
        ensure!(port != 0, "port must not be zero");
        self.port = port;
        Ok(())
    }

    fn max_clients(&self) -> u16 {
        self.max_clients
    }

    fn set_max_clients(&mut self, max_clients: u16) -> Result<()> {
        self.max_clients = max_clients;
        Ok(())
    }
}

/// Modbus server on top of a stream or network transport server
pub struct SimulatedModbusServer {
    pub name: String,
    pub enabled: bool,
    pub protocol: ModbusProtocol,
    pub station_address: u8,
    pub transport: Option<ModbusTransport>,
}

impl SimulatedModbusServer {
    pub fn shared(
        name: impl Into<String>,
        protocol: ModbusProtocol,
        transport: Option<ModbusTransport>,
    ) -> Arc<Mutex<Self>> {
        shared(Self {
            name: name.into(),
            enabled: false,
            protocol,
            station_address: 1,
            transport,
        })
    }
}

impl Server for SimulatedModbusServer {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn enable(&mut self) -> Result<()> {
        log::debug!(
            "{}: serving {} as station {}",
            self.name,
            self.protocol,
            self.station_address
        );
        self.enabled = true;
        Ok(())
    }

    fn disable(&mut self) -> Result<()> {
        log::debug!("{}: stopped", self.name);
        self.enabled = false;
        Ok(())
    }
}

impl ModbusServer for SimulatedModbusServer {
    fn protocol(&self) -> ModbusProtocol {
        self.protocol
    }

    fn set_protocol(&mut self, protocol: ModbusProtocol) -> Result<()> {
        self.protocol = protocol;
        Ok(())
    }

    fn station_address(&self) -> u8 {
        self.station_address
    }

    fn set_station_address(&mut self, station_address: u8) -> Result<()> {
        ensure!(
            (1..=247).contains(&station_address),
            "station address {station_address} is outside 1..=247"
        );
        self.station_address = station_address;
        Ok(())
    }

    fn base_server(&self) -> Option<ModbusTransport> {
        self.transport.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lease_only_shows_while_connected_with_dhcp() {
        let wifi = SimulatedNetworkInterface::wifi("wlan0");
        let mut wifi = wifi.lock();
        wifi.ipv4_address = Ipv4Addr::new(10, 0, 0, 5);

        assert_eq!(wifi.ipv4_address(), Ipv4Addr::new(10, 0, 0, 5));
        wifi.enable().unwrap();
        assert!(!wifi.is_connected());
        wifi.set_ssid("plant").unwrap();
        assert_eq!(wifi.ipv4_address(), DhcpLease::default().ipv4_address);

        wifi.disable_ipv4_dhcp_client().unwrap();
        assert_eq!(wifi.ipv4_address(), Ipv4Addr::new(10, 0, 0, 5));
    }

    #[test]
    fn test_link_local_address_is_stable() {
        let first = SimulatedNetworkInterface::ethernet("eth0");
        let second = SimulatedNetworkInterface::ethernet("eth0");
        let address = first.lock().ipv6_link_local_address();

        assert_eq!(address, second.lock().ipv6_link_local_address());
        assert_eq!(address.segments()[0], 0xfe80);
    }
}
