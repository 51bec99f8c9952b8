//! Recording drivers for unit tests

use anyhow::{bail, Result};
use parking_lot::Mutex;
use std::{
    net::{Ipv4Addr, Ipv6Addr},
    sync::Arc,
};

use crate::drivers::*;

pub type Journal = Arc<Mutex<Vec<String>>>;

pub struct MockUart {
    pub journal: Journal,
    pub enabled: bool,
    pub baud_rate: u32,
    pub data_bits: u16,
    pub parity: UartParity,
    pub stop_bits: UartStopBits,
    pub flow_control: UartFlowControl,
    pub fail_enable: bool,
}

impl MockUart {
    pub fn shared(journal: &Journal) -> Arc<Mutex<MockUart>> {
        Arc::new(Mutex::new(MockUart {
            journal: journal.clone(),
            enabled: false,
            baud_rate: 9600,
            data_bits: 8,
            parity: UartParity::None,
            stop_bits: UartStopBits::One,
            flow_control: UartFlowControl::None,
            fail_enable: false,
        }))
    }

    fn note(&self, entry: impl Into<String>) {
        self.journal.lock().push(entry.into());
    }
}

impl HardwareInterface for MockUart {
    fn name(&self) -> String {
        "uart0".to_string()
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn enable(&mut self) -> Result<()> {
        if self.fail_enable {
            bail!("line busy");
        }
        self.note("enable");
        self.enabled = true;
        Ok(())
    }

    fn disable(&mut self) -> Result<()> {
        self.note("disable");
        self.enabled = false;
        Ok(())
    }
}

impl Uart for MockUart {
    fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    fn set_baud_rate(&mut self, baud_rate: u32) -> Result<()> {
        self.note("baud_rate");
        self.baud_rate = baud_rate;
        Ok(())
    }

    fn data_bits(&self) -> u16 {
        self.data_bits
    }

    fn set_data_bits(&mut self, data_bits: u16) -> Result<()> {
        self.note("data_bits");
        self.data_bits = data_bits;
        Ok(())
    }

    fn parity(&self) -> UartParity {
        self.parity
    }

    fn set_parity(&mut self, parity: UartParity) -> Result<()> {
        self.note("parity");
        self.parity = parity;
        Ok(())
    }

    fn stop_bits(&self) -> UartStopBits {
        self.stop_bits
    }

    fn set_stop_bits(&mut self, stop_bits: UartStopBits) -> Result<()> {
        self.note("stop_bits");
        self.stop_bits = stop_bits;
        Ok(())
    }

    fn flow_control(&self) -> UartFlowControl {
        self.flow_control
    }

    fn set_flow_control(&mut self, flow_control: UartFlowControl) -> Result<()> {
        self.note("flow_control");
        self.flow_control = flow_control;
        Ok(())
    }
}

pub struct MockWiFi {
    pub journal: Journal,
    pub enabled: bool,
    pub ipv4_dhcp: bool,
    pub ipv4_address: Ipv4Addr,
    pub ipv4_netmask: Ipv4Addr,
    pub ipv4_gateway: Ipv4Addr,
    pub ipv6_dhcp: bool,
    pub ipv6_global_address: Ipv6Addr,
    pub ssid: String,
    pub password: String,
}

impl MockWiFi {
    pub fn shared(journal: &Journal) -> Arc<Mutex<MockWiFi>> {
        Arc::new(Mutex::new(MockWiFi {
            journal: journal.clone(),
            enabled: false,
            ipv4_dhcp: false,
            ipv4_address: Ipv4Addr::UNSPECIFIED,
            ipv4_netmask: Ipv4Addr::UNSPECIFIED,
            ipv4_gateway: Ipv4Addr::UNSPECIFIED,
            ipv6_dhcp: false,
            ipv6_global_address: Ipv6Addr::UNSPECIFIED,
            ssid: String::new(),
            password: String::new(),
        }))
    }

    fn note(&self, entry: impl Into<String>) {
        self.journal.lock().push(entry.into());
    }
}

impl HardwareInterface for MockWiFi {
    fn name(&self) -> String {
        "wlan0".to_string()
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn enable(&mut self) -> Result<()> {
        self.note("enable");
        self.enabled = true;
        Ok(())
    }

    fn disable(&mut self) -> Result<()> {
        self.note("disable");
        self.enabled = false;
        Ok(())
    }
}

impl NetworkInterface for MockWiFi {
    fn is_connected(&self) -> bool {
        self.enabled
    }

    fn is_ipv4_dhcp_client_enabled(&self) -> bool {
        self.ipv4_dhcp
    }

    fn enable_ipv4_dhcp_client(&mut self) -> Result<()> {
        self.note("ipv4_dhcp_on");
        self.ipv4_dhcp = true;
        Ok(())
    }

    fn disable_ipv4_dhcp_client(&mut self) -> Result<()> {
        self.note("ipv4_dhcp_off");
        self.ipv4_dhcp = false;
        Ok(())
    }

    fn ipv4_address(&self) -> Ipv4Addr {
        self.ipv4_address
    }

    fn set_ipv4_address(&mut self, address: Ipv4Addr) -> Result<()> {
        self.note("ipv4_address");
        self.ipv4_address = address;
        Ok(())
    }

    fn ipv4_netmask(&self) -> Ipv4Addr {
        self.ipv4_netmask
    }

    fn set_ipv4_netmask(&mut self, netmask: Ipv4Addr) -> Result<()> {
        self.note("ipv4_netmask");
        self.ipv4_netmask = netmask;
        Ok(())
    }

    fn ipv4_gateway(&self) -> Ipv4Addr {
        self.ipv4_gateway
    }

    fn set_ipv4_gateway(&mut self, gateway: Ipv4Addr) -> Result<()> {
        self.note("ipv4_gateway");
        self.ipv4_gateway = gateway;
        Ok(())
    }

    fn is_ipv6_dhcp_client_enabled(&self) -> bool {
        self.ipv6_dhcp
    }

    fn enable_ipv6_dhcp_client(&mut self) -> Result<()> {
        self.note("ipv6_dhcp_on");
        self.ipv6_dhcp = true;
        Ok(())
    }

    fn disable_ipv6_dhcp_client(&mut self) -> Result<()> {
        self.note("ipv6_dhcp_off");
        self.ipv6_dhcp = false;
        Ok(())
    }

    fn ipv6_global_address(&self) -> Ipv6Addr {
        self.ipv6_global_address
    }

    fn set_ipv6_global_address(&mut self, address: Ipv6Addr) -> Result<()> {
        self.note("ipv6_global_address");
        self.ipv6_global_address = address;
        Ok(())
    }

    fn ipv6_link_local_address(&self) -> Ipv6Addr {
        Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 1)
    }
}

impl WiFiStation for MockWiFi {
    fn ssid(&self) -> String {
        self.ssid.clone()
    }

    fn set_ssid(&mut self, ssid: &str) -> Result<()> {
        self.note("ssid");
        self.ssid = ssid.to_string();
        Ok(())
    }

    fn password(&self) -> String {
        self.password.clone()
    }

    fn set_password(&mut self, password: &str) -> Result<()> {
        self.note("password");
        self.password = password.to_string();
        Ok(())
    }
}

pub struct MockTcpServer {
    pub journal: Journal,
    pub enabled: bool,
    pub port: u16,
    pub max_clients: u16,
}

impl MockTcpServer {
    pub fn shared(journal: &Journal, port: u16) -> Arc<Mutex<MockTcpServer>> {
        Arc::new(Mutex::new(MockTcpServer {
            journal: journal.clone(),
            enabled: false,
            port,
            max_clients: 4,
        }))
    }
}

impl Server for MockTcpServer {
    fn name(&self) -> String {
        "tcp".to_string()
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn enable(&mut self) -> Result<()> {
        self.journal.lock().push("transport_enable".into());
        self.enabled = true;
        Ok(())
    }

    fn disable(&mut self) -> Result<()> {
        self.journal.lock().push("transport_disable".into());
        self.enabled = false;
        Ok(())
    }
}

impl NetworkServer for MockTcpServer {
    fn port(&self) -> u16 {
        self.port
    }

    fn set_port(&mut self, port: u16) -> Result<()> {
        self.journal.lock().push("port".into());
        self.port = port;
        Ok(())
    }

    fn max_clients(&self) -> u16 {
        self.max_clients
    }

    fn set_max_clients(&mut self, max_clients: u16) -> Result<()> {
        self.journal.lock().push("max_clients".into());
        self.max_clients = max_clients;
        Ok(())
    }
}

pub struct MockModbusServer {
    pub journal: Journal,
    pub enabled: bool,
    pub protocol: ModbusProtocol,
    pub station_address: u8,
    pub transport: Option<ModbusTransport>,
}

impl MockModbusServer {
    pub fn shared(
        journal: &Journal,
        transport: Option<ModbusTransport>,
    ) -> Arc<Mutex<MockModbusServer>> {
        Arc::new(Mutex::new(MockModbusServer {
            journal: journal.clone(),
            enabled: true,
            protocol: ModbusProtocol::Rtu,
            station_address: 1,
            transport,
        }))
    }
}

impl Server for MockModbusServer {
    fn name(&self) -> String {
        "modbus".to_string()
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn enable(&mut self) -> Result<()> {
        self.journal.lock().push("enable".into());
        self.enabled = true;
        Ok(())
    }

    fn disable(&mut self) -> Result<()> {
        self.journal.lock().push("disable".into());
        self.enabled = false;
        Ok(())
    }
}

impl ModbusServer for MockModbusServer {
    fn protocol(&self) -> ModbusProtocol {
        self.protocol
    }

    fn set_protocol(&mut self, protocol: ModbusProtocol) -> Result<()> {
        self.journal.lock().push("protocol".into());
        self.protocol = protocol;
        Ok(())
    }

    fn station_address(&self) -> u8 {
        self.station_address
    }

    fn set_station_address(&mut self, station_address: u8) -> Result<()> {
        self.journal.lock().push("station_address".into());
        self.station_address = station_address;
        Ok(())
    }

    fn base_server(&self) -> Option<ModbusTransport> {
        self.transport.clone()
    }
}
